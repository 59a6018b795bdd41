use crate::prompt::Prompter;
use bitbucket_data::v1::{Project, User};
use log::info;
use sync_reviewers::reviewers::{apply_change, merge_strategies, resolve_reviewer};
use sync_reviewers::{Action, BitbucketRead, BitbucketWrite, Change, Summary};

/// Where the admin is in the selection. Steps only ever move forward.
#[derive(Debug)]
pub(crate) enum Step {
    SelectRepos,
    SelectAction {
        repos: Vec<String>,
    },
    SelectReviewer {
        repos: Vec<String>,
        action: Action,
    },
    SelectStrategies {
        repos: Vec<String>,
        action: Action,
        reviewer: User,
    },
    Execute {
        repos: Vec<String>,
        change: Change,
    },
    /// `None` when an empty selection left nothing to do.
    Done(Option<Summary>),
}

pub(crate) struct Wizard<'a, P> {
    prompter: P,
    read: &'a dyn BitbucketRead,
    write: &'a dyn BitbucketWrite,
    project: &'a Project,
    repos: Vec<String>,
}

impl<'a, P: Prompter> Wizard<'a, P> {
    pub(crate) fn new(
        prompter: P,
        read: &'a dyn BitbucketRead,
        write: &'a dyn BitbucketWrite,
        project: &'a Project,
        repos: Vec<String>,
    ) -> Self {
        Wizard {
            prompter,
            read,
            write,
            project,
            repos,
        }
    }

    pub(crate) fn run(&mut self) -> anyhow::Result<Option<Summary>> {
        let mut step = Step::SelectRepos;
        loop {
            step = match step {
                Step::Done(summary) => return Ok(summary),
                step => self.advance(step)?,
            };
        }
    }

    fn advance(&mut self, step: Step) -> anyhow::Result<Step> {
        Ok(match step {
            Step::SelectRepos => {
                let chosen = self.prompter.multi_select("Repositories", &self.repos)?;
                let repos = pick(&self.repos, &chosen);
                if repos.is_empty() {
                    return Ok(nothing_to_do("no repository selected"));
                }
                Step::SelectAction { repos }
            }
            Step::SelectAction { repos } => {
                let labels = Action::ALL.iter().map(|a| a.to_string()).collect::<Vec<_>>();
                match self.prompter.select("Action", &labels)? {
                    Some(index) => Step::SelectReviewer {
                        repos,
                        action: Action::ALL[index],
                    },
                    None => nothing_to_do("no action selected"),
                }
            }
            Step::SelectReviewer { repos, action } => {
                let input = self.prompter.input("Reviewer (name, username or email)")?;
                let reviewer = resolve_reviewer(self.read, self.project, &input)?;
                Step::SelectStrategies {
                    repos,
                    action,
                    reviewer,
                }
            }
            Step::SelectStrategies {
                repos,
                action,
                reviewer,
            } => {
                let merged = merge_strategies(self.read, &self.project.key, &repos)?;
                let labels = merged.iter().map(|s| s.to_string()).collect::<Vec<_>>();
                let chosen = self.prompter.multi_select("Merge strategies", &labels)?;
                let strategies = pick(&merged, &chosen);
                if strategies.is_empty() {
                    return Ok(nothing_to_do("no merge strategy selected"));
                }
                Step::Execute {
                    repos,
                    change: Change {
                        action,
                        reviewer,
                        strategies,
                    },
                }
            }
            Step::Execute { repos, change } => {
                info!(
                    "{} '{}' on {} strategies of {} repositories",
                    change.action,
                    change.reviewer.name,
                    change.strategies.len(),
                    repos.len()
                );
                let summary =
                    apply_change(self.read, self.write, &self.project.key, &repos, &change)?;
                Step::Done(Some(summary))
            }
            Step::Done(summary) => Step::Done(summary),
        })
    }
}

fn nothing_to_do(why: &str) -> Step {
    info!("{why}, nothing to do");
    Step::Done(None)
}

/// The items at `indices`, ignoring any index out of range.
fn pick<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices
        .iter()
        .filter_map(|&index| items.get(index).cloned())
        .collect()
}
