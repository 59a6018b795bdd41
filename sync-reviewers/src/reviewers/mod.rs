#[cfg(test)]
mod tests;

use crate::api::{BitbucketRead, BitbucketWrite};
use crate::errors::Failure;
use bitbucket_data::v1::{ANY_REF_MATCHER_ID, Condition, ConditionUpdate, Project, User};
use log::{debug, info};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Add,
    Remove,
}

impl Action {
    pub const ALL: [Action; 2] = [Action::Add, Action::Remove];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Action::Add => write!(f, "add"),
            Action::Remove => write!(f, "remove"),
        }
    }
}

/// The (source, target) branch pair a condition applies to.
///
/// Both sides hold the matcher's raw display id, [`ANY_REF_MATCHER_ID`]
/// included. Only [`fmt::Display`] turns it into something readable.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchStrategy {
    pub source: String,
    pub target: String,
}

impl BranchStrategy {
    pub fn of(condition: &Condition) -> Self {
        BranchStrategy {
            source: condition.source_ref_matcher.display_id.clone(),
            target: condition.target_ref_matcher.display_id.clone(),
        }
    }

    pub fn matches(&self, condition: &Condition) -> bool {
        self.source == condition.source_ref_matcher.display_id
            && self.target == condition.target_ref_matcher.display_id
    }
}

impl fmt::Display for BranchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} → {}",
            display_ref(&self.source),
            display_ref(&self.target)
        )
    }
}

fn display_ref(display_id: &str) -> &str {
    if display_id == ANY_REF_MATCHER_ID {
        "Anywhere"
    } else {
        display_id
    }
}

/// Collect the strategies used by any of `repos`, sorted and without duplicates.
pub fn merge_strategies(
    read: &dyn BitbucketRead,
    project_key: &str,
    repos: &[String],
) -> anyhow::Result<Vec<BranchStrategy>> {
    let mut strategies = BTreeSet::new();
    for repo in repos {
        let conditions = read.conditions(project_key, repo)?;
        debug!("'{}' has {} conditions", repo, conditions.len());
        strategies.extend(conditions.iter().map(BranchStrategy::of));
    }
    Ok(strategies.into_iter().collect())
}

/// Find the one user of the project matching `input`.
pub fn resolve_reviewer(
    read: &dyn BitbucketRead,
    project: &Project,
    input: &str,
) -> anyhow::Result<User> {
    let filter = user_filter(input);
    let mut users = read.users(project, &filter)?;
    match users.len() {
        0 => Err(Failure::ReviewerNotFound { filter }.into()),
        1 => {
            let user = users.remove(0);
            info!("resolved reviewer '{}' (id {})", user.name, user.id);
            Ok(user)
        }
        _ => Err(Failure::ReviewerAmbiguous {
            filter,
            candidates: users.into_iter().map(|u| u.name).collect(),
        }
        .into()),
    }
}

/// Words of the search input separated by single spaces, which the query
/// string encoder sends as `+`.
pub(crate) fn user_filter(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// What to do to which reviewer on which strategies.
#[derive(Clone, Debug)]
pub struct Change {
    pub action: Action,
    pub reviewer: User,
    pub strategies: Vec<BranchStrategy>,
}

/// Apply `change` to every repository in turn, stopping at the first error.
///
/// Conditions are read again for each repository right before it is changed.
pub fn apply_change(
    read: &dyn BitbucketRead,
    write: &dyn BitbucketWrite,
    project_key: &str,
    repos: &[String],
    change: &Change,
) -> anyhow::Result<Summary> {
    let mut summary = Summary::default();
    for repo in repos {
        let diff = create_diff(read, project_key, repo, change)?;
        if diff.is_noop() {
            debug!("{diff}");
        } else {
            info!("{diff}");
        }
        summary += diff.apply(write, project_key)?;
    }
    info!("{summary}");
    Ok(summary)
}

pub fn create_diff(
    read: &dyn BitbucketRead,
    project_key: &str,
    repo: &str,
    change: &Change,
) -> anyhow::Result<RepoDiff> {
    let conditions = read.conditions(project_key, repo)?;
    let mut condition_diffs = Vec::new();
    if !conditions.is_empty() {
        for strategy in &change.strategies {
            let diff = match conditions.iter().find(|c| strategy.matches(c)) {
                Some(condition) => diff_condition(condition, change),
                None => ConditionDiff::Unmatched(strategy.clone()),
            };
            condition_diffs.push(diff);
        }
    }
    Ok(RepoDiff {
        repo: repo.to_string(),
        condition_diffs,
    })
}

fn diff_condition(condition: &Condition, change: &Change) -> ConditionDiff {
    let strategy = BranchStrategy::of(condition);
    let reviewer = &change.reviewer;
    let present = condition.reviewers.iter().any(|r| r.id == reviewer.id);

    let (reviewers, reviewer_diff) = match (change.action, present) {
        (Action::Add, true) => {
            return ConditionDiff::Noop(NoopConditionDiff {
                condition_id: condition.id,
                strategy,
                reviewer: reviewer.name.clone(),
            });
        }
        (Action::Add, false) => {
            let mut reviewers = condition.reviewers.clone();
            reviewers.push(reviewer.clone());
            (reviewers, ReviewerDiff::Added)
        }
        (Action::Remove, true) => {
            let reviewers = condition
                .reviewers
                .iter()
                .filter(|r| r.id != reviewer.id)
                .cloned()
                .collect();
            (reviewers, ReviewerDiff::Removed)
        }
        // Still written back, the request volume does not depend on the
        // current reviewers of a condition when removing.
        (Action::Remove, false) => (condition.reviewers.clone(), ReviewerDiff::Absent),
    };

    ConditionDiff::Update(UpdateConditionDiff {
        condition_id: condition.id,
        strategy,
        reviewer: reviewer.name.clone(),
        reviewer_diff,
        update: condition_update(condition, reviewers),
    })
}

/// Build the body written back for `condition` with a new reviewer list.
pub fn condition_update(condition: &Condition, reviewers: Vec<User>) -> ConditionUpdate {
    ConditionUpdate {
        source_matcher: (&condition.source_ref_matcher).into(),
        target_matcher: (&condition.target_ref_matcher).into(),
        required_approvals: condition.required_approvals,
        scope: condition.scope.clone(),
        reviewers: normalize_reviewers(reviewers),
    }
}

/// The write endpoint rejects `links` and wants an `avatarUrl` on every reviewer.
fn normalize_reviewers(reviewers: Vec<User>) -> Vec<User> {
    reviewers
        .into_iter()
        .map(|mut reviewer| {
            reviewer.extra.remove("links");
            let avatar_url = reviewer.avatar_url();
            reviewer
                .extra
                .insert("avatarUrl".to_string(), Value::String(avatar_url));
            reviewer
        })
        .collect()
}

#[derive(Debug)]
pub struct RepoDiff {
    repo: String,
    condition_diffs: Vec<ConditionDiff>,
}

impl RepoDiff {
    pub fn apply(self, write: &dyn BitbucketWrite, project_key: &str) -> anyhow::Result<Summary> {
        let mut summary = Summary::default();
        for diff in self.condition_diffs {
            match diff {
                ConditionDiff::Update(update) => {
                    write.update_condition(
                        project_key,
                        &self.repo,
                        update.condition_id,
                        &update.update,
                    )?;
                    summary.updated += 1;
                }
                ConditionDiff::Noop(_) => summary.unchanged += 1,
                ConditionDiff::Unmatched(_) => summary.unmatched += 1,
            }
        }
        Ok(summary)
    }

    pub fn is_noop(&self) -> bool {
        self.condition_diffs
            .iter()
            .all(|d| !matches!(d, ConditionDiff::Update(_)))
    }
}

impl fmt::Display for RepoDiff {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.condition_diffs.is_empty() {
            return writeln!(f, "✅ Repo '{}' has no default reviewer conditions", self.repo);
        }
        writeln!(f, "📝 Editing repo '{}':", self.repo)?;
        for diff in &self.condition_diffs {
            write!(f, "  {diff}")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
enum ConditionDiff {
    Update(UpdateConditionDiff),
    Noop(NoopConditionDiff),
    /// No condition of the repository has this strategy.
    Unmatched(BranchStrategy),
}

impl fmt::Display for ConditionDiff {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConditionDiff::Update(UpdateConditionDiff {
                condition_id,
                strategy,
                reviewer,
                reviewer_diff,
                ..
            }) => {
                let what = match reviewer_diff {
                    ReviewerDiff::Added => format!("adding '{reviewer}'"),
                    ReviewerDiff::Removed => format!("removing '{reviewer}'"),
                    ReviewerDiff::Absent => {
                        format!("'{reviewer}' is not a reviewer, writing back unchanged")
                    }
                };
                writeln!(f, "{strategy} (condition {condition_id}): {what}")
            }
            ConditionDiff::Noop(NoopConditionDiff {
                condition_id,
                strategy,
                reviewer,
            }) => writeln!(
                f,
                "{strategy} (condition {condition_id}): '{reviewer}' is already a reviewer"
            ),
            ConditionDiff::Unmatched(strategy) => writeln!(f, "{strategy}: no matching condition"),
        }
    }
}

#[derive(Debug)]
struct UpdateConditionDiff {
    condition_id: u64,
    strategy: BranchStrategy,
    reviewer: String,
    reviewer_diff: ReviewerDiff,
    update: ConditionUpdate,
}

#[derive(Debug)]
struct NoopConditionDiff {
    condition_id: u64,
    strategy: BranchStrategy,
    reviewer: String,
}

#[derive(Debug, PartialEq, Eq)]
enum ReviewerDiff {
    Added,
    Removed,
    Absent,
}

/// Counts of what happened to the (repository, strategy) pairs of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub updated: usize,
    pub unchanged: usize,
    pub unmatched: usize,
}

impl std::ops::AddAssign for Summary {
    fn add_assign(&mut self, other: Summary) {
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.unmatched += other.unmatched;
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} conditions updated, {} already up to date, {} without a matching condition",
            self.updated, self.unchanged, self.unmatched
        )
    }
}
