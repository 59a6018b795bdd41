use dialoguer::{theme::ColorfulTheme, Input, MultiSelect, Select};
use std::io;
use sync_reviewers::Failure;

/// Questions asked to the admin.
///
/// Cancelling a prompt (Esc or `q`) is an empty answer, not an error.
pub(crate) trait Prompter {
    /// Indices of the checked items, in list order.
    fn multi_select(&mut self, prompt: &str, items: &[String]) -> anyhow::Result<Vec<usize>>;

    /// Index of the chosen item, `None` if cancelled.
    fn select(&mut self, prompt: &str, items: &[String]) -> anyhow::Result<Option<usize>>;

    fn input(&mut self, prompt: &str) -> anyhow::Result<String>;
}

#[derive(Default)]
pub(crate) struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl Prompter for DialoguerPrompter {
    fn multi_select(&mut self, prompt: &str, items: &[String]) -> anyhow::Result<Vec<usize>> {
        let chosen = MultiSelect::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .interact_opt()
            .map_err(terminal_error)?;
        Ok(chosen.unwrap_or_default())
    }

    fn select(&mut self, prompt: &str, items: &[String]) -> anyhow::Result<Option<usize>> {
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .interact_opt()
            .map_err(terminal_error)
    }

    fn input(&mut self, prompt: &str) -> anyhow::Result<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact_text()
            .map_err(terminal_error)
    }
}

/// Ctrl-C in raw mode comes back as an `Interrupted` read error.
fn terminal_error(err: io::Error) -> anyhow::Error {
    if err.kind() == io::ErrorKind::Interrupted {
        Failure::Interrupted.into()
    } else {
        anyhow::Error::new(err).context("failed to read from the terminal")
    }
}
