use std::path::PathBuf;

/// Failures that end the run with a dedicated exit code.
///
/// Anything else bubbling up as an `anyhow::Error` (mostly failed requests)
/// is a generic runtime failure.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error("no configuration file found, expected {} or {}", .local.display(), .fallback.display())]
    ConfigMissing { local: PathBuf, fallback: PathBuf },

    #[error("invalid configuration in {}: {reason}", .path.display())]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("server {url} is unreachable ({})", status_text(.status))]
    ServerUnreachable { url: String, status: Option<u16> },

    #[error("no user found matching '{filter}'")]
    ReviewerNotFound { filter: String },

    #[error("{} users match '{filter}' ({}), be more specific", .candidates.len(), .candidates.join(", "))]
    ReviewerAmbiguous {
        filter: String,
        candidates: Vec<String>,
    },

    #[error("interrupted")]
    Interrupted,
}

impl Failure {
    pub fn exit_code(&self) -> i32 {
        match self {
            Failure::ConfigMissing { .. } | Failure::ConfigInvalid { .. } => 80,
            Failure::ServerUnreachable { .. }
            | Failure::ReviewerNotFound { .. }
            | Failure::ReviewerAmbiguous { .. } => 1,
            Failure::Interrupted => 90,
        }
    }
}

fn status_text(status: &Option<u16>) -> String {
    match status {
        Some(status) => format!("HTTP {status}"),
        None => "no response".to_string(),
    }
}
