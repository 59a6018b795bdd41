pub mod api;
pub mod config;
pub mod errors;
pub mod reviewers;
mod utils;

pub use crate::api::{
    BitbucketApiRead, BitbucketApiWrite, BitbucketRead, BitbucketWrite, HttpClient, ping,
};
pub use crate::config::ServerConfig;
pub use crate::errors::Failure;
pub use crate::reviewers::{Action, BranchStrategy, Change, Summary};

const USER_AGENT: &str = concat!("default-reviewers/", env!("CARGO_PKG_VERSION"));

/// The read and write halves of one server connection.
pub struct Bitbucket {
    pub read: BitbucketApiRead,
    pub write: BitbucketApiWrite,
}

/// Check that the server answers, then connect to it.
pub fn connect(config: &ServerConfig) -> anyhow::Result<Bitbucket> {
    ping(&config.base_url)?;
    log::info!("connected to {}", config.display_url());

    let client = HttpClient::new(config)?;
    Ok(Bitbucket {
        read: BitbucketApiRead::from_client(client.clone()),
        write: BitbucketApiWrite::new(client),
    })
}
