use crate::api::{ApiUrl, HttpClient};
use bitbucket_data::v1::ConditionUpdate;
use log::debug;

pub trait BitbucketWrite {
    /// Replace a default reviewer condition of a repository
    fn update_condition(
        &self,
        project_key: &str,
        repo: &str,
        condition_id: u64,
        update: &ConditionUpdate,
    ) -> anyhow::Result<()>;
}

pub struct BitbucketApiWrite {
    client: HttpClient,
}

impl BitbucketApiWrite {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

impl BitbucketWrite for BitbucketApiWrite {
    fn update_condition(
        &self,
        project_key: &str,
        repo: &str,
        condition_id: u64,
        update: &ConditionUpdate,
    ) -> anyhow::Result<()> {
        debug!("updating condition {condition_id} of '{project_key}/{repo}'");
        let id = condition_id.to_string();
        let url = ApiUrl::reviewers(
            self.client.base_url(),
            project_key,
            repo,
            &["condition", id.as_str()],
        )?;
        self.client.put(&url, update)
    }
}
