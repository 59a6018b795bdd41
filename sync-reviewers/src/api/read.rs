use crate::api::{ApiPrefix, ApiUrl, HttpClient, PAGE_LIMIT};
use bitbucket_data::v1::{Condition, Page, Project, Repo, User};
use log::warn;

pub trait BitbucketRead {
    /// Get a project by key
    fn project(&self, key: &str) -> anyhow::Result<Project>;

    /// Get the names of all repositories of a project
    fn repos(&self, project_key: &str) -> anyhow::Result<Vec<String>>;

    /// Search licensed users that can read the project
    ///
    /// `filter` is matched by the server against user names, display names and emails.
    fn users(&self, project: &Project, filter: &str) -> anyhow::Result<Vec<User>>;

    /// Get the default reviewer conditions of a repository
    fn conditions(&self, project_key: &str, repo: &str) -> anyhow::Result<Vec<Condition>>;
}

pub struct BitbucketApiRead {
    client: HttpClient,
}

impl BitbucketApiRead {
    pub fn from_client(client: HttpClient) -> Self {
        Self { client }
    }

    fn page<T: serde::de::DeserializeOwned>(
        &self,
        url: &ApiUrl,
        query: &[(&str, &str)],
    ) -> anyhow::Result<Vec<T>> {
        let page: Page<T> = self.client.get(url, query)?;
        if !page.is_last_page {
            warn!(
                "{} has more than {} entries, only the first {} are used",
                url, PAGE_LIMIT, PAGE_LIMIT
            );
        }
        Ok(page.values)
    }
}

impl BitbucketRead for BitbucketApiRead {
    fn project(&self, key: &str) -> anyhow::Result<Project> {
        let url = ApiUrl::project(self.client.base_url(), key, &[])?;
        self.client.get(&url, &[])
    }

    fn repos(&self, project_key: &str) -> anyhow::Result<Vec<String>> {
        let url = ApiUrl::project(self.client.base_url(), project_key, &["repos"])?;
        let repos: Vec<Repo> = self.page(&url, &[])?;
        Ok(repos.into_iter().map(|r| r.name).collect())
    }

    fn users(&self, project: &Project, filter: &str) -> anyhow::Result<Vec<User>> {
        let url = ApiUrl::new(self.client.base_url(), ApiPrefix::Core, &["users"])?;
        let project_id = project.id.to_string();
        self.page(
            &url,
            &[
                ("permission.1", "LICENSED_USER"),
                ("permission.2", "PROJECT_READ"),
                ("permission.2.projectId", project_id.as_str()),
                ("filter", filter),
            ],
        )
    }

    fn conditions(&self, project_key: &str, repo: &str) -> anyhow::Result<Vec<Condition>> {
        let url = ApiUrl::reviewers(self.client.base_url(), project_key, repo, &["conditions"])?;
        self.client.get(&url, &[])
    }
}
