use anyhow::anyhow;
use reqwest::Url;
use std::fmt;

/// The REST plugin an endpoint belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiPrefix {
    /// Projects, repositories and users.
    Core,
    /// Default reviewer conditions.
    DefaultReviewers,
}

impl ApiPrefix {
    fn segments(self) -> [&'static str; 3] {
        match self {
            ApiPrefix::Core => ["rest", "api", "1.0"],
            ApiPrefix::DefaultReviewers => ["rest", "default-reviewers", "1.0"],
        }
    }
}

/// A fully resolved URL to a Bitbucket Server endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiUrl(Url);

impl ApiUrl {
    /// Resolve `segments` below `prefix` on the server at `base`.
    ///
    /// Segments are percent-encoded, so repository names can be passed as is.
    pub fn new(base: &Url, prefix: ApiPrefix, segments: &[&str]) -> anyhow::Result<Self> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("{base} cannot be used as a base url"))?
            .pop_if_empty()
            .extend(prefix.segments())
            .extend(segments);
        Ok(Self(url))
    }

    pub fn project(base: &Url, project: &str, remaining: &[&str]) -> anyhow::Result<Self> {
        let mut segments = vec!["projects", project];
        segments.extend_from_slice(remaining);
        Self::new(base, ApiPrefix::Core, &segments)
    }

    /// An endpoint of the default reviewers plugin below one repository.
    pub fn reviewers(
        base: &Url,
        project: &str,
        repo: &str,
        remaining: &[&str],
    ) -> anyhow::Result<Self> {
        let mut segments = vec!["projects", project, "repos", repo];
        segments.extend_from_slice(remaining);
        Self::new(base, ApiPrefix::DefaultReviewers, &segments)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ApiUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
