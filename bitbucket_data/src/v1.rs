//! Records exchanged with the Bitbucket Server REST API (`rest/api/1.0` and
//! `rest/default-reviewers/1.0`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Matcher id the server uses for "any branch".
pub static ANY_REF_MATCHER_ID: &str = "ANY_REF_MATCHER_ID";

/// Size requested for the avatar url injected into written reviewers.
pub const AVATAR_SIZE: u32 = 32;

/// A single page of a paged collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub values: Vec<T>,
    #[serde(default = "default_last_page")]
    pub is_last_page: bool,
}

fn default_last_page() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub key: String,
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repo {
    pub name: String,
}

/// A server user.
///
/// Only `id` and `name` are interpreted, every other field is carried along
/// untouched so the object can be written back the way it was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn avatar_url(&self) -> String {
        format!("/users/{}/avatar.png?s={}", self.name, AVATAR_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefMatcher {
    pub id: String,
    pub display_id: String,
    #[serde(rename = "type")]
    pub kind: MatcherType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherType {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    #[serde(rename = "type")]
    pub kind: String,
    pub resource_id: u64,
}

/// A default reviewer condition of one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub id: u64,
    pub source_ref_matcher: RefMatcher,
    pub target_ref_matcher: RefMatcher,
    pub required_approvals: u32,
    pub scope: Scope,
    #[serde(default)]
    pub reviewers: Vec<User>,
}

/// Body accepted by the condition write endpoint.
///
/// The endpoint rejects most of what it hands out on reads, so this only
/// carries the fields it accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionUpdate {
    pub source_matcher: MatcherRef,
    pub target_matcher: MatcherRef,
    pub required_approvals: u32,
    pub scope: Scope,
    pub reviewers: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatcherRef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MatcherTypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatcherTypeRef {
    pub id: String,
}

impl From<&RefMatcher> for MatcherRef {
    fn from(matcher: &RefMatcher) -> Self {
        MatcherRef {
            id: matcher.id.clone(),
            kind: MatcherTypeRef {
                id: matcher.kind.id.clone(),
            },
        }
    }
}
