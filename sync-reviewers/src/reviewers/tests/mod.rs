use bitbucket_data::v1::User;
use serde_json::json;

use crate::errors::Failure;
use crate::reviewers::tests::test_utils::{ConditionData, DataModel, RepoData, user};
use crate::reviewers::{
    Action, BranchStrategy, Change, Summary, apply_change, create_diff, merge_strategies,
    resolve_reviewer, user_filter,
};


fn strategy(source: &str, target: &str) -> BranchStrategy {
    BranchStrategy {
        source: source.to_string(),
        target: target.to_string(),
    }
}

fn change(action: Action, reviewer: User, strategies: &[BranchStrategy]) -> Change {
    Change {
        action,
        reviewer,
        strategies: strategies.to_vec(),
    }
}

#[test]
fn merge_deduplicates_across_repos() {
    let mut model = DataModel::default();
    model.create_repo(
        RepoData::new("svc-a")
            .condition(ConditionData::new("feature/*", "main"))
            .condition(ConditionData::new("develop", "ANY_REF_MATCHER_ID")),
    );
    model.create_repo(RepoData::new("svc-b").condition(ConditionData::new("feature/*", "main")));
    model.create_repo(RepoData::new("svc-c"));
    let bb = model.bitbucket_model();

    let repos = model.repo_names();
    let merged = merge_strategies(&bb, "PLAT", &repos).unwrap();
    assert_eq!(
        merged,
        vec![
            strategy("develop", "ANY_REF_MATCHER_ID"),
            strategy("feature/*", "main"),
        ]
    );

    let reversed = repos.iter().rev().cloned().collect::<Vec<_>>();
    assert_eq!(merge_strategies(&bb, "PLAT", &reversed).unwrap(), merged);
}

#[test]
fn merge_of_nothing() {
    let model = DataModel::default();
    let bb = model.bitbucket_model();
    assert!(merge_strategies(&bb, "PLAT", &[]).unwrap().is_empty());
}

#[test]
fn strategy_label_shows_anywhere() {
    let any = strategy("develop", "ANY_REF_MATCHER_ID");
    assert_eq!(any.to_string(), "develop → Anywhere");
    assert_eq!(any.target, "ANY_REF_MATCHER_ID");
    assert_eq!(strategy("feature/*", "main").to_string(), "feature/* → main");
}

#[test]
fn filter_collapses_whitespace() {
    assert_eq!(user_filter("  Jane   Doe "), "Jane Doe");
    assert_eq!(user_filter("jdoe"), "jdoe");
}

#[test]
fn resolve_single_reviewer() {
    let mut model = DataModel::default();
    let jdoe = model.create_user(7, "jdoe");
    model.create_user(8, "asmith");
    let bb = model.bitbucket_model();

    let resolved = resolve_reviewer(&bb, bb.resolved_project(), "jdoe").unwrap();
    assert_eq!(resolved, jdoe);
    assert!(resolved.extra.contains_key("links"));
}

#[test]
fn resolve_no_reviewer() {
    let mut model = DataModel::default();
    model.create_user(7, "jdoe");
    let bb = model.bitbucket_model();

    let err = resolve_reviewer(&bb, bb.resolved_project(), "nobody").unwrap_err();
    let failure = err.downcast_ref::<Failure>().unwrap();
    assert!(matches!(failure, Failure::ReviewerNotFound { .. }));
    assert_eq!(failure.exit_code(), 1);
}

#[test]
fn resolve_ambiguous_reviewer() {
    let mut model = DataModel::default();
    model.create_user(7, "jdoe");
    model.create_user(9, "jdoering");
    let bb = model.bitbucket_model();

    let err = resolve_reviewer(&bb, bb.resolved_project(), "jdoe").unwrap_err();
    match err.downcast_ref::<Failure>().unwrap() {
        Failure::ReviewerAmbiguous { candidates, .. } => {
            assert_eq!(candidates, &["jdoe", "jdoering"])
        }
        other => panic!("unexpected failure: {other}"),
    }
}

#[test]
fn add_reviewer_to_empty_condition() {
    let mut model = DataModel::default();
    let jdoe = model.create_user(7, "jdoe");
    model.create_repo(
        RepoData::new("svc-a").condition(ConditionData::new("develop", "ANY_REF_MATCHER_ID")),
    );
    let bb = model.bitbucket_model();

    let change = change(
        Action::Add,
        jdoe,
        &[strategy("develop", "ANY_REF_MATCHER_ID")],
    );
    let summary = apply_change(&bb, &bb, "PLAT", &model.repo_names(), &change).unwrap();
    assert_eq!(
        summary,
        Summary {
            updated: 1,
            unchanged: 0,
            unmatched: 0,
        }
    );

    let puts = bb.puts();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].repo, "svc-a");
    assert_eq!(puts[0].condition_id, 1);
    assert_eq!(
        puts[0].body,
        json!({
            "sourceMatcher": {"id": "refs/heads/develop", "type": {"id": "BRANCH"}},
            "targetMatcher": {"id": "ANY_REF_MATCHER_ID", "type": {"id": "ANY_REF"}},
            "requiredApprovals": 1,
            "scope": {"type": "REPOSITORY", "resourceId": 1},
            "reviewers": [
                {"id": 7, "name": "jdoe", "avatarUrl": "/users/jdoe/avatar.png?s=32"},
            ],
        })
    );
}

#[test]
fn add_is_idempotent() {
    let mut model = DataModel::default();
    let jdoe = model.create_user(7, "jdoe");
    model.create_repo(RepoData::new("svc-a").condition(ConditionData::new("feature/*", "main")));
    let bb = model.bitbucket_model();

    let change = change(Action::Add, jdoe, &[strategy("feature/*", "main")]);
    apply_change(&bb, &bb, "PLAT", &model.repo_names(), &change).unwrap();
    let second = apply_change(&bb, &bb, "PLAT", &model.repo_names(), &change).unwrap();

    assert_eq!(second.unchanged, 1);
    assert_eq!(bb.puts().len(), 1);
    assert_eq!(bb.reviewer_names("svc-a", 1), vec!["jdoe"]);
}

#[test]
fn add_keeps_existing_reviewers() {
    let mut model = DataModel::default();
    let jdoe = model.create_user(7, "jdoe");
    model.create_repo(
        RepoData::new("svc-a").condition(
            ConditionData::new("feature/*", "main")
                .required_approvals(2)
                .reviewers(vec![user(3, "asmith")]),
        ),
    );
    let bb = model.bitbucket_model();

    let change = change(Action::Add, jdoe, &[strategy("feature/*", "main")]);
    apply_change(&bb, &bb, "PLAT", &model.repo_names(), &change).unwrap();

    let puts = bb.puts();
    let body = &puts[0].body;
    assert_eq!(body["requiredApprovals"], 2);
    assert_eq!(
        body["reviewers"],
        json!([
            {"id": 3, "name": "asmith", "avatarUrl": "/users/asmith/avatar.png?s=32"},
            {"id": 7, "name": "jdoe", "avatarUrl": "/users/jdoe/avatar.png?s=32"},
        ])
    );
}

#[test]
fn remove_reviewer() {
    let mut model = DataModel::default();
    let jdoe = model.create_user(7, "jdoe");
    model.create_repo(
        RepoData::new("svc-a").condition(
            ConditionData::new("develop", "main").reviewers(vec![jdoe.clone(), user(3, "asmith")]),
        ),
    );
    let bb = model.bitbucket_model();

    let change = change(Action::Remove, jdoe, &[strategy("develop", "main")]);
    apply_change(&bb, &bb, "PLAT", &model.repo_names(), &change).unwrap();

    let puts = bb.puts();
    assert_eq!(puts.len(), 1);
    assert_eq!(
        puts[0].body["reviewers"],
        json!([{"id": 3, "name": "asmith", "avatarUrl": "/users/asmith/avatar.png?s=32"}])
    );
    assert_eq!(bb.reviewer_names("svc-a", 1), vec!["asmith"]);
}

#[test]
fn remove_absent_reviewer_writes_back_unchanged() {
    let mut model = DataModel::default();
    let jdoe = model.create_user(7, "jdoe");
    model.create_repo(
        RepoData::new("svc-a")
            .condition(ConditionData::new("develop", "main").reviewers(vec![user(3, "asmith")])),
    );
    let bb = model.bitbucket_model();

    let change = change(Action::Remove, jdoe, &[strategy("develop", "main")]);
    apply_change(&bb, &bb, "PLAT", &model.repo_names(), &change).unwrap();
    apply_change(&bb, &bb, "PLAT", &model.repo_names(), &change).unwrap();

    let puts = bb.puts();
    assert_eq!(puts.len(), 2);
    for put in &puts {
        assert_eq!(
            put.body["reviewers"],
            json!([{"id": 3, "name": "asmith", "avatarUrl": "/users/asmith/avatar.png?s=32"}])
        );
    }
}

#[test]
fn payload_never_carries_links() {
    let mut model = DataModel::default();
    let jdoe = model.create_user(7, "jdoe");
    model.create_repo(RepoData::new("svc-a").condition(
        ConditionData::new("develop", "main").reviewers(vec![user(3, "asmith"), user(4, "bkim")]),
    ));
    let bb = model.bitbucket_model();

    let change = change(Action::Add, jdoe, &[strategy("develop", "main")]);
    apply_change(&bb, &bb, "PLAT", &model.repo_names(), &change).unwrap();

    let puts = bb.puts();
    let body = &puts[0].body;
    let reviewers = body["reviewers"].as_array().unwrap();
    assert_eq!(reviewers.len(), 3);
    for reviewer in reviewers {
        assert!(reviewer.get("links").is_none());
        let name = reviewer["name"].as_str().unwrap();
        assert_eq!(
            reviewer["avatarUrl"],
            format!("/users/{name}/avatar.png?s=32")
        );
    }
    let mut keys = body.as_object().unwrap().keys().cloned().collect::<Vec<_>>();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "requiredApprovals",
            "reviewers",
            "scope",
            "sourceMatcher",
            "targetMatcher"
        ]
    );
}

#[test]
fn unmatched_strategies_and_bare_repos_are_skipped() {
    let mut model = DataModel::default();
    let jdoe = model.create_user(7, "jdoe");
    model.create_repo(RepoData::new("svc-a").condition(ConditionData::new("develop", "main")));
    model.create_repo(RepoData::new("svc-b").condition(ConditionData::new("feature/*", "main")));
    model.create_repo(RepoData::new("svc-c"));
    let bb = model.bitbucket_model();

    let change = change(
        Action::Add,
        jdoe,
        &[strategy("develop", "main"), strategy("feature/*", "main")],
    );
    let summary = apply_change(&bb, &bb, "PLAT", &model.repo_names(), &change).unwrap();
    assert_eq!(
        summary,
        Summary {
            updated: 2,
            unchanged: 0,
            unmatched: 2,
        }
    );
    let touched = bb
        .puts()
        .iter()
        .map(|p| (p.repo.clone(), p.condition_id))
        .collect::<Vec<_>>();
    assert_eq!(
        touched,
        vec![("svc-a".to_string(), 1), ("svc-b".to_string(), 2)]
    );
}

#[test]
fn failure_stops_the_run() {
    let mut model = DataModel::default();
    let jdoe = model.create_user(7, "jdoe");
    for repo in ["svc-a", "svc-b", "svc-c"] {
        model.create_repo(RepoData::new(repo).condition(ConditionData::new("develop", "main")));
    }
    let mut bb = model.bitbucket_model();
    bb.fail_writes_to("svc-b");

    let change = change(Action::Add, jdoe, &[strategy("develop", "main")]);
    assert!(apply_change(&bb, &bb, "PLAT", &model.repo_names(), &change).is_err());

    assert_eq!(bb.reviewer_names("svc-a", 1), vec!["jdoe"]);
    assert!(bb.reviewer_names("svc-b", 2).is_empty());
    assert!(bb.reviewer_names("svc-c", 3).is_empty());
}

#[test]
fn diff_display() {
    let mut model = DataModel::default();
    let jdoe = model.create_user(7, "jdoe");
    model.create_repo(
        RepoData::new("svc-a")
            .condition(ConditionData::new("develop", "ANY_REF_MATCHER_ID"))
            .condition(ConditionData::new("main", "main").reviewers(vec![jdoe.clone()])),
    );
    model.create_repo(RepoData::new("svc-b"));
    let bb = model.bitbucket_model();

    let change = change(
        Action::Add,
        jdoe,
        &[
            strategy("develop", "ANY_REF_MATCHER_ID"),
            strategy("main", "main"),
            strategy("feature/*", "main"),
        ],
    );
    let diff = create_diff(&bb, "PLAT", "svc-a", &change).unwrap();
    assert!(!diff.is_noop());
    insta::assert_snapshot!(diff.to_string(), @r"
    📝 Editing repo 'svc-a':
      develop → Anywhere (condition 1): adding 'jdoe'
      main → main (condition 2): 'jdoe' is already a reviewer
      feature/* → main: no matching condition
    ");

    let diff = create_diff(&bb, "PLAT", "svc-b", &change).unwrap();
    assert!(diff.is_noop());
    insta::assert_snapshot!(diff.to_string(), @"✅ Repo 'svc-b' has no default reviewer conditions");
}

#[test]
fn removal_diff_display() {
    let mut model = DataModel::default();
    let jdoe = model.create_user(7, "jdoe");
    model.create_repo(
        RepoData::new("svc-a")
            .condition(ConditionData::new("develop", "main").reviewers(vec![jdoe.clone()]))
            .condition(ConditionData::new("release/*", "main")),
    );
    let bb = model.bitbucket_model();

    let change = change(
        Action::Remove,
        jdoe,
        &[strategy("develop", "main"), strategy("release/*", "main")],
    );
    let diff = create_diff(&bb, "PLAT", "svc-a", &change).unwrap();
    insta::assert_snapshot!(diff.to_string(), @r"
    📝 Editing repo 'svc-a':
      develop → main (condition 1): removing 'jdoe'
      release/* → main (condition 2): 'jdoe' is not a reviewer, writing back unchanged
    ");
}
