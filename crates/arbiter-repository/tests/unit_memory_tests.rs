//! Unit tests for the in-memory repository

use arbiter_core::{
    IterationState, Node, PublicationAction, ReviewMode, Rule, Scenario, ScenarioIteration,
};
use arbiter_core::types::{DataType, Field, Table};
use arbiter_core::DataModel;
use arbiter_repository::{
    DataModelRepository, MemoryRepository, PublicationRepository, RepositoryError,
    RepositorySnapshot, ScenarioRepository,
};
use chrono::Utc;
use std::sync::Arc;

fn scenario(id: &str) -> Scenario {
    Scenario {
        id: id.to_string(),
        organization_id: "org".to_string(),
        name: "High value transfers".to_string(),
        description: None,
        trigger_object_table: "transactions".to_string(),
        review_mode: ReviewMode::Review,
        created_at: Utc::now(),
    }
}

fn draft(id: &str, scenario_id: &str) -> ScenarioIteration {
    let now = Utc::now();
    ScenarioIteration {
        id: id.to_string(),
        organization_id: "org".to_string(),
        scenario_id: scenario_id.to_string(),
        version: None,
        state: IterationState::Draft,
        trigger_condition: Some(Node::constant(true)),
        rules: vec![Rule::new("r1", "always", Node::constant(true), 10)],
        score_review_threshold: Some(20),
        score_reject_threshold: Some(50),
        schedule: None,
        created_at: now,
        updated_at: now,
    }
}

async fn repository_with_committed(ids: &[&str]) -> MemoryRepository {
    let repo = MemoryRepository::new();
    repo.create_scenario(scenario("scn")).await.unwrap();
    for id in ids {
        let created = repo.create_iteration(draft(id, "scn")).await.unwrap();
        repo.commit_iteration("org", id, created.updated_at).await.unwrap();
    }
    repo
}

// =============================================================================
// Iterations
// =============================================================================

#[tokio::test]
async fn test_commit_assigns_increasing_versions() {
    let repo = repository_with_committed(&["a", "b"]).await;
    assert_eq!(repo.get_iteration("org", "a").await.unwrap().version, Some(1));
    assert_eq!(repo.get_iteration("org", "b").await.unwrap().version, Some(2));
}

#[tokio::test]
async fn test_double_commit_conflicts() {
    let repo = repository_with_committed(&["a"]).await;
    let committed = repo.get_iteration("org", "a").await.unwrap();
    let err = repo
        .commit_iteration("org", "a", committed.updated_at)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
}

#[tokio::test]
async fn test_committed_iteration_rejects_updates() {
    let repo = repository_with_committed(&["a"]).await;
    let before = repo.get_iteration("org", "a").await.unwrap();

    let mut edited = before.clone();
    edited.rules.clear();
    edited.trigger_condition = None;
    let err = repo.update_draft_iteration(edited).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    assert_eq!(repo.get_iteration("org", "a").await.unwrap(), before);
}

#[tokio::test]
async fn test_stale_draft_update_conflicts() {
    let repo = MemoryRepository::new();
    repo.create_scenario(scenario("scn")).await.unwrap();
    let created = repo.create_iteration(draft("a", "scn")).await.unwrap();

    let mut first = created.clone();
    first.score_review_threshold = Some(30);
    let updated = repo.update_draft_iteration(first).await.unwrap();
    assert!(updated.updated_at > created.updated_at);

    let mut second = created.clone();
    second.score_review_threshold = Some(40);
    let err = repo.update_draft_iteration(second).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    // Committing with the stale timestamp fails too
    let err = repo
        .commit_iteration("org", "a", created.updated_at)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
}

#[tokio::test]
async fn test_organization_scoping() {
    let repo = repository_with_committed(&["a"]).await;
    let err = repo.get_iteration("other-org", "a").await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { entity: "Iteration", .. }));
    assert!(repo.list_scenarios("other-org").await.unwrap().is_empty());
}

// =============================================================================
// Publication
// =============================================================================

#[tokio::test]
async fn test_publish_replaces_live_iteration() {
    let repo = repository_with_committed(&["a", "b"]).await;

    let first = repo.publish_iteration("org", "scn", "a").await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].action, PublicationAction::Publish);

    let second = repo.publish_iteration("org", "scn", "b").await.unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(second[0].action, PublicationAction::Unpublish);
    assert_eq!(second[0].iteration_id, "a");
    assert_eq!(second[1].action, PublicationAction::Publish);
    assert!(second[1].rank > second[0].rank);

    assert_eq!(
        repo.live_iteration_id("org", "scn").await.unwrap(),
        Some("b".to_string())
    );
    repo.verify_live_pointers().await.unwrap();
}

#[tokio::test]
async fn test_publish_preconditions() {
    let repo = repository_with_committed(&["a"]).await;
    repo.create_iteration(draft("d", "scn")).await.unwrap();

    let err = repo.publish_iteration("org", "scn", "d").await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    repo.publish_iteration("org", "scn", "a").await.unwrap();
    let err = repo.publish_iteration("org", "scn", "a").await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    assert_eq!(repo.list_publications("org", "scn").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unpublish() {
    let repo = repository_with_committed(&["a"]).await;
    let err = repo.unpublish_scenario("org", "scn").await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    repo.publish_iteration("org", "scn", "a").await.unwrap();
    let entry = repo.unpublish_scenario("org", "scn").await.unwrap();
    assert_eq!(entry.iteration_id, "a");
    assert_eq!(repo.live_iteration_id("org", "scn").await.unwrap(), None);
    repo.verify_live_pointers().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_publications_keep_one_live() {
    let ids = ["a", "b", "c", "d"];
    let repo = Arc::new(repository_with_committed(&ids).await);

    let mut handles = Vec::new();
    for round in 0..5 {
        for id in ids {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                if round % 2 == 0 {
                    let _ = repo.publish_iteration("org", "scn", id).await;
                } else {
                    let _ = repo.unpublish_scenario("org", "scn").await;
                }
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }

    repo.verify_live_pointers().await.unwrap();
    let log = repo.list_publications("org", "scn").await.unwrap();
    assert!(log.windows(2).all(|w| w[0].rank < w[1].rank));
}

// =============================================================================
// Data models
// =============================================================================

/// Tables written by hand omit the mandatory fields `Table::new` adds
fn model_without_mandatory_fields() -> DataModel {
    serde_yaml::from_str(
        r#"
tables:
  transactions:
    id: transactions
    name: transactions
    fields:
      amount:
        name: amount
        data_type: int
"#,
    )
    .unwrap()
}

#[tokio::test]
async fn test_save_data_model_validates_schema() {
    let repo = MemoryRepository::new();
    let err = repo
        .save_data_model("org", model_without_mandatory_fields())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidDataModel { .. }));
    assert!(err.to_string().contains("object_id"));
    assert!(repo.get_data_model("org").await.is_err());

    let valid = DataModel::new().with_table(
        Table::new("transactions").with_field(Field::new("amount", DataType::Int)),
    );
    repo.save_data_model("org", valid.clone()).await.unwrap();
    assert_eq!(repo.get_data_model("org").await.unwrap(), valid);
}

#[tokio::test]
async fn test_snapshot_rejects_invalid_data_model() {
    let mut snapshot = RepositorySnapshot::default();
    snapshot
        .data_models
        .insert("org".to_string(), model_without_mandatory_fields());

    assert!(matches!(
        MemoryRepository::from_snapshot(snapshot),
        Err(RepositoryError::InvalidDataModel { .. })
    ));
}

// =============================================================================
// Snapshots
// =============================================================================

#[tokio::test]
async fn test_snapshot_restores_live_pointer() {
    let repo = repository_with_committed(&["a", "b"]).await;
    repo.publish_iteration("org", "scn", "a").await.unwrap();
    repo.publish_iteration("org", "scn", "b").await.unwrap();

    let restored = MemoryRepository::from_snapshot(repo.snapshot().await).unwrap();
    assert_eq!(
        restored.live_iteration_id("org", "scn").await.unwrap(),
        Some("b".to_string())
    );

    // Ranks continue after the restored log
    restored.unpublish_scenario("org", "scn").await.unwrap();
    let log = restored.list_publications("org", "scn").await.unwrap();
    assert_eq!(log.len(), 4);
    assert!(log.windows(2).all(|w| w[0].rank < w[1].rank));
}

#[tokio::test]
async fn test_snapshot_rejects_orphan_iteration() {
    let snapshot = RepositorySnapshot {
        iterations: vec![draft("a", "missing")],
        ..RepositorySnapshot::default()
    };
    assert!(MemoryRepository::from_snapshot(snapshot).is_err());
}

#[tokio::test]
async fn test_snapshot_file_round_trip() {
    let repo = repository_with_committed(&["a"]).await;
    repo.publish_iteration("org", "scn", "a").await.unwrap();
    let snapshot = repo.snapshot().await;

    let dir = tempfile::tempdir().unwrap();
    for name in ["snapshot.json", "snapshot.yaml"] {
        let path = dir.path().join(name);
        snapshot.save(&path).await.unwrap();
        let loaded = RepositorySnapshot::load(&path).await.unwrap();
        assert_eq!(loaded, snapshot, "{name}");
    }
}
