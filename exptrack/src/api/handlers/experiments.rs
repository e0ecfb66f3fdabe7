use crate::api::models::experiments::{
    DeleteResponse, ExperimentCreate, ExperimentListResponse, ExperimentResponse, ExperimentUpdate, ListExperimentsQuery,
};
use crate::db::errors::DbError;
use crate::db::handlers::{Experiments, Repository, experiments::ExperimentFilter};
use crate::db::models::experiments::{ExperimentCreateDBRequest, ExperimentUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::{AppState, types::ExperimentId};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};

fn experiment_not_found(id: ExperimentId) -> Error {
    Error::NotFound {
        resource: "Experiment".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/experiments",
    tag = "experiments",
    summary = "List experiments",
    description = "Lists experiments newest first. Every supplied filter must match; `Any` or an empty value disables a filter.",
    params(ListExperimentsQuery),
    responses(
        (status = 200, description = "Matching experiments", body = ExperimentListResponse),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_experiments(
    State(state): State<AppState>,
    Query(query): Query<ListExperimentsQuery>,
) -> Result<Json<ExperimentListResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Experiments::new(&mut conn);

    let filter = ExperimentFilter::from(query);
    let experiments: Vec<ExperimentResponse> = repo.list(&filter).await?.into_iter().map(ExperimentResponse::from).collect();

    Ok(Json(ExperimentListResponse {
        total: experiments.len(),
        experiments,
    }))
}

#[utoipa::path(
    get,
    path = "/experiments/{id}",
    tag = "experiments",
    summary = "Get experiment",
    params(("id" = i64, Path, description = "Experiment ID")),
    responses(
        (status = 200, description = "Experiment details", body = ExperimentResponse),
        (status = 404, description = "Experiment not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_experiment(State(state): State<AppState>, Path(id): Path<ExperimentId>) -> Result<Json<ExperimentResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Experiments::new(&mut conn);

    match repo.get_by_id(id).await? {
        Some(experiment) => Ok(Json(ExperimentResponse::from(experiment))),
        None => Err(experiment_not_found(id)),
    }
}

#[utoipa::path(
    post,
    path = "/experiments",
    tag = "experiments",
    summary = "Create experiment",
    description = "Creates an experiment. Omitted fields take their defaults; owner ids that match no user are ignored.",
    request_body = ExperimentCreate,
    responses(
        (status = 201, description = "Experiment created", body = ExperimentResponse),
        (status = 400, description = "Malformed body or invalid field value"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_experiment(
    State(state): State<AppState>,
    body: std::result::Result<Json<ExperimentCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<ExperimentResponse>)> {
    let Json(create) = body?;
    create.validate()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Experiments::new(&mut conn);

    let experiment = repo.create(&ExperimentCreateDBRequest::from(create)).await?;
    tracing::info!(id = experiment.id, name = %experiment.name, "Created experiment");

    Ok((StatusCode::CREATED, Json(ExperimentResponse::from(experiment))))
}

#[utoipa::path(
    put,
    path = "/experiments/{id}",
    tag = "experiments",
    summary = "Update experiment",
    description = "Partially updates an experiment. Only keys present in the body change, nested objects merge key-by-key, and `owners` replaces the whole owner set.",
    params(("id" = i64, Path, description = "Experiment ID")),
    request_body = ExperimentUpdate,
    responses(
        (status = 200, description = "Experiment updated", body = ExperimentResponse),
        (status = 400, description = "Malformed body or invalid field value"),
        (status = 404, description = "Experiment not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_experiment(
    State(state): State<AppState>,
    Path(id): Path<ExperimentId>,
    body: std::result::Result<Json<ExperimentUpdate>, JsonRejection>,
) -> Result<Json<ExperimentResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Experiments::new(&mut conn);

    // An unknown id is reported before anything about the body
    if repo.get_by_id(id).await?.is_none() {
        return Err(experiment_not_found(id));
    }

    let Json(update) = body?;
    update.validate()?;

    match repo.update(id, &ExperimentUpdateDBRequest::from(update)).await {
        Ok(experiment) => Ok(Json(ExperimentResponse::from(experiment))),
        Err(DbError::NotFound) => Err(experiment_not_found(id)),
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    delete,
    path = "/experiments/{id}",
    tag = "experiments",
    summary = "Delete experiment",
    params(("id" = i64, Path, description = "Experiment ID")),
    responses(
        (status = 200, description = "Experiment deleted", body = DeleteResponse),
        (status = 404, description = "Experiment not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_experiment(State(state): State<AppState>, Path(id): Path<ExperimentId>) -> Result<Json<DeleteResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Experiments::new(&mut conn);

    if !repo.delete(id).await? {
        return Err(experiment_not_found(id));
    }
    tracing::info!(id, "Deleted experiment");

    Ok(Json(DeleteResponse {
        message: "Experiment deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::models::experiments::{ExperimentListResponse, ExperimentResponse};
    use crate::test_utils::{create_test_app, create_test_experiment, create_test_user};
    use serde_json::json;
    use sqlx::SqlitePool;
    use std::time::Duration;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_applies_defaults(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let response = server
            .post("/api/experiments")
            .json(&json!({ "name": "Test A", "experimentType": "Fixed Horizon", "confidence": 90 }))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["name"], "Test A");
        assert_eq!(body["state"], "Running");
        assert_eq!(body["experimentType"], "Fixed Horizon");
        assert_eq!(body["stage"], "Discovery");
        assert_eq!(body["department"], "Marketing");
        assert_eq!(body["participants"]["target"], 30);
        assert_eq!(body["participants"]["sampleSizeReached"], false);
        assert_eq!(body["confidence"].as_f64(), Some(90.0));
        assert_eq!(body["duration"]["weeks"], 8);
        assert_eq!(body["significance"], "Medium");
        assert_eq!(body["analysisType"], "A/B Test");
        assert_eq!(body["boundariesCrossed"], json!([]));
        assert_eq!(body["owners"], json!([]));

        // What was returned is what is stored
        let id = body["id"].as_i64().unwrap();
        let fetched: serde_json::Value = server.get(&format!("/api/experiments/{id}")).await.json();
        assert_eq!(fetched, body);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_with_empty_body_uses_all_defaults(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let response = server.post("/api/experiments").json(&json!({})).await;

        response.assert_status(axum::http::StatusCode::CREATED);
        let experiment: ExperimentResponse = response.json();
        assert_eq!(experiment.name, "New Experiment");
        assert_eq!(experiment.impact.value, 0.0);
        assert_eq!(experiment.progress, 0.0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_rejects_bad_input(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let malformed = server
            .post("/api/experiments")
            .bytes("{not json".into())
            .content_type("application/json")
            .await;
        malformed.assert_status_bad_request();

        let bad_enum = server.post("/api/experiments").json(&json!({ "state": "Paused" })).await;
        bad_enum.assert_status_bad_request();

        let wrong_type = server.post("/api/experiments").json(&json!({ "confidence": "high" })).await;
        wrong_type.assert_status_bad_request();

        let out_of_range = server.post("/api/experiments").json(&json!({ "confidence": 150 })).await;
        out_of_range.assert_status_bad_request();

        let blank_name = server.post("/api/experiments").json(&json!({ "name": "  " })).await;
        blank_name.assert_status_bad_request();

        // Nothing was written
        let list: ExperimentListResponse = server.get("/api/experiments").await.json();
        assert_eq!(list.total, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_with_owners_drops_unknown_ids(pool: SqlitePool) {
        let maya = create_test_user(&pool, "Maya Patel", "maya@example.com").await;
        let server = create_test_app(pool).await;

        let response = server
            .post("/api/experiments")
            .json(&json!({ "name": "Owned", "owners": [maya.id, 9999] }))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        let owners = body["owners"].as_array().unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0]["id"], maya.id);
        assert_eq!(owners[0]["name"], "Maya Patel");
        // Owners keep snake_case keys
        assert!(owners[0].get("profile_picture").is_some());
        assert!(owners[0].get("created_at").is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_unknown_experiment_is_404(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        server.get("/api/experiments/424242").await.assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_merges_nested_objects(pool: SqlitePool) {
        let created = create_test_experiment(
            &pool,
            json!({
                "name": "Merge Me",
                "impact": { "value": 1.0, "positiveBound": 2.0, "negativeBound": -1.0 },
                "participants": { "count": 10, "target": 50 },
                "confidence": 70
            }),
        )
        .await;
        let server = create_test_app(pool).await;

        tokio::time::sleep(Duration::from_millis(10)).await;

        let response = server
            .put(&format!("/api/experiments/{}", created.id))
            .json(&json!({ "impact": { "value": 3.5 } }))
            .await;

        response.assert_status_ok();
        let updated: ExperimentResponse = response.json();
        assert_eq!(updated.impact.value, 3.5);
        assert_eq!(updated.impact.positive_bound, 2.0);
        assert_eq!(updated.impact.negative_bound, -1.0);
        assert_eq!(updated.participants.count, 10);
        assert_eq!(updated.participants.target, 50);
        assert_eq!(updated.confidence, 70.0);
        assert_eq!(updated.name, "Merge Me");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_owners_replaces_and_clears(pool: SqlitePool) {
        let a = create_test_user(&pool, "Ann", "ann@example.com").await;
        let b = create_test_user(&pool, "Bob", "bob@example.com").await;
        let created = create_test_experiment(&pool, json!({ "name": "Owners", "owners": [a.id] })).await;
        let server = create_test_app(pool).await;
        let path = format!("/api/experiments/{}", created.id);

        let replaced: ExperimentResponse = server.put(&path).json(&json!({ "owners": [b.id, a.id] })).await.json();
        let ids: Vec<i64> = replaced.owners.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);

        // Updating something else leaves owners alone
        let renamed: ExperimentResponse = server.put(&path).json(&json!({ "name": "Renamed" })).await.json();
        assert_eq!(renamed.owners.len(), 2);

        let cleared: ExperimentResponse = server.put(&path).json(&json!({ "owners": [] })).await.json();
        assert!(cleared.owners.is_empty());

        let fetched: ExperimentResponse = server.get(&path).await.json();
        assert!(fetched.owners.is_empty());
        assert_eq!(fetched.name, "Renamed");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_boundaries_replaces_list(pool: SqlitePool) {
        let created = create_test_experiment(&pool, json!({ "boundariesCrossed": ["Futility"] })).await;
        let server = create_test_app(pool).await;

        let updated: ExperimentResponse = server
            .put(&format!("/api/experiments/{}", created.id))
            .json(&json!({ "boundariesCrossed": ["Efficacy", "Harm, severe"] }))
            .await
            .json();

        assert_eq!(updated.boundaries_crossed, vec!["Efficacy".to_string(), "Harm, severe".to_string()]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_errors(pool: SqlitePool) {
        let created = create_test_experiment(&pool, json!({ "name": "Stable", "progress": 20 })).await;
        let server = create_test_app(pool).await;

        server
            .put("/api/experiments/424242")
            .json(&json!({ "name": "Ghost" }))
            .await
            .assert_status_not_found();

        server
            .put("/api/experiments/424242")
            .json(&json!({ "progress": 150 }))
            .await
            .assert_status_not_found();

        server
            .put("/api/experiments/424242")
            .bytes("{not json".into())
            .content_type("application/json")
            .await
            .assert_status_not_found();

        server
            .put(&format!("/api/experiments/{}", created.id))
            .json(&json!({ "progress": 101 }))
            .await
            .assert_status_bad_request();

        server
            .put(&format!("/api/experiments/{}", created.id))
            .json(&json!({ "significance": "Huge" }))
            .await
            .assert_status_bad_request();

        let unchanged: ExperimentResponse = server.get(&format!("/api/experiments/{}", created.id)).await.json();
        assert_eq!(unchanged.progress, 20.0);
        assert_eq!(unchanged.updated_at, created.updated_at);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_is_not_repeatable(pool: SqlitePool) {
        let owner = create_test_user(&pool, "Owner", "owner@example.com").await;
        let keep = create_test_experiment(&pool, json!({ "name": "Keep", "owners": [owner.id] })).await;
        let gone = create_test_experiment(&pool, json!({ "name": "Gone", "owners": [owner.id] })).await;
        let server = create_test_app(pool).await;

        let response = server.delete(&format!("/api/experiments/{}", gone.id)).await;
        response.assert_status_ok();
        response.assert_json(&json!({ "message": "Experiment deleted successfully" }));

        server
            .delete(&format!("/api/experiments/{}", gone.id))
            .await
            .assert_status_not_found();
        server.get(&format!("/api/experiments/{}", gone.id)).await.assert_status_not_found();

        // The second delete changed nothing
        let list: ExperimentListResponse = server.get("/api/experiments").await.json();
        assert_eq!(list.total, 1);
        assert_eq!(list.experiments[0].id, keep.id);
        assert_eq!(list.experiments[0].owners.len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_and_any_sentinel(pool: SqlitePool) {
        let owner = create_test_user(&pool, "Owner", "owner@example.com").await;
        for body in [
            json!({ "name": "Sales High", "department": "Sales", "significance": "High", "owners": [owner.id] }),
            json!({ "name": "Sales Low", "department": "Sales", "significance": "Low" }),
            json!({ "name": "Ops High", "department": "Operations", "significance": "High", "analysisType": "Feature Flag" }),
        ] {
            create_test_experiment(&pool, body).await;
        }
        let server = create_test_app(pool).await;

        let everything: ExperimentListResponse = server.get("/api/experiments").await.json();
        assert_eq!(everything.total, 3);
        assert_eq!(everything.experiments.len(), 3);

        let with_any: ExperimentListResponse = server
            .get("/api/experiments?state=Any&significance=Any&owner=Any&analysisType=Any&stage=Any&department=Any")
            .await
            .json();
        assert_eq!(with_any.experiments, everything.experiments);

        let sales_high: ExperimentListResponse = server
            .get("/api/experiments")
            .add_query_param("department", "Sales")
            .add_query_param("significance", "High")
            .await
            .json();
        assert_eq!(sales_high.total, 1);
        assert_eq!(sales_high.experiments[0].name, "Sales High");

        let by_owner: ExperimentListResponse = server
            .get("/api/experiments")
            .add_query_param("owner", owner.id)
            .await
            .json();
        assert_eq!(by_owner.total, 1);
        assert_eq!(by_owner.experiments[0].name, "Sales High");

        let bad_owner: ExperimentListResponse = server.get("/api/experiments?owner=nobody").await.json();
        assert_eq!(bad_owner.total, 0);

        let flags: ExperimentListResponse = server
            .get("/api/experiments")
            .add_query_param("analysisType", "Feature Flag")
            .await
            .json();
        assert_eq!(flags.total, 1);

        let search: ExperimentListResponse = server.get("/api/experiments?search=sales").await.json();
        assert_eq!(search.total, 2);

        let empty_search: ExperimentListResponse = server.get("/api/experiments?search=").await.json();
        assert_eq!(empty_search.total, 3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_is_newest_first(pool: SqlitePool) {
        for name in ["oldest", "middle", "newest"] {
            create_test_experiment(&pool, json!({ "name": name })).await;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let server = create_test_app(pool).await;

        let list: ExperimentListResponse = server.get("/api/experiments").await.json();
        let names: Vec<&str> = list.experiments.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["newest", "middle", "oldest"]);
    }
}
