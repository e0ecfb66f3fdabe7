//! Database repository for experiments and their owners.
//!
//! Ownership is an explicit junction table (`experiment_owners`). Owners are read back in the
//! order their association rows were written, and writes resolve requested user ids against
//! `users` inside the same statement so that unknown ids are dropped rather than rejected.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::{
        experiments::{ExperimentCreateDBRequest, ExperimentDBResponse, ExperimentState, ExperimentType, ExperimentUpdateDBRequest, Significance},
        users::UserDBResponse,
    },
};
use crate::types::{ExperimentId, UserId};
use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, QueryBuilder, Sqlite, SqliteConnection, types::Json};
use std::collections::{HashMap, HashSet};
use tracing::instrument;

/// Filter for listing experiments.
///
/// Every field is an exact-match predicate except `search`, which is a case-insensitive
/// substring match on the name. `None` means "no filter"; all present filters are ANDed.
#[derive(Debug, Clone, Default)]
pub struct ExperimentFilter {
    pub state: Option<String>,
    pub significance: Option<String>,
    /// Raw owner id; a value that is not an integer matches nothing
    pub owner: Option<String>,
    pub analysis_type: Option<String>,
    pub stage: Option<String>,
    pub department: Option<String>,
    pub search: Option<String>,
}

impl ExperimentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_significance(mut self, significance: impl Into<String>) -> Self {
        self.significance = Some(significance.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_analysis_type(mut self, analysis_type: impl Into<String>) -> Self {
        self.analysis_type = Some(analysis_type.into());
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Append this filter's predicates to a query that already ends in a WHERE clause
    fn push_predicates(&self, query: &mut QueryBuilder<'_, Sqlite>) {
        let exact = [
            ("e.state", &self.state),
            ("e.significance", &self.significance),
            ("e.analysis_type", &self.analysis_type),
            ("e.stage", &self.stage),
            ("e.department", &self.department),
        ];
        for (column, value) in exact {
            if let Some(value) = value {
                query.push(format!(" AND {column} = "));
                query.push_bind(value.clone());
            }
        }

        if let Some(owner) = &self.owner {
            match owner.parse::<UserId>() {
                Ok(owner_id) => {
                    query.push(" AND EXISTS (SELECT 1 FROM experiment_owners eo WHERE eo.experiment_id = e.id AND eo.user_id = ");
                    query.push_bind(owner_id);
                    query.push(")");
                }
                Err(_) => {
                    query.push(" AND 0");
                }
            }
        }

        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            // Both sides go through SQLite's LOWER so they fold identically
            let pattern = format!("%{}%", escape_like(search));
            query.push(" AND LOWER(e.name) LIKE LOWER(");
            query.push_bind(pattern);
            query.push(") ESCAPE '\\'");
        }
    }
}

/// Escape LIKE wildcards so the search term matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Experiment {
    pub id: ExperimentId,
    pub name: String,
    pub state: ExperimentState,
    pub experiment_type: ExperimentType,
    pub stage: String,
    pub department: String,
    pub impact_value: f64,
    pub impact_positive_bound: f64,
    pub impact_negative_bound: f64,
    pub confidence: f64,
    pub progress: f64,
    pub participants_count: i64,
    pub participants_target: i64,
    pub sample_size_reached: bool,
    pub duration_weeks: i64,
    pub duration_days: i64,
    pub significance: Significance,
    pub analysis_type: String,
    pub boundaries_crossed: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// One owner of one experiment, as produced by the junction join
#[derive(Debug, Clone, FromRow)]
struct OwnerRow {
    pub experiment_id: ExperimentId,
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub department: String,
    pub profile_picture: String,
    pub created_at: DateTime<Utc>,
}

impl From<OwnerRow> for UserDBResponse {
    fn from(row: OwnerRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            department: row.department,
            profile_picture: row.profile_picture,
            created_at: row.created_at,
        }
    }
}

impl From<(Experiment, Vec<UserDBResponse>)> for ExperimentDBResponse {
    fn from((e, owners): (Experiment, Vec<UserDBResponse>)) -> Self {
        Self {
            id: e.id,
            name: e.name,
            state: e.state,
            experiment_type: e.experiment_type,
            stage: e.stage,
            department: e.department,
            impact_value: e.impact_value,
            impact_positive_bound: e.impact_positive_bound,
            impact_negative_bound: e.impact_negative_bound,
            confidence: e.confidence,
            progress: e.progress,
            participants_count: e.participants_count,
            participants_target: e.participants_target,
            sample_size_reached: e.sample_size_reached,
            duration_weeks: e.duration_weeks,
            duration_days: e.duration_days,
            significance: e.significance,
            analysis_type: e.analysis_type,
            boundaries_crossed: e.boundaries_crossed.0,
            owners,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

/// Load owners for a set of experiments, keyed by experiment id.
/// Experiments without owners are absent from the map.
async fn load_owners(db: &mut SqliteConnection, ids: &[ExperimentId]) -> Result<HashMap<ExperimentId, Vec<UserDBResponse>>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT eo.experiment_id, u.id, u.name, u.email, u.department, u.profile_picture, u.created_at \
         FROM experiment_owners eo JOIN users u ON u.id = eo.user_id WHERE eo.experiment_id IN (",
    );
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY eo.rowid");

    let rows = query.build_query_as::<OwnerRow>().fetch_all(&mut *db).await?;

    let mut owners: HashMap<ExperimentId, Vec<UserDBResponse>> = HashMap::new();
    for row in rows {
        owners.entry(row.experiment_id).or_default().push(UserDBResponse::from(row));
    }
    Ok(owners)
}

/// Attach owners to experiment rows, preserving row order
async fn with_owners(db: &mut SqliteConnection, experiments: Vec<Experiment>) -> Result<Vec<ExperimentDBResponse>> {
    let ids: Vec<ExperimentId> = experiments.iter().map(|e| e.id).collect();
    let mut owners = load_owners(db, &ids).await?;

    Ok(experiments
        .into_iter()
        .map(|e| {
            let experiment_owners = owners.remove(&e.id).unwrap_or_default();
            ExperimentDBResponse::from((e, experiment_owners))
        })
        .collect())
}

async fn fetch_experiment(db: &mut SqliteConnection, id: ExperimentId) -> Result<Option<ExperimentDBResponse>> {
    let experiment = sqlx::query_as::<_, Experiment>("SELECT * FROM experiments WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *db)
        .await?;

    match experiment {
        Some(experiment) => Ok(with_owners(db, vec![experiment]).await?.pop()),
        None => Ok(None),
    }
}

/// Replace the owner set of an experiment. Unknown user ids and duplicates are skipped.
async fn replace_owners(db: &mut SqliteConnection, id: ExperimentId, owner_ids: &[UserId]) -> Result<()> {
    sqlx::query("DELETE FROM experiment_owners WHERE experiment_id = ?")
        .bind(id)
        .execute(&mut *db)
        .await?;

    let mut seen = HashSet::new();
    for owner_id in owner_ids.iter().filter(|owner_id| seen.insert(**owner_id)) {
        let inserted = sqlx::query("INSERT INTO experiment_owners (experiment_id, user_id) SELECT ?, id FROM users WHERE id = ?")
            .bind(id)
            .bind(*owner_id)
            .execute(&mut *db)
            .await?;

        if inserted.rows_affected() == 0 {
            tracing::debug!(experiment_id = id, owner_id, "Dropping unknown owner id");
        }
    }
    Ok(())
}

pub struct Experiments<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Experiments<'c> {
    type CreateRequest = ExperimentCreateDBRequest;
    type UpdateRequest = ExperimentUpdateDBRequest;
    type Response = ExperimentDBResponse;
    type Id = ExperimentId;
    type Filter = ExperimentFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        // The experiment row and its owner rows commit together
        let mut tx = self.db.begin().await?;

        let id: ExperimentId = sqlx::query_scalar(
            r#"
            INSERT INTO experiments (
                name, state, experiment_type, stage, department,
                impact_value, impact_positive_bound, impact_negative_bound,
                confidence, progress,
                participants_count, participants_target, sample_size_reached,
                duration_weeks, duration_days,
                significance, analysis_type, boundaries_crossed
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&request.name)
        .bind(request.state)
        .bind(request.experiment_type)
        .bind(&request.stage)
        .bind(&request.department)
        .bind(request.impact_value)
        .bind(request.impact_positive_bound)
        .bind(request.impact_negative_bound)
        .bind(request.confidence)
        .bind(request.progress)
        .bind(request.participants_count)
        .bind(request.participants_target)
        .bind(request.sample_size_reached)
        .bind(request.duration_weeks)
        .bind(request.duration_days)
        .bind(request.significance)
        .bind(&request.analysis_type)
        .bind(Json(&request.boundaries_crossed))
        .fetch_one(&mut *tx)
        .await?;

        replace_owners(&mut tx, id, &request.owner_ids).await?;

        let experiment = fetch_experiment(&mut tx, id).await?.ok_or(DbError::NotFound)?;

        tx.commit().await?;

        Ok(experiment)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let mut tx = self.db.begin().await?;
        let experiment = fetch_experiment(&mut tx, id).await?;
        // Read-only, but commit to release the transaction cleanly
        tx.commit().await?;

        Ok(experiment)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut tx = self.db.begin().await?;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM experiments WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in &ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let experiments = query.build_query_as::<Experiment>().fetch_all(&mut *tx).await?;
        let experiments = with_owners(&mut tx, experiments).await?;

        tx.commit().await?;

        Ok(experiments.into_iter().map(|e| (e.id, e)).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut tx = self.db.begin().await?;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT e.* FROM experiments e WHERE 1=1");
        filter.push_predicates(&mut query);
        // Newest first; rows created in the same instant keep insertion order
        query.push(" ORDER BY e.created_at DESC, e.id ASC");

        tracing::debug!("Executing SQL: {}", query.sql());

        let experiments = query.build_query_as::<Experiment>().fetch_all(&mut *tx).await?;
        let experiments = with_owners(&mut tx, experiments).await?;

        tx.commit().await?;

        tracing::debug!("Retrieved {} experiments", experiments.len());

        Ok(experiments)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM experiment_owners WHERE experiment_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM experiments WHERE id = ?").bind(id).execute(&mut *tx).await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Writing first takes SQLite's write lock, so concurrent owner replacements serialize
        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE experiments SET
                name = COALESCE(?, name),
                state = COALESCE(?, state),
                experiment_type = COALESCE(?, experiment_type),
                stage = COALESCE(?, stage),
                department = COALESCE(?, department),
                impact_value = COALESCE(?, impact_value),
                impact_positive_bound = COALESCE(?, impact_positive_bound),
                impact_negative_bound = COALESCE(?, impact_negative_bound),
                confidence = COALESCE(?, confidence),
                progress = COALESCE(?, progress),
                participants_count = COALESCE(?, participants_count),
                participants_target = COALESCE(?, participants_target),
                sample_size_reached = COALESCE(?, sample_size_reached),
                duration_weeks = COALESCE(?, duration_weeks),
                duration_days = COALESCE(?, duration_days),
                significance = COALESCE(?, significance),
                analysis_type = COALESCE(?, analysis_type),
                boundaries_crossed = COALESCE(?, boundaries_crossed),
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ?
            "#,
        )
        .bind(&request.name)
        .bind(request.state)
        .bind(request.experiment_type)
        .bind(&request.stage)
        .bind(&request.department)
        .bind(request.impact_value)
        .bind(request.impact_positive_bound)
        .bind(request.impact_negative_bound)
        .bind(request.confidence)
        .bind(request.progress)
        .bind(request.participants_count)
        .bind(request.participants_target)
        .bind(request.sample_size_reached)
        .bind(request.duration_weeks)
        .bind(request.duration_days)
        .bind(request.significance)
        .bind(&request.analysis_type)
        .bind(request.boundaries_crossed.as_ref().map(Json))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        if let Some(owner_ids) = &request.owner_ids {
            replace_owners(&mut tx, id, owner_ids).await?;
        }

        let experiment = fetch_experiment(&mut tx, id).await?.ok_or(DbError::NotFound)?;

        tx.commit().await?;

        Ok(experiment)
    }
}

impl<'c> Experiments<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Owners of one experiment, in association order
    #[instrument(skip(self), err)]
    pub async fn owners_of(&mut self, id: ExperimentId) -> Result<Vec<UserDBResponse>> {
        Ok(load_owners(&mut *self.db, &[id]).await?.remove(&id).unwrap_or_default())
    }

    /// Experiments owned by a user, newest first
    #[instrument(skip(self), err)]
    pub async fn owned_by(&mut self, user_id: UserId) -> Result<Vec<ExperimentDBResponse>> {
        self.list(&ExperimentFilter::new().with_owner(user_id.to_string())).await
    }
}
