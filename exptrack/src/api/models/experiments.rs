//! API request/response models for experiments.
//!
//! On the wire an experiment groups its metrics into nested `impact`, `participants` and
//! `duration` objects and uses camelCase keys. Inbound nested objects are read key-by-key, so a
//! body may carry only some of a nested object's keys.

use crate::api::models::users::UserResponse;
use crate::db::handlers::experiments::ExperimentFilter;
use crate::db::models::experiments::{
    ExperimentCreateDBRequest, ExperimentDBResponse, ExperimentState, ExperimentType, ExperimentUpdateDBRequest, Significance,
};
use crate::errors::{Error, Result};
use crate::types::{ANY_SENTINEL, ExperimentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Inbound impact metrics. Absent keys keep their default (create) or current value (update).
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImpactInput {
    #[schema(example = 3.2)]
    pub value: Option<f64>,
    #[schema(example = 4.5)]
    pub positive_bound: Option<f64>,
    #[schema(example = 1.8)]
    pub negative_bound: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsInput {
    pub count: Option<i64>,
    pub target: Option<i64>,
    /// Set by the caller; never derived from count and target
    pub sample_size_reached: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DurationInput {
    pub weeks: Option<i64>,
    pub days: Option<i64>,
}

/// Request body for creating an experiment. Every field is optional and falls back to a fixed
/// default; `null` is treated the same as an absent key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentCreate {
    #[schema(example = "Checkout Button Color")]
    pub name: Option<String>,
    pub state: Option<ExperimentState>,
    pub experiment_type: Option<ExperimentType>,
    #[schema(example = "Discovery")]
    pub stage: Option<String>,
    #[schema(example = "Marketing")]
    pub department: Option<String>,
    pub impact: Option<ImpactInput>,
    #[schema(example = 90.0)]
    pub confidence: Option<f64>,
    #[schema(example = 40.0)]
    pub progress: Option<f64>,
    pub participants: Option<ParticipantsInput>,
    pub duration: Option<DurationInput>,
    pub significance: Option<Significance>,
    #[schema(example = "A/B Test")]
    pub analysis_type: Option<String>,
    pub boundaries_crossed: Option<Vec<String>>,
    /// User ids; ids that do not match a user are ignored
    pub owners: Option<Vec<UserId>>,
}

/// Request body for a partial update. Only keys that are present change; nested objects merge
/// key-by-key and `owners`, when present, replaces the whole owner set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentUpdate {
    pub name: Option<String>,
    pub state: Option<ExperimentState>,
    pub experiment_type: Option<ExperimentType>,
    pub stage: Option<String>,
    pub department: Option<String>,
    pub impact: Option<ImpactInput>,
    pub confidence: Option<f64>,
    pub progress: Option<f64>,
    pub participants: Option<ParticipantsInput>,
    pub duration: Option<DurationInput>,
    pub significance: Option<Significance>,
    pub analysis_type: Option<String>,
    pub boundaries_crossed: Option<Vec<String>>,
    /// Replacement owner set; `[]` removes every owner
    pub owners: Option<Vec<UserId>>,
}

fn validate_name(name: Option<&str>) -> Result<()> {
    if name.is_some_and(|name| name.trim().is_empty()) {
        return Err(Error::BadRequest {
            message: "Experiment name must not be blank".to_string(),
        });
    }
    Ok(())
}

fn validate_percentage(field: &str, value: Option<f64>) -> Result<()> {
    if value.is_some_and(|value| !(0.0..=100.0).contains(&value)) {
        return Err(Error::BadRequest {
            message: format!("{field} must be between 0 and 100"),
        });
    }
    Ok(())
}

impl ExperimentCreate {
    pub fn validate(&self) -> Result<()> {
        validate_name(self.name.as_deref())?;
        validate_percentage("confidence", self.confidence)?;
        validate_percentage("progress", self.progress)
    }
}

impl ExperimentUpdate {
    pub fn validate(&self) -> Result<()> {
        validate_name(self.name.as_deref())?;
        validate_percentage("confidence", self.confidence)?;
        validate_percentage("progress", self.progress)
    }
}

impl From<ExperimentCreate> for ExperimentCreateDBRequest {
    fn from(create: ExperimentCreate) -> Self {
        let impact = create.impact.unwrap_or_default();
        let participants = create.participants.unwrap_or_default();
        let duration = create.duration.unwrap_or_default();

        ExperimentCreateDBRequest::builder()
            .maybe_name(create.name)
            .maybe_state(create.state)
            .maybe_experiment_type(create.experiment_type)
            .maybe_stage(create.stage)
            .maybe_department(create.department)
            .maybe_impact_value(impact.value)
            .maybe_impact_positive_bound(impact.positive_bound)
            .maybe_impact_negative_bound(impact.negative_bound)
            .maybe_confidence(create.confidence)
            .maybe_progress(create.progress)
            .maybe_participants_count(participants.count)
            .maybe_participants_target(participants.target)
            .maybe_sample_size_reached(participants.sample_size_reached)
            .maybe_duration_weeks(duration.weeks)
            .maybe_duration_days(duration.days)
            .maybe_significance(create.significance)
            .maybe_analysis_type(create.analysis_type)
            .maybe_boundaries_crossed(create.boundaries_crossed)
            .maybe_owner_ids(create.owners)
            .build()
    }
}

impl From<ExperimentUpdate> for ExperimentUpdateDBRequest {
    fn from(update: ExperimentUpdate) -> Self {
        let impact = update.impact.unwrap_or_default();
        let participants = update.participants.unwrap_or_default();
        let duration = update.duration.unwrap_or_default();

        Self {
            name: update.name,
            state: update.state,
            experiment_type: update.experiment_type,
            stage: update.stage,
            department: update.department,
            impact_value: impact.value,
            impact_positive_bound: impact.positive_bound,
            impact_negative_bound: impact.negative_bound,
            confidence: update.confidence,
            progress: update.progress,
            participants_count: participants.count,
            participants_target: participants.target,
            sample_size_reached: participants.sample_size_reached,
            duration_weeks: duration.weeks,
            duration_days: duration.days,
            significance: update.significance,
            analysis_type: update.analysis_type,
            boundaries_crossed: update.boundaries_crossed,
            owner_ids: update.owners,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImpactResponse {
    pub value: f64,
    pub positive_bound: f64,
    pub negative_bound: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsResponse {
    pub count: i64,
    pub target: i64,
    pub sample_size_reached: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DurationResponse {
    pub weeks: i64,
    pub days: i64,
}

/// Full experiment details returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentResponse {
    pub id: ExperimentId,
    pub name: String,
    pub state: ExperimentState,
    pub experiment_type: ExperimentType,
    pub stage: String,
    pub department: String,
    pub impact: ImpactResponse,
    pub confidence: f64,
    pub progress: f64,
    pub participants: ParticipantsResponse,
    pub duration: DurationResponse,
    pub significance: Significance,
    pub analysis_type: String,
    pub boundaries_crossed: Vec<String>,
    pub owners: Vec<UserResponse>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ExperimentDBResponse> for ExperimentResponse {
    fn from(db: ExperimentDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            state: db.state,
            experiment_type: db.experiment_type,
            stage: db.stage,
            department: db.department,
            impact: ImpactResponse {
                value: db.impact_value,
                positive_bound: db.impact_positive_bound,
                negative_bound: db.impact_negative_bound,
            },
            confidence: db.confidence,
            progress: db.progress,
            participants: ParticipantsResponse {
                count: db.participants_count,
                target: db.participants_target,
                sample_size_reached: db.sample_size_reached,
            },
            duration: DurationResponse {
                weeks: db.duration_weeks,
                days: db.duration_days,
            },
            significance: db.significance,
            analysis_type: db.analysis_type,
            boundaries_crossed: db.boundaries_crossed,
            owners: db.owners.into_iter().map(UserResponse::from).collect(),
            created_at: Some(db.created_at),
            updated_at: Some(db.updated_at),
        }
    }
}

/// Query parameters for listing experiments. `"Any"` or an empty value disables a filter.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ListExperimentsQuery {
    /// Exact state, e.g. `Running`
    pub state: Option<String>,
    /// Exact significance, e.g. `High`
    pub significance: Option<String>,
    /// Id of a user who must be among the owners
    pub owner: Option<String>,
    /// Exact analysis type, e.g. `A/B Test`
    pub analysis_type: Option<String>,
    pub stage: Option<String>,
    pub department: Option<String>,
    /// Case-insensitive substring of the experiment name
    pub search: Option<String>,
}

fn active(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty() && v != ANY_SENTINEL)
}

impl From<ListExperimentsQuery> for ExperimentFilter {
    fn from(query: ListExperimentsQuery) -> Self {
        Self {
            state: active(query.state),
            significance: active(query.significance),
            owner: active(query.owner),
            analysis_type: active(query.analysis_type),
            stage: active(query.stage),
            department: active(query.department),
            // "Any" is a legitimate search term
            search: query.search.filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExperimentListResponse {
    pub experiments: Vec<ExperimentResponse>,
    /// Number of experiments in `experiments`
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    #[schema(example = "Experiment deleted successfully")]
    pub message: String,
}
