//! Database models for experiments.
//!
//! Experiments are stored flat: the nested `impact`, `participants` and `duration` objects of
//! the wire format are individual columns here, and owners live in the `experiment_owners`
//! junction table.

use crate::db::models::users::UserDBResponse;
use crate::types::{ExperimentId, UserId};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_NAME: &str = "New Experiment";
pub const DEFAULT_STAGE: &str = "Discovery";
pub const DEFAULT_DEPARTMENT: &str = "Marketing";
pub const DEFAULT_ANALYSIS_TYPE: &str = "A/B Test";
pub const DEFAULT_PARTICIPANTS_TARGET: i64 = 30;
pub const DEFAULT_DURATION_WEEKS: i64 = 8;

/// Lifecycle state of an experiment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum ExperimentState {
    #[default]
    Running,
    Stopped,
    Completed,
    Archived,
}

/// How the experiment's stopping rule is designed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum ExperimentType {
    #[default]
    #[serde(rename = "Fixed Horizon")]
    #[sqlx(rename = "Fixed Horizon")]
    FixedHorizon,
    #[serde(rename = "Group Sequential")]
    #[sqlx(rename = "Group Sequential")]
    GroupSequential,
}

/// Externally assessed significance of the experiment's result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum Significance {
    Low,
    #[default]
    Medium,
    High,
}

/// Database request for creating a new experiment. Every field has the documented default.
#[derive(Debug, Clone, Builder)]
pub struct ExperimentCreateDBRequest {
    #[builder(into, default = DEFAULT_NAME.to_string())]
    pub name: String,
    #[builder(default)]
    pub state: ExperimentState,
    #[builder(default)]
    pub experiment_type: ExperimentType,
    #[builder(into, default = DEFAULT_STAGE.to_string())]
    pub stage: String,
    #[builder(into, default = DEFAULT_DEPARTMENT.to_string())]
    pub department: String,
    #[builder(default)]
    pub impact_value: f64,
    #[builder(default)]
    pub impact_positive_bound: f64,
    #[builder(default)]
    pub impact_negative_bound: f64,
    #[builder(default)]
    pub confidence: f64,
    #[builder(default)]
    pub progress: f64,
    #[builder(default)]
    pub participants_count: i64,
    #[builder(default = DEFAULT_PARTICIPANTS_TARGET)]
    pub participants_target: i64,
    #[builder(default)]
    pub sample_size_reached: bool,
    #[builder(default = DEFAULT_DURATION_WEEKS)]
    pub duration_weeks: i64,
    #[builder(default)]
    pub duration_days: i64,
    #[builder(default)]
    pub significance: Significance,
    #[builder(into, default = DEFAULT_ANALYSIS_TYPE.to_string())]
    pub analysis_type: String,
    #[builder(default)]
    pub boundaries_crossed: Vec<String>,
    /// Requested owners; ids that do not resolve to a user are dropped
    #[builder(default)]
    pub owner_ids: Vec<UserId>,
}

/// Database request for updating an experiment. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ExperimentUpdateDBRequest {
    pub name: Option<String>,
    pub state: Option<ExperimentState>,
    pub experiment_type: Option<ExperimentType>,
    pub stage: Option<String>,
    pub department: Option<String>,
    pub impact_value: Option<f64>,
    pub impact_positive_bound: Option<f64>,
    pub impact_negative_bound: Option<f64>,
    pub confidence: Option<f64>,
    pub progress: Option<f64>,
    pub participants_count: Option<i64>,
    pub participants_target: Option<i64>,
    pub sample_size_reached: Option<bool>,
    pub duration_weeks: Option<i64>,
    pub duration_days: Option<i64>,
    pub significance: Option<Significance>,
    pub analysis_type: Option<String>,
    pub boundaries_crossed: Option<Vec<String>>,
    /// Replaces the whole owner set when present (an empty list clears it)
    pub owner_ids: Option<Vec<UserId>>,
}

/// Database response for an experiment, with its owners resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentDBResponse {
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
    pub boundaries_crossed: Vec<String>,
    pub owners: Vec<UserDBResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
