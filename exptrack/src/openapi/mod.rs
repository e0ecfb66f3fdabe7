//! OpenAPI documentation for the JSON API at `/api/*`.
//!
//! The generated document is served at `/api-docs/openapi.json` and rendered with Scalar at
//! `/docs`.

use utoipa::OpenApi;

use crate::api;
use crate::db::models::experiments::{ExperimentState, ExperimentType, Significance};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Experiment Tracker API",
        description = "Create, browse, filter, update and delete business experiments and their owners."
    ),
    servers(
        (url = "/api", description = "Experiment tracker API")
    ),
    paths(
        api::handlers::experiments::list_experiments,
        api::handlers::experiments::get_experiment,
        api::handlers::experiments::create_experiment,
        api::handlers::experiments::update_experiment,
        api::handlers::experiments::delete_experiment,
        api::handlers::users::list_users,
    ),
    components(
        schemas(
            ExperimentState,
            ExperimentType,
            Significance,
            api::models::experiments::ImpactInput,
            api::models::experiments::ParticipantsInput,
            api::models::experiments::DurationInput,
            api::models::experiments::ExperimentCreate,
            api::models::experiments::ExperimentUpdate,
            api::models::experiments::ImpactResponse,
            api::models::experiments::ParticipantsResponse,
            api::models::experiments::DurationResponse,
            api::models::experiments::ExperimentResponse,
            api::models::experiments::ExperimentListResponse,
            api::models::experiments::DeleteResponse,
            api::models::users::UserResponse,
        )
    ),
    tags(
        (name = "experiments", description = "Experiment management"),
        (name = "users", description = "Candidate experiment owners"),
    )
)]
pub struct ApiDoc;
