use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for LiveRoom Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
        crate::routes::participant::signin,
        crate::routes::participant::training_status,
        crate::routes::participant::stats_count,
        crate::routes::activity::list_definitions,
        crate::routes::activity::list_activities,
        crate::routes::activity::activity_config,
        crate::routes::activity::activity_results,
        crate::routes::activity::submit_answer,
        crate::routes::session::start_activity,
        crate::routes::session::stop_activity,
        crate::routes::session::reset_activity,
        crate::routes::session::set_phase,
        crate::routes::session::schedule_countdown,
        crate::routes::admin::create_instance,
        crate::routes::admin::list_instances,
        crate::routes::admin::update_instance,
        crate::routes::admin::delete_instance,
        crate::routes::admin::update_session,
        crate::routes::admin::reset_session,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::common::AckResponse,
            crate::dto::ws::ServerMessage,
            crate::dto::participant::SigninRequest,
            crate::dto::participant::SigninResponse,
            crate::dto::participant::ParticipantSummary,
            crate::dto::participant::StatsCountResponse,
            crate::dto::session::TrainingStatusResponse,
            crate::dto::session::SessionSummary,
            crate::dto::activity::DefinitionSummary,
            crate::dto::activity::InstanceSummary,
            crate::dto::activity::ChoiceTallyResults,
            crate::dto::activity::ScoreRankedResults,
            crate::dto::activity::TopUser,
            crate::dto::activity::CountdownRequest,
            crate::dto::activity::PhaseRequest,
            crate::dto::admin::CreateInstanceRequest,
            crate::dto::admin::UpdateInstanceRequest,
            crate::dto::admin::UpdateSessionRequest,
            crate::routes::session::CountdownResponse,
            crate::dao::models::SessionStatus,
            crate::dao::models::ActivityPhaseState,
            crate::dao::models::ParticipantRole,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "participant", description = "Sign-in and polling fallbacks"),
        (name = "activity", description = "Activity metadata, submissions and results"),
        (name = "session", description = "Host controls for the live session"),
        (name = "admin", description = "Session and round configuration"),
    )
)]
pub struct ApiDoc;
