/// Submissions, results and activity listings.
pub mod activity_service;
/// Admin CRUD for activity instances and session lifecycle.
pub mod admin_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Sign-in, credential resolution and head-counts.
pub mod participant_service;
/// Session orchestration: activity transitions and the countdown scheduler.
pub mod session_service;
/// WebSocket connection lifecycle handling.
pub mod websocket_service;
/// Role-scoped broadcast helpers.
pub mod ws_events;
