use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

/// Messages pushed to WebSocket clients.
///
/// The `type` tag values are the stable wire contract consumed by the
/// display, host and user frontends.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// An activity instance went on stage and accepts submissions.
    PluginStart {
        /// Instance that started.
        plugin_id: Uuid,
    },
    /// The activity instance closed submissions and moved to results.
    PluginEnd {
        /// Instance that ended.
        plugin_id: Uuid,
    },
    /// The stage was cleared; clients return to their home view.
    PluginReset,
    /// Intra-activity sub-phase change for multi-stage exercises.
    PluginPhaseChange {
        /// Sub-phase number chosen by the host.
        phase: u32,
        /// Instance currently on stage, if any.
        plugin_id: Option<Uuid>,
    },
    /// A countdown towards automatic stop started on the display.
    CountdownStart {
        /// Countdown duration in seconds.
        seconds: u64,
    },
    /// The participant head-count changed.
    StatsUpdate {
        /// Number of signed-in participants.
        count: u64,
    },
    /// Incremental result preview while the activity is still running.
    PluginUpdate {
        /// Instance the preview belongs to.
        plugin_id: Uuid,
        /// Activity-specific aggregate payload.
        data: Value,
    },
}
