//! Role-scoped broadcast helpers for the stable WebSocket wire contract.

use uuid::Uuid;

use crate::{
    dto::ws::ServerMessage,
    state::registry::{ConnectionRegistry, ConnectionRole},
};

/// Notify the display that an activity instance went on stage.
pub fn broadcast_activity_started(registry: &ConnectionRegistry, instance_id: Uuid) {
    registry.broadcast_to_role(
        ConnectionRole::Display,
        &ServerMessage::PluginStart {
            plugin_id: instance_id,
        },
    );
}

/// Notify display, user and host clients that the activity ended.
pub fn broadcast_activity_ended(registry: &ConnectionRegistry, instance_id: Uuid) {
    let message = ServerMessage::PluginEnd {
        plugin_id: instance_id,
    };
    registry.broadcast_to_role(ConnectionRole::Display, &message);
    registry.broadcast_to_role(ConnectionRole::User, &message);
    registry.broadcast_to_role(ConnectionRole::Host, &message);
}

/// Notify every client that the stage was cleared.
pub fn broadcast_activity_reset(registry: &ConnectionRegistry) {
    registry.broadcast(&ServerMessage::PluginReset);
}

/// Forward an intra-activity sub-phase change to display and user clients.
pub fn broadcast_phase_change(
    registry: &ConnectionRegistry,
    phase: u32,
    instance_id: Option<Uuid>,
) {
    let message = ServerMessage::PluginPhaseChange {
        phase,
        plugin_id: instance_id,
    };
    registry.broadcast_to_role(ConnectionRole::Display, &message);
    registry.broadcast_to_role(ConnectionRole::User, &message);
}

/// Start the visible countdown on the display.
pub fn broadcast_countdown_started(registry: &ConnectionRegistry, seconds: u64) {
    registry.broadcast_to_role(
        ConnectionRole::Display,
        &ServerMessage::CountdownStart { seconds },
    );
}

/// Refresh the participant head-count on the display.
pub fn broadcast_stats_update(registry: &ConnectionRegistry, count: u64) {
    registry.broadcast_to_role(ConnectionRole::Display, &ServerMessage::StatsUpdate { count });
}
