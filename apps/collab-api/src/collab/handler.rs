//! Inbound event dispatch: maps a decoded client event to a coordinator call.

use chrono::Utc;

use super::coordinator::CollabCoordinator;
use super::error::CollabError;
use super::events::{ClientEvent, CodeEdit, CursorMove, JoinedProject, Pong, ServerEvent};

/// Apply `event` on behalf of `connection_id`.
///
/// Returns the event to send back to that connection only, if any. Errors are
/// turned into an `error` event for the caller; other participants never see them.
pub fn handle_event(
    coordinator: &CollabCoordinator,
    connection_id: &str,
    event: ClientEvent,
) -> Option<ServerEvent> {
    match dispatch(coordinator, connection_id, event) {
        Ok(reply) => reply,
        Err(err) => {
            tracing::debug!(%connection_id, %err, "rejected collab event");
            Some(ServerEvent::error(&err))
        }
    }
}

fn dispatch(
    coordinator: &CollabCoordinator,
    connection_id: &str,
    event: ClientEvent,
) -> Result<Option<ServerEvent>, CollabError> {
    match event {
        ClientEvent::JoinProject(payload) => {
            let joined = coordinator.join(connection_id, payload.project_id()?)?;
            Ok(Some(ServerEvent::JoinedProject(JoinedProject {
                project_id: joined.project_id,
                participant_count: joined.participant_count,
            })))
        }
        ClientEvent::CodeChange(payload) => {
            let edit = CodeEdit::try_from(payload)?;
            let ack = coordinator.broadcast_edit(connection_id, edit)?;
            Ok(Some(ServerEvent::CodeChangeAck(ack)))
        }
        ClientEvent::CursorChange(payload) => {
            let cursor = CursorMove::try_from(payload)?;
            coordinator.broadcast_cursor(connection_id, cursor)?;
            Ok(None)
        }
        ClientEvent::LeaveProject(payload) => {
            coordinator.leave(connection_id, payload.project_id()?);
            Ok(None)
        }
        ClientEvent::GetProjectStatus(payload) => {
            let status = coordinator.status(payload.project_id()?);
            Ok(Some(ServerEvent::ProjectStatus(status)))
        }
        ClientEvent::Ping => Ok(Some(ServerEvent::Pong(Pong {
            timestamp: Utc::now(),
        }))),
    }
}
