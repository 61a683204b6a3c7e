//! Collaboration event names and wire-format messages.
//!
//! Every WebSocket text frame is a JSON object `{ "event": <name>, "data": {...} }`.
//! Payload keys are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::coordinator::ProjectStatus;
use super::error::CollabError;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Inbound event names.
pub struct ClientEventName;

impl ClientEventName {
    pub const JOIN_PROJECT: &'static str = "join-project";
    pub const CODE_CHANGE: &'static str = "code-change";
    pub const CURSOR_CHANGE: &'static str = "cursor-change";
    pub const LEAVE_PROJECT: &'static str = "leave-project";
    pub const GET_PROJECT_STATUS: &'static str = "get-project-status";
    pub const PING: &'static str = "ping";
}

// ---------------------------------------------------------------------------
// Client → Server message
// ---------------------------------------------------------------------------

/// Raw frame received from the client, before the payload is interpreted.
#[derive(Debug, Deserialize)]
pub struct ClientMessage {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// A decoded inbound event.
#[derive(Debug)]
pub enum ClientEvent {
    JoinProject(ProjectPayload),
    CodeChange(CodeChangePayload),
    CursorChange(CursorChangePayload),
    LeaveProject(ProjectPayload),
    GetProjectStatus(ProjectPayload),
    Ping,
}

impl ClientEvent {
    /// Decode a text frame. Only the frame shape is checked here; required
    /// fields are validated when the payload is turned into a request.
    pub fn decode(text: &str) -> Result<Self, CollabError> {
        let msg: ClientMessage = serde_json::from_str(text)
            .map_err(|e| CollabError::invalid(format!("malformed message: {e}")))?;

        // A missing `data` is treated as an empty payload.
        let data = match msg.data {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        let event = match msg.event.as_str() {
            ClientEventName::JOIN_PROJECT => Self::JoinProject(payload(&msg.event, data)?),
            ClientEventName::CODE_CHANGE => Self::CodeChange(payload(&msg.event, data)?),
            ClientEventName::CURSOR_CHANGE => Self::CursorChange(payload(&msg.event, data)?),
            ClientEventName::LEAVE_PROJECT => Self::LeaveProject(payload(&msg.event, data)?),
            ClientEventName::GET_PROJECT_STATUS => {
                Self::GetProjectStatus(payload(&msg.event, data)?)
            }
            ClientEventName::PING => Self::Ping,
            other => return Err(CollabError::invalid(format!("unknown event: {other}"))),
        };
        Ok(event)
    }
}

fn payload<T: for<'de> Deserialize<'de>>(event: &str, data: Value) -> Result<T, CollabError> {
    serde_json::from_value(data)
        .map_err(|e| CollabError::invalid(format!("invalid {event} payload: {e}")))
}

/// Returns the value if present and not blank.
fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, CollabError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(CollabError::invalid(format!("{field} is required"))),
    }
}

// ---------------------------------------------------------------------------
// join-project / leave-project / get-project-status payload
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPayload {
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ProjectPayload {
    pub fn project_id(&self) -> Result<&str, CollabError> {
        required(&self.project_id, "projectId")
    }
}

// ---------------------------------------------------------------------------
// code-change payload
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeChangePayload {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub new_content: Option<String>,
    #[serde(default)]
    pub cursor_position: Option<Value>,
}

/// A validated content edit.
#[derive(Debug, Clone)]
pub struct CodeEdit {
    pub project_id: String,
    pub file_path: String,
    /// May be empty: an empty file is distinct from absent content.
    pub new_content: String,
    pub cursor_position: Option<Value>,
}

impl TryFrom<CodeChangePayload> for CodeEdit {
    type Error = CollabError;

    fn try_from(p: CodeChangePayload) -> Result<Self, Self::Error> {
        let project_id = required(&p.project_id, "projectId")?.to_string();
        let file_path = required(&p.file_path, "filePath")?.to_string();
        let new_content = p
            .new_content
            .ok_or_else(|| CollabError::invalid("newContent is required"))?;
        Ok(Self {
            project_id,
            file_path,
            new_content,
            cursor_position: p.cursor_position,
        })
    }
}

// ---------------------------------------------------------------------------
// cursor-change payload
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorChangePayload {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub cursor_position: Option<Value>,
    #[serde(default)]
    pub selection: Option<Value>,
}

/// A validated cursor/selection move.
#[derive(Debug, Clone)]
pub struct CursorMove {
    pub project_id: String,
    pub file_path: String,
    pub cursor_position: Value,
    pub selection: Option<Value>,
}

impl TryFrom<CursorChangePayload> for CursorMove {
    type Error = CollabError;

    fn try_from(p: CursorChangePayload) -> Result<Self, Self::Error> {
        let project_id = required(&p.project_id, "projectId")?.to_string();
        let file_path = required(&p.file_path, "filePath")?.to_string();
        let cursor_position = p
            .cursor_position
            .ok_or_else(|| CollabError::invalid("cursorPosition is required"))?;
        Ok(Self {
            project_id,
            file_path,
            cursor_position,
            selection: p.selection,
        })
    }
}

// ---------------------------------------------------------------------------
// Server → Client message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    Connected(Connected),
    JoinedProject(JoinedProject),
    UserJoined(ParticipantChange),
    UserLeft(ParticipantChange),
    CodeUpdate(CodeUpdate),
    CodeChangeAck(EditAck),
    CursorUpdate(CursorUpdate),
    ProjectStatus(ProjectStatus),
    Pong(Pong),
    Error(ErrorPayload),
}

impl ServerEvent {
    pub fn error(err: &CollabError) -> Self {
        Self::Error(ErrorPayload {
            message: err.to_string(),
            code: err.code().to_string(),
        })
    }

    /// The wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::JoinedProject(_) => "joined-project",
            Self::UserJoined(_) => "user-joined",
            Self::UserLeft(_) => "user-left",
            Self::CodeUpdate(_) => "code-update",
            Self::CodeChangeAck(_) => "code-change-ack",
            Self::CursorUpdate(_) => "cursor-update",
            Self::ProjectStatus(_) => "project-status",
            Self::Pong(_) => "pong",
            Self::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connected {
    pub connection_id: String,
    /// The connection is closed after this long without client traffic.
    /// Clients that only read should `ping` well within it.
    pub idle_timeout_ms: u64,
}

/// Sent to the joining connection only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedProject {
    pub project_id: String,
    pub participant_count: usize,
}

/// Payload of `user-joined` and `user-left`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantChange {
    pub connection_id: String,
    pub project_id: String,
    pub participant_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeUpdate {
    pub file_path: String,
    pub new_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_position: Option<Value>,
    pub connection_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Acknowledgement returned to the author of an accepted edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditAck {
    pub project_id: String,
    pub file_path: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorUpdate {
    pub file_path: String,
    pub cursor_position: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<Value>,
    pub connection_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pong {
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub message: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_join_project() {
        let ev = ClientEvent::decode(r#"{"event":"join-project","data":{"projectId":"proj1"}}"#)
            .unwrap();
        match ev {
            ClientEvent::JoinProject(p) => assert_eq!(p.project_id().unwrap(), "proj1"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn join_without_project_id_is_invalid() {
        let ev = ClientEvent::decode(r#"{"event":"join-project","data":{}}"#).unwrap();
        let ClientEvent::JoinProject(p) = ev else {
            panic!("expected join-project");
        };
        assert!(matches!(p.project_id(), Err(CollabError::InvalidRequest(_))));

        let blank = ProjectPayload {
            project_id: Some("  ".to_string()),
        };
        assert!(blank.project_id().is_err());
    }

    #[test]
    fn ping_without_data_decodes() {
        assert!(matches!(
            ClientEvent::decode(r#"{"event":"ping"}"#).unwrap(),
            ClientEvent::Ping
        ));
    }

    #[test]
    fn malformed_and_unknown_frames_are_invalid_requests() {
        assert!(matches!(
            ClientEvent::decode("not json"),
            Err(CollabError::InvalidRequest(_))
        ));
        assert!(matches!(
            ClientEvent::decode(r#"{"event":"explode","data":{}}"#),
            Err(CollabError::InvalidRequest(_))
        ));
        assert!(matches!(
            ClientEvent::decode(r#"{"event":"join-project","data":{"projectId":42}}"#),
            Err(CollabError::InvalidRequest(_))
        ));
    }

    #[test]
    fn empty_content_is_a_valid_edit() {
        let payload = CodeChangePayload {
            project_id: Some("p".into()),
            file_path: Some("main.ts".into()),
            new_content: Some(String::new()),
            cursor_position: None,
        };
        let edit = CodeEdit::try_from(payload).unwrap();
        assert_eq!(edit.new_content, "");
    }

    #[test]
    fn absent_content_is_rejected() {
        let ClientEvent::CodeChange(payload) = ClientEvent::decode(
            r#"{"event":"code-change","data":{"projectId":"p","filePath":"a.rs","newContent":null}}"#,
        )
        .unwrap() else {
            panic!("expected code-change");
        };
        let err = CodeEdit::try_from(payload).unwrap_err();
        assert_eq!(err, CollabError::invalid("newContent is required"));
    }

    #[test]
    fn cursor_requires_position() {
        let payload = CursorChangePayload {
            project_id: Some("p".into()),
            file_path: Some("a.rs".into()),
            cursor_position: None,
            selection: Some(json!({"start": 1, "end": 4})),
        };
        assert!(CursorMove::try_from(payload).is_err());
    }

    #[test]
    fn server_events_use_event_data_framing() {
        let ev = ServerEvent::UserJoined(ParticipantChange {
            connection_id: "B".into(),
            project_id: "proj1".into(),
            participant_count: 2,
        });
        let value = serde_json::to_value(&ev).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "user-joined",
                "data": { "connectionId": "B", "projectId": "proj1", "participantCount": 2 }
            })
        );
        assert_eq!(value["event"], ev.name());
    }

    #[test]
    fn code_update_omits_absent_cursor() {
        let ev = ServerEvent::CodeUpdate(CodeUpdate {
            file_path: "main.ts".into(),
            new_content: "console.log(1)".into(),
            cursor_position: None,
            connection_id: "B".into(),
            timestamp: Utc::now(),
        });
        let value = serde_json::to_value(&ev).unwrap();
        assert!(value["data"].get("cursorPosition").is_none());
        assert!(value["data"]["timestamp"].is_string());
    }

    #[test]
    fn error_event_carries_code() {
        let ev = ServerEvent::error(&CollabError::not_joined("proj1"));
        let value = serde_json::to_value(&ev).unwrap();
        assert_eq!(value["event"], "error");
        assert_eq!(value["data"]["code"], "NOT_JOINED");
        assert_eq!(value["data"]["message"], "not joined to project proj1");
    }
}
