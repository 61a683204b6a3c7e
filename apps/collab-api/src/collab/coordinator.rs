//! Project session registry: who is editing which project, and relay of their
//! edits and cursor moves to the other participants.
//!
//! All membership state lives behind a single `parking_lot::Mutex`. Fan-out is
//! done while the lock is held, through the non-blocking [`EventSink`], so every
//! participant of a session observes events in the order they were accepted.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use utoipa::ToSchema;

use super::connections::EventSink;
use super::error::CollabError;
use super::events::{
    CodeEdit, CodeUpdate, CursorMove, CursorUpdate, EditAck, ParticipantChange, ServerEvent,
};

/// Reference sweep cadence.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Sessions idle longer than this are evicted by the sweep.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// One shared project and the connections currently editing it.
struct Session {
    participants: HashSet<String>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            participants: HashSet::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Never moves `last_activity` backwards.
    fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    fn is_idle(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        (now - self.last_activity)
            .to_std()
            .map(|idle| idle > timeout)
            .unwrap_or(false)
    }
}

/// Result of a successful join, returned to the joining connection only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinResult {
    pub project_id: String,
    pub participant_count: usize,
}

/// Point-in-time view of one project's session.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    pub project_id: String,
    pub is_active: bool,
    pub participant_count: usize,
    pub last_activity: Option<DateTime<Utc>>,
}

impl ProjectStatus {
    fn inactive(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            is_active: false,
            participant_count: 0,
            last_activity: None,
        }
    }
}

/// Registry-wide snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollabStats {
    pub active_sessions: usize,
    pub total_participants: usize,
    pub oldest_session_started_at: Option<DateTime<Utc>>,
    pub projects: Vec<ProjectStatus>,
}

pub struct CollabCoordinator {
    sessions: Mutex<HashMap<String, Session>>,
    sink: Arc<dyn EventSink>,
    session_timeout: Duration,
}

impl CollabCoordinator {
    pub fn new(sink: Arc<dyn EventSink>, session_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            sink,
            session_timeout,
        }
    }

    /// Add `connection_id` to `project_id`'s session, leaving any other project first.
    pub fn join(&self, connection_id: &str, project_id: &str) -> Result<JoinResult, CollabError> {
        if project_id.trim().is_empty() {
            return Err(CollabError::invalid("projectId is required"));
        }

        let now = Utc::now();
        let mut sessions = self.sessions.lock();

        self.detach(&mut sessions, connection_id, Some(project_id));

        let session = sessions
            .entry(project_id.to_string())
            .or_insert_with(|| Session::new(now));
        let newly_joined = session.participants.insert(connection_id.to_string());
        session.touch(now);
        let participant_count = session.participants.len();

        if newly_joined {
            let event = ServerEvent::UserJoined(ParticipantChange {
                connection_id: connection_id.to_string(),
                project_id: project_id.to_string(),
                participant_count,
            });
            self.fan_out(&session.participants, connection_id, event);

            tracing::info!(
                %connection_id,
                %project_id,
                participants = participant_count,
                "joined project session"
            );
        }

        Ok(JoinResult {
            project_id: project_id.to_string(),
            participant_count,
        })
    }

    /// Remove `connection_id` from `project_id`'s session. No-op if it is not a member.
    pub fn leave(&self, connection_id: &str, project_id: &str) {
        let mut sessions = self.sessions.lock();
        let Some(session) = sessions.get_mut(project_id) else {
            return;
        };
        if !session.participants.remove(connection_id) {
            return;
        }

        if session.participants.is_empty() {
            sessions.remove(project_id);
            tracing::info!(%connection_id, %project_id, "last participant left, session closed");
            return;
        }

        let event = ServerEvent::UserLeft(ParticipantChange {
            connection_id: connection_id.to_string(),
            project_id: project_id.to_string(),
            participant_count: session.participants.len(),
        });
        self.fan_out(&session.participants, connection_id, event);
        tracing::info!(
            %connection_id,
            %project_id,
            participants = session.participants.len(),
            "left project session"
        );
    }

    /// Drop `connection_id` from every session it appears in.
    ///
    /// Returns the number of sessions it was removed from, so a repeated call
    /// returns 0.
    pub fn disconnect(&self, connection_id: &str) -> usize {
        let mut sessions = self.sessions.lock();
        let removed = self.detach(&mut sessions, connection_id, None);
        if removed > 0 {
            tracing::debug!(%connection_id, sessions = removed, "disconnected from project sessions");
        }
        removed
    }

    /// Relay a content edit to the other participants of its project.
    pub fn broadcast_edit(&self, connection_id: &str, edit: CodeEdit) -> Result<EditAck, CollabError> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock();
        let session = member_session(&mut sessions, connection_id, &edit.project_id)?;
        session.touch(now);

        let ack = EditAck {
            project_id: edit.project_id,
            file_path: edit.file_path.clone(),
            timestamp: now,
        };
        let event = ServerEvent::CodeUpdate(CodeUpdate {
            file_path: edit.file_path,
            new_content: edit.new_content,
            cursor_position: edit.cursor_position,
            connection_id: connection_id.to_string(),
            timestamp: now,
        });
        let delivered = self.fan_out(&session.participants, connection_id, event);

        tracing::debug!(
            %connection_id,
            project_id = %ack.project_id,
            file_path = %ack.file_path,
            delivered,
            "relayed code edit"
        );
        Ok(ack)
    }

    /// Relay a cursor or selection move. Counts as activity, same as an edit.
    pub fn broadcast_cursor(&self, connection_id: &str, cursor: CursorMove) -> Result<(), CollabError> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock();
        let session = member_session(&mut sessions, connection_id, &cursor.project_id)?;
        session.touch(now);

        let event = ServerEvent::CursorUpdate(CursorUpdate {
            file_path: cursor.file_path,
            cursor_position: cursor.cursor_position,
            selection: cursor.selection,
            connection_id: connection_id.to_string(),
            timestamp: now,
        });
        self.fan_out(&session.participants, connection_id, event);
        Ok(())
    }

    /// Status of a project's session. Unknown projects report as inactive.
    pub fn status(&self, project_id: &str) -> ProjectStatus {
        let sessions = self.sessions.lock();
        match sessions.get(project_id) {
            Some(session) => ProjectStatus {
                project_id: project_id.to_string(),
                is_active: true,
                participant_count: session.participants.len(),
                last_activity: Some(session.last_activity),
            },
            None => ProjectStatus::inactive(project_id),
        }
    }

    pub fn stats(&self) -> CollabStats {
        let sessions = self.sessions.lock();
        let mut projects: Vec<ProjectStatus> = sessions
            .iter()
            .map(|(project_id, session)| ProjectStatus {
                project_id: project_id.clone(),
                is_active: true,
                participant_count: session.participants.len(),
                last_activity: Some(session.last_activity),
            })
            .collect();
        projects.sort_by(|a, b| a.project_id.cmp(&b.project_id));

        CollabStats {
            active_sessions: sessions.len(),
            total_participants: projects.iter().map(|p| p.participant_count).sum(),
            oldest_session_started_at: sessions.values().map(|s| s.created_at).min(),
            projects,
        }
    }

    /// Evict sessions idle longer than the session timeout. Returns the number evicted.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// Sweep as if the current time were `now`.
    ///
    /// Remaining participants of an evicted session are not notified.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let timeout = self.session_timeout;
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|project_id, session| {
            let idle = session.is_idle(now, timeout);
            if idle {
                tracing::info!(
                    %project_id,
                    participants = session.participants.len(),
                    last_activity = %session.last_activity,
                    "evicting inactive project session"
                );
            }
            !idle
        });
        before - sessions.len()
    }

    /// Remove `connection_id` from every session except `keep`, notifying the
    /// remaining participants and deleting sessions that become empty.
    fn detach(
        &self,
        sessions: &mut HashMap<String, Session>,
        connection_id: &str,
        keep: Option<&str>,
    ) -> usize {
        let mut removed = 0;
        let mut emptied = Vec::new();

        for (project_id, session) in sessions.iter_mut() {
            if keep == Some(project_id.as_str()) {
                continue;
            }
            if !session.participants.remove(connection_id) {
                continue;
            }
            removed += 1;

            if session.participants.is_empty() {
                emptied.push(project_id.clone());
                continue;
            }

            let event = ServerEvent::UserLeft(ParticipantChange {
                connection_id: connection_id.to_string(),
                project_id: project_id.clone(),
                participant_count: session.participants.len(),
            });
            self.fan_out(&session.participants, connection_id, event);
        }

        for project_id in emptied {
            sessions.remove(&project_id);
            tracing::info!(%connection_id, %project_id, "last participant left, session closed");
        }
        removed
    }

    /// Hand `event` to every participant except `origin`. Individual delivery
    /// failures are logged and skipped. Returns the number of successful hand-offs.
    fn fan_out(&self, participants: &HashSet<String>, origin: &str, event: ServerEvent) -> usize {
        let event = Arc::new(event);
        let mut delivered = 0;
        for connection_id in participants.iter().filter(|id| id.as_str() != origin) {
            match self.sink.deliver(connection_id, event.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::warn!(%connection_id, event = event.name(), %err, "dropping outbound event");
                }
            }
        }
        delivered
    }
}

/// The session for `project_id`, provided `connection_id` is one of its participants.
fn member_session<'a>(
    sessions: &'a mut HashMap<String, Session>,
    connection_id: &str,
    project_id: &str,
) -> Result<&'a mut Session, CollabError> {
    sessions
        .get_mut(project_id)
        .filter(|s| s.participants.contains(connection_id))
        .ok_or_else(|| CollabError::not_joined(project_id))
}
