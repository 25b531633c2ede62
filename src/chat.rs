//! Chat sessions and the send/answer workflow.
//!
//! [`ChatState`] owns the session list and, next to it, a map from session
//! id to transcript. Both are only ever changed together, so every session
//! has exactly one transcript and every transcript belongs to a listed
//! session.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::client::{ApiError, RagBackend};
use crate::models::{Author, ChatSession, Message};

pub const DEFAULT_SESSION_TITLE: &str = "New conversation";
pub const NEW_SESSION_PREVIEW: &str = "Conversation created";

/// Characters of the first message kept when it becomes the title.
const TITLE_CHARS: usize = 30;

/// What happened to a message handed to [`ChatState::send_message`].
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// Blank input; nothing was sent.
    Ignored,
    /// No session was active. A session was created and the message was
    /// dropped; the user has to send it again.
    SessionCreated(String),
    /// The backend answered; the reply is already in the transcript.
    Answered(Message),
    /// The answer call failed. The user message stays in the transcript
    /// without a reply.
    Failed(ApiError),
}

/// Shared "answer in flight" flag.
///
/// Clones observe the same flag, so a caller can watch it from another task
/// while [`ChatState::send_message`] is awaiting the backend.
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag(Arc<AtomicBool>);

impl LoadingFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn raise(&self) -> LoadingGuard {
        self.0.store(true, Ordering::SeqCst);
        LoadingGuard(self.clone())
    }
}

/// Lowers the flag when dropped, including when the send future is
/// dropped before the backend answers.
struct LoadingGuard(LoadingFlag);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0 .0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct ChatState {
    /// Newest first.
    sessions: Vec<ChatSession>,
    transcripts: HashMap<String, Vec<Message>>,
    current: Option<String>,
    loading: LoadingFlag,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn session(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_session(&self) -> Option<&ChatSession> {
        self.current.as_deref().and_then(|id| self.session(id))
    }

    /// Messages of the active session, or nothing when no session is active.
    pub fn messages(&self) -> &[Message] {
        self.current
            .as_deref()
            .and_then(|id| self.transcript(id))
            .unwrap_or(&[])
    }

    pub fn transcript(&self, id: &str) -> Option<&[Message]> {
        self.transcripts.get(id).map(Vec::as_slice)
    }

    /// True while an answer call is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.is_set()
    }

    /// A handle on the loading flag that stays valid across sends.
    pub fn loading_flag(&self) -> LoadingFlag {
        self.loading.clone()
    }

    /// Create a session at the head of the list and make it active.
    pub fn new_session(&mut self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.sessions.insert(
            0,
            ChatSession {
                id: id.clone(),
                title: DEFAULT_SESSION_TITLE.to_string(),
                last_message: NEW_SESSION_PREVIEW.to_string(),
                timestamp: Utc::now(),
                message_count: 0,
            },
        );
        self.transcripts.insert(id.clone(), Vec::new());
        self.current = Some(id.clone());
        tracing::debug!(session = %id, "session created");
        id
    }

    pub fn select_session(&mut self, id: &str) -> bool {
        if self.session(id).is_none() {
            return false;
        }
        self.current = Some(id.to_string());
        true
    }

    pub fn rename_session(&mut self, id: &str, title: &str) -> bool {
        match self.sessions.iter_mut().find(|s| s.id == id) {
            Some(session) => {
                session.title = title.to_string();
                true
            }
            None => false,
        }
    }

    /// Remove a session and its transcript. Clears the active pointer when
    /// the deleted session was active.
    pub fn delete_session(&mut self, id: &str) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        let removed = self.sessions.len() != before;
        self.transcripts.remove(id);
        if self.current.as_deref() == Some(id) {
            self.current = None;
        }
        removed
    }

    /// Deactivate the current session without deleting anything.
    pub fn clear_active(&mut self) {
        self.current = None;
    }

    /// Every listed session has a transcript and vice versa.
    pub fn is_consistent(&self) -> bool {
        self.sessions.len() == self.transcripts.len()
            && self
                .sessions
                .iter()
                .all(|s| self.transcripts.contains_key(&s.id))
    }

    /// Send one user turn and append the backend's reply.
    pub async fn send_message(
        &mut self,
        backend: &dyn RagBackend,
        content: &str,
        limit: u32,
    ) -> SendOutcome {
        if content.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        let Some(session_id) = self.current.clone() else {
            return SendOutcome::SessionCreated(self.new_session());
        };

        self.transcripts
            .entry(session_id.clone())
            .or_default()
            .push(Message::new(Author::User, content));
        if let Some(session) = self.sessions.iter_mut().find(|s| s.id == session_id) {
            session.last_message = content.to_string();
            session.timestamp = Utc::now();
            session.message_count += 1;
            if session.title == DEFAULT_SESSION_TITLE {
                session.title = title_from(content);
            }
        }

        let in_flight = self.loading.raise();
        let result = backend.answer(content, Some(limit)).await;
        drop(in_flight);

        match result {
            Ok(response) => {
                let reply = Message::new(Author::Bot, response.answer);
                self.transcripts
                    .entry(session_id.clone())
                    .or_default()
                    .push(reply.clone());
                if let Some(session) = self.sessions.iter_mut().find(|s| s.id == session_id) {
                    session.message_count += 1;
                }
                SendOutcome::Answered(reply)
            }
            Err(e) => {
                tracing::warn!(session = %session_id, error = %e, "answer failed");
                SendOutcome::Failed(e)
            }
        }
    }
}

/// First [`TITLE_CHARS`] characters of `content`, with `...` when cut.
pub fn title_from(content: &str) -> String {
    let mut title: String = content.chars().take(TITLE_CHARS).collect();
    if content.chars().count() > TITLE_CHARS {
        title.push_str("...");
    }
    title
}
