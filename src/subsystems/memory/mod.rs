//! Memory subsystem — per-session conversation memory and the document store.
//!
//! [`MemorySystem`] owns the session table. Each session is a
//! [`BasicSessionStore`](stores::basic_session::BasicSessionStore) behind its
//! own mutex, so appends to different sessions never contend and an append
//! plus its FIFO prune happen as one step. Sessions are created lazily on
//! first contact and live until the process exits.
//!
//! Document storage lives next door in [`stores::docstore`].

pub mod stores;
pub mod types;

pub use stores::docstore::{DocumentStore, Corpus};
pub use types::{Message, Role};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::info;

use crate::error::AppError;
use stores::basic_session::BasicSessionStore;

/// Configuration for the memory subsystem.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Cap for transcript entries in each session.
    pub transcript_cap: Option<usize>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { transcript_cap: None }
    }
}

type SessionRef = Arc<Mutex<BasicSessionStore>>;

/// Central session memory. Constructed once at startup, shared via `Arc`.
pub struct MemorySystem {
    config: MemoryConfig,
    sessions: RwLock<HashMap<String, SessionRef>>,
}

impl MemorySystem {
    pub fn new(config: MemoryConfig) -> Self {
        Self { config, sessions: RwLock::new(HashMap::new()) }
    }

    /// Return the session for `session_id`, creating it on first use.
    fn get_or_create_ref(&self, session_id: &str) -> Result<SessionRef, AppError> {
        if session_id.trim().is_empty() {
            return Err(AppError::Validation("session id must not be empty".into()));
        }
        {
            let sessions = self
                .sessions
                .read()
                .map_err(|_| AppError::Memory("session table lock poisoned".into()))?;
            if let Some(s) = sessions.get(session_id) {
                return Ok(Arc::clone(s));
            }
        }
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| AppError::Memory("session table lock poisoned".into()))?;
        let session = sessions.entry(session_id.to_string()).or_insert_with(|| {
            info!(session_id, "memory: session created");
            Arc::new(Mutex::new(BasicSessionStore::new(
                session_id,
                self.config.transcript_cap,
            )))
        });
        Ok(Arc::clone(session))
    }

    /// Existing session or `None`. Never creates.
    fn lookup(&self, session_id: &str) -> Result<Option<SessionRef>, AppError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| AppError::Memory("session table lock poisoned".into()))?;
        Ok(sessions.get(session_id).cloned())
    }

    fn lock(session: &SessionRef) -> Result<MutexGuard<'_, BasicSessionStore>, AppError> {
        session
            .lock()
            .map_err(|_| AppError::Memory("session lock poisoned".into()))
    }

    /// Ensure a session exists. Returns its creation timestamp.
    pub fn get_or_create(&self, session_id: &str) -> Result<String, AppError> {
        let session = self.get_or_create_ref(session_id)?;
        let guard = Self::lock(&session)?;
        Ok(guard.created_at().to_string())
    }

    /// Append one message, then prune to the cap.
    pub fn append(&self, session_id: &str, role: Role, content: &str) -> Result<(), AppError> {
        let session = self.get_or_create_ref(session_id)?;
        Self::lock(&session)?.transcript_append(role, content);
        Ok(())
    }

    /// Append a user message and the assistant's reply under one lock so no
    /// reader sees one without the other.
    pub fn append_exchange(
        &self,
        session_id: &str,
        user: &str,
        assistant: &str,
    ) -> Result<(), AppError> {
        let session = self.get_or_create_ref(session_id)?;
        let mut guard = Self::lock(&session)?;
        guard.transcript_append(Role::User, user);
        guard.transcript_append(Role::Assistant, assistant);
        Ok(())
    }

    /// The last `n` messages in original order. Unknown sessions are empty.
    pub fn get_recent(&self, session_id: &str, n: usize) -> Result<Vec<Message>, AppError> {
        match self.lookup(session_id)? {
            Some(session) => Ok(Self::lock(&session)?.transcript_read_last(n)),
            None => Ok(Vec::new()),
        }
    }

    /// The whole retained transcript.
    pub fn history(&self, session_id: &str) -> Result<Vec<Message>, AppError> {
        match self.lookup(session_id)? {
            Some(session) => Ok(Self::lock(&session)?.transcript()),
            None => Ok(Vec::new()),
        }
    }

    pub fn select_documents(&self, session_id: &str, doc_ids: &[String]) -> Result<(), AppError> {
        let session = self.get_or_create_ref(session_id)?;
        Self::lock(&session)?.select_documents(doc_ids.iter().cloned());
        Ok(())
    }

    pub fn selected_documents(&self, session_id: &str) -> Result<Vec<String>, AppError> {
        match self.lookup(session_id)? {
            Some(session) => Ok(Self::lock(&session)?.selected_documents()),
            None => Ok(Vec::new()),
        }
    }

    /// Remove `doc_id` from every session's selection.
    pub fn forget_document(&self, doc_id: &str) -> Result<usize, AppError> {
        let sessions: Vec<SessionRef> = {
            let table = self
                .sessions
                .read()
                .map_err(|_| AppError::Memory("session table lock poisoned".into()))?;
            table.values().cloned().collect()
        };
        let mut touched = 0;
        for session in &sessions {
            if Self::lock(session)?.forget_document(doc_id) {
                touched += 1;
            }
        }
        Ok(touched)
    }

    pub fn session_count(&self) -> Result<usize, AppError> {
        Ok(self
            .sessions
            .read()
            .map_err(|_| AppError::Memory("session table lock poisoned".into()))?
            .len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_memory() -> MemorySystem {
        MemorySystem::new(MemoryConfig::default())
    }

    #[test]
    fn sessions_created_lazily() {
        let mem = make_memory();
        assert_eq!(mem.session_count().unwrap(), 0);
        assert!(mem.history("nobody").unwrap().is_empty());
        assert_eq!(mem.session_count().unwrap(), 0);
        mem.append("s1", Role::User, "hi").unwrap();
        assert_eq!(mem.session_count().unwrap(), 1);
    }

    #[test]
    fn eleven_appends_keep_last_ten() {
        let mem = make_memory();
        for i in 0..11 {
            mem.append("s1", Role::User, &format!("m{i}")).unwrap();
        }
        let hist = mem.history("s1").unwrap();
        let contents: Vec<&str> = hist.iter().map(|m| m.content.as_str()).collect();
        let expected: Vec<String> = (1..11).map(|i| format!("m{i}")).collect();
        assert_eq!(contents, expected);
    }

    #[test]
    fn get_recent_defaults_to_tail() {
        let mem = make_memory();
        for i in 0..7 {
            mem.append("s1", Role::User, &format!("m{i}")).unwrap();
        }
        let recent = mem.get_recent("s1", 5).unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].content, "m2");
        assert_eq!(recent[4].content, "m6");
    }

    #[test]
    fn sessions_are_isolated() {
        let mem = make_memory();
        mem.append("a", Role::User, "from a").unwrap();
        mem.append("b", Role::User, "from b").unwrap();
        let a = mem.history("a").unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].content, "from a");
    }

    #[test]
    fn empty_session_id_rejected() {
        let mem = make_memory();
        assert!(matches!(
            mem.append("  ", Role::User, "x"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn exchange_appends_pair() {
        let mem = make_memory();
        mem.append_exchange("s", "question", "answer").unwrap();
        let h = mem.history("s").unwrap();
        assert_eq!(h.len(), 2);
        assert_eq!(h[0].role, Role::User);
        assert_eq!(h[1].role, Role::Assistant);
    }

    #[test]
    fn forget_document_prunes_selections() {
        let mem = make_memory();
        mem.select_documents("a", &["d1".into(), "d2".into()]).unwrap();
        mem.select_documents("b", &["d1".into()]).unwrap();
        assert_eq!(mem.forget_document("d1").unwrap(), 2);
        assert_eq!(mem.selected_documents("a").unwrap(), vec!["d2".to_string()]);
        assert!(mem.selected_documents("b").unwrap().is_empty());
    }

    #[test]
    fn concurrent_appends_respect_cap() {
        let mem = Arc::new(make_memory());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let mem = Arc::clone(&mem);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        mem.append("shared", Role::User, &format!("t{t}-{i}")).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(mem.history("shared").unwrap().len(), 10);
    }
}
