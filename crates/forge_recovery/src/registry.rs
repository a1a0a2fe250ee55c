//! One live session per project.
//!
//! Starting a session for a project that already has one cancels the old
//! session and waits for it to stop before the new one is spawned, so two
//! sessions never write the same project directory at once.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{RecoveryError, RecoveryResult};

struct ActiveSession {
    id: Uuid,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Registry of in-flight sessions keyed by project id.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, ActiveSession>>>,
}

/// Handle to a spawned session.
pub struct SessionHandle<T> {
    pub session_id: Uuid,
    pub project_id: String,
    cancel: CancellationToken,
    outcome: oneshot::Receiver<T>,
}

impl<T> SessionHandle<T> {
    /// Ask the session to stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the session's result.
    pub async fn outcome(self) -> RecoveryResult<T> {
        self.outcome
            .await
            .map_err(|_| RecoveryError::SessionAborted(self.project_id))
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` as the session for `project_id`, replacing any running
    /// one. `task` receives the session's cancel token.
    pub async fn spawn<F, Fut, T>(&self, project_id: &str, task: F) -> SessionHandle<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        // The finishing task takes the lock to deregister itself, so it must
        // not be held while waiting on the previous session. A concurrent
        // spawn may register while we wait; keep going until the slot is
        // empty with the lock held.
        let mut sessions = loop {
            let mut sessions = self.sessions.lock().await;
            let Some(previous) = sessions.remove(project_id) else {
                break sessions;
            };
            drop(sessions);

            info!(project = %project_id, session = %previous.id, "Cancelling previous session");
            previous.cancel.cancel();
            if let Err(e) = previous.handle.await {
                warn!(project = %project_id, "Previous session ended abnormally: {}", e);
            }
        };

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        let future = task(cancel.clone());

        let registry = Arc::clone(&self.sessions);
        let key = project_id.to_string();
        let handle = tokio::spawn(async move {
            let outcome = future.await;
            let _ = tx.send(outcome);

            let mut sessions = registry.lock().await;
            if sessions.get(&key).map(|s| s.id == id).unwrap_or(false) {
                sessions.remove(&key);
            }
            debug!(project = %key, session = %id, "Session finished");
        });

        sessions.insert(
            project_id.to_string(),
            ActiveSession {
                id,
                cancel: cancel.clone(),
                handle,
            },
        );

        SessionHandle {
            session_id: id,
            project_id: project_id.to_string(),
            cancel,
            outcome: rx,
        }
    }

    /// Cancel the session for `project_id` and wait for it. Returns false
    /// when none was running.
    pub async fn cancel(&self, project_id: &str) -> bool {
        let previous = self.sessions.lock().await.remove(project_id);
        match previous {
            Some(session) => {
                session.cancel.cancel();
                if let Err(e) = session.handle.await {
                    warn!(project = %project_id, "Session ended abnormally: {}", e);
                }
                true
            }
            None => false,
        }
    }

    /// Cancel every session and wait for all of them.
    pub async fn cancel_all(&self) {
        let drained: Vec<ActiveSession> = self.sessions.lock().await.drain().map(|(_, s)| s).collect();
        for session in &drained {
            session.cancel.cancel();
        }
        for result in join_all(drained.into_iter().map(|s| s.handle)).await {
            if let Err(e) = result {
                warn!("Session ended abnormally: {}", e);
            }
        }
    }

    /// Whether a session for `project_id` is still running.
    pub async fn is_active(&self, project_id: &str) -> bool {
        self.sessions
            .lock()
            .await
            .get(project_id)
            .map(|s| !s.handle.is_finished())
            .unwrap_or(false)
    }
}
