//! Upload session lifecycle.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::UploadError;

/// Remote session operations consumed by the lifecycle.
///
/// Implemented over the session API by the CLI; mocked in tests.
pub trait SessionService: Send + Sync {
    fn start_session(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Uuid, UploadError>> + Send + '_>>;

    fn complete_session(
        &self,
        session_id: Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<(), UploadError>> + Send + '_>>;
}

enum LifecycleState {
    Idle,
    Started(Uuid),
    Finished,
}

/// Brackets an upload run with the session start/complete endpoints.
///
/// Completing the session kicks off remote post-processing, so it is
/// gated behind an explicit flag rather than always invoked.
pub struct SessionLifecycle {
    service: Arc<dyn SessionService>,
    complete_session: bool,
    state: Mutex<LifecycleState>,
}

impl SessionLifecycle {
    pub fn new(service: Arc<dyn SessionService>, complete_session: bool) -> Self {
        Self {
            service,
            complete_session,
            state: Mutex::new(LifecycleState::Idle),
        }
    }

    /// Starts a remote session. Must be called exactly once, before
    /// any chunk is enqueued.
    pub async fn start(&self) -> Result<Uuid, UploadError> {
        let mut state = self.state.lock().await;
        match *state {
            LifecycleState::Idle => {}
            LifecycleState::Started(_) | LifecycleState::Finished => {
                return Err(UploadError::SessionAlreadyStarted);
            }
        }

        let session_id = self.service.start_session().await?;
        info!(session = %session_id, "session started");
        *state = LifecycleState::Started(session_id);
        Ok(session_id)
    }

    /// Ends the session, calling the completion endpoint when enabled.
    /// Only valid after `start`, once the pipeline has fully drained.
    pub async fn stop(&self) -> Result<(), UploadError> {
        let mut state = self.state.lock().await;
        let session_id = match *state {
            LifecycleState::Started(id) => id,
            LifecycleState::Idle | LifecycleState::Finished => {
                return Err(UploadError::SessionNotStarted);
            }
        };

        if self.complete_session {
            self.service.complete_session(session_id).await?;
            info!(session = %session_id, "session completed");
        } else {
            debug!(session = %session_id, "session completion disabled, skipping");
        }

        *state = LifecycleState::Finished;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct MockSession {
        id: Uuid,
        starts: AtomicUsize,
        completions: StdMutex<Vec<Uuid>>,
        fail_start: bool,
    }

    impl MockSession {
        fn new() -> Self {
            Self {
                id: Uuid::new_v4(),
                starts: AtomicUsize::new(0),
                completions: StdMutex::new(Vec::new()),
                fail_start: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail_start: true,
                ..Self::new()
            }
        }
    }

    impl SessionService for MockSession {
        fn start_session(
            &self,
        ) -> Pin<Box<dyn Future<Output = Result<Uuid, UploadError>> + Send + '_>> {
            Box::pin(async move {
                self.starts.fetch_add(1, Ordering::SeqCst);
                if self.fail_start {
                    Err(UploadError::Session("start rejected".into()))
                } else {
                    Ok(self.id)
                }
            })
        }

        fn complete_session(
            &self,
            session_id: Uuid,
        ) -> Pin<Box<dyn Future<Output = Result<(), UploadError>> + Send + '_>> {
            Box::pin(async move {
                self.completions.lock().unwrap().push(session_id);
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn start_returns_the_remote_session_id() {
        let service = Arc::new(MockSession::new());
        let lifecycle = SessionLifecycle::new(service.clone(), false);

        let session_id = lifecycle.start().await.unwrap();
        assert_eq!(session_id, service.id);
        assert_eq!(service.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let service = Arc::new(MockSession::new());
        let lifecycle = SessionLifecycle::new(service.clone(), false);

        lifecycle.start().await.unwrap();
        let err = lifecycle.start().await.unwrap_err();
        assert!(matches!(err, UploadError::SessionAlreadyStarted));
        assert_eq!(service.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_requires_a_started_session() {
        let lifecycle = SessionLifecycle::new(Arc::new(MockSession::new()), true);
        let err = lifecycle.stop().await.unwrap_err();
        assert!(matches!(err, UploadError::SessionNotStarted));
    }

    #[tokio::test]
    async fn stop_skips_completion_by_default() {
        let service = Arc::new(MockSession::new());
        let lifecycle = SessionLifecycle::new(service.clone(), false);

        lifecycle.start().await.unwrap();
        lifecycle.stop().await.unwrap();
        assert!(service.completions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stop_completes_when_enabled() {
        let service = Arc::new(MockSession::new());
        let lifecycle = SessionLifecycle::new(service.clone(), true);

        let session_id = lifecycle.start().await.unwrap();
        lifecycle.stop().await.unwrap();
        assert_eq!(*service.completions.lock().unwrap(), vec![session_id]);
    }

    #[tokio::test]
    async fn double_stop_is_rejected() {
        let service = Arc::new(MockSession::new());
        let lifecycle = SessionLifecycle::new(service, true);

        lifecycle.start().await.unwrap();
        lifecycle.stop().await.unwrap();
        let err = lifecycle.stop().await.unwrap_err();
        assert!(matches!(err, UploadError::SessionNotStarted));
    }

    #[tokio::test]
    async fn failed_start_leaves_lifecycle_reusable() {
        let service = Arc::new(MockSession::failing());
        let lifecycle = SessionLifecycle::new(service.clone(), false);

        let err = lifecycle.start().await.unwrap_err();
        assert!(matches!(err, UploadError::Session(_)));
        // State was not mutated, so another start attempt is allowed.
        let err = lifecycle.start().await.unwrap_err();
        assert!(matches!(err, UploadError::Session(_)));
        assert_eq!(service.starts.load(Ordering::SeqCst), 2);
    }
}
