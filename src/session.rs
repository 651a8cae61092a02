//! The shared browser session.
//!
//! One engine is launched in the background when the session is created and
//! then shared read-only by every scrape. Its lifecycle only moves forward:
//!
//! ```text
//! Uninitialized -> Initializing -> Ready -> Closed
//!                              \-> Failed -> Closed
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tracing::{info, warn};

use crate::engine::{Engine, EnginePage, Launcher};
use crate::error::{Error, Result};

/// Current lifecycle state of a [`Session`].
#[derive(Clone)]
pub enum SessionHandle {
    Uninitialized,
    Initializing,
    Ready(Arc<dyn Engine>),
    /// Launch failed; carries the launch error message.
    Failed(String),
    Closed,
}

impl SessionHandle {
    fn is_settled(&self) -> bool {
        !matches!(self, SessionHandle::Uninitialized | SessionHandle::Initializing)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionHandle::Uninitialized => "uninitialized",
            SessionHandle::Initializing => "initializing",
            SessionHandle::Ready(_) => "ready",
            SessionHandle::Failed(_) => "failed",
            SessionHandle::Closed => "closed",
        }
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionHandle::Failed(reason) => f.debug_tuple("Failed").field(reason).finish(),
            other => f.write_str(other.name()),
        }
    }
}

pub struct Session {
    state: Arc<watch::Sender<SessionHandle>>,
    pages: Arc<Semaphore>,
    verbose: bool,
}

impl Session {
    /// Create the session and start launching its engine in the background.
    /// Must be called from within a Tokio runtime.
    pub fn launch(launcher: Arc<dyn Launcher>, max_open_pages: usize, verbose: bool) -> Self {
        let (tx, _) = watch::channel(SessionHandle::Uninitialized);
        let state = Arc::new(tx);
        state.send_replace(SessionHandle::Initializing);

        let launch_state = Arc::clone(&state);
        tokio::spawn(async move {
            let launched = launcher.launch().await;
            let mut orphan = None;
            launch_state.send_if_modified(|handle| {
                if !matches!(handle, SessionHandle::Initializing) {
                    // closed while launching
                    orphan = launched.ok();
                    return false;
                }
                *handle = match launched {
                    Ok(engine) => {
                        if verbose {
                            info!("---> Browser launched");
                        }
                        SessionHandle::Ready(engine)
                    }
                    Err(err) => {
                        if verbose {
                            warn!(error = %err, "browser launch failed");
                        }
                        SessionHandle::Failed(match err {
                            Error::SessionInit(reason) => reason,
                            other => other.to_string(),
                        })
                    }
                };
                true
            });
            if let Some(engine) = orphan {
                match engine.close().await {
                    Err(err) if verbose => {
                        warn!(error = %err, "failed to close browser launched after session close")
                    }
                    _ => {}
                }
            }
        });

        Self {
            state,
            pages: Arc::new(Semaphore::new(max_open_pages.max(1))),
            verbose,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.state.borrow().clone()
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.state.borrow(), SessionHandle::Closed)
    }

    /// Wait for the launch to settle and return the running engine.
    pub async fn engine(&self) -> Result<Arc<dyn Engine>> {
        let mut rx = self.state.subscribe();
        let handle = rx
            .wait_for(SessionHandle::is_settled)
            .await
            .map_err(|_| Error::SessionClosed)?;
        match &*handle {
            SessionHandle::Ready(engine) => Ok(Arc::clone(engine)),
            SessionHandle::Failed(reason) => Err(Error::SessionInit(reason.clone())),
            _ => Err(Error::SessionClosed),
        }
    }

    /// Open a page for the exclusive use of one attempt.
    ///
    /// Waits for a free slot when `max_open_pages` pages are already open.
    /// Fails with [`Error::SessionClosed`] once the session is closed.
    pub(crate) async fn open_page(&self, timeout: Duration) -> Result<PageGuard> {
        let permit = Arc::clone(&self.pages)
            .acquire_owned()
            .await
            .map_err(|_| Error::SessionClosed)?;
        let engine = self.engine().await?;
        let mut page = engine.new_page().await.map_err(|err| {
            if self.is_closed() {
                Error::SessionClosed
            } else {
                err
            }
        })?;
        page.set_timeout(timeout);
        let guard = PageGuard {
            page: Some(page),
            verbose: self.verbose,
            _permit: permit,
        };
        if self.is_closed() {
            guard.close().await;
            return Err(Error::SessionClosed);
        }
        Ok(guard)
    }

    /// Close the engine. Pending and later scrapes fail with
    /// [`Error::SessionClosed`]. Closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        let mut previous = None;
        self.state.send_if_modified(|handle| {
            if matches!(handle, SessionHandle::Closed) {
                return false;
            }
            previous = Some(std::mem::replace(handle, SessionHandle::Closed));
            true
        });
        self.pages.close();
        if let Some(SessionHandle::Ready(engine)) = previous {
            engine.close().await?;
            if self.verbose {
                info!("<--x Browser closed");
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &*self.state.borrow())
            .field("available_pages", &self.pages.available_permits())
            .finish()
    }
}

/// A page plus its slot in the open-page budget.
///
/// [`close`](Self::close) is the normal exit. If the guard is dropped without
/// it (the scrape future was cancelled) the page is closed on a spawned task.
pub(crate) struct PageGuard {
    page: Option<Box<dyn EnginePage>>,
    verbose: bool,
    _permit: OwnedSemaphorePermit,
}

impl PageGuard {
    pub(crate) fn page(&self) -> Result<&dyn EnginePage> {
        self.page.as_deref().ok_or(Error::SessionClosed)
    }

    pub(crate) async fn close(mut self) {
        if let Some(page) = self.page.take() {
            match page.close().await {
                Ok(()) if self.verbose => info!("<--x Page closed"),
                Err(err) if self.verbose => warn!(error = %err, "failed to close page"),
                _ => {}
            }
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            let verbose = self.verbose;
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move {
                    match page.close().await {
                        Err(err) if verbose => warn!(error = %err, "failed to close abandoned page"),
                        _ => {}
                    }
                });
            }
        }
    }
}
