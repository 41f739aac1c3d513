use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use gridiron_core::GridironError;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

/// Bounded pool for blocking work.
///
/// At most `size` submitted calls execute at once; callers past the bound
/// wait asynchronously for a permit, so the serving scheduler keeps running
/// other requests while they wait.
#[derive(Debug, Clone)]
pub struct BlockingBridge {
    permits: Arc<Semaphore>,
    size: usize,
}

impl BlockingBridge {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Calls currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.size - self.permits.available_permits()
    }

    /// Runs `f` on a blocking worker and hands back its value untouched.
    /// A panicking worker becomes an error instead of unwinding into the caller.
    pub async fn run_blocking<F, R>(&self, f: F) -> Result<R, GridironError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| GridironError::BackendFetch("worker pool is closed".to_string()))?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await
        .map_err(worker_failure)
    }

    /// Awaits `fut` while holding a pool permit, for work that is already
    /// asynchronous but must count against the same bound.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, GridironError>
    where
        F: Future,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| GridironError::BackendFetch("worker pool is closed".to_string()))?;
        Ok(fut.await)
    }
}

fn worker_failure(err: JoinError) -> GridironError {
    if err.is_panic() {
        GridironError::BackendFetch(format!("worker panicked: {}", panic_message(err.into_panic())))
    } else {
        GridironError::BackendFetch("worker was cancelled".to_string())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown panic".to_string()),
    }
}
