//! Bounded dispatch pool for request processing.
//!
//! One pool is shared by every connection of a server. Each request runs
//! as its own spawned task, but only `size` of them run at once; when all
//! worker slots are busy, `dispatch` waits, which backpressures the
//! connection read loops feeding it.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// A fixed-size pool of request-processing slots.
#[derive(Debug, Clone)]
pub(crate) struct DispatchPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl DispatchPool {
    pub(crate) fn new(size: usize) -> Self {
        DispatchPool {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Acquire a worker slot, then run `task` on the runtime. The permit
    /// rides inside the spawned task and frees the slot when it finishes.
    pub(crate) async fn dispatch<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .expect("worker pool semaphore closed");

        tokio::spawn(async move {
            let _permit = permit;
            task.await;
        });
    }
}
