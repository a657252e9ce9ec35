use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::Result;

type Loader<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// A value loaded on first use and shared afterwards.
///
/// Concurrent callers that arrive while the first load is pending wait on that same
/// load instead of starting their own. A failed load is not cached, so a later call
/// tries again.
pub struct LazyLoad<T> {
    cell: OnceCell<Arc<T>>,
    loader: Loader<T>,
    attempts: AtomicUsize,
}

impl<T: Send + Sync + 'static> LazyLoad<T> {
    #[inline]
    pub fn new<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            cell: OnceCell::new(),
            loader: Box::new(move || loader().boxed()),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Already-loaded value; `get` never runs a loader
    #[inline]
    pub fn ready(value: T) -> Self {
        Self {
            cell: OnceCell::new_with(Some(Arc::new(value))),
            loader: Box::new(|| {
                async {
                    Err::<T, _>(crate::DocsError::Index(
                        "preloaded value has no loader".to_string(),
                    ))
                }
                .boxed()
            }),
            attempts: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub async fn get(&self) -> Result<Arc<T>> {
        self.cell
            .get_or_try_init(|| async {
                let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                debug!("Starting lazy load (attempt {})", attempt);
                (self.loader)().await.map(Arc::new)
            })
            .await
            .map(Arc::clone)
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Number of times the loader has been started
    #[inline]
    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}
