//! Bounded parallel fan-out shared by the stager and the publisher

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Runs `op` once per name, at most `permits` at a time
///
/// Every name gets its own task. The first failure aborts the tasks still
/// running and is returned; later failures are dropped.
pub(crate) async fn for_each_bounded<F, Fut, E>(
    names: Vec<String>,
    permits: &Arc<Semaphore>,
    op: F,
) -> Result<(), E>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: From<JoinError> + Send + 'static,
{
    let mut tasks = JoinSet::new();

    for name in names {
        let permits = Arc::clone(permits);
        let fut = op(name);
        tasks.spawn(async move {
            // The semaphore is never closed
            let _permit = permits.acquire_owned().await;
            fut.await
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let result = match joined {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => continue,
            Err(e) => Err(E::from(e)),
        };

        if let Err(e) = result {
            tasks.abort_all();
            return Err(e);
        }
    }

    Ok(())
}
