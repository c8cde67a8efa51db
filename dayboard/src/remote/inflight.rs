//! In-flight request registry
//!
//! Callers asking for the same resource key while a request is outstanding
//! share its result instead of issuing a duplicate. Each registry belongs to
//! one service instance, so separate instances never see each other's
//! requests.

use crate::error::{AppError, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;

type SharedResult<T> = Shared<BoxFuture<'static, std::result::Result<T, String>>>;

/// Resource key → pending shared result
pub struct InflightRegistry<T: Clone> {
    pending: Mutex<HashMap<String, SharedResult<T>>>,
}

impl<T: Clone> Default for InflightRegistry<T> {
    fn default() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> InflightRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Await the request for `key`, starting it with `start` if none is running
    pub async fn run<F, Fut>(&self, key: &str, start: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let request = {
            let mut pending = self.pending.lock();
            match pending.get(key) {
                Some(existing) => {
                    tracing::debug!("Joining in-flight request for {}", key);
                    existing.clone()
                }
                None => {
                    let request = start()
                        .map(|result| result.map_err(|e| e.to_string()))
                        .boxed()
                        .shared();
                    pending.insert(key.to_string(), request.clone());
                    request
                }
            }
        };

        let result = request.clone().await;

        {
            let mut pending = self.pending.lock();
            if pending.get(key).is_some_and(|current| current.ptr_eq(&request)) {
                pending.remove(key);
            }
        }

        result.map_err(AppError::Fetch)
    }

    /// Number of distinct requests currently outstanding
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }
}
