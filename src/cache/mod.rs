//! Per-run fetch cache with in-flight request sharing
//!
//! A resolution run can reach the same file from several places: two extra
//! files that both import a shared helper, or several variants of the same
//! example. The [`FetchCache`] guarantees each absolute URL is requested from
//! the [`SourceLoader`] at most once per run.
//!
//! # Concurrency
//!
//! Entries are stored as [`Shared`] futures in a `DashMap`, keyed by absolute
//! URL. The first caller inserts the future; concurrent callers for the same
//! URL clone and await it instead of starting their own request. Completed
//! results stay in the map, so late callers get them without waiting.
//!
//! Failures are cached like successes. Every waiter on a failed URL receives
//! the same [`CodevarError`], and the run does not retry it.
//!
//! The map's shard lock is held only while the entry is looked up or inserted,
//! never across an `.await`.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, FutureExt, Shared};

use crate::core::CodevarError;
use crate::models::LoadedSource;
use crate::sources::SourceLoader;

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<LoadedSource>, CodevarError>>>;

/// Request-deduplicating cache in front of a [`SourceLoader`].
///
/// Cloning is cheap and clones share the same entries, so one cache can be
/// handed to every variant loaded in a run.
#[derive(Clone, Default)]
pub struct FetchCache {
    entries: Arc<DashMap<String, SharedLoad>>,
}

impl FetchCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `url` through `loader`, or join the request already made for it.
    ///
    /// # Errors
    ///
    /// [`CodevarError::SourceLoadFailed`] when the loader fails. The same error
    /// is returned to every caller of this URL for the lifetime of the cache.
    pub async fn get(
        &self,
        url: &str,
        loader: &Arc<dyn SourceLoader>,
    ) -> Result<Arc<LoadedSource>, CodevarError> {
        let pending = match self.entries.entry(url.to_string()) {
            Entry::Occupied(entry) => {
                tracing::debug!(target: "codevar::fetch", "Reusing request for {url}");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                tracing::debug!(target: "codevar::fetch", "Fetching {url}");
                let loader = Arc::clone(loader);
                let owned_url = url.to_string();
                let load = async move {
                    match loader.load_source(&owned_url).await {
                        Ok(loaded) => Ok(Arc::new(loaded)),
                        Err(err) => Err(CodevarError::SourceLoadFailed {
                            url: owned_url,
                            reason: format!("{err:#}"),
                        }),
                    }
                }
                .boxed()
                .shared();
                entry.insert(load.clone());
                load
            }
        };

        pending.await
    }

    /// Returns true if `url` has been requested through this cache.
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Number of distinct URLs requested.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been requested yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for FetchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCache").field("entries", &self.entries.len()).finish()
    }
}
