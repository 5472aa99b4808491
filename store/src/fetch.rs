//! Remote archive store client and batch fetch coordination.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::{Mutex, mpsc};
use url::Url;

use crucible_types::{FetchError, PkgPath};

type FetchResult = Result<Arc<Vec<u8>>, FetchError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// HTTP client for the remote archive store.
///
/// Archives live at `GET {base}/pkg/{path}.a`; any non-success status is
/// a fetch failure for that path.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    base: Url,
    client: reqwest::Client,
}

impl ArchiveStore {
    pub fn new(mut base: Url) -> reqwest::Result<Self> {
        // Url::join drops the last path segment unless the base ends
        // with a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder().build()?;
        Ok(Self { base, client })
    }

    /// Retrieve the compiled archive bytes for one package.
    pub async fn fetch(&self, path: &PkgPath) -> Result<Vec<u8>, FetchError> {
        let url = self
            .base
            .join(&format!("pkg/{path}.a"))
            .map_err(|err| transport(path, err))?;
        tracing::debug!(%path, %url, "fetching archive");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| transport(path, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                path: path.clone(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(|err| transport(path, err))?;
        Ok(bytes.to_vec())
    }
}

fn transport(path: &PkgPath, err: impl std::fmt::Display) -> FetchError {
    FetchError::Transport {
        path: path.clone(),
        reason: err.to_string(),
    }
}

/// Issues and deduplicates archive retrievals.
///
/// Each batch spawns one task per path; completions come back as
/// messages on a single-consumer channel, so the caller's task is the
/// only place batch state is touched. The batch settles successfully
/// exactly once, when the completion count reaches the batch size; the
/// first failure settles it immediately and later completions are
/// discarded. An in-flight table of shared futures keeps concurrent
/// batches from issuing a second request for the same path; each entry
/// is removed as soon as its request settles, whether or not any batch
/// is still listening, so a failed fetch is retried with a fresh
/// request on the next batch.
#[derive(Debug)]
pub struct FetchCoordinator {
    store: ArchiveStore,
    in_flight: Arc<Mutex<HashMap<PkgPath, SharedFetch>>>,
}

impl FetchCoordinator {
    #[must_use]
    pub fn new(store: ArchiveStore) -> Self {
        Self {
            store,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fetch every path in the batch. Returns all payloads when the
    /// whole batch succeeded, or the first failure otherwise.
    pub async fn fetch_all(
        &self,
        paths: &[PkgPath],
    ) -> Result<Vec<(PkgPath, Arc<Vec<u8>>)>, FetchError> {
        let (tx, mut rx) = mpsc::channel(paths.len().max(1));
        for path in paths {
            let shared = self.checkout(path).await;
            let tx = tx.clone();
            let path = path.clone();
            tokio::spawn(async move {
                let result = shared.await;
                // Send fails only if the batch already settled; the
                // result is then deliberately discarded.
                let _ = tx.send((path, result)).await;
            });
        }
        drop(tx);

        let mut received = Vec::with_capacity(paths.len());
        while let Some((path, result)) = rx.recv().await {
            match result {
                Ok(bytes) => received.push((path, bytes)),
                Err(err) => {
                    tracing::warn!(%err, "fetch batch aborted");
                    return Err(err);
                }
            }
        }
        tracing::debug!(count = received.len(), "fetch batch settled");
        Ok(received)
    }

    /// Shared future for `path`, reusing an in-flight request if one
    /// exists.
    async fn checkout(&self, path: &PkgPath) -> SharedFetch {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(existing) = in_flight.get(path) {
            tracing::debug!(%path, "joining in-flight fetch");
            return existing.clone();
        }
        let store = self.store.clone();
        let owned = path.clone();
        let shared = async move { store.fetch(&owned).await.map(Arc::new) }
            .boxed()
            .shared();
        in_flight.insert(path.clone(), shared.clone());

        // Drive the request to completion and evict the entry once it
        // settles, even when every batch that wanted it has already
        // aborted. A settled result must never outlive its request in
        // the table.
        let driver = shared.clone();
        let table = Arc::clone(&self.in_flight);
        let owned = path.clone();
        tokio::spawn(async move {
            let _ = driver.clone().await;
            let mut table = table.lock().await;
            if table.get(&owned).is_some_and(|current| current.ptr_eq(&driver)) {
                table.remove(&owned);
            }
        });
        shared
    }
}
