//! Bulk pre-fetch-and-store for install time

use futures::future::join_all;

use super::SharedStore;
use crate::error::Result;
use crate::http::{Fetcher, ProxyRequest};

/// Fetch every URL and store all of them, or none.
///
/// Fetches run concurrently. Any transport failure or non-2xx status fails the
/// whole call before anything is written. Running it again rewrites the same
/// rows. Returns the number of entries stored.
pub async fn ensure_populated<F: Fetcher + ?Sized>(
    store: &SharedStore,
    fetcher: &F,
    partition: &str,
    urls: &[String],
) -> Result<usize> {
    let fetches = urls.iter().map(|url| async move {
        let response = fetcher
            .fetch(&ProxyRequest::get(url.as_str()))
            .await?
            .error_for_status(url)?;
        Ok::<_, crate::error::FetchError>((url.clone(), response))
    });

    let entries = join_all(fetches)
        .await
        .into_iter()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    store.put_all(partition, &entries)?;
    log::info!("Populated {} entries into {}", entries.len(), partition);

    Ok(entries.len())
}
