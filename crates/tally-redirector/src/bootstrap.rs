//! Startup reconciliation of the counter cache with the durable store.

use crate::error::StartupError;
use tally_core::{RedirectCounter, Store};
use tracing::info;

/// Brings the schema up to date and seeds the counter cache from the
/// durable counter.
///
/// Every failure is fatal: serving with an unknown counter would hand out
/// values that were already used.
pub async fn start<S: Store + ?Sized>(store: &S) -> Result<RedirectCounter, StartupError> {
    store.initialize().await.map_err(StartupError::Initialize)?;

    let durable = store
        .read_counter()
        .await
        .map_err(StartupError::ReadCounter)?;
    info!(count = durable, "redirect count loaded from store");

    Ok(RedirectCounter::initialize_from(durable))
}
