//! Cancellation of store-bound operations.

use std::fmt;
use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Marker returned when a [`CancellationToken`] fires first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation cancelled")
    }
}

/// Run `fut` until it finishes or `cancel` fires, whichever comes first.
///
/// An already-cancelled token wins without polling `fut`.
pub async fn cancellable<T, E, F>(cancel: &CancellationToken, fut: F) -> Result<T, E>
where
    E: From<Cancelled>,
    F: Future<Output = Result<T, E>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cancelled.into()),
        result = fut => result,
    }
}
