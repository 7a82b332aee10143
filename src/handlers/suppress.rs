use std::fmt::Display;
use std::future::Future;

use tracing::debug;

/// Await an optional operation, turning its failure into `None`.
///
/// The error is logged at debug level and never reaches the caller.
pub async fn ignore_errors<T, E, F>(operation: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match operation.await {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "Ignoring failed optional operation");
            None
        }
    }
}
