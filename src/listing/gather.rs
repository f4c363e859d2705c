//! All-or-nothing ordered join.

use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;

/// Run `futures` with at most `limit` in flight and collect their outputs in
/// input order.
///
/// The first error ends the join: futures still running are dropped and the
/// error is returned, so callers never observe a partial result.
pub async fn gather_all_or_fail<I, F, T, E>(futures: I, limit: usize) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    stream::iter(futures)
        .buffered(limit.max(1))
        .try_collect()
        .await
}
