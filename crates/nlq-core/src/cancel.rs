//! Cancellation of in-flight collaborator calls

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{NlqError, Result};

/// Race `fut` against `cancel`. The collaborator future is dropped when the
/// token fires first.
pub async fn with_cancel<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(NlqError::Cancelled),
        res = fut => res,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancelled_token_wins() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let res: Result<()> = with_cancel(&cancel, std::future::pending()).await;
        assert!(matches!(res, Err(NlqError::Cancelled)));
    }

    #[tokio::test]
    async fn test_completed_future_passes_through() {
        let cancel = CancellationToken::new();
        let res = with_cancel(&cancel, async { Ok(7) }).await.unwrap();
        assert_eq!(res, 7);
    }
}
