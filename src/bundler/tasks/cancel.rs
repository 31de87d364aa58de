//! Cooperative cancellation checkpoints.

use crate::bundler::{Error, Result};
use tokio_util::sync::CancellationToken;

/// Fails with [`Error::Cancelled`] once `token` has been cancelled.
///
/// Called between pipeline stages only; copies in flight always finish.
pub fn checkpoint(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint() {
        let token = CancellationToken::new();
        assert!(checkpoint(&token).is_ok());
        token.child_token().cancel();
        assert!(checkpoint(&token).is_ok());
        token.cancel();
        assert!(checkpoint(&token).unwrap_err().is_cancelled());
    }
}
