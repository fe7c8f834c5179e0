//! View lifetimes.

use tokio_util::sync::{CancellationToken, DropGuard};

/// Cancellation handle tied to the lifetime of a view.
///
/// Clones share the same state. Closing any clone (or a parent) stops
/// delivery of every aggregation waiting on it.
#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    token: CancellationToken,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope closed together with this one, but closable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Tear the view down.
    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the scope is closed.
    pub async fn closed(&self) {
        self.token.cancelled().await
    }

    /// Close the scope when the returned guard is dropped.
    pub fn close_on_drop(self) -> DropGuard {
        self.token.drop_guard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_follows_parent() {
        let parent = ViewScope::new();
        let child = parent.child();
        assert!(!child.is_closed());

        parent.close();
        assert!(child.is_closed());
    }

    #[test]
    fn test_child_closes_alone() {
        let parent = ViewScope::new();
        let child = parent.child();

        child.close();
        assert!(child.is_closed());
        assert!(!parent.is_closed());
    }

    #[test]
    fn test_drop_guard_closes() {
        let scope = ViewScope::new();
        let observer = scope.clone();
        {
            let _guard = scope.close_on_drop();
        }
        assert!(observer.is_closed());
    }

    #[test]
    fn test_closed_wakes_waiter() {
        let scope = ViewScope::new();
        let mut closed = tokio_test::task::spawn(scope.closed());
        tokio_test::assert_pending!(closed.poll());

        scope.close();
        assert!(closed.is_woken());
        tokio_test::assert_ready!(closed.poll());
    }
}
