//! Navigation hook used when the session is invalidated

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

/// Route the console sends the principal to after a 401
pub const LOGIN_ROUTE: &str = "/login";

/// Moves the principal back to the login entry point
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

/// Only records the redirect in the log
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect_to_login(&self) {
        warn!(route = LOGIN_ROUTE, "Session invalidated, redirecting to login");
    }
}

/// Counts redirects; used by tests to observe session invalidation
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: AtomicUsize,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}
