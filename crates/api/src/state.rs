//! Shared handler state.

use std::time::Duration;

use matching::Services;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    /// Interval between SSE keep-alive comments.
    pub keep_alive: Duration,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self { services, keep_alive: Duration::from_secs(15) }
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}
