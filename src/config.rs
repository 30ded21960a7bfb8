use std::time::Duration;

/// Connection and timing settings for a [`DeskClient`](crate::client::DeskClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API, e.g. `https://desk.example.com/api`.
    pub api_base_url: String,
    /// WebSocket endpoint; the realtime ticket is appended as `?ticket=`.
    pub realtime_url: String,
    /// Quiet period after the last reorder before the bulk commit is sent.
    pub commit_debounce_ms: u64,
    /// Fixed delay between realtime reconnect attempts. Never grows.
    pub reconnect_interval_ms: u64,
    /// Consecutive failed realtime attempts before a warning notice is raised.
    pub reconnect_notice_after: u32,
    /// Capacity of the notice broadcast bus.
    pub notice_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080/api".to_string(),
            realtime_url: "ws://127.0.0.1:8080/ws".to_string(),
            commit_debounce_ms: 5000,
            reconnect_interval_ms: 3000,
            reconnect_notice_after: 10,
            notice_capacity: 64,
        }
    }
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>, realtime_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            realtime_url: realtime_url.into(),
            ..Default::default()
        }
    }

    pub fn with_commit_debounce_ms(mut self, ms: u64) -> Self {
        self.commit_debounce_ms = ms;
        self
    }

    pub fn with_reconnect_interval_ms(mut self, ms: u64) -> Self {
        self.reconnect_interval_ms = ms;
        self
    }

    pub fn with_reconnect_notice_after(mut self, attempts: u32) -> Self {
        self.reconnect_notice_after = attempts;
        self
    }

    pub fn commit_debounce(&self) -> Duration {
        Duration::from_millis(self.commit_debounce_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}
