use std::time::Duration;

use vvsp_chunk::DEFAULT_MAX_CHUNK_SIZE;

/// Client loop configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long one connect attempt waits for the host endpoint.
    pub connect_timeout: Duration,
    /// Read/write wake-up interval on endpoint streams, used to observe
    /// cancellation. Not a data deadline.
    pub io_timeout: Duration,
    /// Delay between connect retries while the endpoint is absent.
    pub retry_interval: Duration,
    /// Largest chunk payload accepted from the host.
    pub max_chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            io_timeout: Duration::from_millis(100),
            retry_interval: Duration::from_millis(50),
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}
