//! Configuration types for the rotel-client crate
//!
//! This module defines [`ClientConfig`], which controls timeouts, pacing and
//! the reconnect backoff of a [`RotelClient`](crate::RotelClient).

use std::time::Duration;

use crate::error::ClientError;

/// Configuration for a RotelClient
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long `query` waits for the answering message
    /// Default: 2 seconds
    pub query_timeout: Duration,

    /// Delay between the queries sent by `refresh_all`
    /// Default: 50 milliseconds
    pub refresh_pacing: Duration,

    /// First reconnect delay, and the value the delay resets to
    /// Default: 1 second
    pub backoff_floor: Duration,

    /// Upper bound of the doubling reconnect delay
    /// Default: 30 seconds
    pub backoff_ceiling: Duration,

    /// Bound on opening the TCP connection
    /// Default: 5 seconds
    pub connect_timeout: Duration,

    /// Bound on writing one command or shutting the stream down
    /// Default: 5 seconds
    pub write_timeout: Duration,

    /// Maximum bytes taken per read
    /// Default: 1024
    pub read_chunk_size: usize,

    /// Bytes buffered without a terminator before the buffer is discarded
    /// Default: 4096
    pub max_frame_buffer: usize,

    /// Re-enable push updates and poll state after an automatic reconnect
    /// Default: true
    pub resync_on_reconnect: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(2),
            refresh_pacing: Duration::from_millis(50),
            backoff_floor: Duration::from_secs(1),
            backoff_ceiling: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            read_chunk_size: 1024,
            max_frame_buffer: rotel_parser::DEFAULT_MAX_BUFFER,
            resync_on_reconnect: true,
        }
    }
}

impl ClientConfig {
    /// Create a new ClientConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ClientConfig that retries dropped connections quickly
    pub fn fast_reconnect() -> Self {
        Self {
            backoff_floor: Duration::from_millis(250),
            backoff_ceiling: Duration::from_secs(5),
            ..Default::default()
        }
    }

    /// Create a ClientConfig for slow devices or congested networks
    pub fn patient() -> Self {
        Self {
            query_timeout: Duration::from_secs(5),
            refresh_pacing: Duration::from_millis(100),
            connect_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            ..Default::default()
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.query_timeout.is_zero() {
            return Err(ClientError::Configuration(
                "Query timeout must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(ClientError::Configuration(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        if self.write_timeout.is_zero() {
            return Err(ClientError::Configuration(
                "Write timeout must be greater than 0".to_string(),
            ));
        }

        if self.backoff_floor.is_zero() {
            return Err(ClientError::Configuration(
                "Backoff floor must be greater than 0".to_string(),
            ));
        }

        if self.backoff_floor > self.backoff_ceiling {
            return Err(ClientError::Configuration(
                "Invalid backoff: floor must not exceed ceiling".to_string(),
            ));
        }

        if self.read_chunk_size == 0 {
            return Err(ClientError::Configuration(
                "Read chunk size must be greater than 0".to_string(),
            ));
        }

        if self.max_frame_buffer < self.read_chunk_size {
            return Err(ClientError::Configuration(
                "Max frame buffer must be at least the read chunk size".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_refresh_pacing(mut self, pacing: Duration) -> Self {
        self.refresh_pacing = pacing;
        self
    }

    pub fn with_backoff(mut self, floor: Duration, ceiling: Duration) -> Self {
        self.backoff_floor = floor;
        self.backoff_ceiling = ceiling;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_resync_on_reconnect(mut self, enabled: bool) -> Self {
        self.resync_on_reconnect = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.query_timeout, Duration::from_secs(2));
        assert_eq!(config.refresh_pacing, Duration::from_millis(50));
        assert_eq!(config.backoff_floor, Duration::from_secs(1));
        assert_eq!(config.backoff_ceiling, Duration::from_secs(30));
        assert!(config.resync_on_reconnect);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case::inverted_backoff(ClientConfig::default().with_backoff(Duration::from_secs(10), Duration::from_secs(1)))]
    #[case::zero_query_timeout(ClientConfig::default().with_query_timeout(Duration::ZERO))]
    #[case::zero_connect_timeout(ClientConfig::default().with_connect_timeout(Duration::ZERO))]
    #[case::zero_write_timeout(ClientConfig::default().with_write_timeout(Duration::ZERO))]
    #[case::zero_chunk(ClientConfig { read_chunk_size: 0, ..Default::default() })]
    #[case::tiny_buffer(ClientConfig { max_frame_buffer: 16, ..Default::default() })]
    fn test_config_validation_rejects(#[case] config: ClientConfig) {
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_presets() {
        let fast = ClientConfig::fast_reconnect();
        assert_eq!(fast.backoff_floor, Duration::from_millis(250));
        assert!(fast.validate().is_ok());

        let patient = ClientConfig::patient();
        assert_eq!(patient.query_timeout, Duration::from_secs(5));
        assert!(patient.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ClientConfig::new()
            .with_query_timeout(Duration::from_millis(500))
            .with_refresh_pacing(Duration::from_millis(10))
            .with_backoff(Duration::from_millis(100), Duration::from_secs(2))
            .with_connect_timeout(Duration::from_secs(1))
            .with_resync_on_reconnect(false);

        assert_eq!(config.query_timeout, Duration::from_millis(500));
        assert_eq!(config.backoff_ceiling, Duration::from_secs(2));
        assert!(!config.resync_on_reconnect);
        assert!(config.validate().is_ok());
    }
}
