//! Error types for the rotel-client crate.

use std::io;
use std::time::Duration;

use rotel_profiles::ProfileError;

/// Errors surfaced to callers of the protocol client.
///
/// Read-side failures are reported separately as [`ReadError`] and never
/// leave the receive loop; they trigger reconnection instead.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The transport could not be opened
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        /// The `host:port` that was dialled
        addr: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Opening the transport took longer than the configured connect timeout
    #[error("Timed out connecting to {addr} after {timeout:?}")]
    ConnectTimeout {
        /// The `host:port` that was dialled
        addr: String,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// A write did not complete within the configured write timeout
    #[error("Timed out writing to {addr} after {timeout:?}")]
    WriteTimeout {
        /// The `host:port` being written to
        addr: String,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// A write was attempted without a live connection
    #[error("Not connected")]
    NotConnected,

    /// Writing to the connection failed
    #[error("Failed to send command: {0}")]
    Send(#[source] io::Error),

    /// The command cannot be encoded as ASCII
    #[error("Command is not ASCII: {0:?}")]
    InvalidCommand(String),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The bound profile lacks something the operation needs
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),
}

/// Failures observed while reading from a connection.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The peer closed the stream (zero-length read)
    #[error("Connection closed by peer")]
    Closed,

    /// The read itself failed
    #[error("Read failed: {0}")]
    Io(#[from] io::Error),
}

/// Convenience type alias for Results using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rotel_profiles::CommandName;

    #[test]
    fn test_client_error_display() {
        let error = ClientError::Connect {
            addr: "10.0.0.5:9590".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(error.to_string(), "Failed to connect to 10.0.0.5:9590: refused");

        let error = ClientError::ConnectTimeout {
            addr: "10.0.0.5:9590".to_string(),
            timeout: Duration::from_secs(5),
        };
        assert_eq!(error.to_string(), "Timed out connecting to 10.0.0.5:9590 after 5s");

        assert_eq!(ClientError::NotConnected.to_string(), "Not connected");
        assert_eq!(
            ClientError::InvalidCommand("vol_é!".to_string()).to_string(),
            "Command is not ASCII: \"vol_é!\""
        );
    }

    #[test]
    fn test_error_conversion_from_profile_error() {
        let profile_error = ProfileError::MissingCommand {
            profile: "custom".to_string(),
            command: CommandName::PushOn,
        };
        let client_error: ClientError = profile_error.into();

        match client_error {
            ClientError::Profile(e) => assert!(e.to_string().contains("push_on")),
            _ => panic!("Expected Profile variant"),
        }
    }

    #[test]
    fn test_read_error_display() {
        assert_eq!(ReadError::Closed.to_string(), "Connection closed by peer");
        let error: ReadError = io::Error::new(io::ErrorKind::ConnectionReset, "reset").into();
        assert_eq!(error.to_string(), "Read failed: reset");
    }
}
