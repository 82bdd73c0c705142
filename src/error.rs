//! Error types for the DQE core.
//!
//! Only `NotReady` is fatal to the caller; every other variant is local and
//! recoverable by reissuing a corrected request.

use thiserror::Error;

use crate::histogram::ChannelId;

/// DQE error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DqeError {
    /// Unknown channel identifier or malformed configuration
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Device has not been attached yet (or was detached)
    #[error("display quality enhancer is not initialized")]
    NotReady,

    /// Channel is armed or hibernating and cannot accept a new configuration
    #[error("histogram channel {channel} is busy")]
    Busy { channel: ChannelId },
}

impl DqeError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Whether reissuing the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady | Self::Busy { .. })
    }
}

/// Result type alias for DQE operations
pub type DqeResult<T> = std::result::Result<T, DqeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(DqeError::NotReady.is_retryable());
        assert!(DqeError::Busy {
            channel: ChannelId::new(1).unwrap()
        }
        .is_retryable());
        assert!(!DqeError::invalid("bad roi").is_retryable());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            DqeError::invalid("unknown histogram channel 9").to_string(),
            "invalid argument: unknown histogram channel 9"
        );
        let busy = DqeError::Busy {
            channel: ChannelId::new(2).unwrap(),
        };
        assert_eq!(busy.to_string(), "histogram channel 2 is busy");
    }
}
