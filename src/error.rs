use std::path::PathBuf;

use thiserror::Error;

use crate::{device::DeviceIndex, stream::StreamIndex};

/// Errors surfaced by the PulseAudio control facade.
///
/// Mutations and queries report failures through this enum; per-stream
/// migration failures during a default-device switch are logged and do not
/// surface here.
#[derive(Error, Debug)]
pub enum ControlError {
    /// Event loop, context or proplist allocation failed
    #[error("PulseAudio resource initialization failed: {0}")]
    ResourceInit(&'static str),

    /// Connection to the PulseAudio server could not be established
    #[error("PulseAudio connection failed: {0}")]
    ConnectionFailed(String),

    /// Operation attempted while the context is not in the ready state
    #[error("PulseAudio context is not ready")]
    NotReady,

    /// Device not found by index
    #[error("Device {0} not found")]
    DeviceNotFound(DeviceIndex),

    /// Device not found by server name
    #[error("Device '{0}' not found")]
    DeviceNotFoundByName(String),

    /// Stream not found
    #[error("Stream {0} not found")]
    StreamNotFound(StreamIndex),

    /// Volume percentage outside the 0..=100 range
    #[error("Volume percentage {0} exceeds 100")]
    InvalidPercent(u32),

    /// Channel index beyond the device's channel count
    #[error("Channel {channel} out of range for a device with {max} channels")]
    ChannelOutOfRange {
        /// Requested channel index
        channel: u8,
        /// Number of channels the device actually has
        max: u8,
    },

    /// The server reported failure or cancelled the operation
    #[error("PulseAudio operation failed: {0}")]
    OperationFailed(&'static str),

    /// No configuration file could be opened for writing
    #[error("failed to write '{path}': {details}")]
    ConfigWrite {
        /// Path of the configuration file last attempted
        path: PathBuf,
        /// Underlying I/O error details
        details: String,
    },

    /// Daemon restart request failed
    #[error("PulseAudio restart failed: {0}")]
    RestartFailed(String),
}

/// A specialized `Result` type for control facade operations.
pub type ControlResult<T> = std::result::Result<T, ControlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_errors_name_the_identifier() {
        assert_eq!(
            ControlError::DeviceNotFound(DeviceIndex(3)).to_string(),
            "Device 3 not found"
        );
        assert_eq!(
            ControlError::DeviceNotFoundByName("alsa_output.usb".to_string()).to_string(),
            "Device 'alsa_output.usb' not found"
        );
        assert_eq!(
            ControlError::StreamNotFound(StreamIndex(12)).to_string(),
            "Stream 12 not found"
        );
    }

    #[test]
    fn range_errors_carry_both_bounds() {
        let error = ControlError::ChannelOutOfRange { channel: 4, max: 2 };
        assert_eq!(
            error.to_string(),
            "Channel 4 out of range for a device with 2 channels"
        );
        assert_eq!(
            ControlError::InvalidPercent(150).to_string(),
            "Volume percentage 150 exceeds 100"
        );
    }

    #[test]
    fn config_errors_include_the_path() {
        let error = ControlError::ConfigWrite {
            path: PathBuf::from("/etc/pulse/daemon.conf"),
            details: "permission denied".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "failed to write '/etc/pulse/daemon.conf': permission denied"
        );
    }
}
