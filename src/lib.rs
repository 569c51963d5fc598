//! Pulsekit - Synchronous control library for PulseAudio.
//!
//! Pulsekit wraps PulseAudio's callback-driven client API behind plain
//! blocking calls. A [`PulseManager`] connects to the server, snapshots the
//! output and input devices with their ALSA hardware capabilities, and
//! offers methods for:
//!
//! - Volume and mute control, down to single channels
//! - Default-device switching with playback-stream migration
//! - Moving individual playback streams between devices
//! - Live device, card-profile and stream introspection
//! - Changing the daemon's global sample rate in `daemon.conf`
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pulsekit::PulseManager;
//!
//! # fn main() -> Result<(), pulsekit::ControlError> {
//! let mut manager = PulseManager::new()?;
//!
//! for device in manager.outputs() {
//!     println!("{}: {} ({} Hz)", device.index, device.name, device.sample_rate);
//! }
//!
//! let first = manager.outputs()[0].index;
//! manager.set_master_volume(first, 50)?;
//! # Ok(())
//! # }
//! ```

/// Error types and result alias.
pub mod error;

/// Device snapshot types: devices, profiles, ports.
pub mod device;

/// Stream snapshot types for playback and capture streams.
pub mod stream;

/// Daemon configuration: global sample rate and daemon restart.
pub mod daemon_config;

/// The synchronous manager over one server connection.
pub mod manager;

mod backend;
mod hardware;

pub use device::{Device, DeviceIndex, DeviceKind, Port, Profile};
pub use error::{ControlError, ControlResult};
pub use manager::PulseManager;
pub use stream::{SampleFormat, StreamIndex, StreamInfo, StreamKind};
