use std::fmt;

/// Server-assigned device index identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIndex(pub u32);

impl fmt::Display for DeviceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Device kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Audio output device (sink: speakers, headphones)
    Output,
    /// Audio input device (source: microphone, line-in)
    Input,
}

/// Card profile attached to a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Profile name (e.g. "output:analog-stereo")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Channel count in use while the profile list was captured.
    ///
    /// The server does not report a per-profile channel layout, so every
    /// profile of a device carries the channel count of the device's
    /// current sample spec.
    pub channels: u32,
}

/// Physical or logical port of a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    /// Port name (e.g. "analog-input-internal-mic")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Whether this is the device's active port
    pub is_active: bool,
}

/// Snapshot of one output or input device.
///
/// Built once during manager construction (or an explicit refresh) from the
/// server's sink/source introspection, enriched with ALSA hardware
/// capability probes. All strings are owned.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// Server-assigned index
    pub index: DeviceIndex,
    /// Server name (e.g. "alsa_output.pci-0000_00_1b.0.analog-stereo")
    pub code: String,
    /// Human-readable description (e.g. "Built-in Audio")
    pub name: String,
    /// ALSA hardware id ("hw:C,D"), absent for virtual devices
    pub hardware_id: Option<String>,
    /// Sample rate in Hz, hardware-probed with server fallback
    pub sample_rate: u32,
    /// Minimum channel count the hardware supports
    pub min_channels: u8,
    /// Maximum channel count the hardware supports
    pub max_channels: u8,
    /// Channel position labels, one per channel up to `max_channels`
    pub channel_names: Vec<String>,
    /// Average volume across all channels, as a percentage of the norm
    pub master_volume_percent: u32,
    /// Per-channel volume percentages at snapshot time
    pub channel_volume_percent: Vec<u32>,
    /// Whole-device mute state
    pub muted: bool,
    /// Profiles of the owning card
    pub profiles: Vec<Profile>,
    /// Active profile of the owning card, when resolvable
    pub active_profile: Option<Profile>,
    /// Ports exposed by the device
    pub ports: Vec<Port>,
    /// Whether this is an output or an input device
    pub kind: DeviceKind,
}

impl Device {
    /// Volume of one channel as captured in the snapshot.
    ///
    /// Returns `None` for a channel index at or beyond the channel count
    /// instead of indexing out of bounds.
    pub fn channel_volume(&self, channel: u8) -> Option<u32> {
        self.channel_volume_percent.get(usize::from(channel)).copied()
    }
}
