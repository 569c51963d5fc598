use std::fmt;

use crate::device::DeviceIndex;

/// Server-assigned stream index identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamIndex(pub u32);

impl fmt::Display for StreamIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stream kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Client playback stream attached to an output device (sink input)
    Playback,
    /// Client capture stream attached to an input device (source output)
    Capture,
}

/// Sample format of a stream's audio data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Unsigned 8-bit PCM
    U8,
    /// Signed 16-bit PCM, little-endian
    S16LE,
    /// Signed 16-bit PCM, big-endian
    S16BE,
    /// Signed 24-bit PCM packed, little-endian
    S24LE,
    /// Signed 24-bit PCM packed, big-endian
    S24BE,
    /// Signed 32-bit PCM, little-endian
    S32LE,
    /// Signed 32-bit PCM, big-endian
    S32BE,
    /// 32-bit IEEE float, little-endian
    F32LE,
    /// 32-bit IEEE float, big-endian
    F32BE,
    /// Format not recognized by this facade
    Unknown,
}

impl SampleFormat {
    /// Human-readable description of the format.
    pub fn description(&self) -> &'static str {
        match self {
            Self::U8 => "8-bit unsigned PCM",
            Self::S16LE => "16-bit signed PCM (little-endian)",
            Self::S16BE => "16-bit signed PCM (big-endian)",
            Self::S24LE => "24-bit signed PCM (little-endian)",
            Self::S24BE => "24-bit signed PCM (big-endian)",
            Self::S32LE => "32-bit signed PCM (little-endian)",
            Self::S32BE => "32-bit signed PCM (big-endian)",
            Self::F32LE => "32-bit float PCM (little-endian)",
            Self::F32BE => "32-bit float PCM (big-endian)",
            Self::Unknown => "Unknown format",
        }
    }
}

/// One live client stream, as enumerated by the stream list queries.
///
/// Owned by the caller; values are copied out of the callback data and do
/// not reference server storage.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    /// Server-assigned stream index
    pub index: StreamIndex,
    /// Index of the device the stream is attached to
    pub device_index: DeviceIndex,
    /// Stream name as reported by the client
    pub name: String,
    /// Driver name (e.g. "protocol-native.c")
    pub driver: String,
    /// Owning module index, if any
    pub owner_module: Option<u32>,
    /// Per-channel volume percentages
    pub volume_percent: Vec<u32>,
    /// Channel count of the stream's sample spec
    pub channel_count: u8,
    /// Sample format of the stream's sample spec
    pub format: SampleFormat,
    /// Full property list as owned key/value pairs
    pub properties: Vec<(String, String)>,
    /// Whether this is a playback or a capture stream
    pub kind: StreamKind,
}

impl StreamInfo {
    /// Value of one stream property, when present.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Application name from the property list, when the client set one.
    pub fn application_name(&self) -> Option<&str> {
        self.property("application.name")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_lookup() {
        let stream = StreamInfo {
            index: StreamIndex(7),
            device_index: DeviceIndex(0),
            name: "playback".to_string(),
            driver: "protocol-native.c".to_string(),
            owner_module: None,
            volume_percent: vec![100, 100],
            channel_count: 2,
            format: SampleFormat::S16LE,
            properties: vec![(
                "application.name".to_string(),
                "Music Player".to_string(),
            )],
            kind: StreamKind::Playback,
        };

        assert_eq!(stream.application_name(), Some("Music Player"));
        assert_eq!(stream.property("media.role"), None);
    }

    #[test]
    fn sample_format_descriptions() {
        assert_eq!(
            SampleFormat::S16LE.description(),
            "16-bit signed PCM (little-endian)"
        );
        assert_eq!(SampleFormat::Unknown.description(), "Unknown format");
    }
}
