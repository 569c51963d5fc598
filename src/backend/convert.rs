use std::borrow::Cow;

use libpulse_binding::{
    channelmap::{Map, Position},
    context::introspect::{SinkInfo, SinkInputInfo, SourceInfo, SourceOutputInfo},
    sample::Format,
    volume::{ChannelVolumes, Volume},
};

use crate::{
    device::{DeviceKind, Port},
    stream::{SampleFormat, StreamIndex, StreamInfo, StreamKind},
};

/// Convert a percentage in 0..=100 to a raw volume against the norm.
///
/// 0 maps to `Volume::MUTED`, 100 to `Volume::NORMAL`; values in between
/// scale linearly. Callers validate the range beforehand.
pub(crate) fn percent_to_volume(percent: u32) -> Volume {
    Volume(percent * Volume::NORMAL.0 / 100)
}

/// Convert a raw volume to a percentage of the norm, rounded to nearest.
pub(crate) fn volume_to_percent(volume: Volume) -> u32 {
    let norm = u64::from(Volume::NORMAL.0);
    let scaled = u64::from(volume.0) * 100 + norm / 2;
    u32::try_from(scaled / norm).unwrap_or(u32::MAX)
}

/// Build a uniform volume vector: every channel at the same percentage.
pub(crate) fn uniform_volume(channels: u8, percent: u32) -> ChannelVolumes {
    let mut volumes = ChannelVolumes::default();
    volumes.set(channels, percent_to_volume(percent));
    volumes
}

/// Per-channel percentages of a volume vector.
pub(crate) fn channel_volumes_to_percent(volumes: &ChannelVolumes) -> Vec<u32> {
    volumes.get().iter().map(|v| volume_to_percent(*v)).collect()
}

/// Pretty label for a channel position, matching the server's own naming.
///
/// Auxiliary positions are numbered individually, "Auxiliary 0" through
/// "Auxiliary 31".
pub(crate) fn position_label(position: Position) -> String {
    let aux = position as i32 - Position::Aux0 as i32;
    if (0..32).contains(&aux) {
        return format!("Auxiliary {aux}");
    }

    let named = match position {
        Position::Mono => "Mono",
        Position::FrontLeft => "Front Left",
        Position::FrontRight => "Front Right",
        Position::FrontCenter => "Front Center",
        Position::RearCenter => "Rear Center",
        Position::RearLeft => "Rear Left",
        Position::RearRight => "Rear Right",
        Position::Lfe => "Subwoofer",
        Position::FrontLeftOfCenter => "Front Left-of-center",
        Position::FrontRightOfCenter => "Front Right-of-center",
        Position::SideLeft => "Side Left",
        Position::SideRight => "Side Right",
        Position::TopCenter => "Top Center",
        Position::TopFrontLeft => "Top Front Left",
        Position::TopFrontRight => "Top Front Right",
        Position::TopFrontCenter => "Top Front Center",
        Position::TopRearLeft => "Top Rear Left",
        Position::TopRearRight => "Top Rear Right",
        Position::TopRearCenter => "Top Rear Center",
        _ => "Invalid",
    };
    named.to_string()
}

/// Channel position labels for every active channel of a map.
pub(crate) fn channel_labels(map: &Map) -> Vec<String> {
    map.get()
        .iter()
        .map(|position| position_label(*position))
        .collect()
}

/// Sample format of a stream's sample spec, `Unknown` for encodings the
/// facade does not name.
pub(crate) fn sample_format(format: Format) -> SampleFormat {
    match format {
        Format::U8 => SampleFormat::U8,
        Format::S16le => SampleFormat::S16LE,
        Format::S16be => SampleFormat::S16BE,
        Format::S24le => SampleFormat::S24LE,
        Format::S24be => SampleFormat::S24BE,
        Format::S32le => SampleFormat::S32LE,
        Format::S32be => SampleFormat::S32BE,
        Format::F32le => SampleFormat::F32LE,
        Format::F32be => SampleFormat::F32BE,
        _ => SampleFormat::Unknown,
    }
}

pub(crate) fn cow_str_to_string(cow_str: Option<&Cow<str>>) -> String {
    cow_str.map(|s| s.to_string()).unwrap_or_default()
}

/// Owned copy of one sink or source introspection record.
///
/// Everything the snapshot builder and the hardware probes need, captured
/// inside the callback so no server-borrowed storage escapes it.
#[derive(Debug, Clone)]
pub(crate) struct ServerDevice {
    pub index: u32,
    pub code: String,
    pub description: String,
    pub sample_rate: u32,
    pub channels: u8,
    pub channel_labels: Vec<String>,
    pub volume_percent: Vec<u32>,
    pub master_volume_percent: u32,
    pub muted: bool,
    pub card: Option<u32>,
    pub alsa_card: Option<String>,
    pub alsa_device: Option<String>,
    pub alsa_card_name: Option<String>,
    pub ports: Vec<Port>,
    pub kind: DeviceKind,
}

/// Capture an owned device record from sink introspection data.
pub(crate) fn server_device_from_sink(sink_info: &SinkInfo) -> ServerDevice {
    let active_port = sink_info
        .active_port
        .as_ref()
        .and_then(|p| p.name.as_ref().map(|s| s.to_string()));
    let ports = sink_info
        .ports
        .iter()
        .map(|port| {
            let name = cow_str_to_string(port.name.as_ref());
            let is_active = active_port.as_deref() == Some(name.as_str());
            Port {
                name,
                description: cow_str_to_string(port.description.as_ref()),
                is_active,
            }
        })
        .collect();

    ServerDevice {
        index: sink_info.index,
        code: cow_str_to_string(sink_info.name.as_ref()),
        description: cow_str_to_string(sink_info.description.as_ref()),
        sample_rate: sink_info.sample_spec.rate,
        channels: sink_info.sample_spec.channels,
        channel_labels: channel_labels(&sink_info.channel_map),
        volume_percent: channel_volumes_to_percent(&sink_info.volume),
        master_volume_percent: volume_to_percent(sink_info.volume.avg()),
        muted: sink_info.mute,
        card: sink_info.card,
        alsa_card: sink_info.proplist.get_str("alsa.card"),
        alsa_device: sink_info.proplist.get_str("alsa.device"),
        alsa_card_name: sink_info.proplist.get_str("alsa.card_name"),
        ports,
        kind: DeviceKind::Output,
    }
}

/// Capture an owned device record from source introspection data.
pub(crate) fn server_device_from_source(source_info: &SourceInfo) -> ServerDevice {
    let active_port = source_info
        .active_port
        .as_ref()
        .and_then(|p| p.name.as_ref().map(|s| s.to_string()));
    let ports = source_info
        .ports
        .iter()
        .map(|port| {
            let name = cow_str_to_string(port.name.as_ref());
            let is_active = active_port.as_deref() == Some(name.as_str());
            Port {
                name,
                description: cow_str_to_string(port.description.as_ref()),
                is_active,
            }
        })
        .collect();

    ServerDevice {
        index: source_info.index,
        code: cow_str_to_string(source_info.name.as_ref()),
        description: cow_str_to_string(source_info.description.as_ref()),
        sample_rate: source_info.sample_spec.rate,
        channels: source_info.sample_spec.channels,
        channel_labels: channel_labels(&source_info.channel_map),
        volume_percent: channel_volumes_to_percent(&source_info.volume),
        master_volume_percent: volume_to_percent(source_info.volume.avg()),
        muted: source_info.mute,
        card: source_info.card,
        alsa_card: source_info.proplist.get_str("alsa.card"),
        alsa_device: source_info.proplist.get_str("alsa.device"),
        alsa_card_name: source_info.proplist.get_str("alsa.card_name"),
        ports,
        kind: DeviceKind::Input,
    }
}

fn owned_properties(proplist: &libpulse_binding::proplist::Proplist) -> Vec<(String, String)> {
    proplist
        .iter()
        .filter_map(|key| proplist.get_str(&key).map(|value| (key, value)))
        .collect()
}

/// Create stream info from sink input introspection data.
pub(crate) fn stream_from_sink_input(sink_input_info: &SinkInputInfo) -> StreamInfo {
    StreamInfo {
        index: StreamIndex(sink_input_info.index),
        device_index: crate::device::DeviceIndex(sink_input_info.sink),
        name: cow_str_to_string(sink_input_info.name.as_ref()),
        driver: cow_str_to_string(sink_input_info.driver.as_ref()),
        owner_module: sink_input_info.owner_module,
        volume_percent: channel_volumes_to_percent(&sink_input_info.volume),
        channel_count: sink_input_info.sample_spec.channels,
        format: sample_format(sink_input_info.sample_spec.format),
        properties: owned_properties(&sink_input_info.proplist),
        kind: StreamKind::Playback,
    }
}

/// Create stream info from source output introspection data.
pub(crate) fn stream_from_source_output(source_output_info: &SourceOutputInfo) -> StreamInfo {
    StreamInfo {
        index: StreamIndex(source_output_info.index),
        device_index: crate::device::DeviceIndex(source_output_info.source),
        name: cow_str_to_string(source_output_info.name.as_ref()),
        driver: cow_str_to_string(source_output_info.driver.as_ref()),
        owner_module: source_output_info.owner_module,
        volume_percent: channel_volumes_to_percent(&source_output_info.volume),
        channel_count: source_output_info.sample_spec.channels,
        format: sample_format(source_output_info.sample_spec.format),
        properties: owned_properties(&source_output_info.proplist),
        kind: StreamKind::Capture,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_endpoints_map_to_muted_and_norm() {
        assert_eq!(percent_to_volume(0), Volume::MUTED);
        assert_eq!(percent_to_volume(100), Volume::NORMAL);
    }

    #[test]
    fn percent_round_trip_within_one_step() {
        for percent in [0_u32, 1, 25, 50, 63, 99, 100] {
            let back = volume_to_percent(percent_to_volume(percent));
            assert!(
                back.abs_diff(percent) <= 1,
                "percent {percent} came back as {back}"
            );
        }
    }

    #[test]
    fn uniform_volume_covers_every_channel() {
        let volumes = uniform_volume(2, 50);
        assert_eq!(volumes.len(), 2);
        let expected = percent_to_volume(50);
        assert!(volumes.get().iter().all(|v| *v == expected));
    }

    #[test]
    fn stereo_positions_use_pretty_labels() {
        assert_eq!(position_label(Position::FrontLeft), "Front Left");
        assert_eq!(position_label(Position::FrontRight), "Front Right");
        assert_eq!(position_label(Position::Lfe), "Subwoofer");
    }

    #[test]
    fn aux_positions_are_numbered_individually() {
        assert_eq!(position_label(Position::Aux0), "Auxiliary 0");
        assert_eq!(position_label(Position::Aux7), "Auxiliary 7");
        assert_eq!(position_label(Position::Aux31), "Auxiliary 31");
        assert_ne!(position_label(Position::Aux0), position_label(Position::Aux1));
    }

    #[test]
    fn stereo_map_labels() {
        let mut map = Map::default();
        map.init_stereo();
        assert_eq!(channel_labels(&map), vec!["Front Left", "Front Right"]);
    }

    #[test]
    fn sample_formats_map_with_unknown_fallback() {
        assert_eq!(sample_format(Format::S16le), SampleFormat::S16LE);
        assert_eq!(sample_format(Format::F32be), SampleFormat::F32BE);
        assert_eq!(sample_format(Format::Invalid), SampleFormat::Unknown);
    }
}
