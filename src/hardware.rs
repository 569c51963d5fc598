use alsa::{
    Card, Direction,
    pcm::{Access, Format, HwParams, PCM},
};
use tracing::{debug, warn};

use crate::device::DeviceKind;

/// ALSA hardware id derived from the server's property list values.
///
/// An `alsa.device` value that does not start with a decimal digit belongs
/// to a server-synthesised virtual device, which has no hardware id.
pub(crate) fn hardware_id(alsa_card: Option<&str>, alsa_device: Option<&str>) -> Option<String> {
    let card = alsa_card?;
    let device = alsa_device?;
    if device.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        Some(format!("hw:{card},{device}"))
    } else {
        None
    }
}

fn direction_for(kind: DeviceKind) -> Direction {
    match kind {
        DeviceKind::Output => Direction::Playback,
        DeviceKind::Input => Direction::Capture,
    }
}

fn probe_channels(hardware_id: &str, direction: Direction) -> Result<(u32, u32), alsa::Error> {
    let pcm = PCM::new(hardware_id, direction, true)?;
    let params = HwParams::any(&pcm)?;
    let min = params.get_channels_min()?;
    let max = params.get_channels_max()?;
    Ok((min, max))
}

/// Minimum and maximum channel counts of a device.
///
/// Falls back to the server-reported channel count on any probe failure
/// (device absent, busy, or virtual). The fallback is what keeps these
/// queries usable on mixed real/virtual device fleets.
pub(crate) fn channel_range(
    hardware_id: Option<&str>,
    kind: DeviceKind,
    server_channels: u8,
) -> (u8, u8) {
    let Some(id) = hardware_id else {
        return (server_channels, server_channels);
    };
    match probe_channels(id, direction_for(kind)) {
        Ok((min, max)) => match (u8::try_from(min), u8::try_from(max)) {
            (Ok(min), Ok(max)) if min <= max => (min, max),
            _ => (server_channels, server_channels),
        },
        Err(error) => {
            warn!("ALSA channel probe failed for {id}: {error}, using server value");
            (server_channels, server_channels)
        }
    }
}

fn probe_rate(hardware_id: &str, direction: Direction, channels: u8) -> Result<u32, alsa::Error> {
    let pcm = PCM::new(hardware_id, direction, true)?;
    let params = HwParams::any(&pcm)?;
    params.set_access(Access::RWInterleaved)?;
    params.set_format(Format::s16())?;
    params.set_channels(u32::from(channels))?;
    pcm.hw_params(&params)?;
    params.get_rate()
}

/// True sample rate of a device.
///
/// Opens the PCM, applies an S16 interleaved configuration at the
/// server-reported channel count, and reads back the negotiated rate.
/// Falls back to the server-reported rate on any failure.
pub(crate) fn sample_rate(
    hardware_id: Option<&str>,
    kind: DeviceKind,
    server_channels: u8,
    server_rate: u32,
) -> u32 {
    let Some(id) = hardware_id else {
        return server_rate;
    };
    match probe_rate(id, direction_for(kind), server_channels) {
        Ok(rate) => rate,
        Err(error) => {
            warn!("ALSA rate probe failed for {id}: {error}, using server value");
            server_rate
        }
    }
}

/// Friendly card name for an ALSA card number.
pub(crate) fn card_name(card_number: i32) -> Option<String> {
    let card = Card::new(card_number);
    match card.get_name() {
        Ok(name) => Some(name),
        Err(error) => {
            debug!("ALSA card name lookup failed for card {card_number}: {error}");
            None
        }
    }
}

/// Friendly hardware name of a device.
///
/// Asks ALSA directly when the card number is known; falls back to the
/// server-reported card name property for virtual devices.
pub(crate) fn friendly_name(
    alsa_card: Option<&str>,
    alsa_card_name: Option<&str>,
) -> Option<String> {
    alsa_card
        .and_then(|card| card.parse::<i32>().ok())
        .and_then(card_name)
        .or_else(|| alsa_card_name.map(|name| name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_id_requires_numeric_device() {
        assert_eq!(hardware_id(Some("0"), Some("0")), Some("hw:0,0".to_string()));
        assert_eq!(hardware_id(Some("1"), Some("3")), Some("hw:1,3".to_string()));
        assert_eq!(hardware_id(Some("0"), Some("surround40")), None);
        assert_eq!(hardware_id(None, Some("0")), None);
        assert_eq!(hardware_id(Some("0"), None), None);
        assert_eq!(hardware_id(Some("0"), Some("")), None);
    }

    #[test]
    fn channel_range_without_hardware_uses_server_count() {
        assert_eq!(channel_range(None, DeviceKind::Output, 2), (2, 2));
        assert_eq!(channel_range(None, DeviceKind::Input, 1), (1, 1));
    }

    #[test]
    fn sample_rate_without_hardware_uses_server_rate() {
        assert_eq!(sample_rate(None, DeviceKind::Output, 2, 44100), 44100);
    }

    #[test]
    fn friendly_name_falls_back_to_server_property() {
        assert_eq!(
            friendly_name(None, Some("HDA Intel PCH")),
            Some("HDA Intel PCH".to_string())
        );
        assert_eq!(friendly_name(None, None), None);
    }
}
