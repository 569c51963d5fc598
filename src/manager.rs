//! Synchronous manager over one PulseAudio connection.
//!
//! `PulseManager` connects at construction, takes a full inventory of output
//! and input devices enriched with ALSA hardware capabilities, and exposes
//! blocking methods for volume, mute, default-device switching and stream
//! routing. Every method submits the underlying asynchronous request and
//! waits for its completion before returning.

use tracing::debug;

use crate::{
    backend::{PulseLink, commands, convert, query},
    device::{Device, DeviceIndex, DeviceKind, Port, Profile},
    error::{ControlError, ControlResult},
    hardware,
    stream::{StreamIndex, StreamInfo},
};

/// Application name reported to the PulseAudio server.
const APP_NAME: &str = "pulsekit";

/// Inventory captured in one pass over the server.
struct Inventory {
    outputs: Vec<Device>,
    inputs: Vec<Device>,
    active_output_code: String,
    active_input_code: String,
}

/// Synchronous facade over a PulseAudio server connection.
///
/// Holds the event-loop binding plus a snapshot of all devices taken at
/// construction. Mutations keep the snapshot's volume, mute and default
/// fields in step where the outcome is exact; [`PulseManager::refresh`]
/// re-materialises everything from the server.
///
/// The manager is tied to the thread that created it. The event loop runs
/// on its own background thread either way; only the handle is thread-local.
pub struct PulseManager {
    link: PulseLink,
    outputs: Vec<Device>,
    inputs: Vec<Device>,
    active_output_code: String,
    active_input_code: String,
}

impl PulseManager {
    /// Connects to the default PulseAudio server and takes the device
    /// inventory.
    ///
    /// Construction is all-or-nothing. When any query fails, everything
    /// built so far is dropped and the connection is torn down.
    ///
    /// # Errors
    /// Returns [`ControlError::ResourceInit`] or
    /// [`ControlError::ConnectionFailed`] when the connection cannot be
    /// established, and any query error encountered while building the
    /// inventory.
    pub fn new() -> ControlResult<Self> {
        let link = PulseLink::connect(APP_NAME)?;
        let inventory = load_inventory(&link)?;
        debug!(
            "Inventory ready: {} outputs, {} inputs",
            inventory.outputs.len(),
            inventory.inputs.len()
        );

        Ok(Self {
            link,
            outputs: inventory.outputs,
            inputs: inventory.inputs,
            active_output_code: inventory.active_output_code,
            active_input_code: inventory.active_input_code,
        })
    }

    /// Re-materialises the device inventory and default-device codes from
    /// the server.
    ///
    /// # Errors
    /// Returns any query error; the previous inventory is kept on failure.
    pub fn refresh(&mut self) -> ControlResult<()> {
        let inventory = load_inventory(&self.link)?;
        self.outputs = inventory.outputs;
        self.inputs = inventory.inputs;
        self.active_output_code = inventory.active_output_code;
        self.active_input_code = inventory.active_input_code;
        Ok(())
    }

    /// Output devices (sinks) as captured by the last snapshot.
    #[must_use]
    pub fn outputs(&self) -> &[Device] {
        &self.outputs
    }

    /// Input devices (sources) as captured by the last snapshot.
    #[must_use]
    pub fn inputs(&self) -> &[Device] {
        &self.inputs
    }

    /// Server name of the default output device, empty when the server
    /// reported none.
    #[must_use]
    pub fn active_output_code(&self) -> &str {
        &self.active_output_code
    }

    /// Server name of the default input device, empty when the server
    /// reported none.
    #[must_use]
    pub fn active_input_code(&self) -> &str {
        &self.active_input_code
    }

    /// Sets every channel of an output device to the same volume.
    ///
    /// The channel count comes from a live fetch of the device's channel
    /// map, not the snapshot, so a device whose map changed since
    /// construction still gets every channel covered.
    ///
    /// # Errors
    /// Returns [`ControlError::InvalidPercent`] for percentages above 100,
    /// [`ControlError::DeviceNotFound`] when the server does not report the
    /// device and [`ControlError::OperationFailed`] when the server rejects
    /// the change.
    pub fn set_master_volume(&mut self, device: DeviceIndex, percent: u32) -> ControlResult<()> {
        if percent > 100 {
            return Err(ControlError::InvalidPercent(percent));
        }
        let channels = query::output_channel_volumes(&self.link, device.0)?.len();

        let volumes = convert::uniform_volume(channels, percent);
        commands::set_device_volume(&self.link, device.0, DeviceKind::Output, &volumes)?;

        if let Ok(target) = self.output_device_mut(device) {
            target.master_volume_percent = percent;
            for value in &mut target.channel_volume_percent {
                *value = percent;
            }
        }
        Ok(())
    }

    /// Mutes or unmutes an output device as a whole.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFound`] for an unknown device and
    /// [`ControlError::OperationFailed`] when the server rejects the change.
    pub fn set_output_mute(&mut self, device: DeviceIndex, muted: bool) -> ControlResult<()> {
        self.output_device(device)?;
        commands::set_device_mute(&self.link, device.0, DeviceKind::Output, muted)?;
        self.output_device_mut(device)?.muted = muted;
        Ok(())
    }

    /// Mutes or unmutes an input device as a whole.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFound`] for an unknown device and
    /// [`ControlError::OperationFailed`] when the server rejects the change.
    pub fn set_input_mute(&mut self, device: DeviceIndex, muted: bool) -> ControlResult<()> {
        self.input_device(device)?;
        commands::set_device_mute(&self.link, device.0, DeviceKind::Input, muted)?;
        self.input_device_mut(device)?.muted = muted;
        Ok(())
    }

    /// Mutes or unmutes one channel of an output device.
    ///
    /// PulseAudio has no per-channel mute flag, so muting zeroes the
    /// channel's volume and unmuting restores it to the current peak of the
    /// device's volume vector. Snapshot volume percentages are not updated;
    /// call [`PulseManager::refresh`] to re-sync them.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFound`] for an unknown device,
    /// [`ControlError::ChannelOutOfRange`] for a channel index at or beyond
    /// the device's channel count and [`ControlError::OperationFailed`]
    /// when the server rejects the change.
    pub fn set_output_channel_mute(
        &self,
        device: DeviceIndex,
        channel: u8,
        muted: bool,
    ) -> ControlResult<()> {
        self.output_device(device)?;
        commands::set_channel_mute(&self.link, device.0, DeviceKind::Output, channel, muted)
    }

    /// Mutes or unmutes one channel of an input device.
    ///
    /// Same volume-based mechanism as
    /// [`PulseManager::set_output_channel_mute`].
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFound`] for an unknown device,
    /// [`ControlError::ChannelOutOfRange`] for a channel index at or beyond
    /// the device's channel count and [`ControlError::OperationFailed`]
    /// when the server rejects the change.
    pub fn set_input_channel_mute(
        &self,
        device: DeviceIndex,
        channel: u8,
        muted: bool,
    ) -> ControlResult<()> {
        self.input_device(device)?;
        commands::set_channel_mute(&self.link, device.0, DeviceKind::Input, channel, muted)
    }

    /// Whether one channel of an output device is currently muted, read
    /// live from the server.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFound`] for an unknown device and
    /// [`ControlError::ChannelOutOfRange`] for a channel index at or beyond
    /// the device's channel count.
    pub fn output_channel_mute_state(
        &self,
        device: DeviceIndex,
        channel: u8,
    ) -> ControlResult<bool> {
        self.output_device(device)?;
        commands::channel_mute_state(&self.link, device.0, DeviceKind::Output, channel)
    }

    /// Whether one channel of an input device is currently muted, read
    /// live from the server.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFound`] for an unknown device and
    /// [`ControlError::ChannelOutOfRange`] for a channel index at or beyond
    /// the device's channel count.
    pub fn input_channel_mute_state(
        &self,
        device: DeviceIndex,
        channel: u8,
    ) -> ControlResult<bool> {
        self.input_device(device)?;
        commands::channel_mute_state(&self.link, device.0, DeviceKind::Input, channel)
    }

    /// Makes a device the default output and moves every playback stream
    /// onto it.
    ///
    /// The server may renumber the device when the default changes, so its
    /// index is re-resolved by name before the streams are migrated.
    /// Per-stream move failures are logged and do not abort the switch; the
    /// rest of the inventory is not rebuilt.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFound`] for an unknown device and
    /// [`ControlError::OperationFailed`] when the default cannot be changed
    /// or the streams cannot be enumerated.
    pub fn switch_default_output(&mut self, device: DeviceIndex) -> ControlResult<()> {
        let code = self.output_device(device)?.code.clone();
        commands::set_default_output(&self.link, &code)?;

        let resolved = query::output_by_name(&self.link, &code)?;
        if let Ok(entry) = self.output_device_mut(device) {
            entry.index = DeviceIndex(resolved.index);
        }

        commands::migrate_playback_streams(&self.link, resolved.index)?;
        self.active_output_code = code;
        Ok(())
    }

    /// Makes a device the default input.
    ///
    /// Capture streams are left where they are; applications pick up the
    /// new default on their own. The device index is re-resolved by name in
    /// case the server renumbered it.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFound`] for an unknown device and
    /// [`ControlError::OperationFailed`] when the default cannot be changed.
    pub fn switch_default_input(&mut self, device: DeviceIndex) -> ControlResult<()> {
        let code = self.input_device(device)?.code.clone();
        commands::set_default_input(&self.link, &code)?;

        let resolved = query::input_by_name(&self.link, &code)?;
        if let Ok(entry) = self.input_device_mut(device) {
            entry.index = DeviceIndex(resolved.index);
        }

        self.active_input_code = code;
        Ok(())
    }

    /// Moves one playback stream to another output device.
    ///
    /// The stream index is validated against the server's live stream list,
    /// the target against the snapshot.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFound`] for an unknown target,
    /// [`ControlError::StreamNotFound`] for a stream the server does not
    /// report and [`ControlError::OperationFailed`] when the move fails.
    pub fn move_output_stream(
        &self,
        stream: StreamIndex,
        target: DeviceIndex,
    ) -> ControlResult<()> {
        self.output_device(target)?;
        let streams = query::playback_streams(&self.link)?;
        if !streams.iter().any(|s| s.index == stream) {
            return Err(ControlError::StreamNotFound(stream));
        }
        commands::move_playback_stream(&self.link, stream.0, target.0)
    }

    /// Live list of playback streams (sink inputs).
    ///
    /// # Errors
    /// Returns [`ControlError::OperationFailed`] when the enumeration fails.
    pub fn list_output_streams(&self) -> ControlResult<Vec<StreamInfo>> {
        query::playback_streams(&self.link)
    }

    /// Live list of capture streams (source outputs).
    ///
    /// # Errors
    /// Returns [`ControlError::OperationFailed`] when the enumeration fails.
    pub fn list_input_streams(&self) -> ControlResult<Vec<StreamInfo>> {
        query::capture_streams(&self.link)
    }

    /// Number of output devices currently on the server.
    ///
    /// # Errors
    /// Returns [`ControlError::OperationFailed`] when the enumeration fails.
    pub fn output_count(&self) -> ControlResult<usize> {
        Ok(query::output_devices(&self.link)?.len())
    }

    /// Number of input devices currently on the server.
    ///
    /// # Errors
    /// Returns [`ControlError::OperationFailed`] when the enumeration fails.
    pub fn input_count(&self) -> ControlResult<usize> {
        Ok(query::input_devices(&self.link)?.len())
    }

    /// Fetches one output device live from the server, enriched with the
    /// hardware probes.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFound`] when the server does not
    /// report the index.
    pub fn output_by_index(&self, device: DeviceIndex) -> ControlResult<Device> {
        let record = query::output_by_index(&self.link, device.0)?;
        enrich_device(&self.link, record)
    }

    /// Fetches one output device live from the server by its server name.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFoundByName`] when the server does
    /// not report the name.
    pub fn output_by_name(&self, code: &str) -> ControlResult<Device> {
        let record = query::output_by_name(&self.link, code)?;
        enrich_device(&self.link, record)
    }

    /// Fetches one input device live from the server, enriched with the
    /// hardware probes.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFound`] when the server does not
    /// report the index.
    pub fn input_by_index(&self, device: DeviceIndex) -> ControlResult<Device> {
        let record = query::input_by_index(&self.link, device.0)?;
        enrich_device(&self.link, record)
    }

    /// Fetches one input device live from the server by its server name.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFoundByName`] when the server does
    /// not report the name.
    pub fn input_by_name(&self, code: &str) -> ControlResult<Device> {
        let record = query::input_by_name(&self.link, code)?;
        enrich_device(&self.link, record)
    }

    /// Server name of the current default output, straight from the server.
    ///
    /// # Errors
    /// Returns [`ControlError::OperationFailed`] when the server info query
    /// fails.
    pub fn default_output_code(&self) -> ControlResult<Option<String>> {
        Ok(query::server_defaults(&self.link)?.output)
    }

    /// Server name of the current default input, straight from the server.
    ///
    /// # Errors
    /// Returns [`ControlError::OperationFailed`] when the server info query
    /// fails.
    pub fn default_input_code(&self) -> ControlResult<Option<String>> {
        Ok(query::server_defaults(&self.link)?.input)
    }

    /// Human-readable description of an output device, looked up by server
    /// name.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFoundByName`] when the server does
    /// not report the name.
    pub fn output_name_by_code(&self, code: &str) -> ControlResult<String> {
        Ok(query::output_by_name(&self.link, code)?.description)
    }

    /// Human-readable description of an input device, looked up by server
    /// name.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFoundByName`] when the server does
    /// not report the name.
    pub fn input_name_by_code(&self, code: &str) -> ControlResult<String> {
        Ok(query::input_by_name(&self.link, code)?.description)
    }

    /// Server index of an output device, looked up by server name.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFoundByName`] when the server does
    /// not report the name.
    pub fn output_index_by_code(&self, code: &str) -> ControlResult<DeviceIndex> {
        Ok(DeviceIndex(query::output_by_name(&self.link, code)?.index))
    }

    /// Server index of an input device, looked up by server name.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFoundByName`] when the server does
    /// not report the name.
    pub fn input_index_by_code(&self, code: &str) -> ControlResult<DeviceIndex> {
        Ok(DeviceIndex(query::input_by_name(&self.link, code)?.index))
    }

    /// Whole-device mute state of an output device, looked up by server
    /// name.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFoundByName`] when the server does
    /// not report the name.
    pub fn output_mute_by_code(&self, code: &str) -> ControlResult<bool> {
        Ok(query::output_by_name(&self.link, code)?.muted)
    }

    /// Whole-device mute state of an input device, looked up by server
    /// name.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFoundByName`] when the server does
    /// not report the name.
    pub fn input_mute_by_code(&self, code: &str) -> ControlResult<bool> {
        Ok(query::input_by_name(&self.link, code)?.muted)
    }

    /// Ports of an input device with the active one marked, looked up by
    /// server name.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFoundByName`] when the server does
    /// not report the name.
    pub fn source_ports(&self, code: &str) -> ControlResult<Vec<Port>> {
        Ok(query::input_by_name(&self.link, code)?.ports)
    }

    /// Profiles of a sound card.
    ///
    /// The per-profile channel count is taken from a device owned by the
    /// card, since the server does not report per-profile layouts; it is
    /// zero when no device currently uses the card.
    ///
    /// # Errors
    /// Returns [`ControlError::OperationFailed`] when the server does not
    /// report the card.
    pub fn card_profiles(&self, card_index: u32) -> ControlResult<Vec<Profile>> {
        let channels = self.card_channels(card_index)?;
        Ok(query::card_profiles(&self.link, card_index, channels)?.profiles)
    }

    /// Number of profiles a sound card offers.
    ///
    /// # Errors
    /// Returns [`ControlError::OperationFailed`] when the server does not
    /// report the card.
    pub fn card_profile_count(&self, card_index: u32) -> ControlResult<usize> {
        Ok(self.card_profiles(card_index)?.len())
    }

    /// Active profile of the card owning an output device, looked up by the
    /// device's server name.
    ///
    /// Devices without an owning card (virtual sinks) have no profile and
    /// yield `None`.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFoundByName`] when the server does
    /// not report the name.
    pub fn active_profile(&self, code: &str) -> ControlResult<Option<Profile>> {
        let record = query::output_by_name(&self.link, code)?;
        match record.card {
            Some(card) => {
                let found = query::card_profiles(&self.link, card, u32::from(record.channels))?;
                Ok(found.active)
            }
            None => Ok(None),
        }
    }

    /// ALSA hardware id (`hw:C,D`) of an output device, `None` for virtual
    /// devices.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFoundByName`] when the server does
    /// not report the name.
    pub fn output_hardware_id(&self, code: &str) -> ControlResult<Option<String>> {
        let record = query::output_by_name(&self.link, code)?;
        Ok(hardware::hardware_id(
            record.alsa_card.as_deref(),
            record.alsa_device.as_deref(),
        ))
    }

    /// ALSA hardware id (`hw:C,D`) of an input device, `None` for virtual
    /// devices.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFoundByName`] when the server does
    /// not report the name.
    pub fn input_hardware_id(&self, code: &str) -> ControlResult<Option<String>> {
        let record = query::input_by_name(&self.link, code)?;
        Ok(hardware::hardware_id(
            record.alsa_card.as_deref(),
            record.alsa_device.as_deref(),
        ))
    }

    /// Friendly hardware name of an output device, asked of ALSA with the
    /// server-reported card name as fallback.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFoundByName`] when the server does
    /// not report the name.
    pub fn output_hardware_name(&self, code: &str) -> ControlResult<Option<String>> {
        let record = query::output_by_name(&self.link, code)?;
        Ok(hardware::friendly_name(
            record.alsa_card.as_deref(),
            record.alsa_card_name.as_deref(),
        ))
    }

    /// Friendly hardware name of an input device, asked of ALSA with the
    /// server-reported card name as fallback.
    ///
    /// # Errors
    /// Returns [`ControlError::DeviceNotFoundByName`] when the server does
    /// not report the name.
    pub fn input_hardware_name(&self, code: &str) -> ControlResult<Option<String>> {
        let record = query::input_by_name(&self.link, code)?;
        Ok(hardware::friendly_name(
            record.alsa_card.as_deref(),
            record.alsa_card_name.as_deref(),
        ))
    }

    fn output_device(&self, device: DeviceIndex) -> ControlResult<&Device> {
        self.outputs
            .iter()
            .find(|d| d.index == device)
            .ok_or(ControlError::DeviceNotFound(device))
    }

    fn output_device_mut(&mut self, device: DeviceIndex) -> ControlResult<&mut Device> {
        self.outputs
            .iter_mut()
            .find(|d| d.index == device)
            .ok_or(ControlError::DeviceNotFound(device))
    }

    fn input_device(&self, device: DeviceIndex) -> ControlResult<&Device> {
        self.inputs
            .iter()
            .find(|d| d.index == device)
            .ok_or(ControlError::DeviceNotFound(device))
    }

    fn input_device_mut(&mut self, device: DeviceIndex) -> ControlResult<&mut Device> {
        self.inputs
            .iter_mut()
            .find(|d| d.index == device)
            .ok_or(ControlError::DeviceNotFound(device))
    }

    fn card_channels(&self, card_index: u32) -> ControlResult<u32> {
        let outputs = query::output_devices(&self.link)?;
        if let Some(record) = outputs.iter().find(|r| r.card == Some(card_index)) {
            return Ok(u32::from(record.channels));
        }
        let inputs = query::input_devices(&self.link)?;
        Ok(inputs
            .iter()
            .find(|r| r.card == Some(card_index))
            .map_or(0, |r| u32::from(r.channels)))
    }
}

fn load_inventory(link: &PulseLink) -> ControlResult<Inventory> {
    let outputs = query::output_devices(link)?
        .into_iter()
        .map(|record| enrich_device(link, record))
        .collect::<ControlResult<Vec<_>>>()?;
    let inputs = query::input_devices(link)?
        .into_iter()
        .map(|record| enrich_device(link, record))
        .collect::<ControlResult<Vec<_>>>()?;
    let defaults = query::server_defaults(link)?;

    Ok(Inventory {
        outputs,
        inputs,
        active_output_code: defaults.output.unwrap_or_default(),
        active_input_code: defaults.input.unwrap_or_default(),
    })
}

/// Turns an owned introspection record into a full `Device` by probing the
/// hardware and attaching the owning card's profiles.
fn enrich_device(link: &PulseLink, record: convert::ServerDevice) -> ControlResult<Device> {
    let hardware_id =
        hardware::hardware_id(record.alsa_card.as_deref(), record.alsa_device.as_deref());
    let (min_channels, max_channels) =
        hardware::channel_range(hardware_id.as_deref(), record.kind, record.channels);
    let sample_rate = hardware::sample_rate(
        hardware_id.as_deref(),
        record.kind,
        record.channels,
        record.sample_rate,
    );

    let (profiles, active_profile) = match record.card {
        Some(card) => {
            let card_profiles = query::card_profiles(link, card, u32::from(record.channels))?;
            (card_profiles.profiles, card_profiles.active)
        }
        None => (Vec::new(), None),
    };

    let channel_volume_percent: Vec<u32> = record
        .volume_percent
        .iter()
        .map(|&percent| percent.min(100))
        .collect();
    let master_volume_percent = record.master_volume_percent.min(100);
    let channel_names = padded_channel_names(record.channel_labels, max_channels);

    Ok(Device {
        index: DeviceIndex(record.index),
        code: record.code,
        name: record.description,
        hardware_id,
        sample_rate,
        min_channels,
        max_channels,
        channel_names,
        master_volume_percent,
        channel_volume_percent,
        muted: record.muted,
        profiles,
        active_profile,
        ports: record.ports,
        kind: record.kind,
    })
}

/// Fits the channel-map labels to the hardware channel count.
///
/// Labels beyond `max_channels` are dropped; missing slots read as mono,
/// matching what the server reports for channels outside the current map.
fn padded_channel_names(labels: Vec<String>, max_channels: u8) -> Vec<String> {
    let mut names = labels;
    names.truncate(usize::from(max_channels));
    while names.len() < usize::from(max_channels) {
        names.push(String::from("Mono"));
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_padded_to_hardware_count() {
        let labels = vec![String::from("Front Left"), String::from("Front Right")];
        let names = padded_channel_names(labels, 4);

        assert_eq!(names, ["Front Left", "Front Right", "Mono", "Mono"]);
    }

    #[test]
    fn channel_names_truncated_to_hardware_count() {
        let labels = vec![
            String::from("Front Left"),
            String::from("Front Right"),
            String::from("Subwoofer"),
        ];
        let names = padded_channel_names(labels, 2);

        assert_eq!(names, ["Front Left", "Front Right"]);
    }

    #[test]
    fn channel_names_kept_when_counts_match() {
        let labels = vec![String::from("Mono")];
        assert_eq!(padded_channel_names(labels, 1), ["Mono"]);
    }
}
