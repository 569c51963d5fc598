use std::sync::mpsc::{self, Sender};

use libpulse_binding::volume::{ChannelVolumes, Volume};
use tracing::{debug, warn};

use crate::{
    device::DeviceKind,
    error::{ControlError, ControlResult},
};

use super::{link::PulseLink, query};

fn confirm(tx: Sender<ControlResult<()>>, what: &'static str) -> Box<dyn FnMut(bool)> {
    Box::new(move |success| {
        let _ = tx.send(if success {
            Ok(())
        } else {
            Err(ControlError::OperationFailed(what))
        });
    })
}

/// Apply a volume vector to a device.
pub(crate) fn set_device_volume(
    link: &PulseLink,
    index: u32,
    kind: DeviceKind,
    volumes: &ChannelVolumes,
) -> ControlResult<()> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let operation = link.with_lock(|| {
        let mut introspect = link.introspect();
        match kind {
            DeviceKind::Output => introspect.set_sink_volume_by_index(
                index,
                volumes,
                Some(confirm(tx, "set sink volume")),
            ),
            DeviceKind::Input => introspect.set_source_volume_by_index(
                index,
                volumes,
                Some(confirm(tx, "set source volume")),
            ),
        }
    });
    link.finish(operation, &rx)
}

/// Mute or unmute a whole device.
pub(crate) fn set_device_mute(
    link: &PulseLink,
    index: u32,
    kind: DeviceKind,
    muted: bool,
) -> ControlResult<()> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let operation = link.with_lock(|| {
        let mut introspect = link.introspect();
        match kind {
            DeviceKind::Output => {
                introspect.set_sink_mute_by_index(index, muted, Some(confirm(tx, "set sink mute")))
            }
            DeviceKind::Input => introspect.set_source_mute_by_index(
                index,
                muted,
                Some(confirm(tx, "set source mute")),
            ),
        }
    });
    link.finish(operation, &rx)
}

/// Mute or unmute one channel of a device.
///
/// PulseAudio has no native per-channel mute, so muting sets the channel's
/// volume to zero and unmuting restores it to the current peak of the
/// device's volume vector.
pub(crate) fn set_channel_mute(
    link: &PulseLink,
    index: u32,
    kind: DeviceKind,
    channel: u8,
    muted: bool,
) -> ControlResult<()> {
    let mut volumes = match kind {
        DeviceKind::Output => query::output_channel_volumes(link, index)?,
        DeviceKind::Input => query::input_channel_volumes(link, index)?,
    };
    let channel_count = volumes.len();
    if channel >= channel_count {
        return Err(ControlError::ChannelOutOfRange {
            channel,
            max: channel_count,
        });
    }

    let target = if muted { Volume::MUTED } else { volumes.max() };
    volumes.get_mut()[usize::from(channel)] = target;
    set_device_volume(link, index, kind, &volumes)
}

/// Whether one channel of a device is muted (its volume is zero).
pub(crate) fn channel_mute_state(
    link: &PulseLink,
    index: u32,
    kind: DeviceKind,
    channel: u8,
) -> ControlResult<bool> {
    let volumes = match kind {
        DeviceKind::Output => query::output_channel_volumes(link, index)?,
        DeviceKind::Input => query::input_channel_volumes(link, index)?,
    };
    let channel_count = volumes.len();
    if channel >= channel_count {
        return Err(ControlError::ChannelOutOfRange {
            channel,
            max: channel_count,
        });
    }
    Ok(volumes.get()[usize::from(channel)] == Volume::MUTED)
}

/// Make a device the server's default output.
pub(crate) fn set_default_output(link: &PulseLink, code: &str) -> ControlResult<()> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let operation = link.with_lock(|| {
        link.context_mut().set_default_sink(code, move |success| {
            let _ = tx.send(if success {
                Ok(())
            } else {
                Err(ControlError::OperationFailed("set default sink"))
            });
        })
    });
    link.finish(operation, &rx)
}

/// Make a device the server's default input.
pub(crate) fn set_default_input(link: &PulseLink, code: &str) -> ControlResult<()> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let operation = link.with_lock(|| {
        link.context_mut().set_default_source(code, move |success| {
            let _ = tx.send(if success {
                Ok(())
            } else {
                Err(ControlError::OperationFailed("set default source"))
            });
        })
    });
    link.finish(operation, &rx)
}

/// Move one playback stream to another output device.
pub(crate) fn move_playback_stream(
    link: &PulseLink,
    stream_index: u32,
    device_index: u32,
) -> ControlResult<()> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let operation = link.with_lock(|| {
        link.introspect().move_sink_input_by_index(
            stream_index,
            device_index,
            Some(confirm(tx, "move sink input")),
        )
    });
    link.finish(operation, &rx)
}

/// Move every live playback stream to a device.
///
/// Individual move failures do not abort the migration; they are logged
/// and the remaining streams are still moved.
pub(crate) fn migrate_playback_streams(link: &PulseLink, target: u32) -> ControlResult<()> {
    let streams = query::playback_streams(link)?;
    debug!("Migrating {} playback streams to device {target}", streams.len());
    for stream in streams {
        if let Err(error) = move_playback_stream(link, stream.index.0, target) {
            warn!("Failed to move stream {} to device {target}: {error}", stream.index.0);
        }
    }
    Ok(())
}
