use std::{mem, sync::mpsc};

use libpulse_binding::{callbacks::ListResult, volume::ChannelVolumes};

use crate::{
    device::{DeviceIndex, Profile},
    error::{ControlError, ControlResult},
    stream::StreamInfo,
};

use super::{
    convert::{self, ServerDevice},
    link::PulseLink,
};

/// Default device names reported by server info.
pub(crate) struct ServerDefaults {
    pub output: Option<String>,
    pub input: Option<String>,
}

/// Profile list and active profile of one card.
pub(crate) struct CardProfiles {
    pub profiles: Vec<Profile>,
    pub active: Option<Profile>,
}

/// Enumerate all output devices (sinks).
pub(crate) fn output_devices(link: &PulseLink) -> ControlResult<Vec<ServerDevice>> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let mut devices = Vec::new();
    let operation = link.with_lock(|| {
        link.introspect()
            .get_sink_info_list(move |result| match result {
                ListResult::Item(sink_info) => {
                    devices.push(convert::server_device_from_sink(sink_info));
                }
                ListResult::End => {
                    let _ = tx.send(Ok(mem::take(&mut devices)));
                }
                ListResult::Error => {
                    let _ = tx.send(Err(ControlError::OperationFailed("sink enumeration")));
                }
            })
    });
    link.finish(operation, &rx)
}

/// Enumerate all input devices (sources).
pub(crate) fn input_devices(link: &PulseLink) -> ControlResult<Vec<ServerDevice>> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let mut devices = Vec::new();
    let operation = link.with_lock(|| {
        link.introspect()
            .get_source_info_list(move |result| match result {
                ListResult::Item(source_info) => {
                    devices.push(convert::server_device_from_source(source_info));
                }
                ListResult::End => {
                    let _ = tx.send(Ok(mem::take(&mut devices)));
                }
                ListResult::Error => {
                    let _ = tx.send(Err(ControlError::OperationFailed("source enumeration")));
                }
            })
    });
    link.finish(operation, &rx)
}

/// Look up one output device by server index.
pub(crate) fn output_by_index(link: &PulseLink, index: u32) -> ControlResult<ServerDevice> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let mut found = None;
    let operation = link.with_lock(|| {
        link.introspect()
            .get_sink_info_by_index(index, move |result| match result {
                ListResult::Item(sink_info) => {
                    found = Some(convert::server_device_from_sink(sink_info));
                }
                ListResult::End => {
                    let _ = tx.send(
                        found
                            .take()
                            .ok_or(ControlError::DeviceNotFound(DeviceIndex(index))),
                    );
                }
                ListResult::Error => {
                    let _ = tx.send(Err(ControlError::DeviceNotFound(DeviceIndex(index))));
                }
            })
    });
    link.finish(operation, &rx)
}

/// Look up one output device by server name.
pub(crate) fn output_by_name(link: &PulseLink, name: &str) -> ControlResult<ServerDevice> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let requested = name.to_string();
    let mut found = None;
    let operation = link.with_lock(|| {
        link.introspect()
            .get_sink_info_by_name(name, move |result| match result {
                ListResult::Item(sink_info) => {
                    found = Some(convert::server_device_from_sink(sink_info));
                }
                ListResult::End => {
                    let _ = tx.send(
                        found
                            .take()
                            .ok_or_else(|| ControlError::DeviceNotFoundByName(requested.clone())),
                    );
                }
                ListResult::Error => {
                    let _ = tx.send(Err(ControlError::DeviceNotFoundByName(requested.clone())));
                }
            })
    });
    link.finish(operation, &rx)
}

/// Look up one input device by server index.
pub(crate) fn input_by_index(link: &PulseLink, index: u32) -> ControlResult<ServerDevice> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let mut found = None;
    let operation = link.with_lock(|| {
        link.introspect()
            .get_source_info_by_index(index, move |result| match result {
                ListResult::Item(source_info) => {
                    found = Some(convert::server_device_from_source(source_info));
                }
                ListResult::End => {
                    let _ = tx.send(
                        found
                            .take()
                            .ok_or(ControlError::DeviceNotFound(DeviceIndex(index))),
                    );
                }
                ListResult::Error => {
                    let _ = tx.send(Err(ControlError::DeviceNotFound(DeviceIndex(index))));
                }
            })
    });
    link.finish(operation, &rx)
}

/// Look up one input device by server name.
pub(crate) fn input_by_name(link: &PulseLink, name: &str) -> ControlResult<ServerDevice> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let requested = name.to_string();
    let mut found = None;
    let operation = link.with_lock(|| {
        link.introspect()
            .get_source_info_by_name(name, move |result| match result {
                ListResult::Item(source_info) => {
                    found = Some(convert::server_device_from_source(source_info));
                }
                ListResult::End => {
                    let _ = tx.send(
                        found
                            .take()
                            .ok_or_else(|| ControlError::DeviceNotFoundByName(requested.clone())),
                    );
                }
                ListResult::Error => {
                    let _ = tx.send(Err(ControlError::DeviceNotFoundByName(requested.clone())));
                }
            })
    });
    link.finish(operation, &rx)
}

/// Default output and input device names from server info.
pub(crate) fn server_defaults(link: &PulseLink) -> ControlResult<ServerDefaults> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let operation = link.with_lock(|| {
        link.introspect().get_server_info(move |server_info| {
            let _ = tx.send(Ok(ServerDefaults {
                output: server_info.default_sink_name.as_ref().map(|s| s.to_string()),
                input: server_info.default_source_name.as_ref().map(|s| s.to_string()),
            }));
        })
    });
    link.finish(operation, &rx)
}

/// Profiles of a card, with the active one resolved.
///
/// `channels` is the channel count recorded on each profile; the server
/// does not report per-profile channel layouts, so callers pass the owning
/// device's current count.
pub(crate) fn card_profiles(
    link: &PulseLink,
    card_index: u32,
    channels: u32,
) -> ControlResult<CardProfiles> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let mut collected = None;
    let operation = link.with_lock(|| {
        link.introspect()
            .get_card_info_by_index(card_index, move |result| match result {
                ListResult::Item(card_info) => {
                    let profiles = card_info
                        .profiles
                        .iter()
                        .map(|profile| Profile {
                            name: convert::cow_str_to_string(profile.name.as_ref()),
                            description: convert::cow_str_to_string(profile.description.as_ref()),
                            channels,
                        })
                        .collect();
                    let active = card_info.active_profile.as_ref().map(|profile| Profile {
                        name: convert::cow_str_to_string(profile.name.as_ref()),
                        description: convert::cow_str_to_string(profile.description.as_ref()),
                        channels,
                    });
                    collected = Some(CardProfiles { profiles, active });
                }
                ListResult::End => {
                    let _ = tx.send(
                        collected
                            .take()
                            .ok_or(ControlError::OperationFailed("card not found")),
                    );
                }
                ListResult::Error => {
                    let _ = tx.send(Err(ControlError::OperationFailed("card lookup")));
                }
            })
    });
    link.finish(operation, &rx)
}

/// Raw volume vector of an output device, straight from the server.
pub(crate) fn output_channel_volumes(
    link: &PulseLink,
    index: u32,
) -> ControlResult<ChannelVolumes> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let mut found = None;
    let operation = link.with_lock(|| {
        link.introspect()
            .get_sink_info_by_index(index, move |result| match result {
                ListResult::Item(sink_info) => {
                    found = Some(sink_info.volume);
                }
                ListResult::End => {
                    let _ = tx.send(
                        found
                            .take()
                            .ok_or(ControlError::DeviceNotFound(DeviceIndex(index))),
                    );
                }
                ListResult::Error => {
                    let _ = tx.send(Err(ControlError::DeviceNotFound(DeviceIndex(index))));
                }
            })
    });
    link.finish(operation, &rx)
}

/// Raw volume vector of an input device, straight from the server.
pub(crate) fn input_channel_volumes(link: &PulseLink, index: u32) -> ControlResult<ChannelVolumes> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let mut found = None;
    let operation = link.with_lock(|| {
        link.introspect()
            .get_source_info_by_index(index, move |result| match result {
                ListResult::Item(source_info) => {
                    found = Some(source_info.volume);
                }
                ListResult::End => {
                    let _ = tx.send(
                        found
                            .take()
                            .ok_or(ControlError::DeviceNotFound(DeviceIndex(index))),
                    );
                }
                ListResult::Error => {
                    let _ = tx.send(Err(ControlError::DeviceNotFound(DeviceIndex(index))));
                }
            })
    });
    link.finish(operation, &rx)
}

/// Enumerate live playback streams (sink inputs).
pub(crate) fn playback_streams(link: &PulseLink) -> ControlResult<Vec<StreamInfo>> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let mut streams = Vec::new();
    let operation = link.with_lock(|| {
        link.introspect()
            .get_sink_input_info_list(move |result| match result {
                ListResult::Item(sink_input_info) => {
                    streams.push(convert::stream_from_sink_input(sink_input_info));
                }
                ListResult::End => {
                    let _ = tx.send(Ok(mem::take(&mut streams)));
                }
                ListResult::Error => {
                    let _ = tx.send(Err(ControlError::OperationFailed("sink input enumeration")));
                }
            })
    });
    link.finish(operation, &rx)
}

/// Enumerate live capture streams (source outputs).
pub(crate) fn capture_streams(link: &PulseLink) -> ControlResult<Vec<StreamInfo>> {
    link.ensure_ready()?;
    let (tx, rx) = mpsc::channel();
    let mut streams = Vec::new();
    let operation = link.with_lock(|| {
        link.introspect()
            .get_source_output_info_list(move |result| match result {
                ListResult::Item(source_output_info) => {
                    streams.push(convert::stream_from_source_output(source_output_info));
                }
                ListResult::End => {
                    let _ = tx.send(Ok(mem::take(&mut streams)));
                }
                ListResult::Error => {
                    let _ = tx.send(Err(ControlError::OperationFailed(
                        "source output enumeration",
                    )));
                }
            })
    });
    link.finish(operation, &rx)
}
