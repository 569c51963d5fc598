//! Round-trip tests against a live PulseAudio server.
//!
//! Everything here talks to the session's real server and changes volumes,
//! mute states and default devices, so the tests are `#[ignore]`d; run them
//! manually with `cargo test -- --ignored` on a machine where breaking
//! audio for a moment is acceptable. Set `RUST_LOG=pulsekit=debug` to watch
//! the operations.

#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::sync::Mutex;

use pulsekit::{ControlError, DeviceIndex, PulseManager};
use tracing_subscriber::EnvFilter;

// Mutating tests share one server; serialize them so concurrent volume and
// default changes cannot trample each other.
static SERVER_LOCK: Mutex<()> = Mutex::new(());

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn connect() -> PulseManager {
    init_tracing();
    PulseManager::new().unwrap()
}

mod snapshot {
    use super::*;

    #[test]
    #[ignore]
    fn inventory_matches_server_state() {
        let manager = connect();

        assert_eq!(manager.outputs().len(), manager.output_count().unwrap());
        assert_eq!(manager.inputs().len(), manager.input_count().unwrap());

        let default_output = manager.default_output_code().unwrap().unwrap_or_default();
        assert_eq!(manager.active_output_code(), default_output);
        let default_input = manager.default_input_code().unwrap().unwrap_or_default();
        assert_eq!(manager.active_input_code(), default_input);
    }

    #[test]
    #[ignore]
    fn device_invariants_hold() {
        let manager = connect();

        for device in manager.outputs().iter().chain(manager.inputs()) {
            assert_eq!(
                device.channel_names.len(),
                usize::from(device.max_channels),
                "channel names of {} must cover the hardware channel count",
                device.code
            );
            assert!(device.min_channels <= device.max_channels);
            assert!(device.master_volume_percent <= 100);
            assert!(device.channel_volume_percent.iter().all(|&v| v <= 100));
        }
    }

    #[test]
    #[ignore]
    fn devices_resolve_by_index_and_name() {
        let manager = connect();
        let Some(first) = manager.outputs().first() else {
            return;
        };

        let by_index = manager.output_by_index(first.index).unwrap();
        assert_eq!(by_index.code, first.code);

        let by_name = manager.output_by_name(&first.code).unwrap();
        assert_eq!(by_name.index, first.index);

        assert_eq!(
            manager.output_name_by_code(&first.code).unwrap(),
            first.name
        );
    }

    #[test]
    #[ignore]
    fn stream_lists_are_consistent() {
        let manager = connect();

        for stream in manager.list_output_streams().unwrap() {
            assert_eq!(
                stream.volume_percent.len(),
                usize::from(stream.channel_count)
            );
        }
        manager.list_input_streams().unwrap();
    }

    #[test]
    #[ignore]
    fn repeated_introspection_is_stable() {
        let mut manager = connect();

        for _ in 0..5 {
            manager.refresh().unwrap();
            for device in manager.outputs() {
                let fetched = manager.output_by_index(device.index).unwrap();
                assert_eq!(fetched.code, device.code);
            }
            manager.list_output_streams().unwrap();
            manager.list_input_streams().unwrap();
        }
    }

    #[test]
    #[ignore]
    fn construction_and_teardown_repeat_cleanly() {
        init_tracing();

        drop(None::<PulseManager>);
        let first = PulseManager::new().unwrap();
        drop(first);
        let second = PulseManager::new().unwrap();
        drop(second);
    }
}

mod mutations {
    use super::*;

    #[test]
    #[ignore]
    fn master_volume_round_trips() {
        let _guard = SERVER_LOCK.lock().unwrap();
        let mut manager = connect();
        let Some(first) = manager.outputs().first() else {
            return;
        };
        let device = first.index;
        let original = first.master_volume_percent;

        manager.set_master_volume(device, 50).unwrap();
        let read_back = manager.output_by_index(device).unwrap();
        assert!(
            read_back.master_volume_percent.abs_diff(50) <= 1,
            "expected about 50, server reports {}",
            read_back.master_volume_percent
        );

        manager.set_master_volume(device, original).unwrap();
    }

    #[test]
    #[ignore]
    fn volume_percent_over_100_is_rejected() {
        let _guard = SERVER_LOCK.lock().unwrap();
        let mut manager = connect();
        let Some(first) = manager.outputs().first() else {
            return;
        };

        let result = manager.set_master_volume(first.index, 101);
        assert!(matches!(result, Err(ControlError::InvalidPercent(101))));
    }

    #[test]
    #[ignore]
    fn master_volume_for_unknown_device_is_not_found() {
        let _guard = SERVER_LOCK.lock().unwrap();
        let mut manager = connect();
        let absent = DeviceIndex(u32::MAX - 1);

        let result = manager.set_master_volume(absent, 50);
        assert!(matches!(result, Err(ControlError::DeviceNotFound(_))));

        // Range validation comes first, even for a device that does not exist.
        let result = manager.set_master_volume(absent, 101);
        assert!(matches!(result, Err(ControlError::InvalidPercent(101))));
    }

    #[test]
    #[ignore]
    fn device_mute_round_trips() {
        let _guard = SERVER_LOCK.lock().unwrap();
        let mut manager = connect();
        let Some(first) = manager.outputs().first() else {
            return;
        };
        let device = first.index;
        let code = first.code.clone();
        let original = first.muted;

        manager.set_output_mute(device, true).unwrap();
        assert!(manager.output_mute_by_code(&code).unwrap());

        manager.set_output_mute(device, false).unwrap();
        assert!(!manager.output_mute_by_code(&code).unwrap());

        manager.set_output_mute(device, original).unwrap();
    }

    #[test]
    #[ignore]
    fn channel_mute_round_trips() {
        let _guard = SERVER_LOCK.lock().unwrap();
        let manager = connect();
        let Some(first) = manager.outputs().first() else {
            return;
        };
        let device = first.index;

        manager.set_output_channel_mute(device, 0, true).unwrap();
        assert!(manager.output_channel_mute_state(device, 0).unwrap());

        manager.set_output_channel_mute(device, 0, false).unwrap();
        assert!(!manager.output_channel_mute_state(device, 0).unwrap());
    }

    #[test]
    #[ignore]
    fn channel_index_out_of_range_is_reported() {
        let manager = connect();
        let Some(first) = manager.outputs().first() else {
            return;
        };

        let result = manager.output_channel_mute_state(first.index, u8::MAX);
        assert!(matches!(
            result,
            Err(ControlError::ChannelOutOfRange { .. })
        ));
    }

    #[test]
    #[ignore]
    fn default_switch_migrates_playback_streams() {
        let _guard = SERVER_LOCK.lock().unwrap();
        let mut manager = connect();
        if manager.outputs().len() < 2 {
            return;
        }

        let original_code = manager.active_output_code().to_string();
        let target = manager
            .outputs()
            .iter()
            .find(|device| device.code != original_code)
            .unwrap()
            .index;

        manager.switch_default_output(target).unwrap();

        let new_code = manager.active_output_code().to_string();
        assert_ne!(new_code, original_code);
        assert_eq!(
            manager.default_output_code().unwrap().as_deref(),
            Some(new_code.as_str())
        );

        let new_index = manager.output_index_by_code(&new_code).unwrap();
        for stream in manager.list_output_streams().unwrap() {
            assert_eq!(stream.device_index, new_index);
        }

        let original = manager.output_index_by_code(&original_code).unwrap();
        manager.switch_default_output(original).unwrap();
    }

    #[test]
    #[ignore]
    fn single_stream_move_relocates_only_that_stream() {
        let _guard = SERVER_LOCK.lock().unwrap();
        let manager = connect();
        if manager.outputs().len() < 2 {
            return;
        }
        let streams = manager.list_output_streams().unwrap();
        let Some(stream) = streams.first() else {
            return;
        };

        let source_device = stream.device_index;
        let target = manager
            .outputs()
            .iter()
            .find(|device| device.index != source_device)
            .unwrap()
            .index;

        manager.move_output_stream(stream.index, target).unwrap();

        let after = manager.list_output_streams().unwrap();
        let moved = after.iter().find(|s| s.index == stream.index).unwrap();
        assert_eq!(moved.device_index, target);
        for other in after.iter().filter(|s| s.index != stream.index) {
            let before = streams.iter().find(|s| s.index == other.index);
            if let Some(before) = before {
                assert_eq!(before.device_index, other.device_index);
            }
        }

        manager.move_output_stream(stream.index, source_device).unwrap();
    }
}
