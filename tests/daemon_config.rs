//! Integration tests for the daemon configuration writer and reader.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::{fs, path::PathBuf, sync::Mutex};

use pulsekit::daemon_config::{global_playback_rate, write_default_sample_rate};
use tempfile::TempDir;

// HOME and XDG_CONFIG_HOME are process-global; tests touching them take
// this lock so parallel execution cannot interleave the overrides.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn setup_test_dir() -> TempDir {
    let temp_dir = TempDir::new().unwrap();

    unsafe {
        std::env::set_var("HOME", temp_dir.path());
        std::env::set_var("XDG_CONFIG_HOME", temp_dir.path().join(".config"));
    }

    temp_dir
}

fn user_conf(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join(".config/pulse/daemon.conf")
}

fn create_user_conf(temp_dir: &TempDir, content: &str) {
    let path = user_conf(temp_dir);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A writable system-wide config would take precedence over the per-user
/// file; tests skip instead of touching it.
fn system_conf_writable() -> bool {
    fs::OpenOptions::new()
        .append(true)
        .open("/etc/pulse/daemon.conf")
        .is_ok()
}

fn rate_line_count(content: &str) -> usize {
    content
        .lines()
        .filter(|line| line.trim_start().starts_with("default-sample-rate"))
        .count()
}

mod rate_writing {
    use super::*;

    #[test]
    fn updates_existing_user_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        let temp_dir = setup_test_dir();
        if system_conf_writable() {
            return;
        }

        create_user_conf(
            &temp_dir,
            "; This file is part of PulseAudio.\nresample-method = soxr-vhq\ndefault-sample-rate = 44100\n",
        );

        let written = write_default_sample_rate(48000).unwrap();
        assert_eq!(written, user_conf(&temp_dir));

        let content = fs::read_to_string(user_conf(&temp_dir)).unwrap();
        assert!(content.contains("; This file is part of PulseAudio."));
        assert!(content.contains("resample-method = soxr-vhq"));
        assert!(content.contains("default-sample-rate = 48000"));
        assert!(!content.contains("44100"));
        assert_eq!(rate_line_count(&content), 1);
    }

    #[test]
    fn creates_user_config_with_parent_directories() {
        let _guard = ENV_LOCK.lock().unwrap();
        let temp_dir = setup_test_dir();
        if system_conf_writable() {
            return;
        }

        let written = write_default_sample_rate(44100).unwrap();
        assert_eq!(written, user_conf(&temp_dir));

        let content = fs::read_to_string(user_conf(&temp_dir)).unwrap();
        assert_eq!(content, "default-sample-rate = 44100\n");
    }

    #[test]
    fn collapses_duplicate_rate_lines() {
        let _guard = ENV_LOCK.lock().unwrap();
        let temp_dir = setup_test_dir();
        if system_conf_writable() {
            return;
        }

        create_user_conf(
            &temp_dir,
            "default-sample-rate = 44100\ndefault-sample-rate = 22050\n",
        );

        write_default_sample_rate(96000).unwrap();

        let content = fs::read_to_string(user_conf(&temp_dir)).unwrap();
        assert_eq!(content, "default-sample-rate = 96000\n");
        assert_eq!(rate_line_count(&content), 1);
    }

    #[test]
    fn appends_after_commented_out_setting() {
        let _guard = ENV_LOCK.lock().unwrap();
        let temp_dir = setup_test_dir();
        if system_conf_writable() {
            return;
        }

        create_user_conf(&temp_dir, "; default-sample-rate = 44100\n");

        write_default_sample_rate(96000).unwrap();

        let content = fs::read_to_string(user_conf(&temp_dir)).unwrap();
        assert!(content.contains("; default-sample-rate = 44100"));
        assert!(content.contains("default-sample-rate = 96000"));
        assert_eq!(rate_line_count(&content), 1);
    }
}

mod rate_reading {
    use super::*;

    #[test]
    fn custom_path_takes_precedence() {
        let _guard = ENV_LOCK.lock().unwrap();
        let temp_dir = setup_test_dir();

        create_user_conf(&temp_dir, "default-sample-rate = 11111\n");
        let custom = temp_dir.path().join("custom-daemon.conf");
        fs::write(&custom, "default-sample-rate = 22222\n").unwrap();

        assert_eq!(global_playback_rate(Some(&custom)), Some(22222));
    }

    #[test]
    fn falls_back_to_user_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        let temp_dir = setup_test_dir();

        create_user_conf(&temp_dir, "default-sample-rate = 33333\n");

        assert_eq!(global_playback_rate(None), Some(33333));
    }

    #[test]
    fn unreadable_custom_path_falls_through() {
        let _guard = ENV_LOCK.lock().unwrap();
        let temp_dir = setup_test_dir();

        create_user_conf(&temp_dir, "default-sample-rate = 44100\n");
        let missing = temp_dir.path().join("does-not-exist.conf");

        assert_eq!(global_playback_rate(Some(&missing)), Some(44100));
    }

    #[test]
    fn returns_none_when_rate_not_configured() {
        let _guard = ENV_LOCK.lock().unwrap();
        let temp_dir = setup_test_dir();

        let custom = temp_dir.path().join("custom-daemon.conf");
        fs::write(&custom, "; default-sample-rate = 44100\nresample-method = soxr-vhq\n").unwrap();

        assert_eq!(global_playback_rate(Some(&custom)), None);
    }

    #[test]
    fn written_rate_reads_back() {
        let _guard = ENV_LOCK.lock().unwrap();
        let _temp_dir = setup_test_dir();
        if system_conf_writable() {
            return;
        }

        write_default_sample_rate(47999).unwrap();

        assert_eq!(global_playback_rate(None), Some(47999));
    }
}
