//! PulseAudio daemon configuration management.
//!
//! Rewrites the `default-sample-rate` setting in `daemon.conf`, preferring
//! the system-wide file and falling back to the per-user one, and offers an
//! explicit daemon restart so the new rate takes effect. Reading the current
//! value probes a caller-supplied path first, then the per-user file, then
//! the system-wide file.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    process::Command,
    sync::OnceLock,
    thread,
    time::Duration,
};

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{ControlError, ControlResult};

/// System-wide PulseAudio daemon configuration file.
const SYSTEM_CONF: &str = "/etc/pulse/daemon.conf";

/// Pause between killing and restarting the daemon, giving it time to
/// release the audio devices.
const RESTART_DELAY: Duration = Duration::from_secs(2);

static RATE_LINE: OnceLock<Regex> = OnceLock::new();

fn rate_line() -> &'static Regex {
    #[allow(clippy::expect_used)]
    fn build() -> Regex {
        Regex::new(r"^\s*default-sample-rate\s*=\s*(\d+)\s*$").expect("pattern is valid")
    }
    RATE_LINE.get_or_init(build)
}

/// Replaces the `default-sample-rate` line in `content` with one setting
/// `rate`, appending the line when none exists.
///
/// Commented lines (starting with `;` or `#`) are left untouched. When the
/// input carries several uncommented rate lines, only the first survives.
fn rewrite_rate_line(content: &str, rate: u32) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut replaced = false;

    for line in content.lines() {
        if rate_line().is_match(line) {
            if !replaced {
                lines.push(format!("default-sample-rate = {rate}"));
                replaced = true;
            }
        } else {
            lines.push(line.to_owned());
        }
    }

    if !replaced {
        lines.push(format!("default-sample-rate = {rate}"));
    }

    let mut rewritten = lines.join("\n");
    rewritten.push('\n');
    rewritten
}

/// Extracts the configured sample rate from daemon configuration text.
fn parse_rate(content: &str) -> Option<u32> {
    content.lines().find_map(|line| {
        rate_line()
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|value| value.as_str().parse().ok())
    })
}

/// Per-user daemon configuration path, following the XDG Base Directory
/// specification: `$XDG_CONFIG_HOME/pulse/daemon.conf`, falling back to
/// `$HOME/.config/pulse/daemon.conf`.
fn user_conf_path() -> Option<PathBuf> {
    let config_home = env::var("XDG_CONFIG_HOME")
        .or_else(|_| env::var("HOME").map(|home| format!("{home}/.config")))
        .ok()?;

    Some(PathBuf::from(config_home).join("pulse/daemon.conf"))
}

fn try_write(path: &Path, rate: u32, create: bool) -> io::Result<()> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if create && error.kind() == io::ErrorKind::NotFound => String::new(),
        Err(error) => return Err(error),
    };

    if create {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(path, rewrite_rate_line(&content, rate))
}

/// Writes `default-sample-rate = <rate>` into the PulseAudio daemon
/// configuration and returns the path that was updated.
///
/// The system-wide file is tried first; when it is missing or not writable
/// the per-user file is updated instead, created along with its parent
/// directories if needed. The change only takes effect once the daemon is
/// restarted, see [`request_daemon_restart`].
///
/// # Errors
/// Returns [`ControlError::ConfigWrite`] when neither file can be updated.
pub fn write_default_sample_rate(rate: u32) -> ControlResult<PathBuf> {
    let system = PathBuf::from(SYSTEM_CONF);
    match try_write(&system, rate, false) {
        Ok(()) => {
            debug!("Set default-sample-rate = {rate} in {}", system.display());
            return Ok(system);
        }
        Err(error) => {
            debug!(
                "System config {} not writable ({error}), using per-user config",
                system.display()
            );
        }
    }

    let user = user_conf_path().ok_or_else(|| ControlError::ConfigWrite {
        path: PathBuf::from("pulse/daemon.conf"),
        details: String::from("neither XDG_CONFIG_HOME nor HOME is set"),
    })?;

    try_write(&user, rate, true).map_err(|error| ControlError::ConfigWrite {
        path: user.clone(),
        details: error.to_string(),
    })?;

    debug!("Set default-sample-rate = {rate} in {}", user.display());
    Ok(user)
}

/// Reads the configured `default-sample-rate`, or `None` when no
/// configuration file sets it.
///
/// Probes `custom_config` first when supplied, then the per-user file, then
/// the system-wide file. The first readable file decides the result; later
/// candidates are not consulted.
#[must_use]
pub fn global_playback_rate(custom_config: Option<&Path>) -> Option<u32> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(path) = custom_config {
        candidates.push(path.to_path_buf());
    }
    if let Some(path) = user_conf_path() {
        candidates.push(path);
    }
    candidates.push(PathBuf::from(SYSTEM_CONF));

    let content = candidates
        .iter()
        .find_map(|path| fs::read_to_string(path).ok())?;

    parse_rate(&content)
}

#[allow(unsafe_code)]
fn is_superuser() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Restarts the PulseAudio daemon so configuration changes take effect.
///
/// When running as root this is a no-op that logs a warning, since
/// system-wide daemons are managed by the init system rather than per
/// session. Otherwise the daemon is killed if currently running, given
/// [`RESTART_DELAY`] to release its devices, and started again.
///
/// # Errors
/// Returns [`ControlError::RestartFailed`] when `pulseaudio --kill` or
/// `pulseaudio --start` cannot be spawned or exits with failure.
pub fn request_daemon_restart() -> ControlResult<()> {
    if is_superuser() {
        warn!("Running as root, restart PulseAudio manually to apply changes");
        return Ok(());
    }

    let running = Command::new("pulseaudio")
        .arg("--check")
        .status()
        .is_ok_and(|status| status.success());

    if running {
        let killed = Command::new("pulseaudio")
            .arg("--kill")
            .status()
            .map_err(|error| ControlError::RestartFailed(format!("pulseaudio --kill: {error}")))?;
        if !killed.success() {
            return Err(ControlError::RestartFailed(String::from(
                "pulseaudio --kill exited with failure",
            )));
        }
        thread::sleep(RESTART_DELAY);
    }

    let started = Command::new("pulseaudio")
        .arg("--start")
        .status()
        .map_err(|error| ControlError::RestartFailed(format!("pulseaudio --start: {error}")))?;
    if !started.success() {
        return Err(ControlError::RestartFailed(String::from(
            "pulseaudio --start exited with failure",
        )));
    }

    Ok(())
}

/// Writes the new global sample rate and restarts the daemon in one step.
///
/// # Errors
/// Returns [`ControlError::ConfigWrite`] when no configuration file can be
/// updated and [`ControlError::RestartFailed`] when the daemon restart
/// fails.
pub fn set_global_playback_rate(rate: u32) -> ControlResult<()> {
    let path = write_default_sample_rate(rate)?;
    debug!(
        "Updated {} to default-sample-rate = {rate}, restarting daemon",
        path.display()
    );
    request_daemon_restart()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_replaces_existing_line() {
        let content = "resample-method = soxr-vhq\ndefault-sample-rate = 44100\n";
        let rewritten = rewrite_rate_line(content, 48000);

        assert_eq!(
            rewritten,
            "resample-method = soxr-vhq\ndefault-sample-rate = 48000\n"
        );
    }

    #[test]
    fn rewrite_appends_when_setting_absent() {
        let content = "; This file is part of PulseAudio.\nresample-method = soxr-vhq\n";
        let rewritten = rewrite_rate_line(content, 96000);

        assert_eq!(
            rewritten,
            "; This file is part of PulseAudio.\nresample-method = soxr-vhq\ndefault-sample-rate = 96000\n"
        );
    }

    #[test]
    fn rewrite_preserves_commented_lines() {
        let content = "; default-sample-rate = 44100\n# default-sample-rate = 22050\n";
        let rewritten = rewrite_rate_line(content, 48000);

        assert_eq!(
            rewritten,
            "; default-sample-rate = 44100\n# default-sample-rate = 22050\ndefault-sample-rate = 48000\n"
        );
    }

    #[test]
    fn rewrite_collapses_duplicate_lines() {
        let content = "default-sample-rate = 44100\ndefault-sample-rate = 22050\n";
        let rewritten = rewrite_rate_line(content, 48000);

        assert_eq!(rewritten, "default-sample-rate = 48000\n");
        assert_eq!(
            rewritten
                .lines()
                .filter(|line| rate_line().is_match(line))
                .count(),
            1
        );
    }

    #[test]
    fn rewrite_handles_empty_input() {
        assert_eq!(rewrite_rate_line("", 44100), "default-sample-rate = 44100\n");
    }

    #[test]
    fn rewrite_matches_indented_setting() {
        let content = "  default-sample-rate =   44100\n";
        assert_eq!(rewrite_rate_line(content, 48000), "default-sample-rate = 48000\n");
    }

    #[test]
    fn parse_reads_value_back() {
        assert_eq!(parse_rate("default-sample-rate = 48000\n"), Some(48000));
    }

    #[test]
    fn parse_skips_commented_lines() {
        let content = "; default-sample-rate = 44100\ndefault-sample-rate = 48000\n";
        assert_eq!(parse_rate(content), Some(48000));
    }

    #[test]
    fn parse_returns_none_when_absent() {
        assert_eq!(parse_rate("resample-method = soxr-vhq\n"), None);
    }
}
