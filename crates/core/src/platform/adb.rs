use std::process::Command;
use std::time::Duration;

use crate::logger;
use crate::types::*;
use super::{Device, DeviceError};

const DUMP_PATH: &str = "/sdcard/window_dump.xml";

/// Serials of attached devices in the `device` state (skips `offline`,
/// `unauthorized`).
pub fn devices() -> Result<Vec<DeviceId>, DeviceError> {
    let out = run_adb(&["devices"])?;
    Ok(parse_devices(&out))
}

fn run_adb(args: &[&str]) -> Result<String, DeviceError> {
    let command = format!("adb {}", args.join(" "));
    logger::debug_p("adb", &command);

    let output = Command::new("adb")
        .args(args)
        .output()
        .map_err(|source| DeviceError::Spawn { command: command.clone(), source })?;

    logger::debug_p("adb", &format!("{} -> {}", command, output.status));
    if !output.status.success() {
        return Err(DeviceError::Command {
            command,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn parse_devices(text: &str) -> Vec<DeviceId> {
    text.lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with("List of devices"))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            (parts.next() == Some("device")).then(|| serial.to_string())
        })
        .collect()
}

/// `wm size` prints a physical size and, if set, an override. The override
/// is what input coordinates are relative to.
fn parse_wm_size(text: &str) -> Option<ScreenSize> {
    let parse_line = |prefix: &str| {
        text.lines()
            .find_map(|l| l.trim().strip_prefix(prefix))
            .and_then(|dims| {
                let (w, h) = dims.trim().split_once('x')?;
                Some(ScreenSize { width: w.parse().ok()?, height: h.parse().ok()? })
            })
    };
    parse_line("Override size:").or_else(|| parse_line("Physical size:"))
}

fn parse_wakefulness(text: &str) -> Option<bool> {
    text.lines()
        .find_map(|l| l.trim().strip_prefix("mWakefulness="))
        .map(|state| state.trim() == "Awake")
}

/// Real device reached through the `adb` binary.
pub struct AdbDevice {
    serial: DeviceId,
    screen: Option<ScreenSize>,
}

impl AdbDevice {
    pub fn new(serial: DeviceId) -> Self {
        Self { serial, screen: None }
    }

    fn shell(&self, args: &[&str]) -> Result<String, DeviceError> {
        let mut full = vec!["-s", self.serial.as_str(), "shell"];
        full.extend_from_slice(args);
        run_adb(&full)
    }

    fn exec_out(&self, args: &[&str]) -> Result<String, DeviceError> {
        let mut full = vec!["-s", self.serial.as_str(), "exec-out"];
        full.extend_from_slice(args);
        run_adb(&full)
    }
}

impl Device for AdbDevice {
    fn id(&self) -> &str {
        &self.serial
    }

    fn screen_size(&mut self) -> Result<ScreenSize, DeviceError> {
        if let Some(size) = self.screen {
            return Ok(size);
        }
        let out = self.shell(&["wm", "size"])?;
        let size = parse_wm_size(&out).ok_or_else(|| DeviceError::Unexpected {
            command: "wm size".into(),
            output: out.trim().to_string(),
        })?;
        logger::info_p("adb", &format!("{} screen {}", self.serial, size));
        self.screen = Some(size);
        Ok(size)
    }

    fn is_screen_on(&mut self) -> Result<bool, DeviceError> {
        let out = self.shell(&["dumpsys", "power"])?;
        let awake = parse_wakefulness(&out).ok_or_else(|| DeviceError::Unexpected {
            command: "dumpsys power".into(),
            output: "no mWakefulness line".into(),
        })?;
        Ok(awake)
    }

    fn wake_up(&mut self) -> Result<(), DeviceError> {
        self.shell(&["input", "keyevent", "KEYCODE_WAKEUP"])?;
        Ok(())
    }

    fn swipe(&mut self, from: Point, to: Point) -> Result<(), DeviceError> {
        let coords = [from.x, from.y, to.x, to.y].map(|n| n.to_string());
        let mut args = vec!["input", "swipe"];
        args.extend(coords.iter().map(String::as_str));
        self.shell(&args)?;
        Ok(())
    }

    fn close_app(&mut self, package: &str) -> Result<(), DeviceError> {
        self.shell(&["am", "force-stop", package])?;
        Ok(())
    }

    fn start_app(&mut self, app: &AppTarget) -> Result<(), DeviceError> {
        let component = app.component();
        let out = self.shell(&["am", "start", "-n", &component])?;
        // am exits 0 even when the activity can't be resolved
        if out.contains("Error") {
            return Err(DeviceError::Command {
                command: format!("am start -n {}", component),
                stderr: out.trim().to_string(),
            });
        }
        Ok(())
    }

    fn capture_ui(&mut self) -> Result<String, DeviceError> {
        let out = self.shell(&["uiautomator", "dump", DUMP_PATH])?;
        if out.contains("ERROR") {
            return Err(DeviceError::Unexpected {
                command: "uiautomator dump".into(),
                output: out.trim().to_string(),
            });
        }
        self.exec_out(&["cat", DUMP_PATH])
    }

    fn tap(&mut self, at: Point, hold: Duration) -> Result<(), DeviceError> {
        let (x, y, ms) = (at.x.to_string(), at.y.to_string(), hold.as_millis().to_string());
        // zero-length swipe is a tap held for `ms`
        self.shell(&["input", "swipe", &x, &y, &x, &y, &ms])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_devices() {
        let out = "List of devices attached\n\
                   0123456789ABCDEF\tdevice\n\
                   emulator-5554\toffline\n\
                   R58M12ABCDE\tunauthorized\n\
                   192.168.0.10:5555\tdevice\n\n";
        assert_eq!(parse_devices(out), vec!["0123456789ABCDEF", "192.168.0.10:5555"]);
        assert!(parse_devices("List of devices attached\n\n").is_empty());
    }

    #[test]
    fn test_parse_wm_size() {
        assert_eq!(
            parse_wm_size("Physical size: 1080x2340\n"),
            Some(ScreenSize { width: 1080, height: 2340 })
        );
        assert_eq!(
            parse_wm_size("Physical size: 1440x3200\nOverride size: 1080x2400\n"),
            Some(ScreenSize { width: 1080, height: 2400 })
        );
        assert_eq!(parse_wm_size("size: unknown"), None);
    }

    #[test]
    fn test_parse_wakefulness() {
        let awake = "POWER MANAGER (dumpsys power)\n  mWakefulness=Awake\n  mWakefulnessChanging=false\n";
        let asleep = "  mWakefulness=Asleep\n";
        let dozing = "  mWakefulness=Dozing\n";
        assert_eq!(parse_wakefulness(awake), Some(true));
        assert_eq!(parse_wakefulness(asleep), Some(false));
        assert_eq!(parse_wakefulness(dozing), Some(false));
        assert_eq!(parse_wakefulness("Display Power: state=ON"), None);
    }
}
