pub mod adb;
pub mod stub;

use std::time::Duration;

use thiserror::Error;

use crate::logger;
use crate::types::*;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no devices found")]
    NoDevice,

    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("unexpected output from {command}: {output}")]
    Unexpected { command: String, output: String },
}

/// One connected Android device, providing the automation primitives.
pub trait Device: Send {
    fn id(&self) -> &str;
    /// Query the display size. Implementations cache the result.
    fn screen_size(&mut self) -> Result<ScreenSize, DeviceError>;
    fn is_screen_on(&mut self) -> Result<bool, DeviceError>;
    fn wake_up(&mut self) -> Result<(), DeviceError>;
    fn swipe(&mut self, from: Point, to: Point) -> Result<(), DeviceError>;
    /// Stop `package`. Succeeds when it isn't running.
    fn close_app(&mut self, package: &str) -> Result<(), DeviceError>;
    fn start_app(&mut self, app: &AppTarget) -> Result<(), DeviceError>;
    /// Fresh UI hierarchy dump of the current screen.
    fn capture_ui(&mut self) -> Result<String, DeviceError>;
    fn tap(&mut self, at: Point, hold: Duration) -> Result<(), DeviceError>;
}

/// Connect to the first attached device, or a simulated one when `force_stub`.
pub fn connect(force_stub: bool) -> Result<Box<dyn Device>, DeviceError> {
    if force_stub {
        logger::info_p("stub", "using simulated device");
        return Ok(Box::new(stub::StubDevice::demo()));
    }

    let devices = adb::devices()?;
    let Some(first) = devices.first() else {
        return Err(DeviceError::NoDevice);
    };
    if devices.len() > 1 {
        logger::info(&format!("{} devices attached, using device[0]: {}", devices.len(), first));
    }
    Ok(Box::new(adb::AdbDevice::new(first.clone())))
}
