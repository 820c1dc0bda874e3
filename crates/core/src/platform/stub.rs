use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::logger;
use crate::types::*;
use super::{Device, DeviceError};

/// Interaction recorded by [`StubDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    ScreenSize,
    IsScreenOn,
    WakeUp,
    Swipe(Point, Point),
    CloseApp(String),
    StartApp(String),
    Capture,
    Tap(Point),
}

/// Shared handle to the stub's call log; stays readable after the device
/// has been moved into a flow.
pub type CallLog = Arc<Mutex<Vec<DeviceCall>>>;

/// Simulated device. Serves a scripted list of screens: `start_app` shows
/// the first, each tap advances to the next, and the last one sticks.
pub struct StubDevice {
    id: String,
    size: ScreenSize,
    screen_on: bool,
    screens: Vec<String>,
    current: usize,
    calls: CallLog,
}

const HOME_SCREEN: &str = concat!(
    r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?><hierarchy rotation="0">"#,
    r#"<node index="0" text="Olá, Maria" resource-id="" class="android.widget.TextView" package="com.nu.production" clickable="false" bounds="[48,180][600,260]" />"#,
    r#"<node index="1" text="Pagar" resource-id="" class="android.widget.Button" package="com.nu.production" clickable="true" bounds="[40,900][340,1100]" />"#,
    r#"<node index="2" text="Transferir" resource-id="" class="android.widget.Button" package="com.nu.production" clickable="true" bounds="[360,900][660,1100]" />"#,
    r#"</hierarchy>"#,
);

const PAY_SCREEN: &str = concat!(
    r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?><hierarchy rotation="0">"#,
    r#"<node index="0" text="Pagar um boleto" resource-id="" class="android.widget.TextView" package="com.nu.production" clickable="true" bounds="[42,612][1038,738]" />"#,
    r#"<node index="1" text="Pagar com Pix" resource-id="" class="android.widget.TextView" package="com.nu.production" clickable="true" bounds="[42,760][1038,886]" />"#,
    r#"</hierarchy>"#,
);

const SCANNER_SCREEN: &str = concat!(
    r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?><hierarchy rotation="0">"#,
    r#"<node index="0" text="Aponte a câmera para o código de barras" resource-id="" class="android.widget.TextView" package="com.nu.production" clickable="false" bounds="[0,120][1080,240]" />"#,
    r#"</hierarchy>"#,
);

impl StubDevice {
    pub fn new(size: ScreenSize, screen_on: bool, screens: Vec<String>) -> Self {
        Self {
            id: "stub-0".into(),
            size,
            screen_on,
            screens,
            current: 0,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Screens the banking app shows on the way to the bill scanner.
    pub fn demo() -> Self {
        Self::new(
            ScreenSize { width: 1080, height: 2340 },
            false,
            vec![HOME_SCREEN.into(), PAY_SCREEN.into(), SCANNER_SCREEN.into()],
        )
    }

    pub fn call_log(&self) -> CallLog {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: DeviceCall) {
        logger::debug_p("stub", &format!("{}.{:?}", self.id, call));
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl Device for StubDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn screen_size(&mut self) -> Result<ScreenSize, DeviceError> {
        self.record(DeviceCall::ScreenSize);
        Ok(self.size)
    }

    fn is_screen_on(&mut self) -> Result<bool, DeviceError> {
        self.record(DeviceCall::IsScreenOn);
        Ok(self.screen_on)
    }

    fn wake_up(&mut self) -> Result<(), DeviceError> {
        self.record(DeviceCall::WakeUp);
        self.screen_on = true;
        Ok(())
    }

    fn swipe(&mut self, from: Point, to: Point) -> Result<(), DeviceError> {
        self.record(DeviceCall::Swipe(from, to));
        Ok(())
    }

    fn close_app(&mut self, package: &str) -> Result<(), DeviceError> {
        self.record(DeviceCall::CloseApp(package.to_string()));
        Ok(())
    }

    fn start_app(&mut self, app: &AppTarget) -> Result<(), DeviceError> {
        self.record(DeviceCall::StartApp(app.component()));
        self.current = 0;
        Ok(())
    }

    fn capture_ui(&mut self) -> Result<String, DeviceError> {
        self.record(DeviceCall::Capture);
        Ok(self.screens.get(self.current).cloned().unwrap_or_default())
    }

    fn tap(&mut self, at: Point, _hold: Duration) -> Result<(), DeviceError> {
        self.record(DeviceCall::Tap(at));
        if self.current + 1 < self.screens.len() {
            self.current += 1;
        }
        Ok(())
    }
}
