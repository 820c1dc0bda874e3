//! Drives the banking app from a locked phone to the bill scanner.
//!
//! The run is linear: Init -> AppLaunch -> AwaitHome -> PayFlow. Any error
//! stops the run and is reported with the step it happened in; nothing is
//! retried. Every element tap captures a fresh screen first, so a tap is
//! never replayed against a stale snapshot.

use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::expressions::{self, ExpressionRegistry};
use crate::locator::{self, LocateError};
use crate::logger;
use crate::platform::{Device, DeviceError};
use crate::settings::AutomationSettings;
use crate::sleep;
use crate::types::*;
use crate::wait::{self, CancelToken, WaitOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Init,
    AppLaunch,
    AwaitHome,
    PayFlow,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Init => "Init",
            Step::AppLaunch => "AppLaunch",
            Step::AwaitHome => "AwaitHome",
            Step::PayFlow => "PayFlow",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error("{marker:?} not on screen after {waited:?}{}", last_error_note(.last_error))]
    Timeout {
        marker: String,
        waited: Duration,
        /// Most recent capture failure seen while waiting, if any.
        last_error: Option<String>,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("tap point {point} outside screen {screen}")]
    OutOfBounds { point: Point, screen: ScreenSize },
}

fn last_error_note(last_error: &Option<String>) -> String {
    last_error
        .as_ref()
        .map(|e| format!(" (last capture error: {})", e))
        .unwrap_or_default()
}

#[derive(Debug, Error)]
#[error("{step} failed: {source}")]
pub struct FlowError {
    pub step: Step,
    #[source]
    pub source: StepError,
}

/// Timing and targets for one run.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub app: AppTarget,
    pub home_marker: String,
    pub pay_bill_marker: String,
    /// Deadline for each wait-for-text.
    pub wait_timeout: Duration,
    /// Deadline for the whole run, on top of the per-wait ones.
    pub run_timeout: Option<Duration>,
    pub poll_interval: Duration,
    /// Sleep after each state-changing interaction.
    pub settle: Duration,
    pub tap_hold: Duration,
}

impl FlowConfig {
    pub fn from_settings(s: &AutomationSettings, default_sleep_ms: u64) -> Self {
        Self {
            app: s.app(),
            home_marker: s.home_marker.clone(),
            pay_bill_marker: s.pay_bill_marker.clone(),
            wait_timeout: Duration::from_secs(s.wait_timeout_secs),
            run_timeout: None,
            poll_interval: Duration::from_millis(default_sleep_ms.max(1)),
            settle: Duration::from_millis(default_sleep_ms.saturating_mul(s.settle_units as u64)),
            tap_hold: Duration::from_millis(s.tap_hold_ms),
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self::from_settings(&AutomationSettings::default(), 100)
    }
}

pub struct FlowController {
    device: Box<dyn Device>,
    config: FlowConfig,
    expressions: ExpressionRegistry,
    cancel: CancelToken,
    run_deadline: Option<Instant>,
}

impl FlowController {
    pub fn new(device: Box<dyn Device>, config: FlowConfig, expressions: ExpressionRegistry) -> Self {
        Self {
            device,
            config,
            expressions,
            cancel: CancelToken::new(),
            run_deadline: None,
        }
    }

    /// Token that aborts the run's current and future waits when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn run(&mut self) -> Result<(), FlowError> {
        logger::info_p("flow", &format!("starting on {}", self.device.id()));
        self.run_deadline = self.config.run_timeout.map(|t| Instant::now() + t);

        self.step(Step::Init, Self::init)?;
        self.step(Step::AppLaunch, Self::launch_app)?;
        self.step(Step::AwaitHome, Self::await_home)?;
        self.step(Step::PayFlow, Self::pay_flow)?;

        logger::info_p("flow", "done");
        Ok(())
    }

    fn step(&mut self, step: Step, f: fn(&mut Self) -> Result<(), StepError>) -> Result<(), FlowError> {
        if self.cancel.is_cancelled() {
            logger::error_p("flow", &format!("{} not started: cancelled", step));
            return Err(FlowError { step, source: StepError::Cancelled });
        }

        logger::info_p("flow", &format!("{}", step));
        f(self).map_err(|source| {
            logger::error_p("flow", &format!("{} failed: {}", step, source));
            FlowError { step, source }
        })
    }

    fn init(&mut self) -> Result<(), StepError> {
        let screen = self.device.screen_size()?;
        if !self.device.is_screen_on()? {
            logger::info_p("flow", "screen off, waking");
            self.device.wake_up()?;
            let x = screen.width / 2;
            self.device.swipe(Point::new(x, screen.height - 100), Point::new(x, 100))?;
            self.settle();
        }
        Ok(())
    }

    fn launch_app(&mut self) -> Result<(), StepError> {
        let app = self.config.app.clone();
        self.device.close_app(&app.package)?;
        self.device.start_app(&app)?;
        self.settle();
        Ok(())
    }

    fn await_home(&mut self) -> Result<(), StepError> {
        let marker = self.config.home_marker.clone();
        self.wait_for_text(&marker)
    }

    fn pay_flow(&mut self) -> Result<(), StepError> {
        self.tap_element(expressions::BUTTON_ROW)?;
        let marker = self.config.pay_bill_marker.clone();
        self.wait_for_text(&marker)?;
        self.tap_element(expressions::INVOICE_BUTTON)?;
        Ok(())
    }

    /// Capture, locate `name`, tap once.
    fn tap_element(&mut self, name: &str) -> Result<(), StepError> {
        let pattern = self
            .expressions
            .lookup(name)
            .ok_or_else(|| LocateError::UnknownElement { name: name.to_string() })?;

        let screen = self.device.capture_ui()?;
        let point = locator::locate(pattern, &screen)?;

        let size = self.device.screen_size()?;
        if !size.contains(point) {
            return Err(StepError::OutOfBounds { point, screen: size });
        }

        logger::info_p("flow", &format!("tap {} at {}", name, point));
        self.device.tap(point, self.config.tap_hold)?;
        self.settle();
        Ok(())
    }

    /// Poll the screen until `marker` shows up, bounded by the step and run
    /// deadlines. A dump that fails on the device side counts as "not yet";
    /// failing to reach adb at all ends the wait.
    fn wait_for_text(&mut self, marker: &str) -> Result<(), StepError> {
        let started = Instant::now();
        let mut deadline = started + self.config.wait_timeout;
        if let Some(run_deadline) = self.run_deadline {
            deadline = deadline.min(run_deadline);
        }

        let device = &mut self.device;
        let mut last_error = None;
        let outcome = wait::poll_until(deadline, self.config.poll_interval, &self.cancel, || {
            match device.capture_ui() {
                Ok(screen) => Ok(screen.contains(marker)),
                // uiautomator fails while the window is still changing
                Err(e @ (DeviceError::Unexpected { .. } | DeviceError::Command { .. })) => {
                    logger::warn_p("flow", &format!("capture failed, retrying: {}", e));
                    last_error = Some(e.to_string());
                    Ok(false)
                }
                Err(e) => Err(StepError::from(e)),
            }
        })?;

        match outcome {
            WaitOutcome::Ready => {
                logger::info_p("flow", &format!("found {:?} after {:?}", marker, started.elapsed()));
                Ok(())
            }
            WaitOutcome::TimedOut => Err(StepError::Timeout {
                marker: marker.to_string(),
                waited: started.elapsed(),
                last_error,
            }),
            WaitOutcome::Cancelled => Err(StepError::Cancelled),
        }
    }

    fn settle(&self) {
        sleep::sleep_ms(self.config.settle.as_millis() as u64);
    }
}
