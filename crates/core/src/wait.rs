use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Shared cancellation flag. Clones observe the same state; `cancel()` wakes
/// any thread currently sleeping in [`CancelToken::sleep`].
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        if let Ok(mut cancelled) = lock.lock() {
            *cancelled = true;
        }
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (lock, _) = &*self.inner;
        lock.lock().map(|c| *c).unwrap_or(true)
    }

    /// Sleep up to `dur`. Returns `true` if cancelled before or during the sleep.
    pub fn sleep(&self, dur: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let Ok(guard) = lock.lock() else { return true };
        match cvar.wait_timeout_while(guard, dur, |cancelled| !*cancelled) {
            Ok((guard, _)) => *guard,
            Err(_) => true,
        }
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready,
    TimedOut,
    Cancelled,
}

/// Call `check` every `interval` until it returns `Ok(true)`, `deadline`
/// passes, or `cancel` fires. The check always runs at least once. Check
/// errors abort the wait.
pub fn poll_until<E, F>(
    deadline: Instant,
    interval: Duration,
    cancel: &CancelToken,
    mut check: F,
) -> Result<WaitOutcome, E>
where
    F: FnMut() -> Result<bool, E>,
{
    loop {
        if cancel.is_cancelled() {
            return Ok(WaitOutcome::Cancelled);
        }
        if check()? {
            return Ok(WaitOutcome::Ready);
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(WaitOutcome::TimedOut);
        }
        if cancel.sleep(interval.min(deadline - now)) {
            return Ok(WaitOutcome::Cancelled);
        }
    }
}
