//! Frame clock adapters
//!
//! The animator never talks to a platform timer directly. It owns a
//! [`ClockDriver`] wrapping some [`FrameClock`] and only ever asks it to start
//! or stop; whether the clock runs is derived from whether any animation is
//! active.
//!
//! Two clocks ship with the crate:
//! - [`ThreadFrameClock`] - a dedicated thread firing at a fixed rate
//! - [`ManualClock`] - fired by the host's own event loop (or a test)

use crate::error::{AnimatorError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

/// Callback invoked once per refresh interval with the elapsed seconds
pub type FrameCallback = Arc<dyn Fn(f32) + Send + Sync>;

/// A platform timer that fires once per refresh interval
pub trait FrameClock: Send {
    /// Start invoking `callback` on every refresh interval
    ///
    /// On error the clock must be left detached.
    fn attach(&mut self, callback: FrameCallback) -> Result<()>;

    /// Stop firing and release the underlying timer
    fn detach(&mut self);
}

/// Idle/running lifecycle around a [`FrameClock`]
///
/// `start` and `stop` are idempotent. Stopping always detaches the clock; there
/// is no paused-but-attached state.
pub struct ClockDriver {
    clock: Box<dyn FrameClock>,
    running: bool,
}

impl ClockDriver {
    pub fn new(clock: impl FrameClock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            running: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.running
    }

    /// Attach the clock if idle. Returns `true` if it was started by this call.
    ///
    /// A failed attach leaves the driver idle, so the next `start` retries.
    pub fn start(&mut self, callback: FrameCallback) -> Result<bool> {
        if self.running {
            return Ok(false);
        }
        self.clock.attach(callback)?;
        self.running = true;
        Ok(true)
    }

    /// Detach the clock if running. Returns `true` if it was stopped by this call.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.clock.detach();
        self.running = false;
        true
    }
}

impl std::fmt::Debug for ClockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockDriver")
            .field("running", &self.running)
            .finish()
    }
}

// ============================================================================
// Thread Frame Clock
// ============================================================================

struct ClockThread {
    stop_flag: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Frame clock backed by a dedicated thread
///
/// Each attach spawns a fresh thread with its own stop flag. The thread sleeps
/// out the remainder of every frame and passes the measured time since its
/// previous fire to the callback.
pub struct ThreadFrameClock {
    frame_interval: Duration,
    thread: Option<ClockThread>,
}

impl ThreadFrameClock {
    pub fn new(target_fps: u32) -> Self {
        Self::with_interval(Duration::from_micros(1_000_000 / u64::from(target_fps.max(1))))
    }

    pub fn with_interval(frame_interval: Duration) -> Self {
        Self {
            frame_interval,
            thread: None,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn is_attached(&self) -> bool {
        self.thread.is_some()
    }

    fn run(frame_interval: Duration, stop_flag: Arc<AtomicBool>, callback: FrameCallback) {
        let mut last_frame = Instant::now();

        while !stop_flag.load(Ordering::Acquire) {
            let elapsed = last_frame.elapsed();
            if elapsed < frame_interval {
                thread::sleep(frame_interval - elapsed);
            }

            // Detached while sleeping.
            if stop_flag.load(Ordering::Acquire) {
                break;
            }

            let now = Instant::now();
            let dt = (now - last_frame).as_secs_f32();
            last_frame = now;
            callback(dt);
        }
    }
}

impl FrameClock for ThreadFrameClock {
    fn attach(&mut self, callback: FrameCallback) -> Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }

        let stop_flag = Arc::new(AtomicBool::new(false));
        let thread_flag = Arc::clone(&stop_flag);
        let frame_interval = self.frame_interval;

        let handle = thread::Builder::new()
            .name("motion-frame-clock".into())
            .spawn(move || Self::run(frame_interval, thread_flag, callback))
            .map_err(AnimatorError::ClockStart)?;

        self.thread = Some(ClockThread { stop_flag, handle });
        Ok(())
    }

    fn detach(&mut self) {
        // The clock thread may be the caller (a tick that just emptied the
        // active set), so never join here.
        if let Some(thread) = self.thread.take() {
            thread.stop_flag.store(true, Ordering::Release);
        }
    }
}

impl Drop for ThreadFrameClock {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            thread.stop_flag.store(true, Ordering::Release);
            let current: ThreadId = thread::current().id();
            if thread.handle.thread().id() != current {
                let _ = thread.handle.join();
            }
        }
    }
}

// ============================================================================
// Manual Clock
// ============================================================================

#[derive(Default)]
struct ManualClockShared {
    callback: Mutex<Option<FrameCallback>>,
    attach_count: AtomicUsize,
    detach_count: AtomicUsize,
}

/// Frame clock fired explicitly through a [`ManualClockHandle`]
///
/// Use this when the host already has a vsync-aligned event loop, or in tests.
pub struct ManualClock {
    shared: Arc<ManualClockShared>,
}

/// Drives a [`ManualClock`] from outside the animator
#[derive(Clone)]
pub struct ManualClockHandle {
    shared: Arc<ManualClockShared>,
}

impl ManualClock {
    pub fn new() -> (Self, ManualClockHandle) {
        let shared = Arc::new(ManualClockShared::default());
        (
            Self {
                shared: Arc::clone(&shared),
            },
            ManualClockHandle { shared },
        )
    }
}

impl FrameClock for ManualClock {
    fn attach(&mut self, callback: FrameCallback) -> Result<()> {
        *self.shared.callback.lock() = Some(callback);
        self.shared.attach_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn detach(&mut self) {
        if self.shared.callback.lock().take().is_some() {
            self.shared.detach_count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl ManualClockHandle {
    /// Fire one frame. Returns `false` if the clock is not attached.
    pub fn fire(&self, dt: f32) -> bool {
        // Clone out so the callback can detach the clock.
        let callback = self.shared.callback.lock().clone();
        match callback {
            Some(callback) => {
                callback(dt);
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.shared.callback.lock().is_some()
    }

    pub fn attach_count(&self) -> usize {
        self.shared.attach_count.load(Ordering::SeqCst)
    }

    pub fn detach_count(&self) -> usize {
        self.shared.detach_count.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Manual clock whose first `failures` attaches fail
    pub(crate) struct FlakyClock {
        inner: ManualClock,
        failures: Arc<AtomicUsize>,
    }

    impl FlakyClock {
        pub(crate) fn new(failures: usize) -> (Self, ManualClockHandle, Arc<AtomicUsize>) {
            let (inner, handle) = ManualClock::new();
            let failures = Arc::new(AtomicUsize::new(failures));
            let clock = Self {
                inner,
                failures: Arc::clone(&failures),
            };
            (clock, handle, failures)
        }
    }

    impl FrameClock for FlakyClock {
        fn attach(&mut self, callback: FrameCallback) -> Result<()> {
            let failed = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failed {
                return Err(AnimatorError::ClockStart(std::io::Error::other(
                    "no timer available",
                )));
            }
            self.inner.attach(callback)
        }

        fn detach(&mut self) {
            self.inner.detach();
        }
    }

    fn counting_callback() -> (FrameCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let callback: FrameCallback = Arc::new(move |_dt: f32| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (callback, count)
    }

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    #[test]
    fn test_driver_start_stop_idempotent() {
        let (clock, handle) = ManualClock::new();
        let mut driver = ClockDriver::new(clock);
        let (callback, _) = counting_callback();

        assert!(driver.is_idle());
        assert!(driver.start(callback.clone()).unwrap());
        assert!(!driver.start(callback).unwrap());
        assert!(!driver.is_idle());
        assert_eq!(handle.attach_count(), 1);

        assert!(driver.stop());
        assert!(!driver.stop());
        assert!(driver.is_idle());
        assert_eq!(handle.detach_count(), 1);
        assert!(!handle.is_attached());
    }

    #[test]
    fn test_driver_stays_idle_when_attach_fails() {
        let (clock, handle, _) = FlakyClock::new(1);
        let mut driver = ClockDriver::new(clock);
        let (callback, count) = counting_callback();

        let err = driver.start(callback.clone()).unwrap_err();
        assert!(matches!(err, AnimatorError::ClockStart(_)));
        assert!(driver.is_idle());
        assert!(!handle.is_attached());

        // Stopping an idle driver must not detach anything.
        assert!(!driver.stop());
        assert_eq!(handle.detach_count(), 0);

        assert!(driver.start(callback).unwrap());
        assert!(!driver.is_idle());
        assert!(handle.fire(0.016));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manual_clock_fire() {
        let (mut clock, handle) = ManualClock::new();
        let (callback, count) = counting_callback();

        assert!(!handle.fire(0.016));
        clock.attach(callback).unwrap();
        assert!(handle.fire(0.016));
        assert!(handle.fire(0.016));
        assert_eq!(count.load(Ordering::SeqCst), 2);

        clock.detach();
        assert!(!handle.fire(0.016));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_manual_clock_detach_from_callback() {
        let (clock, handle) = ManualClock::new();
        let clock = Arc::new(Mutex::new(clock));
        let c = Arc::clone(&clock);
        clock.lock().attach(Arc::new(move |_: f32| c.lock().detach())).unwrap();

        assert!(handle.fire(0.016));
        assert!(!handle.is_attached());
        assert_eq!(handle.detach_count(), 1);
    }

    #[test]
    fn test_thread_clock_fires_and_stops() {
        let mut clock = ThreadFrameClock::new(500);
        let (callback, count) = counting_callback();

        clock.attach(callback).unwrap();
        assert!(clock.is_attached());
        assert!(wait_until(Duration::from_secs(5), || {
            count.load(Ordering::SeqCst) >= 3
        }));

        clock.detach();
        assert!(!clock.is_attached());

        // At most one fire can race the stop flag.
        thread::sleep(Duration::from_millis(50));
        let settled = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), settled);
    }

    #[test]
    fn test_thread_clock_reports_elapsed_time() {
        let mut clock = ThreadFrameClock::with_interval(Duration::from_millis(5));
        let deltas: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
        let d = Arc::clone(&deltas);
        clock.attach(Arc::new(move |dt: f32| d.lock().push(dt))).unwrap();

        assert!(wait_until(Duration::from_secs(5), || deltas.lock().len() >= 2));
        clock.detach();

        for dt in deltas.lock().iter() {
            assert!(*dt >= 0.004, "dt {} shorter than the frame interval", dt);
        }
    }

    #[test]
    fn test_thread_clock_reattach() {
        let mut clock = ThreadFrameClock::new(500);
        let (first, first_count) = counting_callback();
        clock.attach(first).unwrap();
        assert!(wait_until(Duration::from_secs(5), || {
            first_count.load(Ordering::SeqCst) >= 1
        }));
        clock.detach();

        let (second, second_count) = counting_callback();
        clock.attach(second).unwrap();
        assert!(wait_until(Duration::from_secs(5), || {
            second_count.load(Ordering::SeqCst) >= 1
        }));
        drop(clock);

        thread::sleep(Duration::from_millis(20));
        let settled = second_count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(second_count.load(Ordering::SeqCst), settled);
    }
}
