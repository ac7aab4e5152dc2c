//! Animation scheduler
//!
//! The [`Animator`] owns the active animations and advances them once per
//! frame clock fire. Animations can be added or removed at any time, from any
//! thread, including from inside another animation's callbacks while a tick is
//! running.
//!
//! # Tick protocol
//!
//! All state sits behind one mutex, but the lock is never held while calling
//! into animation or observer code:
//!
//! 1. Excise animations marked for removal since the previous tick
//! 2. Snapshot the active set and advance every animation in insertion order
//!    (`will_update`, `update`, `did_update`, step hooks)
//! 3. Excise the animations that finished (or were removed) during the loop and
//!    fire their completion hooks, in marking order
//! 4. Stop the frame clock if nothing is left
//! 5. Notify observers with the frame delta
//!
//! Removal only ever marks an animation; the active set shrinks only in steps 1
//! and 3. Animations added during the loop land after the snapshot and are first
//! advanced on the next tick.

use crate::animation::{notify_step, notify_stop, position_of, SharedAnimation};
use crate::clock::{ClockDriver, FrameCallback, FrameClock, ThreadFrameClock};
use crate::config::AnimatorConfig;
use crate::error::{AnimatorError, Result};
use crate::observer::{AnimatorObserver, ObserverKey, ObserverRegistry};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

// ============================================================================
// Global Animator State
// ============================================================================

/// Process-wide animator
static GLOBAL_ANIMATOR: OnceLock<Animator> = OnceLock::new();

/// Install the process-wide animator
///
/// Call once at app startup. Components that don't receive an [`Animator`]
/// explicitly can then reach it through [`global_animator()`].
pub fn set_global_animator(animator: Animator) -> Result<()> {
    GLOBAL_ANIMATOR
        .set(animator)
        .map_err(|_| AnimatorError::AlreadyInitialized)
}

/// Get the process-wide animator
pub fn global_animator() -> Result<Animator> {
    GLOBAL_ANIMATOR
        .get()
        .cloned()
        .ok_or(AnimatorError::NotInitialized)
}

/// Try to get the process-wide animator (returns None if not initialized)
pub fn try_global_animator() -> Option<Animator> {
    GLOBAL_ANIMATOR.get().cloned()
}

/// Check if the process-wide animator has been installed
pub fn is_global_animator_initialized() -> bool {
    GLOBAL_ANIMATOR.get().is_some()
}

// ============================================================================
// Animator
// ============================================================================

struct AnimatorState {
    /// Active animations, in insertion order
    animations: Vec<SharedAnimation>,
    /// Marked for removal, awaiting excision. Always a subset of `animations`.
    pending_removal: Vec<SharedAnimation>,
    observers: ObserverRegistry,
    clock: ClockDriver,
    ticking: bool,
}

struct AnimatorShared {
    state: Mutex<AnimatorState>,
    debug_enabled: AtomicBool,
}

impl Drop for AnimatorShared {
    fn drop(&mut self) {
        self.state.get_mut().clock.stop();
    }
}

/// Frame-synchronized animation scheduler
///
/// Cloning is cheap and yields another reference to the same scheduler.
///
/// ```ignore
/// let (clock, frames) = ManualClock::new();
/// let animator = Animator::new(clock);
///
/// animator.add_animation(SpringAnimation::new(SpringConfig::stiff(), 0.0, 1.0));
/// while frames.fire(1.0 / 60.0) {}
/// ```
#[derive(Clone)]
pub struct Animator {
    shared: Arc<AnimatorShared>,
}

impl Animator {
    /// Create an animator driven by `clock`
    pub fn new(clock: impl FrameClock + 'static) -> Self {
        Self {
            shared: Arc::new(AnimatorShared {
                state: Mutex::new(AnimatorState {
                    animations: Vec::new(),
                    pending_removal: Vec::new(),
                    observers: ObserverRegistry::new(),
                    clock: ClockDriver::new(clock),
                    ticking: false,
                }),
                debug_enabled: AtomicBool::new(false),
            }),
        }
    }

    /// Create an animator driven by a [`ThreadFrameClock`] at the configured rate
    pub fn from_config(config: &AnimatorConfig) -> Result<Self> {
        config.validate()?;
        let animator = Self::new(ThreadFrameClock::with_interval(config.frame_interval()));
        animator.set_debug_enabled(config.debug);
        Ok(animator)
    }

    /// Get a weak handle to this animator
    pub fn handle(&self) -> AnimatorHandle {
        AnimatorHandle {
            inner: Arc::downgrade(&self.shared),
        }
    }

    // =========================================================================
    // Animations
    // =========================================================================

    /// Add an animation
    ///
    /// An animation marked for removal but not yet excised is rescued. Adding
    /// an animation that is already active does nothing else.
    pub fn add_animation(&self, animation: SharedAnimation) {
        let appended = {
            let mut state = self.shared.state.lock();
            if let Some(index) = position_of(&state.pending_removal, &animation) {
                state.pending_removal.remove(index);
            }
            let appended = position_of(&state.animations, &animation).is_none();
            if appended {
                state.animations.push(Arc::clone(&animation));
            }
            self.sync_clock(&mut state);
            appended
        };

        if appended {
            animation.set_animator(self.handle());
        }
    }

    /// Check if an animation is active and not marked for removal
    pub fn has_animation(&self, animation: &SharedAnimation) -> bool {
        let state = self.shared.state.lock();
        position_of(&state.animations, animation).is_some()
            && position_of(&state.pending_removal, animation).is_none()
    }

    /// Mark an animation for removal at the next safe point
    ///
    /// The animation stays in the active set until the next excision pass, but
    /// [`has_animation`](Self::has_animation) reports it gone immediately.
    pub fn remove_animation(&self, animation: &SharedAnimation) {
        Self::mark_for_removal(&mut self.shared.state.lock(), animation);
    }

    /// Number of animations in the active set, including ones marked for removal
    pub fn animation_count(&self) -> usize {
        self.shared.state.lock().animations.len()
    }

    pub fn pending_removal_count(&self) -> usize {
        self.shared.state.lock().pending_removal.len()
    }

    pub fn is_clock_running(&self) -> bool {
        !self.shared.state.lock().clock.is_idle()
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Register an observer notified after every tick
    pub fn add_update_observer<O>(&self, observer: O) -> ObserverKey
    where
        O: AnimatorObserver + 'static,
    {
        self.shared.state.lock().observers.insert(Arc::new(observer))
    }

    pub fn observer_with_key(&self, key: ObserverKey) -> Option<Arc<dyn AnimatorObserver>> {
        self.shared.state.lock().observers.get(key)
    }

    /// Unregister an observer. Unknown keys are ignored.
    pub fn remove_update_observer_with_key(&self, key: ObserverKey) {
        self.shared.state.lock().observers.remove(key);
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Log frame clock start/stop at info level
    pub fn set_debug_enabled(&self, enabled: bool) {
        self.shared.debug_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.shared.debug_enabled.load(Ordering::Relaxed)
    }

    fn debug_msg(&self, msg: &str) {
        if self.is_debug_enabled() {
            tracing::info!("Animator: {}", msg);
        } else {
            tracing::trace!("Animator: {}", msg);
        }
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Advance every active animation by `dt` seconds
    ///
    /// Normally called by the frame clock. Returns true if animations remain
    /// active after the tick. A tick requested while another tick of this
    /// animator is running is skipped.
    pub fn tick(&self, dt: f32) -> bool {
        let leftover = {
            let mut state = self.shared.state.lock();
            if state.ticking {
                tracing::trace!("Animator: tick skipped, already ticking");
                return !state.animations.is_empty();
            }
            state.ticking = true;
            Self::excise_pending(&mut state)
        };
        let _guard = TickGuard(&*self.shared);

        for animation in &leftover {
            notify_stop(animation);
        }

        let frame = self.shared.state.lock().animations.clone();
        for animation in &frame {
            animation.will_update();
            if !animation.update(dt) {
                self.remove_animation(animation);
            }
            animation.did_update();
            notify_step(animation);
        }

        let finished = Self::excise_pending(&mut self.shared.state.lock());
        for animation in &finished {
            notify_stop(animation);
        }

        let (has_active, observers) = {
            let mut state = self.shared.state.lock();
            self.sync_clock(&mut state);
            (!state.animations.is_empty(), state.observers.snapshot())
        };

        for observer in &observers {
            observer.animator_did_update(self, dt);
        }

        has_active
    }

    fn mark_for_removal(state: &mut AnimatorState, animation: &SharedAnimation) {
        if position_of(&state.animations, animation).is_some()
            && position_of(&state.pending_removal, animation).is_none()
        {
            state.pending_removal.push(Arc::clone(animation));
        }
    }

    /// Remove every marked animation from both sets, returning them in marking order
    fn excise_pending(state: &mut AnimatorState) -> Vec<SharedAnimation> {
        let pending = std::mem::take(&mut state.pending_removal);
        let mut excised = Vec::with_capacity(pending.len());
        for animation in pending {
            let index = position_of(&state.animations, &animation);
            debug_assert!(
                index.is_some(),
                "animation marked for removal is missing from the active set"
            );
            if let Some(index) = index {
                state.animations.remove(index);
                excised.push(animation);
            }
        }
        excised
    }

    /// Run the clock iff there are active animations
    fn sync_clock(&self, state: &mut AnimatorState) {
        if state.animations.is_empty() {
            if state.clock.stop() {
                self.debug_msg("frame clock stopped");
            }
        } else if state.clock.is_idle() {
            match state.clock.start(self.frame_callback()) {
                Ok(true) => self.debug_msg("frame clock started"),
                Ok(false) => {}
                // Left idle, so the next add retries.
                Err(err) => tracing::error!("Animator: {}", err),
            }
        }
    }

    fn frame_callback(&self) -> FrameCallback {
        let handle = self.handle();
        Arc::new(move |dt| {
            if let Some(animator) = handle.upgrade() {
                animator.tick(dt);
            }
        })
    }
}

impl Default for Animator {
    fn default() -> Self {
        let config = AnimatorConfig::default();
        let animator = Self::new(ThreadFrameClock::with_interval(config.frame_interval()));
        animator.set_debug_enabled(config.debug);
        animator
    }
}

impl std::fmt::Debug for Animator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Animator");
        if let Some(state) = self.shared.state.try_lock() {
            s.field("animations", &state.animations.len())
                .field("pending_removal", &state.pending_removal.len())
                .field("observers", &state.observers.len())
                .field("clock", &state.clock);
        }
        s.field("debug_enabled", &self.is_debug_enabled()).finish()
    }
}

/// Clears the ticking flag when the tick ends, including by unwinding
struct TickGuard<'a>(&'a AnimatorShared);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.state.lock().ticking = false;
    }
}

// ============================================================================
// Animator Handle
// ============================================================================

/// A weak handle to the animator
///
/// Animations receive one when they are added. It won't keep the animator
/// alive; every operation is a no-op once the animator is gone.
#[derive(Clone)]
pub struct AnimatorHandle {
    inner: Weak<AnimatorShared>,
}

impl AnimatorHandle {
    pub fn upgrade(&self) -> Option<Animator> {
        self.inner.upgrade().map(|shared| Animator { shared })
    }

    /// Check if the animator is still alive
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn add_animation(&self, animation: SharedAnimation) {
        if let Some(animator) = self.upgrade() {
            animator.add_animation(animation);
        }
    }

    pub fn remove_animation(&self, animation: &SharedAnimation) {
        if let Some(animator) = self.upgrade() {
            animator.remove_animation(animation);
        }
    }

    pub fn has_animation(&self, animation: &SharedAnimation) -> bool {
        self.upgrade()
            .map(|animator| animator.has_animation(animation))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for AnimatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimatorHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}
