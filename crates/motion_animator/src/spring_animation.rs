//! Spring-driven animation task
//!
//! ```ignore
//! let opacity = SpringAnimation::new(SpringConfig::stiff(), 0.0, 1.0);
//! animator.add_animation(opacity.clone());
//!
//! // Later, from anywhere: retargets and re-registers if it had already settled
//! opacity.set_target(0.0);
//! ```

use crate::animation::{Animation, AnimationHooks, SharedAnimation};
use crate::scheduler::AnimatorHandle;
use crate::spring::{Spring, SpringConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Animates a scalar towards a target with spring physics
///
/// Finishes once the spring is at rest.
pub struct SpringAnimation {
    spring: Mutex<Spring>,
    /// The last update reported the spring at rest
    finished: AtomicBool,
    hooks: AnimationHooks,
    animator: Mutex<Option<AnimatorHandle>>,
    this: Weak<SpringAnimation>,
}

impl SpringAnimation {
    pub fn new(config: SpringConfig, from: f32, to: f32) -> Arc<Self> {
        Arc::new_cyclic(|this| {
            let mut spring = Spring::new(config, from);
            spring.set_target(to);
            Self {
                spring: Mutex::new(spring),
                finished: AtomicBool::new(false),
                hooks: AnimationHooks::new(),
                animator: Mutex::new(None),
                this: this.clone(),
            }
        })
    }

    pub fn value(&self) -> f32 {
        self.spring.lock().value()
    }

    pub fn velocity(&self) -> f32 {
        self.spring.lock().velocity()
    }

    pub fn target(&self) -> f32 {
        self.spring.lock().target()
    }

    pub fn is_settled(&self) -> bool {
        self.spring.lock().is_settled()
    }

    pub fn callbacks(&self) -> &AnimationHooks {
        &self.hooks
    }

    /// Retarget the spring
    ///
    /// If this animation was ever added to an animator, it is added again so a
    /// settled spring starts moving on the next frame.
    pub fn set_target(&self, target: f32) {
        self.spring.lock().set_target(target);
        self.reregister();
    }

    /// Jump to the target; the animation finishes on its next update
    pub fn finish(&self) {
        self.spring.lock().snap_to_target();
    }

    fn reregister(&self) {
        let handle = self.animator.lock().clone();
        if let (Some(handle), Some(this)) = (handle, self.this.upgrade()) {
            let this: SharedAnimation = this;
            handle.add_animation(this);
        }
    }
}

impl Animation for SpringAnimation {
    fn update(&self, dt: f32) -> bool {
        let mut spring = self.spring.lock();
        spring.step(dt);
        let active = !spring.is_settled();
        self.finished.store(!active, Ordering::SeqCst);
        active
    }

    fn did_update(&self) {
        // Retargeted after the finishing update but before the removal mark,
        // when its own add was still a no-op.
        if self.finished.swap(false, Ordering::SeqCst) && !self.is_settled() {
            self.reregister();
        }
    }

    fn hooks(&self) -> Option<&AnimationHooks> {
        Some(&self.hooks)
    }

    fn set_animator(&self, animator: AnimatorHandle) {
        *self.animator.lock() = Some(animator);
    }
}

impl std::fmt::Debug for SpringAnimation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpringAnimation")
            .field("spring", &*self.spring.lock())
            .field("hooks", &self.hooks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, ThreadFrameClock};
    use crate::scheduler::Animator;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[test]
    fn test_runs_to_rest_and_stops_clock() {
        let (clock, frames) = ManualClock::new();
        let animator = Animator::new(clock);
        let spring = SpringAnimation::new(SpringConfig::stiff(), 0.0, 1.0);
        let steps = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicBool::new(false));

        let s = Arc::clone(&steps);
        spring.callbacks().set_on_step(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });
        let d = Arc::clone(&done);
        spring
            .callbacks()
            .set_on_completion(move |_| d.store(true, Ordering::SeqCst));

        animator.add_animation(spring.clone());
        let mut fired = 0;
        while frames.fire(1.0 / 60.0) {
            fired += 1;
            assert!(fired < 1000, "spring never settled");
        }

        assert!(done.load(Ordering::SeqCst));
        assert_eq!(steps.load(Ordering::SeqCst), fired);
        assert_eq!(spring.value(), 1.0);
        assert!(!animator.is_clock_running());
    }

    #[test]
    fn test_set_target_reregisters() {
        let (clock, frames) = ManualClock::new();
        let animator = Animator::new(clock);
        let spring = SpringAnimation::new(SpringConfig::stiff(), 0.0, 1.0);
        let shared: SharedAnimation = spring.clone();

        animator.add_animation(shared.clone());
        while frames.fire(1.0 / 60.0) {}
        assert!(!animator.has_animation(&shared));

        spring.set_target(0.0);
        assert!(animator.has_animation(&shared));
        assert!(animator.is_clock_running());

        while frames.fire(1.0 / 60.0) {}
        assert_eq!(spring.value(), 0.0);
    }

    #[test]
    fn test_retarget_before_removal_mark_is_kept() {
        let (clock, frames) = ManualClock::new();
        let animator = Animator::new(clock);
        let spring = SpringAnimation::new(SpringConfig::stiff(), 0.0, 1.0);
        let shared: SharedAnimation = spring.clone();
        let completions = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&completions);
        spring.callbacks().set_on_completion(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        animator.add_animation(shared.clone());

        // Replay a tick step by step, with another thread retargeting right
        // after the update that settles the spring.
        let mut frames_run = 0;
        while spring.update(1.0 / 60.0) {
            frames_run += 1;
            assert!(frames_run < 1000, "spring never settled");
        }
        spring.set_target(5.0);
        assert!(animator.has_animation(&shared));
        animator.remove_animation(&shared);
        spring.did_update();

        assert!(animator.has_animation(&shared));
        assert_eq!(animator.pending_removal_count(), 0);

        while frames.fire(1.0 / 60.0) {}
        assert_eq!(spring.value(), 5.0);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_settled_spring_is_removed_once() {
        let (clock, frames) = ManualClock::new();
        let animator = Animator::new(clock);
        let spring = SpringAnimation::new(SpringConfig::stiff(), 0.0, 1.0);
        let shared: SharedAnimation = spring.clone();
        let completions = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&completions);
        spring.callbacks().set_on_completion(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        animator.add_animation(shared.clone());
        while frames.fire(1.0 / 60.0) {}

        assert!(!animator.has_animation(&shared));
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_set_target_without_animator() {
        let spring = SpringAnimation::new(SpringConfig::gentle(), 0.0, 1.0);
        spring.set_target(2.0);
        assert_eq!(spring.target(), 2.0);
        assert_eq!(spring.value(), 0.0);
    }

    #[test]
    fn test_finish_completes_next_frame() {
        let (clock, frames) = ManualClock::new();
        let animator = Animator::new(clock);
        let spring = SpringAnimation::new(SpringConfig::gentle(), 0.0, 10.0);

        animator.add_animation(spring.clone());
        frames.fire(1.0 / 60.0);
        assert!(animator.is_clock_running());

        spring.finish();
        frames.fire(1.0 / 60.0);
        assert!(!animator.is_clock_running());
        assert_eq!(spring.value(), 10.0);
    }

    #[test]
    fn test_thread_clock_drives_spring_to_rest() {
        let animator = Animator::new(ThreadFrameClock::new(240));
        let spring = SpringAnimation::new(SpringConfig::stiff(), 0.0, 1.0);

        animator.add_animation(spring.clone());
        assert!(animator.is_clock_running());

        let deadline = Instant::now() + Duration::from_secs(10);
        while (animator.animation_count() > 0 || animator.is_clock_running())
            && Instant::now() < deadline
        {
            std::thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(animator.animation_count(), 0);
        assert!(!animator.is_clock_running());
        assert!(spring.is_settled());
    }
}
