//! Animation task capability
//!
//! An animation is any type implementing [`Animation`]. The animator holds it as
//! a [`SharedAnimation`] and compares tasks by identity, never by value, so two
//! structurally equal animations are still two distinct tasks.
//!
//! Side effects that are not part of the update math (per-step callbacks,
//! completion callbacks, a delegate) live in [`AnimationHooks`]. A task that
//! doesn't need any simply keeps the default `hooks()` returning `None`.

use crate::scheduler::AnimatorHandle;
use parking_lot::Mutex;
use std::sync::Arc;

/// A shared, identity-compared animation task
pub type SharedAnimation = Arc<dyn Animation>;

/// Callback invoked with the animation it is attached to
pub type AnimationCallback = Arc<dyn Fn(&SharedAnimation) + Send + Sync>;

/// A unit of work advanced once per frame by the animator
///
/// Methods take `&self`; implementations keep their mutable state behind a
/// lock so the same task can be shared between the animator and its owner.
pub trait Animation: Send + Sync {
    /// Called right before [`update`](Self::update) on every tick
    fn will_update(&self) {}

    /// Advance by `dt` seconds
    ///
    /// Returns `true` while the animation is still running, `false` once it
    /// has finished and should be removed.
    fn update(&self, dt: f32) -> bool;

    /// Called right after [`update`](Self::update) on every tick
    fn did_update(&self) {}

    /// Optional per-step and completion side effects
    fn hooks(&self) -> Option<&AnimationHooks> {
        None
    }

    /// Receive the weak back-reference to the animator that now owns this task
    fn set_animator(&self, _animator: AnimatorHandle) {}
}

/// Receives step and stop notifications for an animation
pub trait AnimationDelegate: Send + Sync {
    fn animation_did_perform_step(&self, _animation: &SharedAnimation) {}

    fn animation_did_stop(&self, _animation: &SharedAnimation) {}
}

/// Optional side effects attached to an animation
///
/// Each slot can be set or cleared at any time, including from inside another
/// hook. The animator clones the slot out before invoking it, so a hook may
/// replace itself.
#[derive(Default)]
pub struct AnimationHooks {
    on_step: Mutex<Option<AnimationCallback>>,
    on_completion: Mutex<Option<AnimationCallback>>,
    delegate: Mutex<Option<Arc<dyn AnimationDelegate>>>,
}

impl AnimationHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the callback invoked after every step
    pub fn set_on_step<F>(&self, callback: F)
    where
        F: Fn(&SharedAnimation) + Send + Sync + 'static,
    {
        *self.on_step.lock() = Some(Arc::new(callback));
    }

    /// Set the callback invoked once the animation has been removed
    pub fn set_on_completion<F>(&self, callback: F)
    where
        F: Fn(&SharedAnimation) + Send + Sync + 'static,
    {
        *self.on_completion.lock() = Some(Arc::new(callback));
    }

    pub fn set_delegate(&self, delegate: Option<Arc<dyn AnimationDelegate>>) {
        *self.delegate.lock() = delegate;
    }

    pub fn clear(&self) {
        *self.on_step.lock() = None;
        *self.on_completion.lock() = None;
        *self.delegate.lock() = None;
    }

    pub fn on_step(&self) -> Option<AnimationCallback> {
        self.on_step.lock().clone()
    }

    pub fn on_completion(&self) -> Option<AnimationCallback> {
        self.on_completion.lock().clone()
    }

    pub fn delegate(&self) -> Option<Arc<dyn AnimationDelegate>> {
        self.delegate.lock().clone()
    }
}

impl std::fmt::Debug for AnimationHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationHooks")
            .field("on_step", &self.on_step.lock().is_some())
            .field("on_completion", &self.on_completion.lock().is_some())
            .field("delegate", &self.delegate.lock().is_some())
            .finish()
    }
}

/// Identity comparison of two animation handles
pub fn same_animation(a: &SharedAnimation, b: &SharedAnimation) -> bool {
    // Compare data pointers only; vtable pointers may differ across codegen units.
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

pub(crate) fn position_of(list: &[SharedAnimation], animation: &SharedAnimation) -> Option<usize> {
    list.iter().position(|a| same_animation(a, animation))
}

/// Delegate step notification, then the per-step callback
pub(crate) fn notify_step(animation: &SharedAnimation) {
    let Some(hooks) = animation.hooks() else {
        return;
    };
    if let Some(delegate) = hooks.delegate() {
        delegate.animation_did_perform_step(animation);
    }
    if let Some(callback) = hooks.on_step() {
        callback(animation);
    }
}

/// Delegate stop notification, then the completion callback
pub(crate) fn notify_stop(animation: &SharedAnimation) {
    let Some(hooks) = animation.hooks() else {
        return;
    };
    if let Some(delegate) = hooks.delegate() {
        delegate.animation_did_stop(animation);
    }
    if let Some(callback) = hooks.on_completion() {
        callback(animation);
    }
}
