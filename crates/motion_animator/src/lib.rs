//! Motion Animator
//!
//! Frame-synchronized animation scheduling.
//!
//! # Features
//!
//! - **Animator**: advances every active animation once per frame, in insertion order
//! - **Deferred Removal**: removals are marked and excised after the frame loop,
//!   so callbacks can add or remove animations mid-tick
//! - **Self-Managing Clock**: the frame clock runs only while animations are active
//! - **Update Observers**: keyed listeners notified after every tick
//! - **Spring Animations**: RK4 springs as a ready-made animation task

pub mod animation;
pub mod clock;
pub mod config;
pub mod error;
pub mod observer;
pub mod scheduler;
pub mod spring;
pub mod spring_animation;

pub use animation::{
    same_animation, Animation, AnimationCallback, AnimationDelegate, AnimationHooks,
    SharedAnimation,
};
pub use clock::{
    ClockDriver, FrameCallback, FrameClock, ManualClock, ManualClockHandle, ThreadFrameClock,
};
pub use config::AnimatorConfig;
pub use error::{AnimatorError, Result};
pub use observer::{AnimatorObserver, ObserverKey};
pub use scheduler::{
    global_animator, is_global_animator_initialized, set_global_animator, try_global_animator,
    Animator, AnimatorHandle,
};
pub use spring::{Spring, SpringConfig};
pub use spring_animation::SpringAnimation;
