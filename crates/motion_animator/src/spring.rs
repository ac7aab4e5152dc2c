//! Spring physics
//!
//! RK4-integrated damped spring. [`SpringAnimation`](crate::SpringAnimation)
//! wraps one of these into an animation task.

/// Physical parameters of a spring plus the thresholds at which it counts as
/// being at rest
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
    /// Maximum distance from the target for the spring to be at rest
    pub rest_displacement: f32,
    /// Maximum speed for the spring to be at rest
    pub rest_velocity: f32,
}

impl SpringConfig {
    pub fn new(stiffness: f32, damping: f32, mass: f32) -> Self {
        Self {
            stiffness,
            damping,
            mass,
            rest_displacement: 0.001,
            rest_velocity: 0.01,
        }
    }

    /// A gentle, slow spring
    pub fn gentle() -> Self {
        Self::new(120.0, 14.0, 1.0)
    }

    /// A wobbly spring with visible overshoot
    pub fn wobbly() -> Self {
        Self::new(180.0, 12.0, 1.0)
    }

    /// A stiff, snappy spring
    pub fn stiff() -> Self {
        Self::new(400.0, 30.0, 1.0)
    }

    /// Override the rest thresholds, e.g. for values measured in pixels
    pub fn with_rest_thresholds(mut self, displacement: f32, velocity: f32) -> Self {
        self.rest_displacement = displacement;
        self.rest_velocity = velocity;
        self
    }

    pub fn critical_damping(&self) -> f32 {
        2.0 * (self.stiffness * self.mass).sqrt()
    }

    /// Check if the spring is underdamped (will oscillate)
    pub fn is_underdamped(&self) -> bool {
        self.damping < self.critical_damping()
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::stiff()
    }
}

/// A damped spring moving a scalar value towards a target
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    config: SpringConfig,
    value: f32,
    velocity: f32,
    target: f32,
}

impl Spring {
    pub fn new(config: SpringConfig, initial: f32) -> Self {
        Self {
            config,
            value: initial,
            velocity: 0.0,
            target: initial,
        }
    }

    pub fn config(&self) -> &SpringConfig {
        &self.config
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Retarget without touching the current velocity
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump to the target and stop
    pub fn snap_to_target(&mut self) {
        self.value = self.target;
        self.velocity = 0.0;
    }

    pub fn is_settled(&self) -> bool {
        (self.value - self.target).abs() < self.config.rest_displacement
            && self.velocity.abs() < self.config.rest_velocity
    }

    /// Advance the simulation by `dt` seconds
    ///
    /// Once settled the spring snaps exactly onto its target.
    pub fn step(&mut self, dt: f32) {
        if self.is_settled() {
            self.snap_to_target();
            return;
        }

        let (x, v) = (self.value, self.velocity);
        let half = dt * 0.5;

        let a1 = self.acceleration(x, v);
        let a2 = self.acceleration(x + v * half, v + a1 * half);
        let v2 = v + a1 * half;
        let a3 = self.acceleration(x + v2 * half, v + a2 * half);
        let v3 = v + a2 * half;
        let a4 = self.acceleration(x + v3 * dt, v + a3 * dt);
        let v4 = v + a3 * dt;

        self.velocity += (a1 + 2.0 * a2 + 2.0 * a3 + a4) * dt / 6.0;
        self.value += (v + 2.0 * v2 + 2.0 * v3 + v4) * dt / 6.0;

        if self.is_settled() {
            self.snap_to_target();
        }
    }

    fn acceleration(&self, x: f32, v: f32) -> f32 {
        let spring_force = -self.config.stiffness * (x - self.target);
        let damping_force = -self.config.damping * v;
        (spring_force + damping_force) / self.config.mass
    }
}
