//! Damped spring stepping
//!
//! Unit-mass spring with semi-implicit Euler integration. A channel that is
//! both slower and closer to its target than `precision` snaps onto the
//! target with zero velocity.

use serde::{Deserialize, Serialize};

/// Spring coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringParams {
    /// Spring constant
    pub stiffness: f32,
    /// Damping coefficient
    pub damping: f32,
    /// Rest threshold for both distance and speed
    pub precision: f32,
}

impl Default for SpringParams {
    fn default() -> Self {
        SpringPreset::NoWobble.params()
    }
}

impl SpringParams {
    /// Coefficients with the default precision
    pub fn new(stiffness: f32, damping: f32) -> Self {
        Self {
            stiffness,
            damping,
            precision: 0.01,
        }
    }

    /// Override the rest threshold
    pub fn with_precision(mut self, precision: f32) -> Self {
        self.precision = precision;
        self
    }
}

/// Named coefficient sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpringPreset {
    /// 170 / 26
    NoWobble,
    /// 120 / 14
    Gentle,
    /// 180 / 12
    Wobbly,
    /// 210 / 20
    Stiff,
    /// 280 / 60
    Slow,
    /// 280 / 120
    Molasses,
}

impl SpringPreset {
    /// Every preset
    pub const ALL: [Self; 6] = [Self::NoWobble, Self::Gentle, Self::Wobbly, Self::Stiff, Self::Slow, Self::Molasses];

    /// Coefficients of this preset
    pub fn params(self) -> SpringParams {
        let (stiffness, damping) = match self {
            Self::NoWobble => (170.0, 26.0),
            Self::Gentle => (120.0, 14.0),
            Self::Wobbly => (180.0, 12.0),
            Self::Stiff => (210.0, 20.0),
            Self::Slow => (280.0, 60.0),
            Self::Molasses => (280.0, 120.0),
        };
        SpringParams::new(stiffness, damping)
    }
}

impl From<SpringPreset> for SpringParams {
    fn from(preset: SpringPreset) -> Self {
        preset.params()
    }
}

/// Advance one channel by `dt` seconds; returns `(value, velocity)`
pub fn step(value: f32, velocity: f32, target: f32, params: &SpringParams, dt: f32) -> (f32, f32) {
    let spring_force = -params.stiffness * (value - target);
    let damper_force = -params.damping * velocity;
    let acceleration = spring_force + damper_force;

    let next_velocity = velocity + acceleration * dt;
    let next_value = value + next_velocity * dt;

    if next_velocity.abs() < params.precision && (next_value - target).abs() < params.precision {
        (target, 0.0)
    } else {
        (next_value, next_velocity)
    }
}

/// State of `N` independent spring channels
#[derive(Debug, Clone, PartialEq)]
pub struct SpringState<const N: usize> {
    /// Current values
    pub values: [f32; N],
    /// Current velocities
    pub velocities: [f32; N],
    /// Targets
    pub targets: [f32; N],
    /// Per-channel coefficients
    pub params: [SpringParams; N],
}

impl<const N: usize> SpringState<N> {
    /// Channels resting at `values` with the same coefficients
    pub fn new(values: [f32; N], params: SpringParams) -> Self {
        Self {
            values,
            velocities: [0.0; N],
            targets: values,
            params: [params; N],
        }
    }

    /// Start every channel with the given velocities
    pub fn with_velocities(mut self, velocities: [f32; N]) -> Self {
        self.velocities = velocities;
        self
    }

    /// Advance every channel; returns whether all of them are at rest
    pub fn step(&mut self, dt: f32) -> bool {
        for i in 0..N {
            let (value, velocity) = step(self.values[i], self.velocities[i], self.targets[i], &self.params[i], dt);
            self.values[i] = value;
            self.velocities[i] = velocity;
        }
        self.is_at_rest()
    }

    /// Every channel sits exactly on its target with zero velocity
    #[allow(clippy::float_cmp)]
    pub fn is_at_rest(&self) -> bool {
        self.velocities.iter().all(|v| *v == 0.0) && self.values == self.targets
    }
}
