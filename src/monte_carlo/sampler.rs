//! Standard-normal samplers for return paths

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of independent N(0, 1) draws
pub trait NormalSampler {
    fn standard_normal(&mut self) -> f64;
}

/// Box-Muller transform over any uniform RNG
///
/// Each pair of uniforms yields two normals; the second is kept for the next call.
#[derive(Debug, Clone)]
pub struct BoxMuller<R: Rng> {
    rng: R,
    spare: Option<f64>,
}

impl<R: Rng> BoxMuller<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, spare: None }
    }
}

impl BoxMuller<StdRng> {
    /// Reproducible sampler
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> NormalSampler for BoxMuller<R> {
    fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return z;
        }
        // u1 in (0, 1] keeps ln(u1) finite
        let u1: f64 = 1.0 - self.rng.gen::<f64>();
        let u2: f64 = self.rng.gen::<f64>();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * PI * u2;
        self.spare = Some(radius * angle.sin());
        radius * angle.cos()
    }
}

/// Always returns 0, so sampled returns equal their means
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroNoise;

impl NormalSampler for ZeroNoise {
    fn standard_normal(&mut self) -> f64 {
        0.0
    }
}
