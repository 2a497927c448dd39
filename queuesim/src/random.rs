//! Seedable exponential variates.

use rand::SeedableRng;
use rand_distr::{Distribution, Exp};
use rand_pcg::Pcg64;

/// An exponential distribution parametrized by its mean.
#[derive(Clone, Copy, Debug)]
pub struct Exponential {
    mean: f64,
    distribution: Exp<f64>,
}

impl Exponential {
    /// Creates an exponential distribution with the specified mean, i.e. with
    /// rate `1 / mean`.
    ///
    /// Returns `None` if the mean is not strictly positive and finite.
    pub fn with_mean(mean: f64) -> Option<Self> {
        if !(mean.is_finite() && mean > 0.0) {
            return None;
        }
        let distribution = Exp::new(1.0 / mean).ok()?;

        Some(Self { mean, distribution })
    }

    /// Returns the mean of the distribution.
    pub fn mean(&self) -> f64 {
        self.mean
    }
}

/// A seeded source of exponential variates.
///
/// Two samplers created with the same seed produce bit-identical sequences
/// when drawing from the same distributions in the same order.
///
/// # Examples
///
/// ```
/// use queuesim::random::{ExpSampler, Exponential};
///
/// let service = Exponential::with_mean(2.0).unwrap();
/// let mut a = ExpSampler::new(1234);
/// let mut b = ExpSampler::new(1234);
///
/// for _ in 0..10 {
///     assert_eq!(a.draw(&service), b.draw(&service));
/// }
/// ```
#[derive(Clone, Debug)]
pub struct ExpSampler {
    rng: Pcg64,
}

impl ExpSampler {
    /// Creates a sampler from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    /// Draws a variate from the specified distribution.
    pub fn draw(&mut self, distribution: &Exponential) -> f64 {
        distribution.distribution.sample(&mut self.rng)
    }
}
