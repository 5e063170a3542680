//! Probability sampling behind the fault gates
//!
//! Each stage of the pipeline asks a [`Sampler`] two questions: "does the
//! gate fire?" ([`Sampler::bernoulli`]) and "how long is the delay?"
//! ([`Sampler::sample_duration`]). The distribution kind shapes how those
//! answers spread over repeated trials; the configured probability and
//! mean stay the same.
//!
//! Each message gets its own sampler, derived from a process-wide
//! [`SamplerSource`], so the hot path never contends on a shared RNG and
//! tests can seed the whole chain deterministically.

use std::f64::consts::PI;
use std::time::Duration;

use domain::DistributionKind;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Per-message pseudo-random sampler
#[derive(Debug)]
pub struct Sampler {
    rng: ChaCha8Rng,
}

impl Sampler {
    /// Sampler seeded from OS entropy
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Deterministically seeded sampler
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Does a gate with probability `p` fire under the given distribution?
    ///
    /// `p <= 0` never fires and `p >= 1` always fires, for every kind.
    pub fn bernoulli(&mut self, kind: DistributionKind, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        match kind {
            DistributionKind::Uniform => self.rng.r#gen::<f64>() < p,
            DistributionKind::Exponential => {
                // An event with rate lambda = -ln(1-p) falls inside a unit
                // interval with probability exactly p
                let lambda = -(1.0 - p).ln();
                let u: f64 = self.rng.r#gen();
                let arrival = -u.ln() / lambda;
                arrival < 1.0
            },
            DistributionKind::Normal => {
                let z = self.standard_normal();
                standard_normal_cdf(z) < p
            },
        }
    }

    /// Draw a duration with the given mean under the given distribution
    ///
    /// A zero mean always yields zero. Uniform is a point mass at the
    /// mean; normal draws are clipped at zero.
    pub fn sample_duration(&mut self, kind: DistributionKind, mean: Duration) -> Duration {
        if mean.is_zero() {
            return Duration::ZERO;
        }
        let mean_secs = mean.as_secs_f64();
        match kind {
            DistributionKind::Uniform => mean,
            DistributionKind::Exponential => {
                let u: f64 = self.rng.r#gen();
                Duration::from_secs_f64(-(1.0 - u).ln() * mean_secs)
            },
            DistributionKind::Normal => {
                let sample = mean_secs + (mean_secs / 4.0) * self.standard_normal();
                Duration::from_secs_f64(sample.max(0.0))
            },
        }
    }

    /// Box-Muller draw from N(0, 1)
    fn standard_normal(&mut self) -> f64 {
        let u1 = self.rng.r#gen::<f64>().max(f64::MIN_POSITIVE);
        let u2: f64 = self.rng.r#gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}

/// Standard normal CDF via the Abramowitz-Stegun erf approximation
fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Abramowitz-Stegun 7.1.26, max absolute error 1.5e-7
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

/// Process-wide root of the per-message sampler chain
///
/// Writers on the control plane and the many data-plane tasks only touch
/// the root long enough to draw a child seed.
#[derive(Debug)]
pub struct SamplerSource {
    root: Mutex<ChaCha8Rng>,
}

impl SamplerSource {
    /// Root seeded from OS entropy
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            root: Mutex::new(ChaCha8Rng::from_entropy()),
        }
    }

    /// Deterministically seeded root, for reproducible tests
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            root: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Derive a fresh per-message sampler
    #[must_use]
    pub fn sampler(&self) -> Sampler {
        let seed = self.root.lock().r#gen::<u64>();
        Sampler::seeded(seed)
    }
}

impl Default for SamplerSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIALS: u32 = 10_000;
    const PROBABILITIES: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];
    const KINDS: [DistributionKind; 3] = [
        DistributionKind::Uniform,
        DistributionKind::Exponential,
        DistributionKind::Normal,
    ];

    /// Empirical rate must sit within three binomial standard deviations
    fn assert_converges(kind: DistributionKind, p: f64) {
        let mut sampler = Sampler::seeded(0x5eed ^ p.to_bits());
        let hits = (0..TRIALS)
            .filter(|_| sampler.bernoulli(kind, p))
            .count() as f64;
        let rate = hits / f64::from(TRIALS);
        let sigma = (p * (1.0 - p) / f64::from(TRIALS)).sqrt();
        assert!(
            (rate - p).abs() <= 3.0 * sigma + 1e-9,
            "{kind} p={p}: empirical rate {rate} outside 3 sigma"
        );
    }

    #[test]
    fn bernoulli_converges_for_every_kind_and_probability() {
        for kind in KINDS {
            for p in PROBABILITIES {
                assert_converges(kind, p);
            }
        }
    }

    #[test]
    fn zero_probability_never_fires() {
        let mut sampler = Sampler::seeded(1);
        for kind in KINDS {
            assert!((0..1000).all(|_| !sampler.bernoulli(kind, 0.0)));
        }
    }

    #[test]
    fn unit_probability_always_fires() {
        let mut sampler = Sampler::seeded(2);
        for kind in KINDS {
            assert!((0..1000).all(|_| sampler.bernoulli(kind, 1.0)));
        }
    }

    #[test]
    fn probability_above_one_always_fires() {
        let mut sampler = Sampler::seeded(3);
        assert!(sampler.bernoulli(DistributionKind::Exponential, 1.5));
    }

    #[test]
    fn negative_probability_never_fires() {
        let mut sampler = Sampler::seeded(4);
        assert!(!sampler.bernoulli(DistributionKind::Uniform, -0.5));
    }

    #[test]
    fn zero_mean_duration_is_zero() {
        let mut sampler = Sampler::seeded(5);
        for kind in KINDS {
            assert_eq!(sampler.sample_duration(kind, Duration::ZERO), Duration::ZERO);
        }
    }

    #[test]
    fn uniform_duration_is_a_point_mass() {
        let mut sampler = Sampler::seeded(6);
        let mean = Duration::from_millis(100);
        for _ in 0..100 {
            assert_eq!(
                sampler.sample_duration(DistributionKind::Uniform, mean),
                mean
            );
        }
    }

    #[test]
    fn exponential_duration_mean_converges() {
        let mut sampler = Sampler::seeded(7);
        let mean = Duration::from_millis(100);
        let total: f64 = (0..TRIALS)
            .map(|_| {
                sampler
                    .sample_duration(DistributionKind::Exponential, mean)
                    .as_secs_f64()
            })
            .sum();
        let empirical = total / f64::from(TRIALS);
        // Standard error of an Exp(1/m) mean over n trials is m/sqrt(n)
        let tolerance = 4.0 * mean.as_secs_f64() / f64::from(TRIALS).sqrt();
        assert!((empirical - mean.as_secs_f64()).abs() <= tolerance);
    }

    #[test]
    fn normal_duration_never_goes_negative() {
        let mut sampler = Sampler::seeded(8);
        let mean = Duration::from_millis(10);
        for _ in 0..TRIALS {
            // Duration is unsigned; the draw itself must not panic on a
            // clipped negative sample
            let _ = sampler.sample_duration(DistributionKind::Normal, mean);
        }
    }

    #[test]
    fn normal_duration_mean_converges() {
        let mut sampler = Sampler::seeded(9);
        let mean = Duration::from_millis(100);
        let total: f64 = (0..TRIALS)
            .map(|_| {
                sampler
                    .sample_duration(DistributionKind::Normal, mean)
                    .as_secs_f64()
            })
            .sum();
        let empirical = total / f64::from(TRIALS);
        let sigma = mean.as_secs_f64() / 4.0;
        let tolerance = 4.0 * sigma / f64::from(TRIALS).sqrt();
        assert!((empirical - mean.as_secs_f64()).abs() <= tolerance);
    }

    #[test]
    fn seeded_samplers_are_reproducible() {
        let mut a = Sampler::seeded(42);
        let mut b = Sampler::seeded(42);
        for _ in 0..100 {
            assert_eq!(
                a.bernoulli(DistributionKind::Uniform, 0.5),
                b.bernoulli(DistributionKind::Uniform, 0.5)
            );
        }
    }

    #[test]
    fn seeded_source_derives_reproducible_samplers() {
        let a = SamplerSource::seeded(42);
        let b = SamplerSource::seeded(42);
        let mut sa = a.sampler();
        let mut sb = b.sampler();
        for _ in 0..100 {
            assert_eq!(
                sa.bernoulli(DistributionKind::Normal, 0.3),
                sb.bernoulli(DistributionKind::Normal, 0.3)
            );
        }
    }

    #[test]
    fn source_derives_distinct_samplers() {
        let source = SamplerSource::seeded(42);
        let mut first = source.sampler();
        let mut second = source.sampler();
        let a: Vec<bool> = (0..64)
            .map(|_| first.bernoulli(DistributionKind::Uniform, 0.5))
            .collect();
        let b: Vec<bool> = (0..64)
            .map(|_| second.bernoulli(DistributionKind::Uniform, 0.5))
            .collect();
        assert_ne!(a, b);
    }

    #[test]
    fn erf_approximation_is_accurate() {
        // Reference values to the published accuracy of the approximation
        assert!((erf(0.0)).abs() < 1e-7);
        assert!((erf(1.0) - 0.842_700_79).abs() < 1e-6);
        assert!((erf(-1.0) + 0.842_700_79).abs() < 1e-6);
        assert!((erf(2.0) - 0.995_322_27).abs() < 1e-6);
    }

    #[test]
    fn normal_cdf_is_monotonic_and_symmetric() {
        assert!((standard_normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!(standard_normal_cdf(-2.0) < standard_normal_cdf(0.0));
        assert!(standard_normal_cdf(0.0) < standard_normal_cdf(2.0));
        let left = standard_normal_cdf(-1.5);
        let right = standard_normal_cdf(1.5);
        assert!((left + right - 1.0).abs() < 1e-6);
    }
}
