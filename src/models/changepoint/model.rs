//! Generative model for a single abrupt mean/variance shift.
//!
//! The model partitions the series at a discrete location `tau`:
//! observations before `tau` follow `Normal(mu_before, sigma_before)`,
//! the rest follow `Normal(mu_after, sigma_after)`. The partition is
//! discontinuous by construction; smooth regime blending is a different
//! model family.

use rand::Rng;
use rand::rngs::StdRng;

use crate::input::SeriesInput;

use super::likelihood::SeriesMoments;
use super::posterior::ParameterDraw;
use super::priors::{
    ChangePointPriorConfig, PriorHyperparameters, log_discrete_uniform_mass,
    log_half_normal_density, log_normal_density,
};

/// Names of the monitored continuous parameters, in draw order.
pub const CONTINUOUS_PARAMETER_NAMES: [&str; 4] =
    ["mu_before", "mu_after", "sigma_before", "sigma_after"];

/// Single mean-shift change-point model over a fixed series.
#[derive(Debug, Clone)]
pub struct MeanShiftModel {
    moments: SeriesMoments,
    hyper: PriorHyperparameters,
    n_obs: usize,
}

impl MeanShiftModel {
    /// Build the model from a validated series and prior configuration.
    #[must_use]
    pub fn new(series: &SeriesInput, prior_config: ChangePointPriorConfig) -> Self {
        Self {
            moments: SeriesMoments::from_series(series),
            hyper: PriorHyperparameters::from_series(series, prior_config),
            n_obs: series.len(),
        }
    }

    /// Inclusive support of the location parameter.
    ///
    /// The change point is confined to `[1, n - 2]` so both regimes keep
    /// at least one observation.
    #[must_use]
    pub const fn tau_support(&self) -> (usize, usize) {
        (1, self.n_obs - 2)
    }

    /// Resolved prior hyperparameters.
    #[must_use]
    pub const fn hyperparameters(&self) -> PriorHyperparameters {
        self.hyper
    }

    /// Log-prior density of a candidate draw.
    ///
    /// Out-of-support locations and non-positive scales score
    /// `NEG_INFINITY` so the sampler treats them as zero-probability
    /// regions rather than errors.
    #[must_use]
    pub fn log_prior(&self, draw: &ParameterDraw) -> f64 {
        let (tau_low, tau_high) = self.tau_support();
        if draw.tau < tau_low || draw.tau > tau_high {
            return f64::NEG_INFINITY;
        }
        if draw.sigma_before <= 0.0 || draw.sigma_after <= 0.0 {
            return f64::NEG_INFINITY;
        }

        log_discrete_uniform_mass(draw.tau, tau_low, tau_high)
            + log_normal_density(draw.mu_before, self.hyper.mu_center, self.hyper.mu_scale)
            + log_normal_density(draw.mu_after, self.hyper.mu_center, self.hyper.mu_scale)
            + log_half_normal_density(draw.sigma_before, self.hyper.sigma_scale)
            + log_half_normal_density(draw.sigma_after, self.hyper.sigma_scale)
    }

    /// Log-posterior density (up to an additive constant) of a candidate
    /// draw.
    #[must_use]
    pub fn log_posterior(&self, draw: &ParameterDraw) -> f64 {
        let log_prior = self.log_prior(draw);
        if !log_prior.is_finite() {
            return f64::NEG_INFINITY;
        }

        log_prior
            + self.moments.regime_log_likelihood(
                draw.tau,
                draw.mu_before,
                draw.sigma_before,
                draw.mu_after,
                draw.sigma_after,
            )
    }

    /// Draw an initial parameter vector from the priors.
    pub fn prior_sample(&self, rng: &mut StdRng) -> ParameterDraw {
        let (tau_low, tau_high) = self.tau_support();
        ParameterDraw {
            tau: rng.random_range(tau_low..=tau_high),
            mu_before: standard_normal(rng).mul_add(self.hyper.mu_scale, self.hyper.mu_center),
            mu_after: standard_normal(rng).mul_add(self.hyper.mu_scale, self.hyper.mu_center),
            sigma_before: half_normal_sample(rng, self.hyper.sigma_scale),
            sigma_after: half_normal_sample(rng, self.hyper.sigma_scale),
        }
    }
}

/// Tagged model variants sharing the sampler-facing capability set.
///
/// New variants (multi-change-point, volatility regimes) extend this enum
/// without touching the sampler.
#[derive(Debug, Clone)]
pub enum ChangePointModel {
    /// Single abrupt shift in mean and scale.
    MeanShift(MeanShiftModel),
    /// Likelihood suppressed: the posterior reduces to the prior. Lets
    /// the sampler be validated against a known target distribution.
    PriorOnly(MeanShiftModel),
}

impl ChangePointModel {
    /// Log-posterior density of a candidate draw.
    #[must_use]
    pub fn log_posterior(&self, draw: &ParameterDraw) -> f64 {
        match self {
            Self::MeanShift(model) => model.log_posterior(draw),
            Self::PriorOnly(model) => model.log_prior(draw),
        }
    }

    /// Draw an initial parameter vector from the priors.
    pub fn prior_sample(&self, rng: &mut StdRng) -> ParameterDraw {
        match self {
            Self::MeanShift(model) | Self::PriorOnly(model) => model.prior_sample(rng),
        }
    }

    /// Names of the monitored continuous parameters.
    #[must_use]
    pub const fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            Self::MeanShift(_) | Self::PriorOnly(_) => &CONTINUOUS_PARAMETER_NAMES,
        }
    }

    /// Inclusive support of the location parameter.
    #[must_use]
    pub const fn tau_support(&self) -> (usize, usize) {
        match self {
            Self::MeanShift(model) | Self::PriorOnly(model) => model.tau_support(),
        }
    }
}

/// Standard-normal variate via Box-Muller.
pub(crate) fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1 = (1.0_f64 - rng.random::<f64>()).max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn half_normal_sample(rng: &mut StdRng, scale: f64) -> f64 {
    (standard_normal(rng) * scale).abs().max(f64::MIN_POSITIVE.sqrt())
}
