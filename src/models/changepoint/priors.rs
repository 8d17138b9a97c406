//! Prior specifications and log-density helpers for the change-point
//! model.
//!
//! The location parameter carries a discrete uniform prior over the
//! interior of the series; regime means carry wide Normal priors centered
//! on the global series mean; regime standard deviations carry half-normal
//! priors scaled to the global series standard deviation.

use crate::input::SeriesInput;

/// Hyperparameter multipliers for the change-point prior set.
///
/// The concrete prior scales are resolved against the observed series via
/// [`PriorHyperparameters::from_series`]; the multipliers here keep the
/// priors weakly informative for series of any magnitude.
#[derive(Debug, Clone, Copy)]
pub struct ChangePointPriorConfig {
    /// Normal prior scale on regime means, in multiples of the series
    /// standard deviation.
    pub mu_scale_multiplier: f64,
    /// Half-normal prior scale on regime standard deviations, in
    /// multiples of the series standard deviation.
    pub sigma_scale_multiplier: f64,
}

impl Default for ChangePointPriorConfig {
    fn default() -> Self {
        Self {
            mu_scale_multiplier: 2.0,
            sigma_scale_multiplier: 1.0,
        }
    }
}

impl ChangePointPriorConfig {
    /// Whether all prior hyperparameters are numerically valid.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.mu_scale_multiplier > 0.0 && self.sigma_scale_multiplier > 0.0
    }
}

/// Prior scales resolved against a concrete series.
#[derive(Debug, Clone, Copy)]
pub struct PriorHyperparameters {
    /// Center of the Normal priors on regime means.
    pub mu_center: f64,
    /// Scale of the Normal priors on regime means.
    pub mu_scale: f64,
    /// Scale of the half-normal priors on regime standard deviations.
    pub sigma_scale: f64,
}

impl PriorHyperparameters {
    /// Resolve prior scales from the series' global moments.
    ///
    /// A floor keeps the scales positive for degenerate (constant)
    /// series, where the posterior is still well-defined.
    #[must_use]
    pub fn from_series(series: &SeriesInput, config: ChangePointPriorConfig) -> Self {
        let spread = series.std_dev().max(f64::MIN_POSITIVE.sqrt());
        Self {
            mu_center: series.mean(),
            mu_scale: config.mu_scale_multiplier * spread,
            sigma_scale: config.sigma_scale_multiplier * spread,
        }
    }
}

/// Log-density for `Normal(mean, scale)`.
#[must_use]
pub fn log_normal_density(value: f64, mean: f64, scale: f64) -> f64 {
    if scale <= 0.0 {
        return f64::NEG_INFINITY;
    }
    let z = (value - mean) / scale;
    -0.5f64.mul_add(z * z, 0.5f64.mul_add(std::f64::consts::TAU.ln(), scale.ln()))
}

/// Log-density for a half-normal with the given scale, supported on
/// strictly positive values.
#[must_use]
pub fn log_half_normal_density(value: f64, scale: f64) -> f64 {
    if value <= 0.0 || scale <= 0.0 {
        return f64::NEG_INFINITY;
    }
    let z = value / scale;
    0.5 * (2.0 / std::f64::consts::PI).ln() - scale.ln() - 0.5 * z * z
}

/// Log-mass for a discrete uniform over the inclusive range `[low, high]`.
#[must_use]
pub fn log_discrete_uniform_mass(value: usize, low: usize, high: usize) -> f64 {
    if low > high {
        return f64::NAN;
    }
    if (low..=high).contains(&value) {
        -crate::input::usize_to_f64(high - low + 1).ln()
    } else {
        f64::NEG_INFINITY
    }
}
