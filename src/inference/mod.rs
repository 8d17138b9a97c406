//! Reusable inference and MCMC utility types.

use thiserror::Error;

/// Errors for generic MCMC scheduling.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InferenceError {
    #[error("iterations must be positive")]
    InvalidIterations,
    #[error("burn-in ({burn_in}) must be smaller than iterations ({iterations})")]
    InvalidBurnIn { burn_in: usize, iterations: usize },
    #[error("thinning interval must be positive")]
    InvalidThinning,
}

/// Generic MCMC schedule: total iterations, discarded burn-in prefix, and
/// thinning interval applied to the retained suffix.
#[derive(Debug, Clone, Copy)]
pub struct McmcSchedule {
    pub iterations: usize,
    pub burn_in: usize,
    pub thin: usize,
}

impl Default for McmcSchedule {
    fn default() -> Self {
        Self {
            iterations: 4_000,
            burn_in: 1_000,
            thin: 1,
        }
    }
}

impl McmcSchedule {
    /// # Errors
    ///
    /// Returns `InferenceError` if schedule values are internally
    /// inconsistent.
    pub const fn validate(self) -> Result<(), InferenceError> {
        if self.iterations == 0 {
            return Err(InferenceError::InvalidIterations);
        }
        if self.burn_in >= self.iterations {
            return Err(InferenceError::InvalidBurnIn {
                burn_in: self.burn_in,
                iterations: self.iterations,
            });
        }
        if self.thin == 0 {
            return Err(InferenceError::InvalidThinning);
        }
        Ok(())
    }

    /// Number of retained draws implied by this schedule.
    #[must_use]
    pub const fn retained_draws(self) -> usize {
        (self.iterations - self.burn_in).div_ceil(self.thin)
    }

    /// Whether iteration `iter` (zero-based) is retained.
    #[must_use]
    pub const fn retains(self, iter: usize) -> bool {
        iter >= self.burn_in && (iter - self.burn_in) % self.thin == 0
    }
}

/// Seed for chain `index` given a base seed and a per-chain stride.
///
/// Wrapping arithmetic keeps the derivation total; callers validate that
/// the stride is positive so adjacent chains never share a generator.
#[must_use]
pub const fn chain_seed(base_seed: u64, index: usize, stride: u64) -> u64 {
    base_seed.wrapping_add((index as u64).wrapping_mul(stride))
}

/// Proposal counters for a single Metropolis-Hastings block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProposalStats {
    pub proposed: usize,
    pub accepted: usize,
}

impl ProposalStats {
    /// Record one proposal and whether it was accepted.
    pub const fn record(&mut self, accepted: bool) {
        self.proposed += 1;
        if accepted {
            self.accepted += 1;
        }
    }

    /// Empirical acceptance rate, zero when nothing was proposed.
    #[must_use]
    pub fn rate(self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            crate::input::usize_to_f64(self.accepted) / crate::input::usize_to_f64(self.proposed)
        }
    }
}
