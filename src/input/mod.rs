//! # Series inputs
//!
//! Defines the immutable container for an analysis-ready time series:
//! chronologically ordered observations with a parallel calendar-date
//! index. Cleaning, gap-filling, and date-format normalization are owned
//! by upstream collaborators; this module only enforces the contract.
//!
//! # Examples
//!
//! ```
//! use changepoint_models::SeriesInput;
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
//! let dates = (0..6)
//!     .map(|offset| start + chrono::Days::new(offset))
//!     .collect::<Vec<_>>();
//! let series = SeriesInput::new(vec![1.0, 1.2, 0.9, 1.1, 1.0, 1.3], dates).unwrap();
//!
//! assert_eq!(series.len(), 6);
//! ```

use chrono::NaiveDate;
use thiserror::Error;

/// Minimum series length for which the change point can be strictly
/// interior with at least one observation in each regime.
pub const MIN_SERIES_LEN: usize = 4;

/// Errors returned when validating series inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeriesInputError {
    #[error("series length ({found}) must be at least {minimum}")]
    TooShort { minimum: usize, found: usize },
    #[error("values length ({values}) must match dates length ({dates})")]
    LengthMismatch { values: usize, dates: usize },
    #[error("series contains a non-finite value at index {index}")]
    NonFiniteValue { index: usize },
    #[error("dates must be strictly increasing; violation at index {index}")]
    NonChronologicalDates { index: usize },
}

/// A validated, read-only numeric series with a parallel date index.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesInput {
    values: Vec<f64>,
    dates: Vec<NaiveDate>,
}

impl SeriesInput {
    /// Build and validate a series from parallel value and date vectors.
    ///
    /// # Errors
    ///
    /// Returns `SeriesInputError` if lengths mismatch, the series is too
    /// short, any value is non-finite, or dates are not strictly
    /// increasing.
    pub fn new(values: Vec<f64>, dates: Vec<NaiveDate>) -> Result<Self, SeriesInputError> {
        if values.len() != dates.len() {
            return Err(SeriesInputError::LengthMismatch {
                values: values.len(),
                dates: dates.len(),
            });
        }
        if values.len() < MIN_SERIES_LEN {
            return Err(SeriesInputError::TooShort {
                minimum: MIN_SERIES_LEN,
                found: values.len(),
            });
        }
        if let Some(index) = values.iter().position(|value| !value.is_finite()) {
            return Err(SeriesInputError::NonFiniteValue { index });
        }
        if let Some(index) = (1..dates.len()).find(|&idx| dates[idx] <= dates[idx - 1]) {
            return Err(SeriesInputError::NonChronologicalDates { index });
        }
        Ok(Self { values, dates })
    }

    /// Number of observations.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series holds no observations. Always false for a
    /// validated instance; provided for API completeness.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Observation values in chronological order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Calendar dates parallel to `values`.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Date associated with observation `index`, if in range.
    #[must_use]
    pub fn date_at(&self, index: usize) -> Option<NaiveDate> {
        self.dates.get(index).copied()
    }

    /// Global series mean.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / usize_to_f64(self.values.len())
    }

    /// Global population standard deviation.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        let mean = self.mean();
        let variance = self
            .values
            .iter()
            .map(|value| {
                let centered = value - mean;
                centered * centered
            })
            .sum::<f64>()
            / usize_to_f64(self.values.len());
        variance.sqrt()
    }
}

pub(crate) fn usize_to_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}
