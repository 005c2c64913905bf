//! Core type definitions with validation.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types and operation inputs.
///
/// These are raised before any work starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A range ended before it started.
    #[error("end {end} is earlier than start {start}")]
    InvalidRange { start: String, end: String },

    /// An hours value was negative, NaN or infinite.
    #[error("{field} must be a finite, non-negative number of hours, got {value}")]
    InvalidHours { field: &'static str, value: f64 },

    /// A threshold outside \[0.0, 1.0\].
    #[error("{field} must be between 0.0 and 1.0, got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated artifact identifier.
    ///
    /// Connectors prefix their native ids (e.g. `gmail_1843`) so ids stay
    /// unique across evidence sources.
    ArtifactId, "artifact ID"
);

define_string_id!(
    /// A validated matter identifier.
    MatterId, "matter ID"
);

define_string_id!(
    /// A validated user identifier, used to look up per-user baselines.
    UserId, "user ID"
);

/// Qualitative trust in a derived timeline event or entry.
///
/// Totally ordered: `Low < Medium < High`. Comparisons and the weakest-link
/// rule go through `Ord`, never through string matching.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl Confidence {
    /// Numeric rank on the 0/1/2 scale.
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// String representation used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strength of the evidence behind an artifact or entry.
///
/// Ordered `Pattern < Circumstantial < Direct`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    /// No artifact; derived from gap arithmetic or historical patterns.
    Pattern,
    /// Suggests activity without proof of completion (draft, received, scheduled).
    #[default]
    Circumstantial,
    /// Shows completion or finality (sent, filed).
    Direct,
}

impl EvidenceKind {
    /// The highest confidence this kind of evidence can support.
    #[must_use]
    pub const fn ceiling(self) -> Confidence {
        match self {
            Self::Pattern => Confidence::Low,
            Self::Circumstantial => Confidence::Medium,
            Self::Direct => Confidence::High,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::Circumstantial => "circumstantial",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = ValidationError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    /// Creates a range, rejecting `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days covered, counting both ends.
    #[must_use]
    pub fn num_days(&self) -> u32 {
        let days = (self.end - self.start).num_days() + 1;
        u32::try_from(days).unwrap_or(u32::MAX)
    }

    /// Iterates every day in the range, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |day| *day <= self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Validates that an hours value is finite and non-negative.
pub fn validate_hours(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidHours { field, value });
    }
    Ok(value)
}

/// Added to scaled hours before rounding so binary-inexact halves such as
/// `1.005` round up. Far below one hundredth of a minute.
const ROUNDING_NUDGE: f64 = 1e-9;

/// Rounds half-up to two decimal places.
///
/// Inputs are non-negative hour totals, so `f64::round` (half away from zero)
/// is half-up here.
#[must_use]
pub fn round_hours(hours: f64) -> f64 {
    let scaled = hours * 100.0;
    (scaled + ROUNDING_NUDGE.copysign(scaled)).round() / 100.0
}
