//! Value Objects for the Tally Domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Order number failed format or checksum validation
    #[error("Invalid order number: {0}")]
    InvalidOrderNumber(String),

    /// Points amount must not be negative
    #[error("Invalid points amount: {0}")]
    NegativePoints(String),
}

// =============================================================================
// OrderNumber
// =============================================================================

/// OrderNumber is a purchase identifier submitted for point accrual.
///
/// # Invariants
/// - Non-empty ASCII digit string
/// - Passes the Luhn checksum
///
/// The same validation gates withdrawal references, so a malformed number
/// is rejected before any store access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Parse and validate an order number.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidOrderNumber` if the input is empty,
    /// contains non-digit characters, or fails the Luhn check.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidOrderNumber("empty".to_string()));
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::InvalidOrderNumber(format!(
                "non-digit characters in {:?}",
                trimmed
            )));
        }
        if !luhn_valid(trimmed) {
            return Err(DomainError::InvalidOrderNumber(format!(
                "checksum failed for {:?}",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reconstruct from a trusted source (a store row written through
    /// `parse`). Skips revalidation.
    pub fn from_trusted(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Luhn checksum over an ASCII digit string.
///
/// Doubles every second digit from the right, subtracting 9 on overflow;
/// the total must be divisible by 10.
fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0u32;
    for (i, b) in digits.bytes().rev().enumerate() {
        let mut d = (b - b'0') as u32;
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum % 10 == 0
}

// =============================================================================
// Points
// =============================================================================

/// Points represents a non-negative amount of loyalty points.
///
/// # Invariants
/// - Must be >= 0
///
/// Accruals of non-processed orders are zero; withdrawal sums are
/// additionally required to be strictly positive at admission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Points(Decimal);

impl Points {
    /// Create a new Points amount with validation.
    ///
    /// # Errors
    /// Returns `DomainError::NegativePoints` if value < 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value < Decimal::ZERO {
            return Err(DomainError::NegativePoints(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Zero points
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Whether the amount is exactly zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Tests
// =============================================================================
