//! # Validation Module
//!
//! Input validation utilities for Meridian.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation layer (external)                                │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Service call (meridian-engine)                               │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── CHECK constraints                                                 │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: Multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use meridian_core::validation::{validate_quantity, validate_unit_price};
//!
//! // Validate before any write happens
//! validate_quantity(3).unwrap();
//! validate_unit_price(1990).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_INSTALLMENTS, MAX_ITEM_QUANTITY, MAX_OBSERVATION_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (9999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Order: Add Item                                                        │
/// │                                                                         │
/// │  Salesperson enters quantity: 3                                        │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(3) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0?   → Error: "quantity must be positive"             │
/// │       │                                                                 │
/// │       ├── qty > 9999? → Error: "quantity must be between 1 and 9999"   │
/// │       │                                                                 │
/// │       └── OK → Proceed with add_item                                   │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (bonus/sample items)
pub fn validate_unit_price(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "unit_price".to_string(),
        });
    }

    Ok(())
}

/// Validates an installment count for schedule generation.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_INSTALLMENTS (24)
pub fn validate_installment_count(count: u32) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::MustBePositive {
            field: "installment_count".to_string(),
        });
    }

    if count > MAX_INSTALLMENTS {
        return Err(ValidationError::OutOfRange {
            field: "installment_count".to_string(),
            min: 1,
            max: MAX_INSTALLMENTS as i64,
        });
    }

    Ok(())
}

/// Validates a payment amount in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (clearing a mistaken registration)
/// - The upper bound (installment amount) is checked by the status engine,
///   which has the installment in hand
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "paid_amount".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates an observation / notes field.
///
/// ## Rules
/// - May be empty (observations are optional)
/// - Maximum 500 characters
///
/// ## Returns
/// The trimmed text.
pub fn validate_observation(text: &str) -> ValidationResult<String> {
    let text = text.trim();

    // Counted in characters, not bytes: multi-byte text must not be
    // penalized for its encoding
    if text.chars().count() > MAX_OBSERVATION_LEN {
        return Err(ValidationError::TooLong {
            field: "observation".to_string(),
            max: MAX_OBSERVATION_LEN,
        });
    }

    Ok(text.to_string())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Rules
/// - Must be a valid UUID format
/// - 36 characters with hyphens: xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx
///
/// ## Example
/// ```rust
/// use meridian_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000", "client_id").is_ok());
/// assert!(validate_uuid("not-a-uuid", "client_id").is_err());
/// ```
pub fn validate_uuid(id: &str, field: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    // Try to parse as UUID
    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
