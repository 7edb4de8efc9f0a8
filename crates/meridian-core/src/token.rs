//! # Generated Business Tokens
//!
//! Human-facing identifiers generated when a submitted record omits them:
//! account numbers, PINs, QR codes, SKUs, sale numbers, branch codes.
//!
//! ## Token Format
//! ```text
//! PREFIX-<millis>-<alnum suffix>
//!
//! ACC-1754556000123-k3Zq    account number
//! SKU-1754556000123-9fQx    stock keeping unit
//! SALE-1754556000123-Tz41   sale sequence number
//! ```
//!
//! The millisecond timestamp keeps tokens sortable by creation time; the
//! random suffix disambiguates tokens generated within the same millisecond
//! on devices syncing concurrently. Tokens are advisory business ids - the
//! merge key is always the record's `id`.

use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

/// Length of the random suffix appended to generated tokens.
const TOKEN_SUFFIX_LEN: usize = 4;

/// Number of digits in a generated employee PIN.
const PIN_LEN: usize = 4;

// =============================================================================
// Record Ids
// =============================================================================

/// Generates a new record id (UUID v4 string).
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Business Tokens
// =============================================================================

/// Generates a prefixed token from the current time and a random suffix.
pub fn generate_token(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{prefix}-{millis}-{suffix}")
}

/// Generates a customer account number: `ACC-<digits>-<alnum>`.
pub fn generate_account_number() -> String {
    generate_token("ACC")
}

/// Generates a product SKU.
pub fn generate_sku() -> String {
    generate_token("SKU")
}

/// Generates a sale sequence number.
pub fn generate_sale_number() -> String {
    generate_token("SALE")
}

/// Generates a branch short code.
pub fn generate_branch_code() -> String {
    generate_token("BR")
}

/// Generates an employee QR identifier.
pub fn generate_qr_code() -> String {
    generate_token("QR")
}

/// Generates a numeric employee PIN.
pub fn generate_pin() -> String {
    let mut rng = rand::rng();
    (0..PIN_LEN)
        .map(|_| char::from_digit(rng.random_range(0..10), 10).unwrap_or('0'))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_token_shape(token: &str, prefix: &str) {
        let parts: Vec<&str> = token.split('-').collect();
        assert_eq!(parts.len(), 3, "token {token} should have three segments");
        assert_eq!(parts[0], prefix);
        assert!(
            parts[1].chars().all(|c| c.is_ascii_digit()),
            "middle segment of {token} should be digits"
        );
        assert_eq!(parts[2].len(), TOKEN_SUFFIX_LEN);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn account_number_matches_pattern() {
        assert_token_shape(&generate_account_number(), "ACC");
    }

    #[test]
    fn token_prefixes() {
        assert_token_shape(&generate_sku(), "SKU");
        assert_token_shape(&generate_sale_number(), "SALE");
        assert_token_shape(&generate_branch_code(), "BR");
        assert_token_shape(&generate_qr_code(), "QR");
    }

    #[test]
    fn pins_are_numeric() {
        let pin = generate_pin();
        assert_eq!(pin.len(), PIN_LEN);
        assert!(pin.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn tokens_are_unique_within_a_burst() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            assert!(seen.insert(generate_account_number()));
        }
    }

    #[test]
    fn record_ids_parse_as_uuids() {
        assert!(Uuid::parse_str(&new_id()).is_ok());
    }
}
