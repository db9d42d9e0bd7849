use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::money::Money;

/// Lowercase hex SHA-256 of an in-memory byte slice.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let hash: [u8; 32] = hasher.finalize().into();
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Stable identifier for a transaction that has no FITID of its own.
///
/// Hashes `date_amount_description`, with the date as `YYYY-MM-DD` and the
/// amount with two decimals.
pub fn transaction_fingerprint(date: NaiveDate, amount: Money, description: &str) -> String {
    let base = format!(
        "{}_{}_{}",
        date.format("%Y-%m-%d"),
        amount.to_ofx_string(),
        description
    );
    sha256_hex(base.as_bytes())
}
