use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use crate::money::Money;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Unrecognized date format: {0}")]
    InvalidDate(String),
}

/// Parses a Brazilian-formatted amount such as `1.234,56` or `-45,90`.
///
/// Dots are thousands separators and the comma is the decimal mark.
pub fn parse_brl_amount(s: &str) -> Result<Money, ParseError> {
    let cleaned = s.trim().replace('.', "").replace(',', ".");
    if cleaned.is_empty() {
        return Err(ParseError::InvalidAmount(s.to_string()));
    }
    Decimal::from_str(&cleaned)
        .map(Money::from_decimal)
        .map_err(|_| ParseError::InvalidAmount(s.to_string()))
}

/// Accepts `dd/mm/yyyy` (Itaú) and `dd-mm-yyyy` (Mercado Pago).
pub fn parse_statement_date(s: &str) -> Result<NaiveDate, ParseError> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d-%m-%Y"))
        .map_err(|_| ParseError::InvalidDate(s.to_string()))
}
