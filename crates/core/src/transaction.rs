use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::money::Money;

/// OFX `TRNTYPE` values emitted for statement lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrnType {
    Credit,
    Debit,
}

impl TrnType {
    /// Statement entries (`entrada`) are credits, withdrawals (`saída`) are debits.
    pub fn for_amount(amount: Money) -> Self {
        if amount.is_negative() {
            TrnType::Debit
        } else {
            TrnType::Credit
        }
    }
}

impl fmt::Display for TrnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrnType::Credit => write!(f, "CREDIT"),
            TrnType::Debit => write!(f, "DEBIT"),
        }
    }
}

impl FromStr for TrnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CREDIT" | "DEP" | "INT" | "DIV" => Ok(TrnType::Credit),
            "DEBIT" | "PAYMENT" | "CHECK" | "FEE" | "SRVCHG" | "POS" | "ATM" | "XFER" => {
                Ok(TrnType::Debit)
            }
            other => Err(format!("Unknown transaction type: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount: Money,
    pub description: String,
    pub trntype: TrnType,
    /// Present when the transaction was read back from an OFX file.
    pub fit_id: Option<String>,
}

impl Transaction {
    pub fn new(date: NaiveDate, amount: Money, description: impl Into<String>) -> Self {
        Transaction {
            date,
            amount,
            description: description.into(),
            trntype: TrnType::for_amount(amount),
            fit_id: None,
        }
    }
}
