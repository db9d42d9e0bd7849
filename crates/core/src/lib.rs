pub mod account;
pub mod fingerprint;
pub mod money;
pub mod parse;
pub mod transaction;

pub use account::{Bank, BankAccount};
pub use fingerprint::{sha256_hex, transaction_fingerprint};
pub use money::Money;
pub use parse::{parse_brl_amount, parse_statement_date, ParseError};
pub use transaction::{Transaction, TrnType};
