use std::path::PathBuf;
use std::sync::OnceLock;

use extrato_core::{parse_brl_amount, parse_statement_date, Bank, ParseError, Transaction};
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Not a usable statement file {path}: {reason}")]
    InvalidFile { path: PathBuf, reason: String },
    #[error("Bank not recognized from file name: {0}")]
    UnknownBank(String),
    #[error("Failed to extract text from {path}: {message}")]
    Pdf { path: PathBuf, message: String },
    #[error("Unreadable statement line '{line}': {source}")]
    Parse {
        line: String,
        #[source]
        source: ParseError,
    },
    #[error("No transactions found in {0}")]
    NoTransactions(PathBuf),
}

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_itau_row, r"(\d{2}/\d{2}/\d{4})\s+(.+?)\s+(-?[\d.,]+)$");

re!(re_mp_row, r"(\d{2}-\d{2}-\d{4})\s+(.+?)\s+(\d+)\s+R\$\s*(-?[\d.,]+)");
re!(re_mp_dated_start, r"^\d{2}-\d{2}-\d{4}");
re!(re_mp_dated_value, r"\d{2}-\d{2}-\d{4}.*R\$\s*-?[\d.,]+");
re!(re_mp_value, r"R\$\s*-?[\d.,]+");

const ITAU_SKIP: &str = "saldo do dia";

const MP_HEADERS: &[&str] = &[
    "Data Descrição",
    "1/",
    "EXTRATO DE CONTA",
    "CPF/CNPJ:",
    "Periodo:",
    "Entradas:",
    "Saldo inicial:",
    "Saidas:",
    "DETALHE DOS MOVIMENTOS",
];

/// Parses the extracted text of a statement issued by `bank`.
///
/// Lines that look like transactions but carry an unreadable date or amount
/// are logged and skipped.
pub fn parse_statement_text(bank: Bank, text: &str) -> Vec<Transaction> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let candidates: Vec<String> = match bank {
        Bank::Itau => lines.iter().map(|l| l.to_string()).collect(),
        Bank::MercadoPago => join_mercadopago_lines(&lines),
    };

    let mut transactions = Vec::new();
    for line in &candidates {
        let parsed = match bank {
            Bank::Itau => parse_itau_line(line),
            Bank::MercadoPago => parse_mercadopago_line(line),
        };
        match parsed {
            Ok(Some(trx)) => transactions.push(trx),
            Ok(None) => {}
            Err(e) => tracing::warn!(bank = %bank, "{e}"),
        }
    }
    transactions
}

/// `dd/mm/yyyy description value`, one transaction per line.
pub fn parse_itau_line(line: &str) -> Result<Option<Transaction>, StatementError> {
    let Some(caps) = re_itau_row().captures(line) else {
        return Ok(None);
    };
    let description = caps[2].trim();
    if description.to_lowercase().contains(ITAU_SKIP) {
        return Ok(None);
    }
    build(line, &caps[1], description, &caps[3]).map(Some)
}

/// `dd-mm-yyyy description operation-id R$ value`, after line joining.
///
/// Text in front of the date (a wrapped description) is kept as a prefix of
/// the description.
pub fn parse_mercadopago_line(line: &str) -> Result<Option<Transaction>, StatementError> {
    let Some(caps) = re_mp_row().captures(line) else {
        return Ok(None);
    };
    let start = caps.get(0).map_or(0, |m| m.start());
    let prefix = line[..start].trim();
    let body = caps[2].trim();
    let description = if prefix.is_empty() {
        body.to_string()
    } else {
        format!("{prefix} {body}")
    };
    build(line, &caps[1], &description, &caps[4]).map(Some)
}

fn build(
    line: &str,
    date: &str,
    description: &str,
    amount: &str,
) -> Result<Transaction, StatementError> {
    let parse_err = |source| StatementError::Parse {
        line: line.to_string(),
        source,
    };
    let date = parse_statement_date(date).map_err(parse_err)?;
    let amount = parse_brl_amount(amount).map_err(parse_err)?;
    Ok(Transaction::new(date, amount, description))
}

fn is_mercadopago_header(line: &str) -> bool {
    MP_HEADERS.iter().any(|h| line.starts_with(h))
}

/// Rebuilds one string per transaction from the wrapped PDF layout.
///
/// A dated line opens an entry, a value-only line completes the previous one,
/// and an undated description line directly above a dated line is glued to it.
fn join_mercadopago_lines(lines: &[&str]) -> Vec<String> {
    let mut joined: Vec<String> = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        i += 1;
        if is_mercadopago_header(line) {
            continue;
        }
        let dated = re_mp_dated_start().is_match(line) || re_mp_dated_value().is_match(line);
        let has_value = re_mp_value().is_match(line);

        if dated {
            joined.push(line.to_string());
        } else if has_value {
            if let Some(last) = joined.last_mut() {
                last.push(' ');
                last.push_str(line);
            }
        } else if let Some(next) = lines.get(i) {
            if re_mp_dated_start().is_match(next) || re_mp_dated_value().is_match(next) {
                joined.push(format!("{line} {next}"));
                i += 1;
            }
        }
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use extrato_core::{Money, TrnType};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    const ITAU_TEXT: &str = "
EXTRATO CONTA CORRENTE
data lançamentos valor (R$)
14/06/2025 PAY UBER 14/06 -25,50
14/06/2025 SALDO DO DIA 1.000,00
15/06/2025 PIX RECEBIDO 30/07 1.000,00
31/02/2025 DATA INVALIDA -1,00
";

    #[test]
    fn itau_lines_become_transactions() {
        let trxs = parse_statement_text(Bank::Itau, ITAU_TEXT);
        assert_eq!(trxs.len(), 2);

        assert_eq!(trxs[0].date, d(2025, 6, 14));
        assert_eq!(trxs[0].description, "PAY UBER 14/06");
        assert_eq!(trxs[0].amount, Money::from_centavos(-2550));
        assert_eq!(trxs[0].trntype, TrnType::Debit);

        assert_eq!(trxs[1].description, "PIX RECEBIDO 30/07");
        assert_eq!(trxs[1].amount, Money::from_centavos(100000));
        assert_eq!(trxs[1].trntype, TrnType::Credit);
    }

    #[test]
    fn itau_daily_balance_is_skipped() {
        let line = "14/06/2025 SALDO DO DIA 1.000,00";
        assert!(parse_itau_line(line).unwrap().is_none());
    }

    #[test]
    fn itau_bad_date_is_parse_error() {
        let err = parse_itau_line("31/02/2025 DATA INVALIDA -1,00").unwrap_err();
        assert!(matches!(
            err,
            StatementError::Parse {
                source: ParseError::InvalidDate(_),
                ..
            }
        ));
    }

    #[test]
    fn itau_non_transaction_line_is_ignored() {
        assert!(parse_itau_line("EXTRATO CONTA CORRENTE").unwrap().is_none());
    }

    const MP_TEXT: &str = "
EXTRATO DE CONTA
CPF/CNPJ: 000.000.000-00
Periodo: 01-06-2025 a 30-06-2025
Saldo inicial: R$ 100,00
DETALHE DOS MOVIMENTOS
Data Descrição ID da operação Valor Saldo
01-06-2025 Rendimentos 111 R$ 0,37 R$ 100,37
Transferência Pix enviada
02-06-2025 FULANO DE TAL 222 R$ -50,00 R$ 50,37
03-06-2025 Pagamento com QR Pix 333
R$ -10,00 R$ 40,37
1/2
";

    #[test]
    fn mercadopago_joins_wrapped_lines() {
        let trxs = parse_statement_text(Bank::MercadoPago, MP_TEXT);
        assert_eq!(trxs.len(), 3);

        assert_eq!(trxs[0].date, d(2025, 6, 1));
        assert_eq!(trxs[0].description, "Rendimentos");
        assert_eq!(trxs[0].amount, Money::from_centavos(37));

        assert_eq!(trxs[1].description, "Transferência Pix enviada FULANO DE TAL");
        assert_eq!(trxs[1].amount, Money::from_centavos(-5000));
        assert_eq!(trxs[1].trntype, TrnType::Debit);

        assert_eq!(trxs[2].date, d(2025, 6, 3));
        assert_eq!(trxs[2].description, "Pagamento com QR Pix");
        assert_eq!(trxs[2].amount, Money::from_centavos(-1000));
    }

    #[test]
    fn mercadopago_headers_are_dropped() {
        let lines = ["Periodo: 01-06-2025 a 30-06-2025", "Saldo inicial: R$ 100,00"];
        assert!(join_mercadopago_lines(&lines).is_empty());
    }

    #[test]
    fn value_line_without_open_entry_is_ignored() {
        let lines = ["R$ -10,00", "01-06-2025 Rendimentos 111 R$ 0,37"];
        assert_eq!(
            join_mercadopago_lines(&lines),
            vec!["01-06-2025 Rendimentos 111 R$ 0,37".to_string()]
        );
    }
}
