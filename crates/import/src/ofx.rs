use chrono::NaiveDate;
use extrato_core::{parse_brl_amount, BankAccount, Money, Transaction, TrnType};
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct OfxTransaction {
    pub fit_id: Option<String>,
    pub trntype: Option<String>,
    pub date: NaiveDate,
    pub amount: Money,
    pub memo: Option<String>,
    pub name: Option<String>,
}

impl OfxTransaction {
    /// Text used for categorization: the memo, else the payee name, else the
    /// transaction type.
    pub fn description(&self) -> &str {
        [&self.memo, &self.name, &self.trntype]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("")
    }

    pub fn to_transaction(&self) -> Transaction {
        let mut trx = Transaction::new(self.date, self.amount, self.description());
        if let Some(kind) = self.trntype.as_deref().and_then(|t| TrnType::from_str(t).ok()) {
            trx.trntype = kind;
        }
        trx.fit_id = self.fit_id.clone();
        trx
    }
}

#[derive(Debug, Clone, Default)]
pub struct OfxAccount {
    pub account_id: String,
    pub bank_id: Option<String>,
    pub branch_id: Option<String>,
    pub account_type: Option<String>,
    pub org: Option<String>,
    pub fid: Option<String>,
}

impl OfxAccount {
    /// Account block for re-emitting the statement; missing fields stay empty.
    pub fn to_bank_account(&self) -> BankAccount {
        let org = self.org.clone().unwrap_or_default();
        BankAccount {
            bank_name: org.clone(),
            agency: self.branch_id.clone().unwrap_or_default(),
            account: self.account_id.clone(),
            bank_id: self.bank_id.clone().unwrap_or_default(),
            org,
            fid: self.fid.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OfxStatement {
    pub account: OfxAccount,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub transactions: Vec<OfxTransaction>,
    pub currency: Option<String>,
}

#[derive(Error, Debug)]
pub enum OfxError {
    #[error("Failed to parse OFX: {0}")]
    ParseError(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid date format: {0}")]
    InvalidDate(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Line-oriented reader accepting both SGML (`<TAG>value`) and XML
/// (`<TAG>value</TAG>`) OFX, one element per line.
pub struct OfxParser;

impl OfxParser {
    pub fn parse(data: &str) -> Result<OfxStatement, OfxError> {
        let data = data.trim();
        if !data.to_uppercase().contains("<OFX>") {
            return Err(OfxError::ParseError("no <OFX> element".to_string()));
        }

        let mut account = OfxAccount::default();
        let mut start_date = None;
        let mut end_date = None;
        let mut transactions = Vec::new();
        let mut currency = None;

        let mut current_trx: Option<BuildingTrx> = None;

        for line in data.lines() {
            let line = line.trim();
            let Some(tag) = line.strip_prefix('<') else {
                continue;
            };
            let (tag_name, value) = match tag.split_once('>') {
                Some((name, rest)) => (name.trim().to_uppercase(), element_value(name, rest)),
                None => (tag.trim().to_uppercase(), None),
            };

            match tag_name.as_str() {
                "STMTTRN" => current_trx = Some(BuildingTrx::default()),
                "/STMTTRN" => {
                    if let Some(trx) = current_trx.take() {
                        transactions.push(trx.finish()?);
                    }
                }
                _ if current_trx.is_some() => {
                    if let (Some(trx), Some(v)) = (current_trx.as_mut(), value) {
                        trx.set(&tag_name, v);
                    }
                }
                "ACCTID" => {
                    if let Some(v) = value {
                        account.account_id = v;
                    }
                }
                "BANKID" => account.bank_id = value,
                "BRANCHID" => account.branch_id = value,
                "ACCTTYPE" => account.account_type = value,
                "ORG" => account.org = value,
                "FID" => account.fid = value,
                "CURDEF" => currency = value,
                "DTSTART" => start_date = value.as_deref().and_then(parse_ofx_date),
                "DTEND" => end_date = value.as_deref().and_then(parse_ofx_date),
                _ => {}
            }
        }

        if account.account_id.is_empty() {
            return Err(OfxError::MissingField("ACCTID".to_string()));
        }

        Ok(OfxStatement {
            account,
            start_date,
            end_date,
            transactions,
            currency,
        })
    }
}

#[derive(Default)]
struct BuildingTrx {
    fit_id: Option<String>,
    trntype: Option<String>,
    date: Option<NaiveDate>,
    raw_date: Option<String>,
    amount: Option<Money>,
    memo: Option<String>,
    name: Option<String>,
}

impl BuildingTrx {
    fn set(&mut self, tag: &str, value: String) {
        match tag {
            "FITID" => self.fit_id = Some(value),
            "TRNTYPE" => self.trntype = Some(value),
            "DTPOSTED" => {
                self.date = parse_ofx_date(&value);
                self.raw_date = Some(value);
            }
            "TRNAMT" => self.amount = parse_ofx_amount(&value),
            "MEMO" => self.memo = Some(value),
            "NAME" => self.name = Some(value),
            _ => {}
        }
    }

    fn finish(self) -> Result<OfxTransaction, OfxError> {
        let date = match (self.date, self.raw_date) {
            (Some(date), _) => date,
            (None, Some(raw)) => return Err(OfxError::InvalidDate(raw)),
            (None, None) => return Err(OfxError::MissingField("DTPOSTED".to_string())),
        };
        let amount = self
            .amount
            .ok_or_else(|| OfxError::MissingField("TRNAMT".to_string()))?;
        Ok(OfxTransaction {
            fit_id: self.fit_id,
            trntype: self.trntype,
            date,
            amount,
            memo: self.memo,
            name: self.name,
        })
    }
}

/// Text after `<TAG>`, without a matching `</TAG>` and with XML entities decoded.
fn element_value(name: &str, rest: &str) -> Option<String> {
    let closing = format!("</{}>", name.trim());
    let rest = match rest.len().checked_sub(closing.len()) {
        Some(at) if rest.is_char_boundary(at) && rest[at..].eq_ignore_ascii_case(&closing) => {
            &rest[..at]
        }
        _ => rest,
    };
    let value = rest.trim();
    if value.is_empty() {
        None
    } else {
        Some(unescape_xml(value).into_owned())
    }
}

fn unescape_xml(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&amp;", "&"),
    )
}

fn parse_ofx_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.len() >= 8 && s.is_char_boundary(8) {
        let y: i32 = s[0..4].parse().ok()?;
        let m: u32 = s[4..6].parse().ok()?;
        let d: u32 = s[6..8].parse().ok()?;

        if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
            return Some(date);
        }
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    None
}

/// The last separator is the decimal mark: `1,234.56` and `1.234,56` are the same amount.
fn parse_ofx_amount(s: &str) -> Option<Money> {
    let s = s.trim();
    match (s.rfind(','), s.rfind('.')) {
        (Some(comma), dot) if dot.map_or(true, |dot| comma > dot) => parse_brl_amount(s).ok(),
        _ => Decimal::from_str(&s.replace(',', "")).ok().map(Money::from_decimal),
    }
}

/// Decodes OFX bytes as UTF-8, falling back to Latin-1.
pub fn decode(data: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(data) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(data.iter().map(|&b| b as char).collect()),
    }
}

pub fn parse(data: &[u8]) -> Result<OfxStatement, OfxError> {
    OfxParser::parse(&decode(data))
}

pub fn parse_file(path: &Path) -> Result<OfxStatement, OfxError> {
    let data = std::fs::read(path).map_err(|source| OfxError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── unit helpers ──────────────────────────────────────────────────────────

    #[test]
    fn parse_ofx_date_with_time_and_zone() {
        assert_eq!(
            parse_ofx_date("20250614000000[-3:BRT]"),
            Some(NaiveDate::from_ymd_opt(2025, 6, 14).unwrap())
        );
        assert_eq!(parse_ofx_date("not-a-date"), None);
        assert_eq!(parse_ofx_date(""), None);
    }

    #[test]
    fn parse_ofx_amount_variants() {
        assert_eq!(parse_ofx_amount("-25.50"), Some(Money::from_centavos(-2550)));
        assert_eq!(parse_ofx_amount("1,234.56"), Some(Money::from_centavos(123456)));
        assert_eq!(parse_ofx_amount("-45,90"), Some(Money::from_centavos(-4590)));
        assert_eq!(parse_ofx_amount("-1.234,56"), Some(Money::from_centavos(-123456)));
        assert_eq!(parse_ofx_amount("12.345.678,90"), Some(Money::from_centavos(1234567890)));
        assert_eq!(parse_ofx_amount("1.5"), Some(Money::from_centavos(150)));
        assert_eq!(parse_ofx_amount("abc"), None);
    }

    #[test]
    fn element_value_strips_closing_tag_and_entities() {
        assert_eq!(
            element_value("MEMO", "PAO &amp; CIA</MEMO>").as_deref(),
            Some("PAO & CIA")
        );
        assert_eq!(element_value("MEMO", "SGML style").as_deref(), Some("SGML style"));
        assert_eq!(element_value("MEMO", "</MEMO>"), None);
    }

    #[test]
    fn latin1_bytes_are_decoded() {
        let bytes = b"FARM\xC1CIA";
        assert_eq!(decode(bytes), "FARMÁCIA");
    }

    // ── full statement parse ──────────────────────────────────────────────────

    const SGML_OFX: &str = r#"
OFXHEADER:100
DATA:OFXSGML
VERSION:102

<OFX>
<SIGNONMSGSRSV1><SONRS>
<FI>
<ORG>ITAU
<FID>260
</FI>
</SONRS></SIGNONMSGSRSV1>
<BANKMSGSRSV1>
<STMTTRNRS>
<STMTRS>
<CURDEF>BRL
<BANKACCTFROM>
<BANKID>0260
<BRANCHID>7431
<ACCTID>052607-3
<ACCTTYPE>CHECKING
</BANKACCTFROM>
<BANKTRANLIST>
<DTSTART>20250601
<DTEND>20250630
<STMTTRN>
<TRNTYPE>DEBIT
<DTPOSTED>20250614
<TRNAMT>-25.50
<FITID>TXN001
<NAME>UBER
<MEMO>PAY UBER 14/06
</STMTTRN>
<STMTTRN>
<TRNTYPE>CREDIT
<DTPOSTED>20250615
<TRNAMT>1000.00
<FITID>TXN002
<NAME>PIX RECEBIDO
</STMTTRN>
<STMTTRN>
<TRNTYPE>FEE
<DTPOSTED>20250616
<TRNAMT>-1.00
</STMTTRN>
</BANKTRANLIST>
</STMTRS>
</STMTTRNRS>
</BANKMSGSRSV1>
</OFX>
"#;

    #[test]
    fn parse_sgml_statement() {
        let stmt = parse(SGML_OFX.as_bytes()).unwrap();

        assert_eq!(stmt.account.account_id, "052607-3");
        assert_eq!(stmt.account.bank_id.as_deref(), Some("0260"));
        assert_eq!(stmt.account.branch_id.as_deref(), Some("7431"));
        assert_eq!(stmt.account.org.as_deref(), Some("ITAU"));
        assert_eq!(stmt.start_date, NaiveDate::from_ymd_opt(2025, 6, 1));
        assert_eq!(stmt.currency.as_deref(), Some("BRL"));
        assert_eq!(stmt.transactions.len(), 3);
    }

    #[test]
    fn description_prefers_memo_then_name_then_type() {
        let stmt = parse(SGML_OFX.as_bytes()).unwrap();
        assert_eq!(stmt.transactions[0].description(), "PAY UBER 14/06");
        assert_eq!(stmt.transactions[1].description(), "PIX RECEBIDO");
        assert_eq!(stmt.transactions[2].description(), "FEE");
    }

    #[test]
    fn to_transaction_keeps_fitid_and_type() {
        let stmt = parse(SGML_OFX.as_bytes()).unwrap();
        let trx = stmt.transactions[0].to_transaction();
        assert_eq!(trx.fit_id.as_deref(), Some("TXN001"));
        assert_eq!(trx.trntype, TrnType::Debit);
        assert_eq!(trx.amount, Money::from_centavos(-2550));

        let fee = stmt.transactions[2].to_transaction();
        assert_eq!(fee.fit_id, None);
        assert_eq!(fee.trntype, TrnType::Debit);
    }

    #[test]
    fn parse_xml_statement() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<OFX>
  <BANKMSGSRSV1>
    <STMTTRNRS>
      <STMTRS>
        <BANKACCTFROM>
          <BANKID>323</BANKID>
          <ACCTID>74645773646</ACCTID>
        </BANKACCTFROM>
        <BANKTRANLIST>
          <STMTTRN>
            <TRNTYPE>DEBIT</TRNTYPE>
            <DTPOSTED>20250619000000[-3:BRT]</DTPOSTED>
            <TRNAMT>-15.80</TRNAMT>
            <FITID>trans_001_20250619</FITID>
            <MEMO>DA DROGASIL 19/06</MEMO>
          </STMTTRN>
        </BANKTRANLIST>
      </STMTRS>
    </STMTTRNRS>
  </BANKMSGSRSV1>
</OFX>
"#;
        let stmt = parse(xml.as_bytes()).unwrap();
        assert_eq!(stmt.account.account_id, "74645773646");
        assert_eq!(stmt.start_date, None);
        let t = &stmt.transactions[0];
        assert_eq!(t.fit_id.as_deref(), Some("trans_001_20250619"));
        assert_eq!(t.description(), "DA DROGASIL 19/06");
        assert_eq!(t.date, NaiveDate::from_ymd_opt(2025, 6, 19).unwrap());
    }

    #[test]
    fn brazilian_amount_in_statement_keeps_thousands() {
        let ofx = "<OFX>\n<ACCTID>1\n<STMTTRN>\n<DTPOSTED>20250701\n<TRNAMT>-1.234,56\n<MEMO>ALUGUEL\n</STMTTRN>\n</OFX>\n";
        let stmt = parse(ofx.as_bytes()).unwrap();
        assert_eq!(stmt.transactions[0].amount, Money::from_centavos(-123456));
    }

    #[test]
    fn parse_ofx_missing_account_id_errors() {
        let bad = "<OFX>\n<BANKACCTFROM>\n</BANKACCTFROM>\n</OFX>\n";
        assert!(matches!(
            parse(bad.as_bytes()),
            Err(OfxError::MissingField(f)) if f == "ACCTID"
        ));
    }

    #[test]
    fn transaction_with_bad_date_errors() {
        let bad = "<OFX>\n<ACCTID>1\n<STMTTRN>\n<DTPOSTED>2025XX01\n<TRNAMT>1.00\n</STMTTRN>\n</OFX>\n";
        assert!(matches!(parse(bad.as_bytes()), Err(OfxError::InvalidDate(_))));
    }

    #[test]
    fn not_ofx_is_parse_error() {
        assert!(matches!(
            parse(b"just some text"),
            Err(OfxError::ParseError(_))
        ));
    }
}
