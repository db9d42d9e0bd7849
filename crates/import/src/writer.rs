use chrono::{NaiveDate, NaiveDateTime};
use extrato_core::{BankAccount, Money, Transaction};
use std::borrow::Cow;
use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const OFX_LANGUAGE: &str = "POR";
pub const OFX_CURRENCY: &str = "BRL";
pub const OFX_ACCOUNT_TYPE: &str = "CHECKING";
pub const POSTED_TZ: &str = "[-3:BRT]";
pub const SERVER_TZ: &str = "[0:GMT]";

#[derive(Error, Debug)]
pub enum OfxWriteError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Renders statements as XML OFX 1.x for one account.
pub struct OfxWriter<'a> {
    account: &'a BankAccount,
    generated_at: NaiveDateTime,
}

impl<'a> OfxWriter<'a> {
    pub fn new(account: &'a BankAccount, generated_at: NaiveDateTime) -> Self {
        Self {
            account,
            generated_at,
        }
    }

    pub fn render(&self, transactions: &[Transaction]) -> String {
        self.render_entries(transactions.iter().map(|t| (t, Cow::Borrowed(t.description.as_str()))))
    }

    /// Same as [`render`](Self::render) with `[CATEGORIA: <category>]` appended to
    /// every memo.
    pub fn render_categorized(&self, transactions: &[(Transaction, String)]) -> String {
        self.render_entries(transactions.iter().map(|(t, category)| {
            (
                t,
                Cow::Owned(format!("{} [CATEGORIA: {}]", t.description, category)),
            )
        }))
    }

    pub fn write_file(&self, path: &Path, transactions: &[Transaction]) -> Result<(), OfxWriteError> {
        write_to(path, &self.render(transactions))
    }

    pub fn write_categorized_file(
        &self,
        path: &Path,
        transactions: &[(Transaction, String)],
    ) -> Result<(), OfxWriteError> {
        write_to(path, &self.render_categorized(transactions))
    }

    fn render_entries<'t, I>(&self, entries: I) -> String
    where
        I: Iterator<Item = (&'t Transaction, Cow<'t, str>)>,
    {
        let entries: Vec<(&Transaction, Cow<str>)> = entries.collect();
        let now = format!("{}{SERVER_TZ}", self.generated_at.format("%Y%m%d%H%M%S"));
        let acct = self.account;

        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<OFX>\n");

        out.push_str("  <SIGNONMSGSRSV1>\n    <SONRS>\n");
        push_status(&mut out, "      ");
        push_elem(&mut out, "      ", "DTSERVER", &now);
        push_elem(&mut out, "      ", "LANGUAGE", OFX_LANGUAGE);
        out.push_str("      <FI>\n");
        push_elem(&mut out, "        ", "ORG", &acct.org);
        push_elem(&mut out, "        ", "FID", &acct.fid);
        out.push_str("      </FI>\n    </SONRS>\n  </SIGNONMSGSRSV1>\n");

        out.push_str("  <BANKMSGSRSV1>\n    <STMTTRNRS>\n");
        push_elem(&mut out, "      ", "TRNUID", "1");
        push_status(&mut out, "      ");
        out.push_str("      <STMTRS>\n");
        push_elem(&mut out, "        ", "CURDEF", OFX_CURRENCY);

        out.push_str("        <BANKACCTFROM>\n");
        push_elem(&mut out, "          ", "BANKID", &acct.bank_id);
        push_elem(&mut out, "          ", "BRANCHID", &acct.agency);
        push_elem(&mut out, "          ", "ACCTID", &acct.account);
        push_elem(&mut out, "          ", "ACCTTYPE", OFX_ACCOUNT_TYPE);
        out.push_str("        </BANKACCTFROM>\n");

        let (start, end) = date_range(entries.iter().map(|(t, _)| t.date))
            .unwrap_or((self.generated_at.date(), self.generated_at.date()));
        out.push_str("        <BANKTRANLIST>\n");
        push_elem(&mut out, "          ", "DTSTART", &posted(start));
        push_elem(&mut out, "          ", "DTEND", &posted(end));
        for (i, (trx, memo)) in entries.iter().enumerate() {
            let fit_id = format!("trans_{:03}_{}", i + 1, trx.date.format("%Y%m%d"));
            out.push_str("          <STMTTRN>\n");
            push_elem(&mut out, "            ", "TRNTYPE", &trx.trntype.to_string());
            push_elem(&mut out, "            ", "DTPOSTED", &posted(trx.date));
            push_elem(&mut out, "            ", "TRNAMT", &trx.amount.to_ofx_string());
            push_elem(&mut out, "            ", "FITID", &fit_id);
            push_elem(&mut out, "            ", "MEMO", memo);
            out.push_str("          </STMTTRN>\n");
        }
        out.push_str("        </BANKTRANLIST>\n");

        let balance: Money = entries.iter().map(|(t, _)| t.amount).sum();
        let balance = balance.to_ofx_string();
        out.push_str("        <LEDGERBAL>\n");
        push_elem(&mut out, "          ", "BALAMT", &balance);
        push_elem(&mut out, "          ", "DTASOF", &now);
        out.push_str("        </LEDGERBAL>\n");
        out.push_str("        <BALLIST>\n          <BAL>\n");
        push_elem(&mut out, "            ", "BALTYPE", "AVAIL");
        push_elem(&mut out, "            ", "BALAMT", &balance);
        push_elem(&mut out, "            ", "DTASOF", &now);
        out.push_str("          </BAL>\n        </BALLIST>\n");

        out.push_str("      </STMTRS>\n    </STMTTRNRS>\n  </BANKMSGSRSV1>\n</OFX>\n");
        out
    }
}

fn write_to(path: &Path, content: &str) -> Result<(), OfxWriteError> {
    let io_err = |source| OfxWriteError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::create(path).map_err(io_err)?;
    file.write_all(content.as_bytes()).map_err(io_err)?;
    file.flush().map_err(io_err)
}

fn push_status(out: &mut String, indent: &str) {
    let _ = writeln!(out, "{indent}<STATUS>");
    push_elem(out, &format!("{indent}  "), "CODE", "0");
    push_elem(out, &format!("{indent}  "), "SEVERITY", "INFO");
    let _ = writeln!(out, "{indent}</STATUS>");
}

fn push_elem(out: &mut String, indent: &str, tag: &str, value: &str) {
    let _ = writeln!(out, "{indent}<{tag}>{}</{tag}>", escape_xml(value));
}

fn posted(date: NaiveDate) -> String {
    format!("{}000000{POSTED_TZ}", date.format("%Y%m%d"))
}

fn date_range<I: Iterator<Item = NaiveDate>>(dates: I) -> Option<(NaiveDate, NaiveDate)> {
    dates.fold(None, |range, d| match range {
        None => Some((d, d)),
        Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
    })
}

pub fn escape_xml(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut escaped = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ofx;
    use extrato_core::Bank;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn at() -> NaiveDateTime {
        d(2025, 8, 1).and_hms_opt(12, 30, 0).unwrap()
    }

    fn sample() -> Vec<Transaction> {
        vec![
            Transaction::new(d(2025, 6, 20), Money::from_centavos(-3500), "PAY CINEMA 20/06"),
            Transaction::new(d(2025, 6, 14), Money::from_centavos(-2550), "PAY UBER 14/06"),
            Transaction::new(d(2025, 6, 30), Money::from_centavos(100000), "PIX RECEBIDO"),
        ]
    }

    #[test]
    fn renders_account_and_transactions() {
        let account = Bank::Itau.account();
        let text = OfxWriter::new(&account, at()).render(&sample());

        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<OFX>\n"));
        assert!(text.contains("<DTSERVER>20250801123000[0:GMT]</DTSERVER>"));
        assert!(text.contains("<LANGUAGE>POR</LANGUAGE>"));
        assert!(text.contains("<CURDEF>BRL</CURDEF>"));
        assert!(text.contains("<BANKID>0260</BANKID>"));
        assert!(text.contains("<BRANCHID>7431</BRANCHID>"));
        assert!(text.contains("<ACCTID>052607-3</ACCTID>"));
        assert!(text.contains("<DTSTART>20250614000000[-3:BRT]</DTSTART>"));
        assert!(text.contains("<DTEND>20250630000000[-3:BRT]</DTEND>"));
        assert!(text.contains("<FITID>trans_001_20250620</FITID>"));
        assert!(text.contains("<FITID>trans_003_20250630</FITID>"));
        assert!(text.contains("<TRNTYPE>DEBIT</TRNTYPE>"));
        assert!(text.contains("<TRNAMT>-35.00</TRNAMT>"));
        assert!(text.contains("<BALAMT>939.50</BALAMT>"));
        assert!(text.trim_end().ends_with("</OFX>"));
    }

    #[test]
    fn categorized_memo_carries_category() {
        let account = Bank::MercadoPago.account();
        let entries = vec![(sample()[1].clone(), "Transporte".to_string())];
        let text = OfxWriter::new(&account, at()).render_categorized(&entries);
        assert!(text.contains("<MEMO>PAY UBER 14/06 [CATEGORIA: Transporte]</MEMO>"));
    }

    #[test]
    fn special_characters_are_escaped() {
        let account = Bank::Itau.account();
        let trx = vec![Transaction::new(
            d(2025, 6, 1),
            Money::from_centavos(-100),
            "PAO & CIA <LOJA>",
        )];
        let text = OfxWriter::new(&account, at()).render(&trx);
        assert!(text.contains("<MEMO>PAO &amp; CIA &lt;LOJA&gt;</MEMO>"));
    }

    #[test]
    fn empty_statement_uses_generation_date() {
        let account = Bank::Itau.account();
        let text = OfxWriter::new(&account, at()).render(&[]);
        assert!(text.contains("<DTSTART>20250801000000[-3:BRT]</DTSTART>"));
        assert!(text.contains("<BALAMT>0.00</BALAMT>"));
        assert!(!text.contains("<STMTTRN>"));
    }

    #[test]
    fn written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("itau.ofx");
        let account = Bank::Itau.account();
        let trxs = sample();
        OfxWriter::new(&account, at()).write_file(&path, &trxs).unwrap();

        let stmt = ofx::parse_file(&path).unwrap();
        assert_eq!(stmt.account.account_id, "052607-3");
        assert_eq!(stmt.account.org.as_deref(), Some("ITAÚ UNIBANCO S.A."));
        assert_eq!(stmt.transactions.len(), 3);
        for (read, written) in stmt.transactions.iter().zip(&trxs) {
            assert_eq!(read.date, written.date);
            assert_eq!(read.amount, written.amount);
            assert_eq!(read.description(), written.description);
        }
        assert_eq!(stmt.account.to_bank_account().account, account.account);
    }

    #[test]
    fn escape_passthrough() {
        assert!(matches!(escape_xml("PAY UBER"), Cow::Borrowed(_)));
        assert_eq!(escape_xml("a\"b'c"), "a&quot;b&apos;c");
    }
}
