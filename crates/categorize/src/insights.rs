use chrono::NaiveDate;
use extrato_core::{transaction_fingerprint, Money};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

use crate::normalize::normalize_description;

const MIN_CANDIDATE_LEN: usize = 3;
const MAX_CANDIDATE_LEN: usize = 20;
const STOP_WORDS: &[&str] = &["por", "com", "para", "sem", "sob", "sobre"];

/// One row of the uncategorized-transactions report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UncategorizedEntry {
    pub fitid: String,
    pub description: String,
    pub category: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub file: String,
}

impl UncategorizedEntry {
    /// Builds a row, deriving a synthetic FITID when the source had none.
    pub fn new(
        fitid: Option<&str>,
        description: &str,
        category: &str,
        amount: Money,
        date: NaiveDate,
        file: &str,
    ) -> Self {
        let fitid = match fitid {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => transaction_fingerprint(date, amount, description),
        };
        Self {
            fitid,
            description: description.to_string(),
            category: category.to_string(),
            amount,
            date,
            file: file.to_string(),
        }
    }
}

/// Writes the report with a header row, even when there are no entries.
pub fn write_uncategorized_csv<W: Write>(
    writer: W,
    entries: &[UncategorizedEntry],
) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(["fitid", "description", "category", "amount", "date", "file"])?;
    for entry in entries {
        wtr.serialize(entry)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Words that recur across descriptions, most frequent first.
///
/// Each description counts a word at most once. Pure numbers, stop words and
/// words outside 3..=20 characters are skipped.
pub fn keyword_candidates<'a, I>(descriptions: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for description in descriptions {
        let normalized = normalize_description(description);
        let mut seen: Vec<&str> = Vec::new();
        for word in normalized.split(' ') {
            let len = word.chars().count();
            if !(MIN_CANDIDATE_LEN..=MAX_CANDIDATE_LEN).contains(&len)
                || STOP_WORDS.contains(&word)
                || word.chars().all(|c| c.is_numeric())
                || seen.contains(&word)
            {
                continue;
            }
            seen.push(word);
            *counts.entry(word.to_string()).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}
