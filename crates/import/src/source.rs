use std::path::{Path, PathBuf};

use extrato_core::{Bank, Transaction};

use crate::statement::{parse_statement_text, StatementError};

pub const MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Bank whose key appears in the file name, compared case-insensitively.
pub fn identify_bank(file_name: &str) -> Option<Bank> {
    let lower = file_name.to_lowercase();
    Bank::ALL.into_iter().find(|bank| lower.contains(bank.key()))
}

/// Checks that `path` is a regular `.pdf` file of at most 50 MB.
pub fn validate_statement_file(path: &Path) -> Result<(), StatementError> {
    let invalid = |reason: &str| StatementError::InvalidFile {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(invalid("not a .pdf file"));
    }

    let meta = std::fs::metadata(path).map_err(|source| StatementError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if !meta.is_file() {
        return Err(invalid("not a regular file"));
    }
    if meta.len() > MAX_FILE_SIZE_BYTES {
        return Err(invalid("larger than 50 MB"));
    }
    Ok(())
}

/// PDF files in `dir`, sorted by name. Files failing validation are logged and left out.
pub fn list_statement_files(dir: &Path) -> Result<Vec<PathBuf>, StatementError> {
    let entries = std::fs::read_dir(dir).map_err(|source| StatementError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| StatementError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        match validate_statement_file(&path) {
            Ok(()) => files.push(path),
            Err(StatementError::InvalidFile { reason, .. }) if path.is_file() => {
                tracing::debug!(path = %path.display(), %reason, "skipping file");
            }
            Err(StatementError::InvalidFile { .. }) => {}
            Err(e) => tracing::warn!("{e}"),
        }
    }
    files.sort();
    Ok(files)
}

pub fn extract_pdf_text(path: &Path) -> Result<String, StatementError> {
    pdf_extract::extract_text(path).map_err(|e| StatementError::Pdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Validates, identifies and parses one PDF statement.
pub fn read_statement(path: &Path) -> Result<(Bank, Vec<Transaction>), StatementError> {
    validate_statement_file(path)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bank = identify_bank(&file_name).ok_or(StatementError::UnknownBank(file_name))?;

    let text = extract_pdf_text(path)?;
    let transactions = parse_statement_text(bank, &text);
    if transactions.is_empty() {
        return Err(StatementError::NoTransactions(path.to_path_buf()));
    }
    tracing::info!(
        bank = %bank,
        path = %path.display(),
        count = transactions.len(),
        "statement parsed"
    );
    Ok((bank, transactions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_from_file_name() {
        assert_eq!(identify_bank("Extrato_ITAU_junho.pdf"), Some(Bank::Itau));
        assert_eq!(identify_bank("mercadopago-2025-06.pdf"), Some(Bank::MercadoPago));
        assert_eq!(identify_bank("nubank.pdf"), None);
    }

    #[test]
    fn rejects_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("itau.txt");
        std::fs::write(&path, b"x").unwrap();
        let err = validate_statement_file(&path).unwrap_err();
        assert!(matches!(err, StatementError::InvalidFile { .. }));
    }

    #[test]
    fn accepts_uppercase_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("itau.PDF");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        assert!(validate_statement_file(&path).is_ok());
    }

    #[test]
    fn rejects_directory_named_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("itau.pdf");
        std::fs::create_dir(&path).unwrap();
        let err = validate_statement_file(&path).unwrap_err();
        assert!(matches!(err, StatementError::InvalidFile { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_statement_file(&dir.path().join("itau.pdf")).unwrap_err();
        assert!(matches!(err, StatementError::Io { .. }));
    }

    #[test]
    fn lists_only_pdfs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["mercadopago.pdf", "notes.txt", "itau.pdf"] {
            std::fs::write(dir.path().join(name), b"%PDF-1.4").unwrap();
        }
        let files = list_statement_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["itau.pdf", "mercadopago.pdf"]);
    }

    #[test]
    fn unknown_bank_is_reported_before_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nubank.pdf");
        std::fs::write(&path, b"not really a pdf").unwrap();
        let err = read_statement(&path).unwrap_err();
        assert!(matches!(err, StatementError::UnknownBank(name) if name == "nubank.pdf"));
    }
}
