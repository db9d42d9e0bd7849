use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use extrato_categorize::{
    keyword_candidates, write_uncategorized_csv, CategoryReport, Categorizer, KeywordConfig,
    RuleStore, UncategorizedEntry, BUNDLED_KEYWORDS, FALLBACK_CATEGORY,
};
use extrato_core::{BankAccount, Transaction};
use extrato_import::{list_statement_files, ofx, read_statement, OfxWriter};

const CATEGORY_TAG: &str = " [CATEGORIA: ";

/// (description, amount, expected category) checked by `self-test`.
const SCENARIOS: &[(&str, f64, &str)] = &[
    ("PIX QRS IFOOD COM A18/06", -45.90, "Alimentação"),
    ("PAY UBER 14/06", -25.50, "Transporte"),
    ("DA DROGASIL 19/06", -15.80, "Saúde"),
    ("DA SABESP 00000118677", -120.00, "Moradia"),
    ("PAY CINEMA 20/06", -35.00, "Lazer"),
    ("PAY ADVOGADO 25/06", -800.00, "Serviços"),
    ("PAY ESCOLA 28/06", -500.00, "Educação"),
    ("PAY AMAZON 30/06", -150.00, "Compras Variadas"),
    ("PAY MERCADO LIVRE 01/07", -75.00, "Compras Variadas"),
    ("INT IPVA-SP FGQ-1370", -261.32, "Impostos"),
    ("Reserva por gastos Férias", -5.00, "Reservas"),
    ("SALARIO RECEBIDO 05/07", 5000.00, "Salário"),
    ("13O SALARIO 15/12", 5000.00, "Salário"),
    ("FERIAS + 1/3 20/01", 3500.00, "Salário"),
    ("VALE REFEICAO 10/07", 500.00, "Salário"),
    ("REND PAGO APLIC AUT MAIS", 150.00, "Investimentos"),
    ("DIVIDENDO ACOES 25/07", 200.00, "Investimentos"),
    ("PIX RECEBIDO 30/07", 1000.00, "Transferências"),
    ("TED RECEBIDO 05/08", 2000.00, "Transferências"),
    ("PIX TRANSF 15/08", 0.00, "Serviços"),
    ("AJUSTE SALDO 20/08", 0.00, "Outros"),
];

/// Keyword of one direction applied to the other; the category must differ.
const CONFLICTS: &[(&str, f64, &str)] = &[
    ("PIX QRS IFOOD COM A18/06", 45.90, "Alimentação"),
    ("SALARIO RECEBIDO 05/07", -5000.00, "Salário"),
];

pub fn load_categorizer(keywords: Option<&Path>) -> Categorizer {
    let (store, thresholds, error) = RuleStore::load(KeywordConfig::load(keywords)).into_parts();
    if let Some(e) = error {
        tracing::warn!("{e}; falling back to built-in categories");
    }
    tracing::debug!(rules = store.rules().len(), "rule store ready");
    Categorizer::new(store, thresholds)
}

pub fn convert(input: &Path, output: &Path) -> Result<()> {
    let files = list_statement_files(input)
        .with_context(|| format!("Failed to list statements in {}", input.display()))?;
    if files.is_empty() {
        tracing::warn!(dir = %input.display(), "no PDF statements found");
        return Ok(());
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let generated_at = Utc::now().naive_utc();
    let mut converted = 0;
    for path in &files {
        let (bank, transactions) = match read_statement(path) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("{e}");
                continue;
            }
        };
        let account = bank.account();
        let target = output.join(with_extension(path, "ofx"));
        OfxWriter::new(&account, generated_at).write_file(&target, &transactions)?;
        tracing::info!(
            bank = %bank,
            count = transactions.len(),
            output = %target.display(),
            "OFX written"
        );
        converted += 1;
    }

    println!("{converted}/{} statements converted", files.len());
    if converted == 0 {
        bail!("no statement in {} could be converted", input.display());
    }
    Ok(())
}

pub fn categorize(keywords: Option<&Path>, input: &Path, output: &Path) -> Result<()> {
    let categorizer = load_categorizer(keywords);
    let files = list_ofx_files(input)?;
    if files.is_empty() {
        tracing::warn!(dir = %input.display(), "no OFX files found");
        return Ok(());
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let generated_at = Utc::now().naive_utc();
    let mut report = CategoryReport::new();
    for path in &files {
        let (account, entries) = match categorize_file(&categorizer, path) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("{e:#}");
                continue;
            }
        };
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let target = output.join(format!("categorizado_{name}"));
        OfxWriter::new(&account, generated_at).write_categorized_file(&target, &entries)?;
        tracing::info!(count = entries.len(), output = %target.display(), "categorized OFX written");

        let mut file_report = CategoryReport::new();
        for (trx, category) in &entries {
            file_report.record(category, trx.amount);
        }
        tracing::info!(
            file = %name,
            outros_pct = file_report.fallback_share(),
            "file categorized"
        );
        report.merge(&file_report);
    }

    print_report(&report);
    Ok(())
}

pub fn classify(keywords: Option<&Path>, description: &str, amount: f64) -> Result<()> {
    let categorizer = load_categorizer(keywords);
    println!("{}", categorizer.categorize(description, amount));
    Ok(())
}

pub fn self_test(keywords: Option<&Path>) -> Result<()> {
    let categorizer = load_categorizer(keywords);
    let mut passed = 0;

    for &(description, amount, expected) in SCENARIOS {
        let got = categorizer.categorize(description, amount);
        let ok = got == expected;
        passed += usize::from(ok);
        println!(
            "{} {description} (R$ {amount:.2}) -> {got} (expected {expected})",
            mark(ok)
        );
    }
    for &(description, amount, forbidden) in CONFLICTS {
        let got = categorizer.categorize(description, amount);
        let ok = got != forbidden;
        passed += usize::from(ok);
        println!(
            "{} {description} (R$ {amount:.2}) -> {got} (must not be {forbidden})",
            mark(ok)
        );
    }

    let total = SCENARIOS.len() + CONFLICTS.len();
    println!(
        "\n{passed}/{total} correct ({:.1}%)",
        passed as f64 / total as f64 * 100.0
    );
    if passed < total {
        bail!("{} scenario(s) failed", total - passed);
    }
    Ok(())
}

pub fn categories(keywords: Option<&Path>) -> Result<()> {
    let categorizer = load_categorizer(keywords);
    for rule in categorizer.store().rules() {
        println!(
            "{:<20} priority {:>3}  {:<7}  {:>3} keywords{}",
            rule.category,
            rule.priority,
            rule.category_type.to_string(),
            rule.keywords.len(),
            if rule.exact_match { "  (exact)" } else { "" }
        );
    }
    Ok(())
}

pub fn outros(keywords: Option<&Path>, input: &Path, output: &Path, top: usize) -> Result<()> {
    let categorizer = load_categorizer(keywords);
    let entries = collect_uncategorized(&categorizer, &list_ofx_files(input)?);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    write_uncategorized_csv(file, &entries)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "{} transaction(s) in '{FALLBACK_CATEGORY}' written to {}",
        entries.len(),
        output.display()
    );

    let candidates = keyword_candidates(entries.iter().map(|e| e.description.as_str()));
    if !candidates.is_empty() {
        println!("\nKeyword candidates:");
        for (word, count) in candidates.iter().take(top) {
            println!("  {word:<20} {count}");
        }
    }
    Ok(())
}

pub fn init_keywords(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    fs::write(path, BUNDLED_KEYWORDS)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Keyword configuration written to {}", path.display());
    Ok(())
}

fn categorize_file(
    categorizer: &Categorizer,
    path: &Path,
) -> Result<(BankAccount, Vec<(Transaction, String)>)> {
    let statement = ofx::parse_file(path)
        .with_context(|| format!("Failed to read OFX {}", path.display()))?;

    let entries = statement
        .transactions
        .iter()
        .map(|t| {
            let mut trx = t.to_transaction();
            trx.description = strip_category_tag(&trx.description).to_string();
            let category = categorizer
                .categorize(&trx.description, trx.amount.to_f64())
                .to_string();
            tracing::debug!(description = %trx.description, amount = %trx.amount, %category);
            (trx, category)
        })
        .collect();
    Ok((statement.account.to_bank_account(), entries))
}

fn collect_uncategorized(categorizer: &Categorizer, files: &[PathBuf]) -> Vec<UncategorizedEntry> {
    let mut rows = Vec::new();
    for path in files {
        let entries = match categorize_file(categorizer, path) {
            Ok((_, entries)) => entries,
            Err(e) => {
                tracing::warn!("{e:#}");
                continue;
            }
        };
        let file = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        rows.extend(
            entries
                .iter()
                .filter(|(_, category)| category == FALLBACK_CATEGORY)
                .map(|(trx, category)| {
                    UncategorizedEntry::new(
                        trx.fit_id.as_deref(),
                        &trx.description,
                        category,
                        trx.amount,
                        trx.date,
                        &file,
                    )
                }),
        );
    }
    rows
}

fn print_report(report: &CategoryReport) {
    println!("{:<20} {:>6} {:>16}", "Category", "Count", "Total");
    for (category, totals) in report.ranked() {
        println!("{category:<20} {:>6} {:>16}", totals.count, totals.total.to_string());
    }
    println!(
        "\n{} transaction(s), {:.1}% in '{FALLBACK_CATEGORY}': {}",
        report.total_count(),
        report.fallback_share(),
        report.efficiency()
    );
}

fn list_ofx_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        let is_ofx = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("ofx"));
        if is_ofx && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Memo without a category tag written by a previous run.
fn strip_category_tag(description: &str) -> &str {
    match description.find(CATEGORY_TAG) {
        Some(at) if description.ends_with(']') => &description[..at],
        _ => description,
    }
}

fn with_extension(path: &Path, ext: &str) -> PathBuf {
    PathBuf::from(path.file_name().unwrap_or_default()).with_extension(ext)
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "✓"
    } else {
        "✗"
    }
}
