use extrato_core::Money;
use std::collections::BTreeMap;
use std::fmt;

use crate::engine::Categorizer;
use crate::store::FALLBACK_CATEGORY;

const EXCELLENT_BELOW_PCT: f64 = 30.0;
const GOOD_BELOW_PCT: f64 = 50.0;

impl Categorizer {
    /// Category → number of transactions, categorizing each pair once.
    pub fn category_statistics<'a, I>(&self, transactions: I) -> BTreeMap<String, usize>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut stats = BTreeMap::new();
        for (description, amount) in transactions {
            *stats
                .entry(self.categorize(description, amount).to_string())
                .or_insert(0) += 1;
        }
        stats
    }
}

/// How much of a run ended up in the fallback category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Efficiency {
    Excellent,
    Good,
    NeedsImprovement,
}

impl Efficiency {
    pub fn from_fallback_share(pct: f64) -> Self {
        if pct < EXCELLENT_BELOW_PCT {
            Efficiency::Excellent
        } else if pct < GOOD_BELOW_PCT {
            Efficiency::Good
        } else {
            Efficiency::NeedsImprovement
        }
    }
}

impl fmt::Display for Efficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Efficiency::Excellent => write!(f, "excellent (under 30% in '{FALLBACK_CATEGORY}')"),
            Efficiency::Good => write!(f, "good (under 50% in '{FALLBACK_CATEGORY}')"),
            Efficiency::NeedsImprovement => {
                write!(f, "needs improvement (50% or more in '{FALLBACK_CATEGORY}')")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryTotals {
    pub count: usize,
    pub total: Money,
}

/// Per-category counts and amounts accumulated over one or more statements.
#[derive(Debug, Clone, Default)]
pub struct CategoryReport {
    categories: BTreeMap<String, CategoryTotals>,
}

impl CategoryReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, category: &str, amount: Money) {
        let entry = self
            .categories
            .entry(category.to_string())
            .or_insert(CategoryTotals {
                count: 0,
                total: Money::zero(),
            });
        entry.count += 1;
        entry.total = entry.total + amount;
    }

    pub fn merge(&mut self, other: &CategoryReport) {
        for (category, totals) in &other.categories {
            let entry = self
                .categories
                .entry(category.clone())
                .or_insert(CategoryTotals {
                    count: 0,
                    total: Money::zero(),
                });
            entry.count += totals.count;
            entry.total = entry.total + totals.total;
        }
    }

    pub fn get(&self, category: &str) -> Option<&CategoryTotals> {
        self.categories.get(category)
    }

    pub fn total_count(&self) -> usize {
        self.categories.values().map(|t| t.count).sum()
    }

    /// Categories ordered by descending count, then by name.
    pub fn ranked(&self) -> Vec<(&str, &CategoryTotals)> {
        let mut rows: Vec<(&str, &CategoryTotals)> = self
            .categories
            .iter()
            .map(|(name, totals)| (name.as_str(), totals))
            .collect();
        rows.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
        rows
    }

    /// Percentage of transactions that fell back to "Outros".
    pub fn fallback_share(&self) -> f64 {
        let total = self.total_count();
        if total == 0 {
            return 0.0;
        }
        let fallback = self.get(FALLBACK_CATEGORY).map_or(0, |t| t.count);
        fallback as f64 / total as f64 * 100.0
    }

    pub fn efficiency(&self) -> Efficiency {
        Efficiency::from_fallback_share(self.fallback_share())
    }
}
