use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::config::{ConfigError, KeywordConfig, Thresholds};
use crate::normalize::normalize_description;

/// Category returned when nothing else matches. Never matched directly.
pub const FALLBACK_CATEGORY: &str = "Outros";

/// Which transaction signs a rule may be applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Expense,
    Income,
    #[default]
    Both,
}

impl CategoryType {
    pub fn admits(self, kind: TransactionKind) -> bool {
        match self {
            CategoryType::Both => true,
            CategoryType::Expense => kind == TransactionKind::Expense,
            CategoryType::Income => kind == TransactionKind::Income,
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryType::Expense => write!(f, "expense"),
            CategoryType::Income => write!(f, "income"),
            CategoryType::Both => write!(f, "both"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Expense,
    Income,
}

impl TransactionKind {
    /// Zero counts as an expense.
    pub fn from_amount(amount: f64) -> Self {
        if amount > 0.0 {
            TransactionKind::Income
        } else {
            TransactionKind::Expense
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    /// Normalized phrases tested by substring containment.
    pub keywords: Vec<String>,
    pub priority: i32,
    /// Resolved in the second direct pass, after every non-exact rule.
    pub exact_match: bool,
    pub category_type: CategoryType,
}

impl CategoryRule {
    pub fn new<I, S>(category: &str, keywords: I, priority: i32, category_type: CategoryType) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        CategoryRule {
            category: category.to_string(),
            keywords: keywords
                .into_iter()
                .map(|k| normalize_description(k.as_ref()))
                .filter(|k| !k.is_empty())
                .collect(),
            priority,
            exact_match: false,
            category_type,
        }
    }

    pub fn exact(mut self) -> Self {
        self.exact_match = true;
        self
    }

    pub fn fallback() -> Self {
        CategoryRule::new(FALLBACK_CATEGORY, Vec::<String>::new(), 0, CategoryType::Both)
    }

    pub fn is_fallback(&self) -> bool {
        self.category == FALLBACK_CATEGORY && self.keywords.is_empty()
    }
}

/// Result of building a store from a configuration source.
#[derive(Debug)]
pub enum LoadOutcome {
    Configured {
        store: RuleStore,
        thresholds: Thresholds,
    },
    /// The configuration could not be used; the built-in rule set and default
    /// thresholds were substituted.
    Fallback { store: RuleStore, error: ConfigError },
}

impl LoadOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, LoadOutcome::Fallback { .. })
    }

    pub fn store(&self) -> &RuleStore {
        match self {
            LoadOutcome::Configured { store, .. } | LoadOutcome::Fallback { store, .. } => store,
        }
    }

    pub fn into_parts(self) -> (RuleStore, Thresholds, Option<ConfigError>) {
        match self {
            LoadOutcome::Configured { store, thresholds } => (store, thresholds, None),
            LoadOutcome::Fallback { store, error } => (store, Thresholds::default(), Some(error)),
        }
    }
}

/// Ordered category rules. Store order is the precedence of the direct pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleStore {
    rules: Vec<CategoryRule>,
}

impl RuleStore {
    pub fn load(source: Result<KeywordConfig, ConfigError>) -> LoadOutcome {
        match source {
            Ok(config) => LoadOutcome::Configured {
                store: Self::from_config(&config),
                thresholds: config.thresholds,
            },
            Err(error) => LoadOutcome::Fallback {
                store: Self::builtin(),
                error,
            },
        }
    }

    pub fn from_config(config: &KeywordConfig) -> Self {
        let mut rules: Vec<CategoryRule> = config
            .categories
            .iter()
            .filter(|c| c.name != FALLBACK_CATEGORY)
            .map(|c| {
                let mut rule =
                    CategoryRule::new(&c.name, &c.keywords, c.priority, c.category_type);
                rule.exact_match = c.exact_match;
                rule
            })
            .collect();
        rules.push(CategoryRule::fallback());
        Self { rules }
    }

    /// Small rule set used when no usable configuration is available.
    pub fn builtin() -> Self {
        let rules = vec![
            CategoryRule::new(
                "Alimentação",
                ["ifood", "rappi", "uber eats", "mcdonalds", "padaria", "restaurante"],
                10,
                CategoryType::Expense,
            ),
            CategoryRule::new(
                "Transporte",
                ["uber", "99", "taxi", "combustível", "posto"],
                10,
                CategoryType::Expense,
            ),
            CategoryRule::new(
                "Saúde",
                ["farmácia", "drogaria", "hospital", "médico"],
                9,
                CategoryType::Expense,
            ),
            CategoryRule::new(
                "Moradia",
                ["aluguel", "condomínio", "energia", "água", "internet"],
                9,
                CategoryType::Expense,
            ),
            CategoryRule::new(
                "Transferências",
                ["pix transf", "pix receb", "transferência"],
                1,
                CategoryType::Both,
            )
            .exact(),
            CategoryRule::fallback(),
        ];
        Self { rules }
    }

    /// Appends a rule; an existing rule with the same name is left in place and
    /// keeps precedence over the new one.
    pub fn add_custom_rule<I, S>(
        &mut self,
        category: &str,
        keywords: I,
        priority: i32,
        category_type: CategoryType,
    ) -> &CategoryRule
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rule = CategoryRule::new(category, keywords, priority, category_type);
        tracing::info!(
            category = %rule.category,
            keywords = rule.keywords.len(),
            "custom categorization rule added"
        );
        self.rules.push(rule);
        &self.rules[self.rules.len() - 1]
    }

    pub fn available_categories(&self) -> BTreeSet<String> {
        self.rules.iter().map(|r| r.category.clone()).collect()
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.rules.iter().any(|r| r.category == category)
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }
}
