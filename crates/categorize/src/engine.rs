use regex::Regex;
use std::collections::BTreeSet;

use crate::config::Thresholds;
use crate::normalize::normalize_description;
use crate::store::{CategoryRule, CategoryType, RuleStore, TransactionKind, FALLBACK_CATEGORY};

const FOOD: &str = "Alimentação";
const TRANSPORT: &str = "Transporte";
const LEISURE: &str = "Lazer";
const INVESTMENTS: &str = "Investimentos";
const TRANSFERS: &str = "Transferências";

const KEYWORD_LENGTH_BONUS: f64 = 0.05;
const HIGH_VALUE_BONUS: f64 = 0.2;
const HIGH_VALUE_PENALTY: f64 = 0.1;
const LOW_VALUE_BONUS: f64 = 0.1;
const LOW_VALUE_PENALTY: f64 = 0.2;

/// Compiled "any keyword contained" test for one rule.
///
/// Falls back to a linear scan if the alternation cannot be compiled.
struct KeywordMatcher(Option<Regex>);

impl KeywordMatcher {
    fn compile(rule: &CategoryRule) -> Self {
        if rule.keywords.is_empty() {
            return KeywordMatcher(None);
        }
        let pattern = rule
            .keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        KeywordMatcher(Regex::new(&pattern).ok())
    }

    fn matches(&self, rule: &CategoryRule, text: &str) -> bool {
        match &self.0 {
            Some(re) => re.is_match(text),
            None => rule.keywords.iter().any(|k| text.contains(k.as_str())),
        }
    }
}

/// Maps a transaction description and signed amount to one category.
///
/// Holds the rule store and thresholds; categorization itself never mutates state,
/// so a `Categorizer` can be shared across threads once configuration is done.
pub struct Categorizer {
    store: RuleStore,
    matchers: Vec<KeywordMatcher>,
    thresholds: Thresholds,
}

impl Categorizer {
    pub fn new(store: RuleStore, thresholds: Thresholds) -> Self {
        let matchers = store.rules().iter().map(KeywordMatcher::compile).collect();
        Self {
            store,
            matchers,
            thresholds,
        }
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    pub fn available_categories(&self) -> BTreeSet<String> {
        self.store.available_categories()
    }

    /// Appends a rule and compiles its matcher; existing matchers are kept.
    ///
    /// Requires exclusive access, so no categorization can be in flight.
    pub fn add_custom_rule<I, S>(
        &mut self,
        category: &str,
        keywords: I,
        priority: i32,
        category_type: CategoryType,
    ) where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rule = self
            .store
            .add_custom_rule(category, keywords, priority, category_type);
        self.matchers.push(KeywordMatcher::compile(rule));
    }

    pub fn categorize(&self, description: &str, amount: f64) -> &str {
        if description.trim().is_empty() {
            return FALLBACK_CATEGORY;
        }

        let text = normalize_description(description);
        let kind = TransactionKind::from_amount(amount);

        if let Some(category) = self.direct_match(&text, kind, false) {
            return category;
        }
        if let Some(category) = self.direct_match(&text, kind, true) {
            return category;
        }
        if let Some(category) = self.best_scored(&text, amount, kind) {
            return category;
        }
        if let Some(category) = self.contextual(&text, amount) {
            return category;
        }
        FALLBACK_CATEGORY
    }

    /// Keyword score of `rule` against an already normalized description.
    ///
    /// The amount adjustment only applies to positive amounts; expenses are
    /// scored on keywords alone.
    pub fn match_score(&self, rule: &CategoryRule, normalized: &str, amount: f64) -> f64 {
        let mut score = 0.0;
        for keyword in &rule.keywords {
            if normalized.contains(keyword.as_str()) {
                score += f64::from(rule.priority) * 0.1;
                if keyword.chars().count() > 3 {
                    score += KEYWORD_LENGTH_BONUS;
                }
            }
        }

        if amount > 0.0 {
            score = self.adjust_for_amount(&rule.category, amount, score);
        }
        score
    }

    fn adjust_for_amount(&self, category: &str, amount: f64, score: f64) -> f64 {
        let t = &self.thresholds;
        if amount > t.high_value {
            match category {
                INVESTMENTS | TRANSFERS => score + HIGH_VALUE_BONUS,
                FOOD | TRANSPORT => score - HIGH_VALUE_PENALTY,
                _ => score,
            }
        } else if amount < t.low_value {
            match category {
                FOOD | TRANSPORT | LEISURE => score + LOW_VALUE_BONUS,
                INVESTMENTS | TRANSFERS => score - LOW_VALUE_PENALTY,
                _ => score,
            }
        } else {
            score
        }
    }

    fn eligible(
        &self,
        kind: TransactionKind,
    ) -> impl Iterator<Item = (&CategoryRule, &KeywordMatcher)> {
        self.store
            .rules()
            .iter()
            .zip(&self.matchers)
            .filter(move |(rule, _)| {
                !rule.keywords.is_empty() && rule.category_type.admits(kind)
            })
    }

    /// First rule in store order whose keywords appear in `text`, restricted to
    /// exact or non-exact rules.
    fn direct_match(&self, text: &str, kind: TransactionKind, exact: bool) -> Option<&str> {
        self.eligible(kind)
            .filter(|(rule, _)| rule.exact_match == exact)
            .find(|(rule, matcher)| matcher.matches(rule, text))
            .map(|(rule, _)| rule.category.as_str())
    }

    fn best_scored(&self, text: &str, amount: f64, kind: TransactionKind) -> Option<&str> {
        let mut best: Option<&str> = None;
        let mut best_score = 0.0;

        for (rule, _) in self.eligible(kind) {
            let score = self.match_score(rule, text, amount);
            if score > best_score {
                best_score = score;
                best = Some(rule.category.as_str());
            }
        }

        best.filter(|_| best_score > self.thresholds.min_score)
    }

    /// PIX and large-value heuristics. Only categories present in the store
    /// are returned.
    fn contextual(&self, text: &str, amount: f64) -> Option<&'static str> {
        if text.contains("pix")
            && (text.contains("qr")
                || ["receb", "enviado", "transf"]
                    .iter()
                    .any(|word| text.contains(word)))
            && self.store.contains_category(TRANSFERS)
        {
            return Some(TRANSFERS);
        }
        if amount > self.thresholds.investment && self.store.contains_category(INVESTMENTS) {
            return Some(INVESTMENTS);
        }
        None
    }
}
