use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConsolidateError, ConsolidateResult};
use crate::table_model::{ClassifiedTable, Provenance, Table};

/// Financial statement category of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    ProfitAndLoss,
    BalanceSheet,
    CashFlow,
    Other,
}

impl Category {
    /// Categories tested in order; the first match wins
    pub const PRIORITY: [Category; 3] = [Category::ProfitAndLoss, Category::BalanceSheet, Category::CashFlow];

    pub fn label(&self) -> &'static str {
        match self {
            Category::ProfitAndLoss => "P&L",
            Category::BalanceSheet => "Balance Sheet",
            Category::CashFlow => "Cash Flow",
            Category::Other => "Other",
        }
    }

    /// Case-insensitive keyword alternation; `Other` is the fallback and has none
    fn keywords(&self) -> Option<&'static str> {
        match self {
            Category::ProfitAndLoss => Some(r"p\s*&\s*l|profit|income\s*statement|revenue"),
            Category::BalanceSheet => Some(r"balance\s*sheet|assets|liabilities|equity"),
            Category::CashFlow => Some(
                r"cash\s*flow|operating\s*activities|investing\s*activities|financing\s*activities",
            ),
            Category::Other => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Keyword classifier over filename and the top rows of a table
#[derive(Debug, Clone)]
pub struct StatementClassifier {
    preview_rows: usize,
    patterns: Vec<(Category, Regex)>,
}

impl StatementClassifier {
    pub fn new(preview_rows: usize) -> ConsolidateResult<Self> {
        let mut patterns = Vec::with_capacity(Category::PRIORITY.len());
        for category in Category::PRIORITY {
            let Some(keywords) = category.keywords() else {
                continue;
            };
            let regex = Regex::new(&format!("(?i){}", keywords)).map_err(|e| {
                ConsolidateError::configuration(format!("invalid {} keyword pattern: {}", category, e))
            })?;
            patterns.push((category, regex));
        }
        Ok(Self { preview_rows, patterns })
    }

    /// Classify a headed table. The header counts as the first row.
    pub fn classify_table(&self, filename: &str, table: &Table) -> Category {
        let haystack = self.haystack(filename, table.text_rows());
        self.match_haystack(&haystack)
    }

    pub fn classify(&self, table: Table, provenance: Provenance) -> ClassifiedTable {
        let category = self.classify_table(&provenance.document, &table);
        tracing::debug!(source = %provenance, category = %category, "Classified table");
        ClassifiedTable::new(table, category, provenance)
    }

    fn haystack(&self, filename: &str, rows: impl Iterator<Item = Vec<String>>) -> String {
        let mut haystack = filename.to_lowercase();
        for row in rows.take(self.preview_rows) {
            for cell in row {
                if !cell.is_empty() {
                    haystack.push(' ');
                    haystack.push_str(&cell.to_lowercase());
                }
            }
        }
        haystack
    }

    fn match_haystack(&self, haystack: &str) -> Category {
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(haystack))
            .map_or(Category::Other, |(category, _)| *category)
    }
}
