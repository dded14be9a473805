use crate::extractor::{ColumnSelector, Extraction, SkippedRow};
use crate::storage::ReportKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of analyzing one production report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub source: String,
    pub kind: ReportKind,
    pub column: ColumnSelector,
    pub encoding: String,
    pub tax_rate: f64,
    pub gross_total: f64,
    pub total: f64,
    pub rows_counted: usize,
    pub skipped: Vec<SkippedRow>,
    pub column_missing: bool,
    pub analyzed_at: DateTime<Utc>,
    /// File id in the report store when the analysis was also submitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_as: Option<String>,
}

impl AnalysisReport {
    pub fn new(
        source: impl Into<String>,
        kind: ReportKind,
        column: ColumnSelector,
        encoding: impl Into<String>,
        extraction: Extraction,
    ) -> Self {
        Self {
            source: source.into(),
            kind,
            column,
            encoding: encoding.into(),
            tax_rate: extraction.tax_rate.value(),
            gross_total: extraction.gross_total,
            total: extraction.total,
            rows_counted: extraction.rows_counted,
            skipped: extraction.skipped,
            column_missing: extraction.column_missing,
            analyzed_at: Utc::now(),
            stored_as: None,
        }
    }

    pub fn unparseable(&self) -> Vec<&SkippedRow> {
        self.skipped
            .iter()
            .filter(|row| matches!(row.reason, crate::extractor::SkipReason::Unparseable { .. }))
            .collect()
    }

    pub fn has_warnings(&self) -> bool {
        self.column_missing || !self.unparseable().is_empty()
    }

    /// Two-decimal currency text, e.g. `R$ 270.87`.
    pub fn formatted_total(&self) -> String {
        format_currency(self.total)
    }

    pub fn summary_line(&self) -> String {
        format!("Análise: {}\nTotal da produção: {}", self.kind.label(), self.formatted_total())
    }
}

pub fn format_currency(amount: f64) -> String {
    format!("R$ {:.2}", amount)
}
