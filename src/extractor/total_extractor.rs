use crate::error::{ProdTotalError, Result};
use crate::extractor::decoder::ReportDecoder;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_DELIMITER: char = ';';
pub const DEFAULT_FOOTER_MARKER: &str = "TOTAL";

/// Which field of a row holds the amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSelector {
    /// Zero-based field position.
    Index(usize),
    /// Header text, resolved on the first row that contains it.
    Name(String),
}

impl Default for ColumnSelector {
    fn default() -> Self {
        ColumnSelector::Index(1)
    }
}

impl fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSelector::Index(index) => write!(f, "#{}", index),
            ColumnSelector::Name(name) => write!(f, "\"{}\"", name),
        }
    }
}

/// Fraction of the gross total withheld as tax, in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct TaxRate(f64);

impl TaxRate {
    pub const NONE: TaxRate = TaxRate(0.0);

    /// The 9.86% historically applied to lab production (factor 0.9014).
    pub const LAB_DEFAULT: TaxRate = TaxRate(0.0986);

    pub fn new(rate: f64) -> Result<Self> {
        if rate.is_finite() && (0.0..1.0).contains(&rate) {
            Ok(Self(rate))
        } else {
            Err(ProdTotalError::InvalidTaxRate { rate })
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }

    pub fn apply(self, total: f64) -> f64 {
        if self.is_zero() {
            total
        } else {
            total * (1.0 - self.0)
        }
    }
}

impl TryFrom<f64> for TaxRate {
    type Error = ProdTotalError;

    fn try_from(rate: f64) -> Result<Self> {
        Self::new(rate)
    }
}

impl From<TaxRate> for f64 {
    fn from(rate: TaxRate) -> f64 {
        rate.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    Empty,
    TotalRow,
    TooFewFields { found: usize, needed: usize },
    Unparseable { value: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Empty => write!(f, "empty line"),
            SkipReason::TotalRow => write!(f, "total row"),
            SkipReason::TooFewFields { found, needed } => {
                write!(f, "{} fields, need {}", found, needed)
            }
            SkipReason::Unparseable { value } => write!(f, "cannot convert '{}'", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    /// 1-based line number in the decoded report.
    pub line: usize,
    #[serde(flatten)]
    pub reason: SkipReason,
    pub raw: String,
}

/// Result of classifying a single data row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Amount(f64),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub gross_total: f64,
    pub total: f64,
    pub tax_rate: TaxRate,
    pub rows_counted: usize,
    pub skipped: Vec<SkippedRow>,
    /// Set when a named column was requested and no row carried that header.
    pub column_missing: bool,
}

impl Extraction {
    fn empty(tax_rate: TaxRate) -> Self {
        Self {
            gross_total: 0.0,
            total: 0.0,
            tax_rate,
            rows_counted: 0,
            skipped: Vec::new(),
            column_missing: false,
        }
    }
}

/// Split on every line boundary a text report may carry: `\n`, `\r\n`, a
/// bare `\r`, the vertical tab and form feed, the file/group/record
/// separators, NEL and the Unicode line and paragraph separators.
///
/// A trailing terminator does not produce an extra empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }

        lines.push(&text[start..offset]);
        start = offset + c.len_utf8();

        if c == '\r' {
            if let Some(&(next, '\n')) = chars.peek() {
                chars.next();
                start = next + 1;
            }
        }
    }

    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Strip quotes and padding, then switch the decimal comma to a point.
pub fn normalize_amount(field: &str) -> String {
    field
        .trim()
        .trim_matches('"')
        .trim()
        .replace(',', ".")
}

pub fn parse_amount(field: &str) -> Option<f64> {
    normalize_amount(field)
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Sums the amount column of a delimited production report.
pub struct TotalExtractor<'a> {
    decoder: ReportDecoder,
    delimiter: char,
    footer_marker: String,
    max_size: Option<u64>,
    on_unparseable: Option<Box<dyn FnMut(&SkippedRow) + 'a>>,
}

impl<'a> TotalExtractor<'a> {
    pub fn new() -> Self {
        Self {
            decoder: ReportDecoder::new(),
            delimiter: DEFAULT_DELIMITER,
            footer_marker: DEFAULT_FOOTER_MARKER.to_string(),
            max_size: None,
            on_unparseable: None,
        }
    }

    pub fn with_decoder(mut self, decoder: ReportDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_footer_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.footer_marker = marker.into().to_uppercase();
        self
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Register a hook called for each row whose amount fails to parse.
    pub fn with_diagnostics<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&SkippedRow) + 'a,
    {
        self.on_unparseable = Some(Box::new(hook));
        self
    }

    pub fn decoder(&self) -> &ReportDecoder {
        &self.decoder
    }

    pub fn extract(
        &mut self,
        bytes: &[u8],
        column: &ColumnSelector,
        tax_rate: TaxRate,
    ) -> Result<Extraction> {
        if let Some(max_size) = self.max_size {
            let size = bytes.len() as u64;
            if size > max_size {
                return Err(ProdTotalError::FileTooLarge { size, max_size });
            }
        }

        let text = self.decoder.decode(bytes)?;
        let lines = split_lines(&text);

        let (first_data_line, index) = match column {
            ColumnSelector::Index(index) => (1, *index),
            ColumnSelector::Name(name) => match self.locate_header(&lines, name) {
                Some((header_line, index)) => (header_line + 1, index),
                None => {
                    tracing::warn!(column = %name, "amount column not found in report header");
                    let mut extraction = Extraction::empty(tax_rate);
                    extraction.column_missing = true;
                    return Ok(extraction);
                }
            },
        };

        let mut extraction = Extraction::empty(tax_rate);

        for (offset, line) in lines.iter().enumerate().skip(first_data_line) {
            match self.classify_row(line, index) {
                RowOutcome::Amount(value) => {
                    extraction.gross_total += value;
                    extraction.rows_counted += 1;
                }
                RowOutcome::Skipped(reason) => {
                    let skipped = SkippedRow {
                        line: offset + 1,
                        reason,
                        raw: line.trim().to_string(),
                    };
                    tracing::debug!(line = skipped.line, reason = %skipped.reason, "row skipped");

                    if matches!(skipped.reason, SkipReason::Unparseable { .. }) {
                        if let Some(hook) = self.on_unparseable.as_mut() {
                            hook(&skipped);
                        }
                    }
                    extraction.skipped.push(skipped);
                }
            }
        }

        extraction.total = tax_rate.apply(extraction.gross_total);
        Ok(extraction)
    }

    pub fn classify_row(&self, line: &str, index: usize) -> RowOutcome {
        let line = line.trim();
        if line.is_empty() {
            return RowOutcome::Skipped(SkipReason::Empty);
        }

        if line.to_uppercase().contains(&self.footer_marker) {
            return RowOutcome::Skipped(SkipReason::TotalRow);
        }

        let fields: Vec<&str> = line.split(self.delimiter).collect();
        let Some(field) = fields.get(index) else {
            return RowOutcome::Skipped(SkipReason::TooFewFields {
                found: fields.len(),
                needed: index + 1,
            });
        };

        match parse_amount(field) {
            Some(value) => RowOutcome::Amount(value),
            None => RowOutcome::Skipped(SkipReason::Unparseable {
                value: field.to_string(),
            }),
        }
    }

    fn locate_header(&self, lines: &[&str], name: &str) -> Option<(usize, usize)> {
        let wanted = name.trim().to_lowercase();

        lines.iter().enumerate().find_map(|(line_index, line)| {
            line.split(self.delimiter)
                .position(|field| field.trim().trim_matches('"').trim().to_lowercase() == wanted)
                .map(|column| (line_index, column))
        })
    }
}

impl Default for TotalExtractor<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sum the selected column of `bytes` and apply `tax_rate`.
pub fn extract_total(bytes: &[u8], column: &ColumnSelector, tax_rate: f64) -> Result<f64> {
    let tax_rate = TaxRate::new(tax_rate)?;
    TotalExtractor::new()
        .extract(bytes, column, tax_rate)
        .map(|extraction| extraction.total)
}
