pub mod decoder;
pub mod total_extractor;

pub use decoder::ReportDecoder;
pub use total_extractor::{
    extract_total, normalize_amount, parse_amount, ColumnSelector, Extraction, RowOutcome,
    SkipReason, SkippedRow, TaxRate, TotalExtractor,
};
