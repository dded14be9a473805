use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProdTotalError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Report could not be decoded as {encoding}")]
    Decode { encoding: String },

    #[error("Unknown text encoding: {label}")]
    UnknownEncoding { label: String },

    #[error("Tax rate must be in [0, 1), got {rate}")]
    InvalidTaxRate { rate: f64 },

    #[error("Invalid column selector: {message}")]
    InvalidColumn { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Report not found: {folder}/{file_id}")]
    ReportNotFound { folder: String, file_id: String },

    #[error("Report already exists: {path}")]
    ReportExists { path: String },

    #[error("Storage folder not found: {folder}")]
    FolderNotFound { folder: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("File too large: {size} bytes (max: {max_size} bytes)")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("Operation was cancelled by user")]
    Cancelled,
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for ProdTotalError {
    fn user_message(&self) -> String {
        match self {
            ProdTotalError::Decode { encoding } => {
                format!("The report is not valid {} text", encoding)
            }
            ProdTotalError::UnknownEncoding { label } => {
                format!("Unknown report encoding: {}", label)
            }
            ProdTotalError::InvalidTaxRate { rate } => {
                format!("Invalid tax rate {} (expected a fraction such as 0.0986)", rate)
            }
            ProdTotalError::InvalidColumn { message } => {
                format!("Invalid amount column: {}", message)
            }
            ProdTotalError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            ProdTotalError::ReportNotFound { folder, file_id } => {
                format!("Report '{}' not found in folder '{}'", file_id, folder)
            }
            ProdTotalError::ReportExists { path } => {
                format!("A report with the same name is already stored: {}", path)
            }
            ProdTotalError::FolderNotFound { folder } => {
                format!("Storage folder does not exist: {}", folder)
            }
            ProdTotalError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            ProdTotalError::FileTooLarge { size, max_size } => {
                format!(
                    "File too large: {} (maximum allowed: {})",
                    format_bytes(*size),
                    format_bytes(*max_size)
                )
            }
            ProdTotalError::Cancelled => "Operation was cancelled by user".to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            ProdTotalError::Decode { .. } => Some(
                "Export the report again from the billing system, or set [report].encoding in the configuration file.".to_string()
            ),
            ProdTotalError::UnknownEncoding { .. } => Some(
                "Use a WHATWG encoding label such as windows-1252 or iso-8859-1.".to_string()
            ),
            ProdTotalError::InvalidTaxRate { .. } => Some(
                "Pass --tax-rate with a value between 0 (inclusive) and 1 (exclusive), or --no-tax.".to_string()
            ),
            ProdTotalError::InvalidColumn { .. } => Some(
                "Use --column with a zero-based index or --column-name with the header text (e.g. \"Bruto Fat.\").".to_string()
            ),
            ProdTotalError::Config { .. } => Some(
                "Check your configuration file syntax, or regenerate it with --generate-config.".to_string()
            ),
            ProdTotalError::ReportNotFound { .. } => Some(
                "Run `prodtotal list --kind <KIND>` to see the stored reports.".to_string()
            ),
            ProdTotalError::ReportExists { .. } => Some(
                "Rename the file before submitting it, or use --force to replace the stored copy.".to_string()
            ),
            ProdTotalError::FolderNotFound { .. } => Some(
                "Check [storage].root and the folder names in the configuration file.".to_string()
            ),
            ProdTotalError::FileTooLarge { .. } => Some(
                "Increase [report].max_file_size in the configuration file.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ProdTotalError {
    fn from(error: toml::de::Error) -> Self {
        ProdTotalError::Config {
            message: error.to_string(),
        }
    }
}

impl From<regex::Error> for ProdTotalError {
    fn from(error: regex::Error) -> Self {
        ProdTotalError::Config {
            message: format!("Invalid listing pattern: {}", error),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProdTotalError>;

pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_friendly_messages() {
        let error = ProdTotalError::InvalidTaxRate { rate: 1.5 };
        assert!(error.user_message().contains("Invalid tax rate"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(500), "500 B");
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_error = toml::from_str::<toml::Value>("not = [valid").unwrap_err();
        let error = ProdTotalError::from(toml_error);
        assert!(matches!(error, ProdTotalError::Config { .. }));
    }

    #[test]
    fn test_cancelled_has_no_suggestion() {
        assert!(ProdTotalError::Cancelled.suggestion().is_none());
    }
}
