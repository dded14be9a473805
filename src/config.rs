use crate::error::{ProdTotalError, Result};
use crate::extractor::decoder::{ReportDecoder, DEFAULT_ENCODING};
use crate::extractor::total_extractor::{DEFAULT_DELIMITER, DEFAULT_FOOTER_MARKER};
use crate::extractor::{ColumnSelector, TaxRate, TotalExtractor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub report: ReportConfig,
    pub tax: TaxConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    pub encoding: String,
    pub delimiter: char,
    pub footer_marker: String,
    pub column: ColumnSelector,
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TaxConfig {
    pub apply: bool,
    pub rate: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub convenio_folder: String,
    pub unidade_folder: String,
    pub extensions: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            encoding: DEFAULT_ENCODING.to_string(),
            delimiter: DEFAULT_DELIMITER,
            footer_marker: DEFAULT_FOOTER_MARKER.to_string(),
            column: ColumnSelector::Index(1),
            max_file_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self {
            apply: true,
            rate: TaxRate::LAB_DEFAULT.value(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("reports"),
            convenio_folder: "convenio".to_string(),
            unidade_folder: "unidade".to_string(),
            extensions: vec!["csv".to_string()],
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ProdTotalError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ProdTotalError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ProdTotalError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["prodtotal.toml", ".prodtotal.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref column) = cli_args.column {
            self.report.column = column.clone();
        }

        if let Some(ref encoding) = cli_args.encoding {
            self.report.encoding = encoding.clone();
        }

        if let Some(rate) = cli_args.tax_rate {
            self.tax.apply = true;
            self.tax.rate = rate;
        }

        if cli_args.no_tax {
            self.tax.apply = false;
        }

        if let Some(ref root) = cli_args.storage_root {
            self.storage.root = root.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        ReportDecoder::for_label(&self.report.encoding)?;

        if self.report.delimiter == ',' || self.report.delimiter == '"' {
            return Err(ProdTotalError::Config {
                message: format!(
                    "Delimiter '{}' clashes with decimal commas or quoting",
                    self.report.delimiter
                ),
            });
        }

        if self.report.footer_marker.trim().is_empty() {
            return Err(ProdTotalError::Config {
                message: "Footer marker cannot be empty".to_string(),
            });
        }

        if let ColumnSelector::Name(ref name) = self.report.column {
            if name.trim().is_empty() {
                return Err(ProdTotalError::InvalidColumn {
                    message: "column name cannot be empty".to_string(),
                });
            }
        }

        if self.report.max_file_size == 0 {
            return Err(ProdTotalError::Config {
                message: "Maximum file size must be greater than 0".to_string(),
            });
        }

        TaxRate::new(self.tax.rate)?;

        if self.storage.convenio_folder.trim().is_empty()
            || self.storage.unidade_folder.trim().is_empty()
        {
            return Err(ProdTotalError::Config {
                message: "Storage folder ids cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Rate actually applied, honoring `tax.apply`.
    pub fn effective_tax_rate(&self) -> Result<TaxRate> {
        if self.tax.apply {
            TaxRate::new(self.tax.rate)
        } else {
            Ok(TaxRate::NONE)
        }
    }

    /// Extractor configured from `[report]`.
    pub fn build_extractor<'a>(&self) -> Result<TotalExtractor<'a>> {
        Ok(TotalExtractor::new()
            .with_decoder(ReportDecoder::for_label(&self.report.encoding)?)
            .with_delimiter(self.report.delimiter)
            .with_footer_marker(self.report.footer_marker.clone())
            .with_max_size(self.report.max_file_size))
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub column: Option<ColumnSelector>,
    pub encoding: Option<String>,
    pub tax_rate: Option<f64>,
    pub no_tax: bool,
    pub storage_root: Option<PathBuf>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, column: Option<ColumnSelector>) -> Self {
        self.column = column;
        self
    }

    pub fn with_encoding(mut self, encoding: Option<String>) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_tax_rate(mut self, rate: Option<f64>) -> Self {
        self.tax_rate = rate;
        self
    }

    pub fn with_no_tax(mut self, no_tax: bool) -> Self {
        self.no_tax = no_tax;
        self
    }

    pub fn with_storage_root(mut self, root: Option<PathBuf>) -> Self {
        self.storage_root = root;
        self
    }
}
