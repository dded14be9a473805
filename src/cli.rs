use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::extractor::{ColumnSelector, TaxRate};
use crate::storage::ReportKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "prodtotal")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sum production totals from lab billing CSV reports")]
#[command(
    long_about = "ProdTotal reads a production report exported by the billing system, sums the \
                  amount column (optionally net of tax) and files the report in the folder for \
                  its report type."
)]
#[command(after_help = "EXAMPLES:\n  \
    prodtotal analyze producao_jan.csv\n  \
    prodtotal analyze producao_jan.csv --column 3 --no-tax\n  \
    prodtotal analyze producao_jan.csv --column-name \"Bruto Fat.\" --tax-rate 9.86%\n  \
    prodtotal submit producao_jan.csv --kind unidade\n  \
    prodtotal list --kind convenio\n  \
    prodtotal fetch producao_jan.csv --kind convenio --save ./copia.csv")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file path
    #[arg(short, long, global = true, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Root directory of the report store
    #[arg(long, global = true, env = "PRODTOTAL_STORAGE_ROOT")]
    pub storage_root: Option<PathBuf>,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sum the amount column of one or more local reports
    Analyze {
        /// Report files (CSV)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Print the decoded report before the result
        #[arg(long)]
        preview: bool,
    },

    /// Analyze a report and store it in the folder for its kind
    Submit {
        /// Report file (CSV)
        file: PathBuf,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Replace a stored report with the same name
        #[arg(long)]
        force: bool,

        /// Print the decoded report before the result
        #[arg(long)]
        preview: bool,
    },

    /// List the reports stored for a kind
    List {
        #[arg(short, long, value_parser = parse_report_kind, default_value_t = ReportKind::Convenio)]
        kind: ReportKind,

        /// Only list file names matching this regular expression
        #[arg(long)]
        pattern: Option<String>,
    },

    /// Download a stored report and analyze it
    Fetch {
        /// File id as shown by `list`
        file_id: String,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Also save the downloaded report to this path
        #[arg(long)]
        save: Option<PathBuf>,

        /// Print the decoded report before the result
        #[arg(long)]
        preview: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    /// Report type, selects the storage folder
    #[arg(short, long, value_parser = parse_report_kind, default_value_t = ReportKind::Convenio)]
    pub kind: ReportKind,

    /// Zero-based index of the amount column
    #[arg(long, conflicts_with = "column_name")]
    pub column: Option<usize>,

    /// Header text of the amount column (e.g. "Bruto Fat.")
    #[arg(long)]
    pub column_name: Option<String>,

    /// Tax withheld from the total, as a fraction (0.0986) or percentage (9.86%)
    #[arg(long, value_parser = parse_tax_rate, conflicts_with = "no_tax")]
    pub tax_rate: Option<f64>,

    /// Report the gross total without tax
    #[arg(long)]
    pub no_tax: bool,

    /// Text encoding of the report file
    #[arg(long)]
    pub encoding: Option<String>,
}

impl AnalysisArgs {
    pub fn column_selector(&self) -> Option<ColumnSelector> {
        match (self.column, &self.column_name) {
            (Some(index), _) => Some(ColumnSelector::Index(index)),
            (None, Some(name)) => Some(ColumnSelector::Name(name.trim().to_string())),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        let overrides = CliOverrides::new().with_storage_root(self.storage_root.clone());

        match self.analysis_args() {
            Some(analysis) => overrides
                .with_column(analysis.column_selector())
                .with_encoding(analysis.encoding.clone())
                .with_tax_rate(analysis.tax_rate)
                .with_no_tax(analysis.no_tax),
            None => overrides,
        }
    }

    pub fn analysis_args(&self) -> Option<&AnalysisArgs> {
        match self.command.as_ref()? {
            Command::Analyze { analysis, .. }
            | Command::Submit { analysis, .. }
            | Command::Fetch { analysis, .. } => Some(analysis),
            Command::List { .. } => None,
        }
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

/// Accepts `convenio`, `unidade` or a form label such as `Convênio - Produção`.
pub fn parse_report_kind(s: &str) -> std::result::Result<ReportKind, String> {
    let label = s.trim().to_lowercase();
    if ["convênio", "convenio", "unidade"]
        .iter()
        .any(|known| label.contains(known))
    {
        Ok(ReportKind::from_label(&label))
    } else {
        Err(format!(
            "Unknown report type: {} (expected convenio or unidade)",
            s
        ))
    }
}

/// Accepts `0.0986`, `9.86%` or `9,86%`.
pub fn parse_tax_rate(s: &str) -> std::result::Result<f64, String> {
    let s = s.trim().replace(',', ".");

    let rate = match s.strip_suffix('%') {
        Some(percent) => {
            let value: f64 = percent
                .trim()
                .parse()
                .map_err(|_| format!("Invalid percentage: {}", s))?;
            value / 100.0
        }
        None => s
            .parse()
            .map_err(|_| format!("Invalid tax rate: {}", s))?,
    };

    TaxRate::new(rate)
        .map(TaxRate::value)
        .map_err(|e| e.to_string())
}
