pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod report;
pub mod storage;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, Command, OutputFormat};
pub use config::{CliOverrides, Config, ReportConfig, StorageConfig, TaxConfig};
pub use error::{ProdTotalError, Result, UserFriendlyError};

// Core functionality re-exports
pub use extractor::{
    extract_total, ColumnSelector, Extraction, ReportDecoder, RowOutcome, SkipReason, SkippedRow,
    TaxRate, TotalExtractor,
};
pub use report::AnalysisReport;
pub use storage::{FolderRouter, ListingFilter, LocalFolderStore, ReportKind, ReportStore, StoredReport};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use std::path::{Path, PathBuf};
use std::time::Instant;

/// Main library interface: analysis plus report filing.
pub struct ProdTotal {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
    store: LocalFolderStore,
    router: FolderRouter,
}

/// Result of analyzing several local files.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub reports: Vec<AnalysisReport>,
    pub failures: Vec<(PathBuf, ProdTotalError)>,
}

/// Result of `submit`: the analysis always runs, the upload may still fail.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub report: AnalysisReport,
    pub upload: Result<String>,
}

impl ProdTotal {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let shutdown = GracefulShutdown::new()?;
        Ok(Self::with_shutdown(config, output_mode, verbose, quiet, shutdown))
    }

    /// Create an instance without installing the Ctrl+C handler.
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self::with_shutdown(config, output_mode, verbose, quiet, GracefulShutdown::new_for_test())
    }

    fn with_shutdown(
        config: Config,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
        shutdown: GracefulShutdown,
    ) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let store = LocalFolderStore::new(config.storage.root.clone());
        let router = FolderRouter::from_config(&config.storage);

        Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
            store,
            router,
        }
    }

    /// Create ProdTotal instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        let prodtotal = Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)?;

        let overwrite = matches!(cli_args.command, Some(Command::Submit { force: true, .. }));
        Ok(prodtotal.with_overwrite(overwrite))
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.store = self.store.with_overwrite(overwrite);
        self
    }

    /// Analyze report bytes obtained from any source.
    pub fn analyze_bytes(&self, source: &str, bytes: &[u8], kind: ReportKind) -> Result<AnalysisReport> {
        let formatter = &self.output_formatter;
        let column = self.config.report.column.clone();
        let tax_rate = self.config.effective_tax_rate()?;

        let mut extractor = self.config.build_extractor()?.with_diagnostics(|row: &SkippedRow| {
            formatter.debug(&format!("{}: line {}: {}", source, row.line, row.reason));
        });
        let encoding = extractor.decoder().encoding_name();

        let extraction = extractor.extract(bytes, &column, tax_rate)?;
        tracing::info!(
            source,
            total = extraction.total,
            rows = extraction.rows_counted,
            skipped = extraction.skipped.len(),
            "report analyzed"
        );

        Ok(AnalysisReport::new(source, kind, column, encoding, extraction))
    }

    pub fn analyze_file(&self, path: &Path, kind: ReportKind, preview: bool) -> Result<AnalysisReport> {
        let bytes = self.read_report(path)?;
        let source = display_name(path);

        if preview {
            self.print_preview(&source, &bytes)?;
        }

        self.analyze_bytes(&source, &bytes, kind)
    }

    /// Analyze each file in turn, stopping early on Ctrl+C.
    pub fn analyze_files(&self, paths: &[PathBuf], kind: ReportKind, preview: bool) -> Result<BatchOutcome> {
        let start_time = Instant::now();
        let progress = self.progress_manager.create_file_progress(paths.len() as u64);
        let mut outcome = BatchOutcome::default();

        for path in paths {
            self.shutdown.check_shutdown()?;
            progress.set_message(display_name(path));

            let result = self
                .progress_manager
                .suspend(|| self.analyze_file(path, kind, preview));

            match result {
                Ok(report) => outcome.reports.push(report),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "report analysis failed");
                    outcome.failures.push((path.clone(), e));
                }
            }
            progress.inc(1);
        }

        ui::progress::finish_progress_with_summary(
            &progress,
            &format!("Analyzed {} reports", outcome.reports.len()),
            start_time.elapsed(),
        );

        Ok(outcome)
    }

    /// Analyze a report and file it in the folder for `kind`.
    pub fn submit(&self, path: &Path, kind: ReportKind, preview: bool) -> Result<SubmitOutcome> {
        let mut report = self.analyze_file(path, kind, preview)?;
        self.shutdown.check_shutdown()?;

        let folder = self.router.folder_for(kind);
        self.announce_store();
        self.output_formatter
            .start_operation(&format!("Uploading {} to folder {}", report.source, folder));

        let spinner = self.progress_manager.create_spinner("Uploading report...");
        let upload = self.store.upload_file(folder, path);
        spinner.finish_and_clear();

        if let Ok(ref file_id) = upload {
            report.stored_as = Some(file_id.clone());
        }

        Ok(SubmitOutcome { report, upload })
    }

    /// Stored reports for `kind`, newest first.
    pub fn list_reports(&self, kind: ReportKind, pattern: Option<&str>) -> Result<Vec<StoredReport>> {
        let filter = ListingFilter::new(&self.config.storage).with_pattern(pattern)?;
        let folder = self.router.folder_for(kind);
        self.announce_store();

        let reports = self
            .store
            .list(folder)?
            .into_iter()
            .filter(|report| filter.is_report_file(Path::new(&report.name)))
            .collect();

        Ok(reports)
    }

    /// Download a stored report, optionally keep a local copy, and analyze it.
    pub fn fetch(
        &self,
        file_id: &str,
        kind: ReportKind,
        save_to: Option<&Path>,
        preview: bool,
    ) -> Result<AnalysisReport> {
        let folder = self.router.folder_for(kind);
        self.announce_store();
        self.output_formatter
            .start_operation(&format!("Downloading {} from folder {}", file_id, folder));

        let spinner = self.progress_manager.create_spinner("Downloading report...");
        let bytes = self.store.download(folder, file_id);
        spinner.finish_and_clear();
        let bytes = bytes?;

        if let Some(path) = save_to {
            std::fs::write(path, &bytes)?;
            self.output_formatter
                .success(&format!("Saved a copy to {}", path.display()));
        }

        if preview {
            self.print_preview(file_id, &bytes)?;
        }

        let mut report = self.analyze_bytes(file_id, &bytes, kind)?;
        report.stored_as = Some(file_id.to_string());
        Ok(report)
    }

    fn announce_store(&self) {
        self.output_formatter
            .info(&format!("Report store: {}", self.store.root().display()));
    }

    fn read_report(&self, path: &Path) -> Result<Vec<u8>> {
        if !path.is_file() {
            return Err(ProdTotalError::InvalidPath {
                path: format!("Report file does not exist: {}", path.display()),
            });
        }

        let size = std::fs::metadata(path)?.len();
        let max_size = self.config.report.max_file_size;
        if size > max_size {
            return Err(ProdTotalError::FileTooLarge { size, max_size });
        }

        Ok(std::fs::read(path)?)
    }

    fn print_preview(&self, source: &str, bytes: &[u8]) -> Result<()> {
        let decoder = ReportDecoder::for_label(&self.config.report.encoding)?;
        let text = decoder.decode(bytes)?;
        self.output_formatter.print_preview(source, &text);
        Ok(())
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn folder_for(&self, kind: ReportKind) -> &str {
        self.router.folder_for(kind)
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &ProdTotalError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const REPORT: &[u8] = b"Nome;Valor\nA;100,00\nB;200,50\nTOTAL;300,50\n";

    fn prodtotal_in(temp_dir: &TempDir) -> ProdTotal {
        let mut config = Config::default();
        config.storage.root = temp_dir.path().join("store");
        ProdTotal::new_for_test(config, OutputMode::Plain, 0, true)
    }

    fn write_report(temp_dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = temp_dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_analyze_file_applies_default_tax() {
        let temp_dir = TempDir::new().unwrap();
        let prodtotal = prodtotal_in(&temp_dir);
        let path = write_report(&temp_dir, "jan.csv", REPORT);

        let report = prodtotal.analyze_file(&path, ReportKind::Convenio, false).unwrap();
        assert_eq!(report.source, "jan.csv");
        assert!((report.gross_total - 300.50).abs() < 1e-9);
        assert!((report.total - 300.50 * 0.9014).abs() < 1e-9);
        assert_eq!(report.encoding, "windows-1252");
    }

    #[test]
    fn test_analyze_files_collects_failures() {
        let temp_dir = TempDir::new().unwrap();
        let prodtotal = prodtotal_in(&temp_dir);
        let good = write_report(&temp_dir, "jan.csv", REPORT);
        let missing = temp_dir.path().join("missing.csv");

        let outcome = prodtotal
            .analyze_files(&[good, missing], ReportKind::Unidade, false)
            .unwrap();
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(outcome.failures[0].1, ProdTotalError::InvalidPath { .. }));
    }

    #[test]
    fn test_analyze_files_stops_on_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let prodtotal = prodtotal_in(&temp_dir);
        let path = write_report(&temp_dir, "jan.csv", REPORT);

        prodtotal.shutdown.request_shutdown();
        let result = prodtotal.analyze_files(&[path], ReportKind::Convenio, false);
        assert!(matches!(result, Err(ProdTotalError::Cancelled)));
    }

    #[test]
    fn test_submit_list_fetch_round() {
        let temp_dir = TempDir::new().unwrap();
        let prodtotal = prodtotal_in(&temp_dir);
        let path = write_report(&temp_dir, "fev.csv", REPORT);

        let outcome = prodtotal.submit(&path, ReportKind::Unidade, false).unwrap();
        assert_eq!(outcome.upload.as_deref().unwrap(), "fev.csv");
        assert_eq!(outcome.report.stored_as.as_deref(), Some("fev.csv"));
        assert!(temp_dir.path().join("store").join("unidade").join("fev.csv").exists());

        let listed = prodtotal.list_reports(ReportKind::Unidade, None).unwrap();
        assert_eq!(listed.len(), 1);

        let copy = temp_dir.path().join("copy.csv");
        let fetched = prodtotal
            .fetch("fev.csv", ReportKind::Unidade, Some(&copy), false)
            .unwrap();
        assert!((fetched.total - outcome.report.total).abs() < 1e-9);
        assert_eq!(fs::read(copy).unwrap(), REPORT);
    }

    #[test]
    fn test_submit_twice_keeps_analysis() {
        let temp_dir = TempDir::new().unwrap();
        let prodtotal = prodtotal_in(&temp_dir);
        let path = write_report(&temp_dir, "mar.csv", REPORT);

        prodtotal.submit(&path, ReportKind::Convenio, false).unwrap();
        let second = prodtotal.submit(&path, ReportKind::Convenio, false).unwrap();

        assert!(matches!(second.upload, Err(ProdTotalError::ReportExists { .. })));
        assert!(second.report.stored_as.is_none());
        assert!(second.report.total > 0.0);

        let prodtotal = prodtotal.with_overwrite(true);
        assert!(prodtotal.submit(&path, ReportKind::Convenio, false).unwrap().upload.is_ok());
    }

    #[test]
    fn test_list_filters_by_pattern() {
        let temp_dir = TempDir::new().unwrap();
        let prodtotal = prodtotal_in(&temp_dir);
        for name in ["producao_2024_01.csv", "producao_2023_12.csv"] {
            let path = write_report(&temp_dir, name, REPORT);
            prodtotal.submit(&path, ReportKind::Convenio, false).unwrap();
        }
        prodtotal.store.upload("convenio", "notes.txt", b"x").unwrap();

        let all = prodtotal.list_reports(ReportKind::Convenio, None).unwrap();
        assert_eq!(all.len(), 2);

        let filtered = prodtotal
            .list_reports(ReportKind::Convenio, Some("2024"))
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "producao_2024_01.csv");
    }

    #[test]
    fn test_file_size_limit() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.report.max_file_size = 8;
        let prodtotal = ProdTotal::new_for_test(config, OutputMode::Plain, 0, true);
        let path = write_report(&temp_dir, "big.csv", REPORT);

        let result = prodtotal.analyze_file(&path, ReportKind::Convenio, false);
        assert!(matches!(result, Err(ProdTotalError::FileTooLarge { .. })));
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        ProdTotal::generate_sample_config(&config_path).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[report]"));
        assert!(content.contains("[tax]"));
        assert!(content.contains("[storage]"));
    }

    #[test]
    fn test_version_info() {
        assert!(!version_info().is_empty());
    }
}
