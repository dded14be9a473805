use clap::Parser;
use prodtotal::{
    logging, AnalysisReport, Cli, Command, OutputFormatter, OutputMode, ProdTotal, ProdTotalError,
    UserFriendlyError,
};
use std::process;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();
    logging::init(cli.verbosity_level(), cli.quiet);

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let prodtotal = match ProdTotal::from_cli(&cli) {
        Ok(prodtotal) => prodtotal,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    match cli.command {
        Some(ref command) => dispatch(&prodtotal, command),
        None => 0,
    }
}

fn dispatch(prodtotal: &ProdTotal, command: &Command) -> i32 {
    match command {
        Command::Analyze {
            files,
            analysis,
            preview,
        } => handle_analyze(prodtotal, files, analysis.kind, *preview),
        Command::Submit {
            file,
            analysis,
            preview,
            ..
        } => handle_submit(prodtotal, file, analysis.kind, *preview),
        Command::List { kind, pattern } => handle_list(prodtotal, *kind, pattern.as_deref()),
        Command::Fetch {
            file_id,
            analysis,
            save,
            preview,
        } => match prodtotal.fetch(file_id, analysis.kind, save.as_deref(), *preview) {
            Ok(report) => print_reports(prodtotal, &[report]),
            Err(e) => fail(prodtotal, &e),
        },
    }
}

fn handle_analyze(
    prodtotal: &ProdTotal,
    files: &[std::path::PathBuf],
    kind: prodtotal::ReportKind,
    preview: bool,
) -> i32 {
    let outcome = match prodtotal.analyze_files(files, kind, preview) {
        Ok(outcome) => outcome,
        Err(e) => return fail(prodtotal, &e),
    };

    let exit_code = print_reports(prodtotal, &outcome.reports);

    for (path, error) in &outcome.failures {
        prodtotal
            .output_formatter()
            .error(&format!("{}: {}", path.display(), error.user_message()));
    }

    match outcome.failures.first() {
        Some((_, first)) => exit_code_for(first),
        None => exit_code,
    }
}

fn handle_submit(
    prodtotal: &ProdTotal,
    file: &std::path::Path,
    kind: prodtotal::ReportKind,
    preview: bool,
) -> i32 {
    let outcome = match prodtotal.submit(file, kind, preview) {
        Ok(outcome) => outcome,
        Err(e) => return fail(prodtotal, &e),
    };

    let exit_code = print_reports(prodtotal, std::slice::from_ref(&outcome.report));

    match outcome.upload {
        Ok(file_id) => {
            prodtotal.output_formatter().success(&format!(
                "Stored {} in folder {}",
                file_id,
                prodtotal.folder_for(kind)
            ));
            exit_code
        }
        Err(e) => fail(prodtotal, &e),
    }
}

fn handle_list(prodtotal: &ProdTotal, kind: prodtotal::ReportKind, pattern: Option<&str>) -> i32 {
    match prodtotal.list_reports(kind, pattern) {
        Ok(reports) => {
            prodtotal
                .output_formatter()
                .print_listing(prodtotal.folder_for(kind), &reports);
            0
        }
        Err(e) => fail(prodtotal, &e),
    }
}

/// Prints each report and returns 2 when any of them carries warnings.
fn print_reports(prodtotal: &ProdTotal, reports: &[AnalysisReport]) -> i32 {
    prodtotal.output_formatter().print_analysis_reports(reports);

    if reports.iter().any(AnalysisReport::has_warnings) {
        2
    } else {
        0
    }
}

fn fail(prodtotal: &ProdTotal, error: &ProdTotalError) -> i32 {
    prodtotal.handle_error(error);
    exit_code_for(error)
}

fn exit_code_for(error: &ProdTotalError) -> i32 {
    match error {
        ProdTotalError::Cancelled => 130, // Interrupted (SIGINT)
        ProdTotalError::Decode { .. } | ProdTotalError::UnknownEncoding { .. } => 3,
        ProdTotalError::ReportNotFound { .. } | ProdTotalError::FolderNotFound { .. } => 4,
        ProdTotalError::InvalidTaxRate { .. }
        | ProdTotalError::InvalidColumn { .. }
        | ProdTotalError::InvalidPath { .. } => 5,
        ProdTotalError::ReportExists { .. } => 6,
        ProdTotalError::FileTooLarge { .. } => 7,
        _ => 1, // General error
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "prodtotal.toml".to_string());

    match ProdTotal::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  prodtotal analyze <report.csv> --config {}", config_path);
            println!("\nEdit the file to set the amount column, tax rate and storage folders.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn print_startup_error(error: &ProdTotalError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodtotal::Config;
    use std::fs;
    use tempfile::TempDir;

    fn quiet_prodtotal(temp_dir: &TempDir) -> ProdTotal {
        let mut config = Config::default();
        config.storage.root = temp_dir.path().join("store");
        ProdTotal::new_for_test(config, OutputMode::Plain, 0, true)
    }

    #[test]
    fn test_generate_config_command() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let cli = Cli::try_parse_from([
            "prodtotal",
            "--generate-config",
            "--config",
            config_path.to_str().unwrap(),
        ])
        .unwrap();

        let exit_code = handle_generate_config(&cli);
        assert_eq!(exit_code, 0);

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[tax]"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&ProdTotalError::Cancelled), 130);
        assert_eq!(
            exit_code_for(&ProdTotalError::Decode {
                encoding: "UTF-8".to_string()
            }),
            3
        );
        assert_eq!(
            exit_code_for(&ProdTotalError::ReportNotFound {
                folder: "convenio".to_string(),
                file_id: "x.csv".to_string()
            }),
            4
        );
        assert_eq!(exit_code_for(&ProdTotalError::InvalidTaxRate { rate: 1.5 }), 5);
        assert_eq!(
            exit_code_for(&ProdTotalError::Config {
                message: "bad".to_string()
            }),
            1
        );
    }

    #[test]
    fn test_analyze_exit_code_reflects_warnings() {
        let temp_dir = TempDir::new().unwrap();
        let prodtotal = quiet_prodtotal(&temp_dir);

        let clean = temp_dir.path().join("clean.csv");
        fs::write(&clean, "Nome;Valor\nA;10,00\n").unwrap();
        let noisy = temp_dir.path().join("noisy.csv");
        fs::write(&noisy, "Nome;Valor\nA;10,00\nB;n/d\n").unwrap();

        let command = Cli::try_parse_from(["prodtotal", "analyze", clean.to_str().unwrap()])
            .unwrap()
            .command
            .unwrap();
        assert_eq!(dispatch(&prodtotal, &command), 0);

        let command = Cli::try_parse_from(["prodtotal", "analyze", noisy.to_str().unwrap()])
            .unwrap()
            .command
            .unwrap();
        assert_eq!(dispatch(&prodtotal, &command), 2);
    }

    #[test]
    fn test_fetch_missing_report() {
        let temp_dir = TempDir::new().unwrap();
        let prodtotal = quiet_prodtotal(&temp_dir);
        fs::create_dir_all(temp_dir.path().join("store").join("convenio")).unwrap();

        let command = Cli::try_parse_from(["prodtotal", "fetch", "nope.csv"])
            .unwrap()
            .command
            .unwrap();
        assert_eq!(dispatch(&prodtotal, &command), 4);
    }
}
