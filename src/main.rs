use anyhow::{Context, Result};
use bor_pl_report::{
    render_table, write_report_tables, BorReportProcessor, BorStatement, OutputPaths,
    ReportConfig,
};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Builds the historical P&L report from a BOR statement export.
#[derive(Debug, Parser)]
#[command(name = "bor-report", author, version, about = "Flatten a BOR statement into historical P&L tables", long_about = None)]
struct Args {
    /// JSON configuration file. Defaults apply when omitted
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// BOR statement to read, overriding the configured input
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// Directory for all output tables, overriding the configured paths
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Print the final report to stdout after writing it
    #[arg(long = "show")]
    show: bool,

    /// Print the JSON schema of the accepted statement format and exit
    #[arg(long = "print-schema")]
    print_schema: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bor_pl_report=info,bor_report=info".into()),
        )
        .init();

    if let Err(e) = run(Args::parse()) {
        error!("Report failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    if args.print_schema {
        let schema = BorStatement::schema_as_json().context("failed to render statement schema")?;
        println!("{}", schema);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => ReportConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ReportConfig::default(),
    };
    if let Some(input) = args.input {
        config.input = input;
    }
    if let Some(dir) = args.output_dir {
        config.outputs = OutputPaths::in_dir(dir);
    }
    config.validate().context("invalid configuration")?;

    let processor = BorReportProcessor::new(config.extraction.clone());
    let output = processor
        .process_file(&config.input)
        .with_context(|| format!("failed to process {}", config.input.display()))?;

    let summary = output.summary();
    info!(
        "Extracted {} ownership, {} realized P&L, {} amortization and {} income rows",
        summary.beneficial_owner_securities.rows,
        summary.realized_pl.rows,
        summary.realized_amortization.rows,
        summary.ca_income.rows
    );

    write_report_tables(&output, &config.outputs).context("failed to write report tables")?;

    if args.show {
        print!("{}", render_table(&output.historical_pl));
    }

    info!(
        "Historical P&L written to {} ({} rows)",
        config.outputs.historical_pl.display(),
        summary.report_rows
    );
    Ok(())
}
