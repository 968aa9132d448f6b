//! # BOR P&L Report
//!
//! A library for flattening a nested back-office-record (BOR) statement export
//! into flat position and P&L tables, and reconciling them into a single
//! historical P&L report.
//!
//! ## Core Concepts
//!
//! - **Balance class**: a named category of balances in the export (ownership,
//!   realized P&L, realized amortization, corporate action income)
//! - **Balance key**: the nested identity of a balance. Plain keys carry no
//!   attribution; detailed keys chain to the originating balance, which yields
//!   the contributor and the impact date
//! - **Correlation**: the four extracted tables are joined on their shared
//!   identity (portfolio, instrument, lot, contributor, date, and for income
//!   also event and unit)
//! - **Reconciliation**: report rows without realized P&L or income are dropped
//!
//! ## Example
//!
//! ```rust,ignore
//! use bor_pl_report::*;
//!
//! let text = std::fs::read_to_string("input/BOR_statement_Historical_PL.json")?;
//! let statement = parse_statement(&text)?;
//! let output = process_statement(&statement);
//!
//! for row in output.historical_pl.rows() {
//!     println!("{} {} {} {}", row.portfolio, row.instrument, row.event, row.clean_realized_pl);
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod extract;
pub mod merge;
pub mod output;
pub mod reconcile;
pub mod rows;
pub mod schema;
pub mod table;
pub mod view;

pub use aggregate::aggregate_by_grain;
pub use config::{ExtractionSettings, OutputPaths, ReportConfig};
pub use error::{BorReportError, Result};
pub use extract::{extract_or_skip, BalanceExtractor, Extraction, ExtractionDiagnostic};
pub use merge::{correlate, full_outer_join, left_join, Joined};
pub use output::{write_report_tables, write_table, write_table_to_path};
pub use reconcile::{has_economic_effect, retain_economic_rows};
pub use rows::*;
pub use schema::{BalanceKey, BalanceRecord, BorStatement};
pub use table::Table;
pub use view::render_table;

use log::{debug, info};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub beneficial_owner_securities: Table<BeneficialOwnerRow>,
    pub realized_pl: Table<RealizedPlRow>,
    pub realized_amortization: Table<RealizedAmortizationRow>,
    pub ca_income: Table<CaIncomeRow>,
    /// All classes joined, before aggregation.
    pub merged: Table<MergedRow>,
    /// The final, reconciled report.
    pub historical_pl: Table<ReportRow>,
    pub diagnostics: Vec<ExtractionDiagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSummary {
    pub rows: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub beneficial_owner_securities: ClassSummary,
    pub realized_pl: ClassSummary,
    pub realized_amortization: ClassSummary,
    pub ca_income: ClassSummary,
    pub merged_rows: usize,
    pub report_rows: usize,
}

impl ReportOutput {
    pub fn summary(&self) -> RunSummary {
        let class = |rows: usize, balance_class: &str| ClassSummary {
            rows,
            dropped: self
                .diagnostics
                .iter()
                .filter(|d| d.balance_class == balance_class)
                .count(),
        };

        RunSummary {
            beneficial_owner_securities: class(
                self.beneficial_owner_securities.len(),
                schema::BENEFICIAL_OWNER_SECURITIES,
            ),
            realized_pl: class(self.realized_pl.len(), schema::REALIZED_PL),
            realized_amortization: class(
                self.realized_amortization.len(),
                schema::REALIZED_AMORTIZATION,
            ),
            ca_income: class(self.ca_income.len(), schema::CA_INCOME),
            merged_rows: self.merged.len(),
            report_rows: self.historical_pl.len(),
        }
    }
}

pub struct BorReportProcessor {
    settings: ExtractionSettings,
}

impl Default for BorReportProcessor {
    fn default() -> Self {
        Self::new(ExtractionSettings::default())
    }
}

impl BorReportProcessor {
    pub fn new(settings: ExtractionSettings) -> Self {
        Self { settings }
    }

    /// Runs the whole pipeline over a parsed statement.
    ///
    /// Never fails: records that cannot be read are reported in
    /// [`ReportOutput::diagnostics`] and left out of every table.
    pub fn process(&self, statement: &BorStatement) -> ReportOutput {
        debug!(
            "Statement contains {} balance classes",
            statement.balances_by_account_class.len()
        );

        let extractor = BalanceExtractor::new(&self.settings);
        let ownership = extractor.beneficial_owner_securities(statement);
        let realized_pl = extractor.realized_pl(statement);
        let amortization = extractor.realized_amortization(statement);
        let income = extractor.ca_income(statement);

        let mut diagnostics = ownership.diagnostics;
        diagnostics.extend(realized_pl.diagnostics);
        diagnostics.extend(amortization.diagnostics);
        diagnostics.extend(income.diagnostics);

        let beneficial_owner_securities = Table::from_rows(ownership.rows);
        let realized_pl = Table::from_rows(realized_pl.rows);
        let realized_amortization = Table::from_rows(amortization.rows);
        let ca_income = Table::from_rows(income.rows);

        let merged = correlate(
            &beneficial_owner_securities,
            &realized_pl,
            &realized_amortization,
            &ca_income,
        );
        let historical_pl = retain_economic_rows(aggregate_by_grain(&merged));

        let output = ReportOutput {
            beneficial_owner_securities,
            realized_pl,
            realized_amortization,
            ca_income,
            merged,
            historical_pl,
            diagnostics,
        };

        let summary = output.summary();
        info!(
            "Historical P&L: {} report rows from {} merged rows ({} records dropped)",
            summary.report_rows,
            summary.merged_rows,
            output.diagnostics.len()
        );

        output
    }

    /// Reads, parses and processes a statement file.
    pub fn process_file(&self, path: impl AsRef<Path>) -> Result<ReportOutput> {
        let path = path.as_ref();
        info!("Reading BOR statement from {}", path.display());
        let file = File::open(path)?;
        let statement = BorStatement::from_reader(BufReader::new(file))?;
        Ok(self.process(&statement))
    }
}

pub fn parse_statement(text: &str) -> Result<BorStatement> {
    BorStatement::from_json_str(text)
}

pub fn process_statement(statement: &BorStatement) -> ReportOutput {
    BorReportProcessor::default().process(statement)
}
