use crate::config::ExtractionSettings;
use crate::error::Result;
use crate::rows::{
    BeneficialOwnerRow, CaIncomeRow, Event, PositionKey, RealizedAmortizationRow, RealizedPlRow,
};
use crate::schema::{
    BalanceKey, BalanceRecord, BorStatement, Require, BENEFICIAL_OWNER_SECURITIES, CA_INCOME,
    REALIZED_AMORTIZATION, REALIZED_PL,
};
use log::{debug, warn};
use serde_json::Value;
use std::fmt;

const ORIGIN: &str = "balanceKey.originBalanceKey";
const ORIGIN_CONTRACT: &str = "balanceKey.originBalanceKey.contract";
const SECOND_ORIGIN: &str = "balanceKey.originBalanceKey.originBalanceKey";
const SECOND_ORIGIN_CONTRACT: &str = "balanceKey.originBalanceKey.originBalanceKey.contract";

/// A record that could not be turned into a row.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionDiagnostic {
    pub balance_class: String,
    /// Position of the record within its class.
    pub record_index: usize,
    pub message: String,
}

impl fmt::Display for ExtractionDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} record #{}: {}",
            self.balance_class, self.record_index, self.message
        )
    }
}

/// Rows of one balance class plus the records that were dropped on error.
#[derive(Debug, Clone)]
pub struct Extraction<R> {
    pub rows: Vec<R>,
    pub diagnostics: Vec<ExtractionDiagnostic>,
}

/// Runs `extract` on a single record.
///
/// `Ok(None)` from `extract` is a deliberate skip and produces neither a row
/// nor a diagnostic. Any error produces a diagnostic instead of a row.
pub fn extract_or_skip<R, F>(
    balance_class: &str,
    record_index: usize,
    value: &Value,
    extract: F,
) -> (Option<R>, Option<ExtractionDiagnostic>)
where
    F: Fn(&BalanceRecord) -> Result<Option<R>>,
{
    let outcome = BalanceRecord::from_value(value).and_then(|record| extract(&record));

    match outcome {
        Ok(Some(row)) => (Some(row), None),
        Ok(None) => {
            debug!("Skipping {} record #{}", balance_class, record_index);
            (None, None)
        }
        Err(e) => {
            let diagnostic = ExtractionDiagnostic {
                balance_class: balance_class.to_string(),
                record_index,
                message: e.to_string(),
            };
            warn!("Dropping {}", diagnostic);
            (None, Some(diagnostic))
        }
    }
}

/// Applies [`extract_or_skip`] to every record of a class, in source order.
pub fn extract_class<R, F>(statement: &BorStatement, balance_class: &str, extract: F) -> Extraction<R>
where
    F: Fn(&BalanceRecord) -> Result<Option<R>>,
{
    let records = statement.records(balance_class);
    let mut rows = Vec::with_capacity(records.len());
    let mut diagnostics = Vec::new();

    for (index, value) in records.iter().enumerate() {
        let (row, diagnostic) = extract_or_skip(balance_class, index, value, &extract);
        rows.extend(row);
        diagnostics.extend(diagnostic);
    }

    debug!(
        "Extracted {} rows from {} {} records ({} dropped)",
        rows.len(),
        records.len(),
        balance_class,
        diagnostics.len()
    );

    Extraction { rows, diagnostics }
}

/// Flattens balance records of each class into rows.
pub struct BalanceExtractor<'a> {
    settings: &'a ExtractionSettings,
}

impl<'a> BalanceExtractor<'a> {
    pub fn new(settings: &'a ExtractionSettings) -> Self {
        Self { settings }
    }

    pub fn beneficial_owner_securities(
        &self,
        statement: &BorStatement,
    ) -> Extraction<BeneficialOwnerRow> {
        extract_class(statement, BENEFICIAL_OWNER_SECURITIES, |record| {
            self.beneficial_owner_row(record)
        })
    }

    pub fn realized_pl(&self, statement: &BorStatement) -> Extraction<RealizedPlRow> {
        extract_class(statement, REALIZED_PL, |record| self.realized_pl_row(record))
    }

    pub fn realized_amortization(
        &self,
        statement: &BorStatement,
    ) -> Extraction<RealizedAmortizationRow> {
        extract_class(statement, REALIZED_AMORTIZATION, |record| {
            self.realized_amortization_row(record)
        })
    }

    pub fn ca_income(&self, statement: &BorStatement) -> Extraction<CaIncomeRow> {
        extract_class(statement, CA_INCOME, |record| self.ca_income_row(record))
    }

    pub fn beneficial_owner_row(&self, record: &BalanceRecord) -> Result<Option<BeneficialOwnerRow>> {
        let common = record.key.common();
        let lot = common.lot_opening_contract();

        if lot.external_system_instance_id.as_deref()
            == Some(self.settings.internal_system_instance_id.as_str())
        {
            return Ok(None);
        }

        let instrument = common
            .contract()?
            .display_label(&self.settings.display_label_type);

        let (contributor_id, date) = match &record.key {
            BalanceKey::Simple(_) => (String::new(), String::new()),
            BalanceKey::Detailed(detailed) => {
                let contributor = detailed
                    .origin
                    .contract(ORIGIN)?
                    .representation_id(ORIGIN_CONTRACT)?;
                (contributor.to_string(), detailed.impact_date())
            }
        };

        let unit = common.quantity_unit()?.to_string();
        let quantity = record.quantity()?;

        Ok(Some(BeneficialOwnerRow {
            portfolio: common.portfolio().to_string(),
            instrument,
            lot_id: lot.representation_id.clone(),
            contributor_id,
            event: Event::from_quantity(quantity),
            date,
            quantity: quantity.abs(),
            unit,
        }))
    }

    pub fn realized_pl_row(&self, record: &BalanceRecord) -> Result<Option<RealizedPlRow>> {
        let (key, realized_pl) = self.realized_position(record)?;
        Ok(Some(RealizedPlRow {
            portfolio: key.portfolio,
            instrument: key.instrument,
            lot_id: key.lot_id,
            contributor_id: key.contributor_id,
            date: key.date,
            realized_pl,
        }))
    }

    pub fn realized_amortization_row(
        &self,
        record: &BalanceRecord,
    ) -> Result<Option<RealizedAmortizationRow>> {
        let (key, realized_amortization) = self.realized_position(record)?;
        Ok(Some(RealizedAmortizationRow {
            portfolio: key.portfolio,
            instrument: key.instrument,
            lot_id: key.lot_id,
            contributor_id: key.contributor_id,
            date: key.date,
            realized_amortization,
        }))
    }

    pub fn ca_income_row(&self, record: &BalanceRecord) -> Result<Option<CaIncomeRow>> {
        let BalanceKey::Detailed(detailed) = &record.key else {
            return Ok(None);
        };
        let common = &detailed.common;

        let instrument = detailed
            .origin
            .contract(ORIGIN)?
            .display_label(&self.settings.display_label_type);

        let origin_contract = detailed.origin.origin(ORIGIN)?.contract(SECOND_ORIGIN)?;
        let contributor_id = origin_contract
            .external_id(SECOND_ORIGIN_CONTRACT)?
            .to_string();
        let event = origin_contract
            .taxonomy
            .as_deref()
            .require(&format!("{SECOND_ORIGIN_CONTRACT}.taxonomy"))?;

        let unit = common
            .contract()?
            .currency
            .as_ref()
            .require("balanceKey.contract.currency")?
            .iso4217_alpha
            .clone();

        Ok(Some(CaIncomeRow {
            portfolio: common.portfolio().to_string(),
            instrument,
            lot_id: common.lot_opening_contract().representation_id.clone(),
            contributor_id,
            event: Event::from_label(event),
            date: detailed.impact_date(),
            ca_income: record.quantity()?,
            unit,
        }))
    }

    /// Identity and measure of a realized balance. These reference the
    /// originating contract, one hop further along the origin chain than
    /// ownership balances do. The instrument is read for both key shapes.
    fn realized_position(&self, record: &BalanceRecord) -> Result<(PositionKey, f64)> {
        let common = record.key.common();

        let instrument = record
            .key
            .origin()
            .require(ORIGIN)?
            .contract(ORIGIN)?
            .display_label(&self.settings.display_label_type);

        let (contributor_id, date) = match &record.key {
            BalanceKey::Simple(_) => (String::new(), String::new()),
            BalanceKey::Detailed(detailed) => {
                let contributor = detailed
                    .origin
                    .origin(ORIGIN)?
                    .contract(SECOND_ORIGIN)?
                    .representation_id(SECOND_ORIGIN_CONTRACT)?;

                (contributor.to_string(), detailed.impact_date())
            }
        };

        let key = PositionKey {
            portfolio: common.portfolio().to_string(),
            instrument,
            lot_id: common.lot_opening_contract().representation_id.clone(),
            contributor_id,
            date,
        };

        Ok((key, record.quantity()?))
    }
}
