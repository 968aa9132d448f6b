use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Kind of economic event a row describes.
///
/// Ownership rows only ever carry `Purchase` or `Sale`; corporate action income
/// carries whatever its taxonomy says.
#[derive(Debug, Clone)]
pub enum Event {
    Purchase,
    Sale,
    CorporateAction(String),
}

impl Event {
    pub fn from_label(label: &str) -> Self {
        match label {
            "Purchase" => Event::Purchase,
            "Sale" => Event::Sale,
            other => Event::CorporateAction(other.to_string()),
        }
    }

    /// Strictly positive quantities are purchases, everything else a sale.
    pub fn from_quantity(quantity: f64) -> Self {
        if quantity > 0.0 {
            Event::Purchase
        } else {
            Event::Sale
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Event::Purchase => "Purchase",
            Event::Sale => "Sale",
            Event::CorporateAction(label) => label,
        }
    }
}

// Equality and ordering go through the label so that a taxonomy value of
// "Purchase" is the same event as an ownership purchase.
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.label() == other.label()
    }
}

impl Eq for Event {}

impl Hash for Event {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label().hash(state);
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.label().cmp(other.label())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity shared by every balance class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey {
    pub portfolio: String,
    pub instrument: String,
    pub lot_id: String,
    pub contributor_id: String,
    pub date: String,
}

/// Position identity extended with event and unit, used to correlate income.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub portfolio: String,
    pub instrument: String,
    pub lot_id: String,
    pub contributor_id: String,
    pub event: Event,
    pub date: String,
    pub unit: String,
}

/// Reporting grain: lots are summed away.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Grain {
    pub portfolio: String,
    pub instrument: String,
    pub contributor_id: String,
    pub event: Event,
    pub date: String,
    pub unit: String,
}

/// A row type with a fixed column schema.
pub trait Tabular {
    const COLUMNS: &'static [&'static str];

    /// Cell values in [`Tabular::COLUMNS`] order.
    fn cells(&self) -> Vec<String>;
}

/// Renders a measure with a decimal point always present (`150.0`).
pub fn format_measure(value: f64) -> String {
    format!("{:?}", value)
}

fn format_optional(value: Option<f64>) -> String {
    value.map(format_measure).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
pub struct BeneficialOwnerRow {
    pub portfolio: String,
    pub instrument: String,
    pub lot_id: String,
    pub contributor_id: String,
    pub event: Event,
    pub date: String,
    pub quantity: f64,
    pub unit: String,
}

impl BeneficialOwnerRow {
    pub fn position_key(&self) -> PositionKey {
        PositionKey {
            portfolio: self.portfolio.clone(),
            instrument: self.instrument.clone(),
            lot_id: self.lot_id.clone(),
            contributor_id: self.contributor_id.clone(),
            date: self.date.clone(),
        }
    }
}

impl Tabular for BeneficialOwnerRow {
    const COLUMNS: &'static [&'static str] = &[
        "Portfolio",
        "Instrument",
        "Lot ID",
        "Contributor ID",
        "Event",
        "Date",
        "Quantity",
        "Unit",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.portfolio.clone(),
            self.instrument.clone(),
            self.lot_id.clone(),
            self.contributor_id.clone(),
            self.event.to_string(),
            self.date.clone(),
            format_measure(self.quantity),
            self.unit.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RealizedPlRow {
    pub portfolio: String,
    pub instrument: String,
    pub lot_id: String,
    pub contributor_id: String,
    pub date: String,
    pub realized_pl: f64,
}

impl RealizedPlRow {
    pub fn position_key(&self) -> PositionKey {
        PositionKey {
            portfolio: self.portfolio.clone(),
            instrument: self.instrument.clone(),
            lot_id: self.lot_id.clone(),
            contributor_id: self.contributor_id.clone(),
            date: self.date.clone(),
        }
    }
}

impl Tabular for RealizedPlRow {
    const COLUMNS: &'static [&'static str] = &[
        "Portfolio",
        "Instrument",
        "Lot ID",
        "Contributor ID",
        "Date",
        "Realized PL",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.portfolio.clone(),
            self.instrument.clone(),
            self.lot_id.clone(),
            self.contributor_id.clone(),
            self.date.clone(),
            format_measure(self.realized_pl),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RealizedAmortizationRow {
    pub portfolio: String,
    pub instrument: String,
    pub lot_id: String,
    pub contributor_id: String,
    pub date: String,
    pub realized_amortization: f64,
}

impl RealizedAmortizationRow {
    pub fn position_key(&self) -> PositionKey {
        PositionKey {
            portfolio: self.portfolio.clone(),
            instrument: self.instrument.clone(),
            lot_id: self.lot_id.clone(),
            contributor_id: self.contributor_id.clone(),
            date: self.date.clone(),
        }
    }
}

impl Tabular for RealizedAmortizationRow {
    const COLUMNS: &'static [&'static str] = &[
        "Portfolio",
        "Instrument",
        "Lot ID",
        "Contributor ID",
        "Date",
        "Realized Amortization",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.portfolio.clone(),
            self.instrument.clone(),
            self.lot_id.clone(),
            self.contributor_id.clone(),
            self.date.clone(),
            format_measure(self.realized_amortization),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaIncomeRow {
    pub portfolio: String,
    pub instrument: String,
    pub lot_id: String,
    pub contributor_id: String,
    pub event: Event,
    pub date: String,
    pub ca_income: f64,
    pub unit: String,
}

impl CaIncomeRow {
    pub fn event_key(&self) -> EventKey {
        EventKey {
            portfolio: self.portfolio.clone(),
            instrument: self.instrument.clone(),
            lot_id: self.lot_id.clone(),
            contributor_id: self.contributor_id.clone(),
            event: self.event.clone(),
            date: self.date.clone(),
            unit: self.unit.clone(),
        }
    }
}

impl Tabular for CaIncomeRow {
    const COLUMNS: &'static [&'static str] = &[
        "Portfolio",
        "Instrument",
        "Lot ID",
        "Contributor ID",
        "Event",
        "Date",
        "CA Income",
        "Unit",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.portfolio.clone(),
            self.instrument.clone(),
            self.lot_id.clone(),
            self.contributor_id.clone(),
            self.event.to_string(),
            self.date.clone(),
            format_measure(self.ca_income),
            self.unit.clone(),
        ]
    }
}

/// Realized P&L joined with its amortization, before ownership is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct RealizedPlDetail {
    pub key: PositionKey,
    pub realized_pl: f64,
    /// `None` when no amortization balance matched.
    pub realized_amortization: Option<f64>,
    pub clean_realized_pl: f64,
    pub amortized_realized_pl: f64,
}

impl Tabular for RealizedPlDetail {
    const COLUMNS: &'static [&'static str] = &[
        "Portfolio",
        "Instrument",
        "Lot ID",
        "Contributor ID",
        "Date",
        "Realized PL",
        "Realized Amortization",
        "Clean Realized PL",
        "Amortized Realized PL",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.key.portfolio.clone(),
            self.key.instrument.clone(),
            self.key.lot_id.clone(),
            self.key.contributor_id.clone(),
            self.key.date.clone(),
            format_measure(self.realized_pl),
            format_optional(self.realized_amortization),
            format_measure(self.clean_realized_pl),
            format_measure(self.amortized_realized_pl),
        ]
    }
}

/// Union of all four balance classes on their shared identity.
///
/// Measures stay `None` where no row of that class matched, so an absent
/// balance is distinguishable from an explicit zero until aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub portfolio: String,
    pub instrument: String,
    pub lot_id: String,
    pub contributor_id: String,
    pub event: Event,
    pub date: String,
    pub unit: String,
    pub quantity: Option<f64>,
    pub realized_pl: Option<f64>,
    pub realized_amortization: Option<f64>,
    pub clean_realized_pl: Option<f64>,
    pub amortized_realized_pl: Option<f64>,
    pub ca_income: Option<f64>,
}

impl MergedRow {
    pub fn event_key(&self) -> EventKey {
        EventKey {
            portfolio: self.portfolio.clone(),
            instrument: self.instrument.clone(),
            lot_id: self.lot_id.clone(),
            contributor_id: self.contributor_id.clone(),
            event: self.event.clone(),
            date: self.date.clone(),
            unit: self.unit.clone(),
        }
    }

    pub fn grain(&self) -> Grain {
        Grain {
            portfolio: self.portfolio.clone(),
            instrument: self.instrument.clone(),
            contributor_id: self.contributor_id.clone(),
            event: self.event.clone(),
            date: self.date.clone(),
            unit: self.unit.clone(),
        }
    }
}

impl Tabular for MergedRow {
    const COLUMNS: &'static [&'static str] = &[
        "Portfolio",
        "Instrument",
        "Lot ID",
        "Contributor ID",
        "Event",
        "Date",
        "Unit",
        "Quantity",
        "Realized PL",
        "Realized Amortization",
        "Clean Realized PL",
        "Amortized Realized PL",
        "CA Income",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.portfolio.clone(),
            self.instrument.clone(),
            self.lot_id.clone(),
            self.contributor_id.clone(),
            self.event.to_string(),
            self.date.clone(),
            self.unit.clone(),
            format_optional(self.quantity),
            format_optional(self.realized_pl),
            format_optional(self.realized_amortization),
            format_optional(self.clean_realized_pl),
            format_optional(self.amortized_realized_pl),
            format_optional(self.ca_income),
        ]
    }
}

/// One line of the historical P&L report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub portfolio: String,
    pub instrument: String,
    pub contributor_id: String,
    pub event: Event,
    pub date: String,
    pub unit: String,
    pub quantity: f64,
    pub clean_realized_pl: f64,
    pub amortized_realized_pl: f64,
    pub ca_income: f64,
}

impl Tabular for ReportRow {
    const COLUMNS: &'static [&'static str] = &[
        "Portfolio",
        "Instrument",
        "Contributor ID",
        "Event",
        "Date",
        "Unit",
        "Quantity",
        "Clean Realized PL",
        "Amortized Realized PL",
        "CA Income",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.portfolio.clone(),
            self.instrument.clone(),
            self.contributor_id.clone(),
            self.event.to_string(),
            self.date.clone(),
            self.unit.clone(),
            format_measure(self.quantity),
            format_measure(self.clean_realized_pl),
            format_measure(self.amortized_realized_pl),
            format_measure(self.ca_income),
        ]
    }
}
