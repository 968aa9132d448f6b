use crate::error::{BorReportError, Result};
use chrono::NaiveDate;
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const BENEFICIAL_OWNER_SECURITIES: &str = "mandate.BeneficialOwnerSecurities";
pub const REALIZED_PL: &str = "mandate.MonetaryRealizedPL";
pub const REALIZED_AMORTIZATION: &str = "mandate.MonetaryRealizedAmortizationEIM";
pub const CA_INCOME: &str = "mandate.MonetaryCAIncome";

/// Value of `balanceKey._type` that selects the detailed key shape.
pub const DETAILED_BALANCE_KEY: &str = "DetailedBalanceKey";

/// A whole BOR statement export.
///
/// Records are kept as raw JSON until extraction so that one malformed record
/// cannot fail the parse of the entire document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorStatement {
    #[serde(default)]
    #[schemars(
        with = "BTreeMap<String, Vec<RawBalanceRecord>>",
        description = "Balance records grouped by balance class name (e.g. 'mandate.MonetaryRealizedPL')"
    )]
    pub balances_by_account_class: BTreeMap<String, Vec<Value>>,
}

impl BorStatement {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Records of one balance class. An absent class reads as empty.
    pub fn records(&self, balance_class: &str) -> &[Value] {
        self.balances_by_account_class
            .get(balance_class)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(BorStatement)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

/// One balance record exactly as it appears in the export.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawBalanceRecord {
    pub balance_key: RawBalanceKey,
    pub balance_value: BalanceValue,
}

/// Untyped union of both balance key shapes, discriminated by `_type`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawBalanceKey {
    #[serde(rename = "_type")]
    #[schemars(description = "'DetailedBalanceKey' for attributed balances; anything else is a plain key")]
    pub kind: Option<String>,
    pub account: Account,
    pub contract: Option<Contract>,
    pub quantity_unit: Option<CurrencyRef>,
    pub origin_balance_key: Option<Box<OriginBalanceKey>>,
    #[schemars(description = "ISO-8601 timestamp, e.g. 2024-01-01T12:00:00Z")]
    pub impact_timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Account {
    pub portfolio: Portfolio,
    pub lot: Lot,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Portfolio {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub lot_opening_contract: LotOpeningContract,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LotOpeningContract {
    #[schemars(description = "Origin system marker; 'BOR.internal' flags unallocated positions")]
    pub external_system_instance_id: Option<String>,
    pub representation_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    #[serde(default)]
    pub security_identifiers: Vec<SecurityIdentifier>,
    pub external_representation: Option<ExternalRepresentation>,
    pub currency: Option<CurrencyRef>,
    #[schemars(description = "Corporate action event classification")]
    pub taxonomy: Option<String>,
}

impl Contract {
    /// Identifier of the last security identifier tagged `label_type`, or an
    /// empty string when none is tagged.
    pub fn display_label(&self, label_type: &str) -> String {
        let mut label = "";
        for identifier in &self.security_identifiers {
            if identifier.kind == label_type {
                label = &identifier.identifier;
            }
        }
        label.to_string()
    }

    fn external_representation(&self, path: &str) -> Result<&ExternalRepresentation> {
        self.external_representation
            .as_ref()
            .require(&format!("{path}.externalRepresentation"))
    }

    pub fn representation_id(&self, path: &str) -> Result<&str> {
        let representation = self.external_representation(path)?;
        representation
            .representation_id
            .as_deref()
            .require(&format!("{path}.externalRepresentation.representationId"))
    }

    pub fn external_id(&self, path: &str) -> Result<&str> {
        let representation = self.external_representation(path)?;
        representation
            .external_id
            .as_deref()
            .require(&format!("{path}.externalRepresentation.externalId"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SecurityIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRepresentation {
    pub representation_id: Option<String>,
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CurrencyRef {
    #[serde(rename = "iso4217Alpha")]
    pub iso4217_alpha: String,
}

/// Link to the balance that originated the current one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OriginBalanceKey {
    pub contract: Option<Contract>,
    pub origin_balance_key: Option<Box<OriginBalanceKey>>,
}

impl OriginBalanceKey {
    pub fn contract(&self, path: &str) -> Result<&Contract> {
        self.contract.as_ref().require(&format!("{path}.contract"))
    }

    pub fn origin(&self, path: &str) -> Result<&OriginBalanceKey> {
        self.origin_balance_key
            .as_deref()
            .require(&format!("{path}.originBalanceKey"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BalanceValue {
    pub quantity: Quantity,
}

/// Quantities arrive as decimal strings; plain JSON numbers are accepted too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Quantity {
    Text(String),
    Number(f64),
}

impl Quantity {
    pub fn to_f64(&self, path: &str) -> Result<f64> {
        match self {
            Quantity::Number(value) => Ok(*value),
            Quantity::Text(text) => {
                text.trim()
                    .parse::<f64>()
                    .map_err(|_| BorReportError::InvalidNumber {
                        path: path.to_string(),
                        value: text.clone(),
                    })
            }
        }
    }
}

/// Fields shared by both balance key shapes.
#[derive(Debug, Clone)]
pub struct KeyCommon {
    pub account: Account,
    pub contract: Option<Contract>,
    pub quantity_unit: Option<CurrencyRef>,
}

impl KeyCommon {
    pub fn portfolio(&self) -> &str {
        &self.account.portfolio.name
    }

    pub fn lot_opening_contract(&self) -> &LotOpeningContract {
        &self.account.lot.lot_opening_contract
    }

    pub fn contract(&self) -> Result<&Contract> {
        self.contract.as_ref().require("balanceKey.contract")
    }

    pub fn quantity_unit(&self) -> Result<&str> {
        self.quantity_unit
            .as_ref()
            .map(|unit| unit.iso4217_alpha.as_str())
            .require("balanceKey.quantityUnit.iso4217Alpha")
    }
}

/// Plain key. The origin chain is optional and carries no attribution, but
/// realized balances still name their instrument through it.
#[derive(Debug, Clone)]
pub struct SimpleBalanceKey {
    pub common: KeyCommon,
    pub origin: Option<OriginBalanceKey>,
}

#[derive(Debug, Clone)]
pub struct DetailedBalanceKey {
    pub common: KeyCommon,
    pub origin: OriginBalanceKey,
    pub impact_timestamp: String,
}

impl DetailedBalanceKey {
    /// Everything before the first `T` of the impact timestamp, unchanged.
    pub fn impact_date(&self) -> String {
        let date_part = self.impact_timestamp.split('T').next().unwrap_or_default();
        if NaiveDate::parse_from_str(date_part, "%Y-%m-%d").is_err() {
            warn!(
                "Impact timestamp '{}' does not start with a YYYY-MM-DD date",
                self.impact_timestamp
            );
        }
        date_part.to_string()
    }
}

#[derive(Debug, Clone)]
pub enum BalanceKey {
    Simple(SimpleBalanceKey),
    Detailed(DetailedBalanceKey),
}

impl BalanceKey {
    pub fn common(&self) -> &KeyCommon {
        match self {
            BalanceKey::Simple(simple) => &simple.common,
            BalanceKey::Detailed(detailed) => &detailed.common,
        }
    }

    /// The originating balance, whichever shape the key has.
    pub fn origin(&self) -> Option<&OriginBalanceKey> {
        match self {
            BalanceKey::Simple(simple) => simple.origin.as_ref(),
            BalanceKey::Detailed(detailed) => Some(&detailed.origin),
        }
    }
}

impl TryFrom<RawBalanceKey> for BalanceKey {
    type Error = BorReportError;

    fn try_from(raw: RawBalanceKey) -> Result<Self> {
        let common = KeyCommon {
            account: raw.account,
            contract: raw.contract,
            quantity_unit: raw.quantity_unit,
        };

        if raw.kind.as_deref() != Some(DETAILED_BALANCE_KEY) {
            return Ok(BalanceKey::Simple(SimpleBalanceKey {
                common,
                origin: raw.origin_balance_key.map(|origin| *origin),
            }));
        }

        let origin = raw
            .origin_balance_key
            .require("balanceKey.originBalanceKey")?;
        let impact_timestamp = raw
            .impact_timestamp
            .require("balanceKey.impactTimestamp")?;

        Ok(BalanceKey::Detailed(DetailedBalanceKey {
            common,
            origin: *origin,
            impact_timestamp,
        }))
    }
}

/// A balance record with its key shape resolved.
#[derive(Debug, Clone)]
pub struct BalanceRecord {
    pub key: BalanceKey,
    pub value: BalanceValue,
}

impl BalanceRecord {
    pub fn from_value(value: &Value) -> Result<Self> {
        let raw: RawBalanceRecord = serde_json::from_value(value.clone())?;
        Self::try_from(raw)
    }

    pub fn quantity(&self) -> Result<f64> {
        self.value.quantity.to_f64("balanceValue.quantity")
    }
}

impl TryFrom<RawBalanceRecord> for BalanceRecord {
    type Error = BorReportError;

    fn try_from(raw: RawBalanceRecord) -> Result<Self> {
        Ok(Self {
            key: BalanceKey::try_from(raw.balance_key)?,
            value: raw.balance_value,
        })
    }
}

/// Turns an absent required field into a [`BorReportError::MissingField`].
pub(crate) trait Require<T> {
    fn require(self, path: &str) -> Result<T>;
}

impl<T> Require<T> for Option<T> {
    fn require(self, path: &str) -> Result<T> {
        self.ok_or_else(|| BorReportError::MissingField(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detailed_key() -> Value {
        json!({
            "balanceKey": {
                "_type": "DetailedBalanceKey",
                "account": {
                    "portfolio": {"name": "P"},
                    "lot": {"lotOpeningContract": {"representationId": "L1"}}
                },
                "originBalanceKey": {
                    "contract": {"externalRepresentation": {"representationId": "C1"}}
                },
                "impactTimestamp": "2024-01-01T12:00:00Z"
            },
            "balanceValue": {"quantity": "12.5"}
        })
    }

    #[test]
    fn test_detailed_tag_selects_detailed_shape() {
        let record = BalanceRecord::from_value(&detailed_key()).unwrap();
        match &record.key {
            BalanceKey::Detailed(detailed) => {
                assert_eq!(detailed.impact_date(), "2024-01-01");
                assert_eq!(
                    detailed.origin.contract("o").unwrap().representation_id("o").unwrap(),
                    "C1"
                );
            }
            BalanceKey::Simple(_) => panic!("expected detailed key"),
        }
        assert_eq!(record.quantity().unwrap(), 12.5);
    }

    #[test]
    fn test_other_tags_are_simple() {
        let mut value = detailed_key();
        value["balanceKey"]["_type"] = json!("BalanceKey");
        let record = BalanceRecord::from_value(&value).unwrap();
        assert!(matches!(record.key, BalanceKey::Simple(_)));

        value["balanceKey"].as_object_mut().unwrap().remove("_type");
        let record = BalanceRecord::from_value(&value).unwrap();
        assert!(matches!(record.key, BalanceKey::Simple(_)));
    }

    #[test]
    fn test_simple_key_keeps_origin_chain() {
        let mut value = detailed_key();
        value["balanceKey"]["_type"] = json!("BalanceKey");
        let record = BalanceRecord::from_value(&value).unwrap();
        let origin = record.key.origin().unwrap();
        assert_eq!(origin.contract("o").unwrap().representation_id("o").unwrap(), "C1");

        value["balanceKey"]
            .as_object_mut()
            .unwrap()
            .remove("originBalanceKey");
        let record = BalanceRecord::from_value(&value).unwrap();
        assert!(record.key.origin().is_none());
    }

    #[test]
    fn test_detailed_without_origin_is_rejected() {
        let mut value = detailed_key();
        value["balanceKey"]
            .as_object_mut()
            .unwrap()
            .remove("originBalanceKey");
        let err = BalanceRecord::from_value(&value).unwrap_err();
        assert!(matches!(err, BorReportError::MissingField(ref p) if p == "balanceKey.originBalanceKey"));
    }

    #[test]
    fn test_display_label_last_match_wins() {
        let contract: Contract = serde_json::from_value(json!({
            "securityIdentifiers": [
                {"type": "ISIN", "identifier": "XS0000000000"},
                {"type": "MX_DSPLABEL", "identifier": "FIRST"},
                {"type": "MX_DSPLABEL", "identifier": "SECOND"}
            ]
        }))
        .unwrap();
        assert_eq!(contract.display_label("MX_DSPLABEL"), "SECOND");
        assert_eq!(contract.display_label("CUSIP"), "");
        assert_eq!(Contract::default().display_label("MX_DSPLABEL"), "");
    }

    #[test]
    fn test_quantity_accepts_text_and_numbers() {
        assert_eq!(Quantity::Text(" -70 ".into()).to_f64("q").unwrap(), -70.0);
        assert_eq!(Quantity::Number(3.25).to_f64("q").unwrap(), 3.25);
        assert!(matches!(
            Quantity::Text("abc".into()).to_f64("q"),
            Err(BorReportError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_non_iso_timestamp_passes_through() {
        let mut value = detailed_key();
        value["balanceKey"]["impactTimestamp"] = json!("15/03/2024T10:00");
        let record = BalanceRecord::from_value(&value).unwrap();
        let BalanceKey::Detailed(detailed) = record.key else {
            panic!("expected detailed key");
        };
        assert_eq!(detailed.impact_date(), "15/03/2024");

        let without_time = DetailedBalanceKey {
            impact_timestamp: "2024-03-15".to_string(),
            ..detailed
        };
        assert_eq!(without_time.impact_date(), "2024-03-15");
    }

    #[test]
    fn test_absent_class_reads_empty() {
        let statement = BorStatement::from_json_str(r#"{"balancesByAccountClass": {}}"#).unwrap();
        assert!(statement.records(CA_INCOME).is_empty());

        let statement = BorStatement::from_json_str("{}").unwrap();
        assert!(statement.records(REALIZED_PL).is_empty());
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = BorStatement::schema_as_json().unwrap();
        assert!(schema_json.contains("balancesByAccountClass"));
        assert!(schema_json.contains("lotOpeningContract"));
    }
}
