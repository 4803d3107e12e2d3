//! Records handed to the renderers and kept in the flat-file store.
//!
//! Line items are decoded leniently: a bad field becomes a documented default
//! here, so layout code can trust every value it reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_MANUFACTURER: &str = "Unknown Manufacturer";

// ============================================================================
// LINE ITEMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeaSchedule {
    NC,
    CI,
    CII,
    CIII,
    CIV,
    CV,
}

impl DeaSchedule {
    /// Accepts the canonical labels in any case. Anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "NC" => Some(DeaSchedule::NC),
            "CI" => Some(DeaSchedule::CI),
            "CII" => Some(DeaSchedule::CII),
            "CIII" => Some(DeaSchedule::CIII),
            "CIV" => Some(DeaSchedule::CIV),
            "CV" => Some(DeaSchedule::CV),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DeaSchedule::NC => "NC",
            DeaSchedule::CI => "CI",
            DeaSchedule::CII => "CII",
            DeaSchedule::CIII => "CIII",
            DeaSchedule::CIV => "CIV",
            DeaSchedule::CV => "CV",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default, deserialize_with = "lenient::string")]
    pub item_name: String,
    #[serde(default, alias = "ndc", deserialize_with = "lenient::string")]
    pub ndc11: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub package_size: String,
    #[serde(default, deserialize_with = "lenient::count")]
    pub packages: u32,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub price_per_unit: f64,
    #[serde(default = "default_units", deserialize_with = "lenient::units")]
    pub units_per_package: u32,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub labeler_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub manufacturer: Option<String>,
    #[serde(default, deserialize_with = "lenient::schedule")]
    pub dea_schedule: Option<DeaSchedule>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub strength: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub dosage_form: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub finished: Option<bool>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub brand_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub generic_name: String,
}

fn default_units() -> u32 {
    1
}

impl Default for LineItem {
    fn default() -> Self {
        LineItem {
            item_name: String::new(),
            ndc11: String::new(),
            package_size: String::new(),
            packages: 0,
            price_per_unit: 0.0,
            units_per_package: 1,
            labeler_name: None,
            manufacturer: None,
            dea_schedule: None,
            strength: String::new(),
            dosage_form: String::new(),
            finished: None,
            brand_name: String::new(),
            generic_name: String::new(),
        }
    }
}

impl LineItem {
    /// `pricePerUnit * unitsPerPackage * packages`
    pub fn item_total(&self) -> f64 {
        self.price_per_unit * self.units_per_package as f64 * self.packages as f64
    }

    pub fn manufacturer_name(&self) -> Option<&str> {
        self.labeler_name.as_deref().or(self.manufacturer.as_deref())
    }

    /// Invoice grouping key.
    pub fn manufacturer_key(&self) -> &str {
        self.manufacturer_name().unwrap_or(UNKNOWN_MANUFACTURER)
    }

    pub fn is_schedule_ii(&self) -> bool {
        self.dea_schedule == Some(DeaSchedule::CII)
    }

    pub fn schedule_label(&self) -> &'static str {
        self.dea_schedule.map(DeaSchedule::label).unwrap_or("")
    }

    /// "F" for a full (finished) package, "P" for a partial one.
    pub fn fill_label(&self) -> &'static str {
        match self.finished {
            Some(true) => "F",
            Some(false) => "P",
            None => "",
        }
    }

    /// Brand name when the item name is blank.
    pub fn display_name(&self) -> &str {
        [&self.item_name, &self.brand_name, &self.generic_name]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }
}

// ============================================================================
// PARTIES
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Client {
    pub id: String,
    pub business_name: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    /// Wholesaler name, resolved to a record by the caller
    pub wholesaler: String,
    #[serde(deserialize_with = "lenient::percentage")]
    pub invoice_percentage: f64,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub dea_number: Option<String>,
}

impl Client {
    pub fn city_state_zip(&self) -> String {
        city_state_zip(&self.city, &self.state, &self.zip_code)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanySettings {
    pub company_name: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub dea_number: String,
}

impl CompanySettings {
    pub fn city_state_zip(&self) -> String {
        city_state_zip(&self.city, &self.state, &self.zip_code)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WholesalerInfo {
    pub id: String,
    pub name: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub phone: String,
}

impl WholesalerInfo {
    pub fn city_state_zip(&self) -> String {
        city_state_zip(&self.city, &self.state, &self.zip_code)
    }
}

/// "City, ST 00000", dropping whichever parts are blank.
fn city_state_zip(city: &str, state: &str, zip: &str) -> String {
    let region = [state, zip]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    match (city.is_empty(), region.is_empty()) {
        (false, false) => format!("{city}, {region}"),
        (false, true) => city.to_string(),
        (true, _) => region,
    }
}

// ============================================================================
// REPORTS
// ============================================================================

/// A client's stored collection of line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default)]
    pub id: String,
    pub client_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

/// Everything one render call needs, assembled by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportData {
    pub client: Client,
    pub line_items: Vec<LineItem>,
    pub company_settings: Option<CompanySettings>,
    pub wholesaler_info: Option<WholesalerInfo>,
}

impl ReportData {
    /// DEA registration printed on Form 222: the client's, else the company's.
    pub fn dea_number(&self) -> &str {
        self.client
            .dea_number
            .as_deref()
            .or_else(|| {
                self.company_settings
                    .as_ref()
                    .map(|c| c.dea_number.as_str())
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or("")
    }

    pub fn wholesaler_name(&self) -> &str {
        self.wholesaler_info
            .as_ref()
            .map(|w| w.name.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.client.wholesaler)
    }
}

// ============================================================================
// LENIENT DECODING
// ============================================================================

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::DeaSchedule;

    fn raw<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
        Option::<Value>::deserialize(d)
    }

    fn number(value: &Value) -> Option<f64> {
        let n = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
            _ => None,
        };
        n.filter(|v: &f64| v.is_finite())
    }

    fn whole(value: Option<Value>) -> u32 {
        value
            .as_ref()
            .and_then(number)
            .filter(|v| *v >= 0.0)
            .map(|v| v.trunc().min(u32::MAX as f64) as u32)
            .unwrap_or(0)
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match raw(d)? {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        })
    }

    /// Blank strings count as absent.
    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let s = string(d)?;
        let trimmed = s.trim();
        Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
    }

    pub fn amount<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(raw(d)?.as_ref().and_then(number).unwrap_or(0.0).max(0.0))
    }

    pub fn percentage<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(amount(d)?.min(100.0))
    }

    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        Ok(whole(raw(d)?))
    }

    /// At least one unit per package.
    pub fn units<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        Ok(whole(raw(d)?).max(1))
    }

    pub fn schedule<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DeaSchedule>, D::Error> {
        Ok(match raw(d)? {
            Some(Value::String(s)) => DeaSchedule::parse(&s),
            _ => None,
        })
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match raw(d)? {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Some(true),
                "false" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_line_item_defaults() {
        let item: LineItem = serde_json::from_value(json!({
            "itemName": "Oxycodone 5mg",
            "packages": "3",
            "pricePerUnit": null,
            "unitsPerPackage": 0,
            "deaSchedule": "cii",
            "finished": "yes",
            "labelerName": "   "
        }))
        .unwrap();

        assert_eq!(item.item_name, "Oxycodone 5mg");
        assert_eq!(item.packages, 3);
        assert_eq!(item.price_per_unit, 0.0);
        assert_eq!(item.units_per_package, 1);
        assert_eq!(item.dea_schedule, Some(DeaSchedule::CII));
        assert_eq!(item.finished, Some(true));
        assert_eq!(item.labeler_name, None);
        assert_eq!(item.ndc11, "");
    }

    #[test]
    fn test_lenient_garbage_numbers_become_zero() {
        let item: LineItem = serde_json::from_value(json!({
            "packages": -4,
            "pricePerUnit": "abc",
            "unitsPerPackage": { "nested": true },
            "deaSchedule": "C7",
            "ndc11": 12345678901u64
        }))
        .unwrap();

        assert_eq!(item.packages, 0);
        assert_eq!(item.price_per_unit, 0.0);
        assert_eq!(item.units_per_package, 1);
        assert_eq!(item.dea_schedule, None);
        assert_eq!(item.ndc11, "12345678901");
    }

    #[test]
    fn test_missing_units_defaults_to_one() {
        let item: LineItem = serde_json::from_value(json!({ "packages": 2 })).unwrap();
        assert_eq!(item.units_per_package, 1);
    }

    #[test]
    fn test_price_strings_with_currency() {
        let item: LineItem = serde_json::from_value(json!({
            "pricePerUnit": "$1,250.50",
            "packages": 1
        }))
        .unwrap();
        assert_eq!(item.price_per_unit, 1250.5);
    }

    #[test]
    fn test_item_total() {
        let item = LineItem {
            price_per_unit: 2.5,
            units_per_package: 100,
            packages: 3,
            ..LineItem::default()
        };
        assert_eq!(item.item_total(), 750.0);
    }

    #[test]
    fn test_manufacturer_key_fallbacks() {
        let labeled = LineItem {
            labeler_name: Some("Purdue".to_string()),
            manufacturer: Some("Other".to_string()),
            ..LineItem::default()
        };
        let manufactured = LineItem {
            manufacturer: Some("Mallinckrodt".to_string()),
            ..LineItem::default()
        };
        assert_eq!(labeled.manufacturer_key(), "Purdue");
        assert_eq!(manufactured.manufacturer_key(), "Mallinckrodt");
        assert_eq!(LineItem::default().manufacturer_key(), UNKNOWN_MANUFACTURER);
    }

    #[test]
    fn test_client_percentage_is_clamped() {
        let client: Client =
            serde_json::from_value(json!({ "businessName": "A", "invoicePercentage": "150" }))
                .unwrap();
        assert_eq!(client.invoice_percentage, 100.0);
    }

    #[test]
    fn test_city_state_zip() {
        let client = Client {
            city: "Austin".to_string(),
            state: "TX".to_string(),
            zip_code: "78701".to_string(),
            ..Client::default()
        };
        assert_eq!(client.city_state_zip(), "Austin, TX 78701");
        assert_eq!(Client::default().city_state_zip(), "");
    }

    #[test]
    fn test_dea_number_falls_back_to_company() {
        let mut data = ReportData {
            company_settings: Some(CompanySettings {
                dea_number: "RC1234563".to_string(),
                ..CompanySettings::default()
            }),
            ..ReportData::default()
        };
        assert_eq!(data.dea_number(), "RC1234563");

        data.client.dea_number = Some("BA7654321".to_string());
        assert_eq!(data.dea_number(), "BA7654321");
    }

    #[test]
    fn test_line_item_survives_store_round_trip() {
        let item = LineItem {
            item_name: "Morphine".to_string(),
            dea_schedule: Some(DeaSchedule::CII),
            finished: Some(false),
            ..LineItem::default()
        };
        let text = serde_json::to_string(&item).unwrap();
        let back: LineItem = serde_json::from_str(&text).unwrap();
        assert_eq!(back, item);
    }
}
