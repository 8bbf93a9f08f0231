//! Prediction Types
//!
//! Form drafts, validated inputs and results exchanged with the
//! prediction endpoints.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::ParseError;

/// A field shared by both prediction forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Age,
    #[serde(rename = "ap_hi")]
    Systolic,
    #[serde(rename = "ap_lo")]
    Diastolic,
    Cholesterol,
    Active,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Age,
        Field::Systolic,
        Field::Diastolic,
        Field::Cholesterol,
        Field::Active,
    ];

    /// Name used on the wire and in error messages
    pub fn wire_name(&self) -> &'static str {
        match self {
            Field::Age => "age",
            Field::Systolic => "ap_hi",
            Field::Diastolic => "ap_lo",
            Field::Cholesterol => "cholesterol",
            Field::Active => "active",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Field::Age => "Age (years)",
            Field::Systolic => "Systolic pressure (mmHg)",
            Field::Diastolic => "Diastolic pressure (mmHg)",
            Field::Cholesterol => "Cholesterol level",
            Field::Active => "Physically active",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Field {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "age" => Ok(Field::Age),
            "ap_hi" | "systolic" => Ok(Field::Systolic),
            "ap_lo" | "diastolic" => Ok(Field::Diastolic),
            "cholesterol" | "chol" => Ok(Field::Cholesterol),
            "active" | "activity" => Ok(Field::Active),
            other => Err(ParseError::UnknownField(other.to_string())),
        }
    }
}

/// Editable form state. Every field may be absent while the user types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub age: Option<f64>,
    #[serde(default)]
    pub ap_hi: Option<f64>,
    #[serde(default)]
    pub ap_lo: Option<f64>,
    #[serde(default)]
    pub cholesterol: Option<f64>,
    #[serde(default)]
    pub active: Option<f64>,
}

impl Draft {
    /// Build a draft with every field set
    pub fn filled(age: f64, ap_hi: f64, ap_lo: f64, cholesterol: f64, active: f64) -> Self {
        Self {
            age: Some(age),
            ap_hi: Some(ap_hi),
            ap_lo: Some(ap_lo),
            cholesterol: Some(cholesterol),
            active: Some(active),
        }
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::Age => self.age,
            Field::Systolic => self.ap_hi,
            Field::Diastolic => self.ap_lo,
            Field::Cholesterol => self.cholesterol,
            Field::Active => self.active,
        }
    }

    pub fn set(&mut self, field: Field, value: Option<f64>) {
        let slot = match field {
            Field::Age => &mut self.age,
            Field::Systolic => &mut self.ap_hi,
            Field::Diastolic => &mut self.ap_lo,
            Field::Cholesterol => &mut self.cholesterol,
            Field::Active => &mut self.active,
        };
        *slot = value;
    }

    /// Builder-style setter
    pub fn with(mut self, field: Field, value: f64) -> Self {
        self.set(field, Some(value));
        self
    }

    /// True when every field holds a value
    pub fn is_complete(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).is_some())
    }
}

/// Cholesterol level as recorded in the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CholesterolLevel {
    Normal = 1,
    AboveNormal = 2,
    WellAboveNormal = 3,
}

impl CholesterolLevel {
    pub fn label(&self) -> &'static str {
        match self {
            CholesterolLevel::Normal => "Normal",
            CholesterolLevel::AboveNormal => "Above normal",
            CholesterolLevel::WellAboveNormal => "Well above normal",
        }
    }
}

impl From<CholesterolLevel> for u8 {
    fn from(level: CholesterolLevel) -> Self {
        level as u8
    }
}

impl TryFrom<u8> for CholesterolLevel {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CholesterolLevel::Normal),
            2 => Ok(CholesterolLevel::AboveNormal),
            3 => Ok(CholesterolLevel::WellAboveNormal),
            other => Err(ParseError::InvalidCholesterol(other)),
        }
    }
}

/// Validated input for `POST /prediction/user`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplifiedInput {
    pub age: f64,
    pub ap_hi: f64,
    pub ap_lo: f64,
    pub cholesterol: CholesterolLevel,
    #[serde(with = "flag")]
    pub active: bool,
}

/// Validated input for `POST /prediction`
///
/// Carries the raw clinical fields; the backend scales them before
/// feeding the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedInput {
    pub age: f64,
    pub ap_hi: f64,
    pub ap_lo: f64,
    pub cholesterol: f64,
    pub active: f64,
}

impl AdvancedInput {
    /// Feature names in transmission order
    pub const FEATURE_ORDER: [&'static str; 5] = ["age", "ap_hi", "ap_lo", "cholesterol", "active"];

    /// Map to the fixed-order feature vector expected by the model
    pub fn features(&self) -> [f64; 5] {
        [self.age, self.ap_hi, self.ap_lo, self.cholesterol, self.active]
    }
}

/// Model output for one request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Probability of cardiovascular disease (0 to 1)
    pub probability: f64,
    /// Predicted class: 1 = disease, 0 = healthy
    #[serde(rename = "prediction")]
    pub predicted_class: u8,
}

impl PredictionResult {
    pub fn new(probability: f64, predicted_class: u8) -> Self {
        Self {
            probability,
            predicted_class,
        }
    }

    /// Reject values the model can never produce
    pub fn validated(self) -> Result<Self, String> {
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(format!(
                "probability {} is outside [0, 1]",
                self.probability
            ));
        }
        if self.predicted_class > 1 {
            return Err(format!(
                "prediction class {} is not 0 or 1",
                self.predicted_class
            ));
        }
        Ok(self)
    }

    pub fn is_high_risk(&self) -> bool {
        self.predicted_class == 1
    }

    /// Probability as a rounded percentage
    pub fn percentage(&self) -> u8 {
        (self.probability * 100.0).round().clamp(0.0, 100.0) as u8
    }

    pub fn risk_band(&self) -> RiskBand {
        let pct = self.percentage();
        match (self.is_high_risk(), pct) {
            (true, p) if p > 75 => RiskBand::VeryHigh,
            (true, _) => RiskBand::Elevated,
            (false, p) if p < 25 => RiskBand::VeryLow,
            (false, _) => RiskBand::Low,
        }
    }

    pub fn headline(&self) -> &'static str {
        if self.is_high_risk() {
            "High risk of cardiovascular disease"
        } else {
            "Low risk of cardiovascular disease"
        }
    }

    pub fn advice(&self) -> &'static str {
        if self.is_high_risk() {
            "According to the model you show a high risk of cardiovascular disease. \
             Consider consulting a health professional."
        } else {
            "According to the model you show a low risk of cardiovascular disease. \
             Keep maintaining a healthy lifestyle."
        }
    }
}

/// Display bucket for a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    VeryLow,
    Low,
    Elevated,
    VeryHigh,
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskBand::VeryLow => "very low",
            RiskBand::Low => "low",
            RiskBand::Elevated => "elevated",
            RiskBand::VeryHigh => "very high",
        };
        f.write_str(s)
    }
}

/// 0/1 integer encoding for boolean flags
mod flag {
    use super::*;
    use serde::de::Error;

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(D::Error::custom(format!("expected 0 or 1, got {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplified_input_wire_format() {
        let input = SimplifiedInput {
            age: 50.0,
            ap_hi: 120.0,
            ap_lo: 80.0,
            cholesterol: CholesterolLevel::AboveNormal,
            active: true,
        };

        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["age"], 50.0);
        assert_eq!(json["ap_hi"], 120.0);
        assert_eq!(json["ap_lo"], 80.0);
        assert_eq!(json["cholesterol"], 2);
        assert_eq!(json["active"], 1);
    }

    #[test]
    fn test_advanced_feature_order() {
        let input = AdvancedInput {
            age: 1.0,
            ap_hi: 2.0,
            ap_lo: 3.0,
            cholesterol: 4.0,
            active: 5.0,
        };
        assert_eq!(input.features(), [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(AdvancedInput::FEATURE_ORDER[0], "age");
        assert_eq!(AdvancedInput::FEATURE_ORDER[4], "active");
    }

    #[test]
    fn test_prediction_result_wire_names() {
        let result: PredictionResult =
            serde_json::from_str(r#"{"probability": 0.82, "prediction": 1}"#).unwrap();
        assert_eq!(result, PredictionResult::new(0.82, 1));
        assert!(result.is_high_risk());
        assert_eq!(result.percentage(), 82);
        assert_eq!(result.risk_band(), RiskBand::VeryHigh);
    }

    #[test]
    fn test_prediction_result_rejects_out_of_range() {
        assert!(PredictionResult::new(1.2, 1).validated().is_err());
        assert!(PredictionResult::new(0.4, 2).validated().is_err());
        assert!(PredictionResult::new(0.4, 0).validated().is_ok());
    }

    #[test]
    fn test_risk_bands() {
        assert_eq!(PredictionResult::new(0.10, 0).risk_band(), RiskBand::VeryLow);
        assert_eq!(PredictionResult::new(0.40, 0).risk_band(), RiskBand::Low);
        assert_eq!(PredictionResult::new(0.60, 1).risk_band(), RiskBand::Elevated);
        assert_eq!(PredictionResult::new(0.90, 1).risk_band(), RiskBand::VeryHigh);
    }

    #[test]
    fn test_field_parsing_accepts_aliases() {
        assert_eq!("systolic".parse::<Field>().unwrap(), Field::Systolic);
        assert_eq!("ap_lo".parse::<Field>().unwrap(), Field::Diastolic);
        assert_eq!(
            "weight".parse::<Field>().unwrap_err(),
            ParseError::UnknownField("weight".to_string())
        );
        assert_eq!(
            CholesterolLevel::try_from(4u8).unwrap_err().to_string(),
            "Invalid cholesterol level: 4"
        );
    }

    #[test]
    fn test_draft_completeness() {
        let mut draft = Draft::filled(50.0, 120.0, 80.0, 1.0, 1.0);
        assert!(draft.is_complete());

        draft.set(Field::Cholesterol, None);
        assert!(!draft.is_complete());
        assert_eq!(draft.get(Field::Age), Some(50.0));
    }
}
