//! Input Validation
//!
//! Field-level numeric constraints for both prediction forms, plus the
//! cross-field blood pressure rule. Incomplete drafts are rejected with a
//! `Missing` violation rather than treated as a fault, so the same schema
//! gates both explicit submissions and realtime evaluation.

use crate::model::{AdvancedInput, CholesterolLevel, Draft, Field, SimplifiedInput};

/// Why a single field was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Violation {
    #[error("is required")]
    Missing,

    #[error("must be a finite number")]
    NotFinite,

    #[error("must be at least {0}")]
    BelowMin(f64),

    #[error("must be at most {0}")]
    AboveMax(f64),

    #[error("must be one of {}", join_values(.0))]
    NotAllowed(&'static [f64]),

    /// Must be strictly lower than another field
    #[error("{}", below_message(.0))]
    MustBeBelow(Field),
}

fn join_values(allowed: &[f64]) -> String {
    allowed.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
}

fn below_message(other: &Field) -> String {
    match other {
        Field::Systolic => {
            "diastolic pressure (ap_lo) must be lower than systolic pressure (ap_hi)".to_string()
        }
        other => format!("must be lower than {}", other),
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{field} {violation}")]
pub struct FieldError {
    pub field: Field,
    pub violation: Violation,
}

/// Every violation found in a draft
#[derive(Debug, Clone, Default, PartialEq, thiserror::Error)]
#[error("{}", join_errors(.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

fn join_errors(errors: &[FieldError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

impl ValidationErrors {
    fn push(&mut self, field: Field, violation: Violation) {
        self.errors.push(FieldError { field, violation });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Violations attached to one field
    pub fn for_field(&self, field: Field) -> impl Iterator<Item = &Violation> {
        self.errors
            .iter()
            .filter(move |e| e.field == field)
            .map(|e| &e.violation)
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.for_field(field).next().is_some()
    }

    /// First message for a field, for inline display under the input
    pub fn message_for(&self, field: Field) -> Option<String> {
        self.for_field(field).next().map(|v| v.to_string())
    }

    /// True when the only problem is absent fields
    pub fn is_incomplete_only(&self) -> bool {
        !self.is_empty() && self.errors.iter().all(|e| e.violation == Violation::Missing)
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

/// Numeric constraint on one field
#[derive(Debug, Clone, Copy)]
struct Rule {
    min: Option<f64>,
    max: Option<f64>,
    allowed: Option<&'static [f64]>,
}

impl Rule {
    const fn range(min: f64, max: f64) -> Self {
        Self { min: Some(min), max: Some(max), allowed: None }
    }

    const fn at_most(max: f64) -> Self {
        Self { min: None, max: Some(max), allowed: None }
    }

    const fn any() -> Self {
        Self { min: None, max: None, allowed: None }
    }

    const fn one_of(allowed: &'static [f64]) -> Self {
        Self { min: None, max: None, allowed: Some(allowed) }
    }

    /// Returns the value when present and within bounds
    fn check(&self, draft: &Draft, field: Field, errors: &mut ValidationErrors) -> Option<f64> {
        let Some(value) = draft.get(field) else {
            errors.push(field, Violation::Missing);
            return None;
        };
        if !value.is_finite() {
            errors.push(field, Violation::NotFinite);
            return None;
        }
        if let Some(allowed) = self.allowed {
            if !allowed.contains(&value) {
                errors.push(field, Violation::NotAllowed(allowed));
                return None;
            }
        }
        if let Some(min) = self.min {
            if value < min {
                errors.push(field, Violation::BelowMin(min));
                return None;
            }
        }
        if let Some(max) = self.max {
            if value > max {
                errors.push(field, Violation::AboveMax(max));
                return None;
            }
        }
        Some(value)
    }
}

const CHOLESTEROL_LEVELS: &[f64] = &[1.0, 2.0, 3.0];
const FLAG_VALUES: &[f64] = &[0.0, 1.0];

/// Validates a draft into a typed input
pub trait Schema {
    type Output;

    fn validate(&self, draft: &Draft) -> Result<Self::Output, ValidationErrors>;

    fn is_valid(&self, draft: &Draft) -> bool {
        self.validate(draft).is_ok()
    }
}

/// Schema of the simplified form (`/prediction/user`)
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplifiedSchema;

impl SimplifiedSchema {
    const AGE: Rule = Rule::range(0.0, 120.0);
    const SYSTOLIC: Rule = Rule::range(0.0, 200.0);
    const DIASTOLIC: Rule = Rule::range(0.0, 140.0);
    const CHOLESTEROL: Rule = Rule::one_of(CHOLESTEROL_LEVELS);
    const ACTIVE: Rule = Rule::one_of(FLAG_VALUES);
}

impl Schema for SimplifiedSchema {
    type Output = SimplifiedInput;

    fn validate(&self, draft: &Draft) -> Result<SimplifiedInput, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let age = Self::AGE.check(draft, Field::Age, &mut errors);
        let ap_hi = Self::SYSTOLIC.check(draft, Field::Systolic, &mut errors);
        let ap_lo = Self::DIASTOLIC.check(draft, Field::Diastolic, &mut errors);
        let cholesterol = Self::CHOLESTEROL.check(draft, Field::Cholesterol, &mut errors);
        let active = Self::ACTIVE.check(draft, Field::Active, &mut errors);

        if let (Some(hi), Some(lo)) = (ap_hi, ap_lo) {
            if lo >= hi {
                errors.push(Field::Diastolic, Violation::MustBeBelow(Field::Systolic));
            }
        }

        match (age, ap_hi, ap_lo, cholesterol, active) {
            (Some(age), Some(ap_hi), Some(ap_lo), Some(chol), Some(active)) => {
                let cholesterol = CholesterolLevel::try_from(chol as u8)
                    .unwrap_or(CholesterolLevel::Normal);
                errors.into_result(|| SimplifiedInput {
                    age,
                    ap_hi,
                    ap_lo,
                    cholesterol,
                    active: active == 1.0,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Schema of the advanced form (`/prediction`)
///
/// Bounds are looser; the backend scales age and pressures itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvancedSchema;

impl AdvancedSchema {
    const CHOLESTEROL: Rule = Rule::at_most(3.0);
    const ACTIVE: Rule = Rule::range(0.0, 1.0);
}

impl Schema for AdvancedSchema {
    type Output = AdvancedInput;

    fn validate(&self, draft: &Draft) -> Result<AdvancedInput, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let age = Rule::any().check(draft, Field::Age, &mut errors);
        let ap_hi = Rule::any().check(draft, Field::Systolic, &mut errors);
        let ap_lo = Rule::any().check(draft, Field::Diastolic, &mut errors);
        let cholesterol = Self::CHOLESTEROL.check(draft, Field::Cholesterol, &mut errors);
        let active = Self::ACTIVE.check(draft, Field::Active, &mut errors);

        match (age, ap_hi, ap_lo, cholesterol, active) {
            (Some(age), Some(ap_hi), Some(ap_lo), Some(cholesterol), Some(active)) => {
                errors.into_result(|| AdvancedInput {
                    age,
                    ap_hi,
                    ap_lo,
                    cholesterol,
                    active,
                })
            }
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_draft() -> Draft {
        Draft::filled(50.0, 120.0, 80.0, 1.0, 1.0)
    }

    #[test]
    fn test_accepts_values_within_bounds() {
        let schema = SimplifiedSchema;
        for (age, hi, lo, chol, active) in [
            (0.0, 1.0, 0.0, 1.0, 0.0),
            (120.0, 200.0, 140.0, 3.0, 1.0),
            (45.0, 130.0, 129.5, 2.0, 1.0),
        ] {
            let draft = Draft::filled(age, hi, lo, chol, active);
            let input = schema.validate(&draft).unwrap();
            assert_eq!(input.age, age);
            assert_eq!(u8::from(input.cholesterol) as f64, chol);
            assert_eq!(input.active, active == 1.0);
        }
    }

    #[test]
    fn test_rejects_diastolic_not_below_systolic() {
        let schema = SimplifiedSchema;
        for (hi, lo) in [(120.0, 120.0), (120.0, 130.0), (90.0, 140.0)] {
            let draft = valid_draft().with(Field::Systolic, hi).with(Field::Diastolic, lo);
            let errors = schema.validate(&draft).unwrap_err();

            assert!(errors.has_field(Field::Diastolic));
            assert!(!errors.has_field(Field::Systolic));
            assert_eq!(
                errors.for_field(Field::Diastolic).next(),
                Some(&Violation::MustBeBelow(Field::Systolic))
            );
        }
    }

    #[test]
    fn test_rejects_out_of_range_fields() {
        let schema = SimplifiedSchema;
        let draft = Draft::filled(130.0, 250.0, 80.0, 4.0, 2.0);
        let errors = schema.validate(&draft).unwrap_err();

        assert_eq!(errors.for_field(Field::Age).next(), Some(&Violation::AboveMax(120.0)));
        assert_eq!(errors.for_field(Field::Systolic).next(), Some(&Violation::AboveMax(200.0)));
        assert!(errors.has_field(Field::Cholesterol));
        assert!(errors.has_field(Field::Active));
        assert!(!errors.has_field(Field::Diastolic));
    }

    #[test]
    fn test_incomplete_draft_is_rejected_not_panicking() {
        let schema = SimplifiedSchema;
        let draft = Draft::default().with(Field::Age, 40.0);
        let errors = schema.validate(&draft).unwrap_err();

        assert_eq!(errors.len(), 4);
        assert!(errors.is_incomplete_only());
        assert_eq!(errors.message_for(Field::Systolic).unwrap(), "is required");
    }

    #[test]
    fn test_non_finite_values() {
        let draft = valid_draft().with(Field::Age, f64::NAN);
        let errors = SimplifiedSchema.validate(&draft).unwrap_err();
        assert_eq!(errors.for_field(Field::Age).next(), Some(&Violation::NotFinite));
    }

    #[test]
    fn test_advanced_schema_bounds() {
        let schema = AdvancedSchema;
        let input = schema
            .validate(&Draft::filled(-1.2, 0.4, 1.7, -2.0, 0.5))
            .unwrap();
        assert_eq!(input.features(), [-1.2, 0.4, 1.7, -2.0, 0.5]);

        let errors = schema
            .validate(&Draft::filled(0.0, 0.0, 0.0, 3.5, 1.5))
            .unwrap_err();
        assert!(errors.has_field(Field::Cholesterol));
        assert!(errors.has_field(Field::Active));
    }

    #[test]
    fn test_errors_join_every_violation() {
        let draft = valid_draft()
            .with(Field::Age, -1.0)
            .with(Field::Cholesterol, 4.0);
        let errors = SimplifiedSchema.validate(&draft).unwrap_err();

        assert_eq!(
            errors.to_string(),
            "age must be at least 0; cholesterol must be one of 1, 2, 3"
        );
        let source: &dyn std::error::Error = &errors;
        assert!(source.source().is_none());
    }

    #[test]
    fn test_error_display() {
        let draft = valid_draft().with(Field::Diastolic, 125.0);
        let errors = SimplifiedSchema.validate(&draft).unwrap_err();
        assert_eq!(
            errors.to_string(),
            "ap_lo diastolic pressure (ap_lo) must be lower than systolic pressure (ap_hi)"
        );
    }
}
