//! Patient record for kidney health risk prediction.
//!
//! Seven clinical values, in the column order the exported forests were
//! trained on: Age, Creatinine_Level, BUN, Diabetes, Hypertension, GFR,
//! Urine_Output.

use serde::{Deserialize, Serialize};

/// Number of model input features.
pub const N_FEATURES: usize = 7;

/// Column names expected by both models, in feature-vector order.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "Age",
    "Creatinine_Level",
    "BUN",
    "Diabetes",
    "Hypertension",
    "GFR",
    "Urine_Output",
];

/// How a field is entered and normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Whole number (rounded on entry)
    Integer,
    /// Real number
    Decimal,
    /// Yes/no flag stored as 0 or 1
    Flag,
}

/// Input metadata for one record field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub column: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Bring a raw value into this field's domain.
    ///
    /// NaN falls back to the default; integers are rounded; any non-zero
    /// flag becomes 1.
    #[must_use]
    pub fn normalize(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.default;
        }
        match self.kind {
            FieldKind::Flag => {
                if value == 0.0 {
                    0.0
                } else {
                    1.0
                }
            }
            FieldKind::Integer => value.round().clamp(self.min, self.max),
            FieldKind::Decimal => value.clamp(self.min, self.max),
        }
    }

    /// Whether `value` already lies in the field's domain.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        match self.kind {
            FieldKind::Flag => value == 0.0 || value == 1.0,
            FieldKind::Integer => value.fract() == 0.0 && (self.min..=self.max).contains(&value),
            FieldKind::Decimal => (self.min..=self.max).contains(&value),
        }
    }
}

/// Field metadata in feature-vector order.
pub const FIELD_SPECS: [FieldSpec; N_FEATURES] = [
    FieldSpec {
        column: "Age",
        label: "Age",
        unit: "years",
        min: 1.0,
        max: 120.0,
        step: 1.0,
        default: 50.0,
        kind: FieldKind::Integer,
    },
    FieldSpec {
        column: "Creatinine_Level",
        label: "Creatinine",
        unit: "mg/dL",
        min: 0.1,
        max: 20.0,
        step: 0.1,
        default: 1.2,
        kind: FieldKind::Decimal,
    },
    FieldSpec {
        column: "BUN",
        label: "BUN",
        unit: "mg/dL",
        min: 1.0,
        max: 200.0,
        step: 1.0,
        default: 20.0,
        kind: FieldKind::Decimal,
    },
    FieldSpec {
        column: "Diabetes",
        label: "Diabetes",
        unit: "no/yes",
        min: 0.0,
        max: 1.0,
        step: 1.0,
        default: 0.0,
        kind: FieldKind::Flag,
    },
    FieldSpec {
        column: "Hypertension",
        label: "Hypertension",
        unit: "no/yes",
        min: 0.0,
        max: 1.0,
        step: 1.0,
        default: 0.0,
        kind: FieldKind::Flag,
    },
    FieldSpec {
        column: "GFR",
        label: "GFR",
        unit: "ml/min/1.73m²",
        min: 1.0,
        max: 200.0,
        step: 1.0,
        default: 90.0,
        kind: FieldKind::Decimal,
    },
    FieldSpec {
        column: "Urine_Output",
        label: "Urine Output",
        unit: "ml/day",
        min: 1.0,
        max: 10000.0,
        step: 10.0,
        default: 1500.0,
        kind: FieldKind::Decimal,
    },
];

/// One patient's clinical values, built fresh per submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Age in years (1-120)
    pub age: u32,

    /// Serum creatinine in mg/dL (0.1-20.0)
    pub creatinine: f64,

    /// Blood urea nitrogen in mg/dL (1.0-200.0)
    pub bun: f64,

    /// Diabetes: 0 = no, 1 = yes
    pub diabetes: u8,

    /// Hypertension: 0 = no, 1 = yes
    pub hypertension: u8,

    /// Glomerular filtration rate in ml/min/1.73m² (1.0-200.0)
    pub gfr: f64,

    /// Urine output in ml/day (1.0-10000.0)
    pub urine_output: f64,
}

impl Default for PatientRecord {
    fn default() -> Self {
        Self::from_values(&FIELD_SPECS.map(|spec| spec.default))
    }
}

impl PatientRecord {
    /// Build a record from raw values in feature order, normalising each one
    /// into its field's domain.
    #[must_use]
    pub fn from_values(values: &[f64; N_FEATURES]) -> Self {
        let v: [f64; N_FEATURES] =
            std::array::from_fn(|i| FIELD_SPECS[i].normalize(values[i]));

        Self {
            age: v[0] as u32,
            creatinine: v[1],
            bun: v[2],
            diabetes: v[3] as u8,
            hypertension: v[4] as u8,
            gfr: v[5],
            urine_output: v[6],
        }
    }

    /// Return a copy with every field clamped into its domain.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self::from_values(&self.to_features())
    }

    /// Whether every field already lies in its domain.
    #[must_use]
    pub fn is_within_domain(&self) -> bool {
        self.to_features()
            .iter()
            .zip(FIELD_SPECS.iter())
            .all(|(value, spec)| spec.contains(*value))
    }

    /// Feature vector in `FEATURE_NAMES` order.
    #[must_use]
    pub fn to_features(&self) -> [f64; N_FEATURES] {
        [
            f64::from(self.age),
            self.creatinine,
            self.bun,
            f64::from(self.diabetes),
            f64::from(self.hypertension),
            self.gfr,
            self.urine_output,
        ]
    }
}
