use std::{fmt, ops::Index};

use ndarray::ArrayView1;

use crate::error::InputError;

/// Amount of features every prediction takes.
pub const N_FEATURES: usize = 6;

/// A physical quantity in the feature schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    pub symbol: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
    pub description: &'static str,
}

impl Feature {
    /// The label shown next to an input field, e.g. `Beam width, b (mm)`.
    pub fn label(&self) -> String {
        if self.unit.is_empty() {
            format!("{}, {}", self.name, self.symbol)
        } else {
            format!("{}, {} ({})", self.name, self.symbol, self.unit)
        }
    }
}

/// The fixed feature order expected by the scaler and the model.
pub const FEATURES: [Feature; N_FEATURES] = [
    Feature {
        symbol: "As",
        name: "Area of tensile reinforcement",
        unit: "mm²",
        description: "The area of steel reinforcement in tension.",
    },
    Feature {
        symbol: "σ0.2",
        name: "The 0.2 proof strength",
        unit: "MPa",
        description: "The 0.2 proof stress of the reinforcement material.",
    },
    Feature {
        symbol: "n",
        name: "Strain hardening parameter",
        unit: "",
        description: "Strain hardening parameter of the reinforcement (dimensionless).",
    },
    Feature {
        symbol: "fc",
        name: "Concrete compressive strength",
        unit: "MPa",
        description: "The compressive strength of concrete.",
    },
    Feature {
        symbol: "b",
        name: "Beam width",
        unit: "mm",
        description: "The width of the beam.",
    },
    Feature {
        symbol: "d",
        name: "Effective depth",
        unit: "mm",
        description: "From the top of the beam to the center of the tension reinforcement.",
    },
];

/// Returns the feature symbols in schema order.
pub fn feature_symbols() -> [&'static str; N_FEATURES] {
    FEATURES.map(|f| f.symbol)
}

/// Six finite raw feature values in [`FEATURES`] order.
///
/// No physical plausibility check is made: a negative width is accepted as given.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; N_FEATURES]);

impl FeatureVector {
    /// Creates a new `FeatureVector`.
    ///
    /// # Errors
    /// Returns an `InputError` if any value is NaN or infinite.
    pub fn new(values: [f64; N_FEATURES]) -> Result<Self, InputError> {
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(InputError::NonFinite {
                feature: FEATURES[i].symbol,
            });
        }

        Ok(Self(values))
    }

    /// Parses raw text fields, as typed in a form, into a `FeatureVector`.
    ///
    /// # Errors
    /// Returns an `InputError` if there aren't exactly six fields or any isn't a finite number.
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self, InputError> {
        if raw.len() != N_FEATURES {
            return Err(InputError::WrongArity {
                got: raw.len(),
                expected: N_FEATURES,
            });
        }

        let mut values = [0.0; N_FEATURES];
        for ((value, field), feature) in values.iter_mut().zip(raw).zip(&FEATURES) {
            let field = field.as_ref().trim();
            *value = field.parse().map_err(|_| InputError::NotNumeric {
                feature: feature.symbol,
                value: field.to_string(),
            })?;
        }

        Self::new(values)
    }

    pub fn values(&self) -> &[f64; N_FEATURES] {
        &self.0
    }

    pub fn view(&self) -> ArrayView1<'_, f64> {
        ArrayView1::from(&self.0[..])
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl TryFrom<[f64; N_FEATURES]> for FeatureVector {
    type Error = InputError;

    fn try_from(values: [f64; N_FEATURES]) -> Result<Self, InputError> {
        Self::new(values)
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_keeps_order() {
        let fv = FeatureVector::parse(&[" 1", "2.5", "3", "4e1", "-5", "6 "]).unwrap();
        assert_eq!(fv.values(), &[1.0, 2.5, 3.0, 40.0, -5.0, 6.0]);
    }

    #[test]
    fn parse_names_the_bad_field() {
        let err = FeatureVector::parse(&["1", "2", "three", "4", "5", "6"]).unwrap_err();
        assert_eq!(
            err,
            InputError::NotNumeric {
                feature: "n",
                value: "three".into()
            }
        );
    }

    #[test]
    fn parse_rejects_wrong_arity() {
        let err = FeatureVector::parse(&["1", "2"]).unwrap_err();
        assert_eq!(err, InputError::WrongArity { got: 2, expected: 6 });
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let err = FeatureVector::parse(&["1", "2", "3", "NaN", "5", "6"]).unwrap_err();
        assert_eq!(err, InputError::NonFinite { feature: "fc" });
        assert!(FeatureVector::new([f64::INFINITY, 0.0, 0.0, 0.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn empty_field_is_not_numeric() {
        let err = FeatureVector::parse(&["", "2", "3", "4", "5", "6"]).unwrap_err();
        assert!(matches!(err, InputError::NotNumeric { feature: "As", .. }));
    }

    #[test]
    fn labels_include_units() {
        assert_eq!(FEATURES[4].label(), "Beam width, b (mm)");
        assert_eq!(FEATURES[2].label(), "Strain hardening parameter, n");
    }
}
