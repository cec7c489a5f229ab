use crate::validator::{Kind, SemanticType, Strictness, Validator, mismatch};
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct IntegerKind {
    min: Option<i64>,
    max: Option<i64>,
}

/// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
fn float_to_i64(f: f64) -> Option<i64> {
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

impl Kind for IntegerKind {
    const TYPE: SemanticType = SemanticType::Integer;

    fn convert(&self, value: &Value, strictness: Strictness) -> Result<Value, String> {
        match (value, strictness) {
            (Value::Int(i), _) => Ok(Value::Int(*i)),
            (_, Strictness::Strict) => Err(mismatch(value, strictness)),
            (Value::Float(f), Strictness::Coerce) => {
                if f.fract() != 0.0 {
                    return Err(format!("{f} has a fractional part"));
                }
                float_to_i64(*f)
                    .map(Value::Int)
                    .ok_or_else(|| format!("{f} is out of range"))
            }
            (Value::Float(f), _) => float_to_i64(f.trunc())
                .map(Value::Int)
                .ok_or_else(|| format!("{f} is out of range")),
            (Value::Bool(b), Strictness::Loose) => Ok(Value::Int(i64::from(*b))),
            (Value::Str(s), _) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    return Ok(Value::Int(i));
                }
                if strictness == Strictness::Loose {
                    if let Some(i) = trimmed.parse::<f64>().ok().and_then(|f| float_to_i64(f.trunc())) {
                        return Ok(Value::Int(i));
                    }
                }
                Err(format!("{s:?} is not an integer"))
            }
            _ => Err(mismatch(value, strictness)),
        }
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        let Some(i) = value.as_i64() else {
            return Ok(());
        };
        if let Some(min) = self.min {
            if i < min {
                return Err(format!("must be >= {min}"));
            }
        }
        if let Some(max) = self.max {
            if i > max {
                return Err(format!("must be <= {max}"));
            }
        }
        Ok(())
    }

    fn describe_bounds(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(min) = self.min {
            out.push(format!("val >= {min}"));
        }
        if let Some(max) = self.max {
            out.push(format!("val <= {max}"));
        }
        out
    }
}

impl Validator<IntegerKind> {
    /// Inclusive lower bound.
    pub fn min_value(mut self, min: i64) -> Self {
        self.kind.min = Some(min);
        self
    }

    /// Inclusive upper bound.
    pub fn max_value(mut self, max: i64) -> Self {
        self.kind.max = Some(max);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FloatKind {
    min: Option<f64>,
    max: Option<f64>,
}

impl Kind for FloatKind {
    const TYPE: SemanticType = SemanticType::Float;

    fn convert(&self, value: &Value, strictness: Strictness) -> Result<Value, String> {
        let out = match (value, strictness) {
            (Value::Float(f), _) => *f,
            (_, Strictness::Strict) => return Err(mismatch(value, strictness)),
            (Value::Int(i), _) => *i as f64,
            (Value::Bool(b), Strictness::Loose) => f64::from(u8::from(*b)),
            (Value::Str(s), _) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => f,
                _ => return Err(format!("{s:?} is not a finite number")),
            },
            _ => return Err(mismatch(value, strictness)),
        };
        if out.is_nan() {
            return Err("NaN is not accepted".to_string());
        }
        Ok(Value::Float(out))
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        let Some(f) = value.as_f64() else {
            return Ok(());
        };
        if let Some(min) = self.min {
            if f < min {
                return Err(format!("must be >= {min}"));
            }
        }
        if let Some(max) = self.max {
            if f > max {
                return Err(format!("must be <= {max}"));
            }
        }
        Ok(())
    }

    fn describe_bounds(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(min) = self.min {
            out.push(format!("val >= {min}"));
        }
        if let Some(max) = self.max {
            out.push(format!("val <= {max}"));
        }
        out
    }
}

impl Validator<FloatKind> {
    /// Inclusive lower bound.
    pub fn min_value(mut self, min: f64) -> Self {
        self.kind.min = Some(min);
        self
    }

    /// Inclusive upper bound.
    pub fn max_value(mut self, max: f64) -> Self {
        self.kind.max = Some(max);
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::{Validate, Value};

    #[test]
    fn max_value_is_inclusive() {
        let v = Validate::int().max_value(7);
        assert!(!v.is_valid(&Value::from(9)));
        assert!(v.is_valid(&Value::from(7)));
        assert!(v.is_valid(&Value::from(6)));
    }

    #[test]
    fn integer_strictness_levels() {
        let strict = Validate::int().strict();
        assert!(strict.is_valid(&Value::from(5)));
        assert!(!strict.is_valid(&Value::from("5")));

        let coerce = Validate::int();
        assert_eq!(coerce.coerce(&Value::from(" 42 ")).unwrap(), Value::Int(42));
        assert_eq!(coerce.coerce(&Value::from(3.0)).unwrap(), Value::Int(3));
        assert!(coerce.coerce(&Value::from(3.5)).unwrap_err().is_coercion());
        assert!(!coerce.is_valid(&Value::from("4.7")));
        assert!(!coerce.is_valid(&Value::from(true)));

        let loose = Validate::int().loose();
        assert_eq!(loose.coerce(&Value::from("4.7")).unwrap(), Value::Int(4));
        assert_eq!(loose.coerce(&Value::from(true)).unwrap(), Value::Int(1));
        assert_eq!(loose.coerce(&Value::from(-2.9)).unwrap(), Value::Int(-2));
    }

    #[test]
    fn integer_bound_failure_is_a_validation_error() {
        let err = Validate::int().min_value(10).coerce(&Value::from("3")).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains(">= 10"), "{err}");
    }

    #[test]
    fn float_conversion_and_bounds() {
        let v = Validate::float().min_value(0.0).max_value(1.0);
        assert_eq!(v.coerce(&Value::from("0.25")).unwrap(), Value::Float(0.25));
        assert_eq!(v.coerce(&Value::from(1)).unwrap(), Value::Float(1.0));
        assert!(!v.is_valid(&Value::from(1.5)));
        assert!(Validate::float().coerce(&Value::from("nan")).unwrap_err().is_coercion());
        assert!(!Validate::float().is_valid(&Value::from("inf")));
        assert!(!Validate::float().strict().is_valid(&Value::from(1)));
        assert_eq!(
            Validate::float().loose().coerce(&Value::from(false)).unwrap(),
            Value::Float(0.0)
        );
    }
}
