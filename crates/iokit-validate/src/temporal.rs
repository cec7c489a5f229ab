use crate::validator::{Kind, SemanticType, Strictness, Validator, mismatch};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[derive(Debug, Clone, Default)]
pub struct DateTimeKind {
    min: Option<NaiveDateTime>,
    max: Option<NaiveDateTime>,
    before: Option<NaiveDateTime>,
    after: Option<NaiveDateTime>,
}

impl Kind for DateTimeKind {
    const TYPE: SemanticType = SemanticType::DateTime;

    fn convert(&self, value: &Value, strictness: Strictness) -> Result<Value, String> {
        match (value, strictness) {
            (Value::DateTime(dt), _) => Ok(Value::DateTime(*dt)),
            (_, Strictness::Strict) => Err(mismatch(value, strictness)),
            (Value::Str(s), _) => parse_datetime(s)
                .map(Value::DateTime)
                .ok_or_else(|| format!("{s:?} is not a recognised date or date-time")),
            (Value::Int(secs), Strictness::Loose) => DateTime::from_timestamp(*secs, 0)
                .map(|dt| Value::DateTime(dt.naive_utc()))
                .ok_or_else(|| format!("{secs} is not a valid unix timestamp")),
            _ => Err(mismatch(value, strictness)),
        }
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        let Some(dt) = value.as_datetime() else {
            return Ok(());
        };
        if let Some(min) = self.min {
            if *dt < min {
                return Err(format!("must be at or after {min}"));
            }
        }
        if let Some(max) = self.max {
            if *dt > max {
                return Err(format!("must be at or before {max}"));
            }
        }
        if let Some(before) = self.before {
            if *dt >= before {
                return Err(format!("must be before {before}"));
            }
        }
        if let Some(after) = self.after {
            if *dt <= after {
                return Err(format!("must be after {after}"));
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
        if let Some(before) = self.before {
            out.push(format!("val < {before}"));
        }
        if let Some(after) = self.after {
            out.push(format!("val > {after}"));
        }
        out
    }
}

impl Validator<DateTimeKind> {
    /// Inclusive lower bound.
    pub fn min_value(mut self, min: NaiveDateTime) -> Self {
        self.kind.min = Some(min);
        self
    }

    /// Inclusive upper bound.
    pub fn max_value(mut self, max: NaiveDateTime) -> Self {
        self.kind.max = Some(max);
        self
    }

    /// Exclusive upper bound.
    pub fn before(mut self, limit: NaiveDateTime) -> Self {
        self.kind.before = Some(limit);
        self
    }

    /// Exclusive lower bound.
    pub fn after(mut self, limit: NaiveDateTime) -> Self {
        self.kind.after = Some(limit);
        self
    }
}
