use crate::value::Value;
use std::fmt;
use std::sync::Arc;

type Predicate = dyn Fn(&Value) -> bool + Send + Sync;

/// A named predicate over a coerced value.
///
/// The name is what error messages and help output show, so it should read
/// as the rule itself (`"even"`, `"len(val) <= 8"`).
#[derive(Clone)]
pub struct Condition {
    name: String,
    predicate: Arc<Predicate>,
}

impl Condition {
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, value: &Value) -> bool {
        (self.predicate)(value)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition").field("name", &self.name).finish_non_exhaustive()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
