//! The boundary to an interactive form.
//!
//! The handler describes what it needs as a [`Form`]; a [`FormProvider`]
//! shows it however it likes (a terminal, a desktop dialog, a test script)
//! and hands back the raw values the user entered.

use crate::error::{Error, Result};
use crate::spec::ArgumentSpec;
use indexmap::IndexMap;
use iokit_validate::{SemanticType, Value};
use serde::Serialize;

/// Which input control a field should be shown with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetKind {
    DropDown,
    Checkbox,
    Entry,
    FileSelect,
    DirSelect,
    PathSelect,
    DateTimeEdit,
    Text,
    ListTable,
    DictTable,
}

impl WidgetKind {
    pub fn for_field(semantic_type: SemanticType, has_choices: bool) -> Self {
        if has_choices {
            return WidgetKind::DropDown;
        }
        match semantic_type {
            SemanticType::Boolean => WidgetKind::Checkbox,
            SemanticType::Integer | SemanticType::Float => WidgetKind::Entry,
            SemanticType::File => WidgetKind::FileSelect,
            SemanticType::Directory => WidgetKind::DirSelect,
            SemanticType::Path => WidgetKind::PathSelect,
            SemanticType::DateTime => WidgetKind::DateTimeEdit,
            SemanticType::String => WidgetKind::Text,
            SemanticType::List => WidgetKind::ListTable,
            SemanticType::Mapping => WidgetKind::DictTable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub name: String,
    pub semantic_type: SemanticType,
    pub widget: WidgetKind,
    pub default: Option<Value>,
    /// Value from a previous submission, shown instead of the default.
    pub value: Option<Value>,
    pub help: String,
    pub required: bool,
    pub nullable: bool,
    pub choices: Vec<Value>,
}

impl FormField {
    pub fn from_spec(spec: &ArgumentSpec) -> Self {
        let choices = spec.choices().map(<[Value]>::to_vec).unwrap_or_default();
        Self {
            name: spec.name().to_string(),
            semantic_type: spec.semantic_type(),
            widget: WidgetKind::for_field(spec.semantic_type(), !choices.is_empty()),
            default: spec.default_value().cloned(),
            value: None,
            help: spec.help_text().to_string(),
            required: spec.is_required(),
            nullable: spec.is_nullable(),
            choices,
        }
    }

    /// What the field currently shows: the previous entry, else the default.
    pub fn current(&self) -> Option<&Value> {
        self.value.as_ref().or(self.default.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Form {
    pub title: String,
    pub description: String,
    pub fields: Vec<FormField>,
}

impl Form {
    pub fn from_specs(title: &str, description: &str, specs: &[ArgumentSpec]) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            fields: specs.iter().map(FormField::from_spec).collect(),
        }
    }

    /// Carry submitted values into the next presentation.
    pub fn prefill(&mut self, values: &IndexMap<String, Value>) {
        for field in &mut self.fields {
            field.value = values.get(&field.name).cloned();
        }
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormOutcome {
    /// Raw values keyed by field name. A field left out keeps its default;
    /// `Value::Null` means the user cleared it.
    Submitted(IndexMap<String, Value>),
    Cancelled,
}

pub trait FormProvider {
    fn present(&mut self, form: &Form) -> Result<FormOutcome>;

    /// Called when a submission was rejected. Returning `true` presents the
    /// form again with the submitted values filled in.
    fn retry(&mut self, _error: &Error) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widget_kind_follows_type_and_choices() {
        let cases = [
            (SemanticType::Boolean, WidgetKind::Checkbox),
            (SemanticType::Integer, WidgetKind::Entry),
            (SemanticType::Float, WidgetKind::Entry),
            (SemanticType::File, WidgetKind::FileSelect),
            (SemanticType::Directory, WidgetKind::DirSelect),
            (SemanticType::Path, WidgetKind::PathSelect),
            (SemanticType::DateTime, WidgetKind::DateTimeEdit),
            (SemanticType::String, WidgetKind::Text),
            (SemanticType::List, WidgetKind::ListTable),
            (SemanticType::Mapping, WidgetKind::DictTable),
        ];
        for (ty, widget) in cases {
            assert_eq!(WidgetKind::for_field(ty, false), widget, "{ty}");
            assert_eq!(WidgetKind::for_field(ty, true), WidgetKind::DropDown, "{ty}");
        }
    }

    #[test]
    fn fields_mirror_specs_and_prefill() {
        let specs = vec![
            ArgumentSpec::builder("mode", SemanticType::String)
                .choices(["fast", "slow"])
                .default("fast")
                .help("How hard to try")
                .build()
                .unwrap(),
            ArgumentSpec::builder("count", SemanticType::Integer)
                .build()
                .unwrap(),
        ];
        let mut form = Form::from_specs("demo", "", &specs);
        let mode = form.field("mode").unwrap();
        assert_eq!(mode.widget, WidgetKind::DropDown);
        assert_eq!(mode.current(), Some(&Value::from("fast")));
        assert_eq!(mode.choices.len(), 2);
        assert!(form.field("count").unwrap().required);

        let submitted: IndexMap<String, Value> =
            [("mode".to_string(), Value::from("slow"))].into_iter().collect();
        form.prefill(&submitted);
        assert_eq!(form.field("mode").unwrap().current(), Some(&Value::from("slow")));
        assert_eq!(form.field("count").unwrap().current(), None);
    }
}
