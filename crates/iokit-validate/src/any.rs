use crate::error::ValidateError;
use crate::validator::{Rules, SemanticType, Strictness, Validator};
use crate::value::Value;
use crate::{
    BooleanKind, DateTimeKind, DirectoryKind, FileKind, FloatKind, IntegerKind, ListKind,
    MappingKind, PathKind, StringKind,
};

/// A validator of any semantic type.
///
/// This is what an argument spec owns: the concrete kind is fixed by its
/// semantic type, the shared configuration is reachable without knowing it.
#[derive(Debug, Clone)]
pub enum AnyValidator {
    Integer(Validator<IntegerKind>),
    Float(Validator<FloatKind>),
    Boolean(Validator<BooleanKind>),
    String(Validator<StringKind>),
    List(Validator<ListKind>),
    Mapping(Validator<MappingKind>),
    DateTime(Validator<DateTimeKind>),
    Path(Validator<PathKind>),
    File(Validator<FileKind>),
    Directory(Validator<DirectoryKind>),
}

/// Run `$body` with `$v` bound to the inner validator.
macro_rules! with_inner {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            AnyValidator::Integer($v) => $body,
            AnyValidator::Float($v) => $body,
            AnyValidator::Boolean($v) => $body,
            AnyValidator::String($v) => $body,
            AnyValidator::List($v) => $body,
            AnyValidator::Mapping($v) => $body,
            AnyValidator::DateTime($v) => $body,
            AnyValidator::Path($v) => $body,
            AnyValidator::File($v) => $body,
            AnyValidator::Directory($v) => $body,
        }
    };
}

/// Rebuild the same variant around the result of a consuming builder call.
macro_rules! map_inner {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            AnyValidator::Integer($v) => AnyValidator::Integer($body),
            AnyValidator::Float($v) => AnyValidator::Float($body),
            AnyValidator::Boolean($v) => AnyValidator::Boolean($body),
            AnyValidator::String($v) => AnyValidator::String($body),
            AnyValidator::List($v) => AnyValidator::List($body),
            AnyValidator::Mapping($v) => AnyValidator::Mapping($body),
            AnyValidator::DateTime($v) => AnyValidator::DateTime($body),
            AnyValidator::Path($v) => AnyValidator::Path($body),
            AnyValidator::File($v) => AnyValidator::File($body),
            AnyValidator::Directory($v) => AnyValidator::Directory($body),
        }
    };
}

impl AnyValidator {
    pub fn semantic_type(&self) -> SemanticType {
        with_inner!(self, v => v.semantic_type())
    }

    pub fn rules(&self) -> &Rules {
        with_inner!(self, v => v.rules())
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        with_inner!(self, v => v.is_valid(value))
    }

    pub fn coerce(&self, value: &Value) -> Result<Value, ValidateError> {
        with_inner!(self, v => v.coerce(value))
    }

    pub fn describe_rules(&self) -> Vec<String> {
        with_inner!(self, v => v.describe_rules())
    }

    pub fn nullable(self, nullable: bool) -> Self {
        map_inner!(self, v => v.nullable(nullable))
    }

    pub fn strictness(self, strictness: Strictness) -> Self {
        map_inner!(self, v => v.strictness(strictness))
    }

    pub fn choices<I, V>(self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        map_inner!(self, v => v.choices(choices))
    }

    pub fn add_condition<F>(self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        map_inner!(self, v => v.add_condition(name, predicate))
    }

    pub fn with_condition(self, condition: crate::Condition) -> Self {
        map_inner!(self, v => v.with_condition(condition))
    }
}

macro_rules! impl_from_validator {
    ($($kind:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<Validator<$kind>> for AnyValidator {
                fn from(v: Validator<$kind>) -> Self {
                    AnyValidator::$variant(v)
                }
            }
        )*
    };
}

impl_from_validator! {
    IntegerKind => Integer,
    FloatKind => Float,
    BooleanKind => Boolean,
    StringKind => String,
    ListKind => List,
    MappingKind => Mapping,
    DateTimeKind => DateTime,
    PathKind => Path,
    FileKind => File,
    DirectoryKind => Directory,
}
