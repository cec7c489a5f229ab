//! Typed coercion and validation of argument values.
//!
//! Every argument collected by `iokit` targets one [`SemanticType`]. A
//! [`Validator`] for that type turns a loosely-typed raw [`Value`] (usually a
//! string from the command line or a form) into the target representation,
//! then checks choices, bounds and named [`Condition`]s.
//!
//! ```
//! use iokit_validate::{Validate, Value};
//!
//! let port = Validate::int().min_value(1).max_value(65535);
//! assert_eq!(port.coerce(&Value::from("8080")).unwrap(), Value::Int(8080));
//! assert!(!port.is_valid(&Value::from(0)));
//! ```
//!
//! List and mapping strings are read by [`literal::parse`], a literal-only
//! structural parser. Nothing is ever evaluated.

mod any;
mod collection;
mod condition;
mod error;
pub mod literal;
mod numeric;
mod path;
mod registry;
mod temporal;
mod text;
mod validator;
mod value;

pub use any::AnyValidator;
pub use collection::{ListKind, MappingKind};
pub use condition::Condition;
pub use error::{CoercionError, ValidateError, ValidationError};
pub use literal::LiteralError;
pub use numeric::{FloatKind, IntegerKind};
pub use path::{DirectoryKind, FileKind, PathKind};
pub use registry::Validate;
pub use temporal::DateTimeKind;
pub use text::{BooleanKind, StringKind};
pub use validator::{Kind, Rules, SemanticType, Strictness, UnknownSemanticType, Validator};
pub use value::Value;

pub type IntegerValidator = Validator<IntegerKind>;
pub type FloatValidator = Validator<FloatKind>;
pub type BooleanValidator = Validator<BooleanKind>;
pub type StringValidator = Validator<StringKind>;
pub type ListValidator = Validator<ListKind>;
pub type MappingValidator = Validator<MappingKind>;
pub type DateTimeValidator = Validator<DateTimeKind>;
pub type PathValidator = Validator<PathKind>;
pub type FileValidator = Validator<FileKind>;
pub type DirectoryValidator = Validator<DirectoryKind>;
