//! Collect typed arguments from a mapping, the command line or a form.
//!
//! ```no_run
//! use iokit::{ArgumentSpec, IOHandler, SemanticType, Validate};
//!
//! # fn main() -> iokit::Result<()> {
//! let mut handler = IOHandler::new("resize").description("Resize an image.");
//! handler
//!     .add_arg(ArgumentSpec::builder("input", SemanticType::File).build()?)?
//!     .add_arg(
//!         ArgumentSpec::builder("width", SemanticType::Integer)
//!             .validator(Validate::int().min_value(1))
//!             .default(640)
//!             .build()?,
//!     )?;
//! let values = handler.collect_input(None)?;
//! println!("{}", values["width"]);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod form;
pub mod handler;
pub mod spec;
pub mod terminal;

pub use error::{Error, FieldError, Result};
pub use form::{Form, FormField, FormOutcome, FormProvider, WidgetKind};
pub use handler::{IOHandler, ResultNamespace, RunMode};
pub use iokit_validate::{
    self as validate, AnyValidator, SemanticType, Strictness, Validate, Value,
};
pub use spec::{ArgumentSpec, ArgumentSpecBuilder, Dependency, DependencyMode};
pub use terminal::TerminalForm;
