use crate::error::{Error, Result};
use crate::form::{Form, FormField, FormOutcome, FormProvider, WidgetKind};
use indexmap::IndexMap;
use iokit_validate::Value;
use std::io::{BufRead, Write};

const CANCEL: &str = ":cancel";
const NULL: &str = ":null";

/// A line-oriented form: one prompt per field.
///
/// An empty line keeps what the field shows, `:null` clears it and
/// `:cancel` (or end of input) abandons the form.
pub struct TerminalForm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalForm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn prompt(&mut self, field: &FormField) -> Result<()> {
        if !field.help.trim().is_empty() {
            writeln!(self.output, "  {}", field.help.trim())?;
        }
        if field.widget == WidgetKind::DropDown {
            let choices: Vec<String> = field.choices.iter().map(|c| c.to_string()).collect();
            writeln!(self.output, "  choices: {}", choices.join(", "))?;
        }

        let mut label = format!("{} ({}", field.name, field.semantic_type);
        if field.required {
            label.push_str(", required");
        }
        label.push(')');
        if field.widget == WidgetKind::Checkbox {
            label.push_str(" [y/n]");
        }
        if let Some(current) = field.current() {
            label.push_str(&format!(" [{current}]"));
        }
        write!(self.output, "{label}: ")?;
        self.output.flush()?;
        Ok(())
    }
}

fn checkbox_value(answer: &str) -> Value {
    match answer.to_ascii_lowercase().as_str() {
        "y" | "yes" => Value::Bool(true),
        "n" | "no" => Value::Bool(false),
        _ => Value::from(answer),
    }
}

impl<R: BufRead, W: Write> FormProvider for TerminalForm<R, W> {
    fn present(&mut self, form: &Form) -> Result<FormOutcome> {
        writeln!(self.output, "{}", form.title)?;
        if !form.description.trim().is_empty() {
            writeln!(self.output, "{}", form.description.trim_end())?;
        }
        writeln!(self.output, "(enter keeps the shown value, {NULL} clears it, {CANCEL} quits)")?;

        let mut values = IndexMap::new();
        for field in &form.fields {
            self.prompt(field)?;
            let Some(answer) = self.read_line()? else {
                writeln!(self.output)?;
                return Ok(FormOutcome::Cancelled);
            };
            let value = match answer.as_str() {
                CANCEL => return Ok(FormOutcome::Cancelled),
                NULL => Some(Value::Null),
                "" => field.value.clone(),
                text if field.widget == WidgetKind::Checkbox => Some(checkbox_value(text)),
                text => Some(Value::from(text)),
            };
            if let Some(value) = value {
                values.insert(field.name.clone(), value);
            }
        }
        Ok(FormOutcome::Submitted(values))
    }

    fn retry(&mut self, error: &Error) -> Result<bool> {
        let rejected = match error {
            Error::InvalidArguments(errors) => errors.as_slice(),
            Error::MissingArgument { names, errors } => {
                writeln!(self.output, "missing required argument(s): {}", names.join(", "))?;
                errors.as_slice()
            }
            other => {
                writeln!(self.output, "{other}")?;
                &[]
            }
        };
        if !rejected.is_empty() {
            writeln!(self.output, "Some values were rejected:")?;
            for err in rejected {
                writeln!(self.output, "  {err}")?;
            }
        }
        write!(self.output, "Try again? [Y/n]: ")?;
        self.output.flush()?;
        Ok(match self.read_line()? {
            None => false,
            Some(answer) => !matches!(answer.to_ascii_lowercase().as_str(), "n" | "no"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::IOHandler;
    use crate::spec::ArgumentSpec;
    use iokit_validate::SemanticType;
    use std::io::Cursor;

    fn handler() -> IOHandler {
        let mut h = IOHandler::new("setup").description("Configure the thing.");
        h.add_arg(
            ArgumentSpec::builder("name", SemanticType::String)
                .help("Display name")
                .build()
                .unwrap(),
        )
        .unwrap()
        .add_arg(
            ArgumentSpec::builder("level", SemanticType::Integer)
                .choices([1, 2, 3])
                .default(2)
                .build()
                .unwrap(),
        )
        .unwrap()
        .add_arg(
            ArgumentSpec::builder("force", SemanticType::Boolean)
                .default(false)
                .build()
                .unwrap(),
        )
        .unwrap()
        .add_arg(
            ArgumentSpec::builder("tag", SemanticType::String)
                .nullable(true)
                .default("main")
                .build()
                .unwrap(),
        )
        .unwrap();
        h
    }

    fn run(script: &str) -> (Result<crate::ResultNamespace>, String) {
        let mut form = TerminalForm::new(Cursor::new(script.as_bytes().to_vec()), Vec::new());
        let result = handler().collect_with_form(&mut form);
        let (_, out) = form.into_inner();
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn prompts_and_collects() {
        let (result, out) = run("Ada\n\ny\n:null\n");
        let ns = result.unwrap();
        assert_eq!(ns["name"], Value::from("Ada"));
        assert_eq!(ns["level"], Value::Int(2));
        assert_eq!(ns["force"], Value::Bool(true));
        assert_eq!(ns["tag"], Value::Null);

        assert!(out.starts_with("setup\nConfigure the thing.\n"), "{out}");
        assert!(out.contains("  Display name\nname (string, required): "), "{out}");
        assert!(out.contains("  choices: 1, 2, 3\nlevel (integer) [2]: "), "{out}");
        assert!(out.contains("force (boolean) [y/n] [false]: "), "{out}");
    }

    #[test]
    fn cancel_and_end_of_input() {
        let (result, _) = run("Ada\n:cancel\n");
        assert!(matches!(result, Err(Error::Cancelled)));

        let (result, _) = run("Ada\n");
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn rejected_values_are_shown_and_retried() {
        let (result, out) = run("Ada\n7\n\n\n\n\n5\n\n\n");
        assert!(out.contains("Some values were rejected:"), "{out}");
        assert!(out.contains("  level: "), "{out}");
        assert!(out.contains("level (integer) [7]: "), "{out}");
        let Err(Error::InvalidArguments(errors)) = result else {
            panic!("expected InvalidArguments after the second attempt");
        };
        assert_eq!(errors[0].argument, "level");
    }

    #[test]
    fn declining_retry_returns_the_error() {
        let (result, out) = run("\n\n\n\nn\n");
        assert!(out.contains("missing required argument(s): name"), "{out}");
        assert!(matches!(result, Err(Error::MissingArgument { .. })));
    }

    #[test]
    fn missing_and_rejected_values_are_shown_together() {
        let (result, out) = run("\n7\n\n\nn\n");
        assert!(out.contains("missing required argument(s): name"), "{out}");
        assert!(out.contains("Some values were rejected:\n  level: "), "{out}");
        let Err(Error::MissingArgument { names, errors }) = result else {
            panic!("expected MissingArgument");
        };
        assert_eq!(names, ["name"]);
        assert_eq!(errors[0].argument, "level");
    }
}
