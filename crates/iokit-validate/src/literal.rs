//! Literal-only structural parser for list and mapping strings.
//!
//! Accepts numbers, quoted strings, `True`/`False`/`None` (and their JSON
//! spellings), lists, tuples and dicts. Names, calls, operators, sets and any
//! other expression form are rejected, so parsing untrusted input can never
//! execute anything.
//!
//! ```
//! use iokit_validate::{literal, Value};
//!
//! assert_eq!(
//!     literal::parse("[1, 'two', None]").unwrap(),
//!     Value::List(vec![Value::Int(1), Value::from("two"), Value::Null]),
//! );
//! assert!(literal::parse("__import__('os')").is_err());
//! ```

use crate::value::Value;
use indexmap::IndexMap;
use thiserror::Error;

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    /// Byte offset into the input.
    pub offset: usize,
    pub message: String,
}

/// Parse a complete literal. Surrounding whitespace is ignored; anything else
/// after the literal is an error.
pub fn parse(input: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser {
        src: input,
        pos: 0,
        depth: 0,
    };
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos != input.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('[') => self.nested(|p| p.sequence(']')),
            Some('(') => self.nested(Parser::tuple),
            Some('{') => self.nested(Parser::dict),
            Some(q @ ('"' | '\'')) => self.string(q).map(Value::Str),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.word(),
            Some(c) => Err(self.error(format!("unexpected character {c:?}"))),
        }
    }

    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Value, LiteralError>,
    ) -> Result<Value, LiteralError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("literal is nested too deeply"));
        }
        self.depth += 1;
        let out = parse(self);
        self.depth -= 1;
        out
    }

    /// Items up to `close`, after the opening bracket. Trailing commas allowed.
    fn sequence(&mut self, close: char) -> Result<Value, LiteralError> {
        self.bump();
        self.skip_ws();
        if self.eat(close) {
            return Ok(Value::List(Vec::new()));
        }
        let first = self.value()?;
        self.sequence_from(close, vec![first])
    }

    /// Continue a sequence whose items so far are `items`, positioned just
    /// after the last one.
    fn sequence_from(
        &mut self,
        close: char,
        mut items: Vec<Value>,
    ) -> Result<Value, LiteralError> {
        loop {
            self.skip_ws();
            if self.eat(',') {
                self.skip_ws();
                if self.eat(close) {
                    break;
                }
                items.push(self.value()?);
                continue;
            }
            if self.eat(close) {
                break;
            }
            return Err(self.error(format!("expected ',' or '{close}'")));
        }
        Ok(Value::List(items))
    }

    /// `()` and `(a, ...)` are tuples (read as lists); `(a)` is just `a`.
    fn tuple(&mut self) -> Result<Value, LiteralError> {
        self.bump();
        self.skip_ws();
        if self.eat(')') {
            return Ok(Value::List(Vec::new()));
        }
        let first = self.value()?;
        self.skip_ws();
        if self.eat(')') {
            return Ok(first);
        }
        self.sequence_from(')', vec![first])
    }

    fn dict(&mut self) -> Result<Value, LiteralError> {
        self.bump();
        let mut map = IndexMap::new();
        self.skip_ws();
        if self.eat('}') {
            return Ok(Value::Map(map));
        }
        loop {
            let key_at = self.pos;
            let key = match self.value()? {
                Value::Str(s) => s,
                scalar @ (Value::Int(_) | Value::Float(_) | Value::Bool(_) | Value::Null) => {
                    scalar.to_string()
                }
                _ => {
                    return Err(LiteralError {
                        offset: key_at,
                        message: "dict keys must be scalar literals".to_string(),
                    });
                }
            };
            self.skip_ws();
            if !self.eat(':') {
                return Err(match self.peek() {
                    Some(',' | '}') => self.error("set literals are not supported"),
                    _ => self.error("expected ':' after dict key"),
                });
            }
            self.skip_ws();
            let item = self.value()?;
            map.insert(key, item);
            self.skip_ws();
            if self.eat(',') {
                self.skip_ws();
                if self.eat('}') {
                    break;
                }
                continue;
            }
            if self.eat('}') {
                break;
            }
            return Err(self.error("expected ',' or '}'"));
        }
        Ok(Value::Map(map))
    }

    fn word(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }
            self.pos += c.len_utf8();
        }
        match &self.src[start..self.pos] {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            name => Err(LiteralError {
                offset: start,
                message: format!("names are not allowed in literals: {name:?}"),
            }),
        }
    }

    fn digits(&mut self, radix: u32, out: &mut String) -> bool {
        let mut any = false;
        let mut last_underscore = false;
        while let Some(c) = self.peek() {
            if c.is_digit(radix) {
                out.push(c);
                any = true;
                last_underscore = false;
            } else if c == '_' && any && !last_underscore {
                last_underscore = true;
            } else {
                break;
            }
            self.pos += 1;
        }
        if last_underscore {
            self.pos -= 1;
        }
        any
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let mut text = String::new();
        if let Some(sign @ ('-' | '+')) = self.peek() {
            self.pos += 1;
            if sign == '-' {
                text.push('-');
            }
            self.skip_ws();
        }

        let rest = self.rest();
        let radix = match rest.get(..2).map(str::to_ascii_lowercase).as_deref() {
            Some("0x") => 16,
            Some("0o") => 8,
            Some("0b") => 2,
            _ => 10,
        };
        if radix != 10 {
            self.pos += 2;
            let mut body = String::new();
            if !self.digits(radix, &mut body) {
                return Err(self.error("expected digits after radix prefix"));
            }
            self.reject_suffix()?;
            let magnitude = i64::from_str_radix(&body, radix).map_err(|_| LiteralError {
                offset: start,
                message: "integer literal out of range".to_string(),
            })?;
            let value = if text.starts_with('-') { -magnitude } else { magnitude };
            return Ok(Value::Int(value));
        }

        let mut is_float = false;
        let int_part = self.digits(10, &mut text);
        if self.peek() == Some('.') {
            self.pos += 1;
            text.push('.');
            let frac_part = self.digits(10, &mut text);
            if !int_part && !frac_part {
                return Err(self.error("expected digits"));
            }
            is_float = true;
        } else if !int_part {
            return Err(self.error("expected a number"));
        }
        if let Some('e' | 'E') = self.peek() {
            self.pos += 1;
            text.push('e');
            if let Some(sign @ ('-' | '+')) = self.peek() {
                self.pos += 1;
                text.push(sign);
            }
            if !self.digits(10, &mut text) {
                return Err(self.error("expected exponent digits"));
            }
            is_float = true;
        }
        self.reject_suffix()?;

        if is_float {
            let value: f64 = text.parse().map_err(|_| LiteralError {
                offset: start,
                message: format!("invalid float literal {text:?}"),
            })?;
            if !value.is_finite() {
                return Err(LiteralError {
                    offset: start,
                    message: "float literal is out of range".to_string(),
                });
            }
            Ok(Value::Float(value))
        } else {
            text.parse::<i64>().map(Value::Int).map_err(|_| LiteralError {
                offset: start,
                message: "integer literal out of range".to_string(),
            })
        }
    }

    /// `1j`, `2abc` and friends are not literals we understand.
    fn reject_suffix(&self) -> Result<(), LiteralError> {
        match self.peek() {
            Some(c) if c.is_alphanumeric() || c == '_' || c == '.' => {
                Err(self.error(format!("unexpected character {c:?} in number")))
            }
            _ => Ok(()),
        }
    }

    fn hex_escape(&mut self, len: usize) -> Result<char, LiteralError> {
        let rest = self.rest();
        let digits = rest
            .get(..len)
            .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| self.error(format!("expected {len} hex digits in escape")))?;
        let code = u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid escape"))?;
        self.pos += len;
        char::from_u32(code).ok_or_else(|| self.error("escape is not a valid character"))
    }

    fn braced_escape(&mut self) -> Result<char, LiteralError> {
        let rest = self.rest();
        let end = rest
            .find('}')
            .filter(|&end| end > 0 && end <= 6)
            .ok_or_else(|| self.error("expected 1-6 hex digits in braces"))?;
        let code = u32::from_str_radix(&rest[..end], 16).map_err(|_| self.error("invalid escape"))?;
        self.pos += end + 1;
        char::from_u32(code).ok_or_else(|| self.error("escape is not a valid character"))
    }

    fn string(&mut self, quote: char) -> Result<String, LiteralError> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(LiteralError {
                    offset: start,
                    message: "unterminated string".to_string(),
                });
            };
            match c {
                c if c == quote => break,
                '\n' => {
                    return Err(LiteralError {
                        offset: start,
                        message: "unterminated string".to_string(),
                    });
                }
                '\\' => {
                    let Some(escaped) = self.bump() else {
                        return Err(self.error("unterminated escape"));
                    };
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        'a' => out.push('\u{7}'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        'v' => out.push('\u{b}'),
                        '\\' | '\'' | '"' => out.push(escaped),
                        '\n' => {}
                        'x' => out.push(self.hex_escape(2)?),
                        'u' if self.eat('{') => out.push(self.braced_escape()?),
                        'u' => out.push(self.hex_escape(4)?),
                        'U' => out.push(self.hex_escape(8)?),
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> Value {
        Value::Int(i)
    }

    #[test]
    fn scalars() {
        assert_eq!(parse("42").unwrap(), int(42));
        assert_eq!(parse(" -7 ").unwrap(), int(-7));
        assert_eq!(parse("1_000").unwrap(), int(1000));
        assert_eq!(parse("0x1F").unwrap(), int(31));
        assert_eq!(parse("-0b101").unwrap(), int(-5));
        assert_eq!(parse("2.5").unwrap(), Value::Float(2.5));
        assert_eq!(parse(".5").unwrap(), Value::Float(0.5));
        assert_eq!(parse("5.").unwrap(), Value::Float(5.0));
        assert_eq!(parse("1e3").unwrap(), Value::Float(1000.0));
        assert_eq!(parse("True").unwrap(), Value::Bool(true));
        assert_eq!(parse("null").unwrap(), Value::Null);
        assert_eq!(parse(r#""a\tb""#).unwrap(), Value::from("a\tb"));
        assert_eq!(parse(r"'it\'s'").unwrap(), Value::from("it's"));
        assert_eq!(parse(r"'\x41é\u{1F600}'").unwrap(), Value::from("Aé😀"));
        assert_eq!(parse(r"'\d'").unwrap(), Value::from("\\d"));
    }

    #[test]
    fn containers() {
        assert_eq!(
            parse("[1, [2, 3], ]").unwrap(),
            Value::List(vec![int(1), Value::List(vec![int(2), int(3)])])
        );
        assert_eq!(parse("()").unwrap(), Value::List(vec![]));
        assert_eq!(parse("(1,)").unwrap(), Value::List(vec![int(1)]));
        assert_eq!(parse("(1)").unwrap(), int(1));
        assert_eq!(parse("((1, 2))").unwrap(), Value::List(vec![int(1), int(2)]));

        let Value::Map(map) = parse("{'a': 1, 'b': {'c': None}, 'a': 2}").unwrap() else {
            panic!("expected map");
        };
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], int(2));
        assert_eq!(map.get_index(0).map(|(k, _)| k.as_str()), Some("a"));
    }

    #[test]
    fn rejects_expressions() {
        for input in [
            "__import__('os')",
            "os.system('ls')",
            "1 + 2",
            "[x for x in y]",
            "{1, 2}",
            "lambda: 0",
            "[1, 2",
            "'unterminated",
            "1j",
            "- x",
            "{[1]: 2}",
            "not a literal (",
            "",
            "[1] [2]",
            "b'bytes'",
        ] {
            assert!(parse(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn reports_offsets() {
        let err = parse("[1, foo]").unwrap_err();
        assert_eq!(err.offset, 4);
        assert!(err.message.contains("foo"));
        let err = parse("{1, 2}").unwrap_err();
        assert!(err.message.contains("set literals"), "{err}");
    }

    #[test]
    fn caps_nesting_depth() {
        let deep = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        let err = parse(&deep).unwrap_err();
        assert!(err.message.contains("nested too deeply"));
        let ok = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse(&ok).is_ok());
    }

    #[test]
    fn nested_tuples_parse_in_one_pass() {
        let depth = 60;
        let input = format!("{}1{}", "(".repeat(depth), ",)".repeat(depth));
        let started = std::time::Instant::now();
        let mut value = parse(&input).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        for _ in 0..depth {
            let Value::List(mut items) = value else {
                panic!("expected a singleton list");
            };
            assert_eq!(items.len(), 1);
            value = items.remove(0);
        }
        assert_eq!(value, int(1));

        let grouped = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&grouped).unwrap(), int(1));
        assert_eq!(
            parse("((1, 2), 3,)").unwrap(),
            Value::List(vec![Value::List(vec![int(1), int(2)]), int(3)])
        );
    }

    #[test]
    fn display_output_parses_back() {
        let original = parse(r#"{"k": ["a\"b", 1.0, None, {"n": [True]}]}"#).unwrap();
        assert_eq!(parse(&original.to_string()).unwrap(), original);
    }
}
