use crate::any::AnyValidator;
use crate::validator::{SemanticType, Validator};
use crate::{
    BooleanValidator, DateTimeValidator, DirectoryValidator, FileValidator, FloatValidator,
    IntegerValidator, ListValidator, MappingValidator, PathValidator, StringValidator,
};

/// Named access to one validator per semantic type.
///
/// Every call builds a fresh validator, so configuring the returned value
/// never leaks into anyone else's.
pub struct Validate;

impl Validate {
    pub fn int() -> IntegerValidator {
        Validator::new()
    }

    pub fn float() -> FloatValidator {
        Validator::new()
    }

    pub fn bool() -> BooleanValidator {
        Validator::new()
    }

    pub fn str() -> StringValidator {
        Validator::new()
    }

    pub fn list() -> ListValidator {
        Validator::new()
    }

    pub fn dict() -> MappingValidator {
        Validator::new()
    }

    pub fn datetime() -> DateTimeValidator {
        Validator::new()
    }

    pub fn path() -> PathValidator {
        Validator::new()
    }

    pub fn file() -> FileValidator {
        Validator::new()
    }

    pub fn dir() -> DirectoryValidator {
        Validator::new()
    }

    /// Dispatch table from semantic type to constructor.
    pub fn for_type(ty: SemanticType) -> AnyValidator {
        let ctor: fn() -> AnyValidator = match ty {
            SemanticType::Integer => || AnyValidator::from(Validate::int()),
            SemanticType::Float => || AnyValidator::from(Validate::float()),
            SemanticType::Boolean => || AnyValidator::from(Validate::bool()),
            SemanticType::String => || AnyValidator::from(Validate::str()),
            SemanticType::List => || AnyValidator::from(Validate::list()),
            SemanticType::Mapping => || AnyValidator::from(Validate::dict()),
            SemanticType::DateTime => || AnyValidator::from(Validate::datetime()),
            SemanticType::Path => || AnyValidator::from(Validate::path()),
            SemanticType::File => || AnyValidator::from(Validate::file()),
            SemanticType::Directory => || AnyValidator::from(Validate::dir()),
        };
        ctor()
    }

    /// Look up a validator by type name (`"int"`, `"Dict"`, `"directory"`...).
    pub fn by_name(name: &str) -> Option<AnyValidator> {
        name.parse::<SemanticType>().ok().map(Validate::for_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Strictness, Value};
    use chrono::NaiveDate;
    use std::path::PathBuf;

    #[test]
    fn dispatch_matches_semantic_type() {
        for ty in SemanticType::ALL {
            assert_eq!(Validate::for_type(ty).semantic_type(), ty);
        }
        assert_eq!(
            Validate::by_name("Int").map(|v| v.semantic_type()),
            Some(SemanticType::Integer)
        );
        assert!(Validate::by_name("decimal").is_none());
    }

    #[test]
    fn each_access_is_a_fresh_instance() {
        let first = Validate::for_type(SemanticType::Integer).add_condition("never", |_| false);
        let second = Validate::for_type(SemanticType::Integer);
        assert!(!first.is_valid(&Value::from(1)));
        assert!(second.is_valid(&Value::from(1)));
        assert!(second.rules().conditions().is_empty());
    }

    /// One native value per semantic type. File and directory samples live
    /// inside `dir`.
    fn native_samples(dir: &std::path::Path) -> Vec<(SemanticType, Value)> {
        let file = dir.join("sample.txt");
        std::fs::write(&file, "sample").unwrap();
        let dt = NaiveDate::from_ymd_opt(2020, 5, 17)
            .and_then(|d| d.and_hms_opt(8, 15, 0))
            .unwrap();
        vec![
            (SemanticType::Integer, Value::Int(-3)),
            (SemanticType::Float, Value::Float(2.5)),
            (SemanticType::Boolean, Value::Bool(true)),
            (SemanticType::String, Value::from("text")),
            (SemanticType::List, Value::List(vec![Value::Int(1), Value::Null])),
            (SemanticType::Mapping, Value::Map([("k".to_string(), Value::Int(1))].into_iter().collect())),
            (SemanticType::DateTime, Value::DateTime(dt)),
            (SemanticType::Path, Value::Path(PathBuf::from("relative/path"))),
            (SemanticType::File, Value::Path(file)),
            (SemanticType::Directory, Value::Path(dir.to_path_buf())),
        ]
    }

    #[test]
    fn native_values_pass_through_unchanged_at_every_strictness() {
        let dir = tempfile::tempdir().unwrap();
        let samples = native_samples(dir.path());
        assert_eq!(samples.len(), SemanticType::ALL.len());
        for strictness in [Strictness::Strict, Strictness::Coerce, Strictness::Loose] {
            for (ty, value) in samples.clone() {
                let v = Validate::for_type(ty).strictness(strictness);
                assert!(v.is_valid(&value), "{ty} rejected {value:?} under {strictness}");
                assert_eq!(v.coerce(&value).unwrap(), value);
            }
        }
    }

    #[test]
    fn coercion_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "notes").unwrap();
        let file = file.to_string_lossy().into_owned();
        let folder = dir.path().to_string_lossy().into_owned();
        let raws = [
            (SemanticType::Integer, "12"),
            (SemanticType::Float, "0.5"),
            (SemanticType::Boolean, "false"),
            (SemanticType::String, "abc"),
            (SemanticType::List, "[1, 'b', (2, 3)]"),
            (SemanticType::Mapping, "{'a': [1]}"),
            (SemanticType::DateTime, "2021-02-03 04:05:06"),
            (SemanticType::Path, "a/b"),
            (SemanticType::File, file.as_str()),
            (SemanticType::Directory, folder.as_str()),
        ];
        for (ty, raw) in raws {
            let v = Validate::for_type(ty);
            let once = v.coerce(&Value::from(raw)).unwrap();
            assert_eq!(v.coerce(&once).unwrap(), once, "{ty}");
        }
    }
}
