use crate::validator::{Kind, SemanticType, Strictness, mismatch};
use crate::value::Value;
use std::path::PathBuf;

/// `Loose` accepts nothing beyond `Coerce` for path-like kinds.
fn to_path(value: &Value, strictness: Strictness) -> Result<PathBuf, String> {
    match (value, strictness) {
        (Value::Path(p), _) => Ok(p.clone()),
        (_, Strictness::Strict) => Err(mismatch(value, strictness)),
        (Value::Str(s), _) if s.trim().is_empty() => Err("an empty string is not a path".to_string()),
        (Value::Str(s), _) => Ok(PathBuf::from(s)),
        _ => Err(mismatch(value, strictness)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathKind;

impl Kind for PathKind {
    const TYPE: SemanticType = SemanticType::Path;

    fn convert(&self, value: &Value, strictness: Strictness) -> Result<Value, String> {
        to_path(value, strictness).map(Value::Path)
    }
}

/// A path naming an existing regular file.
#[derive(Debug, Clone, Default)]
pub struct FileKind;

impl Kind for FileKind {
    const TYPE: SemanticType = SemanticType::File;

    fn convert(&self, value: &Value, strictness: Strictness) -> Result<Value, String> {
        let path = to_path(value, strictness)?;
        if !path.is_file() {
            return Err(format!("'{}' is not an existing file", path.display()));
        }
        Ok(Value::Path(path))
    }
}

/// A path naming an existing directory.
#[derive(Debug, Clone, Default)]
pub struct DirectoryKind;

impl Kind for DirectoryKind {
    const TYPE: SemanticType = SemanticType::Directory;

    fn convert(&self, value: &Value, strictness: Strictness) -> Result<Value, String> {
        let path = to_path(value, strictness)?;
        if !path.is_dir() {
            return Err(format!("'{}' is not an existing directory", path.display()));
        }
        Ok(Value::Path(path))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Validate, Value};
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn path_accepts_any_non_empty_string() {
        let v = Validate::path();
        assert_eq!(
            v.coerce(&Value::from("does/not/exist.txt")).unwrap(),
            Value::Path(PathBuf::from("does/not/exist.txt"))
        );
        assert!(v.coerce(&Value::from("")).unwrap_err().is_coercion());
        assert!(!Validate::path().strict().is_valid(&Value::from("a")));
    }

    #[test]
    fn file_and_directory_require_existing_targets() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        fs::write(&file, "hello").unwrap();

        let files = Validate::file();
        assert_eq!(
            files.coerce(&Value::from(file.to_string_lossy().as_ref())).unwrap(),
            Value::Path(file.clone())
        );
        assert!(!files.is_valid(&Value::Path(dir.path().to_path_buf())));
        assert!(!files.is_valid(&Value::Path(dir.path().join("missing.txt"))));

        let dirs = Validate::dir();
        assert!(dirs.is_valid(&Value::Path(dir.path().to_path_buf())));
        assert!(!dirs.is_valid(&Value::Path(file.clone())));

        let strict = Validate::file().strict();
        assert!(strict.is_valid(&Value::Path(file.clone())));
        assert!(!strict.is_valid(&Value::from(file.to_string_lossy().as_ref())));
    }
}
