//! Discovery and name parsing of on-disk migration files.

use std::path::{Path, PathBuf};

use crate::error::MigrateError;

/// One discovered migration file, not yet read or applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Version token: everything before the first underscore.
    pub version: String,
    /// Human-readable description: everything after the first underscore.
    pub description: String,
    /// Absolute or directory-relative path to the `.sql` file.
    pub path: PathBuf,
}

/// Split a migration file name into `(version, description)`.
///
/// The expected shape is `{version}_{description}.sql`. Both parts must be
/// non-empty.
///
/// # Errors
///
/// Returns [`MigrateError::InvalidMigrationFile`] when the `.sql` suffix,
/// the underscore separator, or the version prefix is missing.
pub fn parse_file_name(name: &str) -> Result<(String, String), MigrateError> {
    let stem = name
        .strip_suffix(".sql")
        .ok_or_else(|| MigrateError::InvalidMigrationFile(name.to_owned()))?;

    let (version, description) = stem
        .split_once('_')
        .ok_or_else(|| MigrateError::InvalidMigrationFile(name.to_owned()))?;

    if version.is_empty() || description.is_empty() {
        return Err(MigrateError::InvalidMigrationFile(name.to_owned()));
    }

    Ok((version.to_owned(), description.to_owned()))
}

/// Enumerate every `.sql` file in `dir`, sorted lexicographically by version.
///
/// Non-`.sql` entries and subdirectories are ignored. Any `.sql` file whose
/// name does not parse aborts discovery: a malformed file in the migrations
/// directory is a deployment error, not something to skip silently.
///
/// # Errors
///
/// Returns [`MigrateError::Io`] if the directory cannot be read and
/// [`MigrateError::InvalidMigrationFile`] on the first malformed name.
pub fn discover(dir: &Path) -> Result<Vec<MigrationFile>, MigrateError> {
    let entries = std::fs::read_dir(dir).map_err(|source| MigrateError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| MigrateError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".sql") {
            continue;
        }
        let (version, description) = parse_file_name(name)?;
        files.push(MigrationFile {
            version,
            description,
            path,
        });
    }

    files.sort_by(|a, b| a.version.cmp(&b.version));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_versioned_name() {
        let (version, description) = parse_file_name("001_init.sql").unwrap();
        assert_eq!(version, "001");
        assert_eq!(description, "init");
    }

    #[test]
    fn description_may_contain_underscores() {
        let (version, description) = parse_file_name("002_add_index.sql").unwrap();
        assert_eq!(version, "002");
        assert_eq!(description, "add_index");
    }

    #[test]
    fn rejects_missing_version_prefix() {
        assert!(matches!(
            parse_file_name("abc.sql"),
            Err(MigrateError::InvalidMigrationFile(_))
        ));
    }

    #[test]
    fn rejects_empty_version() {
        assert!(parse_file_name("_init.sql").is_err());
    }

    #[test]
    fn rejects_empty_description() {
        assert!(parse_file_name("001_.sql").is_err());
    }

    #[test]
    fn rejects_non_sql_suffix() {
        assert!(parse_file_name("001_init.txt").is_err());
    }

    #[test]
    fn discover_sorts_by_version() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("002_add_index.sql"), "SELECT 2;").unwrap();
        std::fs::write(dir.path().join("001_init.sql"), "SELECT 1;").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let files = discover(dir.path()).unwrap();
        let versions: Vec<_> = files.iter().map(|f| f.version.as_str()).collect();
        assert_eq!(versions, vec!["001", "002"]);
    }

    #[test]
    fn discover_aborts_on_malformed_sql_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("001_init.sql"), "SELECT 1;").unwrap();
        std::fs::write(dir.path().join("abc.sql"), "SELECT 0;").unwrap();

        assert!(matches!(
            discover(dir.path()),
            Err(MigrateError::InvalidMigrationFile(name)) if name == "abc.sql"
        ));
    }

    #[test]
    fn discover_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(matches!(discover(&missing), Err(MigrateError::Io { .. })));
    }
}
