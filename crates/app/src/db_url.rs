//! SQLite URL handling for the binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};

pub const MEMORY_URL: &str = "sqlite::memory:";

/// Turn `sqlite:rel/path`, `rel/path` or `/abs/path` into `sqlite:///abs/path`.
#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == MEMORY_URL || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file (and its directory) so the pool can open it.
///
/// # Errors
///
/// Fails for URLs without a file path or when the file cannot be created.
pub fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if db_url == MEMORY_URL {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid database url: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database url: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("sqlite:data/mentor.sqlite3");
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/mentor.sqlite3"));

        assert_eq!(normalize_sqlite_url(MEMORY_URL), MEMORY_URL);
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/x.db"),
            "sqlite:///tmp/x.db"
        );
    }

    #[test]
    fn prepare_creates_missing_files() {
        let dir = std::env::temp_dir().join(format!("mentor_db_url_{}", std::process::id()));
        let file = dir.join("nested").join("mentor.sqlite3");
        let url = format!("sqlite://{}?mode=rwc", file.display());

        prepare_sqlite_file(&url).unwrap();
        assert!(file.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn prepare_rejects_urls_without_a_path() {
        assert!(prepare_sqlite_file("postgres://localhost/db").is_err());
        assert!(prepare_sqlite_file("sqlite://").is_err());
        assert!(prepare_sqlite_file(MEMORY_URL).is_ok());
    }
}
