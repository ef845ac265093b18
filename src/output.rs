use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output path has no parent directory: {0}")]
    NoParent(PathBuf),
}

/// Result of writing one printed unit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "WriteOutcome tells whether the file changed"]
pub enum WriteOutcome {
    Written { path: PathBuf, bytes: usize },
    /// The file already held exactly this text.
    Unchanged { path: PathBuf },
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            WriteOutcome::Written { path, .. } | WriteOutcome::Unchanged { path } => path,
        }
    }
}

/// `<package path>/<type>.java`, relative to an output directory.
pub fn unit_path(package: Option<&str>, type_name: &str) -> PathBuf {
    let mut path = PathBuf::new();
    if let Some(package) = package {
        path.extend(package.split('.').filter(|segment| !segment.is_empty()));
    }
    path.push(format!("{type_name}.java"));
    path
}

/// Write `text` to `path`, creating parent directories. Existing files whose
/// content hashes equal are left untouched.
pub fn write_unit(path: &Path, text: &str) -> Result<WriteOutcome, OutputError> {
    let io_err = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Ok(existing) = fs::read(path) {
        if xxh3_64(&existing) == xxh3_64(text.as_bytes()) {
            tracing::debug!(path = %path.display(), "output unchanged");
            return Ok(WriteOutcome::Unchanged {
                path: path.to_path_buf(),
            });
        }
    }

    let parent = path
        .parent()
        .ok_or_else(|| OutputError::NoParent(path.to_path_buf()))?;
    fs::create_dir_all(parent).map_err(io_err)?;
    atomic_write(parent, path, text.as_bytes()).map_err(io_err)?;
    tracing::debug!(path = %path.display(), bytes = text.len(), "wrote unit");

    Ok(WriteOutcome::Written {
        path: path.to_path_buf(),
        bytes: text.len(),
    })
}

/// Tempfile in the target directory, fsync, then rename over `path`.
fn atomic_write(dir: &Path, path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_path_follows_package() {
        assert_eq!(
            unit_path(Some("fr.inria.demo"), "Foo1"),
            PathBuf::from("fr/inria/demo/Foo1.java")
        );
        assert_eq!(unit_path(None, "Foo1"), PathBuf::from("Foo1.java"));
    }

    #[test]
    fn writes_then_reports_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/A.java");

        let first = write_unit(&path, "class A {\n}\n").unwrap();
        assert_eq!(
            first,
            WriteOutcome::Written {
                path: path.clone(),
                bytes: 12
            }
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "class A {\n}\n");

        let second = write_unit(&path, "class A {\n}\n").unwrap();
        assert_eq!(second, WriteOutcome::Unchanged { path: path.clone() });
        assert_eq!(second.path(), path.as_path());
    }

    #[test]
    fn overwrites_changed_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.java");
        fs::write(&path, "class A {}").unwrap();

        let outcome = write_unit(&path, "class B {}").unwrap();
        assert!(matches!(outcome, WriteOutcome::Written { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "class B {}");
    }
}
