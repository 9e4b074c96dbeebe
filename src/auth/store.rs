// Token file persistence

use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Strip trailing whitespace (newlines from `echo` or editors)
///
/// Both `save` and `load` go through this, so a saved token always reads back
/// byte-for-byte.
pub fn normalize_token(token: &str) -> &str {
    token.trim_end()
}

/// Reads and writes the cached token file
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    path: Option<PathBuf>,
}

impl TokenStore {
    /// Create a store; `None` disables persistence
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the cached token
    ///
    /// Returns `Ok(None)` when no path is configured, the file does not exist,
    /// or it holds only whitespace.
    pub fn load(&self) -> io::Result<Option<String>> {
        let Some(path) = self.path.as_deref() else {
            return Ok(None);
        };

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let token = normalize_token(&contents);
        if token.is_empty() {
            Ok(None)
        } else {
            Ok(Some(token.to_string()))
        }
    }

    /// Write the token with owner-only permissions
    ///
    /// No-op when no path is configured. Missing parent directories are
    /// created. The token is written without a trailing newline.
    pub fn save(&self, token: &str) -> io::Result<()> {
        let Some(path) = self.path.as_deref() else {
            tracing::debug!("No token file configured, not saving token");
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = open_private(path)?;
        file.write_all(normalize_token(token).as_bytes())?;
        file.flush()?;

        tracing::debug!(token_file = %path.display(), "Saved token");
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<std::fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation; tighten pre-existing files too
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
