//! Redacting wrapper for client secrets and other credentials

use std::fmt;
use std::path::Path;
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// Sensitive value. `Debug` and `Display` print `[REDACTED]`, the memory is
/// zeroed on drop, and there is no `Serialize` impl, so the only way to read
/// the value is an explicit [`Secret::expose`].
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the inner value. Call sites should be easy to audit.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl Secret<String> {
    /// Read a secret from a file, trimming surrounding whitespace. An empty
    /// file yields `None`.
    pub fn from_file(path: &Path) -> Result<Option<Self>> {
        let mut contents =
            std::fs::read_to_string(path).map_err(|source| Error::SecretFile {
                path: path.to_path_buf(),
                source,
            })?;
        let secret = contents.trim().to_owned();
        contents.zeroize();
        Ok((!secret.is_empty()).then(|| Self::new(secret)))
    }
}

impl<T: Zeroize> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_are_redacted() {
        let secret = Secret::new(String::from("CLIENTSECRET"));
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(secret.to_string(), "[REDACTED]");
    }

    #[test]
    fn redacted_inside_containers() {
        let secret: Option<Secret<String>> = Some("CLIENTSECRET".to_string().into());
        let debug = format!("{secret:?}");
        assert!(!debug.contains("CLIENTSECRET"), "got: {debug}");
    }

    #[test]
    fn from_file_trims_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_secret");
        std::fs::write(&path, "  CLIENTSECRET\n").unwrap();

        let secret = Secret::from_file(&path).unwrap().unwrap();
        assert_eq!(secret.expose(), "CLIENTSECRET");
    }

    #[test]
    fn from_file_empty_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_secret");
        std::fs::write(&path, "\n").unwrap();

        assert!(Secret::from_file(&path).unwrap().is_none());
    }

    #[test]
    fn from_file_missing_names_path() {
        let err = Secret::from_file(Path::new("/nonexistent/client_secret")).unwrap_err();
        assert!(matches!(err, Error::SecretFile { .. }), "got: {err:?}");
        assert!(err.to_string().contains("/nonexistent/client_secret"));
    }

    #[test]
    fn expose_returns_value() {
        let secret = Secret::new(String::from("CLIENTSECRET"));
        assert_eq!(secret.expose(), "CLIENTSECRET");
        assert_eq!(secret.clone().expose(), "CLIENTSECRET");
    }
}
