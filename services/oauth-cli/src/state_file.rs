//! On-disk OAuth session state
//!
//! Holds the serialized session between runs. The file contains live tokens,
//! so writes are atomic (temp file + rename) and the file is 0600 on unix.

use std::path::Path;

use anyhow::{Context, Result};
use oauth_session::SerializedSession;
use tracing::debug;

/// Load the stored session. A missing file is an empty session.
pub async fn load(path: &Path) -> Result<SerializedSession> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no stored session");
            return Ok(SerializedSession::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("reading state file {}", path.display()));
        }
    };
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing state file {}", path.display()))
}

/// Persist the session.
pub async fn save(path: &Path, state: &SerializedSession) -> Result<()> {
    let json = serde_json::to_string_pretty(state).context("serializing session state")?;

    let dir = path
        .parent()
        .context("state file path has no parent directory")?;
    let tmp_path = dir.join(format!(".oauth-session.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .context("writing temp state file")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .context("setting state file permissions")?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .context("renaming temp state file")?;

    debug!(path = %path.display(), "persisted session state");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_state() -> SerializedSession {
        SerializedSession {
            code_verifier: None,
            access_token: Some("ACCESSTOKEN".into()),
            refresh_token: Some("REFRESHTOKEN".into()),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = load(&dir.path().join("absent.json")).await.unwrap();
        assert_eq!(state, SerializedSession::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        save(&path, &complete_state()).await.unwrap();
        assert_eq!(load(&path).await.unwrap(), complete_state());
    }

    #[tokio::test]
    async fn test_save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        save(
            &path,
            &SerializedSession {
                code_verifier: Some("CODEVERIFIER".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        save(&path, &complete_state()).await.unwrap();

        assert_eq!(load(&path).await.unwrap(), complete_state());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        save(&path, &complete_state()).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let err = load(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("parsing state file"), "got: {err:#}");
    }
}
