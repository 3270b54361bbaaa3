use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::model::Session;

pub const SESSION_FILE_SUFFIX: &str = "scatterlane.json";
pub const SESSION_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SessionDocumentOut<'a> {
    format_version: u32,
    saved_at: DateTime<Utc>,
    session: &'a Session,
}

#[derive(Deserialize)]
struct SessionDocument {
    format_version: u32,
    session: Session,
}

/// Writes `session` wrapped in a versioned document. The file is replaced
/// atomically, so a crash never leaves a half-written session behind.
#[instrument(skip(session), fields(session_id = %session.id, path = %path.display()))]
pub fn save_session(path: &Path, session: &Session) -> Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&directory)
        .with_context(|| format!("failed to create directory: {}", directory.display()))?;

    let document = SessionDocumentOut {
        format_version: SESSION_FORMAT_VERSION,
        saved_at: Utc::now(),
        session,
    };
    let json = serde_json::to_vec_pretty(&document).context("failed to serialize session")?;

    let mut staged = tempfile::NamedTempFile::new_in(&directory)
        .context("failed to stage session file")?;
    staged
        .write_all(&json)
        .and_then(|()| staged.as_file().sync_all())
        .context("failed to write staged session file")?;
    staged
        .persist(path)
        .map_err(|error| anyhow::anyhow!(error.error))
        .with_context(|| format!("failed to replace session file: {}", path.display()))?;

    info!(
        groups = session.groups.len(),
        bytes = json.len(),
        "session saved"
    );
    Ok(())
}

#[instrument(fields(path = %path.display()))]
pub fn load_session(path: &Path) -> Result<Session> {
    let content =
        fs::read(path).with_context(|| format!("failed to read session: {}", path.display()))?;
    let document: SessionDocument =
        serde_json::from_slice(&content).context("invalid session document")?;
    if document.format_version > SESSION_FORMAT_VERSION {
        anyhow::bail!(
            "session format {} is newer than supported format {SESSION_FORMAT_VERSION}",
            document.format_version
        );
    }

    let session = document.session;
    info!(
        session_id = %session.id,
        groups = session.groups.len(),
        containers = session.container_count(),
        assets = session.asset_count(),
        "session loaded"
    );
    Ok(session)
}

/// Writes `session` into `directory` as `<id>.scatterlane.json`.
#[instrument(skip(session), fields(session_id = %session.id, directory = %directory.display()))]
pub fn save_session_in(session: &Session, directory: &Path) -> Result<PathBuf> {
    let path = directory.join(format!("{}.{SESSION_FILE_SUFFIX}", session.id));
    save_session(&path, session)?;
    debug!(path = %path.display(), "session written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::demo_session;

    #[test]
    fn newer_format_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir should be creatable");
        let path = temp.path().join("future.scatterlane.json");
        let session_json =
            serde_json::to_value(demo_session()).expect("fixture session should serialize");
        let document = serde_json::json!({
            "format_version": SESSION_FORMAT_VERSION + 1,
            "session": session_json,
        });
        fs::write(&path, document.to_string()).expect("document should be writable");

        let error = load_session(&path).expect_err("newer format should fail");
        assert!(error.to_string().contains("newer than supported"));
    }

    #[test]
    fn bare_session_without_envelope_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir should be creatable");
        let path = temp.path().join("bare.scatterlane.json");
        let json = serde_json::to_vec(&demo_session()).expect("fixture session should serialize");
        fs::write(&path, json).expect("session should be writable");

        assert!(load_session(&path).is_err());
    }

    #[test]
    fn save_creates_missing_directories() {
        let temp = tempfile::tempdir().expect("tempdir should be creatable");
        let path = temp.path().join("nested").join("demo.scatterlane.json");
        save_session(&path, &demo_session()).expect("save should succeed");
        let loaded = load_session(&path).expect("load should succeed");
        assert_eq!(loaded.id, demo_session().id);
    }
}
