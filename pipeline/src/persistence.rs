//! Atomic persistence of `PipelineState` and the append-only debug log.
//!
//! Write-temp-then-rename: write to a sibling `.tmp` file in the same
//! directory, `fsync`, then `rename` over the destination so a reader
//! never observes a half-written `state.json`.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::state::PipelineState;
use crate::workspace::Workspace;

/// Write `state` to `path` atomically: serialize to a `.tmp` sibling,
/// flush, then rename into place.
pub async fn save_state(path: &Path, state: &PipelineState) -> io::Result<()> {
    let json = serde_json::to_vec_pretty(state)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

    let tmp_path = tmp_sibling(path);
    {
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(&json).await?;
        file.flush().await?;
        file.sync_all().await?;
    }
    fs::rename(&tmp_path, path).await?;
    Ok(())
}

pub async fn load_state(path: &Path) -> io::Result<PipelineState> {
    let bytes = fs::read(path).await?;
    serde_json::from_slice(&bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| format!("{}.tmp", name.to_string_lossy()))
        .unwrap_or_else(|| "state.json.tmp".to_string());
    match path.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Append one line to `workDir/debug.log`, creating it on first use.
pub async fn append_debug_log(workspace: &Workspace, line: &str) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(workspace.debug_log_path())
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_state(workspace: &Workspace) -> PipelineState {
        PipelineState::new(
            "x".into(),
            "https://example.com".into(),
            "scrape listings".into(),
            workspace,
            5,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path(), "x");
        workspace.ensure_dirs().unwrap();
        let state = sample_state(&workspace);

        save_state(&workspace.state_path(), &state).await.unwrap();
        let loaded = load_state(&workspace.state_path()).await.unwrap();

        assert_eq!(loaded.project_name, state.project_name);
        assert_eq!(loaded.current_stage, state.current_stage);
    }

    #[tokio::test]
    async fn save_leaves_no_tmp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path(), "x");
        workspace.ensure_dirs().unwrap();
        let state = sample_state(&workspace);

        save_state(&workspace.state_path(), &state).await.unwrap();

        assert!(workspace.state_path().exists());
        assert!(!tmp_sibling(&workspace.state_path()).exists());
    }

    #[tokio::test]
    async fn overwriting_state_replaces_prior_contents() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path(), "x");
        workspace.ensure_dirs().unwrap();
        let mut state = sample_state(&workspace);

        save_state(&workspace.state_path(), &state).await.unwrap();
        state.transition_to(noctua_types::Stage::Schema);
        save_state(&workspace.state_path(), &state).await.unwrap();

        let loaded = load_state(&workspace.state_path()).await.unwrap();
        assert_eq!(loaded.current_stage, noctua_types::Stage::Schema);
    }

    #[tokio::test]
    async fn debug_log_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path(), "x");
        workspace.ensure_dirs().unwrap();

        append_debug_log(&workspace, "first").await.unwrap();
        append_debug_log(&workspace, "second").await.unwrap();

        let contents = fs::read_to_string(workspace.debug_log_path()).await.unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }
}
