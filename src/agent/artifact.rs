//! Artifact discovery: find the presentation a run produced and give it a
//! run-unique name.
//!
//! The tools write into a shared working directory and report nothing back
//! about which file belongs to which run, so discovery picks the most recently
//! modified `.pptx`. Two runs sharing a directory race here: either may pick up
//! the other's file. Callers that need isolation must give each run its own
//! workspace.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub const PRESENTATION_EXTENSION: &str = ".pptx";

/// Output name for a run started at `unix_seconds`.
pub fn output_file_name(unix_seconds: i64) -> String {
    format!("presentation_{}{}", unix_seconds, PRESENTATION_EXTENSION)
}

/// Whether `name` looks like a file produced by [`output_file_name`].
pub fn is_output_file_name(name: &str) -> bool {
    name.strip_prefix("presentation_")
        .and_then(|rest| rest.strip_suffix(PRESENTATION_EXTENSION))
        .is_some_and(|ts| !ts.is_empty() && ts.bytes().all(|b| b.is_ascii_digit()))
}

/// The most recently modified `.pptx` file directly inside `dir`.
pub async fn find_latest_presentation(dir: &Path) -> io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut latest: Option<(SystemTime, PathBuf)> = None;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !name.to_string_lossy().ends_with(PRESENTATION_EXTENSION) {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified()?;
        if latest.as_ref().map_or(true, |(best, _)| modified >= *best) {
            latest = Some((modified, entry.path()));
        }
    }

    Ok(latest.map(|(_, path)| path))
}

/// Rename the newest presentation in `dir` to `output_name` and return its
/// absolute path, or `None` when the directory holds no presentation.
pub async fn claim_latest_presentation(
    dir: &Path,
    output_name: &str,
) -> io::Result<Option<PathBuf>> {
    let Some(latest) = find_latest_presentation(dir).await? else {
        tracing::warn!(dir = %dir.display(), "No .pptx file found");
        return Ok(None);
    };

    let target = dir.join(output_name);
    if latest != target {
        tokio::fs::rename(&latest, &target).await?;
        tracing::info!(from = %latest.display(), to = %target.display(), "Renamed presentation");
    }

    tokio::fs::canonicalize(&target).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn touch(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
        path
    }

    #[test]
    fn output_name_embeds_timestamp() {
        assert_eq!(output_file_name(1_700_000_000), "presentation_1700000000.pptx");
        assert!(is_output_file_name("presentation_1700000000.pptx"));
        assert!(!is_output_file_name("presentation_.pptx"));
        assert!(!is_output_file_name("presentation_12a.pptx"));
        assert!(!is_output_file_name("../presentation_1.pptx"));
    }

    #[tokio::test]
    async fn picks_newest_not_first_listed() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a_old.pptx", 300);
        let newest = touch(dir.path(), "m_new.pptx", 5);
        touch(dir.path(), "z_mid.pptx", 100);

        let found = find_latest_presentation(dir.path()).await.unwrap();
        assert_eq!(found, Some(newest));
    }

    #[tokio::test]
    async fn ignores_other_extensions_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "notes.txt", 0);
        touch(dir.path(), "deck.pptx.bak", 0);
        std::fs::create_dir(dir.path().join("folder.pptx")).unwrap();
        let only = touch(dir.path(), "deck.pptx", 600);

        let found = find_latest_presentation(dir.path()).await.unwrap();
        assert_eq!(found, Some(only));
    }

    #[tokio::test]
    async fn empty_directory_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(claim_latest_presentation(dir.path(), "presentation_1.pptx")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn claim_renames_to_run_name() {
        let dir = tempfile::tempdir().unwrap();
        let original = touch(dir.path(), "output.pptx", 0);

        let claimed = claim_latest_presentation(dir.path(), "presentation_42.pptx")
            .await
            .unwrap()
            .unwrap();

        assert!(claimed.is_absolute());
        assert_eq!(claimed.file_name().unwrap(), "presentation_42.pptx");
        assert!(claimed.exists());
        assert!(!original.exists());
    }

    #[tokio::test]
    async fn concurrent_runs_get_some_newest_file() {
        // Two runs wrote at the same instant; either file is an acceptable pick.
        let dir = tempfile::tempdir().unwrap();
        let first = touch(dir.path(), "run_a.pptx", 10);
        let second = touch(dir.path(), "run_b.pptx", 10);
        touch(dir.path(), "stale.pptx", 3600);

        let found = find_latest_presentation(dir.path()).await.unwrap().unwrap();
        assert!(found == first || found == second);
    }
}
