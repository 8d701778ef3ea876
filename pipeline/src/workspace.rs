//! Filesystem layout under `workDir`.

use std::io;
use std::path::{Path, PathBuf};

/// `workDir = baseDir/.noctua/pipelines/{projectName}` and its derived paths.
#[derive(Debug, Clone)]
pub struct Workspace {
    work_dir: PathBuf,
    scraper_dir: PathBuf,
}

impl Workspace {
    #[must_use]
    pub fn new(base_dir: &Path, project_slug: &str) -> Self {
        let work_dir = base_dir.join(".noctua").join("pipelines").join(project_slug);
        let scraper_dir = work_dir.join("scraper");
        Self {
            work_dir,
            scraper_dir,
        }
    }

    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    #[must_use]
    pub fn scraper_dir(&self) -> &Path {
        &self.scraper_dir
    }

    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.scraper_dir)
    }

    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.work_dir.join("state.json")
    }

    #[must_use]
    pub fn debug_log_path(&self) -> PathBuf {
        self.work_dir.join("debug.log")
    }

    #[must_use]
    pub fn findings_path(&self) -> PathBuf {
        self.work_dir.join("findings.txt")
    }

    #[must_use]
    pub fn recon_report_path(&self) -> PathBuf {
        self.work_dir.join("recon-report.json")
    }

    #[must_use]
    pub fn synth_attempt_path(&self, attempt: u32) -> PathBuf {
        self.work_dir.join(format!("synth-attempt-{attempt}.txt"))
    }

    #[must_use]
    pub fn test_report_path(&self) -> PathBuf {
        self.work_dir.join("test-report.json")
    }

    #[must_use]
    pub fn schema_path(&self) -> PathBuf {
        self.scraper_dir.join("schema.ts")
    }

    #[must_use]
    pub fn scraper_path(&self) -> PathBuf {
        self.scraper_dir.join("scraper.ts")
    }

    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.scraper_dir.join("index.ts")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_dir_matches_expected_layout() {
        let ws = Workspace::new(Path::new("/tmp/run"), "x");
        assert_eq!(
            ws.work_dir(),
            Path::new("/tmp/run/.noctua/pipelines/x")
        );
    }

    #[test]
    fn scraper_dir_is_nested_under_work_dir() {
        let ws = Workspace::new(Path::new("/tmp/run"), "x");
        assert_eq!(ws.scraper_dir(), Path::new("/tmp/run/.noctua/pipelines/x/scraper"));
    }
}
