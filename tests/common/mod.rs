#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use mortality_stats::registry::DatasetId;
use tempfile::{TempDir, tempdir};

pub const WEEKLY_SAMPLE: &str = "sex_age_week_sample.csv";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch data directory that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Workspace whose data directory holds the weekly sample under the
    /// file name the registry expects for `sex-age-week`.
    pub fn with_weekly_sample() -> Self {
        let workspace = Self::new();
        fs::copy(
            fixture_path(WEEKLY_SAMPLE),
            workspace.path().join(DatasetId::SexAgeWeek.file_name()),
        )
        .expect("copy weekly sample");
        workspace
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}
