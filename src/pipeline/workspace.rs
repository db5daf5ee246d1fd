use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use uuid::Uuid;

use crate::error::JobError;

pub const SETTINGS_FILE: &str = "p3_settings_file";
pub const REGIONS_FILE: &str = "perl_input_region.tmp";
pub const CHECK_INPUT_FILE: &str = "check.only.tmp";
pub const CUSTOM_TEMPLATE_FILE: &str = "custom";
pub const CUSTOM_TEMPLATE_INDEX: &str = "custom.fai";
pub const PRIMER3_OUTPUT: &str = "primer3output.txt";
pub const PRIMER3_TABLE: &str = "primer3output.simple.table.txt";
pub const SPECIFICITY_RESULT: &str = "specificity.check.result.txt";
pub const SPECIFICITY_HTML: &str = "specificity.check.result.html";
pub const FINAL_RESULT_HTML: &str = "primer.final.result.html";

/// Private working directory for one job.
///
/// The directory is left in place after the job so that links in the
/// rendered results keep working. [`sweep_expired`] removes old ones.
#[derive(Debug, Clone)]
pub struct Workspace {
    id: Uuid,
    dir: PathBuf,
}

impl Workspace {
    /// Create `<root>/<uuid>`. The stored path is absolute.
    pub async fn create(root: &Path) -> Result<Self, JobError> {
        let id = Uuid::new_v4();
        let dir = root.join(id.to_string());
        tokio::fs::create_dir_all(&dir).await?;
        let dir = tokio::fs::canonicalize(&dir).await?;
        tracing::debug!("Created workspace {}", dir.display());
        Ok(Self { id, dir })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub async fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf, JobError> {
        let path = self.path(name);
        tokio::fs::write(&path, contents).await?;
        Ok(path)
    }

    pub async fn exists(&self, name: &str) -> bool {
        tokio::fs::try_exists(self.path(name))
            .await
            .unwrap_or(false)
    }

    /// Read a file a tool was expected to produce.
    pub async fn read_output(&self, name: &str) -> Result<String, JobError> {
        let path = self.path(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(JobError::MissingOutput(path))
            }
            Err(e) => Err(JobError::Io(e)),
        }
    }
}

/// Remove job workspaces under `root` last modified at least `max_age` ago.
///
/// Only directories named by a job id are touched. Returns how many were removed.
pub async fn sweep_expired(root: &Path, max_age: Duration) -> Result<usize, JobError> {
    let now = SystemTime::now();
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(root).await?;

    while let Some(entry) = entries.next_entry().await? {
        let is_job_dir = entry
            .file_name()
            .to_str()
            .is_some_and(|name| Uuid::parse_str(name).is_ok());
        let metadata = entry.metadata().await?;
        if !is_job_dir || !metadata.is_dir() {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < max_age {
            continue;
        }

        match tokio::fs::remove_dir_all(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("Failed to remove workspace {}: {}", entry.path().display(), e)
            }
        }
    }

    if removed > 0 {
        tracing::info!(
            "Removed {} expired workspace(s) from {}",
            removed,
            root.display()
        );
    }
    Ok(removed)
}
