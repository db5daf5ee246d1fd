//! Command lines for the external tools.
//!
//! Every value is passed as its own argv entry and nothing goes through a
//! shell, so form input can never be interpreted as shell syntax.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::config::Config;
use crate::error::JobError;
use crate::models::{DatabaseName, SizeRange};

use super::workspace::{
    Workspace, PRIMER3_OUTPUT, REGIONS_FILE, SETTINGS_FILE, SPECIFICITY_RESULT,
};

const DESIGN_SCRIPT: &str = "run_primer3.pl";
const SPECIFICITY_SCRIPT: &str = "run_specificity_check.pl";
const SELECTION_SCRIPT: &str = "run_final_selection.pl";

/// Longest stderr excerpt written to the log for a failed tool.
const STDERR_LOG_LIMIT: usize = 2000;

/// Resolved tool locations for building invocations.
#[derive(Debug, Clone)]
pub struct Toolchain {
    perl: PathBuf,
    samtools: PathBuf,
    primer3: PathBuf,
    pypy: PathBuf,
    scripts: PathBuf,
    databases: PathBuf,
    timeout: Option<Duration>,
}

impl Toolchain {
    /// Directory paths are made absolute because the scripts run from the
    /// scripts directory.
    pub fn new(config: &Config) -> Result<Self, JobError> {
        Ok(Self {
            perl: config.tools.perl.clone(),
            samtools: config.tools.samtools.clone(),
            primer3: config.tools.primer3.clone(),
            pypy: config.tools.pypy.clone(),
            scripts: std::path::absolute(&config.paths.scripts)?,
            databases: std::path::absolute(&config.paths.databases)?,
            timeout: config.tools.timeout_secs.map(Duration::from_secs),
        })
    }

    pub fn database_path(&self, name: &DatabaseName) -> PathBuf {
        self.databases.join(name.as_str())
    }

    /// `samtools faidx <fasta>`
    pub fn index_fasta(&self, fasta: &Path) -> Invocation {
        Invocation::new("samtools", &self.samtools, self.timeout)
            .arg("faidx")
            .arg(fasta)
    }

    /// Primer3 design over the workspace's region list.
    pub fn design(&self, ws: &Workspace, template: &Path) -> Invocation {
        self.script(DESIGN_SCRIPT)
            .flag("--input", ws.path(REGIONS_FILE))
            .flag("--db", template)
            .flag("--primer3setting", ws.path(SETTINGS_FILE))
            .flag("--primer3bin", &self.primer3)
            .flag("--samtools", &self.samtools)
            .flag("--outputdir", ws.dir())
    }

    /// Specificity check of `input` against the selected databases.
    ///
    /// With `detail`, the script also renders its own HTML report.
    pub fn specificity(
        &self,
        ws: &Workspace,
        input: &Path,
        databases: &[DatabaseName],
        range: SizeRange,
        detail: bool,
    ) -> Invocation {
        let mut db_list = OsString::new();
        for (i, name) in databases.iter().enumerate() {
            if i > 0 {
                db_list.push(" ");
            }
            db_list.push(self.database_path(name));
        }

        let invocation = self
            .script(SPECIFICITY_SCRIPT)
            .flag("--input", input)
            .flag("--db", db_list)
            .flag("--pypy", &self.pypy)
            .flag("--outputdir", ws.dir())
            .flag("--size_start", range.start.to_string())
            .flag("--size_stop", range.stop.to_string());

        if detail {
            invocation.flag("--detail", "1")
        } else {
            invocation
        }
    }

    /// Merge Primer3 output with the specificity results into the final report.
    pub fn final_selection(&self, ws: &Workspace, retain: u32) -> Invocation {
        self.script(SELECTION_SCRIPT)
            .flag("--primer3result", ws.path(PRIMER3_OUTPUT))
            .flag("--specificity", ws.path(SPECIFICITY_RESULT))
            .flag("--detail", "1")
            .flag("--retain", retain.to_string())
            .flag("--outputdir", ws.dir())
    }

    fn script(&self, name: &'static str) -> Invocation {
        Invocation::new(name, &self.perl, self.timeout)
            .arg(self.scripts.join(name))
            .current_dir(&self.scripts)
    }
}

/// A single external program run.
#[derive(Debug, Clone)]
pub struct Invocation {
    tool: &'static str,
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(tool: &'static str, program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            tool,
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append `name=value` as a single argument.
    pub fn flag(mut self, name: &str, value: impl AsRef<OsStr>) -> Self {
        let mut arg = OsString::from(name);
        arg.push("=");
        arg.push(value);
        self.args.push(arg);
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn tool(&self) -> &'static str {
        self.tool
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Run to completion.
    ///
    /// A non-zero exit status is logged but not treated as a failure: the
    /// caller decides based on which output files exist. The tool runs in its
    /// own process group so a timeout also stops everything it started.
    pub async fn run(&self) -> Result<(), JobError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(tool = self.tool, program = %self.program.display(), "Running {:?}", self.args);

        let child = cmd.spawn().map_err(|source| JobError::Spawn {
            tool: self.tool,
            source,
        })?;
        let pid = child.id();

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output,
                Err(_) => {
                    kill_process_group(self.tool, pid);
                    return Err(JobError::Timeout {
                        tool: self.tool,
                        secs: limit.as_secs(),
                    });
                }
            },
            None => child.wait_with_output().await,
        }?;

        if output.status.success() {
            tracing::debug!(tool = self.tool, "Finished successfully");
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.chars().take(STDERR_LOG_LIMIT).collect();
            tracing::warn!(
                tool = self.tool,
                status = %output.status,
                "Tool exited unsuccessfully: {}",
                excerpt.trim()
            );
        }

        Ok(())
    }
}

/// SIGKILL every process left in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(tool: &'static str, pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(tool, "Failed to kill process group {}: {}", pid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_tool: &'static str, _pid: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn toolchain() -> Toolchain {
        Toolchain {
            perl: PathBuf::from("perl"),
            samtools: PathBuf::from("/opt/samtools"),
            primer3: PathBuf::from("/opt/primer3_core"),
            pypy: PathBuf::from("/opt/pypy"),
            scripts: PathBuf::from("/srv/script"),
            databases: PathBuf::from("/srv/db"),
            timeout: None,
        }
    }

    fn args(invocation: &Invocation) -> Vec<String> {
        invocation
            .args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    async fn workspace(root: &Path) -> Workspace {
        Workspace::create(root).await.unwrap()
    }

    #[test]
    fn index_fasta_runs_samtools_faidx() {
        let inv = toolchain().index_fasta(Path::new("/w/custom"));
        assert_eq!(inv.program(), Path::new("/opt/samtools"));
        assert_eq!(args(&inv), vec!["faidx", "/w/custom"]);
    }

    #[tokio::test]
    async fn design_passes_workspace_files() {
        let root = tempfile::tempdir().unwrap();
        let ws = workspace(root.path()).await;
        let dir = ws.dir().display().to_string();

        let inv = toolchain().design(&ws, Path::new("/srv/db/hg19"));

        assert_eq!(inv.program(), Path::new("perl"));
        assert_eq!(
            args(&inv),
            vec![
                "/srv/script/run_primer3.pl".to_string(),
                format!("--input={}/perl_input_region.tmp", dir),
                "--db=/srv/db/hg19".to_string(),
                format!("--primer3setting={}/p3_settings_file", dir),
                "--primer3bin=/opt/primer3_core".to_string(),
                "--samtools=/opt/samtools".to_string(),
                format!("--outputdir={}", dir),
            ]
        );
    }

    #[tokio::test]
    async fn specificity_joins_databases_into_one_argument() {
        let root = tempfile::tempdir().unwrap();
        let ws = workspace(root.path()).await;
        let dbs = vec![
            DatabaseName::parse("db", "hg19").unwrap(),
            DatabaseName::parse("db", "mm10").unwrap(),
        ];
        let range = SizeRange { start: 50, stop: 2000 };

        let inv = toolchain().specificity(&ws, Path::new("/w/in.txt"), &dbs, range, false);
        let argv = args(&inv);

        assert!(argv.contains(&"--db=/srv/db/hg19 /srv/db/mm10".to_string()));
        assert!(argv.contains(&"--pypy=/opt/pypy".to_string()));
        assert!(argv.contains(&"--size_start=50".to_string()));
        assert!(argv.contains(&"--size_stop=2000".to_string()));
        assert!(!argv.iter().any(|a| a.starts_with("--detail")));

        let detailed = toolchain().specificity(&ws, Path::new("/w/in.txt"), &dbs, range, true);
        assert_eq!(args(&detailed).last().map(String::as_str), Some("--detail=1"));
    }

    #[tokio::test]
    async fn final_selection_uses_retain() {
        let root = tempfile::tempdir().unwrap();
        let ws = workspace(root.path()).await;

        let argv = args(&toolchain().final_selection(&ws, 3));

        assert_eq!(argv[0], "/srv/script/run_final_selection.pl");
        assert!(argv.contains(&"--retain=3".to_string()));
        assert!(argv.contains(&"--detail=1".to_string()));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let inv = Invocation::new("primer3", "/nonexistent/primer3_core", None);
        assert!(matches!(
            inv.run().await,
            Err(JobError::Spawn { tool: "primer3", .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_not_an_error() {
        let inv = Invocation::new("sh", "/bin/sh", None).arg("-c").arg("exit 3");
        assert!(inv.run().await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_tool_times_out() {
        let inv = Invocation::new("sleep", "/bin/sh", Some(Duration::from_secs(1)))
            .arg("-c")
            .arg("sleep 5");
        assert!(matches!(
            inv.run().await,
            Err(JobError::Timeout { tool: "sleep", secs: 1 })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_background_children() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let script = format!("(sleep 3; touch '{}') & wait", marker.display());

        let inv = Invocation::new("pipeline", "/bin/sh", Some(Duration::from_secs(1)))
            .arg("-c")
            .arg(script);
        assert!(matches!(inv.run().await, Err(JobError::Timeout { .. })));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!marker.exists(), "background child outlived the timeout");
    }
}
