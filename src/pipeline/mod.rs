//! Runs a validated job against the external tools.
//!
//! Design mode: Primer3 settings → optional custom template index → region
//! limits → primer design → specificity check → final selection.
//! Check mode: primer group limits → specificity check.
//!
//! Limit violations are a normal outcome and are reported back to the user;
//! only tool and I/O failures are errors.

pub mod tools;
pub mod workspace;

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::error::JobError;
use crate::models::{
    AppType, CheckRequest, DatabaseName, DesignRequest, InputSummary, JobRequest, Template,
};

use tools::Toolchain;
use workspace::*;

/// Which configured limit a request ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    Sites,
    PrimerGroups,
    Databases,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LimitExceeded {
    pub kind: LimitKind,
    pub found: usize,
    pub allowed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// HTML rendered by the tools.
    Completed(String),
    LimitExceeded(LimitExceeded),
}

#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: Uuid,
    pub app_type: AppType,
    pub summary: InputSummary,
    pub outcome: Outcome,
}

/// Run `request` in a fresh workspace under `config.paths.work`.
pub async fn run_job(config: &Config, request: JobRequest) -> Result<JobReport, JobError> {
    let toolchain = Toolchain::new(config)?;
    let ws = Workspace::create(&config.paths.work).await?;
    let app_type = request.app_type();

    tracing::info!(job_id = %ws.id(), mode = app_type.as_str(), "Starting job");

    let (summary, outcome) = match request {
        JobRequest::Design(req) => run_design(config, &toolchain, &ws, req).await?,
        JobRequest::Check(req) => run_check(config, &toolchain, &ws, req).await?,
    };

    match &outcome {
        Outcome::Completed(html) => {
            tracing::info!(job_id = %ws.id(), bytes = html.len(), "Job completed")
        }
        Outcome::LimitExceeded(limit) => tracing::info!(
            job_id = %ws.id(),
            "Job stopped: {:?} {} over limit {}",
            limit.kind,
            limit.found,
            limit.allowed
        ),
    }

    Ok(JobReport {
        job_id: ws.id(),
        app_type,
        summary,
        outcome,
    })
}

async fn run_design(
    config: &Config,
    toolchain: &Toolchain,
    ws: &Workspace,
    req: DesignRequest,
) -> Result<(InputSummary, Outcome), JobError> {
    ws.write(SETTINGS_FILE, req.settings.render()).await?;

    let template = match &req.template {
        Template::Database(name) => toolchain.database_path(name),
        Template::Custom(fasta) => {
            let path = ws.write(CUSTOM_TEMPLATE_FILE, fasta).await?;
            toolchain.index_fasta(&path).run().await?;
            if !ws.exists(CUSTOM_TEMPLATE_INDEX).await {
                tracing::warn!(job_id = %ws.id(), "Custom template could not be indexed");
                return Err(JobError::TemplateIndex);
            }
            path
        }
    };

    let summary = req.regions.summary();
    tracing::info!(
        job_id = %ws.id(),
        "{} site(s) detected; {} site(s) used",
        summary.detected,
        summary.used
    );

    if let Some(limit) = check_limit(LimitKind::Sites, summary.used, config.limits.sites) {
        return Ok((summary, Outcome::LimitExceeded(limit)));
    }
    if let Some(limit) = check_limit(
        LimitKind::Databases,
        req.databases.len(),
        config.limits.databases,
    ) {
        return Ok((summary, Outcome::LimitExceeded(limit)));
    }

    ws.write(REGIONS_FILE, req.regions.contents()).await?;

    toolchain.design(ws, &template).run().await?;
    toolchain
        .specificity(
            ws,
            &ws.path(PRIMER3_TABLE),
            &req.databases,
            req.size_range,
            false,
        )
        .run()
        .await?;
    toolchain.final_selection(ws, req.retain).run().await?;

    let html = ws.read_output(FINAL_RESULT_HTML).await?;
    Ok((summary, Outcome::Completed(html)))
}

async fn run_check(
    config: &Config,
    toolchain: &Toolchain,
    ws: &Workspace,
    req: CheckRequest,
) -> Result<(InputSummary, Outcome), JobError> {
    let summary = req.primers.summary();
    tracing::info!(
        job_id = %ws.id(),
        "{} primer group(s) detected; {} primer group(s) used",
        summary.detected,
        summary.used
    );

    if let Some(limit) = check_limit(LimitKind::PrimerGroups, summary.used, config.limits.primers) {
        return Ok((summary, Outcome::LimitExceeded(limit)));
    }
    if let Some(limit) = check_limit(
        LimitKind::Databases,
        req.databases.len(),
        config.limits.databases,
    ) {
        return Ok((summary, Outcome::LimitExceeded(limit)));
    }

    let input = ws.write(CHECK_INPUT_FILE, req.primers.contents()).await?;
    toolchain
        .specificity(ws, &input, &req.databases, req.size_range, true)
        .run()
        .await?;

    let html = ws.read_output(SPECIFICITY_HTML).await?;
    Ok((summary, Outcome::Completed(html)))
}

fn check_limit(kind: LimitKind, found: usize, allowed: usize) -> Option<LimitExceeded> {
    (found > allowed).then_some(LimitExceeded {
        kind,
        found,
        allowed,
    })
}

/// Databases ready for use: files in `dir` with a samtools `.fai` index beside them.
///
/// Names a job submission would reject are left out.
pub async fn list_databases(dir: &Path) -> Result<Vec<String>, JobError> {
    let mut names = HashSet::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.insert(name.to_string());
        }
    }

    let mut databases: Vec<String> = names
        .iter()
        .filter(|name| !name.ends_with(".fai"))
        .filter(|name| {
            DatabaseName::parse("database", name).is_ok_and(|db| db.as_str() == name.as_str())
        })
        .filter(|name| names.contains(&format!("{}.fai", name)))
        .cloned()
        .collect();
    databases.sort();
    Ok(databases)
}
