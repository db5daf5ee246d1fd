use axum::{
    extract::{rejection::FormRejection, State},
    http::{header::HeaderName, StatusCode},
    response::{Html, IntoResponse, Response},
    Form, Json,
};

use super::AppState;
use crate::error::JobError;
use crate::models::{FormFields, JobRequest};
use crate::{pipeline, render};

const JOB_ID_HEADER: HeaderName = HeaderName::from_static("x-job-id");

// ============================================================
// Error Handling
// ============================================================

/// Turn a job error into an HTML alert.
///
/// Problems with the submitted form are shown to the user as-is. Anything
/// else is logged server-side and the user only sees a generic message.
fn job_error(e: JobError) -> (StatusCode, Html<String>) {
    match e {
        JobError::TemplateIndex => {
            tracing::warn!("Validation error: {}", e);
            (StatusCode::BAD_REQUEST, Html(render::template_index_alert()))
        }
        e if e.is_client_error() => {
            tracing::warn!("Validation error: {}", e);
            (StatusCode::BAD_REQUEST, Html(render::error_alert(&e.to_string())))
        }
        e => {
            tracing::error!("Internal error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render::error_alert(
                    "The analysis could not be completed. Please try again later.",
                )),
            )
        }
    }
}

/// Show an unreadable submission (wrong content type, oversized body) as an alert.
fn form_rejection(rejection: FormRejection) -> (StatusCode, Html<String>) {
    tracing::warn!("Rejected form submission: {}", rejection.body_text());
    (
        rejection.status(),
        Html(render::error_alert(&rejection.body_text())),
    )
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Jobs
// ============================================================

/// Validate the submitted form, run the tools, and return the rendered report.
pub async fn submit_job(
    State(state): State<AppState>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Result<Response, (StatusCode, Html<String>)> {
    let Form(pairs) = form.map_err(form_rejection)?;
    let form = FormFields::new(pairs);
    let request = JobRequest::from_form(&form).map_err(job_error)?;

    let _permit = state.job_slots.acquire().await.map_err(|e| {
        tracing::error!("Job queue closed: {}", e);
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Html(render::error_alert("The server is shutting down.")),
        )
    })?;

    let report = pipeline::run_job(&state.config, request)
        .await
        .map_err(job_error)?;

    let body = render::report(&report);
    Ok(([(JOB_ID_HEADER, report.job_id.to_string())], Html(body)).into_response())
}

// ============================================================
// Databases
// ============================================================

pub async fn list_databases(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, (StatusCode, String)> {
    pipeline::list_databases(&state.config.paths.databases)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("Failed to list databases: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        })
}
