//! HTTP front end for folder jobs.
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/process-folder` | POST (form `folder_path`) | submit a job |
//! | `/job-status/:job_id` | GET | poll a job |
//! | `/download-csv/:file_id` | GET | fetch one output table |
//! | `/jobs` | GET | list jobs, newest first |

use crate::error::Plan2CsvError;
use crate::model::{FileId, JobId};
use crate::service::JobService;
use axum::{
    extract::{Form, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct SubmitForm {
    folder_path: Option<String>,
}

/// Build the router over `service`.
pub fn create_router(service: JobService) -> Router {
    Router::new()
        .route("/process-folder", post(process_folder))
        .route("/job-status/:job_id", get(job_status))
        .route("/download-csv/:file_id", get(download_csv))
        .route("/jobs", get(list_jobs))
        .with_state(service)
}

/// Bind `addr` and serve until the process exits.
pub async fn serve(service: JobService, addr: SocketAddr) -> std::io::Result<()> {
    let app = create_router(service);
    info!("Starting server at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

fn error_response(status: StatusCode, e: &Plan2CsvError) -> Response {
    (status, Json(json!({ "status": "error", "message": e.to_string() }))).into_response()
}

async fn process_folder(
    State(service): State<JobService>,
    Form(form): Form<SubmitForm>,
) -> Response {
    match service.submit(form.folder_path.as_deref().unwrap_or("")) {
        Ok(sub) => Json(json!({
            "status": "success",
            "job_id": sub.job_id,
            "folder_path": sub.folder_path,
        }))
        .into_response(),
        Err(e) => {
            warn!("Rejected submission: {}", e);
            let status = if e.is_validation() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            error_response(status, &e)
        }
    }
}

async fn job_status(State(service): State<JobService>, Path(job_id): Path<JobId>) -> Response {
    match service.job_status(job_id) {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, &e),
    }
}

async fn download_csv(
    State(service): State<JobService>,
    Path(file_id): Path<FileId>,
) -> Response {
    match service.download(file_id).await {
        Ok(csv) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", csv.filename),
                ),
            ],
            csv.content,
        )
            .into_response(),
        Err(e) if e.is_not_found() => error_response(StatusCode::NOT_FOUND, &e),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e),
    }
}

async fn list_jobs(State(service): State<JobService>) -> Response {
    Json(service.list_jobs()).into_response()
}
