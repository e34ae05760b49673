//! Image webhook handler.
//!
//! Validation and the token check happen before any engine call. Once the update
//! starts it runs to completion and the response reflects the whole batch.

use axum::{
    extract::{multipart::MultipartError, FromRequest, Multipart, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Json, Response},
    Form,
};
use tracing::{info, warn};

use crate::{
    error::{PullError, UpdateError},
    models::{ApiResponse, BatchStatus, ImageReference, PullRequest, UpdateReport},
    types::AppState,
};

const MISSING_PARAMETERS: &str = "Missing parameters 'token' or 'repository'";

/// `POST /images/pull`
pub async fn pull_image(State(state): State<AppState>, request: Request) -> Response {
    let req = read_pull_request(request).await;

    let token = req.token.as_deref().filter(|t| !t.is_empty());
    let image = req
        .repository
        .as_deref()
        .and_then(|repo| ImageReference::new(repo, req.tag.as_deref()));

    let (token, image) = match (token, image) {
        (Some(token), Some(image)) => (token, image),
        _ => return respond(StatusCode::BAD_REQUEST, ApiResponse::error(MISSING_PARAMETERS)),
    };

    if let Err(response) = state.auth.verify(token) {
        warn!("Rejected pull request for {}: invalid token", image);
        return response;
    }

    let restart = req.restart_requested();
    info!("Update requested for {} (restart_containers={})", image, restart);

    match state.orchestrator.run(&image, restart).await {
        Ok(report) => report_response(report),
        Err(e) => error_response(e),
    }
}

/// Accepts urlencoded and multipart form bodies. An unreadable body counts as an
/// empty form.
async fn read_pull_request(request: Request) -> PullRequest {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let parsed = match Multipart::from_request(request, &()).await {
            Ok(multipart) => read_multipart(multipart).await,
            Err(rejection) => {
                warn!("Unreadable multipart pull request: {}", rejection);
                return PullRequest::default();
            }
        };
        parsed.unwrap_or_else(|e| {
            warn!("Failed to read multipart field: {}", e);
            PullRequest::default()
        })
    } else {
        match Form::<PullRequest>::from_request(request, &()).await {
            Ok(Form(req)) => req,
            Err(rejection) => {
                warn!("Unreadable pull request body: {}", rejection);
                PullRequest::default()
            }
        }
    }
}

/// The first value of each known field wins; unknown fields are ignored.
async fn read_multipart(mut multipart: Multipart) -> Result<PullRequest, MultipartError> {
    let mut req = PullRequest::default();

    while let Some(field) = multipart.next_field().await? {
        let slot = match field.name().unwrap_or("") {
            "token" => &mut req.token,
            "repository" => &mut req.repository,
            "tag" => &mut req.tag,
            "restart_containers" => &mut req.restart_containers,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(field.text().await?);
        }
    }

    Ok(req)
}

fn report_response(report: UpdateReport) -> Response {
    match report {
        UpdateReport::Pulled { image } => respond(
            StatusCode::OK,
            ApiResponse::message(format!(
                "Image {} pulled successfully. No containers restarted as requested.",
                image
            )),
        ),
        UpdateReport::NothingToUpdate { image } => respond(
            StatusCode::OK,
            ApiResponse::message(format!("No containers to update for image {}.", image)),
        ),
        UpdateReport::Batch { result, .. } => {
            let status = match result.status() {
                BatchStatus::Success => StatusCode::OK,
                BatchStatus::PartialSuccess => StatusCode::MULTI_STATUS,
                BatchStatus::Failure => StatusCode::INTERNAL_SERVER_ERROR,
            };
            respond(status, ApiResponse::batch(result))
        }
    }
}

fn error_response(err: UpdateError) -> Response {
    let status = match &err {
        UpdateError::Pull(PullError::ImageNotFound(_)) => StatusCode::NOT_FOUND,
        UpdateError::Pull(_) | UpdateError::Locate(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    respond(status, ApiResponse::error(err.to_string()))
}

fn respond(status: StatusCode, body: ApiResponse) -> Response {
    (status, Json(body)).into_response()
}
