use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::config::AuthorizationConfig;
use crate::models::ApiResponse;

/// Shared-secret check for webhook calls. The token travels in the request body.
#[derive(Clone)]
pub struct AuthState {
    pub config: Arc<AuthorizationConfig>,
}

impl AuthState {
    pub fn new(config: AuthorizationConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn verify(&self, token: &str) -> Result<(), Response> {
        if constant_time_eq(token.as_bytes(), self.config.token.as_bytes()) {
            Ok(())
        } else {
            Err(forbidden_response("Invalid token"))
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn forbidden_response(message: &str) -> Response {
    (StatusCode::FORBIDDEN, Json(ApiResponse::error(message))).into_response()
}
