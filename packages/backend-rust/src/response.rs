use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::StoreError;
use crate::services::ebbinghaus::ServiceError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            tracing::error!(code = %self.code, error = %self.message, "request failed");
            "服务器内部错误".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PlanNotFound(_) => Self::not_found("学习计划不存在"),
            StoreError::UnitOutOfRange { unit_number, max } => Self::validation(format!(
                "单元编号 {unit_number} 超出计划范围 (1-{max})"
            )),
            StoreError::UnusedUnit { unit_number } => json_error(
                StatusCode::CONFLICT,
                "UNIT_UNUSED",
                format!("单元 {unit_number} 尚未导入词汇"),
            ),
            StoreError::ReviewOrderOutOfRange { review_order, max } => Self::validation(format!(
                "复习轮次 {review_order} 超出范围 (1-{max})"
            )),
            StoreError::Corrupt(msg) => Self::internal(format!("stored data invalid: {msg}")),
            StoreError::Sqlx(e) => Self::internal(format!("database error: {e}")),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::MissingUser => Self::validation("userId 不能为空"),
            ServiceError::InvalidOffsets(e) => json_error(
                StatusCode::BAD_REQUEST,
                "INVALID_REVIEW_OFFSETS",
                format!("复习间隔无效: {e}"),
            ),
            ServiceError::PlanTooLarge { units, max } => {
                Self::validation(format!("计划单元数 {units} 超出上限 {max}"))
            }
            ServiceError::Store(e) => e.into(),
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> AppError {
    AppError {
        status,
        code: code.into(),
        message: message.into(),
        is_operational: true,
    }
}
