//! Error handling for the TeraLab backend
//!
//! Provides consistent error responses in English and Spanish

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::DomainError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
        message_es: String,
    },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Domain rule violated: {0}")]
    Domain(#[from] DomainError),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_es: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    // External service errors
    #[error("Vision model error: {0}")]
    VisionModel(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_default();
        AppError::Validation {
            message: format!("Invalid input: {}", errors),
            message_es: format!("Datos inválidos: {}", field),
            field,
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Spanish text and offending field for a domain rule
fn describe_domain_error(err: &DomainError) -> (StatusCode, &'static str, String, Option<String>) {
    match err {
        DomainError::TooFewVertices(n) => (
            StatusCode::BAD_REQUEST,
            "INVALID_BOUNDARY",
            format!("El límite necesita al menos 3 vértices, tiene {}", n),
            Some("boundary".to_string()),
        ),
        DomainError::InvalidCoordinate { index, .. } => (
            StatusCode::BAD_REQUEST,
            "INVALID_BOUNDARY",
            format!("El vértice {} tiene coordenadas inválidas", index),
            Some("boundary".to_string()),
        ),
        DomainError::SelfIntersecting => (
            StatusCode::BAD_REQUEST,
            "INVALID_BOUNDARY",
            "Los bordes del lote se cruzan entre sí".to_string(),
            Some("boundary".to_string()),
        ),
        DomainError::EmptyName => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "El nombre del lote es obligatorio".to_string(),
            Some("name".to_string()),
        ),
        DomainError::EmptyCrop => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "El cultivo es obligatorio".to_string(),
            Some("crop".to_string()),
        ),
        DomainError::OutsideBoundary => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_POSITION",
            "La posición está fuera del lote".to_string(),
            Some("position".to_string()),
        ),
        DomainError::InsideEdgeBuffer { buffer_meters } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_POSITION",
            format!("La posición está a menos de {} m de un vértice", buffer_meters),
            Some("position".to_string()),
        ),
        DomainError::InvalidTransition { from, to } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_STATE_TRANSITION",
            format!("La campaña no puede pasar de {} a {}", from, to),
            None,
        ),
        DomainError::UnknownStatus(s) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            format!("Estado de campaña desconocido: {}", s),
            None,
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "TOKEN_EXPIRED".to_string(),
                    message_en: "Token has expired".to_string(),
                    message_es: "La sesión ha expirado".to_string(),
                    field: None,
                },
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_TOKEN".to_string(),
                    message_en: "Invalid token".to_string(),
                    message_es: "Token inválido".to_string(),
                    field: None,
                },
            ),
            AppError::Unauthorized { message, message_es } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    message_en: message.clone(),
                    message_es: message_es.clone(),
                    field: None,
                },
            ),
            AppError::Validation {
                field,
                message,
                message_es,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_es: message_es.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::Domain(err) => {
                let (status, code, message_es, field) = describe_domain_error(err);
                (
                    status,
                    ErrorDetail {
                        code: code.to_string(),
                        message_en: err.to_string(),
                        message_es,
                        field,
                    },
                )
            }
            AppError::Conflict {
                resource,
                message,
                message_es,
            } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message_en: message.clone(),
                    message_es: message_es.clone(),
                    field: Some(resource.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_es: format!("No se encontró {}", resource),
                    field: None,
                },
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INVALID_STATE_TRANSITION".to_string(),
                    message_en: msg.clone(),
                    message_es: format!("No se puede cambiar el estado: {}", msg),
                    field: None,
                },
            ),
            AppError::VisionModel(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail {
                    code: "VISION_MODEL_ERROR".to_string(),
                    message_en: format!("Image analysis failed: {}", msg),
                    message_es: format!("Falló el análisis de imágenes: {}", msg),
                    field: None,
                },
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "CONFIGURATION_ERROR".to_string(),
                    message_en: format!("Configuration error: {}", msg),
                    message_es: format!("Error de configuración: {}", msg),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message_en: "A database error occurred".to_string(),
                    message_es: "Ocurrió un error en la base de datos".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_es: "Error interno del servidor".to_string(),
                    field: None,
                },
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
