//! Authentication middleware
//!
//! Access tokens are issued by the managed backend (HS256). The service only
//! verifies them and scopes every request to the token's subject.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, ErrorDetail, ErrorResponse};
use crate::AppState;

/// Authenticated user information extracted from the access token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

/// Access token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Verify a bearer token and return its claims
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // audience differs between managed-backend projects
    validation.validate_aud = false;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })
}

/// Why a token was refused
#[derive(Debug, PartialEq)]
pub enum TokenError {
    Expired,
    Invalid(String),
}

/// Authentication middleware that validates bearer tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return missing_token();
    };

    let claims = match decode_token(bearer.token(), &state.config.auth.jwt_secret) {
        Ok(claims) => claims,
        Err(TokenError::Expired) => return AppError::TokenExpired.into_response(),
        Err(TokenError::Invalid(reason)) => {
            tracing::debug!("Rejected access token: {}", reason);
            return AppError::InvalidToken.into_response();
        }
    };

    let user_id = match Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => {
            return AppError::Unauthorized {
                message: "Invalid user ID in token".to_string(),
                message_es: "Identificador de usuario inválido".to_string(),
            }
            .into_response()
        }
    };

    request.extensions_mut().insert(AuthUser {
        user_id,
        email: claims.email,
    });

    next.run(request).await
}

/// Distinct code so clients can tell "not logged in" from "session expired"
fn missing_token() -> Response {
    let error = ErrorResponse {
        error: ErrorDetail {
            code: "MISSING_TOKEN".to_string(),
            message_en: "Missing or invalid Authorization header".to_string(),
            message_es: "Falta el encabezado de autorización".to_string(),
            field: None,
        },
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                AppError::Unauthorized {
                    message: "Authentication required".to_string(),
                    message_es: "Se requiere iniciar sesión".to_string(),
                }
                .into_response()
            })
    }
}
