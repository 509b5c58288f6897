//! Authentication middleware
//!
//! Tokens are issued by the external identity service. This module only
//! verifies them and enforces the customer/admin split.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::Role;
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

/// Authenticated principal extracted from the JWT
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Decode and validate a bearer token
pub fn decode_jwt(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user ID in token".to_string()))?;

    Ok(AuthUser {
        user_id,
        role: claims.role,
    })
}

/// Validates the bearer token and stores the [`AuthUser`] in the request
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(token) = token else {
        return AppError::Unauthorized("Missing or invalid Authorization header".to_string())
            .into_response();
    };

    match decode_jwt(token, &state.config.jwt.secret) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

async fn require_role(role: Role, request: Request, next: Next) -> Response {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.role == role => next.run(request).await,
        Some(_) => AppError::Forbidden(format!("Requires {} role", role_name(role))).into_response(),
        None => AppError::Unauthorized("Authentication required".to_string()).into_response(),
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Customer => "customer",
        Role::Admin => "admin",
    }
}

/// Admits admins only; layer after [`auth_middleware`]
pub async fn require_admin(request: Request, next: Next) -> Response {
    require_role(Role::Admin, request, next).await
}

/// Admits customers only; layer after [`auth_middleware`]
pub async fn require_customer(request: Request, next: Next) -> Response {
    require_role(Role::Customer, request, next).await
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
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}
