//! Bearer-token authentication extractors.
//!
//! The `Authorization: Bearer <token>` header is verified against the
//! server's [`TokenSigner`](crate::services::auth::TokenSigner) and the
//! resulting [`Identity`] handed to the handler, which passes it on to
//! services explicitly.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::Identity;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(identity): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", identity.name)
/// }
/// ```
pub struct RequireAuth(pub Identity);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)?
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))
    }
}

/// Extractor that accepts anonymous callers.
///
/// A missing header yields `None`. A header that is present but invalid or
/// expired is still rejected with 401 so clients learn to refresh.
pub struct OptionalAuth(pub Option<Identity>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map(Self)
    }
}

/// Extractor that requires an admin.
pub struct RequireAdmin(pub Identity);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(identity) = RequireAuth::from_request_parts(parts, state).await?;
        if !identity.is_admin() {
            return Err(AppError::Forbidden("admin access required".to_string()));
        }
        Ok(Self(identity))
    }
}

/// Extractor that requires an admin or a seller.
pub struct RequireStaff(pub Identity);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(identity) = RequireAuth::from_request_parts(parts, state).await?;
        if !identity.role.is_staff() {
            return Err(AppError::Forbidden("seller or admin access required".to_string()));
        }
        Ok(Self(identity))
    }
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<Identity>, AppError> {
    let Some(token) = bearer_token(parts)? else {
        return Ok(None);
    };

    let identity = state
        .tokens()
        .verify(token)
        .map_err(|e| AppError::Auth(AuthError::Token(e)))?;

    set_sentry_user(&identity.user_id, Some(&identity.email));
    tracing::Span::current().record("user_id", identity.user_id.as_i32());

    Ok(Some(identity))
}

/// The token from an `Authorization: Bearer` header, if any.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let malformed = || AppError::Unauthorized("malformed authorization header".to_string());
    let value = value.to_str().map_err(|_| malformed())?;
    let (scheme, token) = value.split_once(' ').ok_or_else(malformed)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(malformed());
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(malformed());
    }
    Ok(Some(token))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    use marketplace_core::{Role, UserId};

    use super::*;
    use crate::config::{ApiConfig, Environment};

    const SECRET: &str = "q8#Vn2!pR5@xL9$wT3^kM7&zB4*cF6(h";

    fn state() -> AppState {
        let config = ApiConfig {
            database_url: SecretString::from("postgres://localhost/marketplace_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 4000,
            environment: Environment::Development,
            token_secret: SecretString::from(SECRET),
            token_ttl_hours: 1,
            cors_origin: None,
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/marketplace_test")
            .unwrap();
        AppState::new(config, pool).unwrap()
    }

    fn identity(role: Role) -> Identity {
        Identity {
            user_id: UserId::new(7),
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            role,
        }
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/orders");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(None)).unwrap(), None);
        assert_eq!(
            bearer_token(&parts(Some("Bearer abc.def.ghi"))).unwrap(),
            Some("abc.def.ghi")
        );
        assert_eq!(
            bearer_token(&parts(Some("bearer   abc"))).unwrap(),
            Some("abc")
        );
        assert!(bearer_token(&parts(Some("Basic dXNlcjpwYXNz"))).is_err());
        assert!(bearer_token(&parts(Some("Bearer "))).is_err());
    }

    #[tokio::test]
    async fn test_require_auth_rejects_missing_token() {
        let state = state();
        let err = RequireAuth::from_request_parts(&mut parts(None), &state)
            .await
            .err()
            .unwrap();
        assert_eq!(status(err), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_optional_auth_anonymous_and_authenticated() {
        let state = state();
        let OptionalAuth(anonymous) = OptionalAuth::from_request_parts(&mut parts(None), &state)
            .await
            .unwrap();
        assert!(anonymous.is_none());

        let token = state.tokens().issue(&identity(Role::Buyer)).unwrap();
        let header = format!("Bearer {token}");
        let OptionalAuth(known) =
            OptionalAuth::from_request_parts(&mut parts(Some(&header)), &state)
                .await
                .unwrap();
        assert_eq!(known, Some(identity(Role::Buyer)));
    }

    #[tokio::test]
    async fn test_optional_auth_rejects_bad_token() {
        let state = state();
        let err = OptionalAuth::from_request_parts(&mut parts(Some("Bearer not.a.token")), &state)
            .await
            .err()
            .unwrap();
        assert_eq!(status(err), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_role_gates() {
        let state = state();
        let buyer = format!("Bearer {}", state.tokens().issue(&identity(Role::Buyer)).unwrap());
        let seller = format!("Bearer {}", state.tokens().issue(&identity(Role::Seller)).unwrap());
        let admin = format!("Bearer {}", state.tokens().issue(&identity(Role::Admin)).unwrap());

        let err = RequireStaff::from_request_parts(&mut parts(Some(&buyer)), &state)
            .await
            .err()
            .unwrap();
        assert_eq!(status(err), StatusCode::FORBIDDEN);
        assert!(
            RequireStaff::from_request_parts(&mut parts(Some(&seller)), &state)
                .await
                .is_ok()
        );

        let err = RequireAdmin::from_request_parts(&mut parts(Some(&seller)), &state)
            .await
            .err()
            .unwrap();
        assert_eq!(status(err), StatusCode::FORBIDDEN);
        assert!(
            RequireAdmin::from_request_parts(&mut parts(Some(&admin)), &state)
                .await
                .is_ok()
        );
    }
}
