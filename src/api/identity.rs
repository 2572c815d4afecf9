//! `Authorization: Bearer` からの呼び出し元の特定。
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::debug;
use uuid::Uuid;

use super::error::ApiError;
use crate::{app::AppState, store::models::Owner};

const INVALID_TOKEN: &str = "Not authorized, token failed";
const MISSING_TOKEN: &str = "Not authorized, no token";

/// Owner of the request. A missing header means [`Owner::Anonymous`];
/// a header that does not carry a valid token is rejected with 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Caller(pub(crate) Owner);

/// Caller that must present a valid token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AuthenticatedUser(pub(crate) Uuid);

fn bearer_user(parts: &Parts, state: &AppState) -> Result<Option<Uuid>, ApiError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let token = value
        .to_str()
        .ok()
        .and_then(|raw| raw.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized(INVALID_TOKEN))?;

    let claims = state.tokens().verify(token).map_err(|error| {
        debug!(%error, "bearer token rejected");
        ApiError::Unauthorized(INVALID_TOKEN)
    })?;
    Ok(Some(claims.sub))
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(Owner::from_user_id(bearer_user(parts, state)?)))
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        bearer_user(parts, state)?
            .map(Self)
            .ok_or(ApiError::Unauthorized(MISSING_TOKEN))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;
    use crate::app::test_support::test_state;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/news");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).expect("request builds").into_parts().0
    }

    #[tokio::test]
    async fn missing_header_is_anonymous() {
        let state = test_state().await;

        let caller = Caller::from_request_parts(&mut parts(None), &state)
            .await
            .expect("anonymous caller");

        assert_eq!(caller, Caller(Owner::Anonymous));
    }

    #[tokio::test]
    async fn valid_token_identifies_user() {
        let state = test_state().await;
        let user_id = Uuid::new_v4();
        let header = format!("Bearer {}", state.tokens().issue(user_id));

        let caller = Caller::from_request_parts(&mut parts(Some(&header)), &state)
            .await
            .expect("authenticated caller");

        assert_eq!(caller, Caller(Owner::User(user_id)));
    }

    #[tokio::test]
    async fn scheme_name_ignores_case() {
        let state = test_state().await;
        let user_id = Uuid::new_v4();
        let token = state.tokens().issue(user_id);

        for scheme in ["bearer", "BEARER", "BeArEr"] {
            let header = format!("{scheme} {token}");
            let caller = Caller::from_request_parts(&mut parts(Some(&header)), &state)
                .await
                .expect("authenticated caller");
            assert_eq!(caller, Caller(Owner::User(user_id)), "{scheme}");
        }
    }

    #[tokio::test]
    async fn bad_tokens_are_rejected() {
        let state = test_state().await;
        for header in ["Bearer not-a-token", "Basic dXNlcjpwYXNz", "Bearer ", "Bearertoken"] {
            let result = Caller::from_request_parts(&mut parts(Some(header)), &state).await;
            assert!(
                matches!(result, Err(ApiError::Unauthorized(_))),
                "{header}"
            );
        }
    }

    #[tokio::test]
    async fn authenticated_user_requires_header() {
        let state = test_state().await;

        let result = AuthenticatedUser::from_request_parts(&mut parts(None), &state).await;

        assert!(matches!(result, Err(ApiError::Unauthorized(MISSING_TOKEN))));
    }
}
