use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;

use crate::{
    config::Config,
    models::user::{AccountStatus, User},
    repositories::user as user_repo,
    utils::jwt::{self, Claims},
};

pub async fn auth(
    State((pool, config)): State<(PgPool, Config)>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (claims, user) = authenticate_request(request.headers(), &pool, &config).await?;
    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(user);
    Ok(response)
}

// Auth + require teacher or admin for staff routes.
pub async fn auth_teacher(
    State((pool, config)): State<(PgPool, Config)>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (claims, user) = authenticate_request(request.headers(), &pool, &config).await?;
    if !(user.is_teacher() || user.is_admin()) {
        return Err(StatusCode::FORBIDDEN);
    }

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(user);
    Ok(response)
}

// Auth + require admin role for admin-only routes.
pub async fn auth_admin(
    State((pool, config)): State<(PgPool, Config)>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (claims, user) = authenticate_request(request.headers(), &pool, &config).await?;
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(user);
    Ok(response)
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    if let Some(rest) = header.strip_prefix("Bearer ") {
        return Some(rest);
    }
    if let Some(space_idx) = header.find(' ') {
        let (scheme, rest) = header.split_at(space_idx);
        if scheme.eq_ignore_ascii_case("bearer") {
            return Some(rest.trim_start());
        }
    }
    None
}

async fn authenticate_request(
    headers: &axum::http::HeaderMap,
    pool: &PgPool,
    config: &Config,
) -> Result<(Claims, User), StatusCode> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let claims =
        jwt::verify_access_token(token, &config.jwt_secret).map_err(|_| StatusCode::UNAUTHORIZED)?;

    // A token outlives any role or approval change; re-check the row.
    let user = user_repo::find_by_sid(pool, &claims.sub)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;
    if user.status != AccountStatus::Approved {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok((claims, user))
}

#[cfg(test)]
mod tests {
    use super::parse_bearer_token;

    #[test]
    fn accepts_bearer_scheme_case_insensitively() {
        assert_eq!(parse_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(parse_bearer_token("BEARER abc"), Some("abc"));
    }

    #[test]
    fn rejects_other_schemes() {
        assert_eq!(parse_bearer_token("Basic abc"), None);
        assert_eq!(parse_bearer_token("abc"), None);
    }
}
