//! HTTP request handlers for the Waypost API
//!
//! A thin dispatcher: match the route, run the gate for mutating
//! operations, call into the engine, translate the outcome. All domain
//! decisions live in waypost-engine.

use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response, StatusCode};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error, info};

use waypost_core::{
    ApiError, LoginRequest, NewPlace, NewUser, PlaceId, PlacePatch, PlaceView, UserId,
};

use crate::auth_gate::authenticate;
use crate::server::{json_response, AppContext};
use crate::uploads::ImageStore;

type BoxBody = Full<bytes::Bytes>;

type HandlerResult = std::result::Result<Response<BoxBody>, ApiError>;

/// Main request handler
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    ctx: Arc<AppContext>,
) -> std::result::Result<Response<BoxBody>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("handling {} {}", method, path);

    // Preflight-style requests pass through the gate untouched.
    if method == Method::OPTIONS {
        return Ok(preflight_response());
    }

    let trimmed = path.trim_matches('/').to_string();
    let segments: Vec<&str> = trimmed.split('/').collect();

    let result = match (&method, segments.as_slice()) {
        (&Method::GET, ["health"]) => handle_health(),

        (&Method::GET, ["api", "places", "user", uid]) => handle_places_by_user(&ctx, uid),
        (&Method::GET, ["api", "places", pid]) => handle_get_place(&ctx, pid),
        (&Method::POST, ["api", "places"]) => handle_create_place(req, &ctx).await,
        (&Method::PATCH, ["api", "places", pid]) => handle_update_place(req, &ctx, pid).await,
        (&Method::DELETE, ["api", "places", pid]) => handle_delete_place(&req, &ctx, pid),

        (&Method::GET, ["api", "users"]) => handle_list_users(&ctx),
        (&Method::POST, ["api", "users", "signup"]) => handle_signup(req, &ctx).await,
        (&Method::POST, ["api", "users", "login"]) => handle_login(req, &ctx).await,

        _ => Err(ApiError::NotFound("could not find this route".to_string())),
    };

    let response = match result {
        Ok(response) => {
            info!("{} {} -> {}", method, path, response.status());
            response
        }
        Err(e) => {
            if e.is_internal() {
                error!("handler error for {} {}: {}", method, path, e);
            } else {
                debug!("{} {} rejected: {}", method, path, e);
            }
            error_response(&e)
        }
    };
    Ok(response)
}

fn handle_health() -> HandlerResult {
    Ok(json_response(
        StatusCode::OK,
        json!({
            "status": "healthy",
            "service": "waypost",
            "version": "0.1.0"
        })
        .to_string(),
    ))
}

fn handle_get_place(ctx: &AppContext, pid: &str) -> HandlerResult {
    let id = PlaceId::parse(pid)?;
    let place = ctx.places.get(&id)?;
    Ok(json_response(
        StatusCode::OK,
        json!({"place": PlaceView::from(place)}).to_string(),
    ))
}

fn handle_places_by_user(ctx: &AppContext, uid: &str) -> HandlerResult {
    let id = UserId::parse(uid)?;
    let views: Vec<PlaceView> = ctx
        .places
        .list_by_owner(&id)?
        .into_iter()
        .map(PlaceView::from)
        .collect();
    Ok(json_response(
        StatusCode::OK,
        json!({"places": views}).to_string(),
    ))
}

async fn handle_create_place(
    req: Request<hyper::body::Incoming>,
    ctx: &AppContext,
) -> HandlerResult {
    let identity = authenticate(&req, &ctx.signer)?;
    let draft: NewPlace = read_json(req).await?;
    let image_url = draft.image_url.clone();

    match ctx.places.create(draft, &identity.user_id) {
        Ok(place) => Ok(json_response(
            StatusCode::CREATED,
            json!({"place": PlaceView::from(place)}).to_string(),
        )),
        Err(e) => {
            // The upload ran before this request; a failed create must not
            // leave the stored file behind.
            if !image_url.is_empty() {
                ctx.images.remove(&image_url);
            }
            Err(e)
        }
    }
}

async fn handle_update_place(
    req: Request<hyper::body::Incoming>,
    ctx: &AppContext,
    pid: &str,
) -> HandlerResult {
    let identity = authenticate(&req, &ctx.signer)?;
    let id = PlaceId::parse(pid)?;
    let patch: PlacePatch = read_json(req).await?;

    let place = ctx.places.update(&id, patch, &identity.user_id)?;
    Ok(json_response(
        StatusCode::OK,
        json!({"place": PlaceView::from(place)}).to_string(),
    ))
}

fn handle_delete_place(
    req: &Request<hyper::body::Incoming>,
    ctx: &AppContext,
    pid: &str,
) -> HandlerResult {
    let identity = authenticate(req, &ctx.signer)?;
    let id = PlaceId::parse(pid)?;

    let removed = ctx.places.delete(&id, &identity.user_id)?;

    // Storage is already consistent; file cleanup is best-effort.
    if !removed.image_url.is_empty() {
        ctx.images.remove(&removed.image_url);
    }
    Ok(json_response(
        StatusCode::OK,
        json!({"message": "deleted successfully"}).to_string(),
    ))
}

fn handle_list_users(ctx: &AppContext) -> HandlerResult {
    let users = ctx.accounts.list_users()?;
    Ok(json_response(
        StatusCode::OK,
        json!({"users": users}).to_string(),
    ))
}

async fn handle_signup(req: Request<hyper::body::Incoming>, ctx: &AppContext) -> HandlerResult {
    let new_user: NewUser = read_json(req).await?;
    let session = ctx.accounts.signup(new_user).await?;
    Ok(json_response(
        StatusCode::CREATED,
        serde_json::to_string(&session)?,
    ))
}

async fn handle_login(req: Request<hyper::body::Incoming>, ctx: &AppContext) -> HandlerResult {
    let request: LoginRequest = read_json(req).await?;
    let session = ctx.accounts.login(request).await?;
    Ok(json_response(StatusCode::OK, serde_json::to_string(&session)?))
}

async fn read_json<T: serde::de::DeserializeOwned>(
    req: Request<hyper::body::Incoming>,
) -> std::result::Result<T, ApiError> {
    let body = req
        .collect()
        .await
        .map_err(|e| ApiError::Validation(format!("could not read request body: {}", e)))?
        .to_bytes();
    serde_json::from_slice(&body)
        .map_err(|_| ApiError::Validation("invalid input passed, please check your data".to_string()))
}

fn error_response(e: &ApiError) -> Response<BoxBody> {
    let status =
        StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    json_response(status, json!({"message": e.public_message()}).to_string())
}

fn preflight_response() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("access-control-allow-origin", "*")
        .header("access-control-allow-methods", "GET, POST, PATCH, DELETE, OPTIONS")
        .header("access-control-allow-headers", "content-type, authorization")
        .body(Full::new(bytes::Bytes::new()))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_translation_covers_the_taxonomy() {
        let cases = [
            (ApiError::Validation("bad".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (ApiError::Conflict("dup".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (ApiError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (ApiError::Forbidden("nope".into()), StatusCode::FORBIDDEN),
            (ApiError::Unauthorized("who".into()), StatusCode::UNAUTHORIZED),
            (ApiError::Storage("driver detail".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(error_response(&err).status(), status);
        }
    }

    #[test]
    fn test_preflight_passes_untouched() {
        let resp = preflight_response();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(resp.headers().contains_key("access-control-allow-methods"));
        assert!(resp.headers().contains_key("access-control-allow-headers"));
    }
}
