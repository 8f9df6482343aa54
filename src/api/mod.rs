pub mod entries;
pub mod giveaways;

use std::time::Duration;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{Error, Result};
use crate::giveaway::cookies::CookieJar;
use crate::state::AppState;

pub const PASSWORD_HEADER: &str = "x-giveaway-password";

/// Returns the creator password sent along with the request. The explicit
/// header wins over the cookie stored at creation time.
pub fn credential_from_headers(headers: &HeaderMap, slug: &str) -> Option<String> {
    let header = headers
        .get(PASSWORD_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    header.or_else(|| CookieJar::from_headers(headers).get_giveaway_password(slug))
}

fn cors_layer(allowed_origin: Option<&str>) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(PASSWORD_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    match allowed_origin {
        Some(origin) => {
            let origin = HeaderValue::from_str(origin)
                .map_err(|err| Error::Config(format!("Invalid ALLOWED_ORIGIN value '{origin}': {err}")))?;
            Ok(cors.allow_origin(origin).allow_credentials(true))
        }
        None => Ok(cors.allow_origin(Any)),
    }
}

pub fn router(state: AppState) -> Result<Router> {
    let cors = cors_layer(state.config.allowed_origin.as_deref())?;

    let app = Router::new()
        .route("/api/entries", post(entries::create_entry))
        .route("/api/giveaways", post(giveaways::create_giveaway))
        .route("/api/giveaways/{slug}", get(giveaways::get_giveaway))
        .route("/api/giveaways/{slug}/entries", get(giveaways::list_entries))
        .route("/api/giveaways/{slug}/entries/{entry_id}", delete(entries::delete_entry))
        .route("/api/giveaways/{slug}/events", get(giveaways::entry_events))
        .route("/api/giveaways/{slug}/verify", post(giveaways::verify_password))
        .route("/api/giveaways/{slug}/close", post(giveaways::close_giveaway))
        .route("/api/giveaways/{slug}/winner", post(giveaways::select_winner))
        .route("/api/giveaways/{slug}/winner/preview", post(giveaways::preview_winner))
        .route("/api/giveaways/{slug}/winner/browse", get(giveaways::browse_entries))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(app)
}
