use std::collections::HashMap;
use std::convert::Infallible;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use futures::Stream;
use futures::stream;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::credential_from_headers;
use crate::db::models::Giveaway;
use crate::error::{Error, Result};
use crate::giveaway::cookies::giveaway_password_cookie;
use crate::giveaway::formatters::{DefaultPrizeFormatter, PrizeFormatter};
use crate::giveaway::manager::{EntryPosition, GiveawayDraft, SelectionMode};
use crate::giveaway::selector::CursorStep;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateGiveawayPayload {
    pub creator_name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, alias = "allow_strict")]
    pub require_extended_identity: bool,
    #[serde(default)]
    pub currencies: HashMap<String, i64>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl From<CreateGiveawayPayload> for GiveawayDraft {
    fn from(payload: CreateGiveawayPayload) -> Self {
        GiveawayDraft {
            creator_name: payload.creator_name.unwrap_or_default(),
            title: payload.title.unwrap_or_default(),
            description: payload.description,
            require_extended_identity: payload.require_extended_identity,
            currencies: payload.currencies,
            ends_at: payload.ends_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum WinnerPayload {
    Manual { entry_id: Uuid },
    Random,
}

impl From<WinnerPayload> for SelectionMode {
    fn from(payload: WinnerPayload) -> Self {
        match payload {
            WinnerPayload::Manual { entry_id } => SelectionMode::Manual(entry_id),
            WinnerPayload::Random => SelectionMode::Random,
        }
    }
}

// Public representation of a giveaway, without the creator password.
#[derive(Debug, Serialize)]
pub struct GiveawayView {
    #[serde(flatten)]
    pub giveaway: Giveaway,
    pub prizes: Vec<String>,
    pub entry_count: usize,
    pub expired: bool,
}

impl GiveawayView {
    pub fn new(giveaway: Giveaway, entry_count: usize) -> Self {
        let prizes = DefaultPrizeFormatter::new().pretty_print(&giveaway.currencies);
        let expired = giveaway.is_expired(Utc::now());
        GiveawayView {
            giveaway,
            prizes,
            entry_count,
            expired,
        }
    }
}

async fn giveaway_view(state: &AppState, giveaway: Giveaway) -> Result<GiveawayView> {
    let entry_count = state.giveaways.count_entries(&giveaway).await?;
    Ok(GiveawayView::new(giveaway, entry_count))
}

fn password_cookie(state: &AppState, slug: &str, password: &str) -> String {
    giveaway_password_cookie(slug, password, state.config.cookie_max_age)
}

pub async fn create_giveaway(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateGiveawayPayload>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload.map_err(|rejection| Error::Validation(rejection.body_text()))?;

    let created = state.giveaways.create_giveaway(payload.into()).await?;
    let cookie = password_cookie(&state, &created.giveaway.slug, &created.password);
    let view = GiveawayView::new(created.giveaway, 0);

    let body = Json(json!({ "data": view, "password": created.password }));
    Ok((StatusCode::CREATED, [(SET_COOKIE, cookie)], body).into_response())
}

pub async fn get_giveaway(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>> {
    let giveaway = state.giveaways.get_giveaway(&slug).await?;
    let view = giveaway_view(&state, giveaway).await?;
    Ok(Json(json!({ "data": view })))
}

pub async fn list_entries(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>> {
    let entries = state.giveaways.list_entries(&slug).await?;
    Ok(Json(json!({ "data": entries })))
}

// Lets a returning creator prove the password, and stores it in the cookie
// for the later visits.
pub async fn verify_password(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let password = credential_from_headers(&headers, &slug);
    let giveaway = state.giveaways.authorize(&slug, password.as_deref()).await?;

    let cookie = password_cookie(&state, &giveaway.slug, &giveaway.creator_password);
    let body = Json(json!({ "data": { "verified": true } }));
    Ok(([(SET_COOKIE, cookie)], body).into_response())
}

pub async fn close_giveaway(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let password = credential_from_headers(&headers, &slug);
    let giveaway = state.giveaways.close_giveaway(&slug, password.as_deref()).await?;
    let view = giveaway_view(&state, giveaway).await?;
    Ok(Json(json!({ "data": view })))
}

pub async fn select_winner(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    payload: std::result::Result<Json<WinnerPayload>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(payload) = payload.map_err(|rejection| Error::Validation(rejection.body_text()))?;

    let password = credential_from_headers(&headers, &slug);
    let (giveaway, winner) = state
        .giveaways
        .select_winner(&slug, password.as_deref(), payload.into())
        .await?;
    let view = giveaway_view(&state, giveaway).await?;
    Ok(Json(json!({ "data": { "giveaway": view, "winner": winner } })))
}

pub async fn preview_winner(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let password = credential_from_headers(&headers, &slug);
    let preview = state
        .giveaways
        .preview_winner(&slug, password.as_deref())
        .await?;
    Ok(Json(json!({ "data": position_body(preview) })))
}

#[derive(Debug, Default, Deserialize)]
pub struct BrowseQuery {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub step: CursorStep,
}

// Lets the operator go through the entries one by one, e.g.
// `?index=3&step=next`.
pub async fn browse_entries(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    query: std::result::Result<Query<BrowseQuery>, QueryRejection>,
) -> Result<Json<Value>> {
    let Query(query) = query.map_err(|rejection| Error::Validation(rejection.body_text()))?;

    let password = credential_from_headers(&headers, &slug);
    let position = state
        .giveaways
        .browse_entries(&slug, password.as_deref(), query.index, query.step)
        .await?;
    Ok(Json(json!({ "data": position_body(position) })))
}

fn position_body(position: EntryPosition) -> Value {
    json!({
        "entry": position.entry,
        "index": position.index,
        "position": position.position,
        "is_winner": position.is_winner,
    })
}

// Server-sent events with the inserted and deleted entries of the giveaway.
pub async fn entry_events(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let feed = state.giveaways.subscribe(&slug).await?;
    debug!("Streaming entry events of giveaway {}", feed.giveaway_id());

    let events = stream::unfold(feed, |mut feed| async move {
        let event = feed.recv().await?;
        let message = match Event::default().event(event.kind()).json_data(&event) {
            Ok(message) => message,
            Err(err) => {
                warn!("Can't serialize entry event: {}", err);
                Event::default().comment("unserializable event")
            }
        };
        Some((Ok(message), feed))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
