use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::api::credential_from_headers;
use crate::error::{Error, Result};
use crate::giveaway::admission::{ClientAddress, EntryRequest};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateEntryPayload {
    pub giveaway_id: Option<String>,
    pub participant_name: Option<String>,
    pub reddit_name: Option<String>,
    pub reddit_profile_link: Option<String>,
}

pub async fn create_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<CreateEntryPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let Json(payload) = payload.map_err(|rejection| Error::Unexpected(rejection.body_text()))?;

    let request = EntryRequest::parse(
        payload.giveaway_id,
        payload.participant_name,
        payload.reddit_name,
        payload.reddit_profile_link,
    )?;
    let address = ClientAddress::from_headers(&headers);
    let entry = state.admission.admit(request, address).await?;

    Ok((StatusCode::CREATED, Json(json!({ "data": entry }))))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Path((slug, entry_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let password = credential_from_headers(&headers, &slug);
    let entry = state
        .giveaways
        .remove_entry(&slug, password.as_deref(), entry_id)
        .await?;

    Ok(Json(json!({ "data": entry })))
}
