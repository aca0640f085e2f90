use crate::error::{AppError, Result};
use crate::model::{
    BulkShortenRequest, BulkShortenResponse, ListItem, MessageResponse, ShortenRequest,
    ShortenResponse, StatsResponse,
};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use snip_store::ShortCode;
use tracing::{debug, info};

type JsonBody = std::result::Result<Json<Value>, JsonRejection>;

/// A malformed body is reported the same way as a missing one.
fn into_body(body: JsonBody) -> Option<Value> {
    match body {
        Ok(Json(value)) => Some(value),
        Err(rejection) => {
            debug!(error = %rejection, "unreadable json body");
            None
        }
    }
}

/// Codes that can never have been issued cannot be found either.
fn parse_code(short_code: &str) -> Result<ShortCode> {
    ShortCode::new(short_code).map_err(|_| AppError::NotFound)
}

pub async fn shorten_handler(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<(StatusCode, Json<ShortenResponse>)> {
    let request = ShortenRequest::from_body(into_body(body))?;
    let outcome = state.shortener().shorten(&request.url).await?;

    let status = if outcome.created {
        info!(code = %outcome.record.short_code, url = %outcome.record.original_url, "shortened url");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ShortenResponse::new(outcome, state.base_url()))))
}

pub async fn bulk_shorten_handler(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<(StatusCode, Json<BulkShortenResponse>)> {
    let request = BulkShortenRequest::from_body(into_body(body))?;
    let report = state.shortener().bulk_shorten(request.items()).await?;

    Ok((
        StatusCode::CREATED,
        Json(BulkShortenResponse::new(request, report, state.base_url())),
    ))
}

pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(short_code): Path<String>,
) -> Result<Response> {
    let code = parse_code(&short_code)?;
    let original_url = state.shortener().resolve(&code).await?;

    Ok((StatusCode::FOUND, [(header::LOCATION, original_url)]).into_response())
}

pub async fn stats_handler(
    State(state): State<AppState>,
    Path(short_code): Path<String>,
) -> Result<Json<StatsResponse>> {
    let code = parse_code(&short_code)?;
    let record = state.shortener().stats(&code).await?;
    Ok(Json(record.into()))
}

pub async fn list_handler(State(state): State<AppState>) -> Result<Json<Vec<ListItem>>> {
    let records = state.shortener().list().await?;
    Ok(Json(
        records
            .into_iter()
            .map(|record| ListItem::new(record, state.base_url()))
            .collect(),
    ))
}

pub async fn delete_handler(
    State(state): State<AppState>,
    Path(short_code): Path<String>,
) -> Result<Json<MessageResponse>> {
    let code = parse_code(&short_code)?;
    if !state.shortener().delete(&code).await? {
        return Err(AppError::NotFound);
    }

    Ok(Json(MessageResponse {
        message: "URL deleted successfully",
    }))
}
