//! Location directory endpoints. The `locations` relation is the controlled
//! vocabulary behind the location pickers: any authenticated driver can add
//! a sub-location, nothing is ever updated or deleted.

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::{error, info};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::models::location_model::Location;
use crate::provider::{Filter, ProviderError, LOCATIONS_TABLE};
use crate::state::AppState;
use crate::utils::session::{resolve_user, session_from_request};

#[derive(Debug, Deserialize)]
pub struct ListLocationsQuery {
    state: Option<String>,
    district: Option<String>,
}

#[get("/api/locations")]
pub async fn list_locations(
    state: web::Data<AppState>,
    query: web::Query<ListLocationsQuery>,
) -> Result<HttpResponse, ApiError> {
    let Some(state_name) = query.state.as_deref().filter(|v| !v.is_empty()) else {
        return Err(ApiError::bad_request("State is required"));
    };
    let provider = state.provider.client(None);

    if let Some(district) = query.district.as_deref().filter(|v| !v.is_empty()) {
        let rows = provider
            .db_select(
                LOCATIONS_TABLE,
                "sub_location",
                &[
                    Filter::eq("state", state_name),
                    Filter::eq("district", district),
                ],
                Some("sub_location"),
            )
            .await
            .map_err(|err| {
                error!("sub-location listing failed: {err}");
                ApiError::internal("Failed to fetch sub-locations")
            })?;
        let sub_locations: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get("sub_location").and_then(Value::as_str))
            .map(str::to_owned)
            .collect();
        return Ok(HttpResponse::Ok().json(json!({ "sub_locations": sub_locations })));
    }

    let rows = provider
        .db_select(
            LOCATIONS_TABLE,
            "district",
            &[Filter::eq("state", state_name)],
            Some("district"),
        )
        .await
        .map_err(|err| {
            error!("district listing failed: {err}");
            ApiError::internal("Failed to fetch districts")
        })?;
    // Rows come back ordered; drop adjacent repeats to get distinct names.
    let mut districts: Vec<String> = Vec::new();
    for row in &rows {
        if let Some(district) = row.get("district").and_then(Value::as_str) {
            if districts.last().map(String::as_str) != Some(district) {
                districts.push(district.to_string());
            }
        }
    }
    Ok(HttpResponse::Ok().json(json!({ "districts": districts })))
}

#[post("/api/locations")]
pub async fn add_location(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let provider = state
        .provider
        .client(session_from_request(&req, &state.auth_cookie_name));
    let user = resolve_user(&req, provider.as_ref()).await?;

    let state_name = body.get("state").and_then(Value::as_str).unwrap_or_default();
    let district = body
        .get("district")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let sub_location = body
        .get("sub_location")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if state_name.is_empty() || district.is_empty() || sub_location.is_empty() {
        return Err(ApiError::bad_request(
            "State, district, and sub-location are required",
        ));
    }

    let state_name = state_name.trim();
    let district = district.trim();
    let sub_location = sub_location.trim();
    if state_name.is_empty() || district.is_empty() || sub_location.is_empty() {
        return Err(ApiError::bad_request(
            "State, district, and sub-location cannot be empty",
        ));
    }

    let inserted = provider
        .db_insert(
            LOCATIONS_TABLE,
            json!({
                "state": state_name,
                "district": district,
                "sub_location": sub_location,
            }),
        )
        .await
        .map_err(|err| match err {
            ProviderError::Conflict(_) => ApiError::conflict("This location already exists"),
            other => {
                error!("location insert failed: {other}");
                ApiError::internal("Failed to create location")
            }
        })?;
    let location: Location = serde_json::from_value(inserted)
        .map_err(|err| ApiError::Unexpected(format!("malformed location row: {err}")))?;
    info!(
        "driver {} added location {}/{}/{}",
        user.id, location.state, location.district, location.sub_location
    );

    Ok(HttpResponse::Created().json(json!({
        "location": location,
        "message": "Location added successfully",
    })))
}
