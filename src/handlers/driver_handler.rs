//! Driver profile endpoints: registration, login/logout, self profile,
//! status and serving-location updates, the public listing, and the
//! signed-URL redirect for license images.

use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{get, http::header, patch, post, web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::auth_model::AuthCookie;
use crate::models::driver_model::{Driver, PublicDriver};
use crate::provider::{
    Filter, Provider, ProviderError, DRIVERS_TABLE, LICENSE_BUCKET, PHOTO_BUCKET,
};
use crate::state::AppState;
use crate::utils::identity::{is_valid_phone, Identifier};
use crate::utils::session::{resolve_user, session_from_request};

const SIGNED_URL_EXPIRY_SECS: u64 = 3600;
const AUTH_COOKIE_MAX_AGE_DAYS: i64 = 7;
const PROFILE_NOT_FOUND: &str = "Driver profile not found. Please complete your registration.";

struct UploadedFile {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct RegisterForm {
    fields: HashMap<String, String>,
    photo: Option<UploadedFile>,
    license: Option<UploadedFile>,
}

impl RegisterForm {
    fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }
}

async fn read_register_form(mut payload: Multipart) -> Result<RegisterForm, ApiError> {
    let mut form = RegisterForm::default();
    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|err| ApiError::bad_request(format!("Invalid form data: {err}")))?;
        let (name, filename) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().map(str::to_owned),
                cd.get_filename().map(str::to_owned),
            ),
            None => (None, None),
        };
        let Some(name) = name else { continue };
        let content_type = field
            .content_type()
            .map(|mime| mime.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|err| ApiError::bad_request(format!("Invalid form data: {err}")))?;
            bytes.extend_from_slice(&chunk);
        }
        match name.as_str() {
            "photo" => {
                form.photo = Some(UploadedFile {
                    filename: filename.unwrap_or_default(),
                    content_type,
                    bytes,
                })
            }
            "license_id_image" => {
                form.license = Some(UploadedFile {
                    filename: filename.unwrap_or_default(),
                    content_type,
                    bytes,
                })
            }
            _ => {
                form.fields
                    .insert(name, String::from_utf8_lossy(&bytes).into_owned());
            }
        }
    }
    Ok(form)
}

fn file_ext(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "jpg".to_string())
}

fn driver_from_row(row: Value) -> Result<Driver, ApiError> {
    serde_json::from_value(row)
        .map_err(|err| ApiError::Unexpected(format!("malformed driver row: {err}")))
}

async fn fetch_driver(provider: &dyn Provider, user_id: Uuid) -> Result<Driver, ApiError> {
    let mut rows = provider
        .db_select(DRIVERS_TABLE, "*", &[Filter::eq("user_id", user_id)], None)
        .await?;
    if rows.is_empty() {
        return Err(ApiError::not_found(PROFILE_NOT_FOUND));
    }
    driver_from_row(rows.remove(0))
}

#[post("/api/drivers/register")]
pub async fn register(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let form = read_register_form(payload).await?;

    let (Some(name), Some(phone), Some(password), Some(address), Some(registration_number)) = (
        form.text("name"),
        form.text("phone"),
        form.text("password"),
        form.text("address"),
        form.text("auto_registration_number"),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };
    if !is_valid_phone(phone) {
        return Err(ApiError::bad_request(
            "Phone number must be exactly 10 digits",
        ));
    }
    let Some(identifier) = Identifier::from_input(form.text("email"), Some(phone)) else {
        return Err(ApiError::bad_request("All fields are required"));
    };

    let provider = state.provider.client(None);

    // The phone-identifier path has no provider-side uniqueness to lean on
    // until the driver row insert, so check before creating the account.
    if identifier.is_phone() {
        let existing = provider
            .db_select(DRIVERS_TABLE, "id", &[Filter::eq("phone", phone)], None)
            .await?;
        if !existing.is_empty() {
            return Err(ApiError::conflict(
                "An account with this phone number already exists. Please login instead.",
            ));
        }
    }

    let account = provider
        .admin_create_user(&identifier.account_email(), password, name)
        .await
        .map_err(|err| match err {
            ProviderError::Conflict(_) => ApiError::conflict(
                "An account with this email already exists. Please login instead.",
            ),
            ProviderError::Transport(err) => ApiError::Unexpected(err.to_string()),
            other => ApiError::bad_request(other.to_string()),
        })?;
    info!("created account {} for {name}", account.id);

    // Uploads are best-effort: a failure leaves the URL null and the
    // registration goes ahead.
    let mut photo_url = None;
    if let Some(file) = form.photo.as_ref().filter(|f| !f.bytes.is_empty()) {
        let path = format!("{}/photo.{}", account.id, file_ext(&file.filename));
        match provider
            .storage_upload(PHOTO_BUCKET, &path, file.bytes.clone(), &file.content_type)
            .await
        {
            Ok(()) => {
                photo_url = Some(provider.public_url(PHOTO_BUCKET, &path));
                debug!("uploaded photo to {path}");
            }
            Err(err) => error!("photo upload failed for {}: {err}", account.id),
        }
    }

    let mut license_path = None;
    if let Some(file) = form.license.as_ref().filter(|f| !f.bytes.is_empty()) {
        let ext = file_ext(&file.filename);
        if identifier.is_phone() && ext == "webp" {
            warn!("skipping unsupported webp license image for {}", account.id);
        } else {
            let path = format!("{}/license.{ext}", account.id);
            match provider
                .storage_upload(LICENSE_BUCKET, &path, file.bytes.clone(), &file.content_type)
                .await
            {
                Ok(()) => {
                    // Private bucket: store the path, not a URL.
                    license_path = Some(path);
                }
                Err(err) => error!("license upload failed for {}: {err}", account.id),
            }
        }
    }

    let row = json!({
        "user_id": account.id,
        "name": name,
        "phone": phone,
        "address": address,
        "auto_registration_number": registration_number,
        "photo_url": photo_url,
        "license_id_image_url": license_path,
        "is_active": false,
    });
    let inserted = match provider.db_insert(DRIVERS_TABLE, row).await {
        Ok(row) => row,
        Err(err) => {
            // Compensate: drop the account we just created. Any uploaded
            // files stay behind; accepted limitation.
            if let Err(del) = provider.admin_delete_user(account.id).await {
                error!("compensating account delete failed for {}: {del}", account.id);
            }
            return Err(match err {
                ProviderError::Conflict(message) => ApiError::Conflict(message),
                ProviderError::Transport(err) => ApiError::Unexpected(err.to_string()),
                other => ApiError::bad_request(other.to_string()),
            });
        }
    };
    let driver = driver_from_row(inserted)?;
    info!("registered driver {} ({})", driver.name, driver.id);

    Ok(HttpResponse::Created().json(json!({
        "driver": driver,
        "message": "Registration successful",
    })))
}

#[post("/api/drivers/login")]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let email = body.get("email").and_then(Value::as_str);
    let phone = body.get("phone").and_then(Value::as_str);
    let password = body
        .get("password")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let Some(identifier) = Identifier::from_input(email, phone) else {
        return Err(ApiError::bad_request("Email and password are required"));
    };
    if password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }
    if let Identifier::Phone(phone) = &identifier {
        if !is_valid_phone(phone) {
            return Err(ApiError::bad_request(
                "Phone number must be exactly 10 digits",
            ));
        }
    }

    let provider = state.provider.client(None);
    let session = provider
        .sign_in(&identifier.account_email(), password)
        .await
        .map_err(|err| {
            debug!("sign-in rejected: {err}");
            ApiError::Unauthorized("Invalid email or password".to_string())
        })?;

    let driver = fetch_driver(provider.as_ref(), session.user.id).await?;

    let blob = serde_json::to_string(&AuthCookie::from(&session))
        .map_err(|err| ApiError::Unexpected(format!("session cookie encode failed: {err}")))?;
    let cookie = Cookie::build(state.auth_cookie_name.clone(), blob)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.secure_cookies)
        .path("/")
        .max_age(CookieDuration::days(AUTH_COOKIE_MAX_AGE_DAYS))
        .finish();

    info!("driver {} logged in", driver.id);
    Ok(HttpResponse::Ok().cookie(cookie).json(json!({
        "driver": driver,
        "message": "Login successful",
    })))
}

#[post("/api/drivers/logout")]
pub async fn logout(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let provider = state
        .provider
        .client(session_from_request(&req, &state.auth_cookie_name));
    provider.sign_out().await.map_err(|err| {
        error!("sign-out failed: {err}");
        ApiError::internal("Failed to logout")
    })?;

    let mut removal = Cookie::new(state.auth_cookie_name.clone(), "");
    removal.set_path("/");
    removal.make_removal();
    Ok(HttpResponse::Ok()
        .cookie(removal)
        .json(json!({ "message": "Logout successful" })))
}

#[get("/api/drivers/me")]
pub async fn me(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let provider = state
        .provider
        .client(session_from_request(&req, &state.auth_cookie_name));
    let user = resolve_user(&req, provider.as_ref()).await?;
    let driver = fetch_driver(provider.as_ref(), user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "driver": driver })))
}

#[patch("/api/drivers/status")]
pub async fn update_status(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let provider = state
        .provider
        .client(session_from_request(&req, &state.auth_cookie_name));
    let user = resolve_user(&req, provider.as_ref()).await?;

    let Some(is_active) = body.get("is_active").and_then(Value::as_bool) else {
        return Err(ApiError::bad_request("is_active must be a boolean"));
    };

    let existing = provider
        .db_select(
            DRIVERS_TABLE,
            "id,is_active",
            &[Filter::eq("user_id", user.id)],
            None,
        )
        .await?;
    if existing.is_empty() {
        return Err(ApiError::not_found("Driver profile not found"));
    }

    let updated = provider
        .db_update(
            DRIVERS_TABLE,
            &[Filter::eq("user_id", user.id)],
            json!({ "is_active": is_active }),
        )
        .await?;
    let Some(row) = updated else {
        return Err(ApiError::internal("Failed to update status"));
    };
    let driver = driver_from_row(row)?;
    info!("driver {} is now {}", driver.id, if driver.is_active { "active" } else { "inactive" });
    Ok(HttpResponse::Ok().json(json!({ "driver": driver })))
}

#[patch("/api/drivers/location")]
pub async fn update_location(
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

    let mut patch = json!({
        "active_state": state_name,
        "active_district": district,
        "active_location": sub_location,
    });
    // Optional combined activation; last write wins against the separate
    // status endpoint.
    if let Some(is_active) = body.get("is_active") {
        let Some(is_active) = is_active.as_bool() else {
            return Err(ApiError::bad_request("is_active must be a boolean"));
        };
        patch["is_active"] = json!(is_active);
    }

    let updated = provider
        .db_update(DRIVERS_TABLE, &[Filter::eq("user_id", user.id)], patch)
        .await?;
    let Some(row) = updated else {
        return Err(ApiError::not_found("Driver profile not found"));
    };
    let driver = driver_from_row(row)?;
    info!(
        "driver {} now serves {}/{}/{}",
        driver.id, state_name, district, sub_location
    );
    Ok(HttpResponse::Ok().json(json!({ "driver": driver })))
}

#[derive(Debug, Deserialize)]
pub struct ListDriversQuery {
    state: Option<String>,
    district: Option<String>,
    sub_location: Option<String>,
}

#[get("/api/drivers")]
pub async fn list_drivers(
    state: web::Data<AppState>,
    query: web::Query<ListDriversQuery>,
) -> Result<HttpResponse, ApiError> {
    let (Some(state_name), Some(district), Some(sub_location)) = (
        query.state.as_deref().filter(|v| !v.is_empty()),
        query.district.as_deref().filter(|v| !v.is_empty()),
        query.sub_location.as_deref().filter(|v| !v.is_empty()),
    ) else {
        return Err(ApiError::bad_request(
            "State, district, and sub-location are required",
        ));
    };

    let provider = state.provider.client(None);
    let rows = provider
        .db_select(
            DRIVERS_TABLE,
            "id,name,phone,auto_registration_number,photo_url",
            &[
                Filter::eq("is_active", true),
                Filter::eq("active_state", state_name),
                Filter::eq("active_district", district),
                Filter::eq("active_location", sub_location),
            ],
            None,
        )
        .await
        .map_err(|err| {
            error!("driver listing failed: {err}");
            ApiError::internal("Failed to fetch drivers")
        })?;

    let drivers: Vec<PublicDriver> = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(driver) => Some(driver),
            Err(err) => {
                error!("malformed driver row in listing: {err}");
                None
            }
        })
        .collect();
    Ok(HttpResponse::Ok().json(json!({ "drivers": drivers })))
}

#[derive(Debug, Deserialize)]
pub struct LicenseImageQuery {
    path: Option<String>,
}

#[get("/api/drivers/license-image")]
pub async fn license_image(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<LicenseImageQuery>,
) -> Result<HttpResponse, ApiError> {
    let Some(path) = query.path.as_deref().filter(|p| !p.is_empty()) else {
        return Err(ApiError::bad_request("Path parameter is required"));
    };

    let provider = state
        .provider
        .client(session_from_request(&req, &state.auth_cookie_name));
    resolve_user(&req, provider.as_ref()).await?;

    let signed_url = provider
        .create_signed_url(LICENSE_BUCKET, path, SIGNED_URL_EXPIRY_SECS)
        .await
        .map_err(|err| {
            error!("signed URL creation failed for {path}: {err}");
            ApiError::internal("Failed to get license image")
        })?;

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, signed_url))
        .finish())
}
