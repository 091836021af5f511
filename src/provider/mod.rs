//! Boundary to the external identity/storage provider.
//!
//! Everything the application delegates (accounts, sessions, the `drivers`
//! and `locations` relations, the two file buckets) goes through the
//! [`Provider`] trait. A client is built per request from the request's
//! canonical session cookie; no provider state is shared across requests.

pub mod memory;
pub mod supabase;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth_model::{AuthSession, AuthUser};

pub const DRIVERS_TABLE: &str = "drivers";
pub const LOCATIONS_TABLE: &str = "locations";
/// Public bucket; uploaded photos are addressed by public URL.
pub const PHOTO_BUCKET: &str = "driver-photos";
/// Private bucket; license images are addressed by path and read via
/// short-lived signed URLs.
pub const LICENSE_BUCKET: &str = "license-images";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Unexpected(String),
}

/// Equality filter on a relation column.
#[derive(Debug, Clone)]
pub struct Filter {
    pub column: &'static str,
    pub value: String,
}

impl Filter {
    pub fn eq(column: &'static str, value: impl ToString) -> Self {
        Filter {
            column,
            value: value.to_string(),
        }
    }
}

/// Token pair extracted from the canonical session cookie.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Creates an auto-confirmed account. No verification email is sent.
    async fn admin_create_user(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthUser, ProviderError>;

    /// Compensation hook for failed registrations.
    async fn admin_delete_user(&self, user_id: Uuid) -> Result<(), ProviderError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ProviderError>;

    /// The standard session read: resolves the tokens this client was
    /// constructed with, or `None` when there are none or they don't check
    /// out. Step 1 of the session-resolution procedure.
    async fn current_user(&self) -> Result<Option<AuthUser>, ProviderError>;

    /// Re-establishes a session from a raw token pair. Step 5 of the
    /// session-resolution procedure; may rotate the tokens held by this
    /// client as a side effect.
    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<AuthSession, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    async fn db_select(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
        order: Option<&'static str>,
    ) -> Result<Vec<Value>, ProviderError>;

    /// Inserts one row and returns it as stored. Unique violations surface
    /// as [`ProviderError::Conflict`].
    async fn db_insert(&self, table: &str, row: Value) -> Result<Value, ProviderError>;

    /// Updates all rows matching the filters and returns the first updated
    /// row, or `None` when nothing matched.
    async fn db_update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Option<Value>, ProviderError>;

    async fn storage_upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ProviderError>;

    fn public_url(&self, bucket: &str, path: &str) -> String;

    async fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in_secs: u64,
    ) -> Result<String, ProviderError>;
}

/// Builds one provider client per request scope.
pub trait ProviderFactory: Send + Sync {
    fn client(&self, session: Option<SessionTokens>) -> Arc<dyn Provider>;
}
