use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of the `drivers` relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub auto_registration_number: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Private bucket path, not a URL. Served through the signed-URL redirect.
    #[serde(default)]
    pub license_id_image_url: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub active_state: Option<String>,
    #[serde(default)]
    pub active_district: Option<String>,
    #[serde(default)]
    pub active_location: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Projection returned by the public listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicDriver {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub auto_registration_number: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}
