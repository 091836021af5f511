use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of the `locations` relation, unique on the
/// (state, district, sub_location) triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub state: String,
    pub district: String,
    pub sub_location: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
