pub mod auth_model;
pub mod driver_model;
pub mod location_model;
