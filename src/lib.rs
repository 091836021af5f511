//! Location-based directory connecting riders with auto-rickshaw drivers.
//!
//! Thin HTTP layer over an external identity/storage provider: drivers
//! register with photos and a license image, declare a hierarchical serving
//! location (state, district, sub-location) and an availability flag;
//! riders list active drivers by exact location match.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod provider;
pub mod state;
pub mod utils;
