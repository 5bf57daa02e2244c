//! HTTP handlers for entity data and account preferences.

pub mod data;
pub mod preferences;
