pub mod auth;
pub mod capacity_guard;
pub mod workflow_service;
pub mod user_service;
pub mod asset_service;
