pub mod auth;
pub mod user;
pub mod asset;
pub mod affiliation;
pub mod request;
