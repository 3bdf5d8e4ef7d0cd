//! Service clients layered on [`crate::http::HttpClient`].

pub mod auth;
pub mod transfer;

pub use auth::*;
pub use transfer::*;
