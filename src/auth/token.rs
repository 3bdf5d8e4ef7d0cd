//! Token secrets and grant responses.

pub mod response;
pub mod secret;
