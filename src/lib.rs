//! authgate: session-cookie authentication over HTTP.
//!
//! Users register with a username, password and email, log in to receive an
//! opaque session cookie, and use it to reach gated JSON endpoints and pages.

pub mod auth;
pub mod config;
pub mod gateway;
