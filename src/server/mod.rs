//! HTTP server exposing the cache over JSON.
//!
//! - [`api`]: Request/response types and route handlers

pub mod api;
