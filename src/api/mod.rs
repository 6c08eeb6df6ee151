//! API Module
//!
//! HTTP handlers and routing for the cache admin API.
//!
//! # Endpoints
//! - `PUT /cache/:category/:identifier` - Cache a value
//! - `GET /cache/:category/:identifier` - Read a cached value
//! - `DELETE /cache/:category/:identifier` - Drop a cached value
//! - `POST /invalidate` - Drop every key matching a glob pattern
//! - `GET /stats` - Cache counters and circuit state
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
