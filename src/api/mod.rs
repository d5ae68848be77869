//! API Module
//!
//! HTTP handlers and routing for the operator control surface.
//!
//! # Endpoints
//! - `POST /cache/clear` - Remove every cached response
//! - `DELETE /cache/namespace/:operation_id` - Remove one operation's responses
//! - `GET /stats` - Lookup counters
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
