//! HTTP API layer: handlers, middleware, and DTOs.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
