//! Sensor dashboard: simulated sensor readings loaded from a JSON document,
//! rendered as an HTML page, refreshed one sensor at a time on request.

pub mod app;
pub mod config;
pub mod error;
pub mod generator;
pub mod models;
pub mod registry;
pub mod render;
pub mod server;
pub mod source;
