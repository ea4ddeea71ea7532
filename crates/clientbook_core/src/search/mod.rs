//! Contact search entry points.
//!
//! # Responsibility
//! - Provide keyword lookup over contact identity fields.
//! - Keep FTS details behind a typed query/result API.

pub mod contacts;
