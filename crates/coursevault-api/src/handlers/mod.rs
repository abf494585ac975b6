//! HTTP handlers, one module per route group.

pub mod files;
pub mod uploads;
