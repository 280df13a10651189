//! Work-session tracking with correction approval.
//!
//! [`service::AttendanceService`] is the core; `api` and `routes` expose it
//! over HTTP, `store` persists it.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod model;
pub mod routes;
pub mod service;
pub mod store;
