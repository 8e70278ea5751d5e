//! axum handlers for the portal endpoints.
//!
//! Services reach the handlers through `Extension` layers installed by
//! [`crate::portal::router`].

pub mod appointment;
pub mod enrollment;
pub mod health;
pub mod login;
pub mod root;
pub mod session;
pub mod steps;

/// Where the front-end navigates after a successful login.
pub const DASHBOARD_PATH: &str = "/dashboard";
