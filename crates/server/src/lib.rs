//! SkyCart server library.
//!
//! Document stores, provisioning, and the HTTP service shell. The
//! `skycart-server` binary serves [`routes::app`]; the `skycart` CLI drives
//! [`provision`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod provision;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

pub use routes::app;
pub use state::AppState;
