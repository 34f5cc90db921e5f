//! SkyCart Core - Shared types and the declarative collection catalog.
//!
//! This crate provides the pieces every SkyCart component agrees on:
//! - `server` - Provisioning, document stores, and the HTTP service shell
//! - `cli` - Command-line tools for provisioning and user management
//!
//! # Architecture
//!
//! The core crate contains only types, the catalog, and pure validation - no I/O,
//! no database access, no HTTP clients. Stores render or enforce the catalog;
//! they never redefine it.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, passwords, roles, and statuses
//! - [`schema`] - Collection specs, field rules, index specs, and document validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod schema;
pub mod types;

pub use types::*;
