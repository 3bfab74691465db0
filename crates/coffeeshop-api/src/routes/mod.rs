//! # API Route Modules
//!
//! - `drinks`: the menu CRUD surface and its per-endpoint scopes.

pub mod drinks;
