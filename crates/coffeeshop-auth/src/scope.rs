//! # Permission Scopes
//!
//! Scopes the drinks endpoints require. They must appear verbatim in the
//! token's `permissions` claim; matching is exact and case-sensitive.

/// View the full recipes (`GET /drinks-detail`).
pub const GET_DRINKS_DETAIL: &str = "get:drinks-detail";

/// Add a drink (`POST /drinks`).
pub const POST_DRINKS: &str = "post:drinks";

/// Edit a drink (`PATCH /drinks/:id`).
pub const PATCH_DRINKS: &str = "patch:drinks";

/// Remove a drink (`DELETE /drinks/:id`).
pub const DELETE_DRINKS: &str = "delete:drinks";

/// Every scope the API checks.
pub const ALL: [&str; 4] = [GET_DRINKS_DETAIL, POST_DRINKS, PATCH_DRINKS, DELETE_DRINKS];
