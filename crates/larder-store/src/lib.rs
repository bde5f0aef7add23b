//! # larder-store
//!
//! SQLite-backed storage for the larder recipe service.  The crate exposes a
//! synchronous [`Database`] handle that wraps a `rusqlite::Connection` and
//! provides typed helpers for accounts, bearer tokens, labels, and recipes.
//!
//! Every read and write is scoped to an owning user; rows belonging to
//! anyone else read as missing rather than forbidden.

pub mod database;
pub mod labels;
pub mod migrations;
pub mod models;
pub mod password;
pub mod recipes;
pub mod users;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use labels::LabelKind;
pub use models::*;
pub use recipes::{NewRecipe, RecipeFilter, RecipeUpdate};
pub use users::normalize_email;
