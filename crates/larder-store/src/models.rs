//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed to
//! the HTTP layer, which reshapes it into its own response types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account.
///
/// The stored email has its domain segment lower-cased; the local part is
/// kept as supplied.  `password_hash` is an argon2 PHC string and never
/// appears in serialized output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(skip)]
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Label (tag or ingredient)
// ---------------------------------------------------------------------------

/// A tag or ingredient row.  Both share ownership and reconciliation rules
/// and differ only in namespace; `(user_id, name)` is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Label {
    pub id: i64,
    /// Owning user.  Labels are never shared across accounts.
    pub user_id: i64,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Recipe
// ---------------------------------------------------------------------------

/// A recipe with its hydrated tag and ingredient sets.
///
/// The label sets only ever contain rows owned by the same user as the
/// recipe; the reconciliation layer resolves every label against the acting
/// user before attaching it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipe {
    pub id: i64,
    /// Owning user.  Immutable after creation.
    pub user_id: i64,
    pub title: String,
    pub time_minutes: u32,
    /// Always carries exactly two decimal digits.
    pub price: Decimal,
    pub description: String,
    pub link: Option<String>,
    /// Media-relative reference to the stored image, if one was uploaded.
    pub image: Option<String>,
    pub tags: Vec<Label>,
    pub ingredients: Vec<Label>,
}
