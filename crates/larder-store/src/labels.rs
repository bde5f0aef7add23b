//! Taxonomy store: per-user tags and ingredients ("labels").
//!
//! Tags and ingredients share ownership and reconciliation rules and differ
//! only in namespace, so one set of helpers serves both, keyed by
//! [`LabelKind`].

use rusqlite::{params, Connection, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Label;

/// Which label namespace an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Tag,
    Ingredient,
}

impl LabelKind {
    /// Table holding the label rows.
    pub(crate) fn table(self) -> &'static str {
        match self {
            LabelKind::Tag => "tags",
            LabelKind::Ingredient => "ingredients",
        }
    }

    /// Recipe association table.
    pub(crate) fn link_table(self) -> &'static str {
        match self {
            LabelKind::Tag => "recipe_tags",
            LabelKind::Ingredient => "recipe_ingredients",
        }
    }

    /// Label-side column in the association table.
    pub(crate) fn link_column(self) -> &'static str {
        match self {
            LabelKind::Tag => "tag_id",
            LabelKind::Ingredient => "ingredient_id",
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(StoreError::Validation("name must not be empty".into()));
    }
    Ok(())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl Database {
    /// List a user's labels, ordered by name descending (SQLite binary
    /// collation, so case-sensitive).
    ///
    /// With `assigned_only`, the result is restricted to labels attached to
    /// at least one recipe.  The membership subquery keeps each label unique
    /// even when several recipes share it; a bare join would not.
    pub fn list_labels(
        &self,
        user_id: i64,
        kind: LabelKind,
        assigned_only: bool,
    ) -> Result<Vec<Label>> {
        let mut sql = format!(
            "SELECT id, user_id, name FROM {} WHERE user_id = ?1",
            kind.table()
        );
        if assigned_only {
            sql.push_str(&format!(
                " AND id IN (SELECT {} FROM {})",
                kind.link_column(),
                kind.link_table()
            ));
        }
        sql.push_str(" ORDER BY name DESC");

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], row_to_label)?;

        let mut labels = Vec::new();
        for row in rows {
            labels.push(row?);
        }
        Ok(labels)
    }

    /// Create a label owned by `user_id`.  `(user, name)` is unique per
    /// namespace; duplicates are a validation error.
    pub fn create_label(&self, user_id: i64, kind: LabelKind, name: &str) -> Result<Label> {
        validate_name(name)?;

        let inserted = self.conn().execute(
            &format!(
                "INSERT INTO {} (user_id, name) VALUES (?1, ?2)",
                kind.table()
            ),
            params![user_id, name],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::Validation(format!(
                    "{name:?} already exists"
                )));
            }
            Err(e) => return Err(e.into()),
        }

        self.get_label(user_id, kind, self.conn().last_insert_rowid())
    }

    /// Fetch a label scoped to its owner.  Rows owned by another user report
    /// [`StoreError::NotFound`].
    pub fn get_label(&self, user_id: i64, kind: LabelKind, id: i64) -> Result<Label> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT id, user_id, name FROM {} WHERE id = ?1 AND user_id = ?2",
                    kind.table()
                ),
                params![id, user_id],
                row_to_label,
            )
            .optional()?
            .ok_or(StoreError::NotFound)
    }

    /// Rename a label, scoped to its owner.
    pub fn update_label(
        &self,
        user_id: i64,
        kind: LabelKind,
        id: i64,
        name: &str,
    ) -> Result<Label> {
        validate_name(name)?;

        let updated = self.conn().execute(
            &format!(
                "UPDATE {} SET name = ?1 WHERE id = ?2 AND user_id = ?3",
                kind.table()
            ),
            params![name, id, user_id],
        );
        match updated {
            Ok(0) => return Err(StoreError::NotFound),
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::Validation(format!(
                    "{name:?} already exists"
                )));
            }
            Err(e) => return Err(e.into()),
        }

        self.get_label(user_id, kind, id)
    }

    /// Delete a label, scoped to its owner.  Association rows cascade away.
    pub fn delete_label(&self, user_id: i64, kind: LabelKind, id: i64) -> Result<()> {
        let affected = self.conn().execute(
            &format!("DELETE FROM {} WHERE id = ?1 AND user_id = ?2", kind.table()),
            params![id, user_id],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// Get-or-create a `(user, name)` label row inside an open transaction.
///
/// An existing row is reused (same id), never duplicated.  This is the
/// resolution half of recipe-write reconciliation.
pub(crate) fn resolve_label(
    conn: &Connection,
    user_id: i64,
    kind: LabelKind,
    name: &str,
) -> Result<i64> {
    validate_name(name)?;

    let existing: Option<i64> = conn
        .query_row(
            &format!(
                "SELECT id FROM {} WHERE user_id = ?1 AND name = ?2",
                kind.table()
            ),
            params![user_id, name],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        &format!(
            "INSERT INTO {} (user_id, name) VALUES (?1, ?2)",
            kind.table()
        ),
        params![user_id, name],
    )?;
    Ok(conn.last_insert_rowid())
}

fn row_to_label(row: &rusqlite::Row<'_>) -> rusqlite::Result<Label> {
    Ok(Label {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
    })
}
