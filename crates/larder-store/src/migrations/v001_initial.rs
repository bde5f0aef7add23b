//! v001 -- Initial schema creation.
//!
//! Creates the account tables (`users`, `tokens`), the label tables (`tags`,
//! `ingredients`), `recipes`, and the two recipe/label association tables.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT NOT NULL UNIQUE,        -- domain segment lower-cased
    name          TEXT NOT NULL DEFAULT '',
    password_hash TEXT NOT NULL,               -- argon2 PHC string
    is_staff      INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    is_superuser  INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL                -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Auth tokens (one per user, reused across logins)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS tokens (
    token      TEXT PRIMARY KEY NOT NULL,
    user_id    INTEGER NOT NULL UNIQUE,
    created_at TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Tags
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS tags (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    name    TEXT NOT NULL,

    UNIQUE (user_id, name),                    -- per-user namespace
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Ingredients (same shape as tags, separate namespace)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS ingredients (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    name    TEXT NOT NULL,

    UNIQUE (user_id, name),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Recipes
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS recipes (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      INTEGER NOT NULL,
    title        TEXT NOT NULL,
    time_minutes INTEGER NOT NULL,
    price        TEXT NOT NULL,                -- decimal, two-digit scale
    description  TEXT NOT NULL DEFAULT '',
    link         TEXT,
    image        TEXT,                         -- media-relative file reference

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_recipes_user ON recipes(user_id);

-- ----------------------------------------------------------------
-- Recipe <-> label associations
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS recipe_tags (
    recipe_id INTEGER NOT NULL,
    tag_id    INTEGER NOT NULL,

    PRIMARY KEY (recipe_id, tag_id),
    FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id)    REFERENCES tags(id)    ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS recipe_ingredients (
    recipe_id     INTEGER NOT NULL,
    ingredient_id INTEGER NOT NULL,

    PRIMARY KEY (recipe_id, ingredient_id),
    FOREIGN KEY (recipe_id)     REFERENCES recipes(id)     ON DELETE CASCADE,
    FOREIGN KEY (ingredient_id) REFERENCES ingredients(id) ON DELETE CASCADE
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
