//! Recipe store: scoped CRUD, id-set filtering, and label reconciliation.
//!
//! Every operation takes the acting user and only ever touches that user's
//! rows.  Writes that resolve labels run inside one transaction, so a
//! concurrent reader never observes a half-rebuilt association set.

use std::str::FromStr;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use rust_decimal::Decimal;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::labels::{self, LabelKind};
use crate::models::{Label, Recipe};

/// Payload for creating a recipe.  Label entries are bare names; they are
/// resolved against the acting user via get-or-create.
#[derive(Debug, Clone, Default)]
pub struct NewRecipe {
    pub title: String,
    pub time_minutes: u32,
    pub price: Decimal,
    pub description: String,
    pub link: Option<String>,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
}

/// Partial update.  `None` leaves a field untouched.  For the label sets the
/// rule is sharper: `Some(vec![])` clears the whole set, `None` preserves it.
#[derive(Debug, Clone, Default)]
pub struct RecipeUpdate {
    pub title: Option<String>,
    pub time_minutes: Option<u32>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

/// Id-set filters for recipe listing.  Within a dimension the ids are OR-ed;
/// across dimensions the filters combine with AND.  `None` means no
/// filtering on that dimension.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub tag_ids: Option<Vec<i64>>,
    pub ingredient_ids: Option<Vec<i64>>,
}

const RECIPE_COLUMNS: &str = "id, user_id, title, time_minutes, price, description, link, image";

/// Prices are stored and served with exactly two decimal digits.
fn rescale_price(mut price: Decimal) -> Decimal {
    price.rescale(2);
    price
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(StoreError::Validation("title must not be empty".into()));
    }
    Ok(())
}

/// Numbered placeholders `?{start+1}, ...` for an id list appended after
/// `start` already-bound parameters.
fn placeholders(start: usize, count: usize) -> String {
    (0..count)
        .map(|i| format!("?{}", start + i + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Database {
    /// List a user's recipes, newest first (descending id), applying the
    /// optional tag/ingredient id filters.
    pub fn list_recipes(&self, user_id: i64, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
        let mut sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE user_id = ?1");
        let mut bind: Vec<i64> = vec![user_id];

        for (ids, kind) in [
            (&filter.tag_ids, LabelKind::Tag),
            (&filter.ingredient_ids, LabelKind::Ingredient),
        ] {
            let Some(ids) = ids else { continue };
            if ids.is_empty() {
                // An explicitly empty id set matches nothing.
                sql.push_str(" AND 0");
                continue;
            }
            // Membership subquery rather than a join: a recipe matching
            // several of the ids must still appear once.
            sql.push_str(&format!(
                " AND id IN (SELECT recipe_id FROM {} WHERE {} IN ({}))",
                kind.link_table(),
                kind.link_column(),
                placeholders(bind.len(), ids.len()),
            ));
            bind.extend_from_slice(ids);
        }
        sql.push_str(" ORDER BY id DESC");

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind.iter()), row_to_recipe)?;

        let mut recipes = Vec::new();
        for row in rows {
            recipes.push(row?);
        }
        for recipe in &mut recipes {
            hydrate_labels(self.conn(), recipe)?;
        }
        Ok(recipes)
    }

    /// Fetch a recipe with its label sets, scoped to the owner.  Unknown and
    /// foreign ids both report [`StoreError::NotFound`].
    pub fn get_recipe(&self, user_id: i64, id: i64) -> Result<Recipe> {
        let mut recipe = self
            .conn()
            .query_row(
                &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1 AND user_id = ?2"),
                params![id, user_id],
                row_to_recipe,
            )
            .optional()?
            .ok_or(StoreError::NotFound)?;
        hydrate_labels(self.conn(), &mut recipe)?;
        Ok(recipe)
    }

    /// Create a recipe owned by `user_id`, resolving and attaching the
    /// supplied label names in the same transaction.
    pub fn create_recipe(&mut self, user_id: i64, new: &NewRecipe) -> Result<Recipe> {
        validate_title(&new.title)?;
        let price = rescale_price(new.price);

        let tx = self.conn_mut().transaction()?;
        tx.execute(
            "INSERT INTO recipes (user_id, title, time_minutes, price, description, link)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                new.title,
                new.time_minutes,
                price.to_string(),
                new.description,
                new.link,
            ],
        )?;
        let id = tx.last_insert_rowid();

        attach_labels(&tx, user_id, id, LabelKind::Tag, &new.tags)?;
        attach_labels(&tx, user_id, id, LabelKind::Ingredient, &new.ingredients)?;
        tx.commit()?;

        tracing::debug!(recipe = id, user = user_id, "created recipe");
        self.get_recipe(user_id, id)
    }

    /// Apply a partial update, scoped to the owner.
    ///
    /// A label key that is present in the payload (even as an empty list)
    /// clears the whole association set before rebuilding it from the
    /// payload; an absent key leaves that set untouched.
    pub fn update_recipe(&mut self, user_id: i64, id: i64, update: &RecipeUpdate) -> Result<Recipe> {
        if let Some(title) = &update.title {
            validate_title(title)?;
        }

        let tx = self.conn_mut().transaction()?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM recipes WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::NotFound);
        }

        if let Some(title) = &update.title {
            tx.execute(
                "UPDATE recipes SET title = ?1 WHERE id = ?2",
                params![title, id],
            )?;
        }
        if let Some(time_minutes) = update.time_minutes {
            tx.execute(
                "UPDATE recipes SET time_minutes = ?1 WHERE id = ?2",
                params![time_minutes, id],
            )?;
        }
        if let Some(price) = update.price {
            tx.execute(
                "UPDATE recipes SET price = ?1 WHERE id = ?2",
                params![rescale_price(price).to_string(), id],
            )?;
        }
        if let Some(description) = &update.description {
            tx.execute(
                "UPDATE recipes SET description = ?1 WHERE id = ?2",
                params![description, id],
            )?;
        }
        if let Some(link) = &update.link {
            tx.execute(
                "UPDATE recipes SET link = ?1 WHERE id = ?2",
                params![link, id],
            )?;
        }

        if let Some(tags) = &update.tags {
            tx.execute("DELETE FROM recipe_tags WHERE recipe_id = ?1", params![id])?;
            attach_labels(&tx, user_id, id, LabelKind::Tag, tags)?;
        }
        if let Some(ingredients) = &update.ingredients {
            tx.execute(
                "DELETE FROM recipe_ingredients WHERE recipe_id = ?1",
                params![id],
            )?;
            attach_labels(&tx, user_id, id, LabelKind::Ingredient, ingredients)?;
        }

        tx.commit()?;
        self.get_recipe(user_id, id)
    }

    /// Delete a recipe, scoped to the owner.  Association rows cascade away.
    pub fn delete_recipe(&self, user_id: i64, id: i64) -> Result<()> {
        let affected = self.conn().execute(
            "DELETE FROM recipes WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        tracing::debug!(recipe = id, user = user_id, "deleted recipe");
        Ok(())
    }

    /// Record a stored image reference on the recipe, replacing any prior
    /// value.  The old file is not removed here; orphan cleanup is an
    /// external concern.
    pub fn set_recipe_image(&self, user_id: i64, id: i64, reference: &str) -> Result<Recipe> {
        let affected = self.conn().execute(
            "UPDATE recipes SET image = ?1 WHERE id = ?2 AND user_id = ?3",
            params![reference, id, user_id],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_recipe(user_id, id)
    }
}

/// Resolve each supplied name against the acting user and link it to the
/// recipe.  `INSERT OR IGNORE` keeps the association a set, so a name
/// supplied twice attaches once.
fn attach_labels(
    tx: &Transaction<'_>,
    user_id: i64,
    recipe_id: i64,
    kind: LabelKind,
    names: &[String],
) -> Result<()> {
    for name in names {
        let label_id = labels::resolve_label(tx, user_id, kind, name)?;
        tx.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (recipe_id, {}) VALUES (?1, ?2)",
                kind.link_table(),
                kind.link_column()
            ),
            params![recipe_id, label_id],
        )?;
    }
    Ok(())
}

fn labels_for_recipe(conn: &Connection, recipe_id: i64, kind: LabelKind) -> Result<Vec<Label>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT l.id, l.user_id, l.name FROM {} l
         JOIN {} a ON a.{} = l.id
         WHERE a.recipe_id = ?1
         ORDER BY l.id",
        kind.table(),
        kind.link_table(),
        kind.link_column()
    ))?;
    let rows = stmt.query_map(params![recipe_id], |row| {
        Ok(Label {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
        })
    })?;

    let mut labels = Vec::new();
    for row in rows {
        labels.push(row?);
    }
    Ok(labels)
}

fn hydrate_labels(conn: &Connection, recipe: &mut Recipe) -> Result<()> {
    recipe.tags = labels_for_recipe(conn, recipe.id, LabelKind::Tag)?;
    recipe.ingredients = labels_for_recipe(conn, recipe.id, LabelKind::Ingredient)?;
    Ok(())
}

fn row_to_recipe(row: &rusqlite::Row<'_>) -> rusqlite::Result<Recipe> {
    let price_str: String = row.get(4)?;
    let price = Decimal::from_str(&price_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Recipe {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        time_minutes: row.get(3)?,
        price,
        description: row.get(5)?,
        link: row.get(6)?,
        image: row.get(7)?,
        tags: Vec::new(),
        ingredients: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn sample_user(db: &Database, email: &str) -> i64 {
        db.create_user(email, "samplepass", "").unwrap().id
    }

    fn sample_recipe(db: &mut Database, user_id: i64, title: &str) -> Recipe {
        db.create_recipe(
            user_id,
            &NewRecipe {
                title: title.to_string(),
                time_minutes: 5,
                price: Decimal::new(550, 2),
                description: "Sample recipe description".to_string(),
                ..NewRecipe::default()
            },
        )
        .unwrap()
    }

    fn tag_filter(ids: Vec<i64>) -> RecipeFilter {
        RecipeFilter {
            tag_ids: Some(ids),
            ..RecipeFilter::default()
        }
    }

    #[test]
    fn test_create_and_get_recipe() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");

        let created = db
            .create_recipe(
                user,
                &NewRecipe {
                    title: "Pizza".to_string(),
                    time_minutes: 60,
                    price: Decimal::from_str("5.4").unwrap(),
                    link: Some("https://example.com/pizza".to_string()),
                    ..NewRecipe::default()
                },
            )
            .unwrap();

        let fetched = db.get_recipe(user, created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.title, "Pizza");
        // Price is rescaled to two digits on write.
        assert_eq!(fetched.price.to_string(), "5.40");
    }

    #[test]
    fn test_empty_title_rejected() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");
        let err = db
            .create_recipe(user, &NewRecipe::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_list_newest_first() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");
        let first = sample_recipe(&mut db, user, "First");
        let second = sample_recipe(&mut db, user, "Second");

        let ids: Vec<i64> = db
            .list_recipes(user, &RecipeFilter::default())
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, [second.id, first.id]);
    }

    #[test]
    fn test_recipes_limited_to_user() {
        let mut db = test_db();
        let alice = sample_user(&db, "alice@example.com");
        let bob = sample_user(&db, "bob@example.com");
        let hers = sample_recipe(&mut db, alice, "Curry");
        sample_recipe(&mut db, bob, "Stew");

        let titles: Vec<String> = db
            .list_recipes(alice, &RecipeFilter::default())
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, ["Curry"]);

        // Foreign ids read as missing for every mutation path too.
        assert!(matches!(db.get_recipe(bob, hers.id), Err(StoreError::NotFound)));
        assert!(matches!(
            db.update_recipe(bob, hers.id, &RecipeUpdate::default()),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(db.delete_recipe(bob, hers.id), Err(StoreError::NotFound)));
        assert!(matches!(
            db.set_recipe_image(bob, hers.id, "recipes/x.png"),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn test_partial_update_leaves_other_fields() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");
        let recipe = sample_recipe(&mut db, user, "Pasta");

        let updated = db
            .update_recipe(
                user,
                recipe.id,
                &RecipeUpdate {
                    title: Some("PastaPizza".to_string()),
                    ..RecipeUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.title, "PastaPizza");
        assert_eq!(updated.time_minutes, recipe.time_minutes);
        assert_eq!(updated.price, recipe.price);
        assert_eq!(updated.description, recipe.description);
    }

    #[test]
    fn test_create_with_tags_attaches_once_per_name() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");

        let recipe = db
            .create_recipe(
                user,
                &NewRecipe {
                    title: "Salad".to_string(),
                    time_minutes: 10,
                    price: Decimal::new(250, 2),
                    tags: vec!["Lunch".to_string(), "Lunch".to_string()],
                    ..NewRecipe::default()
                },
            )
            .unwrap();

        // Supplying the same name twice attaches once.
        assert_eq!(recipe.tags.len(), 1);
        assert_eq!(recipe.tags[0].name, "Lunch");
        assert_eq!(db.list_labels(user, LabelKind::Tag, false).unwrap().len(), 1);
    }

    #[test]
    fn test_create_with_existing_tag_reuses_row() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");
        let existing = db.create_label(user, LabelKind::Tag, "Lunch").unwrap();

        let recipe = db
            .create_recipe(
                user,
                &NewRecipe {
                    title: "Salad".to_string(),
                    time_minutes: 10,
                    price: Decimal::new(250, 2),
                    tags: vec!["Lunch".to_string(), "Quick".to_string()],
                    ..NewRecipe::default()
                },
            )
            .unwrap();

        // The pre-existing row was attached, not duplicated.
        assert!(recipe.tags.iter().any(|t| t.id == existing.id));
        assert_eq!(db.list_labels(user, LabelKind::Tag, false).unwrap().len(), 2);
    }

    #[test]
    fn test_update_with_tags_key_rebuilds_set() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");
        let recipe = sample_recipe(&mut db, user, "Soup");
        db.update_recipe(
            user,
            recipe.id,
            &RecipeUpdate {
                tags: Some(vec!["Breakfast".to_string()]),
                ..RecipeUpdate::default()
            },
        )
        .unwrap();

        let updated = db
            .update_recipe(
                user,
                recipe.id,
                &RecipeUpdate {
                    tags: Some(vec!["Lunch".to_string()]),
                    ..RecipeUpdate::default()
                },
            )
            .unwrap();

        let names: Vec<String> = updated.tags.into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["Lunch"]);
        // The replaced tag row itself survives, detached.
        assert_eq!(db.list_labels(user, LabelKind::Tag, false).unwrap().len(), 2);
    }

    #[test]
    fn test_update_with_empty_tags_clears() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");
        let recipe = db
            .create_recipe(
                user,
                &NewRecipe {
                    title: "Soup".to_string(),
                    time_minutes: 20,
                    price: Decimal::new(300, 2),
                    tags: vec!["Dinner".to_string()],
                    ..NewRecipe::default()
                },
            )
            .unwrap();
        assert_eq!(recipe.tags.len(), 1);

        let updated = db
            .update_recipe(
                user,
                recipe.id,
                &RecipeUpdate {
                    tags: Some(Vec::new()),
                    ..RecipeUpdate::default()
                },
            )
            .unwrap();
        assert!(updated.tags.is_empty());
    }

    #[test]
    fn test_update_without_tags_key_preserves() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");
        let recipe = db
            .create_recipe(
                user,
                &NewRecipe {
                    title: "Soup".to_string(),
                    time_minutes: 20,
                    price: Decimal::new(300, 2),
                    tags: vec!["Dinner".to_string()],
                    ingredients: vec!["Leek".to_string()],
                    ..NewRecipe::default()
                },
            )
            .unwrap();

        let updated = db
            .update_recipe(
                user,
                recipe.id,
                &RecipeUpdate {
                    title: Some("Leek Soup".to_string()),
                    ..RecipeUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.tags, recipe.tags);
        assert_eq!(updated.ingredients, recipe.ingredients);
    }

    #[test]
    fn test_update_with_ingredients_key_rebuilds_independently() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");
        let recipe = db
            .create_recipe(
                user,
                &NewRecipe {
                    title: "Curry".to_string(),
                    time_minutes: 40,
                    price: Decimal::new(725, 2),
                    tags: vec!["Dinner".to_string()],
                    ingredients: vec!["Rice".to_string()],
                    ..NewRecipe::default()
                },
            )
            .unwrap();

        let updated = db
            .update_recipe(
                user,
                recipe.id,
                &RecipeUpdate {
                    ingredients: Some(vec![
                        "Mustard oil".to_string(),
                        "Jeera".to_string(),
                    ]),
                    ..RecipeUpdate::default()
                },
            )
            .unwrap();

        let names: Vec<String> = updated.ingredients.iter().map(|i| i.name.clone()).collect();
        assert_eq!(names, ["Mustard oil", "Jeera"]);
        // Tags were untouched by the ingredient rebuild.
        assert_eq!(updated.tags, recipe.tags);
    }

    #[test]
    fn test_filter_by_tags_is_a_deduplicated_union() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");

        let both = db
            .create_recipe(
                user,
                &NewRecipe {
                    title: "Fry-up".to_string(),
                    time_minutes: 15,
                    price: Decimal::new(450, 2),
                    tags: vec!["Breakfast".to_string(), "Comfort".to_string()],
                    ..NewRecipe::default()
                },
            )
            .unwrap();
        let one = db
            .create_recipe(
                user,
                &NewRecipe {
                    title: "Porridge".to_string(),
                    time_minutes: 5,
                    price: Decimal::new(120, 2),
                    tags: vec!["Breakfast".to_string()],
                    ..NewRecipe::default()
                },
            )
            .unwrap();
        sample_recipe(&mut db, user, "Unrelated");

        let breakfast = both.tags.iter().find(|t| t.name == "Breakfast").unwrap().id;
        let comfort = both.tags.iter().find(|t| t.name == "Comfort").unwrap().id;

        // A recipe carrying both filter ids appears once.
        let ids: Vec<i64> = db
            .list_recipes(user, &tag_filter(vec![breakfast, comfort]))
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, [one.id, both.id]);
    }

    #[test]
    fn test_filters_combine_with_and_across_dimensions() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");

        let target = db
            .create_recipe(
                user,
                &NewRecipe {
                    title: "Pancakes".to_string(),
                    time_minutes: 25,
                    price: Decimal::new(320, 2),
                    tags: vec!["Breakfast".to_string()],
                    ingredients: vec!["Flour".to_string()],
                    ..NewRecipe::default()
                },
            )
            .unwrap();
        db.create_recipe(
            user,
            &NewRecipe {
                title: "Omelette".to_string(),
                time_minutes: 10,
                price: Decimal::new(280, 2),
                tags: vec!["Breakfast".to_string()],
                ingredients: vec!["Eggs".to_string()],
                ..NewRecipe::default()
            },
        )
        .unwrap();

        let tag_id = target.tags[0].id;
        let ingredient_id = target.ingredients[0].id;

        let filter = RecipeFilter {
            tag_ids: Some(vec![tag_id]),
            ingredient_ids: Some(vec![ingredient_id]),
        };
        let ids: Vec<i64> = db
            .list_recipes(user, &filter)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, [target.id]);
    }

    #[test]
    fn test_empty_filter_set_matches_nothing() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");
        sample_recipe(&mut db, user, "Anything");

        assert!(db.list_recipes(user, &tag_filter(Vec::new())).unwrap().is_empty());
    }

    #[test]
    fn test_assigned_only_excludes_unattached_labels() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");
        db.create_label(user, LabelKind::Ingredient, "Unused").unwrap();
        db.create_recipe(
            user,
            &NewRecipe {
                title: "Toast".to_string(),
                time_minutes: 5,
                price: Decimal::new(100, 2),
                ingredients: vec!["Bread".to_string()],
                ..NewRecipe::default()
            },
        )
        .unwrap();

        let names: Vec<String> = db
            .list_labels(user, LabelKind::Ingredient, true)
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, ["Bread"]);
    }

    #[test]
    fn test_assigned_only_deduplicates_shared_labels() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");
        for title in ["Eggs Benedict", "Shakshuka"] {
            db.create_recipe(
                user,
                &NewRecipe {
                    title: title.to_string(),
                    time_minutes: 30,
                    price: Decimal::new(600, 2),
                    ingredients: vec!["Eggs".to_string()],
                    ..NewRecipe::default()
                },
            )
            .unwrap();
        }

        // Two recipes share the label; it must still list once.
        let labels = db.list_labels(user, LabelKind::Ingredient, true).unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].name, "Eggs");
    }

    #[test]
    fn test_delete_recipe_cascades_associations() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");
        let recipe = db
            .create_recipe(
                user,
                &NewRecipe {
                    title: "Soup".to_string(),
                    time_minutes: 20,
                    price: Decimal::new(300, 2),
                    tags: vec!["Dinner".to_string()],
                    ..NewRecipe::default()
                },
            )
            .unwrap();

        db.delete_recipe(user, recipe.id).unwrap();

        // The tag row survives; only the association went away.
        assert_eq!(db.list_labels(user, LabelKind::Tag, false).unwrap().len(), 1);
        assert!(db.list_labels(user, LabelKind::Tag, true).unwrap().is_empty());
    }

    #[test]
    fn test_set_recipe_image_replaces_reference() {
        let mut db = test_db();
        let user = sample_user(&db, "sample@example.com");
        let recipe = sample_recipe(&mut db, user, "Pie");
        assert!(recipe.image.is_none());

        let first = db
            .set_recipe_image(user, recipe.id, "recipes/1-aaaa.png")
            .unwrap();
        assert_eq!(first.image.as_deref(), Some("recipes/1-aaaa.png"));

        let second = db
            .set_recipe_image(user, recipe.id, "recipes/1-bbbb.png")
            .unwrap();
        assert_eq!(second.image.as_deref(), Some("recipes/1-bbbb.png"));
    }
}
