use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{MealError, Result};
use crate::models::{
    Category, MealRecord, format_timestamp, join_lines, join_tags, parse_timestamp, split_lines,
    split_tags,
};
use crate::store::{MealStore, duplicate_id};

/// Single-table SQLite storage for meal records.
pub struct SqliteStore {
    conn: Connection,
}

// Column order shared by every SELECT below and by `meal_from_row`.
const MEAL_COLUMNS: &str = "id, owner_user_id, name, category, tags, description, recipe_url,
    protein_g, carbs_g, fat_g, calories, fiber_g, sugar_g, sodium_mg, cholesterol_mg,
    saturated_fat_g, trans_fat_g, ingredients, instructions, image_reference, created_at,
    likes, comments, saved_count";

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            MealError::storage(format!("Failed to open database {}: {e}", path.display()))
        })?;
        let store = SqliteStore { conn };
        store.migrate()?;
        tracing::debug!(path = %path.display(), "opened sqlite meal store");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteStore { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS meals (
                    id TEXT PRIMARY KEY NOT NULL,
                    owner_user_id TEXT,
                    name TEXT NOT NULL,
                    category TEXT NOT NULL,
                    tags TEXT NOT NULL DEFAULT '',
                    description TEXT NOT NULL DEFAULT '',
                    recipe_url TEXT,
                    protein_g REAL NOT NULL DEFAULT 0,
                    carbs_g REAL NOT NULL DEFAULT 0,
                    fat_g REAL NOT NULL DEFAULT 0,
                    calories REAL NOT NULL DEFAULT 0,
                    fiber_g REAL NOT NULL DEFAULT 0,
                    sugar_g REAL NOT NULL DEFAULT 0,
                    sodium_mg REAL NOT NULL DEFAULT 0,
                    cholesterol_mg REAL NOT NULL DEFAULT 0,
                    saturated_fat_g REAL NOT NULL DEFAULT 0,
                    trans_fat_g REAL NOT NULL DEFAULT 0,
                    ingredients TEXT NOT NULL DEFAULT '',
                    instructions TEXT NOT NULL DEFAULT '',
                    image_reference TEXT,
                    created_at TEXT NOT NULL,
                    likes INTEGER NOT NULL DEFAULT 0,
                    comments INTEGER NOT NULL DEFAULT 0,
                    saved_count INTEGER NOT NULL DEFAULT 0
                );

                CREATE INDEX IF NOT EXISTS idx_meals_owner ON meals(owner_user_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn meal_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealRecord> {
        let category: String = row.get(3)?;
        let category = category
            .parse::<Category>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
        let created_at: String = row.get(20)?;
        let created_at = parse_timestamp(&created_at).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                20,
                Type::Text,
                format!("invalid created_at '{created_at}'").into(),
            )
        })?;
        Ok(MealRecord {
            id: row.get(0)?,
            owner_user_id: row.get(1)?,
            name: row.get(2)?,
            category,
            tags: split_tags(&row.get::<_, String>(4)?),
            description: row.get(5)?,
            recipe_url: row.get(6)?,
            protein_g: row.get(7)?,
            carbs_g: row.get(8)?,
            fat_g: row.get(9)?,
            calories: row.get(10)?,
            fiber_g: row.get(11)?,
            sugar_g: row.get(12)?,
            sodium_mg: row.get(13)?,
            cholesterol_mg: row.get(14)?,
            saturated_fat_g: row.get(15)?,
            trans_fat_g: row.get(16)?,
            ingredients: split_lines(&row.get::<_, String>(17)?),
            instructions: split_lines(&row.get::<_, String>(18)?),
            image_reference: row.get(19)?,
            created_at,
            likes: count_from_sql(row.get(21)?),
            comments: count_from_sql(row.get(22)?),
            saved_count: count_from_sql(row.get(23)?),
        })
    }
}

/// Counters as SQLite integers. Values past `i64::MAX` are refused rather
/// than clamped so the row never differs from the record.
fn counts_to_sql(record: &MealRecord) -> Result<[i64; 3]> {
    let convert = |field: &str, count: u64| {
        i64::try_from(count).map_err(|_| {
            MealError::validation(format!("{field} of meal {} is out of range", record.id))
        })
    };
    Ok([
        convert("likes", record.likes)?,
        convert("comments", record.comments)?,
        convert("saved_count", record.saved_count)?,
    ])
}

fn count_from_sql(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

impl MealStore for SqliteStore {
    fn load_all(&self) -> Result<Vec<MealRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {MEAL_COLUMNS} FROM meals ORDER BY rowid"))?;
        let meals = stmt
            .query_map([], Self::meal_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(meals)
    }

    fn find(&self, id: &str) -> Result<Option<MealRecord>> {
        let meal = self
            .conn
            .query_row(
                &format!("SELECT {MEAL_COLUMNS} FROM meals WHERE id = ?1"),
                params![id],
                Self::meal_from_row,
            )
            .optional()?;
        Ok(meal)
    }

    fn insert(&mut self, record: &MealRecord) -> Result<()> {
        if self.find(&record.id)?.is_some() {
            return Err(duplicate_id(&record.id));
        }
        let [likes, comments, saved_count] = counts_to_sql(record)?;
        self.conn.execute(
            &format!(
                "INSERT INTO meals ({MEAL_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)"
            ),
            params![
                record.id,
                record.owner_user_id,
                record.name,
                record.category.as_str(),
                join_tags(&record.tags),
                record.description,
                record.recipe_url,
                record.protein_g,
                record.carbs_g,
                record.fat_g,
                record.calories,
                record.fiber_g,
                record.sugar_g,
                record.sodium_mg,
                record.cholesterol_mg,
                record.saturated_fat_g,
                record.trans_fat_g,
                join_lines(&record.ingredients),
                join_lines(&record.instructions),
                record.image_reference,
                format_timestamp(&record.created_at),
                likes,
                comments,
                saved_count,
            ],
        )?;
        Ok(())
    }

    fn replace(&mut self, record: &MealRecord) -> Result<bool> {
        let [likes, comments, saved_count] = counts_to_sql(record)?;
        let rows = self.conn.execute(
            "UPDATE meals SET owner_user_id = ?2, name = ?3, category = ?4, tags = ?5,
                description = ?6, recipe_url = ?7, protein_g = ?8, carbs_g = ?9, fat_g = ?10,
                calories = ?11, fiber_g = ?12, sugar_g = ?13, sodium_mg = ?14,
                cholesterol_mg = ?15, saturated_fat_g = ?16, trans_fat_g = ?17,
                ingredients = ?18, instructions = ?19, image_reference = ?20,
                created_at = ?21, likes = ?22, comments = ?23, saved_count = ?24
             WHERE id = ?1",
            params![
                record.id,
                record.owner_user_id,
                record.name,
                record.category.as_str(),
                join_tags(&record.tags),
                record.description,
                record.recipe_url,
                record.protein_g,
                record.carbs_g,
                record.fat_g,
                record.calories,
                record.fiber_g,
                record.sugar_g,
                record.sodium_mg,
                record.cholesterol_mg,
                record.saturated_fat_g,
                record.trans_fat_g,
                join_lines(&record.ingredients),
                join_lines(&record.instructions),
                record.image_reference,
                format_timestamp(&record.created_at),
                likes,
                comments,
                saved_count,
            ],
        )?;
        Ok(rows > 0)
    }

    fn remove(&mut self, id: &str) -> Result<Option<MealRecord>> {
        let Some(existing) = self.find(id)? else {
            return Ok(None);
        };
        self.conn
            .execute("DELETE FROM meals WHERE id = ?1", params![id])?;
        Ok(Some(existing))
    }
}
