use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MealError, Result};
use crate::models::{
    Category, MealRecord, calories_from_macros, format_timestamp, join_lines, join_tags,
    parse_timestamp, split_lines, split_tags,
};
use crate::store::{MealStore, duplicate_id};

/// Column order of the flat file. Also the header row.
pub const CSV_HEADER: [&str; 24] = [
    "id",
    "owner_user_id",
    "name",
    "category",
    "tags",
    "description",
    "recipe_url",
    "protein_g",
    "carbs_g",
    "fat_g",
    "calories",
    "fiber_g",
    "sugar_g",
    "sodium_mg",
    "cholesterol_mg",
    "saturated_fat_g",
    "trans_fat_g",
    "ingredients",
    "instructions",
    "image_reference",
    "created_at",
    "likes",
    "comments",
    "saved_count",
];

/// One line of the flat file, before typing.
///
/// Field order must match `CSV_HEADER`. The aliases are the column names
/// older exports used; they are only honored when reading.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct CsvRow {
    #[serde(alias = "recipe_id")]
    id: Option<String>,
    #[serde(alias = "user_id")]
    owner_user_id: Option<String>,
    #[serde(alias = "meal_name")]
    name: String,
    #[serde(alias = "meal_category")]
    category: String,
    #[serde(alias = "meal_tags")]
    tags: String,
    #[serde(alias = "meal_description")]
    description: String,
    recipe_url: Option<String>,
    #[serde(alias = "protein")]
    protein_g: Option<f64>,
    #[serde(alias = "carbs")]
    carbs_g: Option<f64>,
    #[serde(alias = "fat")]
    fat_g: Option<f64>,
    calories: Option<f64>,
    #[serde(alias = "fiber")]
    fiber_g: Option<f64>,
    #[serde(alias = "sugar")]
    sugar_g: Option<f64>,
    #[serde(alias = "sodium")]
    sodium_mg: Option<f64>,
    #[serde(alias = "cholesterol")]
    cholesterol_mg: Option<f64>,
    #[serde(alias = "saturated_fat")]
    saturated_fat_g: Option<f64>,
    #[serde(alias = "trans_fat")]
    trans_fat_g: Option<f64>,
    ingredients: String,
    instructions: String,
    #[serde(alias = "image_path")]
    image_reference: Option<String>,
    #[serde(alias = "datetime")]
    created_at: Option<String>,
    likes: Option<u64>,
    comments: Option<u64>,
    saved_count: Option<u64>,
}

impl CsvRow {
    fn from_record(record: &MealRecord) -> Self {
        CsvRow {
            id: Some(record.id.clone()),
            owner_user_id: record.owner_user_id.clone(),
            name: record.name.clone(),
            category: record.category.as_str().to_string(),
            tags: join_tags(&record.tags),
            description: record.description.clone(),
            recipe_url: record.recipe_url.clone(),
            protein_g: Some(record.protein_g),
            carbs_g: Some(record.carbs_g),
            fat_g: Some(record.fat_g),
            calories: Some(record.calories),
            fiber_g: Some(record.fiber_g),
            sugar_g: Some(record.sugar_g),
            sodium_mg: Some(record.sodium_mg),
            cholesterol_mg: Some(record.cholesterol_mg),
            saturated_fat_g: Some(record.saturated_fat_g),
            trans_fat_g: Some(record.trans_fat_g),
            ingredients: join_lines(&record.ingredients),
            instructions: join_lines(&record.instructions),
            image_reference: record.image_reference.clone(),
            created_at: Some(format_timestamp(&record.created_at)),
            likes: Some(record.likes),
            comments: Some(record.comments),
            saved_count: Some(record.saved_count),
        }
    }

    fn into_record(self, line: u64, mode: ReadMode) -> Result<MealRecord> {
        let malformed = |msg: String| MealError::storage(format!("CSV line {line}: {msg}"));

        let id = match (non_blank(self.id), mode) {
            (Some(id), _) => id,
            (None, ReadMode::Import) => Uuid::new_v4().to_string(),
            (None, ReadMode::Strict) => return Err(malformed("missing id".into())),
        };
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(malformed("missing name".into()));
        }
        let category = self
            .category
            .trim()
            .parse::<Category>()
            .map_err(|e| malformed(e.to_string()))?;
        let created_at = match (non_blank(self.created_at), mode) {
            (Some(ts), _) => parse_timestamp(&ts)
                .ok_or_else(|| malformed(format!("invalid created_at '{ts}'")))?,
            (None, ReadMode::Import) => Utc::now(),
            (None, ReadMode::Strict) => return Err(malformed("missing created_at".into())),
        };

        let protein_g = self.protein_g.unwrap_or(0.0);
        let carbs_g = self.carbs_g.unwrap_or(0.0);
        let fat_g = self.fat_g.unwrap_or(0.0);
        let calories = self
            .calories
            .unwrap_or_else(|| calories_from_macros(protein_g, carbs_g, fat_g));

        Ok(MealRecord {
            id,
            owner_user_id: non_blank(self.owner_user_id),
            name,
            category,
            tags: split_tags(&self.tags),
            description: self.description,
            recipe_url: non_blank(self.recipe_url),
            protein_g,
            carbs_g,
            fat_g,
            calories,
            fiber_g: self.fiber_g.unwrap_or(0.0),
            sugar_g: self.sugar_g.unwrap_or(0.0),
            sodium_mg: self.sodium_mg.unwrap_or(0.0),
            cholesterol_mg: self.cholesterol_mg.unwrap_or(0.0),
            saturated_fat_g: self.saturated_fat_g.unwrap_or(0.0),
            trans_fat_g: self.trans_fat_g.unwrap_or(0.0),
            ingredients: split_lines(&self.ingredients),
            instructions: split_lines(&self.instructions),
            image_reference: non_blank(self.image_reference),
            created_at,
            likes: self.likes.unwrap_or(0),
            comments: self.comments.unwrap_or(0),
            saved_count: self.saved_count.unwrap_or(0),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadMode {
    /// The store's own file: every row must carry an id and a timestamp.
    Strict,
    /// Foreign or legacy files: missing ids and timestamps are filled in.
    Import,
}

fn parse_rows<R: Read>(reader: R, mode: ReadMode) -> Result<Vec<MealRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut meals = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| {
            let line = e.position().map_or(0, csv::Position::line);
            MealError::storage(format!("CSV line {line}: {e}"))
        })?;
        let line = record.position().map_or(0, csv::Position::line);
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let row: CsvRow = record
            .deserialize(Some(&headers))
            .map_err(|e| MealError::storage(format!("CSV line {line}: {e}")))?;
        meals.push(row.into_record(line, mode)?);
    }
    Ok(meals)
}

/// Parse the store's own file format. Every row needs an id and a timestamp.
pub fn parse_meals_csv<R: Read>(reader: R) -> Result<Vec<MealRecord>> {
    parse_rows(reader, ReadMode::Strict)
}

/// Parse a CSV file for import, including exports that use the older column
/// names. Rows without an id or timestamp get a fresh id and the current time.
pub fn parse_import_csv<R: Read>(reader: R) -> Result<Vec<MealRecord>> {
    parse_rows(reader, ReadMode::Import)
}

/// Write records with a header row, in the given order.
pub fn write_meals_csv<W: Write>(writer: W, records: &[MealRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for record in records {
        wtr.serialize(CsvRow::from_record(record))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Flat-file storage: the whole file is read on every load and rewritten on
/// every change.
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    /// A store backed by `path`. The file is created on the first write.
    #[must_use]
    pub fn open(path: &Path) -> Self {
        CsvStore {
            path: path.to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, records: &[MealRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("csv.tmp");
        {
            let file = File::create(&tmp)?;
            write_meals_csv(file, records)?;
        }
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), rows = records.len(), "rewrote meal file");
        Ok(())
    }
}

impl MealStore for CsvStore {
    fn load_all(&self) -> Result<Vec<MealRecord>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "meal file absent, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        parse_meals_csv(file)
    }

    fn find(&self, id: &str) -> Result<Option<MealRecord>> {
        Ok(self.load_all()?.into_iter().find(|m| m.id == id))
    }

    fn insert(&mut self, record: &MealRecord) -> Result<()> {
        let mut records = self.load_all()?;
        if records.iter().any(|m| m.id == record.id) {
            return Err(duplicate_id(&record.id));
        }
        records.push(record.clone());
        self.save(&records)
    }

    fn replace(&mut self, record: &MealRecord) -> Result<bool> {
        let mut records = self.load_all()?;
        let Some(slot) = records.iter_mut().find(|m| m.id == record.id) else {
            return Ok(false);
        };
        *slot = record.clone();
        self.save(&records)?;
        Ok(true)
    }

    fn remove(&mut self, id: &str) -> Result<Option<MealRecord>> {
        let mut records = self.load_all()?;
        let Some(pos) = records.iter().position(|m| m.id == id) else {
            return Ok(None);
        };
        let removed = records.remove(pos);
        self.save(&records)?;
        Ok(Some(removed))
    }
}
