use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MealError, Result};
use crate::image::ImageRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Breakfast,
    Lunch,
    Dinner,
    Snacks,
    Desserts,
}

pub const CATEGORIES: &[Category] = &[
    Category::Breakfast,
    Category::Lunch,
    Category::Dinner,
    Category::Snacks,
    Category::Desserts,
];

impl Category {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Dinner => "Dinner",
            Self::Snacks => "Snacks",
            Self::Desserts => "Desserts",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category names are matched exactly; "breakfast" is not a category.
impl FromStr for Category {
    type Err = MealError;

    fn from_str(s: &str) -> Result<Self> {
        CATEGORIES
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = CATEGORIES.iter().map(|c| c.as_str()).collect();
                MealError::validation(format!(
                    "Invalid category '{s}'. Must be one of: {}",
                    names.join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    pub id: String,
    pub owner_user_id: Option<String>,
    pub name: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub description: String,
    pub recipe_url: Option<String>,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub calories: f64,
    #[serde(default)]
    pub fiber_g: f64,
    #[serde(default)]
    pub sugar_g: f64,
    #[serde(default)]
    pub sodium_mg: f64,
    #[serde(default)]
    pub cholesterol_mg: f64,
    #[serde(default)]
    pub saturated_fat_g: f64,
    #[serde(default)]
    pub trans_fat_g: f64,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub image_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub saved_count: u64,
}

/// A meal as submitted or edited: everything but `id` and `created_at`.
///
/// `calories: None` means "derive from the macros". Counters are carried so
/// an edit of an existing record can hand them back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeal {
    pub owner_user_id: Option<String>,
    pub name: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub description: String,
    pub recipe_url: Option<String>,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub calories: Option<f64>,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
    pub cholesterol_mg: f64,
    pub saturated_fat_g: f64,
    pub trans_fat_g: f64,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub image_reference: Option<String>,
    pub likes: u64,
    pub comments: u64,
    pub saved_count: u64,
}

impl NewMeal {
    #[must_use]
    pub fn new(name: &str, category: Category) -> Self {
        Self {
            owner_user_id: None,
            name: name.to_string(),
            category,
            tags: Vec::new(),
            description: String::new(),
            recipe_url: None,
            protein_g: 0.0,
            carbs_g: 0.0,
            fat_g: 0.0,
            calories: None,
            fiber_g: 0.0,
            sugar_g: 0.0,
            sodium_mg: 0.0,
            cholesterol_mg: 0.0,
            saturated_fat_g: 0.0,
            trans_fat_g: 0.0,
            ingredients: Vec::new(),
            instructions: Vec::new(),
            image_reference: None,
            likes: 0,
            comments: 0,
            saved_count: 0,
        }
    }

    /// Trim text fields, drop blank list entries, and turn empty optional
    /// strings into `None`.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.description = self.description.trim().to_string();
        self.owner_user_id = non_blank(self.owner_user_id);
        self.recipe_url = non_blank(self.recipe_url);
        self.image_reference = non_blank(self.image_reference);
        self.tags = clean_entries(self.tags);
        self.ingredients = clean_entries(self.ingredients);
        self.instructions = clean_entries(self.instructions);
        self
    }

    /// Calories as they will be stored: the explicit value, or the macro formula.
    #[must_use]
    pub fn resolved_calories(&self) -> f64 {
        self.calories
            .unwrap_or_else(|| calories_from_macros(self.protein_g, self.carbs_g, self.fat_g))
    }

    #[must_use]
    pub fn into_record(self, id: String, created_at: DateTime<Utc>) -> MealRecord {
        let calories = self.resolved_calories();
        MealRecord {
            id,
            owner_user_id: self.owner_user_id,
            name: self.name,
            category: self.category,
            tags: self.tags,
            description: self.description,
            recipe_url: self.recipe_url,
            protein_g: self.protein_g,
            carbs_g: self.carbs_g,
            fat_g: self.fat_g,
            calories,
            fiber_g: self.fiber_g,
            sugar_g: self.sugar_g,
            sodium_mg: self.sodium_mg,
            cholesterol_mg: self.cholesterol_mg,
            saturated_fat_g: self.saturated_fat_g,
            trans_fat_g: self.trans_fat_g,
            ingredients: self.ingredients,
            instructions: self.instructions,
            image_reference: self.image_reference,
            created_at,
            likes: self.likes,
            comments: self.comments,
            saved_count: self.saved_count,
        }
    }
}

impl MealRecord {
    /// The editable part of this record, with calories pinned to the stored value.
    #[must_use]
    pub fn to_new_meal(&self) -> NewMeal {
        NewMeal {
            owner_user_id: self.owner_user_id.clone(),
            name: self.name.clone(),
            category: self.category,
            tags: self.tags.clone(),
            description: self.description.clone(),
            recipe_url: self.recipe_url.clone(),
            protein_g: self.protein_g,
            carbs_g: self.carbs_g,
            fat_g: self.fat_g,
            calories: Some(self.calories),
            fiber_g: self.fiber_g,
            sugar_g: self.sugar_g,
            sodium_mg: self.sodium_mg,
            cholesterol_mg: self.cholesterol_mg,
            saturated_fat_g: self.saturated_fat_g,
            trans_fat_g: self.trans_fat_g,
            ingredients: self.ingredients.clone(),
            instructions: self.instructions.clone(),
            image_reference: self.image_reference.clone(),
            likes: self.likes,
            comments: self.comments,
            saved_count: self.saved_count,
        }
    }

    /// Whether the stored calories agree with the macro formula. Callers may
    /// override calories, so a mismatch is allowed and only reported.
    #[must_use]
    pub fn calories_match_macros(&self) -> bool {
        let expected = calories_from_macros(self.protein_g, self.carbs_g, self.fat_g);
        (self.calories - expected).abs() < 0.5
    }

    #[must_use]
    pub fn image(&self) -> ImageRef {
        ImageRef::from_reference(self.image_reference.as_deref())
    }

    /// Instructions paired with their 1-based step number.
    pub fn numbered_instructions(&self) -> impl Iterator<Item = (usize, &str)> {
        self.instructions
            .iter()
            .enumerate()
            .map(|(i, step)| (i + 1, step.as_str()))
    }

    #[must_use]
    pub fn counter(&self, counter: Counter) -> u64 {
        match counter {
            Counter::Likes => self.likes,
            Counter::Comments => self.comments,
            Counter::Saved => self.saved_count,
        }
    }

    pub(crate) fn counter_mut(&mut self, counter: Counter) -> &mut u64 {
        match counter {
            Counter::Likes => &mut self.likes,
            Counter::Comments => &mut self.comments,
            Counter::Saved => &mut self.saved_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Likes,
    Comments,
    Saved,
}

/// 4 kcal per gram of protein and carbohydrate, 9 per gram of fat.
#[must_use]
pub fn calories_from_macros(protein_g: f64, carbs_g: f64, fat_g: f64) -> f64 {
    protein_g * 4.0 + carbs_g * 4.0 + fat_g * 9.0
}

// --- Wire encoding of list fields ---

#[must_use]
pub fn join_lines(lines: &[String]) -> String {
    lines.join("\n")
}

#[must_use]
pub fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

#[must_use]
pub fn join_tags(tags: &[String]) -> String {
    tags.join(",")
}

#[must_use]
pub fn split_tags(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_entries(entries: Vec<String>) -> Vec<String> {
    entries
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect()
}

// --- Timestamps ---

#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse an RFC 3339 timestamp, or the `YYYY-MM-DD HH:MM:SS` form older
/// flat files used (read as UTC).
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

// --- Validation ---

/// Checks a normalized meal against the record invariants.
/// Largest counter value every medium can hold (SQLite integers are signed).
pub const MAX_COUNTER: u64 = i64::MAX.unsigned_abs();

pub fn validate_new_meal(meal: &NewMeal) -> Result<()> {
    if meal.name.trim().is_empty() {
        return Err(MealError::validation("Meal name must not be empty"));
    }
    let amounts = [
        ("protein_g", meal.protein_g),
        ("carbs_g", meal.carbs_g),
        ("fat_g", meal.fat_g),
        ("fiber_g", meal.fiber_g),
        ("sugar_g", meal.sugar_g),
        ("sodium_mg", meal.sodium_mg),
        ("cholesterol_mg", meal.cholesterol_mg),
        ("saturated_fat_g", meal.saturated_fat_g),
        ("trans_fat_g", meal.trans_fat_g),
    ];
    for (field, value) in amounts {
        check_amount(field, value)?;
    }
    if let Some(calories) = meal.calories {
        check_amount("calories", calories)?;
    }
    for (field, value) in [
        ("likes", meal.likes),
        ("comments", meal.comments),
        ("saved_count", meal.saved_count),
    ] {
        if value > MAX_COUNTER {
            return Err(MealError::validation(format!(
                "{field} must be at most {MAX_COUNTER}"
            )));
        }
    }
    if meal.tags.iter().any(|t| t.contains(',')) {
        return Err(MealError::validation("Tags must not contain commas"));
    }
    if meal.ingredients.iter().any(|i| i.contains('\n')) {
        return Err(MealError::validation(
            "Each ingredient must be a single line",
        ));
    }
    if meal.instructions.iter().any(|i| i.contains('\n')) {
        return Err(MealError::validation(
            "Each instruction step must be a single line",
        ));
    }
    Ok(())
}

/// The share form's stricter rules: a submission also needs a description,
/// ingredients, and instructions.
pub fn validate_submission(meal: &NewMeal) -> Result<()> {
    validate_new_meal(meal)?;
    if meal.description.trim().is_empty() {
        return Err(MealError::validation("Please enter a meal description"));
    }
    if meal.ingredients.is_empty() {
        return Err(MealError::validation("Please enter ingredients"));
    }
    if meal.instructions.is_empty() {
        return Err(MealError::validation("Please enter instructions"));
    }
    Ok(())
}

fn check_amount(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(MealError::validation(format!("{field} must be a number")));
    }
    if value < 0.0 {
        return Err(MealError::validation(format!(
            "{field} must not be negative"
        )));
    }
    Ok(())
}

// --- Export / Import types ---

pub const EXPORT_VERSION: i64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub version: i64,
    pub exported_at: String,
    pub meals: Vec<MealRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped_existing: usize,
}
