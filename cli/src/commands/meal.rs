use anyhow::{Context, Result, bail};
use clap::Args;

use potluck_core::MealRepository;
use potluck_core::models::{Category, Counter, MealRecord, NewMeal, validate_submission};
use potluck_core::session::Session;

use super::helpers::{exit_not_found, find_or_exit};

/// Recipe fields shared by `submit` and `edit`. On edit, only the flags
/// given replace the stored values; list flags replace the whole list.
#[derive(Args, Debug, Default)]
pub(crate) struct MealFields {
    /// Breakfast, Lunch, Dinner, Snacks, or Desserts
    #[arg(short, long)]
    pub category: Option<Category>,
    /// Tag (repeat for several)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Short description
    #[arg(short, long)]
    pub description: Option<String>,
    /// Link to the full recipe
    #[arg(long)]
    pub recipe_url: Option<String>,
    /// Protein in grams
    #[arg(long)]
    pub protein: Option<f64>,
    /// Carbohydrates in grams
    #[arg(long)]
    pub carbs: Option<f64>,
    /// Fat in grams
    #[arg(long)]
    pub fat: Option<f64>,
    /// Calories (default: 4 kcal/g protein and carbs, 9 kcal/g fat)
    #[arg(long)]
    pub calories: Option<f64>,
    /// Fiber in grams
    #[arg(long)]
    pub fiber: Option<f64>,
    /// Sugar in grams
    #[arg(long)]
    pub sugar: Option<f64>,
    /// Sodium in milligrams
    #[arg(long)]
    pub sodium: Option<f64>,
    /// Cholesterol in milligrams
    #[arg(long)]
    pub cholesterol: Option<f64>,
    /// Saturated fat in grams
    #[arg(long)]
    pub saturated_fat: Option<f64>,
    /// Trans fat in grams
    #[arg(long)]
    pub trans_fat: Option<f64>,
    /// Ingredient line (repeat, in order)
    #[arg(long = "ingredient")]
    pub ingredients: Vec<String>,
    /// Instruction step (repeat, in order)
    #[arg(long = "step")]
    pub steps: Vec<String>,
    /// Image URL or path relative to the data directory
    #[arg(long)]
    pub image: Option<String>,
}

impl MealFields {
    fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.tags.is_empty()
            && self.description.is_none()
            && self.recipe_url.is_none()
            && self.protein.is_none()
            && self.carbs.is_none()
            && self.fat.is_none()
            && self.calories.is_none()
            && self.fiber.is_none()
            && self.sugar.is_none()
            && self.sodium.is_none()
            && self.cholesterol.is_none()
            && self.saturated_fat.is_none()
            && self.trans_fat.is_none()
            && self.ingredients.is_empty()
            && self.steps.is_empty()
            && self.image.is_none()
    }

    /// Overwrite the fields that were given. Changing a macro without
    /// `--calories` re-derives calories from the macros.
    fn apply(self, meal: &mut NewMeal) {
        let macros_changed = self.protein.is_some() || self.carbs.is_some() || self.fat.is_some();
        if let Some(category) = self.category {
            meal.category = category;
        }
        if !self.tags.is_empty() {
            meal.tags = self.tags;
        }
        if let Some(description) = self.description {
            meal.description = description;
        }
        if self.recipe_url.is_some() {
            meal.recipe_url = self.recipe_url;
        }
        if let Some(v) = self.protein {
            meal.protein_g = v;
        }
        if let Some(v) = self.carbs {
            meal.carbs_g = v;
        }
        if let Some(v) = self.fat {
            meal.fat_g = v;
        }
        if self.calories.is_some() {
            meal.calories = self.calories;
        } else if macros_changed {
            meal.calories = None;
        }
        if let Some(v) = self.fiber {
            meal.fiber_g = v;
        }
        if let Some(v) = self.sugar {
            meal.sugar_g = v;
        }
        if let Some(v) = self.sodium {
            meal.sodium_mg = v;
        }
        if let Some(v) = self.cholesterol {
            meal.cholesterol_mg = v;
        }
        if let Some(v) = self.saturated_fat {
            meal.saturated_fat_g = v;
        }
        if let Some(v) = self.trans_fat {
            meal.trans_fat_g = v;
        }
        if !self.ingredients.is_empty() {
            meal.ingredients = self.ingredients;
        }
        if !self.steps.is_empty() {
            meal.instructions = self.steps;
        }
        if self.image.is_some() {
            meal.image_reference = self.image;
        }
    }
}

/// Build a fresh submission. Category and macros are required.
fn build_submission(name: &str, owner: &str, fields: MealFields) -> Result<NewMeal> {
    let category = fields
        .category
        .context("--category is required (Breakfast, Lunch, Dinner, Snacks, Desserts)")?;
    for (flag, value) in [
        ("--protein", fields.protein),
        ("--carbs", fields.carbs),
        ("--fat", fields.fat),
    ] {
        if value.is_none() {
            bail!("{flag} is required");
        }
    }
    let mut meal = NewMeal {
        owner_user_id: Some(owner.to_string()),
        ..NewMeal::new(name, category)
    };
    fields.apply(&mut meal);
    Ok(meal.normalize())
}

fn print_record(meal: &MealRecord, verb: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(meal)?);
    } else {
        println!(
            "{verb} '{}' ({}): {:.0} kcal, P {:.1}g C {:.1}g F {:.1}g",
            meal.name, meal.id, meal.calories, meal.protein_g, meal.carbs_g, meal.fat_g
        );
        if !meal.calories_match_macros() {
            println!("Note: calories were set by hand and differ from the macro total");
        }
    }
    Ok(())
}

pub(crate) fn cmd_submit(
    repo: &mut MealRepository,
    session: &Session,
    name: &str,
    fields: MealFields,
    json: bool,
) -> Result<()> {
    let owner = session.require_user("share a recipe")?;
    let meal = build_submission(name, owner, fields)?;
    validate_submission(&meal)?;
    let id = repo.create(meal)?;
    let stored = repo.get_by_id(&id)?;
    print_record(&stored, "Shared", json)
}

fn ensure_owner(session: &Session, meal: &MealRecord, action: &str) -> Result<()> {
    if !session.owns(meal) {
        bail!("You can only {action} your own recipes");
    }
    Ok(())
}

pub(crate) fn cmd_edit(
    repo: &mut MealRepository,
    session: &Session,
    id: &str,
    name: Option<String>,
    fields: MealFields,
    json: bool,
) -> Result<()> {
    session.require_user("edit recipes")?;
    if name.is_none() && fields.is_empty() {
        bail!("Nothing to update. Provide at least one field flag such as --name or --protein");
    }
    let existing = find_or_exit(repo, id, json)?;
    ensure_owner(session, &existing, "edit")?;

    let mut meal = existing.to_new_meal();
    if let Some(name) = name {
        meal.name = name;
    }
    fields.apply(&mut meal);

    match repo.update(id, meal) {
        Ok(updated) => print_record(&updated, "Updated", json),
        Err(e) if e.is_not_found() => exit_not_found(id, json),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn cmd_delete(
    repo: &mut MealRepository,
    session: &Session,
    id: &str,
    json: bool,
) -> Result<()> {
    session.require_user("delete recipes")?;
    let existing = find_or_exit(repo, id, json)?;
    ensure_owner(session, &existing, "delete")?;

    let removed = match repo.delete(id) {
        Ok(removed) => removed,
        Err(e) if e.is_not_found() => exit_not_found(id, json),
        Err(e) => return Err(e.into()),
    };
    if json {
        println!("{}", serde_json::json!({ "deleted": removed.id }));
    } else {
        println!("Deleted '{}' ({})", removed.name, removed.id);
    }
    Ok(())
}

fn bump(repo: &mut MealRepository, id: &str, counter: Counter, json: bool) -> Result<u64> {
    match repo.increment(id, counter) {
        Ok(value) => Ok(value),
        Err(e) if e.is_not_found() => exit_not_found(id, json),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn cmd_like(repo: &mut MealRepository, id: &str, json: bool) -> Result<()> {
    let likes = bump(repo, id, Counter::Likes, json)?;
    if json {
        println!("{}", serde_json::json!({ "id": id, "likes": likes }));
    } else {
        println!("Liked {id} ({likes} likes)");
    }
    Ok(())
}

pub(crate) fn cmd_save(repo: &mut MealRepository, id: &str, json: bool) -> Result<()> {
    let saves = bump(repo, id, Counter::Saved, json)?;
    if json {
        println!("{}", serde_json::json!({ "id": id, "saved_count": saves }));
    } else {
        println!("Saved {id} ({saves} saves)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission_fields() -> MealFields {
        MealFields {
            category: Some(Category::Breakfast),
            description: Some("Creamy oats".into()),
            protein: Some(12.0),
            carbs: Some(45.0),
            fat: Some(6.0),
            ingredients: vec!["1 cup oats".into(), "1 cup milk".into()],
            steps: vec!["Mix".into(), "Chill overnight".into()],
            tags: vec!["vegan".into()],
            ..MealFields::default()
        }
    }

    #[test]
    fn test_build_submission() {
        let meal = build_submission("  Overnight Oats ", "alice", submission_fields()).unwrap();
        assert_eq!(meal.name, "Overnight Oats");
        assert_eq!(meal.owner_user_id.as_deref(), Some("alice"));
        assert!(meal.calories.is_none());
        assert!(validate_submission(&meal).is_ok());
    }

    #[test]
    fn test_build_submission_requires_category_and_macros() {
        let fields = MealFields {
            category: None,
            ..submission_fields()
        };
        assert!(build_submission("Oats", "alice", fields).is_err());

        let fields = MealFields {
            fat: None,
            ..submission_fields()
        };
        let err = build_submission("Oats", "alice", fields).unwrap_err();
        assert!(err.to_string().contains("--fat"));
    }

    #[test]
    fn test_apply_keeps_unset_fields() {
        let mut meal = build_submission("Oats", "alice", submission_fields()).unwrap();
        meal.calories = Some(500.0);
        meal.likes = 3;
        MealFields {
            description: Some("Now with berries".into()),
            ..MealFields::default()
        }
        .apply(&mut meal);
        assert_eq!(meal.description, "Now with berries");
        assert_eq!(meal.calories, Some(500.0));
        assert_eq!(meal.ingredients.len(), 2);
        assert_eq!(meal.likes, 3);
    }

    #[test]
    fn test_apply_macro_change_rederives_calories() {
        let mut meal = build_submission("Oats", "alice", submission_fields()).unwrap();
        meal.calories = Some(500.0);
        MealFields {
            protein: Some(20.0),
            ..MealFields::default()
        }
        .apply(&mut meal);
        assert!(meal.calories.is_none());
    }

    #[test]
    fn test_anonymous_cannot_edit_or_delete_ownerless() {
        let mut repo = MealRepository::in_memory().unwrap();
        let id = repo
            .create(NewMeal::new("Sample Pancakes", Category::Breakfast))
            .unwrap();
        let anonymous = Session::anonymous();

        let err = cmd_delete(&mut repo, &anonymous, &id, false).unwrap_err();
        assert!(err.to_string().contains("sign in"));
        let fields = MealFields {
            description: Some("Fluffier".into()),
            ..MealFields::default()
        };
        assert!(cmd_edit(&mut repo, &anonymous, &id, None, fields, false).is_err());

        let stored = repo.get_by_id(&id).unwrap();
        assert_eq!(stored.name, "Sample Pancakes");
        assert!(stored.description.is_empty());
    }

    #[test]
    fn test_signed_in_user_may_delete_ownerless() {
        let mut repo = MealRepository::in_memory().unwrap();
        let id = repo
            .create(NewMeal::new("Sample Pancakes", Category::Breakfast))
            .unwrap();
        cmd_delete(&mut repo, &Session::signed_in("alice"), &id, false).unwrap();
        assert!(repo.get_by_id(&id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_fields_is_empty() {
        assert!(MealFields::default().is_empty());
        assert!(!submission_fields().is_empty());
    }
}
