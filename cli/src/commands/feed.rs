use anyhow::Result;

use potluck_core::MealRepository;
use potluck_core::feed::{CategoryFilter, SortKey, query, similar};
use potluck_core::models::MealRecord;

use super::helpers::{find_or_exit, print_meal_table};

/// How many related recipes the detail view lists.
const SIMILAR_LIMIT: usize = 3;

pub(crate) fn cmd_feed(
    repo: &MealRepository,
    search: &str,
    category: CategoryFilter,
    sort: SortKey,
    limit: usize,
    json: bool,
) -> Result<()> {
    let snapshot = repo.snapshot();
    if let Some(e) = &snapshot.error {
        eprintln!("Warning: could not read meals: {e}");
    }
    let feed = query(&snapshot.records, search, category, sort, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&feed)?);
    } else if feed.is_empty() {
        println!("No meals found.");
    } else {
        println!("{category} · {sort}");
        print_meal_table(&feed);
    }
    Ok(())
}

pub(crate) fn cmd_show(repo: &MealRepository, id: &str, json: bool) -> Result<()> {
    let meal = find_or_exit(repo, id, json)?;
    let related = similar(&repo.get_all()?, &meal, SIMILAR_LIMIT);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "meal": meal,
                "image": meal.image().display(),
                "similar": related,
            }))?
        );
        return Ok(());
    }

    print_detail(&meal);
    if !related.is_empty() {
        println!("\nSimilar recipes:");
        print_meal_table(&related);
    }
    Ok(())
}

fn print_detail(meal: &MealRecord) {
    println!("{} ({})", meal.name, meal.category);
    println!("ID: {}", meal.id);
    if let Some(owner) = &meal.owner_user_id {
        println!("Shared by {owner} on {}", meal.created_at.format("%Y-%m-%d %H:%M"));
    }
    if !meal.description.is_empty() {
        println!("\n{}", meal.description);
    }
    println!("\nImage: {}", meal.image().display());
    if let Some(url) = &meal.recipe_url {
        println!("Recipe: {url}");
    }
    if !meal.tags.is_empty() {
        println!("Tags: {}", meal.tags.join(", "));
    }

    println!(
        "\nNutrition: {:.0} kcal | P {:.1}g | C {:.1}g | F {:.1}g",
        meal.calories, meal.protein_g, meal.carbs_g, meal.fat_g
    );
    println!(
        "  Fiber {:.1}g | Sugar {:.1}g | Sodium {:.0}mg | Cholesterol {:.0}mg | Sat. fat {:.1}g | Trans fat {:.1}g",
        meal.fiber_g,
        meal.sugar_g,
        meal.sodium_mg,
        meal.cholesterol_mg,
        meal.saturated_fat_g,
        meal.trans_fat_g
    );

    if !meal.ingredients.is_empty() {
        println!("\nIngredients:");
        for item in &meal.ingredients {
            println!("  - {item}");
        }
    }
    if !meal.instructions.is_empty() {
        println!("\nInstructions:");
        for (n, step) in meal.numbered_instructions() {
            println!("  {n}. {step}");
        }
    }
    println!(
        "\n{} likes · {} comments · {} saves",
        meal.likes, meal.comments, meal.saved_count
    );
}
