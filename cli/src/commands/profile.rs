use anyhow::Result;

use potluck_core::MealRepository;
use potluck_core::feed::summarize;
use potluck_core::session::Session;

use super::helpers::{print_meal_table, print_summary};

pub(crate) fn cmd_mine(repo: &MealRepository, session: &Session, json: bool) -> Result<()> {
    let user = session.require_user("view your recipes")?;
    let meals = repo.owned_by(user)?;
    let summary = summarize(&meals);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "user_id": user,
                "summary": summary,
                "meals": meals,
            }))?
        );
    } else if meals.is_empty() {
        println!("You haven't shared any recipes yet.");
    } else {
        println!("Recipes shared by {user}");
        print_meal_table(&meals);
        print_summary(&summary);
    }
    Ok(())
}
