use anyhow::Result;
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use potluck_core::MealRepository;
use potluck_core::feed::FeedSummary;
use potluck_core::models::MealRecord;

/// Fetch a meal, or report it missing and exit with status 2.
pub(crate) fn find_or_exit(repo: &MealRepository, id: &str, json: bool) -> Result<MealRecord> {
    match repo.get_by_id(id) {
        Ok(meal) => Ok(meal),
        Err(e) if e.is_not_found() => exit_not_found(id, json),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn exit_not_found(id: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(&format!("Meal {id} not found")));
    } else {
        eprintln!("Meal {id} not found");
    }
    process::exit(2);
}

pub(crate) fn print_meal_table(meals: &[MealRecord]) {
    #[derive(Tabled)]
    struct MealRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Kcal")]
        calories: String,
        #[tabled(rename = "P")]
        protein: String,
        #[tabled(rename = "C")]
        carbs: String,
        #[tabled(rename = "F")]
        fat: String,
        #[tabled(rename = "Likes")]
        likes: u64,
        #[tabled(rename = "Shared")]
        created: String,
    }

    let rows: Vec<MealRow> = meals
        .iter()
        .map(|m| MealRow {
            id: short_id(&m.id).to_string(),
            name: truncate(&m.name, 32),
            category: m.category.to_string(),
            calories: format!("{:.0}", m.calories),
            protein: format!("{:.1}", m.protein_g),
            carbs: format!("{:.1}", m.carbs_g),
            fat: format!("{:.1}", m.fat_g),
            likes: m.likes,
            created: m.created_at.format("%Y-%m-%d").to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..8)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_summary(summary: &FeedSummary) {
    println!(
        "{} recipes, {} likes, {} comments, {} saves",
        summary.count, summary.total_likes, summary.total_comments, summary.total_saves
    );
    println!(
        "Average: {:.0} kcal | P {:.1}g | C {:.1}g | F {:.1}g",
        summary.avg_calories, summary.avg_protein_g, summary.avg_carbs_g, summary.avg_fat_g
    );
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Leading segment of a UUID, enough to tell meals apart in a table.
pub(crate) fn short_id(id: &str) -> &str {
    id.split('-').next().unwrap_or(id)
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Pancakes", 10), "Pancakes");
        assert_eq!(truncate("Slow-cooked beef ragu", 10), "Slow-co...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème brûlée tart", 10), "Crème b...");
        assert_eq!(truncate("Müsli", 10), "Müsli");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("1b4e28ba-2fa1-11d2-883f-0016d3cca427"), "1b4e28ba");
        assert_eq!(short_id("legacy"), "legacy");
    }

    #[test]
    fn test_json_error_escapes() {
        assert_eq!(json_error("bad \"id\""), r#"{"error":"bad \"id\""}"#);
    }
}
