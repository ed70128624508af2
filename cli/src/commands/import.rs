use std::path::Path;

use anyhow::{Context, Result};

use potluck_core::MealRepository;
use potluck_core::csv_store::parse_import_csv;
use potluck_core::models::{EXPORT_VERSION, ExportData, MealRecord};

/// Read meals from a JSON export or a CSV file (current or older column names).
fn read_import_file(path: &Path) -> Result<Vec<MealRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let data: ExportData = serde_json::from_reader(file)
            .with_context(|| format!("Failed to parse export: {}", path.display()))?;
        if data.version > EXPORT_VERSION {
            tracing::warn!(version = data.version, "export is newer than this version of potluck");
        }
        Ok(data.meals)
    } else {
        parse_import_csv(file).with_context(|| format!("Failed to parse CSV: {}", path.display()))
    }
}

pub(crate) fn cmd_import(repo: &mut MealRepository, path: &Path, json: bool) -> Result<()> {
    let records = read_import_file(path)?;

    if records.is_empty() {
        if json {
            println!(
                "{}",
                serde_json::json!({ "error": "No meals found in file" })
            );
        } else {
            eprintln!("No meals found in file.");
        }
        return Ok(());
    }

    let summary = repo.import_records(records)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Import complete.\n");
        println!("  Imported:         {}", summary.imported);
        println!("  Already present:  {}", summary.skipped_existing);
    }
    Ok(())
}

pub(crate) fn cmd_export(repo: &MealRepository) -> Result<()> {
    let data = repo.export()?;
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use potluck_core::models::{Category, NewMeal};

    #[test]
    fn test_read_json_export() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = MealRepository::in_memory().unwrap();
        repo.create(NewMeal {
            protein_g: 20.0,
            ..NewMeal::new("Tofu Scramble", Category::Breakfast)
        })
        .unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, serde_json::to_string(&repo.export().unwrap()).unwrap()).unwrap();

        let meals = read_import_file(&path).unwrap();
        assert_eq!(meals, repo.get_all().unwrap());
    }

    #[test]
    fn test_read_legacy_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meals.csv");
        std::fs::write(
            &path,
            "meal_name,meal_category,protein,carbs,fat\nGreek Salad,Lunch,8,12,15\n",
        )
        .unwrap();

        let meals = read_import_file(&path).unwrap();
        assert_eq!(meals.len(), 1);
        assert_eq!(meals[0].name, "Greek Salad");

        let mut repo = MealRepository::in_memory().unwrap();
        let summary = repo.import_records(meals.clone()).unwrap();
        assert_eq!(summary.imported, 1);
        // Importing the same records again adds nothing.
        let summary = repo.import_records(meals).unwrap();
        assert_eq!(summary.skipped_existing, 1);
    }

    #[test]
    fn test_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_import_file(&dir.path().join("nope.csv")).is_err());
    }
}
