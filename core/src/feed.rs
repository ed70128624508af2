//! Feed queries: pure functions over a slice of records.
//!
//! Nothing here touches storage, so the same snapshot always yields the same
//! feed.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{MealError, Result};
use crate::models::{Category, MealRecord, join_lines, join_tags};

/// Feed ordering. Every sort is stable: ties keep their input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    HighestProtein,
    LowestCalories,
    /// Ranked by likes.
    MostPopular,
}

pub const SORT_KEYS: &[SortKey] = &[
    SortKey::Newest,
    SortKey::Oldest,
    SortKey::MostPopular,
    SortKey::HighestProtein,
    SortKey::LowestCalories,
];

impl SortKey {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Newest => "Newest First",
            Self::Oldest => "Oldest First",
            Self::HighestProtein => "Highest Protein",
            Self::LowestCalories => "Lowest Calories",
            Self::MostPopular => "Most Popular",
        }
    }

    fn compare(self, a: &MealRecord, b: &MealRecord) -> Ordering {
        match self {
            Self::Newest => b.created_at.cmp(&a.created_at),
            Self::Oldest => a.created_at.cmp(&b.created_at),
            Self::HighestProtein => b.protein_g.total_cmp(&a.protein_g),
            Self::LowestCalories => a.calories.total_cmp(&b.calories),
            Self::MostPopular => b.likes.cmp(&a.likes),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts the display labels ("Most Popular", "Newest First") and their
/// kebab-case forms ("most-popular", "newest").
impl FromStr for SortKey {
    type Err = MealError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase().replace([' ', '_'], "-");
        match key.as_str() {
            "newest" | "newest-first" => Ok(Self::Newest),
            "oldest" | "oldest-first" => Ok(Self::Oldest),
            "highest-protein" | "protein" => Ok(Self::HighestProtein),
            "lowest-calories" | "calories" => Ok(Self::LowestCalories),
            "most-popular" | "popular" => Ok(Self::MostPopular),
            _ => Err(MealError::validation(format!(
                "Unknown sort '{s}'. Must be one of: newest, oldest, most-popular, highest-protein, lowest-calories"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    #[must_use]
    pub fn matches(self, record: &MealRecord) -> bool {
        match self {
            Self::All => true,
            Self::Only(category) => record.category == category,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Only(category) => write!(f, "{category}"),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = MealError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "All" => Ok(Self::All),
            other => other.parse().map(Self::Only),
        }
    }
}

/// True when `needle` (already lowercased) appears in the name, description,
/// ingredients, or tags.
fn matches_search(record: &MealRecord, needle: &str) -> bool {
    let fields = [
        record.name.to_lowercase(),
        record.description.to_lowercase(),
        join_lines(&record.ingredients).to_lowercase(),
        join_tags(&record.tags).to_lowercase(),
    ];
    fields.iter().any(|field| field.contains(needle))
}

/// Filter, sort, and truncate a feed.
///
/// `search` is trimmed; blank text matches everything. Matching is
/// case-insensitive.
#[must_use]
pub fn query(
    records: &[MealRecord],
    search: &str,
    category: CategoryFilter,
    sort: SortKey,
    limit: usize,
) -> Vec<MealRecord> {
    let needle = search.trim().to_lowercase();
    let mut feed: Vec<MealRecord> = records
        .iter()
        .filter(|m| category.matches(m))
        .filter(|m| needle.is_empty() || matches_search(m, &needle))
        .cloned()
        .collect();
    feed.sort_by(|a, b| sort.compare(a, b));
    feed.truncate(limit);
    feed
}

/// Other meals worth showing next to `target`: the same category, or tags
/// containing the target's first tag. Newest first.
#[must_use]
pub fn similar(records: &[MealRecord], target: &MealRecord, limit: usize) -> Vec<MealRecord> {
    let first_tag = target.tags.first().map(|t| t.to_lowercase());
    let related = |m: &MealRecord| {
        m.category == target.category
            || first_tag
                .as_deref()
                .is_some_and(|tag| join_tags(&m.tags).to_lowercase().contains(tag))
    };
    let mut out: Vec<MealRecord> = records
        .iter()
        .filter(|m| m.id != target.id && related(m))
        .cloned()
        .collect();
    out.sort_by(|a, b| SortKey::Newest.compare(a, b));
    out.truncate(limit);
    out
}

/// Totals and averages over a set of meals, as the profile page shows them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedSummary {
    pub count: usize,
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_saves: u64,
    pub avg_calories: f64,
    pub avg_protein_g: f64,
    pub avg_carbs_g: f64,
    pub avg_fat_g: f64,
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(records: &[MealRecord]) -> FeedSummary {
    if records.is_empty() {
        return FeedSummary::default();
    }
    let n = records.len() as f64;
    let mean = |f: fn(&MealRecord) -> f64| records.iter().map(f).sum::<f64>() / n;
    let total = |f: fn(&MealRecord) -> u64| {
        records
            .iter()
            .map(f)
            .fold(0u64, |acc, count| acc.saturating_add(count))
    };
    FeedSummary {
        count: records.len(),
        total_likes: total(|m| m.likes),
        total_comments: total(|m| m.comments),
        total_saves: total(|m| m.saved_count),
        avg_calories: mean(|m| m.calories),
        avg_protein_g: mean(|m| m.protein_g),
        avg_carbs_g: mean(|m| m.carbs_g),
        avg_fat_g: mean(|m| m.fat_g),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewMeal;
    use chrono::{Duration, TimeZone, Utc};

    fn meal(id: &str, name: &str, category: Category, protein: f64, hours_ago: i64) -> MealRecord {
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        NewMeal {
            protein_g: protein,
            carbs_g: 20.0,
            fat_g: 5.0,
            ..NewMeal::new(name, category)
        }
        .into_record(id.into(), base - Duration::hours(hours_ago))
    }

    fn fixture() -> Vec<MealRecord> {
        let mut chicken = meal("1", "Chicken Caesar", Category::Lunch, 40.0, 5);
        chicken.tags = vec!["high-protein".into()];
        let mut oats = meal("2", "Overnight Oats", Category::Breakfast, 15.0, 1);
        oats.description = "Creamy oats with berries".into();
        oats.likes = 9;
        let mut curry = meal("3", "Veggie Curry", Category::Dinner, 18.0, 3);
        curry.ingredients = vec!["1 can chickpeas".into(), "2 tbsp curry paste".into()];
        curry.likes = 2;
        let mut wrap = meal("4", "Turkey Wrap", Category::Lunch, 40.0, 2);
        wrap.tags = vec!["High-Protein".into(), "quick".into()];
        wrap.likes = 9;
        vec![chicken, oats, curry, wrap]
    }

    fn ids(feed: &[MealRecord]) -> Vec<&str> {
        feed.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_newest_and_oldest() {
        let records = fixture();
        let feed = query(&records, "", CategoryFilter::All, SortKey::Newest, 10);
        assert_eq!(ids(&feed), vec!["2", "4", "3", "1"]);
        let feed = query(&records, "", CategoryFilter::All, SortKey::Oldest, 10);
        assert_eq!(ids(&feed), vec!["1", "3", "4", "2"]);
    }

    #[test]
    fn test_limit_truncates() {
        let records = fixture();
        assert_eq!(query(&records, "", CategoryFilter::All, SortKey::Newest, 2).len(), 2);
        assert!(query(&records, "", CategoryFilter::All, SortKey::Newest, 0).is_empty());
        assert!(query(&[], "x", CategoryFilter::All, SortKey::Newest, 5).is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let records = fixture();
        // name
        let feed = query(&records, "CHICKEN", CategoryFilter::All, SortKey::Oldest, 10);
        assert_eq!(ids(&feed), vec!["1"]);
        // ingredients
        let feed = query(&records, "Chick", CategoryFilter::All, SortKey::Oldest, 10);
        assert_eq!(ids(&feed), vec!["1", "3"]);
        // description
        let feed = query(&records, "berries", CategoryFilter::All, SortKey::Newest, 10);
        assert_eq!(ids(&feed), vec!["2"]);
        // tags
        let feed = query(&records, "high-protein", CategoryFilter::All, SortKey::Oldest, 10);
        assert_eq!(ids(&feed), vec!["1", "4"]);
    }

    #[test]
    fn test_blank_search_keeps_all() {
        let records = fixture();
        let feed = query(&records, "   ", CategoryFilter::All, SortKey::Newest, 10);
        assert_eq!(feed.len(), records.len());
    }

    #[test]
    fn test_category_with_highest_protein_is_stable() {
        let records = fixture();
        let lunch = CategoryFilter::Only(Category::Lunch);
        let feed = query(&records, "", lunch, SortKey::HighestProtein, 10);
        // Both lunches have 40g protein; input order decides.
        assert_eq!(ids(&feed), vec!["1", "4"]);
        assert!(feed.iter().all(|m| m.category == Category::Lunch));
    }

    #[test]
    fn test_lowest_calories() {
        let records = fixture();
        let feed = query(&records, "", CategoryFilter::All, SortKey::LowestCalories, 10);
        assert!(feed.windows(2).all(|w| w[0].calories <= w[1].calories));
        assert_eq!(feed[0].id, "2");
    }

    #[test]
    fn test_most_popular_ranks_by_likes() {
        let records = fixture();
        let feed = query(&records, "", CategoryFilter::All, SortKey::MostPopular, 10);
        assert_eq!(ids(&feed), vec!["2", "4", "3", "1"]);
    }

    #[test]
    fn test_query_is_deterministic() {
        let records = fixture();
        let a = query(&records, "o", CategoryFilter::All, SortKey::MostPopular, 3);
        let b = query(&records, "o", CategoryFilter::All, SortKey::MostPopular, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("Newest First".parse::<SortKey>().unwrap(), SortKey::Newest);
        assert_eq!("most-popular".parse::<SortKey>().unwrap(), SortKey::MostPopular);
        assert_eq!("Most Popular".parse::<SortKey>().unwrap(), SortKey::MostPopular);
        assert_eq!("lowest_calories".parse::<SortKey>().unwrap(), SortKey::LowestCalories);
        assert_eq!("Oldest".parse::<SortKey>().unwrap(), SortKey::Oldest);
        assert!("random".parse::<SortKey>().is_err());
        for key in SORT_KEYS {
            assert_eq!(key.label().parse::<SortKey>().unwrap(), *key);
        }
    }

    #[test]
    fn test_category_filter_parse() {
        assert_eq!("All".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "Desserts".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Only(Category::Desserts)
        );
        assert!("desserts".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn test_similar() {
        let records = fixture();
        let chicken = &records[0];
        // Turkey Wrap: same category. Nothing else shares "high-protein".
        let related = similar(&records, chicken, 3);
        assert_eq!(ids(&related), vec!["4"]);

        let mut snack = meal("5", "Protein Balls", Category::Snacks, 10.0, 0);
        snack.tags = vec!["high-protein".into()];
        let related = similar(&records, &snack, 3);
        assert_eq!(ids(&related), vec!["4", "1"]);

        let related = similar(&records, &records[2], 3);
        assert!(related.is_empty());
    }

    #[test]
    fn test_summarize() {
        let records = fixture();
        let summary = summarize(&records);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.total_likes, 20);
        // (40 + 15 + 18 + 40) / 4
        assert!((summary.avg_protein_g - 28.25).abs() < 1e-9);
        assert!((summary.avg_carbs_g - 20.0).abs() < 1e-9);
        assert_eq!(summarize(&[]), FeedSummary::default());
    }

    #[test]
    fn test_summarize_totals_saturate() {
        let mut records = fixture();
        records[0].likes = u64::MAX;
        records[1].saved_count = u64::MAX;
        records[2].saved_count = 7;
        let summary = summarize(&records);
        assert_eq!(summary.total_likes, u64::MAX);
        assert_eq!(summary.total_saves, u64::MAX);
    }
}
