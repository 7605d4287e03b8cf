//! Reference food data: the built-in sample catalog and CSV food lists.

use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::Database;
use crate::error::Result;
use crate::models::{NewFood, NutritionFacts};

const SAMPLE_FOODS_CSV: &str = include_str!("../data/foods.csv");

/// Built-in categories and their icons.
pub const SAMPLE_CATEGORIES: &[(&str, &str)] = &[
    ("Proteins", "🥩"),
    ("Vegetables", "🥬"),
    ("Fruits", "🍎"),
    ("Grains & Starches", "🌾"),
    ("Dairy", "🥛"),
    ("Healthy Fats", "🥑"),
    ("Beverages", "💧"),
    ("Snacks", "🥜"),
];

/// One row of a food CSV. Values are per 100 g / 100 ml.
///
/// Header: `category,name,calories,protein,carbs,fats,fiber,sodium`. Only
/// `name` and `calories` are required; empty cells mean "unknown".
#[derive(Debug, Clone, Deserialize)]
pub struct FoodRecord {
    #[serde(default)]
    pub category: Option<String>,
    pub name: String,
    pub calories: i64,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default)]
    pub carbs: Option<f64>,
    #[serde(default)]
    pub fats: Option<f64>,
    #[serde(default)]
    pub fiber: Option<f64>,
    #[serde(default)]
    pub sodium: Option<f64>,
}

impl FoodRecord {
    fn nutrition(&self) -> NutritionFacts {
        NutritionFacts {
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fats: self.fats,
            fiber: self.fiber,
            sodium: self.sodium,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    pub categories_created: usize,
    pub foods_created: usize,
    pub foods_existing: usize,
}

pub fn parse_food_csv<R: Read>(reader: R) -> Result<Vec<FoodRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: FoodRecord = result?;
        if record.name.is_empty() {
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

/// Insert foods that are not in the catalog yet, matching on name.
///
/// Categories named in the records are created on demand. `custom_owner`
/// marks the new foods as custom entries of that user.
pub fn load_foods(
    db: &Database,
    records: &[FoodRecord],
    custom_owner: Option<i64>,
) -> Result<LoadSummary> {
    db.in_transaction(|db| {
        let mut summary = LoadSummary::default();
        for record in records {
            let category_id = match record.category.as_deref().filter(|c| !c.is_empty()) {
                Some(name) => {
                    let (category, created) = db.get_or_create_category(name, None)?;
                    if created {
                        summary.categories_created += 1;
                    }
                    Some(category.id)
                }
                None => None,
            };
            let (food, created) = db.get_or_create_food(&NewFood {
                name: record.name.clone(),
                category_id,
                nutrition: record.nutrition(),
                is_custom: custom_owner.is_some(),
                created_by: custom_owner,
            })?;
            if created {
                debug!(food = %food.name, "added food");
                summary.foods_created += 1;
            } else {
                summary.foods_existing += 1;
            }
        }
        Ok(summary)
    })
}

/// Load the built-in categories and reference foods. Safe to run repeatedly.
pub fn load_sample_data(db: &Database) -> Result<LoadSummary> {
    let mut categories_created = 0;
    for (name, icon) in SAMPLE_CATEGORIES {
        let (_, created) = db.get_or_create_category(name, Some(icon))?;
        if created {
            categories_created += 1;
        }
    }

    let records = parse_food_csv(SAMPLE_FOODS_CSV.as_bytes())?;
    let mut summary = load_foods(db, &records, None)?;
    summary.categories_created += categories_created;

    info!(
        categories_created = summary.categories_created,
        foods_created = summary.foods_created,
        foods_existing = summary.foods_existing,
        "sample data loaded"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_sample_csv_parses() {
        let records = parse_food_csv(SAMPLE_FOODS_CSV.as_bytes()).unwrap();
        assert!(records.len() >= 35);
        for record in &records {
            let category = record.category.as_deref().unwrap();
            assert!(
                SAMPLE_CATEGORIES.iter().any(|(name, _)| *name == category),
                "{} has unknown category {category}",
                record.name
            );
        }
    }

    #[test]
    fn test_load_sample_data() {
        let db = Database::open_in_memory().unwrap();
        let summary = load_sample_data(&db).unwrap();
        assert_eq!(summary.categories_created, SAMPLE_CATEGORIES.len());
        assert!(summary.foods_created >= 35);
        assert_eq!(summary.foods_existing, 0);

        let chicken = db
            .find_food_by_name("Chicken Breast (skinless)")
            .unwrap()
            .unwrap();
        assert_eq!(chicken.nutrition.calories, 165);
        assert_eq!(chicken.nutrition.protein, Some(31.0));
        assert_eq!(chicken.category_name.as_deref(), Some("Proteins"));
        assert!(!chicken.is_custom);

        let fruits = db.find_category("Fruits").unwrap().unwrap();
        assert_eq!(fruits.icon.as_deref(), Some("🍎"));
    }

    #[test]
    fn test_load_sample_data_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let first = load_sample_data(&db).unwrap();
        let second = load_sample_data(&db).unwrap();
        assert_eq!(second.categories_created, 0);
        assert_eq!(second.foods_created, 0);
        assert_eq!(second.foods_existing, first.foods_created);
        assert_eq!(
            db.search_foods(None, None, 1000).unwrap().len(),
            first.foods_created
        );
    }

    #[test]
    fn test_load_matches_existing_category_regardless_of_case() {
        let db = Database::open_in_memory().unwrap();
        load_sample_data(&db).unwrap();
        let csv = "category,name,calories\nproteins,Tofu Firm,76\n";
        let records = parse_food_csv(csv.as_bytes()).unwrap();
        let summary = load_foods(&db, &records, None).unwrap();
        assert_eq!(summary.categories_created, 0);
        assert_eq!(summary.foods_created, 1);
        assert_eq!(db.list_categories().unwrap().len(), SAMPLE_CATEGORIES.len());

        let tofu = db.find_food_by_name("Tofu Firm").unwrap().unwrap();
        assert_eq!(tofu.category_name.as_deref(), Some("Proteins"));
    }

    #[test]
    fn test_load_custom_foods_with_blank_cells() {
        let db = Database::open_in_memory().unwrap();
        let user = db.ensure_user("alice").unwrap();
        let csv = "category,name,calories,protein,carbs,fats,fiber,sodium\n\
                   ,Protein Bar,350,20,,,,\n\
                   Snacks,Trail Mix,462,13.8,44.9,29.4,,\n";
        let records = parse_food_csv(csv.as_bytes()).unwrap();
        let summary = load_foods(&db, &records, Some(user.id)).unwrap();
        assert_eq!(summary.foods_created, 2);
        assert_eq!(summary.categories_created, 1);

        let bar = db.find_food_by_name("protein bar").unwrap().unwrap();
        assert!(bar.is_custom);
        assert_eq!(bar.created_by, Some(user.id));
        assert_eq!(bar.category_id, None);
        assert_eq!(bar.nutrition.carbs, None);
    }

    #[test]
    fn test_load_rejects_negative_values_atomically() {
        let db = Database::open_in_memory().unwrap();
        let csv = "name,calories\nGood,100\nBad,-5\n";
        let records = parse_food_csv(csv.as_bytes()).unwrap();
        let err = load_foods(&db, &records, None).unwrap_err();
        assert!(err.is_validation());
        assert!(db.find_food_by_name("Good").unwrap().is_none());
    }

    #[test]
    fn test_malformed_csv_is_data_error() {
        let csv = "name,calories\nApple,lots\n";
        let err = parse_food_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }
}
