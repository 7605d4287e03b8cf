use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::units::Unit;

pub const DEFAULT_GOAL_CALORIES: i64 = 2000;
pub const MIN_GOAL_CALORIES: i64 = 1000;
/// Largest quantity accepted for a single entry or ingredient, in any unit.
pub const MAX_QUANTITY: f64 = 100_000.0;
/// Largest calorie value accepted per reference portion.
pub const MAX_CALORIES: i64 = 10_000;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodCategory {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
}

impl fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.icon.as_deref() {
            Some(icon) if !icon.is_empty() => write!(f, "{icon} {}", self.name),
            _ => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    #[serde(flatten)]
    pub category: FoodCategory,
    pub food_count: i64,
}

/// Nutrition facts per 100 g / 100 ml. Missing macros mean "unknown".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub calories: i64,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fats: Option<f64>,
    pub fiber: Option<f64>,
    pub sodium: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Food {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(flatten)]
    pub nutrition: NutritionFacts,
    pub is_custom: bool,
    pub created_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewFood {
    pub name: String,
    pub category_id: Option<i64>,
    pub nutrition: NutritionFacts,
    pub is_custom: bool,
    pub created_by: Option<i64>,
}

/// Coarse time-of-day grouping for entries within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// Display order of meal slots within a day.
pub const MEAL_SLOTS: &[MealSlot] = &[
    MealSlot::Breakfast,
    MealSlot::Lunch,
    MealSlot::Dinner,
    MealSlot::Snack,
];

impl MealSlot {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
        }
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealSlot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            "snack" => Ok(Self::Snack),
            _ => Err(Error::validation(
                "meal_slot",
                format!(
                    "Invalid meal slot '{s}'. Must be one of: {}",
                    MEAL_SLOTS
                        .iter()
                        .map(|m| m.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MealPlan {
    pub id: i64,
    pub uuid: String,
    pub user_id: i64,
    pub date: NaiveDate,
    pub goal_calories: i64,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Values used when a plan has to be created on first access.
#[derive(Debug, Clone)]
pub struct PlanDefaults {
    pub goal_calories: i64,
    pub notes: String,
}

impl Default for PlanDefaults {
    fn default() -> Self {
        Self {
            goal_calories: DEFAULT_GOAL_CALORIES,
            notes: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMealPlan {
    pub goal_calories: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealEntry {
    pub id: i64,
    pub uuid: String,
    pub meal_plan_id: i64,
    pub food_id: i64,
    pub meal_slot: MealSlot,
    pub quantity: f64,
    pub unit: Unit,
    pub created_at: String,
    // Joined from the food row
    pub food_name: String,
    pub nutrition: NutritionFacts,
}

#[derive(Debug, Clone)]
pub struct NewMealEntry {
    pub meal_plan_id: i64,
    pub food_id: i64,
    pub meal_slot: MealSlot,
    pub quantity: f64,
    pub unit: Unit,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMealEntry {
    pub quantity: Option<f64>,
    pub unit: Option<Unit>,
    pub meal_slot: Option<MealSlot>,
}

impl UpdateMealEntry {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.unit.is_none() && self.meal_slot.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeTemplate {
    pub id: i64,
    pub uuid: String,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeIngredient {
    pub id: i64,
    pub uuid: String,
    pub recipe_id: i64,
    pub food_id: i64,
    pub quantity: f64,
    pub unit: Unit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub food_name: String,
    pub nutrition: NutritionFacts,
}

/// An ingredient supplied together with a new recipe.
#[derive(Debug, Clone)]
pub struct NewIngredient {
    pub food_id: i64,
    pub quantity: f64,
    pub unit: Unit,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRecipeIngredient {
    pub recipe_id: i64,
    pub food_id: i64,
    pub quantity: f64,
    pub unit: Unit,
    pub note: Option<String>,
}

// --- Validation ---

pub fn validate_quantity(quantity: f64) -> Result<()> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(Error::validation("quantity", "must be greater than 0"));
    }
    if quantity > MAX_QUANTITY {
        return Err(Error::validation(
            "quantity",
            format!("must be at most {MAX_QUANTITY}"),
        ));
    }
    Ok(())
}

pub fn validate_goal_calories(goal_calories: i64) -> Result<()> {
    if goal_calories < MIN_GOAL_CALORIES {
        return Err(Error::validation(
            "goal_calories",
            format!("must be at least {MIN_GOAL_CALORIES} (got {goal_calories})"),
        ));
    }
    Ok(())
}

pub fn validate_name(field: &'static str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    Ok(())
}

pub fn validate_nutrition(facts: &NutritionFacts) -> Result<()> {
    if facts.calories < 0 {
        return Err(Error::validation("calories", "must not be negative"));
    }
    if facts.calories > MAX_CALORIES {
        return Err(Error::validation(
            "calories",
            format!("must be at most {MAX_CALORIES}"),
        ));
    }
    let optional = [
        ("protein", facts.protein),
        ("carbs", facts.carbs),
        ("fats", facts.fats),
        ("fiber", facts.fiber),
        ("sodium", facts.sodium),
    ];
    for (field, value) in optional {
        if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
            return Err(Error::validation(field, "must not be negative"));
        }
    }
    Ok(())
}

pub fn validate_new_food(food: &NewFood) -> Result<()> {
    validate_name("name", &food.name)?;
    validate_nutrition(&food.nutrition)
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::validation("date", format!("Invalid date '{s}'. Use YYYY-MM-DD")))
}
