use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{
    Food, MealEntry, MealPlan, NewMealEntry, PlanDefaults, RecipeIngredient, RecipeTemplate,
};

/// Persistence operations the planner needs.
///
/// Lookups that take a `user_id` only see rows owned by that user; rows owned
/// by someone else are reported as not found.
pub trait Store {
    fn food(&self, food_id: i64) -> Result<Food>;

    fn find_plan(&self, user_id: i64, date: NaiveDate) -> Result<Option<MealPlan>>;

    /// Returns the plan for `(user_id, date)`, creating it from `defaults` if
    /// absent. The flag is true when the plan was created by this call.
    fn get_or_create_plan(
        &self,
        user_id: i64,
        date: NaiveDate,
        defaults: &PlanDefaults,
    ) -> Result<(MealPlan, bool)>;

    /// Entries of a plan in insertion order.
    fn plan_entries(&self, plan_id: i64) -> Result<Vec<MealEntry>>;

    fn insert_entry(&self, entry: &NewMealEntry) -> Result<MealEntry>;

    /// Returns the first entry matching `(plan, food, slot)` or inserts
    /// `entry`. The flag is true when a new entry was inserted.
    fn get_or_create_entry(&self, entry: &NewMealEntry) -> Result<(MealEntry, bool)>;

    fn recipe(&self, user_id: i64, recipe_id: i64) -> Result<RecipeTemplate>;

    /// Ingredients of a recipe in insertion order.
    fn recipe_ingredients(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>>;

    /// Run `f` atomically. Any error rolls back everything `f` wrote.
    fn in_transaction<T, F>(&self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&Self) -> Result<T>;
}
