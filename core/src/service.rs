use std::io::Read;
use std::path::Path;

use chrono::{Days, NaiveDate};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    CategorySummary, Food, MealEntry, MealPlan, MealSlot, NewFood, NewIngredient, NewMealEntry,
    NewRecipeIngredient, NutritionFacts, PlanDefaults, RecipeIngredient, RecipeTemplate,
    UpdateMealEntry, UpdateMealPlan, User,
};
use crate::nutrition::{Analytics, DaySummary, RecipeDetail, WeekSummary, analyze, rollup_week};
use crate::planner::{self, CopyOutcome, ExpandOutcome};
use crate::seed::{self, LoadSummary};
use crate::units::Unit;

pub const SEARCH_LIMIT: i64 = 50;
pub const RECENT_PLANS: i64 = 5;
pub const WEEK_DAYS: u32 = 7;

/// Everything a front end needs, acting as one user.
pub struct NutritionService {
    db: Database,
    user: User,
}

impl NutritionService {
    pub fn new(db: Database, username: &str) -> Result<Self> {
        let user = db.ensure_user(username)?;
        Ok(Self { db, user })
    }

    pub fn open(path: &Path, username: &str) -> Result<Self> {
        Self::new(Database::open(path)?, username)
    }

    pub fn open_in_memory(username: &str) -> Result<Self> {
        Self::new(Database::open_in_memory()?, username)
    }

    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    // --- Days ---

    pub fn plan(&self, date: NaiveDate) -> Result<MealPlan> {
        let (plan, _) = self
            .db
            .get_or_create_plan(self.user.id, date, &PlanDefaults::default())?;
        Ok(plan)
    }

    /// Summary for a date, creating its plan on first access.
    pub fn day_summary(&self, date: NaiveDate) -> Result<DaySummary> {
        let plan = self.plan(date)?;
        self.summarize(plan)
    }

    /// Summary for a date that already has a plan.
    pub fn existing_day_summary(&self, date: NaiveDate) -> Result<DaySummary> {
        let plan = self.db.get_plan(self.user.id, date)?;
        self.summarize(plan)
    }

    fn summarize(&self, plan: MealPlan) -> Result<DaySummary> {
        let entries = self.db.plan_entries(plan.id)?;
        DaySummary::build(plan, &entries)
    }

    pub fn update_plan(&self, date: NaiveDate, update: &UpdateMealPlan) -> Result<MealPlan> {
        self.db.in_transaction(|db| {
            db.get_or_create_plan(self.user.id, date, &PlanDefaults::default())?;
            db.update_plan(self.user.id, date, update)
        })
    }

    pub fn set_goal(&self, date: NaiveDate, goal_calories: i64) -> Result<MealPlan> {
        self.update_plan(
            date,
            &UpdateMealPlan {
                goal_calories: Some(goal_calories),
                notes: None,
            },
        )
    }

    pub fn set_notes(&self, date: NaiveDate, notes: &str) -> Result<MealPlan> {
        self.update_plan(
            date,
            &UpdateMealPlan {
                goal_calories: None,
                notes: Some(notes.to_string()),
            },
        )
    }

    pub fn recent_plans(&self) -> Result<Vec<MealPlan>> {
        self.db.recent_plans(self.user.id, RECENT_PLANS)
    }

    // --- Entries ---

    pub fn log_entry(
        &self,
        date: NaiveDate,
        food_id: i64,
        meal_slot: MealSlot,
        quantity: f64,
        unit: Unit,
    ) -> Result<MealEntry> {
        self.db.in_transaction(|db| {
            let (plan, _) = db.get_or_create_plan(self.user.id, date, &PlanDefaults::default())?;
            db.insert_entry(&NewMealEntry {
                meal_plan_id: plan.id,
                food_id,
                meal_slot,
                quantity,
                unit,
            })
        })
    }

    pub fn entry(&self, id: i64) -> Result<MealEntry> {
        self.db.get_entry(self.user.id, id)
    }

    pub fn edit_entry(&self, id: i64, update: &UpdateMealEntry) -> Result<MealEntry> {
        self.db.update_entry(self.user.id, id, update)
    }

    pub fn delete_entry(&self, id: i64) -> Result<bool> {
        self.db.delete_entry(self.user.id, id)
    }

    // --- Copying ---

    pub fn copy_day(&self, source_date: NaiveDate, dest_date: NaiveDate) -> Result<CopyOutcome> {
        planner::copy_date(&self.db, self.user.id, source_date, dest_date)
    }

    pub fn copy_yesterday(&self, today: NaiveDate) -> Result<CopyOutcome> {
        planner::copy_yesterday(&self.db, self.user.id, today)
    }

    // --- Rollups ---

    fn summaries_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DaySummary>> {
        self.db
            .plans_between(self.user.id, start, end)?
            .into_iter()
            .map(|plan| self.summarize(plan))
            .collect()
    }

    pub fn week(&self, start: NaiveDate) -> Result<WeekSummary> {
        let end = start
            .checked_add_days(Days::new(u64::from(WEEK_DAYS) - 1))
            .ok_or_else(|| {
                Error::validation("start", format!("week from {start} is out of range"))
            })?;
        let summaries = self.summaries_between(start, end)?;
        Ok(rollup_week(start, WEEK_DAYS, &summaries))
    }

    /// Statistics for the `days` days ending on `end`.
    pub fn analytics(&self, end: NaiveDate, days: u32) -> Result<Analytics> {
        if days == 0 {
            return Err(Error::validation("days", "must be at least 1"));
        }
        let start = end
            .checked_sub_days(Days::new(u64::from(days) - 1))
            .ok_or_else(|| {
                Error::validation("days", format!("{days} days before {end} is out of range"))
            })?;
        let summaries = self.summaries_between(start, end)?;
        Ok(analyze(start, end, &summaries))
    }

    // --- Foods ---

    pub fn food(&self, id: i64) -> Result<Food> {
        self.db.get_food(id)
    }

    /// Resolve a food by id, exact name, or a name fragment matching one food.
    pub fn find_food(&self, reference: &str) -> Result<Food> {
        let reference = reference.trim();
        if let Ok(id) = reference.parse::<i64>() {
            return self.db.get_food(id);
        }
        if let Some(food) = self.db.find_food_by_name(reference)? {
            return Ok(food);
        }
        let mut matches = self.db.search_foods(Some(reference), None, SEARCH_LIMIT)?;
        match matches.len() {
            0 => Err(Error::not_found(format!("Food '{reference}'"))),
            1 => Ok(matches.remove(0)),
            n => Err(Error::validation(
                "food",
                format!("'{reference}' matches {n} foods, be more specific or use an id"),
            )),
        }
    }

    /// Search by name fragment and optional category name.
    pub fn search_foods(&self, query: Option<&str>, category: Option<&str>) -> Result<Vec<Food>> {
        let category_id = match category {
            Some(name) => Some(
                self.db
                    .find_category(name)?
                    .ok_or_else(|| Error::not_found(format!("Category '{name}'")))?
                    .id,
            ),
            None => None,
        };
        self.db.search_foods(query, category_id, SEARCH_LIMIT)
    }

    pub fn add_custom_food(
        &self,
        name: &str,
        category: Option<&str>,
        nutrition: NutritionFacts,
    ) -> Result<Food> {
        let category_id = match category {
            Some(name) => Some(
                self.db
                    .find_category(name)?
                    .ok_or_else(|| Error::not_found(format!("Category '{name}'")))?
                    .id,
            ),
            None => None,
        };
        self.db.insert_food(&NewFood {
            name: name.to_string(),
            category_id,
            nutrition,
            is_custom: true,
            created_by: Some(self.user.id),
        })
    }

    pub fn categories(&self) -> Result<Vec<CategorySummary>> {
        self.db.list_categories()
    }

    pub fn load_sample_data(&self) -> Result<LoadSummary> {
        seed::load_sample_data(&self.db)
    }

    /// Import a food CSV as custom foods owned by the acting user.
    pub fn import_foods<R: Read>(&self, reader: R) -> Result<LoadSummary> {
        let records = seed::parse_food_csv(reader)?;
        seed::load_foods(&self.db, &records, Some(self.user.id))
    }

    // --- Recipes ---

    pub fn create_recipe(&self, name: &str, description: &str) -> Result<RecipeTemplate> {
        self.db.create_recipe(self.user.id, name, description)
    }

    /// Create a recipe and its ingredients together. Nothing is stored if any
    /// ingredient is rejected.
    pub fn create_recipe_with_ingredients(
        &self,
        name: &str,
        description: &str,
        ingredients: &[NewIngredient],
    ) -> Result<RecipeDetail> {
        self.db.in_transaction(|db| {
            let recipe = db.create_recipe(self.user.id, name, description)?;
            for ing in ingredients {
                db.upsert_recipe_ingredient(
                    self.user.id,
                    &NewRecipeIngredient {
                        recipe_id: recipe.id,
                        food_id: ing.food_id,
                        quantity: ing.quantity,
                        unit: ing.unit,
                        note: ing.note.clone(),
                    },
                )?;
            }
            let ingredients = db.recipe_ingredients(recipe.id)?;
            Ok(RecipeDetail::build(recipe, ingredients))
        })
    }

    /// Resolve a recipe by id or exact name.
    pub fn find_recipe(&self, reference: &str) -> Result<RecipeTemplate> {
        let reference = reference.trim();
        if let Ok(id) = reference.parse::<i64>() {
            return self.db.get_recipe(self.user.id, id);
        }
        self.db
            .find_recipe_by_name(self.user.id, reference)?
            .ok_or_else(|| Error::not_found(format!("Recipe '{reference}'")))
    }

    pub fn recipe_detail(&self, recipe_id: i64) -> Result<RecipeDetail> {
        let recipe = self.db.get_recipe(self.user.id, recipe_id)?;
        let ingredients = self.db.recipe_ingredients(recipe.id)?;
        Ok(RecipeDetail::build(recipe, ingredients))
    }

    pub fn list_recipes(&self) -> Result<Vec<RecipeDetail>> {
        self.db
            .list_recipes(self.user.id)?
            .into_iter()
            .map(|recipe| {
                let ingredients = self.db.recipe_ingredients(recipe.id)?;
                Ok(RecipeDetail::build(recipe, ingredients))
            })
            .collect()
    }

    pub fn add_ingredient(
        &self,
        recipe_id: i64,
        food_id: i64,
        quantity: f64,
        unit: Unit,
        note: Option<String>,
    ) -> Result<RecipeIngredient> {
        self.db.upsert_recipe_ingredient(
            self.user.id,
            &NewRecipeIngredient {
                recipe_id,
                food_id,
                quantity,
                unit,
                note,
            },
        )
    }

    pub fn remove_ingredient(&self, recipe_id: i64, food_id: i64) -> Result<bool> {
        self.db
            .remove_recipe_ingredient(self.user.id, recipe_id, food_id)
    }

    pub fn delete_recipe(&self, recipe_id: i64) -> Result<bool> {
        self.db.delete_recipe(self.user.id, recipe_id)
    }

    pub fn expand_recipe(
        &self,
        recipe_id: i64,
        date: NaiveDate,
        meal_slot: MealSlot,
    ) -> Result<ExpandOutcome> {
        planner::expand_recipe_on_date(&self.db, self.user.id, recipe_id, date, meal_slot)
    }
}
