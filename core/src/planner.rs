//! Batch operations that write several meal entries at once.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{MealPlan, MealSlot, NewMealEntry, PlanDefaults, RecipeTemplate};
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct CopyOutcome {
    pub plan: MealPlan,
    pub plan_created: bool,
    pub entries_copied: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpandOutcome {
    pub plan: MealPlan,
    pub entries_added: usize,
}

/// Copy every entry of `source` onto `dest_user`'s plan for `dest_date`.
///
/// The destination plan is created if needed, inheriting the source goal and
/// a note naming the source date. An entry is only added when the
/// destination has no entry for the same food in the same slot, so repeating
/// the copy changes nothing.
pub fn copy_day<S: Store>(
    store: &S,
    source: &MealPlan,
    dest_user: i64,
    dest_date: NaiveDate,
) -> Result<CopyOutcome> {
    if source.user_id == dest_user && source.date == dest_date {
        return Err(Error::validation("date", "cannot copy a day onto itself"));
    }

    store.in_transaction(|store| {
        let defaults = PlanDefaults {
            goal_calories: source.goal_calories,
            notes: format!("Copied from {}", source.date.format("%Y-%m-%d")),
        };
        let (plan, plan_created) = store.get_or_create_plan(dest_user, dest_date, &defaults)?;

        let mut entries_copied = 0;
        for entry in store.plan_entries(source.id)? {
            let (_, created) = store.get_or_create_entry(&NewMealEntry {
                meal_plan_id: plan.id,
                food_id: entry.food_id,
                meal_slot: entry.meal_slot,
                quantity: entry.quantity,
                unit: entry.unit,
            })?;
            if created {
                entries_copied += 1;
            } else {
                debug!(
                    food_id = entry.food_id,
                    slot = %entry.meal_slot,
                    "entry already present, skipped"
                );
            }
        }

        info!(
            from = %source.date,
            to = %dest_date,
            entries_copied,
            plan_created,
            "copied day"
        );
        Ok(CopyOutcome {
            plan,
            plan_created,
            entries_copied,
        })
    })
}

/// [`copy_day`] addressed by dates. A missing source plan is `NotFound`.
pub fn copy_date<S: Store>(
    store: &S,
    user_id: i64,
    source_date: NaiveDate,
    dest_date: NaiveDate,
) -> Result<CopyOutcome> {
    let source = store
        .find_plan(user_id, source_date)?
        .ok_or_else(|| Error::not_found(format!("Meal plan for {source_date} (nothing to copy)")))?;
    copy_day(store, &source, user_id, dest_date)
}

/// Copy the day before `today` onto `today`.
pub fn copy_yesterday<S: Store>(store: &S, user_id: i64, today: NaiveDate) -> Result<CopyOutcome> {
    let yesterday = today
        .pred_opt()
        .ok_or_else(|| Error::validation("date", format!("{today} has no previous day")))?;
    copy_date(store, user_id, yesterday, today)
}

/// Append one entry per recipe ingredient to `dest_plan` under `meal_slot`.
///
/// Entries are always appended: expanding the same recipe twice logs it twice.
pub fn expand_recipe_to_meal<S: Store>(
    store: &S,
    recipe: &RecipeTemplate,
    dest_plan: &MealPlan,
    meal_slot: MealSlot,
) -> Result<usize> {
    if recipe.user_id != dest_plan.user_id {
        return Err(Error::not_found(format!("Recipe {}", recipe.id)));
    }
    store.in_transaction(|store| append_ingredients(store, recipe, dest_plan, meal_slot))
}

/// Expand a recipe onto a date, creating that day's plan with default values
/// if needed.
pub fn expand_recipe_on_date<S: Store>(
    store: &S,
    user_id: i64,
    recipe_id: i64,
    date: NaiveDate,
    meal_slot: MealSlot,
) -> Result<ExpandOutcome> {
    store.in_transaction(|store| {
        let recipe = store.recipe(user_id, recipe_id)?;
        let (plan, _) = store.get_or_create_plan(user_id, date, &PlanDefaults::default())?;
        let entries_added = append_ingredients(store, &recipe, &plan, meal_slot)?;
        Ok(ExpandOutcome {
            plan,
            entries_added,
        })
    })
}

fn append_ingredients<S: Store>(
    store: &S,
    recipe: &RecipeTemplate,
    dest_plan: &MealPlan,
    meal_slot: MealSlot,
) -> Result<usize> {
    let ingredients = store.recipe_ingredients(recipe.id)?;
    for ingredient in &ingredients {
        store.insert_entry(&NewMealEntry {
            meal_plan_id: dest_plan.id,
            food_id: ingredient.food_id,
            meal_slot,
            quantity: ingredient.quantity,
            unit: ingredient.unit,
        })?;
    }
    info!(
        recipe = %recipe.name,
        date = %dest_plan.date,
        slot = %meal_slot,
        entries_added = ingredients.len(),
        "expanded recipe"
    );
    Ok(ingredients.len())
}
