mod day;
mod entry;
mod food;
mod helpers;
mod recipe;

use anyhow::Result;

use nutritrack_core::models::Food;
use nutritrack_core::service::NutritionService;

use helpers::exit_not_found;

pub(crate) use day::{cmd_analytics, cmd_day, cmd_goal, cmd_note, cmd_recent, cmd_week};
pub(crate) use entry::{cmd_copy, cmd_copy_yesterday, cmd_delete, cmd_edit, cmd_log};
pub(crate) use food::{
    cmd_categories, cmd_food_add, cmd_food_import, cmd_food_list, cmd_food_show, cmd_seed,
};
pub(crate) use recipe::{
    cmd_recipe_add_ingredient, cmd_recipe_add_to_meal, cmd_recipe_create, cmd_recipe_delete,
    cmd_recipe_list, cmd_recipe_remove_ingredient, cmd_recipe_show,
};

/// Resolve a food by id or name, exiting with status 2 when nothing matches.
pub(super) fn resolve_food(svc: &NutritionService, reference: &str, json: bool) -> Result<Food> {
    match svc.find_food(reference) {
        Ok(food) => Ok(food),
        Err(e) if e.is_not_found() => {
            exit_not_found(&format!("No food found for '{reference}'"), json)
        }
        Err(e) => Err(e.into()),
    }
}
