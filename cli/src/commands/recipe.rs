use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutritrack_core::models::RecipeTemplate;
use nutritrack_core::service::NutritionService;

use super::helpers::{
    exit_not_found, format_quantity, parse_date, parse_quantity, parse_slot, print_json, truncate,
};
use super::resolve_food;

fn resolve_recipe(svc: &NutritionService, reference: &str, json: bool) -> Result<RecipeTemplate> {
    match svc.find_recipe(reference) {
        Ok(recipe) => Ok(recipe),
        Err(e) if e.is_not_found() => {
            exit_not_found(&format!("No recipe found for '{reference}'"), json)
        }
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn cmd_recipe_create(
    svc: &NutritionService,
    name: &str,
    description: Option<&str>,
    json: bool,
) -> Result<()> {
    let recipe = svc.create_recipe(name, description.unwrap_or_default())?;
    if json {
        return print_json(&recipe);
    }
    let id = recipe.id;
    println!("Created recipe: {name} (id: {id})");
    println!("Add ingredients with: nutritrack recipe add-ingredient \"{name}\" <food> <quantity>");
    Ok(())
}

pub(crate) fn cmd_recipe_add_ingredient(
    svc: &NutritionService,
    recipe_ref: &str,
    food_ref: &str,
    quantity_str: &str,
    note: Option<String>,
    json: bool,
) -> Result<()> {
    let recipe = resolve_recipe(svc, recipe_ref, json)?;
    let (quantity, unit) = parse_quantity(quantity_str)?;
    let food = resolve_food(svc, food_ref, json)?;

    let ingredient = svc.add_ingredient(recipe.id, food.id, quantity, unit, note)?;

    if json {
        return print_json(&ingredient);
    }
    let qty = format_quantity(ingredient.quantity, ingredient.unit);
    println!("Set {} to {qty} in {}", food.name, recipe.name);
    Ok(())
}

pub(crate) fn cmd_recipe_remove_ingredient(
    svc: &NutritionService,
    recipe_ref: &str,
    food_ref: &str,
    json: bool,
) -> Result<()> {
    let recipe = resolve_recipe(svc, recipe_ref, json)?;
    let food = resolve_food(svc, food_ref, json)?;

    if !svc.remove_ingredient(recipe.id, food.id)? {
        exit_not_found(
            &format!("'{}' is not an ingredient of {}", food.name, recipe.name),
            json,
        );
    }
    if json {
        println!("{}", serde_json::json!({ "removed": food.id }));
    } else {
        println!("Removed {} from {}", food.name, recipe.name);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_show(svc: &NutritionService, recipe_ref: &str, json: bool) -> Result<()> {
    let recipe = resolve_recipe(svc, recipe_ref, json)?;
    let detail = svc.recipe_detail(recipe.id)?;

    if json {
        return print_json(&detail);
    }

    let name = &detail.recipe.name;
    println!("=== {name} ===");
    if !detail.recipe.description.is_empty() {
        println!("  {}", detail.recipe.description);
    }
    println!();

    println!("  INGREDIENTS:");
    if detail.ingredients.is_empty() {
        println!("    (none)");
    }
    for line in &detail.ingredients {
        let ing = &line.item;
        let qty = format_quantity(ing.quantity, ing.unit);
        let cal = line.scaled.calories;
        match &ing.note {
            Some(note) => println!("    {} - {qty} - {cal} kcal ({note})", ing.food_name),
            None => println!("    {} - {qty} - {cal} kcal", ing.food_name),
        }
    }

    let t = &detail.totals;
    let (cal, p, c, f) = (t.total_calories, t.total_protein, t.total_carbs, t.total_fats);
    println!("\n  TOTAL:");
    println!("    {cal} kcal | P:{p:.1}g C:{c:.1}g F:{f:.1}g");
    Ok(())
}

pub(crate) fn cmd_recipe_list(svc: &NutritionService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Ingredients")]
        ingredients: usize,
        #[tabled(rename = "Calories")]
        calories: i64,
        #[tabled(rename = "Protein")]
        protein: String,
    }

    let recipes = svc.list_recipes()?;
    if json {
        return print_json(&recipes);
    }
    if recipes.is_empty() {
        exit_not_found("No recipes found", false);
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: r.recipe.id,
            name: truncate(&r.recipe.name, 30),
            ingredients: r.totals.ingredient_count,
            calories: r.totals.total_calories,
            protein: format!("{:.1}g", r.totals.total_protein),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_recipe_add_to_meal(
    svc: &NutritionService,
    recipe_ref: &str,
    meal: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let recipe = resolve_recipe(svc, recipe_ref, json)?;
    let meal_slot = parse_slot(meal)?;
    let date = parse_date(date)?;

    let outcome = svc.expand_recipe(recipe.id, date, meal_slot)?;

    if json {
        return print_json(&outcome);
    }
    let n = outcome.entries_added;
    if n == 0 {
        println!("{} has no ingredients, nothing added", recipe.name);
    } else {
        println!("Added {n} items from {} to {meal_slot} on {date}", recipe.name);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_delete(svc: &NutritionService, recipe_ref: &str, json: bool) -> Result<()> {
    let recipe = resolve_recipe(svc, recipe_ref, json)?;
    svc.delete_recipe(recipe.id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": recipe.id }));
    } else {
        println!("Deleted recipe {}", recipe.name);
    }
    Ok(())
}
