use std::path::Path;

use anyhow::{Context, Result};
use tabled::{Table, Tabled, settings::Style};

use nutritrack_core::models::NutritionFacts;
use nutritrack_core::service::NutritionService;

use super::helpers::{exit_not_found, macro_cell, print_food_table, print_json};
use super::resolve_food;

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_food_add(
    svc: &NutritionService,
    name: &str,
    calories: i64,
    protein: Option<f64>,
    carbs: Option<f64>,
    fats: Option<f64>,
    fiber: Option<f64>,
    sodium: Option<f64>,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let nutrition = NutritionFacts {
        calories,
        protein,
        carbs,
        fats,
        fiber,
        sodium,
    };
    let food = match svc.add_custom_food(name, category, nutrition) {
        Ok(food) => food,
        Err(e) if e.is_not_found() => exit_not_found(&e.to_string(), json),
        Err(e) => return Err(e.into()),
    };

    if json {
        return print_json(&food);
    }
    let id = food.id;
    println!("Added food: {} (id: {id})", food.name);
    Ok(())
}

pub(crate) fn cmd_food_list(
    svc: &NutritionService,
    search: Option<&str>,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let foods = match svc.search_foods(search, category) {
        Ok(foods) => foods,
        Err(e) if e.is_not_found() => exit_not_found(&e.to_string(), json),
        Err(e) => return Err(e.into()),
    };

    if json {
        return print_json(&foods);
    }
    if foods.is_empty() {
        exit_not_found("No foods found", false);
    }
    print_food_table(&foods);
    Ok(())
}

pub(crate) fn cmd_food_show(svc: &NutritionService, food_ref: &str, json: bool) -> Result<()> {
    let food = resolve_food(svc, food_ref, json)?;
    if json {
        return print_json(&food);
    }

    let n = &food.nutrition;
    println!("{} (id: {})", food.name, food.id);
    if let Some(category) = &food.category_name {
        println!("  Category: {category}");
    }
    println!("  Per 100 g / 100 ml:");
    println!("    Calories: {} kcal", n.calories);
    println!("    Protein:  {}g", macro_cell(n.protein));
    println!("    Carbs:    {}g", macro_cell(n.carbs));
    println!("    Fat:      {}g", macro_cell(n.fats));
    println!("    Fiber:    {}g", macro_cell(n.fiber));
    println!("    Sodium:   {}mg", macro_cell(n.sodium));
    if food.is_custom {
        println!("  Custom food");
    }
    Ok(())
}

pub(crate) fn cmd_categories(svc: &NutritionService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct CategoryRow {
        #[tabled(rename = "Category")]
        name: String,
        #[tabled(rename = "Foods")]
        foods: i64,
    }

    let categories = svc.categories()?;
    if json {
        return print_json(&categories);
    }
    if categories.is_empty() {
        exit_not_found("No categories yet. Run `nutritrack seed` to load sample data", false);
    }

    let rows: Vec<CategoryRow> = categories
        .iter()
        .map(|c| CategoryRow {
            name: c.category.to_string(),
            foods: c.food_count,
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_food_import(svc: &NutritionService, path: &Path, json: bool) -> Result<()> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let summary = svc.import_foods(file)?;

    if json {
        return print_json(&summary);
    }
    println!("Import complete.\n");
    println!("  Categories created: {}", summary.categories_created);
    println!("  Foods created:      {}", summary.foods_created);
    println!("  Foods existing:     {}", summary.foods_existing);
    Ok(())
}

pub(crate) fn cmd_seed(svc: &NutritionService, json: bool) -> Result<()> {
    let summary = svc.load_sample_data()?;

    if json {
        return print_json(&summary);
    }
    if summary.foods_created == 0 {
        println!("Sample data already loaded ({} foods)", summary.foods_existing);
    } else {
        println!(
            "Loaded {} foods in {} new categories",
            summary.foods_created, summary.categories_created
        );
    }
    Ok(())
}
