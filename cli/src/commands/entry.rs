use anyhow::{Result, bail};
use chrono::Local;

use nutritrack_core::models::UpdateMealEntry;
use nutritrack_core::nutrition::ScaledNutrition;
use nutritrack_core::planner::CopyOutcome;
use nutritrack_core::service::NutritionService;

use super::helpers::{
    exit_not_found, format_quantity, parse_date, parse_quantity, parse_slot, print_json,
};
use super::resolve_food;

pub(crate) fn cmd_log(
    svc: &NutritionService,
    food_ref: &str,
    quantity_str: &str,
    meal: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let meal_slot = parse_slot(meal)?;
    let (quantity, unit) = parse_quantity(quantity_str)?;
    let date = parse_date(date)?;
    let food = resolve_food(svc, food_ref, json)?;

    let entry = svc.log_entry(date, food.id, meal_slot, quantity, unit)?;

    if json {
        return print_json(&entry);
    }
    let name = &food.name;
    let qty = format_quantity(entry.quantity, entry.unit);
    let cal = ScaledNutrition::of(&entry.nutrition, entry.quantity, entry.unit).calories;
    println!("Logged: {name} {qty} for {meal_slot} on {date} ({cal} kcal) [{}]", entry.id);
    Ok(())
}

pub(crate) fn cmd_edit(
    svc: &NutritionService,
    id: i64,
    quantity: Option<String>,
    meal: Option<String>,
    json: bool,
) -> Result<()> {
    let (quantity, unit) = match quantity {
        Some(q) => {
            let (qty, unit) = parse_quantity(&q)?;
            (Some(qty), Some(unit))
        }
        None => (None, None),
    };
    let meal_slot = meal.as_deref().map(parse_slot).transpose()?;

    let update = UpdateMealEntry {
        quantity,
        unit,
        meal_slot,
    };
    if update.is_empty() {
        bail!("Nothing to update. Pass --quantity and/or --meal");
    }

    let entry = match svc.edit_entry(id, &update) {
        Ok(entry) => entry,
        Err(e) if e.is_not_found() => exit_not_found(&format!("Entry {id} not found"), json),
        Err(e) => return Err(e.into()),
    };

    if json {
        return print_json(&entry);
    }
    let qty = format_quantity(entry.quantity, entry.unit);
    let slot = entry.meal_slot;
    println!("Updated entry {id}: {} {qty} ({slot})", entry.food_name);
    Ok(())
}

pub(crate) fn cmd_delete(svc: &NutritionService, id: i64, json: bool) -> Result<()> {
    if !svc.delete_entry(id)? {
        exit_not_found(&format!("Entry {id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted entry {id}");
    }
    Ok(())
}

fn report_copy(outcome: &CopyOutcome, source: chrono::NaiveDate, json: bool) -> Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "source": source,
            "plan": outcome.plan,
            "plan_created": outcome.plan_created,
            "entries_copied": outcome.entries_copied,
        }));
    }
    let dest = outcome.plan.date;
    let n = outcome.entries_copied;
    if n == 0 {
        println!("{dest} already has every entry from {source}");
    } else {
        let s = if n == 1 { "y" } else { "ies" };
        println!("Copied {n} entr{s} from {source} to {dest}");
    }
    Ok(())
}

pub(crate) fn cmd_copy(
    svc: &NutritionService,
    from: &str,
    to: Option<String>,
    json: bool,
) -> Result<()> {
    let source = parse_date(Some(from.to_string()))?;
    let dest = parse_date(to)?;
    let outcome = match svc.copy_day(source, dest) {
        Ok(outcome) => outcome,
        Err(e) if e.is_not_found() => exit_not_found(&format!("No meal plan for {source}"), json),
        Err(e) => return Err(e.into()),
    };
    report_copy(&outcome, source, json)
}

pub(crate) fn cmd_copy_yesterday(svc: &NutritionService, json: bool) -> Result<()> {
    let today = Local::now().date_naive();
    let yesterday = today - chrono::Duration::days(1);
    let outcome = match svc.copy_yesterday(today) {
        Ok(outcome) => outcome,
        Err(e) if e.is_not_found() => {
            exit_not_found(&format!("No meal plan for {yesterday}"), json)
        }
        Err(e) => return Err(e.into()),
    };
    report_copy(&outcome, yesterday, json)
}
