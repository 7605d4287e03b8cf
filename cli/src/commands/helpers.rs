use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutritrack_core::models::{Food, MealSlot, validate_quantity};
use nutritrack_core::units::Unit;

/// Parse a quantity with an optional unit, defaulting to grams.
/// Accepts: "150", "150g", "250ml", "2 cups", "1.5tbsp", "1 serving".
pub(crate) fn parse_quantity(s: &str) -> Result<(f64, Unit)> {
    let s = s.trim();

    let (qty, unit) = if let Ok(qty) = s.parse::<f64>() {
        (qty, Unit::G)
    } else if let Some((qty, unit)) = split_number_unit(s) {
        (qty, unit.parse::<Unit>()?)
    } else {
        let parts: Vec<&str> = s.splitn(2, char::is_whitespace).collect();
        if parts.len() != 2 {
            bail!("Invalid quantity '{s}'. Use '150g', '250ml', '2 cups', '1 serving', etc.");
        }
        let qty: f64 = parts[0]
            .parse()
            .with_context(|| format!("Invalid quantity: '{s}'"))?;
        (qty, parts[1].parse::<Unit>()?)
    };

    validate_quantity(qty)?;
    if unit.is_approximate() {
        eprintln!("Note: {unit} counts each unit as one 100 g reference portion (approximate)");
    }
    Ok((qty, unit))
}

/// Split "500ml" or "2.5tbsp" into (500.0, "ml") or (2.5, "tbsp").
fn split_number_unit(s: &str) -> Option<(f64, &str)> {
    let idx = s.find(|c: char| c.is_alphabetic())?;
    if idx == 0 {
        return None;
    }
    let (num_part, unit_part) = s.split_at(idx);
    let qty: f64 = num_part.trim().parse().ok()?;
    Some((qty, unit_part))
}

pub(crate) fn format_quantity(quantity: f64, unit: Unit) -> String {
    let qty = if quantity.fract() == 0.0 {
        format!("{quantity:.0}")
    } else {
        format!("{quantity}")
    };
    match unit {
        Unit::G | Unit::Ml => format!("{qty}{unit}"),
        _ => format!("{qty} {unit}"),
    }
}

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

pub(crate) fn parse_slot(s: &str) -> Result<MealSlot> {
    Ok(s.parse::<MealSlot>()?)
}

pub(crate) fn print_food_table(foods: &[Food]) {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Cal/100")]
        calories: i64,
        #[tabled(rename = "P/100")]
        protein: String,
        #[tabled(rename = "C/100")]
        carbs: String,
        #[tabled(rename = "F/100")]
        fats: String,
        #[tabled(rename = "Custom")]
        custom: &'static str,
    }

    let rows: Vec<FoodRow> = foods
        .iter()
        .map(|f| FoodRow {
            id: f.id,
            name: truncate(&f.name, 35),
            category: f
                .category_name
                .as_deref()
                .map(|c| truncate(c, 20))
                .unwrap_or_default(),
            calories: f.nutrition.calories,
            protein: macro_cell(f.nutrition.protein),
            carbs: macro_cell(f.nutrition.carbs),
            fats: macro_cell(f.nutrition.fats),
            custom: if f.is_custom { "yes" } else { "" },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..7)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn macro_cell(value: Option<f64>) -> String {
    value.map_or("-".into(), |v| format!("{v:.1}"))
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Report a missing record and exit with status 2.
pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
