use anyhow::Result;
use chrono::{Duration, Local};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutritrack_core::nutrition::{DaySummary, ProgressBand};
use nutritrack_core::service::{NutritionService, WEEK_DAYS};

use super::helpers::{
    exit_not_found, format_quantity, no_neg_zero, parse_date, print_json, truncate,
};

/// Show a day. `create` get-or-creates the plan; otherwise a missing plan
/// exits with status 2.
pub(crate) fn cmd_day(
    svc: &NutritionService,
    date: Option<String>,
    create: bool,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let summary = if create {
        svc.day_summary(date)?
    } else {
        match svc.existing_day_summary(date) {
            Ok(summary) => summary,
            Err(e) if e.is_not_found() => {
                exit_not_found(&format!("No meal plan for {date}"), json)
            }
            Err(e) => return Err(e.into()),
        }
    };

    if json {
        return print_json(&summary);
    }

    print_day(&summary);
    Ok(())
}

fn band_label(band: ProgressBand) -> &'static str {
    match band {
        ProgressBand::OnTrack => "on track",
        ProgressBand::Moderate => "moderate",
        ProgressBand::Low => "low",
    }
}

fn print_day(summary: &DaySummary) {
    let date = summary.plan.date;
    let goal = summary.plan.goal_calories;
    println!("=== {date} === goal {goal} kcal\n");

    if summary.meals.is_empty() {
        println!("  No entries yet\n");
    }

    for meal in &summary.meals {
        let label = meal.meal_slot.as_str().to_uppercase();
        let sub_cal = meal.subtotal_calories;
        println!("  {label} ({sub_cal} kcal)");
        for line in &meal.entries {
            let e = &line.item;
            let id = e.id;
            let name = &e.food_name;
            let qty = format_quantity(e.quantity, e.unit);
            let cal = line.scaled.calories;
            let p = no_neg_zero(line.scaled.protein);
            let c = no_neg_zero(line.scaled.carbs);
            let f = no_neg_zero(line.scaled.fats);
            println!("    [{id}] {name} - {qty} - {cal} kcal | P:{p:.1}g C:{c:.1}g F:{f:.1}g");
        }
        println!();
    }

    let t = &summary.totals;
    let total_cal = t.total_calories;
    let (p, c, f) = (t.total_protein, t.total_carbs, t.total_fats);
    println!("  TOTAL: {total_cal} kcal | P:{p:.1}g C:{c:.1}g F:{f:.1}g");
    let remaining = t.calories_remaining;
    let pct = t.progress_percentage;
    let band = band_label(summary.progress_band);
    println!("  REMAINING: {remaining} kcal ({pct}% of goal, {band})");
    if !summary.plan.notes.is_empty() {
        println!("  NOTES: {}", summary.plan.notes);
    }
}

pub(crate) fn cmd_week(svc: &NutritionService, start: Option<String>, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct WeekRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Goal")]
        goal: String,
        #[tabled(rename = "Calories")]
        calories: i64,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Fat")]
        fats: String,
        #[tabled(rename = "Progress")]
        progress: String,
    }

    let start = match start {
        Some(s) => parse_date(Some(s))?,
        None => Local::now().date_naive() - Duration::days(i64::from(WEEK_DAYS) - 1),
    };
    let week = svc.week(start)?;

    if json {
        return print_json(&week);
    }

    let rows: Vec<WeekRow> = week
        .days
        .iter()
        .map(|d| WeekRow {
            date: d.date.format("%a %Y-%m-%d").to_string(),
            goal: d.goal_calories.map_or("-".into(), |g| g.to_string()),
            calories: d.total_calories,
            protein: format!("{:.1}g", no_neg_zero(d.total_protein)),
            carbs: format!("{:.1}g", no_neg_zero(d.total_carbs)),
            fats: format!("{:.1}g", no_neg_zero(d.total_fats)),
            progress: d.progress_percentage.map_or("-".into(), |p| format!("{p}%")),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    let total = week.total_calories;
    let avg = week.average_calories;
    println!("  Total: {total} kcal | Average per logged day: {avg} kcal");

    Ok(())
}

pub(crate) fn cmd_analytics(
    svc: &NutritionService,
    days: u32,
    end: Option<String>,
    json: bool,
) -> Result<()> {
    let end = parse_date(end)?;
    let stats = svc.analytics(end, days)?;

    if json {
        return print_json(&stats);
    }

    let (start, end) = (stats.start, stats.end);
    println!("=== {start} to {end} ===\n");
    if stats.days_logged == 0 {
        println!("  Nothing logged in this period");
        return Ok(());
    }
    println!("  Days logged:    {}", stats.days_logged);
    println!("  Days on target: {}", stats.days_on_target);
    println!("  Avg calories:   {} kcal", stats.average_calories);
    println!(
        "  Avg macros:     P:{:.1}g C:{:.1}g F:{:.1}g",
        stats.average_protein, stats.average_carbs, stats.average_fats
    );
    if let Some(slot) = stats.top_meal_slot {
        println!("  Biggest meal:   {slot}");
    }
    Ok(())
}

pub(crate) fn cmd_recent(svc: &NutritionService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct PlanRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Goal")]
        goal: i64,
        #[tabled(rename = "Notes")]
        notes: String,
    }

    let plans = svc.recent_plans()?;
    if json {
        return print_json(&plans);
    }
    if plans.is_empty() {
        exit_not_found("No meal plans yet", false);
    }

    let rows: Vec<PlanRow> = plans
        .iter()
        .map(|p| PlanRow {
            date: p.date.to_string(),
            goal: p.goal_calories,
            notes: truncate(&p.notes, 40),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_goal(
    svc: &NutritionService,
    calories: i64,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let plan = svc.set_goal(date, calories)?;
    if json {
        return print_json(&plan);
    }
    println!("Goal for {date} set to {} kcal", plan.goal_calories);
    Ok(())
}

pub(crate) fn cmd_note(
    svc: &NutritionService,
    notes: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let plan = svc.set_notes(date, notes)?;
    if json {
        return print_json(&plan);
    }
    if plan.notes.is_empty() {
        println!("Cleared notes for {date}");
    } else {
        println!("Updated notes for {date}");
    }
    Ok(())
}
