//! Nutrition accounting: scaling logged quantities against per-100 reference
//! values and rolling them up per day, per recipe and across days.
//!
//! Rounding rules:
//! - calories are rounded to an integer once per entry, half-to-even;
//! - macros are summed at full precision and rounded to one decimal only when
//!   a total is produced, also half-to-even.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{
    MEAL_SLOTS, MealEntry, MealPlan, MealSlot, NutritionFacts, RecipeIngredient, RecipeTemplate,
};
use crate::units::{Unit, scale_factor};

/// Share of the goal (in either direction) that still counts as "on target".
const ON_TARGET_TOLERANCE: f64 = 0.10;

/// Something logged against a food: a meal entry or a recipe ingredient.
pub trait Portion {
    fn nutrition(&self) -> &NutritionFacts;
    fn quantity(&self) -> f64;
    fn unit(&self) -> Unit;

    fn scale_factor(&self) -> f64 {
        scale_factor(self.quantity(), self.unit())
    }

    fn scaled(&self) -> ScaledNutrition {
        ScaledNutrition::of(self.nutrition(), self.quantity(), self.unit())
    }
}

impl Portion for MealEntry {
    fn nutrition(&self) -> &NutritionFacts {
        &self.nutrition
    }
    fn quantity(&self) -> f64 {
        self.quantity
    }
    fn unit(&self) -> Unit {
        self.unit
    }
}

impl Portion for RecipeIngredient {
    fn nutrition(&self) -> &NutritionFacts {
        &self.nutrition
    }
    fn quantity(&self) -> f64 {
        self.quantity
    }
    fn unit(&self) -> Unit {
        self.unit
    }
}

#[must_use]
pub fn round_calories(value: f64) -> i64 {
    value.round_ties_even() as i64
}

#[must_use]
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn scaled_calories(facts: &NutritionFacts, quantity: f64, unit: Unit) -> i64 {
    round_calories(facts.calories as f64 * scale_factor(quantity, unit))
}

#[must_use]
pub fn scaled_protein(facts: &NutritionFacts, quantity: f64, unit: Unit) -> f64 {
    facts.protein.unwrap_or(0.0) * scale_factor(quantity, unit)
}

#[must_use]
pub fn scaled_carbs(facts: &NutritionFacts, quantity: f64, unit: Unit) -> f64 {
    facts.carbs.unwrap_or(0.0) * scale_factor(quantity, unit)
}

#[must_use]
pub fn scaled_fats(facts: &NutritionFacts, quantity: f64, unit: Unit) -> f64 {
    facts.fats.unwrap_or(0.0) * scale_factor(quantity, unit)
}

/// Nutrition for one logged quantity. Macros are left unrounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScaledNutrition {
    pub calories: i64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

impl ScaledNutrition {
    #[must_use]
    pub fn of(facts: &NutritionFacts, quantity: f64, unit: Unit) -> Self {
        Self {
            calories: scaled_calories(facts, quantity, unit),
            protein: scaled_protein(facts, quantity, unit),
            carbs: scaled_carbs(facts, quantity, unit),
            fats: scaled_fats(facts, quantity, unit),
        }
    }
}

/// Running sum; macros stay at full precision until [`Totals::rounded`].
#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    calories: i64,
    protein: f64,
    carbs: f64,
    fats: f64,
}

impl Totals {
    fn add(&mut self, scaled: &ScaledNutrition) {
        self.calories += scaled.calories;
        self.protein += scaled.protein;
        self.carbs += scaled.carbs;
        self.fats += scaled.fats;
    }

    fn over<'a, P: Portion + 'a>(items: impl IntoIterator<Item = &'a P>) -> Self {
        let mut totals = Self::default();
        for item in items {
            totals.add(&item.scaled());
        }
        totals
    }

    fn rounded(self) -> (i64, f64, f64, f64) {
        (
            self.calories,
            round_tenth(self.protein),
            round_tenth(self.carbs),
            round_tenth(self.fats),
        )
    }
}

/// A logged item together with its scaled nutrition.
#[derive(Debug, Clone, Serialize)]
pub struct Line<T> {
    #[serde(flatten)]
    pub item: T,
    pub scaled: ScaledNutrition,
}

impl<T: Portion> Line<T> {
    pub fn new(item: T) -> Self {
        let scaled = item.scaled();
        Self { item, scaled }
    }
}

pub type EntryLine = Line<MealEntry>;
pub type IngredientLine = Line<RecipeIngredient>;

// --- Daily aggregation ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayTotals {
    pub total_calories: i64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fats: f64,
    pub calories_remaining: i64,
    pub progress_percentage: i64,
}

/// Percentage of `goal_calories` consumed, capped at 100.
#[allow(clippy::cast_precision_loss)]
pub fn progress_percentage(total_calories: i64, goal_calories: i64) -> Result<i64> {
    if goal_calories <= 0 {
        return Err(Error::ArithmeticDegenerate(format!(
            "progress against a goal of {goal_calories} calories"
        )));
    }
    let pct = round_calories(total_calories as f64 / goal_calories as f64 * 100.0);
    Ok(pct.min(100))
}

/// Totals for a plan's entries measured against the plan's goal.
pub fn aggregate_day(plan: &MealPlan, entries: &[MealEntry]) -> Result<DayTotals> {
    let (total_calories, total_protein, total_carbs, total_fats) =
        Totals::over(entries).rounded();
    Ok(DayTotals {
        total_calories,
        total_protein,
        total_carbs,
        total_fats,
        calories_remaining: plan.goal_calories - total_calories,
        progress_percentage: progress_percentage(total_calories, plan.goal_calories)?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressBand {
    OnTrack,
    Moderate,
    Low,
}

impl ProgressBand {
    #[must_use]
    pub fn from_percentage(pct: i64) -> Self {
        if pct >= 80 {
            Self::OnTrack
        } else if pct >= 60 {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MealGroup {
    pub meal_slot: MealSlot,
    pub entries: Vec<EntryLine>,
    pub subtotal_calories: i64,
    pub subtotal_protein: f64,
    pub subtotal_carbs: f64,
    pub subtotal_fats: f64,
}

/// Group entries by slot in breakfast/lunch/dinner/snack order. Within a slot
/// entries keep creation order. Empty slots are omitted.
#[must_use]
pub fn group_by_slot(entries: &[MealEntry]) -> Vec<MealGroup> {
    let mut groups = Vec::new();
    for slot in MEAL_SLOTS {
        let mut in_slot: Vec<&MealEntry> =
            entries.iter().filter(|e| e.meal_slot == *slot).collect();
        if in_slot.is_empty() {
            continue;
        }
        in_slot.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let (subtotal_calories, subtotal_protein, subtotal_carbs, subtotal_fats) =
            Totals::over(in_slot.iter().copied()).rounded();
        groups.push(MealGroup {
            meal_slot: *slot,
            entries: in_slot.into_iter().cloned().map(Line::new).collect(),
            subtotal_calories,
            subtotal_protein,
            subtotal_carbs,
            subtotal_fats,
        });
    }
    groups
}

#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub plan: MealPlan,
    pub meals: Vec<MealGroup>,
    #[serde(flatten)]
    pub totals: DayTotals,
    pub progress_band: ProgressBand,
}

impl DaySummary {
    pub fn build(plan: MealPlan, entries: &[MealEntry]) -> Result<Self> {
        let totals = aggregate_day(&plan, entries)?;
        Ok(Self {
            meals: group_by_slot(entries),
            progress_band: ProgressBand::from_percentage(totals.progress_percentage),
            totals,
            plan,
        })
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.meals.iter().map(|m| m.entries.len()).sum()
    }
}

// --- Recipe aggregation ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecipeTotals {
    pub total_calories: i64,
    pub ingredient_count: usize,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fats: f64,
}

#[must_use]
pub fn aggregate_recipe(ingredients: &[RecipeIngredient]) -> RecipeTotals {
    let (total_calories, total_protein, total_carbs, total_fats) =
        Totals::over(ingredients).rounded();
    RecipeTotals {
        total_calories,
        ingredient_count: ingredients.len(),
        total_protein,
        total_carbs,
        total_fats,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub recipe: RecipeTemplate,
    pub ingredients: Vec<IngredientLine>,
    #[serde(flatten)]
    pub totals: RecipeTotals,
}

impl RecipeDetail {
    #[must_use]
    pub fn build(recipe: RecipeTemplate, ingredients: Vec<RecipeIngredient>) -> Self {
        let totals = aggregate_recipe(&ingredients);
        Self {
            recipe,
            ingredients: ingredients.into_iter().map(Line::new).collect(),
            totals,
        }
    }
}

// --- Multi-day rollups ---

#[derive(Debug, Clone, Serialize)]
pub struct DayRollup {
    pub date: NaiveDate,
    pub goal_calories: Option<i64>,
    pub total_calories: i64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fats: f64,
    pub progress_percentage: Option<i64>,
    pub entry_count: usize,
}

impl DayRollup {
    /// A date with no plan: zero totals and no goal.
    #[must_use]
    pub fn unplanned(date: NaiveDate) -> Self {
        Self {
            date,
            goal_calories: None,
            total_calories: 0,
            total_protein: 0.0,
            total_carbs: 0.0,
            total_fats: 0.0,
            progress_percentage: None,
            entry_count: 0,
        }
    }
}

impl From<&DaySummary> for DayRollup {
    fn from(summary: &DaySummary) -> Self {
        Self {
            date: summary.plan.date,
            goal_calories: Some(summary.plan.goal_calories),
            total_calories: summary.totals.total_calories,
            total_protein: summary.totals.total_protein,
            total_carbs: summary.totals.total_carbs,
            total_fats: summary.totals.total_fats,
            progress_percentage: Some(summary.totals.progress_percentage),
            entry_count: summary.entry_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: Vec<DayRollup>,
    pub total_calories: i64,
    pub average_calories: i64,
}

/// Roll up consecutive days. `summaries` may be sparse; dates without a
/// summary are reported as unplanned. The average covers logged days only.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rollup_week(start: NaiveDate, days: u32, summaries: &[DaySummary]) -> WeekSummary {
    let by_date: HashMap<NaiveDate, &DaySummary> =
        summaries.iter().map(|s| (s.plan.date, s)).collect();

    let rows: Vec<DayRollup> = start
        .iter_days()
        .take(days as usize)
        .map(|date| {
            by_date
                .get(&date)
                .map_or_else(|| DayRollup::unplanned(date), |s| DayRollup::from(*s))
        })
        .collect();

    let total_calories: i64 = rows.iter().map(|r| r.total_calories).sum();
    let logged = rows.iter().filter(|r| r.entry_count > 0).count();
    let average_calories = if logged == 0 {
        0
    } else {
        round_calories(total_calories as f64 / logged as f64)
    };
    let end = rows.last().map_or(start, |r| r.date);

    WeekSummary {
        start,
        end,
        days: rows,
        total_calories,
        average_calories,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Analytics {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days_logged: usize,
    pub average_calories: i64,
    pub average_protein: f64,
    pub average_carbs: f64,
    pub average_fats: f64,
    pub days_on_target: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_meal_slot: Option<MealSlot>,
}

/// Whether a day's intake lands within ten percent of its goal.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn is_on_target(total_calories: i64, goal_calories: i64) -> bool {
    if goal_calories <= 0 {
        return false;
    }
    let ratio = total_calories as f64 / goal_calories as f64;
    (1.0 - ON_TARGET_TOLERANCE..=1.0 + ON_TARGET_TOLERANCE).contains(&ratio)
}

/// Averages over the days in `summaries` that have at least one entry.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn analyze(start: NaiveDate, end: NaiveDate, summaries: &[DaySummary]) -> Analytics {
    let logged: Vec<&DaySummary> = summaries
        .iter()
        .filter(|s| s.plan.date >= start && s.plan.date <= end && s.entry_count() > 0)
        .collect();

    let mut slot_calories: HashMap<MealSlot, i64> = HashMap::new();
    let mut totals = Totals::default();
    for summary in &logged {
        for group in &summary.meals {
            for line in &group.entries {
                totals.add(&line.scaled);
            }
            *slot_calories.entry(group.meal_slot).or_default() += group.subtotal_calories;
        }
    }

    let days_on_target = logged
        .iter()
        .filter(|s| is_on_target(s.totals.total_calories, s.plan.goal_calories))
        .count();

    // Earliest slot wins ties
    let top_meal_slot = MEAL_SLOTS
        .iter()
        .filter_map(|slot| slot_calories.get(slot).map(|cal| (*slot, *cal)))
        .fold(None, |best: Option<(MealSlot, i64)>, (slot, cal)| match best {
            Some((_, best_cal)) if best_cal >= cal => best,
            _ => Some((slot, cal)),
        })
        .map(|(slot, _)| slot);

    let n = logged.len();
    let (average_calories, average_protein, average_carbs, average_fats) = if n == 0 {
        (0, 0.0, 0.0, 0.0)
    } else {
        let n = n as f64;
        (
            round_calories(totals.calories as f64 / n),
            round_tenth(totals.protein / n),
            round_tenth(totals.carbs / n),
            round_tenth(totals.fats / n),
        )
    };

    Analytics {
        start,
        end,
        days_logged: logged.len(),
        average_calories,
        average_protein,
        average_carbs,
        average_fats,
        days_on_target,
        top_meal_slot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(calories: i64, protein: Option<f64>) -> NutritionFacts {
        NutritionFacts {
            calories,
            protein,
            carbs: None,
            fats: None,
            fiber: None,
            sodium: None,
        }
    }

    fn plan(goal_calories: i64) -> MealPlan {
        MealPlan {
            id: 1,
            uuid: "plan".to_string(),
            user_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            goal_calories,
            notes: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn entry(
        id: i64,
        slot: MealSlot,
        nutrition: NutritionFacts,
        quantity: f64,
        unit: Unit,
    ) -> MealEntry {
        MealEntry {
            id,
            uuid: format!("entry-{id}"),
            meal_plan_id: 1,
            food_id: id,
            meal_slot: slot,
            quantity,
            unit,
            created_at: format!("2024-06-15T08:00:{id:02}+00:00"),
            food_name: format!("Food {id}"),
            nutrition,
        }
    }

    fn ingredient(id: i64, nutrition: NutritionFacts, quantity: f64, unit: Unit) -> RecipeIngredient {
        RecipeIngredient {
            id,
            uuid: format!("ing-{id}"),
            recipe_id: 1,
            food_id: id,
            quantity,
            unit,
            note: None,
            food_name: format!("Food {id}"),
            nutrition,
        }
    }

    #[test]
    fn test_scaled_chicken_at_150g() {
        let chicken = facts(165, Some(31.0));
        assert!((scale_factor(150.0, Unit::G) - 1.5).abs() < 1e-9);
        assert_eq!(scaled_calories(&chicken, 150.0, Unit::G), 248);
        assert!((scaled_protein(&chicken, 150.0, Unit::G) - 46.5).abs() < 1e-9);
    }

    #[test]
    fn test_missing_macros_count_as_zero() {
        let plain = facts(100, None);
        let scaled = ScaledNutrition::of(&plain, 200.0, Unit::G);
        assert_eq!(scaled.calories, 200);
        assert!(scaled.protein.abs() < f64::EPSILON);
        assert!(scaled.carbs.abs() < f64::EPSILON);
        assert!(scaled.fats.abs() < f64::EPSILON);
    }

    #[test]
    fn test_calorie_rounding_is_half_to_even() {
        // 5 kcal/100g at 50g = 2.5 -> 2, at 70g = 3.5 -> 4
        let f = facts(5, None);
        assert_eq!(scaled_calories(&f, 50.0, Unit::G), 2);
        assert_eq!(scaled_calories(&f, 70.0, Unit::G), 4);
    }

    #[test]
    fn test_scaled_calories_monotonic_in_quantity() {
        for unit in crate::units::UNITS {
            for cal in [0, 1, 52, 165, 884] {
                let f = facts(cal, None);
                let mut last = 0;
                for step in 1..=200 {
                    let q = f64::from(step) * 0.5;
                    let c = scaled_calories(&f, q, *unit);
                    assert!(c >= last, "{unit} {cal} at {q}: {c} < {last}");
                    last = c;
                }
            }
        }
    }

    #[test]
    fn test_recipe_ingredient_two_cups() {
        let ing = ingredient(1, facts(100, None), 2.0, Unit::Cup);
        assert!((ing.scale_factor() - 4.8).abs() < 1e-9);
        assert_eq!(ing.scaled().calories, 480);
    }

    #[test]
    fn test_aggregate_day_worked_example() {
        // 248 + 300 + 52
        let entries = vec![
            entry(1, MealSlot::Breakfast, facts(165, Some(31.0)), 150.0, Unit::G),
            entry(2, MealSlot::Lunch, facts(300, None), 1.0, Unit::Serving),
            entry(3, MealSlot::Snack, facts(52, None), 100.0, Unit::G),
        ];
        let totals = aggregate_day(&plan(2000), &entries).unwrap();
        assert_eq!(totals.total_calories, 600);
        assert_eq!(totals.calories_remaining, 1400);
        assert_eq!(totals.progress_percentage, 30);
        assert!((totals.total_protein - 46.5).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_day_empty() {
        let totals = aggregate_day(&plan(2000), &[]).unwrap();
        assert_eq!(totals.total_calories, 0);
        assert_eq!(totals.progress_percentage, 0);
        assert_eq!(totals.calories_remaining, 2000);
        assert!(totals.total_protein.abs() < f64::EPSILON);
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(progress_percentage(5000, 2000).unwrap(), 100);
        assert_eq!(progress_percentage(2000, 2000).unwrap(), 100);
        assert_eq!(progress_percentage(1999, 2000).unwrap(), 100);
        assert_eq!(progress_percentage(1500, 2000).unwrap(), 75);
    }

    #[test]
    fn test_remaining_can_go_negative() {
        let entries = vec![entry(1, MealSlot::Dinner, facts(500, None), 5.0, Unit::Piece)];
        let totals = aggregate_day(&plan(2000), &entries).unwrap();
        assert_eq!(totals.total_calories, 2500);
        assert_eq!(totals.calories_remaining, -500);
        assert_eq!(totals.progress_percentage, 100);
    }

    #[test]
    fn test_zero_goal_fails_loudly() {
        let err = aggregate_day(&plan(0), &[]).unwrap_err();
        assert!(matches!(err, Error::ArithmeticDegenerate(_)));
        assert!(progress_percentage(100, -5).is_err());
    }

    #[test]
    fn test_macros_rounded_once_after_summing() {
        // Each entry scales to 0.04g protein; rounding per entry would give 0.0
        let f = facts(0, Some(0.04));
        let entries: Vec<MealEntry> = (1..=5)
            .map(|i| entry(i, MealSlot::Snack, f, 1.0, Unit::Piece))
            .collect();
        let totals = aggregate_day(&plan(2000), &entries).unwrap();
        assert!((totals.total_protein - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_group_by_slot_order_and_subtotals() {
        let f = facts(100, Some(10.0));
        let mut late_breakfast = entry(4, MealSlot::Breakfast, f, 100.0, Unit::G);
        late_breakfast.created_at = "2024-06-15T09:00:00+00:00".to_string();
        let entries = vec![
            entry(1, MealSlot::Snack, f, 100.0, Unit::G),
            late_breakfast,
            entry(2, MealSlot::Breakfast, f, 200.0, Unit::G),
            entry(3, MealSlot::Dinner, f, 50.0, Unit::G),
        ];
        let groups = group_by_slot(&entries);
        let slots: Vec<MealSlot> = groups.iter().map(|g| g.meal_slot).collect();
        assert_eq!(
            slots,
            vec![MealSlot::Breakfast, MealSlot::Dinner, MealSlot::Snack]
        );
        let breakfast_ids: Vec<i64> = groups[0].entries.iter().map(|l| l.item.id).collect();
        assert_eq!(breakfast_ids, vec![2, 4]);
        assert_eq!(groups[0].subtotal_calories, 300);
        assert!((groups[0].subtotal_protein - 30.0).abs() < 1e-9);
        assert_eq!(groups[1].subtotal_calories, 50);
    }

    #[test]
    fn test_group_ties_broken_by_id() {
        let f = facts(10, None);
        let mut a = entry(7, MealSlot::Lunch, f, 1.0, Unit::Piece);
        let mut b = entry(3, MealSlot::Lunch, f, 1.0, Unit::Piece);
        a.created_at = "same".to_string();
        b.created_at = "same".to_string();
        let groups = group_by_slot(&[a, b]);
        let ids: Vec<i64> = groups[0].entries.iter().map(|l| l.item.id).collect();
        assert_eq!(ids, vec![3, 7]);
    }

    #[test]
    fn test_progress_band() {
        assert_eq!(ProgressBand::from_percentage(100), ProgressBand::OnTrack);
        assert_eq!(ProgressBand::from_percentage(80), ProgressBand::OnTrack);
        assert_eq!(ProgressBand::from_percentage(79), ProgressBand::Moderate);
        assert_eq!(ProgressBand::from_percentage(60), ProgressBand::Moderate);
        assert_eq!(ProgressBand::from_percentage(0), ProgressBand::Low);
    }

    #[test]
    fn test_day_summary_serializes_flat_totals() {
        let entries = vec![entry(1, MealSlot::Lunch, facts(165, Some(31.0)), 150.0, Unit::G)];
        let summary = DaySummary::build(plan(2000), &entries).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total_calories"], 248);
        assert_eq!(json["progress_band"], "low");
        assert_eq!(json["meals"][0]["meal_slot"], "lunch");
        assert_eq!(json["meals"][0]["entries"][0]["scaled"]["calories"], 248);
        assert_eq!(json["meals"][0]["entries"][0]["unit"], "g");
    }

    #[test]
    fn test_aggregate_recipe() {
        let ingredients = vec![
            ingredient(1, facts(100, Some(5.0)), 2.0, Unit::Cup),
            ingredient(2, facts(884, None), 1.0, Unit::Tbsp),
            ingredient(3, facts(89, Some(1.1)), 1.0, Unit::Piece),
        ];
        let totals = aggregate_recipe(&ingredients);
        // 480 + round(132.6) + 89
        assert_eq!(totals.total_calories, 480 + 133 + 89);
        assert_eq!(totals.ingredient_count, 3);
        assert!((totals.total_protein - 25.1).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_recipe_empty() {
        let totals = aggregate_recipe(&[]);
        assert_eq!(totals.total_calories, 0);
        assert_eq!(totals.ingredient_count, 0);
    }

    fn summary_on(date: NaiveDate, goal: i64, calories: i64) -> DaySummary {
        let mut p = plan(goal);
        p.date = date;
        let entries = if calories > 0 {
            vec![entry(1, MealSlot::Dinner, facts(calories, Some(10.0)), 1.0, Unit::Serving)]
        } else {
            Vec::new()
        };
        DaySummary::build(p, &entries).unwrap()
    }

    #[test]
    fn test_rollup_week_fills_missing_days() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let summaries = vec![
            summary_on(start, 2000, 1800),
            summary_on(start + chrono::Duration::days(2), 2000, 2200),
        ];
        let week = rollup_week(start, 7, &summaries);
        assert_eq!(week.days.len(), 7);
        assert_eq!(week.end, NaiveDate::from_ymd_opt(2024, 6, 16).unwrap());
        assert_eq!(week.days[0].total_calories, 1800);
        assert_eq!(week.days[1].goal_calories, None);
        assert_eq!(week.days[2].progress_percentage, Some(100));
        assert_eq!(week.total_calories, 4000);
        assert_eq!(week.average_calories, 2000);
    }

    #[test]
    fn test_rollup_week_empty() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let week = rollup_week(start, 7, &[]);
        assert_eq!(week.total_calories, 0);
        assert_eq!(week.average_calories, 0);
        assert!(week.days.iter().all(|d| d.goal_calories.is_none()));
    }

    #[test]
    fn test_is_on_target() {
        assert!(is_on_target(2000, 2000));
        assert!(is_on_target(1800, 2000));
        assert!(is_on_target(2200, 2000));
        assert!(!is_on_target(1799, 2000));
        assert!(!is_on_target(2201, 2000));
        assert!(!is_on_target(100, 0));
    }

    #[test]
    fn test_analyze_averages_logged_days_only() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let end = start + chrono::Duration::days(6);
        let summaries = vec![
            summary_on(start, 2000, 1900),
            summary_on(start + chrono::Duration::days(1), 2000, 0),
            summary_on(start + chrono::Duration::days(3), 2000, 1000),
        ];
        let a = analyze(start, end, &summaries);
        assert_eq!(a.days_logged, 2);
        assert_eq!(a.average_calories, 1450);
        assert!((a.average_protein - 10.0).abs() < 1e-9);
        assert_eq!(a.days_on_target, 1);
        assert_eq!(a.top_meal_slot, Some(MealSlot::Dinner));
    }

    #[test]
    fn test_analyze_nothing_logged() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let a = analyze(start, start, &[]);
        assert_eq!(a.days_logged, 0);
        assert_eq!(a.average_calories, 0);
        assert!(a.top_meal_slot.is_none());
    }
}
