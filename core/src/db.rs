use std::path::Path;

use chrono::{Local, NaiveDate};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, OptionalRow, Result};
use crate::models::{
    CategorySummary, Food, FoodCategory, MealEntry, MealPlan, MealSlot, NewFood, NewMealEntry,
    NewRecipeIngredient, NutritionFacts, PlanDefaults, RecipeIngredient, RecipeTemplate,
    UpdateMealEntry, UpdateMealPlan, User, validate_goal_calories, validate_name,
    validate_new_food, validate_quantity,
};
use crate::store::Store;
use crate::units::Unit;

const DATE_FORMAT: &str = "%Y-%m-%d";

const FOOD_SELECT: &str = "SELECT f.id, f.uuid, f.name, f.category_id, c.name,
        f.calories, f.protein, f.carbs, f.fats, f.fiber, f.sodium,
        f.is_custom, f.created_by, f.created_at, f.updated_at
     FROM foods f
     LEFT JOIN food_categories c ON f.category_id = c.id";

const PLAN_SELECT: &str = "SELECT id, uuid, user_id, date, goal_calories, notes, created_at, updated_at
     FROM meal_plans";

const ENTRY_SELECT: &str = "SELECT me.id, me.uuid, me.meal_plan_id, me.food_id, me.meal_slot,
        me.quantity, me.unit, me.created_at,
        f.name, f.calories, f.protein, f.carbs, f.fats, f.fiber, f.sodium
     FROM meal_entries me
     JOIN foods f ON me.food_id = f.id";

const RECIPE_SELECT: &str =
    "SELECT id, uuid, user_id, name, description, created_at, updated_at FROM recipes";

const INGREDIENT_SELECT: &str = "SELECT ri.id, ri.uuid, ri.recipe_id, ri.food_id,
        ri.quantity, ri.unit, ri.note,
        f.name, f.calories, f.protein, f.carbs, f.fats, f.fiber, f.sodium
     FROM recipe_ingredients ri
     JOIN foods f ON ri.food_id = f.id";

impl ToSql for Unit {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Unit {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for MealSlot {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for MealSlot {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

fn date_str(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn escape_like(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            debug!(from = version, "migrating schema to version 1");
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS food_categories (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                    icon TEXT
                );

                CREATE TABLE IF NOT EXISTS foods (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    category_id INTEGER REFERENCES food_categories(id) ON DELETE SET NULL,
                    calories INTEGER NOT NULL CHECK (calories >= 0),
                    protein REAL CHECK (protein >= 0),
                    carbs REAL CHECK (carbs >= 0),
                    fats REAL CHECK (fats >= 0),
                    fiber REAL CHECK (fiber >= 0),
                    sodium REAL CHECK (sodium >= 0),
                    is_custom INTEGER NOT NULL DEFAULT 0,
                    created_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_plans (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    date TEXT NOT NULL,
                    goal_calories INTEGER NOT NULL,
                    notes TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE (user_id, date)
                );

                CREATE TABLE IF NOT EXISTS meal_entries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    meal_plan_id INTEGER NOT NULL REFERENCES meal_plans(id) ON DELETE CASCADE,
                    food_id INTEGER NOT NULL REFERENCES foods(id),
                    meal_slot TEXT NOT NULL
                        CHECK (meal_slot IN ('breakfast', 'lunch', 'dinner', 'snack')),
                    quantity REAL NOT NULL CHECK (quantity > 0),
                    unit TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    food_id INTEGER NOT NULL REFERENCES foods(id),
                    quantity REAL NOT NULL CHECK (quantity > 0),
                    unit TEXT NOT NULL,
                    note TEXT,
                    created_at TEXT NOT NULL,
                    UNIQUE (recipe_id, food_id)
                );

                CREATE INDEX IF NOT EXISTS idx_foods_name ON foods(name);
                CREATE INDEX IF NOT EXISTS idx_foods_category ON foods(category_id);
                CREATE INDEX IF NOT EXISTS idx_meal_entries_plan ON meal_entries(meal_plan_id);
                CREATE INDEX IF NOT EXISTS idx_recipes_user ON recipes(user_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn date_from_row(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
        let s: String = row.get(idx)?;
        NaiveDate::parse_from_str(&s, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    // Expects calories, protein, carbs, fats, fiber, sodium starting at `start`
    fn nutrition_from_row(row: &rusqlite::Row, start: usize) -> rusqlite::Result<NutritionFacts> {
        Ok(NutritionFacts {
            calories: row.get(start)?,
            protein: row.get(start + 1)?,
            carbs: row.get(start + 2)?,
            fats: row.get(start + 3)?,
            fiber: row.get(start + 4)?,
            sodium: row.get(start + 5)?,
        })
    }

    fn food_from_row(row: &rusqlite::Row) -> rusqlite::Result<Food> {
        Ok(Food {
            id: row.get(0)?,
            uuid: row.get(1)?,
            name: row.get(2)?,
            category_id: row.get(3)?,
            category_name: row.get(4)?,
            nutrition: Self::nutrition_from_row(row, 5)?,
            is_custom: row.get(11)?,
            created_by: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    fn plan_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealPlan> {
        Ok(MealPlan {
            id: row.get(0)?,
            uuid: row.get(1)?,
            user_id: row.get(2)?,
            date: Self::date_from_row(row, 3)?,
            goal_calories: row.get(4)?,
            notes: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealEntry> {
        Ok(MealEntry {
            id: row.get(0)?,
            uuid: row.get(1)?,
            meal_plan_id: row.get(2)?,
            food_id: row.get(3)?,
            meal_slot: row.get(4)?,
            quantity: row.get(5)?,
            unit: row.get(6)?,
            created_at: row.get(7)?,
            food_name: row.get(8)?,
            nutrition: Self::nutrition_from_row(row, 9)?,
        })
    }

    fn recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<RecipeTemplate> {
        Ok(RecipeTemplate {
            id: row.get(0)?,
            uuid: row.get(1)?,
            user_id: row.get(2)?,
            name: row.get(3)?,
            description: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn ingredient_from_row(row: &rusqlite::Row) -> rusqlite::Result<RecipeIngredient> {
        Ok(RecipeIngredient {
            id: row.get(0)?,
            uuid: row.get(1)?,
            recipe_id: row.get(2)?,
            food_id: row.get(3)?,
            quantity: row.get(4)?,
            unit: row.get(5)?,
            note: row.get(6)?,
            food_name: row.get(7)?,
            nutrition: Self::nutrition_from_row(row, 8)?,
        })
    }

    // --- Users ---

    /// Look up a user by name, creating it on first use.
    pub fn ensure_user(&self, username: &str) -> Result<User> {
        validate_name("username", username)?;
        let username = username.trim();
        self.conn.execute(
            "INSERT INTO users (username, created_at) VALUES (?1, ?2)
             ON CONFLICT(username) DO NOTHING",
            params![username, Local::now().to_rfc3339()],
        )?;
        self.conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .or_not_found(|| format!("User '{username}'"))
    }

    // --- Categories ---

    /// Returns the category named `name` (matched case-insensitively),
    /// creating it if needed. The flag is true when it was created. An
    /// existing category keeps its name and icon.
    pub fn get_or_create_category(
        &self,
        name: &str,
        icon: Option<&str>,
    ) -> Result<(FoodCategory, bool)> {
        validate_name("name", name)?;
        if let Some(existing) = self.find_category(name)? {
            return Ok((existing, false));
        }
        let created = self.conn.execute(
            "INSERT INTO food_categories (name, icon) VALUES (?1, ?2)
             ON CONFLICT(name) DO NOTHING",
            params![name.trim(), icon],
        )? > 0;
        let category = self
            .find_category(name)?
            .ok_or_else(|| Error::not_found(format!("Category '{name}'")))?;
        Ok((category, created))
    }

    pub fn find_category(&self, name: &str) -> Result<Option<FoodCategory>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, name, icon FROM food_categories WHERE LOWER(name) = LOWER(?1)",
                params![name.trim()],
                |row| {
                    Ok(FoodCategory {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        icon: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(category)
    }

    pub fn list_categories(&self) -> Result<Vec<CategorySummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name, c.icon, COUNT(f.id)
             FROM food_categories c
             LEFT JOIN foods f ON f.category_id = c.id
             GROUP BY c.id
             ORDER BY c.name",
        )?;
        let categories = stmt
            .query_map([], |row| {
                Ok(CategorySummary {
                    category: FoodCategory {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        icon: row.get(2)?,
                    },
                    food_count: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Deleting a category leaves its foods uncategorized.
    pub fn delete_category(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM food_categories WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // --- Foods ---

    pub fn insert_food(&self, food: &NewFood) -> Result<Food> {
        validate_new_food(food)?;
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        let n = &food.nutrition;
        self.conn.execute(
            "INSERT INTO foods (uuid, name, category_id, calories, protein, carbs, fats, fiber, sodium,
                                is_custom, created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                uuid,
                food.name.trim(),
                food.category_id,
                n.calories,
                n.protein,
                n.carbs,
                n.fats,
                n.fiber,
                n.sodium,
                food.is_custom,
                food.created_by,
                now,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_food(id)
    }

    pub fn get_food(&self, id: i64) -> Result<Food> {
        self.conn
            .query_row(
                &format!("{FOOD_SELECT} WHERE f.id = ?1"),
                params![id],
                Self::food_from_row,
            )
            .or_not_found(|| format!("Food {id}"))
    }

    /// Case-insensitive exact name match; the oldest food wins.
    pub fn find_food_by_name(&self, name: &str) -> Result<Option<Food>> {
        let food = self
            .conn
            .query_row(
                &format!("{FOOD_SELECT} WHERE LOWER(f.name) = LOWER(?1) ORDER BY f.id LIMIT 1"),
                params![name.trim()],
                Self::food_from_row,
            )
            .optional()?;
        Ok(food)
    }

    /// Returns the food with the same name if one exists, otherwise inserts.
    pub fn get_or_create_food(&self, food: &NewFood) -> Result<(Food, bool)> {
        if let Some(existing) = self.find_food_by_name(&food.name)? {
            return Ok((existing, false));
        }
        Ok((self.insert_food(food)?, true))
    }

    /// Foods whose name contains `query`, optionally limited to one category,
    /// ordered by category name then food name.
    pub fn search_foods(
        &self,
        query: Option<&str>,
        category_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Food>> {
        let pattern = escape_like(query.map(str::trim).unwrap_or_default());
        let mut stmt = self.conn.prepare(&format!(
            "{FOOD_SELECT}
             WHERE f.name LIKE ?1 ESCAPE '\\'
               AND (?2 IS NULL OR f.category_id = ?2)
             ORDER BY c.name IS NULL, c.name, f.name
             LIMIT ?3"
        ))?;
        let foods = stmt
            .query_map(params![pattern, category_id, limit], Self::food_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    // --- Meal plans ---

    pub fn find_plan(&self, user_id: i64, date: NaiveDate) -> Result<Option<MealPlan>> {
        let plan = self
            .conn
            .query_row(
                &format!("{PLAN_SELECT} WHERE user_id = ?1 AND date = ?2"),
                params![user_id, date_str(date)],
                Self::plan_from_row,
            )
            .optional()?;
        Ok(plan)
    }

    pub fn get_plan(&self, user_id: i64, date: NaiveDate) -> Result<MealPlan> {
        self.find_plan(user_id, date)?
            .ok_or_else(|| Error::not_found(format!("Meal plan for {date}")))
    }

    pub fn get_or_create_plan(
        &self,
        user_id: i64,
        date: NaiveDate,
        defaults: &PlanDefaults,
    ) -> Result<(MealPlan, bool)> {
        validate_goal_calories(defaults.goal_calories)?;
        let now = Local::now().to_rfc3339();
        let created = self.conn.execute(
            "INSERT INTO meal_plans (uuid, user_id, date, goal_calories, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id, date) DO NOTHING",
            params![
                Uuid::new_v4().to_string(),
                user_id,
                date_str(date),
                defaults.goal_calories,
                defaults.notes,
                now,
                now,
            ],
        )? > 0;
        Ok((self.get_plan(user_id, date)?, created))
    }

    pub fn update_plan(
        &self,
        user_id: i64,
        date: NaiveDate,
        update: &UpdateMealPlan,
    ) -> Result<MealPlan> {
        let plan = self.get_plan(user_id, date)?;
        let now = Local::now().to_rfc3339();
        if let Some(goal) = update.goal_calories {
            validate_goal_calories(goal)?;
            self.conn.execute(
                "UPDATE meal_plans SET goal_calories = ?1, updated_at = ?2 WHERE id = ?3",
                params![goal, now, plan.id],
            )?;
        }
        if let Some(ref notes) = update.notes {
            self.conn.execute(
                "UPDATE meal_plans SET notes = ?1, updated_at = ?2 WHERE id = ?3",
                params![notes, now, plan.id],
            )?;
        }
        self.get_plan(user_id, date)
    }

    /// Most recent plans first.
    pub fn recent_plans(&self, user_id: i64, limit: i64) -> Result<Vec<MealPlan>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PLAN_SELECT} WHERE user_id = ?1 ORDER BY date DESC LIMIT ?2"
        ))?;
        let plans = stmt
            .query_map(params![user_id, limit], Self::plan_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    /// Plans dated within `start..=end`, oldest first.
    pub fn plans_between(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MealPlan>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PLAN_SELECT} WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3 ORDER BY date"
        ))?;
        let plans = stmt
            .query_map(
                params![user_id, date_str(start), date_str(end)],
                Self::plan_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    // --- Meal entries ---

    pub fn insert_entry(&self, entry: &NewMealEntry) -> Result<MealEntry> {
        validate_quantity(entry.quantity)?;
        self.get_food(entry.food_id)?;
        let plan_exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM meal_plans WHERE id = ?1)",
            params![entry.meal_plan_id],
            |row| row.get(0),
        )?;
        if !plan_exists {
            return Err(Error::not_found(format!(
                "Meal plan {}",
                entry.meal_plan_id
            )));
        }

        self.conn.execute(
            "INSERT INTO meal_entries (uuid, meal_plan_id, food_id, meal_slot, quantity, unit, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                Uuid::new_v4().to_string(),
                entry.meal_plan_id,
                entry.food_id,
                entry.meal_slot,
                entry.quantity,
                entry.unit,
                Local::now().to_rfc3339(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.conn
            .query_row(
                &format!("{ENTRY_SELECT} WHERE me.id = ?1"),
                params![id],
                Self::entry_from_row,
            )
            .or_not_found(|| format!("Meal entry {id}"))
    }

    pub fn find_entry(
        &self,
        plan_id: i64,
        food_id: i64,
        meal_slot: MealSlot,
    ) -> Result<Option<MealEntry>> {
        let entry = self
            .conn
            .query_row(
                &format!(
                    "{ENTRY_SELECT}
                     WHERE me.meal_plan_id = ?1 AND me.food_id = ?2 AND me.meal_slot = ?3
                     ORDER BY me.id LIMIT 1"
                ),
                params![plan_id, food_id, meal_slot],
                Self::entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn get_or_create_entry(&self, entry: &NewMealEntry) -> Result<(MealEntry, bool)> {
        if let Some(existing) = self.find_entry(entry.meal_plan_id, entry.food_id, entry.meal_slot)? {
            return Ok((existing, false));
        }
        Ok((self.insert_entry(entry)?, true))
    }

    /// An entry belonging to one of `user_id`'s plans.
    pub fn get_entry(&self, user_id: i64, id: i64) -> Result<MealEntry> {
        self.conn
            .query_row(
                &format!(
                    "{ENTRY_SELECT}
                     JOIN meal_plans mp ON me.meal_plan_id = mp.id
                     WHERE me.id = ?1 AND mp.user_id = ?2"
                ),
                params![id, user_id],
                Self::entry_from_row,
            )
            .or_not_found(|| format!("Meal entry {id}"))
    }

    pub fn plan_entries(&self, plan_id: i64) -> Result<Vec<MealEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT} WHERE me.meal_plan_id = ?1 ORDER BY me.created_at, me.id"
        ))?;
        let entries = stmt
            .query_map(params![plan_id], Self::entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn update_entry(
        &self,
        user_id: i64,
        id: i64,
        update: &UpdateMealEntry,
    ) -> Result<MealEntry> {
        // Ownership check
        self.get_entry(user_id, id)?;

        if let Some(quantity) = update.quantity {
            validate_quantity(quantity)?;
            self.conn.execute(
                "UPDATE meal_entries SET quantity = ?1 WHERE id = ?2",
                params![quantity, id],
            )?;
        }
        if let Some(unit) = update.unit {
            self.conn.execute(
                "UPDATE meal_entries SET unit = ?1 WHERE id = ?2",
                params![unit, id],
            )?;
        }
        if let Some(slot) = update.meal_slot {
            self.conn.execute(
                "UPDATE meal_entries SET meal_slot = ?1 WHERE id = ?2",
                params![slot, id],
            )?;
        }

        self.get_entry(user_id, id)
    }

    pub fn delete_entry(&self, user_id: i64, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM meal_entries
             WHERE id = ?1 AND meal_plan_id IN (SELECT id FROM meal_plans WHERE user_id = ?2)",
            params![id, user_id],
        )?;
        Ok(rows > 0)
    }

    // --- Recipes ---

    pub fn create_recipe(
        &self,
        user_id: i64,
        name: &str,
        description: &str,
    ) -> Result<RecipeTemplate> {
        validate_name("name", name)?;
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO recipes (uuid, user_id, name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Uuid::new_v4().to_string(),
                user_id,
                name.trim(),
                description,
                now,
                now
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_recipe(user_id, id)
    }

    pub fn get_recipe(&self, user_id: i64, id: i64) -> Result<RecipeTemplate> {
        self.conn
            .query_row(
                &format!("{RECIPE_SELECT} WHERE id = ?1 AND user_id = ?2"),
                params![id, user_id],
                Self::recipe_from_row,
            )
            .or_not_found(|| format!("Recipe {id}"))
    }

    pub fn find_recipe_by_name(&self, user_id: i64, name: &str) -> Result<Option<RecipeTemplate>> {
        let recipe = self
            .conn
            .query_row(
                &format!(
                    "{RECIPE_SELECT} WHERE user_id = ?1 AND LOWER(name) = LOWER(?2)
                     ORDER BY id LIMIT 1"
                ),
                params![user_id, name.trim()],
                Self::recipe_from_row,
            )
            .optional()?;
        Ok(recipe)
    }

    pub fn list_recipes(&self, user_id: i64) -> Result<Vec<RecipeTemplate>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RECIPE_SELECT} WHERE user_id = ?1 ORDER BY name, id"
        ))?;
        let recipes = stmt
            .query_map(params![user_id], Self::recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    pub fn delete_recipe(&self, user_id: i64, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM recipes WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(rows > 0)
    }

    /// Adds a food to a recipe. A food already in the recipe has its
    /// quantity, unit and note replaced instead.
    pub fn upsert_recipe_ingredient(
        &self,
        user_id: i64,
        ingredient: &NewRecipeIngredient,
    ) -> Result<RecipeIngredient> {
        let recipe = self.get_recipe(user_id, ingredient.recipe_id)?;
        validate_quantity(ingredient.quantity)?;
        self.get_food(ingredient.food_id)?;

        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO recipe_ingredients (uuid, recipe_id, food_id, quantity, unit, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(recipe_id, food_id) DO UPDATE SET
                quantity = excluded.quantity,
                unit = excluded.unit,
                note = excluded.note",
            params![
                Uuid::new_v4().to_string(),
                recipe.id,
                ingredient.food_id,
                ingredient.quantity,
                ingredient.unit,
                ingredient.note,
                now,
            ],
        )?;
        self.conn.execute(
            "UPDATE recipes SET updated_at = ?1 WHERE id = ?2",
            params![now, recipe.id],
        )?;

        self.conn
            .query_row(
                &format!("{INGREDIENT_SELECT} WHERE ri.recipe_id = ?1 AND ri.food_id = ?2"),
                params![recipe.id, ingredient.food_id],
                Self::ingredient_from_row,
            )
            .or_not_found(|| format!("Ingredient {} of recipe {}", ingredient.food_id, recipe.id))
    }

    pub fn remove_recipe_ingredient(
        &self,
        user_id: i64,
        recipe_id: i64,
        food_id: i64,
    ) -> Result<bool> {
        let recipe = self.get_recipe(user_id, recipe_id)?;
        let rows = self.conn.execute(
            "DELETE FROM recipe_ingredients WHERE recipe_id = ?1 AND food_id = ?2",
            params![recipe.id, food_id],
        )?;
        Ok(rows > 0)
    }

    pub fn recipe_ingredients(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>> {
        let mut stmt = self.conn.prepare(&format!(
            "{INGREDIENT_SELECT} WHERE ri.recipe_id = ?1 ORDER BY ri.id"
        ))?;
        let ingredients = stmt
            .query_map(params![recipe_id], Self::ingredient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ingredients)
    }

    // --- Transactions ---

    pub fn in_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }
}

impl Store for Database {
    fn food(&self, food_id: i64) -> Result<Food> {
        self.get_food(food_id)
    }

    fn find_plan(&self, user_id: i64, date: NaiveDate) -> Result<Option<MealPlan>> {
        Database::find_plan(self, user_id, date)
    }

    fn get_or_create_plan(
        &self,
        user_id: i64,
        date: NaiveDate,
        defaults: &PlanDefaults,
    ) -> Result<(MealPlan, bool)> {
        Database::get_or_create_plan(self, user_id, date, defaults)
    }

    fn plan_entries(&self, plan_id: i64) -> Result<Vec<MealEntry>> {
        Database::plan_entries(self, plan_id)
    }

    fn insert_entry(&self, entry: &NewMealEntry) -> Result<MealEntry> {
        Database::insert_entry(self, entry)
    }

    fn get_or_create_entry(&self, entry: &NewMealEntry) -> Result<(MealEntry, bool)> {
        Database::get_or_create_entry(self, entry)
    }

    fn recipe(&self, user_id: i64, recipe_id: i64) -> Result<RecipeTemplate> {
        self.get_recipe(user_id, recipe_id)
    }

    fn recipe_ingredients(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>> {
        Database::recipe_ingredients(self, recipe_id)
    }

    fn in_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        Database::in_transaction(self, f)
    }
}
