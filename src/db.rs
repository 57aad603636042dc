use rand::seq::SliceRandom;
use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::LoadError;
use crate::recipe::Recipe;

/// Read-only recipe collection, indexed in an in-memory SQLite database the
/// first time a view asks for it.
pub struct RecipeStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

/// Decodes the collection file. Items that are not valid recipes are logged and skipped.
pub fn parse_recipes(json_str: &str) -> Result<Vec<Recipe>, LoadError> {
    let data: serde_json::Value = serde_json::from_str(json_str)?;
    let Some(arr) = data.as_array() else {
        return Err(LoadError::NotAnArray);
    };

    let mut recipes = Vec::with_capacity(arr.len());
    for obj in arr {
        let recipe = match serde_json::from_value::<Recipe>(obj.clone()) {
            Ok(recipe) => recipe,
            Err(e) => {
                log::error!("Wrongly set recipe {}: {}", obj, e);
                continue;
            }
        };
        if !(recipe.base_servings.is_finite() && recipe.base_servings > 0.0) {
            log::error!(
                "Recipe {:?} has invalid baseServings {}, skipping it",
                recipe.id,
                recipe.base_servings
            );
            continue;
        }
        recipes.push(recipe);
    }
    Ok(recipes)
}

/// Indexes `recipes` in insertion order. A repeated id keeps its first occurrence.
pub fn fill_db(conn: &Connection, recipes: &[Recipe]) -> Result<usize, LoadError> {
    conn.execute(
        "CREATE TABLE recipes (
            position INTEGER PRIMARY KEY,
            id TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            body TEXT NOT NULL
        )",
        (),
    )?;

    let mut inserted = 0;
    for recipe in recipes {
        log::debug!("Adding {:?} to db", recipe.id);
        let body = serde_json::to_string(recipe)?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO recipes (id, title, body) VALUES (?1, ?2, ?3)",
            (&recipe.id, &recipe.title, &body),
        )?;
        if changed == 0 {
            log::warn!("Duplicate recipe id {:?}, keeping the first one", recipe.id);
        }
        inserted += changed;
    }
    Ok(inserted)
}

fn open_db(path: &Path) -> Result<Connection, LoadError> {
    let json_str = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let recipes = parse_recipes(&json_str)?;
    let conn = Connection::open_in_memory()?;
    let count = fill_db(&conn, &recipes)?;
    log::info!("Loaded {} recipes from {:?}", count, path);
    Ok(conn)
}

impl RecipeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RecipeStore {
            path: path.into(),
            conn: Mutex::new(None),
        }
    }

    /// Runs `f` against the index, loading the file first if no view has
    /// managed to yet. A failed load leaves the store empty for the next view.
    fn with_db<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, LoadError>,
    ) -> Result<T, LoadError> {
        let mut guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let conn = match guard.take() {
            Some(conn) => conn,
            None => open_db(&self.path)?,
        };
        let result = f(&conn);
        *guard = Some(conn);
        result
    }

    /// `(id, title)` pairs in collection order.
    pub fn fetch_catalog(&self) -> Result<Vec<(String, String)>, LoadError> {
        self.with_db(|db| {
            let mut stmt = db.prepare("SELECT id, title FROM recipes ORDER BY position")?;
            let rows = stmt
                .query_map((), |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn fetch_recipe_from_id(&self, id: &str) -> Result<Option<Recipe>, LoadError> {
        let body: Option<String> = self.with_db(|db| {
            Ok(db
                .query_row("SELECT body FROM recipes WHERE id = ?1", (id,), |row| {
                    row.get(0)
                })
                .optional()?)
        })?;
        let recipe = match body {
            Some(body) => Some(serde_json::from_str(&body)?),
            None => None,
        };
        log::debug!("Fetched recipe {:?}: found={}", id, recipe.is_some());
        Ok(recipe)
    }

    /// Picks a recipe whose id is not in `seen`, `None` once all were seen.
    pub fn fetch_random_recipe(&self, seen: &[String]) -> Result<Option<Recipe>, LoadError> {
        let ids: Vec<String> = self.with_db(|db| {
            let mut stmt = db.prepare("SELECT id FROM recipes")?;
            let ids = stmt
                .query_map((), |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(ids)
        })?;
        let candidates: Vec<&String> = ids.iter().filter(|id| !seen.contains(*id)).collect();
        match candidates.choose(&mut rand::thread_rng()) {
            Some(id) => self.fetch_recipe_from_id(id),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const COLLECTION: &str = r#"[
        {"id": "a", "title": "Apple pie", "baseServings": 8, "ingredients": [], "instructions": ""},
        {"id": "ab", "title": "Aubergine bake", "baseServings": 4, "ingredients": [], "instructions": ""},
        {"id": "1", "title": "Soup", "baseServings": 2,
         "ingredients": [{"name": "Water", "quantity": 4, "unit": "cup"}],
         "instructions": "Boil.\nServe."}
    ]"#;

    fn store_with(content: &str) -> (NamedTempFile, RecipeStore) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let store = RecipeStore::new(file.path());
        (file, store)
    }

    #[test]
    fn test_catalog_in_insertion_order() {
        let (_file, store) = store_with(COLLECTION);
        let titles: Vec<String> = store
            .fetch_catalog()
            .unwrap()
            .into_iter()
            .map(|(_, title)| title)
            .collect();
        assert_eq!(titles, ["Apple pie", "Aubergine bake", "Soup"]);
    }

    #[test]
    fn test_empty_collection() {
        let (_file, store) = store_with("[]");
        assert!(store.fetch_catalog().unwrap().is_empty());
        assert_eq!(store.fetch_recipe_from_id("1").unwrap(), None);
    }

    #[test]
    fn test_lookup_is_exact_match() {
        let (_file, store) = store_with(COLLECTION);
        let recipe = store.fetch_recipe_from_id("a").unwrap().unwrap();
        assert_eq!(recipe.title, "Apple pie");
        assert_eq!(store.fetch_recipe_from_id("A").unwrap(), None);
        assert_eq!(store.fetch_recipe_from_id("99").unwrap(), None);
        assert_eq!(store.fetch_recipe_from_id("").unwrap(), None);
    }

    #[test]
    fn test_recipe_survives_the_index() {
        let (_file, store) = store_with(COLLECTION);
        let soup = store.fetch_recipe_from_id("1").unwrap().unwrap();
        assert_eq!(soup.instructions, "Boil.\nServe.");
        assert_eq!(soup.base_servings, 2.0);
        assert_eq!(soup.ingredients[0].unit.as_deref(), Some("cup"));
    }

    #[test]
    fn test_duplicate_id_keeps_first() {
        let (_file, store) = store_with(
            r#"[
                {"id": "x", "title": "First", "baseServings": 1},
                {"id": "x", "title": "Second", "baseServings": 1}
            ]"#,
        );
        assert_eq!(store.fetch_catalog().unwrap().len(), 1);
        assert_eq!(store.fetch_recipe_from_id("x").unwrap().unwrap().title, "First");
    }

    #[test]
    fn test_invalid_items_are_skipped() {
        let recipes = parse_recipes(
            r#"[
                {"id": "ok", "title": "Fine", "baseServings": 2},
                {"id": "zero", "title": "Zero", "baseServings": 0},
                {"id": 7, "title": "Numeric id", "baseServings": 2},
                {"title": "No id", "baseServings": 2}
            ]"#,
        )
        .unwrap();
        let ids: Vec<&str> = recipes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["ok"]);
    }

    #[test]
    fn test_not_an_array() {
        assert!(matches!(
            parse_recipes(r#"{"id": "a"}"#),
            Err(LoadError::NotAnArray)
        ));
        assert!(matches!(parse_recipes("not json"), Err(LoadError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecipeStore::new(dir.path().join("recipes.json"));
        assert!(matches!(store.fetch_catalog(), Err(LoadError::Read { .. })));
        assert!(matches!(
            store.fetch_recipe_from_id("1"),
            Err(LoadError::Read { .. })
        ));
    }

    #[test]
    fn test_failed_load_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipes.json");
        let store = RecipeStore::new(&path);
        assert!(store.fetch_catalog().is_err());

        std::fs::write(&path, COLLECTION).unwrap();
        assert_eq!(store.fetch_catalog().unwrap().len(), 3);
    }

    #[test]
    fn test_shipped_collection_loads() {
        let store = RecipeStore::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data/recipes.json"));
        let ids: Vec<String> = store
            .fetch_catalog()
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, ["pancakes", "lentil-soup", "carbonara"]);
    }

    #[test]
    fn test_random_excludes_seen() {
        let (_file, store) = store_with(COLLECTION);
        let seen = vec!["a".to_string(), "1".to_string()];
        for _ in 0..10 {
            let recipe = store.fetch_random_recipe(&seen).unwrap().unwrap();
            assert_eq!(recipe.id, "ab");
        }
        let all = vec!["a".to_string(), "ab".to_string(), "1".to_string()];
        assert_eq!(store.fetch_random_recipe(&all).unwrap(), None);
    }
}
