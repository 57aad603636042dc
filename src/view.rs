use thiserror::Error;

use crate::callback;
use crate::dietary::{self, Checkbox, Dimension, Selection};
use crate::recipe::{format_number, Recipe};
use crate::scaling::{ingredient_line, resolve_servings, scale_factor};

pub const NOT_FOUND: &str = "Recipe not found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub title: String,
    pub link: String,
}

/// Catalog entries in collection order, each linking to its detail view.
pub fn catalog_entries<I>(rows: I) -> Vec<CatalogEntry>
where
    I: IntoIterator<Item = (String, String)>,
{
    rows.into_iter()
        .map(|(id, title)| CatalogEntry {
            link: callback::detail_link(&id),
            title,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ToggleError {
    #[error("{} is inherent to this recipe and cannot be changed", .0.label())]
    Locked(Dimension),
    #[error("{} is not offered for this recipe", .0.label())]
    Hidden(Dimension),
}

/// Result of resolving a requested id against the collection.
#[derive(Debug, Clone)]
pub enum Detail {
    NotFound,
    Found(DetailView),
}

impl From<Option<Recipe>> for Detail {
    fn from(recipe: Option<Recipe>) -> Self {
        match recipe {
            Some(recipe) => Detail::Found(DetailView::new(recipe)),
            None => Detail::NotFound,
        }
    }
}

/// One open recipe: the servings input and checkbox states the ingredient
/// list was last rendered from.
#[derive(Debug, Clone)]
pub struct DetailView {
    recipe: Recipe,
    servings_input: String,
    checkboxes: Vec<Checkbox>,
    ingredients: Vec<String>,
}

impl DetailView {
    pub fn new(recipe: Recipe) -> Self {
        let mut view = DetailView {
            servings_input: format_number(recipe.base_servings),
            checkboxes: dietary::checkboxes(&recipe),
            recipe,
            ingredients: Vec::new(),
        };
        view.render_ingredients();
        view
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn servings_input(&self) -> &str {
        &self.servings_input
    }

    pub fn servings(&self) -> f64 {
        resolve_servings(Some(&self.servings_input), self.recipe.base_servings)
    }

    pub fn checkboxes(&self) -> &[Checkbox] {
        &self.checkboxes
    }

    pub fn ingredient_lines(&self) -> &[String] {
        &self.ingredients
    }

    pub fn on_servings_input(&mut self, input: &str) {
        self.servings_input = input.to_string();
        self.render_ingredients();
    }

    /// Moves the servings control by `delta`, never below 1.
    pub fn step_servings(&mut self, delta: f64) {
        let next = (self.servings() + delta).max(1.0);
        self.on_servings_input(&format_number(next));
    }

    pub fn on_dietary_change(
        &mut self,
        dimension: Dimension,
        checked: bool,
    ) -> Result<(), ToggleError> {
        let checkbox = self
            .checkboxes
            .iter_mut()
            .find(|c| c.dimension == dimension)
            .ok_or(ToggleError::Hidden(dimension))?;
        if !checkbox.enabled {
            return Err(ToggleError::Locked(dimension));
        }
        checkbox.checked = checked;
        self.render_ingredients();
        Ok(())
    }

    /// Flips an enabled checkbox and returns its new state.
    pub fn toggle(&mut self, dimension: Dimension) -> Result<bool, ToggleError> {
        let checked = !Selection::from_checkboxes(&self.checkboxes).is_checked(dimension);
        self.on_dietary_change(dimension, checked)?;
        Ok(checked)
    }

    fn render_ingredients(&mut self) {
        let factor = scale_factor(self.servings(), self.recipe.base_servings);
        let selection = Selection::from_checkboxes(&self.checkboxes);
        log::debug!(
            "Rendering {} ingredients of {:?} with factor {}",
            self.recipe.ingredients.len(),
            self.recipe.id,
            factor
        );
        self.ingredients = self
            .recipe
            .ingredients
            .iter()
            .map(|ing| ingredient_line(ing, factor, &selection))
            .collect();
    }
}
