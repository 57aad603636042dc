use crate::recipe::{Alternatives, Ingredient, Meta, Recipe};

/// Adaptation axes, listed in substitution priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Vegan,
    GlutenFree,
    Vegetarian,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [
        Dimension::Vegan,
        Dimension::GlutenFree,
        Dimension::Vegetarian,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Dimension::Vegan => "vegan",
            Dimension::GlutenFree => "glutenFree",
            Dimension::Vegetarian => "vegetarian",
        }
    }

    pub fn from_key(key: &str) -> Option<Dimension> {
        Dimension::ALL.into_iter().find(|d| d.key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Vegan => "Vegan",
            Dimension::GlutenFree => "Gluten-free",
            Dimension::Vegetarian => "Vegetarian",
        }
    }
}

impl Meta {
    pub fn inherently(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Vegan => self.inherently_vegan,
            Dimension::GlutenFree => self.inherently_gluten_free,
            Dimension::Vegetarian => self.inherently_vegetarian,
        }
    }

    pub fn adaptably(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Vegan => self.adaptable_vegan,
            Dimension::GlutenFree => self.adaptable_gluten_free,
            Dimension::Vegetarian => self.adaptable_vegetarian,
        }
    }
}

impl Alternatives {
    /// Empty names count as no alternative.
    pub fn get(&self, dimension: Dimension) -> Option<&str> {
        let name = match dimension {
            Dimension::Vegan => self.vegan.as_deref(),
            Dimension::GlutenFree => self.gluten_free.as_deref(),
            Dimension::Vegetarian => self.vegetarian.as_deref(),
        };
        name.filter(|name| !name.is_empty())
    }
}

impl Ingredient {
    pub fn alternative(&self, dimension: Dimension) -> Option<&str> {
        self.alternatives.as_ref().and_then(|alt| alt.get(dimension))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkbox {
    pub dimension: Dimension,
    pub checked: bool,
    pub enabled: bool,
    pub adaptable: bool,
}

impl Checkbox {
    pub fn label(&self) -> String {
        if self.adaptable {
            format!("{} (adaptable)", self.dimension.label())
        } else {
            self.dimension.label().to_string()
        }
    }
}

/// Checkboxes shown for a recipe, in their initial state.
pub fn checkboxes(recipe: &Recipe) -> Vec<Checkbox> {
    let meta = recipe.meta.unwrap_or_default();
    Dimension::ALL
        .into_iter()
        .filter(|&d| {
            meta.inherently(d)
                || meta.adaptably(d)
                || recipe.ingredients.iter().any(|ing| ing.alternative(d).is_some())
        })
        .map(|d| {
            let inherent = meta.inherently(d);
            Checkbox {
                dimension: d,
                checked: inherent,
                enabled: !inherent,
                adaptable: !inherent && meta.adaptably(d),
            }
        })
        .collect()
}

/// Which dimensions are currently ticked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    vegan: bool,
    gluten_free: bool,
    vegetarian: bool,
}

impl Selection {
    pub fn from_checkboxes(boxes: &[Checkbox]) -> Self {
        let mut selection = Selection::default();
        for checkbox in boxes {
            selection.set(checkbox.dimension, checkbox.checked);
        }
        selection
    }

    pub fn is_checked(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Vegan => self.vegan,
            Dimension::GlutenFree => self.gluten_free,
            Dimension::Vegetarian => self.vegetarian,
        }
    }

    pub fn set(&mut self, dimension: Dimension, checked: bool) {
        match dimension {
            Dimension::Vegan => self.vegan = checked,
            Dimension::GlutenFree => self.gluten_free = checked,
            Dimension::Vegetarian => self.vegetarian = checked,
        }
    }
}

/// First checked dimension with an alternative wins, otherwise the ingredient's own name.
pub fn display_name<'a>(ingredient: &'a Ingredient, selection: &Selection) -> &'a str {
    Dimension::ALL
        .into_iter()
        .filter(|&d| selection.is_checked(d))
        .find_map(|d| ingredient.alternative(d))
        .unwrap_or(ingredient.name.as_str())
}
