//! # Drinks
//!
//! A drink is a titled recipe. Titles and recipes validate on construction
//! and on deserialization, so a [`Drink`] held anywhere in the stack is
//! always well-formed.
//!
//! Request bodies may carry a recipe as a single ingredient object or as an
//! array; both normalise to a list.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum length of a drink title, in characters.
pub const MAX_TITLE_LEN: usize = 80;

/// Validated drink title.
///
/// Trimmed, non-empty, at most [`MAX_TITLE_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DrinkTitle(String);

impl DrinkTitle {
    /// Create a validated title.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let len = trimmed.chars().count();
        if len > MAX_TITLE_LEN {
            return Err(ValidationError::TitleTooLong {
                max: MAX_TITLE_LEN,
                actual: len,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Return the title as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DrinkTitle {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DrinkTitle> for String {
    fn from(title: DrinkTitle) -> Self {
        title.0
    }
}

impl std::fmt::Display for DrinkTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One component of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Ingredient name, e.g. "espresso".
    pub name: String,
    /// Display color used by the menu graphic.
    pub color: String,
    /// Relative proportion in the cup.
    pub parts: u32,
}

/// Wire form accepted for recipes: one ingredient or a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecipeRepr {
    Many(Vec<Ingredient>),
    One(Ingredient),
}

/// Non-empty, validated list of ingredients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecipeRepr", into = "Vec<Ingredient>")]
pub struct Recipe(Vec<Ingredient>);

impl Recipe {
    /// Create a validated recipe.
    ///
    /// Every ingredient needs a non-empty name and color and at least one part.
    pub fn new(ingredients: Vec<Ingredient>) -> Result<Self, ValidationError> {
        if ingredients.is_empty() {
            return Err(ValidationError::EmptyRecipe);
        }
        for (index, ingredient) in ingredients.iter().enumerate() {
            if ingredient.name.trim().is_empty() {
                return Err(ValidationError::EmptyIngredientField {
                    index,
                    field: "name",
                });
            }
            if ingredient.color.trim().is_empty() {
                return Err(ValidationError::EmptyIngredientField {
                    index,
                    field: "color",
                });
            }
            if ingredient.parts == 0 {
                return Err(ValidationError::ZeroParts { index });
            }
        }
        Ok(Self(ingredients))
    }

    /// The ingredients, in pour order.
    pub fn ingredients(&self) -> &[Ingredient] {
        &self.0
    }
}

impl TryFrom<RecipeRepr> for Recipe {
    type Error = ValidationError;

    fn try_from(repr: RecipeRepr) -> Result<Self, Self::Error> {
        match repr {
            RecipeRepr::Many(list) => Self::new(list),
            RecipeRepr::One(single) => Self::new(vec![single]),
        }
    }
}

impl From<Recipe> for Vec<Ingredient> {
    fn from(recipe: Recipe) -> Self {
        recipe.0
    }
}

/// A drink on the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drink {
    /// Server-assigned identifier.
    pub id: i64,
    /// Unique display title.
    pub title: DrinkTitle,
    /// How to make it.
    pub recipe: Recipe,
}

/// Ingredient as shown on the public menu: no name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortIngredient {
    /// Display color.
    pub color: String,
    /// Relative proportion.
    pub parts: u32,
}

/// Public menu view of a drink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortDrink {
    /// Drink identifier.
    pub id: i64,
    /// Drink title.
    pub title: String,
    /// Colors and proportions only.
    pub recipe: Vec<ShortIngredient>,
}

/// Staff view of a drink, including ingredient names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LongDrink {
    /// Drink identifier.
    pub id: i64,
    /// Drink title.
    pub title: String,
    /// Full recipe.
    pub recipe: Vec<Ingredient>,
}

impl Drink {
    /// Render the public menu view.
    pub fn short(&self) -> ShortDrink {
        ShortDrink {
            id: self.id,
            title: self.title.to_string(),
            recipe: self
                .recipe
                .ingredients()
                .iter()
                .map(|i| ShortIngredient {
                    color: i.color.clone(),
                    parts: i.parts,
                })
                .collect(),
        }
    }

    /// Render the staff view.
    pub fn long(&self) -> LongDrink {
        LongDrink {
            id: self.id,
            title: self.title.to_string(),
            recipe: self.recipe.ingredients().to_vec(),
        }
    }
}
