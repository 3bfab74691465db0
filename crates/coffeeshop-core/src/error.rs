//! # Validation Errors
//!
//! Raised when a drink title or recipe violates the menu's constraints.
//! Messages are safe to return to API clients verbatim.

use thiserror::Error;

/// Validation errors for drink titles and recipes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Title is empty or whitespace.
    #[error("title must not be empty")]
    EmptyTitle,

    /// Title exceeds the maximum length.
    #[error("title must not exceed {max} characters (got {actual})")]
    TitleTooLong {
        /// Maximum permitted length.
        max: usize,
        /// Length of the rejected title.
        actual: usize,
    },

    /// Recipe has no ingredients.
    #[error("recipe must contain at least one ingredient")]
    EmptyRecipe,

    /// An ingredient has an empty `name` or `color`.
    #[error("ingredient {index}: {field} must not be empty")]
    EmptyIngredientField {
        /// Position of the ingredient in the recipe.
        index: usize,
        /// Name of the empty field.
        field: &'static str,
    },

    /// An ingredient has zero parts.
    #[error("ingredient {index}: parts must be at least 1")]
    ZeroParts {
        /// Position of the ingredient in the recipe.
        index: usize,
    },
}
