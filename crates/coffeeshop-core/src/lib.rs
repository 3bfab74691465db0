#![deny(missing_docs)]

//! # coffeeshop-core: Menu Domain Types
//!
//! Defines the single resource the coffee shop API serves: a [`Drink`] with a
//! validated [`DrinkTitle`] and a [`Recipe`] of [`Ingredient`]s.
//!
//! ## Views
//!
//! A drink is rendered in two shapes:
//!
//! - [`ShortDrink`] is the public menu. Ingredients expose only `color` and
//!   `parts`, enough to draw the cup without giving away the recipe.
//! - [`LongDrink`] is the staff view, with ingredient names.
//!
//! ## Crate Policy
//!
//! No HTTP, storage, or authorization concerns live here. Only `serde` and
//! `thiserror` from the external ecosystem.

pub mod drink;
pub mod error;

pub use drink::{Drink, DrinkTitle, Ingredient, LongDrink, Recipe, ShortDrink, ShortIngredient};
pub use error::ValidationError;
