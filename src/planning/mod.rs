//! From the household attendance grid to per-recipe portions and gram targets.

pub mod grid;
pub mod rescale;
pub mod targets;

pub use grid::{AttendanceGrid, Day, Meal, Needs, Profile, Slot};
pub use rescale::{rescale_recipe, RescaleRatios};
pub use targets::{derive_targets, required_grams, split_into_buckets, RecipeTargetRequest};
