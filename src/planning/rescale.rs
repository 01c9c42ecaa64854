//! Linear rescale of a recipe after its per-person portions are edited.
//!
//! Quantities are scaled by the ratio of required grams in the ingredient's
//! category. This is an approximation: it keeps the recipe's proportions and
//! does not re-derive nutrition.

use serde::Serialize;
use tracing::debug;

use super::grid::Profile;
use super::targets::required_grams;
use crate::nutritional_matcher::{find_entry, FoodType};
use crate::recipe_parser::{Portions, Recipe};

/// Multipliers applied per ingredient category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RescaleRatios {
    pub carbohydrate: f64,
    pub protein: f64,
    pub vegetable: f64,
    /// Mean of the three category ratios, used for fats and sauces.
    pub fat: f64,
}

impl RescaleRatios {
    fn for_type(&self, food_type: FoodType) -> f64 {
        match food_type {
            FoodType::Carb => self.carbohydrate,
            FoodType::Prot => self.protein,
            FoodType::Veg => self.vegetable,
            FoodType::Fat | FoodType::Sauce => self.fat,
        }
    }
}

/// No scaling when either side has no demand for the category.
fn ratio(old: u32, new: u32) -> f64 {
    if old > 0 && new > 0 {
        f64::from(new) / f64::from(old)
    } else {
        1.0
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Applies edited portions to a recipe in place.
///
/// Entries of `new_portions` overwrite the recipe's current ones; names not
/// mentioned keep their count. Ingredient quantities are multiplied by the
/// ratio of their category and rounded to one decimal; untyped ingredients
/// and absent quantities are left alone. `macros_targets` is replaced by the
/// grams the new portions require.
///
/// # Arguments
/// * `recipe`: the recipe being edited.
/// * `new_portions`: edited serving counts by profile name.
/// * `active_profiles`: profiles whose needs drive the targets.
pub fn rescale_recipe(recipe: &mut Recipe, new_portions: &Portions, active_profiles: &[Profile]) -> RescaleRatios {
    let old_portions = recipe.portions.clone();
    let mut merged = old_portions.clone();
    for (name, count) in new_portions {
        merged.insert(name.clone(), *count);
    }

    let old = required_grams(active_profiles, &old_portions);
    let new = required_grams(active_profiles, &merged);

    let carbohydrate = ratio(old.carbohydrate_g, new.carbohydrate_g);
    let protein = ratio(old.protein_g, new.protein_g);
    let vegetable = ratio(old.vegetable_g, new.vegetable_g);
    let ratios = RescaleRatios {
        carbohydrate,
        protein,
        vegetable,
        fat: (carbohydrate + protein + vegetable) / 3.0,
    };
    debug!("Rescaling '{}' with {:?}", recipe.title, ratios);

    for ingredient in &mut recipe.ingredients {
        let Some(qty) = ingredient.qty else {
            continue;
        };
        let Some(e) = find_entry(&ingredient.name) else {
            continue;
        };
        ingredient.qty = Some(round_tenth(qty * ratios.for_type(e.food_type)));
    }

    recipe.portions = merged;
    recipe.macros_targets = Some(new);
    ratios
}
