use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::nutritional_matcher::{pick_main_by_type, sum_fats_and_sauces, FoodType, Macros, VEG_FALLBACK};
use crate::planning::Profile;
use crate::recipe_parser::Recipe;

/// Display figures for one person over all their servings of a recipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonNutrition {
    /// Whole kilocalories.
    pub kcal: f64,
    pub protein_g: f64,
    pub carbohydrate_g: f64,
    pub fat_g: f64,
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl PersonNutrition {
    fn from_macros(m: Macros) -> Self {
        Self {
            kcal: m.kcal.max(0.0).round(),
            protein_g: round_tenth(m.protein_g.max(0.0)),
            carbohydrate_g: round_tenth(m.carbohydrate_g.max(0.0)),
            fat_g: round_tenth(m.fat_g.max(0.0)),
        }
    }

    /// Figures for a single meal, given how many servings the totals cover.
    pub fn per_meal(&self, servings: u32) -> PersonNutrition {
        let n = f64::from(servings.max(1));
        Self {
            kcal: (self.kcal / n).round(),
            protein_g: round_tenth(self.protein_g / n),
            carbohydrate_g: round_tenth(self.carbohydrate_g / n),
            fat_g: round_tenth(self.fat_g / n),
        }
    }
}

/// Recomputes realistic nutrition per active profile from the recipe's
/// ingredients and each profile's needs.
///
/// The heaviest carb, protein and vegetable ingredients stand in for their
/// category; the person's grams of each category are priced at that
/// ingredient's rates. Fats and sauces form one pool shared across the
/// recipe's servings.
///
/// # Arguments
/// * `recipe`: the generated recipe.
/// * `active_profiles`: profiles to report on, in display order.
///
/// # Returns
/// A map from profile name to rounded totals. Profiles without servings in
/// the recipe report zeros.
pub fn compute_per_person_nutrition(recipe: &Recipe, active_profiles: &[Profile]) -> IndexMap<String, PersonNutrition> {
    let carb = pick_main_by_type(&recipe.ingredients, FoodType::Carb).map(|e| e.per_100);
    let prot = pick_main_by_type(&recipe.ingredients, FoodType::Prot).map(|e| e.per_100);
    let veg = pick_main_by_type(&recipe.ingredients, FoodType::Veg).map_or(VEG_FALLBACK, |e| e.per_100);
    let pool = sum_fats_and_sauces(&recipe.ingredients);

    let total_parts = recipe.portions.values().map(|v| f64::from(*v)).sum::<f64>();
    let total_parts = if total_parts > 0.0 { total_parts } else { 1.0 };

    debug!(
        "Nutrition for '{}': carb={}, prot={}, pool={:.0} kcal over {} part(s)",
        recipe.title,
        carb.is_some(),
        prot.is_some(),
        pool.kcal,
        total_parts
    );

    active_profiles
        .iter()
        .map(|p| {
            let servings = recipe.portions.get(&p.name).copied().unwrap_or(0);
            if servings == 0 {
                return (p.name.clone(), PersonNutrition::default());
            }
            let n = f64::from(servings);
            let grams_g = f64::from(p.needs.carbohydrate_g) * n;
            let grams_p = f64::from(p.needs.protein_g) * n;
            let grams_v = f64::from(p.needs.vegetable_g) * n;

            let from_carb = carb.map_or(Macros::default(), |m| m.for_grams(grams_g));
            let from_prot = prot.map_or(Macros::default(), |m| m.for_grams(grams_p));
            let from_veg = veg.for_grams(grams_v);
            // Each person's weight cancels out: every serving in the recipe
            // takes the same slice of the pool.
            let share = 1.0 / total_parts;
            let from_pool = pool * share;

            (
                p.name.clone(),
                PersonNutrition::from_macros(from_carb + from_prot + from_veg + from_pool),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::Needs;
    use crate::recipe_parser::{Ingredient, Portions};

    fn ing(name: &str, qty: f64, unit: &str) -> Ingredient {
        Ingredient {
            name: name.to_string(),
            qty: Some(qty),
            unit: unit.to_string(),
        }
    }

    fn profiles() -> Vec<Profile> {
        vec![
            Profile::new("Thomas", Needs::new(100, 200, 150)),
            Profile::new("Anaïs", Needs::new(50, 100, 250)),
        ]
    }

    fn portions(t: u32, a: u32) -> Portions {
        [("Thomas".to_string(), t), ("Anaïs".to_string(), a)].into_iter().collect()
    }

    #[test]
    fn test_single_person_without_pool() {
        let recipe = Recipe {
            portions: portions(1, 0),
            ingredients: vec![
                ing("Riz", 100.0, "g"),
                ing("Poulet", 200.0, "g"),
                ing("Brocoli", 150.0, "g"),
            ],
            ..Default::default()
        };
        let out = compute_per_person_nutrition(&recipe, &profiles());
        let thomas = out["Thomas"];
        // riz 100 g: 350 kcal; poulet 200 g: 240 kcal; brocoli 150 g: 51 kcal
        assert_eq!(thomas.kcal, 641.0);
        assert_eq!(thomas.carbohydrate_g, 88.5);
        assert_eq!(thomas.protein_g, 57.2);
        assert_eq!(thomas.fat_g, 4.6);
        assert_eq!(out["Anaïs"], PersonNutrition::default());
    }

    #[test]
    fn test_veg_fallback_when_no_vegetable() {
        let recipe = Recipe {
            portions: portions(0, 1),
            ingredients: vec![ing("Courge butternut", 300.0, "g")],
            ..Default::default()
        };
        let out = compute_per_person_nutrition(&recipe, &profiles());
        let anais = out["Anaïs"];
        // 250 g of fallback vegetable: 75 kcal, 12.5 g carbs, 5 g protein, 0.5 g fat
        assert_eq!(anais.kcal, 75.0);
        assert_eq!(anais.carbohydrate_g, 12.5);
        assert_eq!(anais.protein_g, 5.0);
        assert_eq!(anais.fat_g, 0.5);
    }

    #[test]
    fn test_fat_pool_split_by_total_parts() {
        let recipe = Recipe {
            portions: portions(3, 1),
            ingredients: vec![ing("Huile d'olive", 100.0, "ml"), ing("Brocoli", 1.0, "g")],
            ..Default::default()
        };
        let profiles = vec![
            Profile::new("Thomas", Needs::new(0, 0, 0)),
            Profile::new("Anaïs", Needs::new(0, 0, 0)),
        ];
        let out = compute_per_person_nutrition(&recipe, &profiles);
        // 92 g oil = 828 kcal, 92 g fat; four parts in total
        assert_eq!(out["Thomas"].kcal, 207.0);
        assert_eq!(out["Anaïs"].kcal, 207.0);
        assert_eq!(out["Thomas"].fat_g, 23.0);
    }

    #[test]
    fn test_per_meal_divides_by_servings() {
        let totals = PersonNutrition {
            kcal: 1500.0,
            protein_g: 100.0,
            carbohydrate_g: 150.5,
            fat_g: 30.0,
        };
        let meal = totals.per_meal(3);
        assert_eq!(meal.kcal, 500.0);
        assert_eq!(meal.protein_g, 33.3);
        assert_eq!(meal.carbohydrate_g, 50.2);
        assert_eq!(totals.per_meal(0), totals);
    }

    #[test]
    fn test_empty_recipe_is_zero() {
        let out = compute_per_person_nutrition(&Recipe::default(), &profiles());
        assert_eq!(out.len(), 2);
        assert!(out.values().all(|n| *n == PersonNutrition::default()));
    }

    #[test]
    fn test_all_values_non_negative() {
        let recipe = Recipe {
            portions: portions(2, 2),
            ingredients: vec![ing("Riz", -50.0, "g"), ing("Thon", 300.0, "g")],
            ..Default::default()
        };
        let out = compute_per_person_nutrition(&recipe, &profiles());
        for n in out.values() {
            assert!(n.kcal >= 0.0 && n.protein_g >= 0.0 && n.carbohydrate_g >= 0.0 && n.fat_g >= 0.0);
        }
    }
}
