use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul};
use unicode_normalization::UnicodeNormalization;

use crate::recipe_parser::Ingredient;

/// Macro-nutrient category an ingredient falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodType {
    Carb,
    Prot,
    Veg,
    Fat,
    Sauce,
}

impl FoodType {
    /// Fats and sauces are pooled across the whole recipe instead of being
    /// split by per-person needs.
    pub fn is_shared_pool(self) -> bool {
        matches!(self, FoodType::Fat | FoodType::Sauce)
    }
}

/// Energy and macro amounts, either per 100 g/ml (table rates) or absolute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub kcal: f64,
    pub carbohydrate_g: f64,
    pub protein_g: f64,
    pub fat_g: f64,
}

impl Macros {
    pub const fn new(kcal: f64, carbohydrate_g: f64, protein_g: f64, fat_g: f64) -> Self {
        Self {
            kcal,
            carbohydrate_g,
            protein_g,
            fat_g,
        }
    }

    /// Absolute amounts for `grams` of a food whose rates are per 100 units.
    pub fn for_grams(&self, grams: f64) -> Macros {
        *self * (grams / 100.0)
    }
}

impl Add for Macros {
    type Output = Macros;

    fn add(self, rhs: Macros) -> Macros {
        Macros {
            kcal: self.kcal + rhs.kcal,
            carbohydrate_g: self.carbohydrate_g + rhs.carbohydrate_g,
            protein_g: self.protein_g + rhs.protein_g,
            fat_g: self.fat_g + rhs.fat_g,
        }
    }
}

impl AddAssign for Macros {
    fn add_assign(&mut self, rhs: Macros) {
        *self = *self + rhs;
    }
}

impl Mul<f64> for Macros {
    type Output = Macros;

    fn mul(self, factor: f64) -> Macros {
        Macros {
            kcal: self.kcal * factor,
            carbohydrate_g: self.carbohydrate_g * factor,
            protein_g: self.protein_g * factor,
            fat_g: self.fat_g * factor,
        }
    }
}

/// One row of the reference table. `key` is matched as a substring of the
/// normalized ingredient name.
#[derive(Debug, Clone, PartialEq)]
pub struct NutritionEntry {
    pub key: &'static str,
    pub per_100: Macros,
    pub food_type: FoodType,
    /// Grams per millilitre, when the food is usually measured by volume.
    pub ml_to_g: Option<f64>,
}

const fn entry(key: &'static str, kcal: f64, c: f64, p: f64, f: f64, food_type: FoodType) -> NutritionEntry {
    NutritionEntry {
        key,
        per_100: Macros::new(kcal, c, p, f),
        food_type,
        ml_to_g: None,
    }
}

/// Ordered reference table; the first entry whose key is contained in the
/// normalized name wins.
pub static NUTRITION_TABLE: &[NutritionEntry] = &[
    entry("riz", 350.0, 78.0, 7.0, 1.0, FoodType::Carb),
    entry("quinoa", 368.0, 64.0, 14.0, 6.0, FoodType::Carb),
    entry("pates", 350.0, 70.0, 12.0, 2.0, FoodType::Carb),
    entry("boulgour", 342.0, 76.0, 12.0, 1.0, FoodType::Carb),
    entry("semoule", 360.0, 73.0, 12.0, 1.0, FoodType::Carb),
    entry("pommes de terre", 77.0, 17.0, 2.0, 0.1, FoodType::Carb),
    entry("patate douce", 86.0, 20.0, 1.6, 0.1, FoodType::Carb),
    entry("pain", 265.0, 49.0, 9.0, 3.2, FoodType::Carb),
    // dry weight
    entry("lentil", 353.0, 63.0, 25.0, 1.1, FoodType::Carb),
    entry("pois chiche", 364.0, 61.0, 19.0, 6.0, FoodType::Carb),
    entry("haricots rouges", 333.0, 60.0, 24.0, 1.2, FoodType::Carb),
    entry("poulet", 120.0, 0.0, 23.0, 1.5, FoodType::Prot),
    entry("dinde", 135.0, 0.0, 29.0, 1.0, FoodType::Prot),
    entry("boeuf", 158.0, 0.0, 21.0, 8.0, FoodType::Prot),
    entry("porc", 180.0, 0.0, 20.0, 11.0, FoodType::Prot),
    entry("saumon", 208.0, 0.0, 20.0, 13.0, FoodType::Prot),
    entry("thon", 144.0, 0.0, 23.0, 5.0, FoodType::Prot),
    entry("tofu", 76.0, 1.9, 8.0, 4.8, FoodType::Prot),
    entry("oeuf", 155.0, 1.1, 13.0, 11.0, FoodType::Prot),
    entry("brocoli", 34.0, 7.0, 2.8, 0.4, FoodType::Veg),
    entry("courgette", 17.0, 3.1, 1.2, 0.3, FoodType::Veg),
    entry("poivron", 31.0, 6.0, 1.0, 0.3, FoodType::Veg),
    entry("tomate", 18.0, 3.9, 0.9, 0.2, FoodType::Veg),
    entry("epinard", 23.0, 3.6, 2.9, 0.4, FoodType::Veg),
    entry("oignon", 40.0, 9.0, 1.1, 0.1, FoodType::Veg),
    entry("carotte", 41.0, 10.0, 0.9, 0.2, FoodType::Veg),
    NutritionEntry {
        key: "huile",
        per_100: Macros::new(900.0, 0.0, 0.0, 100.0),
        food_type: FoodType::Fat,
        ml_to_g: Some(0.92),
    },
    entry("beurre", 717.0, 0.5, 0.9, 81.0, FoodType::Fat),
    entry("lait de coco", 230.0, 3.0, 2.0, 24.0, FoodType::Fat),
    entry("soja", 60.0, 5.0, 6.0, 0.0, FoodType::Sauce),
];

/// Tomato sauces that no table key covers.
static SAUCE_VEG_ENTRY: NutritionEntry = entry("coulis", 30.0, 5.0, 2.0, 0.2, FoodType::Veg);

/// Rates used for the vegetable share when a recipe has no recognizable vegetable.
pub const VEG_FALLBACK: Macros = Macros::new(30.0, 5.0, 2.0, 0.2);

/// Lower-cases, strips combining diacritics and expands the `œ`/`æ` ligatures.
pub fn normalize_text(text: &str) -> String {
    let stripped: String = text
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect();
    stripped
        .replace('œ', "oe")
        .replace('Œ', "Oe")
        .replace('æ', "ae")
        .replace('Æ', "Ae")
        .to_lowercase()
        .trim()
        .to_string()
}

/// Looks up the reference entry for an ingredient name.
///
/// Matching is a plain substring test against the normalized name, in table
/// order. An ingredient such as "riz au poulet" therefore resolves to `riz`.
pub fn find_entry(name: &str) -> Option<&'static NutritionEntry> {
    let normalized = normalize_text(name);
    if normalized.is_empty() {
        return None;
    }
    NUTRITION_TABLE
        .iter()
        .find(|e| normalized.contains(e.key))
        .or_else(|| {
            if normalized.contains("tomates concassees") || normalized.contains("coulis") {
                Some(&SAUCE_VEG_ENTRY)
            } else {
                None
            }
        })
}

/// Converts an ingredient quantity to grams.
///
/// Grams (or a missing unit) pass through, millilitres use the entry's
/// density when known and 1:1 otherwise. Count-like units ("pièce",
/// "gousse", ...) carry no precise mass and yield zero.
pub fn to_grams(qty: Option<f64>, unit: &str, name: &str) -> f64 {
    let qty = qty.filter(|q| q.is_finite()).unwrap_or(0.0);
    match normalize_text(unit).as_str() {
        "" | "g" => qty,
        "ml" => {
            let factor = find_entry(name).and_then(|e| e.ml_to_g).unwrap_or(1.0);
            qty * factor
        }
        _ => 0.0,
    }
}

/// Mass in grams of an ingredient, see [`to_grams`].
pub fn ingredient_grams(ingredient: &Ingredient) -> f64 {
    to_grams(ingredient.qty, &ingredient.unit, &ingredient.name)
}

/// Picks the heaviest ingredient of the given type and returns its table entry.
///
/// Ingredients with zero computed mass never qualify; on equal mass the
/// earliest ingredient wins.
pub fn pick_main_by_type(ingredients: &[Ingredient], food_type: FoodType) -> Option<&'static NutritionEntry> {
    let mut best: Option<(&'static NutritionEntry, f64)> = None;
    for ingredient in ingredients {
        let Some(e) = find_entry(&ingredient.name) else {
            continue;
        };
        if e.food_type != food_type {
            continue;
        }
        let grams = ingredient_grams(ingredient);
        if grams > best.map_or(0.0, |(_, g)| g) {
            best = Some((e, grams));
        }
    }
    best.map(|(e, _)| e)
}

/// Total macros of every fat and sauce ingredient in the recipe.
pub fn sum_fats_and_sauces(ingredients: &[Ingredient]) -> Macros {
    ingredients
        .iter()
        .filter_map(|ingredient| {
            let e = find_entry(&ingredient.name)?;
            e.food_type
                .is_shared_pool()
                .then(|| e.per_100.for_grams(ingredient_grams(ingredient)))
        })
        .fold(Macros::default(), |acc, m| acc + m)
}
