use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::nutritional_matcher::{find_entry, normalize_text, FoodType};
use crate::recipe_parser::RecipePlan;

const LIQUID_KEYWORDS: &[&str] = &[
    "huile",
    "eau",
    "lait",
    "creme",
    "sauce",
    "soja",
    "vinaigre",
    "jus",
    "bouillon",
    "coulis",
    "lait de coco",
    "tomates concassees",
    "tomate concassee",
    "coco",
    "coconut",
];

const COUNT_UNITS: &[&str] = &[
    "unite", "piece", "pieces", "gousse", "tranche", "pincee", "pincees", "citron", "oignon", "tomate",
    "oeuf", "oeufs", "ail",
];

pub const UNIT_LABEL: &str = "Unité";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub name: String,
    pub qty: f64,
    pub unit: String,
}

/// Unit an ingredient is listed under. Count-like units are folded into ml
/// for liquids and g for table foods; other counted items stay "Unité".
pub fn list_unit(name: &str, unit: &str) -> &'static str {
    let n = normalize_text(name);
    let u = normalize_text(unit);
    match u.as_str() {
        "ml" => "ml",
        "g" => "g",
        u if u.is_empty() || COUNT_UNITS.contains(&u) => {
            if LIQUID_KEYWORDS.iter().any(|k| n.contains(k)) {
                "ml"
            } else if find_entry(name)
                .is_some_and(|e| matches!(e.food_type, FoodType::Carb | FoodType::Prot | FoodType::Veg))
            {
                "g"
            } else {
                UNIT_LABEL
            }
        }
        _ => "g",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Sums every ingredient of the plan by (name, list unit), sorted by name.
pub fn aggregate_shopping_list(plan: &RecipePlan) -> Vec<ShoppingItem> {
    let mut totals: IndexMap<(String, &'static str), f64> = IndexMap::new();
    for ingredient in plan.recipes.iter().flat_map(|r| &r.ingredients) {
        let unit = list_unit(&ingredient.name, &ingredient.unit);
        let key = (ingredient.name.trim().to_lowercase(), unit);
        *totals.entry(key).or_insert(0.0) += ingredient.qty.unwrap_or(0.0);
    }
    let mut items: Vec<ShoppingItem> = totals
        .into_iter()
        .map(|((name, unit), qty)| ShoppingItem {
            name: capitalize(&name),
            qty: (qty * 10.0).round() / 10.0,
            unit: unit.to_string(),
        })
        .collect();
    items.sort_by(|a, b| {
        normalize_text(&a.name)
            .cmp(&normalize_text(&b.name))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.unit.cmp(&b.unit))
    });
    items
}
