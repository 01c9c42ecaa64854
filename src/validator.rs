//! Post-hoc checks over a generated plan. Findings are advisory: the plan is
//! kept whatever they say.

use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info};

use crate::config::RuleConfig;
use crate::nutritional_matcher::{normalize_text, pick_main_by_type, FoodType};
use crate::recipe_parser::{Recipe, RecipePlan};
use crate::signature::recipe_signature;

/// Above this many grams of carbohydrate source the recipe must show a staple.
pub const VISIBLE_CARB_THRESHOLD_G: u32 = 200;

const CARB_STAPLES: &[&str] = &[
    "riz",
    "pates",
    "quinoa",
    "boulgour",
    "semoule",
    "nouilles",
    "spaghetti",
    "penne",
    "pommes de terre",
    "pomme de terre",
    "patate douce",
    "tortilla",
    "pain",
    "lentil",
    "lentille",
    "haricots rouges",
    "pois chiche",
    "orzo",
    "basmati",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// Signature matches a recently generated or saved recipe.
    Repetition,
    BannedEquipment(String),
    NoVisibleCarb { target_g: u32 },
    NoProteinSource { target_g: u32 },
    /// Ingredient hits an avoid-list or allergen term.
    AvoidedIngredient(String),
}

/// A finding on one recipe of the plan; `recipe_index` is zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub recipe_index: usize,
    pub kind: IssueKind,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}: ", self.recipe_index + 1)?;
        match &self.kind {
            IssueKind::Repetition => write!(f, "resembles a recently proposed recipe (vary more)"),
            IssueKind::BannedEquipment(term) => write!(f, "banned equipment \"{}\" detected", term),
            IssueKind::NoVisibleCarb { target_g } => {
                write!(f, "target G={} without a visible carbohydrate source", target_g)
            }
            IssueKind::NoProteinSource { target_g } => {
                write!(f, "target P={} without a clear protein source", target_g)
            }
            IssueKind::AvoidedIngredient(term) => write!(f, "contains \"{}\" (avoid/allergen)", term),
        }
    }
}

/// True when an ingredient name contains one of the carbohydrate staples.
pub fn has_visible_carb(recipe: &Recipe) -> bool {
    recipe.ingredients.iter().any(|i| {
        let name = normalize_text(&i.name);
        CARB_STAPLES.iter().any(|c| name.contains(c))
    })
}

fn check_recipe(index: usize, recipe: &Recipe, rules: &RuleConfig, seen: &BTreeSet<String>) -> Vec<ValidationIssue> {
    let mut kinds = Vec::new();

    if seen.contains(&recipe_signature(recipe)) {
        kinds.push(IssueKind::Repetition);
    }

    let all_text = std::iter::once(recipe.title.as_str())
        .chain(recipe.equipment.iter().map(String::as_str))
        .chain(recipe.steps.iter().map(String::as_str))
        .chain(recipe.sauce_steps.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    for term in rules.banned.iter().filter(|t| !t.is_empty()) {
        if all_text.contains(&term.to_lowercase()) {
            kinds.push(IssueKind::BannedEquipment(term.clone()));
        }
    }

    let targets = recipe.effective_targets();
    if targets.carbohydrate_g > VISIBLE_CARB_THRESHOLD_G && !has_visible_carb(recipe) {
        kinds.push(IssueKind::NoVisibleCarb {
            target_g: targets.carbohydrate_g,
        });
    }
    if targets.protein_g > 0 && pick_main_by_type(&recipe.ingredients, FoodType::Prot).is_none() {
        kinds.push(IssueKind::NoProteinSource {
            target_g: targets.protein_g,
        });
    }

    let names: Vec<String> = recipe.ingredients.iter().map(|i| i.name.to_lowercase()).collect();
    for term in rules.avoid.iter().chain(&rules.allergens).filter(|t| !t.is_empty()) {
        let term_lower = term.to_lowercase();
        if names.iter().any(|n| n.contains(&term_lower)) {
            kinds.push(IssueKind::AvoidedIngredient(term.clone()));
        }
    }

    kinds
        .into_iter()
        .map(|kind| ValidationIssue {
            recipe_index: index,
            kind,
        })
        .collect()
}

/// Runs every check on every recipe and collects all findings.
///
/// # Arguments
/// * `plan`: the generated plan.
/// * `rules`: banned equipment, avoid and allergen lists.
/// * `seen`: signatures of recent recipes (see `AppState::last_signatures`).
pub fn validate_plan(plan: &RecipePlan, rules: &RuleConfig, seen: &BTreeSet<String>) -> Vec<ValidationIssue> {
    let issues: Vec<ValidationIssue> = plan
        .recipes
        .iter()
        .enumerate()
        .flat_map(|(i, r)| check_recipe(i, r, rules, seen))
        .collect();
    if issues.is_empty() {
        debug!("Plan of {} recipe(s) passed validation", plan.recipes.len());
    } else {
        info!("Validation raised {} issue(s)", issues.len());
    }
    issues
}
