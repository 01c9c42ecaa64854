use indexmap::IndexMap;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Serving counts per profile name, in profile order.
pub type Portions = IndexMap<String, u32>;

/// Raw gram targets per macro category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroTargets {
    #[serde(rename = "glucides_g_cru", default, deserialize_with = "lenient_grams")]
    pub carbohydrate_g: u32,
    #[serde(rename = "viandes_poissons_g_cru", default, deserialize_with = "lenient_grams")]
    pub protein_g: u32,
    #[serde(rename = "legumes_g_cru", default, deserialize_with = "lenient_grams")]
    pub vegetable_g: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    /// Absent when the generator sent something that is not a number.
    #[serde(default, deserialize_with = "lenient_qty")]
    pub qty: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub unit: String,
}

/// One generated recipe. Every field is optional on input; see [`lenient`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default, deserialize_with = "lenient")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient")]
    pub cuisine_family: String,
    #[serde(default, deserialize_with = "lenient")]
    pub duration_min: u32,
    #[serde(default, deserialize_with = "lenient_portions")]
    pub portions: Portions,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub macros_targets: Option<MacroTargets>,
    /// Older plans carried the request targets under this name.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub targets: Option<MacroTargets>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "IndexMap::is_empty")]
    pub kcal_per_person: IndexMap<String, f64>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub equipment: Vec<String>,
    #[serde(default, deserialize_with = "lenient_ingredients")]
    pub ingredients: Vec<Ingredient>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub steps: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub sauce_steps: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub benefits_sport: String,
}

impl Recipe {
    /// Targets stored on the recipe, preferring `macros_targets`.
    pub fn effective_targets(&self) -> MacroTargets {
        self.macros_targets.or(self.targets).unwrap_or_default()
    }

    /// Title for listings, with a placeholder for untitled recipes.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "(sans titre)"
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipePlan {
    #[serde(default, deserialize_with = "lenient_recipes")]
    pub recipes: Vec<Recipe>,
}

/// Deserializes any JSON shape into `T`, falling back to `T::default()` when
/// the shape does not fit.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(from_value_or_default(value))
}

fn from_value_or_default<T: DeserializeOwned + Default>(value: Value) -> T {
    if value.is_null() {
        return T::default();
    }
    match serde_json::from_value(value) {
        Ok(v) => v,
        Err(e) => {
            debug!("Defaulting malformed recipe field: {}", e);
            T::default()
        }
    }
}

/// Numbers, and strings holding numbers, are quantities; the rest is absent.
fn value_as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn lenient_qty<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_number(&value))
}

fn lenient_grams<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_number(&value).map_or(0, round_to_count))
}

fn round_to_count(n: f64) -> u32 {
    if n <= 0.0 {
        0
    } else {
        n.round().min(u32::MAX as f64) as u32
    }
}

/// Keeps every well-formed entry of a portions object.
fn lenient_portions<'de, D>(deserializer: D) -> Result<Portions, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Object(map) = value else {
        return Ok(Portions::new());
    };
    Ok(map
        .into_iter()
        .map(|(name, v)| (name, value_as_number(&v).map_or(0, round_to_count)))
        .collect())
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Value::String(s) if !s.is_empty() => vec![s],
        _ => Vec::new(),
    })
}

fn lenient_ingredients<'de, D>(deserializer: D) -> Result<Vec<Ingredient>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .map(from_value_or_default)
        .collect())
}

/// One malformed recipe must not take the others down with it.
fn lenient_recipes<'de, D>(deserializer: D) -> Result<Vec<Recipe>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        warn!("Plan has no recipe array, treating it as empty");
        return Ok(Vec::new());
    };
    Ok(items.into_iter().map(from_value_or_default).collect())
}

/// Removes a surrounding Markdown code fence (```` ```json ```` or bare ```` ``` ````).
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .trim_start()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Parses the generator's raw answer into a plan.
pub fn parse_plan_text(content: &str) -> Result<RecipePlan, serde_json::Error> {
    let stripped = strip_code_fences(content);
    if stripped.len() != content.trim().len() {
        debug!("Stripped Markdown fence from generator output");
    }
    serde_json::from_str(stripped)
}
