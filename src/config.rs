use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
pub const STATE_PATH_ENV_VAR: &str = "HEBO_STATE_PATH";
pub const DEFAULT_STATE_PATH: &str = "hebo_state.json";

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 12_000;
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Household rules fed to the generator and checked by the validator.
///
/// Built once from user input; consumers never re-parse free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Equipment or techniques that must not appear ("interdits").
    pub banned: Vec<String>,
    pub allergens: Vec<String>,
    pub avoid: Vec<String>,
    /// Preferred cuisines, a soft hint only.
    pub cuisines: Vec<String>,
    pub allowed_equipment: Vec<String>,
    pub wishes: String,
    pub pantry: String,
}

fn label_pattern(label: &str) -> Regex {
    Regex::new(&format!(r"(?:{label})\s*:\s*([^;\n]+)")).expect("label patterns are literals")
}

struct Labels {
    banned: Regex,
    allergens: Regex,
    avoid: Regex,
    cuisines: Regex,
}

fn labels() -> &'static Labels {
    static LABELS: OnceLock<Labels> = OnceLock::new();
    LABELS.get_or_init(|| Labels {
        banned: label_pattern("interdits"),
        allergens: label_pattern("allergies"),
        avoid: label_pattern("eviter|éviter"),
        cuisines: label_pattern("cuisines?"),
    })
}

/// Extracts the comma-separated values following `label:` up to `;` or a newline.
fn pick(text: &str, pattern: &Regex) -> Vec<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| split_list(m.as_str()))
        .unwrap_or_default()
}

/// Splits a comma list, trimming items and dropping empty ones.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl RuleConfig {
    /// Parses the "label: a, b; label: c" notation, e.g.
    /// `interdits: friteuse; allergies: arachide; éviter: coriandre; cuisines: thaï`.
    ///
    /// Missing labels give empty lists. Values are lower-cased.
    pub fn parse_free_text(text: &str) -> Self {
        let lowered = text.to_lowercase();
        let l = labels();
        RuleConfig {
            banned: pick(&lowered, &l.banned),
            allergens: pick(&lowered, &l.allergens),
            avoid: pick(&lowered, &l.avoid),
            cuisines: pick(&lowered, &l.cuisines),
            ..Default::default()
        }
    }

    /// Replaces the list fields from free text, keeping equipment, wishes and pantry.
    pub fn apply_free_text(&mut self, text: &str) {
        let parsed = Self::parse_free_text(text);
        self.banned = parsed.banned;
        self.allergens = parsed.allergens;
        self.avoid = parsed.avoid;
        self.cuisines = parsed.cuisines;
    }
}

/// Model parameters stored alongside the state document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Where the state document lives: explicit path, then `HEBO_STATE_PATH`, then the default.
pub fn resolve_state_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| env::var_os(STATE_PATH_ENV_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_free_text_all_labels() {
        let rules = RuleConfig::parse_free_text(
            "Interdits: Friteuse, micro-ondes ; allergies: arachide; éviter: coriandre , céleri; cuisines: thaï, grecque",
        );
        assert_eq!(rules.banned, vec!["friteuse", "micro-ondes"]);
        assert_eq!(rules.allergens, vec!["arachide"]);
        assert_eq!(rules.avoid, vec!["coriandre", "céleri"]);
        assert_eq!(rules.cuisines, vec!["thaï", "grecque"]);
    }

    #[test]
    fn test_parse_free_text_empty_values() {
        let rules = RuleConfig::parse_free_text("interdits: ; allergies: ; éviter: ; cuisines: ");
        assert!(rules.banned.is_empty());
        assert!(rules.allergens.is_empty());
        assert!(rules.avoid.is_empty());
        assert!(rules.cuisines.is_empty());
    }

    #[test]
    fn test_parse_free_text_newline_terminates() {
        let rules = RuleConfig::parse_free_text("eviter: ail, oignon\ncuisine: italienne");
        assert_eq!(rules.avoid, vec!["ail", "oignon"]);
        assert_eq!(rules.cuisines, vec!["italienne"]);
        assert!(rules.banned.is_empty());
    }

    #[test]
    fn test_parse_free_text_missing_label() {
        assert_eq!(RuleConfig::parse_free_text(""), RuleConfig::default());
        assert_eq!(RuleConfig::parse_free_text("pas de règles"), RuleConfig::default());
    }

    #[test]
    fn test_apply_free_text_keeps_other_fields() {
        let mut rules = RuleConfig {
            allowed_equipment: vec!["wok".to_string()],
            pantry: "riz".to_string(),
            ..Default::default()
        };
        rules.apply_free_text("interdits: four");
        assert_eq!(rules.banned, vec!["four"]);
        assert_eq!(rules.allowed_equipment, vec!["wok"]);
        assert_eq!(rules.pantry, "riz");
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" poêle, ,wok ,"), vec!["poêle", "wok"]);
        assert!(split_list("").is_empty());
    }
}
