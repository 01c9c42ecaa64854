//! The application-state document and every edit made to it.
//!
//! All derivations take the state (or parts of it) explicitly; nothing here
//! performs I/O. Persisting after each edit is the caller's job, see
//! [`crate::store`].

use chrono::{DateTime, Local, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{split_list, GenerationSettings, RuleConfig};
use crate::error::StateError;
use crate::nutritional_matcher::normalize_text;
use crate::planning::{derive_targets, AttendanceGrid, Day, Meal, Needs, Profile, RecipeTargetRequest};
use crate::recipe_parser::{Recipe, RecipePlan};
use crate::signature::recipe_signature;

pub const HISTORY_LIMIT: usize = 50;
pub const SAVED_RECIPES_LIMIT: usize = 200;
/// History depth used for the anti-repetition corpus.
pub const DEFAULT_SIGNATURE_LIMIT: usize = 20;

const DEFAULT_EQUIPMENT: &str = "poêle, casserole, four, blender, wok";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRef {
    pub title: String,
    #[serde(alias = "sig")]
    pub signature: String,
}

/// One generated plan, as shown in the history list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    pub title: String,
    pub recipes: Vec<RecipeRef>,
    pub plan: RecipePlan,
}

/// A single recipe kept for reopening and rescaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRecipe {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    pub title: String,
    #[serde(alias = "sig")]
    pub signature: String,
    pub recipe: Recipe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub settings: GenerationSettings,
    pub profiles: Vec<Profile>,
    pub rules: RuleConfig,
    pub planning: AttendanceGrid,
    pub history: Vec<HistoryEntry>,
    pub saved_recipes: Vec<SavedRecipe>,
}

impl Default for AppState {
    /// A fresh household with two sample profiles and common equipment.
    fn default() -> Self {
        Self {
            settings: GenerationSettings::default(),
            profiles: vec![
                Profile::new("Thomas", Needs::new(100, 200, 150)),
                Profile::new("Anaïs", Needs::new(50, 100, 250)),
            ],
            rules: RuleConfig {
                allowed_equipment: split_list(DEFAULT_EQUIPMENT),
                ..Default::default()
            },
            planning: AttendanceGrid::default(),
            history: Vec::new(),
            saved_recipes: Vec::new(),
        }
    }
}

/// Pretty-printed export of the state together with the current targets.
#[derive(Debug, Serialize)]
pub struct StateExport<'a> {
    pub state: &'a AppState,
    pub targets: Vec<RecipeTargetRequest>,
}

/// Keeps the newest `limit` items of an append-only log.
fn evict_oldest<T>(log: &mut Vec<T>, limit: usize) {
    if log.len() > limit {
        let excess = log.len() - limit;
        log.drain(..excess);
    }
}

impl AppState {
    /// State with no profiles, rules or history.
    pub fn empty() -> Self {
        Self {
            profiles: Vec::new(),
            rules: RuleConfig::default(),
            ..Default::default()
        }
    }

    pub fn active_profiles(&self) -> Vec<Profile> {
        self.profiles.iter().filter(|p| p.active).cloned().collect()
    }

    pub fn profile(&self, id: Uuid) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Finds a profile by id or exact name, then by name ignoring case and
    /// accents. A loose match must be unique.
    pub fn find_profile(&self, name_or_id: &str) -> Result<&Profile, StateError> {
        let trimmed = name_or_id.trim();
        if let Some(p) = self
            .profiles
            .iter()
            .find(|p| p.name == trimmed || p.id.to_string() == trimmed)
        {
            return Ok(p);
        }
        let wanted = normalize_text(trimmed);
        let mut loose = self.profiles.iter().filter(|p| normalize_text(&p.name) == wanted);
        match (loose.next(), loose.next()) {
            (Some(p), None) => Ok(p),
            (Some(_), Some(_)) => Err(StateError::AmbiguousProfile(name_or_id.to_string())),
            (None, _) => Err(StateError::UnknownProfile(name_or_id.to_string())),
        }
    }

    fn profile_mut(&mut self, id: Uuid) -> Result<&mut Profile, StateError> {
        self.profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StateError::UnknownProfile(id.to_string()))
    }

    fn check_name(&self, name: &str, except: Option<Uuid>) -> Result<String, StateError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StateError::EmptyProfileName);
        }
        if name.chars().any(char::is_control) {
            return Err(StateError::InvalidProfileName(name.to_string()));
        }
        let normalized = normalize_text(name);
        let clash = self
            .profiles
            .iter()
            .any(|p| Some(p.id) != except && normalize_text(&p.name) == normalized);
        if clash {
            return Err(StateError::DuplicateProfileName(name.to_string()));
        }
        Ok(name.to_string())
    }

    /// Adds an active profile and returns its id.
    pub fn add_profile(&mut self, name: &str, needs: Needs) -> Result<Uuid, StateError> {
        let name = self.check_name(name, None)?;
        let profile = Profile::new(name, needs);
        let id = profile.id;
        info!("Added profile '{}'", profile.name);
        self.profiles.push(profile);
        Ok(id)
    }

    pub fn edit_profile(&mut self, id: Uuid, name: &str, needs: Needs) -> Result<(), StateError> {
        let name = self.check_name(name, Some(id))?;
        let profile = self.profile_mut(id)?;
        profile.name = name;
        profile.needs = needs;
        Ok(())
    }

    /// Removes a profile and every attendance cell that references it.
    pub fn delete_profile(&mut self, id: Uuid) -> Result<Profile, StateError> {
        let index = self
            .profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StateError::UnknownProfile(id.to_string()))?;
        let removed = self.profiles.remove(index);
        let cells = self.planning.remove_profile(id);
        info!("Deleted profile '{}' and {} attendance cell(s)", removed.name, cells);
        Ok(removed)
    }

    /// Flips a profile's active flag. Its attendance cells are kept.
    pub fn toggle_profile(&mut self, id: Uuid) -> Result<bool, StateError> {
        let profile = self.profile_mut(id)?;
        profile.active = !profile.active;
        Ok(profile.active)
    }

    /// Checks or clears one cell. Only active profiles can be scheduled.
    pub fn set_attendance(&mut self, day: Day, meal: Meal, id: Uuid, attending: bool) -> Result<(), StateError> {
        let profile = self.profile(id).ok_or_else(|| StateError::UnknownProfile(id.to_string()))?;
        if attending && !profile.active {
            return Err(StateError::InactiveProfile(profile.name.clone()));
        }
        self.planning.set(day, meal, id, attending);
        Ok(())
    }

    /// Checked meals per active profile, by name.
    pub fn attendance_counts(&self) -> IndexMap<String, u32> {
        self.profiles
            .iter()
            .filter(|p| p.active)
            .map(|p| (p.name.clone(), self.planning.count_for(p.id)))
            .collect()
    }

    pub fn derive_targets(&self) -> Vec<RecipeTargetRequest> {
        derive_targets(&self.profiles, &self.planning)
    }

    /// Records a generated plan in the history and saves each of its recipes.
    ///
    /// Both logs are bounded; the oldest entries go first.
    pub fn add_history_entry(&mut self, plan: &RecipePlan) -> Uuid {
        let ts = Utc::now();
        let id = Uuid::new_v4();
        let recipes = plan
            .recipes
            .iter()
            .map(|r| RecipeRef {
                title: r.display_title().to_string(),
                signature: recipe_signature(r),
            })
            .collect();
        self.history.push(HistoryEntry {
            id,
            ts,
            title: ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
            recipes,
            plan: plan.clone(),
        });
        evict_oldest(&mut self.history, HISTORY_LIMIT);

        for recipe in &plan.recipes {
            self.saved_recipes.push(SavedRecipe {
                id: Uuid::new_v4(),
                ts,
                title: recipe.display_title().to_string(),
                signature: recipe_signature(recipe),
                recipe: recipe.clone(),
            });
        }
        evict_oldest(&mut self.saved_recipes, SAVED_RECIPES_LIMIT);
        debug!(
            "History now holds {} plan(s) and {} saved recipe(s)",
            self.history.len(),
            self.saved_recipes.len()
        );
        id
    }

    pub fn history_entry(&self, id: Uuid) -> Result<&HistoryEntry, StateError> {
        self.history
            .iter()
            .find(|h| h.id == id)
            .ok_or(StateError::UnknownHistoryEntry(id))
    }

    pub fn delete_history_entry(&mut self, id: Uuid) -> Result<(), StateError> {
        let before = self.history.len();
        self.history.retain(|h| h.id != id);
        if self.history.len() == before {
            return Err(StateError::UnknownHistoryEntry(id));
        }
        Ok(())
    }

    /// Empties the plan history. Saved recipes are kept.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn saved_recipe(&self, id: Uuid) -> Result<&SavedRecipe, StateError> {
        self.saved_recipes
            .iter()
            .find(|r| r.id == id)
            .ok_or(StateError::UnknownSavedRecipe(id))
    }

    /// Signatures of the last `limit` plans and the last `limit * 3` saved recipes.
    pub fn last_signatures(&self, limit: usize) -> BTreeSet<String> {
        let from_history = self
            .history
            .iter()
            .skip(self.history.len().saturating_sub(limit))
            .flat_map(|h| h.recipes.iter().map(|r| r.signature.clone()));
        let saved_limit = limit.saturating_mul(3);
        let from_saved = self
            .saved_recipes
            .iter()
            .skip(self.saved_recipes.len().saturating_sub(saved_limit))
            .map(|r| r.signature.clone());
        from_history
            .chain(from_saved)
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn export(&self) -> StateExport<'_> {
        StateExport {
            state: self,
            targets: self.derive_targets(),
        }
    }
}

/// Pretty-printed JSON of a plan, as written by history exports.
pub fn export_plan_json(plan: &RecipePlan) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(plan)
}
