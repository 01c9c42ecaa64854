use std::collections::BTreeSet;
use tracing::warn;

use crate::config::RuleConfig;
use crate::planning::{Day, Meal, RecipeTargetRequest};
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

const SYSTEM_PROMPT: &str = r#"Tu es un assistant de batch cooking SPORTIF pour plusieurs profils.
RÈGLES:
- Sortie STRICTEMENT JSON, pas de texte autour.
- Respecte EXACTEMENT les PORTIONS par recette (par personne).
- Atteins les cibles G/V/L avec une source de glucides VISIBLE si G>200g (riz/pâtes/quinoa/boulgour/semoule/pdt/patate douce/…).
- Cuisine orientée sport: protéines maigres, légumes abondants, G complexes, peu d'AG ajoutés.
- Limite huile: ~15 ml (2 portions), 20 ml (3), 30 ml (4) répartis plat/sauce.
- Matériel interdit → proposer alternative compatible.
- Évite ingrédients/allergènes interdits.
- Diversifie les cuisines d'une génération à l'autre.
- Étapes ≤ 12, avec temps/feu/textures.
- Utilise le Placard si pertinent.
- Si la cible viandes/poissons > 0, la recette DOIT inclure un ingrédient protéique principal explicite (boeuf, poulet, dinde, porc, thon, saumon, tofu, oeufs…), en grammes crus, sans réduire les quantités cibles.
- BATCH COOKING STRICT: viser 15–18 ingrédients max pour toutes les recettes combinées et les réutiliser d'une recette à l'autre.
- Anti-répétition: ne propose pas une recette dont la signature est dans SEEN_SIGS. Si un plat est proche, produire une vraie VARIANTE (épices, céréale, sauce, cuisson) et changer le titre."#;

const FORMAT_SPEC: &str = r#"FORMAT JSON EXACT:
{
  "recipes":[
    {
      "title":"string",
      "cuisine_family":"méditerranée | asiatique | bistrot | tex-mex | ...",
      "duration_min":30,
      "portions":{"Thomas":2,"Anaïs":1},
      "macros_targets":{"glucides_g_cru":400,"viandes_poissons_g_cru":800,"legumes_g_cru":950},
      "kcal_per_person":{"Thomas":650,"Anaïs":520},
      "equipment":["poêle","casserole"],
      "ingredients":[{"name":"Riz basmati","qty":400,"unit":"g"}],
      "steps":["..."],
      "sauce_steps":["..."],
      "benefits_sport":"1–2 phrases"
    }
  ]
}"#;

/// One tab-separated `day, meal, name` row per checked cell of an active
/// profile, or `(vide)` when nothing is checked.
pub fn planning_tsv(state: &AppState) -> String {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());
    let mut rows = 0usize;
    for profile in state.profiles.iter().filter(|p| p.active) {
        for day in Day::ALL {
            for meal in Meal::ALL {
                if !state.planning.is_attending(day, meal, profile.id) {
                    continue;
                }
                match writer.write_record([day.as_str(), meal.as_str(), profile.name.as_str()]) {
                    Ok(()) => rows += 1,
                    Err(e) => warn!("Skipping planning row for '{}': {}", profile.name, e),
                }
            }
        }
    }
    if rows == 0 {
        return "(vide)".to_string();
    }
    let bytes = writer.into_inner().unwrap_or_default();
    String::from_utf8_lossy(&bytes).trim_end().to_string()
}

/// `R1: Thomas=3, Anaïs=2`, one line per recipe.
pub fn portions_lines(requests: &[RecipeTargetRequest]) -> String {
    requests
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let parts: Vec<String> = r.portions.iter().map(|(n, v)| format!("{}={}", n, v)).collect();
            format!("R{}: {}", i + 1, parts.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `R1: G=400, V=800, L=950`, one line per recipe (V is meat/fish, L vegetables).
pub fn targets_lines(requests: &[RecipeTargetRequest]) -> String {
    requests
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "R{}: G={}, V={}, L={}",
                i + 1,
                r.targets.carbohydrate_g,
                r.targets.protein_g,
                r.targets.vegetable_g
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn list_or(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join(", ")
    }
}

fn text_or(text: &str, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text.trim().to_string()
    }
}

/// Builds the system and user messages for one generation request.
pub fn build_prompt(
    planning_tsv: &str,
    requests: &[RecipeTargetRequest],
    rules: &RuleConfig,
    seen: &BTreeSet<String>,
) -> Prompt {
    let seen_json = serde_json::to_string(seen).unwrap_or_else(|_| "[]".to_string());
    let user = format!(
        "PLANNING (TSV):\n{planning}\n\n\
         PORTIONS (STRICT):\n{portions}\n\n\
         CIBLES (g cru):\n{targets}\n\n\
         Matériel autorisé: {equipment}\n\
         Interdits (STRICT): {banned}\n\
         Cuisines (soft): {cuisines}\n\
         Éviter (STRICT): {avoid}\n\
         Allergies (STRICT): {allergens}\n\
         Envies: {wishes}\n\
         Placard (prioritaire): {pantry}\n\
         Historique (SEEN_SIGS): {seen}\n\n\
         kcal PAR PERSONNE:\n\
         - Ajoute \"kcal_per_person\": {{ \"Nom\": number, ... }} (indicatif). L'app recalcule.\n\n\
         {format}",
        planning = planning_tsv,
        portions = portions_lines(requests),
        targets = targets_lines(requests),
        equipment = list_or(&rules.allowed_equipment, "(libre)"),
        banned = list_or(&rules.banned, "(aucun)"),
        cuisines = list_or(&rules.cuisines, "(libre)"),
        avoid = list_or(&rules.avoid, "(rien)"),
        allergens = list_or(&rules.allergens, "(aucune)"),
        wishes = text_or(&rules.wishes, "(aucune)"),
        pantry = text_or(&rules.pantry, "(vide)"),
        seen = seen_json,
        format = FORMAT_SPEC,
    );
    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::{Needs, Profile};
    use crate::recipe_parser::MacroTargets;

    fn request() -> RecipeTargetRequest {
        RecipeTargetRequest {
            portions: [("Thomas".to_string(), 3), ("Anaïs".to_string(), 2)].into_iter().collect(),
            targets: MacroTargets {
                carbohydrate_g: 400,
                protein_g: 800,
                vegetable_g: 950,
            },
        }
    }

    #[test]
    fn test_planning_tsv_rows() {
        let mut state = AppState::default();
        let thomas = state.profiles[0].id;
        let anais = state.profiles[1].id;
        state.set_attendance(Day::Mar, Meal::Diner, thomas, true).unwrap();
        state.set_attendance(Day::Lun, Meal::Midi, thomas, true).unwrap();
        state.set_attendance(Day::Lun, Meal::Midi, anais, true).unwrap();
        assert_eq!(
            planning_tsv(&state),
            "Lun\tMidi\tThomas\nMar\tDîner\tThomas\nLun\tMidi\tAnaïs"
        );
    }

    #[test]
    fn test_planning_tsv_quotes_names_with_separators() {
        let mut state = AppState::empty();
        let id = state.add_profile("Jean Paul", Needs::default()).unwrap();
        // loaded documents may predate name validation
        let legacy = Profile::new("Marie\tClaire", Needs::default());
        let legacy_id = legacy.id;
        state.profiles.push(legacy);
        state.set_attendance(Day::Lun, Meal::Midi, id, true).unwrap();
        state.set_attendance(Day::Lun, Meal::Midi, legacy_id, true).unwrap();

        let tsv = planning_tsv(&state);
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines, ["Lun\tMidi\tJean Paul", "Lun\tMidi\t\"Marie\tClaire\""]);
    }

    #[test]
    fn test_planning_tsv_empty() {
        assert_eq!(planning_tsv(&AppState::default()), "(vide)");
    }

    #[test]
    fn test_lines_format() {
        let requests = vec![request()];
        assert_eq!(portions_lines(&requests), "R1: Thomas=3, Anaïs=2");
        assert_eq!(targets_lines(&requests), "R1: G=400, V=800, L=950");
    }

    #[test]
    fn test_build_prompt_includes_rules_and_seen() {
        let rules = RuleConfig {
            banned: vec!["friteuse".to_string()],
            pantry: "riz, lentilles".to_string(),
            ..Default::default()
        };
        let seen: BTreeSet<String> = ["abc".to_string(), "xyz".to_string()].into_iter().collect();
        let prompt = build_prompt("(vide)", &[request()], &rules, &seen);
        assert!(prompt.system.contains("STRICTEMENT JSON"));
        assert!(prompt.user.contains("Interdits (STRICT): friteuse"));
        assert!(prompt.user.contains("Allergies (STRICT): (aucune)"));
        assert!(prompt.user.contains("Placard (prioritaire): riz, lentilles"));
        assert!(prompt.user.contains(r#"Historique (SEEN_SIGS): ["abc","xyz"]"#));
        assert!(prompt.user.contains("R1: G=400, V=800, L=950"));
    }
}
