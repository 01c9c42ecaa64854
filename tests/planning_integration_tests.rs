use hebo_planner::api_connection::connection::ApiConnectionError;
use hebo_planner::error::PlannerError;
use hebo_planner::generator::{generate_plan, GeneratedPlan, GenerationOutcome, PlanGenerator};
use hebo_planner::planning::{rescale_recipe, Day, Meal};
use hebo_planner::prompt::Prompt;
use hebo_planner::recipe_aggregator::compute_per_person_nutrition;
use hebo_planner::recipe_parser::{MacroTargets, Portions};
use hebo_planner::shopping_list::aggregate_shopping_list;
use hebo_planner::signature::recipe_signature;
use hebo_planner::state::{AppState, DEFAULT_SIGNATURE_LIMIT};
use hebo_planner::store::{JsonFileStore, StateStore};
use hebo_planner::validator::IssueKind;

const PLAN_REPLY: &str = r#"```json
{
  "recipes": [
    {
      "title": "Riz sauté au poulet et brocoli",
      "cuisine_family": "asiatique",
      "duration_min": 35,
      "portions": {"Thomas": 2, "Anaïs": 1},
      "macros_targets": {"glucides_g_cru": 250, "viandes_poissons_g_cru": 500, "legumes_g_cru": 550},
      "kcal_per_person": {"Thomas": 1300, "Anaïs": 600},
      "equipment": ["wok", "casserole"],
      "ingredients": [
        {"name": "Riz basmati", "qty": 250, "unit": "g"},
        {"name": "Poulet", "qty": 500, "unit": "g"},
        {"name": "Brocoli", "qty": 550, "unit": "g"},
        {"name": "Huile d'olive", "qty": 15, "unit": "ml"},
        {"name": "Gousse d'ail", "qty": 2, "unit": "gousse"}
      ],
      "steps": ["Cuire le riz 12 min.", "Saisir le poulet au wok à feu vif."],
      "sauce_steps": [],
      "benefits_sport": "Glucides complexes et protéines maigres."
    }
  ]
}
```"#;

struct FixedReply(&'static str);

impl PlanGenerator for FixedReply {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ApiConnectionError> {
        assert!(prompt.user.contains("R1: Thomas=2, Anaïs=1"));
        assert!(prompt.user.contains("R1: G=250, V=500, L=550"));
        Ok(self.0.to_string())
    }
}

struct FailingGenerator;

impl PlanGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &Prompt) -> Result<String, ApiConnectionError> {
        Err(ApiConnectionError::EmptyResponse)
    }
}

/// Thomas eats twice, Anaïs once.
fn scheduled_state() -> AppState {
    let mut state = AppState::default();
    let thomas = state.find_profile("thomas").unwrap().id;
    let anais = state.find_profile("anais").unwrap().id;
    state.set_attendance(Day::Lun, Meal::Midi, thomas, true).unwrap();
    state.set_attendance(Day::Mar, Meal::Diner, thomas, true).unwrap();
    state.set_attendance(Day::Lun, Meal::Midi, anais, true).unwrap();
    state
}

async fn generate(generator: &impl PlanGenerator, state: &mut AppState) -> GeneratedPlan {
    match generate_plan(generator, state).await.unwrap() {
        GenerationOutcome::Generated(generated) => generated,
        GenerationOutcome::NothingToGenerate => panic!("expected a plan"),
    }
}

#[tokio::test]
async fn test_generation_records_history_and_validates() {
    let mut state = scheduled_state();
    let generated = generate(&FixedReply(PLAN_REPLY), &mut state).await;

    assert_eq!(generated.requests.len(), 1);
    assert_eq!(
        generated.requests[0].targets,
        MacroTargets {
            carbohydrate_g: 250,
            protein_g: 500,
            vegetable_g: 550,
        }
    );
    assert_eq!(generated.plan.recipes.len(), 1);
    assert!(generated.issues.is_empty(), "{:?}", generated.issues);

    assert_eq!(state.history.len(), 1);
    assert_eq!(state.history[0].id, generated.history_id);
    assert_eq!(state.saved_recipes.len(), 1);
    let signature = recipe_signature(&generated.plan.recipes[0]);
    assert_eq!(state.history[0].recipes[0].signature, signature);
    assert!(state.last_signatures(DEFAULT_SIGNATURE_LIMIT).contains(&signature));
}

#[tokio::test]
async fn test_second_identical_plan_is_flagged_as_repetition() {
    let mut state = scheduled_state();
    generate(&FixedReply(PLAN_REPLY), &mut state).await;
    let second = generate(&FixedReply(PLAN_REPLY), &mut state).await;

    assert_eq!(second.issues.len(), 1);
    assert_eq!(second.issues[0].recipe_index, 0);
    assert_eq!(second.issues[0].kind, IssueKind::Repetition);
    assert_eq!(state.history.len(), 2);
}

#[tokio::test]
async fn test_unparseable_reply_leaves_state_untouched() {
    let mut state = scheduled_state();
    let before = state.clone();
    let result = generate_plan(&FixedReply("Désolé, je ne peux pas."), &mut state).await;
    assert!(matches!(result, Err(PlannerError::Parse(_))));
    assert_eq!(state, before);
}

#[tokio::test]
async fn test_generator_failure_leaves_state_untouched() {
    let mut state = scheduled_state();
    let before = state.clone();
    let result = generate_plan(&FailingGenerator, &mut state).await;
    assert!(matches!(
        result,
        Err(PlannerError::Generation(ApiConnectionError::EmptyResponse))
    ));
    assert_eq!(state, before);
}

#[tokio::test]
async fn test_nutrition_and_rescale_of_saved_recipe() {
    let mut state = scheduled_state();
    generate(&FixedReply(PLAN_REPLY), &mut state).await;
    let active = state.active_profiles();
    let saved_id = state.saved_recipes[0].id;
    let mut recipe = state.saved_recipe(saved_id).unwrap().recipe.clone();

    // Thomas: 200 g rice, 400 g chicken, 300 g broccoli, a third of 13.8 g oil.
    let nutrition = compute_per_person_nutrition(&recipe, &active);
    let thomas = nutrition["Thomas"];
    assert_eq!(thomas.kcal, 1323.0);
    assert!((thomas.protein_g - 114.4).abs() < 1e-9);
    assert!((thomas.carbohydrate_g - 177.0).abs() < 1e-9);
    assert!((thomas.fat_g - 13.8).abs() < 1e-9);
    assert_eq!(thomas.per_meal(2).kcal, 662.0);

    let new_portions: Portions = [("Anaïs".to_string(), 2)].into_iter().collect();
    let ratios = rescale_recipe(&mut recipe, &new_portions, &active);
    assert!((ratios.carbohydrate - 1.2).abs() < 1e-9);
    assert_eq!(recipe.portions["Thomas"], 2);
    assert_eq!(recipe.portions["Anaïs"], 2);
    assert_eq!(
        recipe.macros_targets,
        Some(MacroTargets {
            carbohydrate_g: 300,
            protein_g: 600,
            vegetable_g: 800,
        })
    );
    let qty = |name: &str| {
        recipe
            .ingredients
            .iter()
            .find(|i| i.name == name)
            .and_then(|i| i.qty)
            .unwrap()
    };
    assert_eq!(qty("Riz basmati"), 300.0);
    assert_eq!(qty("Poulet"), 600.0);
    assert_eq!(qty("Brocoli"), 800.0);
    assert_eq!(qty("Gousse d'ail"), 2.0);
}

#[tokio::test]
async fn test_shopping_list_of_generated_plan() {
    let mut state = scheduled_state();
    let generated = generate(&FixedReply(PLAN_REPLY), &mut state).await;
    let items = aggregate_shopping_list(&generated.plan);
    let oil = items.iter().find(|i| i.name == "Huile d'olive").unwrap();
    assert_eq!(oil.unit, "ml");
    assert_eq!(oil.qty, 15.0);
}

#[tokio::test]
async fn test_state_survives_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = JsonFileStore::new(dir.path().join("state.json"));
    let mut state = scheduled_state();
    generate(&FixedReply(PLAN_REPLY), &mut state).await;
    store.save(&state).unwrap();

    let reloaded = store.load().unwrap();
    assert_eq!(reloaded, state);
    assert_eq!(reloaded.derive_targets(), state.derive_targets());
    assert_eq!(
        reloaded.last_signatures(DEFAULT_SIGNATURE_LIMIT),
        state.last_signatures(DEFAULT_SIGNATURE_LIMIT)
    );
}
