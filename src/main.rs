use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hebo_planner::api_connection::endpoints::Provider;
use hebo_planner::cli::{parse_args, Command, HistoryCommand, ProfileCommand, RulesArgs};
use hebo_planner::config::{resolve_state_path, split_list};
use hebo_planner::generator::{generate_plan, GenerationOutcome, OpenAiGenerator};
use hebo_planner::planning::{rescale_recipe, Needs};
use hebo_planner::prompt::{portions_lines, targets_lines};
use hebo_planner::recipe_aggregator::compute_per_person_nutrition;
use hebo_planner::recipe_parser::{parse_plan_text, Portions, Recipe, RecipePlan};
use hebo_planner::shopping_list::aggregate_shopping_list;
use hebo_planner::state::{export_plan_json, AppState, DEFAULT_SIGNATURE_LIMIT};
use hebo_planner::store::{JsonFileStore, StateStore};
use hebo_planner::validator::validate_plan;

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn read_plan(path: &Path) -> Result<RecipePlan> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read plan file '{}'", path.display()))?;
    parse_plan_text(&content).with_context(|| format!("'{}' is not a valid plan", path.display()))
}

fn print_nutrition(recipe: &Recipe, state: &AppState) {
    let active = state.active_profiles();
    println!("{}", recipe.display_title());
    for (name, totals) in compute_per_person_nutrition(recipe, &active) {
        let servings = recipe.portions.get(&name).copied().unwrap_or(0);
        let meal = totals.per_meal(servings);
        println!(
            "  {:<12} {} portion(s): {} kcal, P {} g, G {} g, L {} g | per meal: {} kcal, P {} g, G {} g, L {} g",
            name,
            servings,
            totals.kcal,
            totals.protein_g,
            totals.carbohydrate_g,
            totals.fat_g,
            meal.kcal,
            meal.protein_g,
            meal.carbohydrate_g,
            meal.fat_g
        );
    }
}

fn apply_rules(state: &mut AppState, args: RulesArgs) {
    if let Some(text) = args.text {
        state.rules.apply_free_text(&text);
    }
    if let Some(equipment) = args.equipment {
        state.rules.allowed_equipment = split_list(&equipment);
    }
    if let Some(wishes) = args.wishes {
        state.rules.wishes = wishes;
    }
    if let Some(pantry) = args.pantry {
        state.rules.pantry = pantry;
    }
}

/// Runs one command. Returns whether the state changed and must be saved.
async fn run(command: Command, state: &mut AppState, api_key_env: &str) -> Result<bool> {
    match command {
        Command::Profile { action } => match action {
            ProfileCommand::Add { name, needs } => {
                let id = state.add_profile(&name, Needs::from(&needs))?;
                println!("Added profile {} ({})", name, id);
                Ok(true)
            }
            ProfileCommand::Edit {
                profile,
                name,
                carbohydrate_g,
                protein_g,
                vegetable_g,
            } => {
                let current = state.find_profile(&profile)?;
                let id = current.id;
                let name = name.unwrap_or_else(|| current.name.clone());
                let needs = Needs::new(
                    carbohydrate_g.unwrap_or(current.needs.carbohydrate_g),
                    protein_g.unwrap_or(current.needs.protein_g),
                    vegetable_g.unwrap_or(current.needs.vegetable_g),
                );
                state.edit_profile(id, &name, needs)?;
                println!("Updated profile {}", name);
                Ok(true)
            }
            ProfileCommand::Remove { profile } => {
                let id = state.find_profile(&profile)?.id;
                let removed = state.delete_profile(id)?;
                println!("Removed profile {}", removed.name);
                Ok(true)
            }
            ProfileCommand::Toggle { profile } => {
                let id = state.find_profile(&profile)?.id;
                let active = state.toggle_profile(id)?;
                println!("{} is now {}", profile, if active { "active" } else { "inactive" });
                Ok(true)
            }
            ProfileCommand::List => {
                for p in &state.profiles {
                    println!(
                        "{}  {:<12} G={} P={} V={} {} ({} meal(s))",
                        p.id,
                        p.name,
                        p.needs.carbohydrate_g,
                        p.needs.protein_g,
                        p.needs.vegetable_g,
                        if p.active { "active" } else { "inactive" },
                        state.planning.count_for(p.id)
                    );
                }
                Ok(false)
            }
        },
        Command::Attend { profile, day, meal, off } => {
            let id = state.find_profile(&profile)?.id;
            state.set_attendance(day, meal, id, !off)?;
            Ok(true)
        }
        Command::Grid => {
            for p in &state.profiles {
                let slots: Vec<String> = state
                    .planning
                    .slots_for(p.id)
                    .map(|s| format!("{} {}", s.day, s.meal))
                    .collect();
                println!("{:<12} {}", p.name, slots.join(", "));
            }
            for (name, count) in state.attendance_counts() {
                println!("{}: {} meal(s)", name, count);
            }
            Ok(false)
        }
        Command::Rules(args) => {
            apply_rules(state, args);
            println!("{}", serde_json::to_string_pretty(&state.rules)?);
            Ok(true)
        }
        Command::Settings {
            model,
            max_tokens,
            temperature,
        } => {
            if let Some(model) = model {
                state.settings.model = model;
            }
            if let Some(max_tokens) = max_tokens {
                state.settings.max_tokens = max_tokens;
            }
            if let Some(temperature) = temperature {
                state.settings.temperature = temperature;
            }
            println!("{}", serde_json::to_string_pretty(&state.settings)?);
            Ok(true)
        }
        Command::Targets => {
            let requests = state.derive_targets();
            if requests.is_empty() {
                println!("Nothing checked in the planning.");
            } else {
                println!("{}\n\n{}", portions_lines(&requests), targets_lines(&requests));
            }
            Ok(false)
        }
        Command::Generate { out } => {
            let generator = OpenAiGenerator::new(Provider::openai(api_key_env), state.settings.clone());
            match generate_plan(&generator, state).await? {
                GenerationOutcome::NothingToGenerate => {
                    println!("Nothing checked in the planning.");
                    Ok(false)
                }
                GenerationOutcome::Generated(generated) => {
                    info!("Stored plan {} in history", generated.history_id);
                    for recipe in &generated.plan.recipes {
                        print_nutrition(recipe, state);
                    }
                    for issue in &generated.issues {
                        println!("! {}", issue);
                    }
                    if let Some(path) = out {
                        fs::write(&path, export_plan_json(&generated.plan)?)
                            .await
                            .with_context(|| format!("Failed to write plan to '{}'", path.display()))?;
                    }
                    Ok(true)
                }
            }
        }
        Command::Validate { plan } => {
            let plan = read_plan(&plan).await?;
            let seen = state.last_signatures(DEFAULT_SIGNATURE_LIMIT);
            let issues = validate_plan(&plan, &state.rules, &seen);
            if issues.is_empty() {
                println!("No issues.");
            }
            for issue in issues {
                println!("! {}", issue);
            }
            Ok(false)
        }
        Command::Nutrition { plan } => {
            let plan = read_plan(&plan).await?;
            for recipe in &plan.recipes {
                print_nutrition(recipe, state);
            }
            Ok(false)
        }
        Command::Shopping { plan } => {
            let plan = read_plan(&plan).await?;
            for item in aggregate_shopping_list(&plan) {
                println!("{:<30} {} {}", item.name, item.qty, item.unit);
            }
            Ok(false)
        }
        Command::Rescale { saved_id, portions } => {
            let mut recipe = state.saved_recipe(saved_id)?.recipe.clone();
            let new_portions: Portions = portions.into_iter().collect();
            let ratios = rescale_recipe(&mut recipe, &new_portions, &state.active_profiles());
            info!(
                "Scaled carbs x{:.2}, protein x{:.2}, vegetables x{:.2}, fats x{:.2}",
                ratios.carbohydrate, ratios.protein, ratios.vegetable, ratios.fat
            );
            println!("{}", serde_json::to_string_pretty(&recipe)?);
            print_nutrition(&recipe, state);
            Ok(false)
        }
        Command::History { action } => match action {
            HistoryCommand::List => {
                for entry in state.history.iter().rev() {
                    let titles: Vec<&str> = entry.recipes.iter().map(|r| r.title.as_str()).collect();
                    println!("{}  {}  {}", entry.id, entry.title, titles.join(" / "));
                }
                Ok(false)
            }
            HistoryCommand::Export { id, out } => {
                let json = export_plan_json(&state.history_entry(id)?.plan)?;
                match out {
                    Some(path) => fs::write(&path, json)
                        .await
                        .with_context(|| format!("Failed to write plan to '{}'", path.display()))?,
                    None => println!("{}", json),
                }
                Ok(false)
            }
            HistoryCommand::Delete { id } => {
                state.delete_history_entry(id)?;
                Ok(true)
            }
            HistoryCommand::Clear => {
                state.clear_history();
                Ok(true)
            }
        },
        Command::Saved => {
            for saved in state.saved_recipes.iter().rev() {
                println!("{}  {}  {}", saved.id, saved.signature, saved.title);
            }
            Ok(false)
        }
        Command::Export => {
            println!("{}", serde_json::to_string_pretty(&state.export())?);
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = parse_args();
    init_logging(cli.verbose);

    let mut store = JsonFileStore::new(resolve_state_path(cli.state));
    let mut state = store
        .load()
        .with_context(|| format!("Failed to load state from '{}'", store.path().display()))?;

    if run(cli.command, &mut state, &cli.api_key_env).await? {
        store
            .save(&state)
            .with_context(|| format!("Failed to save state to '{}'", store.path().display()))?;
    }
    Ok(())
}
