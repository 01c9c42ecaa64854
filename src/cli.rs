use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::planning::{Day, Meal, Needs};

#[derive(Parser, Debug)]
#[command(name = "hebo", author, version, about = "Batch-cooking planner: meal grid to recipe targets, validation and nutrition", long_about = None)]
pub struct Cli {
    /// Path to the state document (defaults to $HEBO_STATE_PATH or hebo_state.json)
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Environment variable holding the OpenAI API key
    #[arg(long, global = true, default_value = crate::config::API_KEY_ENV_VAR)]
    pub api_key_env: String,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage household profiles
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
    /// Check or clear a meal slot for a profile
    Attend {
        /// Profile name or id
        profile: String,
        day: Day,
        meal: Meal,
        /// Clear the slot instead of checking it
        #[arg(long)]
        off: bool,
    },
    /// Show the attendance grid
    Grid,
    /// Update rules, equipment, wishes and pantry
    Rules(RulesArgs),
    /// Change model settings
    Settings {
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        max_tokens: Option<u32>,
        #[arg(long)]
        temperature: Option<f32>,
    },
    /// Print the per-recipe portions and gram targets
    Targets,
    /// Generate a plan from the current grid
    Generate {
        /// Also write the plan JSON to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Validate a plan JSON file against the current rules and history
    Validate { plan: PathBuf },
    /// Per-person nutrition of every recipe in a plan JSON file
    Nutrition { plan: PathBuf },
    /// Aggregated shopping list of a plan JSON file
    Shopping { plan: PathBuf },
    /// Rescale a saved recipe to new portions, e.g. `rescale <id> Thomas=2 Anaïs=1`
    Rescale {
        saved_id: uuid::Uuid,
        #[arg(value_parser = parse_portion, required = true)]
        portions: Vec<(String, u32)>,
    },
    /// Browse and manage generated plans
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },
    /// List saved recipes
    Saved,
    /// Print the whole state plus current targets as JSON
    Export,
}

#[derive(Args, Debug)]
pub struct NeedsArgs {
    /// Carbohydrate source grams per serving
    #[arg(long = "carbs", short = 'g', default_value_t = 100)]
    pub carbohydrate_g: u32,
    /// Meat/fish grams per serving
    #[arg(long = "protein", short = 'p', default_value_t = 200)]
    pub protein_g: u32,
    /// Vegetable grams per serving
    #[arg(long = "veg", short = 'l', default_value_t = 150)]
    pub vegetable_g: u32,
}

impl From<&NeedsArgs> for Needs {
    fn from(args: &NeedsArgs) -> Self {
        Needs::new(args.carbohydrate_g, args.protein_g, args.vegetable_g)
    }
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    Add {
        name: String,
        #[command(flatten)]
        needs: NeedsArgs,
    },
    /// Change a profile's name or needs; omitted values are kept
    Edit {
        /// Profile name or id
        profile: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "carbs", short = 'g')]
        carbohydrate_g: Option<u32>,
        #[arg(long = "protein", short = 'p')]
        protein_g: Option<u32>,
        #[arg(long = "veg", short = 'l')]
        vegetable_g: Option<u32>,
    },
    Remove {
        profile: String,
    },
    /// Activate or deactivate a profile
    Toggle {
        profile: String,
    },
    List,
}

#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Free text such as "interdits: friteuse; allergies: arachide; éviter: coriandre; cuisines: thaï"
    #[arg(long)]
    pub text: Option<String>,
    /// Comma-separated list of available equipment
    #[arg(long)]
    pub equipment: Option<String>,
    #[arg(long)]
    pub wishes: Option<String>,
    #[arg(long)]
    pub pantry: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    List,
    /// Print a plan as pretty JSON
    Export {
        id: uuid::Uuid,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Delete {
        id: uuid::Uuid,
    },
    Clear,
}

fn parse_portion(s: &str) -> Result<(String, u32), String> {
    let (name, count) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=COUNT, got '{}'", s))?;
    let count = count
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid portion count in '{}': {}", s, e))?;
    Ok((name.trim().to_string(), count))
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
