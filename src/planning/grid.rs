use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::nutritional_matcher::normalize_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Lun,
    Mar,
    Mer,
    Jeu,
    Ven,
    Sam,
    Dim,
}

impl Day {
    pub const ALL: [Day; 7] = [Day::Lun, Day::Mar, Day::Mer, Day::Jeu, Day::Ven, Day::Sam, Day::Dim];

    pub fn as_str(self) -> &'static str {
        match self {
            Day::Lun => "Lun",
            Day::Mar => "Mar",
            Day::Mer => "Mer",
            Day::Jeu => "Jeu",
            Day::Ven => "Ven",
            Day::Sam => "Sam",
            Day::Dim => "Dim",
        }
    }

    pub fn full_name(self) -> &'static str {
        match self {
            Day::Lun => "lundi",
            Day::Mar => "mardi",
            Day::Mer => "mercredi",
            Day::Jeu => "jeudi",
            Day::Ven => "vendredi",
            Day::Sam => "samedi",
            Day::Dim => "dimanche",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Day {
    type Err = String;

    /// Accepts the short form or the full French day name, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n = normalize_text(s);
        Day::ALL
            .into_iter()
            .find(|d| n == d.as_str().to_lowercase() || n == d.full_name())
            .ok_or_else(|| format!("unknown day '{}', expected one of Lun..Dim", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Meal {
    Midi,
    #[serde(rename = "Dîner")]
    Diner,
}

impl Meal {
    pub const ALL: [Meal; 2] = [Meal::Midi, Meal::Diner];

    pub fn as_str(self) -> &'static str {
        match self {
            Meal::Midi => "Midi",
            Meal::Diner => "Dîner",
        }
    }
}

impl fmt::Display for Meal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Meal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_text(s).as_str() {
            "midi" | "lunch" => Ok(Meal::Midi),
            "diner" | "soir" | "dinner" => Ok(Meal::Diner),
            _ => Err(format!("unknown meal '{}', expected Midi or Dîner", s)),
        }
    }
}

/// Grams per serving of each food category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Needs {
    /// Carbohydrate source (rice, pasta, ...).
    #[serde(rename = "G")]
    pub carbohydrate_g: u32,
    /// Meat, fish or other protein source.
    #[serde(rename = "P")]
    pub protein_g: u32,
    #[serde(rename = "V")]
    pub vegetable_g: u32,
}

impl Needs {
    pub fn new(carbohydrate_g: u32, protein_g: u32, vegetable_g: u32) -> Self {
        Self {
            carbohydrate_g,
            protein_g,
            vegetable_g,
        }
    }

    pub fn total(&self) -> u32 {
        self.carbohydrate_g
            .saturating_add(self.protein_g)
            .saturating_add(self.vegetable_g)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub needs: Needs,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Profile {
    pub fn new(name: impl Into<String>, needs: Needs) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            needs,
            active: true,
        }
    }
}

/// One checked cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub day: Day,
    pub meal: Meal,
    pub profile_id: Uuid,
}

/// Sparse day × meal × profile attendance. Only checked cells are stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttendanceGrid {
    slots: BTreeSet<Slot>,
}

impl AttendanceGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attending(&self, day: Day, meal: Meal, profile_id: Uuid) -> bool {
        self.slots.contains(&Slot {
            day,
            meal,
            profile_id,
        })
    }

    pub fn set(&mut self, day: Day, meal: Meal, profile_id: Uuid, attending: bool) {
        let slot = Slot {
            day,
            meal,
            profile_id,
        };
        if attending {
            self.slots.insert(slot);
        } else {
            self.slots.remove(&slot);
        }
    }

    /// Flips a cell and returns its new value.
    pub fn toggle(&mut self, day: Day, meal: Meal, profile_id: Uuid) -> bool {
        let attending = !self.is_attending(day, meal, profile_id);
        self.set(day, meal, profile_id, attending);
        attending
    }

    /// Drops every cell of a profile; returns how many were removed.
    pub fn remove_profile(&mut self, profile_id: Uuid) -> usize {
        let before = self.slots.len();
        self.slots.retain(|s| s.profile_id != profile_id);
        before - self.slots.len()
    }

    pub fn count_for(&self, profile_id: Uuid) -> u32 {
        self.slots.iter().filter(|s| s.profile_id == profile_id).count() as u32
    }

    /// Checked cells of a profile in day then meal order.
    pub fn slots_for(&self, profile_id: Uuid) -> impl Iterator<Item = &Slot> + '_ {
        self.slots.iter().filter(move |s| s.profile_id == profile_id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
