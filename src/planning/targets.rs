use serde::{Deserialize, Serialize};
use tracing::debug;

use super::grid::{AttendanceGrid, Profile};
use crate::recipe_parser::{MacroTargets, Portions};

/// No one eats the same recipe more than this many times.
pub const MAX_SERVINGS_PER_RECIPE: u32 = 3;

/// Portions and gram targets the generator must honor for one recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeTargetRequest {
    pub portions: Portions,
    pub targets: MacroTargets,
}

/// Splits a meal count into groups of at most three, largest first.
///
/// `7` becomes `[3, 3, 1]`, `0` becomes `[]`.
pub fn split_into_buckets(count: u32) -> Vec<u32> {
    let mut buckets = Vec::with_capacity(count.div_ceil(MAX_SERVINGS_PER_RECIPE) as usize);
    let mut remaining = count;
    while remaining > 0 {
        let take = remaining.min(MAX_SERVINGS_PER_RECIPE);
        buckets.push(take);
        remaining -= take;
    }
    buckets
}

/// Total raw grams per category that `portions` require from `profiles`.
///
/// Profiles missing from `portions` contribute nothing.
pub fn required_grams(profiles: &[Profile], portions: &Portions) -> MacroTargets {
    profiles.iter().fold(MacroTargets::default(), |acc, p| {
        let n = portions.get(&p.name).copied().unwrap_or(0);
        MacroTargets {
            carbohydrate_g: acc
                .carbohydrate_g
                .saturating_add(p.needs.carbohydrate_g.saturating_mul(n)),
            protein_g: acc.protein_g.saturating_add(p.needs.protein_g.saturating_mul(n)),
            vegetable_g: acc
                .vegetable_g
                .saturating_add(p.needs.vegetable_g.saturating_mul(n)),
        }
    })
}

/// Turns the attendance grid into one target request per recipe to generate.
///
/// Inactive profiles are ignored even if they still have checked cells. An
/// empty result means there is nothing to generate.
///
/// # Arguments
/// * `profiles`: every profile, in display order.
/// * `grid`: the attendance grid.
pub fn derive_targets(profiles: &[Profile], grid: &AttendanceGrid) -> Vec<RecipeTargetRequest> {
    let active: Vec<Profile> = profiles.iter().filter(|p| p.active).cloned().collect();
    let buckets: Vec<Vec<u32>> = active
        .iter()
        .map(|p| split_into_buckets(grid.count_for(p.id)))
        .collect();
    let recipe_count = buckets.iter().map(Vec::len).max().unwrap_or(0);
    debug!(
        "Deriving {} recipe target(s) for {} active profile(s)",
        recipe_count,
        active.len()
    );

    (0..recipe_count)
        .map(|i| {
            let portions: Portions = active
                .iter()
                .zip(&buckets)
                .map(|(p, b)| (p.name.clone(), b.get(i).copied().unwrap_or(0)))
                .collect();
            let targets = required_grams(&active, &portions);
            RecipeTargetRequest { portions, targets }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::grid::{Day, Meal, Needs};
    use rand::Rng;

    fn attend(grid: &mut AttendanceGrid, profile: &Profile, slots: usize) {
        let cells = Day::ALL
            .iter()
            .flat_map(|d| Meal::ALL.iter().map(move |m| (*d, *m)))
            .take(slots);
        for (day, meal) in cells {
            grid.set(day, meal, profile.id, true);
        }
    }

    fn household() -> (Profile, Profile) {
        (
            Profile::new("Thomas", Needs::new(100, 200, 150)),
            Profile::new("Anaïs", Needs::new(50, 100, 250)),
        )
    }

    #[test]
    fn test_split_into_buckets_cases() {
        assert_eq!(split_into_buckets(0), Vec::<u32>::new());
        assert_eq!(split_into_buckets(1), vec![1]);
        assert_eq!(split_into_buckets(3), vec![3]);
        assert_eq!(split_into_buckets(7), vec![3, 3, 1]);
        assert_eq!(split_into_buckets(14), vec![3, 3, 3, 3, 2]);
    }

    #[test]
    fn test_split_into_buckets_properties() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let n: u32 = rng.gen_range(0..100);
            let buckets = split_into_buckets(n);
            assert_eq!(buckets.len() as u32, n.div_ceil(3));
            assert!(buckets.iter().all(|b| (1..=3).contains(b)));
            assert_eq!(buckets.iter().sum::<u32>(), n);
        }
    }

    #[test]
    fn test_household_scenario() {
        let (thomas, anais) = household();
        let mut grid = AttendanceGrid::new();
        attend(&mut grid, &thomas, 7);
        attend(&mut grid, &anais, 2);

        let requests = derive_targets(&[thomas, anais], &grid);
        assert_eq!(requests.len(), 3);

        let portions: Vec<Vec<(&str, u32)>> = requests
            .iter()
            .map(|r| r.portions.iter().map(|(n, v)| (n.as_str(), *v)).collect())
            .collect();
        assert_eq!(portions[0], vec![("Thomas", 3), ("Anaïs", 2)]);
        assert_eq!(portions[1], vec![("Thomas", 3), ("Anaïs", 0)]);
        assert_eq!(portions[2], vec![("Thomas", 1), ("Anaïs", 0)]);

        assert_eq!(
            requests[0].targets,
            MacroTargets {
                carbohydrate_g: 400,
                protein_g: 800,
                vegetable_g: 950,
            }
        );
        assert_eq!(requests[2].targets.protein_g, 200);
    }

    #[test]
    fn test_inactive_profiles_are_ignored() {
        let (thomas, mut anais) = household();
        anais.active = false;
        let mut grid = AttendanceGrid::new();
        attend(&mut grid, &thomas, 2);
        attend(&mut grid, &anais, 9);

        let requests = derive_targets(&[thomas, anais], &grid);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].portions.len(), 1);
        assert_eq!(requests[0].targets.carbohydrate_g, 200);
    }

    #[test]
    fn test_nothing_to_generate() {
        let (thomas, anais) = household();
        assert!(derive_targets(&[thomas.clone(), anais], &AttendanceGrid::new()).is_empty());

        let mut grid = AttendanceGrid::new();
        attend(&mut grid, &thomas, 4);
        let mut inactive = thomas;
        inactive.active = false;
        assert!(derive_targets(&[inactive], &grid).is_empty());
        assert!(derive_targets(&[], &grid).is_empty());
    }

    #[test]
    fn test_targets_are_linear_in_needs() {
        let (thomas, anais) = household();
        let mut grid = AttendanceGrid::new();
        attend(&mut grid, &thomas, 5);
        attend(&mut grid, &anais, 8);
        let base = derive_targets(&[thomas.clone(), anais.clone()], &grid);

        let double = |p: &Profile| {
            let mut p = p.clone();
            p.needs = Needs::new(
                p.needs.carbohydrate_g * 2,
                p.needs.protein_g * 2,
                p.needs.vegetable_g * 2,
            );
            p
        };
        let doubled = derive_targets(&[double(&thomas), double(&anais)], &grid);

        assert_eq!(base.len(), doubled.len());
        for (b, d) in base.iter().zip(&doubled) {
            assert_eq!(b.portions, d.portions);
            assert_eq!(d.targets.carbohydrate_g, b.targets.carbohydrate_g * 2);
            assert_eq!(d.targets.protein_g, b.targets.protein_g * 2);
            assert_eq!(d.targets.vegetable_g, b.targets.vegetable_g * 2);
        }
    }
}
