use super::{Repository, StoreResult};

/// Default interest categories offered during onboarding.
const DEFAULT_INTERESTS: &[(&str, &str)] = &[
    ("Hiking", "mountain"),
    ("Photography", "camera"),
    ("Cooking", "utensils"),
    ("Music", "music"),
    ("Art", "palette"),
    ("Sports", "football"),
    ("Technology", "laptop-code"),
    ("Travel", "plane"),
    ("Books", "book"),
    ("Movies", "film"),
    ("Gaming", "gamepad"),
    ("Fitness", "dumbbell"),
];

/// Seed the default interest categories.
/// Only seeds if no categories exist yet (idempotent guard).
/// Returns the number of categories created.
pub fn seed_interest_categories(store: &dyn Repository) -> StoreResult<usize> {
    if !store.get_all_interest_categories()?.is_empty() {
        return Ok(0);
    }

    for (name, icon) in DEFAULT_INTERESTS {
        store.create_interest_category(name, Some(icon))?;
    }

    Ok(DEFAULT_INTERESTS.len())
}
