//! Interest-overlap scoring used for "people you might like" suggestions.

use std::collections::BTreeSet;

use crate::db::models::User;

/// Number of interests two users share.
pub fn shared_interest_count(a: &BTreeSet<String>, b: &BTreeSet<String>) -> usize {
    a.intersection(b).count()
}

/// Rank `candidates` by how many interests they share with `me`, best first.
///
/// Users with no interests get no suggestions. `me` is never suggested to
/// itself. Ties keep the candidates' original order.
pub fn rank_by_shared_interests<'a, I>(me: &User, candidates: I, limit: usize) -> Vec<User>
where
    I: IntoIterator<Item = &'a User>,
{
    if me.interests.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, &User)> = candidates
        .into_iter()
        .filter(|u| u.id != me.id)
        .map(|u| (shared_interest_count(&me.interests, &u.interests), u))
        .collect();

    // sort_by is stable, so equal scores stay in id order
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored
        .into_iter()
        .take(limit)
        .map(|(_, u)| u.clone())
        .collect()
}
