use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use leptos::logging::log;
use leptos::*;

use crate::api::ApiClient;
use crate::state::UserProfile;

/// How long a resolved identity stays fresh before the next lookup.
const CACHE_LIFETIME_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, PartialEq)]
struct CachedProfile {
    profile: UserProfile,
    fetched_at: DateTime<Utc>,
}

fn is_fresh(fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - fetched_at < Duration::seconds(CACHE_LIFETIME_SECS)
}

/// Identity resolver backed by `GET /users/{id}`.
///
/// Lookups are best-effort: a failed fetch leaves the caller's fallback
/// display values in place and is never surfaced to the user.
#[derive(Clone, Copy)]
pub struct UserDirectory {
    entries: RwSignal<HashMap<i64, CachedProfile>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        UserDirectory {
            entries: create_rw_signal(HashMap::new()),
        }
    }

    /// Reactive read; `None` until the id resolves.
    pub fn get(&self, id: i64) -> Option<UserProfile> {
        self.entries
            .with(|entries| entries.get(&id).map(|cached| cached.profile.clone()))
    }

    pub fn name_of(&self, id: i64) -> Option<String> {
        self.get(id).map(|profile| profile.name)
    }

    pub fn avatar_of(&self, id: i64) -> Option<String> {
        self.get(id).and_then(|profile| profile.avatar)
    }

    /// Queues lookups for every id without a fresh cache entry.
    pub fn prefetch(&self, api: &ApiClient, ids: impl IntoIterator<Item = i64>) {
        let now = Utc::now();
        for id in ids {
            if id <= 0 {
                continue;
            }
            let fresh = self.entries.with_untracked(|entries| {
                entries
                    .get(&id)
                    .is_some_and(|cached| is_fresh(cached.fetched_at, now))
            });
            if fresh {
                continue;
            }
            let api = api.clone();
            let entries = self.entries;
            spawn_local(async move {
                match api.get_json::<UserProfile>(&format!("/users/{id}")).await {
                    Ok(profile) => entries.update(|entries| {
                        entries.insert(
                            id,
                            CachedProfile {
                                profile,
                                fetched_at: Utc::now(),
                            },
                        );
                    }),
                    // Fallback display values stay in place.
                    Err(err) => log!("Identity lookup for user {id} failed: {err}"),
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn entries_expire_after_the_cache_lifetime() {
        let fetched = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert!(is_fresh(fetched, fetched + Duration::seconds(299)));
        assert!(!is_fresh(fetched, fetched + Duration::seconds(300)));
        assert!(!is_fresh(fetched, fetched + Duration::hours(2)));
    }
}
