use leptos::logging::warn;
use leptos::window;
use wasm_bindgen::JsValue;

use crate::state::UserProfile;

const TOKEN_KEY: &str = "token";
const USER_KEY: &str = "user";

/// Authenticated session, handed to components explicitly rather than read
/// from a hidden global. Persisted in local storage between visits.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

impl Session {
    /// Restores the session persisted by a previous login, if any.
    pub fn load() -> Option<Session> {
        let token = storage_get(TOKEN_KEY)?;
        let user = parse_user(&storage_get(USER_KEY)?)?;
        Some(Session { token, user })
    }

    pub fn store(&self) {
        storage_set(TOKEN_KEY, &self.token);
        match serde_json::to_string(&self.user) {
            Ok(json) => storage_set(USER_KEY, &json),
            Err(err) => warn!("Could not serialize the session user: {err}"),
        }
    }

    pub fn clear() {
        storage_remove(TOKEN_KEY);
        storage_remove(USER_KEY);
    }
}

fn parse_user(json: &str) -> Option<UserProfile> {
    match serde_json::from_str(json) {
        Ok(user) => Some(user),
        Err(err) => {
            warn!("Stored user payload is unreadable: {err}");
            None
        }
    }
}

fn storage_get(key: &str) -> Option<String> {
    window()
        .local_storage()
        .ok()
        .flatten()?
        .get_item(key)
        .ok()
        .flatten()
}

fn storage_set(key: &str, value: &str) {
    if let Err(err) = try_storage_set(key, value) {
        warn!("Could not persist {key}: {err:?}");
    }
}

fn try_storage_set(key: &str, value: &str) -> Result<(), JsValue> {
    let storage = window()
        .local_storage()?
        .ok_or_else(|| JsValue::from_str("local storage unavailable"))?;
    storage.set_item(key, value)
}

fn storage_remove(key: &str) {
    if let Ok(Some(storage)) = window().local_storage() {
        let _ = storage.remove_item(key);
    }
}
