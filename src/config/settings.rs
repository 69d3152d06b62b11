//! User-editable global settings.
//!
//! Settings live as one JSON blob under [`GLOBAL_SETTINGS_KEY`]. Reads never
//! fail: a missing or malformed blob yields defaults. Writes merge into the
//! raw stored object so fields this build does not know about, or cannot
//! read, survive. A blob that is not a JSON object is never overwritten by a
//! partial write.

use crate::storage::KeyValueStore;
use crate::{Error, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Key of the settings blob.
pub const GLOBAL_SETTINGS_KEY: &str = "mycelial-global-settings";

/// Global settings shared by every component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalSettings {
    /// `OpenRouter` API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_router_api_key: Option<String>,
    /// Gemini API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    /// Google Custom Search API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search_api_key: Option<String>,
    /// Google Custom Search engine id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search_cx: Option<String>,
    /// Default chat model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    /// UI theme.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Fields not modelled above, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GlobalSettings {
    /// Merges `other` into `self`: set fields in `other` win, unset fields
    /// keep their current value, and extra fields are unioned.
    pub fn merge(&mut self, other: Self) {
        fn take(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.open_router_api_key, other.open_router_api_key);
        take(&mut self.gemini_api_key, other.gemini_api_key);
        take(&mut self.google_search_api_key, other.google_search_api_key);
        take(&mut self.google_search_cx, other.google_search_cx);
        take(&mut self.default_model, other.default_model);
        take(&mut self.theme, other.theme);
        self.extra.extend(other.extra);
    }
}

/// Reads and writes [`GlobalSettings`] through a key-value store.
///
/// API key accessors fall back to the conventional environment variables
/// (`OPENROUTER_API_KEY`, `GEMINI_API_KEY`, `GOOGLE_SEARCH_API_KEY`,
/// `GOOGLE_SEARCH_CX`) when the blob leaves them unset or empty.
#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsService {
    /// Creates a settings service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Loads settings, using defaults for a missing or malformed blob.
    ///
    /// A known field holding a value of the wrong type reads as unset; the
    /// other fields still load.
    #[must_use]
    pub fn load(&self) -> GlobalSettings {
        match self.store.get(GLOBAL_SETTINGS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(object)) => settings_from_object(&object),
                Ok(_) => {
                    tracing::warn!("Global settings blob is not an object, using defaults");
                    GlobalSettings::default()
                },
                Err(e) => {
                    tracing::warn!("Malformed global settings, using defaults: {e}");
                    GlobalSettings::default()
                },
            },
            Ok(None) => GlobalSettings::default(),
            Err(e) => {
                tracing::warn!("Failed to read global settings, using defaults: {e}");
                GlobalSettings::default()
            },
        }
    }

    /// Replaces the stored settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be serialized or written.
    pub fn save(&self, settings: &GlobalSettings) -> Result<()> {
        let raw = serde_json::to_string(settings)
            .map_err(|e| Error::operation("serialize_settings", e))?;
        self.store.set(GLOBAL_SETTINGS_KEY, &raw)
    }

    /// Loads, applies `f`, and writes back only the fields `f` changed.
    /// Returns the resulting settings.
    ///
    /// Fields `f` leaves alone keep their stored JSON, including known fields
    /// that [`Self::load`] could not read.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored blob is present but not a JSON object,
    /// or if the settings cannot be written.
    pub fn update(&self, f: impl FnOnce(&mut GlobalSettings)) -> Result<GlobalSettings> {
        let mut object = self.stored_object()?;
        let before = settings_from_object(&object);
        let mut after = before.clone();
        f(&mut after);

        let before = settings_to_object(&before)?;
        let changed = settings_to_object(&after)?;
        let keys: Vec<String> = before.keys().chain(changed.keys()).cloned().collect();
        for key in keys {
            if before.get(&key) == changed.get(&key) {
                continue;
            }
            match changed.get(&key) {
                Some(value) => object.insert(key, value.clone()),
                None => object.remove(&key),
            };
        }
        self.write_object(object)
    }

    /// Merges a partial settings value into the stored one.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored blob is unreadable or cannot be written.
    pub fn merge(&self, patch: GlobalSettings) -> Result<GlobalSettings> {
        self.update(|settings| settings.merge(patch))
    }

    /// Sets a single field by its JSON name (e.g. `openRouterApiKey`).
    ///
    /// Unknown names are stored as extra fields. An empty value removes the
    /// field.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, the stored blob is unreadable,
    /// or the settings cannot be written.
    pub fn set_field(&self, name: &str, value: &str) -> Result<GlobalSettings> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("setting name is required".to_string()));
        }
        let mut object = self.stored_object()?;
        if value.is_empty() {
            object.remove(name);
        } else {
            object.insert(name.to_string(), Value::String(value.to_string()));
        }
        self.write_object(object)
    }

    /// Reads the raw stored object for a write.
    fn stored_object(&self) -> Result<Map<String, Value>> {
        let Some(raw) = self.store.get(GLOBAL_SETTINGS_KEY)? else {
            return Ok(Map::new());
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(object)) => Ok(object),
            Ok(_) => Err(Error::operation(
                "update_settings",
                "stored settings blob is not a JSON object",
            )),
            Err(e) => Err(Error::operation("update_settings", e)),
        }
    }

    fn write_object(&self, object: Map<String, Value>) -> Result<GlobalSettings> {
        let settings = settings_from_object(&object);
        let raw = serde_json::to_string(&Value::Object(object))
            .map_err(|e| Error::operation("serialize_settings", e))?;
        self.store.set(GLOBAL_SETTINGS_KEY, &raw)?;
        Ok(settings)
    }

    /// Returns the `OpenRouter` API key.
    #[must_use]
    pub fn open_router_api_key(&self) -> Option<SecretString> {
        secret_or_env(self.load().open_router_api_key, "OPENROUTER_API_KEY")
    }

    /// Returns the Gemini API key.
    #[must_use]
    pub fn gemini_api_key(&self) -> Option<SecretString> {
        secret_or_env(self.load().gemini_api_key, "GEMINI_API_KEY")
    }

    /// Returns the Google Custom Search API key.
    #[must_use]
    pub fn google_search_api_key(&self) -> Option<SecretString> {
        secret_or_env(self.load().google_search_api_key, "GOOGLE_SEARCH_API_KEY")
    }

    /// Returns the Google Custom Search engine id.
    #[must_use]
    pub fn google_search_cx(&self) -> Option<String> {
        non_empty(self.load().google_search_cx)
            .or_else(|| non_empty(std::env::var("GOOGLE_SEARCH_CX").ok()))
    }
}

/// JSON names of the typed fields of [`GlobalSettings`].
const KNOWN_FIELDS: [&str; 6] = [
    "openRouterApiKey",
    "geminiApiKey",
    "googleSearchApiKey",
    "googleSearchCx",
    "defaultModel",
    "theme",
];

/// Builds settings from a stored object, skipping known fields that are not
/// strings.
fn settings_from_object(object: &Map<String, Value>) -> GlobalSettings {
    let readable: Map<String, Value> = object
        .iter()
        .filter(|(key, value)| {
            !KNOWN_FIELDS.contains(&key.as_str()) || matches!(value, Value::String(_) | Value::Null)
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    serde_json::from_value(Value::Object(readable)).unwrap_or_else(|e| {
        tracing::warn!("Unreadable global settings, using defaults: {e}");
        GlobalSettings::default()
    })
}

fn settings_to_object(settings: &GlobalSettings) -> Result<Map<String, Value>> {
    match serde_json::to_value(settings) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Ok(Map::new()),
        Err(e) => Err(Error::operation("serialize_settings", e)),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn secret_or_env(value: Option<String>, env: &str) -> Option<SecretString> {
    non_empty(value)
        .or_else(|| non_empty(std::env::var(env).ok()))
        .map(SecretString::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyValueStore;
    use secrecy::ExposeSecret;

    fn service() -> (Arc<MemoryKeyValueStore>, SettingsService) {
        let store = Arc::new(MemoryKeyValueStore::new());
        let service = SettingsService::new(store.clone());
        (store, service)
    }

    #[test]
    fn test_missing_blob_reads_defaults() {
        let (_, service) = service();
        assert_eq!(service.load(), GlobalSettings::default());
    }

    #[test]
    fn test_malformed_blob_reads_defaults() {
        let (store, service) = service();
        store.set(GLOBAL_SETTINGS_KEY, "{oops").expect("seed");
        assert_eq!(service.load(), GlobalSettings::default());
    }

    #[test]
    fn test_merge_preserves_other_fields() {
        let (store, service) = service();
        store
            .set(
                GLOBAL_SETTINGS_KEY,
                r#"{"openRouterApiKey":"sk-or-1","theme":"dark","sidebarWidth":320}"#,
            )
            .expect("seed");

        let merged = service
            .merge(GlobalSettings {
                default_model: Some("openai/gpt-4o-mini".to_string()),
                ..GlobalSettings::default()
            })
            .expect("merge");

        assert_eq!(merged.open_router_api_key.as_deref(), Some("sk-or-1"));
        assert_eq!(merged.theme.as_deref(), Some("dark"));
        assert_eq!(merged.default_model.as_deref(), Some("openai/gpt-4o-mini"));
        assert_eq!(merged.extra.get("sidebarWidth"), Some(&Value::from(320)));

        let raw = store.get(GLOBAL_SETTINGS_KEY).expect("get").expect("blob");
        assert!(raw.contains("\"sidebarWidth\":320"));
    }

    #[test]
    fn test_set_field_known_and_unknown() {
        let (_, service) = service();
        let settings = service.set_field("openRouterApiKey", "sk-or-2").expect("set");
        assert_eq!(settings.open_router_api_key.as_deref(), Some("sk-or-2"));

        let settings = service.set_field("accent", "green").expect("set extra");
        assert_eq!(settings.extra.get("accent"), Some(&Value::from("green")));

        let settings = service.set_field("openRouterApiKey", "").expect("clear");
        assert!(settings.open_router_api_key.is_none());
        assert!(service.set_field(" ", "x").is_err());
    }

    #[test]
    fn test_wrong_typed_field_does_not_erase_blob() {
        let (store, service) = service();
        store
            .set(
                GLOBAL_SETTINGS_KEY,
                r#"{"openRouterApiKey":"sk-keep","theme":{"mode":"dark"},"accent":"green"}"#,
            )
            .expect("seed");

        let loaded = service.load();
        assert_eq!(loaded.open_router_api_key.as_deref(), Some("sk-keep"));
        assert!(loaded.theme.is_none());

        service.set_field("geminiApiKey", "g").expect("set");
        service
            .update(|s| s.default_model = Some("openai/gpt-4o-mini".to_string()))
            .expect("update");

        let raw = store.get(GLOBAL_SETTINGS_KEY).expect("get").expect("blob");
        let stored: Value = serde_json::from_str(&raw).expect("stored json");
        assert_eq!(stored["openRouterApiKey"], "sk-keep");
        assert_eq!(stored["geminiApiKey"], "g");
        assert_eq!(stored["defaultModel"], "openai/gpt-4o-mini");
        assert_eq!(stored["theme"], serde_json::json!({"mode": "dark"}));
        assert_eq!(stored["accent"], "green");
    }

    #[test]
    fn test_unparseable_blob_is_not_overwritten() {
        let (store, service) = service();
        store.set(GLOBAL_SETTINGS_KEY, "{oops").expect("seed");

        let err = service.set_field("theme", "dark").expect_err("refuse write");
        assert!(matches!(err, Error::OperationFailed { .. }));
        assert!(service.merge(GlobalSettings::default()).is_err());
        let raw = store.get(GLOBAL_SETTINGS_KEY).expect("get").expect("blob");
        assert_eq!(raw, "{oops");
    }

    #[test]
    fn test_api_key_from_blob() {
        let (_, service) = service();
        service
            .update(|s| s.gemini_api_key = Some("g-key".to_string()))
            .expect("update");
        let key = service.gemini_api_key().expect("key present");
        assert_eq!(key.expose_secret(), "g-key");
    }
}
