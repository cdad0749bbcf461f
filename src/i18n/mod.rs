//! Interface strings in the site's language
//!
//! `pt-BR` and `en` tables are built in. YAML or JSON files named after a
//! language (`languages/pt-BR.yml`) override single keys.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

type Table = HashMap<String, serde_yaml::Value>;

const BUILTIN: [(&str, &str); 2] = [
    ("pt-BR", include_str!("languages/pt-BR.yml")),
    ("en", include_str!("languages/en.yml")),
];

/// Translation lookup with English fallback
#[derive(Debug, Clone)]
pub struct I18n {
    language: String,
    translations: HashMap<String, Table>,
}

impl I18n {
    /// Create a handler with the built-in tables
    pub fn new(language: &str) -> Self {
        let mut translations = HashMap::new();
        for (lang, source) in BUILTIN {
            match serde_yaml::from_str::<Table>(source) {
                Ok(table) => {
                    translations.insert(lang.to_string(), table);
                }
                Err(e) => tracing::error!("Built-in language table {} is invalid: {}", lang, e),
            }
        }
        Self {
            language: language.to_string(),
            translations,
        }
    }

    /// Merge language files from a directory over the built-in tables
    pub fn load_languages<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if !path.is_file() || !matches!(ext, Some("yml") | Some("yaml") | Some("json")) {
                continue;
            }
            let Some(lang) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            // JSON is valid YAML, one parser covers both
            let content = fs::read_to_string(&path)?;
            match serde_yaml::from_str::<Table>(&content) {
                Ok(table) => {
                    let target = self.translations.entry(lang.to_string()).or_default();
                    merge(target, table);
                    tracing::debug!("Loaded language file: {:?}", path);
                }
                Err(e) => tracing::warn!("Failed to parse language file {:?}: {}", path, e),
            }
        }

        Ok(())
    }

    /// Get the current language
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Get a translation by dotted key, e.g. `date.updated`
    pub fn get(&self, key: &str) -> String {
        let languages = [self.language.as_str(), "en"];
        languages
            .iter()
            .filter_map(|lang| self.translations.get(*lang))
            .find_map(|table| lookup(table, key))
            .map(yaml_value_to_string)
            .unwrap_or_else(|| key.to_string())
    }

    /// Get a pluralized translation; `%d` is replaced by the count
    pub fn get_plural(&self, key: &str, count: u64) -> String {
        let form = match count {
            0 => "zero",
            1 => "one",
            _ => "other",
        };
        self.get(&format!("{}.{}", key, form))
            .replace("%d", &count.to_string())
    }

    /// All translations for the current language, flattened to dotted keys
    pub fn all(&self) -> HashMap<String, String> {
        let mut result = HashMap::new();
        if let Some(en) = self.translations.get("en") {
            flatten(en, "", &mut result);
        }
        if let Some(current) = self.translations.get(&self.language) {
            flatten(current, "", &mut result);
        }
        result
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new("pt-BR")
    }
}

fn merge(target: &mut Table, overrides: Table) {
    for (key, value) in overrides {
        match (target.get_mut(&key), value) {
            (Some(serde_yaml::Value::Mapping(existing)), serde_yaml::Value::Mapping(new)) => {
                for (k, v) in new {
                    existing.insert(k, v);
                }
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

fn lookup<'a>(table: &'a Table, key: &str) -> Option<&'a serde_yaml::Value> {
    let mut parts = key.split('.');
    let mut current = table.get(parts.next()?)?;
    for part in parts {
        current = current.as_mapping()?.get(part)?;
    }
    Some(current)
}

fn yaml_value_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        _ => format!("{:?}", value),
    }
}

fn flatten(table: &Table, prefix: &str, result: &mut HashMap<String, String>) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            serde_yaml::Value::Mapping(map) => {
                let nested: Table = map
                    .iter()
                    .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.clone())))
                    .collect();
                flatten(&nested, &full_key, result);
            }
            other => {
                result.insert(full_key, yaml_value_to_string(other));
            }
        }
    }
}
