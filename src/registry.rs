use crate::error::RegistryError;
use crate::resources::{
    DEFAULT_DICTIONARY, PARENT_SECTIONS, POSSIBLE_SECTIONS, REQUIRED_SECTION_SETTINGS,
};
use crate::setting::{Setting, SettingType};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

static BUILTIN: LazyLock<Result<Registry, RegistryError>> =
    LazyLock::new(|| Registry::from_json(DEFAULT_DICTIONARY));

/// A scalar as it appears in dictionary data (`example: 0.3`, `example: true`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(value) => write!(f, "{value}"),
            Scalar::Integer(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingRecord {
    display_name: Option<String>,
    #[serde(rename = "type")]
    type_name: Option<String>,
    example: Option<Scalar>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    default_value: Option<Scalar>,
    #[serde(default, rename = "enum")]
    enum_values: Vec<String>,
    #[serde(default)]
    min_value: Option<f64>,
    #[serde(default)]
    max_value: Option<f64>,
    #[serde(default)]
    excludes: Vec<String>,
    #[serde(default)]
    multi_line: bool,
    #[serde(default)]
    section: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Dictionary {
    #[serde(default)]
    settings: Vec<SettingRecord>,
    #[serde(default)]
    required_settings: Option<HashMap<String, Vec<Vec<String>>>>,
    #[serde(default)]
    parent_sections: Option<HashMap<String, Vec<String>>>,
}

/// Read-only lookup of setting descriptors and section rules.
///
/// Built once from dictionary data and shared by reference between any
/// number of validators and formatters.
#[derive(Debug, Clone)]
pub struct Registry {
    settings: HashMap<String, Setting>,
    /// Canonical names in dictionary order, for deterministic suggestions.
    order: Vec<String>,
    required: HashMap<String, Vec<Vec<String>>>,
    parents: HashMap<String, Vec<String>>,
    sections: Vec<String>,
}

impl Registry {
    /// The registry built from the dictionary embedded in the crate.
    ///
    /// # Errors
    /// Returns the load error if the embedded dictionary is malformed.
    pub fn builtin() -> Result<&'static Registry, RegistryError> {
        BUILTIN.as_ref().map_err(Clone::clone)
    }

    /// # Errors
    /// Returns a `RegistryError` if the text is not a valid dictionary.
    pub fn from_json(text: &str) -> Result<Self, RegistryError> {
        let dictionary: Dictionary = serde_json::from_str(text)
            .map_err(|e| RegistryError::Malformed { message: e.to_string() })?;
        Self::from_dictionary(dictionary)
    }

    /// # Errors
    /// Returns a `RegistryError` if the text is not a valid dictionary.
    pub fn from_yaml(text: &str) -> Result<Self, RegistryError> {
        let dictionary: Dictionary = serde_yaml::from_str(text)
            .map_err(|e| RegistryError::Malformed { message: e.to_string() })?;
        Self::from_dictionary(dictionary)
    }

    /// Loads a dictionary file; `.yaml`/`.yml` files are read as YAML, anything else as JSON.
    ///
    /// # Errors
    /// Returns a `RegistryError` if the file can not be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| RegistryError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(&text),
            _ => Self::from_json(&text),
        }
    }

    fn from_dictionary(dictionary: Dictionary) -> Result<Self, RegistryError> {
        let mut settings = HashMap::new();
        let mut order = Vec::new();
        for record in dictionary.settings {
            let Some(setting) = Self::build_setting(record)? else {
                continue;
            };
            if settings.contains_key(&setting.name) {
                warn!(
                    "Setting '{}' collides with an earlier setting named '{}', keeping the first",
                    setting.display_name, setting.name
                );
                continue;
            }
            order.push(setting.name.clone());
            settings.insert(setting.name.clone(), setting);
        }

        let required: HashMap<String, Vec<Vec<String>>> = match dictionary.required_settings {
            Some(table) => table
                .into_iter()
                .map(|(section, slots)| {
                    let slots = slots
                        .into_iter()
                        .map(|slot| slot.iter().map(|name| Setting::canonical_name(name)).collect())
                        .collect();
                    (section, slots)
                })
                .collect(),
            None => REQUIRED_SECTION_SETTINGS
                .iter()
                .map(|(section, slots)| {
                    let slots = slots
                        .iter()
                        .map(|slot| slot.iter().map(|name| name.to_string()).collect())
                        .collect();
                    (section.to_string(), slots)
                })
                .collect(),
        };
        for (section, slots) in &required {
            let missing = slots.iter().flatten().find(|name| !settings.contains_key(*name));
            if let Some(missing) = missing {
                return Err(RegistryError::UnknownRequiredSetting {
                    section: section.clone(),
                    setting: missing.clone(),
                });
            }
        }

        let parents = dictionary.parent_sections.unwrap_or_else(|| {
            PARENT_SECTIONS
                .iter()
                .map(|(section, parents)| {
                    (section.to_string(), parents.iter().map(|p| p.to_string()).collect())
                })
                .collect()
        });

        debug!("Loaded {} settings", settings.len());
        Ok(Self {
            settings,
            order,
            required,
            parents,
            sections: POSSIBLE_SECTIONS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Converts one record. Records without a display name, type or example
    /// are skipped; an unsupported type tag fails the whole load.
    fn build_setting(record: SettingRecord) -> Result<Option<Setting>, RegistryError> {
        let (Some(display_name), Some(type_name), Some(example)) =
            (record.display_name, record.type_name, record.example)
        else {
            warn!("Skipping an incomplete dictionary record");
            return Ok(None);
        };
        let setting_type = SettingType::parse(&type_name).ok_or_else(|| RegistryError::UnknownType {
            setting: display_name.clone(),
            type_name: type_name.clone(),
        })?;
        let setting = Setting::new(display_name.as_str(), setting_type, example.to_string())
            .with_enum_values(&record.enum_values)
            .map_err(|e| RegistryError::Malformed {
                message: format!("invalid enum value of '{display_name}': {e}"),
            })?
            .with_bounds(record.min_value, record.max_value)
            .with_excludes(record.excludes)
            .with_multi_line(record.multi_line)
            .with_description(record.description.unwrap_or_default())
            .with_default_value(record.default_value.map(|v| v.to_string()))
            .with_section(record.section);
        Ok(Some(setting))
    }

    /// Finds a setting by any spelling of its name (`Start-Time`, `starttime`).
    pub fn lookup(&self, name: &str) -> Option<&Setting> {
        self.settings.get(&Setting::canonical_name(name.trim()))
    }

    /// Requirement slots of a section; each slot holds canonical setting names.
    pub fn required_settings_for(&self, section: &str) -> &[Vec<String>] {
        self.required.get(section).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All sections that may enclose `section`, nearest first, without duplicates.
    pub fn ancestor_sections_of(&self, section: &str) -> Vec<String> {
        let mut ancestors: Vec<String> = Vec::new();
        let mut pending: VecDeque<&str> = VecDeque::from([section]);
        while let Some(current) = pending.pop_front() {
            for parent in self.parents.get(current).into_iter().flatten() {
                if parent != section && !ancestors.contains(parent) {
                    ancestors.push(parent.clone());
                    pending.push_back(parent);
                }
            }
        }
        ancestors
    }

    pub fn is_known_section(&self, name: &str) -> bool {
        self.sections.iter().any(|section| section == name)
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(String::as_str)
    }

    /// Display names in dictionary order.
    pub fn display_names(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .filter_map(|name| self.settings.get(name))
            .map(|setting| setting.display_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}
