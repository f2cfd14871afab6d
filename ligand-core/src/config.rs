use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Mapper settings. Every key is optional in TOML.
///
/// ```toml
/// key_delimiter = "."
/// unwrap_keys = true
///
/// [relations]
/// inject = true
/// case = "snake"
/// plural_suffix = "s"
///
/// [relations.plurals]
/// person = "people"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Separator for compound keys such as `author.name`.
    pub key_delimiter: String,
    /// Expand compound keys before mapping.
    pub unwrap_keys: bool,
    pub relations: RelationNaming,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            key_delimiter: ".".to_string(),
            unwrap_keys: true,
            relations: RelationNaming::default(),
        }
    }
}

impl MapperConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// Case style for inverse-relation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingCase {
    /// `BlogPost` → `blog_post`
    #[default]
    Snake,
    /// `BlogPost` → `blogPost`
    Camel,
}

/// Naming convention for the inverse-relation keys injected into nested maps.
///
/// A nested map gets the parent instance under [`one`](Self::one) and a
/// one-element list holding the parent under [`many`](Self::many). Only the
/// immediate parent is injected; ancestors further up are not visible.
///
/// Keys default to snake case (`BlogPost` → `blog_post`) so they line up with
/// Rust field names. Data written for camelCase consumers expects `blogPost`;
/// select [`NamingCase::Camel`] for it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RelationNaming {
    /// Inject the hints at all.
    pub inject: bool,
    pub case: NamingCase,
    pub plural_suffix: String,
    /// Irregular plurals keyed by the singular key.
    pub plurals: IndexMap<String, String>,
}

impl Default for RelationNaming {
    fn default() -> Self {
        Self {
            inject: true,
            case: NamingCase::default(),
            plural_suffix: "s".to_string(),
            plurals: IndexMap::new(),
        }
    }
}

impl RelationNaming {
    /// Key for the to-one back reference.
    pub fn one(&self, type_name: &str) -> String {
        match self.case {
            NamingCase::Snake => snake_case(type_name),
            NamingCase::Camel => lower_first(type_name),
        }
    }

    /// Key for the to-many back reference.
    pub fn many(&self, type_name: &str) -> String {
        let one = self.one(type_name);
        match self.plurals.get(&one) {
            Some(plural) => plural.clone(),
            None => one + &self.plural_suffix,
        }
    }
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_uppercase() {
            out.push(c);
            continue;
        }
        if i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // acronyms stay together: HTTPRequest -> http_request
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}
