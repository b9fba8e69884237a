//! Action descriptors and the TOML-backed catalog

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::actions::effect::Effect;
use crate::actions::predicate::Predicate;
use crate::core::error::{Result, SimError};
use crate::faction::Resources;

/// What the player picks when invoking an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Threat,
    Region,
    #[default]
    None,
}

/// A purely declarative action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cost: Resources,
    #[serde(default)]
    pub target: TargetType,
    /// All must hold, checked in order
    #[serde(default)]
    pub availability: Vec<Predicate>,
    /// Applied in order
    #[serde(default)]
    pub effects: Vec<Effect>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "action")]
    actions: Vec<ActionDescriptor>,
}

/// Ordered set of actions, unique by id
#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    actions: Vec<ActionDescriptor>,
}

impl ActionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a catalog.
    ///
    /// Effects that cannot bind are an error. Unknown predicate names only
    /// warn, since they fail closed at runtime.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        let catalog = Self { actions: file.actions };
        let report = catalog.validate();
        for warning in &report.warnings {
            warn!("Action catalog: {}", warning);
        }
        if !report.errors.is_empty() {
            return Err(SimError::Data(report.errors.join("; ")));
        }
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Add or replace an action by id
    pub fn insert(&mut self, action: ActionDescriptor) {
        match self.actions.iter_mut().find(|a| a.id == action.id) {
            Some(slot) => *slot = action,
            None => self.actions.push(action),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ActionDescriptor> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionDescriptor> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Type-check every action's target/method/param combination
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();
        let mut seen = AHashSet::new();
        for action in &self.actions {
            if !seen.insert(action.id.as_str()) {
                report.errors.push(format!("duplicate action id '{}'", action.id));
            }
            for (i, effect) in action.effects.iter().enumerate() {
                if let Err(e) = effect.check(action.target) {
                    report.errors.push(format!("{} effect {}: {}", action.id, i, e));
                }
            }
            for predicate in &action.availability {
                for issue in predicate.unknown_names() {
                    report.warnings.push(format!("{}: {}", action.id, issue));
                }
            }
        }
        report
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}
