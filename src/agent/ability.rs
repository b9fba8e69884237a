//! Agent ability catalog (static data)

use serde::{Deserialize, Serialize};

use crate::core::error::Result;

/// A trained ability. Reductions and bonuses stack additively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub id: String,
    pub name: String,
    /// Flat reduction to mission risk
    #[serde(default)]
    pub risk_reduction: f64,
    /// Fractional bonus to mission progress rate
    #[serde(default)]
    pub speed_bonus: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbilityCatalog {
    abilities: Vec<Ability>,
}

impl AbilityCatalog {
    pub fn new(abilities: Vec<Ability>) -> Self {
        Self { abilities }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let abilities: Vec<Ability> = serde_json::from_str(content)?;
        Ok(Self { abilities })
    }

    pub fn get(&self, id: &str) -> Option<&Ability> {
        self.abilities.iter().find(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ability> {
        self.abilities.iter()
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }

    /// Total (risk_reduction, speed_bonus) for a set of ability ids.
    /// Unknown ids contribute nothing.
    pub fn modifiers<'a>(&self, ids: impl IntoIterator<Item = &'a String>) -> (f64, f64) {
        ids.into_iter()
            .filter_map(|id| self.get(id))
            .fold((0.0, 0.0), |(risk, speed), a| (risk + a.risk_reduction, speed + a.speed_bonus))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_modifiers() {
        let catalog = AbilityCatalog::from_json_str(
            r#"[
                {"id": "tradecraft", "name": "Tradecraft", "risk_reduction": 0.05},
                {"id": "linguist", "name": "Linguist", "speed_bonus": 0.2}
            ]"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        let ids = vec!["tradecraft".to_string(), "linguist".to_string(), "bogus".to_string()];
        let (risk, speed) = catalog.modifiers(&ids);
        assert!((risk - 0.05).abs() < 1e-12);
        assert!((speed - 0.2).abs() < 1e-12);
    }
}
