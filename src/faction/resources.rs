//! Fungible faction resources and cost vectors

use serde::{Deserialize, Serialize};

/// A bag of fungible resources. Also used as a cost vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    pub funds: f64,
    pub intel: f64,
    pub tech: f64,
}

impl Resources {
    pub const ZERO: Resources = Resources {
        funds: 0.0,
        intel: 0.0,
        tech: 0.0,
    };

    pub fn new(funds: f64, intel: f64, tech: f64) -> Self {
        Self { funds, intel, tech }
    }

    pub fn funds(funds: f64) -> Self {
        Self { funds, ..Self::ZERO }
    }

    /// True if every component of `cost` is covered
    pub fn covers(&self, cost: &Resources) -> bool {
        self.funds >= cost.funds && self.intel >= cost.intel && self.tech >= cost.tech
    }

    pub fn is_zero(&self) -> bool {
        self.funds == 0.0 && self.intel == 0.0 && self.tech == 0.0
    }

    pub fn scaled(&self, factor: f64) -> Resources {
        Resources {
            funds: self.funds * factor,
            intel: self.intel * factor,
            tech: self.tech * factor,
        }
    }
}

impl std::ops::Add for Resources {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            funds: self.funds + rhs.funds,
            intel: self.intel + rhs.intel,
            tech: self.tech + rhs.tech,
        }
    }
}

impl std::ops::AddAssign for Resources {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers_requires_every_component() {
        let bag = Resources::new(100.0, 10.0, 0.0);
        assert!(bag.covers(&Resources::new(100.0, 10.0, 0.0)));
        assert!(!bag.covers(&Resources::new(50.0, 5.0, 1.0)));
        assert!(bag.covers(&Resources::ZERO));
    }

    #[test]
    fn test_partial_toml_cost() {
        let cost: Resources = toml::from_str("funds = 25.0").unwrap();
        assert_eq!(cost, Resources::funds(25.0));
    }
}
