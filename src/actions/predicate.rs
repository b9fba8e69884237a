//! Availability predicates
//!
//! Unknown predicate types and comparators fail closed: they evaluate to
//! false and log a warning rather than erroring.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::actions::property::{Literal, PropertySource, Value, PLAYER_TOKEN};
use crate::core::types::FactionId;
use crate::region::Region;
use crate::threat::Threat;

/// Where a predicate reads its property from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PredicateKind {
    Threat,
    Region,
    World,
    /// Number of entities in a world collection matching a filter
    Count,
    Unknown(String),
}

impl From<String> for PredicateKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "threat" => Self::Threat,
            "region" => Self::Region,
            "world" => Self::World,
            "count" => Self::Count,
            _ => Self::Unknown(s),
        }
    }
}

impl From<PredicateKind> for String {
    fn from(kind: PredicateKind) -> Self {
        match kind {
            PredicateKind::Threat => "threat".into(),
            PredicateKind::Region => "region".into(),
            PredicateKind::World => "world".into(),
            PredicateKind::Count => "count".into(),
            PredicateKind::Unknown(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Comparator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Unknown(String),
}

impl From<String> for Comparator {
    fn from(s: String) -> Self {
        match s.as_str() {
            "eq" => Self::Eq,
            "neq" => Self::Neq,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            _ => Self::Unknown(s),
        }
    }
}

impl From<Comparator> for String {
    fn from(op: Comparator) -> Self {
        match op {
            Comparator::Eq => "eq".into(),
            Comparator::Neq => "neq".into(),
            Comparator::Gt => "gt".into(),
            Comparator::Gte => "gte".into(),
            Comparator::Lt => "lt".into(),
            Comparator::Lte => "lte".into(),
            Comparator::Unknown(s) => s,
        }
    }
}

impl Comparator {
    /// Ordering comparators only apply to numbers; anything else is false
    pub fn compare(&self, left: &Value, right: &Value) -> bool {
        let numbers = || Some((left.as_f64()?, right.as_f64()?));
        match self {
            Comparator::Eq => left == right,
            Comparator::Neq => left != right,
            Comparator::Gt => numbers().is_some_and(|(l, r)| l > r),
            Comparator::Gte => numbers().is_some_and(|(l, r)| l >= r),
            Comparator::Lt => numbers().is_some_and(|(l, r)| l < r),
            Comparator::Lte => numbers().is_some_and(|(l, r)| l <= r),
            Comparator::Unknown(name) => {
                warn!("Unknown comparator '{}', treating as false", name);
                false
            }
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Comparator::Unknown(_))
    }
}

/// Per-entity filter for count predicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub path: String,
    pub op: Comparator,
    pub value: Literal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    #[serde(rename = "type")]
    pub kind: PredicateKind,
    #[serde(default)]
    pub path: String,
    pub op: Comparator,
    pub value: Literal,
    /// Collection name for count predicates
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub filter: Option<Filter>,
}

/// World-level collections a count predicate may range over
pub trait Collections {
    /// Call `f` for every entity in `collection`. Returns false if the
    /// collection name is unknown.
    fn visit(&self, collection: &str, f: &mut dyn FnMut(&dyn PropertySource)) -> bool;
}

/// Everything a predicate can see
pub struct Scope<'a> {
    pub faction: FactionId,
    pub threat: Option<&'a Threat>,
    pub region: Option<&'a Region>,
    pub world: &'a dyn PropertySource,
    pub collections: &'a dyn Collections,
}

impl Predicate {
    pub fn evaluate(&self, scope: &Scope) -> bool {
        let expected = self.value.resolve(PLAYER_TOKEN, scope.faction);
        let actual = match &self.kind {
            PredicateKind::Threat => scope.threat.and_then(|t| t.property(&self.path)),
            PredicateKind::Region => scope.region.and_then(|r| r.property(&self.path)),
            PredicateKind::World => scope.world.property(&self.path),
            PredicateKind::Count => self.count(scope).map(|n| Value::Number(n as f64)),
            PredicateKind::Unknown(name) => {
                warn!("Unknown predicate type '{}', treating as false", name);
                return false;
            }
        };
        match actual {
            Some(actual) => self.op.compare(&actual, &expected),
            None => false,
        }
    }

    fn count(&self, scope: &Scope) -> Option<usize> {
        let Some(collection) = self.collection.as_deref() else {
            warn!("Count predicate without a collection");
            return None;
        };
        let filter = self
            .filter
            .as_ref()
            .map(|f| (f, f.value.resolve(PLAYER_TOKEN, scope.faction)));
        let mut n = 0;
        let known = scope.collections.visit(collection, &mut |entity| {
            let keep = match &filter {
                None => true,
                Some((f, expected)) => entity
                    .property(&f.path)
                    .is_some_and(|actual| f.op.compare(&actual, expected)),
            };
            if keep {
                n += 1;
            }
        });
        if !known {
            warn!("Unknown collection '{}' in count predicate", collection);
            return None;
        }
        Some(n)
    }

    /// Names that would fail closed at runtime
    pub fn unknown_names(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if let PredicateKind::Unknown(name) = &self.kind {
            issues.push(format!("unknown predicate type '{}'", name));
        }
        if let Comparator::Unknown(name) = &self.op {
            issues.push(format!("unknown comparator '{}'", name));
        }
        if let Some(Filter {
            op: Comparator::Unknown(name),
            ..
        }) = &self.filter
        {
            issues.push(format!("unknown filter comparator '{}'", name));
        }
        if self.kind == PredicateKind::Count && self.collection.is_none() {
            issues.push("count predicate without a collection".to_string());
        }
        issues
    }
}
