//! Role classification for marked units.
//!
//! A root module is structurally also a library module, so eligibility
//! rules are kept in role priority order and the first match wins.

use crate::config::RolesConfig;
use crate::models::{CompilationUnit, Role};

type Predicate = Box<dyn Fn(&CompilationUnit) -> bool + Send + Sync>;

/// One eligibility rule.
struct Eligibility {
    role: Role,
    predicate: Predicate,
}

/// Ordered eligibility rules.
pub struct RoleClassifier {
    rules: Vec<Eligibility>,
    shapes: Vec<String>,
}

impl RoleClassifier {
    /// Create a classifier with no rules; every unit is `Invalid`.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            shapes: Vec::new(),
        }
    }

    /// Add a rule. Rules are evaluated by role priority, then insertion order,
    /// regardless of the order they are added in.
    pub fn rule<F>(mut self, role: Role, shape: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&CompilationUnit) -> bool + Send + Sync + 'static,
    {
        self.rules.push(Eligibility {
            role,
            predicate: Box::new(predicate),
        });
        self.rules.sort_by_key(|r| r.role.priority());
        self.shapes.push(shape.into());
        self
    }

    /// Classifier that decides roles by implemented traits.
    pub fn from_supertypes(roles: &RolesConfig) -> Self {
        let mut classifier = Self::new();

        for name in &roles.primary_traits {
            let wanted = name.clone();
            classifier = classifier.rule(Role::Primary, name.clone(), move |u| u.implements(&wanted));
        }
        for name in &roles.root_traits {
            let wanted = name.clone();
            classifier = classifier.rule(Role::Root, name.clone(), move |u| u.implements(&wanted));
        }

        classifier
    }

    /// Classify a unit.
    pub fn classify(&self, unit: &CompilationUnit) -> Role {
        self.rules
            .iter()
            .find(|rule| (rule.predicate)(unit))
            .map(|rule| rule.role)
            .unwrap_or(Role::Invalid)
    }

    /// Human-readable list of the recognized shapes, e.g. `LibraryModule and AppModule`.
    pub fn shapes(&self) -> String {
        match self.shapes.as_slice() {
            [] => "no".to_string(),
            [only] => only.clone(),
            [init @ .., last] => format!("{} and {}", init.join(", "), last),
        }
    }
}

impl Default for RoleClassifier {
    fn default() -> Self {
        Self::from_supertypes(&RolesConfig::default())
    }
}
