//! scope hierarchy
//!
//! Variables live at one of these scopes, ordered from broadest to narrowest:
//!
//! | scope                                  | rank |
//! |----------------------------------------|------|
//! | `BUILT_IN`                             | -1   |
//! | `PROJECT`                              | 1    |
//! | `ENVIRONMENT`                          | 2    |
//! | `APPLICATION`, `CONTAINER`, `JOB`, `HELM` | 3 |
//!
//! The four rank-3 scopes are collectively called "service" scopes and compare equal to each other.
//!
//! A scope that is not known (not selected yet, or a name we cannot parse) is passed around as `None`
//! and ranks like `BUILT_IN`, so it never wins a precedence check.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    BuiltIn,
    Project,
    Environment,
    Application,
    Container,
    Job,
    Helm,
}

/// Rank of anything we cannot place in the hierarchy
pub const UNKNOWN_RANK: i8 = -1;

impl Scope {
    /// All scopes, ascending by rank
    pub const ALL: [Scope; 7] = [
        Scope::BuiltIn,
        Scope::Project,
        Scope::Environment,
        Scope::Application,
        Scope::Container,
        Scope::Job,
        Scope::Helm,
    ];

    pub fn rank(self) -> i8 {
        match self {
            Scope::BuiltIn => -1,
            Scope::Project => 1,
            Scope::Environment => 2,
            Scope::Application | Scope::Container | Scope::Job | Scope::Helm => 3,
        }
    }

    /// `APPLICATION`, `CONTAINER`, `JOB` or `HELM`
    pub fn is_service(self) -> bool {
        self.rank() == 3
    }

    /// Name as used by the platform API
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::BuiltIn => "BUILT_IN",
            Scope::Project => "PROJECT",
            Scope::Environment => "ENVIRONMENT",
            Scope::Application => "APPLICATION",
            Scope::Container => "CONTAINER",
            Scope::Job => "JOB",
            Scope::Helm => "HELM",
        }
    }

    /// Human readable label for scope pickers
    pub fn label(self) -> &'static str {
        match self {
            Scope::BuiltIn => "Built-in",
            Scope::Project => "Project",
            Scope::Environment => "Environment",
            Scope::Application => "Application",
            Scope::Container => "Container",
            Scope::Job => "Job",
            Scope::Helm => "Helm",
        }
    }

    /// `true` if `self` is strictly more specific than `other`
    pub fn is_narrower_than(self, other: Scope) -> bool {
        self.rank() > other.rank()
    }
}

/// Rank of a possibly unknown scope
pub fn rank(scope: Option<Scope>) -> i8 {
    scope.map(Scope::rank).unwrap_or(UNKNOWN_RANK)
}

/// Compare two possibly unknown scopes by rank
pub fn compare(a: Option<Scope>, b: Option<Scope>) -> Ordering {
    rank(a).cmp(&rank(b))
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Scope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Scope::ALL
            .into_iter()
            .find(|scope| scope.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownScope(s.to_string()))
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown scope `{0}`")]
pub struct UnknownScope(pub String);

/// Parse a scope name, degrading to `None` for anything unknown
pub fn parse_lenient(name: &str) -> Option<Scope> {
    match name.parse() {
        Ok(scope) => Some(scope),
        Err(err) => {
            tracing::trace!(%err, "treating scope as unknown");
            None
        }
    }
}
