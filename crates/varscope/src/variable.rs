//! variable model
//!
//! A [Variable] is a plain value, a secret, or a file mounted into a service. It can derive from another
//! variable in two ways:
//! - **alias**: a new key that resolves to the target's value
//! - **override**: the same key with a different value at a narrower scope
//!
//! The target of a derivation is stored as a [VariableRef], a snapshot of the parent taken when the
//! variable was fetched. It is never a live link: editing or deleting the parent does not touch it.
//!
//! On the wire (platform API) the two derivations are separate nullable fields `aliased_variable` and
//! `overridden_variable`. They are folded into [Derivation] while deserializing so that a variable
//! can never be both.
use crate::key_validation::{validate_key_format, KeyIssue};
use crate::scope::Scope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Keys starting with this (case-insensitive) belong to the platform
pub const RESERVED_PREFIX: &str = "qovery";

/// `true` if `key` starts with [RESERVED_PREFIX], ignoring case
pub fn has_reserved_prefix(key: &str) -> bool {
    key.get(..RESERVED_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(RESERVED_PREFIX))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableKind {
    Value,
    Alias,
    Override,
    File,
    BuiltIn,
}

impl std::fmt::Display for VariableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            VariableKind::Value => "VALUE",
            VariableKind::Alias => "ALIAS",
            VariableKind::Override => "OVERRIDE",
            VariableKind::File => "FILE",
            VariableKind::BuiltIn => "BUILT_IN",
        })
    }
}

/// Who manages the variable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    #[default]
    #[serde(rename = "QOVERY")]
    Platform,
    /// Synced from a Doppler project, edited there
    #[serde(rename = "DOPPLER")]
    Doppler,
    #[serde(other, rename = "EXTERNAL")]
    External,
}

impl Owner {
    pub fn is_external(self) -> bool {
        !matches!(self, Owner::Platform)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    Application,
    Container,
    Database,
    Job,
    Helm,
    Terraform,
}

/// Snapshot of the variable an alias or override points to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct VariableRef {
    pub id: String,
    pub key: String,
    #[new(default)]
    #[serde(default)]
    pub value: Option<String>,
    pub scope: Scope,
    #[new(default)]
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub mount_path: Option<String>,
    #[new(default)]
    #[serde(
        default,
        rename = "variable_type",
        alias = "type",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<VariableKind>,
}

impl VariableRef {
    /// Snapshot `variable` as a derivation target
    pub fn of(variable: &Variable) -> Self {
        Self {
            id: variable.id.clone(),
            key: variable.key.clone(),
            value: variable.value.clone(),
            scope: variable.scope,
            mount_path: variable.mount_path.clone(),
            kind: Some(variable.kind()),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == Some(VariableKind::File) || self.mount_path.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derivation {
    Alias(VariableRef),
    Override(VariableRef),
}

impl Derivation {
    pub fn target(&self) -> &VariableRef {
        match self {
            Derivation::Alias(target) | Derivation::Override(target) => target,
        }
    }

    pub fn kind(&self) -> VariableKind {
        match self {
            Derivation::Alias(_) => VariableKind::Alias,
            Derivation::Override(_) => VariableKind::Override,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawVariable", into = "RawVariable")]
pub struct Variable {
    pub id: String,
    pub key: String,
    /// `None` when the value is write-only (secrets)
    pub value: Option<String>,
    pub scope: Scope,
    pub is_secret: bool,
    pub description: Option<String>,
    pub mount_path: Option<String>,
    pub owned_by: Owner,
    pub derivation: Option<Derivation>,
    pub service_id: Option<String>,
    pub service_name: Option<String>,
    pub service_type: Option<ServiceType>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Variable {
    /// Plain, platform owned, public variable without a value
    pub fn new(id: impl Into<String>, key: impl Into<String>, scope: Scope) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            value: None,
            scope,
            is_secret: false,
            description: None,
            mount_path: None,
            owned_by: Owner::Platform,
            derivation: None,
            service_id: None,
            service_name: None,
            service_type: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_secret(mut self, is_secret: bool) -> Self {
        self.is_secret = is_secret;
        self
    }

    pub fn with_mount_path(mut self, mount_path: impl Into<String>) -> Self {
        self.mount_path = Some(mount_path.into());
        self
    }

    pub fn with_owner(mut self, owner: Owner) -> Self {
        self.owned_by = owner;
        self
    }

    pub fn with_service(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        service_type: ServiceType,
    ) -> Self {
        self.service_id = Some(id.into());
        self.service_name = Some(name.into());
        self.service_type = Some(service_type);
        self
    }

    /// Make this an alias of `target`
    pub fn aliasing(mut self, target: &Variable) -> Self {
        self.derivation = Some(Derivation::Alias(VariableRef::of(target)));
        self
    }

    /// Make this an override of `target`
    pub fn overriding(mut self, target: &Variable) -> Self {
        self.derivation = Some(Derivation::Override(VariableRef::of(target)));
        self
    }

    pub fn kind(&self) -> VariableKind {
        if self.scope == Scope::BuiltIn {
            return VariableKind::BuiltIn;
        }

        match &self.derivation {
            Some(derivation) => derivation.kind(),
            None if self.mount_path.is_some() => VariableKind::File,
            None => VariableKind::Value,
        }
    }

    pub fn aliased_variable(&self) -> Option<&VariableRef> {
        match &self.derivation {
            Some(Derivation::Alias(target)) => Some(target),
            _ => None,
        }
    }

    pub fn overridden_variable(&self) -> Option<&VariableRef> {
        match &self.derivation {
            Some(Derivation::Override(target)) => Some(target),
            _ => None,
        }
    }

    /// Not an alias or override
    pub fn is_root(&self) -> bool {
        self.derivation.is_none()
    }

    /// Content is mounted as a file, either directly or through the aliased/overridden parent
    pub fn is_file(&self) -> bool {
        match &self.derivation {
            Some(derivation) => derivation.target().is_file(),
            None => self.mount_path.is_some(),
        }
    }

    /// Path the file is mounted at, taken from the parent for aliases and overrides
    pub fn file_mount_path(&self) -> Option<&str> {
        match &self.derivation {
            Some(derivation) => {
                let target = derivation.target();
                target
                    .mount_path
                    .as_deref()
                    .filter(|_| target.is_file())
            }
            None => self.mount_path.as_deref(),
        }
    }

    /// Invariant violations of this single variable
    pub fn integrity_issues(&self) -> Vec<Issue> {
        let mut issues = vec![];

        if validate_key_format(&self.key) == Err(KeyIssue::ContainsWhitespace) {
            issues.push(Issue::KeyContainsWhitespace {
                id: self.id.clone(),
            });
        }

        if self.scope != Scope::BuiltIn && has_reserved_prefix(&self.key) {
            issues.push(Issue::ReservedPrefix {
                id: self.id.clone(),
            });
        }

        if let Some(target) = self.overridden_variable() {
            if target.scope.is_narrower_than(self.scope) {
                issues.push(Issue::BroaderThanTarget {
                    id: self.id.clone(),
                    scope: self.scope,
                    target_scope: target.scope,
                });
            }

            if target.key != self.key {
                issues.push(Issue::OverrideKeyMismatch {
                    id: self.id.clone(),
                    target_key: target.key.clone(),
                });
            }
        }

        let has_service_fields = self.service_id.is_some() || self.service_type.is_some();
        if has_service_fields && !self.scope.is_service() && self.scope != Scope::BuiltIn {
            issues.push(Issue::ServiceFieldsOutsideServiceScope {
                id: self.id.clone(),
                scope: self.scope,
            });
        }

        issues
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    KeyContainsWhitespace {
        id: String,
    },
    ReservedPrefix {
        id: String,
    },
    BroaderThanTarget {
        id: String,
        scope: Scope,
        target_scope: Scope,
    },
    OverrideKeyMismatch {
        id: String,
        target_key: String,
    },
    ServiceFieldsOutsideServiceScope {
        id: String,
        scope: Scope,
    },
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Issue::KeyContainsWhitespace { id } => write!(f, "{id}: key contains whitespace"),
            Issue::ReservedPrefix { id } => {
                write!(f, "{id}: key uses the reserved `{RESERVED_PREFIX}` prefix")
            }
            Issue::BroaderThanTarget {
                id,
                scope,
                target_scope,
            } => write!(
                f,
                "{id}: override at {scope} is broader than its target at {target_scope}"
            ),
            Issue::OverrideKeyMismatch { id, target_key } => {
                write!(f, "{id}: override key differs from its target `{target_key}`")
            }
            Issue::ServiceFieldsOutsideServiceScope { id, scope } => {
                write!(f, "{id}: service link on a {scope} variable")
            }
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("variable {id} has an empty key")]
    EmptyKey { id: String },
    #[error("variable {id} is both an alias and an override")]
    DoubleDerivation { id: String },
}

/// Platform API representation of a [Variable]
#[derive(Serialize, Deserialize)]
struct RawVariable {
    id: String,
    key: String,
    #[serde(default)]
    value: Option<String>,
    scope: Scope,
    #[serde(default)]
    is_secret: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    mount_path: Option<String>,
    #[serde(default)]
    owned_by: Owner,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    variable_type: Option<VariableKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aliased_variable: Option<VariableRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    overridden_variable: Option<VariableRef>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    service_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    service_type: Option<ServiceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<RawVariable> for Variable {
    type Error = ModelError;

    fn try_from(raw: RawVariable) -> Result<Self, Self::Error> {
        if raw.key.is_empty() {
            return Err(ModelError::EmptyKey { id: raw.id });
        }

        let derivation = match (raw.aliased_variable, raw.overridden_variable) {
            (Some(_), Some(_)) => return Err(ModelError::DoubleDerivation { id: raw.id }),
            (Some(target), None) => Some(Derivation::Alias(target)),
            (None, Some(target)) => Some(Derivation::Override(target)),
            (None, None) => None,
        };

        Ok(Self {
            id: raw.id,
            key: raw.key,
            value: raw.value,
            scope: raw.scope,
            is_secret: raw.is_secret,
            description: raw.description,
            mount_path: raw.mount_path,
            owned_by: raw.owned_by,
            derivation,
            service_id: raw.service_id,
            service_name: raw.service_name,
            service_type: raw.service_type,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        })
    }
}

impl From<Variable> for RawVariable {
    fn from(variable: Variable) -> Self {
        let variable_type = Some(variable.kind());
        let (aliased_variable, overridden_variable) = match variable.derivation {
            Some(Derivation::Alias(target)) => (Some(target), None),
            Some(Derivation::Override(target)) => (None, Some(target)),
            None => (None, None),
        };

        Self {
            id: variable.id,
            key: variable.key,
            value: variable.value,
            scope: variable.scope,
            is_secret: variable.is_secret,
            description: variable.description,
            mount_path: variable.mount_path,
            owned_by: variable.owned_by,
            variable_type,
            aliased_variable,
            overridden_variable,
            service_id: variable.service_id,
            service_name: variable.service_name,
            service_type: variable.service_type,
            created_at: variable.created_at,
            updated_at: variable.updated_at,
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|value| !value.is_empty()))
}
