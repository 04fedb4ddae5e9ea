//! create/edit flow for a single variable
//!
//! A flow is opened in a [FormMode] for a [VariableKind], anchored on a [ScopeContext]. Aliases,
//! overrides and edits start from an existing *base* variable. [prepare] computes what the form shows
//! (title, scopes to pick from, preselected scope, file path) and [build_request] turns the submitted
//! [FormData] into the [VariableRequest] for the platform.
use crate::availability::{compute_available_scopes, default_form_scope};
use crate::scope::Scope;
use crate::variable::{Variable, VariableKind};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormMode {
    Create,
    Update,
}

/// The page a flow is opened from, with the ids it knows about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeContext {
    Project {
        project_id: String,
    },
    Environment {
        project_id: String,
        environment_id: String,
    },
    Service {
        /// one of the service scopes
        scope: Scope,
        project_id: String,
        environment_id: String,
        service_id: String,
    },
}

impl ScopeContext {
    /// # Panic
    /// Panics if `scope` is not a service scope.
    pub fn service(
        scope: Scope,
        project_id: impl Into<String>,
        environment_id: impl Into<String>,
        service_id: impl Into<String>,
    ) -> Self {
        assert!(scope.is_service(), "{scope} is not a service scope");
        Self::Service {
            scope,
            project_id: project_id.into(),
            environment_id: environment_id.into(),
            service_id: service_id.into(),
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            ScopeContext::Project { .. } => Scope::Project,
            ScopeContext::Environment { .. } => Scope::Environment,
            ScopeContext::Service { scope, .. } => *scope,
        }
    }

    /// Id of the entity a variable at `scope` is attached to
    pub fn parent_id(&self, scope: Scope) -> Result<&str, FormError> {
        match (scope, self) {
            (Scope::Project, ScopeContext::Project { project_id })
            | (Scope::Project, ScopeContext::Environment { project_id, .. })
            | (Scope::Project, ScopeContext::Service { project_id, .. }) => {
                Ok(project_id.as_str())
            }
            (Scope::Environment, ScopeContext::Environment { environment_id, .. })
            | (Scope::Environment, ScopeContext::Service { environment_id, .. }) => {
                Ok(environment_id.as_str())
            }
            (
                Scope::Application | Scope::Container | Scope::Job | Scope::Helm,
                ScopeContext::Service {
                    scope: context_scope,
                    service_id,
                    ..
                },
            ) if scope == *context_scope => Ok(service_id.as_str()),
            (Scope::BuiltIn, _) => Err(FormError::ReadOnly),
            _ => Err(FormError::ScopeMismatch {
                scope,
                context: self.scope(),
            }),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("No scope selected")]
    ScopeMissing,
    #[error("Scope {scope} cannot be reached from a {context} page")]
    ScopeMismatch { scope: Scope, context: Scope },
    #[error("No variable to base the {0} on")]
    MissingBase(VariableKind),
    #[error("Please enter a mount path.")]
    MountPathMissing,
    #[error("Built-in variables are read-only")]
    ReadOnly,
    #[error("An override of a {target} variable needs a narrower scope than {scope}")]
    OverrideNotNarrower { scope: Scope, target: Scope },
    #[error("The scope of a variable cannot be changed from {from} to {to}")]
    ScopeImmutable { from: Scope, to: Scope },
}

/// Title of the form, e.g. "Create alias variable" or "New variable file"
pub fn title(mode: FormMode, kind: VariableKind, is_file: bool) -> String {
    let (verb, qualifier) = match (mode, kind) {
        // built-ins are never created, [build_request] rejects them
        (FormMode::Create, VariableKind::Value | VariableKind::File | VariableKind::BuiltIn) => {
            ("New", None)
        }
        (FormMode::Create, VariableKind::Alias) => ("Create", Some("alias")),
        (FormMode::Create, VariableKind::Override) => ("Create", Some("override")),
        (FormMode::Update, VariableKind::Alias) => ("Edit", Some("alias")),
        (FormMode::Update, VariableKind::Override) => ("Edit", Some("override")),
        (FormMode::Update, VariableKind::Value | VariableKind::File | VariableKind::BuiltIn) => {
            ("Edit", None)
        }
    };

    let mut words = vec![verb];
    words.extend(qualifier);
    words.push("variable");
    if is_file {
        words.push("file");
    }
    words.join(" ")
}

pub fn description(kind: VariableKind, is_file: bool) -> &'static str {
    match (kind, is_file) {
        (VariableKind::Alias, _) => {
            "Aliases allow you to specify a different name for a variable on a specific scope."
        }
        (VariableKind::Override, _) => {
            "Overrides allow you to define a different env var value on a specific scope."
        }
        (VariableKind::Value | VariableKind::File | VariableKind::BuiltIn, true) => {
            "The content of the Value field will be mounted as a file in the specified \"Path\". \
             Accessing the environment variable at runtime will return the \"Path\" of the file."
        }
        (VariableKind::Value | VariableKind::File | VariableKind::BuiltIn, false) => {
            "Variable are used at build/run time. Secrets are special variables, their value can \
             only be accessed by the application."
        }
    }
}

/// Everything the form needs before the user types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSetup {
    pub title: String,
    pub description: &'static str,
    pub available_scopes: Vec<Scope>,
    pub default_scope: Option<Scope>,
    pub is_file: bool,
    pub mount_path: Option<String>,
}

pub fn prepare(
    mode: FormMode,
    kind: VariableKind,
    context: &ScopeContext,
    base: Option<&Variable>,
) -> FormSetup {
    let is_file = kind == VariableKind::File || base.is_some_and(Variable::is_file);
    let creating_override = mode == FormMode::Create && kind == VariableKind::Override;
    let base_scope = base.map(|variable| variable.scope);

    let available_scopes: Vec<Scope> =
        compute_available_scopes(base_scope, false, Some(context.scope()), creating_override)
            .into_iter()
            .filter(|scope| *scope != Scope::BuiltIn)
            .collect();
    let default_scope = default_form_scope(base_scope, creating_override, &available_scopes);

    FormSetup {
        title: title(mode, kind, is_file),
        description: description(kind, is_file),
        available_scopes,
        default_scope,
        is_file,
        mount_path: base.and_then(Variable::file_mount_path).map(str::to_string),
    }
}

/// What the user submitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pub key: String,
    pub value: Option<String>,
    pub description: Option<String>,
    pub scope: Option<Scope>,
    pub is_secret: bool,
    pub mount_path: Option<String>,
    pub enable_interpolation_in_file: Option<bool>,
}

/// Mutation to send to the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum VariableRequest {
    Create {
        key: String,
        value: String,
        description: Option<String>,
        is_secret: bool,
        mount_path: Option<String>,
        variable_parent_id: String,
        variable_scope: Scope,
        enable_interpolation_in_file: Option<bool>,
    },
    CreateAlias {
        variable_id: String,
        key: String,
        description: Option<String>,
        alias_parent_id: String,
        alias_scope: Scope,
        enable_interpolation_in_file: bool,
    },
    CreateOverride {
        variable_id: String,
        value: String,
        description: Option<String>,
        override_parent_id: String,
        override_scope: Scope,
        enable_interpolation_in_file: bool,
    },
    Edit {
        variable_id: String,
        key: String,
        /// `None` keeps the current value
        value: Option<String>,
        description: Option<String>,
        enable_interpolation_in_file: bool,
    },
}

/// Turn submitted form data into a request
pub fn build_request(
    mode: FormMode,
    kind: VariableKind,
    context: &ScopeContext,
    base: Option<&Variable>,
    data: FormData,
) -> Result<VariableRequest, FormError> {
    let scope = data.scope.ok_or(FormError::ScopeMissing)?;
    let parent_id = context.parent_id(scope)?.to_string();
    let base_for = |kind| base.ok_or(FormError::MissingBase(kind));
    let interpolation = data.enable_interpolation_in_file.unwrap_or(false);

    let request = match (mode, kind) {
        (FormMode::Create, VariableKind::Value) => VariableRequest::Create {
            key: data.key,
            value: data.value.unwrap_or_default(),
            description: data.description,
            is_secret: data.is_secret,
            mount_path: None,
            variable_parent_id: parent_id,
            variable_scope: scope,
            enable_interpolation_in_file: None,
        },
        (FormMode::Create, VariableKind::File) => {
            let mount_path = data
                .mount_path
                .filter(|path| !path.trim().is_empty())
                .ok_or(FormError::MountPathMissing)?;
            let interpolation = data.enable_interpolation_in_file.unwrap_or(true);
            VariableRequest::Create {
                key: data.key,
                value: data.value.unwrap_or_default(),
                description: data.description,
                is_secret: data.is_secret,
                mount_path: Some(mount_path),
                variable_parent_id: parent_id,
                variable_scope: scope,
                enable_interpolation_in_file: Some(interpolation),
            }
        }
        (FormMode::Create, VariableKind::Alias) => VariableRequest::CreateAlias {
            variable_id: base_for(VariableKind::Alias)?.id.clone(),
            key: data.key,
            description: data.description,
            alias_parent_id: parent_id,
            alias_scope: scope,
            enable_interpolation_in_file: interpolation,
        },
        (FormMode::Create, VariableKind::Override) => {
            let base = base_for(kind)?;
            if base.scope == Scope::BuiltIn {
                return Err(FormError::ReadOnly);
            }
            if !scope.is_narrower_than(base.scope) {
                return Err(FormError::OverrideNotNarrower {
                    scope,
                    target: base.scope,
                });
            }

            VariableRequest::CreateOverride {
                variable_id: base.id.clone(),
                value: data.value.unwrap_or_default(),
                description: data.description,
                override_parent_id: parent_id,
                override_scope: scope,
                enable_interpolation_in_file: interpolation,
            }
        }
        (FormMode::Create | FormMode::Update, VariableKind::BuiltIn) => {
            return Err(FormError::ReadOnly)
        }
        (
            FormMode::Update,
            VariableKind::Value | VariableKind::File | VariableKind::Alias | VariableKind::Override,
        ) => {
            let base = base_for(kind)?;
            if base.scope == Scope::BuiltIn {
                return Err(FormError::ReadOnly);
            }
            if scope != base.scope {
                return Err(FormError::ScopeImmutable {
                    from: base.scope,
                    to: scope,
                });
            }

            // an alias stores the key it points to as its value
            let value = match base.aliased_variable() {
                Some(target) => Some(target.key.clone()),
                None => data.value,
            };

            VariableRequest::Edit {
                variable_id: base.id.clone(),
                key: data.key,
                value,
                description: data.description,
                enable_interpolation_in_file: interpolation,
            }
        }
    };

    tracing::debug!(?mode, %kind, %scope, "built variable request");
    Ok(request)
}
