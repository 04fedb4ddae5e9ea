//! key collision checks
//!
//! Checked per key against a snapshot of the variables visible where the key is being written.
//! "Narrower" means a higher [rank](crate::scope::rank): an `ENVIRONMENT` variable is narrower than a
//! `PROJECT` one.
//!
//! - writing a key that already exists at a *narrower* scope is rejected: the narrower one would
//!   shadow the new value everywhere it matters
//! - writing a key that exists at a *broader* scope creates an override
//! - writing a key that exists at the *same* scope updates it, or is ignored when overwriting is off
//!
//! When the flow is anchored on a service, `service_context` is that service's scope. Service scoped
//! variables of a different service scope belong to other services and are not considered.
use crate::scope::{self, Scope};
use crate::variable::{has_reserved_prefix, Variable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyIssue {
    Required,
    ContainsWhitespace,
    ReservedPrefix,
    ShadowedByNarrowerScope,
}

impl std::fmt::Display for KeyIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            KeyIssue::Required => "Please enter a variable key.",
            KeyIssue::ContainsWhitespace => "Variable name cannot contain spaces.",
            KeyIssue::ReservedPrefix => "Variable name cannot begin with \"QOVERY\".",
            KeyIssue::ShadowedByNarrowerScope => "Variable already exists on a lower scope.",
        })
    }
}

/// Advisory only, submitting is still allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyWarning {
    WillCreateOverride,
    WillUpdate,
    WillBeIgnored,
}

impl std::fmt::Display for KeyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            KeyWarning::WillCreateOverride => {
                "Variable already exists on a higher scope, an override will be created."
            }
            KeyWarning::WillUpdate => "Variable already exists and will be updated.",
            KeyWarning::WillBeIgnored => "Variable already exists and will not be updated.",
        })
    }
}

fn same_key<'v>(
    candidate: &'v str,
    existing: &'v [Variable],
    service_context: Option<Scope>,
) -> impl Iterator<Item = &'v Variable> {
    existing.iter().filter(move |variable| {
        if variable.key != candidate {
            return false;
        }

        match service_context {
            Some(context) if context.is_service() && variable.scope.is_service() => {
                variable.scope == context
            }
            _ => true,
        }
    })
}

/// Required, no whitespace
pub fn validate_key_format(candidate: &str) -> Result<(), KeyIssue> {
    if candidate.is_empty() {
        return Err(KeyIssue::Required);
    }

    if candidate.chars().any(char::is_whitespace) {
        return Err(KeyIssue::ContainsWhitespace);
    }

    Ok(())
}

/// Reject reserved keys and keys shadowed by a narrower scope
pub fn validate_key(
    candidate: &str,
    existing: &[Variable],
    target: Option<Scope>,
    service_context: Option<Scope>,
) -> Result<(), KeyIssue> {
    if has_reserved_prefix(candidate) {
        tracing::debug!(key = candidate, "reserved prefix");
        return Err(KeyIssue::ReservedPrefix);
    }

    let target_rank = scope::rank(target);
    if let Some(narrower) = same_key(candidate, existing, service_context)
        .find(|variable| variable.scope.rank() > target_rank)
    {
        tracing::debug!(key = candidate, existing = %narrower.scope, "shadowed by narrower scope");
        return Err(KeyIssue::ShadowedByNarrowerScope);
    }

    Ok(())
}

/// [validate_key_format] followed by [validate_key]
pub fn check_key(
    candidate: &str,
    existing: &[Variable],
    target: Option<Scope>,
    service_context: Option<Scope>,
) -> Result<(), KeyIssue> {
    validate_key_format(candidate)?;
    validate_key(candidate, existing, target, service_context)
}

/// What writing `candidate` at `target` will do to an existing variable with the same key
pub fn warning_for_key(
    candidate: &str,
    existing: &[Variable],
    target: Option<Scope>,
    overwrite: bool,
    service_context: Option<Scope>,
) -> Option<KeyWarning> {
    let target_rank = scope::rank(target);
    let mut same_scope = false;

    for variable in same_key(candidate, existing, service_context) {
        let rank = variable.scope.rank();
        if rank < target_rank {
            return Some(KeyWarning::WillCreateOverride);
        }
        same_scope |= rank == target_rank;
    }

    match (same_scope, overwrite) {
        (false, _) => None,
        (true, true) => Some(KeyWarning::WillUpdate),
        (true, false) => Some(KeyWarning::WillBeIgnored),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use Scope::*;

    fn existing_env_x() -> Vec<Variable> {
        vec![Variable::new("1", "X", Environment).with_value("x")]
    }

    #[test]
    fn reserved_prefix() {
        assert_eq!(
            validate_key("QOVERY_FOO", &[], Some(Project), None),
            Err(KeyIssue::ReservedPrefix)
        );
        assert_eq!(
            validate_key("qovery_foo", &[], Some(Project), None),
            Err(KeyIssue::ReservedPrefix)
        );
        assert_eq!(validate_key("MY_QOVERY", &[], Some(Project), None), Ok(()));
    }

    #[test]
    fn reserved_prefix_wins_over_collision() {
        let existing = vec![Variable::new("1", "QOVERY_X", Application)];
        assert_eq!(
            validate_key("QOVERY_X", &existing, Some(Project), None),
            Err(KeyIssue::ReservedPrefix)
        );
    }

    #[test]
    fn narrower_existing_is_rejected() {
        let existing = existing_env_x();
        assert_eq!(
            validate_key("X", &existing, Some(Project), None),
            Err(KeyIssue::ShadowedByNarrowerScope)
        );
        assert_eq!(validate_key("X", &existing, Some(Application), None), Ok(()));
        assert_eq!(validate_key("X", &existing, Some(Environment), None), Ok(()));
        assert_eq!(validate_key("Y", &existing, Some(Project), None), Ok(()));
    }

    #[test]
    fn unknown_target_never_wins() {
        let existing = vec![Variable::new("1", "X", Project)];
        assert_eq!(
            validate_key("X", &existing, None, None),
            Err(KeyIssue::ShadowedByNarrowerScope)
        );
    }

    #[test]
    fn broader_existing_warns_override() {
        let existing = existing_env_x();
        assert_eq!(
            warning_for_key("X", &existing, Some(Application), false, None),
            Some(KeyWarning::WillCreateOverride)
        );
        assert_eq!(
            warning_for_key("X", &existing, Some(Project), false, None),
            None
        );
        assert_eq!(warning_for_key("Y", &existing, Some(Application), true, None), None);
    }

    #[test]
    fn same_scope_depends_on_overwrite() {
        let existing = existing_env_x();
        assert_eq!(
            warning_for_key("X", &existing, Some(Environment), true, None),
            Some(KeyWarning::WillUpdate)
        );
        assert_eq!(
            warning_for_key("X", &existing, Some(Environment), false, None),
            Some(KeyWarning::WillBeIgnored)
        );
    }

    #[test]
    fn broader_beats_same_scope() {
        let existing = vec![
            Variable::new("1", "X", Application),
            Variable::new("2", "X", Project),
        ];
        assert_eq!(
            warning_for_key("X", &existing, Some(Application), true, None),
            Some(KeyWarning::WillCreateOverride)
        );
    }

    #[test]
    fn other_service_scopes_are_ignored() {
        let existing = vec![Variable::new("1", "X", Container)];
        assert_eq!(
            validate_key("X", &existing, Some(Environment), Some(Application)),
            Ok(())
        );
        assert_eq!(
            validate_key("X", &existing, Some(Environment), Some(Container)),
            Err(KeyIssue::ShadowedByNarrowerScope)
        );
        assert_eq!(
            warning_for_key("X", &existing, Some(Application), false, Some(Application)),
            None
        );
    }

    #[test]
    fn format() {
        assert_eq!(validate_key_format(""), Err(KeyIssue::Required));
        assert_eq!(
            validate_key_format("MY KEY"),
            Err(KeyIssue::ContainsWhitespace)
        );
        assert_eq!(
            validate_key_format("MY\tKEY"),
            Err(KeyIssue::ContainsWhitespace)
        );
        assert_eq!(validate_key_format("MY_KEY"), Ok(()));
        assert_eq!(
            check_key("QOVERY X", &[], Some(Project), None),
            Err(KeyIssue::ContainsWhitespace)
        );
        assert_eq!(
            check_key("QOVERY_X", &[], Some(Project), None),
            Err(KeyIssue::ReservedPrefix)
        );
    }

    #[test]
    fn messages() {
        assert_eq!(
            KeyIssue::ShadowedByNarrowerScope.to_string(),
            "Variable already exists on a lower scope."
        );
        assert_eq!(
            KeyWarning::WillBeIgnored.to_string(),
            "Variable already exists and will not be updated."
        );
    }
}
