//! which scopes a variable may be written to
//!
//! Every create/edit/import flow is anchored to a *context scope*: the page the user is on (a project, an
//! environment, or one service). The candidates offered are the hierarchy up to and including that
//! context, where the service entry is the context's own service scope. A flow anchored on a `CONTAINER`
//! offers `PROJECT`, `ENVIRONMENT` and `CONTAINER`; never `APPLICATION`, `JOB` or `HELM`.
//!
//! When an existing variable is involved (editing it, or deriving an alias/override from it) the
//! candidates are narrowed to scopes at least as specific as that variable. Overrides need a strictly
//! narrower scope, and built-ins are never overridden.
use crate::scope::Scope;

/// Candidate scopes for a flow anchored on `context`, ascending by rank
fn candidates(context: Option<Scope>) -> Vec<Scope> {
    match context {
        Some(Scope::Project) => vec![Scope::Project],
        Some(service) if service.is_service() => {
            vec![Scope::Project, Scope::Environment, service]
        }
        _ => vec![Scope::Project, Scope::Environment],
    }
}

/// Scopes that may be picked for a variable
///
/// - `current`: scope of the variable being edited or derived from, `None` for a brand new variable
/// - `include_built_in`: offer `BUILT_IN` for a brand new variable (filters only, never a write target)
/// - `context`: scope the flow is anchored to
/// - `is_override`: the variable being created is an override of `current`
///
/// The result is ascending by rank and free of duplicates.
pub fn compute_available_scopes(
    current: Option<Scope>,
    include_built_in: bool,
    context: Option<Scope>,
    is_override: bool,
) -> Vec<Scope> {
    let candidates = candidates(context);

    let Some(current) = current else {
        let mut scopes = Vec::with_capacity(candidates.len() + 1);
        if include_built_in {
            scopes.push(Scope::BuiltIn);
        }
        scopes.extend(candidates);
        return scopes;
    };

    if is_override {
        if current == Scope::BuiltIn {
            tracing::trace!("built-in variables cannot be overridden");
            return vec![];
        }

        if current.is_service() {
            tracing::trace!(%current, "no scope narrower than a service scope");
            return vec![];
        }

        return candidates
            .into_iter()
            .filter(|scope| scope.is_narrower_than(current))
            .collect();
    }

    let mut scopes = vec![];
    if current == Scope::BuiltIn {
        scopes.push(Scope::BuiltIn);
    }
    scopes.extend(
        candidates
            .into_iter()
            .filter(|scope| scope.rank() >= current.rank()),
    );
    scopes
}

/// Scope preselected in the create/edit form
///
/// - derived from a built-in: nothing, the user has to pick
/// - creating an override: the broadest scope available
/// - editing (or deriving from) an existing variable: its own scope
/// - otherwise: the narrowest scope available
pub fn default_form_scope(
    variable_scope: Option<Scope>,
    creating_override: bool,
    available: &[Scope],
) -> Option<Scope> {
    match variable_scope {
        Some(Scope::BuiltIn) => None,
        _ if creating_override => available.first().copied(),
        Some(scope) => Some(scope),
        None => available.last().copied(),
    }
}

/// Scope preselected for every row of a bulk import anchored on `context`
pub fn default_import_scope(context: Scope, available: &[Scope]) -> Scope {
    let preferred = if context == Scope::Project {
        Scope::Project
    } else {
        Scope::Environment
    };

    if available.contains(&preferred) {
        return preferred;
    }

    available.first().copied().unwrap_or(preferred)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use Scope::*;

    #[test]
    fn new_variable_uses_context_service_scope() {
        assert_eq!(
            compute_available_scopes(None, false, Some(Container), false),
            vec![Project, Environment, Container]
        );
        assert_eq!(
            compute_available_scopes(None, true, Some(Helm), false),
            vec![BuiltIn, Project, Environment, Helm]
        );
    }

    #[test]
    fn new_variable_stops_at_context() {
        assert_eq!(
            compute_available_scopes(None, false, Some(Project), false),
            vec![Project]
        );
        assert_eq!(
            compute_available_scopes(None, false, Some(Environment), false),
            vec![Project, Environment]
        );
        assert_eq!(
            compute_available_scopes(None, false, None, false),
            vec![Project, Environment]
        );
    }

    #[test]
    fn existing_variable_only_narrows() {
        assert_eq!(
            compute_available_scopes(Some(Environment), false, Some(Job), false),
            vec![Environment, Job]
        );
        assert_eq!(
            compute_available_scopes(Some(Project), false, Some(Application), false),
            vec![Project, Environment, Application]
        );
        assert_eq!(
            compute_available_scopes(Some(Application), false, Some(Application), false),
            vec![Application]
        );
    }

    #[test]
    fn built_in_only_kept_for_built_in() {
        assert_eq!(
            compute_available_scopes(Some(BuiltIn), false, Some(Container), false),
            vec![BuiltIn, Project, Environment, Container]
        );
        assert_eq!(
            compute_available_scopes(Some(Project), true, Some(Container), false),
            vec![Project, Environment, Container]
        );
    }

    #[test]
    fn override_needs_narrower_scope() {
        assert_eq!(
            compute_available_scopes(Some(Project), false, Some(Container), true),
            vec![Environment, Container]
        );
        assert_eq!(
            compute_available_scopes(Some(Environment), false, Some(Container), true),
            vec![Container]
        );
        assert_eq!(
            compute_available_scopes(Some(Container), false, Some(Container), true),
            Vec::<Scope>::new()
        );
        assert_eq!(
            compute_available_scopes(Some(Helm), false, Some(Container), true),
            Vec::<Scope>::new()
        );
    }

    #[test]
    fn built_in_is_never_overridden() {
        for context in [Project, Environment, Application, Container, Job, Helm] {
            assert_eq!(
                compute_available_scopes(Some(BuiltIn), false, Some(context), true),
                Vec::<Scope>::new()
            );
        }
    }

    #[test]
    fn form_defaults() {
        let available = [Project, Environment, Container];
        assert_eq!(default_form_scope(Some(BuiltIn), false, &available), None);
        assert_eq!(default_form_scope(Some(BuiltIn), true, &available), None);
        assert_eq!(
            default_form_scope(Some(Project), true, &available[1..]),
            Some(Environment)
        );
        assert_eq!(
            default_form_scope(Some(Environment), false, &available),
            Some(Environment)
        );
        assert_eq!(default_form_scope(None, false, &available), Some(Container));
        assert_eq!(default_form_scope(None, false, &[]), None);
        assert_eq!(default_form_scope(Some(Container), true, &[]), None);
    }

    #[test]
    fn import_defaults() {
        assert_eq!(default_import_scope(Project, &[Project]), Project);
        assert_eq!(
            default_import_scope(Environment, &[Project, Environment]),
            Environment
        );
        assert_eq!(
            default_import_scope(Job, &[Project, Environment, Job]),
            Environment
        );
        assert_eq!(default_import_scope(Job, &[Job]), Job);
        assert_eq!(default_import_scope(Job, &[]), Environment);
    }
}
