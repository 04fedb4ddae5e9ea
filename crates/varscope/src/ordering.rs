//! display order
//!
//! Variables are shown as a flat list where every alias and override sits directly below the variable
//! it derives from:
//!
//! ```text
//! BUILT_IN     QOVERY_PROJECT_ID
//! PROJECT      DATABASE_URL
//! ENVIRONMENT    └ OVERRIDE DATABASE_URL
//! ENVIRONMENT    └ ALIAS    DB
//! PROJECT      LOG_LEVEL
//! ```
//!
//! *Roots* (neither alias nor override) are sorted by scope rank, then by owning service name (variables
//! without one last), then by key. Derived entries keep the order they were found in and are attached
//! to the first root whose key equals the key they point to. Derived entries whose root is not in the
//! set are not shown.
use crate::variable::Variable;
use std::cmp::Ordering;

fn compare_roots(a: &Variable, b: &Variable) -> Ordering {
    a.scope
        .rank()
        .cmp(&b.scope.rank())
        .then_with(|| match (&a.service_name, &b.service_name) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.key.cmp(&b.key))
}

/// Indices into `variables` in display order
///
/// Orphaned aliases/overrides are left out, so the result may be shorter than the input.
#[tracing::instrument(level = "trace", skip_all, fields(count = variables.len()))]
pub fn display_order(variables: &[Variable]) -> Vec<usize> {
    let mut roots = vec![];
    let mut derived: indexmap::IndexMap<&str, Vec<usize>> = Default::default();

    for (index, variable) in variables.iter().enumerate() {
        match &variable.derivation {
            None => roots.push(index),
            Some(derivation) => derived
                .entry(derivation.target().key.as_str())
                .or_default()
                .push(index),
        }
    }

    roots.sort_by(|a, b| compare_roots(&variables[*a], &variables[*b]));

    let mut order = Vec::with_capacity(variables.len());
    for root in roots {
        order.push(root);
        if let Some(children) = derived.shift_remove(variables[root].key.as_str()) {
            order.extend(children);
        }
    }

    for (key, orphans) in &derived {
        tracing::trace!(key, count = orphans.len(), "dropping derived variables without root");
    }

    order
}

/// Sort `variables` for display, see the [module documentation](self)
pub fn sort_for_display(variables: Vec<Variable>) -> Vec<Variable> {
    let order = display_order(&variables);
    let mut slots: Vec<Option<Variable>> = variables.into_iter().map(Some).collect();

    order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}

/// Case-insensitive key search
///
/// A variable also matches when one of its aliases in `all` matches, so searching for an alias still
/// shows the variable it points to.
pub fn matches_search(variable: &Variable, pattern: &str, all: &[Variable]) -> bool {
    let pattern = pattern.to_lowercase();
    let matches = |key: &str| key.to_lowercase().contains(&pattern);

    if matches(&variable.key) {
        return true;
    }

    all.iter().any(|other| {
        other
            .aliased_variable()
            .is_some_and(|target| target.key == variable.key && matches(&other.key))
    })
}

/// Keep the variables matching `pattern`, preserving their order
pub fn filter_by_search<'v>(variables: &'v [Variable], pattern: &str) -> Vec<&'v Variable> {
    if pattern.is_empty() {
        return variables.iter().collect();
    }

    variables
        .iter()
        .filter(|variable| matches_search(variable, pattern, variables))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scope::Scope::*;
    use crate::variable::ServiceType;
    use pretty_assertions::assert_eq;

    fn keys(variables: &[Variable]) -> Vec<(&str, &str)> {
        variables
            .iter()
            .map(|variable| (variable.id.as_str(), variable.key.as_str()))
            .collect()
    }

    #[test]
    fn empty() {
        assert!(sort_for_display(vec![]).is_empty());
    }

    #[test]
    fn roots_by_rank_service_then_key() {
        let variables = vec![
            Variable::new("1", "B", Environment),
            Variable::new("2", "A", Application).with_service(
                "s1",
                "web",
                ServiceType::Application,
            ),
            Variable::new("3", "Z", BuiltIn),
            Variable::new("4", "A", Environment),
            Variable::new("5", "QOVERY_B", BuiltIn).with_service(
                "s2",
                "api",
                ServiceType::Container,
            ),
            Variable::new("6", "QOVERY_A", BuiltIn).with_service("s3", "worker", ServiceType::Job),
        ];

        assert_eq!(
            keys(&sort_for_display(variables)),
            vec![
                ("5", "QOVERY_B"),
                ("6", "QOVERY_A"),
                ("3", "Z"),
                ("4", "A"),
                ("1", "B"),
                ("2", "A"),
            ]
        );
    }

    #[test]
    fn derived_follow_their_root() {
        let db = Variable::new("1", "DB", Project);
        let log = Variable::new("2", "LOG", Project);
        let db_override = Variable::new("3", "DB", Environment).overriding(&db);
        let db_alias = Variable::new("4", "DATABASE", Environment).aliasing(&db_override);
        let log_alias = Variable::new("5", "LEVEL", Application).aliasing(&log);

        let sorted = sort_for_display(vec![
            log_alias,
            db_alias,
            log.clone(),
            db_override,
            db.clone(),
        ]);

        assert_eq!(
            keys(&sorted),
            vec![
                ("1", "DB"),
                ("4", "DATABASE"),
                ("3", "DB"),
                ("2", "LOG"),
                ("5", "LEVEL"),
            ]
        );
    }

    #[test]
    fn orphans_are_dropped() {
        let gone = Variable::new("1", "GONE", Project);
        let orphan = Variable::new("2", "ALIAS", Environment).aliasing(&gone);
        let kept = Variable::new("3", "KEPT", Project);

        let sorted = sort_for_display(vec![orphan, kept]);
        assert_eq!(keys(&sorted), vec![("3", "KEPT")]);
    }

    #[test]
    fn derived_attached_once() {
        let first = Variable::new("1", "X", Project);
        let second =
            Variable::new("2", "X", Application).with_service("s", "api", ServiceType::Application);
        let alias = Variable::new("3", "Y", Environment).aliasing(&first);

        let sorted = sort_for_display(vec![second, alias, first]);
        assert_eq!(keys(&sorted), vec![("1", "X"), ("3", "Y"), ("2", "X")]);
    }

    #[test]
    fn idempotent() {
        let db = Variable::new("1", "DB", Project);
        let variables = vec![
            Variable::new("2", "DB", Environment).overriding(&db),
            Variable::new("3", "B", Project),
            db.clone(),
            Variable::new("4", "B", Project),
        ];

        let once = sort_for_display(variables);
        let twice = sort_for_display(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn search_matches_key_and_alias() {
        let db = Variable::new("1", "DATABASE_URL", Project);
        let alias = Variable::new("2", "PG", Environment).aliasing(&db);
        let other = Variable::new("3", "LOG_LEVEL", Project);
        let all = vec![db, alias, other];

        let found: Vec<_> = filter_by_search(&all, "pg")
            .into_iter()
            .map(|variable| variable.id.as_str())
            .collect();
        assert_eq!(found, vec!["1", "2"]);

        assert!(matches_search(&all[2], "level", &all));
        assert!(!matches_search(&all[2], "pg", &all));
        assert_eq!(filter_by_search(&all, "").len(), 3);
    }
}
