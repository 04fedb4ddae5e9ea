//! how a variable row is presented
//!
//! Everything here is derived from a single variable plus the snapshot it was listed with. The "show
//! all secret values" toggle is passed in as `show_all_secrets`.
use crate::scope::Scope;
use crate::variable::{Owner, Variable};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Badge {
    /// synced from Doppler
    Doppler,
    Alias,
    Override,
    File,
}

/// Badges in the order they are shown in front of the key
pub fn badges(variable: &Variable) -> Vec<Badge> {
    let mut badges = vec![];
    if variable.owned_by == Owner::Doppler {
        badges.push(Badge::Doppler);
    }
    if variable.aliased_variable().is_some() {
        badges.push(Badge::Alias);
    }
    if variable.overridden_variable().is_some() {
        badges.push(Badge::Override);
    }
    if variable.mount_path.is_some() {
        badges.push(Badge::File);
    }
    badges
}

/// Key of the variable a derived row points to, shown below its own key
pub fn parent_key(variable: &Variable) -> Option<&str> {
    variable
        .derivation
        .as_ref()
        .map(|derivation| derivation.target().key.as_str())
}

pub const MASK: &str = "••••••••";

/// Content of the value column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum DisplayValue<'v> {
    /// Files show where they are mounted, `readable` is false when the content is write-only
    File {
        mount_path: Option<&'v str>,
        readable: bool,
    },
    /// Aliases have no value of their own
    Blank,
    Shown(&'v str),
    Masked,
}

impl std::fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayValue::File { mount_path, .. } => f.write_str(mount_path.unwrap_or_default()),
            DisplayValue::Blank => Ok(()),
            DisplayValue::Shown(value) => f.write_str(value),
            DisplayValue::Masked => f.write_str(MASK),
        }
    }
}

pub fn display_value(variable: &Variable, show_all_secrets: bool) -> DisplayValue<'_> {
    if variable.is_file() {
        return DisplayValue::File {
            mount_path: variable.file_mount_path(),
            readable: variable.value.is_some(),
        };
    }

    if variable.aliased_variable().is_some() {
        return DisplayValue::Blank;
    }

    match &variable.value {
        Some(value) if show_all_secrets || !variable.is_secret => {
            DisplayValue::Shown(value.as_str())
        }
        Some(_) | None => DisplayValue::Masked,
    }
}

/// Why "create override" is offered but disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideBlock {
    AlreadyOverridden,
    ServiceScope,
}

impl std::fmt::Display for OverrideBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OverrideBlock::AlreadyOverridden => "Variable already overridden",
            OverrideBlock::ServiceScope => "You can’t override variables on the application scope",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RowAction {
    /// Owned by an external integration, only editable there
    ManageExternally { owner: Owner },
    Edit,
    CreateAlias,
    CreateOverride { blocked: Option<OverrideBlock> },
    Delete,
}

/// `true` if some variable in `all` overrides `variable`
pub fn is_overridden(variable: &Variable, all: &[Variable]) -> bool {
    all.iter().any(|other| {
        other
            .overridden_variable()
            .is_some_and(|target| target.id == variable.id)
    })
}

/// Actions of the row menu, in menu order
pub fn row_actions(variable: &Variable, all: &[Variable]) -> Vec<RowAction> {
    if variable.owned_by.is_external() {
        return vec![RowAction::ManageExternally {
            owner: variable.owned_by,
        }];
    }

    let built_in = variable.scope == Scope::BuiltIn;
    let mut actions = vec![];

    if !built_in {
        actions.push(RowAction::Edit);
    }

    if variable.is_root() {
        actions.push(RowAction::CreateAlias);

        if !built_in {
            let blocked = if variable.scope.is_service() {
                Some(OverrideBlock::ServiceScope)
            } else if is_overridden(variable, all) {
                Some(OverrideBlock::AlreadyOverridden)
            } else {
                None
            };
            actions.push(RowAction::CreateOverride { blocked });
        }
    }

    if !built_in {
        actions.push(RowAction::Delete);
    }

    actions
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DeleteRejection {
    #[error("built-in variables cannot be deleted")]
    BuiltIn,
    #[error("variable is managed by {0:?}")]
    ExternallyManaged(Owner),
    #[error("variable is still referenced by {}", .0.join(", "))]
    Referenced(Vec<String>),
}

/// Whether `variable` may be deleted, given the snapshot `all` it was listed with
///
/// Nothing is cascaded: aliases and overrides pointing at the variable have to go first.
pub fn check_delete(variable: &Variable, all: &[Variable]) -> Result<(), DeleteRejection> {
    check_delete_among(variable, all.iter())
}

fn check_delete_among<'v>(
    variable: &Variable,
    others: impl Iterator<Item = &'v Variable>,
) -> Result<(), DeleteRejection> {
    if variable.scope == Scope::BuiltIn {
        return Err(DeleteRejection::BuiltIn);
    }

    if variable.owned_by.is_external() {
        return Err(DeleteRejection::ExternallyManaged(variable.owned_by));
    }

    let referenced_by: Vec<String> = others
        .filter(|other| {
            other
                .derivation
                .as_ref()
                .is_some_and(|derivation| derivation.target().id == variable.id)
        })
        .map(|other| other.id.clone())
        .collect();

    if !referenced_by.is_empty() {
        tracing::debug!(id = %variable.id, ?referenced_by, "delete rejected");
        return Err(DeleteRejection::Referenced(referenced_by));
    }

    Ok(())
}

/// Whether a row can be picked for a bulk action
pub fn is_selectable(variable: &Variable) -> bool {
    variable.scope != Scope::BuiltIn
}

/// [check_delete] for rows deleted together
///
/// References coming from other selected rows do not block. On success the selection is returned in
/// the order the deletions have to be sent: aliases and overrides before the variables they point to.
/// Otherwise every rejected row is reported with its id.
pub fn check_delete_selection<'v>(
    selected: &'v [Variable],
    all: &[Variable],
) -> Result<Vec<&'v Variable>, Vec<(String, DeleteRejection)>> {
    let selected_ids: HashSet<&str> =
        selected.iter().map(|variable| variable.id.as_str()).collect();

    let rejections: Vec<(String, DeleteRejection)> = selected
        .iter()
        .filter_map(|variable| {
            let outside = all
                .iter()
                .filter(|other| !selected_ids.contains(other.id.as_str()));
            check_delete_among(variable, outside)
                .err()
                .map(|rejection| (variable.id.clone(), rejection))
        })
        .collect();

    if !rejections.is_empty() {
        return Err(rejections);
    }

    let (derived, roots): (Vec<&Variable>, Vec<&Variable>) =
        selected.iter().partition(|variable| !variable.is_root());
    Ok(derived.into_iter().chain(roots).collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::variable::ServiceType;
    use pretty_assertions::assert_eq;
    use Scope::*;

    #[test]
    fn badge_order() {
        let file = Variable::new("1", "CONF", Project).with_mount_path("/etc/conf");
        assert_eq!(badges(&file), vec![Badge::File]);

        let synced = Variable::new("2", "TOKEN", Project).with_owner(Owner::Doppler);
        let alias = Variable::new("3", "T", Environment)
            .with_owner(Owner::Doppler)
            .aliasing(&synced);
        assert_eq!(badges(&alias), vec![Badge::Doppler, Badge::Alias]);
        assert_eq!(parent_key(&alias), Some("TOKEN"));
        assert_eq!(parent_key(&synced), None);

        let external = Variable::new("4", "X", Project).with_owner(Owner::External);
        assert!(badges(&external).is_empty());
    }

    #[test]
    fn values() {
        let public = Variable::new("1", "A", Project).with_value("a");
        assert_eq!(display_value(&public, false), DisplayValue::Shown("a"));

        let secret = Variable::new("2", "B", Project).with_value("b").with_secret(true);
        assert_eq!(display_value(&secret, false), DisplayValue::Masked);
        assert_eq!(display_value(&secret, true), DisplayValue::Shown("b"));

        let write_only = Variable::new("3", "C", Project).with_secret(true);
        assert_eq!(display_value(&write_only, true), DisplayValue::Masked);
        assert_eq!(display_value(&write_only, true).to_string(), MASK);

        let alias = Variable::new("4", "D", Environment).aliasing(&public);
        assert_eq!(display_value(&alias, true), DisplayValue::Blank);

        let file = Variable::new("5", "E", Project).with_mount_path("/e");
        assert_eq!(
            display_value(&file, true),
            DisplayValue::File {
                mount_path: Some("/e"),
                readable: false
            }
        );

        let alias_of_file = Variable::new("6", "F", Environment).aliasing(&file);
        assert_eq!(display_value(&alias_of_file, false).to_string(), "/e");
    }

    #[test]
    fn actions_for_plain_root() {
        let root = Variable::new("1", "A", Project);
        assert_eq!(
            row_actions(&root, &[root.clone()]),
            vec![
                RowAction::Edit,
                RowAction::CreateAlias,
                RowAction::CreateOverride { blocked: None },
                RowAction::Delete,
            ]
        );
    }

    #[test]
    fn override_blocked() {
        let root = Variable::new("1", "A", Project);
        let overridden = Variable::new("2", "A", Environment).overriding(&root);
        let all = vec![root.clone(), overridden.clone()];
        assert!(is_overridden(&root, &all));
        assert!(row_actions(&root, &all).contains(&RowAction::CreateOverride {
            blocked: Some(OverrideBlock::AlreadyOverridden)
        }));

        let service =
            Variable::new("3", "S", Container).with_service("svc", "api", ServiceType::Container);
        assert!(row_actions(&service, &[]).contains(&RowAction::CreateOverride {
            blocked: Some(OverrideBlock::ServiceScope)
        }));

        assert_eq!(
            row_actions(&overridden, &all),
            vec![RowAction::Edit, RowAction::Delete]
        );
        assert_eq!(
            OverrideBlock::AlreadyOverridden.to_string(),
            "Variable already overridden"
        );
    }

    #[test]
    fn actions_for_built_in_and_external() {
        let built_in = Variable::new("1", "QOVERY_ID", BuiltIn);
        assert_eq!(row_actions(&built_in, &[]), vec![RowAction::CreateAlias]);

        let synced = Variable::new("2", "TOKEN", Project).with_owner(Owner::Doppler);
        assert_eq!(
            row_actions(&synced, &[]),
            vec![RowAction::ManageExternally {
                owner: Owner::Doppler
            }]
        );
    }

    #[test]
    fn delete_guard() {
        let root = Variable::new("1", "A", Project);
        let alias = Variable::new("2", "B", Environment).aliasing(&root);
        let overridden = Variable::new("3", "A", Environment).overriding(&root);
        let all = vec![root.clone(), alias.clone(), overridden.clone()];

        assert_eq!(
            check_delete(&root, &all),
            Err(DeleteRejection::Referenced(vec!["2".into(), "3".into()]))
        );
        assert_eq!(check_delete(&alias, &all), Ok(()));
        assert_eq!(check_delete(&root, &[root.clone()]), Ok(()));
        assert_eq!(
            check_delete(&Variable::new("4", "QOVERY_X", BuiltIn), &all),
            Err(DeleteRejection::BuiltIn)
        );
        assert_eq!(
            check_delete(&root.clone().with_owner(Owner::Doppler), &all),
            Err(DeleteRejection::ExternallyManaged(Owner::Doppler))
        );
        assert_eq!(
            DeleteRejection::Referenced(vec!["2".into(), "3".into()]).to_string(),
            "variable is still referenced by 2, 3"
        );
    }

    #[test]
    fn selection() {
        assert!(is_selectable(&Variable::new("1", "A", Project)));
        assert!(is_selectable(
            &Variable::new("2", "B", Project).with_owner(Owner::Doppler)
        ));
        assert!(!is_selectable(&Variable::new("3", "QOVERY_X", BuiltIn)));
    }

    #[test]
    fn delete_selection_together_with_references() {
        let root = Variable::new("1", "A", Project);
        let alias = Variable::new("2", "B", Environment).aliasing(&root);
        let overridden = Variable::new("3", "A", Environment).overriding(&root);
        let other = Variable::new("4", "C", Project);
        let all = vec![root.clone(), alias.clone(), overridden.clone(), other.clone()];

        let selected = vec![root.clone(), other.clone(), alias.clone(), overridden.clone()];
        let ids: Vec<&str> = check_delete_selection(&selected, &all)
            .unwrap()
            .into_iter()
            .map(|variable| variable.id.as_str())
            .collect();
        assert_eq!(ids, vec!["2", "3", "1", "4"]);

        // the override stays behind and still points at the root
        assert_eq!(
            check_delete_selection(&[root.clone(), alias.clone()], &all),
            Err(vec![(
                "1".to_string(),
                DeleteRejection::Referenced(vec!["3".into()])
            )])
        );
    }

    #[test]
    fn delete_selection_rejects_built_in_and_external() {
        let built_in = Variable::new("1", "QOVERY_X", BuiltIn);
        let synced = Variable::new("2", "TOKEN", Project).with_owner(Owner::Doppler);
        let plain = Variable::new("3", "A", Project);
        let selected = vec![built_in, synced, plain];

        assert_eq!(
            check_delete_selection(&selected, &selected),
            Err(vec![
                ("1".to_string(), DeleteRejection::BuiltIn),
                (
                    "2".to_string(),
                    DeleteRejection::ExternallyManaged(Owner::Doppler)
                ),
            ])
        );
    }
}
