//! variable snapshots
//!
//! The platform lists variables per `(parent id, scope)`. A [Snapshot] holds one or more such
//! listings together with the file each came from, and hands them out through [VariableProvider].
//!
//! A listing file is JSON or YAML and is either a bare list of variables or an object:
//! ```yaml
//! parent_id: 6f3b2c1a   # optional, matches any parent when absent
//! scope: ENVIRONMENT    # optional, matches any scope when absent
//! results:
//!   - id: 9f3d192c
//!     key: DATABASE_URL
//!     scope: PROJECT
//! ```
use crate::scope::Scope;
use crate::variable::{self, Variable};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source of the variables visible from a page
pub trait VariableProvider {
    fn variables(&self, parent_id: &str, scope: Scope) -> Vec<Variable>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub results: Vec<Variable>,
}

impl Listing {
    fn matches(&self, parent_id: &str, scope: Scope) -> bool {
        self.parent_id.as_deref().map_or(true, |id| id == parent_id)
            && self.scope.map_or(true, |listed| listed == scope)
    }
}

impl From<Vec<Variable>> for Listing {
    fn from(results: Vec<Variable>) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            _ => None,
        }
    }

    /// Parse a listing, accepting a bare list of variables as well
    pub fn parse(self, text: &str) -> Result<Listing, LoadError> {
        let listing = match self {
            Format::Json => match serde_json::from_str::<serde_json::Value>(text)? {
                value @ serde_json::Value::Array(_) => {
                    serde_json::from_value::<Vec<Variable>>(value)?.into()
                }
                value => serde_json::from_value(value)?,
            },
            Format::Yaml => match serde_yaml::from_str::<serde_yaml::Value>(text)? {
                value @ serde_yaml::Value::Sequence(_) => {
                    serde_yaml::from_value::<Vec<Variable>>(value)?.into()
                }
                value => serde_yaml::from_value(value)?,
            },
        };

        Ok(listing)
    }
}

pub type Source = Option<PathBuf>;

#[derive(Default, Debug)]
pub struct Snapshot {
    sources: Vec<Source>,
    listings: Vec<(usize, Listing)>,
}

impl Snapshot {
    pub fn insert(&mut self, listing: impl Into<Listing>, path: impl Into<Option<PathBuf>>) {
        let source_index = self.sources.len();
        self.sources.push(path.into());
        self.listings.push((source_index, listing.into()));
    }

    /// Every variable of every listing, in load order
    pub fn all(&self) -> impl Iterator<Item = &Variable> {
        self.listings
            .iter()
            .flat_map(|(_, listing)| listing.results.iter())
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Collect integrity issues of all variables
    pub fn check(&self) -> Result<(), SnapshotIssues> {
        let mut e = SnapshotIssues::new();
        let mut seen: std::collections::HashMap<&str, &Source> = Default::default();

        for (source_index, listing) in &self.listings {
            let source = &self.sources[*source_index];
            for variable in &listing.results {
                if let Some(first) = seen.insert(&variable.id, source) {
                    e.log(SnapshotIssue::DuplicateId {
                        id: variable.id.clone(),
                        first: first.clone(),
                        second: source.clone(),
                    });
                }

                for issue in variable.integrity_issues() {
                    e.log(SnapshotIssue::Variable(issue));
                }
            }
        }

        if e.issues.is_empty() {
            Ok(())
        } else {
            Err(e)
        }
    }
}

impl VariableProvider for Snapshot {
    fn variables(&self, parent_id: &str, scope: Scope) -> Vec<Variable> {
        self.listings
            .iter()
            .filter(|(_, listing)| listing.matches(parent_id, scope))
            .flat_map(|(_, listing)| listing.results.iter().cloned())
            .collect()
    }
}

impl Snapshot {
    pub fn load_file(&mut self, file_path: &Path) -> Result<(), LoadError> {
        let file_path = file_path.canonicalize()?;
        tracing::info!(path=%file_path.display(), "loading file");

        let format = Format::from_path(&file_path)
            .ok_or_else(|| LoadError::UnsupportedFormat(file_path.clone()))?;
        let file_contents = std::fs::read_to_string(&file_path)?;
        let listing = format.parse(&file_contents)?;

        tracing::debug!(count = listing.results.len(), "loaded variables");
        self.insert(listing, Some(file_path));
        Ok(())
    }

    /// Load every `.json`, `.yaml` and `.yml` file of a directory
    pub fn load_directory(&mut self, dir_path: &Path) -> Result<(), LoadError> {
        let mut any_files_loaded = false;

        let mut paths = vec![];
        for dir_entry in std::fs::read_dir(dir_path)? {
            let dir_entry = dir_entry?;
            if dir_entry.file_type()?.is_file() && Format::from_path(&dir_entry.path()).is_some() {
                paths.push(dir_entry.path());
            }
        }
        paths.sort();

        for file_path in paths {
            self.load_file(&file_path)?;
            any_files_loaded = true;
        }

        if !any_files_loaded {
            return Err(LoadError::NoFilesFound);
        }

        Ok(())
    }
}

impl From<Vec<Variable>> for Snapshot {
    fn from(value: Vec<Variable>) -> Self {
        let mut snapshot = Snapshot::default();
        snapshot.insert(value, None);
        snapshot
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("No files found in directory")]
    NoFilesFound,
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unsupported file type {}, expected .json, .yaml or .yml", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("Unable to parse json")]
    JsonParseFailed(#[from] serde_json::Error),
    #[error("Unable to parse yaml")]
    YamlParseFailed(#[from] serde_yaml::Error),
}

#[derive(Debug, PartialEq)]
pub enum SnapshotIssue {
    Variable(variable::Issue),
    DuplicateId {
        id: String,
        first: Source,
        second: Source,
    },
}

impl std::fmt::Display for SnapshotIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotIssue::Variable(issue) => write!(f, "{issue}"),
            SnapshotIssue::DuplicateId { id, .. } => write!(f, "{id}: listed more than once"),
        }
    }
}

#[derive(Debug, derive_new::new)]
pub struct SnapshotIssues {
    #[new(default)]
    issues: Vec<SnapshotIssue>,
}

impl SnapshotIssues {
    pub fn log(&mut self, issue: SnapshotIssue) {
        tracing::trace!(?issue, "issue found");
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[SnapshotIssue] {
        &self.issues
    }
}

impl std::error::Error for SnapshotIssues {}

impl std::fmt::Display for SnapshotIssues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.issues.as_slice() {
            [] => f.write_str("no issues"),
            [only] => write!(f, "{only}"),
            [first, rest @ ..] => write!(f, "{first} (and {} more)", rest.len()),
        }
    }
}

/// Utility macro to create a [Snapshot]
///
/// ```
/// # use varscope::snapshot;
/// # use varscope::scope::Scope;
/// # use varscope::variable::Variable;
/// let snapshot = snapshot![
///     Variable::new("1", "DATABASE_URL", Scope::Project),
///     Variable::new("2", "LOG_LEVEL", Scope::Environment),
/// ];
/// assert_eq!(snapshot.all().count(), 2);
/// ```
///
/// From listing files (path required)
/// ```
/// # use varscope::snapshot;
/// let snapshot = snapshot! {
///     "project.json" => r#"[{ "id": "1", "key": "A", "scope": "PROJECT" }]"#,
///     "environment.yaml" => "parent_id: env\nresults:\n  - { id: '2', key: B, scope: ENVIRONMENT }",
/// };
/// assert_eq!(snapshot.source_count(), 2);
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use varscope::snapshot;
/// snapshot! { "broken.json" => "[{]" };
/// ```
#[macro_export]
macro_rules! snapshot {
    // listing files with sources
    { $($source:literal => $text:expr),+ $(,)? } => {{
        let mut snapshot = $crate::snapshot::Snapshot::default();
        $(
            let path = std::path::PathBuf::from($source);
            let format = $crate::snapshot::Format::from_path(&path).expect("known file type");
            snapshot.insert(format.parse($text).expect("listing must parse"), Some(path));
        )+
        snapshot
    }};
    // variables without source
    [ $($variable:expr),* $(,)? ] => {
        $crate::snapshot::Snapshot::from(vec![$($variable),*])
    };
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn provider_filters_listings() {
        let snapshot = crate::snapshot! {
            "project.json" => r#"{
                "parent_id": "prj",
                "scope": "PROJECT",
                "results": [{ "id": "1", "key": "A", "scope": "PROJECT" }]
            }"#,
            "environment.yaml" => "
parent_id: env
scope: ENVIRONMENT
results:
  - id: '2'
    key: B
    scope: ENVIRONMENT
  - id: '3'
    key: A
    scope: ENVIRONMENT
    overridden_variable: { id: '1', key: A, scope: PROJECT }
",
            "anywhere.json" => r#"[{ "id": "4", "key": "QOVERY_ID", "scope": "BUILT_IN" }]"#,
        };

        let ids = |variables: Vec<Variable>| -> Vec<String> {
            variables.into_iter().map(|variable| variable.id).collect()
        };

        assert_eq!(ids(snapshot.variables("prj", Scope::Project)), vec!["1", "4"]);
        assert_eq!(
            ids(snapshot.variables("env", Scope::Environment)),
            vec!["2", "3", "4"]
        );
        assert_eq!(ids(snapshot.variables("env", Scope::Project)), vec!["4"]);
        assert_eq!(snapshot.all().count(), 4);
        assert_eq!(snapshot.source_count(), 3);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.json")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("a.yml")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("a.yaml")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("a.hcl")), None);
        assert_eq!(Format::from_path(Path::new("json")), None);
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            Format::Json.parse("[{]"),
            Err(LoadError::JsonParseFailed(_))
        ));
        assert!(matches!(
            Format::Yaml.parse("- id: 1\n  scope: NOWHERE\n  key: A"),
            Err(LoadError::YamlParseFailed(_))
        ));
        assert!(matches!(
            Format::Json.parse(r#"[{ "id": "1", "key": "", "scope": "PROJECT" }]"#),
            Err(LoadError::JsonParseFailed(_))
        ));
    }

    #[test]
    fn check_collects_issues() {
        let project = Variable::new("1", "A", Scope::Project);
        let snapshot = crate::snapshot![
            project.clone(),
            Variable::new("2", "qovery_token", Scope::Environment),
            project,
        ];

        let issues = snapshot.check().expect_err("must report issues");
        assert_eq!(
            issues.issues(),
            &[
                SnapshotIssue::Variable(variable::Issue::ReservedPrefix { id: "2".into() }),
                SnapshotIssue::DuplicateId {
                    id: "1".into(),
                    first: None,
                    second: None
                },
            ]
        );
        assert_eq!(
            issues.to_string(),
            "2: key uses the reserved `qovery` prefix (and 1 more)"
        );

        assert!(crate::snapshot![Variable::new("1", "A", Scope::Project)]
            .check()
            .is_ok());
    }

    #[test]
    fn empty_directory() {
        let dir = std::env::temp_dir().join(format!("varscope-empty-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut snapshot = Snapshot::default();
        assert!(matches!(
            snapshot.load_directory(&dir),
            Err(LoadError::NoFilesFound)
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
