mod cli;

use anyhow::Context as _;
use serde::Serialize;
use std::path::{Path, PathBuf};
use varscope::display::{Badge, RowAction};
use varscope::import::{ImportRequest, RowCheck};
use varscope::key_validation::{KeyIssue, KeyWarning};
use varscope::scope::Scope;
use varscope::snapshot::{Format, Snapshot};
use varscope::variable::Variable;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("VARSCOPE_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let command_result = enter_directories(&cli.directory).and_then(|()| match cli.command {
        cli::Command::Sort(sort_cli) => sort(sort_cli),
        cli::Command::Scopes(scopes_cli) => scopes(scopes_cli),
        cli::Command::CheckKey(check_key_cli) => check_key(check_key_cli),
        cli::Command::Import(import_cli) => import(import_cli),
        cli::Command::Check(check_cli) => check(check_cli),
        cli::Command::Delete(delete_cli) => delete(delete_cli),
    });

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

/// Enter every `-C` directory in turn, listings are then read relative to the last one
fn enter_directories(directories: &[PathBuf]) -> anyhow::Result<()> {
    for directory in directories {
        let resolved = directory
            .canonicalize()
            .with_context(|| format!("cannot resolve -C {}", directory.display()))?;
        std::env::set_current_dir(&resolved)
            .with_context(|| format!("cannot enter {}", resolved.display()))?;

        tracing::debug!(directory = %resolved.display(), "entered directory");
    }

    Ok(())
}

#[derive(Serialize)]
struct Row<'v> {
    id: &'v str,
    key: &'v str,
    scope: Scope,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    badges: Vec<Badge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_key: Option<&'v str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_name: Option<&'v str>,
    value: String,
    selectable: bool,
    actions: Vec<RowAction>,
}

pub fn sort(cli: cli::SortCommand) -> anyhow::Result<()> {
    let snapshot = load(&cli.input)?;
    let sorted = varscope::ordering::sort_for_display(snapshot.all().cloned().collect());
    let search = cli.search.as_deref().unwrap_or_default();

    let rows: Vec<Row> = varscope::ordering::filter_by_search(&sorted, search)
        .into_iter()
        .map(|variable| Row {
            id: &variable.id,
            key: &variable.key,
            scope: variable.scope,
            badges: varscope::display::badges(variable),
            parent_key: varscope::display::parent_key(variable),
            service_name: variable.service_name.as_deref(),
            value: varscope::display::display_value(variable, cli.show_secrets).to_string(),
            selectable: varscope::display::is_selectable(variable),
            actions: varscope::display::row_actions(variable, &sorted),
        })
        .collect();

    output(&cli.output, &rows)
}

pub fn scopes(cli: cli::ScopesCommand) -> anyhow::Result<()> {
    let scopes = varscope::availability::compute_available_scopes(
        cli.current,
        cli.include_built_in,
        cli.context,
        cli.is_override,
    );

    output(&cli.output, &scopes)
}

#[derive(Serialize)]
struct KeyReport<'k> {
    key: &'k str,
    #[serde(skip_serializing_if = "Option::is_none")]
    issue: Option<KeyIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<KeyWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

pub fn check_key(cli: cli::CheckKeyCommand) -> anyhow::Result<()> {
    let existing = load_existing(&cli.input)?;

    let issue =
        varscope::key_validation::check_key(&cli.key, &existing, cli.scope, cli.context).err();
    let warning = match issue {
        Some(_) => None,
        None => varscope::key_validation::warning_for_key(
            &cli.key,
            &existing,
            cli.scope,
            cli.overwrite,
            cli.context,
        ),
    };
    let message = issue
        .map(|issue| issue.to_string())
        .or_else(|| warning.map(|warning| warning.to_string()));

    output(
        &cli.output,
        &KeyReport {
            key: &cli.key,
            issue,
            warning,
            message,
        },
    )?;

    anyhow::ensure!(issue.is_none(), "key `{}` is not valid", cli.key);
    Ok(())
}

#[derive(Serialize)]
struct ImportReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    request: Option<ImportRequest>,
    checks: Vec<RowCheck>,
}

pub fn import(cli: cli::ImportCommand) -> anyhow::Result<()> {
    use varscope::availability::{compute_available_scopes, default_import_scope};
    use varscope::import;

    let text = if cli.payload == Path::new("-") {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(&cli.payload)?
    };
    let parsed = import::parse_import_payload(&text)?;
    let existing = load_existing(&cli.input)?;

    let available = compute_available_scopes(None, false, Some(cli.context), false);
    let scope = cli
        .scope
        .unwrap_or_else(|| default_import_scope(cli.context, &available));
    anyhow::ensure!(
        available.contains(&scope),
        "scope {scope} is not available from a {} page",
        cli.context
    );

    let keys: Vec<String> = parsed.keys().cloned().collect();
    let mut form = import::to_form_records(&parsed, scope);
    if cli.secret {
        import::set_secret_for_all(&mut form, &keys, true);
    }

    let service_context = cli.context.is_service().then_some(cli.context);
    let checks = import::check_rows(&form, &keys, &existing, cli.overwrite, service_context);
    let invalid = checks.iter().filter(|check| !check.is_valid()).count();

    let request =
        (invalid == 0).then(|| ImportRequest::from_form(&form, &keys, cli.overwrite));
    output(&cli.output, &ImportReport { request, checks })?;

    anyhow::ensure!(invalid == 0, "{invalid} rows cannot be imported");
    Ok(())
}

pub fn check(cli: cli::CheckCommand) -> anyhow::Result<()> {
    let snapshot = load(&cli.input)?;

    if let Err(issues) = snapshot.check() {
        for issue in issues.issues() {
            println!("{issue}");
        }
        anyhow::bail!("{} issues found", issues.issues().len());
    }

    tracing::info!(count = snapshot.all().count(), "no issues found");
    Ok(())
}

pub fn delete(cli: cli::DeleteCommand) -> anyhow::Result<()> {
    let all: Vec<Variable> = load(&cli.input)?.all().cloned().collect();

    let selected = cli
        .ids
        .iter()
        .map(|id| {
            all.iter()
                .find(|variable| &variable.id == id)
                .cloned()
                .with_context(|| format!("no variable with id {id}"))
        })
        .collect::<anyhow::Result<Vec<Variable>>>()?;

    match varscope::display::check_delete_selection(&selected, &all) {
        Ok(order) => {
            let ids: Vec<&str> = order.iter().map(|variable| variable.id.as_str()).collect();
            output(&cli.output, &ids)
        }
        Err(rejections) => {
            for (id, rejection) in &rejections {
                eprintln!("{id}: {rejection}");
            }
            anyhow::bail!("{} of the selected variables cannot be deleted", rejections.len())
        }
    }
}

fn load(input: &cli::InputArgs) -> anyhow::Result<Snapshot> {
    let mut snapshot = Snapshot::default();

    if input.is_empty() {
        let stdin = std::io::read_to_string(std::io::stdin())?;
        // yaml also reads json listings
        snapshot.insert(Format::Yaml.parse(&stdin)?, None);
        return Ok(snapshot);
    }

    for file_path in &input.files {
        snapshot.load_file(file_path)?;
    }

    for dir_path in &input.directories {
        snapshot.load_directory(dir_path)?;
    }

    anyhow::ensure!(snapshot.source_count() > 0, "No files loaded");

    Ok(snapshot)
}

/// Like [load] but without stdin, no input means no existing variables
fn load_existing(input: &cli::InputArgs) -> anyhow::Result<Vec<Variable>> {
    if input.is_empty() {
        return Ok(vec![]);
    }

    Ok(load(input)?.all().cloned().collect())
}

fn output(output: &cli::OutputArgs, value: &impl Serialize) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
    };

    Ok(())
}
