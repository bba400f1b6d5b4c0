//! Command line host for the attribute editor.
//!
//! Loads attributes from YAML files, replays an edit through an editor and
//! prints the resulting report as JSON, the same way a console form would
//! submit it.
use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use clap::{Args, Parser, ValueEnum};
use serde::{Serialize, de::DeserializeOwned};
use snafu::{ResultExt, Snafu};
use stackable_kvp_editor::{
    binding::AttributeBinding,
    editor::{AttributeListEditor, EditorOptions, RemovedEntry},
    kvp::{AnnotationKind, AttributeKind, LabelKind, TaintKind},
    restriction::{self, RestrictionPolicy, RestrictionSettings},
    validation::Errors,
};

mod logging;

const APP_NAME: &str = "kvp-editor";
const LOG_ENV: &str = "KVP_EDITOR_LOG";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize logging"))]
    InitializeLogging { source: logging::Error },

    #[snafu(display("failed to read {path:?}"))]
    ReadInput {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse YAML in {path:?}"))]
    ParseInput {
        source: serde_yaml::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to load restriction settings"))]
    LoadSettings { source: restriction::Error },

    #[snafu(display("restriction settings are invalid"))]
    InvalidSettings { source: restriction::Error },

    #[snafu(display("failed to serialize report"))]
    SerializeReport { source: serde_json::Error },

    #[snafu(display("failed to write report to stdout"))]
    WriteReport { source: std::io::Error },
}

#[derive(Debug, Parser)]
#[command(name = APP_NAME, version, about)]
enum Command {
    /// Replay an edit and print the emitted attributes, removed entries and
    /// validation errors as JSON.
    Diff(DiffArguments),

    /// Validate a restriction settings file and print every problem found.
    CheckSettings {
        /// YAML file with `hiddenKeys`, `protectedKeys` and `staticLabels`.
        #[arg(long, value_name = "FILE")]
        settings: PathBuf,
    },
}

#[derive(Debug, PartialEq, Eq, Args)]
struct DiffArguments {
    /// The kind of attributes contained in the input files.
    #[arg(long, value_enum)]
    kind: Kind,

    /// YAML file with the attributes as they were loaded from the server.
    #[arg(long, value_name = "FILE")]
    initial: PathBuf,

    /// YAML file with the attributes as they were edited by the user.
    #[arg(long, value_name = "FILE")]
    current: PathBuf,

    /// YAML file with administrator restriction settings.
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// YAML map of attributes inherited from the parent resource.
    #[arg(long, value_name = "FILE")]
    inherited: Option<PathBuf>,

    /// Treat the initial attributes as an existing resource, which enables
    /// removal tracking.
    #[arg(long)]
    edit: bool,

    /// Skip syntax, uniqueness and required checks.
    #[arg(long)]
    no_validation: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
enum Kind {
    Label,
    Annotation,
    Taint,
}

/// The JSON document printed by `diff`.
#[derive(Debug, Serialize)]
struct Report<T> {
    valid: bool,
    attributes: T,
    removed: Vec<RemovedEntry>,
    errors: Errors,
}

#[snafu::report]
fn main() -> Result<()> {
    logging::initialize_logging(LOG_ENV, APP_NAME).context(InitializeLoggingSnafu)?;

    match Command::parse() {
        Command::Diff(arguments) => {
            let report = match arguments.kind {
                Kind::Label => diff::<LabelKind>(&arguments).and_then(|report| to_json(&report)),
                Kind::Annotation => {
                    diff::<AnnotationKind>(&arguments).and_then(|report| to_json(&report))
                }
                Kind::Taint => diff::<TaintKind>(&arguments).and_then(|report| to_json(&report)),
            }?;

            writeln!(std::io::stdout(), "{report}").context(WriteReportSnafu)
        }
        Command::CheckSettings { settings } => check_settings(&settings),
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).context(ReadInputSnafu { path })?;
    serde_yaml::from_str(&contents).context(ParseInputSnafu { path })
}

fn to_json<T: Serialize>(report: &T) -> Result<String> {
    serde_json::to_string_pretty(report).context(SerializeReportSnafu)
}

fn load_policy(arguments: &DiffArguments) -> Result<RestrictionPolicy> {
    let mut policy = match &arguments.settings {
        Some(path) => {
            let settings = RestrictionSettings::from_file(path).context(LoadSettingsSnafu)?;
            settings.validate().context(InvalidSettingsSnafu)?;
            RestrictionPolicy::from_settings(&settings)
        }
        None => RestrictionPolicy::new(),
    };

    if let Some(path) = &arguments.inherited {
        let inherited: BTreeMap<String, String> = read_yaml(path)?;
        policy = policy.with_inherited(inherited);
    }

    Ok(policy)
}

/// Builds an editor from the initial attributes, writes the current ones into
/// it and collects the result.
fn diff<K>(arguments: &DiffArguments) -> Result<Report<K::Output>>
where
    K: AttributeKind,
    K::Input: DeserializeOwned,
{
    let policy = load_policy(arguments)?;
    let initial: K::Input = read_yaml(&arguments.initial)?;
    let current: K::Input = read_yaml(&arguments.current)?;

    let options = EditorOptions {
        edit_context: arguments.edit,
        validation_enabled: !arguments.no_validation,
        ..EditorOptions::default()
    };

    tracing::debug!(kind = %arguments.kind, ?options, "replaying edit");

    let mut editor = AttributeListEditor::<K>::new(initial, policy, options);
    editor.set_value(current);

    let emission = editor.emission();
    let errors = editor.validate().err().unwrap_or_default();

    if !emission.valid {
        tracing::warn!(count = errors.len(), "edited attributes are invalid");
    }

    Ok(Report {
        valid: emission.valid,
        attributes: emission.attributes,
        removed: emission.removed,
        errors,
    })
}

fn check_settings(path: &Path) -> Result<()> {
    let settings = RestrictionSettings::from_file(path).context(LoadSettingsSnafu)?;

    let mut stdout = std::io::stdout();
    for problem in settings.problems() {
        writeln!(stdout, "{problem}").context(WriteReportSnafu)?;
    }

    settings.validate().context(InvalidSettingsSnafu)
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use indoc::indoc;
    use serde_json::json;
    use tempfile::NamedTempFile;

    use super::*;

    fn yaml_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temporary file can be created");
        file.write_all(contents.as_bytes())
            .expect("temporary file is writable");
        file
    }

    fn arguments(kind: Kind, initial: &NamedTempFile, current: &NamedTempFile) -> DiffArguments {
        DiffArguments {
            kind,
            initial: initial.path().to_owned(),
            current: current.path().to_owned(),
            settings: None,
            inherited: None,
            edit: true,
            no_validation: false,
        }
    }

    #[test]
    fn parse_diff_arguments() {
        let command = Command::try_parse_from([
            APP_NAME,
            "diff",
            "--kind",
            "taint",
            "--initial",
            "a.yaml",
            "--current",
            "b.yaml",
            "--edit",
        ])
        .expect("arguments are valid");

        let Command::Diff(arguments) = command else {
            panic!("expected diff command");
        };
        assert_eq!(arguments.kind, Kind::Taint);
        assert!(arguments.edit);
        assert!(!arguments.no_validation);
        assert_eq!(arguments.settings, None);
    }

    #[test]
    fn diff_labels() {
        let initial = yaml_file(indoc! {"
            env: prod
            team: x
        "});
        let current = yaml_file(indoc! {"
            env: staging
            tier: gold
        "});

        let report = diff::<LabelKind>(&arguments(Kind::Label, &initial, &current))
            .expect("diff succeeds");

        assert_eq!(
            serde_json::to_value(&report).expect("report serializes"),
            json!({
                "valid": true,
                "attributes": {"env": "staging", "team": null, "tier": "gold"},
                "removed": [{"key": "team", "value": "x"}],
                "errors": [],
            })
        );
    }

    #[test]
    fn diff_with_restrictions() {
        let initial = yaml_file("owner: team-a\n");
        let current = yaml_file(indoc! {"
            owner: team-a
            internal: x
        "});
        let settings = yaml_file(indoc! {"
            hiddenKeys: [internal]
            protectedKeys: [owner]
        "});
        let inherited = yaml_file("project: p1\n");

        let mut arguments = arguments(Kind::Annotation, &initial, &current);
        arguments.settings = Some(settings.path().to_owned());
        arguments.inherited = Some(inherited.path().to_owned());

        let report = diff::<AnnotationKind>(&arguments).expect("diff succeeds");

        // Hidden attributes never reach the editor
        assert!(report.valid);
        assert_eq!(
            serde_json::to_value(&report.attributes).expect("patch serializes"),
            json!({"owner": "team-a", "project": "p1"})
        );
    }

    #[test]
    fn diff_keeps_protected_labels() {
        let initial = yaml_file(indoc! {"
            env: prod
            owner: team-a
        "});
        let current = yaml_file("env: prod\n");
        let settings = yaml_file("protectedKeys: [owner]\n");

        let mut arguments = arguments(Kind::Label, &initial, &current);
        arguments.settings = Some(settings.path().to_owned());

        let report = diff::<LabelKind>(&arguments).expect("diff succeeds");

        assert!(report.removed.is_empty());
        assert_eq!(
            serde_json::to_value(&report.attributes).expect("patch serializes"),
            json!({"env": "prod", "owner": "team-a"})
        );
    }

    #[test]
    fn diff_reports_errors() {
        let initial = yaml_file("[]");
        let current = yaml_file(indoc! {"
            - key: dedicated
              effect: NoSchedule
            - key: dedicated
              value: not valid
              effect: NoExecute
        "});

        let report = diff::<TaintKind>(&arguments(Kind::Taint, &initial, &current))
            .expect("diff succeeds");

        assert!(!report.valid);
        let kinds = report
            .errors
            .iter()
            .map(|error| (error.index, error.kind.as_ref().to_owned()))
            .collect::<Vec<_>>();
        assert_eq!(kinds, vec![
            (0, "duplicateKey".to_owned()),
            (1, "valuePatternInvalid".to_owned()),
            (1, "duplicateKey".to_owned()),
        ]);
    }

    #[test]
    fn diff_missing_file() {
        let current = yaml_file("{}");
        let mut arguments = arguments(Kind::Label, &current, &current);
        arguments.initial = PathBuf::from("/does/not/exist.yaml");

        let err = diff::<LabelKind>(&arguments).unwrap_err();
        assert!(matches!(err, Error::ReadInput { .. }));
    }

    #[test]
    fn check_invalid_settings() {
        let settings = yaml_file("protectedKeys: [Bad.Prefix/name]\n");

        let err = check_settings(settings.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidSettings { .. }));
    }
}
