//! Check command implementation.

use anyhow::{Context, Result};
use lintel_core::{
    AnalysisContext, Analyzer, Config, ConfigError, ExtensionRegistry, LintResult,
    ProjectStatistics, ReportWriter, RuleId, Severity, ValidationSettings, CONFIG_SECTION,
};
use lintel_rules::DEPRECATED_PROPERTIES;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::config_resolver;
use crate::discover;
use crate::reports::{
    CompactReport, JsonReport, MinSeverityFilter, PrettyReport, TextReport, MIN_SEVERITY_KEY,
};
use crate::OutputFormat;

/// Arguments of `lintel check`.
#[derive(Debug, clap::Args)]
pub struct CheckArgs {
    /// File or directory to analyze
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Console output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Write an output report to a file, as `<id>:<path>` (ids: json, compact)
    #[arg(long = "report", value_name = "ID:PATH")]
    pub reports: Vec<String>,

    /// Worker threads (default: one per core)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Analyze files one after another on the calling thread
    #[arg(long)]
    pub sequential: bool,

    /// Run every rule not explicitly deactivated
    #[arg(long)]
    pub all_rules: bool,

    /// Let rules that support it correct the code
    #[arg(long)]
    pub auto_correct: bool,

    /// Rule ids to skip (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Lowest severity to report (overrides `config.minSeverity`)
    #[arg(long)]
    pub min_severity: Option<Severity>,
}

/// Runs the check command.
///
/// Returns `true` when the run should fail: error findings or error
/// notifications.
pub fn run(args: &CheckArgs, explicit_config: Option<&Path>) -> Result<bool> {
    let writer = args
        .reports
        .iter()
        .try_fold(ReportWriter::new(), |writer, spec| writer.parse_destination(spec))?;

    let (analyzer, result) = analyze(args, explicit_config, std::io::stdout().is_terminal())?;

    let mut stdout = std::io::stdout().lock();
    writer.write(analyzer.extensions(), &result, &mut stdout)?;

    Ok(result.has_errors() || result.has_error_notifications())
}

/// Loads the configuration, builds the analyzer and analyzes `args.path`.
fn analyze(
    args: &CheckArgs,
    explicit_config: Option<&Path>,
    color: bool,
) -> Result<(Analyzer, LintResult)> {
    let project_dir = if args.path.is_file() {
        args.path.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        args.path.clone()
    };

    let source = config_resolver::resolve(&project_dir, explicit_config);
    let user = source.load().with_context(|| match source.path() {
        Some(p) => format!("Failed to load config: {}", p.display()),
        None => "Failed to load config".to_string(),
    })?;
    let defaults = lintel_rules::default_config().context("Built-in defaults are invalid")?;

    let validation = DEPRECATED_PROPERTIES.iter().fold(
        ValidationSettings::from_config(&user).context("Invalid validation settings")?,
        |settings, (path, hint)| settings.deprecate(*path, *hint),
    );
    let registry = extensions(args, &user, color)?;
    let skip = args
        .skip
        .iter()
        .map(|id| RuleId::new(id.trim()))
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid --skip rule id")?;

    let mut builder = Analyzer::builder()
        .providers(lintel_rules::providers())
        .defaults(defaults)
        .config(user)
        .validation(validation)
        .extensions(registry)
        .sequential(args.sequential)
        .activate_all_rules(args.all_rules)
        .auto_correct(args.auto_correct)
        .skip_rules(skip)
        .context(AnalysisContext::new(&project_dir));
    if let Some(jobs) = args.jobs {
        builder = builder.parallelism(jobs);
    }
    let analyzer = builder.build().context("Failed to build analyzer")?;

    let files = discover::rust_files(&args.path)
        .with_context(|| format!("Failed to walk {}", args.path.display()))?;
    let (trees, parse_failures) = discover::parse_all(&files);

    tracing::info!(
        "Analyzing {} files with {} rules",
        trees.len(),
        analyzer.rule_count()
    );
    let mut result = analyzer.analyze(&trees);
    result.notifications.extend(parse_failures);

    Ok((analyzer, result))
}

fn extensions(args: &CheckArgs, user: &Config, color: bool) -> Result<ExtensionRegistry> {
    let mut registry = ExtensionRegistry::new();
    registry.register(ProjectStatistics::new());
    match args.format {
        OutputFormat::Text => {
            registry.register(TextReport::new(color));
        }
        OutputFormat::Pretty => {
            registry.register(PrettyReport::new(color));
        }
        OutputFormat::Json | OutputFormat::Compact => {}
    }
    registry
        .register(JsonReport::new(matches!(args.format, OutputFormat::Json)))
        .register(CompactReport::new(matches!(args.format, OutputFormat::Compact)));

    let section = user.sub_config(CONFIG_SECTION);
    let configured: Option<String> = section.value_or_none(MIN_SEVERITY_KEY)?;
    let min_severity = match (args.min_severity, configured) {
        (Some(severity), _) => Some(severity),
        (None, Some(name)) => Some(name.parse::<Severity>().map_err(|_| {
            ConfigError::UnknownSeverity {
                key: section.key_path(MIN_SEVERITY_KEY),
                value: name,
                allowed: Severity::ALLOWED,
            }
        })?),
        (None, None) => None,
    };
    if let Some(min) = min_severity {
        registry.register(MinSeverityFilter::new(min));
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lintel_core::Finding;
    use std::fs;
    use tempfile::TempDir;

    const SOURCE: &str = "fn many(a: u8, b: u8, c: u8) {}\n\nstruct lower_case;\n";

    fn args(path: &Path) -> CheckArgs {
        CheckArgs {
            path: path.to_path_buf(),
            format: OutputFormat::Text,
            reports: Vec::new(),
            jobs: Some(2),
            sequential: false,
            all_rules: false,
            auto_correct: false,
            skip: Vec::new(),
            min_severity: None,
        }
    }

    fn project(config: &str) -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/lib.rs"), SOURCE).unwrap();
        fs::write(tmp.path().join("lintel.toml"), config).unwrap();
        tmp
    }

    fn rule_ids(result: &LintResult) -> Vec<String> {
        result.all_findings().map(Finding::qualified_id).collect()
    }

    #[test]
    fn project_config_is_layered_over_defaults() {
        let tmp = project("[complexity.LongParameterList]\nthreshold = 3\nseverity = \"error\"\n");
        let (_, result) = analyze(&args(tmp.path()), None, false).unwrap();

        assert_eq!(
            rule_ids(&result),
            vec!["complexity:LongParameterList", "naming:TypeNaming"]
        );
        assert!(result.has_errors());
        assert_eq!(result.files_checked, 1);
        assert!(result.notifications.is_empty(), "{:?}", result.notifications);
    }

    #[test]
    fn deprecated_and_misspelled_keys_are_reported() {
        let tmp = project("[naming.FunctionNaming]\npattern = \"[a-z]+\"\n\n[style.MaxLineLenght]\nactive = true\n");
        let (_, result) = analyze(&args(tmp.path()), None, false).unwrap();

        let messages: Vec<String> = result.notifications.iter().map(ToString::to_string).collect();
        assert!(messages.contains(
            &"warning: Property 'naming>FunctionNaming>pattern' is deprecated. Use 'functionPattern' instead.".to_string()
        ));
        assert!(messages.contains(
            &"error: Property 'style>MaxLineLenght' is misspelled or does not exist.".to_string()
        ));
        assert!(result.has_error_notifications());
    }

    #[test]
    fn min_severity_and_skip() {
        let tmp = project("[config]\nminSeverity = \"error\"\n\n[complexity.LongParameterList]\nthreshold = 3\nseverity = \"error\"\n");
        let (_, result) = analyze(&args(tmp.path()), None, false).unwrap();
        assert_eq!(rule_ids(&result), vec!["complexity:LongParameterList"]);

        let mut skipping = args(tmp.path());
        skipping.skip = vec!["LongParameterList".to_string()];
        let (_, result) = analyze(&skipping, None, false).unwrap();
        assert!(rule_ids(&result).is_empty());
    }

    #[test]
    fn unknown_min_severity_names_the_key() {
        let tmp = project("[config]\nminSeverity = \"fatal\"\n");
        let err = analyze(&args(tmp.path()), None, false).err().expect("analysis should fail");
        let message = err.to_string();
        assert!(message.contains("config>minSeverity"), "{message}");
        assert!(message.contains("fatal"), "{message}");
    }

    #[test]
    fn misshapen_validation_setting_is_an_error() {
        let tmp = project("[config]\nwarningsAsErrors = \"yes\"\n");
        let err = analyze(&args(tmp.path()), None, false).err().expect("analysis should fail");
        assert!(format!("{err:#}").contains("config>warningsAsErrors"), "{err:#}");
    }

    #[test]
    fn json_report_written_to_destination() {
        let tmp = project("");
        let out = tmp.path().join("build/report.json");
        let mut args = args(tmp.path());
        args.format = OutputFormat::Json;

        let (analyzer, result) = analyze(&args, None, false).unwrap();
        let writer = ReportWriter::new().destination("json", &out);
        let mut console = Vec::new();
        let written = writer.write(analyzer.extensions(), &result, &mut console).unwrap();

        assert_eq!(written, vec![out.clone()]);
        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        let printed: serde_json::Value = serde_json::from_slice(&console).unwrap();
        assert_eq!(on_disk, printed);
        assert_eq!(on_disk["files_checked"], 1);
    }

    #[test]
    fn unparsable_file_is_an_error_notification() {
        let tmp = project("");
        fs::write(tmp.path().join("src/broken.rs"), "fn broken( -> {}\n").unwrap();
        let (_, result) = analyze(&args(tmp.path()), None, false).unwrap();
        assert_eq!(result.files_checked, 1);
        assert!(result.has_error_notifications());
    }
}
