//! Integration test: rule sets, suppression and extensions end-to-end via Analyzer.

use lintel_core::{
    Analyzer, AnalyzerError, Annotation, Config, ConfigAware, ConfigError, Debt, Extension,
    FileProcessListener, FindingsMap, Issue, LintResult, Metric, Node, NodeKind, NodeSpec,
    NotificationLevel, OutputReport, ProjectStatistics, Property, ReportWriter, ReportingExtension,
    Rule, RuleContext, RuleEntry, RuleError, RuleId, RuleSet, RuleSetError, RuleSetId,
    RuleSetProvider, Severity, Span, SyntaxTree, TreeBuilder, FILES_METRIC, LINES_METRIC,
};
use std::sync::{Arc, Mutex};

const SERVICE: &str = "struct Service;\nimpl Service {\n    fn run(a: u8, b: u8, c: u8, d: u8, e: u8, f: u8) {}\n}\n";

/// Reports functions with more parameters than `threshold`.
struct MyRule {
    issue: Issue,
    config: Config,
    threshold: Property<usize>,
}

impl MyRule {
    fn new(config: Config) -> Self {
        let threshold = Property::new(&config, "threshold", 10_usize);
        Self {
            issue: Issue::new("MyRule", Severity::Warning, "Too many parameters", Debt::TWENTY_MINS)
                .unwrap(),
            config,
            threshold,
        }
    }
}

impl ConfigAware for MyRule {
    fn issue(&self) -> &Issue {
        &self.issue
    }
    fn config(&self) -> &Config {
        &self.config
    }
}

impl Rule for MyRule {
    fn node_kinds(&self) -> &[NodeKind] {
        &[NodeKind::Function]
    }

    fn visit(&self, node: Node<'_>, ctx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        let threshold = *self.threshold.get()?;
        let params = node
            .children()
            .filter(|c| c.kind() == NodeKind::Parameter)
            .count();
        if params > threshold {
            ctx.report_metric(
                node,
                format!("Function has {params} parameters"),
                Metric::new("PARAMETERS", params as i64, threshold as i64),
            );
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.threshold.get().map(|_| ())
    }
}

/// Panics on every function named `boom`.
struct Explosive {
    issue: Issue,
    config: Config,
}

impl ConfigAware for Explosive {
    fn issue(&self) -> &Issue {
        &self.issue
    }
    fn config(&self) -> &Config {
        &self.config
    }
}

impl Rule for Explosive {
    fn node_kinds(&self) -> &[NodeKind] {
        &[NodeKind::Function]
    }

    fn visit(&self, node: Node<'_>, ctx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        if node.name() == Some("boom") {
            panic!("cannot handle boom");
        }
        ctx.report(node, "seen");
        Ok(())
    }
}

struct Style {
    explosive: bool,
}

impl RuleSetProvider for Style {
    fn rule_set_id(&self) -> &str {
        "style"
    }

    fn instance(&self, config: &Config) -> Result<RuleSet, RuleSetError> {
        let mut entries: Vec<RuleEntry> = vec![RuleEntry::single(MyRule::new(
            config.sub_config("MyRule"),
        ))];
        if self.explosive {
            entries.push(RuleEntry::single(Explosive {
                issue: Issue::new("Explosive", Severity::Info, "Panics", Debt::FIVE_MINS)?,
                config: config.sub_config("Explosive"),
            }));
        }
        RuleSet::new(RuleSetId::new("style")?, entries)
    }
}

fn service_file(path: &str, enclosing: Vec<Annotation>, function: &str) -> SyntaxTree {
    let mut builder = TreeBuilder::new(path, SERVICE);
    let end = builder.content().len();
    builder.leaf(NodeSpec::new(NodeKind::Class, Span::new(1, 1, 0, 15)).named("Service"));
    builder.open(
        NodeSpec::new(NodeKind::Class, Span::new(2, 1, 16, end - 1))
            .named("Service")
            .with_annotations(enclosing),
    );
    let start = builder.offset_for(3, 5);
    let fn_end = builder.offset_for(3, 56);
    builder.open(NodeSpec::new(NodeKind::Function, Span::new(3, 5, start, fn_end)).named(function));
    for (i, name) in ["a", "b", "c", "d", "e", "f"].into_iter().enumerate() {
        let col = 12 + i * 7;
        let offset = builder.offset_for(3, col);
        builder.leaf(
            NodeSpec::new(NodeKind::Parameter, Span::new(3, col, offset, offset + 5)).named(name),
        );
    }
    builder.close();
    builder.close();
    builder.build()
}

fn config(toml: &str) -> Config {
    Config::from_toml_str(toml).unwrap()
}

const MY_RULE_CONFIG: &str = r#"
[style]
active = true

[style.MyRule]
active = true
threshold = 5
"#;

fn analyzer(toml: &str) -> Analyzer {
    Analyzer::builder()
        .provider(Style { explosive: false })
        .config(config(toml))
        .sequential(true)
        .build()
        .unwrap()
}

#[test]
fn reports_one_finding_with_metric() {
    let result = analyzer(MY_RULE_CONFIG).analyze(&[service_file("src/service.rs", vec![], "run")]);

    assert_eq!(result.finding_count(), 1);
    let findings = &result.findings[&RuleSetId::new("style").unwrap()];
    let finding = &findings[0];
    assert_eq!(finding.rule_id.as_str(), "MyRule");
    assert_eq!(finding.location().line, 3);
    assert_eq!(finding.entity.name, "run");
    assert_eq!(finding.metrics[0].value(), 6);
    assert_eq!(finding.metrics[0].threshold(), 5);
    assert_eq!(finding.qualified_id(), "style:MyRule");
    assert!(result.notifications.is_empty());
}

#[test]
fn suppression_on_enclosing_declaration() {
    let file = service_file(
        "src/service.rs",
        vec![Annotation::new("Suppress", ["\"MyRule\""])],
        "run",
    );
    let result = analyzer(MY_RULE_CONFIG).analyze(&[file]);

    assert_eq!(result.finding_count(), 0);
    assert!(result.notifications.is_empty());
    assert_eq!(result.suppressed.len(), 1);
    assert_eq!(result.suppressed[0].entity.name, "run");
    assert_eq!(
        result.suppressed[0].suppress_reasons,
        vec!["suppressed by Suppress(\"MyRule\")".to_string()]
    );
}

#[test]
fn configured_severity_applies() {
    let toml = format!("{MY_RULE_CONFIG}severity = \"error\"\n");
    let result = analyzer(&toml).analyze(&[service_file("a.rs", vec![], "run")]);
    assert!(result.has_errors());
    assert_eq!(result.count_by_severity(), (1, 0, 0));
}

#[test]
fn invalid_property_aborts_before_analysis() {
    let result = Analyzer::builder()
        .provider(Style { explosive: false })
        .config(config("[style.MyRule]\nthreshold = \"five\""))
        .build();
    let Err(err) = result else {
        panic!("expected a configuration error");
    };
    assert!(matches!(err, AnalyzerError::RuleSet { .. }));
    assert!(err.to_string().contains("threshold"), "{err}");
}

#[test]
fn failing_rule_is_isolated_per_file() {
    let analyzer = Analyzer::builder()
        .provider(Style { explosive: true })
        .config(config(MY_RULE_CONFIG))
        .sequential(true)
        .build()
        .unwrap();
    let files = [
        service_file("boom.rs", vec![], "boom"),
        service_file("fine.rs", vec![], "run"),
    ];
    let result = analyzer.analyze(&files);

    let rules: Vec<(&str, String)> = result
        .all_findings()
        .map(|f| (f.rule_id.as_str(), f.location().file.display().to_string()))
        .collect();
    assert_eq!(
        rules,
        vec![
            ("MyRule", "boom.rs".to_string()),
            ("MyRule", "fine.rs".to_string()),
            ("Explosive", "fine.rs".to_string()),
        ]
    );
    assert_eq!(result.notifications.len(), 1);
    assert_eq!(result.notifications[0].level, NotificationLevel::Error);
    assert!(result.notifications[0].message.contains("'Explosive'"));
    assert!(result.notifications[0].message.contains("cannot handle boom"));
}

#[test]
fn parallel_run_matches_sequential_run() {
    let files: Vec<SyntaxTree> = (0..24)
        .map(|i| {
            let annotations = if i % 3 == 0 {
                vec![Annotation::new("suppress", ["MyRule"])]
            } else {
                vec![]
            };
            service_file(&format!("src/file_{i:02}.rs"), annotations, "run")
        })
        .collect();

    let sequential = analyzer(MY_RULE_CONFIG).analyze(&files);
    let parallel = Analyzer::builder()
        .provider(Style { explosive: false })
        .config(config(MY_RULE_CONFIG))
        .parallelism(4)
        .build()
        .unwrap()
        .analyze(&files);

    let locations = |result: &LintResult| -> Vec<String> {
        result
            .all_findings()
            .map(|f| format!("{}:{}", f.location().file.display(), f.location().line))
            .collect()
    };
    assert_eq!(sequential.finding_count(), 16);
    assert_eq!(locations(&sequential), locations(&parallel));
}

#[test]
fn excluded_files_are_skipped_by_the_rule_set() {
    let result = analyzer("[style]\nexcludes = [\"**/generated/**\"]\n[style.MyRule]\nthreshold = 5")
        .analyze(&[
            service_file("src/generated/service.rs", vec![], "run"),
            service_file("src/service.rs", vec![], "run"),
        ]);
    assert_eq!(result.finding_count(), 1);
    assert_eq!(result.files_checked, 2);
}

#[test]
fn skipped_rules_do_not_run() {
    let analyzer = Analyzer::builder()
        .provider(Style { explosive: false })
        .config(config(MY_RULE_CONFIG))
        .skip_rules([RuleId::new("MyRule").unwrap()])
        .sequential(true)
        .build()
        .unwrap();
    assert_eq!(analyzer.analyze(&[service_file("a.rs", vec![], "run")]).finding_count(), 0);
}

#[test]
fn misshapen_warnings_as_errors_aborts_build() {
    let result = Analyzer::builder()
        .provider(Style { explosive: false })
        .config(config("[config]\nwarningsAsErrors = \"yes\"\n[style.MyRule]\nthreshhold = 5"))
        .defaults(config(&format!("[config]\nwarningsAsErrors = false\n{MY_RULE_CONFIG}")))
        .sequential(true)
        .build();
    let Err(err) = result else {
        panic!("expected a configuration error");
    };
    assert!(matches!(err, AnalyzerError::Config(ConfigError::InvalidShape { .. })));
    assert!(err.to_string().contains("config>warningsAsErrors"), "{err}");
}

#[test]
fn validation_reports_unknown_properties() {
    let analyzer = Analyzer::builder()
        .provider(Style { explosive: false })
        .config(config("[style.MyRule]\nthreshhold = 5"))
        .defaults(config(MY_RULE_CONFIG))
        .sequential(true)
        .build()
        .unwrap();
    let result = analyzer.analyze(&[]);
    assert_eq!(
        result.notifications[0].message,
        "Property 'style>MyRule>threshhold' is misspelled or does not exist."
    );
}

#[test]
fn statistics_listener_adds_project_metrics() {
    let analyzer = Analyzer::builder()
        .provider(Style { explosive: false })
        .config(config(MY_RULE_CONFIG))
        .extension(ProjectStatistics::new())
        .build()
        .unwrap();
    let result = analyzer.analyze(&[
        service_file("a.rs", vec![], "run"),
        service_file("b.rs", vec![], "run"),
    ]);
    assert_eq!(result.metric(FILES_METRIC).map(|m| m.value), Some(2));
    assert_eq!(result.metric(LINES_METRIC).map(|m| m.value), Some(8));
    assert_eq!(result.total_debt().map(|d| d.to_string()), Some("40min".to_string()));
}

/// Records its lifecycle into a shared journal.
struct Journal {
    id: &'static str,
    priority: i32,
    events: Arc<Mutex<Vec<String>>>,
    drop_all: bool,
}

impl Journal {
    fn log(&self, event: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("{}:{event}", self.id));
    }
}

impl Extension for Journal {
    fn id(&self) -> &str {
        self.id
    }
    fn priority(&self) -> i32 {
        self.priority
    }
    fn as_file_process_listener(&self) -> Option<&dyn FileProcessListener> {
        Some(self)
    }
    fn as_reporting_extension(&self) -> Option<&dyn ReportingExtension> {
        Some(self)
    }
}

impl FileProcessListener for Journal {
    fn on_start(&self, _files: &[SyntaxTree]) {
        self.log("start");
    }
    fn on_finish(&self, _files: &[SyntaxTree], _result: &mut LintResult) {
        self.log("finish");
    }
}

impl ReportingExtension for Journal {
    fn on_raw_result(&self, result: &LintResult) {
        self.log(&format!("raw={}", result.finding_count()));
    }
    fn transform_findings(&self, findings: &FindingsMap) -> FindingsMap {
        self.log("transform");
        if self.drop_all {
            FindingsMap::new()
        } else {
            findings.clone()
        }
    }
    fn on_final_result(&self, result: &LintResult) {
        self.log(&format!("final={}", result.finding_count()));
    }
}

#[test]
fn lifecycle_runs_in_phases_and_priority_order() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let journal = |id, priority, drop_all| Journal {
        id,
        priority,
        events: Arc::clone(&events),
        drop_all,
    };
    let analyzer = Analyzer::builder()
        .provider(Style { explosive: false })
        .config(config(MY_RULE_CONFIG))
        .extension(journal("low", 1, true))
        .extension(journal("high", 3, false))
        .build()
        .unwrap();

    let result = analyzer.analyze(&[service_file("a.rs", vec![], "run")]);

    assert_eq!(result.finding_count(), 0);
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "high:start",
            "low:start",
            "high:finish",
            "low:finish",
            "high:raw=1",
            "low:raw=1",
            "high:transform",
            "low:transform",
            "high:final=0",
            "low:final=0",
        ]
    );
}

/// Writes a fixed text file.
struct FileReport {
    id: &'static str,
    priority: i32,
    incompatible: &'static str,
}

impl Extension for FileReport {
    fn id(&self) -> &str {
        self.id
    }
    fn priority(&self) -> i32 {
        self.priority
    }
    fn incompatible_with(&self) -> Vec<String> {
        vec![self.incompatible.to_string()]
    }
    fn as_output_report(&self) -> Option<&dyn OutputReport> {
        Some(self)
    }
}

impl OutputReport for FileReport {
    fn ending(&self) -> &str {
        "txt"
    }
    fn render(&self, result: &LintResult) -> Option<String> {
        Some(format!("{}: {} findings", self.id, result.finding_count()))
    }
}

#[test]
fn conflicting_output_reports_write_only_the_winner() {
    let dir = tempfile::tempdir().unwrap();
    let analyzer = Analyzer::builder()
        .provider(Style { explosive: false })
        .config(config(MY_RULE_CONFIG))
        .extension(FileReport {
            id: "second",
            priority: 2,
            incompatible: "fifth",
        })
        .extension(FileReport {
            id: "fifth",
            priority: 5,
            incompatible: "second",
        })
        .sequential(true)
        .build()
        .unwrap();
    let result = analyzer.analyze(&[service_file("a.rs", vec![], "run")]);

    let writer = ReportWriter::new()
        .destination("second", dir.path().join("second.txt"))
        .destination("fifth", dir.path().join("fifth.txt"));
    let written = writer
        .write(analyzer.extensions(), &result, &mut std::io::sink())
        .unwrap();

    assert_eq!(written, vec![dir.path().join("fifth.txt")]);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("fifth.txt")).unwrap(),
        "fifth: 1 findings"
    );
    assert_eq!(result.notifications.len(), 1);
    assert_eq!(result.notifications[0].level, NotificationLevel::Warning);
    assert!(result.notifications[0].message.contains("'second'"));
}
