//! Rule to limit the length of source lines.
//!
//! # Configuration
//!
//! - `maxLineLength`: Longest allowed line in characters (default: 120, or
//!   100 when the rule set's `code_style` is `rustfmt`)
//! - `excludeImportStatements`: Skip `use` lines (default: true)
//! - `excludeCommentStatements`: Skip lines starting with `//` (default: false)
//!
//! Findings are attached to the innermost node at the line's first
//! non-blank character, so attributes on that node (or its ancestors)
//! suppress them.

use crate::long_parameter_list::to_i64;
use lintel_core::{
    Config, ConfigAware, ConfigError, Debt, Finding, IdError, Issue, Location, Metric, Node,
    NodeKind, Property, Rule, RuleContext, RuleError, Severity, SyntaxTree,
};

/// Rule id for max-line-length.
pub const ID: &str = "MaxLineLength";

/// `code_style` value selecting rustfmt's line width.
pub const RUSTFMT_STYLE: &str = "rustfmt";

const DEFAULT_MAX: usize = 120;
const RUSTFMT_MAX: usize = 100;

/// Reports lines longer than `maxLineLength`.
#[derive(Debug)]
pub struct MaxLineLength {
    issue: Issue,
    config: Config,
    max_line_length: Property<usize>,
    exclude_imports: Property<bool>,
    exclude_comments: Property<bool>,
}

impl MaxLineLength {
    /// Creates the rule reading its properties from `config`.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in id.
    pub fn new(config: Config) -> Result<Self, IdError> {
        Ok(Self {
            issue: Issue::new(
                ID,
                Severity::Warning,
                "Line detected that is longer than the defined maximum line length in the code style",
                Debt::FIVE_MINS,
            )?,
            max_line_length: Property::with_variant(
                &config,
                "maxLineLength",
                DEFAULT_MAX,
                RUSTFMT_STYLE,
                RUSTFMT_MAX,
                Ok,
            ),
            exclude_imports: Property::new(&config, "excludeImportStatements", true),
            exclude_comments: Property::new(&config, "excludeCommentStatements", false),
            config,
        })
    }
}

impl ConfigAware for MaxLineLength {
    fn issue(&self) -> &Issue {
        &self.issue
    }

    fn config(&self) -> &Config {
        &self.config
    }
}

impl Rule for MaxLineLength {
    fn node_kinds(&self) -> &[NodeKind] {
        &[NodeKind::File]
    }

    fn visit(&self, node: Node<'_>, ctx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        let max = *self.max_line_length.get()?;
        let exclude_imports = *self.exclude_imports.get()?;
        let exclude_comments = *self.exclude_comments.get()?;
        let tree = node.tree();

        let mut line_start = 0;
        for (index, raw) in tree.content().split('\n').enumerate() {
            let start = line_start;
            line_start += raw.len() + 1;

            let line = raw.strip_suffix('\r').unwrap_or(raw);
            let length = line.chars().count();
            if length <= max {
                continue;
            }
            let trimmed = line.trim_start();
            if exclude_imports && (trimmed.starts_with("use ") || trimmed.starts_with("pub use ")) {
                continue;
            }
            if exclude_comments && trimmed.starts_with("//") {
                continue;
            }

            let owner = innermost_at(tree, start + (line.len() - trimmed.len()));
            let mut entity = owner.entity();
            entity.location = Location::new(tree.path().to_path_buf(), index + 1, 1)
                .with_span(start, line.len());
            let finding = Finding::new(
                ctx.issue(),
                entity,
                format!("Line has {length} characters, the maximum is {max}."),
            )
            .with_metric(Metric::new("LINE_LENGTH", to_i64(length), to_i64(max)));
            ctx.report_finding(owner, finding);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.max_line_length.get()?;
        self.exclude_imports.get()?;
        self.exclude_comments.get()?;
        Ok(())
    }
}

/// The last node in pre-order whose span contains `offset`, i.e. the deepest.
fn innermost_at(tree: &SyntaxTree, offset: usize) -> Node<'_> {
    tree.preorder()
        .filter(|n| {
            let span = n.span();
            span.start <= offset && offset < span.end
        })
        .last()
        .unwrap_or_else(|| tree.root())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::run;
    use lintel_core::RuleEntry;

    fn lines(toml: &str, code: &str) -> Vec<usize> {
        run("style", toml, code, |config| {
            vec![RuleEntry::single(MaxLineLength::new(config.sub_config(ID)).unwrap())]
        })
        .findings
        .iter()
        .map(|f| f.location().line)
        .collect()
    }

    #[test]
    fn reports_each_long_line() {
        let code = "fn a() {}\nfn bbbbbbbbbbbb() {}\n// cccccccccccccccc\nuse std::collections::HashMap;\n";
        assert_eq!(lines("[style.MaxLineLength]\nmaxLineLength = 12", code), vec![2, 3]);
        assert_eq!(
            lines(
                "[style.MaxLineLength]\nmaxLineLength = 12\nexcludeCommentStatements = true\nexcludeImportStatements = false",
                code
            ),
            vec![2, 4]
        );
    }

    #[test]
    fn rustfmt_style_lowers_the_default() {
        let code = format!("const S: &str = \"{}\";\n", "x".repeat(90));
        assert!(lines("", &code).is_empty());
        assert_eq!(lines("[style]\ncode_style = \"rustfmt\"", &code), vec![1]);
    }

    #[test]
    fn attribute_on_enclosing_item_suppresses() {
        let code = format!(
            "#[allow(MaxLineLength)]\nfn f() {{\n    let s = \"{}\";\n}}\nfn g() {{\n    let s = \"{}\";\n}}\n",
            "y".repeat(40),
            "y".repeat(40)
        );
        assert_eq!(lines("[style.MaxLineLength]\nmaxLineLength = 30", &code), vec![6]);
    }
}
