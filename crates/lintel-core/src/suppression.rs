//! Annotation-based suppression of findings.
//!
//! A finding is suppressed when its node, or any node enclosing it, carries a
//! suppression annotation naming the rule:
//!
//! ```text
//! #[suppress("LongMethod")]            rule id
//! #[suppress("all")]                   everything
//! #[suppress("style")]                 every rule of a rule set
//! #[suppress("style:MaxLineLength")]   qualified id (also `style.MaxLineLength`)
//! #[allow(lintel::LongMethod)]         tool prefix is ignored
//! ```
//!
//! Matching is case-insensitive and also accepts the rule's configured aliases.

use crate::tree::Node;
use std::fmt;

/// Annotation names (last path segment, compared case-insensitively) that
/// suppress findings.
pub const SUPPRESSION_ANNOTATIONS: &[&str] = &["suppress", "suppresswarnings", "allow"];

/// Tool prefixes stripped from suppression arguments, longest first.
pub const TOOL_PREFIXES: &[&str] = &["lintel::", "lintel:", "lintel."];

/// The annotation that suppressed a finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressReason {
    /// Annotation name as written.
    pub annotation: String,
    /// Argument that matched.
    pub argument: String,
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "suppressed by {}({})", self.annotation, self.argument)
    }
}

/// What a suppression argument may name to silence one rule.
#[derive(Debug, Clone)]
pub struct SuppressionTarget {
    accepted: Vec<String>,
}

impl SuppressionTarget {
    /// Accepts `all`, the rule id and each alias.
    #[must_use]
    pub fn new(rule_id: &str, aliases: &[String]) -> Self {
        let mut accepted = vec!["all".to_string(), rule_id.to_lowercase()];
        accepted.extend(aliases.iter().map(|alias| alias.to_lowercase()));
        Self { accepted }
    }

    /// Additionally accepts the rule set id and the qualified `set.id` / `set:id` forms.
    #[must_use]
    pub fn with_rule_set(mut self, rule_set_id: &str, rule_id: &str) -> Self {
        let set = rule_set_id.to_lowercase();
        let id = rule_id.to_lowercase();
        self.accepted.push(format!("{set}.{id}"));
        self.accepted.push(format!("{set}:{id}"));
        self.accepted.push(set);
        self
    }

    /// Returns true if `argument` names this target.
    #[must_use]
    pub fn accepts(&self, argument: &str) -> bool {
        let normalized = normalize_argument(argument);
        self.accepted.iter().any(|accepted| *accepted == normalized)
    }
}

fn normalize_argument(argument: &str) -> String {
    let unquoted = argument
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_lowercase();
    TOOL_PREFIXES
        .iter()
        .find_map(|prefix| unquoted.strip_prefix(prefix))
        .map_or_else(|| unquoted.clone(), str::to_string)
}

fn is_suppression_annotation(name: &str) -> bool {
    SUPPRESSION_ANNOTATIONS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(name))
}

/// Checks `node` and its ancestors for a suppression naming `target`.
///
/// Pure: the tree is only read.
#[must_use]
pub fn is_suppressed(node: Node<'_>, target: &SuppressionTarget) -> Option<SuppressReason> {
    node.self_and_ancestors().find_map(|current| {
        current
            .annotations()
            .iter()
            .filter(|annotation| is_suppression_annotation(annotation.simple_name()))
            .find_map(|annotation| {
                annotation
                    .arguments
                    .iter()
                    .find(|argument| target.accepts(argument))
                    .map(|argument| SuppressReason {
                        annotation: annotation.name.clone(),
                        argument: argument.clone(),
                    })
            })
    })
}

/// Checks `node` and its ancestors for any annotation listed in `names`.
///
/// Backs the `ignoreAnnotated` rule setting. Names compare by their last path
/// segment, case-sensitively.
#[must_use]
pub fn is_annotated_with(node: Node<'_>, names: &[String]) -> Option<SuppressReason> {
    if names.is_empty() {
        return None;
    }
    node.self_and_ancestors().find_map(|current| {
        current
            .annotations()
            .iter()
            .find(|annotation| {
                names.iter().any(|name| {
                    name == &annotation.name || name.as_str() == annotation.simple_name()
                })
            })
            .map(|annotation| SuppressReason {
                annotation: annotation.name.clone(),
                argument: String::new(),
            })
    })
}
