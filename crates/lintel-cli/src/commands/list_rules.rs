//! List rules command implementation.

use anyhow::{Context, Result};
use lintel_core::{Config, ConfigAware};
use std::fmt::Write;

/// Runs the list-rules command against `config` layered over the defaults.
pub fn run(config: Config) -> Result<()> {
    let defaults = lintel_rules::default_config().context("Built-in defaults are invalid")?;
    print!("{}", render(&Config::composite(config, defaults))?);
    Ok(())
}

fn render(config: &Config) -> Result<String> {
    let mut out = String::from("Available rules:\n\n");
    let _ = writeln!(
        out,
        "{:<12} {:<22} {:<7} {:<8} {:<7} Description",
        "Rule set", "Rule", "Active", "Severity", "Debt"
    );
    let _ = writeln!(out, "{}", "-".repeat(100));

    for provider in lintel_rules::providers() {
        let id = provider.rule_set_id();
        let set = provider
            .instance(&config.sub_config(id))
            .with_context(|| format!("Failed to load rule set '{id}'"))?;
        for rule in set.rules() {
            let issue = rule.issue();
            let _ = writeln!(
                out,
                "{:<12} {:<22} {:<7} {:<8} {:<7} {}",
                id,
                issue.id.as_str(),
                if rule.active()? { "yes" } else { "no" },
                rule.severity()?.to_string(),
                issue.debt.to_string(),
                issue.description
            );
        }
    }

    out.push_str("\nSuppress a finding with #[allow(RuleId)] or #[suppress(\"ruleSet.RuleId\")].\n");
    out.push_str("Skip rules for one run with: lintel check --skip LongMethod,MaxLineLength\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_rule_with_its_activation() {
        let defaults = lintel_rules::default_config().unwrap();
        let text = render(&defaults).unwrap();

        for rule in [
            "LongParameterList",
            "LongMethod",
            "MaxLineLength",
            "FunctionNaming",
            "TypeNaming",
        ] {
            let line = text.lines().find(|l| l.contains(rule)).unwrap();
            assert!(line.contains(" yes "), "{line}");
        }
        let forbidden = text
            .lines()
            .find(|l| l.contains("ForbiddenMethodCall"))
            .unwrap();
        assert!(forbidden.contains(" no "), "{forbidden}");
    }
}
