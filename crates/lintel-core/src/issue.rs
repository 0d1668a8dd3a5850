//! Rule metadata: severity, remediation debt, issues and metrics.

use crate::config::{Config, ConfigError, SEVERITY_KEY};
use crate::ids::{IdError, RuleId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

/// Severity level for findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message, does not fail lint.
    Info,
    /// Warning that should be addressed.
    Warning,
    /// Error that must be fixed.
    Error,
}

impl Severity {
    /// Accepted spellings, as listed in error messages.
    pub const ALLOWED: &'static str = "error, warning, info";

    /// Resolves the effective severity of a rule.
    ///
    /// The rule scope's `severity` wins, then the enclosing rule set's, then
    /// `default`. Parsing is case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownSeverity`] naming the key if a configured
    /// string is not a severity.
    pub fn resolve(rule_config: &Config, default: Severity) -> Result<Severity, ConfigError> {
        if let Some(severity) = Self::configured(rule_config)? {
            return Ok(severity);
        }
        if let Some(rule_set) = rule_config.parent() {
            if let Some(severity) = Self::configured(rule_set)? {
                return Ok(severity);
            }
        }
        Ok(default)
    }

    fn configured(config: &Config) -> Result<Option<Severity>, ConfigError> {
        let Some(value) = config.value_or_none::<String>(SEVERITY_KEY)? else {
            return Ok(None);
        };
        value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::UnknownSeverity {
                key: config.key_path(SEVERITY_KEY),
                value,
                allowed: Self::ALLOWED,
            })
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Error for strings that do not name a severity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity '{0}', expected one of: error, warning, info")]
pub struct ParseSeverityError(pub String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            _ => Err(ParseSeverityError(s.to_string())),
        }
    }
}

/// Estimated remediation effort of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Debt {
    days: u32,
    hours: u32,
    mins: u32,
}

/// Error for a debt with every component zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("debt must not be zero")]
pub struct ZeroDebtError;

const MINUTES_PER_HOUR: u64 = 60;
const HOURS_PER_DAY: u64 = 24;
/// Largest representable effort: `u32::MAX` days, 23 hours and 59 minutes.
const MAX_TOTAL_MINUTES: u64 =
    (u32::MAX as u64 * HOURS_PER_DAY + (HOURS_PER_DAY - 1)) * MINUTES_PER_HOUR + (MINUTES_PER_HOUR - 1);

impl Debt {
    /// Five minutes of work.
    pub const FIVE_MINS: Debt = Debt { days: 0, hours: 0, mins: 5 };
    /// Ten minutes of work.
    pub const TEN_MINS: Debt = Debt { days: 0, hours: 0, mins: 10 };
    /// Twenty minutes of work.
    pub const TWENTY_MINS: Debt = Debt { days: 0, hours: 0, mins: 20 };

    /// Creates a debt from its components.
    ///
    /// # Errors
    ///
    /// Returns [`ZeroDebtError`] if all components are zero.
    pub fn new(days: u32, hours: u32, mins: u32) -> Result<Self, ZeroDebtError> {
        if days == 0 && hours == 0 && mins == 0 {
            return Err(ZeroDebtError);
        }
        Ok(Self { days, hours, mins })
    }

    /// Days component.
    #[must_use]
    pub fn days(&self) -> u32 {
        self.days
    }

    /// Hours component.
    #[must_use]
    pub fn hours(&self) -> u32 {
        self.hours
    }

    /// Minutes component.
    #[must_use]
    pub fn mins(&self) -> u32 {
        self.mins
    }

    /// Total effort in minutes.
    #[must_use]
    pub fn total_minutes(&self) -> u64 {
        (u64::from(self.days) * HOURS_PER_DAY + u64::from(self.hours)) * MINUTES_PER_HOUR
            + u64::from(self.mins)
    }

    /// Carries minutes into hours and hours into days (90 min becomes 1h 30min).
    #[must_use]
    pub fn normalized(self) -> Self {
        Self::from_total_minutes(self.total_minutes())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_total_minutes(total: u64) -> Self {
        let total = total.min(MAX_TOTAL_MINUTES);
        let hours_total = total / MINUTES_PER_HOUR;
        Self {
            days: (hours_total / HOURS_PER_DAY) as u32,
            hours: (hours_total % HOURS_PER_DAY) as u32,
            mins: (total % MINUTES_PER_HOUR) as u32,
        }
    }
}

impl Add for Debt {
    type Output = Debt;

    fn add(self, rhs: Debt) -> Debt {
        Debt::from_total_minutes(self.total_minutes().saturating_add(rhs.total_minutes()))
    }
}

impl fmt::Display for Debt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let debt = self.normalized();
        let mut parts = Vec::with_capacity(3);
        if debt.days > 0 {
            parts.push(format!("{}d", debt.days));
        }
        if debt.hours > 0 {
            parts.push(format!("{}h", debt.hours));
        }
        if debt.mins > 0 {
            parts.push(format!("{}min", debt.mins));
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// Rule metadata: identity, default severity, description and debt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Rule identifier.
    pub id: RuleId,
    /// Severity used when nothing is configured.
    pub severity: Severity,
    /// One-line explanation of what the rule detects.
    pub description: String,
    /// Effort to fix one finding.
    pub debt: Debt,
}

impl Issue {
    /// Creates issue metadata, validating the rule id.
    ///
    /// # Errors
    ///
    /// Returns [`IdError`] if `id` is not a valid rule id.
    pub fn new(
        id: &str,
        severity: Severity,
        description: impl Into<String>,
        debt: Debt,
    ) -> Result<Self, IdError> {
        Ok(Self {
            id: RuleId::new(id)?,
            severity,
            description: description.into(),
            debt,
        })
    }
}

/// Error for reading a metric in the wrong representation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricError {
    /// The metric stores integers.
    #[error("metric '{0}' is not a floating point metric")]
    NotDouble(String),
}

/// A measured value attached to a finding, with the threshold it crossed.
///
/// Floating point values are stored as integers scaled by a conversion factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metric {
    /// What was measured (`SIZE`, `CYCLOMATIC_COMPLEXITY`, ...).
    pub kind: String,
    value: i64,
    threshold: i64,
    is_double: bool,
    conversion_factor: i64,
}

impl Metric {
    /// Scale used by [`Metric::double`].
    pub const DEFAULT_FLOAT_CONVERSION_FACTOR: i64 = 100;

    /// Creates an integer metric.
    #[must_use]
    pub fn new(kind: impl Into<String>, value: i64, threshold: i64) -> Self {
        Self {
            kind: kind.into(),
            value,
            threshold,
            is_double: false,
            conversion_factor: 1,
        }
    }

    /// Creates a floating point metric, scaled by [`Self::DEFAULT_FLOAT_CONVERSION_FACTOR`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn double(kind: impl Into<String>, value: f64, threshold: f64) -> Self {
        let factor = Self::DEFAULT_FLOAT_CONVERSION_FACTOR as f64;
        Self {
            kind: kind.into(),
            value: (value * factor).round() as i64,
            threshold: (threshold * factor).round() as i64,
            is_double: true,
            conversion_factor: Self::DEFAULT_FLOAT_CONVERSION_FACTOR,
        }
    }

    /// Stored value (scaled for floating point metrics).
    #[must_use]
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Stored threshold (scaled for floating point metrics).
    #[must_use]
    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Whether this metric was created with [`Metric::double`].
    #[must_use]
    pub fn is_double(&self) -> bool {
        self.is_double
    }

    /// Returns the value as a float.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::NotDouble`] for integer metrics.
    pub fn double_value(&self) -> Result<f64, MetricError> {
        self.unscale(self.value)
    }

    /// Returns the threshold as a float.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::NotDouble`] for integer metrics.
    pub fn double_threshold(&self) -> Result<f64, MetricError> {
        self.unscale(self.threshold)
    }

    #[allow(clippy::cast_precision_loss)]
    fn unscale(&self, raw: i64) -> Result<f64, MetricError> {
        if self.is_double {
            Ok(raw as f64 / self.conversion_factor as f64)
        } else {
            Err(MetricError::NotDouble(self.kind.clone()))
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.double_value(), self.double_threshold()) {
            (Ok(value), Ok(threshold)) => write!(f, "{}: {value}/{threshold}", self.kind),
            _ => write!(f, "{}: {}/{}", self.kind, self.value, self.threshold),
        }
    }
}
