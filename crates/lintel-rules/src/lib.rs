//! # lintel-rules
//!
//! Built-in rule sets for lintel and the defaults document they are
//! validated against.
//!
//! ## Available Rules
//!
//! | Rule set | Rule | Description |
//! |----------|------|-------------|
//! | `complexity` | `LongParameterList` | Functions with too many parameters |
//! | `complexity` | `LongMethod` | Functions spanning too many lines |
//! | `style` | `MaxLineLength` | Lines longer than the configured width |
//! | `style` | `ForbiddenMethodCall` | Calls to configured functions and macros (inactive by default) |
//! | `naming` | `FunctionNaming` | Function names not matching a pattern |
//! | `naming` | `TypeNaming` | Type names not matching a pattern |
//!
//! ## Usage
//!
//! ```ignore
//! use lintel_core::Analyzer;
//!
//! let analyzer = Analyzer::builder()
//!     .providers(lintel_rules::providers())
//!     .defaults(lintel_rules::default_config()?)
//!     .config(user_config)
//!     .build()?;
//! let result = analyzer.analyze(&trees);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod forbidden_method_call;
pub mod long_method;
pub mod long_parameter_list;
pub mod max_line_length;
pub mod naming;
mod providers;

pub use forbidden_method_call::ForbiddenMethodCall;
pub use long_method::LongMethod;
pub use long_parameter_list::LongParameterList;
pub use max_line_length::MaxLineLength;
pub use naming::{naming_rules, FunctionNaming, NamingError, TypeNaming};
pub use providers::{
    default_config, providers, ComplexityProvider, NamingProvider, StyleProvider, COMPLEXITY,
    DEFAULT_CONFIG, DEPRECATED_PROPERTIES, NAMING, STYLE,
};
