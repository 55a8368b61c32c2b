//! dp-vv library
//!
//! Verification and validation engine for data-processing pipeline outputs.
//!
//! This library provides the machinery for defining and running checks:
//! - Identified, configurable checks bound to rule functions
//! - Error- and panic-isolated rule execution
//! - Severity-coded flags with templated messages
//! - A protocol trait that groups checks by dataset, sample and component scope
//! - Flag summaries, JSON export and baseline comparison
//! - Path locators for bulk RNA-seq pipeline outputs
//!
//! # Example
//!
//! ```no_run
//! use dp_vv::engine::check::Check;
//! use dp_vv::engine::flag::{Flag, FlagCode, FlagDescriptions};
//! use dp_vv::engine::registry::CheckRegistry;
//! use dp_vv::engine::rule::Rule;
//! use dp_vv::engine::template::{args, TemplateArgs};
//!
//! let registry = CheckRegistry::new();
//! let check = Check::new(
//!     &registry,
//!     "DATASET_METADATA_0001",
//!     "Check {x}",
//!     FlagDescriptions::new([(FlagCode::Green, "ok"), (FlagCode::Red1, "missing {field}")])
//!         .expect("valid templates"),
//!     Rule::new(|check: &Check<String>, _dataset: &String| {
//!         Ok(Flag::new(FlagCode::Green, check, TemplateArgs::new())?)
//!     }),
//!     args([("x", "present")]),
//! )
//! .expect("valid check");
//!
//! let flag = check.validate(&"GLDS-194".to_string()).expect("isolated");
//! println!("{}", flag);
//! ```

pub mod config;
pub mod engine;
pub mod entity;
pub mod locate;

use engine::flag::FlagCode;
use engine::protocol::{ProtocolFlags, Validation, VvProtocol};
use engine::rule::RuleError;

// Re-exports for public API
pub use config::RunConfig;
pub use engine::check::{Check, CheckId, CheckInfo, Scope};
pub use engine::flag::{Flag, FlagDescriptions, FlagFamily};
pub use engine::registry::CheckRegistry;
pub use engine::result::{FlagReport, FlagSummary};
pub use entity::{DatasetEntity, Entity};

/// Error types for dp-vv operations.
///
/// Every variant except `RuleAborted` is an authoring or configuration
/// mistake and is raised at construction time.
#[derive(Debug, thiserror::Error)]
pub enum VvError {
    /// Check id does not follow `SCOPE_WORD_dddd`
    #[error(
        "invalid check id '{id}': expected SCOPE_WORD_dddd where d is any digit and SCOPE is one of COMPONENT, SAMPLE or DATASET"
    )]
    InvalidCheckId { id: String },

    /// Check id already registered
    #[error("check id '{id}' is already registered, try another id")]
    DuplicateCheckId { id: String },

    /// Template placeholder with no supplied value
    #[error("template '{template}' references '{key}' which was not supplied")]
    MissingTemplateKey { template: String, key: String },

    /// Template braces do not parse
    #[error("malformed template '{template}': {reason}")]
    TemplateSyntax { template: String, reason: String },

    /// Flag raised with a code the check has no message for
    #[error("check {check_id} has no message template for flag code {code}")]
    UndescribedFlagCode { check_id: String, code: FlagCode },

    /// Flag code name not recognised
    #[error("unknown flag code '{0}'")]
    UnknownFlagCode(String),

    /// Dataset handed to a protocol built for another dataset type
    #[error("protocol expects a dataset of type '{expected}', got '{found}'")]
    DatasetTypeMismatch { expected: String, found: String },

    /// A rule error escaped isolation and aborted the run
    #[error("check {check_id} aborted the run: {source}")]
    RuleAborted {
        check_id: String,
        #[source]
        source: Box<RuleError>,
    },

    /// Configuration or report text could not be parsed
    #[error("parse error in {context}: {message}")]
    Parse { context: String, message: String },

    /// I/O error
    #[error("I/O error in {context}: {message}")]
    Io { context: String, message: String },
}

impl VvError {
    /// Wrap a rule error that was allowed through isolation.
    pub fn aborted(check_id: &CheckId, source: RuleError) -> Self {
        VvError::RuleAborted {
            check_id: check_id.to_string(),
            source: Box::new(source),
        }
    }
}

/// Run a protocol against a dataset.
///
/// This is the main entry point: it binds `dataset` to `protocol`, runs every
/// scope once and hands back the aggregated flags.
///
/// # Example
///
/// ```ignore
/// let flags = dp_vv::run_protocol(BulkRnaSeqProtocol::new(&registry)?, dataset)?;
/// if flags.summary().has_halt() {
///     eprintln!("dataset must not be released");
/// }
/// ```
pub fn run_protocol<P: VvProtocol>(
    protocol: P,
    dataset: P::Dataset,
) -> Result<ProtocolFlags<P::Dataset, P::Sample, P::Component>, VvError> {
    let mut validation = Validation::new(protocol, dataset)?;
    validation.validate_all()?;
    Ok(validation.into_flags())
}
