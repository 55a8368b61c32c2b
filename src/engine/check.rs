//! Checks: identified, configured validation rules.
//!
//! # Isolation
//!
//! `Check::validate` never lets a broken rule abort the run:
//! - Rule returns `Err`: converted to a DEV_UNHANDLED flag
//! - Rule panics: caught via std::panic::catch_unwind, converted the same way.
//!   The panic hook is left alone; install a quiet hook to silence stderr.
//! - Error kind listed in the isolation policy: handed back to the caller
//!
//! Construction errors are never absorbed. A bad id, a duplicate id, a
//! description that does not render against its config, or a DEV_UNHANDLED
//! message needing more than `function` and `e` fails immediately.

use crate::engine::flag::{Flag, FlagCode, FlagDescriptions, DEV_UNHANDLED_TEMPLATE};
use crate::engine::registry::CheckRegistry;
use crate::engine::rule::{IsolationPolicy, Rule, RuleError, RuleErrorKind};
use crate::engine::template::{args, Template, TemplateArgs};
use crate::VvError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::error;

/// Entity kind a check targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    Dataset,
    Sample,
    Component,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Dataset => "DATASET",
            Scope::Sample => "SAMPLE",
            Scope::Component => "COMPONENT",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn check_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(COMPONENT|SAMPLE|DATASET)_(\D*)_([0-9]{4})$").expect("static check id pattern")
    })
}

/// A parsed `SCOPE_WORD_dddd` check identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CheckId {
    raw: String,
    scope: Scope,
    ordinal: u16,
}

impl CheckId {
    pub fn parse(id: &str) -> Result<Self, VvError> {
        let invalid = || VvError::InvalidCheckId { id: id.to_string() };
        let caps = check_id_pattern().captures(id).ok_or_else(invalid)?;

        let scope = match &caps[1] {
            "DATASET" => Scope::Dataset,
            "SAMPLE" => Scope::Sample,
            "COMPONENT" => Scope::Component,
            _ => return Err(invalid()),
        };
        let ordinal = caps[3].parse::<u16>().map_err(|_| invalid())?;

        Ok(CheckId {
            raw: id.to_string(),
            scope,
            ordinal,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// The middle word, e.g. `METADATA` in `DATASET_METADATA_0001`.
    pub fn word(&self) -> &str {
        let start = self.scope.as_str().len() + 1;
        let end = self.raw.len() - 5;
        self.raw.get(start..end).unwrap_or_default()
    }

    pub fn ordinal(&self) -> u16 {
        self.ordinal
    }
}

impl FromStr for CheckId {
    type Err = VvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CheckId::parse(s)
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl Serialize for CheckId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for CheckId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        CheckId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Identity and templates of a check, shared with every flag it produces.
#[derive(Debug)]
pub struct CheckInfo {
    id: CheckId,
    description: String,
    proto_description: Template,
    flag_desc: Arc<FlagDescriptions>,
    config: TemplateArgs,
}

impl CheckInfo {
    pub fn id(&self) -> &CheckId {
        &self.id
    }

    pub fn scope(&self) -> Scope {
        self.id.scope()
    }

    /// Description rendered with the check's config.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Description template before rendering.
    pub fn proto_description(&self) -> &Template {
        &self.proto_description
    }

    pub fn flag_desc(&self) -> &FlagDescriptions {
        &self.flag_desc
    }

    pub fn config(&self) -> &TemplateArgs {
        &self.config
    }
}

/// A validation check.
///
/// `A` is the argument the rule validates, typically an entity or a tuple of
/// an entity and the collaborators the rule needs. Cloning a check yields
/// another handle to the same check and history.
pub struct Check<A: ?Sized> {
    info: Arc<CheckInfo>,
    rule: Rule<A>,
    policy: Arc<IsolationPolicy>,
    flags: Arc<Mutex<Vec<Flag>>>,
}

impl<A: ?Sized> Clone for Check<A> {
    fn clone(&self) -> Self {
        Check {
            info: Arc::clone(&self.info),
            rule: self.rule.clone(),
            policy: Arc::clone(&self.policy),
            flags: Arc::clone(&self.flags),
        }
    }
}

impl<A: ?Sized> fmt::Debug for Check<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check")
            .field("id", &self.info.id.as_str())
            .field("description", &self.info.description)
            .field("rule", &self.rule.name())
            .field("flags", &self.flag_count())
            .finish()
    }
}

impl<A: ?Sized> Check<A> {
    /// Create and register a check.
    ///
    /// All placeholders in `description` must be present in `config`; config
    /// keys the description does not use are allowed.
    pub fn new(
        registry: &CheckRegistry,
        id: &str,
        description: &str,
        flag_desc: FlagDescriptions,
        rule: Rule<A>,
        config: TemplateArgs,
    ) -> Result<Self, VvError> {
        Self::build(
            registry,
            id,
            Template::parse(description)?,
            Arc::new(flag_desc),
            rule,
            config,
        )
    }

    fn build(
        registry: &CheckRegistry,
        id: &str,
        proto_description: Template,
        mut flag_desc: Arc<FlagDescriptions>,
        rule: Rule<A>,
        config: TemplateArgs,
    ) -> Result<Self, VvError> {
        let description = proto_description.render(&config)?;
        let id = CheckId::parse(id)?;
        if flag_desc.contains(FlagCode::DevUnhandled) {
            flag_desc.check_dev_unhandled()?;
        } else {
            Arc::make_mut(&mut flag_desc).ensure_dev_unhandled()?;
        }

        let info = Arc::new(CheckInfo {
            id,
            description,
            proto_description,
            flag_desc,
            config,
        });
        registry.register(&info)?;

        Ok(Check {
            info,
            rule,
            policy: registry.shared_policy(),
            flags: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Same rule, description template and flag messages under a new id and
    /// config. The copy starts with an empty history.
    pub fn copy_with_new_config(
        &self,
        registry: &CheckRegistry,
        id: &str,
        config: TemplateArgs,
    ) -> Result<Self, VvError> {
        Self::build(
            registry,
            id,
            self.info.proto_description.clone(),
            Arc::clone(&self.info.flag_desc),
            self.rule.clone(),
            config,
        )
    }

    /// Run the rule against `args`.
    ///
    /// Returns `Err` only for errors the isolation policy lets through.
    /// A caught panic still goes through the process panic hook first, so
    /// the default hook prints its usual message to stderr before the
    /// DEV_UNHANDLED flag is raised.
    pub fn validate(&self, args: &A) -> Result<Flag, RuleError> {
        let outcome = if self.policy.propagates_kind(RuleErrorKind::Panicked) {
            self.rule.call(self, args)
        } else {
            panic::catch_unwind(AssertUnwindSafe(|| self.rule.call(self, args)))
                .unwrap_or_else(|payload| Err(RuleError::from_panic(payload)))
        };

        match outcome {
            Ok(flag) => Ok(flag),
            Err(err) if self.policy.propagates(&err) => Err(err),
            Err(err) => {
                error!(
                    check_id = %self.info.id,
                    function = self.rule.name(),
                    error = %err,
                    "Developer error raised during a validation function"
                );
                self.unhandled(&err)
            }
        }
    }

    fn unhandled(&self, err: &RuleError) -> Result<Flag, RuleError> {
        let message_args = args([
            ("function", self.rule.name().to_string()),
            ("e", err.to_string()),
        ]);
        match Flag::new(FlagCode::DevUnhandled, self, message_args.clone()) {
            Ok(flag) => Ok(flag),
            Err(render_err) => {
                error!(
                    check_id = %self.info.id,
                    error = %render_err,
                    "DEV_UNHANDLED message did not render, using the built-in template"
                );
                let template = Template::parse(DEV_UNHANDLED_TEMPLATE)?;
                Ok(Flag::with_template(
                    FlagCode::DevUnhandled,
                    self,
                    &template,
                    message_args,
                )?)
            }
        }
    }

    pub fn id(&self) -> &CheckId {
        &self.info.id
    }

    pub fn scope(&self) -> Scope {
        self.info.id.scope()
    }

    pub fn description(&self) -> &str {
        &self.info.description
    }

    pub fn config(&self) -> &TemplateArgs {
        &self.info.config
    }

    pub fn flag_desc(&self) -> &FlagDescriptions {
        &self.info.flag_desc
    }

    pub fn rule_name(&self) -> &str {
        self.rule.name()
    }

    pub fn info(&self) -> &CheckInfo {
        &self.info
    }

    /// Every flag this check has produced, oldest first.
    pub fn flags(&self) -> Vec<Flag> {
        self.flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn flag_count(&self) -> usize {
        self.flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn shared_info(&self) -> Arc<CheckInfo> {
        Arc::clone(&self.info)
    }

    pub(crate) fn record(&self, flag: Flag) {
        self.flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(flag);
    }
}
