//! Flags: the severity-coded outcome of running a check.

use crate::engine::check::{Check, CheckId, CheckInfo};
use crate::engine::template::{Template, TemplateArgs};
use crate::VvError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Maps a flag code to a severity level.
///
/// Several codes share a rank; they are distinct categories of equal severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagCode {
    /// Developer mistake detected and reported by the rule itself
    DevHandled,
    /// Raised by the engine when a rule fails; never raised by rules directly
    DevUnhandled,
    Halt1,
    Halt2,
    Halt3,
    Halt4,
    Halt5,
    Red1,
    Red2,
    Red3,
    Red4,
    Red5,
    Yellow1,
    Yellow2,
    Yellow3,
    Yellow4,
    Yellow5,
    Green,
    Info,
}

/// Severity family of a flag code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagFamily {
    Info,
    Green,
    Yellow,
    Red,
    Halt,
    Dev,
}

impl FlagCode {
    /// Every code, in declaration order.
    pub const ALL: [FlagCode; 19] = [
        FlagCode::DevHandled,
        FlagCode::DevUnhandled,
        FlagCode::Halt1,
        FlagCode::Halt2,
        FlagCode::Halt3,
        FlagCode::Halt4,
        FlagCode::Halt5,
        FlagCode::Red1,
        FlagCode::Red2,
        FlagCode::Red3,
        FlagCode::Red4,
        FlagCode::Red5,
        FlagCode::Yellow1,
        FlagCode::Yellow2,
        FlagCode::Yellow3,
        FlagCode::Yellow4,
        FlagCode::Yellow5,
        FlagCode::Green,
        FlagCode::Info,
    ];

    /// Numeric severity rank.
    pub fn rank(self) -> u8 {
        match self.family() {
            FlagFamily::Dev => match self {
                FlagCode::DevUnhandled => 91,
                _ => 90,
            },
            FlagFamily::Halt => 80,
            FlagFamily::Red => 50,
            FlagFamily::Yellow => 30,
            FlagFamily::Green => 20,
            FlagFamily::Info => 10,
        }
    }

    pub fn family(self) -> FlagFamily {
        match self {
            FlagCode::DevHandled | FlagCode::DevUnhandled => FlagFamily::Dev,
            FlagCode::Halt1
            | FlagCode::Halt2
            | FlagCode::Halt3
            | FlagCode::Halt4
            | FlagCode::Halt5 => FlagFamily::Halt,
            FlagCode::Red1 | FlagCode::Red2 | FlagCode::Red3 | FlagCode::Red4 | FlagCode::Red5 => {
                FlagFamily::Red
            }
            FlagCode::Yellow1
            | FlagCode::Yellow2
            | FlagCode::Yellow3
            | FlagCode::Yellow4
            | FlagCode::Yellow5 => FlagFamily::Yellow,
            FlagCode::Green => FlagFamily::Green,
            FlagCode::Info => FlagFamily::Info,
        }
    }

    /// Tooling error rather than a data-quality outcome.
    pub fn is_dev_error(self) -> bool {
        self.family() == FlagFamily::Dev
    }

    pub fn name(self) -> &'static str {
        match self {
            FlagCode::DevHandled => "DEV_HANDLED",
            FlagCode::DevUnhandled => "DEV_UNHANDLED",
            FlagCode::Halt1 => "HALT1",
            FlagCode::Halt2 => "HALT2",
            FlagCode::Halt3 => "HALT3",
            FlagCode::Halt4 => "HALT4",
            FlagCode::Halt5 => "HALT5",
            FlagCode::Red1 => "RED1",
            FlagCode::Red2 => "RED2",
            FlagCode::Red3 => "RED3",
            FlagCode::Red4 => "RED4",
            FlagCode::Red5 => "RED5",
            FlagCode::Yellow1 => "YELLOW1",
            FlagCode::Yellow2 => "YELLOW2",
            FlagCode::Yellow3 => "YELLOW3",
            FlagCode::Yellow4 => "YELLOW4",
            FlagCode::Yellow5 => "YELLOW5",
            FlagCode::Green => "GREEN",
            FlagCode::Info => "INFO",
        }
    }

    fn position(self) -> usize {
        FlagCode::ALL
            .iter()
            .position(|code| *code == self)
            .unwrap_or(FlagCode::ALL.len())
    }
}

// Rank first; equal ranks fall back to declaration order so Ord agrees with Eq.
impl Ord for FlagCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| other.position().cmp(&self.position()))
    }
}

impl PartialOrd for FlagCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FlagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FlagCode {
    type Err = VvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FlagCode::ALL
            .iter()
            .copied()
            .find(|code| code.name() == s)
            .ok_or_else(|| VvError::UnknownFlagCode(s.to_string()))
    }
}

/// Message template rendered for a flag raised under an engine-caught error.
pub const DEV_UNHANDLED_TEMPLATE: &str = "An unhandled error occurred in {function}: {e}";

/// Message arguments supplied to every DEV_UNHANDLED flag.
pub const DEV_UNHANDLED_ARGS: [&str; 2] = ["function", "e"];

/// Flag code to message template mapping for one check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagDescriptions {
    templates: BTreeMap<FlagCode, Template>,
}

impl FlagDescriptions {
    /// Parse every template, failing on the first malformed one.
    pub fn new<I, S>(entries: I) -> Result<Self, VvError>
    where
        I: IntoIterator<Item = (FlagCode, S)>,
        S: AsRef<str>,
    {
        let mut templates = BTreeMap::new();
        for (code, source) in entries {
            templates.insert(code, Template::parse(source.as_ref())?);
        }
        Ok(FlagDescriptions { templates })
    }

    pub fn get(&self, code: FlagCode) -> Option<&Template> {
        self.templates.get(&code)
    }

    pub fn contains(&self, code: FlagCode) -> bool {
        self.templates.contains_key(&code)
    }

    /// Described codes, most severe first.
    pub fn codes(&self) -> Vec<FlagCode> {
        self.templates.keys().rev().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub(crate) fn ensure_dev_unhandled(&mut self) -> Result<(), VvError> {
        if !self.contains(FlagCode::DevUnhandled) {
            self.templates
                .insert(FlagCode::DevUnhandled, Template::parse(DEV_UNHANDLED_TEMPLATE)?);
        }
        Ok(())
    }

    /// Fail if a supplied DEV_UNHANDLED template needs more than `function`
    /// and `e`, the only arguments the engine provides.
    pub(crate) fn check_dev_unhandled(&self) -> Result<(), VvError> {
        let Some(template) = self.get(FlagCode::DevUnhandled) else {
            return Ok(());
        };
        match template
            .placeholders()
            .find(|key| !DEV_UNHANDLED_ARGS.contains(key))
        {
            Some(key) => Err(VvError::MissingTemplateKey {
                template: template.source().to_string(),
                key: key.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug)]
struct FlagRecord {
    code: FlagCode,
    check: Arc<CheckInfo>,
    message_args: TemplateArgs,
    message: String,
}

/// A validation report message.
///
/// Cloning a flag shares the same record; the check history and the protocol
/// mapping hold the same flag.
#[derive(Debug, Clone)]
pub struct Flag {
    record: Arc<FlagRecord>,
}

impl Flag {
    /// Build a flag for `check` and append it to the check's history.
    pub fn new<A: ?Sized>(
        code: FlagCode,
        check: &Check<A>,
        message_args: TemplateArgs,
    ) -> Result<Flag, VvError> {
        let info = check.shared_info();
        let template = info
            .flag_desc()
            .get(code)
            .ok_or_else(|| VvError::UndescribedFlagCode {
                check_id: info.id().to_string(),
                code,
            })?;
        let message = template.render(&message_args)?;
        Ok(Self::record(code, check, info, message_args, message))
    }

    /// Build a flag from `template` instead of the check's own message.
    pub(crate) fn with_template<A: ?Sized>(
        code: FlagCode,
        check: &Check<A>,
        template: &Template,
        message_args: TemplateArgs,
    ) -> Result<Flag, VvError> {
        let message = template.render(&message_args)?;
        Ok(Self::record(code, check, check.shared_info(), message_args, message))
    }

    fn record<A: ?Sized>(
        code: FlagCode,
        check: &Check<A>,
        info: Arc<CheckInfo>,
        message_args: TemplateArgs,
        message: String,
    ) -> Flag {
        let flag = Flag {
            record: Arc::new(FlagRecord {
                code,
                check: info,
                message_args,
                message,
            }),
        };
        check.record(flag.clone());
        flag
    }

    pub fn code(&self) -> FlagCode {
        self.record.code
    }

    pub fn rank(&self) -> u8 {
        self.record.code.rank()
    }

    /// Identity of the check that produced this flag.
    pub fn check(&self) -> &CheckInfo {
        &self.record.check
    }

    pub fn check_id(&self) -> &CheckId {
        self.record.check.id()
    }

    pub fn message_args(&self) -> &TemplateArgs {
        &self.record.message_args
    }

    pub fn message(&self) -> &str {
        &self.record.message
    }

    /// Whether both handles point at the same constructed flag.
    pub fn same_record(&self, other: &Flag) -> bool {
        Arc::ptr_eq(&self.record, &other.record)
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code(), self.check_id(), self.message())
    }
}
