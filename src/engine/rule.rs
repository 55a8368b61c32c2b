//! Rule functions and the errors they may raise.

use crate::engine::check::Check;
use crate::engine::flag::Flag;
use crate::locate::LocateError;
use crate::VvError;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Error raised from inside a rule.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Expected key or field absent from the validated data
    #[error("missing key '{0}'")]
    MissingKey(String),

    /// Flag or template misuse inside the rule
    #[error(transparent)]
    Engine(#[from] VvError),

    /// Path lookup failed
    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The rule panicked
    #[error("panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Failed(String),
}

/// Discriminant of `RuleError`, used to configure isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleErrorKind {
    MissingKey,
    Engine,
    Locate,
    Io,
    Panicked,
    Failed,
}

impl RuleErrorKind {
    pub const ALL: [RuleErrorKind; 6] = [
        RuleErrorKind::MissingKey,
        RuleErrorKind::Engine,
        RuleErrorKind::Locate,
        RuleErrorKind::Io,
        RuleErrorKind::Panicked,
        RuleErrorKind::Failed,
    ];
}

impl RuleError {
    pub fn failed(message: impl Into<String>) -> Self {
        RuleError::Failed(message.into())
    }

    pub fn missing_key(key: impl Into<String>) -> Self {
        RuleError::MissingKey(key.into())
    }

    pub fn kind(&self) -> RuleErrorKind {
        match self {
            RuleError::MissingKey(_) => RuleErrorKind::MissingKey,
            RuleError::Engine(_) => RuleErrorKind::Engine,
            RuleError::Locate(_) => RuleErrorKind::Locate,
            RuleError::Io(_) => RuleErrorKind::Io,
            RuleError::Panicked(_) => RuleErrorKind::Panicked,
            RuleError::Failed(_) => RuleErrorKind::Failed,
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        RuleError::Panicked(message)
    }
}

/// Which rule errors escape `Check::validate` instead of becoming flags.
///
/// Empty by default: every error is isolated. Listing `panicked` also turns
/// off panic catching so the panic unwinds through the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationPolicy {
    pub propagate: BTreeSet<RuleErrorKind>,
}

impl IsolationPolicy {
    /// Let the given error kinds through.
    pub fn propagating<I: IntoIterator<Item = RuleErrorKind>>(kinds: I) -> Self {
        IsolationPolicy {
            propagate: kinds.into_iter().collect(),
        }
    }

    /// Let everything through, panics included.
    pub fn strict() -> Self {
        Self::propagating(RuleErrorKind::ALL)
    }

    pub fn propagates(&self, err: &RuleError) -> bool {
        self.propagates_kind(err.kind())
    }

    pub fn propagates_kind(&self, kind: RuleErrorKind) -> bool {
        self.propagate.contains(&kind)
    }
}

/// A rule body together with the name reported when it fails.
pub struct Rule<A: ?Sized> {
    name: Arc<str>,
    func: Arc<dyn Fn(&Check<A>, &A) -> Result<Flag, RuleError> + Send + Sync>,
}

impl<A: ?Sized> Rule<A> {
    /// Wrap `func`, naming it after its type.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Check<A>, &A) -> Result<Flag, RuleError> + Send + Sync + 'static,
    {
        Self::named(std::any::type_name::<F>(), func)
    }

    pub fn named<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Check<A>, &A) -> Result<Flag, RuleError> + Send + Sync + 'static,
    {
        Rule {
            name: Arc::from(name.into()),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn call(&self, check: &Check<A>, args: &A) -> Result<Flag, RuleError> {
        (self.func)(check, args)
    }
}

impl<A: ?Sized> Clone for Rule<A> {
    fn clone(&self) -> Self {
        Rule {
            name: Arc::clone(&self.name),
            func: Arc::clone(&self.func),
        }
    }
}

impl<A: ?Sized> fmt::Debug for Rule<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}
