//! Protocol orchestration.
//!
//! A protocol knows which checks apply to a dataset, its samples and its
//! components. `Validation` binds one protocol to one dataset, runs the three
//! scopes in a fixed order and keeps the merged flags.
//!
//! # Failure semantics
//!
//! Rule failures are already isolated inside `Check::validate`. A scope
//! operation only returns `Err` when a rule error escaped isolation (see
//! `IsolationPolicy`) or the protocol itself failed; that aborts
//! `validate_all` and is treated as fatal for the run.

use crate::engine::check::Check;
use crate::engine::flag::Flag;
use crate::engine::result::{FlagReport, FlagSummary};
use crate::entity::{DatasetEntity, Entity};
use crate::VvError;
use std::collections::HashMap;
use tracing::{debug, info};

/// Flags per entity.
pub type FlagMap<K> = HashMap<K, Vec<Flag>>;

/// Append `flag` to the list for `key`.
pub fn push_flag<K: Entity>(map: &mut FlagMap<K>, key: K, flag: Flag) {
    map.entry(key).or_default().push(flag);
}

/// Run `check` against `args` and file the flag under `key`.
///
/// A rule error that escaped isolation becomes `VvError::RuleAborted`.
pub fn apply_check<K: Entity, A: ?Sized>(
    map: &mut FlagMap<K>,
    key: K,
    check: &Check<A>,
    args: &A,
) -> Result<(), VvError> {
    let flag = check
        .validate(args)
        .map_err(|err| VvError::aborted(check.id(), err))?;
    debug!(check_id = %check.id(), entity = key.name(), code = %flag.code(), "check applied");
    push_flag(map, key, flag);
    Ok(())
}

fn merge<K: Entity>(into: &mut FlagMap<K>, from: FlagMap<K>) {
    for (key, flags) in from {
        into.entry(key).or_default().extend(flags);
    }
}

/// A validation protocol for one kind of dataset.
pub trait VvProtocol {
    type Dataset: DatasetEntity;
    type Sample: Entity;
    type Component: Entity;

    /// Dataset type this protocol was written for.
    fn expected_dataset_type(&self) -> &str;

    /// Run dataset-scope checks.
    fn validate_dataset(
        &mut self,
        dataset: &Self::Dataset,
    ) -> Result<FlagMap<Self::Dataset>, VvError>;

    /// Run sample-scope checks, once per relevant sample.
    fn validate_samples(
        &mut self,
        dataset: &Self::Dataset,
    ) -> Result<FlagMap<Self::Sample>, VvError>;

    /// Run component-scope checks, once per relevant component.
    fn validate_components(
        &mut self,
        dataset: &Self::Dataset,
    ) -> Result<FlagMap<Self::Component>, VvError>;
}

/// Flags gathered by a protocol, split by scope.
#[derive(Debug, Clone)]
pub struct ProtocolFlags<D, S, C> {
    pub dataset: FlagMap<D>,
    pub sample: FlagMap<S>,
    pub component: FlagMap<C>,
}

impl<D: Entity, S: Entity, C: Entity> Default for ProtocolFlags<D, S, C> {
    fn default() -> Self {
        ProtocolFlags {
            dataset: HashMap::new(),
            sample: HashMap::new(),
            component: HashMap::new(),
        }
    }
}

impl<D: Entity, S: Entity, C: Entity> ProtocolFlags<D, S, C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every flag across all scopes.
    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.dataset
            .values()
            .chain(self.sample.values())
            .chain(self.component.values())
            .flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> FlagSummary {
        FlagSummary::from_flags(self.iter())
    }

    pub fn report(&self) -> FlagReport {
        FlagReport::from_protocol_flags(self)
    }
}

/// A protocol bound to a dataset.
pub struct Validation<P: VvProtocol> {
    protocol: P,
    dataset: P::Dataset,
    flags: ProtocolFlags<P::Dataset, P::Sample, P::Component>,
}

impl<P: VvProtocol> Validation<P> {
    /// Bind `dataset` to `protocol`, refusing datasets of another type.
    pub fn new(protocol: P, dataset: P::Dataset) -> Result<Self, VvError> {
        let expected = protocol.expected_dataset_type();
        if dataset.dataset_type() != expected {
            return Err(VvError::DatasetTypeMismatch {
                expected: expected.to_string(),
                found: dataset.dataset_type().to_string(),
            });
        }

        Ok(Validation {
            protocol,
            dataset,
            flags: ProtocolFlags::new(),
        })
    }

    /// Run dataset, sample and component checks, in that order.
    ///
    /// Results are merged into the flags gathered so far; running again
    /// appends rather than replaces.
    pub fn validate_all(
        &mut self,
    ) -> Result<&ProtocolFlags<P::Dataset, P::Sample, P::Component>, VvError> {
        let name = self.dataset.name().to_string();

        info!(dataset = %name, "validating dataset");
        let flags = self.protocol.validate_dataset(&self.dataset)?;
        merge(&mut self.flags.dataset, flags);

        info!(dataset = %name, "validating samples");
        let flags = self.protocol.validate_samples(&self.dataset)?;
        merge(&mut self.flags.sample, flags);

        info!(dataset = %name, "validating components");
        let flags = self.protocol.validate_components(&self.dataset)?;
        merge(&mut self.flags.component, flags);

        info!(dataset = %name, flags = self.flags.len(), "validation complete");
        Ok(&self.flags)
    }

    pub fn flags(&self) -> &ProtocolFlags<P::Dataset, P::Sample, P::Component> {
        &self.flags
    }

    pub fn dataset(&self) -> &P::Dataset {
        &self.dataset
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    pub fn into_flags(self) -> ProtocolFlags<P::Dataset, P::Sample, P::Component> {
        self.flags
    }
}
