//! Result aggregation and export.
//!
//! Summarises flags by severity family, exports them as a flat serializable
//! report and compares a report against a saved baseline.

use crate::engine::check::Scope;
use crate::engine::flag::{Flag, FlagCode, FlagFamily};
use crate::engine::protocol::{FlagMap, ProtocolFlags};
use crate::entity::Entity;
use crate::VvError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Flag counts per severity family
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSummary {
    pub total: u32,
    pub info: u32,
    pub green: u32,
    pub yellow: u32,
    pub red: u32,
    pub halt: u32,
    pub dev: u32,
    /// Most severe code seen
    pub worst: Option<FlagCode>,
}

impl FlagSummary {
    pub fn from_flags<'a, I: IntoIterator<Item = &'a Flag>>(flags: I) -> Self {
        let mut summary = FlagSummary::default();
        for flag in flags {
            summary.add(flag.code());
        }
        summary
    }

    pub fn add(&mut self, code: FlagCode) {
        self.total += 1;
        match code.family() {
            FlagFamily::Info => self.info += 1,
            FlagFamily::Green => self.green += 1,
            FlagFamily::Yellow => self.yellow += 1,
            FlagFamily::Red => self.red += 1,
            FlagFamily::Halt => self.halt += 1,
            FlagFamily::Dev => self.dev += 1,
        }
        if self.worst.map_or(true, |worst| code.rank() > worst.rank()) {
            self.worst = Some(code);
        }
    }

    pub fn has_halt(&self) -> bool {
        self.halt > 0
    }

    pub fn has_dev_errors(&self) -> bool {
        self.dev > 0
    }

    /// No red, halt or developer flags
    pub fn passed(&self) -> bool {
        self.red == 0 && self.halt == 0 && self.dev == 0
    }
}

/// One flag, flattened for export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagRecord {
    pub scope: Scope,
    pub entity: String,
    pub check_id: String,
    pub code: FlagCode,
    pub rank: u8,
    pub message: String,
}

impl FlagRecord {
    fn new(scope: Scope, entity: &str, flag: &Flag) -> Self {
        FlagRecord {
            scope,
            entity: entity.to_string(),
            check_id: flag.check_id().to_string(),
            code: flag.code(),
            rank: flag.rank(),
            message: flag.message().to_string(),
        }
    }
}

/// Exportable flags of a validation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagReport {
    pub flags: Vec<FlagRecord>,
    pub summary: FlagSummary,
}

fn collect<K: Entity>(records: &mut Vec<FlagRecord>, scope: Scope, map: &FlagMap<K>) {
    for (entity, flags) in map {
        records.extend(flags.iter().map(|f| FlagRecord::new(scope, entity.name(), f)));
    }
}

impl FlagReport {
    /// Flatten protocol flags, ordered by scope, entity and check id
    pub fn from_protocol_flags<D: Entity, S: Entity, C: Entity>(
        flags: &ProtocolFlags<D, S, C>,
    ) -> Self {
        let mut records = Vec::new();
        collect(&mut records, Scope::Dataset, &flags.dataset);
        collect(&mut records, Scope::Sample, &flags.sample);
        collect(&mut records, Scope::Component, &flags.component);
        records.sort_by(|a, b| {
            (a.scope, &a.entity, &a.check_id).cmp(&(b.scope, &b.entity, &b.check_id))
        });

        FlagReport {
            flags: records,
            summary: flags.summary(),
        }
    }

    pub fn to_json(&self) -> Result<String, VvError> {
        serde_json::to_string_pretty(self).map_err(|e| VvError::Parse {
            context: "flag report".to_string(),
            message: e.to_string(),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, VvError> {
        serde_json::from_str(json).map_err(|e| VvError::Parse {
            context: "flag report".to_string(),
            message: e.to_string(),
        })
    }

    /// Save as a JSON baseline
    pub fn save(&self, path: &Path) -> Result<(), VvError> {
        std::fs::write(path, self.to_json()?).map_err(|e| VvError::Io {
            context: format!("save flag report {}", path.display()),
            message: e.to_string(),
        })
    }

    /// Load a JSON baseline
    pub fn load(path: &Path) -> Result<Self, VvError> {
        let content = std::fs::read_to_string(path).map_err(|e| VvError::Io {
            context: format!("load flag report {}", path.display()),
            message: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    // Worst code per (scope, entity, check).
    fn worst_by_key(&self) -> BTreeMap<(Scope, &str, &str), FlagCode> {
        let mut worst = BTreeMap::new();
        for record in &self.flags {
            worst
                .entry((record.scope, record.entity.as_str(), record.check_id.as_str()))
                .and_modify(|code: &mut FlagCode| {
                    if record.code.rank() > code.rank() {
                        *code = record.code;
                    }
                })
                .or_insert(record.code);
        }
        worst
    }

    /// Compare against a baseline report
    pub fn compare(&self, baseline: &FlagReport) -> Comparison {
        let mut result = Comparison::default();
        let current = self.worst_by_key();
        let previous = baseline.worst_by_key();

        for (&(scope, entity, check_id), &code) in &current {
            let before = previous.get(&(scope, entity, check_id)).copied();
            let entry = ComparisonEntry {
                scope,
                entity: entity.to_string(),
                check_id: check_id.to_string(),
                baseline: before,
                current: Some(code),
            };
            match before {
                None => result.added.push(entry),
                Some(old) if code.rank() > old.rank() => result.regressions.push(entry),
                Some(old) if code.rank() < old.rank() => result.resolved.push(entry),
                Some(_) => result.unchanged.push(entry),
            }
        }

        for (&(scope, entity, check_id), &code) in &previous {
            if !current.contains_key(&(scope, entity, check_id)) {
                result.missing.push(ComparisonEntry {
                    scope,
                    entity: entity.to_string(),
                    check_id: check_id.to_string(),
                    baseline: Some(code),
                    current: None,
                });
            }
        }

        result
    }
}

/// A check outcome in both runs, or in only one of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub scope: Scope,
    pub entity: String,
    pub check_id: String,
    pub baseline: Option<FlagCode>,
    pub current: Option<FlagCode>,
}

/// Baseline comparison result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    /// Severity rank rose
    pub regressions: Vec<ComparisonEntry>,
    /// Severity rank fell
    pub resolved: Vec<ComparisonEntry>,
    /// Only in the current run
    pub added: Vec<ComparisonEntry>,
    /// Only in the baseline
    pub missing: Vec<ComparisonEntry>,
    pub unchanged: Vec<ComparisonEntry>,
}

impl Comparison {
    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }
}
