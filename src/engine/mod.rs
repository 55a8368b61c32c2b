//! Validation engine module.
//!
//! Provides check definition, isolated rule execution, flag construction,
//! protocol orchestration and result aggregation.

pub mod check;
pub mod flag;
pub mod protocol;
pub mod registry;
pub mod result;
pub mod rule;
pub mod template;
