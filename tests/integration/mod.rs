//! Integration tests for dp-vv.
//!
//! These tests drive checks and protocols against mock entities.

pub mod flag_tests;
pub mod protocol_tests;
