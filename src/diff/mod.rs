//! Diff engine.
//!
//! This module compares old and new property maps and classifies every
//! changed top-level key as an in-place update or a replacement.

mod engine;

pub use engine::{
    diff, DiffChanges, DiffResponse, PropertyDiff, PropertyDiffKind, ReplaceKeys,
};
