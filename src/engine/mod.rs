//! Field-agnostic extraction engine.
//!
//! This module provides the stages every field runs through:
//! - [`normalize`]: Unicode and punctuation normalization
//! - [`candidates`]: tiered pattern matching with first-applicable-tier
//!   semantics
//! - [`context`]: Target / Excluded / Neutral classification of a line
//! - [`scoring`]: additive score components and the selection comparator
//! - [`calibrate`]: raw score to bounded confidence
//! - [`pipeline`]: the stages wired together for one declarative
//!   [`FieldSpec`]
//!
//! Nothing in here knows about a particular syllabus field; the field
//! tables live in [`crate::detectors`].

pub mod calibrate;
pub mod candidates;
pub mod config;
pub mod context;
pub mod document;
pub mod normalize;
pub mod pipeline;
pub mod rules;
pub mod scoring;
pub mod types;

pub use calibrate::{Calibration, calibrate};
pub use config::{EngineConfig, FieldOverrides, FieldSpec, FieldTuning};
pub use document::Document;
pub use normalize::normalize;
pub use pipeline::{FieldPipeline, evidence_line};
pub use types::{Candidate, ContextLabel, DetectionResult, ScoreComponents, round2};
