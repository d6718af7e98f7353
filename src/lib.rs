//! Spec-driven workflow engine.
//!
//! A workflow moves through three phases (requirements, design,
//! implementation plan). Each phase produces one markdown document generated
//! by an LLM provider, cleaned by the [`sanitizer`], checked by the
//! [`validator`] and persisted with full history by [`storage`]. The
//! [`engine::SpecEngine`] ties these together and guards phase transitions.

pub mod config;
pub mod delta;
pub mod domain;
pub mod engine;
pub mod error;
pub mod generator;
pub mod llm;
pub mod logging;
pub mod phase;
pub mod sanitizer;
pub mod storage;
pub mod validator;

pub use domain::{ChangeIntent, Document, Workflow, WorkflowId, WorkflowStatus};
pub use engine::{EngineSettings, GenerationEvent, GenerationHandle, SpecEngine};
pub use error::SpecError;
pub use phase::Phase;
