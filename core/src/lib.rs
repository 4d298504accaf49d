// core/src/lib.rs

//! lokanta-flow: async step pipelines for the lokanta ordering service.
//!
//! A pipeline is an ordered list of named steps operating on a shared
//! [`ContextData<T>`]. Each step may carry `before`, `on` and `after` handlers;
//! any handler can halt the run with [`PipelineControl::Stop`] or fail it with
//! the pipeline's error type. Steps can be optional (no handlers required) and
//! can be skipped at runtime through a `skip_if` condition.
//!
//! The [`Registry`] keys pipelines by their context type so request handlers
//! only need to build a context and call `registry.run(ctx)`.

pub mod context_data;
pub mod control;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod step;

pub use crate::context_data::ContextData;
pub use crate::control::{PipelineControl, PipelineResult};
pub use crate::error::{FlowError, FlowResult};
pub use crate::pipeline::definition::{Handler, Pipeline};
pub use crate::registry::Registry;
pub use crate::step::{skip_if, SkipCondition, StepDef};
