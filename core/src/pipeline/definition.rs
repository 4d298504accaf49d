// core/src/pipeline/definition.rs

//! The `Pipeline<T, E>` type and its structural operations.

use crate::context_data::ContextData;
use crate::control::PipelineControl;
use crate::error::FlowError;
use crate::step::{SkipCondition, StepDef};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// A boxed async step handler over `ContextData<T>`.
pub type Handler<T, E> =
  Box<dyn Fn(ContextData<T>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, E>> + Send>> + Send + Sync>;

/// Handlers attached to one step, grouped by phase.
pub(crate) struct StepHandlers<T: Send + Sync + 'static, E> {
  pub(crate) before: Vec<Handler<T, E>>,
  pub(crate) on: Vec<Handler<T, E>>,
  pub(crate) after: Vec<Handler<T, E>>,
}

impl<T: Send + Sync + 'static, E> Default for StepHandlers<T, E> {
  fn default() -> Self {
    Self {
      before: Vec::new(),
      on: Vec::new(),
      after: Vec::new(),
    }
  }
}

impl<T: Send + Sync + 'static, E> StepHandlers<T, E> {
  pub(crate) fn is_empty(&self) -> bool {
    self.before.is_empty() && self.on.is_empty() && self.after.is_empty()
  }
}

/// An ordered list of named steps over context `T`, failing with `E`.
///
/// `E` must be constructible from [`FlowError`] so that structural problems
/// (a required step without handlers) surface through the same error type
/// the handlers use.
pub struct Pipeline<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<T>>,
  pub(crate) handlers: HashMap<String, StepHandlers<T, E>>,
}

impl<T, E> Pipeline<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Each tuple is `(name, optional, skip_if)`.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<T>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip_if)| StepDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      steps,
      handlers: HashMap::new(),
    }
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn has_step(&self, step_name: &str) -> bool {
    self.steps.iter().any(|s| s.name == step_name)
  }

  /// Panics on an unknown step: a typo in a step name is a wiring bug.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.has_step(step_name) {
      panic!("lokanta-flow setup error: step '{}' is not defined in this pipeline", step_name);
    }
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<T>>) -> Result<(), FlowError> {
    let step = self
      .steps
      .iter_mut()
      .find(|s| s.name == step_name)
      .ok_or_else(|| FlowError::StepNotFound {
        step_name: step_name.to_string(),
      })?;
    step.skip_if = skip_if;
    Ok(())
  }

  pub(crate) fn handlers_mut(&mut self, step_name: &str) -> &mut StepHandlers<T, E> {
    self.handlers.entry(step_name.to_string()).or_default()
  }
}
