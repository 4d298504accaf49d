// core/src/step.rs

use crate::context_data::ContextData;
use std::sync::Arc;

/// Evaluated right before a step runs; `true` skips the step entirely.
pub type SkipCondition<T> = Arc<dyn Fn(ContextData<T>) -> bool + Send + Sync + 'static>;

#[derive(Clone)]
pub struct StepDef<T: 'static + Send + Sync> {
  pub name: String,
  /// An optional step may have no handlers at all.
  pub optional: bool,
  pub skip_if: Option<SkipCondition<T>>,
}

impl<T: 'static + Send + Sync> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("has_skip_if", &self.skip_if.is_some())
      .finish()
  }
}

/// Builds a skip condition for use in a step definition tuple.
pub fn skip_if<T, F>(condition: F) -> Option<SkipCondition<T>>
where
  T: 'static + Send + Sync,
  F: Fn(ContextData<T>) -> bool + Send + Sync + 'static,
{
  Some(Arc::new(condition))
}
