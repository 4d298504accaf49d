// core/src/registry.rs

//! `Registry<E>`: pipelines keyed by the `TypeId` of their context type.
//!
//! Callers hand over a `ContextData<T>` and the registry finds the pipeline
//! registered for `T`. Errors from the pipeline's own error type are
//! converted into the registry's application error `E`.

use crate::context_data::ContextData;
use crate::control::PipelineResult;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[async_trait]
trait ErasedRunner<E>: Send + Sync
where
  E: std::error::Error + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, E>;
}

struct TypedRunner<T, PE, E>
where
  T: 'static + Send + Sync,
  PE: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Arc<Pipeline<T, PE>>,
  _app_err: PhantomData<fn() -> E>,
}

#[async_trait]
impl<T, PE, E> ErasedRunner<E> for TypedRunner<T, PE, E>
where
  T: 'static + Send + Sync,
  PE: std::error::Error + From<FlowError> + Send + Sync + 'static,
  E: std::error::Error + From<PE> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, E> {
    let ctx_data = match ctx_obj.downcast::<ContextData<T>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected_type = std::any::type_name::<ContextData<T>>().to_string();
        event!(Level::ERROR, %expected_type, "Context object type mismatch.");
        return Err(E::from(FlowError::TypeMismatch { expected_type }));
      }
    };
    self.pipeline.run(ctx_data).await.map_err(E::from)
  }
}

/// The pipeline registry shared by request handlers.
pub struct Registry<E = FlowError>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  runners: RwLock<HashMap<TypeId, Arc<dyn ErasedRunner<E>>>>,
}

impl<E> Registry<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      runners: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `pipeline` for context type `T`, replacing any earlier one.
  pub fn register_pipeline<T, PE>(&self, pipeline: Pipeline<T, PE>)
  where
    T: 'static + Send + Sync,
    PE: std::error::Error + From<FlowError> + Send + Sync + 'static,
    E: From<PE>,
  {
    event!(Level::DEBUG, context_type = %std::any::type_name::<T>(), steps = ?pipeline.step_names(), "Registering pipeline.");
    let runner = TypedRunner::<T, PE, E> {
      pipeline: Arc::new(pipeline),
      _app_err: PhantomData,
    };
    self.runners.write().insert(TypeId::of::<T>(), Arc::new(runner));
  }

  pub fn is_registered<T: 'static>(&self) -> bool {
    self.runners.read().contains_key(&TypeId::of::<T>())
  }

  /// Runs the pipeline registered for `T`.
  #[instrument(name = "Registry::run", skip_all, fields(context_type = %std::any::type_name::<T>()))]
  pub async fn run<T>(&self, ctx_data: ContextData<T>) -> Result<PipelineResult, E>
  where
    T: 'static + Send + Sync,
  {
    let runner = self.runners.read().get(&TypeId::of::<T>()).cloned();
    let runner = runner.ok_or_else(|| {
      let type_name = std::any::type_name::<T>().to_string();
      event!(Level::ERROR, %type_name, "No pipeline registered.");
      E::from(FlowError::NotRegistered { type_name })
    })?;

    runner.run_erased(Box::new(ctx_data)).await
  }
}

impl<E> Default for Registry<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
