// core/src/pipeline/execution.rs

//! `Pipeline::run`: walks the steps in order and drives each phase.

use crate::context_data::ContextData;
use crate::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::definition::{Handler, Pipeline};
use tracing::{event, info_span, instrument, Instrument, Level};

enum PhaseOutcome<E> {
  Continue,
  Stop,
  Failed(E),
}

impl<T, E> Pipeline<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes the pipeline against `ctx_data`.
  ///
  /// Steps run in declaration order. For each step the `skip_if` condition is
  /// evaluated first, then every `before`, `on` and `after` handler in the
  /// order they were attached. The first `Stop` ends the run with
  /// [`PipelineResult::Stopped`]; the first error is returned as is.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<T>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<T>) -> Result<PipelineResult, E> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if let Some(skip_cond) = &step_def.skip_if {
        if skip_cond(ctx_data.clone()) {
          event!(Level::DEBUG, step = step_name, "Step skipped by condition.");
          continue;
        }
      }

      let handlers = match self.handlers.get(step_name) {
        Some(h) if !h.is_empty() => h,
        _ if step_def.optional => {
          event!(Level::DEBUG, step = step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        _ => {
          event!(Level::ERROR, step = step_name, "Non-optional step has no handlers.");
          return Err(E::from(FlowError::HandlerMissing {
            step_name: step_def.name.clone(),
          }));
        }
      };

      let step_span = info_span!("pipeline_step", step_name, step_index = step_idx);
      for (phase, list) in [("before", &handlers.before), ("on", &handlers.on), ("after", &handlers.after)] {
        match run_phase(list, &ctx_data).instrument(step_span.clone()).await {
          PhaseOutcome::Continue => {}
          PhaseOutcome::Stop => {
            event!(Level::INFO, step = step_name, phase, "Pipeline stopped by handler.");
            return Ok(PipelineResult::Stopped);
          }
          PhaseOutcome::Failed(e) => {
            event!(Level::WARN, step = step_name, phase, error = %e, "Handler failed.");
            return Err(e);
          }
        }
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }
}

async fn run_phase<T, E>(handlers: &[Handler<T, E>], ctx_data: &ContextData<T>) -> PhaseOutcome<E>
where
  T: 'static + Send + Sync,
{
  for handler in handlers {
    match handler(ctx_data.clone()).await {
      Ok(PipelineControl::Continue) => {}
      Ok(PipelineControl::Stop) => return PhaseOutcome::Stop,
      Err(e) => return PhaseOutcome::Failed(e),
    }
  }
  PhaseOutcome::Continue
}
