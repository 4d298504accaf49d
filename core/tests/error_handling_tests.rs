// tests/error_handling_tests.rs
mod common;
use common::*;
use lokanta_flow::{ContextData, FlowError, Pipeline, PipelineControl};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_pipeline_run_catches_handler_missing() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new(&[("missing", false, None)]);
  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx).await;
  match result.err().unwrap() {
    TestError::Flow(s) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("missing"));
    }
    other => panic!("Expected TestError::Flow(HandlerMissing), got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_pipeline_with_flow_error_type() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new(&[("task", false, None)]);
  pipeline.on_root("task", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().counter = 1;
      Ok::<PipelineControl, FlowError>(PipelineControl::Continue)
    })
  });

  let ctx = ContextData::new(TestContext::default());
  assert!(pipeline.run(ctx.clone()).await.is_ok());
  assert_eq!(ctx.read().counter, 1);

  let mut failing_pipeline = Pipeline::<TestContext, FlowError>::new(&[("fail_task", false, None)]);
  failing_pipeline.on_root("fail_task", |_ctx| {
    Box::pin(async move { Err(FlowError::Internal("Intentional flow error".to_string())) })
  });
  let fail_result = failing_pipeline.run(ContextData::new(TestContext::default())).await;
  match fail_result.err().unwrap() {
    FlowError::Internal(s) => assert_eq!(s, "Intentional flow error"),
    other => panic!("Expected FlowError::Internal, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_anyhow_errors_become_handler_errors() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new(&[("task", false, None)]);
  pipeline.on_root("task", |_ctx: ContextData<TestContext>| {
    Box::pin(async move { Err::<PipelineControl, anyhow::Error>(anyhow::anyhow!("disk on fire")) })
  });

  let err = pipeline.run(ContextData::new(TestContext::default())).await.unwrap_err();
  assert!(matches!(err, FlowError::HandlerError { .. }));
  assert!(err.to_string().contains("disk on fire"));
}

#[test]
fn test_set_skip_condition_on_unknown_step() {
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("known", false, None)]);
  let err = pipeline
    .set_skip_condition("unknown", lokanta_flow::skip_if(|_ctx: ContextData<TestContext>| true))
    .unwrap_err();
  assert!(matches!(err, FlowError::StepNotFound { step_name } if step_name == "unknown"));
}
