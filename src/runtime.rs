//! Registration with the Lambda runtime.

use std::time::{Duration, UNIX_EPOCH};

use lambda_runtime::{service_fn, LambdaEvent};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

use crate::{AlbAdapter, AlbRequestEvent, AlbResponse, InvocationContext};

/// Serve ALB invocations with `adapter` until the runtime shuts the process down.
pub async fn run(adapter: AlbAdapter) -> Result<(), lambda_runtime::Error> {
    lambda_runtime::run(service_fn(move |event: LambdaEvent<AlbRequestEvent>| {
        let adapter = adapter.clone();
        async move { handle_event(&adapter, event) }
    }))
    .await
}

/// Handle one runtime event. Translation errors fail the invocation.
pub fn handle_event(
    adapter: &AlbAdapter,
    event: LambdaEvent<AlbRequestEvent>,
) -> Result<AlbResponse, lambda_runtime::Error> {
    let ctx = InvocationContext::from(&event.context);
    adapter.handle(&ctx, event.payload).map_err(|err| {
        tracing::error!(
            request_id = %ctx.request_id(),
            error = %err,
            "failed to translate alb event"
        );
        err.into()
    })
}

impl From<&lambda_runtime::Context> for InvocationContext {
    fn from(ctx: &lambda_runtime::Context) -> Self {
        let mut out = invocation_context(&ctx.request_id, ctx.deadline);
        if let Some(trace_id) = &ctx.xray_trace_id {
            out = out.with_trace_id(trace_id.as_str());
        }
        out
    }
}

/// The runtime reports the deadline in milliseconds since the epoch; zero means none.
fn invocation_context(request_id: &str, deadline_ms: u64) -> InvocationContext {
    let ctx = InvocationContext::new(request_id);
    if deadline_ms == 0 {
        return ctx;
    }
    ctx.with_deadline(UNIX_EPOCH + Duration::from_millis(deadline_ms))
}

/// Install a `tracing` subscriber. `RUST_LOG` filters (default `info`); set
/// `AWS_LAMBDA_LOG_FORMAT=json` for JSON lines. The runtime stamps each line, so no timestamp is
/// written.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_format = std::env::var("AWS_LAMBDA_LOG_FORMAT").ok();
    let output = fmt::layer().without_time();
    let output: Box<dyn Layer<Registry> + Send + Sync> = if wants_json(log_format.as_deref()) {
        output.json().boxed()
    } else {
        output.boxed()
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .init();
}

fn wants_json(log_format: Option<&str>) -> bool {
    log_format.is_some_and(|f| f.trim().eq_ignore_ascii_case("json"))
}
