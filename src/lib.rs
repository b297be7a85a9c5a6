//! Run plain `http` request handlers as AWS Lambda targets behind an Application Load Balancer.
//!
//! ALB invokes Lambda with a JSON event describing the HTTP request and expects a JSON envelope
//! back. This crate translates between the two so a handler only ever sees an
//! [`http::Request`] and a [`ResponseRecorder`]:
//!
//! ```no_run
//! use std::io::Write;
//!
//! use alb_adapter::{alb_adapter, handler_fn};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lambda_runtime::Error> {
//!     let adapter = alb_adapter(handler_fn(|_req, res| {
//!         let _ = writeln!(res, "Hello from AWS Lambda behind ALB");
//!     }));
//!     alb_adapter::runtime::run(adapter).await
//! }
//! ```
//!
//! Both directions are capped by Lambda at about 1 MB of JSON. Response bodies that are not valid
//! UTF-8 are base64-encoded, which adds roughly a third on top. Neither limit is checked here.
//!
//! Modules:
//! - [`event`]: ALB wire envelopes
//! - [`target`]: request target reconstruction from escaped path/query
//! - [`request`]: event -> request decoding
//! - [`response`]: response recording and envelope encoding
//! - [`runtime`]: `lambda_runtime` registration and logging setup

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

pub mod config;
pub mod error;
pub mod event;
mod handler;
pub mod request;
pub mod response;
pub mod runtime;
mod sniff;
pub mod target;

pub use crate::config::{AdapterConfig, FaultPolicy};
pub use crate::error::{Error, Result};
pub use crate::event::{AlbRequestEvent, AlbResponse};
pub use crate::handler::{handler_fn, Handler, InvocationContext};
pub use crate::request::{Host, RequestBody, RequestExt};
pub use crate::response::ResponseRecorder;
pub use crate::target::QueryStrategy;

/// Translates ALB events into handler calls. Cheap to clone.
#[derive(Clone)]
pub struct AlbAdapter {
    handler: Arc<dyn Handler>,
    config: AdapterConfig,
}

/// Wrap a handler with the default [`AdapterConfig`].
pub fn alb_adapter<H>(handler: H) -> AlbAdapter
where
    H: Handler + 'static,
{
    AlbAdapter {
        handler: Arc::new(handler),
        config: AdapterConfig::default(),
    }
}

impl AlbAdapter {
    pub fn with_config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_query_strategy(mut self, strategy: QueryStrategy) -> Self {
        self.config.query_strategy = strategy;
        self
    }

    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.config.fault_policy = policy;
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Decode `event`, run the handler once, and encode what it recorded.
    ///
    /// Decoding errors are returned before the handler is called. With
    /// [`FaultPolicy::Propagate`] a panicking handler unwinds through this call.
    pub fn handle(&self, ctx: &InvocationContext, event: AlbRequestEvent) -> Result<AlbResponse> {
        let mut req = request::decode_event(event, self.config.query_strategy)?;
        req.extensions_mut().insert(ctx.clone());

        tracing::debug!(
            request_id = %ctx.request_id(),
            method = %req.method(),
            uri = %req.uri(),
            content_length = req.body().content_length(),
            "dispatching alb request"
        );

        let mut recorder = ResponseRecorder::new();
        match self.config.fault_policy {
            FaultPolicy::Propagate => self.handler.serve(req, &mut recorder),
            FaultPolicy::Respond500 => {
                let handler = &self.handler;
                let outcome =
                    panic::catch_unwind(AssertUnwindSafe(|| handler.serve(req, &mut recorder)));
                if let Err(payload) = outcome {
                    tracing::error!(
                        request_id = %ctx.request_id(),
                        panic = %panic_message(payload.as_ref()),
                        "handler panicked"
                    );
                    recorder = ResponseRecorder::internal_error();
                }
            }
        }

        let res = recorder.into_alb_response();
        tracing::debug!(
            request_id = %ctx.request_id(),
            status = res.status_code,
            is_base64_encoded = res.is_base64_encoded,
            body_len = res.body.len(),
            "encoded alb response"
        );
        Ok(res)
    }
}

impl std::fmt::Debug for AlbAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlbAdapter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
