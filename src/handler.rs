use std::time::{Duration, SystemTime};

use http::Request;

use crate::request::RequestBody;
use crate::response::ResponseRecorder;

/// A request handler in the style of a classic HTTP server callback: it owns the request for the
/// duration of the call and writes its answer into the recorder.
///
/// Closures with the matching signature implement this trait; [`handler_fn`] helps the compiler
/// infer their argument types.
pub trait Handler: Send + Sync {
    fn serve(&self, req: Request<RequestBody>, res: &mut ResponseRecorder);
}

impl<F> Handler for F
where
    F: Fn(Request<RequestBody>, &mut ResponseRecorder) + Send + Sync,
{
    fn serve(&self, req: Request<RequestBody>, res: &mut ResponseRecorder) {
        self(req, res)
    }
}

/// Pin a closure to the [`Handler`] signature.
pub fn handler_fn<F>(f: F) -> F
where
    F: Fn(Request<RequestBody>, &mut ResponseRecorder) + Send + Sync,
{
    f
}

/// Per-invocation metadata carried from the Lambda runtime into the handler.
///
/// Available to handlers as a request extension (see [`crate::RequestExt::invocation_context`]).
/// The adapter itself never checks the deadline; observing it is up to the handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    request_id: String,
    deadline: Option<SystemTime>,
    trace_id: Option<String>,
}

impl InvocationContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            deadline: None,
            trace_id: None,
        }
    }

    pub fn with_deadline(mut self, deadline: SystemTime) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Lambda request id of this invocation.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn deadline(&self) -> Option<SystemTime> {
        self.deadline
    }

    /// X-Ray trace header, when tracing is active for the function.
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Time left before the deadline; zero once it has passed, `None` without a deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|deadline| {
            deadline
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO)
        })
    }

    pub fn is_expired(&self) -> bool {
        self.remaining() == Some(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_is_zero_after_deadline() {
        let ctx =
            InvocationContext::new("r-1").with_deadline(SystemTime::now() - Duration::from_secs(1));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
        assert!(ctx.is_expired());
    }

    #[test]
    fn remaining_counts_down_to_future_deadline() {
        let deadline = SystemTime::now() + Duration::from_secs(60);
        let ctx = InvocationContext::new("r-1").with_deadline(deadline);
        let left = ctx.remaining().unwrap();
        assert!(left > Duration::from_secs(50) && left <= Duration::from_secs(60));
        assert!(!ctx.is_expired());
    }

    #[test]
    fn no_deadline_never_expires() {
        let ctx = InvocationContext::new("r-1");
        assert_eq!(ctx.remaining(), None);
        assert!(!ctx.is_expired());
        assert_eq!(ctx.trace_id(), None);
    }
}
