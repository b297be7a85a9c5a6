use std::io::{Read, Write};

use alb_adapter::{
    alb_adapter, handler_fn, runtime, AdapterConfig, RequestBody, RequestExt, ResponseRecorder,
};
use http::{header::CONTENT_TYPE, HeaderValue, Method, Request, StatusCode};

fn hello(req: Request<RequestBody>, res: &mut ResponseRecorder) {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/") => {
            let host = req.host().unwrap_or("unknown host");
            let _ = writeln!(res, "Hello from AWS Lambda behind ALB ({host})");
        }
        (&Method::POST, "/echo") => {
            let content_type = req.headers().get(CONTENT_TYPE).cloned();
            let mut body = Vec::new();
            if req.into_body().read_to_end(&mut body).is_err() {
                res.write_head(StatusCode::BAD_REQUEST);
                return;
            }
            if let Some(ct) = content_type {
                res.headers_mut().insert(CONTENT_TYPE, ct);
            }
            res.write_body(&body);
        }
        (&Method::GET, "/deadline") => {
            let remaining = req
                .invocation_context()
                .and_then(|ctx| ctx.remaining())
                .map(|d| d.as_millis().to_string())
                .unwrap_or_else(|| "none".to_string());
            res.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
            let _ = write!(res, "{remaining}");
        }
        _ => {
            res.write_head(StatusCode::NOT_FOUND);
            let _ = res.write_all(b"not found\n");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    runtime::init_tracing();

    let cfg = AdapterConfig::from_env()?;
    tracing::info!(?cfg, "starting");

    let adapter = alb_adapter(handler_fn(hello)).with_config(cfg);
    runtime::run(adapter)
        .await
        .map_err(|err| anyhow::anyhow!("lambda runtime: {err}"))
}
