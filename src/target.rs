//! Request target reconstruction.
//!
//! ALB hands over the path and each query value already percent-escaped. The target is rebuilt
//! from those pieces without double-escaping them, then parsed once as an [`http::Uri`] so a
//! malformed event fails before any handler runs.

use std::collections::HashMap;

use http::Uri;
use url::form_urlencoded;

use crate::error::{Error, Result};

/// How query parameters from the event are turned back into a query string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryStrategy {
    /// Join `name=value` pairs as received. ALB already escaped them, so this avoids a decode and
    /// re-encode per parameter. Pair order follows map iteration and is unspecified.
    #[default]
    Trusted,
    /// Unescape every name and value, then re-encode through `application/x-www-form-urlencoded`
    /// serialization with names sorted. Pairs whose names unescape to the same string are all
    /// kept. Escapes that do not decode to UTF-8 are replaced with U+FFFD.
    Canonical,
}

/// Rebuild `path?query` and parse it.
pub fn build_target(
    path: &str,
    query: &HashMap<String, String>,
    strategy: QueryStrategy,
) -> Result<Uri> {
    check_escapes("path", path)?;
    if query.is_empty() {
        return Ok(path.parse()?);
    }

    let target = match strategy {
        QueryStrategy::Trusted => trusted_target(path, query)?,
        QueryStrategy::Canonical => canonical_target(path, query)?,
    };
    Ok(target.parse()?)
}

fn trusted_target(path: &str, query: &HashMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(path.len() + 1 + raw_query_len(query));
    out.push_str(path);
    out.push('?');
    push_raw_pairs(&mut out, query)?;
    Ok(out)
}

fn canonical_target(path: &str, query: &HashMap<String, String>) -> Result<String> {
    let mut raw = String::with_capacity(raw_query_len(query));
    push_raw_pairs(&mut raw, query)?;

    // Stable sort: equal names keep their relative order and none is dropped.
    let mut pairs = form_urlencoded::parse(raw.as_bytes()).collect::<Vec<_>>();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = String::with_capacity(path.len() + 1 + raw.len());
    out.push_str(path);
    out.push('?');
    let start = out.len();
    Ok(form_urlencoded::Serializer::for_suffix(out, start)
        .extend_pairs(pairs)
        .finish())
}

fn raw_query_len(query: &HashMap<String, String>) -> usize {
    query.iter().map(|(k, v)| k.len() + v.len() + 2).sum()
}

/// Appends `name=value` pairs joined by `&`, rejecting malformed escapes.
fn push_raw_pairs(out: &mut String, query: &HashMap<String, String>) -> Result<()> {
    for (i, (k, v)) in query.iter().enumerate() {
        check_escapes("query name", k)?;
        check_escapes("query value", v)?;
        if i != 0 {
            out.push('&');
        }
        out.push_str(k);
        out.push('=');
        out.push_str(v);
    }
    Ok(())
}

/// Every `%` must be followed by two hex digits.
fn check_escapes(component: &'static str, input: &str) -> Result<()> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }
        let valid = bytes
            .get(i + 1..i + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            return Err(Error::Escape {
                component,
                input: input.to_string(),
            });
        }
        i += 3;
    }
    Ok(())
}
