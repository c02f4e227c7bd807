//! Response cache middleware for the global feed.
//!
//! Applied only to routes that opt in. Caches successful GET responses and
//! serves them until they expire; mutations elsewhere never invalidate a
//! cached page, so readers can see a feed up to one expiry interval old.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, instrument};

use super::store::{CachedPage, PageCache, PageKey};

const MAX_CACHED_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct CacheState {
    pub pages: Arc<PageCache>,
}

/// Only GET requests that produce 200 OK are cached.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = PageKey::new(
        request.uri().path(),
        request.uri().query().unwrap_or(""),
    );

    if let Some(cached) = cache.pages.get(&key) {
        counter!("yatube_page_cache_hit_total").increment(1);
        debug!(cache = "page", outcome = "hit", "serving cached response");
        return build_response(cached);
    }

    counter!("yatube_page_cache_miss_total").increment(1);
    debug!(cache = "page", outcome = "miss", "executing handler");

    let response = next.run(request).await;

    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.to_string(), value.to_string()))
        })
        .collect();

    cache
        .pages
        .set(key, parts.status.as_u16(), headers, bytes.clone());

    Response::from_parts(parts, Body::from(bytes))
}

fn build_response(cached: CachedPage) -> Response {
    use axum::http::HeaderValue;

    let mut builder = Response::builder().status(cached.status);
    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
