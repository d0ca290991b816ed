use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, StatusCode, header};
use juniper::http::GraphQLBatchRequest;
use std::{sync::Arc, time::Instant};

use crate::{
    api,
    metrics::HttpReqCategory,
    prelude::*,
};
use super::{Context, Request, Response, response};


/// Where the GraphQL API is served. Only `POST` is accepted there.
const API_PATH: &str = "/api";

#[derive(Debug, PartialEq, Eq)]
enum Route {
    Preflight,
    Api,
    GraphiQL,
    Metrics,
    MethodNotAllowed,
    NotFound,
}

/// Decides how to answer a request. `path` has no trailing slash.
fn route(method: &Method, path: &str) -> Route {
    match path {
        _ if method == Method::OPTIONS => Route::Preflight,
        API_PATH if method == Method::POST => Route::Api,

        // From this point on, we only support GET and HEAD requests.
        _ if method != Method::GET && method != Method::HEAD => Route::MethodNotAllowed,

        // The interactive GraphQL API explorer/IDE.
        "/~graphiql" => Route::GraphiQL,
        "/~metrics" => Route::Metrics,
        _ => Route::NotFound,
    }
}

/// This is the main HTTP entry point, called for each incoming request.
pub(super) async fn handle(req: Request, ctx: Arc<Context>) -> Response {
    trace!(
        method = ?req.method(),
        path = req.uri().path_and_query().map_or("", |pq| pq.as_str()),
        "Incoming HTTP request",
    );

    let method = req.method().clone();
    let path = req.uri().path().trim_end_matches('/');

    let (category, mut response) = match route(&method, path) {
        Route::Preflight => (HttpReqCategory::Preflight, preflight()),
        Route::Api => (HttpReqCategory::GraphQL, handle_api(req, &ctx).await),
        Route::GraphiQL => {
            let html = juniper::http::graphiql::graphiql_source(API_PATH, None);
            let response = Response::builder()
                .header(header::CONTENT_TYPE, "text/html; charset=UTF-8")
                .body(Full::new(Bytes::from(html)))
                .unwrap();
            (HttpReqCategory::GraphiQL, response)
        }
        Route::Metrics => {
            let out = ctx.metrics.gather_and_encode(&*ctx.store).await;
            let response = Response::builder()
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(out)))
                .unwrap();
            (HttpReqCategory::Metrics, response)
        }
        Route::MethodNotAllowed => (HttpReqCategory::Other, response::method_not_allowed()),
        Route::NotFound => {
            debug!("Responding with 404 to {:?} '{}'", method, path);
            (HttpReqCategory::Other, response::not_found())
        }
    };

    ctx.metrics.register_http_req(category);
    if let Some(origin) = &ctx.cors_origin {
        response.headers_mut().insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    }

    response
}

/// Answers CORS preflight requests.
fn preflight() -> Response {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS")
        .header(header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type")
        .header(header::ACCESS_CONTROL_MAX_AGE, "86400")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Handles a request to the GraphQL API.
async fn handle_api(req: Request, ctx: &Context) -> Response {
    let before = Instant::now();

    let body = match req.into_body().collect().await {
        Ok(body) => body.to_bytes(),
        Err(e) => {
            warn!("Failed to read body of API request: {e}");
            return response::bad_request("could not read body");
        }
    };

    let gql_request = match serde_json::from_slice::<GraphQLBatchRequest>(&body) {
        Ok(r) => r,
        Err(e) => {
            debug!("Received invalid GraphQL request: {e}");
            return response::bad_request(&format!("invalid GraphQL request: {e}"));
        }
    };

    let api_context = api::Context::new(Arc::clone(&ctx.store));
    let gql_response = gql_request.execute(&*ctx.api_root, &api_context).await;
    let num_calls = api_context.store.num_calls();
    ctx.metrics.register_store_calls(num_calls);

    let status = if gql_response.is_ok() { StatusCode::OK } else { StatusCode::BAD_REQUEST };
    let out = match serde_json::to_vec(&gql_response) {
        Ok(out) => out,
        Err(e) => {
            error!("Failed to serialize GraphQL response: {e}");
            return response::internal_server_error();
        }
    };

    debug!(
        "Finished API query in {:.2?} (with {} store calls)",
        before.elapsed(),
        num_calls,
    );

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(out)))
        .unwrap()
}
