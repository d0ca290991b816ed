//! The HTTP server, handler and routes.
//!
//! This file itself contains fairly little business logic and just sets up the
//! `hyper` server and catches errors. The main logic is in `handlers.rs`.

use bytes::Bytes;
use futures::FutureExt;
use http_body_util::Full;
use hyper::{body::Incoming, header::HeaderValue, service::service_fn};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use std::{
    convert::Infallible,
    fs,
    future::Future,
    net::{IpAddr, SocketAddr},
    os::unix::fs::PermissionsExt,
    panic::AssertUnwindSafe,
    path::PathBuf,
    sync::Arc,
};
use tokio::net::{TcpListener, UnixListener};

use crate::{api, metrics::Metrics, prelude::*, store::Store};
use self::handlers::handle;


mod handlers;
pub(crate) mod response;


/// HTTP server configuration.
#[derive(Debug, Clone, confique::Config)]
pub(crate) struct HttpConfig {
    /// The TCP port the HTTP server should listen on.
    #[config(default = 9000)]
    pub(crate) port: u16,

    /// The bind address to listen on.
    #[config(default = "127.0.0.1")]
    pub(crate) address: IpAddr,

    /// Unix domain socket to listen on. Specifying this will overwrite
    /// the TCP configuration. Example: "/tmp/libris.socket".
    pub(crate) unix_socket: Option<PathBuf>,

    /// Unix domain socket file permissions.
    #[config(default = 0o755)]
    pub(crate) unix_socket_permissions: u32,

    /// Value of the `Access-Control-Allow-Origin` header sent with every
    /// response. Allows browser apps from other origins to use the API. Set
    /// to "" to not send CORS headers at all.
    #[config(default = "*")]
    pub(crate) cors_allowed_origin: String,
}

impl HttpConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        self.cors_header().map(|_| ())
    }

    fn cors_header(&self) -> Result<Option<HeaderValue>> {
        if self.cors_allowed_origin.is_empty() {
            return Ok(None);
        }

        HeaderValue::from_str(&self.cors_allowed_origin)
            .context("`http.cors_allowed_origin` is not a valid header value")
            .map(Some)
    }
}


// Our responses always have the full body in memory.
pub(crate) type Response<T = Full<Bytes>> = hyper::Response<T>;
type Request<T = Incoming> = hyper::Request<T>;


/// Context that the request handler has access to.
struct Context {
    api_root: Arc<api::RootNode>,
    store: Arc<dyn Store>,
    metrics: Metrics,
    cors_origin: Option<HeaderValue>,
}


/// Starts the HTTP server. Returns when the process receives Ctrl+C or if the
/// socket cannot be set up.
pub(crate) async fn serve(
    config: &HttpConfig,
    api_root: api::RootNode,
    store: Arc<dyn Store>,
) -> Result<()> {
    let ctx = Arc::new(Context {
        api_root: Arc::new(api_root),
        store,
        metrics: Metrics::new(),
        cors_origin: config.cors_header()?,
    });

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // The accept loop is the same for TCP and Unix sockets, but the listener
    // and stream types differ. Hence the macro.
    macro_rules! accept_loop {
        ($listener:expr) => {
            loop {
                let stream = tokio::select! {
                    res = $listener.accept() => match res {
                        Ok((stream, _)) => stream,
                        Err(e) => {
                            warn!("Failed to accept connection: {e}");
                            continue;
                        }
                    },
                    _ = &mut shutdown => {
                        info!("Received shutdown signal, stopping HTTP server");
                        break;
                    }
                };

                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        handle_internal_errors(handle(req, Arc::clone(&ctx)))
                    });
                    let res = auto::Builder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                    if let Err(e) = res {
                        debug!("Error serving HTTP connection: {e}");
                    }
                });
            }
        };
    }

    if let Some(unix_socket) = &config.unix_socket {
        if unix_socket.exists() {
            fs::remove_file(unix_socket)?;
        }
        let listener = UnixListener::bind(unix_socket)
            .with_context(|| format!("failed to bind to '{}'", unix_socket.display()))?;
        let permissions = fs::Permissions::from_mode(config.unix_socket_permissions);
        fs::set_permissions(unix_socket, permissions)?;
        info!("Listening on unix://{}", unix_socket.display());
        accept_loop!(listener);
    } else {
        let addr = SocketAddr::new(config.address, config.port);
        let listener = TcpListener::bind(addr).await
            .with_context(|| format!("failed to bind to {addr}"))?;
        info!("Listening on http://{}", listener.local_addr()?);
        accept_loop!(listener);
    }

    Ok(())
}

/// Wraps another future and catches all panics that might occur when polling
/// it. That way we always answer with `500` instead of just closing the
/// connection.
async fn handle_internal_errors(
    future: impl Future<Output = Response>,
) -> Result<Response, Infallible> {
    // `AssertUnwindSafe` says: if the handler panics, the remaining
    // application state is not broken and it's fine to continue.
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(response) => Ok(response),
        Err(panic) => {
            // Panics created by `panic!` carry either `&str` or `String`.
            let msg = panic.downcast_ref::<String>()
                .map(|s| s.as_str())
                .or(panic.downcast_ref::<&str>().copied());

            match msg {
                Some(msg) => error!("INTERNAL SERVER ERROR: HTTP handler panicked: '{}'", msg),
                None => error!("INTERNAL SERVER ERROR: HTTP handler panicked"),
            }

            Ok(response::internal_server_error())
        }
    }
}
