//! HTTP server for the Waypost API

use http_body_util::Full;
use hyper::service::service_fn;
use hyper::Response;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use waypost_core::auth::TokenSigner;
use waypost_engine::{AccountService, PasswordPool, PlaceService, Store};

use crate::handlers::handle_request;
use crate::uploads::ImageStore;

/// Everything a request handler needs, wired once at startup.
pub struct AppContext {
    pub places: PlaceService,
    pub accounts: AccountService,
    pub signer: TokenSigner,
    pub images: Arc<dyn ImageStore>,
}

impl AppContext {
    pub fn new(
        store: Store,
        signer: TokenSigner,
        images: Arc<dyn ImageStore>,
        token_ttl: Duration,
        max_concurrent_hashes: usize,
    ) -> Self {
        let pool = PasswordPool::new(max_concurrent_hashes);
        AppContext {
            places: PlaceService::new(store.clone()),
            accounts: AccountService::new(store, signer.clone(), pool, token_ttl),
            signer,
            images,
        }
    }
}

pub struct WaypostServer {
    ctx: Arc<AppContext>,
}

impl WaypostServer {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub async fn serve(self, addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("waypost server listening on {}", addr);

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            debug!("new connection from {}", remote_addr);

            let ctx = Arc::clone(&self.ctx);
            tokio::spawn(async move {
                Self::handle_connection(stream, ctx, remote_addr).await;
            });
        }
    }

    async fn handle_connection(stream: TcpStream, ctx: Arc<AppContext>, remote_addr: SocketAddr) {
        let io = TokioIo::new(stream);

        let service = service_fn(move |req| {
            let ctx = Arc::clone(&ctx);
            async move { handle_request(req, ctx).await }
        });

        if let Err(err) = auto::Builder::new(TokioExecutor::new())
            .serve_connection(io, service)
            .await
        {
            error!("connection error from {}: {}", remote_addr, err);
        }
    }
}

/// JSON response builder
pub fn json_response(
    status: hyper::StatusCode,
    body: impl Into<String>,
) -> Response<Full<bytes::Bytes>> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .header("server", "waypost/0.1.0")
        .body(Full::new(bytes::Bytes::from(body.into())))
        .unwrap()
}
