//! HTTP/1 accept loop on top of hyper.

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use tokio::net::TcpListener;

use crate::handler::OgpServer;

/// Serve connections from `listener` until `shutdown` completes.
///
/// Each connection runs on its own task; connections still open at shutdown
/// are left to finish on their own.
pub async fn serve(listener: TcpListener, server: OgpServer, shutdown: impl Future<Output = ()>) {
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutting down, no longer accepting connections");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            },
        };

        let server = server.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let server = server.clone();
                async move { Ok::<_, Infallible>(server.handle(req).await) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await {
                tracing::debug!(%peer, error = %e, "connection closed with error");
            }
        });
    }
}
