//! Accept loops over the configured listener surface (spec §6
//! "Listener surface": "TCP on a configured port and/or a Unix-domain
//! socket at a configured path. Both, either, or a default TCP port is
//! accepted depending on what the config and CLI specify.").
//!
//! The original's loop registers each accepted fd with the level-
//! triggered readiness mechanism itself (spec §4.1). `smol::net`'s
//! listeners already do exactly that through the same reactor the rest
//! of this crate's `.await` points rely on, so accepting here is just
//! `incoming().next().await` in a loop, spawning [`crate::client::serve`]
//! per connection onto the shared executor (matching the accept loop in
//! `yuubind::main`).

use std::sync::Arc;

use futures::stream::StreamExt;
use policy_engine::SharedEngine;

/// Binds and serves whichever of TCP / Unix-domain the listener config
/// names, running both concurrently if both are configured. Returns only
/// on a bind error or if every configured listener's accept loop ends
/// (which, for a `TcpListener`/`UnixListener`, only happens on an I/O
/// error accepting — a clean shutdown is driven by the caller dropping
/// the executor, not by this function returning early).
pub async fn serve_listeners(
    ex: Arc<smol::Executor<'static>>,
    port: Option<u16>,
    socketfile: Option<&str>,
    engine: SharedEngine,
) -> anyhow::Result<()> {
    let tcp = async {
        match port {
            Some(port) => serve_tcp(ex.clone(), port, engine.clone()).await,
            None => std::future::pending().await,
        }
    };
    let unix = async {
        match socketfile {
            Some(path) => serve_unix(ex.clone(), path, engine.clone()).await,
            None => std::future::pending().await,
        }
    };
    // Both loops run forever unless one errors; `try_join` short-circuits
    // on the first error, which is exactly the "stop serving on a bind
    // or accept failure" behavior wanted here.
    futures::future::try_join(tcp, unix).await?;
    Ok(())
}

async fn serve_tcp(ex: Arc<smol::Executor<'static>>, port: u16, engine: SharedEngine) -> anyhow::Result<()> {
    let listener = smol::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| anyhow::anyhow!("binding TCP port {}: {}", port, e))?;
    tracing::info!(port, "listening on TCP");
    let mut incoming = listener.incoming();
    while let Some(stream) = incoming.next().await {
        let stream = stream.map_err(|e| anyhow::anyhow!("accepting a TCP connection: {}", e))?;
        let peer = stream.peer_addr().ok();
        let engine = engine.clone();
        ex.spawn(async move {
            if let Err(err) = crate::client::serve(stream, engine).await {
                tracing::warn!(peer = ?peer, error = %err, "connection ended with an error");
            }
        })
        .detach();
    }
    Ok(())
}

#[cfg(unix)]
async fn serve_unix(ex: Arc<smol::Executor<'static>>, path: &str, engine: SharedEngine) -> anyhow::Result<()> {
    let _ = std::fs::remove_file(path);
    let listener = smol::net::unix::UnixListener::bind(path)
        .map_err(|e| anyhow::anyhow!("binding Unix socket {:?}: {}", path, e))?;
    tracing::info!(path, "listening on Unix socket");
    let mut incoming = listener.incoming();
    while let Some(stream) = incoming.next().await {
        let stream = stream.map_err(|e| anyhow::anyhow!("accepting a Unix connection: {}", e))?;
        let engine = engine.clone();
        ex.spawn(async move {
            if let Err(err) = crate::client::serve(stream, engine).await {
                tracing::warn!(error = %err, "connection ended with an error");
            }
        })
        .detach();
    }
    Ok(())
}

#[cfg(not(unix))]
async fn serve_unix(_ex: Arc<smol::Executor<'static>>, path: &str, _engine: SharedEngine) -> anyhow::Result<()> {
    anyhow::bail!("Unix-domain sockets ({:?}) are not supported on this platform", path)
}
