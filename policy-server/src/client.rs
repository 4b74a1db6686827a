//! One accepted connection's whole lifetime (spec §4.1 "client": "an
//! accepted connection with input and output byte buffers and a user
//! callback"; spec §2 "Control flow of one query").
//!
//! The original's client is driven by the event loop's readiness
//! subscription: append to the input buffer on every readable event,
//! scan for `\n\n`, and flip to a write subscription once a reply is
//! queued, flipping back once drained. Using `AsyncRead`/`AsyncWrite`
//! directly here folds all of that into ordinary `.await` points — the
//! executor (`smol`) is the thing now doing the readiness polling the
//! spec describes the loop doing by hand (see DESIGN.md).

use std::sync::Arc;

use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use thiserror::Error;

use policy_engine::{dispatch, FilterContext, SharedEngine};
use policy_message::{find_terminator, Field, Query, Reply};

/// Hard ceiling on how much input may be buffered without a `\n\n`
/// terminator before the connection is dropped (spec §7 "over-budget").
/// Large enough for any legitimate Postfix attribute block (which tops
/// out around a couple hundred bytes per attribute, a few dozen
/// attributes) with ample headroom.
pub const MAX_QUERY_BYTES: usize = 64 * 1024;

const READ_CHUNK: usize = 4 * 1024;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("reading from client: {0}")]
    Read(#[source] std::io::Error),
    #[error("writing to client: {0}")]
    Write(#[source] std::io::Error),
}

/// Drives one accepted connection until the peer closes it or a
/// protocol/budget error forces it closed (spec §7: "malformed protocol
/// input causes the connection to be dropped"). A single connection may
/// carry more than one transaction — Postfix holds the policy socket
/// open across an SMTP session's several `RCPT` queries — so `ctx`
/// persists across iterations and relies on [`FilterContext`]'s own
/// `instance`-keyed reset (spec §3) rather than a fresh context per
/// query.
pub async fn serve<IO>(mut io: IO, engine: SharedEngine) -> Result<(), ClientError>
where
    IO: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut buf = String::new();
    let mut ctx = FilterContext::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let terminator = loop {
            if let Some(pos) = find_terminator(&buf) {
                break pos;
            }
            if buf.len() > MAX_QUERY_BYTES {
                tracing::warn!(buffered = buf.len(), "policy query over budget; dropping connection");
                return Ok(());
            }
            let n = io.read(&mut chunk).await.map_err(ClientError::Read)?;
            if n == 0 {
                // Clean EOF: fine mid-connection, but a partial block left
                // over is the MTA hanging up mid-write, not a protocol we
                // need to salvage (spec §1 Non-goals: no guessing recovery).
                return Ok(());
            }
            match std::str::from_utf8(&chunk[..n]) {
                Ok(s) => buf.push_str(s),
                Err(_) => {
                    tracing::warn!("non-UTF-8 bytes on policy socket; dropping connection");
                    return Ok(());
                }
            }
        };

        let block = buf[..terminator].to_string();
        let mut unknown_keys = Vec::new();
        let query = match Query::parse(&block, &mut unknown_keys) {
            Ok(query) => query,
            Err(err) => {
                tracing::warn!(error = %err, "malformed policy query; dropping connection");
                return Ok(());
            }
        };
        for key in &unknown_keys {
            tracing::trace!(key = %key, "unrecognized attribute, ignoring");
        }
        tracing::trace!(instance = %query.field(Field::Instance), state = %query.protocol_state(), "query received");

        let config = engine.current().await;
        let rendered = match dispatch(&config, &query, &mut ctx).await {
            Ok(result) => {
                tracing::debug!(instance = %query.field(Field::Instance), action = %result.action, "reply");
                let explanation = if config.config.include_explanation {
                    result.explanation.as_deref()
                } else {
                    None
                };
                match explanation {
                    Some(exp) if !exp.is_empty() => Reply::with_explanation(&result.action, exp).render(),
                    _ => Reply::new(&result.action).render(),
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "filter graph aborted this query; dropping connection");
                return Ok(());
            }
        };

        io.write_all(rendered.as_bytes()).await.map_err(ClientError::Write)?;
        io.flush().await.map_err(ClientError::Write)?;

        buf.drain(..terminator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy_filters::SrsCodec;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// An in-memory duplex pipe good enough to drive `serve` without a
    /// real socket: reads come from a fixed input, writes accumulate into
    /// a `Vec<u8>` the test can inspect after the future completes.
    struct MemoryDuplex {
        input: std::io::Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl AsyncRead for MemoryDuplex {
        fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(io::Read::read(&mut self.input, buf))
        }
    }

    impl AsyncWrite for MemoryDuplex {
        fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            self.output.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn test_engine(config_src: &str) -> SharedEngine {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policyd.conf");
        std::fs::write(&path, config_src).unwrap();
        let engine = policy_engine::Engine::load(path, None, None::<Arc<dyn SrsCodec>>).unwrap();
        SharedEngine::new(engine)
    }

    #[test]
    fn one_transaction_gets_one_reply() {
        let engine = test_engine(
            r#"
            port = 10030;
            name = hang_1 {
                type = hang;
                delay_ms = 1;
                pass = postfix:OK;
            };
            entry_point = CONNECT:hang_1;
        "#,
        );
        let io = MemoryDuplex {
            input: io::Cursor::new(b"protocol_state=CONNECT\n\n".to_vec()),
            output: Vec::new(),
        };
        let io = smol::block_on(async move {
            let mut io = io;
            serve(&mut io, engine).await.unwrap();
            io
        });
        assert_eq!(io.output, b"action=OK\n\n");
    }

    #[test]
    fn malformed_query_drops_the_connection_without_a_reply() {
        let engine = test_engine(
            r#"
            port = 10030;
            name = hang_1 {
                type = hang;
                delay_ms = 1;
                pass = postfix:OK;
            };
            entry_point = CONNECT:hang_1;
        "#,
        );
        let io = MemoryDuplex {
            input: io::Cursor::new(b"garbage no equals sign\n\n".to_vec()),
            output: Vec::new(),
        };
        let io = smol::block_on(async move {
            let mut io = io;
            serve(&mut io, engine).await.unwrap();
            io
        });
        assert!(io.output.is_empty());
    }

    #[test]
    fn two_pipelined_transactions_each_get_a_reply() {
        let engine = test_engine(
            r#"
            port = 10030;
            name = hang_1 {
                type = hang;
                delay_ms = 1;
                pass = postfix:OK;
            };
            entry_point = CONNECT:hang_1;
        "#,
        );
        let io = MemoryDuplex {
            input: io::Cursor::new(b"protocol_state=CONNECT\n\nprotocol_state=CONNECT\n\n".to_vec()),
            output: Vec::new(),
        };
        let io = smol::block_on(async move {
            let mut io = io;
            serve(&mut io, engine).await.unwrap();
            io
        });
        assert_eq!(io.output, b"action=OK\n\naction=OK\n\n");
    }
}
