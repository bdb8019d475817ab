use anyhow::{bail, Context, Result};
use guardiangrid_core::{logging, Config};
use guardiangrid_mesh::{ChannelTransport, Envelope, MeshService};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

mod protocol;

use protocol::Reply;

const NODE_PROTOCOL_VERSION: u32 = 1;
const NODE_RUNTIME_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeVersionHandshake {
    version: &'static str,
    runtime_version: u32,
    protocol_version: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--version-json") {
        let handshake = NodeVersionHandshake {
            version: env!("CARGO_PKG_VERSION"),
            runtime_version: NODE_RUNTIME_VERSION,
            protocol_version: NODE_PROTOCOL_VERSION,
        };
        println!("{}", serde_json::to_string(&handshake)?);
        return Ok(());
    }

    let config = match parse_config_path(&args)? {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };
    logging::try_init(&config.logging)?;

    info!(
        node = %config.node.name,
        history_capacity = config.mesh.history_capacity,
        max_pending = ?config.mesh.max_pending_deliveries,
        "GuardianGrid node starting"
    );

    let transport = ChannelTransport::new(config.mesh.event_buffer);
    let events = transport.subscribe();
    let service = MeshService::spawn(config.mesh.clone(), transport)?;

    serve(
        service,
        events,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        config.mesh.event_buffer,
    )
    .await?;
    Ok(())
}

/// Run the command loop until `input` is exhausted, then stop the service.
///
/// Replies and mesh events share `output`, one JSON document per line. Lines
/// that are not UTF-8 or not a valid command get an `error` reply. Returns
/// the writer once every pending line has been flushed.
async fn serve<R, W>(
    service: MeshService,
    events: broadcast::Receiver<Envelope>,
    mut input: R,
    output: W,
    buffer: usize,
) -> Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mesh = service.handle();
    let (out_tx, out_rx) = mpsc::channel::<String>(buffer.max(1));
    let writer = tokio::spawn(write_lines(out_rx, output));
    let forwarder = tokio::spawn(forward_events(events, out_tx.clone()));

    let mut read_error = None;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Reading commands failed");
                read_error = Some(e);
                break;
            }
        }

        let reply = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => protocol::dispatch(&mesh, line.trim_end()).await,
            Err(e) => {
                warn!(error = %e, "Command line is not valid UTF-8");
                Reply::error(e)
            }
        };
        let line = match serde_json::to_string(&reply) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to encode reply");
                continue;
            }
        };
        if out_tx.send(line).await.is_err() {
            warn!("Output closed; stopping command loop");
            break;
        }
    }

    info!("Input closed; shutting down");
    drop(mesh);
    service.shutdown().await;

    // The event channel closes with the engine, which ends the forwarder.
    forwarder.await?;
    drop(out_tx);
    let output = writer.await??;

    match read_error {
        Some(e) => Err(anyhow::Error::new(e).context("reading commands")),
        None => Ok(output),
    }
}

async fn forward_events(mut events: broadcast::Receiver<Envelope>, out: mpsc::Sender<String>) {
    loop {
        match events.recv().await {
            Ok(envelope) => match envelope.to_json_line() {
                Ok(line) => {
                    if out.send(line).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "Failed to encode event"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event output lagging; events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn write_lines<W>(mut lines: mpsc::Receiver<String>, mut output: W) -> std::io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.recv().await {
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(output)
}

fn parse_config_path(args: &[String]) -> Result<Option<PathBuf>> {
    let mut args_iter = args.iter();
    while let Some(arg) = args_iter.next() {
        if arg == "--config" {
            if let Some(path) = args_iter.next() {
                return Ok(Some(PathBuf::from(path)));
            }
            bail!("--config was provided without a path");
        }
    }
    Ok(None)
}
