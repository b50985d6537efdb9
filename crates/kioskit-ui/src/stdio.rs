//! Runs a mounted session over a JSON-lines stream.
//!
//! Incoming lines are either host messages for the bridge or input events from
//! the surface. Host-bound operations go out one envelope per line.

use std::io;

use kioskit_bridge::HostChannel;
use log::{debug, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::input::InputEvent;
use crate::session::UiSession;

/// Serve `session` until `incoming` ends.
///
/// `outgoing` is the receiving half of the channel the session's bridge sends on.
///
/// # Errors
/// Returns an error if reading `incoming` or writing `out` fails.
pub async fn serve<R, W>(
    session: &UiSession,
    mut outgoing: mpsc::UnboundedReceiver<HostChannel>,
    incoming: R,
    mut out: W,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = incoming.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => dispatch(session, &line),
                None => break,
            },
            Some(channel) = outgoing.recv() => write_channel(&mut out, channel).await?,
        }
    }

    while let Ok(channel) = outgoing.try_recv() {
        write_channel(&mut out, channel).await?;
    }

    debug!("UI input closed");
    Ok(())
}

fn dispatch(session: &UiSession, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match InputEvent::decode(line) {
        Some(event) => session.input().emit(&event),
        None => session.bridge().deliver_line(line),
    }
}

async fn write_channel<W: AsyncWrite + Unpin>(
    out: &mut W,
    channel: HostChannel,
) -> io::Result<()> {
    let line = match channel.encode() {
        Ok(line) => line,
        Err(error) => {
            warn!("Failed to encode {}: {error}", channel.as_str());
            return Ok(());
        }
    };
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}
