// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;

pub fn output_channel() -> (UnboundedSender<Vec<u8>>, UnboundedReceiver<Vec<u8>>) {
    unbounded_channel()
}

/// Writes every message to `writer` in arrival order until all senders are
/// dropped.
///
/// A write error, e.g. EPIPE once the reader of stdout went away, ends the
/// relay; later messages are then discarded by the senders.
pub fn spawn_relay<W>(
    mut rx: UnboundedReceiver<Vec<u8>>,
    mut writer: W,
) -> JoinHandle<io::Result<()>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            writer.write_all(&data).await?;
            writer.flush().await?;
        }
        Ok(())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_relay_preserves_order_and_stops_on_close() {
        let writer = Builder::new()
            .write(b"first ")
            .write(b"second")
            .write(b"\n")
            .build();
        let (tx, rx) = output_channel();
        let relay = spawn_relay(rx, writer);

        tx.send(b"first ".to_vec()).unwrap();
        tx.send(b"second".to_vec()).unwrap();
        tx.send(b"\n".to_vec()).unwrap();
        drop(tx);

        relay.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_relay_reports_write_error() {
        let writer = Builder::new()
            .write_error(io::Error::from(io::ErrorKind::BrokenPipe))
            .build();
        let (tx, rx) = output_channel();
        let relay = spawn_relay(rx, writer);

        tx.send(b"lost".to_vec()).unwrap();
        drop(tx);

        let err = relay.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
