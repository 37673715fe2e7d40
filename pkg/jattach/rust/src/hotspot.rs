// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use log::info;
use tokio::net::UnixStream;
use tokio::sync::mpsc::UnboundedSender;

use crate::LOG_TARGET;
use crate::errors::Error;
use crate::listener::{ListenerTarget, PollSchedule, Signaller, ensure_listener};
use crate::protocol::{read_response, send_request};

/// Runs one request/response exchange over the HotSpot attach socket,
/// starting the attach listener first if needed.
///
/// The socket is closed when this returns, whatever the outcome.
pub async fn attach_hotspot<S, A>(
    target: &ListenerTarget<'_>,
    signaller: &S,
    schedule: PollSchedule,
    args: &[A],
    out: &UnboundedSender<Vec<u8>>,
) -> Result<i32, Error>
where
    S: Signaller + ?Sized,
    A: AsRef<str>,
{
    let socket = ensure_listener(target, signaller, schedule).await?;

    let mut stream = UnixStream::connect(&socket).await.map_err(Error::Connect)?;
    info!(target: LOG_TARGET, "connected to the JVM");

    send_request(&mut stream, args).await?;

    let is_load = args.first().is_some_and(|cmd| cmd.as_ref() == "load");
    read_response(&mut stream, is_load, out).await
}
