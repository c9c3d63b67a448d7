//! `latchkey-bridge`: host process around the app-lock gate.
//!
//! Reads one JSON command per stdin line, answers with one JSON line on
//! stdout, and runs the auto-lock scheduler in the background. Logs go to
//! a rolling file so stdout stays protocol-only.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod auth_utils;
pub mod commands;
pub mod config;
pub mod logging;
pub mod platform;
pub mod protocol;
pub mod scheduler;
pub mod state;

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::config::BridgeConfig;
use crate::protocol::{parse_request, Response};
use crate::scheduler::AutoLockScheduler;
use crate::state::BridgeState;

/// Answer requests from `reader` until it reaches end of input.
///
/// Blank lines are skipped. Commands run one at a time in arrival order.
///
/// # Errors
///
/// Returns an error only for I/O failures on the streams.
pub async fn serve<R, W>(state: &BridgeState, reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = match parse_request(line) {
            Ok(request) => commands::dispatch(state, request).await,
            Err(error) => {
                tracing::warn!(message = %error.message, "rejected malformed request");
                Response::failure(error)
            }
        };
        writer.write_all(response.to_line().as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

/// Open the configured backends, start the scheduler and serve stdio.
///
/// # Errors
///
/// Fails if the secure store cannot be opened or stdio breaks.
pub async fn run(config: BridgeConfig) -> anyhow::Result<()> {
    let state = BridgeState::from_config(&config)?;

    let scheduler = config
        .auto_lock_interval()
        .map(|every| AutoLockScheduler::start(Arc::clone(&state.gate), every));

    let stdin = BufReader::new(tokio::io::stdin());
    let result = serve(&state, stdin, tokio::io::stdout()).await;

    if let Some(scheduler) = scheduler {
        scheduler.stop();
    }
    tracing::info!("input closed, shutting down");
    result
}
