//! Capture ledger hand-off.
//!
//! Captures made by a local human player are pushed into an unbounded channel.
//! Whatever persists them (a contract call, a file) drains the other end; the
//! default consumer logs each record and optionally appends it as a JSON line
//! on the blocking thread pool.

use actix_web::web;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::LobbyResult;
use crate::game::utils::piece_code;
use crate::game::CaptureEvent;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRecord {
    pub move_number: u32,
    pub notation: String,
    pub destination_square: String,
    pub captured_piece_type: String,
}

impl CaptureRecord {
    /// `None` for an event without a captured piece
    pub fn from_event(event: &CaptureEvent) -> Option<Self> {
        let captured = event.record.captured?;
        Some(Self {
            move_number: event.move_number,
            notation: event.record.san.clone(),
            destination_square: event.record.to.to_string(),
            captured_piece_type: piece_code(captured),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CaptureLedger {
    sender: UnboundedSender<CaptureRecord>,
}

impl CaptureLedger {
    pub fn channel() -> (Self, UnboundedReceiver<CaptureRecord>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }

    /// Hand a record to the collaborator. Delivery is best effort; there are no retries.
    pub fn record(&self, record: CaptureRecord) {
        if let Err(e) = self.sender.unbounded_send(record) {
            warn!("Capture ledger is closed, dropping record: {:?}", e.into_inner());
        }
    }
}

fn append_line(path: &Path, record: &CaptureRecord) -> LobbyResult<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", serde_json::to_string(record)?)?;
    Ok(())
}

/// Drain the ledger channel until every sender is gone.
pub async fn run_ledger(mut records: UnboundedReceiver<CaptureRecord>, path: Option<PathBuf>) {
    while let Some(record) = records.next().await {
        info!(
            "Capture #{} {} on {} took {}",
            record.move_number, record.notation, record.destination_square, record.captured_piece_type
        );
        if let Some(path) = &path {
            let target = path.clone();
            match web::block(move || append_line(&target, &record)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Failed to append capture to {}: {}", path.display(), e),
                Err(e) => warn!("Ledger writer for {} did not finish: {}", path.display(), e),
            }
        }
    }
    info!("Capture ledger closed");
}
