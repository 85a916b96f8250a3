//! Display chunking for completed responses.
//!
//! This is not token streaming. The full response has already arrived; it
//! is cut into fixed-size pieces and emitted with a delay between them.
//! Once started, emission cannot be cancelled except by dropping the
//! receiver.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use aigent_core::{ProviderResponse, Usage};

/// One display fragment. Only the last one carries usage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChunk {
    pub content: String,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Split `text` into pieces of at most `size` characters.
///
/// Splits on `char` boundaries, never inside a code point. A `size` of 0 is
/// treated as 1. Empty input yields no pieces.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

/// Turn a finished response into the chunk sequence a client will see.
/// An empty response still produces one (empty) final chunk.
pub fn chunks_for(response: &ProviderResponse, size: usize) -> Vec<StreamChunk> {
    let mut pieces = chunk_text(&response.content, size);
    if pieces.is_empty() {
        pieces.push(String::new());
    }
    let last = pieces.len() - 1;
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, content)| StreamChunk {
            content,
            is_complete: i == last,
            usage: if i == last { response.usage.clone() } else { None },
        })
        .collect()
}

/// Send `response` as chunks on `tx`, sleeping `delay` between non-final
/// chunks. Returns how many chunks were delivered; stops early if the
/// receiver is gone.
pub async fn emit_chunks(
    response: &ProviderResponse,
    size: usize,
    delay: Duration,
    tx: &mpsc::Sender<StreamChunk>,
) -> usize {
    let mut sent = 0;
    for chunk in chunks_for(response, size) {
        let is_complete = chunk.is_complete;
        if tx.send(chunk).await.is_err() {
            debug!(sent = sent, "chunk receiver dropped");
            break;
        }
        sent += 1;
        if !is_complete && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    sent
}
