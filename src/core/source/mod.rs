//! # Source Module
//!
//! Where items come from, and the feeder that pushes them into the first
//! queue of a run.
//!
//! ## Item files
//! One or more integers per line, separated by whitespace. Blank lines and
//! anything after `#` are ignored.

use crate::core::pipeline::CancellationToken;
use crate::core::queue::{Packet, QueueSender};
use crate::core::signer::Item;
use crate::error::SourceError;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// A finite, ordered supply of items
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSource {
    /// Items given directly
    List(Vec<Item>),
    /// Every integer in `start..end`
    Range { start: Item, end: Item },
    /// Items read from a text file
    File(PathBuf),
}

impl ItemSource {
    /// Materialize the items in source order
    pub fn items(&self) -> Result<Vec<Item>, SourceError> {
        match self {
            ItemSource::List(items) => Ok(items.clone()),
            ItemSource::Range { start, end } => {
                if start > end {
                    return Err(SourceError::InvalidRange {
                        start: *start,
                        end: *end,
                    });
                }
                Ok((*start..*end).collect())
            }
            ItemSource::File(path) => {
                let text = fs::read_to_string(path).map_err(|source| SourceError::Io {
                    path: path.clone(),
                    source,
                })?;
                parse_items(&text)
            }
        }
    }
}

/// Parse the item file format.
pub fn parse_items(text: &str) -> Result<Vec<Item>, SourceError> {
    let mut items = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or_default();
        for token in content.split_whitespace() {
            let item = token.parse::<Item>().map_err(|_| SourceError::InvalidItem {
                line: index + 1,
                value: token.to_string(),
            })?;
            items.push(item);
        }
    }

    Ok(items)
}

/// Push `items` into the first queue of a run, then close it.
///
/// Stops early on cancellation or if the pipeline stops listening.
/// Returns the number of items delivered.
pub fn feed<I>(items: I, sender: QueueSender<Packet<Item>>, token: &CancellationToken) -> usize
where
    I: IntoIterator<Item = Item>,
{
    let mut delivered = 0;
    for item in items {
        if token.is_cancelled() || !sender.send(Ok(item)) {
            break;
        }
        delivered += 1;
    }
    debug!(delivered, "input closed");
    delivered
}
