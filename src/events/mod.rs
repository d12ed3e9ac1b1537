//! # Events Module
//!
//! Event-driven progress reporting for the signing pipeline.
//!
//! ## Design
//! Stages publish lifecycle and per-item events through a channel, so any
//! front end (CLI progress bar, JSON log, test probe) can subscribe without
//! the pipeline knowing about it.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Item(ItemEvent::Collected { collected }) = event {
//!             println!("{collected} items signed");
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(items, &sender)?;
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender, null_sender};
pub use types::*;
