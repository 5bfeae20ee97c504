//! Append-only event log.

use tracing::debug;

use auction_types::{Event, EventRecord};

use crate::handlers::CallContext;

/// Records emitted by contracts, in emission order.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// Append an event stamped with the call's block.
    pub fn emit(&mut self, ctx: &CallContext, event: Event) {
        debug!(event = event.name(), height = ctx.block_height, "emit");
        let index = self.records.len() as u64;
        self.records.push(EventRecord {
            index,
            block_height: ctx.block_height,
            timestamp: ctx.timestamp,
            event,
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Up to `limit` records starting at `from_index`.
    pub fn since(&self, from_index: u64, limit: usize) -> &[EventRecord] {
        let start = (from_index as usize).min(self.records.len());
        let end = start.saturating_add(limit).min(self.records.len());
        &self.records[start..end]
    }

    pub fn last(&self) -> Option<&Event> {
        self.records.last().map(|r| &r.event)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.records.iter().map(|r| &r.event)
    }
}
