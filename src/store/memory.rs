//! In-memory ticket store.
//!
//! Tickets live in a `DashMap` keyed by id. Mutations go through
//! `get_mut`, whose guard locks the ticket's shard for the duration of the
//! read-check-write, so concurrent seat operations on one ticket serialize.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{merge_patch, not_found, sort_for_listing, TicketStore};
use crate::error::AppResult;
use crate::ledger::{apply_seat_change, SeatChange, SeatPolicy};
use crate::models::{NewTicket, Ticket, TicketFilter, TicketPatch};

#[derive(Clone, Default)]
pub struct MemoryTicketStore {
    tickets: Arc<DashMap<Uuid, Ticket>>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list(&self, filter: &TicketFilter) -> AppResult<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .tickets
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        sort_for_listing(&mut tickets);
        Ok(tickets)
    }

    async fn get(&self, id: Uuid) -> AppResult<Ticket> {
        self.tickets
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| not_found(id))
    }

    async fn create(&self, new: NewTicket) -> AppResult<Ticket> {
        let ticket = Ticket::from_new(new, Utc::now());
        self.tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn update(&self, id: Uuid, patch: &TicketPatch) -> AppResult<Ticket> {
        let mut entry = self.tickets.get_mut(&id).ok_or_else(|| not_found(id))?;
        let next = merge_patch(entry.value(), patch, Utc::now())?;
        *entry = next.clone();
        Ok(next)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.tickets
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    async fn adjust_seats(
        &self,
        id: Uuid,
        change: SeatChange,
        policy: SeatPolicy,
    ) -> AppResult<Ticket> {
        let mut entry = self.tickets.get_mut(&id).ok_or_else(|| not_found(id))?;
        let next = apply_seat_change(entry.value(), change, policy, Utc::now())?;
        *entry = next.clone();
        Ok(next)
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.tickets.len() as i64)
    }

    async fn health_check(&self) -> bool {
        true
    }
}
