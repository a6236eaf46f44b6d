//! In-process reactive backend: stores records per owner and pushes a fresh
//! snapshot to every subscriber after each successful mutation.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use shared::{
    domain::{OwnerId, TodoId, TodoRecord},
    error::ApiException,
    protocol::{MutationKind, TodoMutation},
};
use tracing::debug;

use crate::{
    feed::{FeedPublisher, TodoFeed},
    TodoBackend,
};

#[derive(Default)]
struct MemoryState {
    records: Vec<TodoRecord>,
    publishers: HashMap<OwnerId, FeedPublisher>,
    injected_failures: HashMap<MutationKind, VecDeque<ApiException>>,
    requests: Vec<TodoMutation>,
}

impl MemoryState {
    fn snapshot_for(&self, owner_id: &OwnerId) -> Vec<TodoRecord> {
        self.records
            .iter()
            .filter(|record| &record.owner_id == owner_id)
            .cloned()
            .collect()
    }

    fn publish(&self, owner_id: &OwnerId) {
        if let Some(publisher) = self.publishers.get(owner_id) {
            publisher.push(self.snapshot_for(owner_id));
        }
    }

    fn position(&self, id: &TodoId) -> Result<usize, ApiException> {
        self.records
            .iter()
            .position(|record| &record.id == id)
            .ok_or_else(|| ApiException::not_found(format!("todo {id} not found")))
    }

    /// Logs the request and returns the injected failure queued for it, if any.
    fn admit(&mut self, mutation: TodoMutation) -> Result<(), ApiException> {
        let kind = mutation.kind();
        self.requests.push(mutation);
        match self
            .injected_failures
            .get_mut(&kind)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct InMemoryTodoBackend {
    inner: Mutex<MemoryState>,
    latency: Option<Duration>,
}

impl InMemoryTodoBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every mutation by `latency` before it is applied.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            inner: Mutex::default(),
            latency: Some(latency),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a record directly, bypassing the request log.
    pub fn seed(&self, owner_id: &OwnerId, text: &str, is_completed: bool) -> TodoRecord {
        let mut state = self.lock();
        let record = TodoRecord {
            is_completed,
            ..TodoRecord::new(owner_id.clone(), text)
        };
        state.records.push(record.clone());
        state.publish(owner_id);
        record
    }

    /// Makes the next `kind` mutation fail with `err`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, kind: MutationKind, err: ApiException) {
        self.lock()
            .injected_failures
            .entry(kind)
            .or_default()
            .push_back(err);
    }

    /// Every mutation request received so far, including failed ones.
    pub fn requests(&self) -> Vec<TodoMutation> {
        self.lock().requests.clone()
    }

    pub fn records_for(&self, owner_id: &OwnerId) -> Vec<TodoRecord> {
        self.lock().snapshot_for(owner_id)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl TodoBackend for InMemoryTodoBackend {
    async fn create_todo(&self, owner_id: &OwnerId, text: &str) -> Result<TodoId, ApiException> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.admit(TodoMutation::Create {
            owner_id: owner_id.clone(),
            text: text.to_string(),
        })?;

        let record = TodoRecord::new(owner_id.clone(), text);
        let id = record.id.clone();
        state.records.push(record);
        state.publish(owner_id);
        debug!(todo_id = %id, owner_id = %owner_id, "todo created");
        Ok(id)
    }

    async fn toggle_todo(&self, id: &TodoId) -> Result<(), ApiException> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.admit(TodoMutation::Toggle { id: id.clone() })?;

        let index = state.position(id)?;
        let record = &mut state.records[index];
        record.is_completed = !record.is_completed;
        let owner_id = record.owner_id.clone();
        state.publish(&owner_id);
        Ok(())
    }

    async fn update_todo(&self, id: &TodoId, text: &str) -> Result<(), ApiException> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.admit(TodoMutation::Update {
            id: id.clone(),
            text: text.to_string(),
        })?;

        let index = state.position(id)?;
        let record = &mut state.records[index];
        record.text = text.to_string();
        let owner_id = record.owner_id.clone();
        state.publish(&owner_id);
        Ok(())
    }

    async fn delete_todo(&self, id: &TodoId) -> Result<(), ApiException> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.admit(TodoMutation::Delete { id: id.clone() })?;

        let index = state.position(id)?;
        let record = state.records.remove(index);
        state.publish(&record.owner_id);
        debug!(todo_id = %id, "todo deleted");
        Ok(())
    }

    fn subscribe_todos(&self, owner_id: &OwnerId) -> TodoFeed {
        let mut state = self.lock();
        state
            .publishers
            .retain(|_, publisher| publisher.subscriber_count() > 0);
        if let Some(publisher) = state.publishers.get(owner_id) {
            return publisher.subscribe();
        }

        let (publisher, feed) = TodoFeed::channel();
        publisher.push(state.snapshot_for(owner_id));
        state.publishers.insert(owner_id.clone(), publisher);
        feed
    }
}

#[cfg(test)]
#[path = "tests/memory_tests.rs"]
mod tests;
