//! In-memory host bridge.
//!
//! `InMemoryHost` stands in for the embedding application: it can hold back
//! the initial payload for a number of reads or a span of time, answer tool
//! calls from a script (optionally after a delay), and persist view state into
//! a `SessionStore` that outlives the host. Mounting a second widget against a
//! host built from the same store models a remount in the same session.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use super::{HostBridge, HostCallError, HostCapabilities};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Persisted view states for one host session, keyed by widget slot.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    states: Arc<Mutex<HashMap<String, Value>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: &str) -> Option<Value> {
        lock(&self.states).get(slot).cloned()
    }

    pub fn put(&self, slot: &str, state: Value) {
        lock(&self.states).insert(slot.to_string(), state);
    }

    pub fn remove(&self, slot: &str) -> Option<Value> {
        lock(&self.states).remove(slot)
    }

    pub fn len(&self) -> usize {
        lock(&self.states).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One recorded `call_tool` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRecord {
    pub name: String,
    pub args: Value,
}

/// Scripted answer to a tool call.
#[derive(Debug, Clone)]
pub struct ToolResponse {
    result: Result<Value, HostCallError>,
    delay: Duration,
}

impl ToolResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            result: Ok(result),
            delay: Duration::ZERO,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            result: Err(HostCallError::Rejected(message.into())),
            delay: Duration::ZERO,
        }
    }

    /// Resolve only after `delay` has elapsed.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Default)]
enum InitialSlot {
    #[default]
    Empty,
    Ready(Value),
    AfterReads { value: Value, remaining: u32 },
    At { value: Value, ready_at: Instant },
}

/// Controllable host bridge backed by process memory.
#[derive(Debug)]
pub struct InMemoryHost {
    capabilities: HostCapabilities,
    slot: String,
    store: SessionStore,
    initial: Mutex<InitialSlot>,
    initial_reads: Mutex<u32>,
    responses: Mutex<HashMap<String, VecDeque<ToolResponse>>>,
    calls: Mutex<Vec<ToolCallRecord>>,
    saves: Mutex<Vec<Value>>,
}

impl InMemoryHost {
    /// A host with every capability and a fresh session.
    pub fn new() -> Self {
        Self::in_session(SessionStore::new(), "widget")
    }

    /// A host sharing `store` with other hosts; `slot` identifies the widget
    /// whose view state this host persists.
    pub fn in_session(store: SessionStore, slot: impl Into<String>) -> Self {
        Self {
            capabilities: HostCapabilities::all(),
            slot: slot.into(),
            store,
            initial: Mutex::new(InitialSlot::Empty),
            initial_reads: Mutex::new(0),
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            saves: Mutex::new(Vec::new()),
        }
    }

    pub fn with_capabilities(mut self, capabilities: HostCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Initial data is present from the first read.
    pub fn with_initial_data(self, value: Value) -> Self {
        *lock(&self.initial) = InitialSlot::Ready(value);
        self
    }

    /// Initial data appears after `reads` empty reads.
    pub fn with_initial_data_after_reads(self, value: Value, reads: u32) -> Self {
        *lock(&self.initial) = InitialSlot::AfterReads {
            value,
            remaining: reads,
        };
        self
    }

    /// Initial data appears once `delay` has elapsed from now.
    pub fn with_initial_data_after(self, value: Value, delay: Duration) -> Self {
        *lock(&self.initial) = InitialSlot::At {
            value,
            ready_at: Instant::now() + delay,
        };
        self
    }

    /// Queue a response for `tool`. The last queued response repeats.
    pub fn with_tool_response(self, tool: &str, response: ToolResponse) -> Self {
        self.script(tool, response);
        self
    }

    pub fn script(&self, tool: &str, response: ToolResponse) {
        lock(&self.responses)
            .entry(tool.to_string())
            .or_default()
            .push_back(response);
    }

    /// Populate the initial-data slot now.
    pub fn deliver(&self, value: Value) {
        *lock(&self.initial) = InitialSlot::Ready(value);
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn calls(&self) -> Vec<ToolCallRecord> {
        lock(&self.calls).clone()
    }

    pub fn calls_to(&self, tool: &str) -> usize {
        lock(&self.calls).iter().filter(|c| c.name == tool).count()
    }

    /// Every value passed to `save_view_state`, oldest first.
    pub fn saved_states(&self) -> Vec<Value> {
        lock(&self.saves).clone()
    }

    pub fn initial_reads(&self) -> u32 {
        *lock(&self.initial_reads)
    }

    fn next_response(&self, tool: &str) -> Option<ToolResponse> {
        let mut responses = lock(&self.responses);
        let queue = responses.get_mut(tool)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostBridge for InMemoryHost {
    fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    fn initial_data(&self) -> Option<Value> {
        *lock(&self.initial_reads) += 1;

        let mut slot = lock(&self.initial);
        match &mut *slot {
            InitialSlot::Empty => None,
            InitialSlot::Ready(value) => Some(value.clone()),
            InitialSlot::AfterReads { value, remaining } => {
                if *remaining == 0 {
                    let value = value.clone();
                    *slot = InitialSlot::Ready(value.clone());
                    Some(value)
                } else {
                    *remaining -= 1;
                    None
                }
            }
            InitialSlot::At { value, ready_at } => {
                if Instant::now() >= *ready_at {
                    let value = value.clone();
                    *slot = InitialSlot::Ready(value.clone());
                    Some(value)
                } else {
                    None
                }
            }
        }
    }

    async fn call_tool(&self, name: &str, args: Value) -> Result<Value, HostCallError> {
        lock(&self.calls).push(ToolCallRecord {
            name: name.to_string(),
            args,
        });

        let Some(response) = self.next_response(name) else {
            return Err(HostCallError::Rejected(format!(
                "no response scripted for {}",
                name
            )));
        };

        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }
        response.result
    }

    fn save_view_state(&self, state: Value) {
        lock(&self.saves).push(state.clone());
        self.store.put(&self.slot, state);
    }

    fn persisted_view_state(&self) -> Option<Value> {
        self.store.get(&self.slot)
    }
}
