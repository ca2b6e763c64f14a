//! Widget lifecycle: mount, host-driven transitions, persistence, unmount.
//!
//! A `Widget` owns its payload and view state exclusively; the host bridge is
//! the only shared object. Every failure is converted into a `WidgetNotice`
//! at the boundary where it occurs, so no public operation returns an error.
//!
//! ```text
//!   mount() ──poll──► Ready ──show_routes()/show_weather()──► callTool ──► Ready
//!      │                ▲                                        │
//!      │                └──────────── failure: state kept ◄──────┘
//!      └──no data──► Empty
//!   unmount() from any phase ──► Unmounted (late results ignored)
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::catalog::WidgetKind;
use crate::config::WidgetsConfig;
use crate::errors::{WidgetError, WidgetNotice};
use crate::event_seq::EventStamp;
use crate::host::{HostBridge, HostCapability, ToolPayload};
use crate::model::{Route, ToolOutput, WeatherBundle};
use crate::poller::DataPoller;
use crate::state::{TransitionTicket, ViewStateMachine};
use crate::tools::{RouteQuery, WeatherQuery};
use crate::view_state::{ViewMode, ViewState};

/// Event channel capacity.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Lifecycle phase of one widget instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetPhase {
    /// Waiting for the host to deliver the initial payload.
    Mounting,
    /// Payload delivered; views and actions are live.
    Ready,
    /// Payload never arrived (or was unusable); render the empty state.
    Empty,
    /// Torn down; every late result is dropped.
    Unmounted,
}

/// User-triggerable affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetAction {
    ShowRoutes,
    ShowWeather,
    Back,
}

/// An offered affordance and whether it can be triggered right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionState {
    pub action: WidgetAction,
    /// False while a host call is in flight.
    pub enabled: bool,
}

/// What a user-triggered transition did.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The view moved to this mode and was persisted.
    Applied(ViewMode),
    /// The view did not change; the error is also reflected in `notice()`
    /// when it came from the host.
    Unchanged(WidgetError),
    /// The widget was unmounted before the transition could settle.
    Ignored,
}

/// Broadcast on every observable state change.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetEvent {
    #[serde(flatten)]
    pub stamp: EventStamp,
    pub widget_id: String,
    pub kind: WidgetKind,
    pub phase: WidgetPhase,
    pub mode: ViewMode,
    pub busy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<WidgetNotice>,
}

/// Everything the render layer needs, captured at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetSnapshot {
    pub widget_id: String,
    pub kind: WidgetKind,
    pub phase: WidgetPhase,
    pub output: Option<ToolOutput>,
    pub view: ViewState,
    pub pending: Option<ViewMode>,
    pub notice: Option<WidgetNotice>,
    pub actions: Vec<ActionState>,
}

#[derive(Debug)]
struct Inner {
    phase: WidgetPhase,
    mount_started: bool,
    output: Option<ToolOutput>,
    machine: ViewStateMachine,
    notice: Option<WidgetNotice>,
}

/// One mounted widget instance.
pub struct Widget {
    id: String,
    kind: WidgetKind,
    host: Arc<dyn HostBridge>,
    config: WidgetsConfig,
    inner: Mutex<Inner>,
    cancel: CancellationToken,
    events: broadcast::Sender<WidgetEvent>,
}

impl Widget {
    pub fn new(kind: WidgetKind, host: Arc<dyn HostBridge>, config: WidgetsConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            host,
            config,
            inner: Mutex::new(Inner {
                phase: WidgetPhase::Mounting,
                mount_started: false,
                output: None,
                machine: ViewStateMachine::new(kind),
                notice: None,
            }),
            cancel: CancellationToken::new(),
            events,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self) -> WidgetPhase {
        self.lock().phase
    }

    pub fn view(&self) -> ViewState {
        self.lock().machine.current().clone()
    }

    pub fn output(&self) -> Option<ToolOutput> {
        self.lock().output.clone()
    }

    pub fn notice(&self) -> Option<WidgetNotice> {
        self.lock().notice.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.lock().machine.is_busy()
    }

    /// Wait for the initial payload, then initialize the view (restored from
    /// the host when allowed). Calling it again returns the current phase.
    pub async fn mount(&self) -> WidgetPhase {
        {
            let mut inner = self.lock();
            if inner.mount_started {
                log::debug!("Widget {} already mounted", self.id);
                return inner.phase;
            }
            inner.mount_started = true;
        }

        log::info!("Mounting {} widget {}", self.kind, self.id);
        let poller = DataPoller::new(self.config.poll_policy(self.kind), self.cancel.clone());
        let loaded = poller
            .wait(self.host.as_ref())
            .await
            .and_then(|raw| self.decode_output(raw));

        if self.cancel.is_cancelled() {
            log::debug!("Widget {} unmounted while mounting", self.id);
            return WidgetPhase::Unmounted;
        }

        // Host reads happen before the lock is taken.
        let loaded = loaded.map(|output| (output, self.initial_machine()));

        let mut inner = self.lock();
        if inner.phase == WidgetPhase::Unmounted {
            log::debug!("Widget {} unmounted while mounting", self.id);
            return WidgetPhase::Unmounted;
        }
        match loaded {
            Ok((output, machine)) => {
                inner.machine = machine;
                inner.output = Some(output);
                inner.phase = WidgetPhase::Ready;
                log::info!(
                    "Widget {} ready in {} view",
                    self.id,
                    inner.machine.mode()
                );
            }
            Err(WidgetError::Unmounted) => return WidgetPhase::Unmounted,
            Err(e) => {
                log::warn!("Widget {} has no data: {}", self.id, e);
                inner.notice = Some(e.to_notice());
                inner.phase = WidgetPhase::Empty;
            }
        }
        self.emit(&inner);
        inner.phase
    }

    /// Fetch routes and switch to the routes view.
    pub async fn show_routes(&self) -> TransitionOutcome {
        self.transition(ViewMode::Routes).await
    }

    /// Fetch weather and switch to the weather view.
    pub async fn show_weather(&self) -> TransitionOutcome {
        self.transition(ViewMode::Weather).await
    }

    /// Return to the info view.
    pub fn back(&self) -> TransitionOutcome {
        let mut inner = self.lock();
        if inner.phase == WidgetPhase::Unmounted {
            return TransitionOutcome::Ignored;
        }

        match inner.machine.back() {
            Ok(true) => {
                inner.notice = None;
                self.emit(&inner);
                drop(inner);
                self.persist(&ViewState::Info);
                TransitionOutcome::Applied(ViewMode::Info)
            }
            Ok(false) => TransitionOutcome::Unchanged(WidgetError::InvalidTransition {
                from: ViewMode::Info,
                to: ViewMode::Info,
            }),
            Err(e) => TransitionOutcome::Unchanged(e),
        }
    }

    /// Affordances the render layer should show.
    pub fn actions(&self) -> Vec<ActionState> {
        let inner = self.lock();
        self.actions_for(&inner)
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        let inner = self.lock();
        WidgetSnapshot {
            widget_id: self.id.clone(),
            kind: self.kind,
            phase: inner.phase,
            output: inner.output.clone(),
            view: inner.machine.current().clone(),
            pending: inner.machine.pending(),
            notice: inner.notice.clone(),
            actions: self.actions_for(&inner),
        }
    }

    /// Tear down: stop polling and drop any in-flight result.
    pub fn unmount(&self) {
        self.cancel.cancel();

        let mut inner = self.lock();
        if inner.phase == WidgetPhase::Unmounted {
            return;
        }
        inner.phase = WidgetPhase::Unmounted;
        inner.machine.invalidate_pending();
        log::info!("Unmounted {} widget {}", self.kind, self.id);
        self.emit(&inner);
    }

    async fn transition(&self, target: ViewMode) -> TransitionOutcome {
        let (ticket, tool, args) = {
            let mut inner = self.lock();
            match inner.phase {
                WidgetPhase::Unmounted => return TransitionOutcome::Ignored,
                WidgetPhase::Mounting | WidgetPhase::Empty => {
                    return TransitionOutcome::Unchanged(WidgetError::MissingContext {
                        field: "initial data",
                    })
                }
                WidgetPhase::Ready => {}
            }

            let (tool, args) = match self.request_for(&inner, target) {
                Ok(request) => request,
                Err(e) => {
                    log::debug!("Widget {} cannot show {}: {}", self.id, target, e);
                    return TransitionOutcome::Unchanged(e);
                }
            };
            let ticket = match inner.machine.begin(target) {
                Ok(ticket) => ticket,
                Err(e) => {
                    log::debug!("Widget {} rejected {} transition: {}", self.id, target, e);
                    return TransitionOutcome::Unchanged(e);
                }
            };
            inner.notice = None;
            self.emit(&inner);
            (ticket, tool, args)
        };

        let mut pending = PendingTransition::new(self, ticket);
        log::info!("Widget {} calling {} for {} view", self.id, tool, target);

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.host.call_tool(&tool, args) => Some(result),
        };

        let Some(result) = result.filter(|_| !self.cancel.is_cancelled()) else {
            log::debug!("Ignoring {} result for unmounted widget {}", tool, self.id);
            return TransitionOutcome::Ignored;
        };

        let next = result
            .map_err(|e| WidgetError::ToolCallFailed {
                tool: tool.clone(),
                message: e.to_string(),
            })
            .and_then(|raw| Self::decode_view(target, &tool, raw));

        let mut inner = self.lock();
        if inner.phase == WidgetPhase::Unmounted {
            return TransitionOutcome::Ignored;
        }
        let Some(ticket) = pending.take() else {
            return TransitionOutcome::Ignored;
        };

        let completed = match next {
            Ok(state) => inner.machine.complete(ticket, state).cloned(),
            Err(e) => {
                inner.machine.abort(ticket);
                Err(e)
            }
        };

        let outcome = match completed {
            Ok(state) => {
                log::info!("Widget {} now showing {} view", self.id, target);
                self.emit(&inner);
                drop(inner);
                self.persist(&state);
                return TransitionOutcome::Applied(target);
            }
            Err(e) => e,
        };

        log::warn!(
            "Widget {} tool {} failed, keeping {} view: {}",
            self.id,
            tool,
            inner.machine.mode(),
            outcome
        );
        inner.notice = Some(outcome.to_notice());
        self.emit(&inner);
        TransitionOutcome::Unchanged(outcome)
    }

    /// Tool name and arguments for a transition, or why it is unavailable.
    fn request_for(&self, inner: &Inner, target: ViewMode) -> Result<(String, Value), WidgetError> {
        if !self.kind.supports(target) || target == ViewMode::Info {
            return Err(WidgetError::UnsupportedMode {
                kind: self.kind,
                mode: target,
            });
        }
        if !self.host.capabilities().call_tool {
            return Err(WidgetError::CapabilityMissing(HostCapability::CallTool));
        }

        let output = inner.output.as_ref();
        let route_count = output.and_then(ToolOutput::route_count);
        if target == ViewMode::Routes && route_count == Some(0) {
            return Err(WidgetError::EmptyResult {
                tool: self.config.tools.routes.clone(),
            });
        }

        let missing = WidgetError::MissingContext {
            field: "mountain_name",
        };
        let name = output
            .and_then(ToolOutput::focus_mountain_name)
            .ok_or_else(|| missing.clone())?;

        match target {
            ViewMode::Routes => {
                let mut query = RouteQuery::new(name).ok_or(missing)?;
                if let Some(count) = route_count {
                    query = query.with_limit(i64::from(count));
                }
                Ok((self.config.tools.routes.clone(), query.to_args()))
            }
            _ => {
                let query = WeatherQuery::new(name).ok_or(missing)?;
                Ok((self.config.tools.weather.clone(), query.to_args()))
            }
        }
    }

    fn actions_for(&self, inner: &Inner) -> Vec<ActionState> {
        if inner.phase != WidgetPhase::Ready {
            return Vec::new();
        }

        let enabled = !inner.machine.is_busy();
        match inner.machine.mode() {
            ViewMode::Info => [
                (WidgetAction::ShowRoutes, ViewMode::Routes),
                (WidgetAction::ShowWeather, ViewMode::Weather),
            ]
            .into_iter()
            .filter(|(_, mode)| self.request_for(inner, *mode).is_ok())
            .map(|(action, _)| ActionState { action, enabled })
            .collect(),
            ViewMode::Routes | ViewMode::Weather => vec![ActionState {
                action: WidgetAction::Back,
                enabled,
            }],
        }
    }

    fn initial_machine(&self) -> ViewStateMachine {
        if !self.config.persistence.restore {
            return ViewStateMachine::new(self.kind);
        }
        if !self.host.capabilities().persisted_view_state {
            log::debug!("Host has no persisted view state; starting in info view");
            return ViewStateMachine::new(self.kind);
        }

        let persisted = self.host.persisted_view_state();
        let machine = ViewStateMachine::restored(self.kind, persisted.as_ref());
        if machine.mode() != ViewMode::Info {
            log::info!("Widget {} restored {} view", self.id, machine.mode());
        }
        machine
    }

    fn decode_output(&self, raw: Value) -> Result<ToolOutput, WidgetError> {
        let tool = self.kind.identifier();
        let payload = ToolPayload::normalize(tool, raw)?;
        payload.require(self.kind.payload_key())?;
        ToolOutput::from_payload(self.kind, payload.into_value()).map_err(|e| {
            log::warn!("Undecodable {} payload: {}", tool, e);
            WidgetError::MalformedResult {
                tool: tool.to_string(),
                expected: self.kind.payload_key().to_string(),
            }
        })
    }

    fn decode_view(target: ViewMode, tool: &str, raw: Value) -> Result<ViewState, WidgetError> {
        let payload = ToolPayload::normalize(tool, raw)?;
        let state = match target {
            ViewMode::Routes => ViewState::Routes {
                routes: payload.decode::<Vec<Route>>("routes")?,
            },
            ViewMode::Weather => ViewState::Weather {
                weather: payload.decode::<WeatherBundle>("weather")?,
            },
            ViewMode::Info => ViewState::Info,
        };

        if !state.is_backed() {
            return Err(WidgetError::EmptyResult {
                tool: tool.to_string(),
            });
        }
        Ok(state)
    }

    fn persist(&self, state: &ViewState) {
        if !self.config.persistence.enabled {
            return;
        }
        if !self.host.capabilities().save_view_state {
            log::debug!("Host cannot save view state; skipping");
            return;
        }

        match state.to_value() {
            Ok(value) => self.host.save_view_state(value),
            Err(e) => log::warn!("Failed to serialize {} view state: {}", state.mode(), e),
        }
    }

    fn emit(&self, inner: &Inner) {
        let _ = self.events.send(WidgetEvent {
            stamp: EventStamp::next(),
            widget_id: self.id.clone(),
            kind: self.kind,
            phase: inner.phase,
            mode: inner.machine.mode(),
            busy: inner.machine.is_busy(),
            notice: inner.notice.clone(),
        });
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Widget {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Clears the machine's busy flag if a transition future is dropped midway.
struct PendingTransition<'a> {
    widget: &'a Widget,
    ticket: Option<TransitionTicket>,
}

impl<'a> PendingTransition<'a> {
    fn new(widget: &'a Widget, ticket: TransitionTicket) -> Self {
        Self {
            widget,
            ticket: Some(ticket),
        }
    }

    fn take(&mut self) -> Option<TransitionTicket> {
        self.ticket.take()
    }
}

impl Drop for PendingTransition<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            let mut inner = self.widget.lock();
            if inner.phase == WidgetPhase::Unmounted {
                return;
            }
            inner.machine.abort(ticket);
            self.widget.emit(&inner);
        }
    }
}
