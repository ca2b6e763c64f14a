//! View state machine.
//!
//! Tracks which sub-view a widget displays and guards transitions so that
//! only one host round-trip can be outstanding at a time.
//!
//! # State Diagram
//!
//! ```text
//!                 ┌──────────────────────┐
//!       back      │         Info         │      back
//!   ┌────────────►│  (default / restore) │◄────────────┐
//!   │             └────┬────────────┬────┘             │
//!   │   get_routes ok  │            │ get_weather ok   │
//!   │   (non-empty)    ▼            ▼ (non-empty)      │
//! ┌─┴──────────────────────┐  ┌─────────────────────────┴┐
//! │        Routes          │  │         Weather          │
//! └────────────────────────┘  └──────────────────────────┘
//! ```
//!
//! A failed or empty tool call leaves the machine exactly where it was.
//! Restoring a persisted state may enter Routes or Weather directly.

use serde_json::Value;

use crate::catalog::WidgetKind;
use crate::errors::WidgetError;
use crate::view_state::{ViewMode, ViewState};

/// Proof that a transition was started; must be completed or aborted.
#[derive(Debug, PartialEq, Eq)]
pub struct TransitionTicket {
    target: ViewMode,
    generation: u64,
}

impl TransitionTicket {
    pub fn target(&self) -> ViewMode {
        self.target
    }
}

/// Per-widget view state machine. Re-entrant for the life of the widget.
#[derive(Debug)]
pub struct ViewStateMachine {
    kind: WidgetKind,
    current: ViewState,
    pending: Option<ViewMode>,
    generation: u64,
}

impl ViewStateMachine {
    /// Create a machine in the default `Info` state.
    pub fn new(kind: WidgetKind) -> Self {
        Self {
            kind,
            current: ViewState::Info,
            pending: None,
            generation: 0,
        }
    }

    /// Create a machine from persisted state, falling back to `Info`.
    pub fn restored(kind: WidgetKind, persisted: Option<&Value>) -> Self {
        Self {
            current: ViewState::restore(persisted, kind.supported_modes()),
            ..Self::new(kind)
        }
    }

    pub fn current(&self) -> &ViewState {
        &self.current
    }

    pub fn mode(&self) -> ViewMode {
        self.current.mode()
    }

    /// Mode a host call is currently fetching data for, if any.
    pub fn pending(&self) -> Option<ViewMode> {
        self.pending
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Check whether a data-fetching transition to `target` may start now.
    pub fn can_begin(&self, target: ViewMode) -> Result<(), WidgetError> {
        if !self.kind.supports(target) {
            return Err(WidgetError::UnsupportedMode {
                kind: self.kind,
                mode: target,
            });
        }

        if let Some(pending) = self.pending {
            return Err(WidgetError::TransitionInFlight { pending });
        }

        let from = self.mode();
        if !Self::is_valid_transition(from, target) || target == ViewMode::Info {
            return Err(WidgetError::InvalidTransition { from, to: target });
        }

        Ok(())
    }

    /// Start a data-fetching transition. Marks the machine busy.
    pub fn begin(&mut self, target: ViewMode) -> Result<TransitionTicket, WidgetError> {
        self.can_begin(target)?;
        self.pending = Some(target);
        self.generation += 1;
        Ok(TransitionTicket {
            target,
            generation: self.generation,
        })
    }

    /// Finish a transition with the fetched state.
    ///
    /// The new state must match the ticket's mode and be backed by data;
    /// otherwise the machine stays where it was.
    pub fn complete(
        &mut self,
        ticket: TransitionTicket,
        next: ViewState,
    ) -> Result<&ViewState, WidgetError> {
        if !self.owns(&ticket) {
            return Err(WidgetError::InvalidTransition {
                from: self.mode(),
                to: ticket.target,
            });
        }
        self.pending = None;

        if next.mode() != ticket.target || !next.is_backed() {
            return Err(WidgetError::InvalidTransition {
                from: self.mode(),
                to: next.mode(),
            });
        }

        self.current = next;
        Ok(&self.current)
    }

    /// Give up on a transition; the current state is left untouched.
    pub fn abort(&mut self, ticket: TransitionTicket) {
        if self.owns(&ticket) {
            self.pending = None;
        }
    }

    /// Return to `Info` from a sub-view.
    ///
    /// Returns `Ok(false)` when already on `Info`.
    pub fn back(&mut self) -> Result<bool, WidgetError> {
        if let Some(pending) = self.pending {
            return Err(WidgetError::TransitionInFlight { pending });
        }
        if self.mode() == ViewMode::Info {
            return Ok(false);
        }
        self.current = ViewState::Info;
        Ok(true)
    }

    /// Drop any outstanding ticket so a late completion cannot apply.
    pub fn invalidate_pending(&mut self) {
        self.pending = None;
        self.generation += 1;
    }

    fn owns(&self, ticket: &TransitionTicket) -> bool {
        self.pending == Some(ticket.target) && self.generation == ticket.generation
    }

    fn is_valid_transition(from: ViewMode, to: ViewMode) -> bool {
        use ViewMode::*;

        matches!(
            (from, to),
            (Info, Routes) | (Info, Weather) | (Routes, Info) | (Weather, Info)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Route, WeatherBundle, WeatherPeriod};
    use serde_json::json;

    fn routes_state() -> ViewState {
        ViewState::Routes {
            routes: vec![Route {
                route_name: Some("Northeast Ridge".to_string()),
                ..Default::default()
            }],
        }
    }

    fn weather_state() -> ViewState {
        ViewState::Weather {
            weather: WeatherBundle {
                forecast: vec![WeatherPeriod {
                    name: Some("Today".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_initial_state_is_info() {
        let machine = ViewStateMachine::new(WidgetKind::MountainInfo);
        assert_eq!(machine.current(), &ViewState::Info);
        assert!(!machine.is_busy());
    }

    #[test]
    fn test_info_to_routes() {
        let mut machine = ViewStateMachine::new(WidgetKind::MountainInfo);
        let ticket = machine.begin(ViewMode::Routes).unwrap();
        assert!(machine.is_busy());
        assert_eq!(machine.pending(), Some(ViewMode::Routes));

        machine.complete(ticket, routes_state()).unwrap();
        assert_eq!(machine.mode(), ViewMode::Routes);
        assert!(!machine.is_busy());
    }

    #[test]
    fn test_info_to_weather_and_back() {
        let mut machine = ViewStateMachine::new(WidgetKind::MountainInfo);
        let ticket = machine.begin(ViewMode::Weather).unwrap();
        machine.complete(ticket, weather_state()).unwrap();
        assert_eq!(machine.mode(), ViewMode::Weather);

        assert!(machine.back().unwrap());
        assert_eq!(machine.current(), &ViewState::Info);
        assert!(!machine.back().unwrap());
    }

    #[test]
    fn test_second_transition_rejected_while_busy() {
        let mut machine = ViewStateMachine::new(WidgetKind::MountainInfo);
        let _ticket = machine.begin(ViewMode::Routes).unwrap();

        let err = machine.begin(ViewMode::Weather).unwrap_err();
        assert_eq!(
            err,
            WidgetError::TransitionInFlight {
                pending: ViewMode::Routes
            }
        );
        assert!(matches!(
            machine.back(),
            Err(WidgetError::TransitionInFlight { .. })
        ));
    }

    #[test]
    fn test_abort_preserves_state() {
        let mut machine = ViewStateMachine::new(WidgetKind::MountainInfo);
        let before = machine.current().clone();

        let ticket = machine.begin(ViewMode::Routes).unwrap();
        machine.abort(ticket);

        assert_eq!(machine.current(), &before);
        assert!(!machine.is_busy());
    }

    #[test]
    fn test_routes_to_weather_requires_back() {
        let mut machine = ViewStateMachine::new(WidgetKind::MountainInfo);
        let ticket = machine.begin(ViewMode::Routes).unwrap();
        machine.complete(ticket, routes_state()).unwrap();

        let err = machine.begin(ViewMode::Weather).unwrap_err();
        assert_eq!(
            err,
            WidgetError::InvalidTransition {
                from: ViewMode::Routes,
                to: ViewMode::Weather
            }
        );
    }

    #[test]
    fn test_unsupported_mode_rejected() {
        let mut machine = ViewStateMachine::new(WidgetKind::RouteList);
        assert!(matches!(
            machine.begin(ViewMode::Weather),
            Err(WidgetError::UnsupportedMode { .. })
        ));
    }

    #[test]
    fn test_begin_info_is_not_a_fetch() {
        let mut machine = ViewStateMachine::new(WidgetKind::MountainInfo);
        assert!(matches!(
            machine.begin(ViewMode::Info),
            Err(WidgetError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_complete_with_wrong_mode_keeps_state() {
        let mut machine = ViewStateMachine::new(WidgetKind::MountainInfo);
        let ticket = machine.begin(ViewMode::Routes).unwrap();
        assert!(machine.complete(ticket, weather_state()).is_err());
        assert_eq!(machine.current(), &ViewState::Info);
        assert!(!machine.is_busy());
    }

    #[test]
    fn test_complete_with_empty_data_keeps_state() {
        let mut machine = ViewStateMachine::new(WidgetKind::MountainInfo);
        let ticket = machine.begin(ViewMode::Routes).unwrap();
        let empty = ViewState::Routes { routes: Vec::new() };
        assert!(machine.complete(ticket, empty).is_err());
        assert_eq!(machine.current(), &ViewState::Info);
    }

    #[test]
    fn test_invalidated_ticket_cannot_complete() {
        let mut machine = ViewStateMachine::new(WidgetKind::MountainInfo);
        let ticket = machine.begin(ViewMode::Routes).unwrap();
        machine.invalidate_pending();

        assert!(machine.complete(ticket, routes_state()).is_err());
        assert_eq!(machine.current(), &ViewState::Info);
    }

    #[test]
    fn test_restored_into_routes() {
        let persisted = json!({"mode": "routes", "routes": [{"route_name": "Northeast Ridge"}]});
        let machine = ViewStateMachine::restored(WidgetKind::MountainInfo, Some(&persisted));
        assert_eq!(machine.current(), &routes_state());
    }

    #[test]
    fn test_restored_unsupported_falls_back() {
        let persisted = json!({"mode": "routes", "routes": [{"route_name": "Northeast Ridge"}]});
        let machine = ViewStateMachine::restored(WidgetKind::WeatherCarousel, Some(&persisted));
        assert_eq!(machine.current(), &ViewState::Info);
    }

    #[test]
    fn test_same_mode_is_not_a_transition() {
        assert!(!ViewStateMachine::is_valid_transition(
            ViewMode::Info,
            ViewMode::Info
        ));
        assert!(!ViewStateMachine::is_valid_transition(
            ViewMode::Weather,
            ViewMode::Routes
        ));
    }

    #[test]
    fn test_routes_to_routes_rejected() {
        let mut machine = ViewStateMachine::new(WidgetKind::MountainInfo);
        let ticket = machine.begin(ViewMode::Routes).unwrap();
        machine.complete(ticket, routes_state()).unwrap();

        let err = machine.begin(ViewMode::Routes).unwrap_err();
        assert_eq!(
            err,
            WidgetError::InvalidTransition {
                from: ViewMode::Routes,
                to: ViewMode::Routes
            }
        );
        assert_eq!(machine.current(), &routes_state());
        assert!(!machine.is_busy());
    }
}
