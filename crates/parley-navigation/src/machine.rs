//! The navigation state machine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parley_catalog::{CatalogLoader, CatalogStatus};
use parley_core::error::DomainError;
use parley_core::event::SessionChange;
use parley_core::scenario::Scenario;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::screen::Screen;

/// Active screen plus the scenario handed to the play screen.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavigationSnapshot {
    /// The active screen.
    pub screen: Screen,
    /// Set only while on [`Screen::Play`].
    pub current_scenario: Option<Scenario>,
}

#[derive(Debug, Default)]
struct NavigationState {
    snapshot: NavigationSnapshot,
    /// Highest login epoch the automatic transition has already consumed.
    handled_login_epoch: u64,
}

struct Shared {
    state: Mutex<NavigationState>,
    snapshots: watch::Sender<NavigationSnapshot>,
    catalog: Option<CatalogLoader>,
}

/// Process-wide navigation state. Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct Navigator {
    shared: Arc<Shared>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    /// Creates a navigator on the welcome screen with no catalog attached.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a navigator that loads `catalog` whenever the scenario list
    /// is entered while the catalog is still idle.
    #[must_use]
    pub fn with_catalog(catalog: CatalogLoader) -> Self {
        Self::build(Some(catalog))
    }

    fn build(catalog: Option<CatalogLoader>) -> Self {
        let (snapshots, _) = watch::channel(NavigationSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(NavigationState::default()),
                snapshots,
                catalog,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NavigationState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current navigation state.
    pub fn snapshot(&self) -> NavigationSnapshot {
        self.lock().snapshot.clone()
    }

    /// Returns the active screen.
    pub fn screen(&self) -> Screen {
        self.lock().snapshot.screen
    }

    /// Returns the selected scenario, if any.
    pub fn current_scenario(&self) -> Option<Scenario> {
        self.lock().snapshot.current_scenario.clone()
    }

    /// Returns a receiver that always holds the latest navigation state.
    pub fn watch(&self) -> watch::Receiver<NavigationSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Welcome -> `ScenarioList` on the user's start action.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` if the call-to-action is not
    /// visible yet or the welcome screen has already been left.
    pub fn start(&self, cta_visible: bool) -> Result<(), DomainError> {
        if !cta_visible {
            return Err(DomainError::InvalidTransition(
                "cannot start before the call-to-action is shown".to_owned(),
            ));
        }
        let mut state = self.lock();
        expect_screen(&state, Screen::Welcome)?;
        self.transition(&mut state, Screen::ScenarioList, None)
    }

    /// Loads the catalog, then leaves the welcome screen.
    ///
    /// The move happens even if the load failed so that the list screen can
    /// show the error. If the welcome screen was left while the load was in
    /// flight, nothing else happens.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` if the call-to-action is not
    /// visible yet or the welcome screen has already been left.
    pub async fn start_guest(
        &self,
        cta_visible: bool,
        catalog: &CatalogLoader,
    ) -> Result<(), DomainError> {
        if !cta_visible {
            return Err(DomainError::InvalidTransition(
                "cannot start before the call-to-action is shown".to_owned(),
            ));
        }
        expect_screen(&self.lock(), Screen::Welcome)?;

        if let Err(error) = catalog.load().await {
            warn!(%error, "guest catalog load failed, showing the list anyway");
        }

        let mut state = self.lock();
        if state.snapshot.screen != Screen::Welcome {
            debug!(screen = %state.snapshot.screen, "welcome already left during guest load");
            return Ok(());
        }
        self.transition(&mut state, Screen::ScenarioList, None)
    }

    /// `ScenarioList` -> Play with `scenario` handed to the play screen.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless on the scenario list.
    pub fn select(&self, scenario: Scenario) -> Result<(), DomainError> {
        let mut state = self.lock();
        expect_screen(&state, Screen::ScenarioList)?;
        info!(scenario_id = %scenario.id, "scenario selected");
        self.transition(&mut state, Screen::Play, Some(scenario))
    }

    /// Play -> `ScenarioList`, clearing the selection. Returns the scenario
    /// that was being played.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless on the play screen.
    pub fn exit_to_list(&self) -> Result<Option<Scenario>, DomainError> {
        let mut state = self.lock();
        expect_screen(&state, Screen::Play)?;
        let previous = state.snapshot.current_scenario.take();
        self.transition(&mut state, Screen::ScenarioList, None)?;
        Ok(previous)
    }

    /// Applies the automatic Welcome -> `ScenarioList` rule to a session
    /// change. Returns true if the screen changed.
    ///
    /// The rule fires only for a resolved, authenticated session, only on
    /// the welcome screen, and at most once per login epoch. An epoch seen
    /// while on another screen is consumed as well.
    pub fn on_session_change(&self, change: &SessionChange) -> bool {
        if !change.snapshot.is_authenticated() {
            return false;
        }
        let mut state = self.lock();
        if change.login_epoch <= state.handled_login_epoch {
            debug!(login_epoch = change.login_epoch, "login already handled");
            return false;
        }
        state.handled_login_epoch = change.login_epoch;
        if state.snapshot.screen != Screen::Welcome {
            return false;
        }
        info!(login_epoch = change.login_epoch, "signed in on welcome, advancing");
        self.transition(&mut state, Screen::ScenarioList, None).is_ok()
    }

    fn transition(
        &self,
        state: &mut NavigationState,
        to: Screen,
        scenario: Option<Scenario>,
    ) -> Result<(), DomainError> {
        let from = state.snapshot.screen;
        if !from.can_move_to(to) {
            return Err(DomainError::InvalidTransition(format!(
                "cannot move from {from} to {to}"
            )));
        }
        state.snapshot = NavigationSnapshot {
            screen: to,
            current_scenario: scenario,
        };
        self.shared.snapshots.send_replace(state.snapshot.clone());
        info!(%from, %to, "screen changed");

        if to == Screen::ScenarioList {
            self.fetch_on_entry();
        }
        Ok(())
    }

    /// The list screen fetches on entry when nothing has been loaded yet.
    fn fetch_on_entry(&self) {
        let Some(catalog) = &self.shared.catalog else {
            return;
        };
        if catalog.state().status != CatalogStatus::Idle {
            return;
        }
        let catalog = catalog.clone();
        tokio::spawn(async move {
            if let Err(error) = catalog.load().await {
                warn!(%error, "catalog load on list entry failed");
            }
        });
    }
}

fn expect_screen(state: &NavigationState, expected: Screen) -> Result<(), DomainError> {
    if state.snapshot.screen == expected {
        Ok(())
    } else {
        Err(DomainError::InvalidTransition(format!(
            "expected to be on {expected}, but on {}",
            state.snapshot.screen
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parley_catalog::{CatalogConfig, CatalogStatus};
    use parley_core::event::{SessionChangeKind, SessionSnapshot};
    use parley_core::identity::Identity;
    use parley_core::transport::CatalogRoute;
    use parley_test_support::{ManualClock, ScriptedCatalogTransport, fixed_now};

    use super::*;

    fn signed_in(login_epoch: u64) -> SessionChange {
        SessionChange {
            kind: SessionChangeKind::Resolved,
            snapshot: SessionSnapshot {
                identity: Some(Identity::new("google:1", "Ada")),
                resolving: false,
            },
            login_epoch,
            occurred_at: fixed_now(),
        }
    }

    fn scenario(id: &str) -> Scenario {
        Scenario::new(id, format!("Scenario {id}"), "story")
    }

    fn loader(transport: Arc<ScriptedCatalogTransport>) -> CatalogLoader {
        CatalogLoader::new(transport, Arc::new(ManualClock::new()), CatalogConfig::default())
    }

    #[test]
    fn test_new_navigator_is_on_welcome_without_selection() {
        let navigator = Navigator::new();

        assert_eq!(navigator.screen(), Screen::Welcome);
        assert_eq!(navigator.current_scenario(), None);
    }

    #[test]
    fn test_start_requires_visible_cta() {
        // Arrange
        let navigator = Navigator::new();

        // Act
        let result = navigator.start(false);

        // Assert
        assert!(matches!(result, Err(DomainError::InvalidTransition(_))));
        assert_eq!(navigator.screen(), Screen::Welcome);
    }

    #[test]
    fn test_full_cycle_welcome_list_play_list() {
        // Arrange
        let navigator = Navigator::new();

        // Act
        navigator.start(true).unwrap();
        navigator.select(scenario("a")).unwrap();
        let on_play = navigator.snapshot();
        let exited = navigator.exit_to_list().unwrap();

        // Assert
        assert_eq!(on_play.screen, Screen::Play);
        assert_eq!(on_play.current_scenario, Some(scenario("a")));
        assert_eq!(exited, Some(scenario("a")));
        assert_eq!(navigator.screen(), Screen::ScenarioList);
        assert_eq!(navigator.current_scenario(), None);
    }

    #[test]
    fn test_illegal_requests_are_rejected_without_state_change() {
        // Arrange
        let navigator = Navigator::new();

        // Act & Assert
        assert!(navigator.select(scenario("a")).is_err());
        assert!(navigator.exit_to_list().is_err());
        navigator.start(true).unwrap();
        assert!(navigator.start(true).is_err());
        assert!(navigator.exit_to_list().is_err());
        navigator.select(scenario("a")).unwrap();
        assert!(navigator.select(scenario("b")).is_err());
        assert_eq!(navigator.current_scenario(), Some(scenario("a")));
    }

    #[test]
    fn test_authenticated_session_on_welcome_advances_once() {
        // Arrange
        let navigator = Navigator::new();
        let change = signed_in(1);

        // Act
        let first = navigator.on_session_change(&change);
        let second = navigator.on_session_change(&change);

        // Assert
        assert!(first);
        assert!(!second);
        assert_eq!(navigator.screen(), Screen::ScenarioList);
    }

    #[test]
    fn test_second_identical_update_does_not_refire_after_moving_on() {
        // Arrange
        let navigator = Navigator::new();
        navigator.on_session_change(&signed_in(1));
        navigator.select(scenario("a")).unwrap();

        // Act
        let refired = navigator.on_session_change(&signed_in(1));

        // Assert
        assert!(!refired);
        assert_eq!(navigator.screen(), Screen::Play);
    }

    #[test]
    fn test_resolving_or_anonymous_sessions_never_advance() {
        // Arrange
        let navigator = Navigator::new();
        let mut resolving = signed_in(1);
        resolving.snapshot.resolving = true;
        let mut anonymous = signed_in(0);
        anonymous.snapshot.identity = None;

        // Act
        let advanced = navigator.on_session_change(&resolving)
            || navigator.on_session_change(&anonymous);

        // Assert
        assert!(!advanced);
        assert_eq!(navigator.screen(), Screen::Welcome);
    }

    #[test]
    fn test_login_epoch_seen_off_welcome_is_consumed() {
        // Arrange
        let navigator = Navigator::new();
        navigator.start(true).unwrap();

        // Act
        let advanced = navigator.on_session_change(&signed_in(3));
        navigator.select(scenario("a")).unwrap();
        navigator.exit_to_list().unwrap();
        let refired = navigator.on_session_change(&signed_in(3));

        // Assert
        assert!(!advanced);
        assert!(!refired);
        assert_eq!(navigator.screen(), Screen::ScenarioList);
    }

    #[tokio::test]
    async fn test_watch_follows_screen_changes() {
        // Arrange
        let navigator = Navigator::new();
        let mut screens = navigator.watch();

        // Act
        navigator.start(true).unwrap();

        // Assert
        assert!(screens.has_changed().unwrap());
        assert_eq!(screens.borrow_and_update().screen, Screen::ScenarioList);
    }

    #[tokio::test]
    async fn test_entering_list_with_idle_catalog_loads_it() {
        // Arrange
        let transport =
            Arc::new(ScriptedCatalogTransport::new().with_primary(Ok(vec![scenario("a")])));
        let catalog = loader(transport.clone());
        let navigator = Navigator::with_catalog(catalog.clone());
        let mut states = catalog.watch();

        // Act
        navigator.start(true).unwrap();
        let state = states
            .wait_for(|state| state.status == CatalogStatus::Ready)
            .await
            .unwrap()
            .clone();

        // Assert
        assert_eq!(state.items.len(), 1);
        assert_eq!(transport.calls(), vec![CatalogRoute::Primary]);
    }

    #[tokio::test]
    async fn test_returning_to_list_with_loaded_catalog_does_not_refetch() {
        // Arrange
        let transport =
            Arc::new(ScriptedCatalogTransport::new().with_primary(Ok(vec![scenario("a")])));
        let catalog = loader(transport.clone());
        catalog.load().await.unwrap();
        let navigator = Navigator::with_catalog(catalog.clone());

        // Act
        navigator.start(true).unwrap();
        navigator.select(scenario("a")).unwrap();
        navigator.exit_to_list().unwrap();
        tokio::task::yield_now().await;

        // Assert
        assert_eq!(transport.call_count(CatalogRoute::Primary), 1);
    }

    #[tokio::test]
    async fn test_start_guest_loads_then_moves_even_on_failure() {
        // Arrange
        let transport = Arc::new(ScriptedCatalogTransport::new());
        let catalog = loader(transport.clone());
        let navigator = Navigator::with_catalog(catalog.clone());

        // Act
        navigator.start_guest(true, &catalog).await.unwrap();

        // Assert
        assert_eq!(navigator.screen(), Screen::ScenarioList);
        assert_eq!(catalog.state().status, CatalogStatus::Failed);
        assert_eq!(
            transport.calls(),
            vec![CatalogRoute::Primary, CatalogRoute::Fallback]
        );
    }

    #[tokio::test]
    async fn test_start_guest_off_welcome_is_rejected_without_loading() {
        // Arrange
        let transport = Arc::new(ScriptedCatalogTransport::new());
        let catalog = loader(transport.clone());
        let navigator = Navigator::new();
        navigator.start(true).unwrap();

        // Act
        let result = navigator.start_guest(true, &catalog).await;

        // Assert
        assert!(matches!(result, Err(DomainError::InvalidTransition(_))));
        assert!(transport.calls().is_empty());
    }
}
