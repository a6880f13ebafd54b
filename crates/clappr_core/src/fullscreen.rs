//! Embedded/fullscreen transitions
//!
//! The coordinator moves the player view between its host parent and the
//! presenter's surface. The only asynchronous step is the presenter's
//! completion: it is tagged with the token of the transition that issued it,
//! so a completion that never comes leaves the transition in flight, and a
//! repeated or stale one is ignored.

use crate::view::View;
use clappr_events::{BaseObject, EventBus, EventEmitter, InternalEvent};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FullscreenState {
    #[default]
    Embedded,
    EnteringFullscreen,
    Fullscreen,
    ExitingFullscreen,
}

impl FullscreenState {
    pub fn is_transitioning(self) -> bool {
        matches!(
            self,
            FullscreenState::EnteringFullscreen | FullscreenState::ExitingFullscreen
        )
    }
}

/// Continuation handed to a presenter. May be invoked any number of times.
pub type Completion = Arc<dyn Fn() + Send + Sync>;

/// Host-side collaborator that owns the fullscreen surface
pub trait FullscreenPresenter: Send + Sync {
    /// The view the player is moved into while in fullscreen
    fn surface(&self) -> Arc<View>;

    fn present(&self, completion: Completion);

    fn dismiss(&self, completion: Completion);
}

/// Presenter whose transitions complete synchronously
#[derive(Debug)]
pub struct ImmediatePresenter {
    surface: Arc<View>,
}

impl ImmediatePresenter {
    pub fn new() -> Self {
        Self {
            surface: View::new("fullscreen"),
        }
    }
}

impl Default for ImmediatePresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl FullscreenPresenter for ImmediatePresenter {
    fn surface(&self) -> Arc<View> {
        self.surface.clone()
    }

    fn present(&self, completion: Completion) {
        completion();
    }

    fn dismiss(&self, completion: Completion) {
        completion();
    }
}

#[derive(Default)]
struct Inner {
    state: FullscreenState,
    app_requested: bool,
    token: u64,
    view: Option<Arc<View>>,
    original_parent: Weak<View>,
    presenter: Option<Arc<dyn FullscreenPresenter>>,
}

pub struct FullscreenCoordinator {
    base: BaseObject,
    weak_self: Weak<FullscreenCoordinator>,
    by_app: bool,
    inner: Mutex<Inner>,
}

impl FullscreenCoordinator {
    pub fn new(bus: Arc<EventBus>, by_app: bool) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            base: BaseObject::new(bus),
            weak_self: weak_self.clone(),
            by_app,
            inner: Mutex::new(Inner::default()),
        })
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the view to move around and the presenter that hosts it in fullscreen
    pub fn attach(&self, view: Arc<View>, presenter: Arc<dyn FullscreenPresenter>) {
        let mut inner = self.inner();
        inner.view = Some(view);
        inner.presenter = Some(presenter);
    }

    pub fn is_controlled_by_app(&self) -> bool {
        self.by_app
    }

    pub fn state(&self) -> FullscreenState {
        self.inner().state
    }

    pub fn is_fullscreen(&self) -> bool {
        self.state() == FullscreenState::Fullscreen
    }

    /// Whether the host app was last asked to go fullscreen. Always false
    /// unless fullscreen is app-delegated.
    pub fn is_requested(&self) -> bool {
        self.inner().app_requested
    }

    pub fn set_fullscreen(&self, fullscreen: bool) {
        if self.by_app {
            self.request_from_app(fullscreen);
            return;
        }

        let state = self.state();
        match (state, fullscreen) {
            (FullscreenState::Embedded, true) => self.enter(),
            (FullscreenState::Fullscreen, false) => self.exit(),
            (FullscreenState::Embedded, false) | (FullscreenState::Fullscreen, true) => {}
            (transition, _) => {
                debug!("🖥️ Ignoring fullscreen request while {:?}", transition);
            }
        }
    }

    fn request_from_app(&self, fullscreen: bool) {
        {
            let mut inner = self.inner();
            if inner.app_requested == fullscreen {
                return;
            }
            inner.app_requested = fullscreen;
        }
        let event = if fullscreen {
            InternalEvent::WillEnterFullscreen
        } else {
            InternalEvent::WillExitFullscreen
        };
        self.base.trigger(event, None);
    }

    fn enter(&self) {
        let (view, presenter, token) = {
            let mut inner = self.inner();
            let (Some(view), Some(presenter)) = (inner.view.clone(), inner.presenter.clone()) else {
                warn!("⚠️ Fullscreen requested before the player was attached");
                return;
            };
            inner.state = FullscreenState::EnteringFullscreen;
            inner.token += 1;
            inner.original_parent = view
                .superview()
                .map(|parent| Arc::downgrade(&parent))
                .unwrap_or_default();
            (view, presenter, inner.token)
        };

        self.base.trigger(InternalEvent::WillEnterFullscreen, None);
        presenter.surface().add_subview(&view);
        presenter.present(self.completion(
            token,
            FullscreenState::EnteringFullscreen,
            FullscreenState::Fullscreen,
            InternalEvent::DidEnterFullscreen,
        ));
    }

    fn exit(&self) {
        let (view, presenter, parent, token) = {
            let mut inner = self.inner();
            let (Some(view), Some(presenter)) = (inner.view.clone(), inner.presenter.clone()) else {
                return;
            };
            inner.state = FullscreenState::ExitingFullscreen;
            inner.token += 1;
            (view, presenter, inner.original_parent.upgrade(), inner.token)
        };

        self.base.trigger(InternalEvent::WillExitFullscreen, None);
        match parent {
            Some(parent) => parent.add_subview(&view),
            None => {
                warn!("⚠️ Original parent is gone, leaving the player detached");
                view.remove_from_superview();
            }
        }
        presenter.dismiss(self.completion(
            token,
            FullscreenState::ExitingFullscreen,
            FullscreenState::Embedded,
            InternalEvent::DidExitFullscreen,
        ));
    }

    fn completion(
        &self,
        token: u64,
        from: FullscreenState,
        to: FullscreenState,
        event: InternalEvent,
    ) -> Completion {
        let coordinator = self.weak_self.clone();
        Arc::new(move || {
            if let Some(coordinator) = coordinator.upgrade() {
                coordinator.finish(token, from, to, event);
            }
        })
    }

    fn finish(&self, token: u64, from: FullscreenState, to: FullscreenState, event: InternalEvent) {
        {
            let mut inner = self.inner();
            if inner.token != token || inner.state != from {
                debug!("🖥️ Ignoring stale fullscreen completion {}", token);
                return;
            }
            inner.state = to;
        }
        info!("🖥️ Fullscreen state is now {:?}", to);
        self.base.trigger(event, None);
    }
}

impl EventEmitter for FullscreenCoordinator {
    fn base(&self) -> &BaseObject {
        &self.base
    }
}

impl fmt::Debug for FullscreenCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner();
        f.debug_struct("FullscreenCoordinator")
            .field("state", &inner.state)
            .field("by_app", &self.by_app)
            .field("app_requested", &inner.app_requested)
            .finish()
    }
}
