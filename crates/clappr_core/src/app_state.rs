//! Application foreground/background monitoring

use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppState {
    Active,
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(pub Uuid);

pub type AppStateCallback = Box<dyn Fn() + Send + Sync>;

type SharedCallback = Arc<dyn Fn() + Send + Sync>;

/// Source of the operating system's application state notifications
pub trait AppStateNotifier: Send + Sync {
    fn subscribe(
        &self,
        did_become_active: AppStateCallback,
        did_enter_background: AppStateCallback,
    ) -> SubscriptionToken;

    fn unsubscribe(&self, token: SubscriptionToken);
}

pub trait AppStateDelegate: Send + Sync {
    fn did_change(&self, state: AppState);
}

/// Relays notifier callbacks to a delegate while monitoring
pub struct AppStateManager {
    notifier: Arc<dyn AppStateNotifier>,
    delegate: Weak<dyn AppStateDelegate>,
    token: Mutex<Option<SubscriptionToken>>,
}

impl AppStateManager {
    pub fn new(notifier: Arc<dyn AppStateNotifier>, delegate: Weak<dyn AppStateDelegate>) -> Self {
        Self {
            notifier,
            delegate,
            token: Mutex::new(None),
        }
    }

    fn relay(&self, state: AppState) -> AppStateCallback {
        let delegate = self.delegate.clone();
        Box::new(move || {
            if let Some(delegate) = delegate.upgrade() {
                debug!("📱 App state changed to {:?}", state);
                delegate.did_change(state);
            }
        })
    }

    pub fn start_monitoring(&self) {
        let mut token = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if token.is_some() {
            return;
        }
        *token = Some(
            self.notifier
                .subscribe(self.relay(AppState::Active), self.relay(AppState::Background)),
        );
    }

    pub fn stop_monitoring(&self) {
        let token = self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = token {
            self.notifier.unsubscribe(token);
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Drop for AppStateManager {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

impl fmt::Debug for AppStateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppStateManager")
            .field("monitoring", &self.is_monitoring())
            .finish()
    }
}

/// Notifier driven by the host calling [`notify`](Self::notify)
#[derive(Default)]
pub struct ManualAppStateNotifier {
    subscribers: DashMap<SubscriptionToken, (SharedCallback, SharedCallback)>,
}

impl ManualAppStateNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self, state: AppState) {
        let callbacks: Vec<SharedCallback> = self
            .subscribers
            .iter()
            .map(|entry| {
                let (active, background) = entry.value();
                match state {
                    AppState::Active => active.clone(),
                    AppState::Background => background.clone(),
                }
            })
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl AppStateNotifier for ManualAppStateNotifier {
    fn subscribe(
        &self,
        did_become_active: AppStateCallback,
        did_enter_background: AppStateCallback,
    ) -> SubscriptionToken {
        let token = SubscriptionToken(Uuid::new_v4());
        self.subscribers.insert(
            token,
            (Arc::from(did_become_active), Arc::from(did_enter_background)),
        );
        token
    }

    fn unsubscribe(&self, token: SubscriptionToken) {
        self.subscribers.remove(&token);
    }
}

impl fmt::Debug for ManualAppStateNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualAppStateNotifier")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        states: Mutex<Vec<AppState>>,
    }

    impl AppStateDelegate for Recorder {
        fn did_change(&self, state: AppState) {
            self.states.lock().unwrap().push(state);
        }
    }

    #[test]
    fn test_relays_while_monitoring() {
        let notifier = Arc::new(ManualAppStateNotifier::new());
        let recorder = Arc::new(Recorder::default());
        let delegate: Arc<dyn AppStateDelegate> = recorder.clone();
        let manager = AppStateManager::new(notifier.clone(), Arc::downgrade(&delegate));

        notifier.notify(AppState::Background);
        manager.start_monitoring();
        manager.start_monitoring();
        assert_eq!(notifier.subscriber_count(), 1);

        notifier.notify(AppState::Background);
        notifier.notify(AppState::Active);
        manager.stop_monitoring();
        notifier.notify(AppState::Background);

        assert_eq!(
            *recorder.states.lock().unwrap(),
            vec![AppState::Background, AppState::Active]
        );
    }

    #[test]
    fn test_drop_unsubscribes() {
        let notifier = Arc::new(ManualAppStateNotifier::new());
        let delegate: Arc<dyn AppStateDelegate> = Arc::new(Recorder::default());
        let manager = AppStateManager::new(notifier.clone(), Arc::downgrade(&delegate));
        manager.start_monitoring();
        assert_eq!(notifier.subscriber_count(), 1);

        drop(manager);
        assert_eq!(notifier.subscriber_count(), 0);
    }
}
