//! Central shared state: the installed store backend, the device session, and
//! the bounded-timeout gateway wrapper.

pub mod session;

use std::{future::Future, sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};
use tokio::time::timeout;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{game_store::GameStore, storage::StorageResult},
    error::ServiceError,
};

pub use self::session::SessionContext;

/// Cheaply clonable handle to [`AppState`].
pub type SharedState = Arc<AppState>;

/// Central application state storing the store backend handle, the session
/// slot, and pending removal confirmations.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    session: RwLock<Option<SessionContext>>,
    removal_tickets: DashMap<Uuid, Uuid>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The core starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            game_store: RwLock::new(None),
            session: RwLock::new(None),
            removal_tickets: DashMap::new(),
            degraded: degraded_tx,
            config,
        })
    }

    /// Construct state with a backend already installed.
    pub fn with_store(config: AppConfig, store: Arc<dyn GameStore>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(false);
        Arc::new(Self {
            game_store: RwLock::new(Some(store)),
            session: RwLock::new(None),
            removal_tickets: DashMap::new(),
            degraded: degraded_tx,
            config,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the game store or fail with [`ServiceError::Degraded`].
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.game_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Run a gateway call under the configured bounded timeout.
    ///
    /// An elapsed timeout surfaces as [`ServiceError::Timeout`] with no side
    /// effect acknowledged; the store remains the single point of truth for
    /// whether the mutation landed.
    pub async fn gateway<T, F>(&self, fut: F) -> Result<T, ServiceError>
    where
        F: Future<Output = StorageResult<T>>,
    {
        match timeout(self.config.gateway_timeout, fut).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(ServiceError::Timeout),
        }
    }

    /// Snapshot of the current session context, if any.
    pub async fn session(&self) -> Option<SessionContext> {
        let guard = self.session.read().await;
        guard.clone()
    }

    /// Install the session produced by a create or join operation.
    pub async fn install_session(&self, session: SessionContext) {
        let mut guard = self.session.write().await;
        *guard = Some(session);
    }

    /// Tear down the session and any pending removal tickets.
    pub async fn clear_session(&self) {
        {
            let mut guard = self.session.write().await;
            guard.take();
        }
        self.removal_tickets.clear();
    }

    /// Current session or [`ServiceError::Unauthorized`] when none is live.
    pub async fn require_session(&self) -> Result<SessionContext, ServiceError> {
        self.session()
            .await
            .ok_or_else(|| ServiceError::Unauthorized("no active game session".into()))
    }

    /// Current session, verified to be the administrator seat.
    pub async fn require_admin(&self) -> Result<SessionContext, ServiceError> {
        let session = self.require_session().await?;
        if !session.is_admin() {
            return Err(ServiceError::Unauthorized(
                "operation reserved for the game administrator".into(),
            ));
        }
        Ok(session)
    }

    /// Registry of pending two-phase removal tickets, keyed by ticket token.
    pub fn removal_tickets(&self) -> &DashMap<Uuid, Uuid> {
        &self.removal_tickets
    }

    /// Update and broadcast the degraded flag when the value changes.
    async fn update_degraded(&self, value: bool) {
        if self.is_degraded().await == value {
            return;
        }

        let _ = self.degraded.send(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::memory::MemoryStore;
    use std::time::Duration;

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded().await);
        assert!(matches!(
            state.require_game_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .install_game_store(Arc::new(MemoryStore::new()))
            .await;
        assert!(!state.is_degraded().await);
        assert!(state.require_game_store().await.is_ok());
    }

    #[tokio::test]
    async fn gateway_timeout_surfaces_as_typed_failure() {
        let config = AppConfig {
            gateway_timeout: Duration::from_millis(10),
            ..AppConfig::default()
        };
        let state = AppState::new(config);
        let result: Result<(), ServiceError> = state
            .gateway(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(ServiceError::Timeout)));
    }

    #[tokio::test]
    async fn admin_guard_rejects_missing_session() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            state.require_admin().await,
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
