use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiGateway, DeskApi, HttpTransport, RecordBackend, ReqwestTransport};
use crate::auth::SessionManager;
use crate::config::ClientConfig;
use crate::error::{DeskError, Result};
use crate::model::{User, View};
use crate::notify::Notifier;
use crate::realtime::{EventDispatcher, RealtimeChannel, RealtimeConnector, WebSocketConnector};
use crate::reorder::{ReorderCoordinator, ReorderHandle};
use crate::store::{StoreRegistry, ViewStore};

/// Everything a desk UI needs, wired together.
///
/// Holds no globals: the stores, session and channels are owned here and
/// handed to each component at construction.
pub struct DeskClient {
    config: ClientConfig,
    notifier: Notifier,
    sessions: Arc<SessionManager>,
    api: Arc<DeskApi>,
    stores: StoreRegistry,
    realtime: Arc<RealtimeChannel>,
    reorder: HashMap<View, ReorderHandle>,
}

impl DeskClient {
    /// Client over real HTTP and WebSocket connections.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        reqwest::Url::parse(&config.realtime_url).map_err(|e| {
            DeskError::Config(format!("invalid realtime url {}: {}", config.realtime_url, e))
        })?;
        let transport = Arc::new(ReqwestTransport::new(config.api_base_url.clone())?);
        Ok(Self::new(config, transport, Arc::new(WebSocketConnector)))
    }

    /// Client over the given transports. Must be called inside a tokio
    /// runtime: the reorder coordinators start immediately.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        connector: Arc<dyn RealtimeConnector>,
    ) -> Self {
        let notifier = Notifier::new(config.notice_capacity);
        let stores = StoreRegistry::new(None);

        let sessions = Arc::new(
            SessionManager::new(transport.clone(), notifier.clone())
                .with_listener(Arc::new(stores.clone())),
        );
        let gateway = Arc::new(ApiGateway::new(transport, sessions.clone()));
        let api = Arc::new(DeskApi::new(gateway));
        let backend: Arc<dyn RecordBackend> = api.clone();

        let dispatcher = Arc::new(EventDispatcher::new(
            stores.clone(),
            backend.clone(),
            notifier.clone(),
        ));
        let realtime = Arc::new(RealtimeChannel::new(
            &config,
            api.clone(),
            connector,
            dispatcher,
            notifier.clone(),
        ));

        let reorder = View::ALL
            .into_iter()
            .filter(|view| view.is_reorderable())
            .map(|view| {
                let handle = ReorderCoordinator::spawn(
                    stores.get(view).clone(),
                    backend.clone(),
                    notifier.clone(),
                    config.commit_debounce(),
                );
                (view, handle)
            })
            .collect();

        Self {
            config,
            notifier,
            sessions,
            api,
            stores,
            realtime,
            reorder,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn api(&self) -> &Arc<DeskApi> {
        &self.api
    }

    pub fn stores(&self) -> &StoreRegistry {
        &self.stores
    }

    pub fn store(&self, view: View) -> &ViewStore {
        self.stores.get(view)
    }

    pub fn realtime(&self) -> &Arc<RealtimeChannel> {
        &self.realtime
    }

    /// Reorder actions for `view`, if the view can be reordered.
    pub fn reorder(&self, view: View) -> Option<&ReorderHandle> {
        self.reorder.get(&view)
    }

    /// Log in and scope every store to the user's department.
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let user = self.sessions.login(username, password).await?;
        self.stores.set_department(user.department_id).await;
        Ok(user)
    }

    /// Show another department (for users allowed to see several).
    pub async fn switch_department(&self, department_id: u64) {
        self.stores.set_department(Some(department_id)).await;
    }

    pub async fn logout(&self) {
        self.sessions.logout().await;
    }

    /// Load every view. Returns how many views loaded.
    pub async fn load_all(&self) -> usize {
        self.stores.fetch_all(self.api.as_ref()).await
    }

    pub async fn refresh(&self, view: View) -> Result<usize> {
        self.stores.get(view).fetch(self.api.as_ref()).await
    }

    pub fn start_realtime(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        self.realtime.clone().spawn(shutdown)
    }
}
