//! The presenter: wires content, history, settings, status and search to
//! the socket server
//!
//! ```text
//!  SocketServer ──on_event──► Presenter ──► load from corpus (blocking pool)
//!                                │
//!                                ├─► Live { ContentState, History }  (one lock)
//!                                │        └─► broadcast changed fields
//!                                ├─► SettingsState ──► personalized settings views
//!                                ├─► StatusBoard
//!                                └─► SearchDispatcher ──► requester only
//! ```
//!
//! Events from one connection are handled in order; events from different
//! connections interleave and the last mutation wins. Content mutations and
//! their broadcasts happen under the same lock, so every client sees changes
//! in the order they were applied. Settings updates and the personalized
//! views they produce are serialized the same way.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::{Mutex, MutexGuard, ReentrantMutex};

use crate::actions;
use crate::content::{self, ContentChanges, ContentState};
use crate::corpus::{query, BaniSummary, Content, SharedCorpus};
use crate::events::{EventEmitter, OpenWindowEvent};
use crate::history::History;
use crate::paths::AppPaths;
use crate::search::SearchDispatcher;
use crate::settings::{GlobalSettingsStore, SettingsState, SettingsUpdate};
use crate::socket_server::{Client, ClientEvent, LineTarget, ServerEvent, SocketHandler, SocketServer};
use crate::status::{StatusBoard, UpdaterEvent};
use crate::Result;

/// Content pointers and the history they feed, guarded together
pub struct Live {
    pub content: ContentState,
    pub history: History,
}

/// Everything the presenter needs at startup
pub struct PresenterOptions {
    pub corpus: SharedCorpus,
    pub global: Arc<GlobalSettingsStore>,
    pub history: History,
    pub paths: AppPaths,
    pub events: EventEmitter,
}

pub struct Presenter {
    server: Arc<SocketServer>,
    corpus: SharedCorpus,
    banis: Vec<BaniSummary>,
    live: Mutex<Live>,
    settings: SettingsState,
    /// Held while settings change and their views go out. Reentrant because
    /// global saves broadcast through the store's subscriber.
    settings_sync: ReentrantMutex<()>,
    status: Arc<StatusBoard>,
    search: Arc<SearchDispatcher>,
    paths: AppPaths,
    events: EventEmitter,
}

impl Presenter {
    /// Read the corpus bounds and Bani list, then build the presenter.
    pub async fn start(server: Arc<SocketServer>, options: PresenterOptions) -> Result<Arc<Self>> {
        let PresenterOptions {
            corpus,
            global,
            history,
            paths,
            events,
        } = options;

        let order_range = query(&corpus, |corpus| corpus.shabad_order_range()).await?;
        let banis = query(&corpus, |corpus| corpus.banis()).await?;
        tracing::info!("Loaded {} banis, shabad order range {:?}", banis.len(), order_range);

        let presenter = Arc::new(Self {
            status: Arc::new(StatusBoard::new(Arc::clone(&server))),
            search: Arc::new(SearchDispatcher::new(Arc::clone(&corpus))),
            live: Mutex::new(Live {
                content: ContentState::new(order_range),
                history,
            }),
            settings: SettingsState::new(Arc::clone(&global)),
            settings_sync: ReentrantMutex::new(()),
            server,
            corpus,
            banis,
            paths,
            events,
        });

        let weak = Arc::downgrade(&presenter);
        global.on_change(move |_| {
            if let Some(presenter) = weak.upgrade() {
                presenter.broadcast_settings();
            }
        });

        Ok(presenter)
    }

    pub fn server(&self) -> &Arc<SocketServer> {
        &self.server
    }

    pub fn settings(&self) -> &SettingsState {
        &self.settings
    }

    pub fn status(&self) -> &Arc<StatusBoard> {
        &self.status
    }

    /// Lock the content state and history
    pub fn live(&self) -> MutexGuard<'_, Live> {
        self.live.lock()
    }

    /// Forward updater progress from the supervisor to the status line.
    pub fn updater_event(&self, event: UpdaterEvent) {
        self.status.updater_event(event, &self.settings.global().get());
    }

    /// Apply a content mutation and broadcast what it changed.
    fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut ContentState, &mut History) -> ContentChanges,
    {
        let mut guard = self.live.lock();
        let live = &mut *guard;
        let changes = f(&mut live.content, &mut live.history);
        self.broadcast_changes(live, changes);
    }

    fn broadcast_changes(&self, live: &Live, changes: ContentChanges) {
        if changes.content {
            self.server
                .broadcast_event(&ClientEvent::Content(live.content.content().cloned()));
        }
        if changes.line {
            self.server
                .broadcast_event(&ClientEvent::Line(live.content.line_id().map(str::to_string)));
        }
        if changes.main_line {
            self.server.broadcast_event(&ClientEvent::TrackerMainLine(
                live.content.main_line_id().map(str::to_string),
            ));
        }
        if changes.next_line {
            self.server.broadcast_event(&ClientEvent::TrackerNextLine(
                live.content.next_line_id().map(str::to_string),
            ));
        }
        if changes.history {
            self.broadcast_history(&live.history);
        }
    }

    fn broadcast_history(&self, history: &History) {
        self.server
            .broadcast_event(&ClientEvent::Transitions(history.transitions()));
        self.server
            .broadcast_event(&ClientEvent::LatestLines(history.latest_lines()));
        self.server
            .broadcast_event(&ClientEvent::ViewedLines(history.current_viewed_lines()));
    }

    /// Send every client its own settings view.
    pub fn broadcast_settings(&self) {
        let _sync = self.settings_sync.lock();
        self.server
            .broadcast(|client| ClientEvent::Settings(self.settings.client_view(&client.host())));
    }

    /// Everything a new connection needs to render the current state
    fn initial_sync(&self, client: &Client) {
        client.send(&ClientEvent::BaniList(self.banis.clone()));

        {
            let live = self.live.lock();
            let content = &live.content;
            client.send(&ClientEvent::Content(content.content().cloned()));
            client.send(&ClientEvent::Line(content.line_id().map(str::to_string)));
            client.send(&ClientEvent::TrackerMainLine(content.main_line_id().map(str::to_string)));
            client.send(&ClientEvent::TrackerNextLine(content.next_line_id().map(str::to_string)));
            client.send(&ClientEvent::Transitions(live.history.transitions()));
            client.send(&ClientEvent::LatestLines(live.history.latest_lines()));
            client.send(&ClientEvent::ViewedLines(live.history.current_viewed_lines()));
        }

        client.send(&ClientEvent::Status(self.status.get()));

        let _sync = self.settings_sync.lock();
        client.send(&ClientEvent::Settings(self.settings.client_view(&client.host())));
    }

    async fn open(&self, loaded: Result<Content>, line_id: Option<String>) {
        match loaded {
            Ok(content) => self.mutate(|state, history| state.open(content, line_id.as_deref(), history)),
            Err(e) => tracing::error!("Unable to open content: {}", e),
        }
    }

    async fn open_by_order_id(&self, order_id: i64) {
        let target = self.live.lock().content.clamp_order_id(order_id);
        let Some(target) = target else {
            tracing::warn!("No shabads available to open order ID {}", order_id);
            return;
        };
        self.open(content::load_shabad_by_order_id(&self.corpus, target).await, None)
            .await;
    }

    async fn open_neighbour(&self, delta: i64) {
        let (current, target) = {
            let live = self.live.lock();
            let current = live.content.content().and_then(Content::order_id);
            (current, live.content.neighbour_order_id(delta))
        };

        match (current, target) {
            (Some(current), Some(target)) if current != target => self.open_by_order_id(target).await,
            (Some(_), _) => tracing::info!("Already at the boundary of the shabads"),
            (None, _) => tracing::debug!("No current shabad to move from"),
        }
    }

    /// Apply a settings update and publish the new views as one step, so the
    /// last view each client receives is always the current one.
    fn apply_settings(&self, client: &Client, update: SettingsUpdate) {
        let _sync = self.settings_sync.lock();
        let change = self.settings.set_settings(&client.host(), update);
        if change != Default::default() {
            self.broadcast_settings();
        }
    }

    fn clear_history(&self) {
        let mut live = self.live.lock();
        live.history.clear();
        self.broadcast_history(&live.history);
    }

    async fn handle(&self, client: Arc<Client>, event: ServerEvent) {
        tracing::debug!(host = %client.host(), "Handling {:?}", event);

        match event {
            ServerEvent::SetShabad(open) => {
                self.open(content::load_shabad(&self.corpus, &open.id).await, open.line_id)
                    .await
            }
            ServerEvent::SetBookmark(open) => {
                self.open(content::load_bani(&self.corpus, open.id).await, open.line_id)
                    .await
            }
            ServerEvent::SetShabadByOrderId(order_id) => self.open_by_order_id(order_id).await,
            ServerEvent::NextShabad => self.open_neighbour(1).await,
            ServerEvent::PreviousShabad => self.open_neighbour(-1).await,
            ServerEvent::SetLine(LineTarget::ById { id: Some(id) }) => {
                self.mutate(|state, history| state.set_line(&id, history))
            }
            ServerEvent::SetLine(LineTarget::ById { id: None }) | ServerEvent::ClearLine => {
                self.mutate(|state, history| state.clear_line(history))
            }
            ServerEvent::SetLine(LineTarget::ByOrderId { order_id }) => {
                self.mutate(|state, history| state.set_line_by_order_id(order_id, history))
            }
            ServerEvent::NextLine => self.mutate(|state, history| state.set_next_line(history)),
            ServerEvent::PreviousLine => self.mutate(|state, history| state.set_previous_line(history)),
            ServerEvent::SetTrackerMainLine(id) => self.mutate(|state, _| state.set_tracker_main_line(&id)),
            ServerEvent::SetTrackerNextLine(id) => self.mutate(|state, _| state.set_tracker_next_line(&id)),
            ServerEvent::ClearHistory => self.clear_history(),
            ServerEvent::Settings(update) => self.apply_settings(&client, update),
            ServerEvent::Search { mode, request } => {
                self.search.dispatch(client, mode, request);
            }
            ServerEvent::OpenOverlayFolder => {
                if let Err(e) = actions::open_folder(&self.paths.user_overlay_themes_dir) {
                    tracing::error!("Unable to open overlay folder: {}", e);
                }
            }
            ServerEvent::OpenLogsFolder => {
                if let Err(e) = actions::open_folder(&self.paths.log_dir) {
                    tracing::error!("Unable to open logs folder: {}", e);
                }
            }
            ServerEvent::OpenWindow => self.events.emit(&OpenWindowEvent {}),
            ServerEvent::OpenExternalUrl(url) => {
                if let Err(e) = actions::open_external_url(&url) {
                    tracing::error!("Unable to open external URL: {}", e);
                }
            }
        }
    }

    async fn disconnected(&self, client: Arc<Client>) {
        let host = client.host();

        {
            let _sync = self.settings_sync.lock();
            if self.server.connections_from(&host) == 0 && self.settings.remove_host(&host) {
                self.broadcast_settings();
            }
        }

        self.status
            .host_disconnected(&host, &self.settings.global().get());
    }
}

impl SocketHandler for Presenter {
    fn on_ready(&self, client: Arc<Client>) -> BoxFuture<'_, ()> {
        async move {
            self.initial_sync(&client);
            self.status
                .host_connected(&client.host(), &self.settings.global().get());
        }
        .boxed()
    }

    fn on_event(&self, client: Arc<Client>, event: ServerEvent) -> BoxFuture<'_, ()> {
        self.handle(client, event).boxed()
    }

    fn on_disconnect(&self, client: Arc<Client>) -> BoxFuture<'_, ()> {
        self.disconnected(client).boxed()
    }
}
