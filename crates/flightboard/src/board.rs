//! The board controller.
//!
//! A [`Board`] owns one session at a time. A session is what a page load is
//! for the original board: the view is reset, the flight table is loaded and
//! sorted, persisted progress is restored, and the periodic tasks are
//! started. When the flight status changes the watcher asks for a reload and
//! the board replaces the whole session.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::animation::{AnimationDriver, DEFAULT_FRAME_PERIOD};
use crate::assets::{AssetBase, LOCAL_HOST};
use crate::fetch::{DataFetcher, FlightStatus};
use crate::progress::{ProgressEngine, ProgressPlan};
use crate::storage::{with_storage, SharedStorage};
use crate::supervisor::{PeriodicTask, Supervisor, TaskKind};
use crate::table::{FlightTable, SortController, DEFAULT_STATUS_COLUMN};
use crate::view::{with_view, ProgressView, SharedView};
use crate::watcher::{FlightChangeWatcher, Observation};

/// How often each periodic task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadences {
    /// Progress refresh.
    pub progress_refresh: Duration,
    /// Flight status poll.
    pub status_poll: Duration,
    /// Table auto-sort.
    pub auto_sort: Duration,
    /// Animation frame period.
    pub animation_frame: Duration,
}

impl Default for Cadences {
    fn default() -> Self {
        Self {
            progress_refresh: Duration::from_secs(2),
            status_poll: Duration::from_secs(20),
            auto_sort: Duration::from_secs(20),
            animation_frame: DEFAULT_FRAME_PERIOD,
        }
    }
}

/// Everything a board needs besides its data source, view and storage.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardOptions {
    /// Task cadences.
    pub cadences: Cadences,
    /// Host the board is served from; selects the image base URL.
    pub host: String,
    /// Image base URLs.
    pub assets: AssetBase,
    /// CSV file holding the flight table, if any.
    pub table_path: Option<PathBuf>,
    /// Column used for the default and automatic sorts.
    pub status_column: usize,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            cadences: Cadences::default(),
            host: LOCAL_HOST.to_string(),
            assets: AssetBase::default(),
            table_path: None,
            status_column: DEFAULT_STATUS_COLUMN,
        }
    }
}

/// Messages from session tasks to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// The flight status changed; the session must be replaced.
    ReloadRequested {
        /// Status before the change.
        from: FlightStatus,
        /// Status after the change.
        to: FlightStatus,
    },
}

/// One page load worth of state.
#[derive(Debug)]
struct Session {
    id: u64,
    supervisor: Supervisor,
}

/// Drives the board across sessions.
#[derive(Debug)]
pub struct Board {
    fetcher: DataFetcher,
    view: SharedView,
    store: SharedStorage,
    options: BoardOptions,
    events_tx: mpsc::Sender<BoardEvent>,
    events_rx: mpsc::Receiver<BoardEvent>,
    session: Option<Session>,
}

impl Board {
    /// Create a board. No session is started until [`Board::start_session`]
    /// or [`Board::run_until`].
    #[must_use]
    pub fn new(
        fetcher: DataFetcher,
        view: SharedView,
        store: SharedStorage,
        options: BoardOptions,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(8);
        Self {
            fetcher,
            view,
            store,
            options,
            events_tx,
            events_rx,
            session: None,
        }
    }

    /// The shared view this board draws on.
    #[must_use]
    pub fn view(&self) -> SharedView {
        self.view.clone()
    }

    /// Identifier of the running session, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Replace the current session with a fresh one.
    pub async fn start_session(&mut self) {
        self.stop_session().await;

        let layout = with_view(&self.view, |v| {
            v.reset();
            v.layout()
        })
        .unwrap_or_default();

        let base_url = self.options.assets.select(&self.options.host).to_string();
        with_view(&self.view, |v| v.rewrite_image_sources(&base_url));

        let sorter = SortController::new(self.options.status_column);
        self.load_table(sorter);

        let mut engine = ProgressEngine::new(
            self.fetcher.clone(),
            self.view.clone(),
            self.store.clone(),
            AnimationDriver::new(self.view.clone(), self.options.cadences.animation_frame),
        );
        let restored = engine.restore().is_some();
        if !restored {
            with_view(&self.view, |v| ProgressPlan::disabled().apply(v));
        }

        let cadences = self.options.cadences;
        let mut supervisor = Supervisor::new();
        supervisor.spawn(ProgressTask { engine, restored }, cadences.progress_refresh);
        supervisor.spawn(
            StatusTask {
                fetcher: self.fetcher.clone(),
                watcher: FlightChangeWatcher::new(),
                events: self.events_tx.clone(),
            },
            cadences.status_poll,
        );
        supervisor.spawn(
            SortTask {
                view: self.view.clone(),
                store: self.store.clone(),
                sorter,
            },
            cadences.auto_sort,
        );

        let id = with_view(&self.view, |v| v.session).unwrap_or_default();
        info!(
            session = id,
            source = self.fetcher.source_name(),
            restored,
            ?layout,
            "Board session started"
        );
        self.session = Some(Session { id, supervisor });
    }

    /// Stop the running session's tasks, if any.
    pub async fn stop_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.supervisor.shutdown().await;
            debug!(session = session.id, "Board session stopped");
        }
    }

    /// Run sessions until `shutdown` resolves, reloading on request.
    pub async fn run_until(&mut self, shutdown: impl Future<Output = ()>) {
        self.start_session().await;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                Some(event) = self.events_rx.recv() => match event {
                    BoardEvent::ReloadRequested { from, to } => {
                        info!(%from, %to, "Reloading board");
                        self.start_session().await;
                    }
                },
            }
        }

        self.stop_session().await;
        info!("Board stopped");
    }

    fn load_table(&self, sorter: SortController) {
        let Some(path) = &self.options.table_path else {
            return;
        };
        let mut table = match FlightTable::load(path) {
            Ok(table) => table,
            Err(e) => {
                warn!(path = %path.display(), "Failed to load flight table: {e}");
                return;
            }
        };
        if let Err(e) = with_storage(&self.store, |s| sorter.restore(&mut table, s)) {
            warn!("Failed to restore table sort: {e}");
        }
        with_view(&self.view, |v| v.table = Some(table));
    }
}

struct ProgressTask {
    engine: ProgressEngine,
    restored: bool,
}

#[async_trait]
impl PeriodicTask for ProgressTask {
    fn kind(&self) -> TaskKind {
        TaskKind::ProgressRefresh
    }

    async fn start(&mut self) {
        let initial = self.engine.resolve_initial().await;
        if self.restored {
            self.engine.refresh_status_text().await;
        }
        if initial.is_enabled() {
            self.engine.update().await;
        }
    }

    async fn tick(&mut self) {
        self.engine.update().await;
    }
}

struct StatusTask {
    fetcher: DataFetcher,
    watcher: FlightChangeWatcher,
    events: mpsc::Sender<BoardEvent>,
}

#[async_trait]
impl PeriodicTask for StatusTask {
    fn kind(&self) -> TaskKind {
        TaskKind::FlightStatus
    }

    async fn tick(&mut self) {
        let status = self.fetcher.flight_status().await;
        if let Observation::Reload { from, to } = self.watcher.observe(status) {
            if self
                .events
                .send(BoardEvent::ReloadRequested { from, to })
                .await
                .is_err()
            {
                warn!("Board is gone, dropping reload request");
            }
        }
    }
}

struct SortTask {
    view: SharedView,
    store: SharedStorage,
    sorter: SortController,
}

#[async_trait]
impl PeriodicTask for SortTask {
    fn kind(&self) -> TaskKind {
        TaskKind::AutoSort
    }

    async fn tick(&mut self) {
        let result = with_view(&self.view, |v| {
            let table = v.table.as_mut()?;
            let outcome = with_storage(&self.store, |s| self.sorter.auto_sort(table, s));
            v.revision += 1;
            Some(outcome)
        })
        .flatten();
        if let Some(Err(e)) = result {
            warn!("Auto-sort failed to persist: {e}");
        }
    }
}
