use crate::api::ApiError;
use crate::api::atera::AteraClient;
use crate::api::atera::agents::AgentsApi;
use crate::common::utils::open_browser;
use crate::common::validation::{validate_api_key, validate_device_id, validate_search_query};
use crate::credentials::CredentialStore;
use crate::devices::pipeline::{self, FolderGroup};
use crate::devices::status::LONG_OFFLINE_THRESHOLD_DAYS;
use crate::devices::{
    DeviceId, DeviceQuery, NormalizedDevice, StatusCounts, StatusFilter, normalize_all,
};
use crate::event::{Event, EventHandler};
use crate::poller::Poller;
use crate::session::{Effect, Session, SessionState};
use crate::tui::Tui;
use crate::ui;
use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::{ListState, TableState};
use secrecy::SecretString;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Popup {
    #[default]
    None,
    Details,
    FolderPicker,
    ConfirmDelete,
    Message(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    pub id: DeviceId,
    pub name: String,
}

#[derive(Debug)]
pub struct App {
    pub should_quit: bool,
    pub client: AteraClient,
    credentials: Box<dyn CredentialStore>,
    pub session: Session,

    // Polling
    pub poll_interval: Duration,
    poller: Option<Poller>,
    poll_generation: u64,
    pub countdown: u64,
    pub is_loading: bool,
    pub last_updated: Option<DateTime<Local>>,

    // Data
    pub devices: Vec<NormalizedDevice>,
    pub folders: Vec<String>,

    // Filters & presentation
    pub query: DeviceQuery,
    pub view_mode: ViewMode,
    pub folder_view: bool,
    pub input_mode: InputMode,
    pub popup: Popup,
    pub selected: usize,
    pub table_state: TableState,
    pub folder_picker_state: ListState,

    // Credential prompt
    pub key_input: String,
    pub pending_delete: Option<PendingDelete>,
}

impl App {
    pub fn new(
        client: AteraClient,
        credentials: Box<dyn CredentialStore>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            should_quit: false,
            client,
            credentials,
            session: Session::default(),

            poll_interval,
            poller: None,
            poll_generation: 0,
            countdown: poll_interval.as_secs(),
            is_loading: false,
            last_updated: None,

            devices: Vec::new(),
            folders: Vec::new(),

            query: DeviceQuery::default(),
            view_mode: ViewMode::default(),
            folder_view: false,
            input_mode: InputMode::default(),
            popup: Popup::None,
            selected: 0,
            table_state: TableState::default(),
            folder_picker_state: ListState::default(),

            key_input: String::new(),
            pending_delete: None,
        }
    }

    pub async fn run(&mut self, tui: &mut Tui, events: &mut EventHandler) -> Result<()> {
        self.restore_session(events.sender());

        while !self.should_quit {
            tui.draw(|f| {
                ui::render(self, f);
            })?;

            let event = events.next().await?;
            self.handle_event(event, events.sender());
        }

        self.stop_polling();
        Ok(())
    }

    /// Resumes with a key set on the client (from the environment) or the
    /// credential store; otherwise the prompt stays up.
    pub fn restore_session(&mut self, tx: UnboundedSender<Event>) {
        if !self.client.has_api_key() {
            match self.credentials.get() {
                Ok(Some(key)) => self.client.set_api_key(key),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "failed to read stored API key"),
            }
        }

        if self.client.has_api_key() {
            info!("resuming with stored API key");
            let effect = self.session.resume();
            self.apply_effect(effect, tx);
        }
    }

    pub fn handle_event(&mut self, event: Event, tx: UnboundedSender<Event>) {
        match event {
            Event::Tick | Event::Mouse(_) | Event::Resize(_, _) => {}
            Event::Key(key) => self.handle_key_event(key, tx),
            Event::PollDue { generation } => {
                if generation == self.poll_generation {
                    self.countdown = self.poll_interval.as_secs();
                    self.fetch_devices(tx);
                }
            }
            Event::CountdownTick { generation } => {
                if generation == self.poll_generation {
                    self.countdown = match self.countdown {
                        0 => self.poll_interval.as_secs(),
                        n => n - 1,
                    };
                }
            }
            Event::DevicesFetched { generation, result } => {
                self.on_devices_fetched(generation, result, tx)
            }
            Event::CredentialValidated { key, result } => {
                self.on_credential_validated(key, result, tx)
            }
            Event::DeviceDeleted { id, name, result } => self.on_device_deleted(id, name, result, tx),
        }
    }

    // ── Derived views ───────────────────────────────────────────────

    /// Devices in display order: filtered and sorted, regrouped by folder
    /// when the folder view is on.
    pub fn visible_devices(&self) -> Vec<&NormalizedDevice> {
        let filtered = pipeline::apply(&self.devices, &self.query);
        if self.folder_view {
            pipeline::group_by_folder(&filtered)
                .into_iter()
                .flat_map(|group| group.devices)
                .collect()
        } else {
            filtered
        }
    }

    pub fn folder_groups(&self) -> Vec<FolderGroup<'_>> {
        let filtered = pipeline::apply(&self.devices, &self.query);
        pipeline::group_by_folder(&filtered)
    }

    pub fn counts(&self) -> StatusCounts {
        StatusCounts::tally(&self.devices)
    }

    pub fn selected_device(&self) -> Option<&NormalizedDevice> {
        self.visible_devices().get(self.selected).copied()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    // ── Polling ─────────────────────────────────────────────────────

    fn start_polling(&mut self, tx: UnboundedSender<Event>) {
        self.poll_generation += 1;
        self.countdown = self.poll_interval.as_secs();
        self.poller = Some(Poller::start(self.poll_interval, self.poll_generation, tx));
    }

    /// Stops both timers. Responses still in flight belong to the old
    /// generation and are dropped when they arrive.
    fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            debug!(generation = poller.generation(), "polling stopped");
        }
        self.poll_generation += 1;
        self.is_loading = false;
    }

    fn fetch_devices(&mut self, tx: UnboundedSender<Event>) {
        self.is_loading = true;
        let client = self.client.clone();
        let generation = self.poll_generation;
        tokio::spawn(async move {
            let result = client
                .fetch_all_agents()
                .await
                .map(|raw| normalize_all(&raw, Utc::now()));
            let _ = tx.send(Event::DevicesFetched { generation, result });
        });
    }

    fn on_devices_fetched(
        &mut self,
        generation: u64,
        result: Result<Vec<NormalizedDevice>, ApiError>,
        tx: UnboundedSender<Event>,
    ) {
        if generation != self.poll_generation {
            debug!(generation, current = self.poll_generation, "discarding stale poll result");
            return;
        }

        self.is_loading = false;
        let effect = self.session.poll_finished(&result);

        if let Ok(devices) = result {
            info!(count = devices.len(), "device list refreshed");
            self.devices = devices;
            self.folders = pipeline::folders(&self.devices);
            self.last_updated = Some(Local::now());
            self.clamp_selection();
        }

        self.apply_effect(effect, tx);
    }

    fn apply_effect(&mut self, effect: Effect, tx: UnboundedSender<Event>) {
        match effect {
            Effect::None => {}
            Effect::StartPolling => self.start_polling(tx),
            Effect::StopPollingAndClearCredential => {
                self.stop_polling();
                self.client.clear_api_key();
                if let Err(e) = self.credentials.clear() {
                    warn!(error = %e, "failed to clear stored API key");
                }
            }
        }
    }

    // ── Credential prompt ───────────────────────────────────────────

    fn submit_credential(&mut self, tx: UnboundedSender<Event>) {
        let candidate = self.key_input.trim().to_string();
        if let Err(e) = validate_api_key(&candidate) {
            self.session.reject_locally(e.to_string());
            return;
        }
        if !self.session.begin_validation() {
            return;
        }

        let client = self.client.clone();
        let key = SecretString::from(candidate);
        tokio::spawn(async move {
            let result = client.validate_api_key(key.clone()).await;
            let _ = tx.send(Event::CredentialValidated { key, result });
        });
    }

    fn on_credential_validated(
        &mut self,
        key: SecretString,
        result: Result<(), ApiError>,
        tx: UnboundedSender<Event>,
    ) {
        let effect = self.session.validation_finished(&result);
        if effect == Effect::StartPolling {
            if let Err(e) = self.credentials.set(&key) {
                warn!(error = %e, "failed to persist API key");
            }
            self.client.set_api_key(key);
            self.key_input.clear();
        }
        self.apply_effect(effect, tx);
    }

    fn change_credential(&mut self, tx: UnboundedSender<Event>) {
        let effect = self.session.clear_credential();
        self.apply_effect(effect, tx);
        // Explicit clear drops the stored key even when nothing was polling.
        self.client.clear_api_key();
        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "failed to clear stored API key");
        }
        // The next key may belong to another account.
        self.devices.clear();
        self.folders.clear();
        self.last_updated = None;
        self.query.folder = None;
        self.reset_selection();
        self.popup = Popup::None;
    }

    // ── Delete ──────────────────────────────────────────────────────

    fn request_delete(&mut self) {
        let Some(device) = self.selected_device() else {
            return;
        };

        if !device.can_offer_delete() {
            self.popup = Popup::Message(format!(
                "\"{}\" can only be deleted after being offline for more than {} days.",
                device.name, LONG_OFFLINE_THRESHOLD_DAYS
            ));
            return;
        }

        self.pending_delete = Some(PendingDelete {
            id: device.id.clone(),
            name: device.name.clone(),
        });
        self.popup = Popup::ConfirmDelete;
    }

    fn confirm_delete(&mut self, tx: UnboundedSender<Event>) {
        let Some(pending) = self.pending_delete.take() else {
            self.popup = Popup::None;
            return;
        };

        let agent_id = match validate_device_id(&pending.id) {
            Ok(id) => id,
            Err(e) => {
                self.popup = Popup::Message(e.to_string());
                return;
            }
        };

        self.popup = Popup::None;
        let client = self.client.clone();
        tokio::spawn(async move {
            let result = client.delete_agent(agent_id).await;
            let _ = tx.send(Event::DeviceDeleted {
                id: pending.id,
                name: pending.name,
                result,
            });
        });
    }

    fn on_device_deleted(
        &mut self,
        id: DeviceId,
        name: String,
        result: Result<(), ApiError>,
        tx: UnboundedSender<Event>,
    ) {
        match result {
            Ok(()) => {
                self.devices.retain(|d| d.id != id);
                self.folders = pipeline::folders(&self.devices);
                self.clamp_selection();
                self.popup = Popup::Message(format!("Successfully deleted device: {name}"));
            }
            Err(e) => {
                warn!(%id, %name, error = %e, "delete failed");
                self.popup = Popup::Message(format!("Failed to delete device \"{name}\": {e}"));
                if e.is_credential_failure() {
                    let effect = self.session.poll_finished::<()>(&Err(e));
                    self.apply_effect(effect, tx);
                }
            }
        }
    }

    // ── Filters ─────────────────────────────────────────────────────

    fn set_status_filter(&mut self, status: StatusFilter) {
        self.query.status = status;
        self.reset_selection();
    }

    fn set_folder_filter(&mut self, folder: Option<String>) {
        self.query.folder = folder;
        self.reset_selection();
    }

    /// Back to the defaults: all devices, no folder, empty search, ungrouped grid.
    pub fn reset_view(&mut self) {
        self.query = DeviceQuery::default();
        self.view_mode = ViewMode::Grid;
        self.folder_view = false;
        self.input_mode = InputMode::Normal;
        self.reset_selection();
    }

    fn reset_selection(&mut self) {
        self.selected = 0;
        self.table_state.select(Some(0));
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_devices().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    fn next_row(&mut self) {
        let len = self.visible_devices().len();
        self.selected = if len == 0 || self.selected + 1 >= len {
            0
        } else {
            self.selected + 1
        };
    }

    fn previous_row(&mut self) {
        let len = self.visible_devices().len();
        self.selected = if self.selected == 0 {
            len.saturating_sub(1)
        } else {
            self.selected - 1
        };
    }

    fn open_folder_picker(&mut self) {
        let position = self
            .query
            .folder
            .as_ref()
            .and_then(|f| self.folders.iter().position(|name| name == f))
            .map_or(0, |i| i + 1);
        self.folder_picker_state.select(Some(position));
        self.popup = Popup::FolderPicker;
    }

    // ── Keys ────────────────────────────────────────────────────────

    fn handle_key_event(&mut self, key: KeyEvent, tx: UnboundedSender<Event>) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.session.state() {
            SessionState::Error { .. } => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                    self.session.acknowledge();
                }
                return;
            }
            SessionState::NoCredential { .. } => {
                self.handle_credential_key(key, tx);
                return;
            }
            SessionState::AwaitingValidation => return,
            SessionState::Polling => {}
        }

        if self.input_mode == InputMode::Search {
            self.handle_search_key(key);
            return;
        }

        match self.popup {
            Popup::None => self.handle_main_key(key, tx),
            Popup::Details => match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => self.popup = Popup::None,
                KeyCode::Char('d') => self.request_delete(),
                KeyCode::Char('o') => self.open_in_atera(),
                _ => {}
            },
            Popup::FolderPicker => self.handle_folder_picker_key(key),
            Popup::ConfirmDelete => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.confirm_delete(tx),
                KeyCode::Char('n') | KeyCode::Esc => {
                    self.pending_delete = None;
                    self.popup = Popup::None;
                }
                _ => {}
            },
            Popup::Message(_) => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                    self.popup = Popup::None;
                }
            }
        }
    }

    fn handle_main_key(&mut self, key: KeyEvent, tx: UnboundedSender<Event>) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down | KeyCode::Right => self.next_row(),
            KeyCode::Char('k') | KeyCode::Up | KeyCode::Left => self.previous_row(),
            KeyCode::Char('1') => self.set_status_filter(StatusFilter::All),
            KeyCode::Char('2') => self.set_status_filter(StatusFilter::Online),
            KeyCode::Char('3') => self.set_status_filter(StatusFilter::Offline),
            KeyCode::Char('/') => self.input_mode = InputMode::Search,
            KeyCode::Char('f') => self.open_folder_picker(),
            KeyCode::Char('v') => {
                self.view_mode = match self.view_mode {
                    ViewMode::Grid => ViewMode::List,
                    ViewMode::List => ViewMode::Grid,
                }
            }
            KeyCode::Char('g') => {
                self.folder_view = !self.folder_view;
                self.reset_selection();
            }
            KeyCode::Char('r') => {
                self.countdown = self.poll_interval.as_secs();
                self.fetch_devices(tx);
            }
            KeyCode::Char('R') => self.reset_view(),
            KeyCode::Enter => {
                if self.selected_device().is_some() {
                    self.popup = Popup::Details;
                }
            }
            KeyCode::Char('d') => self.request_delete(),
            KeyCode::Char('o') => self.open_in_atera(),
            KeyCode::Char('K') => self.change_credential(tx),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.input_mode = InputMode::Normal,
            KeyCode::Esc => {
                self.query.search.clear();
                self.input_mode = InputMode::Normal;
                self.reset_selection();
            }
            KeyCode::Backspace => {
                self.query.search.pop();
                self.reset_selection();
            }
            KeyCode::Char(c) => {
                let mut candidate = self.query.search.clone();
                candidate.push(c);
                if validate_search_query(&candidate).is_ok() {
                    self.query.search = candidate;
                    self.reset_selection();
                }
            }
            _ => {}
        }
    }

    fn handle_folder_picker_key(&mut self, key: KeyEvent) {
        // Entry 0 is "All folders".
        let entries = self.folders.len() + 1;
        let current = self.folder_picker_state.selected().unwrap_or(0);
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.folder_picker_state.select(Some((current + 1) % entries));
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.folder_picker_state
                    .select(Some((current + entries - 1) % entries));
            }
            KeyCode::Enter => {
                let folder = current.checked_sub(1).and_then(|i| self.folders.get(i)).cloned();
                self.set_folder_filter(folder);
                self.popup = Popup::None;
            }
            KeyCode::Esc | KeyCode::Char('q') => self.popup = Popup::None,
            _ => {}
        }
    }

    fn handle_credential_key(&mut self, key: KeyEvent, tx: UnboundedSender<Event>) {
        match key.code {
            KeyCode::Enter => self.submit_credential(tx),
            KeyCode::Esc => self.key_input.clear(),
            KeyCode::Backspace => {
                self.key_input.pop();
            }
            KeyCode::Char(c) if !c.is_control() => self.key_input.push(c),
            _ => {}
        }
    }

    fn open_in_atera(&self) {
        if let Some(url) = self.selected_device().and_then(|d| d.app_view_url.as_deref()) {
            open_browser(url);
        }
    }
}
