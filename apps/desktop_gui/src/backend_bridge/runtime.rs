//! Backend worker: owns the tokio runtime, the session and the mounted list
//! controller, and turns [`BackendCommand`]s into [`UiEvent`]s.

use std::{sync::Arc, thread};

use client_core::{
    config::Settings,
    flows,
    forms::{LanguageForm, LoginForm},
    AccessToken, ClientError, DeleteOutcome, FileSessionStore, HttpLanguagesApi, LanguagesApi,
    ListViewController, PendingDelete, PendingQuery, RequestOutcome, SessionEvent,
    SessionManager,
};
use crossbeam_channel::{Receiver, Sender};
use shared::domain::LanguageId;
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        mpsc,
    },
    task::JoinHandle,
};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub const SESSION_REJECTED_MESSAGE: &str = "The server rejected the current session";

pub fn launch(settings: Settings, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let backend = match Backend::from_settings(&settings, ui_tx.clone()) {
                Ok(backend) => backend,
                Err(err) => {
                    tracing::error!("backend worker startup failure: {err}");
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_client(
                        UiErrorContext::BackendStartup,
                        &err,
                    )));
                    return;
                }
            };
            tracing::info!(api_base_url = %settings.api_base_url, "backend worker ready");

            let (cmd_tx, commands) = mpsc::unbounded_channel();
            tokio::task::spawn_blocking(move || {
                while let Ok(cmd) = cmd_rx.recv() {
                    if cmd_tx.send(cmd).is_err() {
                        break;
                    }
                }
            });
            backend.run(commands).await;
        });
    });
}

/// Handles shared by every spawned command task.
#[derive(Clone)]
struct Services {
    api: Arc<dyn LanguagesApi>,
    sessions: Arc<SessionManager>,
    ui_tx: Sender<UiEvent>,
}

impl Services {
    fn send(&self, event: UiEvent) {
        let _ = self.ui_tx.try_send(event);
    }

    async fn token(&self) -> Option<AccessToken> {
        self.sessions.current().await.map(|session| session.token)
    }

    /// Auth failures also end the session; the UI routes back to login.
    async fn report_failure(&self, context: UiErrorContext, err: ClientError) {
        let error = UiError::from_client(context, &err);
        if error.requires_reauth() {
            if let Err(err) = self.sessions.teardown().await {
                tracing::warn!("failed to clear rejected session: {err}");
            }
        }
        self.send(UiEvent::Error(error));
    }

    async fn session_rejected(&self, context: UiErrorContext) {
        self.report_failure(context, ClientError::Auth(SESSION_REJECTED_MESSAGE.to_string()))
            .await;
    }

    async fn open_details(&self, id: LanguageId) {
        let Some(token) = self.token().await else {
            return;
        };
        let state = flows::load_details(self.api.as_ref(), &token, id).await;
        self.send(UiEvent::DetailsLoaded { id, state });
    }

    async fn open_editor(&self, id: Option<LanguageId>) {
        let Some(id) = id else {
            self.send(UiEvent::EditorReady {
                id: None,
                form: LanguageForm::default(),
            });
            return;
        };
        let Some(token) = self.token().await else {
            return;
        };
        match flows::load_for_edit(self.api.as_ref(), &token, id).await {
            Ok(form) => self.send(UiEvent::EditorReady { id: Some(id), form }),
            Err(err) => self.report_failure(UiErrorContext::Form, err).await,
        }
    }

    async fn submit_form(
        &self,
        id: Option<LanguageId>,
        form: LanguageForm,
        list: Option<Arc<ListViewController>>,
    ) {
        let Some(token) = self.token().await else {
            return;
        };
        let saved = match id {
            Some(id) => flows::submit_edit(self.api.as_ref(), &token, id, &form).await,
            None => flows::submit_new(self.api.as_ref(), &token, &form).await,
        };
        match saved {
            Ok(language) => {
                self.send(UiEvent::FormSaved(language));
                if let Some(list) = list {
                    if list.refresh().await == RequestOutcome::Unauthorized {
                        self.session_rejected(UiErrorContext::List).await;
                    }
                }
            }
            Err(ClientError::Validation(errors)) => self.send(UiEvent::FormRejected(errors)),
            Err(err) => self.report_failure(UiErrorContext::Form, err).await,
        }
    }
}

pub struct Backend {
    services: Services,
    session_events: broadcast::Receiver<SessionEvent>,
    list: Option<Arc<ListViewController>>,
    forwarder: Option<JoinHandle<()>>,
}

impl Backend {
    pub fn new(
        api: Arc<dyn LanguagesApi>,
        sessions: SessionManager,
        ui_tx: Sender<UiEvent>,
    ) -> Self {
        let sessions = Arc::new(sessions);
        let session_events = sessions.subscribe();
        Self {
            services: Services {
                api,
                sessions,
                ui_tx,
            },
            session_events,
            list: None,
            forwarder: None,
        }
    }

    fn from_settings(settings: &Settings, ui_tx: Sender<UiEvent>) -> Result<Self, ClientError> {
        let api = HttpLanguagesApi::new(&settings.api_base_url, settings.request_timeout())?;
        let store = FileSessionStore::new(settings.session_file());
        let sessions = SessionManager::init(Box::new(store))?;
        Ok(Self::new(Arc::new(api), sessions, ui_tx))
    }

    /// Serves commands in arrival order until the UI side hangs up. Session
    /// changes are handled first so a torn-down session never serves another
    /// list command.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<BackendCommand>) {
        loop {
            tokio::select! {
                biased;
                event = self.session_events.recv() => self.on_session_event(event).await,
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => break,
                },
            }
        }
        self.unmount_list();
    }

    async fn on_session_event(&mut self, event: Result<SessionEvent, RecvError>) {
        match event {
            Ok(SessionEvent::LoggedOut) | Err(RecvError::Lagged(_)) => {
                if self.list.is_some() && self.services.sessions.current().await.is_none() {
                    tracing::info!("session ended; unmounting list");
                    self.unmount_list();
                    self.services.send(UiEvent::LoggedOut);
                }
            }
            Ok(SessionEvent::LoggedIn { .. }) | Err(RecvError::Closed) => {}
        }
    }

    /// Session commands and the synchronous half of list intents run inline,
    /// in command order. Network calls are spawned so requests overlap.
    pub async fn handle(&mut self, cmd: BackendCommand) {
        match cmd {
            BackendCommand::RestoreSession => {
                if let Some(session) = self.services.sessions.current().await {
                    self.enter_catalogue(session.token, session.username).await;
                }
            }
            BackendCommand::Login { username, password } => {
                let form = LoginForm::new(username, password);
                let services = &self.services;
                match flows::login(services.api.as_ref(), &services.sessions, &form).await {
                    Ok(session) => self.enter_catalogue(session.token, session.username).await,
                    Err(err) => {
                        tracing::warn!("login failed: {err}");
                        self.services.send(UiEvent::Error(UiError::from_client(
                            UiErrorContext::Login,
                            &err,
                        )));
                    }
                }
            }
            BackendCommand::Logout => {
                self.unmount_list();
                let services = &self.services;
                if let Err(err) = flows::logout(services.api.as_ref(), &services.sessions).await {
                    tracing::warn!("failed to clear saved session: {err}");
                }
                self.services.send(UiEvent::LoggedOut);
            }
            BackendCommand::OpenDetails { id } => {
                let services = self.services.clone();
                tokio::spawn(async move { services.open_details(id).await });
            }
            BackendCommand::OpenEditor { id } => {
                let services = self.services.clone();
                tokio::spawn(async move { services.open_editor(id).await });
            }
            BackendCommand::SubmitForm { id, form } => {
                if let Err(errors) = form.validate() {
                    self.services.send(UiEvent::FormRejected(errors));
                    return;
                }
                let services = self.services.clone();
                let list = self.list.clone();
                tokio::spawn(async move { services.submit_form(id, form, list).await });
            }
            list_cmd => self.handle_list_command(list_cmd).await,
        }
    }

    async fn handle_list_command(&self, cmd: BackendCommand) {
        let Some(list) = self.list.clone() else {
            tracing::debug!("list command ignored while logged out");
            return;
        };
        match cmd {
            BackendCommand::Reload => {
                let pending = list.begin_load().await;
                self.spawn_query(list, pending);
            }
            BackendCommand::Search { term } => {
                let pending = list.begin_search(term).await;
                self.spawn_query(list, pending);
            }
            BackendCommand::ToggleSort { column } => {
                let pending = list.begin_toggle_sort(column).await;
                self.spawn_query(list, pending);
            }
            BackendCommand::ToggleSelect { id } => {
                list.toggle_select(id).await;
            }
            BackendCommand::ToggleSelectAll => list.toggle_select_all().await,
            BackendCommand::RequestDelete { record } => list.request_delete(record).await,
            BackendCommand::CancelDelete => list.cancel_delete().await,
            BackendCommand::ConfirmDelete => {
                if let Some(pending) = list.begin_confirm_delete().await {
                    self.spawn_delete(list, pending);
                }
            }
            BackendCommand::RequestBulkDelete => {
                list.request_bulk_delete().await;
            }
            BackendCommand::CancelBulkDelete => list.cancel_bulk_delete().await,
            BackendCommand::ConfirmBulkDelete => {
                if let Some(pending) = list.begin_confirm_bulk_delete().await {
                    self.spawn_delete(list, pending);
                }
            }
            _ => {}
        }
    }

    fn spawn_query(&self, list: Arc<ListViewController>, pending: PendingQuery) {
        let services = self.services.clone();
        tokio::spawn(async move {
            if list.complete(pending).await == RequestOutcome::Unauthorized {
                services.session_rejected(UiErrorContext::List).await;
            }
        });
    }

    fn spawn_delete(&self, list: Arc<ListViewController>, pending: PendingDelete) {
        let services = self.services.clone();
        tokio::spawn(async move {
            if list.complete_delete(pending).await == DeleteOutcome::Unauthorized {
                services.session_rejected(UiErrorContext::List).await;
            }
        });
    }

    async fn enter_catalogue(&mut self, token: AccessToken, username: String) {
        let list = self.mount_list(token);
        self.services.send(UiEvent::LoggedIn { username });
        let pending = list.begin_load().await;
        self.spawn_query(list, pending);
    }

    /// Replaces the list controller and forwards its snapshots to the UI.
    fn mount_list(&mut self, token: AccessToken) -> Arc<ListViewController> {
        self.unmount_list();
        let list = ListViewController::new(Arc::clone(&self.services.api), token);
        let mut updates = list.subscribe();
        let ui_tx = self.services.ui_tx.clone();
        let lagging = Arc::clone(&list);
        self.forwarder = Some(tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(view) => {
                        let _ = ui_tx.try_send(UiEvent::ListChanged(view));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "list forwarder lagged; sending latest snapshot");
                        let _ = ui_tx.try_send(UiEvent::ListChanged(lagging.snapshot().await));
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
        self.list = Some(Arc::clone(&list));
        list
    }

    fn unmount_list(&mut self) {
        if let Some(task) = self.forwarder.take() {
            task.abort();
        }
        self.list = None;
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
