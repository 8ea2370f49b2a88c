use std::time::Duration;

use client_core::{
    flows::DetailsState,
    forms::{LanguageForm, LoginForm},
    LoadState, ValidationErrors, ViewState,
};
use crossbeam_channel::{Receiver, Sender};
use shared::domain::{LanguageId, ProgrammingLanguage, SortKey};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::{err_label, UiErrorContext, UiEvent},
    orchestration::dispatch_backend_command,
};

const REAUTH_BANNER: &str = "Session expired or invalid credentials. Please sign in again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Login,
    Catalogue,
}

#[derive(Default)]
struct LoginUiState {
    username: String,
    password: String,
    errors: ValidationErrors,
    submitting: bool,
}

struct EditorState {
    id: Option<LanguageId>,
    form: LanguageForm,
    errors: ValidationErrors,
    saving: bool,
}

struct DetailsView {
    id: LanguageId,
    state: Option<DetailsState>,
}

pub struct CatalogueApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    screen: Screen,
    username: Option<String>,
    login: LoginUiState,
    view: ViewState,
    search_input: String,
    details: Option<DetailsView>,
    editor: Option<EditorState>,
    status: String,
    banner: Option<String>,
}

impl CatalogueApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        let mut app = Self {
            cmd_tx,
            ui_rx,
            screen: Screen::Login,
            username: None,
            login: LoginUiState::default(),
            view: ViewState::default(),
            search_input: String::new(),
            details: None,
            editor: None,
            status: "Not logged in".to_string(),
            banner: None,
        };
        app.dispatch(BackendCommand::RestoreSession);
        app
    }

    fn dispatch(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status);
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Info(message) => self.status = message,
            UiEvent::LoggedIn { username } => {
                self.screen = Screen::Catalogue;
                self.status = format!("Signed in as {username}");
                self.username = Some(username);
                self.login = LoginUiState::default();
                self.banner = None;
                self.view = ViewState::default();
                self.search_input.clear();
            }
            UiEvent::LoggedOut => {
                // An auth error may already have routed back with its banner.
                if self.screen != Screen::Login {
                    self.return_to_login("Signed out".to_string(), None);
                }
            }
            UiEvent::ListChanged(view) => self.view = view,
            UiEvent::DetailsLoaded { id, state } => {
                if let Some(details) = self.details.as_mut().filter(|details| details.id == id) {
                    details.state = Some(state);
                }
            }
            UiEvent::EditorReady { id, form } => {
                self.editor = Some(EditorState {
                    id,
                    form,
                    errors: ValidationErrors::default(),
                    saving: false,
                });
            }
            UiEvent::FormSaved(language) => {
                self.editor = None;
                self.status = format!("Saved {}", language.name);
            }
            UiEvent::FormRejected(errors) => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.errors = errors;
                    editor.saving = false;
                }
            }
            UiEvent::Error(err) => {
                if err.context() == UiErrorContext::Login {
                    self.login.submitting = false;
                    self.banner = Some(err.message().to_string());
                    self.status = format!("{} error: {}", err_label(err.category()), err.message());
                } else if err.requires_reauth() {
                    self.return_to_login(
                        format!("Authentication error: {}", err.message()),
                        Some(REAUTH_BANNER.to_string()),
                    );
                } else {
                    if let Some(editor) = self.editor.as_mut() {
                        editor.saving = false;
                    }
                    self.status = format!("{} error: {}", err_label(err.category()), err.message());
                    if err.context() == UiErrorContext::BackendStartup {
                        self.banner = Some(self.status.clone());
                    }
                }
            }
        }
    }

    fn return_to_login(&mut self, status: String, banner: Option<String>) {
        self.screen = Screen::Login;
        self.username = None;
        self.view = ViewState::default();
        self.details = None;
        self.editor = None;
        self.login.submitting = false;
        self.status = status;
        self.banner = banner;
    }

    fn submit_login(&mut self) {
        let form = LoginForm::new(self.login.username.clone(), self.login.password.clone());
        match form.validate() {
            Ok(()) => {
                self.login.errors = ValidationErrors::default();
                self.login.submitting = true;
                self.dispatch(BackendCommand::Login {
                    username: form.username,
                    password: form.password,
                });
            }
            Err(errors) => self.login.errors = errors,
        }
    }

    fn show_login_screen(&mut self, ctx: &egui::Context) {
        let mut submit = false;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(48.0);
            ui.vertical_centered(|ui| {
                ui.set_max_width(360.0);
                ui.heading("Programming Languages");
                ui.weak("Sign in to manage the catalogue.");
                ui.add_space(12.0);

                if let Some(banner) = &self.banner {
                    ui.colored_label(ui.visuals().error_fg_color, banner);
                }

                ui.label("Username");
                let username = ui.add(
                    egui::TextEdit::singleline(&mut self.login.username).hint_text("username"),
                );
                field_error(ui, self.login.errors.for_field("username"));

                ui.label("Password");
                let password = ui.add(
                    egui::TextEdit::singleline(&mut self.login.password)
                        .password(true)
                        .hint_text("password"),
                );
                field_error(ui, self.login.errors.for_field("password"));

                let enter = (username.lost_focus() || password.lost_focus())
                    && ui.input(|input| input.key_pressed(egui::Key::Enter));
                let clicked = ui
                    .add_enabled(!self.login.submitting, egui::Button::new("Sign in"))
                    .clicked();
                if self.login.submitting {
                    ui.spinner();
                }
                submit = (clicked || enter) && !self.login.submitting;
            });
        });
        if submit {
            self.submit_login();
        }
    }

    fn show_top_bar(&mut self, ctx: &egui::Context, intents: &mut Vec<BackendCommand>) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Programming Languages");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Log out").clicked() {
                        intents.push(BackendCommand::Logout);
                    }
                    if let Some(username) = &self.username {
                        ui.weak(username);
                    }
                });
            });
        });
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.small(&self.status);
        });
    }

    fn show_catalogue(&mut self, ctx: &egui::Context, intents: &mut Vec<BackendCommand>) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                let search = ui.add(
                    egui::TextEdit::singleline(&mut self.search_input)
                        .hint_text("Search by name")
                        .desired_width(260.0),
                );
                if search.changed() {
                    intents.push(BackendCommand::Search {
                        term: self.search_input.trim().to_string(),
                    });
                }
                if ui.button("Reload").clicked() {
                    intents.push(BackendCommand::Reload);
                }
                if ui.button("Add language").clicked() {
                    intents.push(BackendCommand::OpenEditor { id: None });
                }
                let selected = self.view.selected.len();
                let bulk = ui.add_enabled(
                    selected > 0,
                    egui::Button::new(format!("Delete selected ({selected})")),
                );
                if bulk.clicked() {
                    intents.push(BackendCommand::RequestBulkDelete);
                }
            });
            ui.separator();

            match &self.view.load_state {
                LoadState::Loading => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.weak("Loading...");
                    });
                }
                LoadState::Error(message) => {
                    ui.colored_label(ui.visuals().error_fg_color, message);
                }
                LoadState::Idle | LoadState::Ready => {}
            }

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    if let Some(details) = language_table(ui, &self.view, intents) {
                        self.details = Some(DetailsView {
                            id: details,
                            state: None,
                        });
                    }
                });
        });
    }

    fn show_delete_dialogs(&self, ctx: &egui::Context, intents: &mut Vec<BackendCommand>) {
        if let Some(record) = &self.view.pending_single_delete {
            egui::Window::new("Delete programming language")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(format!(
                        "Delete \"{}\"? This cannot be undone.",
                        record.name
                    ));
                    self.confirm_buttons(ui, intents, BackendCommand::CancelDelete, BackendCommand::ConfirmDelete);
                });
        }

        if self.view.pending_bulk_delete {
            egui::Window::new("Delete selected")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(format!(
                        "Delete {} selected programming languages? This cannot be undone.",
                        self.view.selected.len()
                    ));
                    self.confirm_buttons(
                        ui,
                        intents,
                        BackendCommand::CancelBulkDelete,
                        BackendCommand::ConfirmBulkDelete,
                    );
                });
        }
    }

    fn confirm_buttons(
        &self,
        ui: &mut egui::Ui,
        intents: &mut Vec<BackendCommand>,
        cancel: BackendCommand,
        confirm: BackendCommand,
    ) {
        if let Some(error) = &self.view.delete_error {
            ui.colored_label(ui.visuals().error_fg_color, error);
        }
        ui.horizontal(|ui| {
            if ui.button("Cancel").clicked() {
                intents.push(cancel);
                return;
            }
            let delete = ui.add_enabled(!self.view.delete_in_flight, egui::Button::new("Delete"));
            if delete.clicked() {
                intents.push(confirm);
            }
            if self.view.delete_in_flight {
                ui.spinner();
            }
        });
    }

    fn show_details(&mut self, ctx: &egui::Context, intents: &mut Vec<BackendCommand>) {
        let Some(details) = &self.details else {
            return;
        };
        let mut open = true;
        let mut edit = None;
        egui::Window::new("Details")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| match &details.state {
                None => {
                    ui.spinner();
                }
                Some(DetailsState::Loaded(language)) => {
                    details_grid(ui, language);
                    if ui.button("Edit").clicked() {
                        edit = Some(language.id);
                    }
                }
                Some(other) => {
                    ui.colored_label(
                        ui.visuals().error_fg_color,
                        other.message().unwrap_or_default(),
                    );
                }
            });
        if let Some(id) = edit {
            intents.push(BackendCommand::OpenEditor { id: Some(id) });
            open = false;
        }
        if !open {
            self.details = None;
        }
    }

    fn show_editor(&mut self, ctx: &egui::Context, intents: &mut Vec<BackendCommand>) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        let title = if editor.id.is_some() {
            "Edit programming language"
        } else {
            "Add programming language"
        };
        let mut close = false;
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                form_field(ui, "Name", &mut editor.form.name, editor.errors.for_field("name"));
                form_field(
                    ui,
                    "Creator",
                    &mut editor.form.creator,
                    editor.errors.for_field("creator"),
                );
                form_field(
                    ui,
                    "Release Year",
                    &mut editor.form.release_year,
                    editor.errors.for_field("releaseYear"),
                );
                form_field(
                    ui,
                    "Paradigm",
                    &mut editor.form.paradigm,
                    editor.errors.for_field("paradigm"),
                );
                form_field(
                    ui,
                    "Popularity (%)",
                    &mut editor.form.popularity,
                    editor.errors.for_field("popularity"),
                );
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        close = true;
                    }
                    let save = ui.add_enabled(!editor.saving, egui::Button::new("Save"));
                    if save.clicked() {
                        editor.saving = true;
                        intents.push(BackendCommand::SubmitForm {
                            id: editor.id,
                            form: editor.form.clone(),
                        });
                    }
                    if editor.saving {
                        ui.spinner();
                    }
                });
            });
        if close {
            self.editor = None;
        }
    }
}

/// Renders the table and queues row intents; returns the id whose details
/// were requested.
fn language_table(
    ui: &mut egui::Ui,
    view: &ViewState,
    intents: &mut Vec<BackendCommand>,
) -> Option<LanguageId> {
    let mut details = None;
    egui::Grid::new("language_table")
        .striped(true)
        .num_columns(SortKey::ALL.len() + 2)
        .show(ui, |ui| {
            let mut all = view.all_selected();
            if ui
                .add_enabled(!view.items.is_empty(), egui::Checkbox::without_text(&mut all))
                .changed()
            {
                intents.push(BackendCommand::ToggleSelectAll);
            }
            for column in SortKey::ALL {
                let label = match view.sort_indicator(column) {
                    Some(direction) => format!("{} {}", column.label(), direction.arrow()),
                    None => column.label().to_string(),
                };
                if ui.button(egui::RichText::new(label).strong()).clicked() {
                    intents.push(BackendCommand::ToggleSort { column });
                }
            }
            ui.strong("Actions");
            ui.end_row();

            for language in &view.items {
                let mut checked = view.is_selected(language.id);
                if ui.checkbox(&mut checked, "").changed() {
                    intents.push(BackendCommand::ToggleSelect { id: language.id });
                }
                for column in SortKey::ALL {
                    ui.label(cell_text(language, column));
                }
                ui.horizontal(|ui| {
                    if ui.small_button("View").clicked() {
                        details = Some(language.id);
                        intents.push(BackendCommand::OpenDetails { id: language.id });
                    }
                    if ui.small_button("Edit").clicked() {
                        intents.push(BackendCommand::OpenEditor {
                            id: Some(language.id),
                        });
                    }
                    if ui.small_button("Delete").clicked() {
                        intents.push(BackendCommand::RequestDelete {
                            record: language.clone(),
                        });
                    }
                });
                ui.end_row();
            }
        });
    details
}

fn cell_text(language: &ProgrammingLanguage, column: SortKey) -> String {
    match column {
        SortKey::Id => language.id.to_string(),
        SortKey::Name => language.name.clone(),
        SortKey::Creator => language.creator.clone(),
        SortKey::ReleaseYear => language.release_year.to_string(),
        SortKey::Paradigm => language.paradigm.clone(),
        SortKey::Popularity => format!("{:.2}", language.popularity),
    }
}

fn details_grid(ui: &mut egui::Ui, language: &ProgrammingLanguage) {
    egui::Grid::new("language_details")
        .num_columns(2)
        .show(ui, |ui| {
            for column in SortKey::ALL {
                ui.strong(column.label());
                ui.label(cell_text(language, column));
                ui.end_row();
            }
        });
}

fn form_field(ui: &mut egui::Ui, label: &str, value: &mut String, error: Option<&str>) {
    ui.label(label);
    ui.text_edit_singleline(value);
    field_error(ui, error);
}

fn field_error(ui: &mut egui::Ui, error: Option<&str>) {
    if let Some(error) = error {
        ui.colored_label(ui.visuals().error_fg_color, error);
    }
}

impl eframe::App for CatalogueApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        let mut intents = Vec::new();
        match self.screen {
            Screen::Login => self.show_login_screen(ctx),
            Screen::Catalogue => {
                self.show_top_bar(ctx, &mut intents);
                self.show_catalogue(ctx, &mut intents);
                self.show_delete_dialogs(ctx, &mut intents);
                self.show_details(ctx, &mut intents);
                self.show_editor(ctx, &mut intents);
            }
        }
        for cmd in intents {
            self.dispatch(cmd);
        }

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

#[cfg(test)]
mod tests {
    use client_core::ClientError;
    use crossbeam_channel::bounded;

    use super::*;
    use crate::controller::events::UiError;

    fn app() -> (CatalogueApp, Receiver<BackendCommand>) {
        let (cmd_tx, cmd_rx) = bounded(16);
        let (_ui_tx, ui_rx) = bounded(16);
        (CatalogueApp::new(cmd_tx, ui_rx), cmd_rx)
    }

    fn rust() -> ProgrammingLanguage {
        ProgrammingLanguage {
            id: LanguageId(7),
            name: "Rust".into(),
            creator: "Graydon Hoare".into(),
            release_year: 2015,
            paradigm: "Multi-paradigm".into(),
            popularity: 13.5,
        }
    }

    #[test]
    fn startup_asks_backend_to_restore_session() {
        let (_app, cmd_rx) = app();
        assert!(matches!(cmd_rx.try_recv(), Ok(BackendCommand::RestoreSession)));
    }

    #[test]
    fn short_credentials_never_reach_backend() {
        let (mut app, cmd_rx) = app();
        let _ = cmd_rx.try_recv();
        app.login.username = "a".into();
        app.login.password = "123".into();
        app.submit_login();

        assert!(cmd_rx.try_recv().is_err());
        assert!(!app.login.submitting);
        assert_eq!(
            app.login.errors.for_field("username"),
            Some("Username must be at least 2 characters.")
        );
    }

    #[test]
    fn login_event_opens_catalogue() {
        let (mut app, _cmd_rx) = app();
        app.login.password = "lovelace".into();
        app.apply_event(UiEvent::LoggedIn {
            username: "ada".into(),
        });
        assert_eq!(app.screen, Screen::Catalogue);
        assert_eq!(app.username.as_deref(), Some("ada"));
        assert!(app.login.password.is_empty());
    }

    #[test]
    fn auth_failure_outside_login_returns_to_login() {
        let (mut app, _cmd_rx) = app();
        app.apply_event(UiEvent::LoggedIn {
            username: "ada".into(),
        });
        app.apply_event(UiEvent::Error(UiError::from_client(
            UiErrorContext::Form,
            &ClientError::Auth("Invalid token".into()),
        )));
        assert_eq!(app.screen, Screen::Login);
        assert_eq!(app.banner.as_deref(), Some(REAUTH_BANNER));
    }

    #[test]
    fn logout_after_auth_failure_keeps_reauth_banner() {
        let (mut app, _cmd_rx) = app();
        app.apply_event(UiEvent::LoggedIn {
            username: "ada".into(),
        });
        app.apply_event(UiEvent::Error(UiError::from_client(
            UiErrorContext::List,
            &ClientError::Auth("Invalid token".into()),
        )));
        app.apply_event(UiEvent::LoggedOut);
        assert_eq!(app.screen, Screen::Login);
        assert_eq!(app.banner.as_deref(), Some(REAUTH_BANNER));
    }

    #[test]
    fn rejected_login_stays_on_login_with_message() {
        let (mut app, _cmd_rx) = app();
        app.login.submitting = true;
        app.apply_event(UiEvent::Error(UiError::from_client(
            UiErrorContext::Login,
            &ClientError::Auth("Invalid credentials".into()),
        )));
        assert_eq!(app.screen, Screen::Login);
        assert!(!app.login.submitting);
        assert_eq!(app.banner.as_deref(), Some("Invalid credentials"));
    }

    #[test]
    fn editor_lifecycle_follows_backend_events() {
        let (mut app, _cmd_rx) = app();
        app.apply_event(UiEvent::EditorReady {
            id: Some(LanguageId(7)),
            form: LanguageForm::from_language(&rust()),
        });
        let editor = app.editor.as_mut().expect("editor open");
        editor.saving = true;

        let mut errors = ValidationErrors::default();
        errors.push("name", "Name must be at least 2 characters.");
        app.apply_event(UiEvent::FormRejected(errors));
        let editor = app.editor.as_ref().expect("still open");
        assert!(!editor.saving);
        assert!(editor.errors.for_field("name").is_some());

        app.apply_event(UiEvent::FormSaved(rust()));
        assert!(app.editor.is_none());
        assert_eq!(app.status, "Saved Rust");
    }

    #[test]
    fn details_for_other_record_are_ignored() {
        let (mut app, _cmd_rx) = app();
        app.details = Some(DetailsView {
            id: LanguageId(7),
            state: None,
        });
        app.apply_event(UiEvent::DetailsLoaded {
            id: LanguageId(8),
            state: DetailsState::NotFound,
        });
        assert!(app.details.as_ref().expect("open").state.is_none());

        app.apply_event(UiEvent::DetailsLoaded {
            id: LanguageId(7),
            state: DetailsState::Loaded(rust()),
        });
        assert_eq!(
            app.details.as_ref().expect("open").state,
            Some(DetailsState::Loaded(rust()))
        );
    }

    #[test]
    fn popularity_cell_has_two_decimals() {
        assert_eq!(cell_text(&rust(), SortKey::Popularity), "13.50");
        assert_eq!(cell_text(&rust(), SortKey::ReleaseYear), "2015");
    }
}
