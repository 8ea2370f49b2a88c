mod table;

use std::{
    io::{self, BufRead, Write},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    config::{load_settings, Settings},
    flows::{self, DetailsState},
    forms::{LanguageForm, LoginForm},
    list_view::{LOAD_FAILED_MESSAGE, SEARCH_FAILED_MESSAGE},
    DeleteOutcome, FileSessionStore, HttpLanguagesApi, LanguagesApi, ListViewController,
    LoadState, RequestOutcome, Session, SessionManager, ViewState,
};
use shared::domain::{LanguageId, SortDirection, SortKey};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "langdesk", about = "Browse and manage the programming-language catalogue")]
struct Cli {
    /// Overrides `api_base_url` from client.toml and the environment.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Print records as JSON instead of a table.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        username: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    Logout,
    Whoami,
    List,
    Search {
        term: String,
        #[arg(long, value_parser = parse_sort_key)]
        sort_by: Option<SortKey>,
        #[arg(long, value_parser = parse_direction, default_value = "asc")]
        order: SortDirection,
    },
    Show {
        id: i64,
    },
    Add(RecordFields),
    Edit {
        id: i64,
        #[command(flatten)]
        fields: RecordFields,
    },
    Delete {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
    DeleteMany {
        #[arg(required = true)]
        ids: Vec<i64>,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Default)]
struct RecordFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    creator: Option<String>,
    #[arg(long)]
    release_year: Option<String>,
    #[arg(long)]
    paradigm: Option<String>,
    #[arg(long)]
    popularity: Option<String>,
}

impl RecordFields {
    fn apply_to(self, form: &mut LanguageForm) {
        if let Some(v) = self.name {
            form.name = v;
        }
        if let Some(v) = self.creator {
            form.creator = v;
        }
        if let Some(v) = self.release_year {
            form.release_year = v;
        }
        if let Some(v) = self.paradigm {
            form.paradigm = v;
        }
        if let Some(v) = self.popularity {
            form.popularity = v;
        }
    }
}

fn parse_sort_key(raw: &str) -> Result<SortKey, String> {
    SortKey::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = SortKey::ALL.iter().map(|key| key.as_str()).collect();
        format!("unknown column '{raw}' (expected one of {})", known.join(", "))
    })
}

fn parse_direction(raw: &str) -> Result<SortDirection, String> {
    SortDirection::parse(raw).ok_or_else(|| format!("unknown order '{raw}' (expected asc or desc)"))
}

struct App {
    api: Arc<HttpLanguagesApi>,
    sessions: SessionManager,
    json: bool,
}

impl App {
    fn new(settings: &Settings, json: bool) -> Result<Self> {
        let api = HttpLanguagesApi::new(&settings.api_base_url, settings.request_timeout())
            .context("failed to build http client")?;
        let store = FileSessionStore::new(settings.session_file());
        let sessions =
            SessionManager::init(Box::new(store)).context("failed to read saved session")?;
        Ok(Self {
            api: Arc::new(api),
            sessions,
            json,
        })
    }

    async fn session(&self) -> Result<Session> {
        self.sessions
            .current()
            .await
            .context("not logged in; run `langdesk login <username>` first")
    }

    async fn controller(&self) -> Result<Arc<ListViewController>> {
        let session = self.session().await?;
        let api: Arc<dyn LanguagesApi> = self.api.clone();
        Ok(ListViewController::new(api, session.token))
    }

    /// Loads the full list, failing if the server could not be reached.
    async fn loaded_controller(&self) -> Result<Arc<ListViewController>> {
        let controller = self.controller().await?;
        if controller.load().await == RequestOutcome::Unauthorized {
            bail!("session rejected by the server; run `langdesk login <username>` again");
        }
        if let Some(message) = controller.snapshot().await.error_message() {
            bail!("{message}");
        }
        Ok(controller)
    }

    fn print_view(&self, view: &ViewState) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(&view.items)?);
            return Ok(());
        }
        let sorted = view.sort_key.map(|key| (key, view.sort_direction));
        print!("{}", table::render(&view.items, sorted));
        Ok(())
    }

    async fn run(self, command: Command) -> Result<()> {
        match command {
            Command::Login { username, password } => {
                let password = match password {
                    Some(password) => password,
                    None => prompt("Password: ")?,
                };
                let session = flows::login(
                    self.api.as_ref(),
                    &self.sessions,
                    &LoginForm::new(username, password),
                )
                .await?;
                println!("Logged in as {}", session.username);
            }
            Command::Logout => {
                flows::logout(self.api.as_ref(), &self.sessions).await?;
                println!("Logged out");
            }
            Command::Whoami => match self.sessions.current().await {
                Some(session) => println!("{}", session.username),
                None => println!("Not logged in"),
            },
            Command::List => {
                let controller = self.loaded_controller().await?;
                self.print_view(&controller.snapshot().await)?;
            }
            Command::Search {
                term,
                sort_by,
                order,
            } => {
                let controller = self.controller().await?;
                controller.apply_search_and_sort(term, sort_by, order).await;
                let view = controller.snapshot().await;
                match &view.load_state {
                    LoadState::Error(message)
                        if message == SEARCH_FAILED_MESSAGE || message == LOAD_FAILED_MESSAGE =>
                    {
                        bail!("{message}")
                    }
                    LoadState::Error(message) => println!("{message}"),
                    _ => self.print_view(&view)?,
                }
            }
            Command::Show { id } => {
                let session = self.session().await?;
                match flows::load_details(self.api.as_ref(), &session.token, LanguageId(id)).await {
                    DetailsState::Loaded(language) if self.json => {
                        println!("{}", serde_json::to_string_pretty(&language)?);
                    }
                    DetailsState::Loaded(language) => {
                        for column in SortKey::ALL {
                            println!("{:<16}{}", column.label(), table::cell(&language, column));
                        }
                    }
                    other => bail!("{}", other.message().unwrap_or_default()),
                }
            }
            Command::Add(fields) => {
                let session = self.session().await?;
                let mut form = LanguageForm::default();
                fields.apply_to(&mut form);
                let created = flows::submit_new(self.api.as_ref(), &session.token, &form).await?;
                println!("Created {} (id {})", created.name, created.id);
            }
            Command::Edit { id, fields } => {
                let session = self.session().await?;
                let id = LanguageId(id);
                let mut form = flows::load_for_edit(self.api.as_ref(), &session.token, id)
                    .await
                    .with_context(|| format!("failed to load programming language {id}"))?;
                fields.apply_to(&mut form);
                let updated =
                    flows::submit_edit(self.api.as_ref(), &session.token, id, &form).await?;
                println!("Updated {} (id {})", updated.name, updated.id);
            }
            Command::Delete { id, yes } => {
                let controller = self.loaded_controller().await?;
                let id = LanguageId(id);
                let view = controller.snapshot().await;
                let record = view
                    .items
                    .iter()
                    .find(|item| item.id == id)
                    .cloned()
                    .with_context(|| format!("no programming language with id {id}"))?;
                let name = record.name.clone();
                controller.request_delete(record).await;

                if !yes && !confirm(&format!("Delete \"{name}\"?"))? {
                    controller.cancel_delete().await;
                    println!("Cancelled");
                    return Ok(());
                }
                report_delete(&controller, controller.confirm_delete().await).await?;
            }
            Command::DeleteMany { ids, yes } => {
                let controller = self.loaded_controller().await?;
                for raw in ids {
                    if !controller.toggle_select(LanguageId(raw)).await {
                        warn!(language_id = raw, "not in the catalogue; skipping");
                    }
                }
                if !controller.request_bulk_delete().await {
                    bail!("none of the given ids are in the catalogue");
                }
                let count = controller.snapshot().await.selected.len();

                if !yes && !confirm(&format!("Delete {count} selected programming languages?"))? {
                    controller.cancel_bulk_delete().await;
                    println!("Cancelled");
                    return Ok(());
                }
                report_delete(&controller, controller.confirm_bulk_delete().await).await?;
            }
        }
        Ok(())
    }
}

async fn report_delete(controller: &ListViewController, outcome: DeleteOutcome) -> Result<()> {
    match outcome {
        DeleteOutcome::Deleted(count) => println!("Deleted {count}"),
        DeleteOutcome::Skipped => println!("Nothing to delete"),
        DeleteOutcome::Unauthorized => {
            bail!("session rejected by the server; run `langdesk login <username>` again")
        }
        DeleteOutcome::Failed => {
            let view = controller.snapshot().await;
            bail!("{}", view.delete_error.unwrap_or_default());
        }
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn confirm(question: &str) -> Result<bool> {
    let answer = prompt(&format!("{question} [y/N] "))?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(url) = cli.api_url {
        settings.api_base_url = url;
    }
    debug!(api_base_url = %settings.api_base_url, data_dir = %settings.data_dir.display(), "settings loaded");

    App::new(&settings, cli.json)?.run(cli.command).await
}
