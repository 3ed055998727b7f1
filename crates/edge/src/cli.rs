// crates/edge/src/cli.rs

use crate::Error;
use adapt::{build_app, ControllerBuilder, Hooks, RestEnv, RestServer};
use axum::Router;
use chrono::Utc;
use clap::{builder::ValueHint, Parser, Subcommand};
use domain::{
    resource::ResourceRegistry,
    security::{
        password::{hash_password, validate_policy},
        RoleCapabilities,
    },
    setting::Settings,
    status::StatusRegistry,
};
use serve::{InMemoryStore, ItemStore, Seed, StoreConfig};
use std::{net::SocketAddr, path::PathBuf, process::ExitCode, sync::Arc};
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{debug, error, info};

pub type Result<T> = std::result::Result<T, Error>;

/// Lectern CLI
#[tokio::main(flavor = "multi_thread")]
#[tracing::instrument(skip_all)]
pub async fn start() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(cmd) => do_serve(cmd).await,
        Commands::HashPassword(cmd) => do_hash_password(cmd),
    };

    result.map_or_else(
        |e| {
            error!("Lectern failed: {}", e);
            ExitCode::FAILURE
        },
        |_| {
            info!("Lectern exited cleanly");
            ExitCode::SUCCESS
        },
    )
}

#[tracing::instrument(skip_all)]
async fn do_serve(cmd: ServeCmd) -> Result<()> {
    let then = Utc::now();
    let process = StartProcess::<CommandIssued>::parse_settings_file(cmd)?;
    info!(
        "Settings parsed in {} milliseconds",
        Utc::now().timestamp_millis() - then.timestamp_millis()
    );

    let then = Utc::now();
    let process = process.seed_store()?;
    info!(
        "Store seeded in {} milliseconds",
        Utc::now().timestamp_millis() - then.timestamp_millis()
    );

    let then = Utc::now();
    let process = process.register_controllers()?;
    info!(
        "Routes registered in {} milliseconds",
        Utc::now().timestamp_millis() - then.timestamp_millis()
    );

    let then = Utc::now();
    let process = process.start_server().await?;
    info!(
        "Server started in {} milliseconds",
        Utc::now().timestamp_millis() - then.timestamp_millis()
    );

    process.is_running().await
}

#[tracing::instrument(skip_all)]
fn do_hash_password(cmd: HashPasswordCmd) -> Result<()> {
    validate_policy(&cmd.password)?;
    println!("{}", hash_password(&cmd.password)?);
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "lectern", version, about = "Lectern content API server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the REST API for the site in the specified directory
    Serve(ServeCmd),
    /// Print an argon2 hash for a `[[users]]` entry in settings.toml
    HashPassword(HashPasswordCmd),
}

#[derive(Parser, Debug)]
pub struct ServeCmd {
    /// Site directory (or set LECTERN_DIR)
    ///
    /// Must contain `settings.toml`; `content.json` is optional.
    #[arg(
        value_name = "DIR",
        env = "LECTERN_DIR",
        required = true,
        value_hint = ValueHint::DirPath,
        value_parser = dir_must_exist
    )]
    pub dir: PathBuf,
}

#[derive(Parser, Debug)]
pub struct HashPasswordCmd {
    /// Password to hash (or set LECTERN_PASSWORD)
    #[arg(value_name = "PASSWORD", env = "LECTERN_PASSWORD", hide_env_values = true)]
    pub password: String,
}

fn dir_must_exist(s: &str) -> std::result::Result<PathBuf, String> {
    let p = PathBuf::from(s);
    if !p.exists() {
        return Err(format!("Not found: {}", p.display()));
    }
    if !p.is_dir() {
        return Err(format!("Not a directory: {}", p.display()));
    }
    Ok(p)
}

// ─────────────────────────────────────────────────────────────────────────────
// Start process state machine
// ─────────────────────────────────────────────────────────────────────────────

trait ProcessState {}

struct CommandIssued;

struct SettingsLoaded {
    command: ServeCmd,
    settings: Settings,
}

struct StoreSeeded {
    settings: Settings,
    env: RestEnv,
}

struct RouterCreated {
    settings: Settings,
    router: Router,
}

struct ServerStarted {
    addr: SocketAddr,
    server: JoinHandle<std::io::Result<()>>,
}

impl ProcessState for CommandIssued {}
impl ProcessState for SettingsLoaded {}
impl ProcessState for StoreSeeded {}
impl ProcessState for RouterCreated {}
impl ProcessState for ServerStarted {}

struct StartProcess<S: ProcessState> {
    state: S,
}

impl StartProcess<CommandIssued> {
    /// Load settings from `<dir>/settings.toml`.
    #[tracing::instrument(skip_all)]
    fn parse_settings_file(command: ServeCmd) -> Result<StartProcess<SettingsLoaded>> {
        let path = command.dir.join("settings.toml");
        if !path.exists() {
            return Err(Error::Config(format!(
                "settings.toml not found at {}",
                path.display()
            )));
        }

        let text = std::fs::read_to_string(&path).map_err(|err| {
            Error::Config(format!("Failed reading {}: {}", path.display(), err))
        })?;

        let settings: Settings = toml::from_str(&text).map_err(|err| {
            Error::Config(format!(
                "Invalid settings.toml at {}: {}",
                path.display(),
                err
            ))
        })?;
        settings.validate()?;

        Ok(StartProcess {
            state: SettingsLoaded { command, settings },
        })
    }
}

impl StartProcess<SettingsLoaded> {
    /// Build the registries and load `<dir>/content.json` into a fresh store.
    #[tracing::instrument(skip_all)]
    fn seed_store(self) -> Result<StartProcess<StoreSeeded>> {
        let settings = self.state.settings;

        let mut registry = ResourceRegistry::with_defaults();
        for o in &settings.types {
            registry.override_type(o);
        }
        for o in &settings.taxonomies {
            registry.override_taxonomy(o);
        }

        let mut statuses = StatusRegistry::default();
        for s in &settings.statuses {
            statuses.register(s.clone());
        }

        let site = &settings.site;
        let store = InMemoryStore::new(StoreConfig {
            site_url: site.url.trim_end_matches('/').to_string(),
            gmt_offset_minutes: site.gmt_offset_minutes,
            default_comment_status: site.default_comment_status,
            default_ping_status: site.default_ping_status,
            attachment_kinds: registry
                .types()
                .filter(|t| t.attachment_like)
                .map(|t| t.name.clone())
                .collect(),
        });
        for ty in registry.types() {
            for tax in &ty.taxonomies {
                store.register_taxonomy(tax);
            }
        }
        for user in &settings.users {
            store.add_user(user.id);
        }
        store.load(Seed::from_path(&self.state.command.dir.join("content.json"))?)?;

        let store: Arc<dyn ItemStore> = Arc::new(store);
        let env = RestEnv {
            caps: Arc::new(RoleCapabilities::new(statuses.clone())),
            registry: Arc::new(registry),
            statuses: Arc::new(statuses),
            site: Arc::new(settings.site.clone()),
            store,
        };
        Ok(StartProcess {
            state: StoreSeeded { settings, env },
        })
    }
}

impl StartProcess<StoreSeeded> {
    /// One controller per type exposed over REST.
    #[tracing::instrument(skip_all)]
    fn register_controllers(self) -> Result<StartProcess<RouterCreated>> {
        let env = self.state.env;
        let mut server = RestServer::new(&env.site);
        for ty in env.registry.rest_types() {
            let controller = ControllerBuilder::new(env.clone(), &ty.name)
                .hooks(audit_hooks())
                .build()?;
            info!(kind = %ty.name, base = %ty.rest_base, "registered");
            server.register(controller);
        }

        let settings = self.state.settings;
        let router = build_app(server, settings.users.clone(), &settings.site.api_prefix);
        Ok(StartProcess {
            state: RouterCreated { settings, router },
        })
    }
}

impl StartProcess<RouterCreated> {
    #[tracing::instrument(skip_all)]
    async fn start_server(self) -> Result<StartProcess<ServerStarted>> {
        let server = &self.state.settings.server;
        let listener = TcpListener::bind((server.ip, server.port)).await?;
        let addr = listener.local_addr()?;
        info!("Listening on http://{addr}");

        let router = self.state.router;
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await
        });

        Ok(StartProcess {
            state: ServerStarted {
                addr,
                server: handle,
            },
        })
    }
}

impl StartProcess<ServerStarted> {
    #[tracing::instrument(skip_all)]
    async fn is_running(self) -> Result<()> {
        let addr = self.state.addr;
        let result = self
            .state
            .server
            .await
            .map_err(|e| Error::Config(format!("server task failed: {e}")))?;
        info!("Server on {addr} stopped");
        Ok(result?)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("could not listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Listeners that record writes in the log.
fn audit_hooks() -> Hooks {
    let mut hooks = Hooks::default();
    hooks
        .on_inserted(|item, req, creating| {
            info!(id = item.id, kind = %item.kind, actor = %req.actor, creating, "item saved");
        })
        .on_deleted(|item, resp, req| {
            let forced = resp.body.get("deleted").is_some();
            info!(id = item.id, kind = %item.kind, actor = %req.actor, forced, "item deleted");
        });
    debug!("audit hooks installed");
    hooks
}
