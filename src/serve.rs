use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr as _;
use std::sync::Arc;

use anyhow::Context as _;
use axum::{routing::get, Router};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity, log::LevelFilter};
use figment::{providers::Format as _, Figment};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::adapters::db::{
    CountryAdapter, InboxAdapter, PhotoAdapter, StationAdapter, UserAdapter,
};
use crate::adapters::mailer::{NoopMailer, SmtpMailer};
use crate::adapters::mastodon::{MastodonClient, NoopMastodon};
use crate::adapters::monitor::{LoggingMonitor, MatrixMonitor};
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::ports::{
    CountryPort, InboxPort, MailerPort, MastodonPort, MonitorPort, PhotoPort, PhotoStoragePort,
    StationPort, UserPort,
};
use crate::services::{InboxService, NotifyUsersService, SocialMediaService, StatisticService};
use crate::storage::{PhotoFileStorage, WorkDir};
use crate::web::AppState;

#[derive(Parser, Debug, Clone)]
/// Command line arguments.
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "default.toml")]
    pub config: PathBuf,
    /// The verbosity level.
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}

/// The main application entry point.
pub async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    // Set up trace logging to console and account for the user-provided
    // verbosity flag.
    if args.verbosity.log_level_filter() != LevelFilter::Off {
        let level = match args.verbosity.log_level_filter() {
            LevelFilter::Error => tracing::Level::ERROR,
            LevelFilter::Warn => tracing::Level::WARN,
            LevelFilter::Info | LevelFilter::Off => tracing::Level::INFO,
            LevelFilter::Debug => tracing::Level::DEBUG,
            LevelFilter::Trace => tracing::Level::TRACE,
        };
        tracing_subscriber::fmt().with_max_level(level).init();
    }

    if !args.config.exists() {
        // Not fatal: all settings can come from the environment. The most
        // likely cause is a forgotten mount, so say something.
        warn!(
            "configuration file {} does not exist",
            args.config.display()
        );
    }

    let config: AppConfig = Figment::new()
        .admerge(figment::providers::Toml::file(args.config))
        .admerge(figment::providers::Env::prefixed("RAILPIX_"))
        .extract()
        .context("failed to load configuration")?;

    let work_dir = WorkDir::create(&config.work_dir, config.keep_file_copies_days)
        .context("failed to create working directories")?;

    let connect_options = SqliteConnectOptions::from_str(&config.db)
        .context("invalid database url")?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await
        .context("failed to establish database connection pool")?;
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("failed to run database migrations")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let photo_storage: Arc<dyn PhotoStoragePort> =
        Arc::new(PhotoFileStorage::new(work_dir, clock.clone()));
    let monitor: Arc<dyn MonitorPort> = match &config.matrix {
        Some(matrix) => Arc::new(MatrixMonitor::new(matrix.clone())),
        None => Arc::new(LoggingMonitor),
    };
    let mailer: Arc<dyn MailerPort> = match &config.mailer {
        Some(mailer) => {
            Arc::new(SmtpMailer::new(mailer).context("failed to set up smtp mailer")?)
        }
        None => Arc::new(NoopMailer),
    };
    let mastodon: Arc<dyn MastodonPort> = match &config.mastodon {
        Some(mastodon) => Arc::new(MastodonClient::new(mastodon.clone())),
        None => Arc::new(NoopMastodon),
    };

    let inbox_port: Arc<dyn InboxPort> = Arc::new(InboxAdapter::new(pool.clone()));
    let station_port: Arc<dyn StationPort> = Arc::new(StationAdapter::new(pool.clone()));
    let photo_port: Arc<dyn PhotoPort> = Arc::new(PhotoAdapter::new(pool.clone()));
    let user_port: Arc<dyn UserPort> = Arc::new(UserAdapter::new(pool.clone()));
    let country_port: Arc<dyn CountryPort> = Arc::new(CountryAdapter::new(pool.clone()));

    let inbox_service = Arc::new(InboxService::new(
        station_port.clone(),
        photo_storage.clone(),
        monitor.clone(),
        inbox_port.clone(),
        user_port.clone(),
        country_port.clone(),
        photo_port.clone(),
        config.inbox_base_url.clone(),
        config.photo_base_url.clone(),
        clock.clone(),
    ));
    let notify_users = Arc::new(NotifyUsersService::new(
        user_port.clone(),
        inbox_port.clone(),
        mailer.clone(),
    ));
    let social_media = Arc::new(SocialMediaService::new(
        inbox_port.clone(),
        photo_port.clone(),
        station_port.clone(),
        user_port.clone(),
        mastodon.clone(),
        config.station_url.clone(),
    ));
    let statistic_service = Arc::new(StatisticService::new(station_port.clone()));

    crate::tasks::spawn_background_tasks(
        &config.tasks,
        photo_storage.clone(),
        notify_users,
        social_media,
    );

    let state = AppState {
        inbox_service,
        statistic_service,
        station_port,
        country_port,
        user_port,
    };
    let app = Router::new()
        .route("/", get(super::index))
        .merge(crate::web::router(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config
        .listen_address
        .unwrap_or(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000));
    let listener = TcpListener::bind(&addr)
        .await
        .context("failed to bind address")?;
    info!("listening on {addr}");

    axum::serve(listener, app.into_make_service())
        .await
        .context("failed to serve app")
}
