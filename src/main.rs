use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ezurl_uploader::{
    api::HttpBackend,
    config::Config,
    form::{self, ExpireDays, ShortenForm},
    upload::{format_size, FileUploader, RawFile, UploadPolicy, UploadStatus},
    Session,
};

#[derive(Parser)]
#[command(name = "ezurl", about = "Shorten links, images and videos with EZURL", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Shorten a URL
    Url {
        url: String,
        #[command(flatten)]
        form: FormArgs,
    },
    /// Upload up to three images behind one short link
    Images {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        form: FormArgs,
    },
    /// Upload a single video behind a short link
    Video {
        file: PathBuf,
        #[command(flatten)]
        form: FormArgs,
    },
}

#[derive(Args)]
struct FormArgs {
    /// Protect the link with this password
    #[arg(long)]
    password: Option<String>,
    /// Protect the link with today's date (YYYYMMDD) as the password
    #[arg(long, conflicts_with = "password")]
    today_password: bool,
    /// Days until the link expires: 1, 7, 14 or 30
    #[arg(long, default_value = "30")]
    expire: ExpireDays,
    /// Free-text description, at most 500 characters
    #[arg(long)]
    description: Option<String>,
}

impl FormArgs {
    fn into_form(self) -> ShortenForm {
        let mut form = ShortenForm {
            password_enabled: self.password.is_some() || self.today_password,
            password: self.password,
            expire: self.expire,
            description: self.description,
        };
        if self.today_password {
            form.fill_today_password();
        }
        form
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the short link
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let config = Config::load()?;
    info!(api = %config.api.base_url, "ezurl {}", env!("CARGO_PKG_VERSION"));

    let backend = HttpBackend::from_config(&config.api).context("Failed to build HTTP client")?;
    let session = Session::new(config, Arc::new(backend));

    let id = match cli.command {
        Command::Url { url, form } => {
            let request = form.into_form().url_request(&url)?;
            form::submit(session.backend.as_ref(), &request).await?
        }
        Command::Images { files, form } => {
            let policy = session.config.image_policy();
            upload_and_submit(&session, policy, files, form.into_form()).await?
        }
        Command::Video { file, form } => {
            let policy = session.config.video_policy();
            upload_and_submit(&session, policy, vec![file], form.into_form()).await?
        }
    };

    println!("{}", form::short_link(&session.config.api.share_base_url, &id));
    Ok(())
}

async fn upload_and_submit(
    session: &Session,
    policy: UploadPolicy,
    paths: Vec<PathBuf>,
    form: ShortenForm,
) -> anyhow::Result<String> {
    let mut batch = Vec::with_capacity(paths.len());
    for path in &paths {
        let file = RawFile::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        batch.push(file);
    }

    info!(
        accepts = policy.accepted_kind.accept_attr(),
        max_files = policy.max_files,
        max_size = %format_size(policy.max_file_size_bytes),
        "Selecting {}",
        policy.accepted_kind.label()
    );

    let uploader: FileUploader = session
        .uploader(policy)
        .with_on_files_selected(|entries| {
            for (index, entry) in entries.iter().enumerate() {
                let file = entry.raw_file();
                let state = match entry.status() {
                    UploadStatus::Pending => "pending",
                    UploadStatus::Uploaded(_) => "uploaded",
                    UploadStatus::Failed(_) => "failed",
                };
                info!(
                    index,
                    name = %file.name(),
                    size = %format_size(file.size()),
                    state,
                    "Selected file"
                );
            }
        });

    let report = tokio::select! {
        report = uploader.offer(batch) => report,
        _ = shutdown_signal() => {
            uploader.shutdown();
            anyhow::bail!("Interrupted, uploads cancelled");
        }
    };

    if let Some(error) = uploader.error() {
        tracing::warn!(%error, "Some files were not uploaded");
    }
    if report.accepted() == 0 {
        anyhow::bail!("No files were accepted");
    }

    let request = form.files_request(&uploader.entries())?;
    let id = form::submit(session.backend.as_ref(), &request).await?;
    Ok(id)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, cancelling uploads");
}
