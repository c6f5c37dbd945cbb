use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use pagewarden::access::DenialChoice;
use pagewarden::config::{Config, QueryOverrides};
use pagewarden::identity::{authorization_url, Credentials};
use pagewarden::source::DocumentLocation;
use pagewarden::viewer::Viewer;
use std::path::PathBuf;

/// Pagewarden - watermarking PDF viewer
#[derive(Parser, Debug)]
#[command(name = "pagewarden")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticate, resolve, render and watermark a document into a viewer directory
    View(ViewArgs),
    /// Print the authorization URL for the redirect flow
    LoginUrl,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OnDenied {
    Request,
    Sample,
}

impl From<OnDenied> for DenialChoice {
    fn from(value: OnDenied) -> Self {
        match value {
            OnDenied::Request => DenialChoice::RequestAccess,
            OnDenied::Sample => DenialChoice::ViewSample,
        }
    }
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Raw query string carrying pdf, wm, email and token parameters
    #[arg(long)]
    query: Option<String>,

    /// Document location (Drive URL or id, HTTP URL, local path)
    #[arg(long)]
    pdf: Option<String>,

    /// Literal watermark text
    #[arg(long)]
    wm: Option<String>,

    /// Preset reader email
    #[arg(long)]
    email: Option<String>,

    /// Preset bearer token
    #[arg(long)]
    token: Option<String>,

    /// Google ID token from the credential flow
    #[arg(long)]
    id_token: Option<String>,

    /// Access token obtained alongside the ID token
    #[arg(long)]
    access_token: Option<String>,

    /// Authorization code to exchange for an access token
    #[arg(long)]
    auth_code: Option<String>,

    /// URL the identity provider redirected back to
    #[arg(long)]
    redirect_url: Option<String>,

    /// State printed by `login-url`, checked against the redirect
    #[arg(long)]
    state: Option<String>,

    /// What to do when access is denied
    #[arg(long, value_enum, default_value = "request")]
    on_denied: OnDenied,

    /// Output directory (overrides output.directory)
    #[arg(long)]
    out: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(Config::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::LoginUrl => {
            config.validate().context("Invalid configuration")?;
            pagewarden::logging::init_subscriber(&config.logging)
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

            let request = authorization_url(&config.identity)?;
            println!("{}", request.url);
            eprintln!("state: {}", request.state);
            eprintln!("nonce: {}", request.nonce);
            Ok(())
        }
        Command::View(args) => {
            let overrides = config_with_args(&mut config, &args);
            view(config, overrides, args).await
        }
    }
}

fn config_with_args(config: &mut Config, args: &ViewArgs) -> QueryOverrides {
    let flags = QueryOverrides {
        pdf: args.pdf.clone(),
        wm: args.wm.clone(),
        email: args.email.clone(),
        token: args.token.clone(),
    };
    let overrides = match &args.query {
        Some(query) => flags.or(QueryOverrides::from_query(query)),
        None => flags,
    };

    config.apply_overrides(&overrides);
    if let Some(out) = &args.out {
        config.output.directory = out.clone();
    }
    overrides
}

async fn view(config: Config, overrides: QueryOverrides, args: ViewArgs) -> anyhow::Result<()> {
    config.validate().context("Invalid configuration")?;

    pagewarden::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!(
        source = %config.document.source,
        output = %config.output.directory.display(),
        zoom = config.render.zoom,
        script_endpoint = config.endpoints.script.is_some(),
        "Configuration loaded successfully"
    );

    let credentials = Credentials {
        preset_email: overrides.email.clone(),
        preset_token: overrides.token.clone(),
        redirect_url: args.redirect_url.clone(),
        expected_state: args.state.clone(),
        id_token: args.id_token.clone(),
        access_token: args.access_token.clone(),
        auth_code: args.auth_code.clone(),
    };
    let location = DocumentLocation::parse(&config.document.source);

    let mut viewer = Viewer::new(config)?;
    let outcome = viewer
        .run(&credentials, &location, args.on_denied.into())
        .await?;

    match &outcome.message {
        Some(message) => eprintln!("{}", message),
        None => {
            if let Some(notice) = &outcome.notice {
                eprintln!("{}", notice.heading);
                if let Some(status) = &notice.status {
                    eprintln!("{}", status);
                }
            }
            if let Some(label) = &outcome.label {
                eprintln!("{}", label);
            }
        }
    }
    println!("{}", outcome.index_path.display());

    let stats = viewer.shutdown().await;
    tracing::info!(
        state = %outcome.state,
        identity = outcome.session.identity().unwrap_or("Guest"),
        pages = outcome.pages.len(),
        reports_delivered = stats.delivered,
        reports_failed = stats.failed,
        reports_dropped = stats.dropped,
        "Viewer finished"
    );

    Ok(())
}
