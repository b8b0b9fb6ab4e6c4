use crate::config::AppConfig;
use crate::error::AppError;
use crate::placement::jobs::{issue_token, Identity, Role};
use crate::server;
use clap::{Args, Parser, Subcommand};

const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

#[derive(Parser, Debug)]
#[command(
    name = "Campus Placement Portal",
    about = "Run the campus placement job board service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Mint a bearer token for local testing against the configured secret
    IssueToken(IssueTokenArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct IssueTokenArgs {
    /// Student or recruiter identifier placed in the `sub` claim
    #[arg(long)]
    pub(crate) subject: String,
    /// Caller role: student or recruiter
    #[arg(long, value_parser = parse_role)]
    pub(crate) role: Role,
    /// Optional display name
    #[arg(long)]
    pub(crate) name: Option<String>,
}

fn parse_role(raw: &str) -> Result<Role, String> {
    Role::parse(raw).ok_or_else(|| format!("unknown role '{raw}' (expected student or recruiter)"))
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::IssueToken(args) => {
            let token = mint_token(args)?;
            println!("{token}");
            Ok(())
        }
    }
}

fn mint_token(args: IssueTokenArgs) -> Result<String, AppError> {
    let config = AppConfig::load()?;
    let ttl_hours = i64::try_from(config.auth.token_ttl_hours)
        .unwrap_or(MAX_TOKEN_TTL_HOURS)
        .min(MAX_TOKEN_TTL_HOURS);
    let identity = Identity {
        id: args.subject,
        role: args.role,
        name: args.name,
    };
    issue_token(
        &config.auth.jwt_secret,
        &identity,
        chrono::Duration::hours(ttl_hours),
    )
    .map_err(AppError::from)
}
