use std::fmt;
use std::path::PathBuf;

use storage::repository::Storage;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkthrough_core::model::{OrgId, ScriptDraft};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    scripts: PathBuf,
    org: Option<OrgId>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidOrg { raw: String },
    MissingScripts,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidOrg { raw } => write!(f, "invalid --org value: {raw}"),
            ArgsError::MissingScripts => write!(f, "--scripts <file> is required"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_org(raw: String) -> Result<OrgId, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidOrg { raw })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("WALKTHROUGH_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut scripts = std::env::var("WALKTHROUGH_SCRIPTS").ok().map(PathBuf::from);
        let mut org = match std::env::var("WALKTHROUGH_ORG") {
            Ok(value) => Some(parse_org(value)?),
            Err(_) => None,
        };

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--scripts" => {
                    let value = require_value(&mut args, "--scripts")?;
                    scripts = Some(PathBuf::from(value));
                }
                "--org" => {
                    let value = require_value(&mut args, "--org")?;
                    org = Some(parse_org(value)?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            scripts: scripts.ok_or(ArgsError::MissingScripts)?,
            org,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- --scripts <file.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --scripts <file>          JSON array of walkthrough scripts to load");
    eprintln!("  --org <org_id>            Store as this organization's scripts instead of defaults");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  WALKTHROUGH_DB_URL, WALKTHROUGH_SCRIPTS, WALKTHROUGH_ORG");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let raw = std::fs::read_to_string(&args.scripts)?;
    let drafts: Vec<ScriptDraft> = serde_json::from_str(&raw)?;

    // Reject the whole file before writing anything.
    for draft in &drafts {
        draft.clone().validate()?;
    }

    let storage = Storage::sqlite(&args.db_url).await?;
    for draft in &drafts {
        match &args.org {
            Some(org) => storage.scripts.upsert_org_script(org, draft).await?,
            None => storage.scripts.upsert_default_script(draft).await?,
        }
        tracing::info!(class_code = %draft.class_code, "seeded script");
    }

    let target = args
        .org
        .as_ref()
        .map_or_else(|| "defaults".to_string(), |org| format!("org {org}"));
    println!(
        "Seeded {} scripts as {} into {}",
        drafts.len(),
        target,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
