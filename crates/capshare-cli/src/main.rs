//! capshare CLI: issue signed upload and download links.
//!
//! Keys come from `--key` or from the same `USERS` variable the server reads.

use anyhow::{anyhow, Context};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use capshare_cli::{build_link, init_tracing, parse_duration, parse_permission, parse_size, random_token};
use capshare_core::{AccessGrant, UserKeys};
use clap::{Parser, Subcommand};

const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080/";

#[derive(Parser)]
#[command(name = "capshare", about = "capshare link issuing tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint a signed link for one token
    Mint {
        /// User whose key signs the grant
        #[arg(long)]
        username: String,
        /// Base64 key; looked up in USERS when omitted
        #[arg(long)]
        key: Option<String>,
        /// File token; random when omitted
        #[arg(long)]
        token: Option<String>,
        /// r (download) or w (upload/delete)
        #[arg(long, default_value = "w")]
        permission: String,
        /// Lifetime of the link, e.g. 30s, 10m, 2h, 7d or 1h30m
        #[arg(long, default_value = "10m")]
        duration: String,
        /// Upload ceiling, e.g. 512KB, 10MB, 1GB
        #[arg(long, default_value = "10MB")]
        size: String,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Mint {
            username,
            key,
            token,
            permission,
            duration,
            size,
        } => {
            let key = match key {
                Some(encoded) => STANDARD
                    .decode(encoded.trim())
                    .context("--key is not valid base64")?,
                None => {
                    let users = UserKeys::parse(&std::env::var("USERS").unwrap_or_default())?;
                    users
                        .get(&username)
                        .map(<[u8]>::to_vec)
                        .ok_or_else(|| anyhow!("no key for \"{}\": pass --key or set USERS", username))?
                }
            };

            let grant = AccessGrant {
                token: token.unwrap_or_else(random_token),
                until: chrono::Utc::now()
                    .timestamp()
                    .checked_add(parse_duration(&duration)?)
                    .ok_or_else(|| anyhow!("duration \"{}\" is too large", duration))?,
                max_size: parse_size(&size)?,
                permission: parse_permission(&permission)?,
            };

            if !grant.has_safe_token() {
                return Err(anyhow!("token \"{}\" is not a safe path component", grant.token));
            }

            let public_url =
                std::env::var("PUBLIC_URL").unwrap_or_else(|_| DEFAULT_PUBLIC_URL.to_string());

            tracing::debug!(username = %username, token = %grant.token, until = grant.until, "Minted grant");
            println!("{}", build_link(&public_url, &username, &key, &grant)?);
        }
    }

    Ok(())
}
