//! authgate CLI - credential and token tools
//!
//! Usage:
//!   authgate hash-password <password>
//!   authgate verify-password <hash> <password>
//!   authgate issue-token --user-id <id> --email <email> --first-name <name> --last-name <name> --role <role>
//!   authgate inspect-token <token>
//!   authgate check-config [--config <path>]

use anyhow::{bail, Context};
use authgate_api::auth::{
    IdentityClaims, JwtConfig, PasswordConfig, PasswordHasher, TokenIssuer, TokenValidator,
};
use authgate_core::{AppConfig, UserRole};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "authgate")]
#[command(about = "Credential and token lifecycle tools")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables still take precedence
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash a password with the configured Argon2 parameters
    HashPassword {
        password: String,
    },
    /// Check a password against a stored hash
    VerifyPassword {
        /// PHC-format hash
        hash: String,
        password: String,
    },
    /// Issue an access/refresh pair with the configured secret
    IssueToken {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// ADMIN or USER
        #[arg(long, default_value = "USER")]
        role: UserRole,
    },
    /// Validate a token and print its claims
    InspectToken {
        token: String,
    },
    /// Load and validate the configuration
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::HashPassword { password } => {
            let hasher = PasswordHasher::new(&PasswordConfig::from(&config.auth))?;
            println!("{}", hasher.hash(&password)?);
        }
        Commands::VerifyPassword { hash, password } => {
            let hasher = PasswordHasher::new(&PasswordConfig::from(&config.auth))?;
            if !hasher.verify(&hash, &password) {
                bail!("password does not match");
            }
            println!("ok");
        }
        Commands::IssueToken {
            user_id,
            email,
            first_name,
            last_name,
            role,
        } => {
            config.validate()?;
            let jwt = JwtConfig::from_app_config(&config)?;
            let identity = IdentityClaims {
                user_id,
                email,
                first_name,
                last_name,
                role,
            };
            let pair = TokenIssuer::new(&jwt).issue(&identity)?;
            tracing::debug!(user_id = %identity.user_id, "token pair issued");

            let output = serde_json::json!({
                "access_token": pair.access_token,
                "refresh_token": pair.refresh_token,
                "access_expires_at": pair.access_expires_at.to_rfc3339(),
                "refresh_expires_at": pair.refresh_expires_at.to_rfc3339(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::InspectToken { token } => {
            config.validate()?;
            let jwt = JwtConfig::from_app_config(&config)?;
            let claims = TokenValidator::new(&jwt)
                .validate(&token)
                .map_err(|e| anyhow::anyhow!("{} ({})", e, e.reason_code()))?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }
        Commands::CheckConfig => {
            config.validate().context("configuration is invalid")?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
