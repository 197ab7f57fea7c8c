//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::{Database, NewUser, UserRole};
use crate::password::{hash_password, validate_password};
use clap::Parser;
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::{error, info, warn};
use uuid::Uuid;

const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Length of the throwaway secret generated in development.
const EPHEMERAL_SECRET_LENGTH: usize = 64;

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Production,
    Development,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "hireportal",
    about = "Recruitment agency API with staff accounts and job postings"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "7291")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "hireportal.db")]
    pub database: String,

    /// Deployment environment. Production requires a configured JWT secret
    #[arg(long, env = "APP_ENV", value_enum, default_value = "production")]
    pub env: Environment,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Create an admin account with this email on startup (password from ADMIN_PASSWORD)
    #[arg(long, value_name = "EMAIL")]
    pub create_admin: Option<String>,

    /// Trust X-Forwarded-For for client IPs. Only enable behind a reverse proxy
    #[arg(long, env = "TRUST_PROXY")]
    pub trust_proxy: bool,

    /// Send cookies without the Secure flag (local HTTP development)
    #[arg(long)]
    pub insecure_cookies: bool,

    /// Log output format
    #[arg(short, long, env = "LOG_FORMAT", value_enum, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the JWT secret from the environment or a file.
///
/// Production refuses to start without a strong secret. Development falls
/// back to a random secret, which invalidates every session on restart.
/// Returns None after logging when startup must abort.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>, env: Environment) -> Option<String> {
    let configured = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // SAFETY: called during startup before the runtime spawns any task
        // that reads the environment.
        unsafe { std::env::remove_var("JWT_SECRET") };
        Some(secret)
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => Some(content.trim().to_string()),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        None
    };

    check_jwt_secret(configured, env)
}

fn check_jwt_secret(configured: Option<String>, env: Environment) -> Option<String> {
    let Some(secret) = configured.filter(|s| !s.is_empty()) else {
        if env == Environment::Production {
            error!(
                "JWT secret is required in production. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
            );
            return None;
        }
        warn!("No JWT secret configured, using a random one. Sessions will not survive a restart");
        return Some(random_secret());
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        if env == Environment::Production {
            error!(
                "JWT secret is shorter than {} characters. Use a longer secret",
                MIN_JWT_SECRET_LENGTH
            );
            return None;
        }
        warn!(
            "JWT secret is shorter than {} characters. This is only acceptable in development",
            MIN_JWT_SECRET_LENGTH
        );
    }

    Some(secret)
}

fn random_secret() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(EPHEMERAL_SECRET_LENGTH)
        .map(char::from)
        .collect()
}

/// Handle `--create-admin <email>`: create an admin account unless one with
/// that email already exists.
pub async fn handle_create_admin(db: &Database, email: &str) {
    let password = match std::env::var("ADMIN_PASSWORD") {
        Ok(password) => {
            // SAFETY: see load_jwt_secret.
            unsafe { std::env::remove_var("ADMIN_PASSWORD") };
            password
        }
        Err(_) => {
            error!("ADMIN_PASSWORD environment variable is required with --create-admin");
            std::process::exit(1);
        }
    };

    if let Err(msg) = validate_password(&password) {
        error!("Invalid ADMIN_PASSWORD: {}", msg);
        std::process::exit(1);
    }

    match db.users().get_by_email(email).await {
        Ok(Some(existing)) => {
            println!();
            println!("User already exists: {} ({})", existing.email, existing.role);
            println!();
            return;
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "Failed to check for existing admin");
            std::process::exit(1);
        }
    }

    let password_hash = match hash_password(&password) {
        Ok(hash) => hash,
        Err(e) => {
            error!(error = %e, "Failed to hash admin password");
            std::process::exit(1);
        }
    };

    let uuid = Uuid::new_v4().to_string();
    let result = db
        .users()
        .create(NewUser {
            uuid: &uuid,
            email,
            name: "Administrator",
            password_hash: &password_hash,
            role: UserRole::Admin,
        })
        .await;

    match result {
        Ok(_) => {
            info!(user = %uuid, "Admin user created");
            println!();
            println!("Admin user created: {}", email);
            println!();
        }
        Err(e) => {
            error!(error = %e, "Failed to create admin user");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    jwt_secret: String,
    env: Environment,
    insecure_cookies: bool,
    trust_proxy: bool,
) -> ServerConfig {
    let secure_cookies = env == Environment::Production || !insecure_cookies;

    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        secure_cookies,
        trust_proxy,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
