//! Command-line configuration for the weft demo server.
//!
//! Every `serve` option can also be set through the environment with the
//! `WEFT_` prefix:
//!
//! - `WEFT_HOST` - Server bind address (default: 0.0.0.0)
//! - `WEFT_PORT` - Server port (default: 3000)
//! - `WEFT_SESSION_SECRET` - Cookie session secret, at least 10 bytes
//! - `WEFT_JSON_ERRORS` - Render errors as JSON (default: false)
//! - `WEFT_BODY_LIMIT` - Request body limit in bytes (default: 2 MiB)
//! - `WEFT_CORS_ORIGINS` - Allowed CORS origins, comma-separated
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use weft::config::{Cli, Command};
//!
//! match Cli::parse().command {
//!     Command::Serve(config) => println!("listening on {}", config.bind_address()),
//!     Command::Routes => {}
//! }
//! ```

use clap::{Args, Parser, Subcommand};

use crate::error::ConfigError;
use crate::server::{ServerConfig, DEFAULT_BODY_LIMIT};
use crate::session::MIN_SECRET_LEN;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

// =============================================================================
// CLI Arguments
// =============================================================================

/// weft - composable HTTP handlers, served as a small demo wiki.
#[derive(Parser, Debug, Clone)]
#[command(name = "weft")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the demo server.
    Serve(ServeConfig),

    /// Print the demo application's route table and exit.
    Routes,
}

/// Options for `weft serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "WEFT_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "WEFT_PORT")]
    pub port: u16,

    /// Largest accepted request body, in bytes.
    #[arg(long, default_value_t = DEFAULT_BODY_LIMIT, env = "WEFT_BODY_LIMIT")]
    pub body_limit: usize,

    /// Allowed CORS origins (comma-separated). CORS is off when unset.
    #[arg(long, env = "WEFT_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Application Configuration
    // =========================================================================
    /// Secret used to derive the cookie session key.
    ///
    /// If not provided, a random secret is generated at startup and
    /// sessions do not survive a restart.
    #[arg(long, env = "WEFT_SESSION_SECRET")]
    pub session_secret: Option<String>,

    /// Render errors as `{"err": ...}` instead of plain text.
    #[arg(long, default_value_t = false, env = "WEFT_JSON_ERRORS")]
    pub json_errors: bool,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Check the options that clap cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.body_limit == 0 {
            return Err(ConfigError::ZeroBodyLimit);
        }
        if let Some(secret) = &self.session_secret {
            if secret.len() < MIN_SECRET_LEN {
                return Err(ConfigError::SecretTooShort {
                    min: MIN_SECRET_LEN,
                    actual: secret.len(),
                });
            }
        }
        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The axum binding's configuration.
    pub fn to_server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::new()
            .with_body_limit(self.body_limit)
            .with_tracing(!self.no_tracing);
        if let Some(origins) = &self.cors_origins {
            config = config.with_cors_origins(origins.clone());
        }
        config
    }
}

// =============================================================================
// Tests
// =============================================================================
