use clap::{Parser, Subcommand};

/// Chorus Controller: token issuance and validation for the control plane API
#[derive(Parser)]
#[command(name = "chorus-controller", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the controller server (migrates and bootstraps the system token first)
    Serve {
        /// Port to bind (defaults to HTTP_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage API tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Encrypt or decrypt stored secrets with ENCRYPTION_KEY
    Secret {
        #[command(subcommand)]
        command: SecretCommands,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Issue a new API token
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// RFC 3339 timestamp, e.g. 2026-01-01T00:00:00Z
        #[arg(long)]
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
    },
    /// List all tokens, newest first
    List,
    /// Print the system token (creating it if missing)
    System,
    /// Revoke a token by ID
    Revoke {
        #[arg(long)]
        id: String,
    },
    /// Permanently delete a token by ID
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
pub enum SecretCommands {
    /// Encrypt a plaintext secret
    Encrypt {
        #[arg(long)]
        plaintext: String,
    },
    /// Decrypt a stored ciphertext
    Decrypt {
        #[arg(long)]
        ciphertext: String,
    },
}
