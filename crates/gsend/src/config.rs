//! Command-line options and the run configuration resolved from them.

use anyhow::{Context, Result};
use clap::Parser;
use gsend_gmail::OutgoingEmail;
use std::path::{Path, PathBuf};

/// Directory under the home directory holding the default files.
const DEFAULT_DIR: &str = ".gmail";
const DEFAULT_CREDENTIALS_FILE: &str = "gmail_credentials.json";
const DEFAULT_TOKEN_FILE: &str = "gmail_token.json";

/// Send an email through the Gmail API.
#[derive(Debug, Parser)]
#[command(name = "gsend", version, about = "Send an email through the Gmail API")]
pub struct Cli {
    /// Gmail account to send from
    #[arg(long, env = "GSEND_GMAIL_ACCOUNT", value_name = "EMAIL")]
    pub gmail_account: String,

    /// Primary recipient (repeatable)
    #[arg(long, env = "GSEND_EMAIL_TO", value_name = "EMAIL", required = true)]
    pub email_to: Vec<String>,

    /// Subject of the email
    #[arg(long, env = "GSEND_EMAIL_SUBJECT")]
    pub email_subject: String,

    /// Plain-text body of the email
    #[arg(long, env = "GSEND_EMAIL_BODY")]
    pub email_body: String,

    /// Carbon-copy recipient (repeatable)
    #[arg(long, env = "GSEND_EMAIL_CC", value_name = "EMAIL")]
    pub email_cc: Vec<String>,

    /// Blind carbon-copy recipient (repeatable)
    #[arg(long, env = "GSEND_EMAIL_BCC", value_name = "EMAIL")]
    pub email_bcc: Vec<String>,

    /// File to attach (repeatable)
    #[arg(
        long = "email-attachment",
        alias = "email-attachements",
        env = "GSEND_EMAIL_ATTACHMENTS",
        value_name = "PATH"
    )]
    pub email_attachments: Vec<PathBuf>,

    /// OAuth client-secrets file [default: ~/.gmail/gmail_credentials.json]
    #[arg(long, env = "GSEND_GMAIL_CREDENTIALS_FILE", value_name = "PATH")]
    pub gmail_credentials_file: Option<PathBuf>,

    /// Token cache file [default: ~/.gmail/gmail_token.json]
    #[arg(long, env = "GSEND_GMAIL_TOKEN_FILE", value_name = "PATH")]
    pub gmail_token_file: Option<PathBuf>,
}

/// Everything one run needs, with paths resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Client-secrets file.
    pub credentials_file: PathBuf,
    /// Token cache file.
    pub token_file: PathBuf,
    /// The email to send.
    pub email: OutgoingEmail,
}

impl Config {
    /// Resolves defaults and expands `~` in every path.
    ///
    /// # Errors
    ///
    /// Returns an error if a default or `~` path is needed and the home
    /// directory cannot be determined.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let home = dirs::home_dir();
        let resolve = |path: Option<PathBuf>, default_name: &str| -> Result<PathBuf> {
            match path {
                Some(path) => expand_tilde(&path, home.as_deref()),
                None => home
                    .as_deref()
                    .map(|home| home.join(DEFAULT_DIR).join(default_name))
                    .context("Cannot determine home directory for default paths"),
            }
        };

        let credentials_file = resolve(cli.gmail_credentials_file, DEFAULT_CREDENTIALS_FILE)?;
        let token_file = resolve(cli.gmail_token_file, DEFAULT_TOKEN_FILE)?;
        let attachments = cli
            .email_attachments
            .iter()
            .map(|path| expand_tilde(path, home.as_deref()))
            .collect::<Result<Vec<_>>>()?;

        let email = OutgoingEmail::new(
            cli.gmail_account,
            cli.email_subject,
            cli.email_body,
            cli.email_to,
        )
        .with_cc(cli.email_cc)
        .with_bcc(cli.email_bcc)
        .with_attachments(attachments);

        Ok(Self {
            credentials_file,
            token_file,
            email,
        })
    }
}

/// Replaces a leading `~` component with `home`.
fn expand_tilde(path: &Path, home: Option<&Path>) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => home
            .map(|home| home.join(rest))
            .with_context(|| format!("Cannot expand {} without a home directory", path.display())),
        Err(_) => Ok(path.to_path_buf()),
    }
}
