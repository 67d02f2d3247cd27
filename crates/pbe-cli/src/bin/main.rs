//! pbe - password-based encryption from the command line
//!
//! Encrypts and decrypts text, decimals and integers with the same
//! settings and password an application would use, so values can be
//! prepared or inspected by hand.
//!
//! The password comes from `--password`, the `PBE_PASSWORD` environment
//! variable, or an interactive prompt, in that order.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};
use zeroize::Zeroizing;

use pbe_core::bigdecimal::BigDecimal;
use pbe_core::num_bigint::BigInt;
use pbe_core::{CipherSettings, Encryptor, SettingsManager};

/// Password-based encryption of text and numbers
#[derive(Parser, Debug)]
#[command(name = "pbe")]
#[command(author = "Symbia Labs")]
#[command(version)]
#[command(about = "Password-based encryption of text and numbers")]
struct Args {
    /// Settings file (defaults are used when omitted)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Encryption password
    #[arg(long, global = true, env = "PBE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encrypt a value
    Encrypt {
        /// How the value is interpreted
        #[arg(long, value_enum, default_value_t = Kind::Text)]
        kind: Kind,
        value: String,
    },
    /// Decrypt a value
    Decrypt {
        /// How the value is interpreted
        #[arg(long, value_enum, default_value_t = Kind::Text)]
        kind: Kind,
        value: String,
    },
    /// Manage settings files
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// List the built-in algorithms
    Algorithms,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Write a settings file with default values
    Init {
        file: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective cipher settings
    Show,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Decimal,
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries only results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    match &args.command {
        Command::Encrypt { kind, value } => {
            let settings = load_settings(args.settings.as_deref())?;
            let password = resolve_password(args.password.clone())?;
            println!(
                "{}",
                transform(&settings, &password, *kind, Direction::Encrypt, value)?
            );
        }
        Command::Decrypt { kind, value } => {
            let settings = load_settings(args.settings.as_deref())?;
            let password = resolve_password(args.password.clone())?;
            println!(
                "{}",
                transform(&settings, &password, *kind, Direction::Decrypt, value)?
            );
        }
        Command::Settings {
            command: SettingsCommand::Init { file, force },
        } => {
            if file.exists() && !force {
                bail!("{} already exists, use --force to overwrite", file.display());
            }
            SettingsManager::new(file)
                .save()
                .with_context(|| format!("Failed to write {}", file.display()))?;
            info!("Wrote default settings to {:?}", file);
        }
        Command::Settings {
            command: SettingsCommand::Show,
        } => {
            let settings = load_settings(args.settings.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        Command::Algorithms => {
            for algorithm in pbe_core::crypto::supported_algorithms() {
                println!("{}", algorithm);
            }
        }
    }

    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<CipherSettings> {
    match path {
        Some(path) => {
            let manager = SettingsManager::load(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?;
            Ok(manager.cipher().clone())
        }
        None => {
            debug!("No settings file given, using defaults");
            Ok(CipherSettings::default())
        }
    }
}

fn resolve_password(password: Option<String>) -> Result<Zeroizing<String>> {
    match password {
        Some(password) => Ok(Zeroizing::new(password)),
        None => {
            let password = rpassword::prompt_password("Password: ")?;
            Ok(Zeroizing::new(password))
        }
    }
}

/// Write a decimal as `<unscaled>E<exponent>` so parsing it back keeps the scale
fn format_decimal(value: &BigDecimal) -> String {
    let (unscaled, scale) = value.as_bigint_and_exponent();
    format!("{}E{}", unscaled, -scale)
}

/// Run one encryption or decryption of a command-line value
fn transform(
    settings: &CipherSettings,
    password: &str,
    kind: Kind,
    direction: Direction,
    value: &str,
) -> Result<String> {
    let output = match kind {
        Kind::Text => {
            let encryptor = settings.text(password)?;
            match direction {
                Direction::Encrypt => encryptor.encrypt(value)?,
                Direction::Decrypt => encryptor.decrypt(value)?,
            }
        }
        Kind::Decimal => {
            let encryptor = settings.decimal(password)?;
            let number = BigDecimal::from_str(value.trim())
                .with_context(|| format!("Not a decimal number: {}", value))?;
            let result = match direction {
                Direction::Encrypt => encryptor.encrypt(&number)?,
                Direction::Decrypt => encryptor.decrypt(&number)?,
            };
            format_decimal(&result)
        }
        Kind::Integer => {
            let encryptor = settings.integer(password)?;
            let number = BigInt::from_str(value.trim())
                .with_context(|| format!("Not an integer: {}", value))?;
            let result = match direction {
                Direction::Encrypt => encryptor.encrypt(&number)?,
                Direction::Decrypt => encryptor.decrypt(&number)?,
            };
            result.to_string()
        }
    };

    Ok(output)
}
