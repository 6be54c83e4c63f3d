//! Common utilities shared across examples.

#![allow(dead_code)]

use std::env;
use std::sync::Arc;

use anyhow::Context;
use ironiso_dictionary::FieldDictionary;
use ironiso_dictionary::embedded::{iso87_ascii, iso87_binary};
use ironiso_packager::{BitmapEncoding, Packager, PackagerConfig};
use ironiso_transport::FrameCodec;

/// Default server port.
pub const DEFAULT_PORT: u16 = 8583;

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Example configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ExampleConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Card acceptor terminal id (DE 41).
    pub terminal_id: String,
    /// `binary` or `ascii`.
    pub dialect: String,
    /// Optional TOML file with packager settings.
    pub packager_config: Option<String>,
}

impl ExampleConfig {
    /// Loads the configuration from `ISO_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            host: env::var("ISO_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("ISO_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            terminal_id: env::var("ISO_TERMINAL").unwrap_or_else(|_| "TERM0001".to_string()),
            dialect: env::var("ISO_DIALECT").unwrap_or_else(|_| "binary".to_string()),
            packager_config: env::var("ISO_PACKAGER_CONFIG").ok(),
        }
    }

    /// Returns the socket address string.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builds the packager for the configured dialect.
    pub fn packager(&self) -> anyhow::Result<Arc<Packager>> {
        let (dictionary, default_config): (FieldDictionary, PackagerConfig) =
            match self.dialect.as_str() {
                "ascii" => (
                    iso87_ascii()?,
                    PackagerConfig::new().with_bitmap_encoding(BitmapEncoding::Hex),
                ),
                "binary" => (iso87_binary()?, PackagerConfig::new()),
                other => anyhow::bail!("unknown dialect {other}"),
            };
        let config = match &self.packager_config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading packager config {path}"))?;
                toml::from_str(&text).with_context(|| format!("parsing packager config {path}"))?
            }
            None => default_config,
        };
        Ok(Arc::new(Packager::new(Arc::new(dictionary), config)))
    }

    /// Returns the framing shared by client and server.
    #[must_use]
    pub fn frame_codec(&self) -> FrameCodec {
        FrameCodec::new()
    }
}

/// Initializes logging for examples.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}
