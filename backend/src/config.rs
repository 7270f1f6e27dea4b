// Process configuration read from environment variables.
// Invariants: key material is validated against the variant before the server starts and is never logged.

use std::env;
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use soilwatch_core::aead::{AeadError, Key, Nonce, Variant};
use soilwatch_core::model::ReadingWidth;
use soilwatch_core::verify::SensorCipher;

use crate::constants::{
    DEFAULT_ASCON_AD, DEFAULT_ASCON_KEY, DEFAULT_ASCON_NONCE, DEFAULT_ASCON_VARIANT,
    DEFAULT_HTTP_BIND, DEFAULT_HTTP_PORT, DEFAULT_INGEST_QUEUE_CAP, DEFAULT_OBSERVER_QUEUE_CAP,
    DEFAULT_UDP_BIND, DEFAULT_UDP_PORT,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
    #[error(transparent)]
    Cipher(#[from] AeadError),
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub http_addr: SocketAddr,
    pub udp_addr: SocketAddr,
    pub variant: Variant,
    pub key: Key,
    pub nonce: Nonce,
    pub associated_data: Vec<u8>,
    pub reading_width: ReadingWidth,
    pub observer_queue_cap: usize,
    pub ingest_queue_cap: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let http_addr = socket_addr(
            "HTTP_BIND",
            &get("HTTP_BIND", DEFAULT_HTTP_BIND),
            "HTTP_PORT",
            lookup("HTTP_PORT"),
            DEFAULT_HTTP_PORT,
        )?;
        let udp_addr = socket_addr(
            "INGEST_UDP_BIND",
            &get("INGEST_UDP_BIND", DEFAULT_UDP_BIND),
            "INGEST_UDP_PORT",
            lookup("INGEST_UDP_PORT"),
            DEFAULT_UDP_PORT,
        )?;

        let variant: Variant = get("ASCON_VARIANT", DEFAULT_ASCON_VARIANT).parse()?;
        let key = Key::new(variant, get("ASCON_KEY", DEFAULT_ASCON_KEY).as_bytes())?;
        let nonce = Nonce::from_slice(get("ASCON_NONCE", DEFAULT_ASCON_NONCE).as_bytes())?;
        let associated_data = get("ASCON_AD", DEFAULT_ASCON_AD).into_bytes();

        let reading_width = match lookup("READING_WIDTH") {
            None => ReadingWidth::Flexible,
            Some(value) => value
                .parse::<usize>()
                .ok()
                .and_then(|width| ReadingWidth::exact(width).ok())
                .ok_or(ConfigError::InvalidValue {
                    name: "READING_WIDTH",
                    value,
                })?,
        };

        let observer_queue_cap =
            capacity("OBSERVER_QUEUE_CAP", lookup("OBSERVER_QUEUE_CAP"), DEFAULT_OBSERVER_QUEUE_CAP)?;
        let ingest_queue_cap =
            capacity("INGEST_QUEUE_CAP", lookup("INGEST_QUEUE_CAP"), DEFAULT_INGEST_QUEUE_CAP)?;

        Ok(Self {
            http_addr,
            udp_addr,
            variant,
            key,
            nonce,
            associated_data,
            reading_width,
            observer_queue_cap,
            ingest_queue_cap,
        })
    }

    pub fn cipher(&self) -> SensorCipher {
        SensorCipher::new(
            self.key.clone(),
            self.nonce,
            self.associated_data.clone(),
            self.reading_width,
        )
    }
}

fn socket_addr(
    bind_name: &'static str,
    bind: &str,
    port_name: &'static str,
    port: Option<String>,
    default_port: u16,
) -> Result<SocketAddr, ConfigError> {
    let ip = bind.parse::<IpAddr>().map_err(|_| ConfigError::InvalidValue {
        name: bind_name,
        value: bind.to_string(),
    })?;
    let port = match port {
        None => default_port,
        Some(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
            name: port_name,
            value,
        })?,
    };
    Ok(SocketAddr::new(ip, port))
}

fn capacity(name: &'static str, value: Option<String>, default: usize) -> Result<usize, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => match value.parse::<usize>() {
            Ok(cap) if cap > 0 => Ok(cap),
            _ => Err(ConfigError::InvalidValue { name, value }),
        },
    }
}
