// Shared constants for server defaults, protocol, and limits.

pub const SCHEMA_VERSION: &str = "1.0";
pub const SERVICE_NAME: &str = "soil-moisture-monitor";

pub const DEFAULT_HTTP_BIND: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 5000;
pub const DEFAULT_UDP_BIND: &str = "127.0.0.1";
pub const DEFAULT_UDP_PORT: u16 = 33750;

pub const DEFAULT_ASCON_KEY: &str = "asconciphertest1";
pub const DEFAULT_ASCON_NONCE: &str = "asconcipher1test";
pub const DEFAULT_ASCON_AD: &str = "ASCON";
pub const DEFAULT_ASCON_VARIANT: &str = "Ascon-128";

pub const DEFAULT_OBSERVER_QUEUE_CAP: usize = 16;
pub const DEFAULT_INGEST_QUEUE_CAP: usize = 256;
pub const MAX_DATAGRAM_LEN: usize = 4096;
pub const UDP_REBIND_DELAY_MS: u64 = 1000;
pub const CIPHERTEXT_LOG_PREVIEW: usize = 20;
