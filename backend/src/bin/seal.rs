// Seals a reading the way a field device does and prints (or sends) the envelope.

use std::net::{SocketAddr, UdpSocket};

use anyhow::{Context, Result};
use clap::Parser;

use soilwatch_core::aead::{Key, Nonce, Variant};
use soilwatch_core::envelope::{DEFAULT_SENSOR, DEFAULT_UNIT};
use soilwatch_core::model::ReadingWidth;
use soilwatch_core::verify::SensorCipher;
use soilwatch_server::constants::{
    DEFAULT_ASCON_AD, DEFAULT_ASCON_KEY, DEFAULT_ASCON_NONCE, DEFAULT_ASCON_VARIANT,
};

/// Encrypt a numeric reading into a telemetry envelope.
#[derive(Parser)]
#[command(name = "soilwatch-seal")]
#[command(about = "Encrypt a sensor reading into an Ascon telemetry envelope", long_about = None)]
struct Cli {
    /// The reading to encrypt
    value: u64,

    /// Sensor kind recorded in the envelope
    #[arg(long, default_value = DEFAULT_SENSOR)]
    sensor: String,

    /// Unit recorded in the envelope
    #[arg(long, default_value = DEFAULT_UNIT)]
    unit: String,

    #[arg(long, env = "ASCON_KEY", default_value = DEFAULT_ASCON_KEY, hide_env_values = true)]
    key: String,

    #[arg(long, env = "ASCON_NONCE", default_value = DEFAULT_ASCON_NONCE)]
    nonce: String,

    #[arg(long, env = "ASCON_AD", default_value = DEFAULT_ASCON_AD)]
    associated_data: String,

    #[arg(long, env = "ASCON_VARIANT", default_value = DEFAULT_ASCON_VARIANT)]
    variant: String,

    /// Fixed plaintext width in bytes; minimal width when omitted
    #[arg(long, env = "READING_WIDTH")]
    width: Option<usize>,

    /// Send the envelope to a UDP ingest address instead of only printing it
    #[arg(long)]
    send: Option<SocketAddr>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let variant: Variant = cli.variant.parse()?;
    let key = Key::new(variant, cli.key.as_bytes())?;
    let nonce = Nonce::from_slice(cli.nonce.as_bytes())?;
    let width = match cli.width {
        Some(width) => ReadingWidth::exact(width)?,
        None => ReadingWidth::Flexible,
    };
    let cipher = SensorCipher::new(key, nonce, cli.associated_data.into_bytes(), width);

    let envelope = cipher.seal_envelope(cli.value, &cli.sensor, &cli.unit)?;
    println!("{envelope}");

    if let Some(target) = cli.send {
        let socket = UdpSocket::bind("0.0.0.0:0").context("failed to bind udp socket")?;
        socket
            .send_to(envelope.as_bytes(), target)
            .with_context(|| format!("failed to send envelope to {target}"))?;
        eprintln!("sent to {target}");
    }
    Ok(())
}
