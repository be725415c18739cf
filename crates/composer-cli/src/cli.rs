use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use composer_types::{BaseId, CompositeId, Layers, SLOT_COUNT};

#[derive(Parser)]
#[command(
    name = "composer",
    about = "Layer composer: inspect, build and simulate composite avatar ids",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log engine activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Split a composite id into its base id and nine layers
    Decode(DecodeArgs),
    /// Pack a base id and nine layers into a composite id
    Encode(EncodeArgs),
    /// Show what a composition would produce, without any ledger
    Preview(PreviewArgs),
    /// Run a composition scenario from a TOML file against in-memory ledgers
    Simulate(SimulateArgs),
}

#[derive(Args)]
pub struct DecodeArgs {
    #[arg(value_parser = parse_composite)]
    pub id: CompositeId,
}

#[derive(Args)]
pub struct EncodeArgs {
    #[arg(long, value_parser = parse_base)]
    pub base: BaseId,
    /// Nine comma-separated layer values, slot 1 first
    #[arg(long, value_parser = parse_layers)]
    pub layers: Layers,
}

#[derive(Args)]
pub struct PreviewArgs {
    #[arg(value_parser = parse_composite)]
    pub id: CompositeId,
    /// Nine comma-separated layer values, slot 1 first
    #[arg(long, value_parser = parse_layers)]
    pub layers: Layers,
}

#[derive(Args)]
pub struct SimulateArgs {
    pub scenario: PathBuf,
}

fn parse_composite(s: &str) -> Result<CompositeId, String> {
    CompositeId::from_hex(s).map_err(|e| e.to_string())
}

fn parse_base(s: &str) -> Result<BaseId, String> {
    BaseId::from_hex(s).map_err(|e| e.to_string())
}

/// Parse one layer value: `0x`-prefixed hex or decimal.
pub fn parse_layer_value(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid layer value {s:?}: {e}"))
}

pub fn parse_layers(s: &str) -> Result<Layers, String> {
    let values = s
        .split(',')
        .map(parse_layer_value)
        .collect::<Result<Vec<u32>, String>>()?;
    let raw: [u32; SLOT_COUNT] = values
        .try_into()
        .map_err(|v: Vec<u32>| format!("expected {SLOT_COUNT} layer values, got {}", v.len()))?;
    Ok(Layers::from(raw))
}
