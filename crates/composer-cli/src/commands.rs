use colored::Colorize;
use composer_codec::{decode, encode, is_canonical};
use composer_engine::{plan_transitions, SlotTransition};
use composer_types::{LayerValue, Layers, Slot};
use serde_json::json;
use tracing::info;

use crate::cli::*;
use crate::scenario::{Outcome, Scenario};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Decode(args) => cmd_decode(args, cli.format),
        Command::Encode(args) => cmd_encode(args, cli.format),
        Command::Preview(args) => cmd_preview(args, cli.format),
        Command::Simulate(args) => cmd_simulate(args, cli.format),
    }
}

fn layers_json(layers: &Layers) -> serde_json::Value {
    layers
        .iter()
        .map(|(slot, value)| {
            json!({
                "slot": slot.get(),
                "value": format!("{value}"),
                "selector": value.selector().get(),
                "item": value.item(),
            })
        })
        .collect()
}

fn print_layer(slot: Slot, value: LayerValue) {
    if value.is_empty() {
        println!("  {:<7} {}", slot.to_string(), "empty".dimmed());
    } else {
        println!(
            "  {:<7} {}  selector {}  item {}",
            slot.to_string(),
            value.to_string().yellow(),
            value.selector().get().to_string().cyan(),
            value.item()
        );
    }
}

fn cmd_decode(args: DecodeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (base, layers) = decode(args.id);
    let canonical = is_canonical(args.id);
    match format {
        OutputFormat::Json => {
            let out = json!({
                "composite": args.id.to_hex(),
                "base_id": format!("{base}"),
                "canonical": canonical,
                "layers": layers_json(&layers),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("Composite {}", args.id.to_string().bold());
            println!("  Base id: {}", base.to_string().cyan());
            for (slot, value) in layers.iter() {
                print_layer(slot, value);
            }
            if !canonical {
                println!("  {} padding bits are set; re-encoding yields a different id", "!".yellow().bold());
            }
        }
    }
    Ok(())
}

fn cmd_encode(args: EncodeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let id = encode(args.base, &args.layers)?;
    match format {
        OutputFormat::Json => {
            let out = json!({ "composite": id.to_hex(), "base_id": format!("{}", args.base) });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => println!("{}", id.to_hex().green()),
    }
    Ok(())
}

fn describe(transition: &SlotTransition) -> String {
    match *transition {
        SlotTransition::Unchanged => "unchanged".dimmed().to_string(),
        SlotTransition::Attach { value } => format!("{} {value}", "attach".green()),
        SlotTransition::Detach { value } => format!("{} {value}", "detach".red()),
        SlotTransition::Replace { from, to } => format!("{} {from} -> {to}", "replace".yellow()),
    }
}

fn cmd_preview(args: PreviewArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (base, old) = decode(args.id);
    let new_id = encode(base, &args.layers)?;
    let plan = plan_transitions(&old, &args.layers);
    match format {
        OutputFormat::Json => {
            let steps: Vec<_> = plan
                .iter()
                .map(|(slot, t)| json!({ "slot": slot.get(), "transition": t }))
                .collect();
            let out = json!({
                "base_id": format!("{base}"),
                "composite": new_id.to_hex(),
                "plan": steps,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("Base id: {}", base.to_string().cyan());
            for (slot, transition) in &plan {
                println!("  {:<7} {}", slot.to_string(), describe(transition));
            }
            println!("New composite: {}", new_id.to_hex().green().bold());
        }
    }
    Ok(())
}

fn cmd_simulate(args: SimulateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    info!(
        scenario = %args.scenario.display(),
        caller = %scenario.caller,
        collections = scenario.collections.len(),
        "running scenario"
    );
    let outcome = scenario.run()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => print_outcome(&outcome),
    }
    Ok(())
}

fn print_outcome(outcome: &Outcome) {
    println!("Composing {}", outcome.composite.to_string().bold());
    match (&outcome.result, &outcome.error) {
        (Some(id), _) => println!("{} Settled as {}", "✓".green().bold(), id.to_hex().green()),
        (None, Some(err)) => println!("{} Rejected: {}", "✗".red().bold(), err.red()),
        (None, None) => {}
    }
    if let Some(event) = &outcome.event {
        println!("  Event: {} (#{})", event.id.to_string().cyan(), event.sequence);
    }
    if outcome.balances.is_empty() {
        println!("  No balances.");
        return;
    }
    println!("Balances:");
    for line in &outcome.balances {
        println!("  {:<12} {}  x{}", line.ledger, line.token.to_string().yellow(), line.amount);
    }
}
