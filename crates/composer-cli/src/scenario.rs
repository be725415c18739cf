//! TOML-driven composition scenarios for `composer simulate`.
//!
//! A scenario wires an engine against fresh in-memory ledgers, hands the
//! caller some accessories, runs one composition and reports what every
//! ledger holds afterwards.
//!
//! ```toml
//! caller = "0x4242424242424242424242424242424242424242"
//! composite = "0xffffffcc"
//! layers = [0x010101, 0, 0, 0, 0, 0, 0, 0, 0x090109]
//!
//! [engine]
//! start_paused = false
//!
//! [[collections]]
//! selector = 2
//! name = "community"
//!
//! [[holdings]]
//! selector = 1
//! tokens = [0x010101, 0x090109]
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use composer_engine::{CompositionEngine, CompositionEvent, EngineConfig};
use composer_gate::AdminRoles;
use composer_ledger::{Amount, AssetLedger, InMemoryLedger};
use composer_types::{Address, CompositeId, LayerValue, Layers, Selector, TokenId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize)]
pub struct Scenario {
    pub caller: Address,
    /// Wires collections and applies `engine.start_paused`. Defaults to a
    /// fresh random address, so the caller holds no admin role.
    #[serde(default)]
    pub admin: Option<Address>,
    #[serde(deserialize_with = "composite_from_hex")]
    pub composite: CompositeId,
    /// Mint `composite` to the caller before composing.
    #[serde(default = "default_true")]
    pub holds_composite: bool,
    pub layers: Layers,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub collections: Vec<CollectionEntry>,
    #[serde(default)]
    pub holdings: Vec<HoldingEntry>,
}

fn default_true() -> bool {
    true
}

fn composite_from_hex<'de, D>(deserializer: D) -> Result<CompositeId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    CompositeId::from_hex(&s).map_err(serde::de::Error::custom)
}

#[derive(Clone, Debug, Deserialize)]
pub struct CollectionEntry {
    pub selector: u8,
    pub name: String,
}

/// One unit of each token, minted to the caller in `selector`'s ledger.
#[derive(Clone, Debug, Deserialize)]
pub struct HoldingEntry {
    pub selector: u8,
    pub tokens: Vec<u32>,
}

/// What a scenario run produced.
#[derive(Clone, Debug, Serialize)]
pub struct Outcome {
    pub composite: CompositeId,
    pub result: Option<CompositeId>,
    pub error: Option<String>,
    pub event: Option<CompositionEvent>,
    pub balances: Vec<Balance>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub ledger: String,
    pub token: TokenId,
    pub amount: Amount,
}

impl Scenario {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        toml::from_str(input).context("invalid scenario")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_toml_str(&input)
    }

    /// Build the engine, seed balances and compose once.
    ///
    /// A rejected composition is part of the outcome, not an error; only a
    /// scenario that cannot be wired fails.
    pub fn run(&self) -> anyhow::Result<Outcome> {
        let admin = self.admin.unwrap_or_else(Address::random);
        let default_selector = self.engine.default_selector;

        let mut ledgers: BTreeMap<u8, Arc<InMemoryLedger>> = BTreeMap::new();
        let default_name = self
            .collections
            .iter()
            .find(|c| c.selector == default_selector)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "official".to_string());
        ledgers.insert(default_selector, Arc::new(InMemoryLedger::new(default_name)));

        let composites = Arc::new(InMemoryLedger::new("composites"));
        // Registry writes need an open gate; pause only once wired.
        let wiring = EngineConfig {
            start_paused: false,
            ..self.engine.clone()
        };
        let engine = CompositionEngine::new(
            wiring,
            composites.clone(),
            ledgers[&default_selector].clone(),
            Arc::new(AdminRoles::new(admin)),
        )?;

        for collection in &self.collections {
            if collection.selector == default_selector {
                continue;
            }
            if ledgers.contains_key(&collection.selector) {
                bail!("selector {} listed twice", collection.selector);
            }
            let store = Arc::new(InMemoryLedger::new(collection.name.clone()));
            engine.set_collection(&admin, Selector(collection.selector), store.clone())?;
            ledgers.insert(collection.selector, store);
        }
        if self.engine.start_paused {
            engine.pause(&admin)?;
        }

        for holding in &self.holdings {
            let store = ledgers
                .get(&holding.selector)
                .with_context(|| format!("no collection for selector {}", holding.selector))?;
            for raw in &holding.tokens {
                store.mint(&self.caller, TokenId::from(LayerValue::new(*raw)), 1)?;
            }
        }
        if self.holds_composite {
            composites.mint(&self.caller, TokenId::from(self.composite), 1)?;
        }

        let mut events = engine.subscribe();
        let (result, error) = match engine.compose(&self.caller, self.composite, &self.layers) {
            Ok(id) => (Some(id), None),
            Err(err) => (None, Some(err.to_string())),
        };
        let event = events.try_recv().ok();

        let mut balances = Vec::new();
        let all = std::iter::once(&composites).chain(ledgers.values());
        for ledger in all {
            for (token, amount) in ledger.holdings(&self.caller)? {
                balances.push(Balance {
                    ledger: ledger.name().to_string(),
                    token,
                    amount,
                });
            }
        }

        Ok(Outcome {
            composite: self.composite,
            result,
            error,
            event,
            balances,
        })
    }
}
