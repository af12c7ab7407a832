//! Resource amounts and the single-writer ledger that tracks them.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Kinds of resources tracked by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Timber used for most construction.
    Wood,
    /// Quarried stone.
    Stone,
    /// Food harvested by farms.
    Food,
    /// Coin spent on relocations.
    Gold,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Wood => "wood",
            Self::Stone => "stone",
            Self::Food => "food",
            Self::Gold => "gold",
        };
        f.write_str(label)
    }
}

/// Amounts of several resource kinds, used for costs, outputs and balances.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceBundle {
    amounts: BTreeMap<ResourceKind, u32>,
}

impl ResourceBundle {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bundle with `amount` of `kind` added.
    #[must_use]
    pub fn with(mut self, kind: ResourceKind, amount: u32) -> Self {
        self.add(kind, amount);
        self
    }

    /// Amount of a single kind; zero when absent.
    #[must_use]
    pub fn amount(&self, kind: ResourceKind) -> u32 {
        self.amounts.get(&kind).copied().unwrap_or(0)
    }

    /// Reports whether the bundle holds no resources at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.amounts.values().all(|amount| *amount == 0)
    }

    /// Iterates non-zero entries in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        self.amounts
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(kind, amount)| (*kind, *amount))
    }

    fn add(&mut self, kind: ResourceKind, amount: u32) {
        let entry = self.amounts.entry(kind).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    fn covers(&self, other: &ResourceBundle) -> bool {
        other
            .iter()
            .all(|(kind, amount)| self.amount(kind) >= amount)
    }
}

impl fmt::Display for ResourceBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (kind, amount) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{kind} {amount}")?;
            first = false;
        }
        if first {
            f.write_str("nothing")?;
        }
        Ok(())
    }
}

/// Balance of every resource kind held by the settlement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceLedger {
    balances: ResourceBundle,
}

impl ResourceLedger {
    /// Creates a ledger seeded with the provided balances.
    #[must_use]
    pub fn with_balances(balances: ResourceBundle) -> Self {
        Self { balances }
    }

    /// Current balance of a single kind.
    #[must_use]
    pub fn balance(&self, kind: ResourceKind) -> u32 {
        self.balances.amount(kind)
    }

    /// Every balance as a bundle.
    #[must_use]
    pub fn balances(&self) -> &ResourceBundle {
        &self.balances
    }

    /// Reports whether every amount in `cost` is covered.
    #[must_use]
    pub fn can_afford(&self, cost: &ResourceBundle) -> bool {
        self.balances.covers(cost)
    }

    /// Removes `cost` from the balances. Returns `false` and leaves the
    /// ledger untouched when any amount is not covered.
    #[must_use]
    pub fn debit(&mut self, cost: &ResourceBundle) -> bool {
        if !self.can_afford(cost) {
            return false;
        }

        for (kind, amount) in cost.iter() {
            if let Some(balance) = self.balances.amounts.get_mut(&kind) {
                *balance -= amount;
            }
        }
        true
    }

    /// Adds `amount` to the balances.
    pub fn credit(&mut self, amount: &ResourceBundle) {
        for (kind, value) in amount.iter() {
            self.balances.add(kind, value);
        }
    }
}
