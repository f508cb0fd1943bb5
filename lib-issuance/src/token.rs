//! Issued asset: the fungible balance ledger
//!
//! Mint, transfer, pause and finite-supply enforcement for the asset being
//! sold. The asset starts paused so it stays non-transferable for ordinary
//! holders throughout the sale; the sale machine unpauses it exactly once at
//! finalize. The hard supply cap here backs the pool ledger's global
//! invariant: even a bug above this layer cannot issue past the cap.

use std::collections::HashMap;

use lib_types::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::errors::{IssuanceError, IssuanceResult};

/// Fungible balance ledger with a hard supply cap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedAsset {
    /// Per-account balances; absent means zero
    balances: HashMap<Address, Amount>,
    /// Total supply in circulation, always `Σ balances`
    total_supply: Amount,
    /// Hard supply cap
    cap: Amount,
    /// Whether transfers are paused (starts true, cleared once at finalize)
    paused: bool,
    /// Whether minting is closed (starts false, set once at finalize)
    minting_finished: bool,
}

impl IssuedAsset {
    /// Create a paused, mintable asset with the given supply cap
    pub fn new(cap: Amount) -> Self {
        Self {
            balances: HashMap::new(),
            total_supply: 0,
            cap,
            paused: true,
            minting_finished: false,
        }
    }

    /// Balance of an account (zero if unknown)
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Total supply in circulation
    pub const fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Hard supply cap
    pub const fn cap(&self) -> Amount {
        self.cap
    }

    /// Whether transfers are paused
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether minting is closed
    pub const fn minting_finished(&self) -> bool {
        self.minting_finished
    }

    /// Validate a mint without applying it
    ///
    /// Callers that must pair a mint with another state change (pool
    /// reservation) run this first so the composite operation cannot fail
    /// halfway through.
    pub fn ensure_mintable(&self, to: &Address, amount: Amount) -> IssuanceResult<()> {
        if self.minting_finished {
            return Err(IssuanceError::MintingClosed);
        }
        if to.is_zero() {
            return Err(IssuanceError::ZeroAddress);
        }
        if amount == 0 {
            return Err(IssuanceError::ZeroAmount);
        }
        let would_have = self
            .total_supply
            .checked_add(amount)
            .ok_or(IssuanceError::Overflow)?;
        if would_have > self.cap {
            return Err(IssuanceError::SupplyCapExceeded {
                max: self.cap,
                would_have,
            });
        }
        self.balance_of(to)
            .checked_add(amount)
            .ok_or(IssuanceError::Overflow)?;
        Ok(())
    }

    /// Mint new supply to an account
    pub fn mint(&mut self, to: Address, amount: Amount) -> IssuanceResult<()> {
        self.ensure_mintable(&to, amount)?;

        // ensure_mintable proved both additions fit
        self.total_supply += amount;
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }

    /// Move balance between accounts
    ///
    /// Fails with `Paused` while the asset is paused, which is the case for
    /// the whole sale window until finalize unpauses it.
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> IssuanceResult<()> {
        if self.paused {
            return Err(IssuanceError::Paused);
        }
        if to.is_zero() {
            return Err(IssuanceError::ZeroAddress);
        }
        if amount == 0 {
            return Err(IssuanceError::ZeroAmount);
        }

        let from_balance = self.balance_of(&from);
        if from_balance < amount {
            return Err(IssuanceError::InsufficientBalance {
                have: from_balance,
                need: amount,
            });
        }

        let new_to_balance = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(IssuanceError::Overflow)?;

        self.balances.insert(from, from_balance - amount);
        self.balances.insert(to, new_to_balance);
        Ok(())
    }

    /// Pause transfers (one-directional until unpause at finalize)
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Unpause transfers; invoked exactly once, by finalize
    pub fn unpause(&mut self) {
        self.paused = false;
    }

    /// Close minting permanently; invoked exactly once, by finalize
    pub fn finish_minting(&mut self) {
        self.minting_finished = true;
    }
}
