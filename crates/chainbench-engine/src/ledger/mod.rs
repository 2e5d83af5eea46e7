//! Shadow balance ledger.
//!
//! A run-scoped copy of user balances used to simulate sequential admission
//! without touching real balances. Seeded once per pipeline run and
//! discarded afterwards; real debits happen server-side and come back
//! through terminal progress events.

use crate::types::UserId;
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ShadowLedger {
    balances: HashMap<UserId, Decimal>,
}

impl ShadowLedger {
    /// Seed from a live balance snapshot.
    pub fn seed(balances: &HashMap<UserId, Decimal>) -> Self {
        Self {
            balances: balances.clone(),
        }
    }

    /// Remaining shadow balance. Unknown users have nothing reserved for
    /// them and read as zero.
    pub fn available(&self, user: &UserId) -> Decimal {
        self.balances.get(user).copied().unwrap_or(Decimal::ZERO)
    }

    /// Reserve `amount` against `user`, failing when the remaining shadow
    /// balance cannot cover it. Returns the balance after the debit.
    pub fn debit(&mut self, user: &UserId, amount: Decimal) -> Result<Decimal, Decimal> {
        let available = self.available(user);
        if available < amount {
            return Err(available);
        }
        let remaining = available - amount;
        self.balances.insert(user.clone(), remaining);
        Ok(remaining)
    }
}
