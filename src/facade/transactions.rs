//! Pass-through transaction control.
//!
//! Transactions are not nested or counted here: beginning twice or committing
//! without a transaction fails in the storage engine.

use super::Session;
use crate::core::Result;
use log::warn;

impl Session {
    pub fn begin(&self) -> Result<()> {
        Ok(self.storage().begin_transaction()?)
    }

    pub fn commit(&self) -> Result<()> {
        Ok(self.storage().commit()?)
    }

    pub fn rollback(&self) -> Result<()> {
        Ok(self.storage().rollback()?)
    }

    pub fn in_transaction(&self) -> Result<bool> {
        Ok(self.storage().in_transaction()?)
    }

    /// Runs `work` inside a transaction: committed when it returns `Ok`,
    /// rolled back when it returns `Err`.
    pub fn transaction<R, F>(&self, work: F) -> Result<R>
    where
        F: FnOnce(&Session) -> Result<R>,
    {
        self.begin()?;
        match work(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback() {
                    warn!("Rollback after failed transaction also failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}
