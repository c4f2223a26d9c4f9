// The node's one copy of the ledger, shared between the API thread and every peer thread.
// All mutation goes through a single write lock so append and replace never interleave.

use crate::core::block::Block;
use crate::core::chain::{check_replacement, generate_next_block, validate_new_block};
use crate::error::{BlockchainError, Result};
use log::{debug, info};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Clone)]
pub struct Blockchain {
    // Never empty: starts as [genesis] and is only ever extended or swapped for a longer chain
    blocks: Arc<RwLock<Vec<Block>>>,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    pub fn new() -> Blockchain {
        Blockchain {
            blocks: Arc::new(RwLock::new(vec![Block::genesis()])),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Block>>> {
        self.blocks
            .read()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire chain lock: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Block>>> {
        self.blocks
            .write()
            .map_err(|e| BlockchainError::Lock(format!("Failed to acquire chain lock: {e}")))
    }

    /// Point-in-time copy of the whole chain
    pub fn get_blocks(&self) -> Result<Vec<Block>> {
        Ok(self.read()?.clone())
    }

    pub fn get_latest_block(&self) -> Result<Block> {
        self.read()?
            .last()
            .cloned()
            .ok_or_else(|| BlockchainError::InvalidChain("chain is empty".to_string()))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Build the next block from `data` and append it, all under one lock
    pub fn mine_block(&self, data: &str) -> Result<Block> {
        let mut blocks = self.write()?;
        let tip = blocks
            .last()
            .ok_or_else(|| BlockchainError::InvalidChain("chain is empty".to_string()))?;
        let block = generate_next_block(tip, data)?;
        validate_new_block(&block, tip)?;
        blocks.push(block.clone());
        info!(
            "Mined block {} at index {}",
            block.get_hash(),
            block.get_index()
        );
        Ok(block)
    }

    /// Append a block received from elsewhere if it extends the current tip
    pub fn add_block(&self, block: Block) -> Result<()> {
        let mut blocks = self.write()?;
        let tip = blocks
            .last()
            .ok_or_else(|| BlockchainError::InvalidChain("chain is empty".to_string()))?;
        validate_new_block(&block, tip)?;
        info!(
            "Appended block {} at index {}",
            block.get_hash(),
            block.get_index()
        );
        blocks.push(block);
        Ok(())
    }

    /// Swap in `candidate` if it is valid and strictly longer. Returns whether it did.
    pub fn replace_chain(&self, candidate: Vec<Block>) -> Result<bool> {
        let mut blocks = self.write()?;
        match check_replacement(&blocks, &candidate) {
            Ok(()) => {
                info!(
                    "Replacing chain of length {} with received chain of length {}",
                    blocks.len(),
                    candidate.len()
                );
                *blocks = candidate;
                Ok(true)
            }
            Err(reason) => {
                debug!("Keeping current chain: {reason}");
                Ok(false)
            }
        }
    }
}
