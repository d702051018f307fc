//! Temporary slot management for expression compilation.
//!
//! Special forms that need to remember an intermediate result (the null
//! flag of `IS NULL`, the "saw a null" flag of `AND`/`OR`) allocate a
//! temporary from the [`LocalScope`]. Temporaries live in nested blocks:
//! leaving a block releases every slot allocated in it, and the executor
//! sizes its frame from the high-water mark.

use rowgen_core::{CompilationError, SqlType};

/// Maximum number of temporaries a unit can address.
pub const MAX_LOCALS: usize = u16::MAX as usize + 1;

// ============================================================================
// Types
// ============================================================================

/// A live temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempSlot {
    /// Frame slot index
    pub slot: u16,
    /// Type of the value stored in it
    pub sql_type: SqlType,
    /// Block depth where allocated
    pub depth: u32,
}

// ============================================================================
// LocalScope
// ============================================================================

/// Temporaries for the unit being compiled.
#[derive(Debug, Default)]
pub struct LocalScope {
    /// Live temporaries, in allocation order.
    temps: Vec<TempSlot>,

    /// Current block depth (0 = unit scope)
    depth: u32,

    /// Highest number of simultaneously live temporaries
    max_slots: usize,
}

impl LocalScope {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Block Management
    // ==========================================================================

    /// Enter a new block.
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Exit the current block, releasing its temporaries.
    ///
    /// Slots are handed out in stack order, so a released slot is reused by
    /// the next allocation.
    pub fn pop_scope(&mut self) {
        debug_assert!(self.depth > 0, "pop_scope without matching push_scope");
        let depth = self.depth;
        self.temps.retain(|temp| temp.depth < depth);
        self.depth = depth.saturating_sub(1);
    }

    /// Get current block depth.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    // ==========================================================================
    // Allocation
    // ==========================================================================

    /// Allocate a temporary in the current block.
    pub fn allocate(&mut self, sql_type: SqlType) -> Result<u16, CompilationError> {
        let slot = u16::try_from(self.temps.len())
            .map_err(|_| CompilationError::TooManyLocals { max: MAX_LOCALS })?;
        self.temps.push(TempSlot {
            slot,
            sql_type,
            depth: self.depth,
        });
        self.max_slots = self.max_slots.max(self.temps.len());
        Ok(slot)
    }

    /// Look up a live temporary.
    pub fn get(&self, slot: u16) -> Option<&TempSlot> {
        self.temps.get(slot as usize)
    }

    // ==========================================================================
    // Accessors
    // ==========================================================================

    /// Number of frame slots the unit needs.
    pub fn frame_size(&self) -> usize {
        self.max_slots
    }

    /// Number of temporaries currently live.
    pub fn live_count(&self) -> usize {
        self.temps.len()
    }
}
