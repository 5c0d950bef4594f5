use crate::error::{Error, Result};

/// Bounds how deeply the emitter may recurse into nested containers.
#[derive(Clone, Debug)]
pub struct DepthTracker {
    depth: usize,
    max: usize,
}

impl DepthTracker {
    /// Create a new depth tracker
    pub fn new(max: usize) -> Self {
        Self { depth: 0, max }
    }

    /// Step into a container. Fails once the nesting limit is passed.
    pub fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max {
            return Err(Error::DepthLimit(self.max));
        }
        Ok(())
    }

    /// Step back out of a container.
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Drop any leftover depth from a write that bailed out partway.
    pub fn reset(&mut self) {
        self.depth = 0;
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}
