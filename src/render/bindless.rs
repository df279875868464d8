//! Bindless descriptor index allocation
//!
//! Shaders address textures and samplers through stable integer slots in
//! two large descriptor arrays. This table hands those slots out. It lives
//! inside [`RenderResources`](super::RenderResources), so it is only ever
//! mutated on the render thread.

use crate::core::error::Error;

/// Slots in the texture descriptor array
pub const MAX_BINDLESS_TEXTURES: u32 = 1024;

/// Slots in the sampler descriptor array
pub const MAX_BINDLESS_SAMPLERS: u32 = 64;

/// Stable slot in a bindless descriptor array
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindlessIndex(u32);

impl BindlessIndex {
    /// Raw array index, as written into shader-visible data
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Free-list allocator over `0..capacity`
#[derive(Debug)]
struct IndexPool {
    kind: &'static str,
    capacity: u32,
    next: u32,
    free: Vec<u32>,
}

impl IndexPool {
    fn new(kind: &'static str, capacity: u32) -> Self {
        Self {
            kind,
            capacity,
            next: 0,
            free: Vec::new(),
        }
    }

    fn allocate(&mut self) -> Result<BindlessIndex, Error> {
        // Reuse the lowest freed slot first to keep the live range compact
        if let Some(index) = self.free.pop() {
            return Ok(BindlessIndex(index));
        }
        if self.next >= self.capacity {
            return Err(Error::Bindless(format!(
                "{} slots exhausted ({} in use)",
                self.kind, self.capacity
            )));
        }
        let index = self.next;
        self.next += 1;
        Ok(BindlessIndex(index))
    }

    fn release(&mut self, index: BindlessIndex) -> bool {
        if index.0 >= self.next || self.free.contains(&index.0) {
            return false;
        }
        // Keep sorted descending so `pop` yields the lowest index
        let pos = self.free.partition_point(|&slot| slot > index.0);
        self.free.insert(pos, index.0);
        true
    }

    fn live(&self) -> u32 {
        self.next - self.free.len() as u32
    }
}

/// Texture and sampler slot allocator
#[derive(Debug)]
pub struct BindlessTable {
    textures: IndexPool,
    samplers: IndexPool,
}

impl BindlessTable {
    pub fn new() -> Self {
        Self::with_capacity(MAX_BINDLESS_TEXTURES, MAX_BINDLESS_SAMPLERS)
    }

    pub fn with_capacity(textures: u32, samplers: u32) -> Self {
        Self {
            textures: IndexPool::new("texture", textures),
            samplers: IndexPool::new("sampler", samplers),
        }
    }

    /// Claim a texture slot
    pub fn register_texture(&mut self) -> Result<BindlessIndex, Error> {
        self.textures.allocate()
    }

    /// Claim a sampler slot
    pub fn register_sampler(&mut self) -> Result<BindlessIndex, Error> {
        self.samplers.allocate()
    }

    /// Return a texture slot. `false` if it was not allocated.
    pub fn release_texture(&mut self, index: BindlessIndex) -> bool {
        self.textures.release(index)
    }

    /// Return a sampler slot. `false` if it was not allocated.
    pub fn release_sampler(&mut self, index: BindlessIndex) -> bool {
        self.samplers.release(index)
    }

    pub fn texture_count(&self) -> u32 {
        self.textures.live()
    }

    pub fn sampler_count(&self) -> u32 {
        self.samplers.live()
    }
}

impl Default for BindlessTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_allocation() {
        let mut table = BindlessTable::new();
        assert_eq!(table.register_texture().unwrap().get(), 0);
        assert_eq!(table.register_texture().unwrap().get(), 1);
        assert_eq!(table.register_sampler().unwrap().get(), 0);
        assert_eq!(table.texture_count(), 2);
        assert_eq!(table.sampler_count(), 1);
    }

    #[test]
    fn test_release_reuses_lowest_slot() {
        let mut table = BindlessTable::new();
        let slots: Vec<_> = (0..4).map(|_| table.register_texture().unwrap()).collect();

        assert!(table.release_texture(slots[2]));
        assert!(table.release_texture(slots[1]));
        assert_eq!(table.texture_count(), 2);

        assert_eq!(table.register_texture().unwrap(), slots[1]);
        assert_eq!(table.register_texture().unwrap(), slots[2]);
        assert_eq!(table.register_texture().unwrap().get(), 4);
    }

    #[test]
    fn test_double_release_rejected() {
        let mut table = BindlessTable::new();
        let slot = table.register_sampler().unwrap();
        assert!(table.release_sampler(slot));
        assert!(!table.release_sampler(slot));
        assert!(!table.release_sampler(BindlessIndex(40)));
    }

    #[test]
    fn test_exhaustion() {
        let mut table = BindlessTable::with_capacity(2, 1);
        table.register_texture().unwrap();
        table.register_texture().unwrap();
        assert!(matches!(table.register_texture(), Err(Error::Bindless(_))));

        table.register_sampler().unwrap();
        assert!(matches!(table.register_sampler(), Err(Error::Bindless(_))));
    }

    #[test]
    fn test_default_capacity() {
        let mut table = BindlessTable::default();
        for _ in 0..MAX_BINDLESS_SAMPLERS {
            table.register_sampler().unwrap();
        }
        assert!(table.register_sampler().is_err());
        assert_eq!(table.sampler_count(), MAX_BINDLESS_SAMPLERS);
    }
}
