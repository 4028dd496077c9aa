/// Generational handle handed out by rendering surfaces.
///
/// The index may be recycled by a surface once the handle is released; the
/// generation distinguishes the new occupant from the stale one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32, u32); // (index, generation)

impl Handle {
    pub fn new(index: u32, generation: u32) -> Self {
        Handle(index, generation)
    }

    pub fn index(&self) -> u32 {
        self.0
    }

    pub fn generation(&self) -> u32 {
        self.1
    }
}

/// Hands out handles, reusing released indices with a bumped generation.
#[derive(Debug, Default, Clone)]
pub struct HandleAllocator {
    // (generation, live) per index.
    slots: Vec<(u32, bool)>,
    free: Vec<u32>,
    live: usize,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> Handle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.1 = true;
            return Handle::new(index, slot.0);
        }
        let index = self.slots.len() as u32;
        self.slots.push((0, true));
        Handle::new(index, 0)
    }

    /// Releases `handle`. Returns `false` for stale or unknown handles.
    pub fn release(&mut self, handle: Handle) -> bool {
        if !self.is_live(handle) {
            return false;
        }
        let slot = &mut self.slots[handle.index() as usize];
        slot.0 = slot.0.wrapping_add(1);
        slot.1 = false;
        self.free.push(handle.index());
        self.live -= 1;
        true
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.slots
            .get(handle.index() as usize)
            .is_some_and(|(generation, live)| *live && *generation == handle.generation())
    }

    pub fn live_count(&self) -> usize {
        self.live
    }
}
