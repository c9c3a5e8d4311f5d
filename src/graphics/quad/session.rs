use std::ops::{Deref, DerefMut, Range};

use crate::graphics::quad::{Quad, atlas::DirtyRange};

/// Direct write access to a run of atlas slots.
///
/// Derefs to the slots. When the session is dropped, the whole run is flagged dirty
/// so the next draw uploads it.
pub struct QuadWriteSession<'atlas> {
    slots: &'atlas mut [Quad],
    dirty: &'atlas mut DirtyRange,
    range: Range<usize>,
}

impl<'atlas> QuadWriteSession<'atlas> {
    pub(super) fn new(
        slots: &'atlas mut [Quad],
        dirty: &'atlas mut DirtyRange,
        range: Range<usize>,
    ) -> Self {
        Self {
            slots,
            dirty,
            range,
        }
    }

    /// The atlas slots this session writes to.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }
}

impl Deref for QuadWriteSession<'_> {
    type Target = [Quad];

    fn deref(&self) -> &[Quad] {
        &*self.slots
    }
}

impl DerefMut for QuadWriteSession<'_> {
    fn deref_mut(&mut self) -> &mut [Quad] {
        &mut *self.slots
    }
}

impl Drop for QuadWriteSession<'_> {
    fn drop(&mut self) {
        self.dirty.mark(self.range.clone());
    }
}
