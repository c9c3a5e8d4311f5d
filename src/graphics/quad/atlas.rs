use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::rc::Rc;

use thiserror::Error;

use crate::graphics::{
    constants::{INDICES_PER_QUAD, MAX_QUADS},
    gpu::{BufferKind, GpuBackend, GpuError},
    quad::{Quad, indices::setup_indices, session::QuadWriteSession},
    textures::cache::TextureCache,
};

/// The slots whose host data is ahead of the GPU vertex buffer.
#[derive(Clone, Debug, Default)]
pub(super) struct DirtyRange {
    flagged: bool,
    slots: Option<Range<usize>>,
}

impl DirtyRange {
    /// Flag the atlas as dirty, growing the range to cover `slots`.
    pub(super) fn mark(&mut self, slots: Range<usize>) {
        self.flagged = true;
        if slots.is_empty() {
            return;
        }
        self.slots = Some(match self.slots.take() {
            Some(cur) => cur.start.min(slots.start)..cur.end.max(slots.end),
            None => slots,
        });
    }

    fn is_flagged(&self) -> bool {
        self.flagged
    }

    /// Clear, returning the range to upload if anything was flagged.
    fn take(&mut self) -> Option<Range<usize>> {
        let dirty = std::mem::take(self);
        dirty.flagged.then(|| dirty.slots.unwrap_or(0..0))
    }
}

/// The GPU-side storage of an atlas.
struct AtlasBuffers<B: GpuBackend> {
    vertices: B::Buffer,
    indices: B::Buffer,
}

/// A resizable array of quads sharing one texture, mirrored into GPU vertex/index buffers.
///
/// Slots `0..capacity` exist both on the host and on the GPU; the first `total_quads`
/// of them are the ones drawn. Position in the array is draw order.
///
/// Mutations only touch host memory and flag the changed slots as dirty. The dirty
/// slots are uploaded at the start of the next draw.
///
/// Uploads go through [`GpuBackend::update_subrange`], which for wgpu is staged until
/// the next queue submission. Every draw recorded into one submission therefore sees
/// the slots as they were at the last upload before submitting; mutate between
/// submissions, not between draws of the same submission.
pub struct QuadAtlas<B: GpuBackend> {
    backend: B,
    label: String,
    texture: Rc<B::Texture>,
    quads: Vec<Quad>,
    indices: Vec<u32>,
    total_quads: usize,
    buffers: Option<AtlasBuffers<B>>,
    dirty: DirtyRange,
}

impl<B: GpuBackend> QuadAtlas<B> {
    /// Create an atlas drawing with `texture`, with room for `capacity` quads.
    pub fn with_texture(
        backend: B,
        label: &str,
        texture: Rc<B::Texture>,
        capacity: usize,
    ) -> AtlasResult<Self> {
        check_capacity(capacity)?;
        let quads = allocate_quads(capacity)?;
        let mut indices = allocate_indices(capacity)?;
        setup_indices(&mut indices, capacity, 0);
        let buffers = allocate_buffers(&backend, label, &indices)?;

        let mut dirty = DirtyRange::default();
        dirty.mark(0..capacity);

        log::debug!("Created texture atlas {label} with room for {capacity} quads");
        Ok(Self {
            backend,
            label: label.into(),
            texture,
            quads,
            indices,
            total_quads: 0,
            buffers,
            dirty,
        })
    }

    /// Create an atlas drawing with the texture at `path`, resolved through `cache`.
    pub fn from_file(
        backend: B,
        cache: &mut TextureCache<B>,
        path: impl AsRef<Path>,
        capacity: usize,
    ) -> AtlasResult<Self> {
        let path = path.as_ref();
        let texture = cache.get_or_load(&backend, path)?;
        let label = path.to_string_lossy();
        Self::with_texture(backend, &label, texture, capacity)
    }

    /// Overwrite the quad at `index`, which may be anywhere below the capacity.
    ///
    /// The number of quads to draw stays the same.
    pub fn update_quad(&mut self, quad: Quad, index: usize) -> AtlasResult<()> {
        check_index(index, self.capacity())?;
        self.quads[index] = quad;
        self.dirty.mark(index..index + 1);
        Ok(())
    }

    /// Insert a quad at `index`, moving the quads after it one slot up.
    ///
    /// `index` may be at most the number of quads. If the atlas is full, its capacity is doubled first.
    pub fn insert_quad(&mut self, quad: Quad, index: usize) -> AtlasResult<()> {
        let total = self.total_quads;
        check_index(index, total + 1)?;
        if total == self.capacity() {
            let grown = self.capacity().saturating_mul(2).min(MAX_QUADS).max(total + 1);
            log::debug!(
                "Texture atlas {} is full, growing from {} to {grown} quads",
                self.label,
                self.capacity()
            );
            self.resize_capacity(grown)?;
        }

        self.quads.copy_within(index..total, index + 1);
        self.quads[index] = quad;
        self.total_quads += 1;
        self.dirty.mark(index..self.total_quads);
        Ok(())
    }

    /// Insert a run of quads at `index`, moving the quads after it up by `quads.len()` slots.
    ///
    /// Unlike [`QuadAtlas::insert_quad`] this never grows the atlas; the quads must fit
    /// into the current capacity.
    pub fn insert_quads(&mut self, quads: &[Quad], index: usize) -> AtlasResult<()> {
        let total = self.total_quads;
        let amount = quads.len();
        check_index(index, total + 1)?;
        check_fits(total, amount, self.capacity())?;

        self.quads.copy_within(index..total, index + amount);
        self.quads[index..index + amount].copy_from_slice(quads);
        self.total_quads += amount;
        self.dirty.mark(index..self.total_quads);
        Ok(())
    }

    /// Move the quad at `from_index` to `new_index`, shifting only the quads in between.
    pub fn insert_quad_from_index(&mut self, from_index: usize, new_index: usize) -> AtlasResult<()> {
        check_index(from_index, self.total_quads)?;
        check_index(new_index, self.total_quads)?;
        if from_index == new_index {
            return Ok(());
        }

        let quad = self.quads[from_index];
        if from_index < new_index {
            self.quads.copy_within(from_index + 1..new_index + 1, from_index);
        } else {
            self.quads.copy_within(new_index..from_index, new_index + 1);
        }
        self.quads[new_index] = quad;
        self.dirty
            .mark(from_index.min(new_index)..from_index.max(new_index) + 1);
        Ok(())
    }

    /// Remove the quad at `index`, moving the quads after it one slot down.
    ///
    /// The capacity stays the same; the slot freed at the end is blanked.
    pub fn remove_quad_at_index(&mut self, index: usize) -> AtlasResult<()> {
        check_index(index, self.total_quads)?;
        self.remove_quads_at_index(index, 1)
    }

    /// Remove `amount` quads starting at `index`, moving the quads after them down.
    ///
    /// The capacity stays the same; the slots freed at the end are blanked.
    pub fn remove_quads_at_index(&mut self, index: usize, amount: usize) -> AtlasResult<()> {
        let total = self.total_quads;
        let end = check_run(index, amount, total)?;
        if amount == 0 {
            return Ok(());
        }

        self.quads.copy_within(end..total, index);
        self.total_quads -= amount;
        self.quads[self.total_quads..total].fill(Quad::EMPTY);
        self.dirty.mark(index..total);
        Ok(())
    }

    /// Stop drawing every quad. The capacity and the slots themselves are left untouched.
    pub fn remove_all_quads(&mut self) {
        self.total_quads = 0;
        self.dirty.mark(0..0);
    }

    /// Reallocate host and GPU storage for `capacity` quads.
    ///
    /// Existing slots are kept up to the new capacity; if it is below the number of
    /// quads, the quads past it are dropped.
    ///
    /// A capacity above [`MAX_QUADS`] is rejected up front and leaves the atlas as it was.
    /// If the storage can't be allocated the atlas is left empty with a capacity of 0,
    /// and it stays unusable until a later resize succeeds.
    pub fn resize_capacity(&mut self, capacity: usize) -> AtlasResult<()> {
        if capacity == self.capacity() {
            return Ok(());
        }
        check_capacity(capacity)?;

        match self.reallocate(capacity) {
            Ok(()) => Ok(()),
            Err(err) => {
                log::error!(
                    "Texture atlas {} couldn't be resized to {capacity} quads: {err}",
                    self.label
                );
                self.reset_to_empty();
                Err(err)
            }
        }
    }

    /// Count `amount` more slots as quads to draw, without writing them.
    ///
    /// Meant for callers that overwrite the exposed slots right after.
    pub fn increase_total_quads_with(&mut self, amount: usize) -> AtlasResult<()> {
        let total = check_fits(self.total_quads, amount, self.capacity())?;
        self.dirty.mark(self.total_quads..total);
        self.total_quads = total;
        Ok(())
    }

    /// Move `amount` quads from `old_index` to `new_index`, closing the gap they leave.
    ///
    /// `new_index` is where the run starts once moved; both the run and its destination
    /// must lie within the quads to draw.
    pub fn move_quads_from_index(
        &mut self,
        old_index: usize,
        amount: usize,
        new_index: usize,
    ) -> AtlasResult<()> {
        check_run(old_index, amount, self.total_quads)?;
        check_run(new_index, amount, self.total_quads)?;
        if old_index == new_index || amount == 0 {
            return Ok(());
        }

        if old_index < new_index {
            self.quads[old_index..new_index + amount].rotate_left(amount);
        } else {
            self.quads[new_index..old_index + amount].rotate_right(amount);
        }
        self.dirty
            .mark(old_index.min(new_index)..old_index.max(new_index) + amount);
        Ok(())
    }

    /// Move every quad from `index` on so that the run starts at `new_index`.
    ///
    /// The number of quads to draw is unchanged and the atlas never grows; the moved
    /// run must fit below the capacity.
    pub fn move_tail_from_index(&mut self, index: usize, new_index: usize) -> AtlasResult<()> {
        let total = self.total_quads;
        check_index(index, total + 1)?;
        let amount = total - index;
        check_fits(new_index, amount, self.capacity())?;

        self.quads.copy_within(index..total, new_index);
        self.dirty
            .mark(index.min(new_index)..index.max(new_index) + amount);
        Ok(())
    }

    /// Blank `amount` slots starting at `index`.
    pub fn fill_with_empty_quads_from_index(&mut self, index: usize, amount: usize) -> AtlasResult<()> {
        let end = check_fits(index, amount, self.capacity())?;
        self.quads[index..end].fill(Quad::EMPTY);
        self.dirty.mark(index..end);
        Ok(())
    }

    /// Draw the first `quads` quads.
    pub fn draw_number_of_quads(&mut self, pass: &mut B::Pass<'_>, quads: usize) -> AtlasResult<()> {
        self.draw_number_of_quads_from(pass, quads, 0)
    }

    /// Draw `quads` quads starting at slot `start`, which may reach up to the capacity.
    ///
    /// Dirty slots are uploaded first. Drawing no quads records nothing and leaves the
    /// dirty state alone.
    pub fn draw_number_of_quads_from(
        &mut self,
        pass: &mut B::Pass<'_>,
        quads: usize,
        start: usize,
    ) -> AtlasResult<()> {
        let end = match check_fits(start, quads, self.capacity()) {
            Ok(end) => end,
            Err(err) => {
                log::warn!("Texture atlas {} rejected a draw: {err}", self.label);
                return Err(err);
            }
        };
        if quads == 0 {
            return Ok(());
        }

        let first = index_position(start)?;
        let last = index_position(end)?;

        self.upload_dirty();
        if let Some(buffers) = &self.buffers {
            self.backend
                .bind(pass, &*self.texture, &buffers.vertices, &buffers.indices);
            self.backend.draw_indexed(pass, first..last);
        }
        Ok(())
    }

    /// Draw every quad.
    pub fn draw_quads(&mut self, pass: &mut B::Pass<'_>) -> AtlasResult<()> {
        self.draw_number_of_quads_from(pass, self.total_quads, 0)
    }

    /// Whether the GPU vertex buffer needs updating before the next draw.
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_flagged()
    }

    /// Flag every slot for upload, or clear the flag.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = DirtyRange::default();
        if dirty {
            self.dirty.mark(0..self.capacity());
        }
    }

    /// The number of quads that are drawn.
    pub fn total_quads(&self) -> usize {
        self.total_quads
    }

    /// The number of quads there is storage for.
    pub fn capacity(&self) -> usize {
        self.quads.len()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get the texture every quad samples.
    pub fn texture(&self) -> &Rc<B::Texture> {
        &self.texture
    }

    /// Draw with another texture from now on, letting go of the current one.
    pub fn set_texture(&mut self, texture: Rc<B::Texture>) {
        self.texture = texture;
    }

    /// Pixel dimensions of the texture, as `(width, height)`.
    pub fn texture_dimensions(&self) -> (u32, u32) {
        self.backend.texture_dimensions(&*self.texture)
    }

    /// Every slot, including the ones past the quads to draw.
    pub fn quads(&self) -> &[Quad] {
        &self.quads
    }

    /// Replace every slot at once. `quads` must be exactly as long as the capacity.
    pub fn set_quads(&mut self, quads: Vec<Quad>) -> AtlasResult<()> {
        if quads.len() != self.capacity() {
            return Err(AtlasError::StorageSizeMismatch {
                expected: self.capacity(),
                actual: quads.len(),
            });
        }
        self.quads = quads;
        self.set_dirty(true);
        Ok(())
    }

    /// Start writing the slots in `slots` directly. They are flagged dirty once the session ends.
    pub fn begin_write(&mut self, slots: Range<usize>) -> AtlasResult<QuadWriteSession<'_>> {
        check_range(slots.start, slots.end, self.capacity())?;
        Ok(QuadWriteSession::new(
            &mut self.quads[slots.clone()],
            &mut self.dirty,
            slots,
        ))
    }

    /// Start writing every slot directly.
    pub fn begin_write_all(&mut self) -> QuadWriteSession<'_> {
        let slots = 0..self.capacity();
        QuadWriteSession::new(&mut self.quads, &mut self.dirty, slots)
    }

    /// The GPU vertex buffer, if there is any capacity.
    pub fn vertex_buffer(&self) -> Option<&B::Buffer> {
        self.buffers.as_ref().map(|buffers| &buffers.vertices)
    }

    /// The GPU index buffer, if there is any capacity.
    pub fn index_buffer(&self) -> Option<&B::Buffer> {
        self.buffers.as_ref().map(|buffers| &buffers.indices)
    }

    /// Allocate fresh GPU buffers for the current capacity, ie after the device was lost.
    ///
    /// Every slot is uploaded again on the next draw. On failure the atlas is left empty,
    /// like a failed resize.
    pub fn recreate_buffers(&mut self) -> AtlasResult<()> {
        self.release_buffers();
        match allocate_buffers(&self.backend, &self.label, &self.indices) {
            Ok(buffers) => {
                self.buffers = buffers;
                self.set_dirty(true);
                Ok(())
            }
            Err(err) => {
                log::error!(
                    "Texture atlas {} couldn't recreate its buffers: {err}",
                    self.label
                );
                self.reset_to_empty();
                Err(err)
            }
        }
    }

    fn reallocate(&mut self, capacity: usize) -> AtlasResult<()> {
        let old_capacity = self.capacity();
        let kept = old_capacity.min(capacity);

        let mut quads = allocate_quads(capacity)?;
        quads[..kept].copy_from_slice(&self.quads[..kept]);

        let mut indices = allocate_indices(capacity)?;
        let kept_indices = kept * INDICES_PER_QUAD;
        indices[..kept_indices].copy_from_slice(&self.indices[..kept_indices]);
        if capacity > old_capacity {
            setup_indices(&mut indices, capacity - old_capacity, old_capacity);
        }

        let buffers = allocate_buffers(&self.backend, &self.label, &indices)?;
        self.release_buffers();
        self.buffers = buffers;
        self.quads = quads;
        self.indices = indices;

        if self.total_quads > capacity {
            log::debug!(
                "Texture atlas {} dropped {} quads shrinking to {capacity}",
                self.label,
                self.total_quads - capacity
            );
            self.total_quads = capacity;
        }
        self.set_dirty(true);

        log::debug!(
            "Resized texture atlas {} from {old_capacity} to {capacity} quads",
            self.label
        );
        Ok(())
    }

    /// Upload the dirty slots into the vertex buffer.
    fn upload_dirty(&mut self) {
        let Some(slots) = self.dirty.take() else {
            return;
        };
        let Some(buffers) = &self.buffers else {
            return;
        };

        let capacity = self.capacity();
        let slots = slots.start.min(capacity)..slots.end.min(capacity);
        if slots.is_empty() {
            return;
        }
        log::trace!(
            "Uploading quads {}..{} of texture atlas {}",
            slots.start,
            slots.end,
            self.label
        );
        self.backend.update_subrange(
            &buffers.vertices,
            slots.start as u64 * Quad::SIZE,
            bytemuck::cast_slice(&self.quads[slots]),
        );
    }

    fn release_buffers(&mut self) {
        if let Some(buffers) = self.buffers.take() {
            self.backend.release_buffer(buffers.vertices);
            self.backend.release_buffer(buffers.indices);
        }
    }

    fn reset_to_empty(&mut self) {
        self.release_buffers();
        self.quads = Vec::new();
        self.indices = Vec::new();
        self.total_quads = 0;
        self.dirty = DirtyRange::default();
    }
}

impl<B: GpuBackend> Drop for QuadAtlas<B> {
    fn drop(&mut self) {
        self.release_buffers();
    }
}

impl<B: GpuBackend> fmt::Display for QuadAtlas<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<QuadAtlas | total quads = {}>", self.total_quads)
    }
}

impl<B: GpuBackend> fmt::Debug for QuadAtlas<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuadAtlas")
            .field("label", &self.label)
            .field("total_quads", &self.total_quads)
            .field("capacity", &self.capacity())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

fn allocate_quads(capacity: usize) -> AtlasResult<Vec<Quad>> {
    let mut quads = Vec::new();
    quads
        .try_reserve_exact(capacity)
        .map_err(|_| AtlasError::HostAllocation { capacity })?;
    quads.resize(capacity, Quad::EMPTY);
    Ok(quads)
}

fn allocate_indices(capacity: usize) -> AtlasResult<Vec<u32>> {
    let len = capacity
        .checked_mul(INDICES_PER_QUAD)
        .ok_or(AtlasError::HostAllocation { capacity })?;
    let mut indices = Vec::new();
    indices
        .try_reserve_exact(len)
        .map_err(|_| AtlasError::HostAllocation { capacity })?;
    indices.resize(len, 0);
    Ok(indices)
}

/// Allocate GPU buffers sized for `indices.len() / 6` quads, uploading the indices.
///
/// No buffers exist for a capacity of 0.
fn allocate_buffers<B: GpuBackend>(
    backend: &B,
    label: &str,
    indices: &[u32],
) -> AtlasResult<Option<AtlasBuffers<B>>> {
    let capacity = (indices.len() / INDICES_PER_QUAD) as u64;
    if capacity == 0 {
        return Ok(None);
    }

    let vertices = backend.allocate_buffer(
        BufferKind::Vertex,
        &format!("{label}_vertices"),
        capacity.saturating_mul(Quad::SIZE),
    )?;
    let index_bytes: &[u8] = bytemuck::cast_slice(indices);
    let index_buffer = match backend.allocate_buffer(
        BufferKind::Index,
        &format!("{label}_indices"),
        index_bytes.len() as u64,
    ) {
        Ok(buffer) => buffer,
        Err(err) => {
            backend.release_buffer(vertices);
            return Err(err.into());
        }
    };
    backend.update_subrange(&index_buffer, 0, index_bytes);

    Ok(Some(AtlasBuffers {
        vertices,
        indices: index_buffer,
    }))
}

fn check_index(index: usize, limit: usize) -> AtlasResult<()> {
    if index >= limit {
        return Err(AtlasError::IndexOutOfBounds { index, limit });
    }
    Ok(())
}

fn check_range(start: usize, end: usize, limit: usize) -> AtlasResult<()> {
    if start > end || end > limit {
        return Err(AtlasError::RangeOutOfBounds { start, end, limit });
    }
    Ok(())
}

/// Check that `amount` slots from `start` end at or before `limit`, returning the end.
fn check_run(start: usize, amount: usize, limit: usize) -> AtlasResult<usize> {
    match start.checked_add(amount) {
        Some(end) if end <= limit => Ok(end),
        _ => Err(AtlasError::RangeOutOfBounds {
            start,
            end: start.saturating_add(amount),
            limit,
        }),
    }
}

/// Check that `used + extra` slots fit into `capacity`, returning the sum.
fn check_fits(used: usize, extra: usize, capacity: usize) -> AtlasResult<usize> {
    match used.checked_add(extra) {
        Some(required) if required <= capacity => Ok(required),
        _ => Err(AtlasError::CapacityExceeded {
            required: used.saturating_add(extra),
            capacity,
        }),
    }
}

fn check_capacity(capacity: usize) -> AtlasResult<()> {
    if capacity > MAX_QUADS {
        return Err(AtlasError::TooManyQuads {
            capacity,
            max: MAX_QUADS,
        });
    }
    Ok(())
}

/// Position of slot `slot`'s first index in the index buffer.
fn index_position(slot: usize) -> AtlasResult<u32> {
    slot.checked_mul(INDICES_PER_QUAD)
        .and_then(|position| u32::try_from(position).ok())
        .ok_or(AtlasError::TooManyQuads {
            capacity: slot,
            max: MAX_QUADS,
        })
}

/// An error from mutating or drawing an atlas.
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("Quad index {index} is out of bounds (must be below {limit})")]
    IndexOutOfBounds { index: usize, limit: usize },
    #[error("Quads {start}..{end} are out of bounds (must end at or before {limit})")]
    RangeOutOfBounds { start: usize, end: usize, limit: usize },
    #[error("{required} quad slots are needed, but the capacity is {capacity}")]
    CapacityExceeded { required: usize, capacity: usize },
    #[error("Replacement storage holds {actual} quads, but the capacity is {expected}")]
    StorageSizeMismatch { expected: usize, actual: usize },
    #[error("A capacity of {capacity} quads can't be indexed with 32-bit indices (at most {max})")]
    TooManyQuads { capacity: usize, max: usize },
    #[error("Host storage for {capacity} quads couldn't be allocated")]
    HostAllocation { capacity: usize },
    #[error("{0}")]
    Gpu(#[from] GpuError),
}

/// A result from an atlas operation.
pub type AtlasResult<T> = Result<T, AtlasError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::gpu::recording::{RecordedTexture, RecordingBackend, RecordingPass};

    fn quad(tag: u8) -> Quad {
        Quad::from_rect([tag as f32, 0.0, 1.0, 1.0], [0.0, 0.0, 1.0, 1.0], [tag; 4])
    }

    fn atlas(capacity: usize) -> QuadAtlas<RecordingBackend> {
        let texture = Rc::new(RecordedTexture::new("atlas.png", 32, 32));
        QuadAtlas::with_texture(RecordingBackend::new(), "test", texture, capacity).unwrap()
    }

    fn atlas_with(tags: &[u8], capacity: usize) -> QuadAtlas<RecordingBackend> {
        let mut atlas = atlas(capacity);
        for (index, &tag) in tags.iter().enumerate() {
            atlas.insert_quad(quad(tag), index).unwrap();
        }
        atlas
    }

    fn live(atlas: &QuadAtlas<RecordingBackend>) -> Vec<Quad> {
        atlas.quads()[..atlas.total_quads()].to_vec()
    }

    fn tags(tags: &[u8]) -> Vec<Quad> {
        tags.iter().map(|&tag| quad(tag)).collect()
    }

    #[test]
    fn dirty_range_merges_marked_slots() {
        let mut dirty = DirtyRange::default();
        dirty.mark(4..6);
        dirty.mark(1..2);
        dirty.mark(3..3);

        assert!(dirty.is_flagged());
        assert_eq!(dirty.take(), Some(1..6));
        assert!(!dirty.is_flagged());
        assert_eq!(dirty.take(), None);
    }

    #[test]
    fn empty_marks_still_flag() {
        let mut dirty = DirtyRange::default();
        dirty.mark(0..0);
        assert_eq!(dirty.take(), Some(0..0));
    }

    #[test]
    fn new_atlas_is_empty_and_dirty() {
        let atlas = atlas(8);
        assert_eq!(atlas.capacity(), 8);
        assert_eq!(atlas.total_quads(), 0);
        assert!(atlas.is_dirty());
        assert!(atlas.quads().iter().all(|q| *q == Quad::EMPTY));
    }

    #[test]
    fn update_quad_keeps_count() {
        let mut atlas = atlas_with(&[1], 4);
        atlas.update_quad(quad(9), 3).unwrap();
        assert_eq!(atlas.total_quads(), 1);
        assert_eq!(atlas.quads()[3], quad(9));

        let err = atlas.update_quad(quad(9), 4).unwrap_err();
        assert!(matches!(err, AtlasError::IndexOutOfBounds { index: 4, limit: 4 }));
    }

    #[test]
    fn insert_shifts_later_quads() {
        let mut atlas = atlas_with(&[1, 2, 3], 4);
        atlas.insert_quad(quad(7), 1).unwrap();
        assert_eq!(live(&atlas), tags(&[1, 7, 2, 3]));
    }

    #[test]
    fn insert_past_count_is_rejected() {
        let mut atlas = atlas_with(&[1], 4);
        let err = atlas.insert_quad(quad(2), 2).unwrap_err();
        assert!(matches!(err, AtlasError::IndexOutOfBounds { index: 2, limit: 2 }));
        assert_eq!(atlas.total_quads(), 1);
    }

    #[test]
    fn insert_into_full_atlas_doubles_capacity() {
        let mut atlas = atlas_with(&[1, 2], 2);
        atlas.insert_quad(quad(3), 0).unwrap();
        assert_eq!(atlas.capacity(), 4);
        assert_eq!(live(&atlas), tags(&[3, 1, 2]));
    }

    #[test]
    fn insert_into_zero_capacity_grows_to_one() {
        let mut atlas = atlas(0);
        atlas.insert_quad(quad(1), 0).unwrap();
        assert_eq!(atlas.capacity(), 1);
        assert_eq!(live(&atlas), tags(&[1]));
    }

    #[test]
    fn insert_quads_places_run() {
        let mut atlas = atlas_with(&[1, 2], 5);
        atlas.insert_quads(&tags(&[8, 9]), 1).unwrap();
        assert_eq!(live(&atlas), tags(&[1, 8, 9, 2]));
    }

    #[test]
    fn insert_quads_never_grows() {
        let mut atlas = atlas_with(&[1, 2], 3);
        let err = atlas.insert_quads(&tags(&[8, 9]), 0).unwrap_err();
        assert!(matches!(
            err,
            AtlasError::CapacityExceeded {
                required: 4,
                capacity: 3
            }
        ));
        assert_eq!(atlas.capacity(), 3);
        assert_eq!(live(&atlas), tags(&[1, 2]));
    }

    #[test]
    fn insert_quad_from_index_moves_both_ways() {
        let mut atlas = atlas_with(&[1, 2, 3, 4], 4);
        atlas.insert_quad_from_index(0, 2).unwrap();
        assert_eq!(live(&atlas), tags(&[2, 3, 1, 4]));

        atlas.insert_quad_from_index(3, 0).unwrap();
        assert_eq!(live(&atlas), tags(&[4, 2, 3, 1]));

        atlas.insert_quad_from_index(1, 1).unwrap();
        assert_eq!(live(&atlas), tags(&[4, 2, 3, 1]));

        assert!(atlas.insert_quad_from_index(4, 0).is_err());
    }

    #[test]
    fn insert_then_remove_restores_sequence() {
        let mut atlas = atlas_with(&[1, 2, 3], 6);
        let before = live(&atlas);
        atlas.insert_quad(quad(7), 1).unwrap();
        atlas.remove_quad_at_index(1).unwrap();
        assert_eq!(live(&atlas), before);
        assert_eq!(atlas.total_quads(), 3);
    }

    #[test]
    fn remove_blanks_trailing_slot() {
        let mut atlas = atlas_with(&[1, 2, 3], 4);
        atlas.remove_quad_at_index(0).unwrap();
        assert_eq!(live(&atlas), tags(&[2, 3]));
        assert_eq!(atlas.quads()[2], Quad::EMPTY);
        assert_eq!(atlas.capacity(), 4);

        let err = atlas.remove_quad_at_index(2).unwrap_err();
        assert!(matches!(err, AtlasError::IndexOutOfBounds { index: 2, limit: 2 }));
    }

    #[test]
    fn remove_quads_closes_gap() {
        let mut atlas = atlas_with(&[1, 2, 3, 4, 5], 5);
        atlas.remove_quads_at_index(1, 3).unwrap();
        assert_eq!(live(&atlas), tags(&[1, 5]));
        assert!(atlas.quads()[2..].iter().all(|q| *q == Quad::EMPTY));

        let err = atlas.remove_quads_at_index(1, 2).unwrap_err();
        assert!(matches!(
            err,
            AtlasError::RangeOutOfBounds {
                start: 1,
                end: 3,
                limit: 2
            }
        ));
    }

    #[test]
    fn remove_all_keeps_slots() {
        let mut atlas = atlas_with(&[1, 2], 4);
        atlas.set_dirty(false);
        atlas.remove_all_quads();
        assert_eq!(atlas.total_quads(), 0);
        assert_eq!(atlas.capacity(), 4);
        assert_eq!(atlas.quads()[..2], tags(&[1, 2])[..]);
        assert!(atlas.is_dirty());
    }

    #[test]
    fn block_move_matches_extract_and_reinsert() {
        let initial = [1, 2, 3, 4, 5, 6];
        for amount in 0..=3 {
            for old in 0..=initial.len() - amount {
                for new in 0..=initial.len() - amount {
                    let mut atlas = atlas_with(&initial, initial.len());
                    atlas.move_quads_from_index(old, amount, new).unwrap();

                    let mut expected = initial.to_vec();
                    let run: Vec<u8> = expected.drain(old..old + amount).collect();
                    let tail = expected.split_off(new);
                    expected.extend(run);
                    expected.extend(tail);

                    assert_eq!(live(&atlas), tags(&expected), "old {old} amount {amount} new {new}");
                }
            }
        }
    }

    #[test]
    fn block_move_out_of_range_is_rejected() {
        let mut atlas = atlas_with(&[1, 2, 3], 8);
        assert!(atlas.move_quads_from_index(2, 2, 0).is_err());
        assert!(atlas.move_quads_from_index(0, 2, 2).is_err());
        assert_eq!(live(&atlas), tags(&[1, 2, 3]));
    }

    #[test]
    fn tail_move_copies_without_changing_count() {
        let mut atlas = atlas_with(&[1, 2, 3], 6);
        atlas.move_tail_from_index(1, 3).unwrap();
        assert_eq!(atlas.total_quads(), 3);
        assert_eq!(atlas.quads()[3..5], tags(&[2, 3])[..]);

        let err = atlas.move_tail_from_index(1, 5).unwrap_err();
        assert!(matches!(
            err,
            AtlasError::CapacityExceeded {
                required: 7,
                capacity: 6
            }
        ));
    }

    #[test]
    fn increase_total_quads_exposes_slots() {
        let mut atlas = atlas(4);
        atlas.increase_total_quads_with(3).unwrap();
        assert_eq!(atlas.total_quads(), 3);
        assert!(atlas.increase_total_quads_with(2).is_err());
        assert_eq!(atlas.total_quads(), 3);
    }

    #[test]
    fn fill_with_empty_quads_blanks_slots() {
        let mut atlas = atlas_with(&[1, 2, 3], 4);
        atlas.fill_with_empty_quads_from_index(1, 3).unwrap();
        assert_eq!(atlas.quads()[0], quad(1));
        assert!(atlas.quads()[1..].iter().all(|q| *q == Quad::EMPTY));
        assert!(atlas.fill_with_empty_quads_from_index(2, 3).is_err());
    }

    #[test]
    fn resize_keeps_quads_in_order() {
        let mut atlas = atlas_with(&[1, 2, 3], 3);
        atlas.resize_capacity(10).unwrap();
        assert_eq!(atlas.capacity(), 10);
        assert_eq!(live(&atlas), tags(&[1, 2, 3]));
    }

    #[test]
    fn shrinking_below_count_truncates() {
        let mut atlas = atlas_with(&[1, 2, 3, 4], 4);
        atlas.resize_capacity(2).unwrap();
        assert_eq!(atlas.capacity(), 2);
        assert_eq!(atlas.total_quads(), 2);
        assert_eq!(live(&atlas), tags(&[1, 2]));
    }

    #[test]
    fn set_dirty_toggles_flag() {
        let mut atlas = atlas(2);
        atlas.set_dirty(false);
        assert!(!atlas.is_dirty());
        atlas.set_dirty(true);
        assert!(atlas.is_dirty());
    }

    #[test]
    fn set_quads_requires_matching_length() {
        let mut atlas = atlas(3);
        let err = atlas.set_quads(tags(&[1, 2])).unwrap_err();
        assert!(matches!(
            err,
            AtlasError::StorageSizeMismatch {
                expected: 3,
                actual: 2
            }
        ));

        atlas.set_dirty(false);
        atlas.set_quads(tags(&[1, 2, 3])).unwrap();
        assert!(atlas.is_dirty());
        assert_eq!(atlas.quads(), &tags(&[1, 2, 3])[..]);
    }

    #[test]
    fn write_session_flags_its_range_on_drop() {
        let mut atlas = atlas(4);
        atlas.set_dirty(false);
        {
            let mut session = atlas.begin_write(1..3).unwrap();
            assert_eq!(session.range(), 1..3);
            assert_eq!(session.len(), 2);
            session[0] = quad(5);
        }
        assert!(atlas.is_dirty());
        assert_eq!(atlas.dirty.take(), Some(1..3));
        assert_eq!(atlas.quads()[1], quad(5));

        assert!(atlas.begin_write(2..5).is_err());
    }

    #[test]
    fn draw_of_nothing_records_nothing() {
        let mut atlas = atlas(4);
        let mut pass = RecordingPass::new();
        atlas.draw_quads(&mut pass).unwrap();
        assert!(pass.events().is_empty());
        assert!(atlas.is_dirty());
    }

    #[test]
    fn huge_amounts_are_rejected_without_wrapping() {
        let mut atlas = atlas_with(&[1, 2], 4);

        assert!(matches!(
            atlas.increase_total_quads_with(usize::MAX),
            Err(AtlasError::CapacityExceeded {
                required: usize::MAX,
                capacity: 4
            })
        ));
        assert!(matches!(
            atlas.fill_with_empty_quads_from_index(1, usize::MAX),
            Err(AtlasError::CapacityExceeded { .. })
        ));
        assert!(matches!(
            atlas.remove_quads_at_index(1, usize::MAX),
            Err(AtlasError::RangeOutOfBounds {
                start: 1,
                end: usize::MAX,
                limit: 2
            })
        ));
        assert!(matches!(
            atlas.move_quads_from_index(1, usize::MAX, 0),
            Err(AtlasError::RangeOutOfBounds { .. })
        ));
        assert!(matches!(
            atlas.move_quads_from_index(0, 1, usize::MAX),
            Err(AtlasError::RangeOutOfBounds { .. })
        ));
        assert!(matches!(
            atlas.move_tail_from_index(1, usize::MAX),
            Err(AtlasError::CapacityExceeded { .. })
        ));

        assert_eq!(atlas.total_quads(), 2);
        assert_eq!(live(&atlas), tags(&[1, 2]));
    }

    #[test]
    fn huge_draws_are_rejected_without_wrapping() {
        let mut atlas = atlas_with(&[1, 2], 4);
        let mut pass = RecordingPass::new();

        assert!(matches!(
            atlas.draw_number_of_quads_from(&mut pass, usize::MAX, 1),
            Err(AtlasError::CapacityExceeded { .. })
        ));
        assert!(matches!(
            atlas.draw_number_of_quads_from(&mut pass, 1, usize::MAX),
            Err(AtlasError::CapacityExceeded { .. })
        ));
        assert!(pass.events().is_empty());
        assert!(atlas.is_dirty());
    }

    #[test]
    fn capacity_is_capped_by_the_index_width() {
        let texture = Rc::new(RecordedTexture::new("atlas.png", 32, 32));
        let result = QuadAtlas::with_texture(RecordingBackend::new(), "test", texture, MAX_QUADS + 1);
        assert!(matches!(
            result,
            Err(AtlasError::TooManyQuads { max: MAX_QUADS, .. })
        ));

        let mut atlas = atlas_with(&[1, 2], 4);
        assert!(matches!(
            atlas.resize_capacity(MAX_QUADS + 1),
            Err(AtlasError::TooManyQuads { .. })
        ));
        assert_eq!(atlas.capacity(), 4);
        assert_eq!(live(&atlas), tags(&[1, 2]));
        assert!(atlas.vertex_buffer().is_some());
    }

    #[test]
    fn index_positions_stay_within_u32() {
        assert_eq!(index_position(2).unwrap(), 12);
        assert_eq!(index_position(MAX_QUADS).unwrap() as usize, MAX_QUADS * INDICES_PER_QUAD);
        assert!(index_position(MAX_QUADS + 1).is_err());
        assert!(index_position(usize::MAX).is_err());
    }

    #[test]
    fn buffers_are_allocated_with_their_kind() {
        let atlas = atlas(2);
        assert_eq!(atlas.vertex_buffer().unwrap().kind(), BufferKind::Vertex);
        assert_eq!(atlas.index_buffer().unwrap().kind(), BufferKind::Index);
    }

    #[test]
    fn describes_itself() {
        let atlas = atlas_with(&[1, 2], 4);
        assert_eq!(atlas.to_string(), "<QuadAtlas | total quads = 2>");
    }
}
