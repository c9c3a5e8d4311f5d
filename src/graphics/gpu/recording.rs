use std::cell::RefCell;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::graphics::gpu::{BufferKind, GpuBackend, GpuError, GpuResult};

/// Identifies a buffer allocated by a [`RecordingBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(pub usize);

/// Something the backend was asked to do outside of a pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GpuEvent {
    Allocate {
        buffer: BufferId,
        kind: BufferKind,
        size: u64,
    },
    Upload {
        buffer: BufferId,
        offset: u64,
        len: usize,
    },
    Release {
        buffer: BufferId,
    },
}

/// Something recorded into a [`RecordingPass`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrawEvent {
    Bind {
        texture: String,
        vertices: BufferId,
        indices: BufferId,
    },
    DrawIndexed {
        indices: Range<u32>,
    },
}

/// A buffer living in host memory.
#[derive(Debug)]
pub struct RecordedBuffer {
    id: BufferId,
    kind: BufferKind,
}

impl RecordedBuffer {
    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }
}

/// A texture that was only ever registered by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedTexture {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl RecordedTexture {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }
}

/// The pass draws get recorded into.
#[derive(Debug, Default)]
pub struct RecordingPass {
    events: Vec<DrawEvent>,
}

impl RecordingPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, in order.
    pub fn events(&self) -> &[DrawEvent] {
        &self.events
    }

    /// Only the index ranges of the recorded draws.
    pub fn draws(&self) -> Vec<Range<u32>> {
        self.events
            .iter()
            .filter_map(|event| match event {
                DrawEvent::DrawIndexed { indices } => Some(indices.clone()),
                DrawEvent::Bind { .. } => None,
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    next_buffer: usize,
    contents: FxHashMap<BufferId, Vec<u8>>,
    textures: FxHashMap<PathBuf, (u32, u32)>,
    max_buffer_size: Option<u64>,
    events: Vec<GpuEvent>,
}

/// A backend keeping every buffer in host memory and recording every request it gets.
///
/// Clones share the same state, so a clone kept aside can inspect what an atlas did.
#[derive(Clone, Debug, Default)]
pub struct RecordingBackend {
    state: Rc<RefCell<RecordingState>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make allocations larger than `max` bytes fail, like a device limit would.
    pub fn with_max_buffer_size(self, max: u64) -> Self {
        self.set_max_buffer_size(Some(max));
        self
    }

    pub fn set_max_buffer_size(&self, max: Option<u64>) {
        self.state.borrow_mut().max_buffer_size = max;
    }

    /// Make `path` resolvable through [`GpuBackend::load_texture`].
    pub fn register_texture(&self, path: impl Into<PathBuf>, width: u32, height: u32) {
        self.state
            .borrow_mut()
            .textures
            .insert(path.into(), (width, height));
    }

    /// Everything requested so far, in order.
    pub fn events(&self) -> Vec<GpuEvent> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    /// Number of buffers allocated and not yet released.
    pub fn live_buffers(&self) -> usize {
        self.state.borrow().contents.len()
    }

    /// The raw bytes of a live buffer.
    pub fn contents(&self, buffer: &RecordedBuffer) -> Vec<u8> {
        self.state
            .borrow()
            .contents
            .get(&buffer.id)
            .cloned()
            .unwrap_or_default()
    }

    /// The contents of a live buffer, read back as a sequence of `T`.
    pub fn read<T: bytemuck::Pod>(&self, buffer: &RecordedBuffer) -> Vec<T> {
        self.contents(buffer)
            .chunks_exact(size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }
}

impl GpuBackend for RecordingBackend {
    type Buffer = RecordedBuffer;
    type Texture = RecordedTexture;
    type Pass<'pass> = RecordingPass;

    fn allocate_buffer(
        &self,
        kind: BufferKind,
        label: &str,
        size: u64,
    ) -> GpuResult<RecordedBuffer> {
        let mut state = self.state.borrow_mut();
        if let Some(max) = state.max_buffer_size.filter(|max| size > *max) {
            return Err(GpuError::BufferTooLarge {
                label: label.into(),
                size,
                max,
            });
        }

        let id = BufferId(state.next_buffer);
        state.next_buffer += 1;
        state.contents.insert(id, vec![0; size as usize]);
        state.events.push(GpuEvent::Allocate {
            buffer: id,
            kind,
            size,
        });
        Ok(RecordedBuffer { id, kind })
    }

    /// ## Panic
    /// Panics if the write goes past the end of the buffer, or the buffer was released.
    fn update_subrange(&self, buffer: &RecordedBuffer, offset: u64, bytes: &[u8]) {
        let mut state = self.state.borrow_mut();
        let contents = state
            .contents
            .get_mut(&buffer.id)
            .unwrap_or_else(|| panic!("upload into released buffer {:?}", buffer.id));
        let start = offset as usize;
        let end = start + bytes.len();
        if end > contents.len() {
            panic!(
                "upload of {}..{end} overruns buffer {:?} of {} bytes",
                start,
                buffer.id,
                contents.len()
            );
        }
        contents[start..end].copy_from_slice(bytes);
        state.events.push(GpuEvent::Upload {
            buffer: buffer.id,
            offset,
            len: bytes.len(),
        });
    }

    fn release_buffer(&self, buffer: RecordedBuffer) {
        let mut state = self.state.borrow_mut();
        state.contents.remove(&buffer.id);
        state.events.push(GpuEvent::Release { buffer: buffer.id });
    }

    fn load_texture(&self, path: &Path) -> GpuResult<RecordedTexture> {
        let state = self.state.borrow();
        let (width, height) = state
            .textures
            .get(path)
            .copied()
            .ok_or_else(|| GpuError::TextureNotFound(path.to_path_buf()))?;
        Ok(RecordedTexture::new(
            path.to_string_lossy(),
            width,
            height,
        ))
    }

    fn texture_dimensions(&self, texture: &RecordedTexture) -> (u32, u32) {
        (texture.width, texture.height)
    }

    fn bind(
        &self,
        pass: &mut RecordingPass,
        texture: &RecordedTexture,
        vertices: &RecordedBuffer,
        indices: &RecordedBuffer,
    ) {
        pass.events.push(DrawEvent::Bind {
            texture: texture.name.clone(),
            vertices: vertices.id,
            indices: indices.id,
        });
    }

    fn draw_indexed(&self, pass: &mut RecordingPass, indices: Range<u32>) {
        pass.events.push(DrawEvent::DrawIndexed { indices });
    }
}
