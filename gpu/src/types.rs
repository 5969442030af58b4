//! Plain value types and descriptors shared across the crate.

use bitflags::bitflags;

/// Two-dimensional extent in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Texture formats understood by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureFormat {
    /// 8-bit RGBA, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA, unsigned normalized (common swap image format).
    Bgra8Unorm,
    /// 8-bit BGRA, sRGB.
    Bgra8UnormSrgb,
    /// 16-bit float RGBA.
    Rgba16Float,
    /// 32-bit float depth.
    Depth32Float,
    /// 24-bit depth with 8-bit stencil.
    Depth24UnormStencil8,
    /// 32-bit float depth with 8-bit stencil.
    Depth32FloatStencil8,
}

impl TextureFormat {
    /// Whether this is a depth (or depth-stencil) format.
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            Self::Depth32Float | Self::Depth24UnormStencil8 | Self::Depth32FloatStencil8
        )
    }

    /// Whether this format carries a stencil aspect.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::Depth24UnormStencil8 | Self::Depth32FloatStencil8)
    }
}

/// Index element format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    Uint16,
    #[default]
    Uint32,
}

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const STORAGE = 1 << 3;
        const INDIRECT = 1 << 4;
        const COPY_SRC = 1 << 5;
        const COPY_DST = 1 << 6;
        /// Host-visible for CPU writes.
        const MAP_WRITE = 1 << 7;
    }
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureUsage: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        const SAMPLED = 1 << 2;
        const STORAGE = 1 << 3;
        const RENDER_TARGET = 1 << 4;
        const DEPTH_STENCIL = 1 << 5;
        /// The texture is a presentable swap image.
        const PRESENT = 1 << 6;
    }
}

bitflags! {
    /// Flags passed to [`CommandBuffer::begin`](crate::command::CommandBuffer::begin).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CommandBufferUsage: u32 {
        /// The recording is submitted once and then reset or discarded.
        const ONE_TIME_SUBMIT = 1 << 0;
        /// The recording may be resubmitted while already pending.
        const SIMULTANEOUS_USE = 1 << 1;
    }
}

/// Viewport rectangle with depth range.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// A viewport covering the whole extent with the `[0, 1]` depth range.
    pub fn full(extent: Extent2d) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Integer scissor rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScissorRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    pub fn full(extent: Extent2d) -> Self {
        Self {
            x: 0,
            y: 0,
            width: extent.width,
            height: extent.height,
        }
    }
}

/// Image layout a texture is in from the GPU's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureLayout {
    #[default]
    Undefined,
    ColorAttachment,
    DepthStencilAttachment,
    ShaderRead,
    TransferSrc,
    TransferDst,
    Present,
}

/// Formats of the attachments a framebuffer provides and a graphics
/// pipeline renders into. Two sides are compatible when they are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct OutputDescription {
    pub color_formats: Vec<TextureFormat>,
    pub depth_format: Option<TextureFormat>,
    pub sample_count: u32,
}

/// Device limits consulted by validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceLimits {
    /// Required alignment of dynamic uniform buffer offsets.
    pub min_uniform_buffer_offset_alignment: u64,
    /// Required alignment of dynamic storage buffer offsets.
    pub min_storage_buffer_offset_alignment: u64,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            min_uniform_buffer_offset_alignment: 256,
            min_storage_buffer_offset_alignment: 256,
        }
    }
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: u64,
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Descriptor for creating a 2D texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub extent: Extent2d,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub sample_count: u32,
}

impl TextureDescriptor {
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            extent: Extent2d::new(width, height),
            format,
            usage,
            sample_count: 1,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Kind of pipeline, which decides the bind point it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Graphics,
    Compute,
}

/// Dynamic-offset shape of one resource set slot of a pipeline layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResourceLayoutDescriptor {
    pub dynamic_uniform_buffers: u32,
    pub dynamic_storage_buffers: u32,
}

impl ResourceLayoutDescriptor {
    pub fn dynamic_count(&self) -> u32 {
        self.dynamic_uniform_buffers + self.dynamic_storage_buffers
    }
}

/// Describes an externally compiled pipeline being imported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineDescriptor {
    pub label: Option<String>,
    pub kind: PipelineKind,
    /// Attachment formats the pipeline renders into (graphics only).
    pub outputs: Option<OutputDescription>,
    pub resource_layouts: Vec<ResourceLayoutDescriptor>,
}

impl PipelineDescriptor {
    pub fn graphics(outputs: OutputDescription) -> Self {
        Self {
            label: None,
            kind: PipelineKind::Graphics,
            outputs: Some(outputs),
            resource_layouts: Vec::new(),
        }
    }

    pub fn compute() -> Self {
        Self {
            label: None,
            kind: PipelineKind::Compute,
            outputs: None,
            resource_layouts: Vec::new(),
        }
    }

    pub fn with_resource_layout(mut self, layout: ResourceLayoutDescriptor) -> Self {
        self.resource_layouts.push(layout);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Arguments of a non-indexed indirect draw, as laid out in GPU memory.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawIndirectArgs {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

/// Arguments of an indexed indirect draw, as laid out in GPU memory.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawIndexedIndirectArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<DrawIndirectArgs>(), 16);
static_assertions::const_assert_eq!(std::mem::size_of::<DrawIndexedIndirectArgs>(), 20);
