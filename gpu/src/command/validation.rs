//! Checks run before recording draw, bind and copy commands.
//!
//! Only compiled with the `validation` feature; every check returns a
//! [`GpuError::Validation`] describing the misuse.

use crate::error::{GpuError, GpuResult};
use crate::resources::{Buffer, Framebuffer, Pipeline, ResourceSet};
use crate::types::{BufferUsage, DeviceLimits, IndexFormat};

/// Smallest stride of a non-indexed indirect draw record.
pub(super) const DRAW_INDIRECT_STRIDE: u32 =
    std::mem::size_of::<crate::types::DrawIndirectArgs>() as u32;

/// Smallest stride of an indexed indirect draw record.
pub(super) const DRAW_INDEXED_INDIRECT_STRIDE: u32 =
    std::mem::size_of::<crate::types::DrawIndexedIndirectArgs>() as u32;

pub(super) fn buffer_usage(buffer: &Buffer, required: BufferUsage, what: &str) -> GpuResult<()> {
    if buffer.usage().contains(required) {
        Ok(())
    } else {
        Err(GpuError::validation(format!(
            "{what} requires a buffer with {required:?} usage, got {:?}",
            buffer.usage()
        )))
    }
}

/// A graphics draw needs a framebuffer and a graphics pipeline whose outputs
/// match it.
pub(super) fn draw_targets(
    framebuffer: Option<&Framebuffer>,
    pipeline: Option<&Pipeline>,
) -> GpuResult<()> {
    let framebuffer =
        framebuffer.ok_or_else(|| GpuError::validation("draw without a bound framebuffer"))?;
    let pipeline =
        pipeline.ok_or_else(|| GpuError::validation("draw without a bound graphics pipeline"))?;

    match pipeline.outputs() {
        Some(outputs) if outputs == framebuffer.outputs() => Ok(()),
        Some(outputs) => Err(GpuError::validation(format!(
            "pipeline outputs {outputs:?} do not match framebuffer outputs {:?}",
            framebuffer.outputs()
        ))),
        None => Err(GpuError::validation("bound graphics pipeline has no outputs")),
    }
}

/// The bound index buffer must hold `first_index + index_count` indices.
pub(super) fn index_range(
    buffer: &Buffer,
    format: IndexFormat,
    offset: u64,
    first_index: u32,
    index_count: u32,
) -> GpuResult<()> {
    let index_size = match format {
        IndexFormat::Uint16 => 2,
        IndexFormat::Uint32 => 4,
    };
    let needed = (u64::from(first_index) + u64::from(index_count))
        .checked_mul(index_size)
        .and_then(|bytes| bytes.checked_add(offset));
    match needed {
        Some(needed) if needed <= buffer.size() => Ok(()),
        Some(needed) => Err(GpuError::validation(format!(
            "index buffer holds {} bytes but the draw reads up to byte {needed}",
            buffer.size()
        ))),
        None => Err(GpuError::validation(format!(
            "index range at offset {offset} overflows the address space"
        ))),
    }
}

pub(super) fn indirect(buffer: &Buffer, offset: u64, stride: u32, min_stride: u32) -> GpuResult<()> {
    buffer_usage(buffer, BufferUsage::INDIRECT, "indirect command")?;
    if offset % 4 != 0 {
        return Err(GpuError::validation(format!(
            "indirect offset {offset} is not a multiple of 4"
        )));
    }
    if stride < min_stride || stride % 4 != 0 {
        return Err(GpuError::validation(format!(
            "indirect stride {stride} must be a multiple of 4 and at least {min_stride}"
        )));
    }
    Ok(())
}

/// Dynamic offsets must match the set's dynamic binding count and alignment.
///
/// Uniform buffer bindings come first, then storage buffer bindings.
pub(super) fn dynamic_offsets(
    pipeline: &Pipeline,
    slot: u32,
    set: &ResourceSet,
    offsets: &[u32],
    limits: &DeviceLimits,
) -> GpuResult<()> {
    let layouts = pipeline.resource_layouts();
    if slot as usize >= layouts.len() {
        return Err(GpuError::validation(format!(
            "resource set slot {slot} out of range, pipeline declares {} slot(s)",
            layouts.len()
        )));
    }
    if layouts[slot as usize] != *set.layout() {
        return Err(GpuError::validation(format!(
            "resource set layout {:?} does not match pipeline slot {slot} layout {:?}",
            set.layout(),
            layouts[slot as usize]
        )));
    }

    let layout = set.layout();
    if offsets.len() != layout.dynamic_count() as usize {
        return Err(GpuError::validation(format!(
            "resource set expects {} dynamic offset(s), got {}",
            layout.dynamic_count(),
            offsets.len()
        )));
    }

    for (i, offset) in offsets.iter().enumerate() {
        let alignment = if (i as u32) < layout.dynamic_uniform_buffers {
            limits.min_uniform_buffer_offset_alignment
        } else {
            limits.min_storage_buffer_offset_alignment
        };
        if alignment != 0 && u64::from(*offset) % alignment != 0 {
            return Err(GpuError::validation(format!(
                "dynamic offset {offset} at index {i} is not aligned to {alignment}"
            )));
        }
    }
    Ok(())
}

pub(super) fn copy_range(
    source: &Buffer,
    source_offset: u64,
    destination: &Buffer,
    destination_offset: u64,
    size: u64,
) -> GpuResult<()> {
    buffer_usage(source, BufferUsage::COPY_SRC, "copy source")?;
    buffer_usage(destination, BufferUsage::COPY_DST, "copy destination")?;
    let fits = |offset: u64, buffer: &Buffer| {
        offset
            .checked_add(size)
            .is_some_and(|end| end <= buffer.size())
    };
    if !fits(source_offset, source) || !fits(destination_offset, destination) {
        return Err(GpuError::validation(format!(
            "copy of {size} bytes is out of bounds (source {} bytes at {source_offset}, destination {} bytes at {destination_offset})",
            source.size(),
            destination.size()
        )));
    }
    Ok(())
}
