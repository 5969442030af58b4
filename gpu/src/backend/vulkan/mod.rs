//! Vulkan backend implementation using ash.
//!
//! [`VulkanDevice`] drives an externally created logical device. Instance and
//! device creation, surface handling and swapchain creation stay with the
//! application; this backend only needs the device, one queue and, for
//! presentation, the swapchain extension loader.
//!
//! Requirements on the device:
//! - Vulkan 1.3 or `VK_KHR_dynamic_rendering` (framebuffers are bound with
//!   dynamic rendering, no render pass objects)
//! - `VK_KHR_swapchain` if swap image targets are used

pub(crate) mod conversion;

use std::collections::HashMap;

use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use parking_lot::Mutex;

use super::{
    BufferHandle, CommandBufferHandle, CommandPoolHandle, FenceHandle, NativeCommand,
    NativeDevice, NativePoolInfo, PipelineHandle, ResourceSetHandle, SwapchainHandle,
    TextureHandle, TextureViewHandle,
};
use crate::error::{GpuError, GpuResult};
use crate::types::{
    BufferDescriptor, BufferUsage, CommandBufferUsage, DeviceLimits, TextureDescriptor,
    TextureFormat,
};

use self::conversion::convert_result;

/// Native device backed by Vulkan.
///
/// # Thread Safety
///
/// Queue access is serialized by a mutex, memory allocation by another.
/// Command recording relies on the control plane's one-recorder-per-buffer
/// rule; command pools are never shared between recorders.
pub struct VulkanDevice {
    device: ash::Device,
    queue: Mutex<vk::Queue>,
    queue_family_index: u32,
    dynamic_rendering: ash::khr::dynamic_rendering::Device,
    swapchain_loader: Option<ash::khr::swapchain::Device>,
    descriptor_pool: Option<vk::DescriptorPool>,
    allocator: Mutex<Allocator>,
    buffer_allocations: Mutex<HashMap<u64, Allocation>>,
    image_allocations: Mutex<HashMap<u64, Allocation>>,
    limits: DeviceLimits,
}

impl VulkanDevice {
    /// Wrap an existing logical device.
    ///
    /// The device must outlive the returned object and must have been created
    /// with a queue in `queue_family_index`.
    pub fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        queue_family_index: u32,
    ) -> GpuResult<Self> {
        let queue = unsafe { device.get_device_queue(queue_family_index, 0) };
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: gpu_allocator::AllocationSizes::default(),
        })
        .map_err(|e| GpuError::Native(format!("Failed to create memory allocator: {e}")))?;

        let dynamic_rendering = ash::khr::dynamic_rendering::Device::new(instance, &device);

        let limits = DeviceLimits {
            min_uniform_buffer_offset_alignment: properties
                .limits
                .min_uniform_buffer_offset_alignment,
            min_storage_buffer_offset_alignment: properties
                .limits
                .min_storage_buffer_offset_alignment,
        };

        log::info!(
            "Vulkan device wrapped (queue family {queue_family_index}, uniform alignment {})",
            limits.min_uniform_buffer_offset_alignment
        );

        Ok(Self {
            device,
            queue: Mutex::new(queue),
            queue_family_index,
            dynamic_rendering,
            swapchain_loader: None,
            descriptor_pool: None,
            allocator: Mutex::new(allocator),
            buffer_allocations: Mutex::new(HashMap::new()),
            image_allocations: Mutex::new(HashMap::new()),
            limits,
        })
    }

    /// Enable swap image queries. The device needs `VK_KHR_swapchain`.
    pub fn with_swapchain_support(mut self, instance: &ash::Instance) -> Self {
        self.swapchain_loader = Some(ash::khr::swapchain::Device::new(instance, &self.device));
        self
    }

    /// Descriptor pool imported resource sets were allocated from.
    ///
    /// The pool must have been created with `FREE_DESCRIPTOR_SET`. Without
    /// it, disposed resource sets are left to the owner of their pool.
    pub fn with_descriptor_pool(mut self, pool: vk::DescriptorPool) -> Self {
        self.descriptor_pool = Some(pool);
        self
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    fn encode_begin_rendering(
        &self,
        cmd: vk::CommandBuffer,
        colors: &[TextureViewHandle],
        depth: Option<TextureViewHandle>,
        depth_has_stencil: bool,
        extent: crate::types::Extent2d,
    ) {
        let color_attachments: Vec<vk::RenderingAttachmentInfo> = colors
            .iter()
            .map(|view| {
                vk::RenderingAttachmentInfo::default()
                    .image_view(vk::ImageView::from_raw(view.raw()))
                    .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                    .load_op(vk::AttachmentLoadOp::LOAD)
                    .store_op(vk::AttachmentStoreOp::STORE)
            })
            .collect();

        let depth_attachment = depth.map(|view| {
            vk::RenderingAttachmentInfo::default()
                .image_view(vk::ImageView::from_raw(view.raw()))
                .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                .load_op(vk::AttachmentLoadOp::LOAD)
                .store_op(vk::AttachmentStoreOp::STORE)
        });

        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D {
                width: extent.width,
                height: extent.height,
            },
        };

        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(render_area)
            .layer_count(1)
            .color_attachments(&color_attachments);

        if let Some(ref depth) = depth_attachment {
            rendering_info = rendering_info.depth_attachment(depth);
            if depth_has_stencil {
                rendering_info = rendering_info.stencil_attachment(depth);
            }
        }

        unsafe {
            self.dynamic_rendering
                .cmd_begin_rendering(cmd, &rendering_info);
        }
    }

    fn encode_transition(
        &self,
        cmd: vk::CommandBuffer,
        texture: TextureHandle,
        format: TextureFormat,
        from: crate::types::TextureLayout,
        to: crate::types::TextureLayout,
    ) {
        let (old_layout, src_access, src_stage) = conversion::layout_barrier_info(from);
        let (new_layout, dst_access, dst_stage) = conversion::layout_barrier_info(to);

        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(vk::Image::from_raw(texture.raw()))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: conversion::aspect_mask(format),
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .src_access_mask(src_access)
            .dst_access_mask(dst_access);

        unsafe {
            self.device.cmd_pipeline_barrier(
                cmd,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
    }
}

fn native_buffer(handle: BufferHandle) -> vk::Buffer {
    vk::Buffer::from_raw(handle.raw())
}

fn command_buffer(handle: CommandBufferHandle) -> vk::CommandBuffer {
    vk::CommandBuffer::from_raw(handle.raw())
}

fn fence(handle: FenceHandle) -> vk::Fence {
    vk::Fence::from_raw(handle.raw())
}

impl NativeDevice for VulkanDevice {
    fn name(&self) -> &'static str {
        "Vulkan"
    }

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn create_command_pool(&self, info: NativePoolInfo) -> GpuResult<CommandPoolHandle> {
        let mut flags = vk::CommandPoolCreateFlags::empty();
        if info.transient {
            flags |= vk::CommandPoolCreateFlags::TRANSIENT;
        }
        if info.can_reset {
            flags |= vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER;
        }
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(self.queue_family_index)
            .flags(flags);
        let pool = unsafe { self.device.create_command_pool(&create_info, None) }
            .map_err(|e| convert_result(e, "Failed to create command pool"))?;
        Ok(CommandPoolHandle(pool.as_raw()))
    }

    fn reset_command_pool(
        &self,
        pool: CommandPoolHandle,
        release_resources: bool,
    ) -> GpuResult<()> {
        let flags = if release_resources {
            vk::CommandPoolResetFlags::RELEASE_RESOURCES
        } else {
            vk::CommandPoolResetFlags::empty()
        };
        unsafe {
            self.device
                .reset_command_pool(vk::CommandPool::from_raw(pool.raw()), flags)
        }
        .map_err(|e| convert_result(e, "Failed to reset command pool"))
    }

    fn destroy_command_pool(&self, pool: CommandPoolHandle) {
        unsafe {
            self.device
                .destroy_command_pool(vk::CommandPool::from_raw(pool.raw()), None);
        }
    }

    fn allocate_command_buffer(&self, pool: CommandPoolHandle) -> GpuResult<CommandBufferHandle> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(vk::CommandPool::from_raw(pool.raw()))
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = unsafe { self.device.allocate_command_buffers(&alloc_info) }
            .map_err(|e| convert_result(e, "Failed to allocate command buffer"))?;
        buffers
            .first()
            .map(|cmd| CommandBufferHandle(cmd.as_raw()))
            .ok_or_else(|| GpuError::Native("No command buffer allocated".to_string()))
    }

    fn begin_command_buffer(
        &self,
        buffer: CommandBufferHandle,
        usage: CommandBufferUsage,
    ) -> GpuResult<()> {
        let mut flags = vk::CommandBufferUsageFlags::empty();
        if usage.contains(CommandBufferUsage::ONE_TIME_SUBMIT) {
            flags |= vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT;
        }
        if usage.contains(CommandBufferUsage::SIMULTANEOUS_USE) {
            flags |= vk::CommandBufferUsageFlags::SIMULTANEOUS_USE;
        }
        let begin_info = vk::CommandBufferBeginInfo::default().flags(flags);
        unsafe {
            self.device
                .begin_command_buffer(command_buffer(buffer), &begin_info)
        }
        .map_err(|e| convert_result(e, "Failed to begin command buffer"))
    }

    fn end_command_buffer(&self, buffer: CommandBufferHandle) -> GpuResult<()> {
        unsafe { self.device.end_command_buffer(command_buffer(buffer)) }
            .map_err(|e| convert_result(e, "Failed to end command buffer"))
    }

    fn reset_command_buffer(&self, buffer: CommandBufferHandle) -> GpuResult<()> {
        unsafe {
            self.device.reset_command_buffer(
                command_buffer(buffer),
                vk::CommandBufferResetFlags::empty(),
            )
        }
        .map_err(|e| convert_result(e, "Failed to reset command buffer"))
    }

    fn encode(&self, buffer: CommandBufferHandle, command: &NativeCommand) {
        let cmd = command_buffer(buffer);
        match command {
            NativeCommand::BeginRendering {
                colors,
                depth,
                depth_has_stencil,
                extent,
            } => self.encode_begin_rendering(cmd, colors, *depth, *depth_has_stencil, *extent),
            NativeCommand::EndRendering => unsafe {
                self.dynamic_rendering.cmd_end_rendering(cmd);
            },
            NativeCommand::BindPipeline { kind, pipeline } => unsafe {
                self.device.cmd_bind_pipeline(
                    cmd,
                    conversion::convert_bind_point(*kind),
                    vk::Pipeline::from_raw(pipeline.raw()),
                );
            },
            NativeCommand::BindVertexBuffer {
                slot,
                buffer: vertex_buffer,
                offset,
            } => unsafe {
                self.device
                    .cmd_bind_vertex_buffers(cmd, *slot, &[native_buffer(*vertex_buffer)], &[*offset]);
            },
            NativeCommand::BindIndexBuffer {
                buffer: index_buffer,
                format,
                offset,
            } => unsafe {
                self.device.cmd_bind_index_buffer(
                    cmd,
                    native_buffer(*index_buffer),
                    *offset,
                    conversion::convert_index_format(*format),
                );
            },
            NativeCommand::BindResourceSet {
                kind,
                layout,
                slot,
                set,
                dynamic_offsets,
            } => unsafe {
                self.device.cmd_bind_descriptor_sets(
                    cmd,
                    conversion::convert_bind_point(*kind),
                    vk::PipelineLayout::from_raw(layout.raw()),
                    *slot,
                    &[vk::DescriptorSet::from_raw(set.raw())],
                    dynamic_offsets,
                );
            },
            NativeCommand::SetViewport { index, viewport } => unsafe {
                self.device.cmd_set_viewport(
                    cmd,
                    *index,
                    &[vk::Viewport {
                        x: viewport.x,
                        y: viewport.y,
                        width: viewport.width,
                        height: viewport.height,
                        min_depth: viewport.min_depth,
                        max_depth: viewport.max_depth,
                    }],
                );
            },
            NativeCommand::SetScissor { index, rect } => unsafe {
                self.device.cmd_set_scissor(
                    cmd,
                    *index,
                    &[vk::Rect2D {
                        offset: vk::Offset2D {
                            x: rect.x,
                            y: rect.y,
                        },
                        extent: vk::Extent2D {
                            width: rect.width,
                            height: rect.height,
                        },
                    }],
                );
            },
            NativeCommand::ClearColor {
                index,
                color,
                extent,
            } => unsafe {
                let attachment = vk::ClearAttachment {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    color_attachment: *index,
                    clear_value: vk::ClearValue {
                        color: vk::ClearColorValue { float32: *color },
                    },
                };
                self.device
                    .cmd_clear_attachments(cmd, &[attachment], &[clear_rect(*extent)]);
            },
            NativeCommand::ClearDepthStencil {
                depth,
                stencil,
                has_stencil,
                extent,
            } => unsafe {
                let mut aspect_mask = vk::ImageAspectFlags::DEPTH;
                if *has_stencil {
                    aspect_mask |= vk::ImageAspectFlags::STENCIL;
                }
                let attachment = vk::ClearAttachment {
                    aspect_mask,
                    color_attachment: 0,
                    clear_value: vk::ClearValue {
                        depth_stencil: vk::ClearDepthStencilValue {
                            depth: *depth,
                            stencil: u32::from(*stencil),
                        },
                    },
                };
                self.device
                    .cmd_clear_attachments(cmd, &[attachment], &[clear_rect(*extent)]);
            },
            NativeCommand::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            } => unsafe {
                self.device.cmd_draw(
                    cmd,
                    *vertex_count,
                    *instance_count,
                    *first_vertex,
                    *first_instance,
                );
            },
            NativeCommand::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            } => unsafe {
                self.device.cmd_draw_indexed(
                    cmd,
                    *index_count,
                    *instance_count,
                    *first_index,
                    *vertex_offset,
                    *first_instance,
                );
            },
            NativeCommand::DrawIndirect {
                buffer: args,
                offset,
                draw_count,
                stride,
            } => unsafe {
                self.device
                    .cmd_draw_indirect(cmd, native_buffer(*args), *offset, *draw_count, *stride);
            },
            NativeCommand::DrawIndexedIndirect {
                buffer: args,
                offset,
                draw_count,
                stride,
            } => unsafe {
                self.device.cmd_draw_indexed_indirect(
                    cmd,
                    native_buffer(*args),
                    *offset,
                    *draw_count,
                    *stride,
                );
            },
            NativeCommand::Dispatch { x, y, z } => unsafe {
                self.device.cmd_dispatch(cmd, *x, *y, *z);
            },
            NativeCommand::DispatchIndirect {
                buffer: args,
                offset,
            } => unsafe {
                self.device
                    .cmd_dispatch_indirect(cmd, native_buffer(*args), *offset);
            },
            NativeCommand::CopyBuffer {
                source,
                source_offset,
                destination,
                destination_offset,
                size,
            } => unsafe {
                let region = vk::BufferCopy {
                    src_offset: *source_offset,
                    dst_offset: *destination_offset,
                    size: *size,
                };
                self.device
                    .cmd_copy_buffer(cmd, native_buffer(*source), native_buffer(*destination), &[region]);
            },
            NativeCommand::TransitionLayout {
                texture,
                format,
                from,
                to,
            } => self.encode_transition(cmd, *texture, *format, *from, *to),
        }
    }

    fn submit(&self, buffer: CommandBufferHandle, signal: FenceHandle) -> GpuResult<()> {
        let command_buffers = [command_buffer(buffer)];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        let queue = self.queue.lock();
        unsafe {
            self.device
                .queue_submit(*queue, &[submit_info], fence(signal))
        }
        .map_err(|e| convert_result(e, "Failed to submit command buffer"))
    }

    fn signal_fence(&self, signal: FenceHandle) -> GpuResult<()> {
        let queue = self.queue.lock();
        unsafe { self.device.queue_submit(*queue, &[], fence(signal)) }
            .map_err(|e| convert_result(e, "Failed to signal fence"))
    }

    fn create_fence(&self, signaled: bool) -> GpuResult<FenceHandle> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        let handle = unsafe { self.device.create_fence(&create_info, None) }
            .map_err(|e| convert_result(e, "Failed to create fence"))?;
        Ok(FenceHandle(handle.as_raw()))
    }

    fn destroy_fence(&self, handle: FenceHandle) {
        unsafe {
            self.device.destroy_fence(fence(handle), None);
        }
    }

    fn fence_signaled(&self, handle: FenceHandle) -> GpuResult<bool> {
        unsafe { self.device.get_fence_status(fence(handle)) }
            .map_err(|e| convert_result(e, "Failed to query fence status"))
    }

    fn wait_fence(&self, handle: FenceHandle, timeout_ns: u64) -> GpuResult<bool> {
        match unsafe {
            self.device
                .wait_for_fences(&[fence(handle)], true, timeout_ns)
        } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(convert_result(e, "Failed to wait for fence")),
        }
    }

    fn reset_fence(&self, handle: FenceHandle) -> GpuResult<()> {
        unsafe { self.device.reset_fences(&[fence(handle)]) }
            .map_err(|e| convert_result(e, "Failed to reset fence"))
    }

    fn wait_idle(&self) -> GpuResult<()> {
        // vkDeviceWaitIdle requires external synchronization of every queue.
        let _queue = self.queue.lock();
        unsafe { self.device.device_wait_idle() }
            .map_err(|e| convert_result(e, "Failed to wait for device idle"))
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> GpuResult<BufferHandle> {
        if descriptor.size == 0 {
            return Err(GpuError::ResourceCreationFailed(
                "buffer size cannot be zero".to_string(),
            ));
        }

        let location = if descriptor.usage.contains(BufferUsage::MAP_WRITE) {
            gpu_allocator::MemoryLocation::CpuToGpu
        } else {
            gpu_allocator::MemoryLocation::GpuOnly
        };

        let buffer_info = vk::BufferCreateInfo::default()
            .size(descriptor.size)
            .usage(conversion::convert_buffer_usage(descriptor.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let vk_buffer = unsafe { self.device.create_buffer(&buffer_info, None) }
            .map_err(|e| convert_result(e, "Failed to create buffer"))?;
        let requirements = unsafe { self.device.get_buffer_memory_requirements(vk_buffer) };

        let allocation = self
            .allocator
            .lock()
            .allocate(&AllocationCreateDesc {
                name: descriptor.label.as_deref().unwrap_or("buffer"),
                requirements,
                location,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                unsafe {
                    self.device.destroy_buffer(vk_buffer, None);
                }
                GpuError::ResourceCreationFailed(format!("Failed to allocate buffer memory: {e}"))
            })?;

        if let Err(e) = unsafe {
            self.device
                .bind_buffer_memory(vk_buffer, allocation.memory(), allocation.offset())
        } {
            unsafe {
                self.device.destroy_buffer(vk_buffer, None);
            }
            let _ = self.allocator.lock().free(allocation);
            return Err(convert_result(e, "Failed to bind buffer memory"));
        }

        self.buffer_allocations
            .lock()
            .insert(vk_buffer.as_raw(), allocation);
        Ok(BufferHandle(vk_buffer.as_raw()))
    }

    fn destroy_buffer(&self, handle: BufferHandle) {
        unsafe {
            self.device.destroy_buffer(native_buffer(handle), None);
        }
        if let Some(allocation) = self.buffer_allocations.lock().remove(&handle.raw())
            && let Err(e) = self.allocator.lock().free(allocation)
        {
            log::error!("Failed to free buffer memory: {e}");
        }
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> GpuResult<TextureHandle> {
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(conversion::convert_texture_format(descriptor.format))
            .extent(vk::Extent3D {
                width: descriptor.extent.width,
                height: descriptor.extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::from_raw(descriptor.sample_count.max(1)))
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(conversion::convert_texture_usage(descriptor.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { self.device.create_image(&image_info, None) }
            .map_err(|e| convert_result(e, "Failed to create image"))?;
        let requirements = unsafe { self.device.get_image_memory_requirements(image) };

        let allocation = self
            .allocator
            .lock()
            .allocate(&AllocationCreateDesc {
                name: descriptor.label.as_deref().unwrap_or("texture"),
                requirements,
                location: gpu_allocator::MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                unsafe {
                    self.device.destroy_image(image, None);
                }
                GpuError::ResourceCreationFailed(format!("Failed to allocate texture memory: {e}"))
            })?;

        if let Err(e) = unsafe {
            self.device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
        } {
            unsafe {
                self.device.destroy_image(image, None);
            }
            let _ = self.allocator.lock().free(allocation);
            return Err(convert_result(e, "Failed to bind image memory"));
        }

        self.image_allocations.lock().insert(image.as_raw(), allocation);
        Ok(TextureHandle(image.as_raw()))
    }

    fn destroy_texture(&self, texture: TextureHandle) {
        unsafe {
            self.device
                .destroy_image(vk::Image::from_raw(texture.raw()), None);
        }
        if let Some(allocation) = self.image_allocations.lock().remove(&texture.raw())
            && let Err(e) = self.allocator.lock().free(allocation)
        {
            log::error!("Failed to free texture memory: {e}");
        }
    }

    fn create_texture_view(
        &self,
        texture: TextureHandle,
        format: TextureFormat,
    ) -> GpuResult<TextureViewHandle> {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(vk::Image::from_raw(texture.raw()))
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(conversion::convert_texture_format(format))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: conversion::aspect_mask(format),
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        let view = unsafe { self.device.create_image_view(&view_info, None) }
            .map_err(|e| convert_result(e, "Failed to create image view"))?;
        Ok(TextureViewHandle(view.as_raw()))
    }

    fn destroy_texture_view(&self, view: TextureViewHandle) {
        unsafe {
            self.device
                .destroy_image_view(vk::ImageView::from_raw(view.raw()), None);
        }
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        unsafe {
            self.device
                .destroy_pipeline(vk::Pipeline::from_raw(pipeline.raw()), None);
        }
    }

    fn free_resource_set(&self, set: ResourceSetHandle) {
        let Some(pool) = self.descriptor_pool else {
            log::trace!("Resource set {} left to its descriptor pool owner", set.raw());
            return;
        };
        if let Err(e) = unsafe {
            self.device
                .free_descriptor_sets(pool, &[vk::DescriptorSet::from_raw(set.raw())])
        } {
            log::error!("Failed to free descriptor set: {e:?}");
        }
    }

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> GpuResult<Vec<TextureHandle>> {
        let loader = self.swapchain_loader.as_ref().ok_or_else(|| {
            GpuError::Native("swapchain support was not enabled on this device".to_string())
        })?;
        let images = unsafe {
            loader.get_swapchain_images(vk::SwapchainKHR::from_raw(swapchain.raw()))
        }
        .map_err(|e| convert_result(e, "Failed to get swapchain images"))?;
        Ok(images
            .into_iter()
            .map(|image| TextureHandle(image.as_raw()))
            .collect())
    }
}

fn clear_rect(extent: crate::types::Extent2d) -> vk::ClearRect {
    vk::ClearRect {
        rect: vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D {
                width: extent.width,
                height: extent.height,
            },
        },
        base_array_layer: 0,
        layer_count: 1,
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        let buffers = self.buffer_allocations.get_mut().len();
        let images = self.image_allocations.get_mut().len();
        if buffers > 0 || images > 0 {
            log::warn!(
                "Vulkan device dropped with {buffers} buffer(s) and {images} image(s) still allocated"
            );
        }
    }
}

impl std::fmt::Debug for VulkanDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanDevice")
            .field("queue_family_index", &self.queue_family_index)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}
