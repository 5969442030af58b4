//! Integration tests for the GPU control plane.
//!
//! # Test Categories
//!
//! - **Pool Renting**: Concurrent renting, returning and autonomous recycling
//! - **Command Lifecycle**: Record, submit, complete and the state machine
//! - **Resource Lifetime**: Reference counting, pinning and deferred disposal
//! - **Swap Image Targets**: Rebuilding per-image targets on resize
//! - **Validation**: Checks compiled in with the `validation` feature
//!
//! ```bash
//! cargo test --test control_plane_tests
//! ```

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use rstest::rstest;

use common::TestContext;
use redlilium_gpu::{
    BufferUsage, CommandBufferPoolDescriptor, CommandBufferState, CommandBufferUsage, Extent2d,
    GpuError, PoolState, RefCountedResource, SwapImageTargetDescriptor, SwapImageTargetSet,
    TextureFormat, TextureLayout, WAIT_FOREVER,
};

// ============================================================================
// Pool Renting
// ============================================================================

#[test]
fn test_concurrent_rent_never_hands_out_a_pool_twice() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 40;

    let ctx = TestContext::auto_complete();
    let manager = ctx.device.create_pool_manager();
    let held = Mutex::new(HashSet::new());

    std::thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..ROUNDS {
                    let pool = manager.rent().unwrap();
                    assert!(
                        held.lock().insert(pool.id()),
                        "pool {} rented twice",
                        pool.id()
                    );
                    assert_eq!(pool.state(), PoolState::Ready);

                    let mut buffer = ctx.recording(&pool);
                    buffer.end().unwrap();
                    ctx.device.submit(&buffer, None).unwrap();

                    held.lock().remove(&pool.id());
                    manager.return_when_complete(&pool).unwrap();
                }
            });
        }
    });

    ctx.device.wait_for_idle().unwrap();
    assert_eq!(manager.in_use_count(), 0);
    assert_eq!(manager.available_count(), manager.created_count());
    assert!(manager.created_count() >= 1);

    manager.shutdown().unwrap();
    assert_eq!(ctx.dummy.live_command_pools(), 0);
}

#[rstest]
#[case::one_time(CommandBufferUsage::ONE_TIME_SUBMIT)]
#[case::simultaneous(CommandBufferUsage::SIMULTANEOUS_USE)]
fn test_rent_record_submit_return_roundtrip(#[case] usage: CommandBufferUsage) {
    let ctx = TestContext::new();
    let manager = ctx.device.create_pool_manager();

    let pool = manager.rent().unwrap();
    let mut buffer = pool.allocate_command_buffer().unwrap();
    buffer.begin(usage).unwrap();
    assert_eq!(pool.state(), PoolState::InUse);
    buffer.end().unwrap();

    let fence = ctx.device.create_fence(false).unwrap();
    ctx.device.submit(&buffer, Some(&fence)).unwrap();
    assert_eq!(buffer.state(), CommandBufferState::Submitted);
    assert_eq!(
        manager.return_pool(&pool),
        Err(GpuError::PoolNotReady(PoolState::InUse))
    );

    assert!(ctx.device.wait_for_fence(&fence, WAIT_FOREVER).unwrap());
    assert_eq!(pool.state(), PoolState::Completed);
    pool.reset(false).unwrap();
    assert_eq!(pool.state(), PoolState::Ready);
    manager.return_pool(&pool).unwrap();

    let again = manager.rent().unwrap();
    assert!(Arc::ptr_eq(&pool, &again));
    manager.return_pool(&again).unwrap();
    assert_eq!(manager.created_count(), 1);
}

#[test]
fn test_pool_returned_early_rejects_recording() {
    let ctx = TestContext::new();
    let manager = ctx.device.create_pool_manager();
    let pool = manager.rent().unwrap();
    let mut buffer = pool.allocate_command_buffer().unwrap();
    manager.return_pool(&pool).unwrap();

    assert_eq!(
        buffer.begin(CommandBufferUsage::ONE_TIME_SUBMIT),
        Err(GpuError::PoolNotUsable(PoolState::InPool))
    );
    assert_eq!(buffer.state(), CommandBufferState::Ready);
}

#[test]
fn test_return_pool_of_other_manager_fails() {
    let ctx = TestContext::new();
    let first = ctx.device.create_pool_manager();
    let second = ctx.device.create_pool_manager();

    let pool = first.rent().unwrap();
    assert_eq!(
        second.return_pool(&pool),
        Err(GpuError::PoolNotRented(pool.id()))
    );
    assert_eq!(
        second.return_when_complete(&pool),
        Err(GpuError::PoolNotRented(pool.id()))
    );
    first.return_pool(&pool).unwrap();
}

// ============================================================================
// Command Lifecycle
// ============================================================================

#[test]
fn test_state_machine_rejections() {
    let ctx = TestContext::new();
    let pool = ctx
        .device
        .create_command_pool(CommandBufferPoolDescriptor::new())
        .unwrap();
    let mut buffer = pool.allocate_command_buffer().unwrap();

    assert!(matches!(
        buffer.end(),
        Err(GpuError::InvalidCommandBufferState {
            actual: CommandBufferState::Ready,
            ..
        })
    ));
    assert!(matches!(
        buffer.draw(3, 1, 0, 0),
        Err(GpuError::InvalidCommandBufferState { .. })
    ));

    buffer.begin(CommandBufferUsage::ONE_TIME_SUBMIT).unwrap();
    assert!(matches!(
        buffer.begin(CommandBufferUsage::ONE_TIME_SUBMIT),
        Err(GpuError::InvalidCommandBufferState {
            actual: CommandBufferState::Recording,
            ..
        })
    ));
    assert!(matches!(
        ctx.device.submit(&buffer, None),
        Err(GpuError::InvalidCommandBufferState { .. })
    ));

    buffer.end().unwrap();
    assert_eq!(buffer.previous_state(), CommandBufferState::Recording);
    assert_eq!(buffer.reset(), Err(GpuError::ResetNotAllowed));
    assert!(matches!(
        buffer.dispatch(1, 1, 1),
        Err(GpuError::InvalidCommandBufferState {
            actual: CommandBufferState::Recorded,
            ..
        })
    ));
}

#[test]
fn test_pool_reset_refused_while_recording() {
    let ctx = TestContext::new();
    let pool = ctx
        .device
        .create_command_pool(CommandBufferPoolDescriptor::new())
        .unwrap();
    let mut buffer = ctx.recording(&pool);

    assert_eq!(pool.reset(false), Err(GpuError::PoolBusy));
    buffer.end().unwrap();
    pool.reset(true).unwrap();
    assert_eq!(buffer.state(), CommandBufferState::Ready);
    assert_eq!(pool.state(), PoolState::Ready);
}

#[test]
fn test_pool_completes_only_when_every_buffer_completed() {
    let ctx = TestContext::new();
    let pool = ctx
        .device
        .create_command_pool(CommandBufferPoolDescriptor::new())
        .unwrap();

    let mut first = ctx.recording(&pool);
    first.end().unwrap();
    let mut second = ctx.recording(&pool);
    second.end().unwrap();
    ctx.device.submit(&first, None).unwrap();
    ctx.device.submit(&second, None).unwrap();

    assert!(ctx.dummy.complete_next());
    ctx.device.refresh().unwrap();
    assert_eq!(first.state(), CommandBufferState::Completed);
    assert_eq!(pool.state(), PoolState::InUse);

    ctx.dummy.complete_all();
    ctx.device.refresh().unwrap();
    assert_eq!(second.state(), CommandBufferState::Completed);
    assert_eq!(pool.state(), PoolState::Completed);
}

#[test]
fn test_resettable_buffer_records_again() {
    let ctx = TestContext::new();
    let pool = ctx
        .device
        .create_command_pool(CommandBufferPoolDescriptor::new().resettable())
        .unwrap();
    let source = ctx.create_buffer(256, BufferUsage::COPY_SRC);
    let destination = ctx.create_buffer(256, BufferUsage::COPY_DST);

    let mut buffer = ctx.recording(&pool);
    buffer.copy_buffer(&source, 0, &destination, 0, 128).unwrap();
    buffer.copy_buffer(&source, 128, &destination, 128, 128).unwrap();
    assert_eq!(buffer.tracked_resources(), 2);
    buffer.end().unwrap();

    buffer.reset().unwrap();
    assert_eq!(buffer.state(), CommandBufferState::Ready);
    assert_eq!(buffer.tracked_resources(), 0);
    assert_eq!(source.ref_count().count(), 1);

    buffer.begin(CommandBufferUsage::ONE_TIME_SUBMIT).unwrap();
    buffer.end().unwrap();
    ctx.device.submit(&buffer, None).unwrap();
    ctx.device.wait_for_idle().unwrap();
    assert_eq!(buffer.state(), CommandBufferState::Completed);
}

// ============================================================================
// Resource Lifetime
// ============================================================================

#[test]
fn test_shared_texture_destroyed_after_last_framebuffer() {
    let ctx = TestContext::new();
    let depth = ctx.create_texture(32, 32, TextureFormat::Depth32Float);
    let color_a = ctx.create_texture(32, 32, TextureFormat::Rgba8Unorm);
    let color_b = ctx.create_texture(32, 32, TextureFormat::Rgba8Unorm);

    let first = ctx
        .device
        .create_framebuffer(vec![color_a.clone()], Some(depth.clone()))
        .unwrap();
    let second = ctx
        .device
        .create_framebuffer(vec![color_b.clone()], Some(depth.clone()))
        .unwrap();
    assert_eq!(depth.ref_count().count(), 3);

    depth.dispose();
    color_a.dispose();
    color_b.dispose();
    assert!(!depth.is_destroyed());

    first.dispose();
    assert!(color_a.is_destroyed());
    assert!(!depth.is_destroyed());

    second.dispose();
    assert!(depth.is_destroyed());
    assert_eq!(ctx.dummy.live_textures(), 0);
    assert_eq!(ctx.dummy.live_texture_views(), 0);
}

#[test]
fn test_dispose_when_idle_waits_for_idle_point() {
    let ctx = TestContext::new();
    let pool = ctx
        .device
        .create_command_pool(CommandBufferPoolDescriptor::new())
        .unwrap();
    let vertices = ctx.create_buffer(1024, BufferUsage::VERTEX | BufferUsage::COPY_DST);
    let staging = ctx.create_buffer(1024, BufferUsage::COPY_SRC | BufferUsage::MAP_WRITE);

    let mut buffer = ctx.recording(&pool);
    buffer.copy_buffer(&staging, 0, &vertices, 0, 1024).unwrap();
    buffer.end().unwrap();
    ctx.device.submit(&buffer, None).unwrap();

    ctx.device.dispose_when_idle(staging.clone());
    ctx.device.dispose_when_idle(vertices.clone());
    assert_eq!(ctx.device.pending_disposals(), 2);
    assert!(!staging.is_destroyed());

    ctx.device.refresh().unwrap();
    assert!(!staging.is_destroyed());

    ctx.device.wait_for_idle().unwrap();
    assert!(staging.is_destroyed());
    assert!(vertices.is_destroyed());
    assert_eq!(ctx.device.pending_disposals(), 0);
    assert_eq!(ctx.dummy.live_buffers(), 0);
}

#[test]
fn test_imported_objects_released_natively() {
    let ctx = TestContext::new();
    let pipeline = ctx.import_compute_pipeline(&[Default::default()]);
    let set = ctx.import_resource_set(Default::default());
    let pipeline_handle = pipeline.handle();
    let set_handle = set.handle();

    pipeline.dispose();
    set.dispose();
    assert_eq!(ctx.dummy.destroyed_pipelines(), vec![pipeline_handle]);
    assert_eq!(ctx.dummy.freed_resource_sets(), vec![set_handle]);
}

#[cfg(feature = "validation")]
#[test]
fn test_use_after_destroy_is_reported() {
    let ctx = TestContext::new();
    let pool = ctx
        .device
        .create_command_pool(CommandBufferPoolDescriptor::new())
        .unwrap();
    let vertices = ctx.create_buffer(64, BufferUsage::VERTEX);
    vertices.dispose();
    assert!(vertices.is_destroyed());

    assert!(matches!(
        vertices.add_reference(),
        Err(GpuError::UseAfterDestroy(_))
    ));

    let mut buffer = ctx.recording(&pool);
    assert!(matches!(
        buffer.set_vertex_buffer(0, &vertices, 0),
        Err(GpuError::UseAfterDestroy(_))
    ));
    assert_eq!(buffer.tracked_resources(), 0);
}

// ============================================================================
// Swap Image Targets
// ============================================================================

#[test]
fn test_swap_targets_rebuilt_on_resize() {
    let ctx = TestContext::new();
    let mut targets = SwapImageTargetSet::new(
        ctx.device.clone(),
        SwapImageTargetDescriptor::default()
            .with_label("main")
            .with_depth_format(TextureFormat::Depth32Float),
    );

    targets
        .set_new_swapchain(
            ctx.dummy.create_swapchain(3),
            Extent2d::new(1280, 720),
            TextureFormat::Bgra8UnormSrgb,
        )
        .unwrap();
    assert_eq!(targets.image_count(), 3);
    let old_framebuffers = targets.framebuffers().to_vec();
    let old_depth = targets.depth_target().unwrap().clone();

    targets
        .set_new_swapchain(
            ctx.dummy.create_swapchain(2),
            Extent2d::new(1920, 1080),
            TextureFormat::Bgra8UnormSrgb,
        )
        .unwrap();

    assert_eq!(targets.color_targets().len(), 2);
    assert_eq!(targets.framebuffers().len(), 2);
    assert!(old_framebuffers.iter().all(|fb| fb.is_destroyed()));
    assert!(old_depth.is_destroyed());

    let depth = targets.depth_target().unwrap();
    assert_eq!(depth.extent(), Extent2d::new(1920, 1080));
    for framebuffer in targets.framebuffers() {
        assert!(Arc::ptr_eq(framebuffer.depth_target().unwrap(), depth));
    }

    // One view per swap image plus the depth view; only depth owns an image.
    assert_eq!(ctx.dummy.live_texture_views(), 3);
    assert_eq!(ctx.dummy.live_textures(), 1);
}

#[test]
fn test_failed_swap_rebuild_keeps_previous_targets() {
    let ctx = TestContext::new();
    let mut targets = SwapImageTargetSet::new(
        ctx.device.clone(),
        SwapImageTargetDescriptor::default().with_depth_format(TextureFormat::Depth32Float),
    );
    targets
        .set_new_swapchain(
            ctx.dummy.create_swapchain(3),
            Extent2d::new(800, 600),
            TextureFormat::Bgra8UnormSrgb,
        )
        .unwrap();
    let framebuffers = targets.framebuffers().to_vec();
    let outputs = targets.outputs().cloned();
    assert_eq!(ctx.dummy.live_texture_views(), 4);

    // Unknown swapchain: nothing is built.
    let unknown = redlilium_gpu::backend::SwapchainHandle(9999);
    assert!(
        targets
            .set_new_swapchain(unknown, Extent2d::new(1920, 1080), TextureFormat::Bgra8Unorm)
            .is_err()
    );

    // Fails on the second color target, after the depth target was created.
    ctx.dummy.limit_texture_views(Some(6));
    assert!(
        targets
            .set_new_swapchain(
                ctx.dummy.create_swapchain(3),
                Extent2d::new(1920, 1080),
                TextureFormat::Bgra8UnormSrgb,
            )
            .is_err()
    );
    ctx.dummy.limit_texture_views(None);

    assert_eq!(targets.extent(), Extent2d::new(800, 600));
    assert_eq!(targets.image_count(), 3);
    assert!(
        targets
            .framebuffers()
            .iter()
            .zip(&framebuffers)
            .all(|(current, previous)| Arc::ptr_eq(current, previous))
    );
    assert_eq!(targets.outputs().cloned(), outputs);
    assert_eq!(targets.depth_target().unwrap().extent(), Extent2d::new(800, 600));
    assert!(framebuffers.iter().all(|fb| !fb.is_destroyed()));
    assert_eq!(ctx.dummy.live_texture_views(), 4);
    assert_eq!(ctx.dummy.live_textures(), 1);

    targets.set_image_index(2).unwrap();
}

#[test]
fn test_swap_targets_transition_current_image() {
    let ctx = TestContext::new();
    let pool = ctx
        .device
        .create_command_pool(CommandBufferPoolDescriptor::new())
        .unwrap();
    let mut targets = SwapImageTargetSet::new(ctx.device.clone(), Default::default());
    targets
        .set_new_swapchain(
            ctx.dummy.create_swapchain(2),
            Extent2d::new(64, 64),
            TextureFormat::Bgra8Unorm,
        )
        .unwrap();
    targets.set_image_index(1).unwrap();

    let mut buffer = ctx.recording(&pool);
    targets.transition_to_render(&mut buffer).unwrap();
    let framebuffer = targets.current_framebuffer().unwrap().clone();
    buffer.set_framebuffer(&framebuffer).unwrap();
    buffer.clear_color_target(0, [0.0, 0.0, 0.0, 1.0]).unwrap();
    targets.transition_to_present(&mut buffer).unwrap();
    buffer.end().unwrap();

    let commands = ctx.dummy.recorded_commands(buffer.handle());
    let transitions: Vec<_> = commands
        .iter()
        .filter_map(|command| match command {
            redlilium_gpu::backend::NativeCommand::TransitionLayout { from, to, .. } => {
                Some((*from, *to))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (TextureLayout::Undefined, TextureLayout::ColorAttachment),
            (TextureLayout::ColorAttachment, TextureLayout::Present),
        ]
    );
}

// ============================================================================
// Validation
// ============================================================================

#[cfg(feature = "validation")]
mod validation {
    use redlilium_gpu::types::{OutputDescription, ResourceLayoutDescriptor};
    use redlilium_gpu::{BufferUsage, CommandBufferPoolDescriptor, GpuError, IndexFormat};
    use rstest::rstest;

    use super::common::{TestContext, color_outputs};

    fn is_validation<T>(result: Result<T, GpuError>) -> bool {
        matches!(result, Err(GpuError::Validation(_)))
    }

    #[test]
    fn test_draw_requires_framebuffer_and_pipeline() {
        let ctx = TestContext::new();
        let pool = ctx
            .device
            .create_command_pool(CommandBufferPoolDescriptor::new())
            .unwrap();
        let mut buffer = ctx.recording(&pool);

        assert!(is_validation(buffer.draw(3, 1, 0, 0)));

        let framebuffer = ctx.create_framebuffer();
        buffer.set_framebuffer(&framebuffer).unwrap();
        assert!(is_validation(buffer.draw(3, 1, 0, 0)));

        let pipeline = ctx.import_graphics_pipeline(color_outputs(), &[]);
        buffer.set_pipeline(&pipeline).unwrap();
        buffer.draw(3, 1, 0, 0).unwrap();
    }

    #[test]
    fn test_pipeline_outputs_must_match_framebuffer() {
        let ctx = TestContext::new();
        let pool = ctx
            .device
            .create_command_pool(CommandBufferPoolDescriptor::new())
            .unwrap();
        let framebuffer = ctx.create_framebuffer();
        let pipeline = ctx.import_graphics_pipeline(
            OutputDescription {
                color_formats: vec![redlilium_gpu::TextureFormat::Rgba16Float],
                depth_format: None,
                sample_count: 1,
            },
            &[],
        );

        let mut buffer = ctx.recording(&pool);
        buffer.set_framebuffer(&framebuffer).unwrap();
        buffer.set_pipeline(&pipeline).unwrap();
        assert!(is_validation(buffer.draw(3, 1, 0, 0)));
    }

    #[rstest]
    #[case::too_small(12, false)]
    #[case::unaligned(18, false)]
    #[case::minimal(16, true)]
    #[case::padded(32, true)]
    fn test_draw_indirect_stride(#[case] stride: u32, #[case] accepted: bool) {
        let ctx = TestContext::new();
        let pool = ctx
            .device
            .create_command_pool(CommandBufferPoolDescriptor::new())
            .unwrap();
        let framebuffer = ctx.create_framebuffer();
        let pipeline = ctx.import_graphics_pipeline(color_outputs(), &[]);
        let args = ctx.create_buffer(256, BufferUsage::INDIRECT);

        let mut buffer = ctx.recording(&pool);
        buffer.set_framebuffer(&framebuffer).unwrap();
        buffer.set_pipeline(&pipeline).unwrap();
        let result = buffer.draw_indirect(&args, 0, 2, stride);
        assert_eq!(result.is_ok(), accepted, "stride {stride}: {result:?}");
    }

    #[test]
    fn test_indexed_indirect_needs_larger_stride_and_index_buffer() {
        let ctx = TestContext::new();
        let pool = ctx
            .device
            .create_command_pool(CommandBufferPoolDescriptor::new())
            .unwrap();
        let framebuffer = ctx.create_framebuffer();
        let pipeline = ctx.import_graphics_pipeline(color_outputs(), &[]);
        let args = ctx.create_buffer(256, BufferUsage::INDIRECT);
        let indices = ctx.create_buffer(256, BufferUsage::INDEX);

        let mut buffer = ctx.recording(&pool);
        buffer.set_framebuffer(&framebuffer).unwrap();
        buffer.set_pipeline(&pipeline).unwrap();
        assert!(is_validation(buffer.draw_indexed_indirect(&args, 0, 1, 20)));

        buffer.set_index_buffer(&indices, IndexFormat::Uint16, 0).unwrap();
        assert!(is_validation(buffer.draw_indexed_indirect(&args, 0, 1, 16)));
        assert!(is_validation(buffer.draw_indexed_indirect(&args, 2, 1, 20)));
        buffer.draw_indexed_indirect(&args, 0, 1, 20).unwrap();

        // 256 bytes hold 128 16-bit indices.
        buffer.draw_indexed(128, 1, 0, 0, 0).unwrap();
        assert!(is_validation(buffer.draw_indexed(128, 1, 1, 0, 0)));
    }

    #[test]
    fn test_buffer_usage_is_checked() {
        let ctx = TestContext::new();
        let pool = ctx
            .device
            .create_command_pool(CommandBufferPoolDescriptor::new())
            .unwrap();
        let uniforms = ctx.create_buffer(64, BufferUsage::UNIFORM);

        let mut buffer = ctx.recording(&pool);
        assert!(is_validation(buffer.set_vertex_buffer(0, &uniforms, 0)));
        assert!(is_validation(buffer.set_index_buffer(
            &uniforms,
            IndexFormat::Uint32,
            0
        )));
        assert!(is_validation(buffer.dispatch_indirect(&uniforms, 0)));
        assert!(is_validation(buffer.copy_buffer(&uniforms, 0, &uniforms, 0, 16)));
        assert_eq!(buffer.tracked_resources(), 0);
    }

    #[test]
    fn test_out_of_range_offsets_are_rejected_not_wrapped() {
        let ctx = TestContext::new();
        let pool = ctx
            .device
            .create_command_pool(CommandBufferPoolDescriptor::new())
            .unwrap();
        let source = ctx.create_buffer(64, BufferUsage::COPY_SRC);
        let destination = ctx.create_buffer(64, BufferUsage::COPY_DST);
        let framebuffer = ctx.create_framebuffer();
        let pipeline = ctx.import_graphics_pipeline(color_outputs(), &[]);
        let indices = ctx.create_buffer(64, BufferUsage::INDEX);

        let mut buffer = ctx.recording(&pool);
        assert!(is_validation(buffer.copy_buffer(&source, u64::MAX, &destination, 0, 2)));
        assert!(is_validation(buffer.copy_buffer(&source, 0, &destination, u64::MAX, 2)));
        buffer.copy_buffer(&source, 62, &destination, 0, 2).unwrap();

        buffer.set_framebuffer(&framebuffer).unwrap();
        buffer.set_pipeline(&pipeline).unwrap();
        buffer
            .set_index_buffer(&indices, IndexFormat::Uint32, u64::MAX - 1)
            .unwrap();
        assert!(is_validation(buffer.draw_indexed(1, 1, 0, 0, 0)));
        assert!(is_validation(buffer.draw_indexed(u32::MAX, 1, u32::MAX, 0, 0)));
    }

    #[rstest]
    #[case::aligned(&[256, 512], true)]
    #[case::unaligned_uniform(&[128, 512], false)]
    #[case::unaligned_storage(&[256, 100], false)]
    #[case::too_few(&[256], false)]
    #[case::too_many(&[256, 256, 256], false)]
    fn test_dynamic_offsets(#[case] offsets: &[u32], #[case] accepted: bool) {
        let ctx = TestContext::new();
        let pool = ctx
            .device
            .create_command_pool(CommandBufferPoolDescriptor::new())
            .unwrap();
        let layout = ResourceLayoutDescriptor {
            dynamic_uniform_buffers: 1,
            dynamic_storage_buffers: 1,
        };
        let pipeline = ctx.import_compute_pipeline(&[layout]);
        let set = ctx.import_resource_set(layout);

        let mut buffer = ctx.recording(&pool);
        buffer.set_pipeline(&pipeline).unwrap();
        let result = buffer.set_compute_resource_set(0, &set, offsets);
        assert_eq!(result.is_ok(), accepted, "offsets {offsets:?}: {result:?}");
    }

    #[test]
    fn test_resource_set_slot_and_layout() {
        let ctx = TestContext::new();
        let pool = ctx
            .device
            .create_command_pool(CommandBufferPoolDescriptor::new())
            .unwrap();
        let pipeline = ctx.import_compute_pipeline(&[ResourceLayoutDescriptor::default()]);
        let other_layout = ctx.import_resource_set(ResourceLayoutDescriptor {
            dynamic_uniform_buffers: 1,
            dynamic_storage_buffers: 0,
        });
        let set = ctx.import_resource_set(ResourceLayoutDescriptor::default());

        let mut buffer = ctx.recording(&pool);
        assert!(is_validation(buffer.set_compute_resource_set(0, &set, &[])));

        buffer.set_pipeline(&pipeline).unwrap();
        assert!(is_validation(buffer.set_compute_resource_set(1, &set, &[])));
        assert!(is_validation(buffer.set_compute_resource_set(0, &other_layout, &[0])));
        assert!(is_validation(buffer.set_graphics_resource_set(0, &set, &[])));
        buffer.set_compute_resource_set(0, &set, &[]).unwrap();
        buffer.dispatch(8, 8, 1).unwrap();
    }
}
