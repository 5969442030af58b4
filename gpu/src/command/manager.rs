//! Recycling of command buffer pools.
//!
//! A [`CommandBufferPoolManager`] rents pools to callers and takes them back
//! once they are reusable. Rented pools either come back explicitly through
//! [`return_pool`](CommandBufferPoolManager::return_pool), or autonomously:
//! a pool the caller handed over with
//! [`return_when_complete`](CommandBufferPoolManager::return_when_complete)
//! notifies the manager once all of its submitted work completed, and the
//! manager resets it and puts it back into the available set. A pool its
//! renter still holds stays `Completed` until the renter resets it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::PoolState;
use super::pool::{CommandBufferPool, CommandBufferPoolDescriptor, PoolObserver};
use crate::backend::NativeDevice;
use crate::device::GraphicsDevice;
use crate::error::{GpuError, GpuResult};
use crate::resource::RefCountedResource;

#[derive(Default)]
struct PoolSets {
    available: Vec<Arc<CommandBufferPool>>,
    in_use: HashMap<u64, Arc<CommandBufferPool>>,
}

struct ManagerShared {
    native: Arc<dyn NativeDevice>,
    descriptor: CommandBufferPoolDescriptor,
    pools: Mutex<PoolSets>,
    created: AtomicUsize,
}

impl ManagerShared {
    /// Move a `Ready` rented pool back to the available set.
    fn return_locked(
        &self,
        pools: &mut PoolSets,
        pool: &Arc<CommandBufferPool>,
    ) -> GpuResult<()> {
        let state = pool.state();
        if state != PoolState::Ready {
            return Err(GpuError::PoolNotReady(state));
        }
        if !pools.in_use.contains_key(&pool.id()) {
            return Err(GpuError::PoolNotRented(pool.id()));
        }

        pool.reset(false)?;
        pools.in_use.remove(&pool.id());
        pool.set_return_pending(false);
        pool.set_state(PoolState::InPool);
        pool.release_reference();
        pools.available.push(pool.clone());

        log::trace!(
            "Returned command buffer pool {} ({} available)",
            pool.id(),
            pools.available.len()
        );
        Ok(())
    }
}

impl PoolObserver for ManagerShared {
    fn on_pool_completed(&self, pool: &Arc<CommandBufferPool>) -> GpuResult<()> {
        let mut pools = self.pools.lock();
        if !pools.in_use.contains_key(&pool.id()) || pool.state() != PoolState::Completed {
            return Ok(());
        }
        // A pool its renter still holds stays `Completed` until the renter
        // resets or returns it.
        if !pool.is_return_pending() {
            return Ok(());
        }

        pool.reset(false)?;
        self.return_locked(&mut pools, pool)
    }
}

/// Rents command buffer pools and recycles them once their work completed.
///
/// A pool is in exactly one of two sets at any time: available (state
/// `InPool`) or in use (rented to a caller). Every rent, return and
/// completion handler moves pools between the sets under one lock.
pub struct CommandBufferPoolManager {
    device: Arc<GraphicsDevice>,
    shared: Arc<ManagerShared>,
}

impl CommandBufferPoolManager {
    pub fn new(device: Arc<GraphicsDevice>, descriptor: CommandBufferPoolDescriptor) -> Self {
        let shared = Arc::new(ManagerShared {
            native: device.native().clone(),
            descriptor,
            pools: Mutex::new(PoolSets::default()),
            created: AtomicUsize::new(0),
        });
        Self { device, shared }
    }

    pub fn descriptor(&self) -> &CommandBufferPoolDescriptor {
        &self.shared.descriptor
    }

    /// Rent a `Ready` pool, reusing an available one or creating a new one.
    ///
    /// Completed submissions are collected first, so pools whose work just
    /// finished can be reused right away.
    pub fn rent(&self) -> GpuResult<Arc<CommandBufferPool>> {
        self.device.refresh()?;

        let mut pools = self.shared.pools.lock();
        let pool = match pools.available.pop() {
            Some(pool) => pool,
            None => {
                let shared: Weak<ManagerShared> = Arc::downgrade(&self.shared);
                let observer: Weak<dyn PoolObserver> = shared;
                let pool = CommandBufferPool::new(
                    self.shared.native.clone(),
                    self.device.next_pool_id(),
                    self.shared.descriptor.clone(),
                    Some(observer),
                    PoolState::InPool,
                )?;
                let created = self.shared.created.fetch_add(1, Ordering::Relaxed) + 1;
                log::debug!(
                    "Command buffer pool manager created pool {} ({created} total)",
                    pool.id()
                );
                pool
            }
        };

        if let Err(e) = pool.add_reference() {
            pools.available.push(pool);
            return Err(e);
        }
        pool.set_return_pending(false);
        pool.set_state(PoolState::Ready);
        pools.in_use.insert(pool.id(), pool.clone());
        Ok(pool)
    }

    /// Give a rented pool back.
    ///
    /// # Errors
    ///
    /// [`GpuError::PoolNotReady`] unless the pool is `Ready`, and
    /// [`GpuError::PoolNotRented`] if it is not rented from this manager.
    pub fn return_pool(&self, pool: &Arc<CommandBufferPool>) -> GpuResult<()> {
        let mut pools = self.shared.pools.lock();
        self.shared.return_locked(&mut pools, pool)
    }

    /// Give a rented pool back once its submitted work completed.
    ///
    /// Returns immediately if nothing is pending. Otherwise the pool comes
    /// back when the device observes its last buffer complete.
    pub fn return_when_complete(&self, pool: &Arc<CommandBufferPool>) -> GpuResult<()> {
        let mut pools = self.shared.pools.lock();
        if !pools.in_use.contains_key(&pool.id()) {
            return Err(GpuError::PoolNotRented(pool.id()));
        }

        match pool.state() {
            PoolState::Ready => self.shared.return_locked(&mut pools, pool),
            PoolState::Completed => {
                pool.reset(false)?;
                self.shared.return_locked(&mut pools, pool)
            }
            PoolState::InUse => {
                pool.set_return_pending(true);
                Ok(())
            }
            state => Err(GpuError::PoolNotReady(state)),
        }
    }

    pub fn available_count(&self) -> usize {
        self.shared.pools.lock().available.len()
    }

    pub fn in_use_count(&self) -> usize {
        self.shared.pools.lock().in_use.len()
    }

    /// Pools created over the manager's lifetime.
    pub fn created_count(&self) -> usize {
        self.shared.created.load(Ordering::Relaxed)
    }

    /// Destroy every available pool.
    ///
    /// # Errors
    ///
    /// [`GpuError::PoolsStillInUse`] if pools are still rented; nothing is
    /// destroyed in that case.
    pub fn shutdown(&self) -> GpuResult<()> {
        let mut pools = self.shared.pools.lock();
        if !pools.in_use.is_empty() {
            return Err(GpuError::PoolsStillInUse(pools.in_use.len()));
        }
        let count = pools.available.len();
        for pool in pools.available.drain(..) {
            pool.force_destroy();
        }
        log::debug!("Command buffer pool manager destroyed {count} pool(s)");
        Ok(())
    }
}

impl Drop for CommandBufferPoolManager {
    fn drop(&mut self) {
        let mut pools = self.shared.pools.lock();
        if !pools.in_use.is_empty() {
            log::error!(
                "Command buffer pool manager dropped with {} pool(s) still in use",
                pools.in_use.len()
            );
        }
        for pool in pools.available.drain(..) {
            pool.force_destroy();
        }
    }
}

impl std::fmt::Debug for CommandBufferPoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pools = self.shared.pools.lock();
        f.debug_struct("CommandBufferPoolManager")
            .field("available", &pools.available.len())
            .field("in_use", &pools.in_use.len())
            .field("created", &self.created_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(CommandBufferPoolManager: Send, Sync);
