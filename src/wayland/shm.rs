//! Shared-memory buffer pool
//!
//! Hands out XRGB8888 `wl_buffer`s backed by anonymous files. Buffers are
//! owned per output and recycled once the compositor releases them.
//!
//! Slot bookkeeping lives in [`BufferPool`], which knows nothing about
//! Wayland; [`ShmBuffers`] plugs the shm objects into it.

use std::fs::File;
use std::os::fd::AsFd;

use anyhow::Context;
use log::{debug, error};
use memmap2::MmapMut;
use wayland_client::protocol::{wl_buffer::WlBuffer, wl_shm, wl_shm_pool::WlShmPool};
use wayland_client::QueueHandle;

use super::WaylandState;
use crate::protocol::{OutputId, PixelBuffer};

/// User data attached to every pooled `wl_buffer`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferKey(pub u64);

/// One pooled buffer and the resource backing it
pub struct Slot<R> {
    key: BufferKey,
    owner: OutputId,
    width: u32,
    height: u32,
    /// Handed out and not yet released by the compositor
    busy: bool,
    resource: R,
}

impl<R> Slot<R> {
    fn matches(&self, owner: OutputId, width: u32, height: u32) -> bool {
        self.owner == owner && self.width == width && self.height == height
    }
}

/// Per-output buffer slots. Resources leaving the pool are handed to a
/// `retire` callback so the caller can destroy them.
pub struct BufferPool<R> {
    slots: Vec<Slot<R>>,
    next_key: u64,
}

impl<R> Default for BufferPool<R> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            next_key: 0,
        }
    }
}

impl<R> BufferPool<R> {
    /// Marks and returns an idle slot of `width` x `height` for `owner`,
    /// creating one through `create` if none is free. Idle slots of the same
    /// owner with another size are retired first. Zero-sized requests yield
    /// `Ok(None)` without calling `create`.
    pub fn acquire(
        &mut self,
        owner: OutputId,
        width: u32,
        height: u32,
        create: impl FnOnce(BufferKey) -> anyhow::Result<R>,
        retire: impl FnMut(R),
    ) -> anyhow::Result<Option<&mut Slot<R>>> {
        if width == 0 || height == 0 {
            return Ok(None);
        }

        self.retain_or_retire(
            |slot| slot.busy || slot.owner != owner || slot.matches(owner, width, height),
            retire,
        );

        let index = match self
            .slots
            .iter()
            .position(|slot| !slot.busy && slot.matches(owner, width, height))
        {
            Some(index) => index,
            None => {
                let key = BufferKey(self.next_key);
                let resource = create(key)?;
                self.next_key += 1;
                self.slots.push(Slot {
                    key,
                    owner,
                    width,
                    height,
                    busy: false,
                    resource,
                });
                self.slots.len() - 1
            }
        };

        let slot = &mut self.slots[index];
        slot.busy = true;
        Ok(Some(slot))
    }

    /// `wl_buffer.release`. Returns whether the key was known.
    pub fn release(&mut self, key: BufferKey) -> bool {
        match self.slots.iter_mut().find(|slot| slot.key == key) {
            Some(slot) => {
                slot.busy = false;
                true
            }
            None => false,
        }
    }

    /// Retires every slot of `owner`, busy or not. Returns how many went.
    pub fn forget(&mut self, owner: OutputId, retire: impl FnMut(R)) -> usize {
        let before = self.slots.len();
        self.retain_or_retire(|slot| slot.owner != owner, retire);
        before - self.slots.len()
    }

    pub fn clear(&mut self, retire: impl FnMut(R)) {
        self.slots.drain(..).map(|slot| slot.resource).for_each(retire);
    }

    #[cfg(test)]
    fn slots(&self) -> impl Iterator<Item = &Slot<R>> {
        self.slots.iter()
    }

    fn retain_or_retire(&mut self, keep: impl Fn(&Slot<R>) -> bool, retire: impl FnMut(R)) {
        let (kept, gone): (Vec<_>, Vec<_>) = self.slots.drain(..).partition(|slot| keep(slot));
        self.slots = kept;
        gone.into_iter().map(|slot| slot.resource).for_each(retire);
    }
}

/// Protocol objects and mapping behind one pooled buffer
struct ShmBacking {
    mmap: MmapMut,
    buffer: WlBuffer,
    pool: WlShmPool,
    _file: File,
}

impl ShmBacking {
    fn create(
        shm: &wl_shm::WlShm,
        qh: &QueueHandle<WaylandState>,
        width: u32,
        height: u32,
        key: BufferKey,
    ) -> anyhow::Result<Self> {
        let stride = width.checked_mul(4).context("stride overflow")?;
        let size = stride.checked_mul(height).context("buffer size overflow")?;
        let pool_size = i32::try_from(size).context("buffer too large for wl_shm")?;

        let file = tempfile::tempfile().context("failed to create backing file")?;
        file.set_len(u64::from(size))
            .context("failed to size backing file")?;
        let mmap = unsafe { MmapMut::map_mut(&file) }.context("failed to mmap backing file")?;

        let pool = shm.create_pool(file.as_fd(), pool_size, qh, ());
        let buffer = pool.create_buffer(
            0,
            width as i32,
            height as i32,
            stride as i32,
            wl_shm::Format::Xrgb8888,
            qh,
            key,
        );

        Ok(Self {
            mmap,
            buffer,
            pool,
            _file: file,
        })
    }

    fn destroy(self) {
        self.buffer.destroy();
        self.pool.destroy();
    }
}

#[derive(Default)]
pub struct ShmBuffers {
    pool: BufferPool<ShmBacking>,
}

impl ShmBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a free buffer of `width` x `height` for `owner`, creating one
    /// if needed. The buffer stays busy until the compositor releases it.
    pub fn get(
        &mut self,
        shm: &wl_shm::WlShm,
        qh: &QueueHandle<WaylandState>,
        width: u32,
        height: u32,
        owner: OutputId,
    ) -> Option<PixelBuffer<'_, WlBuffer>> {
        let acquired = self.pool.acquire(
            owner,
            width,
            height,
            |key| {
                debug!("shm: creating {}x{} buffer for {}", width, height, owner);
                ShmBacking::create(shm, qh, width, height, key)
            },
            ShmBacking::destroy,
        );

        match acquired {
            Ok(Some(slot)) => Some(PixelBuffer {
                buffer: slot.resource.buffer.clone(),
                pixels: &mut slot.resource.mmap[..],
                width,
                height,
                stride: width * 4,
            }),
            Ok(None) => None,
            Err(err) => {
                error!("shm: failed to create {}x{} buffer: {:#}", width, height, err);
                None
            }
        }
    }

    pub fn release(&mut self, key: BufferKey) {
        if !self.pool.release(key) {
            debug!("shm: release for unknown buffer {:?}", key);
        }
    }

    /// Destroys every buffer belonging to `owner`
    pub fn forget(&mut self, owner: OutputId) {
        let dropped = self.pool.forget(owner, ShmBacking::destroy);
        if dropped > 0 {
            debug!("shm: dropped {} buffer(s) of {}", dropped, owner);
        }
    }

    pub fn clear(&mut self) {
        self.pool.clear(ShmBacking::destroy);
    }
}
