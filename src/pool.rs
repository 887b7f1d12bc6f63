use slab::Slab;

use crate::{Error, ErrorKind};

/// Number of slots in [`BufferPool::default`].
pub const DEFAULT_BUFFER_COUNT: usize = 4;

/// Size in bytes of each buffer in [`BufferPool::default`], one full-speed interrupt report.
pub const DEFAULT_BUFFER_LEN: usize = 64;

/// Handle to a buffer acquired from a [`BufferPool`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BufferId(usize);

struct Slot {
    owner: u8,
    data: Box<[u8]>,
}

/// Fixed-size pool of receive buffers for polled endpoints.
///
/// Each buffer is owned by a device address from [`acquire`][Self::acquire]
/// until [`release_all`][Self::release_all] is called for that address when
/// the device unmounts. Buffers can't be released individually.
pub struct BufferPool {
    slots: Slab<Slot>,
    capacity: usize,
    buffer_len: usize,
}

impl BufferPool {
    /// Create a pool of `count` buffers of `buffer_len` bytes each.
    pub fn new(count: usize, buffer_len: usize) -> Self {
        BufferPool {
            slots: Slab::with_capacity(count),
            capacity: count,
            buffer_len,
        }
    }

    /// Take a free buffer for the device at `owner`.
    pub fn acquire(&mut self, owner: u8) -> Result<BufferId, Error> {
        if self.slots.len() >= self.capacity {
            return Err(Error::new(ErrorKind::OutOfBuffers, "no free receive buffer").log_debug());
        }
        let key = self.slots.insert(Slot {
            owner,
            data: vec![0; self.buffer_len].into_boxed_slice(),
        });
        Ok(BufferId(key))
    }

    /// Free every buffer owned by `owner`. Returns how many were released.
    pub fn release_all(&mut self, owner: u8) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| slot.owner != owner);
        let released = before - self.slots.len();
        if released > 0 {
            log::debug!("released {released} receive buffers of device {owner}");
        }
        released
    }

    /// Device address that owns the buffer, or `None` if it was released.
    pub fn owner(&self, id: BufferId) -> Option<u8> {
        self.slots.get(id.0).map(|slot| slot.owner)
    }

    /// Access the bytes of an acquired buffer.
    pub fn buffer_mut(&mut self, id: BufferId) -> Option<&mut [u8]> {
        self.slots.get_mut(id.0).map(|slot| &mut slot.data[..])
    }

    /// Number of buffers that can still be acquired.
    pub fn available(&self) -> usize {
        self.capacity - self.slots.len()
    }

    /// Size of each buffer in bytes.
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        BufferPool::new(DEFAULT_BUFFER_COUNT, DEFAULT_BUFFER_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhaustion() {
        let mut pool = BufferPool::new(2, 8);
        let a = pool.acquire(3).unwrap();
        let b = pool.acquire(3).unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.available(), 0);
        assert_eq!(pool.acquire(4).unwrap_err().kind(), ErrorKind::OutOfBuffers);
    }

    #[test]
    fn test_release_by_owner() {
        let mut pool = BufferPool::default();
        let a = pool.acquire(1).unwrap();
        let b = pool.acquire(2).unwrap();
        let c = pool.acquire(1).unwrap();
        assert_eq!(pool.available(), 1);

        assert_eq!(pool.release_all(1), 2);
        assert_eq!(pool.owner(a), None);
        assert_eq!(pool.owner(c), None);
        assert_eq!(pool.owner(b), Some(2));
        assert_eq!(pool.available(), 3);
        assert_eq!(pool.release_all(1), 0);

        let buf = pool.buffer_mut(b).unwrap();
        assert_eq!(buf.len(), DEFAULT_BUFFER_LEN);
        buf[0] = 0xaa;
        assert_eq!(pool.buffer_mut(b).unwrap()[0], 0xaa);
    }
}
