//! Fixed-capacity building blocks used by the XML parser.
//!
//! Both containers reserve their full capacity up front and refuse to grow
//! past it, so memory use while parsing depends on configuration rather
//! than on the input. A capacity that cannot be reserved is reported by
//! `new` instead of aborting.

use std::collections::TryReserveError;

use thiserror::Error;

/// Returned when a push would exceed a container's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("capacity of {capacity} exceeded")]
pub struct CapacityExceeded {
    pub capacity: usize,
}

/// Append-only byte accumulator with a hard capacity.
#[derive(Debug)]
pub struct BoundedString {
    buf: Vec<u8>,
    capacity: usize,
}

impl BoundedString {
    pub fn new(capacity: usize) -> Result<Self, TryReserveError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)?;
        Ok(Self { buf, capacity })
    }

    pub fn push(&mut self, byte: u8) -> Result<(), CapacityExceeded> {
        if self.buf.len() >= self.capacity {
            return Err(CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.buf.push(byte);
        Ok(())
    }

    /// Owned copy of the contents; the accumulator is reset afterwards.
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD.
    pub fn take(&mut self) -> String {
        let s = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        s
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// LIFO stack with a hard capacity.
#[derive(Debug)]
pub struct BoundedStack<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> BoundedStack<T> {
    pub fn new(capacity: usize) -> Result<Self, TryReserveError> {
        let mut items = Vec::new();
        items.try_reserve_exact(capacity)?;
        Ok(Self { items, capacity })
    }

    pub fn push(&mut self, item: T) -> Result<(), CapacityExceeded> {
        if self.items.len() >= self.capacity {
            return Err(CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.items.push(item);
        Ok(())
    }

    /// `None` when the stack is empty.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
