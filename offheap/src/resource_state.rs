/*
 *  Copyright (C) 2025  Markus Elias Gerber
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Metadata describing one native resource.
//!
//! A [`ResourceState`] carries no native resources itself. The handler that
//! acquired the memory ([`crate::MappedFile`] or [`crate::AllocateDirect`])
//! owns it and flips the shared validity flag when releasing it.
//! Every reader of `native_base_offset` has to call [`ResourceState::check_valid`] first.

use core::{
    any::Any,
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    byte_order::ByteOrder,
    error::{Error, Result},
    one_way_flag::OneWayFlag,
    prim::{Prim, Primitive},
};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process unique identity of an acquired backing.
///
/// Regions derived from a state share its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(u64);

impl ResourceId {
    fn next() -> Self {
        ResourceId(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// What the addressable bytes of a resource live in.
#[derive(Clone)]
pub enum Backing {
    /// Nothing attached yet.
    None,
    /// A primitive array of `len` elements of kind `prim`.
    Array {
        array: Arc<dyn Any + Send + Sync>,
        prim: Prim,
        len: usize,
    },
    /// An externally supplied byte buffer.
    Buffer(Arc<[u8]>),
    /// A region of a file, mapped at the state's native base offset.
    File { path: PathBuf, file_offset: u64 },
    /// Anonymous native memory.
    Direct,
}

impl fmt::Debug for Backing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backing::None => write!(f, "None"),
            Backing::Array { prim, len, .. } => f
                .debug_struct("Array")
                .field("prim", prim)
                .field("len", len)
                .finish(),
            Backing::Buffer(buf) => f.debug_tuple("Buffer").field(&buf.len()).finish(),
            Backing::File { path, file_offset } => f
                .debug_struct("File")
                .field("path", path)
                .field("file_offset", file_offset)
                .finish(),
            Backing::Direct => write!(f, "Direct"),
        }
    }
}

/// Rejects offset/capacity pairs whose combination would be negative in two's complement.
///
/// This also rejects `capacity == 0`, as `capacity - 1` has its sign bit set.
pub fn check_offset_and_capacity(offset: i64, capacity: i64) -> Result<()> {
    if (offset | capacity.wrapping_sub(1) | offset.wrapping_add(capacity)) < 0 {
        return Err(Error::invalid_argument(format!(
            "offset: {}, capacity: {}, offset + capacity: {}",
            offset,
            capacity,
            offset.wrapping_add(capacity)
        )));
    }

    Ok(())
}

fn non_negative(name: &str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::invalid_argument(format!("{} must be >= 0: {}", name, value)))
}

#[derive(Debug)]
pub struct ResourceState {
    id: ResourceId,

    /// bytes addressable through this state
    capacity: u64,

    /// offset of this state's region inside the parent resource
    region_offset: u64,

    byte_order: ByteOrder,

    backing: Backing,

    /// address of the region, 0 before acquisition
    native_base_offset: u64,

    read_only: bool,

    /// `true` until the resource is released, shared with all derived regions
    validity: Arc<OneWayFlag>,
}

impl ResourceState {
    /// Creates an empty state without any backing.
    pub fn new(read_only: bool) -> Self {
        Self {
            id: ResourceId::next(),
            capacity: 0,
            region_offset: 0,
            byte_order: ByteOrder::native(),
            backing: Backing::None,
            native_base_offset: 0,
            read_only,
            validity: Arc::new(OneWayFlag::new(true)),
        }
    }

    /// Creates a state describing the first `len` elements of `array`.
    pub fn new_for_array<T: Primitive>(array: Option<Arc<[T]>>, len: i64) -> Result<Self> {
        let len = non_negative("array length", len)? as usize;
        let mut state = Self::new(false);
        state.put_unsafe_object(array)?;

        if let Backing::Array { len: available, .. } = state.backing {
            if len > available {
                return Err(Error::invalid_argument(format!(
                    "array length {} exceeds array of {} elements",
                    len, available
                )));
            }
        }

        state.put_array_len::<T>(len);
        Ok(state)
    }

    /// Creates a state describing `capacity` bytes of `file` starting at `file_offset`.
    pub fn new_for_file<P: Into<PathBuf>>(file: P, file_offset: i64, capacity: i64) -> Result<Self> {
        check_offset_and_capacity(file_offset, capacity)?;

        let mut state = Self::new(false);
        state.backing = Backing::File {
            path: file.into(),
            file_offset: file_offset as u64,
        };
        state.capacity = capacity as u64;
        Ok(state)
    }

    /// Creates a state describing `capacity` bytes of anonymous native memory.
    pub fn new_for_direct(capacity: i64) -> Result<Self> {
        check_offset_and_capacity(0, capacity)?;

        let mut state = Self::new(false);
        state.backing = Backing::Direct;
        state.capacity = capacity as u64;
        Ok(state)
    }

    /// Derives the state of the sub-range `[offset, offset + capacity)`.
    ///
    /// The region refers to the same resource and becomes invalid together with it.
    pub fn region(&self, offset: i64, capacity: i64) -> Result<ResourceState> {
        self.check_valid()?;
        let offset = non_negative("region offset", offset)?;
        let capacity = non_negative("region capacity", capacity)?;

        match offset.checked_add(capacity) {
            Some(end) if end <= self.capacity => {}
            _ => {
                return Err(Error::invalid_argument(format!(
                    "region [{}, {} + {}) exceeds capacity {}",
                    offset, offset, capacity, self.capacity
                )))
            }
        }

        Ok(ResourceState {
            id: self.id,
            capacity,
            region_offset: self.region_offset + offset,
            byte_order: self.byte_order,
            backing: self.backing.clone(),
            native_base_offset: self.native_base_offset,
            read_only: self.read_only,
            validity: self.validity.clone(),
        })
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn put_capacity(&mut self, capacity: i64) -> Result<()> {
        let capacity = non_negative("capacity", capacity)?;
        self.check_region_end(self.region_offset, capacity)?;
        self.capacity = capacity;
        Ok(())
    }

    pub fn region_offset(&self) -> u64 {
        self.region_offset
    }

    pub fn put_region_offset(&mut self, region_offset: i64) -> Result<()> {
        let region_offset = non_negative("region offset", region_offset)?;
        self.check_region_end(region_offset, self.capacity)?;
        self.region_offset = region_offset;
        Ok(())
    }

    fn check_region_end(&self, region_offset: u64, capacity: u64) -> Result<()> {
        if region_offset.checked_add(capacity).is_none() {
            return Err(Error::invalid_argument(format!(
                "region offset {} + capacity {} overflows",
                region_offset, capacity
            )));
        }

        Ok(())
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn put_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }

    /// `true` if multi-byte values have to be swapped when read natively.
    pub fn is_swap_bytes(&self) -> bool {
        !self.byte_order.is_native()
    }

    pub fn backing(&self) -> &Backing {
        &self.backing
    }

    /// Attaches an externally supplied buffer, its length becomes the capacity.
    pub fn put_byte_buffer(&mut self, buffer: Option<Arc<[u8]>>) -> Result<()> {
        let buffer = buffer.ok_or_else(|| Error::invalid_argument("byte buffer must not be absent"))?;
        self.capacity = buffer.len() as u64;
        self.backing = Backing::Buffer(buffer);
        Ok(())
    }

    /// Attaches a primitive array, its full length becomes the capacity.
    pub fn put_unsafe_object<T: Primitive>(&mut self, array: Option<Arc<[T]>>) -> Result<()> {
        let array = array.ok_or_else(|| Error::invalid_argument("array must not be absent"))?;
        let len = array.len();
        self.backing = Backing::Array {
            array: Arc::new(array),
            prim: T::PRIM,
            len,
        };
        self.put_array_len::<T>(len);
        Ok(())
    }

    fn put_array_len<T: Primitive>(&mut self, len: usize) {
        self.capacity = (len * T::PRIM.scale()) as u64;
    }

    /// Path of the backing file, if the resource is file backed.
    pub fn file(&self) -> Option<&Path> {
        match &self.backing {
            Backing::File { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn file_offset(&self) -> u64 {
        match &self.backing {
            Backing::File { file_offset, .. } => *file_offset,
            _ => 0,
        }
    }

    /// Address of the region start, or 0 if not acquired or already released.
    ///
    /// Use [`ResourceState::address`] for a checked read.
    pub fn native_base_offset(&self) -> u64 {
        if self.is_valid() {
            self.native_base_offset
        } else {
            0
        }
    }

    pub(crate) fn put_native_base_offset(&mut self, native_base_offset: u64) {
        self.native_base_offset = native_base_offset;
    }

    /// Address of this state's region (base plus region offset), after checking validity.
    pub fn address(&self) -> Result<u64> {
        self.check_valid()?;
        Ok(self.native_base_offset + self.region_offset)
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub(crate) fn set_resource_read_only(&mut self) {
        self.read_only = true;
    }

    pub fn is_valid(&self) -> bool {
        self.validity.get()
    }

    /// Fails with [`Error::IllegalState`] once the resource was released.
    #[inline]
    pub fn check_valid(&self) -> Result<()> {
        if self.validity.get() {
            Ok(())
        } else {
            Err(Error::IllegalState("resource has already been released"))
        }
    }

    /// Marks the resource as released. Returns `true` only for the call that did it.
    ///
    /// This does not free any memory, use [`crate::ResourceHandler::close`] for that.
    pub fn set_invalid(&self) -> bool {
        self.validity.change()
    }

    pub(crate) fn validity(&self) -> Arc<OneWayFlag> {
        self.validity.clone()
    }

    pub fn resource_id(&self) -> ResourceId {
        self.id
    }

    /// `true` if `other` describes the same underlying backing.
    pub fn is_same_resource(&self, other: Option<&ResourceState>) -> bool {
        match other {
            Some(other) => self.id == other.id,
            None => false,
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::{check_offset_and_capacity, Backing, ResourceState};
    use crate::{byte_order::ByteOrder, prim::Prim};

    #[test]
    fn test_byte_order() {
        let mut state = ResourceState::new(false);
        assert_eq!(state.byte_order(), ByteOrder::native());
        assert!(!state.is_swap_bytes());

        state.put_byte_order(ByteOrder::native().opposite());
        assert_ne!(state.byte_order(), ByteOrder::native());
        assert!(state.is_swap_bytes());
    }

    #[test]
    fn test_absent_and_negative_arguments() {
        let mut state = ResourceState::new(false);

        assert!(state.put_unsafe_object::<u8>(None).unwrap_err().is_invalid_argument());
        assert!(state.put_byte_buffer(None).unwrap_err().is_invalid_argument());
        assert!(state.put_region_offset(-16).unwrap_err().is_invalid_argument());
        assert!(state.put_capacity(-1).unwrap_err().is_invalid_argument());

        state.put_capacity(i64::MAX).unwrap();
        assert!(state.put_region_offset(i64::MAX).is_ok());
    }

    #[test]
    fn test_array_state() {
        let arr: Arc<[f64]> = Arc::from(vec![0f64; 64]);
        let state = ResourceState::new_for_array(Some(arr), 64).unwrap();
        assert_eq!(state.capacity(), 64 * Prim::Double.scale() as u64);
        assert!(matches!(state.backing(), Backing::Array { prim: Prim::Double, len: 64, .. }));
    }

    #[test]
    fn test_array_len_rejected() {
        let arr: Arc<[u8]> = Arc::from(vec![0u8; 64]);
        assert!(ResourceState::new_for_array(Some(arr.clone()), -1).unwrap_err().is_invalid_argument());
        assert!(ResourceState::new_for_array(Some(arr), 65).unwrap_err().is_invalid_argument());
        assert!(ResourceState::new_for_array::<u8>(None, 0).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_byte_buffer_capacity() {
        let mut state = ResourceState::new(true);
        state.put_byte_buffer(Some(Arc::from(vec![1u8; 100]))).unwrap();
        assert_eq!(state.capacity(), 100);
        assert!(state.is_read_only());
    }

    #[test]
    fn test_identity() {
        let arr: Arc<[u8]> = Arc::from(vec![0u8; 64]);
        let state = ResourceState::new_for_array(Some(arr.clone()), 64).unwrap();
        assert!(state.is_same_resource(Some(&state)));
        assert!(!state.is_same_resource(None));

        // same field values, different backing
        let other = ResourceState::new_for_array(Some(arr), 64).unwrap();
        assert_eq!(other.capacity(), state.capacity());
        assert!(!state.is_same_resource(Some(&other)));

        let region = state.region(8, 16).unwrap();
        assert!(state.is_same_resource(Some(&region)));
        assert!(region.is_same_resource(Some(&state)));
    }

    #[test]
    fn test_region_bounds() {
        let state = ResourceState::new_for_direct(64).unwrap();
        let region = state.region(16, 48).unwrap();
        assert_eq!(region.region_offset(), 16);
        assert_eq!(region.capacity(), 48);

        let nested = region.region(8, 8).unwrap();
        assert_eq!(nested.region_offset(), 24);

        assert!(state.region(16, 49).unwrap_err().is_invalid_argument());
        assert!(state.region(-1, 8).unwrap_err().is_invalid_argument());
        assert!(region.region(0, 49).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_check_valid() {
        let state = ResourceState::new_for_direct(1024).unwrap();
        let region = state.region(0, 512).unwrap();
        state.check_valid().unwrap();
        region.check_valid().unwrap();

        assert!(state.set_invalid());
        assert!(!state.set_invalid());

        assert!(state.check_valid().unwrap_err().is_illegal_state());
        assert!(region.check_valid().unwrap_err().is_illegal_state());
        assert!(state.address().unwrap_err().is_illegal_state());
        assert_eq!(state.native_base_offset(), 0);
        assert!(state.region(0, 1).unwrap_err().is_illegal_state());
    }

    #[test]
    fn test_new_for_file() {
        let state = ResourceState::new_for_file("/tmp/some_file", 4096, 100).unwrap();
        assert_eq!(state.file().unwrap().to_str(), Some("/tmp/some_file"));
        assert_eq!(state.file_offset(), 4096);
        assert_eq!(state.capacity(), 100);

        assert!(ResourceState::new_for_file("/tmp/some_file", -1, 100).unwrap_err().is_invalid_argument());
        assert!(ResourceState::new_for_file("/tmp/some_file", i64::MAX, 2).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_check_offset_and_capacity() {
        for offset in [0i64, 1, 4095, 4096, 1 << 40] {
            for capacity in [1i64, 2, 4096, 10_000, 1 << 40] {
                check_offset_and_capacity(offset, capacity).unwrap();
            }
        }

        check_offset_and_capacity(0, i64::MAX).unwrap();
        check_offset_and_capacity(i64::MAX - 1, 1).unwrap();

        assert!(check_offset_and_capacity(i64::MAX, 2).unwrap_err().is_invalid_argument());
        assert!(check_offset_and_capacity(-1, 10).unwrap_err().is_invalid_argument());
        assert!(check_offset_and_capacity(0, -5).unwrap_err().is_invalid_argument());
        assert!(check_offset_and_capacity(0, 0).unwrap_err().is_invalid_argument());
        assert!(check_offset_and_capacity(i64::MAX, i64::MAX).unwrap_err().is_invalid_argument());
    }
}
