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

use core::fmt;
use std::{ptr::NonNull, sync::Arc};

use log::debug;

use crate::{
    cleaner::{Cleaner, Deallocator},
    error::{Error, Result},
    map_options::MapOptions,
    resource_handler::{ResourceHandler, ResourceType},
    resource_state::ResourceState,
    util::{get_page_size, native, round_up_to_nearest},
};

struct DirectDeallocator {
    address: NonNull<u8>,
    size: usize,
}

// the memory is owned exclusively by this deallocator once registered
unsafe impl Send for DirectDeallocator {}

impl Deallocator for DirectDeallocator {
    fn deallocate(&mut self) -> Result<()> {
        debug!("Freeing {} bytes at {:p}", self.size, self.address);

        unsafe { native::unmap(self.address, self.size) }
            .map_err(|err| Error::mapping_failure("freeing direct memory", err))
    }
}

/// Zeroed native memory that is not backed by any file.
///
/// The allocation is rounded up to whole pages, but only `capacity` bytes are addressable.
pub struct AllocateDirect {
    state: Arc<ResourceState>,
    cleaner: Cleaner,
}

impl AllocateDirect {
    pub fn allocate(capacity: i64) -> Result<Self> {
        Self::allocate_with_options(capacity, MapOptions::default())
    }

    pub fn allocate_with_options(capacity: i64, options: MapOptions) -> Result<Self> {
        let mut state = ResourceState::new_for_direct(capacity)?;
        if options.read_only {
            state.set_resource_read_only();
        }
        state.put_byte_order(options.byte_order);

        let size = usize::try_from(state.capacity())
            .ok()
            .filter(|capacity| capacity.checked_add(get_page_size()).is_some())
            .map(|capacity| round_up_to_nearest(capacity, get_page_size()))
            .ok_or_else(|| {
                Error::invalid_argument(format!("capacity {} exceeds the address space", capacity))
            })?;

        let address = native::map_anonymous(size)
            .map_err(|err| Error::mapping_failure(format!("allocating {} bytes", size), err))?;

        debug!("Allocated {} bytes at {:p}", size, address);

        state.put_native_base_offset(address.as_ptr() as u64);

        let cleaner = Cleaner::register(state.validity(), Box::new(DirectDeallocator { address, size }));

        Ok(Self {
            state: Arc::new(state),
            cleaner,
        })
    }

    pub fn capacity(&self) -> u64 {
        self.state.capacity()
    }

    /// Address of the first byte, 0 after release.
    pub fn native_base_address(&self) -> u64 {
        self.state.native_base_offset()
    }

    pub fn check_valid(&self) -> Result<()> {
        self.state.check_valid()
    }

    pub fn is_released(&self) -> bool {
        self.cleaner.is_released()
    }
}

impl fmt::Debug for AllocateDirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocateDirect")
            .field("state", &self.state)
            .field("released", &self.cleaner.is_released())
            .finish()
    }
}

impl ResourceHandler for AllocateDirect {
    fn state(&self) -> &Arc<ResourceState> {
        &self.state
    }

    fn close(&self) -> Result<()> {
        self.cleaner.clean().map(|_| ())
    }

    fn resource_type(&self) -> ResourceType {
        ResourceType::NativeMemory
    }
}
