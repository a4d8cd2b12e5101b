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

//! Memory mapping of file regions.
//!
//! A [`MappedFile`] moves through `Unmapped -> Mapped -> Released`. `Unmapped` only exists
//! inside [`MappedFile::map_state`]. Once released, every operation fails with
//! [`Error::IllegalState`] and the native region is never touched again.
//!
//! The mapping is always created read-write and shared, even for files classified as
//! read-only, because the read-only flag is enforced by the views on top of the state.

use core::fmt;
use std::{
    fs::{File, OpenOptions},
    path::Path,
    ptr::NonNull,
    sync::Arc,
};

use log::{debug, trace, warn};

use crate::{
    cleaner::{Cleaner, Deallocator},
    error::{Error, Result},
    map_options::MapOptions,
    resource_handler::{ResourceHandler, ResourceType},
    resource_state::{check_offset_and_capacity, ResourceState},
    util::{get_page_size, native, page_count},
    ByteOrder,
};

/// Permission pattern of a file that nobody may write: `r--r--r--`.
const READ_ONLY_PERMISSIONS: u32 = 0o444;

/// Permission bits that are considered. Owner write and execute are ignored,
/// so an owner (or root) can still write to a file that is read-only for everybody else.
const READ_ONLY_PERMISSION_MASK: u32 = 0o477;

/// Returns `true` if the file at `path` is read-only for all classes of users.
///
/// If the permissions cannot be read, the file is treated as writable.
#[cfg(unix)]
pub fn is_file_read_only<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();

    match native::file_permission_bits(path) {
        Ok(mode) => mode & READ_ONLY_PERMISSION_MASK == READ_ONLY_PERMISSIONS,
        Err(err) => {
            warn!(
                "Could not read permissions of '{}', treating it as writable: {}",
                path.display(),
                err
            );
            false
        }
    }
}

#[cfg(not(unix))]
pub fn is_file_read_only<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();

    match native::is_writable(path) {
        Ok(writable) => !writable,
        Err(err) => {
            warn!(
                "Could not check if '{}' is writable, treating it as writable: {}",
                path.display(),
                err
            );
            false
        }
    }
}

/// Unmaps the region and closes the file.
struct MapDeallocator {
    /// page aligned start of the mapping
    map_address: NonNull<u8>,
    map_size: usize,
    file: Option<File>,
}

// the mapping is owned exclusively by this deallocator once registered
unsafe impl Send for MapDeallocator {}

impl Deallocator for MapDeallocator {
    fn deallocate(&mut self) -> Result<()> {
        debug!("Unmapping {} bytes at {:p}", self.map_size, self.map_address);

        unsafe { native::unmap(self.map_address, self.map_size) }
            .map_err(|err| Error::mapping_failure("unmapping file region", err))?;

        // close the file only after the mapping is gone
        drop(self.file.take());
        Ok(())
    }
}

pub struct MappedFile {
    state: Arc<ResourceState>,

    /// page aligned start of the mapping, `page_position` bytes before the state's base
    map_address: NonNull<u8>,

    /// `capacity + page_position`
    map_size: usize,

    page_size: usize,

    options: MapOptions,

    cleaner: Cleaner,
}

// the raw address is only dereferenced after `check_valid`
unsafe impl Send for MappedFile {}
unsafe impl Sync for MappedFile {}

impl MappedFile {
    /// Maps `capacity` bytes of the file at `path` starting at `file_offset`.
    ///
    /// The file is created if it does not exist and extended if it is shorter
    /// than `file_offset + capacity`.
    pub fn map<P: AsRef<Path>>(path: P, file_offset: i64, capacity: i64) -> Result<Self> {
        Self::map_with_options(path, file_offset, capacity, MapOptions::default())
    }

    pub fn map_with_options<P: AsRef<Path>>(
        path: P,
        file_offset: i64,
        capacity: i64,
        options: MapOptions,
    ) -> Result<Self> {
        let state = ResourceState::new_for_file(path.as_ref(), file_offset, capacity)?;
        Self::map_state(state, options)
    }

    /// Maps the file region described by a file backed `state`.
    pub fn map_state(mut state: ResourceState, options: MapOptions) -> Result<Self> {
        let path = state
            .file()
            .ok_or_else(|| Error::invalid_argument("resource state is not backed by a file"))?
            .to_path_buf();

        let file_offset = state.file_offset();
        let capacity = state.capacity();
        check_offset_and_capacity(
            i64::try_from(file_offset).unwrap_or(-1),
            i64::try_from(capacity).unwrap_or(-1),
        )?;

        if options.read_only || is_file_read_only(&path) {
            state.set_resource_read_only();
        }

        let page_size = get_page_size();
        let page_position = (file_offset % page_size as u64) as usize;
        let map_position = file_offset - page_position as u64;
        let map_size = usize::try_from(capacity)
            .ok()
            .and_then(|capacity| capacity.checked_add(page_position))
            .ok_or_else(|| {
                Error::invalid_argument(format!("capacity {} exceeds the address space", capacity))
            })?;

        // the mapping needs a writable descriptor, even for read-only files
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|err| {
                Error::mapping_failure(format!("opening '{}'", path.display()), err)
            })?;

        // mapping past the end of the file is allowed, touching it is not
        let required_len = file_offset + capacity;
        let current_len = file
            .metadata()
            .map_err(|err| Error::mapping_failure("reading file length", err))?
            .len();
        if current_len < required_len {
            file.set_len(required_len)
                .map_err(|err| Error::mapping_failure("extending file", err))?;
        }

        // on failure `file` is dropped here, nothing is mapped yet
        let map_address = native::map_file(&file, map_position, map_size)
            .map_err(|err| Error::mapping_failure(format!("mapping '{}'", path.display()), err))?;

        debug!(
            "Mapped '{}' [{}, {}) at {:p}",
            path.display(),
            map_position,
            map_position + map_size as u64,
            map_address
        );

        state.put_native_base_offset(map_address.as_ptr() as u64 + page_position as u64);
        state.put_byte_order(options.byte_order);

        let cleaner = Cleaner::register(
            state.validity(),
            Box::new(MapDeallocator {
                map_address,
                map_size,
                file: Some(file),
            }),
        );

        Ok(Self {
            state: Arc::new(state),
            map_address,
            map_size,
            page_size,
            options,
            cleaner,
        })
    }

    /// Brings every page of the mapping into physical memory.
    pub fn load(&self) -> Result<()> {
        self.state.check_valid()?;

        if self.options.advise_on_load {
            native::advise_sequential(self.map_address, self.map_size)
                .map_err(|err| Error::mapping_failure("advising read-ahead", err))?;
        }

        // same range `is_loaded` checks, including the page part before the region
        let count = page_count(self.page_size, self.map_size);
        trace!("Touching {} pages at {:p}", count, self.map_address);

        let base = self.map_address.as_ptr() as *const u8;
        for i in 0..count {
            // read one byte of each page so it has to be faulted in
            unsafe { core::ptr::read_volatile(base.add(i * self.page_size)) };
        }

        Ok(())
    }

    /// Returns `true` if every page of the mapping is resident in physical memory.
    pub fn is_loaded(&self) -> Result<bool> {
        self.state.check_valid()?;

        let count = page_count(self.page_size, self.map_size);
        let residency = native::page_residency(self.map_address, self.map_size, count)
            .map_err(Error::ResidencyUnknown)?;

        let resident = residency.iter().filter(|resident| **resident).count();
        trace!("{} of {} pages are resident", resident, count);

        Ok(resident == count)
    }

    /// Writes modified pages back to the file.
    pub fn sync(&self) -> Result<()> {
        self.state.check_valid()?;

        native::sync(self.map_address, self.map_size)
            .map_err(|err| Error::mapping_failure("syncing file region", err))
    }

    /// Number of pages covering the capacity.
    pub fn page_count(&self) -> usize {
        page_count(self.page_size, self.state.capacity() as usize)
    }

    /// Address of the first byte of the file region, 0 after release.
    pub fn native_base_address(&self) -> u64 {
        self.state.native_base_offset()
    }

    pub fn capacity(&self) -> u64 {
        self.state.capacity()
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.state.byte_order()
    }

    pub fn check_valid(&self) -> Result<()> {
        self.state.check_valid()
    }

    pub fn is_read_only(&self) -> bool {
        self.state.is_read_only()
    }

    pub fn file(&self) -> &Path {
        // `map_state` only accepts file backed states
        self.state.file().unwrap_or_else(|| Path::new(""))
    }

    pub fn is_released(&self) -> bool {
        self.cleaner.is_released()
    }
}

impl fmt::Debug for MappedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedFile")
            .field("state", &self.state)
            .field("map_address", &self.map_address)
            .field("map_size", &self.map_size)
            .field("released", &self.cleaner.is_released())
            .finish()
    }
}

impl ResourceHandler for MappedFile {
    fn state(&self) -> &Arc<ResourceState> {
        &self.state
    }

    fn close(&self) -> Result<()> {
        if self.cleaner.clean()? {
            debug!("Closed mapping of '{}'", self.file().display());
        }

        Ok(())
    }

    fn resource_type(&self) -> ResourceType {
        ResourceType::MemoryMappedFile
    }
}
