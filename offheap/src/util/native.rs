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

//! Thin wrappers around the native memory syscalls.
//!
//! Every function reports failures as `io::Error::last_os_error()` and leaves
//! interpretation to the caller.

use std::{
    fs::File,
    io,
    os::fd::AsRawFd,
    path::Path,
    ptr::{null_mut, NonNull},
};

use libc::{
    c_void, madvise, mincore, mmap, msync, munmap, off_t, sysconf, MADV_WILLNEED, MAP_ANONYMOUS,
    MAP_FAILED, MAP_PRIVATE, MAP_SHARED, MS_SYNC, PROT_READ, PROT_WRITE, _SC_PAGESIZE,
};

const FALLBACK_PAGE_SIZE: usize = 4096;

pub(crate) fn page_size() -> usize {
    let res = unsafe { sysconf(_SC_PAGESIZE) };
    if res <= 0 {
        FALLBACK_PAGE_SIZE
    } else {
        res as usize
    }
}

fn check_mmap_result(res: *mut c_void) -> io::Result<NonNull<u8>> {
    if res == MAP_FAILED {
        return Err(io::Error::last_os_error());
    }

    NonNull::new(res as *mut u8)
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned null"))
}

/// Maps `[position, position + length)` of `file` shared and read-write.
///
/// `position` has to be a multiple of the page size.
pub(crate) fn map_file(file: &File, position: u64, length: usize) -> io::Result<NonNull<u8>> {
    let position = off_t::try_from(position)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "position exceeds off_t"))?;

    let res = unsafe {
        mmap(
            null_mut(),
            length,
            PROT_READ | PROT_WRITE,
            MAP_SHARED,
            file.as_raw_fd(),
            position,
        )
    };

    check_mmap_result(res)
}

/// Maps `length` zeroed bytes not backed by any file.
pub(crate) fn map_anonymous(length: usize) -> io::Result<NonNull<u8>> {
    let res = unsafe {
        mmap(
            null_mut(),
            length,
            PROT_READ | PROT_WRITE,
            MAP_PRIVATE | MAP_ANONYMOUS,
            -1,
            0,
        )
    };

    check_mmap_result(res)
}

/// ### Safety
///
/// `[address, address + length)` has to be a region returned by one of the map functions
/// and must not be accessed afterwards.
pub(crate) unsafe fn unmap(address: NonNull<u8>, length: usize) -> io::Result<()> {
    let code = unsafe { munmap(address.as_ptr() as *mut c_void, length) };

    if code == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Tells the kernel that the region will be needed soon, so it starts reading ahead.
pub(crate) fn advise_sequential(address: NonNull<u8>, length: usize) -> io::Result<()> {
    let code = unsafe { madvise(address.as_ptr() as *mut c_void, length, MADV_WILLNEED) };

    if code == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Returns for each of the `page_count` pages starting at `address` whether it is resident.
///
/// `address` has to be page aligned.
pub(crate) fn page_residency(
    address: NonNull<u8>,
    length: usize,
    page_count: usize,
) -> io::Result<Vec<bool>> {
    if length == 0 {
        return Ok(Vec::new());
    }

    let mut vec = vec![0u8; page_count];

    let code = unsafe { mincore(address.as_ptr() as *mut c_void, length, vec.as_mut_ptr() as *mut _) };

    if code == 0 {
        Ok(vec.into_iter().map(|page| page & 1 == 1).collect())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Writes dirty pages of a shared file mapping back to the file and waits for completion.
pub(crate) fn sync(address: NonNull<u8>, length: usize) -> io::Result<()> {
    let code = unsafe { msync(address.as_ptr() as *mut c_void, length, MS_SYNC) };

    if code == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Raw permission bits (`st_mode & 0o777`) of the file at `path`.
#[cfg(unix)]
pub(crate) fn file_permission_bits(path: &Path) -> io::Result<u32> {
    use std::os::unix::fs::PermissionsExt;

    Ok(std::fs::metadata(path)?.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
pub(crate) fn is_writable(path: &Path) -> io::Result<bool> {
    Ok(!std::fs::metadata(path)?.permissions().readonly())
}

#[cfg(test)]
mod test {
    use super::{map_anonymous, page_residency, page_size, unmap};

    #[test]
    fn test_page_size_is_power_of_two() {
        let size = page_size();
        assert!(size >= 512);
        assert!(size.is_power_of_two());
    }

    #[test]
    fn test_anonymous_mapping_is_zeroed_and_resident_after_touch() {
        let size = 4 * page_size();
        let ptr = map_anonymous(size).unwrap();

        let slice = unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), size) };
        assert!(slice.iter().all(|x| *x == 0));
        for i in (0..size).step_by(page_size()) {
            slice[i] = 1;
        }

        let residency = page_residency(ptr, size, 4).unwrap();
        assert_eq!(residency, vec![true; 4]);

        unsafe { unmap(ptr, size) }.unwrap();
    }
}
