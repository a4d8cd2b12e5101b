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

use std::fs;

use rand::{rngs::SmallRng, RngCore, SeedableRng};
use rand_xoshiro::{
    rand_core::{RngCore as _, SeedableRng as _},
    Xoshiro256PlusPlus,
};

use super::get_test_file;
use crate::{util::get_page_size, MappedFile, ResourceHandler};

const SEED: u64 = 5446535461589659585;

/// test if data written through the mapping ends up in the file at the right offset
#[test]
fn test_write_at_unaligned_offset() {
    let path = get_test_file("test_write_at_unaligned_offset");
    let page_size = get_page_size();
    let offset = 2 * page_size + 123;
    const SIZE: usize = 5000;

    let mut rand = SmallRng::seed_from_u64(SEED);
    let mut data = vec![0u8; SIZE];
    rand.fill_bytes(&mut data);

    {
        let mapped = MappedFile::map(&path, offset as i64, SIZE as i64).unwrap();
        assert!(fs::metadata(&path).unwrap().len() >= (offset + SIZE) as u64);

        let ptr = mapped.state().address().unwrap() as *mut u8;
        unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, SIZE) };

        mapped.sync().unwrap();
        mapped.close().unwrap();
    }

    let content = fs::read(&path).unwrap();
    assert!(content[..offset].iter().all(|x| *x == 0), "bytes before the region changed");
    assert_eq!(&content[offset..offset + SIZE], &data[..]);

    fs::remove_file(&path).unwrap();
}

/// test if a new mapping sees the content of the file
#[test]
fn test_remap_reads_file_content() {
    let path = get_test_file("test_remap_reads_file_content");
    const SIZE: usize = 3 * 4096 + 17;

    let mut rand = Xoshiro256PlusPlus::seed_from_u64(SEED);
    let mut data = vec![0u8; SIZE];
    rand.fill_bytes(&mut data);
    fs::write(&path, &data).unwrap();

    for offset in [0usize, 1, 4095, 4096, 8000] {
        let capacity = SIZE - offset;
        let mapped = MappedFile::map(&path, offset as i64, capacity as i64).unwrap();
        mapped.load().unwrap();

        let ptr = mapped.state().address().unwrap() as *const u8;
        let slice = unsafe { std::slice::from_raw_parts(ptr, capacity) };
        assert_eq!(slice, &data[offset..], "mismatch at offset {}", offset);

        mapped.close().unwrap();
    }

    // mapping never shrinks the file
    assert_eq!(fs::metadata(&path).unwrap().len(), SIZE as u64);
    fs::remove_file(&path).unwrap();
}
