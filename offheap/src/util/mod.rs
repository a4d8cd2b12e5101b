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

pub(crate) mod native;

/// Size of one page as reported by the operating system.
pub(crate) fn get_page_size() -> usize {
    native::page_size()
}

/// efficient way to calculate: ceil(x / y)
pub(crate) fn ceil_div(x: usize, y: usize) -> usize {
    (x + y - 1) / y
}

/// Number of pages of size `page_size` needed to cover `capacity` bytes.
pub(crate) fn page_count(page_size: usize, capacity: usize) -> usize {
    if capacity == 0 {
        0
    } else {
        (capacity - 1) / page_size + 1
    }
}

/// Rounds `num` up to the next multiple of `multiple`.
pub(crate) fn round_up_to_nearest(num: usize, multiple: usize) -> usize {
    ceil_div(num, multiple) * multiple
}
