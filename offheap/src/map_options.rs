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

use crate::byte_order::ByteOrder;

/// Options used when acquiring a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapOptions {
    /// byte order multi-byte values of the resource are interpreted in
    pub byte_order: ByteOrder,

    /// Requested access mode. A file classified as read-only is always marked read-only.
    pub read_only: bool,

    /// issue a read-ahead advice before touching the pages in `load()`
    pub advise_on_load: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::native(),
            read_only: false,
            advise_on_load: true,
        }
    }
}

impl MapOptions {
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_advise_on_load(mut self, advise_on_load: bool) -> Self {
        self.advise_on_load = advise_on_load;
        self
    }
}
