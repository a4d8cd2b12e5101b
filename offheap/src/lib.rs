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

//! Explicit lifecycle management for native memory regions and memory mapped files.
//!
//! A resource handler ([`MappedFile`], [`AllocateDirect`]) owns the native memory and
//! publishes a [`ResourceState`] describing it. Views keep the state alive, but not the
//! memory: after [`ResourceHandler::close`] (or after the handler was dropped) every
//! [`ResourceState::check_valid`] fails, so stale views can never read released memory.

mod allocate_direct;
mod byte_order;
mod cleaner;
mod error;
mod map_options;
mod mapped_file;
mod one_way_flag;
mod prim;
mod resource_handler;
mod resource_state;
mod util;

#[cfg(test)]
mod test;

pub use allocate_direct::AllocateDirect;
pub use byte_order::ByteOrder;
pub use error::{Error, Result};
pub use map_options::MapOptions;
pub use mapped_file::{is_file_read_only, MappedFile};
pub use one_way_flag::OneWayFlag;
pub use prim::{ArrayLayout, Prim, Primitive};
pub use resource_handler::{ResourceHandler, ResourceType};
pub use resource_state::{check_offset_and_capacity, Backing, ResourceId, ResourceState};
