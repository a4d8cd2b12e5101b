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

use std::sync::Arc;

use crate::{error::Result, resource_state::ResourceState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    /// anonymous memory allocated with [`crate::AllocateDirect`]
    NativeMemory,
    /// a file region mapped with [`crate::MappedFile`]
    MemoryMappedFile,
}

/// Owner of a native resource.
///
/// Dropping the handler releases the resource as well, but callers are expected
/// to call [`ResourceHandler::close`] and handle its result.
pub trait ResourceHandler {
    /// State describing the owned resource, shared with all views of it.
    fn state(&self) -> &Arc<ResourceState>;

    /// Releases the resource. Calling this a second time does nothing.
    fn close(&self) -> Result<()>;

    fn resource_type(&self) -> ResourceType;

    fn is_resource_type(&self, resource_type: ResourceType) -> bool {
        self.resource_type() == resource_type
    }

    fn is_valid(&self) -> bool {
        self.state().is_valid()
    }
}
