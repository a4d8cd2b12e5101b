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

use log::{debug, error};
use try_lock::TryLock;

use crate::{error::Result, one_way_flag::OneWayFlag};

/// Releases one native resource.
///
/// Implementations hold only what is needed for the release (address, length, file handle)
/// and never the handler that owns the resource.
pub(crate) trait Deallocator: Send {
    fn deallocate(&mut self) -> Result<()>;
}

/// Runs a [`Deallocator`] at most once, either through [`Cleaner::clean`] or when dropped.
pub(crate) struct Cleaner {
    deallocator: TryLock<Option<Box<dyn Deallocator>>>,

    /// flipped by the one call that runs the deallocator
    released: OneWayFlag,

    /// validity of the resource state, invalidated before deallocating
    validity: Arc<OneWayFlag>,
}

impl Cleaner {
    pub(crate) fn register(validity: Arc<OneWayFlag>, deallocator: Box<dyn Deallocator>) -> Self {
        Self {
            deallocator: TryLock::new(Some(deallocator)),
            released: OneWayFlag::new(false),
            validity,
        }
    }

    /// Invalidates the resource state and runs the deallocator.
    ///
    /// Returns `Ok(false)` if the resource was already released by an earlier call.
    pub(crate) fn clean(&self) -> Result<bool> {
        if !self.released.change() {
            return Ok(false);
        }

        // views must fail before the memory is gone
        self.validity.change();

        // only the winner of `released` gets here, so the lock is never contended
        let deallocator = self.deallocator.try_lock().and_then(|mut inner| inner.take());

        match deallocator {
            Some(mut deallocator) => deallocator.deallocate().map(|_| true),
            None => Ok(true),
        }
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.get()
    }
}

impl Drop for Cleaner {
    fn drop(&mut self) {
        match self.clean() {
            Ok(true) => debug!("Released resource that was not closed explicitly"),
            Ok(false) => {}
            Err(err) => error!("Could not release abandoned resource: {}", err),
        }
    }
}
