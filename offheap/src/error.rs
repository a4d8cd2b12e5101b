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

//! Error types of this crate.

use std::io;

use thiserror::Error;

/// Result type alias using this crate's [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed offset, capacity or region, or a required backing reference is missing.
    ///
    /// Always detected before any native call is made.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A native map, unmap, advise or sync call failed.
    #[error("mapping failure while {context}: {source}")]
    MappingFailure {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The resource was already released.
    #[error("illegal state: {0}")]
    IllegalState(&'static str),

    /// The platform could not tell whether the pages are resident.
    #[error("page residency unknown: {0}")]
    ResidencyUnknown(#[source] io::Error),
}

impl Error {
    pub(crate) fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn mapping_failure<S: Into<String>>(context: S, source: io::Error) -> Self {
        Error::MappingFailure {
            context: context.into(),
            source,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }

    pub fn is_mapping_failure(&self) -> bool {
        matches!(self, Error::MappingFailure { .. })
    }

    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Error::IllegalState(_))
    }

    pub fn is_residency_unknown(&self) -> bool {
        matches!(self, Error::ResidencyUnknown(_))
    }
}
