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

//! Descriptor table of the primitive element kinds.
//!
//! Arrays handed to array-backed resources are described by [`ArrayLayout`]:
//! a length header followed by the elements. `off()` is the offset of element 0
//! relative to the start of that layout and `scale()` is the element size,
//! so element `i` lives at `off() + i * scale()`.

use core::mem::size_of;

use memoffset::offset_of;
use static_assertions::const_assert_eq;

/// Native layout of a primitive array: length header followed by the elements.
#[repr(C)]
#[allow(unused)]
pub struct ArrayLayout<T> {
    len: u64,
    elements: [T; 0],
}

// char is a UTF-16 code unit, boolean is stored as one byte
const_assert_eq!(size_of::<bool>(), 1);
const_assert_eq!(size_of::<u16>(), 2);
const_assert_eq!(size_of::<f64>(), 8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prim {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl Prim {
    pub const ALL: [Prim; 8] = [
        Prim::Boolean,
        Prim::Byte,
        Prim::Char,
        Prim::Short,
        Prim::Int,
        Prim::Long,
        Prim::Float,
        Prim::Double,
    ];

    /// Offset of element 0 relative to the start of an [`ArrayLayout`].
    pub fn off(self) -> usize {
        match self {
            Prim::Boolean => offset_of!(ArrayLayout<bool>, elements),
            Prim::Byte => offset_of!(ArrayLayout<i8>, elements),
            Prim::Char => offset_of!(ArrayLayout<u16>, elements),
            Prim::Short => offset_of!(ArrayLayout<i16>, elements),
            Prim::Int => offset_of!(ArrayLayout<i32>, elements),
            Prim::Long => offset_of!(ArrayLayout<i64>, elements),
            Prim::Float => offset_of!(ArrayLayout<f32>, elements),
            Prim::Double => offset_of!(ArrayLayout<f64>, elements),
        }
    }

    /// Size of one element in bytes.
    pub const fn scale(self) -> usize {
        match self {
            Prim::Boolean => size_of::<bool>(),
            Prim::Byte => size_of::<i8>(),
            Prim::Char => size_of::<u16>(),
            Prim::Short => size_of::<i16>(),
            Prim::Int => size_of::<i32>(),
            Prim::Long => size_of::<i64>(),
            Prim::Float => size_of::<f32>(),
            Prim::Double => size_of::<f64>(),
        }
    }

    /// Offset of element `index`, `None` on overflow.
    pub fn index_offset(self, index: usize) -> Option<usize> {
        index
            .checked_mul(self.scale())
            .and_then(|bytes| bytes.checked_add(self.off()))
    }
}

/// Rust types that can back an array resource.
pub trait Primitive: Copy + Send + Sync + 'static {
    const PRIM: Prim;
}

macro_rules! impl_primitive {
    ($($ty:ty => $prim:ident),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const PRIM: Prim = Prim::$prim;
            }
        )*
    };
}

impl_primitive!(
    bool => Boolean,
    i8 => Byte,
    u8 => Byte,
    u16 => Char,
    i16 => Short,
    i32 => Int,
    u32 => Int,
    i64 => Long,
    u64 => Long,
    f32 => Float,
    f64 => Double,
);
