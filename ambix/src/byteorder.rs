//! Byte order helpers for container chunks and sample payloads.

use std::io;

pub trait WriteBytesLe {
    fn write_le(&self, dst: &mut Vec<u8>);
}

pub trait WriteBytesBe {
    fn write_be(&self, dst: &mut Vec<u8>);
}

/// Reads a value from the front of a byte cursor, advancing it.
pub trait ReadBytesLe: Sized {
    fn read_le(src: &mut &[u8]) -> io::Result<Self>;
}

pub trait ReadBytesBe: Sized {
    fn read_be(src: &mut &[u8]) -> io::Result<Self>;
}

fn take<'a, const N: usize>(src: &mut &'a [u8]) -> io::Result<[u8; N]> {
    let Some((head, rest)) = src.split_first_chunk::<N>() else {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("need {N} bytes, {} left", src.len()),
        ));
    };
    *src = rest;
    Ok(*head)
}

macro_rules! impl_num_le_be {
    ($($t:ty),+) => { $(
        impl WriteBytesLe for $t { #[inline] fn write_le(&self, dst: &mut Vec<u8>) { dst.extend_from_slice(&self.to_le_bytes()); }}
        impl WriteBytesBe for $t { #[inline] fn write_be(&self, dst: &mut Vec<u8>) { dst.extend_from_slice(&self.to_be_bytes()); }}
        impl ReadBytesLe for $t { #[inline] fn read_le(src: &mut &[u8]) -> io::Result<Self> { Ok(<$t>::from_le_bytes(take(src)?)) }}
        impl ReadBytesBe for $t { #[inline] fn read_be(src: &mut &[u8]) -> io::Result<Self> { Ok(<$t>::from_be_bytes(take(src)?)) }}
    )+ }
}

impl_num_le_be!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

#[macro_export]
macro_rules! impl_collection {
    ($trait:ident, $method:ident) => {
        impl<T: $trait> $trait for Vec<T> {
            #[inline]
            fn $method(&self, dst: &mut Vec<u8>) {
                self.iter().for_each(|item| item.$method(dst));
            }
        }
        impl<T: $trait, const N: usize> $trait for [T; N] {
            #[inline]
            fn $method(&self, dst: &mut Vec<u8>) {
                self.iter().for_each(|item| item.$method(dst));
            }
        }
    };
}

impl_collection!(WriteBytesLe, write_le);
impl_collection!(WriteBytesBe, write_be);

impl<const N: usize> ReadBytesLe for [u8; N] {
    fn read_le(src: &mut &[u8]) -> io::Result<Self> {
        take(src)
    }
}

impl<const N: usize> ReadBytesBe for [u8; N] {
    fn read_be(src: &mut &[u8]) -> io::Result<Self> {
        take(src)
    }
}

#[macro_export]
macro_rules! join_bytes_le {
    ( $($value:expr),+ $(,)? ) => {{
        let mut vec = Vec::<u8>::new();
        $( $crate::byteorder::WriteBytesLe::write_le(&$value, &mut vec); )+
        vec
    }};
}

#[macro_export]
macro_rules! join_bytes_be {
    ( $($value:expr),+ $(,)? ) => {{
        let mut vec = Vec::<u8>::new();
        $( $crate::byteorder::WriteBytesBe::write_be(&$value, &mut vec); )+
        vec
    }};
}

#[allow(unused_imports)]
pub use {join_bytes_be, join_bytes_le};

/// Byte order of multi-byte values in a container payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    BigEndian,
    LittleEndian,
}

impl Endianness {
    /// Byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            Endianness::LittleEndian
        } else {
            Endianness::BigEndian
        }
    }

    pub fn is_native(self) -> bool {
        self == Self::native()
    }
}

/// Reverses the four bytes of a 32-bit word.
#[inline]
pub const fn swap4(word: u32) -> u32 {
    word.swap_bytes()
}

/// Reinterprets a byte-reversed 32-bit pattern as `f32`.
#[inline]
pub fn swap_f32(word: u32) -> f32 {
    f32::from_bits(swap4(word))
}
