//! Sample formats and conversion between stored and in-memory samples.
//!
//! Stored integer samples are widened to a left-justified 32-bit value and
//! stored floats are normalized to a full scale of ±1.0, so any supported
//! in-memory type can be read from any stored format.

use std::fmt;

use crate::byteorder::Endianness;

const PCM_SCALE: f64 = 2_147_483_648.0;
const PCM16_SCALE: f64 = 32_768.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    #[default]
    None,
    Pcm16,
    Pcm24,
    Pcm32,
    Float32,
    Float64,
}

impl SampleFormat {
    /// Decodes the `lpcm` description of a container.
    pub fn from_desc(is_float: bool, bits_per_channel: u32) -> Self {
        match (is_float, bits_per_channel) {
            (false, 16) => SampleFormat::Pcm16,
            (false, 24) => SampleFormat::Pcm24,
            (false, 32) => SampleFormat::Pcm32,
            (true, 32) => SampleFormat::Float32,
            (true, 64) => SampleFormat::Float64,
            _ => SampleFormat::None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            SampleFormat::None => 0,
            SampleFormat::Pcm16 => 16,
            SampleFormat::Pcm24 => 24,
            SampleFormat::Pcm32 | SampleFormat::Float32 => 32,
            SampleFormat::Float64 => 64,
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        self.bits() as usize / 8
    }

    pub fn is_float(self) -> bool {
        matches!(self, SampleFormat::Float32 | SampleFormat::Float64)
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::None => "none",
            SampleFormat::Pcm16 => "16-bit PCM",
            SampleFormat::Pcm24 => "24-bit PCM",
            SampleFormat::Pcm32 => "32-bit PCM",
            SampleFormat::Float32 => "32-bit float",
            SampleFormat::Float64 => "64-bit float",
        };
        f.write_str(name)
    }
}

mod private {
    pub trait Sealed {}

    impl Sealed for i16 {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
}

/// Work buffers kept between reads, two per sample type.
#[derive(Debug, Default)]
pub struct SampleScratch {
    i16: (Vec<i16>, Vec<i16>),
    i32: (Vec<i32>, Vec<i32>),
    f32: (Vec<f32>, Vec<f32>),
}

/// In-memory sample types accepted by readers, writers and the frame transform.
pub trait Sample: private::Sealed + Copy + Default + PartialEq + fmt::Debug {
    #[doc(hidden)]
    fn scratch(buffers: &mut SampleScratch) -> (&mut Vec<Self>, &mut Vec<Self>);

    /// Raw value as `f32` for matrix arithmetic.
    fn to_f32(self) -> f32;

    /// Stores a matrix result; integer types truncate toward zero and saturate.
    fn from_f32(value: f32) -> Self;

    /// From a left-justified 32-bit integer sample.
    fn from_pcm(value: i32) -> Self;

    fn to_pcm(self) -> i32;

    /// From a float sample with ±1.0 full scale.
    fn from_float(value: f64) -> Self;

    fn to_float(self) -> f64;
}

impl Sample for i16 {
    fn scratch(buffers: &mut SampleScratch) -> (&mut Vec<Self>, &mut Vec<Self>) {
        (&mut buffers.i16.0, &mut buffers.i16.1)
    }

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn from_f32(value: f32) -> Self {
        value as i16
    }

    fn from_pcm(value: i32) -> Self {
        (value >> 16) as i16
    }

    fn to_pcm(self) -> i32 {
        (self as i32) << 16
    }

    fn from_float(value: f64) -> Self {
        (value * PCM16_SCALE) as i16
    }

    fn to_float(self) -> f64 {
        self as f64 / PCM16_SCALE
    }
}

impl Sample for i32 {
    fn scratch(buffers: &mut SampleScratch) -> (&mut Vec<Self>, &mut Vec<Self>) {
        (&mut buffers.i32.0, &mut buffers.i32.1)
    }

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn from_f32(value: f32) -> Self {
        value as i32
    }

    fn from_pcm(value: i32) -> Self {
        value
    }

    fn to_pcm(self) -> i32 {
        self
    }

    fn from_float(value: f64) -> Self {
        (value * PCM_SCALE) as i32
    }

    fn to_float(self) -> f64 {
        self as f64 / PCM_SCALE
    }
}

impl Sample for f32 {
    fn scratch(buffers: &mut SampleScratch) -> (&mut Vec<Self>, &mut Vec<Self>) {
        (&mut buffers.f32.0, &mut buffers.f32.1)
    }

    fn to_f32(self) -> f32 {
        self
    }

    fn from_f32(value: f32) -> Self {
        value
    }

    fn from_pcm(value: i32) -> Self {
        (value as f64 / PCM_SCALE) as f32
    }

    fn to_pcm(self) -> i32 {
        (self as f64 * PCM_SCALE) as i32
    }

    fn from_float(value: f64) -> Self {
        value as f32
    }

    fn to_float(self) -> f64 {
        self as f64
    }
}

/// Decodes `out.len()` samples from `bytes`.
///
/// `bytes` must hold at least `out.len() * format.bytes_per_sample()` bytes;
/// `format` must not be [`SampleFormat::None`].
pub fn decode_samples<S: Sample>(
    bytes: &[u8],
    format: SampleFormat,
    endianness: Endianness,
    out: &mut [S],
) {
    let be = endianness == Endianness::BigEndian;
    let width = format.bytes_per_sample();
    if width == 0 {
        return;
    }

    for (dst, raw) in out.iter_mut().zip(bytes.chunks_exact(width)) {
        *dst = match format {
            SampleFormat::Pcm16 => {
                let b = [raw[0], raw[1]];
                let v = if be { i16::from_be_bytes(b) } else { i16::from_le_bytes(b) };
                S::from_pcm((v as i32) << 16)
            }
            SampleFormat::Pcm24 => S::from_pcm(if be {
                i32::from_be_bytes([raw[0], raw[1], raw[2], 0])
            } else {
                i32::from_le_bytes([0, raw[0], raw[1], raw[2]])
            }),
            SampleFormat::Pcm32 => {
                let b = [raw[0], raw[1], raw[2], raw[3]];
                S::from_pcm(if be { i32::from_be_bytes(b) } else { i32::from_le_bytes(b) })
            }
            SampleFormat::Float32 => {
                let b = [raw[0], raw[1], raw[2], raw[3]];
                let v = if be { f32::from_be_bytes(b) } else { f32::from_le_bytes(b) };
                S::from_float(v as f64)
            }
            SampleFormat::Float64 => {
                let mut b = [0u8; 8];
                b.copy_from_slice(raw);
                S::from_float(if be { f64::from_be_bytes(b) } else { f64::from_le_bytes(b) })
            }
            SampleFormat::None => S::default(),
        };
    }
}

/// Appends the stored representation of `samples` to `dst`.
pub fn encode_samples<S: Sample>(
    samples: &[S],
    format: SampleFormat,
    endianness: Endianness,
    dst: &mut Vec<u8>,
) {
    let be = endianness == Endianness::BigEndian;
    dst.reserve(samples.len() * format.bytes_per_sample());

    for &s in samples {
        match format {
            SampleFormat::Pcm16 => {
                let v = (s.to_pcm() >> 16) as i16;
                dst.extend_from_slice(&if be { v.to_be_bytes() } else { v.to_le_bytes() });
            }
            SampleFormat::Pcm24 => {
                let v = s.to_pcm();
                if be {
                    dst.extend_from_slice(&v.to_be_bytes()[0..3]);
                } else {
                    dst.extend_from_slice(&v.to_le_bytes()[1..4]);
                }
            }
            SampleFormat::Pcm32 => {
                let v = s.to_pcm();
                dst.extend_from_slice(&if be { v.to_be_bytes() } else { v.to_le_bytes() });
            }
            SampleFormat::Float32 => {
                let v = s.to_float() as f32;
                dst.extend_from_slice(&if be { v.to_be_bytes() } else { v.to_le_bytes() });
            }
            SampleFormat::Float64 => {
                let v = s.to_float();
                dst.extend_from_slice(&if be { v.to_be_bytes() } else { v.to_le_bytes() });
            }
            SampleFormat::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desc_mapping() {
        assert_eq!(SampleFormat::from_desc(false, 24), SampleFormat::Pcm24);
        assert_eq!(SampleFormat::from_desc(true, 64), SampleFormat::Float64);
        assert_eq!(SampleFormat::from_desc(true, 16), SampleFormat::None);
        assert_eq!(SampleFormat::Pcm24.bytes_per_sample(), 3);
    }

    #[test]
    fn integer_store_truncates() {
        assert_eq!(i16::from_f32(2.9), 2);
        assert_eq!(i16::from_f32(-2.9), -2);
        assert_eq!(i32::from_f32(-0.5), 0);
        assert_eq!(i16::from_f32(1e9), i16::MAX);
    }

    #[test]
    fn pcm24_both_orders() {
        let samples = [0x1234_5600i32, -256, 0];
        for endianness in [Endianness::BigEndian, Endianness::LittleEndian] {
            let mut bytes = Vec::new();
            encode_samples(&samples, SampleFormat::Pcm24, endianness, &mut bytes);
            assert_eq!(bytes.len(), 9);

            let mut decoded = [0i32; 3];
            decode_samples(&bytes, SampleFormat::Pcm24, endianness, &mut decoded);
            assert_eq!(decoded, samples);
        }
    }

    #[test]
    fn cross_type_scaling() {
        let mut bytes = Vec::new();
        encode_samples(&[0.5f32, -1.0], SampleFormat::Pcm16, Endianness::BigEndian, &mut bytes);
        assert_eq!(bytes, [0x40, 0x00, 0x80, 0x00]);

        let mut as_i16 = [0i16; 2];
        decode_samples(&bytes, SampleFormat::Pcm16, Endianness::BigEndian, &mut as_i16);
        assert_eq!(as_i16, [16384, -32768]);

        let mut as_f32 = [0f32; 2];
        decode_samples(&bytes, SampleFormat::Pcm16, Endianness::BigEndian, &mut as_f32);
        assert_eq!(as_f32, [0.5, -1.0]);
    }

    #[test]
    fn float_passthrough_is_bit_exact() {
        let samples = [0.1f32, -3.75, 1.0e-9];
        let mut bytes = Vec::new();
        encode_samples(&samples, SampleFormat::Float32, Endianness::LittleEndian, &mut bytes);
        let mut decoded = [0f32; 3];
        decode_samples(&bytes, SampleFormat::Float32, Endianness::LittleEndian, &mut decoded);
        assert_eq!(decoded, samples);
    }
}
