//! Core Audio Format container backend.
//!
//! Only what ambix needs is covered: the `desc` chunk for linear PCM, `uuid`
//! chunks carrying the adaptor matrix, and a single `data` chunk. The writer
//! leaves the data size open and patches it on [`CAFWriter::finish`].

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::byteorder::{Endianness, ReadBytesBe};
use crate::structs::sample::{Sample, SampleFormat, decode_samples, encode_samples};
use ambix_macros::{FromBytes, ToBytes, caf_chunk_type};

const LPCM: u32 = u32::from_be_bytes(*b"lpcm");

pub fn write_caf_file_header<W: Write>(writer: &mut W) -> io::Result<()> {
    writer.write_all(b"caff")?;
    writer.write_all(&1u16.to_be_bytes())?;
    writer.write_all(&0u16.to_be_bytes())?;

    Ok(())
}

pub trait CAFChunk {
    fn chunk_type(&self) -> &[u8; 4];
    fn chunk_data(&self) -> Vec<u8>;

    fn write_all<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.chunk_type())?;

        let chunk_data = self.chunk_data();
        writer.write_all(&(chunk_data.len() as u64).to_be_bytes())?;
        writer.write_all(&chunk_data)?;

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, ToBytes, FromBytes)]
#[caf_chunk_type(b"desc")]
pub struct AudioFormat {
    pub sample_rate: f64,
    pub format_id: u32,
    pub format_flags: u32,
    pub bytes_per_packet: u32,
    pub frames_per_packet: u32,
    pub channels_per_frame: u32,
    pub bits_per_channel: u32,
}

impl AudioFormat {
    /// Sample format, or [`SampleFormat::None`] for anything but linear PCM.
    pub fn sample_format(&self) -> SampleFormat {
        if self.format_id != LPCM {
            return SampleFormat::None;
        }
        let flags = LinearPCMFormatFlags::from_u32(self.format_flags);
        SampleFormat::from_desc(flags.is_float, self.bits_per_channel)
    }

    pub fn endianness(&self) -> Endianness {
        LinearPCMFormatFlags::from_u32(self.format_flags).endianness()
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.sample_format().bytes_per_sample() * self.channels_per_frame as usize
    }
}

/// A `uuid` chunk: 16-byte identifier followed by an opaque payload.
#[derive(Debug, Clone, PartialEq, ToBytes)]
#[caf_chunk_type(b"uuid")]
pub struct UuidChunk {
    pub uuid: [u8; 16],
    pub payload: Vec<u8>,
}

/// PCM data type (integer vs floating point)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PCMDataType {
    SignedInteger,
    Float,
}

/// Linear PCM format flags following Core Audio
#[derive(Debug, Clone, Copy)]
pub struct LinearPCMFormatFlags {
    /// kLinearPCMFormatFlagIsFloat (bit 0)
    pub is_float: bool,
    /// kLinearPCMFormatFlagIsLittleEndian (bit 1)
    pub is_little_endian: bool,
}

impl LinearPCMFormatFlags {
    pub fn new(data_type: PCMDataType, endianness: Endianness) -> Self {
        Self {
            is_float: matches!(data_type, PCMDataType::Float),
            is_little_endian: matches!(endianness, Endianness::LittleEndian),
        }
    }

    pub fn from_u32(flags: u32) -> Self {
        Self {
            is_float: flags & (1 << 0) != 0,
            is_little_endian: flags & (1 << 1) != 0,
        }
    }

    pub fn to_u32(self) -> u32 {
        let mut flags = 0u32;

        if self.is_float {
            flags |= 1 << 0;
        }
        if self.is_little_endian {
            flags |= 1 << 1;
        }

        flags
    }

    pub fn endianness(self) -> Endianness {
        if self.is_little_endian {
            Endianness::LittleEndian
        } else {
            Endianness::BigEndian
        }
    }
}

/// Information extracted from parsing an existing CAF file
#[derive(Debug, Clone)]
pub struct CAFFileInfo {
    pub data_size_position: u64,
    pub data_chunk_start: u64,
    /// Bytes of sample data, `None` when the file declares an open-ended data chunk.
    pub data_size: Option<u64>,
    pub audio_format: Option<AudioFormat>,
    pub uuid_chunks: Vec<UuidChunk>,
    pub endianness: Endianness,
}

/// Parse a CAF file to extract header positions and metadata
pub fn parse_caf_file<R: Read + Seek>(mut reader: R) -> io::Result<CAFFileInfo> {
    let mut header = [0u8; 8];
    reader.read_exact(&mut header)?;

    if &header[0..4] != b"caff" {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Not a valid CAF file - missing 'caff' signature",
        ));
    }

    let mut audio_format: Option<AudioFormat> = None;
    let mut uuid_chunks = Vec::new();
    let mut data_size_position = None;
    let mut data_chunk_start = None;
    let mut data_size = None;

    loop {
        let current_pos = reader.stream_position()?;

        let mut chunk_type = [0u8; 4];
        match reader.read_exact(&mut chunk_type) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }

        let mut size_bytes = [0u8; 8];
        reader.read_exact(&mut size_bytes)?;
        let chunk_size = i64::from_be_bytes(size_bytes);

        match &chunk_type {
            b"data" => {
                data_size_position = Some(current_pos + 4);

                let mut edit_count = [0u8; 4];
                reader.read_exact(&mut edit_count)?;
                data_chunk_start = Some(reader.stream_position()?);

                if chunk_size < 0 {
                    // open-ended: samples run to the end of the file
                    break;
                }
                let size = (chunk_size as u64).checked_sub(4).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidData, "CAF data chunk too small")
                })?;
                data_size = Some(size);
                reader.seek(SeekFrom::Current(size as i64))?;
            }
            _ if chunk_size < 0 => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "CAF chunk '{}' has no size",
                        String::from_utf8_lossy(&chunk_type)
                    ),
                ));
            }
            b"desc" => {
                let body = read_chunk_body(&mut reader, chunk_size as u64)?;
                audio_format = Some(AudioFormat::read_be(&mut &body[..])?);
            }
            b"uuid" => {
                let body = read_chunk_body(&mut reader, chunk_size as u64)?;
                let mut src = &body[..];
                let uuid = <[u8; 16]>::read_be(&mut src)?;
                uuid_chunks.push(UuidChunk {
                    uuid,
                    payload: src.to_vec(),
                });
            }
            _ => {
                reader.seek(SeekFrom::Current(chunk_size))?;
            }
        }
    }

    let data_size_position = data_size_position.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "CAF file does not contain a data chunk",
        )
    })?;

    let data_chunk_start = data_chunk_start.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "CAF file data chunk is malformed",
        )
    })?;

    let endianness = audio_format
        .as_ref()
        .map(AudioFormat::endianness)
        .unwrap_or_default();

    Ok(CAFFileInfo {
        data_size_position,
        data_chunk_start,
        data_size,
        audio_format,
        uuid_chunks,
        endianness,
    })
}

fn read_chunk_body<R: Read>(reader: &mut R, size: u64) -> io::Result<Vec<u8>> {
    let mut body = Vec::new();
    reader.take(size).read_to_end(&mut body)?;
    if (body.len() as u64) < size {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "CAF chunk extends past the end of the file",
        ));
    }
    Ok(body)
}

/// Frame-based reader over the data chunk of a CAF file.
pub struct CAFReader<R: Read + Seek> {
    reader: R,
    info: CAFFileInfo,
    audio_format: AudioFormat,
    frames: u64,
    position: u64,
    buffer: Vec<u8>,
}

impl<R: Read + Seek> CAFReader<R> {
    pub fn new(mut reader: R) -> io::Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let info = parse_caf_file(&mut reader)?;

        let audio_format = info.audio_format.clone().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "CAF file has no desc chunk")
        })?;

        let data_size = match info.data_size {
            Some(size) => size,
            None => reader.seek(SeekFrom::End(0))? - info.data_chunk_start,
        };
        let bytes_per_frame = audio_format.bytes_per_frame() as u64;
        let frames = if bytes_per_frame == 0 {
            0
        } else {
            data_size / bytes_per_frame
        };

        reader.seek(SeekFrom::Start(info.data_chunk_start))?;

        Ok(Self {
            reader,
            info,
            audio_format,
            frames,
            position: 0,
            buffer: Vec::new(),
        })
    }

    pub fn info(&self) -> &CAFFileInfo {
        &self.info
    }

    pub fn audio_format(&self) -> &AudioFormat {
        &self.audio_format
    }

    pub fn channels(&self) -> usize {
        self.audio_format.channels_per_frame as usize
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Reads up to `out.len() / channels` interleaved frames, returning the
    /// number of frames read (0 at the end of the data).
    pub fn read_frames<S: Sample>(&mut self, out: &mut [S]) -> io::Result<usize> {
        let channels = self.channels();
        let format = self.audio_format.sample_format();
        if channels == 0 || format == SampleFormat::None {
            return Ok(0);
        }

        let wanted = (out.len() / channels) as u64;
        let frames = wanted.min(self.frames - self.position) as usize;
        if frames == 0 {
            return Ok(0);
        }

        self.buffer.resize(frames * self.audio_format.bytes_per_frame(), 0);
        self.reader.read_exact(&mut self.buffer)?;
        decode_samples(
            &self.buffer,
            format,
            self.audio_format.endianness(),
            &mut out[..frames * channels],
        );

        self.position += frames as u64;
        Ok(frames)
    }

    /// Moves to an absolute frame, clamped to the end of the data.
    pub fn seek_frame(&mut self, frame: u64) -> io::Result<u64> {
        let frame = frame.min(self.frames);
        let offset = frame * self.audio_format.bytes_per_frame() as u64;
        self.reader
            .seek(SeekFrom::Start(self.info.data_chunk_start + offset))?;
        self.position = frame;
        Ok(frame)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// CAF writer that supports writing headers with unknown length and updating them later
pub struct CAFWriter<W: Write + Seek> {
    writer: W,
    audio_format: Option<AudioFormat>,
    chunks: Vec<UuidChunk>,
    data_chunk_start: Option<u64>,
    data_size_position: Option<u64>,
    finished: bool,
    endianness: Endianness,
    buffer: Vec<u8>,
}

impl<W: Write + Seek> CAFWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            audio_format: None,
            chunks: Vec::new(),
            data_chunk_start: None,
            data_size_position: None,
            finished: false,
            endianness: Endianness::BigEndian,
            buffer: Vec::new(),
        }
    }

    /// Create a CAF writer from an existing CAF file, resuming at the end
    pub fn from_existing_file(mut writer: W) -> io::Result<Self>
    where
        W: Read,
    {
        let file_info = {
            let current_pos = writer.stream_position()?;
            writer.seek(SeekFrom::Start(0))?;
            let info = parse_caf_file(&mut writer)?;
            writer.seek(SeekFrom::Start(current_pos))?;
            info
        };

        Self::from_parsed_info(writer, file_info)
    }

    /// Create a CAF writer from parsed file info, resuming at the end
    pub fn from_parsed_info(mut writer: W, file_info: CAFFileInfo) -> io::Result<Self> {
        let end = writer.seek(SeekFrom::End(0))?;

        if let Some(size) = file_info.data_size {
            if file_info.data_chunk_start + size != end {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "CAF data chunk is not the last chunk; cannot append",
                ));
            }
        }

        Ok(Self {
            writer,
            audio_format: file_info.audio_format,
            chunks: file_info.uuid_chunks,
            data_chunk_start: Some(file_info.data_chunk_start),
            data_size_position: Some(file_info.data_size_position),
            finished: false,
            endianness: file_info.endianness,
            buffer: Vec::new(),
        })
    }

    fn check_not_finished(&self) -> io::Result<()> {
        if self.finished {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Writer already finished",
            ));
        }
        Ok(())
    }

    fn ensure_header_written(&self) -> io::Result<()> {
        if self.data_chunk_start.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Must call write_header() before this operation",
            ));
        }
        Ok(())
    }

    fn ensure_audio_format(&self) -> io::Result<&AudioFormat> {
        self.audio_format.as_ref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "Audio format must be set before writing header",
            )
        })
    }

    pub fn header_written(&self) -> bool {
        self.data_chunk_start.is_some()
    }

    /// Set the linear PCM description for the given sample format
    pub fn set_audio_format(
        &mut self,
        sample_rate: f64,
        channels: u32,
        format: SampleFormat,
        endianness: Endianness,
    ) -> io::Result<()> {
        if self.header_written() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Cannot change format after writing the header",
            ));
        }
        if format == SampleFormat::None {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "No sample format given",
            ));
        }

        let data_type = if format.is_float() {
            PCMDataType::Float
        } else {
            PCMDataType::SignedInteger
        };
        let format_flags = LinearPCMFormatFlags::new(data_type, endianness);

        self.audio_format = Some(AudioFormat {
            sample_rate,
            format_id: LPCM,
            format_flags: format_flags.to_u32(),
            bytes_per_packet: format.bytes_per_sample() as u32 * channels,
            frames_per_packet: 1,
            channels_per_frame: channels,
            bits_per_channel: format.bits(),
        });

        self.endianness = endianness;
        Ok(())
    }

    /// Queue a `uuid` chunk to be written ahead of the data chunk
    pub fn add_chunk(&mut self, chunk: UuidChunk) -> io::Result<()> {
        if self.header_written() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Chunks must be added before writing the header",
            ));
        }
        self.chunks.push(chunk);
        Ok(())
    }

    /// Begin writing the CAF file. Must be called before write_data.
    pub fn write_header(&mut self) -> io::Result<()> {
        self.write_header_with(&[])
    }

    /// Write the header with `extra` chunks after the queued ones.
    ///
    /// The extra chunks are not kept, so a failed attempt can be retried
    /// with different ones. On failure the stream is moved back to where the
    /// header started.
    pub fn write_header_with(&mut self, extra: &[UuidChunk]) -> io::Result<()> {
        self.check_not_finished()?;
        self.ensure_audio_format()?;
        if self.header_written() {
            return Ok(());
        }

        let header_start = self.writer.stream_position()?;
        match self.write_header_chunks(extra) {
            Ok(data_chunk_start) => {
                self.data_chunk_start = Some(data_chunk_start);
                Ok(())
            }
            Err(e) => {
                self.data_size_position = None;
                let _ = self.writer.seek(SeekFrom::Start(header_start));
                Err(e)
            }
        }
    }

    fn write_header_chunks(&mut self, extra: &[UuidChunk]) -> io::Result<u64> {
        write_caf_file_header(&mut self.writer)?;

        if let Some(ref audio_format) = self.audio_format {
            audio_format.write_all(&mut self.writer)?;
        }

        for chunk in self.chunks.iter().chain(extra) {
            chunk.write_all(&mut self.writer)?;
        }

        self.writer.write_all(b"data")?;
        self.data_size_position = Some(self.writer.stream_position()?);
        self.writer.write_all(&(-1i64).to_be_bytes())?;

        // edit count
        self.writer.write_all(&0u32.to_be_bytes())?;

        self.writer.stream_position()
    }

    /// Write already encoded sample bytes
    pub fn write_data(&mut self, data: &[u8]) -> io::Result<()> {
        self.ensure_header_written()?;
        self.check_not_finished()?;

        self.writer.write_all(data)?;
        Ok(())
    }

    /// Encode interleaved samples in the configured format and write them
    pub fn write_samples<S: Sample>(&mut self, samples: &[S]) -> io::Result<()> {
        let format = self.ensure_audio_format()?.sample_format();
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.clear();
        encode_samples(samples, format, self.endianness, &mut buffer);
        let result = self.write_data(&buffer);
        self.buffer = buffer;
        result
    }

    /// Finish writing and update the data chunk size
    pub fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }

        let data_size_pos = self.data_size_position.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "Must call write_header() before finish()",
            )
        })?;
        let data_start = self.data_chunk_start.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "Must call write_header() before finish()",
            )
        })?;

        let current_pos = self.writer.stream_position()?;

        // computed from positions so resumed files are covered too
        let actual_data_size = current_pos - data_start;
        let chunk_size = actual_data_size + 4;

        self.writer.seek(SeekFrom::Start(data_size_pos))?;
        self.writer.write_all(&(chunk_size as i64).to_be_bytes())?;
        self.writer.seek(SeekFrom::Start(current_pos))?;
        self.writer.flush()?;

        self.finished = true;
        Ok(())
    }

    /// Get the underlying writer (consumes the CAFWriter)
    pub fn into_inner(mut self) -> io::Result<W> {
        use std::mem::ManuallyDrop;
        use std::ptr;

        if !self.finished {
            self.finish()?;
        }

        self.chunks = Vec::new();
        self.buffer = Vec::new();

        let manual = ManuallyDrop::new(self);

        // Safety: the writer is moved out exactly once and Drop never runs;
        // the remaining fields own no heap memory.
        unsafe { Ok(ptr::read(&manual.writer)) }
    }
}

impl<W: Write + Seek> Drop for CAFWriter<W> {
    fn drop(&mut self) {
        if !self.finished && self.header_written() {
            let _ = self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn write_file(
        format: SampleFormat,
        endianness: Endianness,
        channels: u32,
        samples: &[f32],
    ) -> io::Result<Vec<u8>> {
        let mut writer = CAFWriter::new(Cursor::new(Vec::new()));
        writer.set_audio_format(48000.0, channels, format, endianness)?;
        writer.write_header()?;
        writer.write_samples(samples)?;
        writer.finish()?;
        Ok(writer.into_inner()?.into_inner())
    }

    #[test]
    fn test_caf_writer_basic() -> io::Result<()> {
        let buffer = write_file(SampleFormat::Pcm24, Endianness::BigEndian, 2, &[0.0; 512])?;

        assert_eq!(&buffer[0..4], b"caff");
        let info = parse_caf_file(Cursor::new(&buffer))?;
        assert_eq!(info.data_size, Some(256 * 2 * 3));
        Ok(())
    }

    #[test]
    fn test_desc_roundtrip() -> io::Result<()> {
        let buffer = write_file(SampleFormat::Float64, Endianness::LittleEndian, 3, &[])?;
        let info = parse_caf_file(Cursor::new(&buffer))?;
        let format = info.audio_format.ok_or(io::ErrorKind::InvalidData)?;

        assert_eq!(format.sample_rate, 48000.0);
        assert_eq!(format.channels_per_frame, 3);
        assert_eq!(format.sample_format(), SampleFormat::Float64);
        assert_eq!(format.bytes_per_packet, 24);
        assert_eq!(info.endianness, Endianness::LittleEndian);
        Ok(())
    }

    #[test]
    fn test_endianness_detection() -> io::Result<()> {
        for endianness in [Endianness::BigEndian, Endianness::LittleEndian] {
            let buffer = write_file(SampleFormat::Pcm16, endianness, 2, &[])?;
            let file_info = parse_caf_file(Cursor::new(buffer))?;
            assert_eq!(file_info.endianness, endianness);
            assert!(file_info.audio_format.is_some());
        }
        Ok(())
    }

    #[test]
    fn test_uuid_chunks_before_data() -> io::Result<()> {
        let chunk = UuidChunk {
            uuid: *b"0123456789abcdef",
            payload: vec![1, 2, 3],
        };

        let mut writer = CAFWriter::new(Cursor::new(Vec::new()));
        writer.set_audio_format(44100.0, 1, SampleFormat::Pcm16, Endianness::BigEndian)?;
        writer.add_chunk(chunk.clone())?;
        writer.write_header()?;
        assert!(writer.add_chunk(chunk.clone()).is_err());
        writer.finish()?;

        let buffer = writer.into_inner()?.into_inner();
        let info = parse_caf_file(Cursor::new(buffer))?;
        assert_eq!(info.uuid_chunks, vec![chunk]);
        Ok(())
    }

    #[test]
    fn test_uuid_chunk_after_data() -> io::Result<()> {
        let mut buffer = write_file(SampleFormat::Pcm16, Endianness::BigEndian, 1, &[0.5, -0.5])?;
        let chunk = UuidChunk {
            uuid: [9; 16],
            payload: vec![4, 5],
        };
        let mut trailer = Vec::new();
        chunk.write_all(&mut trailer)?;
        buffer.extend_from_slice(&trailer);

        let mut reader = CAFReader::new(Cursor::new(buffer))?;
        assert_eq!(reader.info().uuid_chunks, vec![chunk]);
        assert_eq!(reader.frames(), 2);

        let mut out = [0f32; 4];
        assert_eq!(reader.read_frames(&mut out)?, 2);
        assert_eq!(&out[..2], &[0.5, -0.5]);
        Ok(())
    }

    #[test]
    fn test_open_ended_data_chunk() -> io::Result<()> {
        let mut writer = CAFWriter::new(Cursor::new(Vec::new()));
        writer.set_audio_format(48000.0, 2, SampleFormat::Pcm32, Endianness::BigEndian)?;
        writer.write_header()?;
        writer.write_samples(&[1i32, 2, 3, 4, 5, 6])?;

        // size stays -1 until finish
        let cursor = Cursor::new(writer.writer.get_ref().clone());
        drop(writer);

        let mut reader = CAFReader::new(cursor)?;
        assert_eq!(reader.info().data_size, None);
        assert_eq!(reader.frames(), 3);

        let mut out = [0i32; 6];
        assert_eq!(reader.read_frames(&mut out)?, 3);
        assert_eq!(out, [1, 2, 3, 4, 5, 6]);
        Ok(())
    }

    #[test]
    fn test_reader_seek_and_partial_reads() -> io::Result<()> {
        let samples: Vec<f32> = (0..10).map(|i| i as f32 / 16.0).collect();
        let buffer = write_file(SampleFormat::Float32, Endianness::LittleEndian, 2, &samples)?;
        let mut reader = CAFReader::new(Cursor::new(buffer))?;
        assert_eq!(reader.frames(), 5);

        let mut out = [0f32; 4];
        assert_eq!(reader.read_frames(&mut out)?, 2);
        assert_eq!(out, [0.0, 1.0 / 16.0, 2.0 / 16.0, 3.0 / 16.0]);

        assert_eq!(reader.seek_frame(4)?, 4);
        assert_eq!(reader.read_frames(&mut out)?, 1);
        assert_eq!(&out[..2], &[8.0 / 16.0, 9.0 / 16.0]);
        assert_eq!(reader.read_frames(&mut out)?, 0);

        assert_eq!(reader.seek_frame(99)?, 5);
        Ok(())
    }

    #[test]
    fn test_caf_writer_from_existing_file() -> io::Result<()> {
        let buffer = write_file(SampleFormat::Pcm24, Endianness::LittleEndian, 2, &[0.25; 4])?;

        let mut resumed_writer = CAFWriter::from_existing_file(Cursor::new(buffer))?;
        assert_eq!(resumed_writer.endianness, Endianness::LittleEndian);

        resumed_writer.write_samples(&[0.5f32; 2])?;
        resumed_writer.finish()?;

        let final_buffer = resumed_writer.into_inner()?.into_inner();
        let file_info = parse_caf_file(Cursor::new(&final_buffer))?;
        assert_eq!(file_info.data_size, Some(3 * 2 * 3));

        let mut reader = CAFReader::new(Cursor::new(final_buffer))?;
        let mut out = [0f32; 6];
        assert_eq!(reader.read_frames(&mut out)?, 3);
        assert_eq!(out, [0.25, 0.25, 0.25, 0.25, 0.5, 0.5]);
        Ok(())
    }

    #[test]
    fn test_caf_parsing_positions() -> io::Result<()> {
        let buffer = write_file(SampleFormat::Pcm24, Endianness::BigEndian, 2, &[0.1; 100])?;
        let file_info = parse_caf_file(Cursor::new(buffer.clone()))?;

        assert!(file_info.data_size_position > 8);
        assert!(file_info.data_chunk_start > file_info.data_size_position + 8);

        let file_size = buffer.len() as u64;
        assert_eq!(file_size - file_info.data_chunk_start, 100 * 3);
        Ok(())
    }

    #[test]
    fn test_rejects_non_caf() {
        let err = parse_caf_file(Cursor::new(b"RIFF\0\0\0\0WAVE".to_vec())).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
