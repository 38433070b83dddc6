use std::io::{self, BufWriter, Seek, SeekFrom, Write};

use ambix::byteorder::Endianness;
use ambix::structs::sample::{Sample, SampleFormat, encode_samples};

// W64 GUIDs as defined in Sony Wave64 specification
pub const W64_RIFF_GUID: [u8; 16] = [
    0x72, 0x69, 0x66, 0x66, 0x2E, 0x91, 0xCF, 0x11, 0xA5, 0xD6, 0x28, 0xDB, 0x04, 0xC1, 0x00, 0x00,
];
pub const W64_WAVE_GUID: [u8; 16] = [
    0x77, 0x61, 0x76, 0x65, 0xF3, 0xAC, 0xD3, 0x11, 0x8C, 0xD1, 0x00, 0xC0, 0x4F, 0x8E, 0xDB, 0x8A,
];
pub const W64_FMT_GUID: [u8; 16] = [
    0x66, 0x6D, 0x74, 0x20, 0xF3, 0xAC, 0xD3, 0x11, 0x8C, 0xD1, 0x00, 0xC0, 0x4F, 0x8E, 0xDB, 0x8A,
];
pub const W64_DATA_GUID: [u8; 16] = [
    0x64, 0x61, 0x74, 0x61, 0xF3, 0xAC, 0xD3, 0x11, 0x8C, 0xD1, 0x00, 0xC0, 0x4F, 0x8E, 0xDB, 0x8A,
];

const WAVE_FORMAT_PCM: u16 = 1;
const WAVE_FORMAT_IEEE_FLOAT: u16 = 3;

/// Sony Wave64 file writer for little-endian PCM or float audio
pub struct WAVWriter<W: Write + Seek> {
    writer: BufWriter<W>,
    data_size_position: u64,
    data_written: u64,
    sample_rate: u32,
    channels: u32,
    format: SampleFormat,
    file_size_position: u64,
    buffer: Vec<u8>,
}

impl<W: Write + Seek> WAVWriter<W> {
    /// Create a new W64 writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            data_size_position: 0,
            data_written: 0,
            sample_rate: 48000,
            channels: 2,
            format: SampleFormat::Float32,
            file_size_position: 0,
            buffer: Vec::new(),
        }
    }

    /// Configure audio format parameters
    pub fn configure_audio_format(
        &mut self,
        sample_rate: u32,
        channels: u32,
        format: SampleFormat,
    ) -> io::Result<()> {
        if self.data_written > 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Cannot change format after writing data",
            ));
        }
        if format == SampleFormat::None {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "No sample format given",
            ));
        }

        self.sample_rate = sample_rate;
        self.channels = channels;
        self.format = format;
        Ok(())
    }

    /// Write W64 file header
    pub fn write_header(&mut self) -> io::Result<()> {
        // W64 RIFF chunk
        self.writer.write_all(&W64_RIFF_GUID)?;
        self.file_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u64.to_le_bytes())?; // File size (to be updated later)
        self.writer.write_all(&W64_WAVE_GUID)?;

        // W64 fmt chunk
        self.writer.write_all(&W64_FMT_GUID)?;
        let fmt_chunk_size = 24u64 + 16u64;
        self.writer.write_all(&fmt_chunk_size.to_le_bytes())?;

        let format_tag = if self.format.is_float() {
            WAVE_FORMAT_IEEE_FLOAT
        } else {
            WAVE_FORMAT_PCM
        };
        let bytes_per_sample = self.format.bytes_per_sample() as u32;

        self.writer.write_all(&format_tag.to_le_bytes())?;
        self.writer
            .write_all(&(self.channels as u16).to_le_bytes())?;
        self.writer.write_all(&self.sample_rate.to_le_bytes())?;

        let byte_rate = self.sample_rate * self.channels * bytes_per_sample;
        self.writer.write_all(&byte_rate.to_le_bytes())?;

        let block_align = self.channels * bytes_per_sample;
        self.writer.write_all(&(block_align as u16).to_le_bytes())?;
        self.writer
            .write_all(&(self.format.bits() as u16).to_le_bytes())?;

        // W64 data chunk
        self.writer.write_all(&W64_DATA_GUID)?;
        self.data_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u64.to_le_bytes())?; // Data size (to be updated later)

        Ok(())
    }

    /// Encode interleaved samples in the configured format and write them
    pub fn write_samples<S: Sample>(&mut self, samples: &[S]) -> io::Result<()> {
        self.buffer.clear();
        encode_samples(
            samples,
            self.format,
            Endianness::LittleEndian,
            &mut self.buffer,
        );
        self.writer.write_all(&self.buffer)?;
        self.data_written += self.buffer.len() as u64;
        Ok(())
    }

    /// Finish writing and update file size headers
    pub fn finish(&mut self) -> io::Result<()> {
        // Flush any remaining data
        self.writer.flush()?;

        let current_pos = self.writer.stream_position()?;

        // Update data chunk size (includes GUID + size = 24 bytes)
        self.writer.seek(SeekFrom::Start(self.data_size_position))?;
        let data_chunk_size = self.data_written + 24;
        self.writer.write_all(&data_chunk_size.to_le_bytes())?;

        // Update W64 file size
        self.writer.seek(SeekFrom::Start(self.file_size_position))?;
        self.writer.write_all(&current_pos.to_le_bytes())?;

        // Return to end of file
        self.writer.seek(SeekFrom::Start(current_pos))?;
        self.writer.flush()?;

        Ok(())
    }

    /// Get the underlying writer
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_w64_header_write() -> io::Result<()> {
        let mut writer = WAVWriter::new(Cursor::new(Vec::new()));

        writer.configure_audio_format(48000, 4, SampleFormat::Float32)?;
        writer.write_header()?;

        let buffer = writer.into_inner()?.into_inner();

        // Check W64 RIFF GUID
        assert_eq!(&buffer[0..16], &W64_RIFF_GUID);
        // Check W64 WAVE GUID (starts at offset 24)
        assert_eq!(&buffer[24..40], &W64_WAVE_GUID);
        // Check W64 FMT GUID (starts at offset 40)
        assert_eq!(&buffer[40..56], &W64_FMT_GUID);
        // format tag, channels, block align, bits per sample
        assert_eq!(&buffer[64..66], &3u16.to_le_bytes());
        assert_eq!(&buffer[66..68], &4u16.to_le_bytes());
        assert_eq!(&buffer[76..78], &16u16.to_le_bytes());
        assert_eq!(&buffer[78..80], &32u16.to_le_bytes());

        Ok(())
    }

    #[test]
    fn test_w64_sample_write() -> io::Result<()> {
        let mut writer = WAVWriter::new(Cursor::new(Vec::new()));

        writer.configure_audio_format(48000, 2, SampleFormat::Pcm24)?;
        writer.write_header()?;

        // 24-bit samples are left-justified in i32
        writer.write_samples(&[0x1234_5600i32, -256])?;

        writer.finish()?;
        let buffer = writer.into_inner()?.into_inner();
        assert_eq!(&buffer[buffer.len() - 6..], &[0x56, 0x34, 0x12, 0xFF, 0xFF, 0xFF]);

        let data_size = u64::from_le_bytes(buffer[96..104].try_into().unwrap());
        assert_eq!(data_size, 30);

        Ok(())
    }
}
