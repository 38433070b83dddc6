//! Writing ambix files.
//!
//! Samples are stored exactly as given; the adaptor matrix is only recorded
//! in the header so readers can reconstruct the full set. Because the header
//! precedes the sample data, the matrix is frozen by the first write.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::byteorder::Endianness;
use crate::caf::{CAFWriter, parse_caf_file};
use crate::process::{ResolveOptions, find_adaptor, resolve_layout};
use crate::structs::adaptor;
use crate::structs::info::{AmbixInfo, FileFormat};
use crate::structs::matrix::Matrix;
use crate::structs::sample::{Sample, SampleFormat};
use crate::utils::errors::{AmbixError, Result, StateError};
use crate::utils::order::{is_full_set, is_full_set_usize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Header not written; an extended file still takes its adaptor matrix.
    AwaitingMatrix,
    /// Header written, frames may be appended.
    Streaming,
    Closed,
}

pub struct AmbixWriter<W: Write + Seek> {
    caf: CAFWriter<W>,
    info: AmbixInfo,
    endianness: Endianness,
    adaptor: Option<Matrix>,
    state: WriterState,
}

impl<W: Write + Seek> AmbixWriter<W> {
    /// Creates a writer storing samples big-endian, the CAF default.
    pub fn new(writer: W, info: &AmbixInfo) -> Result<Self> {
        Self::with_endianness(writer, info, Endianness::BigEndian)
    }

    pub fn with_endianness(writer: W, info: &AmbixInfo, endianness: Endianness) -> Result<Self> {
        validate(info)?;

        let mut caf = CAFWriter::new(writer);
        caf.set_audio_format(
            info.sample_rate,
            info.channels(),
            info.sample_format,
            endianness,
        )?;

        Ok(Self {
            caf,
            info: AmbixInfo { frames: 0, ..*info },
            endianness,
            adaptor: None,
            state: WriterState::AwaitingMatrix,
        })
    }

    /// Reopens an existing ambix file to append frames after its data.
    pub fn append(mut writer: W) -> Result<Self>
    where
        W: Read,
    {
        writer.seek(SeekFrom::Start(0))?;
        let file_info = parse_caf_file(&mut writer)?;
        let audio_format = file_info.audio_format.clone().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, "CAF file has no desc chunk")
        })?;

        let sample_format = audio_format.sample_format();
        if sample_format == SampleFormat::None {
            return Err(AmbixError::UnsupportedSampleFormat(format!(
                "{} bit samples with flags {:#x}",
                audio_format.bits_per_channel, audio_format.format_flags
            )));
        }

        let resolve = ResolveOptions {
            format: FileFormat::None,
            ambi_channels: 0,
            fail_level: log::Level::Error,
        };
        let matrix = find_adaptor(&file_info.uuid_chunks, file_info.endianness, &resolve)?;
        let layout = resolve_layout(audio_format.channels_per_frame, matrix, &resolve)?;

        let end = writer.seek(SeekFrom::End(0))?;
        let data_size = file_info
            .data_size
            .unwrap_or(end - file_info.data_chunk_start);
        let frames = match audio_format.bytes_per_frame() as u64 {
            0 => 0,
            bytes => data_size / bytes,
        };

        let endianness = file_info.endianness;
        let caf = CAFWriter::from_parsed_info(writer, file_info)?;

        log::debug!("Appending to {} ambix file after {frames} frames", layout.declared);

        Ok(Self {
            caf,
            info: AmbixInfo {
                file_format: layout.declared,
                frames,
                sample_rate: audio_format.sample_rate,
                sample_format,
                ambi_channels: layout.stored_ambi,
                extra_channels: layout.extra,
            },
            endianness,
            adaptor: layout.adaptor,
            state: WriterState::Streaming,
        })
    }

    /// Stream parameters; `frames` counts the frames in the file so far.
    pub fn info(&self) -> &AmbixInfo {
        &self.info
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn adaptor_matrix(&self) -> Option<&Matrix> {
        self.adaptor.as_ref()
    }

    fn check_open(&self) -> Result<()> {
        if self.state == WriterState::Closed {
            return Err(StateError::Closed.into());
        }
        Ok(())
    }

    /// Records the adaptor matrix of an extended file.
    ///
    /// The matrix needs one column per stored ambisonics channel and a full
    /// set of rows. It can be replaced until the header is written.
    pub fn set_adaptor_matrix(&mut self, matrix: &Matrix) -> Result<()> {
        self.check_open()?;
        if self.state == WriterState::Streaming {
            return Err(StateError::MatrixAfterStreaming.into());
        }
        if self.info.file_format != FileFormat::Extended {
            return Err(StateError::AdaptorNotAllowed.into());
        }
        if matrix.cols() != self.info.ambi_channels as usize || matrix.is_empty() {
            return Err(AmbixError::AdaptorMismatch {
                rows: matrix.rows(),
                cols: matrix.cols(),
                ambi_channels: self.info.ambi_channels,
            });
        }
        if !is_full_set_usize(matrix.rows()) {
            return Err(AmbixError::InvalidChannelCount(matrix.rows() as u32));
        }

        self.adaptor = Some(matrix.clone());
        Ok(())
    }

    /// Writes the container header, freezing the adaptor matrix.
    ///
    /// Happens implicitly on the first [`write_frames`](Self::write_frames).
    pub fn write_header(&mut self) -> Result<()> {
        self.check_open()?;
        if self.state == WriterState::Streaming {
            return Ok(());
        }

        let mut chunks = Vec::new();
        if self.info.file_format == FileFormat::Extended {
            let matrix = self
                .adaptor
                .as_ref()
                .ok_or(StateError::MissingAdaptorMatrix)?;
            chunks.push(adaptor::encode(matrix, self.endianness)?);
        }
        // a failed attempt leaves nothing queued, so the matrix can still change
        self.caf.write_header_with(&chunks)?;

        log::debug!(
            "Wrote {} ambix header: {} ambisonics + {} extra channels, {} at {} Hz",
            self.info.file_format,
            self.info.ambi_channels,
            self.info.extra_channels,
            self.info.sample_format,
            self.info.sample_rate
        );

        self.state = WriterState::Streaming;
        Ok(())
    }

    /// Interleaves and stores `frames` frames.
    ///
    /// `ambi` holds `ambi_channels` and `extra` holds `extra_channels`
    /// samples per frame. Returns the number of frames written.
    pub fn write_frames<S: Sample>(
        &mut self,
        ambi: &[S],
        extra: &[S],
        frames: usize,
    ) -> Result<usize> {
        self.check_open()?;

        let ambi_channels = self.info.ambi_channels as usize;
        let extra_channels = self.info.extra_channels as usize;
        for (actual, expected) in [
            (ambi.len(), frames * ambi_channels),
            (extra.len(), frames * extra_channels),
        ] {
            if actual < expected {
                return Err(AmbixError::ChannelBuffer { expected, actual });
            }
        }

        self.write_header()?;

        let mut interleaved = Vec::with_capacity(frames * (ambi_channels + extra_channels));
        for f in 0..frames {
            interleaved.extend_from_slice(&ambi[f * ambi_channels..(f + 1) * ambi_channels]);
            interleaved.extend_from_slice(&extra[f * extra_channels..(f + 1) * extra_channels]);
        }
        self.caf.write_samples(&interleaved)?;

        self.info.frames += frames as u64;
        Ok(frames)
    }

    /// Writes a pending header and patches the data size.
    pub fn finish(&mut self) -> Result<()> {
        if self.state == WriterState::Closed {
            return Ok(());
        }
        self.write_header()?;
        self.caf.finish()?;
        self.state = WriterState::Closed;
        Ok(())
    }

    /// Finishes the file and returns the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.finish()?;
        Ok(self.caf.into_inner()?)
    }
}

/// Checks the parameters of a file about to be created.
pub(crate) fn validate(info: &AmbixInfo) -> Result<()> {
    if info.sample_format == SampleFormat::None {
        return Err(AmbixError::UnsupportedSampleFormat(
            info.sample_format.to_string(),
        ));
    }
    if info.sample_rate.is_nan() || info.sample_rate <= 0.0 {
        return Err(AmbixError::InvalidSampleRate(info.sample_rate));
    }

    match info.file_format {
        FileFormat::Basic => {
            if !is_full_set(info.ambi_channels) {
                return Err(AmbixError::InvalidChannelCount(info.ambi_channels));
            }
            if info.extra_channels != 0 {
                return Err(AmbixError::ExtraChannelsInBasic(info.extra_channels));
            }
        }
        FileFormat::Extended => {
            if info.ambi_channels == 0 {
                return Err(AmbixError::InvalidChannelCount(0));
            }
        }
        FileFormat::None => return Err(AmbixError::FormatUndetermined),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::read::{AmbixReader, ReadOptions};
    use std::io::{self, Cursor};

    /// Rejects its first write, then behaves like a cursor.
    struct FailFirstWrite {
        inner: Cursor<Vec<u8>>,
        failed: bool,
    }

    impl Write for FailFirstWrite {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(io::Error::other("disk full"));
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl Seek for FailFirstWrite {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    fn info(file_format: FileFormat, ambi: u32, extra: u32) -> AmbixInfo {
        AmbixInfo {
            file_format,
            frames: 0,
            sample_rate: 48000.0,
            sample_format: SampleFormat::Float32,
            ambi_channels: ambi,
            extra_channels: extra,
        }
    }

    fn cursor() -> Cursor<Vec<u8>> {
        Cursor::new(Vec::new())
    }

    #[test]
    fn basic_requires_full_set() {
        assert!(AmbixWriter::new(cursor(), &info(FileFormat::Basic, 16, 0)).is_ok());
        assert!(matches!(
            AmbixWriter::new(cursor(), &info(FileFormat::Basic, 15, 0)),
            Err(AmbixError::InvalidChannelCount(15))
        ));
        assert!(matches!(
            AmbixWriter::new(cursor(), &info(FileFormat::Basic, 4, 1)),
            Err(AmbixError::ExtraChannelsInBasic(1))
        ));
    }

    #[test]
    fn invalid_parameters() {
        let mut no_format = info(FileFormat::Basic, 4, 0);
        no_format.sample_format = SampleFormat::None;
        assert!(matches!(
            AmbixWriter::new(cursor(), &no_format),
            Err(AmbixError::UnsupportedSampleFormat(_))
        ));

        let mut no_rate = info(FileFormat::Basic, 4, 0);
        no_rate.sample_rate = 0.0;
        assert!(matches!(
            AmbixWriter::new(cursor(), &no_rate),
            Err(AmbixError::InvalidSampleRate(_))
        ));

        assert!(matches!(
            AmbixWriter::new(cursor(), &info(FileFormat::None, 4, 0)),
            Err(AmbixError::FormatUndetermined)
        ));
        assert!(matches!(
            AmbixWriter::new(cursor(), &info(FileFormat::Extended, 0, 2)),
            Err(AmbixError::InvalidChannelCount(0))
        ));
    }

    #[test]
    fn adaptor_rejected_for_basic() -> Result<()> {
        let mut writer = AmbixWriter::new(cursor(), &info(FileFormat::Basic, 4, 0))?;
        assert!(matches!(
            writer.set_adaptor_matrix(&Matrix::identity(4, 4)),
            Err(AmbixError::State(StateError::AdaptorNotAllowed))
        ));
        Ok(())
    }

    #[test]
    fn adaptor_shape_is_checked() -> Result<()> {
        let mut writer = AmbixWriter::new(cursor(), &info(FileFormat::Extended, 3, 0))?;
        assert!(matches!(
            writer.set_adaptor_matrix(&Matrix::identity(4, 2)),
            Err(AmbixError::AdaptorMismatch { .. })
        ));
        assert!(matches!(
            writer.set_adaptor_matrix(&Matrix::identity(5, 3)),
            Err(AmbixError::InvalidChannelCount(5))
        ));
        writer.set_adaptor_matrix(&Matrix::identity(4, 3))?;
        Ok(())
    }

    #[test]
    fn missing_adaptor_keeps_state() -> Result<()> {
        let mut writer = AmbixWriter::new(cursor(), &info(FileFormat::Extended, 2, 0))?;
        assert!(matches!(
            writer.write_header(),
            Err(AmbixError::State(StateError::MissingAdaptorMatrix))
        ));
        assert_eq!(writer.state(), WriterState::AwaitingMatrix);

        writer.set_adaptor_matrix(&Matrix::identity(4, 2))?;
        writer.write_header()?;
        assert_eq!(writer.state(), WriterState::Streaming);
        Ok(())
    }

    #[test]
    fn failed_header_can_be_retried_with_new_adaptor() -> Result<()> {
        let sink = FailFirstWrite {
            inner: Cursor::new(Vec::new()),
            failed: false,
        };
        let mut writer = AmbixWriter::new(sink, &info(FileFormat::Extended, 2, 0))?;
        writer.set_adaptor_matrix(&Matrix::identity(4, 2))?;
        assert!(matches!(writer.write_header(), Err(AmbixError::Io(_))));
        assert_eq!(writer.state(), WriterState::AwaitingMatrix);

        let corrected = Matrix::from_rows(4, 2, &[0.5, 0.5, 0.5, -0.5, 1.0, 0.0, 0.0, 1.0])?;
        writer.set_adaptor_matrix(&corrected)?;
        writer.write_frames(&[0.5f32, 0.25], &[], 1)?;
        let bytes = writer.into_inner()?.inner.into_inner();

        let parsed = parse_caf_file(Cursor::new(&bytes))?;
        let adaptors = parsed
            .uuid_chunks
            .iter()
            .filter(|chunk| adaptor::recognize(&chunk.uuid).is_some())
            .count();
        assert_eq!(adaptors, 1);

        let strict = ReadOptions {
            fail_level: log::Level::Warn,
            ..Default::default()
        };
        let reader = AmbixReader::new(Cursor::new(bytes), strict)?;
        assert_eq!(reader.adaptor_matrix(), Some(&corrected));
        assert_eq!(reader.info().frames, 1);
        Ok(())
    }

    #[test]
    fn late_adaptor_fails_but_writer_stays_usable() -> Result<()> {
        let mut writer = AmbixWriter::new(cursor(), &info(FileFormat::Extended, 2, 1))?;
        let adaptor = Matrix::identity(4, 2);
        writer.set_adaptor_matrix(&adaptor)?;
        writer.write_frames(&[0.5f32, 0.25], &[1.0], 1)?;

        assert!(matches!(
            writer.set_adaptor_matrix(&Matrix::identity(9, 2)),
            Err(AmbixError::State(StateError::MatrixAfterStreaming))
        ));
        assert_eq!(writer.write_frames(&[0.0f32, 0.0], &[0.0], 1)?, 1);
        assert_eq!(writer.info().frames, 2);

        let file = writer.into_inner()?;
        let reader = AmbixReader::new(file, ReadOptions::default())?;
        assert_eq!(reader.adaptor_matrix(), Some(&adaptor));
        assert_eq!(reader.info().frames, 2);
        Ok(())
    }

    #[test]
    fn extended_roundtrip_little_endian() -> Result<()> {
        let adaptor = Matrix::from_rows(4, 2, &[0.5, 0.5, 0.25, -0.25, 1.0, 0.0, 0.0, 1.0])?;
        let mut writer = AmbixWriter::with_endianness(
            cursor(),
            &info(FileFormat::Extended, 2, 1),
            Endianness::LittleEndian,
        )?;
        writer.set_adaptor_matrix(&adaptor)?;

        let ambi = [0.5f32, -0.5, 0.25, 0.75];
        let extra = [0.125f32, -0.125];
        writer.write_frames(&ambi, &extra, 2)?;
        let file = writer.into_inner()?;

        let mut reader = AmbixReader::new(file, ReadOptions::default())?;
        assert_eq!(reader.declared_format(), FileFormat::Extended);
        assert_eq!(reader.adaptor_matrix(), Some(&adaptor));

        let mut stored = [0f32; 4];
        let mut extra_out = [0f32; 2];
        assert_eq!(reader.read_frames(&mut stored, &mut extra_out, 2)?, 2);
        assert_eq!(stored, ambi);
        assert_eq!(extra_out, extra);
        Ok(())
    }

    #[test]
    fn integer_samples_are_stored_unmodified() -> Result<()> {
        let mut basic = info(FileFormat::Basic, 1, 0);
        basic.sample_format = SampleFormat::Pcm16;
        let mut writer = AmbixWriter::new(cursor(), &basic)?;
        writer.write_frames(&[1i16, -2, i16::MAX, i16::MIN], &[], 4)?;
        let file = writer.into_inner()?;

        let mut reader = AmbixReader::new(file, ReadOptions::default())?;
        let mut out = [0i16; 4];
        reader.read_frames(&mut out, &mut [], 4)?;
        assert_eq!(out, [1, -2, i16::MAX, i16::MIN]);
        Ok(())
    }

    #[test]
    fn finish_closes() -> Result<()> {
        let mut writer = AmbixWriter::new(cursor(), &info(FileFormat::Basic, 4, 0))?;
        writer.finish()?;
        writer.finish()?;
        assert_eq!(writer.state(), WriterState::Closed);
        assert!(matches!(
            writer.write_frames(&[0f32; 4], &[], 1),
            Err(AmbixError::State(StateError::Closed))
        ));
        Ok(())
    }

    #[test]
    fn short_buffers() -> Result<()> {
        let mut writer = AmbixWriter::new(cursor(), &info(FileFormat::Basic, 4, 0))?;
        assert!(matches!(
            writer.write_frames(&[0f32; 6], &[], 2),
            Err(AmbixError::ChannelBuffer {
                expected: 8,
                actual: 6
            })
        ));
        Ok(())
    }

    #[test]
    fn append_extends_existing_file() -> Result<()> {
        let adaptor = Matrix::identity(4, 3);
        let mut writer = AmbixWriter::new(cursor(), &info(FileFormat::Extended, 3, 0))?;
        writer.set_adaptor_matrix(&adaptor)?;
        writer.write_frames(&[0.5f32; 6], &[], 2)?;
        let file = writer.into_inner()?;

        let mut appender = AmbixWriter::append(file)?;
        assert_eq!(appender.state(), WriterState::Streaming);
        assert_eq!(appender.info().frames, 2);
        assert_eq!(appender.info().file_format, FileFormat::Extended);
        assert_eq!(appender.adaptor_matrix(), Some(&adaptor));
        assert!(matches!(
            appender.set_adaptor_matrix(&adaptor),
            Err(AmbixError::State(StateError::MatrixAfterStreaming))
        ));

        appender.write_frames(&[-0.5f32; 3], &[], 1)?;
        let file = appender.into_inner()?;

        let mut reader = AmbixReader::new(file, ReadOptions::default())?;
        assert_eq!(reader.info().frames, 3);
        let mut out = [0f32; 9];
        reader.read_frames(&mut out, &mut [], 3)?;
        assert_eq!(&out[6..], &[-0.5; 3]);
        Ok(())
    }
}
