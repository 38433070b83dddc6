//! Reading ambix files in either presentation.
//!
//! A reader can present an extended file as a basic one, in which case the
//! stored adaptor matrix reconstructs the full set on the fly, or pass the
//! stored channels through untouched. An optional premultiply matrix is
//! composed with whatever matrix the presentation applies, so exactly one
//! matrix multiplication happens per frame.

use std::io::{Read, Seek};

use crate::caf::CAFReader;
use crate::process::transform::multiply_frames;
use crate::process::{Layout, ResolveOptions, find_adaptor, resolve_layout};
use crate::structs::info::{AmbixInfo, FileFormat};
use crate::structs::matrix::Matrix;
use crate::structs::sample::{Sample, SampleFormat, SampleScratch};
use crate::utils::errors::{AmbixError, Result, StateError};

/// Options for [`AmbixReader::new`].
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Requested presentation; [`FileFormat::None`] keeps the stored one.
    pub format: FileFormat,
    /// Leading ambisonics channels of a file without adaptor chunk.
    pub ambi_channels: u32,
    /// Warnings at or above this level abort opening.
    pub fail_level: log::Level,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            format: FileFormat::None,
            ambi_channels: 0,
            fail_level: log::Level::Error,
        }
    }
}

pub struct AmbixReader<R: Read + Seek> {
    caf: CAFReader<R>,
    layout: Layout,
    presentation: FileFormat,
    reported_adaptor: Option<Matrix>,
    premultiply: Option<Matrix>,
    effective: Option<Matrix>,
    info: AmbixInfo,
    streaming: bool,
    scratch: SampleScratch,
}

impl<R: Read + Seek> AmbixReader<R> {
    /// Parses the container and resolves format and presentation.
    pub fn new(reader: R, options: ReadOptions) -> Result<Self> {
        let caf = CAFReader::new(reader)?;
        let audio_format = caf.audio_format().clone();

        let sample_format = audio_format.sample_format();
        if sample_format == SampleFormat::None {
            return Err(AmbixError::UnsupportedSampleFormat(format!(
                "format id {:#010x}, flags {:#x}, {} bits",
                audio_format.format_id, audio_format.format_flags, audio_format.bits_per_channel
            )));
        }

        let resolve = ResolveOptions {
            format: options.format,
            ambi_channels: options.ambi_channels,
            fail_level: options.fail_level,
        };
        let adaptor = find_adaptor(&caf.info().uuid_chunks, audio_format.endianness(), &resolve)?;
        let layout = resolve_layout(audio_format.channels_per_frame, adaptor, &resolve)?;

        let presentation = match options.format {
            FileFormat::None => layout.declared,
            requested => requested,
        };

        let reported_adaptor = match (&layout.adaptor, presentation) {
            (Some(matrix), _) => Some(matrix.clone()),
            (None, FileFormat::Extended) => {
                let n = layout.stored_ambi as usize;
                Some(Matrix::identity(n, n))
            }
            (None, _) => None,
        };

        log::debug!(
            "Opened {} ambix file ({} ambisonics + {} extra channels) as {}",
            layout.declared,
            layout.stored_ambi,
            layout.extra,
            presentation
        );

        let info = AmbixInfo {
            file_format: presentation,
            frames: caf.frames(),
            sample_rate: audio_format.sample_rate,
            sample_format,
            ambi_channels: layout.stored_ambi,
            extra_channels: layout.extra,
        };

        let mut reader = Self {
            caf,
            layout,
            presentation,
            reported_adaptor,
            premultiply: None,
            effective: None,
            info,
            streaming: false,
            scratch: SampleScratch::default(),
        };
        reader.effective = reader.compose(None)?;
        reader.refresh_info();
        Ok(reader)
    }

    /// Stream parameters for the chosen presentation.
    pub fn info(&self) -> &AmbixInfo {
        &self.info
    }

    /// Format the file declares, independent of the presentation.
    pub fn declared_format(&self) -> FileFormat {
        self.layout.declared
    }

    /// Number of ambisonics channels as stored in the file.
    pub fn stored_ambi_channels(&self) -> u32 {
        self.layout.stored_ambi
    }

    /// The adaptor matrix of the file.
    ///
    /// A basic file presented as extended reports an identity matrix; a
    /// basic file presented as basic has none.
    pub fn adaptor_matrix(&self) -> Option<&Matrix> {
        self.reported_adaptor.as_ref()
    }

    /// The single matrix applied to the ambisonics channels on read.
    pub fn effective_matrix(&self) -> Option<&Matrix> {
        self.effective.as_ref()
    }

    pub fn premultiply_matrix(&self) -> Option<&Matrix> {
        self.premultiply.as_ref()
    }

    /// Sets or clears a matrix applied after any reconstruction.
    ///
    /// Its column count must equal the channel count it receives: the
    /// adaptor rows when a basic presentation reconstructs an extended file,
    /// the stored ambisonics channels otherwise. Only allowed before the
    /// first read.
    pub fn set_premultiply_matrix(&mut self, matrix: Option<&Matrix>) -> Result<()> {
        if self.streaming {
            return Err(StateError::PremultiplyAfterRead.into());
        }

        let effective = self.compose(matrix)?;
        self.premultiply = matrix.cloned();
        self.effective = effective;
        self.refresh_info();
        Ok(())
    }

    fn applied_adaptor(&self) -> Option<&Matrix> {
        match self.presentation {
            FileFormat::Basic => self.layout.adaptor.as_ref(),
            _ => None,
        }
    }

    fn compose(&self, premultiply: Option<&Matrix>) -> Result<Option<Matrix>> {
        let adaptor = self.applied_adaptor();

        let Some(premultiply) = premultiply else {
            return Ok(adaptor.cloned());
        };

        let expected = adaptor.map_or(self.layout.stored_ambi as usize, Matrix::rows);
        if premultiply.cols() != expected || premultiply.is_empty() {
            return Err(AmbixError::PremultiplyMismatch {
                expected,
                actual: premultiply.cols(),
            });
        }

        match adaptor {
            Some(adaptor) => Ok(Some(premultiply.multiply(adaptor)?)),
            None => Ok(Some(premultiply.clone())),
        }
    }

    fn refresh_info(&mut self) {
        self.info.ambi_channels = self
            .effective
            .as_ref()
            .map_or(self.layout.stored_ambi, |m| m.rows() as u32);
    }

    /// Reads up to `frames` frames.
    ///
    /// `ambi` receives `info().ambi_channels` samples per frame and `extra`
    /// receives `info().extra_channels` samples per frame, both interleaved.
    /// Returns the number of frames delivered; 0 marks the end of the data.
    pub fn read_frames<S: Sample>(
        &mut self,
        ambi: &mut [S],
        extra: &mut [S],
        frames: usize,
    ) -> Result<usize> {
        let ambi_out = self.info.ambi_channels as usize;
        let stored = self.layout.stored_ambi as usize;
        let extra_channels = self.layout.extra as usize;
        check_buffer(ambi.len(), frames * ambi_out)?;
        check_buffer(extra.len(), frames * extra_channels)?;

        self.streaming = true;

        let channels = stored + extra_channels;
        let (interleaved, stored_ambi) = S::scratch(&mut self.scratch);
        interleaved.clear();
        interleaved.resize(frames * channels, S::default());
        let read = self.caf.read_frames(interleaved)?;
        if read == 0 {
            return Ok(0);
        }

        let direct = self.effective.is_none();
        stored_ambi.clear();
        if !direct {
            stored_ambi.resize(read * stored, S::default());
        }

        for (f, frame) in interleaved.chunks_exact(channels).take(read).enumerate() {
            let (ambi_part, extra_part) = frame.split_at(stored);
            if direct {
                ambi[f * stored..(f + 1) * stored].copy_from_slice(ambi_part);
            } else {
                stored_ambi[f * stored..(f + 1) * stored].copy_from_slice(ambi_part);
            }
            extra[f * extra_channels..(f + 1) * extra_channels].copy_from_slice(extra_part);
        }

        if let Some(matrix) = &self.effective {
            multiply_frames(ambi, matrix, stored_ambi, read)?;
        }

        Ok(read)
    }

    /// Moves to an absolute frame position, clamped to the end of the data.
    pub fn seek(&mut self, frame: u64) -> Result<u64> {
        Ok(self.caf.seek_frame(frame)?)
    }

    pub fn position(&self) -> u64 {
        self.caf.position()
    }

    pub fn into_inner(self) -> R {
        self.caf.into_inner()
    }
}

fn check_buffer(actual: usize, expected: usize) -> Result<()> {
    if actual < expected {
        return Err(AmbixError::ChannelBuffer { expected, actual });
    }
    Ok(())
}
