//! Opening ambix files and resolving their channel layout.
//!
//! The layout of a file follows from its adaptor chunk and channel count:
//!
//! | adaptor chunk | channels          | declared format |
//! |---------------|-------------------|-----------------|
//! | present       | `>= adaptor cols` | extended        |
//! | absent        | full set          | basic           |
//! | absent        | anything else     | undetermined    |
//!
//! An undetermined file can still be read as basic when the caller names the
//! number of leading ambisonics channels, which must form a full set.

use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::Path;

use log::Level::Warn;

use crate::byteorder::Endianness;
use crate::caf::UuidChunk;
use crate::log_or_err;
use crate::structs::adaptor::{self, ChunkVersion};
use crate::structs::info::{AmbixInfo, FileFormat};
use crate::structs::matrix::Matrix;
use crate::utils::errors::{AmbixError, Result};
use crate::utils::order::{is_full_set, is_full_set_usize};

pub mod read;
pub mod transform;
pub mod write;

use read::{AmbixReader, ReadOptions};
use write::{AmbixWriter, validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    /// Append frames to an existing ambix file.
    ReadWrite,
}

/// A handle returned by [`open`].
pub enum AmbixFile {
    Reader(AmbixReader<BufReader<File>>),
    Writer(AmbixWriter<File>),
}

/// Opens `path` in the given mode.
///
/// For [`OpenMode::Read`], `info.file_format` selects the presentation and
/// `info.ambi_channels` may name the ambisonics channels of a file that has
/// no adaptor chunk; on success `info` describes the opened stream. For
/// [`OpenMode::Write`], `info` describes the file to create. For
/// [`OpenMode::ReadWrite`], `info` receives the layout of the existing file.
pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode, info: &mut AmbixInfo) -> Result<AmbixFile> {
    match mode {
        OpenMode::Read => {
            let file = BufReader::new(File::open(path)?);
            let options = ReadOptions {
                format: info.file_format,
                ambi_channels: info.ambi_channels,
                ..Default::default()
            };
            let reader = AmbixReader::new(file, options)?;
            *info = *reader.info();
            Ok(AmbixFile::Reader(reader))
        }
        OpenMode::Write => {
            // an invalid request must not truncate an existing file
            validate(info)?;
            let file = File::create(path)?;
            Ok(AmbixFile::Writer(AmbixWriter::new(file, info)?))
        }
        OpenMode::ReadWrite => {
            let file = OpenOptions::new().read(true).write(true).open(path)?;
            let writer = AmbixWriter::append(file)?;
            *info = *writer.info();
            Ok(AmbixFile::Writer(writer))
        }
    }
}

/// Channel split of a stored file.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Layout {
    pub declared: FileFormat,
    pub stored_ambi: u32,
    pub extra: u32,
    pub adaptor: Option<Matrix>,
}

pub(crate) struct ResolveOptions {
    pub format: FileFormat,
    pub ambi_channels: u32,
    pub fail_level: log::Level,
}

/// Decodes the first recognized adaptor chunk among `chunks`.
pub(crate) fn find_adaptor(
    chunks: &[UuidChunk],
    endianness: Endianness,
    state: &ResolveOptions,
) -> Result<Option<Matrix>> {
    let mut found: Option<Matrix> = None;

    for chunk in chunks {
        if adaptor::recognize(&chunk.uuid).is_none() {
            continue;
        }
        if found.is_some() {
            log_or_err!(state, Warn, AmbixError::DuplicateAdaptor);
            continue;
        }

        let decoded = adaptor::decode(&chunk.uuid, &chunk.payload, endianness)?;
        if decoded.version == ChunkVersion::Deprecated {
            log::warn!(
                "Adaptor matrix stored under the deprecated identifier {}",
                String::from_utf8_lossy(&adaptor::AMBIX_UUID_DEPRECATED)
            );
        }
        found = Some(decoded.matrix);
    }

    Ok(found)
}

/// Decides how `channels` stored channels split into ambisonics and extras.
pub(crate) fn resolve_layout(
    channels: u32,
    adaptor: Option<Matrix>,
    options: &ResolveOptions,
) -> Result<Layout> {
    if let Some(matrix) = adaptor {
        let cols = matrix.cols();
        if cols > channels as usize {
            return Err(AmbixError::AdaptorMismatch {
                rows: matrix.rows(),
                cols,
                ambi_channels: channels,
            });
        }
        if !is_full_set_usize(matrix.rows()) {
            return Err(AmbixError::InvalidChannelCount(matrix.rows() as u32));
        }
        let stored_ambi = cols as u32;
        return Ok(Layout {
            declared: FileFormat::Extended,
            stored_ambi,
            extra: channels - stored_ambi,
            adaptor: Some(matrix),
        });
    }

    if is_full_set(channels) {
        return Ok(Layout {
            declared: FileFormat::Basic,
            stored_ambi: channels,
            extra: 0,
            adaptor: None,
        });
    }

    let ambi = options.ambi_channels;
    if options.format != FileFormat::None && is_full_set(ambi) && ambi <= channels {
        log::debug!("Using {ambi} of {channels} channels as a full ambisonics set");
        return Ok(Layout {
            declared: FileFormat::Basic,
            stored_ambi: ambi,
            extra: channels - ambi,
            adaptor: None,
        });
    }

    Err(AmbixError::FormatUndetermined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::adaptor::{AMBIX_UUID, AMBIX_UUID_DEPRECATED, encode};
    use crate::structs::sample::SampleFormat;
    use std::fs;

    fn options(format: FileFormat, ambi_channels: u32, fail_level: log::Level) -> ResolveOptions {
        ResolveOptions {
            format,
            ambi_channels,
            fail_level,
        }
    }

    #[test]
    fn layout_resolution() -> Result<()> {
        let lax = options(FileFormat::None, 0, log::Level::Error);

        let basic = resolve_layout(16, None, &lax)?;
        assert_eq!((basic.declared, basic.stored_ambi, basic.extra), (FileFormat::Basic, 16, 0));

        let adaptor = Matrix::identity(9, 6);
        let extended = resolve_layout(8, Some(adaptor), &lax)?;
        assert_eq!(
            (extended.declared, extended.stored_ambi, extended.extra),
            (FileFormat::Extended, 6, 2)
        );

        assert!(matches!(
            resolve_layout(5, None, &lax),
            Err(AmbixError::FormatUndetermined)
        ));
        assert!(matches!(
            resolve_layout(4, Some(Matrix::identity(9, 6)), &lax),
            Err(AmbixError::AdaptorMismatch { .. })
        ));
        assert!(matches!(
            resolve_layout(8, Some(Matrix::identity(8, 6)), &lax),
            Err(AmbixError::InvalidChannelCount(8))
        ));
        Ok(())
    }

    #[test]
    fn forced_basic_layout() -> Result<()> {
        let forced = options(FileFormat::Basic, 4, log::Level::Error);
        let layout = resolve_layout(6, None, &forced)?;
        assert_eq!((layout.declared, layout.stored_ambi, layout.extra), (FileFormat::Basic, 4, 2));

        let not_full = options(FileFormat::Basic, 3, log::Level::Error);
        assert!(matches!(
            resolve_layout(6, None, &not_full),
            Err(AmbixError::FormatUndetermined)
        ));
        Ok(())
    }

    #[test]
    fn duplicate_adaptor_chunks() -> Result<()> {
        let first = encode(&Matrix::identity(4, 3), Endianness::BigEndian)?;
        let mut second = encode(&Matrix::identity(9, 3), Endianness::BigEndian)?;
        second.uuid = AMBIX_UUID_DEPRECATED;
        let unrelated = UuidChunk {
            uuid: [1; 16],
            payload: vec![],
        };
        let chunks = [unrelated, first, second];

        let lax = options(FileFormat::None, 0, log::Level::Error);
        let found = find_adaptor(&chunks, Endianness::BigEndian, &lax)?;
        assert_eq!(found.map(|m| m.rows()), Some(4));

        let strict = options(FileFormat::None, 0, log::Level::Warn);
        assert!(matches!(
            find_adaptor(&chunks, Endianness::BigEndian, &strict),
            Err(AmbixError::DuplicateAdaptor)
        ));
        Ok(())
    }

    #[test]
    fn broken_adaptor_chunk_fails() {
        let chunk = UuidChunk {
            uuid: AMBIX_UUID,
            payload: vec![0, 0, 0, 1],
        };
        let lax = options(FileFormat::None, 0, log::Level::Error);
        assert!(matches!(
            find_adaptor(&[chunk], Endianness::BigEndian, &lax),
            Err(AmbixError::Chunk(_))
        ));
    }

    fn float_info(file_format: FileFormat, ambi: u32, extra: u32) -> AmbixInfo {
        AmbixInfo {
            file_format,
            frames: 0,
            sample_rate: 44100.0,
            sample_format: SampleFormat::Float32,
            ambi_channels: ambi,
            extra_channels: extra,
        }
    }

    #[test]
    fn open_write_then_read() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("extended.caf");
        let adaptor = Matrix::from_rows(4, 2, &[1.0, 0.0, 0.0, 1.0, 0.0, 0.5, 0.0, -1.0])?;

        let mut info = float_info(FileFormat::Extended, 2, 1);
        let AmbixFile::Writer(mut writer) = open(&path, OpenMode::Write, &mut info)? else {
            panic!("write mode returned a reader");
        };
        writer.set_adaptor_matrix(&adaptor)?;
        writer.write_frames(&[0.5f32, 0.25, -0.5, 1.0], &[0.125, -0.125], 2)?;
        writer.finish()?;

        let mut stored = AmbixInfo::default();
        let AmbixFile::Reader(reader) = open(&path, OpenMode::Read, &mut stored)? else {
            panic!("read mode returned a writer");
        };
        assert_eq!(reader.adaptor_matrix(), Some(&adaptor));
        assert_eq!(stored.file_format, FileFormat::Extended);
        assert_eq!((stored.ambi_channels, stored.extra_channels), (2, 1));
        assert_eq!(stored.frames, 2);
        assert_eq!(stored.sample_rate, 44100.0);

        let mut forced = AmbixInfo {
            file_format: FileFormat::Basic,
            ..Default::default()
        };
        let AmbixFile::Reader(mut reader) = open(&path, OpenMode::Read, &mut forced)? else {
            panic!("read mode returned a writer");
        };
        assert_eq!(forced.file_format, FileFormat::Basic);
        assert_eq!((forced.ambi_channels, forced.extra_channels), (4, 1));

        let mut ambi = [0f32; 8];
        let mut extra = [0f32; 2];
        assert_eq!(reader.read_frames(&mut ambi, &mut extra, 2)?, 2);
        assert_eq!(&ambi[..4], &[0.5, 0.25, 0.125, -0.25]);
        assert_eq!(extra, [0.125, -0.125]);
        Ok(())
    }

    #[test]
    fn invalid_write_keeps_existing_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("keep.caf");
        fs::write(&path, b"precious bytes")?;

        let mut info = float_info(FileFormat::Basic, 15, 0);
        assert!(matches!(
            open(&path, OpenMode::Write, &mut info),
            Err(AmbixError::InvalidChannelCount(15))
        ));
        assert_eq!(fs::read(&path)?, b"precious bytes");
        Ok(())
    }

    #[test]
    fn open_read_write_appends() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("basic.caf");

        let mut info = float_info(FileFormat::Basic, 4, 0);
        let AmbixFile::Writer(mut writer) = open(&path, OpenMode::Write, &mut info)? else {
            panic!("write mode returned a reader");
        };
        writer.write_frames(&[0.25f32; 4], &[], 1)?;
        writer.finish()?;

        let mut existing = AmbixInfo::default();
        let AmbixFile::Writer(mut appender) = open(&path, OpenMode::ReadWrite, &mut existing)?
        else {
            panic!("append mode returned a reader");
        };
        assert_eq!(existing.file_format, FileFormat::Basic);
        assert_eq!(existing.frames, 1);
        appender.write_frames(&[-0.25f32; 8], &[], 2)?;
        appender.finish()?;

        let mut stored = AmbixInfo::default();
        let AmbixFile::Reader(mut reader) = open(&path, OpenMode::Read, &mut stored)? else {
            panic!("read mode returned a writer");
        };
        assert_eq!(stored.frames, 3);
        let mut ambi = [0f32; 12];
        assert_eq!(reader.read_frames(&mut ambi, &mut [], 3)?, 3);
        assert_eq!(&ambi[..4], &[0.25; 4]);
        assert_eq!(&ambi[4..], &[-0.25; 8]);
        Ok(())
    }
}
