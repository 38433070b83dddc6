use std::fmt;

use crate::structs::sample::SampleFormat;

/// Layout of an ambix file, or the presentation a caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// Not specified; on read this means "as stored".
    #[default]
    None,
    /// A full ambisonics set without adaptor matrix or extra channels.
    Basic,
    /// A reduced set with adaptor matrix, optionally followed by extra channels.
    Extended,
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileFormat::None => "none",
            FileFormat::Basic => "basic",
            FileFormat::Extended => "extended",
        })
    }
}

/// Stream parameters exchanged with readers and writers.
///
/// On read, `ambi_channels` counts the channels delivered in the ambisonics
/// buffer for the chosen presentation. On write, it counts the stored
/// ambisonics channels (the adaptor matrix columns for extended files).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AmbixInfo {
    pub file_format: FileFormat,
    pub frames: u64,
    pub sample_rate: f64,
    pub sample_format: SampleFormat,
    pub ambi_channels: u32,
    pub extra_channels: u32,
}

impl AmbixInfo {
    pub fn channels(&self) -> u32 {
        self.ambi_channels + self.extra_channels
    }
}
