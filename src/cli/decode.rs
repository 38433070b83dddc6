use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use ambix::byteorder::Endianness;
use ambix::caf::CAFWriter;
use ambix::process::read::{AmbixReader, ReadOptions};
use ambix::structs::info::FileFormat;
use ambix::structs::matrix::{Matrix, MatrixKind};
use ambix::structs::sample::SampleFormat;
use anyhow::{Context, Result};
use indicatif::MultiProgress;

use super::command::{Cli, DecodeArgs, OutputFormat};
use super::fail_level;
use super::progress::create_progress_bar;
use crate::input::load_matrix;
use crate::wav::WAVWriter;

fn create_path_with_extension(base_path: &Path, expected_ext: &str) -> PathBuf {
    match base_path.extension() {
        Some(existing_ext) if existing_ext == expected_ext => base_path.to_path_buf(),
        Some(_) => {
            let mut name = base_path.file_name().unwrap_or_default().to_os_string();
            name.push(".");
            name.push(expected_ext);
            base_path.with_file_name(name)
        }
        None => base_path.with_extension(expected_ext),
    }
}

enum AudioWriter {
    Caf(CAFWriter<BufWriter<File>>),
    W64(WAVWriter<File>),
}

impl AudioWriter {
    fn create(path: &Path, format: OutputFormat, sample_rate: f64, channels: u32) -> Result<Self> {
        let file =
            File::create(path).with_context(|| format!("Cannot create {}", path.display()))?;

        Ok(match format {
            OutputFormat::Caf => {
                let mut writer = CAFWriter::new(BufWriter::new(file));
                writer.set_audio_format(
                    sample_rate,
                    channels,
                    SampleFormat::Float32,
                    Endianness::BigEndian,
                )?;
                writer.write_header()?;
                AudioWriter::Caf(writer)
            }
            OutputFormat::W64 => {
                let mut writer = WAVWriter::new(file);
                writer.configure_audio_format(
                    sample_rate.round() as u32,
                    channels,
                    SampleFormat::Float32,
                )?;
                writer.write_header()?;
                AudioWriter::W64(writer)
            }
        })
    }

    fn write(&mut self, samples: &[f32]) -> Result<()> {
        match self {
            AudioWriter::Caf(writer) => writer.write_samples(samples)?,
            AudioWriter::W64(writer) => writer.write_samples(samples)?,
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        match self {
            AudioWriter::Caf(writer) => writer.finish()?,
            AudioWriter::W64(writer) => writer.finish()?,
        }
        Ok(())
    }
}

pub fn cmd_decode(args: &DecodeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    if args.blocksize == 0 {
        anyhow::bail!("Block size must be at least one frame");
    }

    log::info!("Decoding ambix file: {}", args.input.display());

    let file = File::open(&args.input)
        .with_context(|| format!("Cannot open {}", args.input.display()))?;
    let options = ReadOptions {
        format: FileFormat::Basic,
        ambi_channels: args.ambi_channels.unwrap_or(0),
        fail_level: fail_level(cli),
    };
    let mut reader = AmbixReader::new(BufReader::new(file), options)?;

    let full_set = reader.info().ambi_channels as usize;
    let premultiply = if let Some(path) = &args.premultiply {
        Some(load_matrix(path)?)
    } else if args.fuma {
        let mut matrix = Matrix::new(full_set, full_set);
        matrix.fill_kind(MatrixKind::ToFuma)?;
        Some(matrix)
    } else {
        None
    };
    if let Some(matrix) = &premultiply {
        log::info!(
            "Applying {}x{} premultiply matrix",
            matrix.rows(),
            matrix.cols()
        );
        reader.set_premultiply_matrix(Some(matrix))?;
    }

    let info = *reader.info();
    let ambi_channels = info.ambi_channels as usize;
    let extra_channels = info.extra_channels as usize;
    let channels = info.ambi_channels + info.extra_channels;

    let output_path = create_path_with_extension(&args.output, args.format.extension());
    let mut output = AudioWriter::create(&output_path, args.format, info.sample_rate, channels)?;

    log::info!(
        "Writing {ambi_channels} ambisonics + {extra_channels} extra channels to {}",
        output_path.display()
    );

    let pb = multi
        .map(|m| create_progress_bar(m, info.frames, "decoding"))
        .transpose()?;

    let blocksize = args.blocksize;
    let mut ambi = vec![0f32; blocksize * ambi_channels];
    let mut extra = vec![0f32; blocksize * extra_channels];
    let mut interleaved = Vec::with_capacity(blocksize * channels as usize);
    let mut total = 0u64;

    loop {
        let n = reader.read_frames(&mut ambi, &mut extra, blocksize)?;
        if n == 0 {
            break;
        }

        interleaved.clear();
        for f in 0..n {
            interleaved.extend_from_slice(&ambi[f * ambi_channels..(f + 1) * ambi_channels]);
            interleaved.extend_from_slice(&extra[f * extra_channels..(f + 1) * extra_channels]);
        }
        output.write(&interleaved)?;

        total += n as u64;
        if let Some(ref pb) = pb {
            pb.inc(n as u64);
        }
    }

    output.finish()?;

    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }
    log::info!("Decoded {total} frames");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_extension() {
        assert_eq!(
            create_path_with_extension(Path::new("out/scene"), "caf"),
            PathBuf::from("out/scene.caf")
        );
        assert_eq!(
            create_path_with_extension(Path::new("scene.caf"), "caf"),
            PathBuf::from("scene.caf")
        );
        assert_eq!(
            create_path_with_extension(Path::new("scene.v2"), "w64"),
            PathBuf::from("scene.v2.w64")
        );
    }
}
