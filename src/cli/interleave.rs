use std::cmp::Ordering;
use std::fs::File;
use std::io::BufWriter;

use ambix::process::write::AmbixWriter;
use ambix::structs::fuma::fuma_to_ambix;
use ambix::structs::info::{AmbixInfo, FileFormat};
use ambix::structs::matrix::Matrix;
use ambix::structs::sample::SampleFormat;
use ambix::utils::order::{is_full_set, order_to_channels};
use anyhow::{Context, Result};
use indicatif::MultiProgress;

use super::command::{Cli, InterleaveArgs};
use super::progress::create_progress_bar;
use crate::input::{CafInput, load_matrix, open_caf};

/// How the merged input channels are stored.
#[derive(Debug, PartialEq)]
struct Plan {
    file_format: FileFormat,
    ambi_channels: u32,
    extra_channels: u32,
    adaptor: Option<Matrix>,
}

pub fn cmd_interleave(
    args: &InterleaveArgs,
    cli: &Cli,
    multi: Option<&MultiProgress>,
) -> Result<()> {
    if args.blocksize == 0 {
        anyhow::bail!("Block size must be at least one frame");
    }

    let mut inputs = args
        .inputs
        .iter()
        .map(open_caf)
        .collect::<Result<Vec<_>>>()?;

    let channels: u32 = inputs.iter().map(|r| r.channels() as u32).sum();
    let frames = inputs.iter().map(CafInput::frames).min().unwrap_or(0);
    let (sample_rate, sample_format) = stream_format(&inputs, cli)?;

    let matrix = match (&args.matrix, args.fuma) {
        (Some(path), _) => Some(load_matrix(path)?),
        (None, true) => Some(fuma_to_ambix(channels as usize)?),
        (None, false) => None,
    };
    let plan = plan_layout(channels, args.order, matrix)?;

    log::info!(
        "Writing {} ambix file from {channels} input channels of {frames} frames",
        plan.file_format
    );
    log::info!(
        "{} ambisonics + {} extra channels, {sample_format} at {sample_rate} Hz",
        plan.ambi_channels,
        plan.extra_channels
    );
    if let Some(m) = &plan.adaptor {
        log::info!("Adaptor matrix [{}x{}]", m.rows(), m.cols());
    }

    let info = AmbixInfo {
        file_format: plan.file_format,
        frames: 0,
        sample_rate,
        sample_format,
        ambi_channels: plan.ambi_channels,
        extra_channels: plan.extra_channels,
    };

    let output = File::create(&args.output)
        .with_context(|| format!("Cannot create {}", args.output.display()))?;
    let mut writer = AmbixWriter::new(BufWriter::new(output), &info)?;
    if let Some(m) = &plan.adaptor {
        writer.set_adaptor_matrix(m)?;
    }
    writer.write_header()?;

    let pb = multi
        .map(|m| create_progress_bar(m, frames, "interleaving"))
        .transpose()?;

    let blocksize = args.blocksize;
    let ambi_channels = plan.ambi_channels as usize;
    let extra_channels = plan.extra_channels as usize;
    let widths: Vec<usize> = inputs.iter().map(CafInput::channels).collect();
    let mut blocks: Vec<Vec<f32>> = inputs
        .iter()
        .map(|r| vec![0f32; blocksize * r.channels()])
        .collect();
    let mut ambi = vec![0f32; blocksize * ambi_channels];
    let mut extra = vec![0f32; blocksize * extra_channels];

    let mut remaining = frames;
    while remaining > 0 {
        let n = remaining.min(blocksize as u64) as usize;

        for ((reader, block), path) in inputs.iter_mut().zip(&mut blocks).zip(&args.inputs) {
            let got = reader.read_frames(&mut block[..n * reader.channels()])?;
            if got != n {
                anyhow::bail!("{} ended after {} frames", path.display(), reader.position());
            }
        }

        route_frames(&blocks, &widths, n, &mut ambi, &mut extra, ambi_channels);
        writer.write_frames(&ambi[..n * ambi_channels], &extra[..n * extra_channels], n)?;

        remaining -= n as u64;
        if let Some(ref pb) = pb {
            pb.inc(n as u64);
        }
    }

    writer.finish()?;

    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }
    log::info!("Wrote {frames} frames to {}", args.output.display());

    Ok(())
}

/// Sample rate and storage format, taken from the first input.
fn stream_format(inputs: &[CafInput], cli: &Cli) -> Result<(f64, SampleFormat)> {
    let Some(first) = inputs.first() else {
        anyhow::bail!("No input files given");
    };
    let sample_rate = first.audio_format().sample_rate;

    for input in &inputs[1..] {
        let rate = input.audio_format().sample_rate;
        if rate != sample_rate {
            if cli.strict {
                anyhow::bail!("Input sample rates differ: {rate} Hz vs {sample_rate} Hz");
            }
            log::warn!("Input sample rates differ: {rate} Hz vs {sample_rate} Hz, using {sample_rate} Hz");
        }
    }

    let sample_format = match first.audio_format().sample_format() {
        SampleFormat::None => anyhow::bail!("First input is not linear PCM"),
        SampleFormat::Float64 => SampleFormat::Float32,
        format => format,
    };
    Ok((sample_rate, sample_format))
}

fn full_set(order: u32) -> Result<u32> {
    order_to_channels(order).ok_or_else(|| anyhow::anyhow!("Order {order} is too large"))
}

fn plan_layout(channels: u32, order: Option<u32>, matrix: Option<Matrix>) -> Result<Plan> {
    if let (Some(order), Some(m)) = (order, &matrix) {
        let full = full_set(order)?;
        if m.rows() != full as usize {
            anyhow::bail!("Order {order} needs {full} channels, not {}", m.rows());
        }
    }

    if let Some(m) = matrix {
        let cols = m.cols() as u32;
        if channels < cols {
            anyhow::bail!("Adaptor matrix needs {cols} input channels, got {channels}");
        }
        return Ok(Plan {
            file_format: FileFormat::Extended,
            ambi_channels: cols,
            extra_channels: channels - cols,
            adaptor: Some(m),
        });
    }

    if let Some(order) = order {
        let full = full_set(order)?;
        return match channels.cmp(&full) {
            Ordering::Greater => Ok(Plan {
                file_format: FileFormat::Extended,
                ambi_channels: full,
                extra_channels: channels - full,
                adaptor: Some(Matrix::identity(full as usize, full as usize)),
            }),
            Ordering::Equal => Ok(basic(channels)),
            Ordering::Less => {
                anyhow::bail!("Order {order} needs {full} channels, inputs provide {channels}")
            }
        };
    }

    if !is_full_set(channels) {
        anyhow::bail!(
            "{channels} input channels do not form a full ambisonics set; use --order or --matrix"
        );
    }
    Ok(basic(channels))
}

fn basic(channels: u32) -> Plan {
    Plan {
        file_format: FileFormat::Basic,
        ambi_channels: channels,
        extra_channels: 0,
        adaptor: None,
    }
}

/// Splits per-input interleaved blocks into ambisonics and extra frames.
///
/// `widths` holds the channel count of each input. Channels are numbered
/// across inputs in order; the first `ambi_channels` go to `ambi`, the rest
/// to `extra`.
fn route_frames(
    blocks: &[Vec<f32>],
    widths: &[usize],
    frames: usize,
    ambi: &mut [f32],
    extra: &mut [f32],
    ambi_channels: usize,
) {
    let total: usize = widths.iter().sum();
    let extra_channels = total.saturating_sub(ambi_channels);

    for f in 0..frames {
        let mut channel = 0;
        for (block, &width) in blocks.iter().zip(widths) {
            for &sample in &block[f * width..(f + 1) * width] {
                if channel < ambi_channels {
                    ambi[f * ambi_channels + channel] = sample;
                } else {
                    extra[f * extra_channels + channel - ambi_channels] = sample;
                }
                channel += 1;
            }
        }
    }
}
