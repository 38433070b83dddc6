use std::fs::File;
use std::io::BufReader;

use ambix::process::read::{AmbixReader, ReadOptions};
use ambix::structs::matrix::Matrix;
use anyhow::{Context, Result};

use super::command::{Cli, InfoArgs};
use super::fail_level;
use crate::report::AmbixReport;

pub fn cmd_info(args: &InfoArgs, cli: &Cli) -> Result<()> {
    log::info!("Analyzing ambix file: {}", args.input.display());

    let file = File::open(&args.input)
        .with_context(|| format!("Cannot open {}", args.input.display()))?;
    let options = ReadOptions {
        format: args.format.map(Into::into).unwrap_or_default(),
        ambi_channels: args.ambi_channels.unwrap_or(0),
        fail_level: fail_level(cli),
    };
    let reader = AmbixReader::new(BufReader::new(file), options)?;

    let report = AmbixReport::from_reader(&args.input, &reader);

    if args.yaml {
        print!("{}", report.to_yaml()?);
    } else {
        display_report(&report);
        if let Some(matrix) = reader.adaptor_matrix() {
            display_matrix(matrix);
        }
    }

    Ok(())
}

fn display_report(report: &AmbixReport) {
    println!("File Information");
    println!("  File                      {}", report.file);
    println!("  Declared format           {}", report.declared_format);
    println!("  Presentation              {}", report.presentation);
    println!("  Sampling rate             {} Hz", report.sample_rate);
    println!("  Sample format             {}", report.sample_format);
    println!("  Frames                    {}", report.frames);
    println!("  Duration                  {}", report.duration);
    match report.order {
        Some(order) => println!(
            "  Ambisonics channels       {} (order {order})",
            report.ambisonics_channels
        ),
        None => println!("  Ambisonics channels       {}", report.ambisonics_channels),
    }
    println!("  Extra channels            {}", report.extra_channels);
    println!();
}

fn display_matrix(matrix: &Matrix) {
    println!("Adaptor Matrix [{}x{}]", matrix.rows(), matrix.cols());
    for r in 0..matrix.rows() {
        let row = matrix
            .row(r)
            .iter()
            .map(|v| format!("{v:>9.4}"))
            .collect::<String>();
        println!("  {row}");
    }
    println!();
}
