use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use ambix::caf::CAFReader;
use ambix::structs::matrix::Matrix;
use anyhow::{Context, Result};

use crate::report::MatrixFile;

pub type CafInput = CAFReader<BufReader<File>>;

/// Opens a CAF file for reading samples.
pub fn open_caf<P: AsRef<Path>>(path: P) -> Result<CafInput> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    CAFReader::new(BufReader::new(file))
        .with_context(|| format!("{} is not a readable CAF file", path.display()))
}

/// Loads a matrix from a YAML file or from a CAF file.
///
/// YAML files hold `rows`, `cols` and row-major `data`. In a CAF file each
/// channel is a row and each frame a column.
pub fn load_matrix<P: AsRef<Path>>(path: P) -> Result<Matrix> {
    let path = path.as_ref();
    let is_yaml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let matrix = if is_yaml {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read matrix file {}", path.display()))?;
        let file: MatrixFile = serde_yaml_ng::from_str(&text)?;
        Matrix::try_from(file)?
    } else {
        matrix_from_caf(open_caf(path)?)?
    };

    if matrix.is_empty() {
        anyhow::bail!("Matrix file {} holds no values", path.display());
    }
    log::debug!(
        "Loaded {}x{} matrix from {}",
        matrix.rows(),
        matrix.cols(),
        path.display()
    );
    Ok(matrix)
}

fn matrix_from_caf<R: Read + Seek>(mut reader: CAFReader<R>) -> Result<Matrix> {
    let rows = reader.channels();
    let cols = reader.frames() as usize;

    let mut data = vec![0f32; rows * cols];
    let read = reader.read_frames(&mut data)?;
    if read < cols {
        anyhow::bail!("Matrix file ends after {read} of {cols} frames");
    }

    let mut matrix = Matrix::new(rows, cols);
    matrix.fill_transposed(&data, false)?;
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambix::byteorder::Endianness;
    use ambix::caf::CAFWriter;
    use ambix::structs::sample::SampleFormat;
    use std::io::Cursor;

    #[test]
    fn caf_channels_become_rows() -> Result<()> {
        let mut writer = CAFWriter::new(Cursor::new(Vec::new()));
        writer.set_audio_format(48000.0, 2, SampleFormat::Float32, Endianness::LittleEndian)?;
        writer.write_header()?;
        // three frames of two channels
        writer.write_samples(&[1.0f32, 4.0, 2.0, 5.0, 3.0, 6.0])?;
        let mut cursor = writer.into_inner()?;
        cursor.set_position(0);

        let matrix = matrix_from_caf(CAFReader::new(cursor)?)?;
        assert_eq!((matrix.rows(), matrix.cols()), (2, 3));
        assert_eq!(matrix.row(0), &[1.0, 2.0, 3.0]);
        assert_eq!(matrix.row(1), &[4.0, 5.0, 6.0]);
        Ok(())
    }
}
