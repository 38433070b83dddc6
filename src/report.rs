use std::io::{Read, Seek};
use std::path::Path;

use ambix::process::read::AmbixReader;
use ambix::structs::matrix::Matrix;
use ambix::utils::order::channels_to_order;
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::timestamp::{frames_to_secs, time_str};

/// Matrix as stored in YAML files: row-major `data` of `rows * cols` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixFile {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
}

impl From<&Matrix> for MatrixFile {
    fn from(matrix: &Matrix) -> Self {
        Self {
            rows: matrix.rows(),
            cols: matrix.cols(),
            data: matrix.as_slice().to_vec(),
        }
    }
}

impl TryFrom<MatrixFile> for Matrix {
    type Error = ambix::utils::errors::MatrixError;

    fn try_from(file: MatrixFile) -> Result<Self, Self::Error> {
        Matrix::from_rows(file.rows, file.cols, &file.data)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbixReport {
    pub file: String,
    pub declared_format: String,
    pub presentation: String,
    pub sample_rate: f64,
    pub sample_format: String,
    pub frames: u64,
    pub duration: String,
    pub ambisonics_channels: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    pub extra_channels: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptor_matrix: Option<MatrixFile>,
}

impl AmbixReport {
    pub fn from_reader<R: Read + Seek>(path: &Path, reader: &AmbixReader<R>) -> Self {
        let info = reader.info();
        Self {
            file: path.display().to_string(),
            declared_format: reader.declared_format().to_string(),
            presentation: info.file_format.to_string(),
            sample_rate: info.sample_rate,
            sample_format: info.sample_format.to_string(),
            frames: info.frames,
            duration: time_str(frames_to_secs(info.frames, info.sample_rate)),
            ambisonics_channels: info.ambi_channels,
            order: channels_to_order(info.ambi_channels),
            extra_channels: info.extra_channels,
            adaptor_matrix: reader.adaptor_matrix().map(MatrixFile::from),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(format_yaml_string(serde_yaml_ng::to_string(self)?))
    }
}

/// Helper function for common YAML string formatting
pub fn format_yaml_string(mut yaml_str: String) -> String {
    yaml_str.retain(|c| c != '\'');
    yaml_str.replace("  ", "    ").replace("- ", "  - ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambix::process::read::ReadOptions;
    use ambix::process::write::AmbixWriter;
    use ambix::structs::info::{AmbixInfo, FileFormat};
    use ambix::structs::sample::SampleFormat;
    use std::io::Cursor;

    #[test]
    fn matrix_file_from_yaml() -> Result<()> {
        let yaml = "rows: 2\ncols: 3\ndata: [1, 0, 0.5, 0, 1, -0.5]\n";
        let file: MatrixFile = serde_yaml_ng::from_str(yaml)?;
        let matrix = Matrix::try_from(file)?;
        assert_eq!((matrix.rows(), matrix.cols()), (2, 3));
        assert_eq!(matrix[(1, 2)], -0.5);

        let short = MatrixFile {
            rows: 2,
            cols: 2,
            data: vec![1.0],
        };
        assert!(Matrix::try_from(short).is_err());
        Ok(())
    }

    #[test]
    fn report_of_extended_file() -> Result<()> {
        let info = AmbixInfo {
            file_format: FileFormat::Extended,
            frames: 0,
            sample_rate: 48000.0,
            sample_format: SampleFormat::Pcm24,
            ambi_channels: 3,
            extra_channels: 1,
        };
        let mut writer = AmbixWriter::new(Cursor::new(Vec::new()), &info)?;
        writer.set_adaptor_matrix(&Matrix::identity(4, 3))?;
        let frames = 24000;
        writer.write_frames(&vec![0i32; 3 * frames], &vec![0i32; frames], frames)?;
        let file = writer.into_inner()?;

        let reader = AmbixReader::new(file, ReadOptions::default())?;
        let report = AmbixReport::from_reader(Path::new("scene.caf"), &reader);
        assert_eq!(report.declared_format, "extended");
        assert_eq!(report.order, None);
        assert_eq!(report.duration, "00:00:00.500");

        let yaml = report.to_yaml()?;
        assert!(yaml.contains("declaredFormat: extended"));
        assert!(yaml.contains("sampleFormat: 24-bit PCM"));
        assert!(yaml.contains("adaptorMatrix:"));
        Ok(())
    }
}
