//! ASCII PLY export

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use mkf_core::PointCloud;

use crate::error::{IoError, Result};

/// Write `cloud` as ASCII PLY, with `red green blue` when it carries colors
pub fn write_ply(path: &Path, cloud: &PointCloud) -> Result<()> {
    let file = File::create(path).map_err(|e| IoError::file(path, e))?;
    let mut writer = BufWriter::new(file);
    write_ply_to(&mut writer, cloud)
        .and_then(|()| writer.flush())
        .map_err(|e| IoError::file(path, e))
}

pub fn write_ply_to<W: Write>(writer: &mut W, cloud: &PointCloud) -> std::io::Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", cloud.len())?;
    writeln!(writer, "property double x")?;
    writeln!(writer, "property double y")?;
    writeln!(writer, "property double z")?;
    if cloud.colors().is_some() {
        writeln!(writer, "property uchar red")?;
        writeln!(writer, "property uchar green")?;
        writeln!(writer, "property uchar blue")?;
    }
    writeln!(writer, "end_header")?;

    match cloud.colors() {
        Some(colors) => {
            for (p, [r, g, b]) in cloud.points().iter().zip(colors) {
                writeln!(writer, "{} {} {} {} {} {}", p.x, p.y, p.z, r, g, b)?;
            }
        }
        None => {
            for p in cloud.points() {
                writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
            }
        }
    }
    Ok(())
}
