//! Recorded RGBD sequences laid out as `color/<i>.jpg` + `depth/<i>.png`

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use mkf_core::{Frame, FrameSource, MkfError};

use crate::error::{IoError, Result};
use crate::image::{read_color, read_depth};

/// Frame source backed by a dataset directory
#[derive(Debug, Clone)]
pub struct FrameDirectory {
    root: PathBuf,
    count: usize,
}

impl FrameDirectory {
    /// Open `root`.
    ///
    /// The frame count runs up to the highest index found under `color/` or
    /// `depth/`; gaps below it surface as missing frames when read.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(IoError::file(
                &root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "dataset directory not found"),
            ));
        }
        let mut highest = None;
        for sub in ["color", "depth"] {
            highest = highest.max(highest_index(&root.join(sub))?);
        }
        let source = Self {
            root,
            count: highest.map_or(0, |i| i + 1),
        };
        debug!("{}: {} frames", source.root.display(), source.count);
        Ok(source)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn color_path(&self, index: usize) -> PathBuf {
        self.root.join("color").join(format!("{index}.jpg"))
    }

    pub fn depth_path(&self, index: usize) -> PathBuf {
        self.root.join("depth").join(format!("{index}.png"))
    }

    /// Directory holding the per-frame marker detection sidecars
    pub fn markers_dir(&self) -> PathBuf {
        self.root.join("markers")
    }
}

/// Highest numeric file stem in `dir`, if any
fn highest_index(dir: &Path) -> Result<Option<usize>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let entries = fs::read_dir(dir).map_err(|e| IoError::file(dir, e))?;
    let mut highest = None;
    for entry in entries {
        let path = entry.map_err(|e| IoError::file(dir, e))?.path();
        let index = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<usize>().ok());
        highest = highest.max(index);
    }
    Ok(highest)
}

impl FrameSource for FrameDirectory {
    fn frame_count(&self) -> usize {
        self.count
    }

    fn frame(&mut self, index: usize) -> mkf_core::Result<Frame> {
        let color_path = self.color_path(index);
        let depth_path = self.depth_path(index);
        for path in [&color_path, &depth_path] {
            if !path.is_file() {
                return Err(MkfError::MissingFrame {
                    index,
                    reason: format!("{} not found", path.display()),
                });
            }
        }

        let (color, depth) = rayon::join(|| read_color(&color_path), || read_depth(&depth_path));
        Ok(Frame::new(index, color?, depth?))
    }
}
