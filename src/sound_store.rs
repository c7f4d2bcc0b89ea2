use std::{io::{self, Cursor}, path::PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::dca::{self, Frame, FrameError};

#[derive(Error, Debug)]
pub enum SoundError {
    #[error("invalid sound name {0:?}")]
    InvalidName(String),

    #[error("sound file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("couldn't read sound file {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("malformed sound file {}: {source}", .path.display())]
    Malformed { path: PathBuf, source: FrameError },
}

/// A decoded clip, owned by whoever is playing it.
#[derive(Debug, Clone, Default)]
pub struct SoundClip {
    name: String,
    frames: Vec<Frame>,
}

impl SoundClip {
    pub fn new(name: impl Into<String>, frames: Vec<Frame>) -> Self {
        Self {
            name: name.into(),
            frames,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl IntoIterator for SoundClip {
    type Item = Frame;
    type IntoIter = std::vec::IntoIter<Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}

/// Resolves sound names to `<dir>/<name>.<extension>` and decodes them.
#[derive(Debug, Clone)]
pub struct SoundStore {
    dir: PathBuf,
    extension: String,
}

impl SoundStore {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, SoundError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(SoundError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{}.{}", name, self.extension)))
    }

    pub async fn load(&self, name: &str) -> Result<SoundClip, SoundError> {
        let path = self.path_for(name)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(SoundError::NotFound(path)),
            Err(source) => return Err(SoundError::Io { path, source }),
        };

        let frames = dca::read_frames(Cursor::new(data))
            .map_err(|source| SoundError::Malformed { path: path.clone(), source })?;
        debug!("Loaded {} frames from {}", frames.len(), path.display());

        Ok(SoundClip::new(name, frames))
    }
}
