use std::{io, path::{Path, PathBuf}};

use thiserror::Error;

#[derive(Error, Debug)]
#[error("couldn't read commands file {}: {source}", .path.display())]
pub struct CommandError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Trigger prefixes, in file order.
///
/// The file is plain text; every whitespace separated token is a trigger,
/// sigil included (`!airhorn`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTable {
    triggers: Vec<String>,
}

impl CommandTable {
    pub fn new<I, S>(triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            triggers: triggers
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
        }
    }

    pub fn parse(text: &str) -> Self {
        Self::new(text.split_whitespace())
    }

    pub async fn load(path: &Path) -> Result<Self, CommandError> {
        let text = tokio::fs::read_to_string(path).await.map_err(|source| CommandError {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// First trigger the message starts with.
    pub fn matching(&self, content: &str) -> Option<&str> {
        self.triggers
            .iter()
            .map(String::as_str)
            .find(|trigger| content.starts_with(trigger))
    }
}

/// The sound a triggering message asks for: the message minus its sigil.
pub fn sound_name(content: &str) -> &str {
    let mut chars = content.chars();
    chars.next();
    chars.as_str()
}
