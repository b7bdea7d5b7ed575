//! Output store: allocates unique file names and persists encoded images.

use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use {
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::error::{Context, Error, Result};

/// Which host folder an image was written to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageClass {
    #[default]
    Output,
    Temp,
}

/// Per-image entry handed back to the host UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedImage {
    pub filename: String,
    pub subfolder: String,
    #[serde(rename = "type")]
    pub storage_class: StorageClass,
}

/// Where a batch of images goes and which counter it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTarget {
    pub directory: PathBuf,
    pub base_name: String,
    pub counter: u32,
    /// Folder relative to the store root, `/`-separated, empty for the root.
    pub subfolder: String,
}

impl SaveTarget {
    /// File name for the image saved under `counter`.
    pub fn filename(&self, counter: u32) -> String {
        format!("{}_{counter:05}_.png", self.base_name)
    }

    /// Names for `count` consecutive images starting at `self.counter`.
    ///
    /// Fails without naming anything when the run would pass `u32::MAX`.
    pub fn filenames(&self, count: usize) -> Result<Vec<String>> {
        let exhausted = || Error::CounterExhausted {
            base_name: self.base_name.clone(),
        };
        let count = u32::try_from(count).map_err(|_| exhausted())?;
        if count > 0 {
            self.counter.checked_add(count - 1).ok_or_else(exhausted)?;
        }
        Ok((0..count)
            .map(|offset| self.filename(self.counter + offset))
            .collect())
    }
}

/// Persistence collaborator used by the send orchestrators.
pub trait ImageStore: Send + Sync {
    fn storage_class(&self) -> StorageClass;

    /// Resolve `prefix` into a folder and a starting counter that does not
    /// collide with files already present.
    fn allocate(&self, prefix: &str, width: u32, height: u32) -> Result<SaveTarget>;

    /// Write `bytes` as `filename` inside the target folder.
    fn persist(&self, target: &SaveTarget, filename: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Filesystem store rooted at an output directory.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
    class: StorageClass,
}

impl OutputDir {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            class: StorageClass::Output,
        }
    }

    #[must_use]
    pub fn with_storage_class(mut self, class: StorageClass) -> Self {
        self.class = class;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageStore for OutputDir {
    fn storage_class(&self) -> StorageClass {
        self.class
    }

    fn allocate(&self, prefix: &str, width: u32, height: u32) -> Result<SaveTarget> {
        let prefix = prefix
            .replace("%width%", &width.to_string())
            .replace("%height%", &height.to_string());
        let (subfolder, base_name) = split_prefix(&prefix)?;

        let directory = subfolder
            .iter()
            .fold(self.root.clone(), |dir, part| dir.join(part));
        let counter = if directory.is_dir() {
            next_counter(&directory, &base_name)?
        } else {
            fs::create_dir_all(&directory)
                .with_context(|| format!("failed to create {}", directory.display()))?;
            1
        };

        debug!(
            directory = %directory.display(),
            base_name = %base_name,
            counter,
            "allocated save target"
        );

        Ok(SaveTarget {
            directory,
            base_name,
            counter,
            subfolder: subfolder.join("/"),
        })
    }

    fn persist(&self, target: &SaveTarget, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = target.directory.join(filename);
        fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
        debug!(path = %path.display(), bytes = bytes.len(), "persisted image");
        Ok(path)
    }
}

/// Split a prefix such as `renders/night/shot` into its normalized folder
/// parts and base name. Parent references may not climb above the root.
fn split_prefix(prefix: &str) -> Result<(Vec<String>, String)> {
    let mut parts: Vec<String> = Vec::new();
    for component in Path::new(prefix).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {},
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(Error::PathEscape {
                        path: PathBuf::from(prefix),
                    });
                }
            },
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::PathEscape {
                    path: PathBuf::from(prefix),
                });
            },
        }
    }
    let base_name = parts
        .pop()
        .with_context(|| format!("filename prefix {prefix:?} has no file name"))?;
    Ok((parts, base_name))
}

/// One past the highest counter used by `<base>_<digits>...` files in `dir`.
/// Matching files whose counter does not parse count as zero.
fn next_counter(dir: &Path, base_name: &str) -> Result<u32> {
    let stem = format!("{base_name}_");
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;

    let highest = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let rest = name.strip_prefix(&stem)?;
            let digits = rest.split('_').next().unwrap_or_default();
            Some(digits.parse::<u64>().unwrap_or(0))
        })
        .max();

    match highest {
        None => Ok(1),
        Some(n) => n
            .checked_add(1)
            .and_then(|next| u32::try_from(next).ok())
            .ok_or_else(|| Error::CounterExhausted {
                base_name: base_name.to_string(),
            }),
    }
}
