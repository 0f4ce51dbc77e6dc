// src/asset/types.rs
use crate::cert::CertError;
use crate::utils::logging::Logger;
use std::{
    fmt,
    fs::{self, DirBuilder, OpenOptions},
    io::{self, Write},
    path::{Component, Path},
};

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};

const DIR_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o600;

#[derive(Debug)]
pub enum AssetError {
    NotFound(String),
    Duplicate(String),
    UnknownAsset(String),
    UnresolvedDependency { asset: String, missing: String },
    DependencyCycle(Vec<String>),
    Config(String),
    Template(String),
    Encoding(String),
    Certificate(CertError),
    Io(io::Error),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "asset {:?} does not exist", name),
            Self::Duplicate(name) => write!(f, "asset {:?} produced more than once", name),
            Self::UnknownAsset(name) => write!(f, "asset {:?} is not part of the bundle layout", name),
            Self::UnresolvedDependency { asset, missing } => write!(
                f,
                "asset {:?} requires {:?}, which no stage produces",
                asset, missing
            ),
            Self::DependencyCycle(names) => {
                write!(f, "assets {} depend on each other", names.join(", "))
            }
            Self::Config(s) => write!(f, "configuration error: {}", s),
            Self::Template(s) => write!(f, "template error: {}", s),
            Self::Encoding(s) => write!(f, "encoding error: {}", s),
            Self::Certificate(e) => write!(f, "{}", e),
            Self::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Certificate(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CertError> for AssetError {
    fn from(error: CertError) -> Self {
        AssetError::Certificate(error)
    }
}

impl From<io::Error> for AssetError {
    fn from(error: io::Error) -> Self {
        AssetError::Io(error)
    }
}

impl From<minijinja::Error> for AssetError {
    fn from(error: minijinja::Error) -> Self {
        AssetError::Template(error.to_string())
    }
}

impl From<serde_yaml::Error> for AssetError {
    fn from(error: serde_yaml::Error) -> Self {
        AssetError::Encoding(error.to_string())
    }
}

impl From<AssetError> for io::Error {
    fn from(error: AssetError) -> Self {
        let kind = match &error {
            AssetError::NotFound(_) => io::ErrorKind::NotFound,
            AssetError::Config(_) => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::Other,
        };
        match error {
            AssetError::Io(e) => e,
            AssetError::Certificate(e) => e.into(),
            other => io::Error::new(kind, other.to_string()),
        }
    }
}

/// A named byte blob. The name is the path relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    name: String,
    data: Vec<u8>,
}

impl Asset {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assets(Vec<Asset>);

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Result<&Asset, AssetError> {
        self.0
            .iter()
            .find(|asset| asset.name == name)
            .ok_or_else(|| AssetError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|asset| asset.name == name)
    }

    pub fn push(&mut self, asset: Asset) {
        self.0.push(asset);
    }

    pub fn append(&mut self, other: Assets) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Asset> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(Asset::name).collect()
    }

    pub fn ensure_unique(&self) -> Result<(), AssetError> {
        for (i, asset) in self.0.iter().enumerate() {
            if self.0[..i].iter().any(|earlier| earlier.name == asset.name) {
                return Err(AssetError::Duplicate(asset.name.clone()));
            }
        }
        Ok(())
    }

    /// Creates `path` (which must not exist yet) and writes every asset below it.
    ///
    /// Not transactional: a failure part way leaves the files written so far
    /// in place, and the caller has to remove the whole directory before
    /// retrying.
    pub fn write_files(&self, path: impl AsRef<Path>, logger: &mut dyn Logger) -> io::Result<()> {
        let root = path.as_ref();
        create_dir(root, false)?;
        set_dir_permissions(root)?;

        for asset in &self.0 {
            let relative = checked_relative(&asset.name)?;
            let f = root.join(relative);
            if let Some(parent) = f.parent() {
                create_dir(parent, true)?;
                for dir in parent.ancestors().take_while(|d| *d != root) {
                    set_dir_permissions(dir)?;
                }
            }
            logger.log(&format!("Writing asset: {}", f.display()));
            write_private_file(&f, &asset.data)?;
        }
        Ok(())
    }
}

impl FromIterator<Asset> for Assets {
    fn from_iter<I: IntoIterator<Item = Asset>>(iter: I) -> Self {
        Assets(iter.into_iter().collect())
    }
}

impl IntoIterator for Assets {
    type Item = Asset;
    type IntoIter = std::vec::IntoIter<Asset>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Assets {
    type Item = &'a Asset;
    type IntoIter = std::slice::Iter<'a, Asset>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn checked_relative(name: &str) -> io::Result<&Path> {
    let path = Path::new(name);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if name.is_empty() || escapes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("asset name {:?} is not a relative path inside the output directory", name),
        ));
    }
    Ok(path)
}

fn create_dir(path: &Path, recursive: bool) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(recursive);
    #[cfg(unix)]
    builder.mode(DIR_MODE);
    builder.create(path)
}

// DirBuilder's mode is filtered through the umask.
fn set_dir_permissions(_path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    fs::set_permissions(_path, fs::Permissions::from_mode(DIR_MODE))?;
    Ok(())
}

fn write_private_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(FILE_MODE);

    let mut file = options.open(path)?;
    // mode only applies on creation
    #[cfg(unix)]
    file.set_permissions(fs::Permissions::from_mode(FILE_MODE))?;
    file.write_all(data)?;
    file.sync_all()
}
