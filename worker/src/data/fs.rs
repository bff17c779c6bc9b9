use std::{
    convert::Infallible,
    fmt,
    fs::{self, File},
    io::{BufReader, Read, Seek},
    path::Path,
    str::FromStr,
};

use super::{DataErr, Result};

const LOCAL_PROTOCOL: &str = "file://";

/// A location of the form `protocol://host/path`, a bare path has an empty protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    /// The scheme including its `://` separator, like `hdfs://`.
    pub protocol: String,
    pub host: String,
    pub name: String,
}

impl Uri {
    /// Whether the uri points to the local filesystem.
    pub fn is_local(&self) -> bool {
        self.protocol.is_empty() || self.protocol == LOCAL_PROTOCOL
    }
}

impl FromStr for Uri {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let Some(sep) = s.find("://") else {
            return Ok(Self {
                protocol: String::new(),
                host: String::new(),
                name: s.to_string(),
            });
        };

        let (protocol, rest) = s.split_at(sep + 3);
        let (host, name) = match rest.find('/') {
            Some(i) => rest.split_at(i),
            None => (rest, ""),
        };

        Ok(Self {
            protocol: protocol.to_string(),
            host: host.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.protocol, self.host, self.name)
    }
}

/// A readable and seekable byte stream.
pub trait SeekStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekStream for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: Uri,
    pub size: u64,
    pub kind: FileKind,
}

/// A filesystem the input data can be read from.
pub trait FileSystem {
    /// Looks up the size and kind of the file at `uri`.
    fn path_info(&self, uri: &Uri) -> Result<FileInfo>;

    /// Opens the file at `uri` for reading.
    fn open_for_read(&self, uri: &Uri) -> Result<Box<dyn SeekStream>>;
}

/// Returns the filesystem that serves `uri`.
///
/// # Returns
/// An error if there's no filesystem for the protocol of `uri`.
pub fn get_instance(uri: &Uri) -> Result<Box<dyn FileSystem>> {
    if uri.is_local() {
        return Ok(Box::new(LocalFileSystem));
    }

    Err(DataErr::UnsupportedProtocol(uri.protocol.clone()))
}

/// The filesystem of this machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    fn path(uri: &Uri) -> Result<&Path> {
        if !uri.is_local() {
            return Err(DataErr::UnsupportedProtocol(uri.protocol.clone()));
        }

        Ok(Path::new(&uri.name))
    }
}

impl FileSystem for LocalFileSystem {
    fn path_info(&self, uri: &Uri) -> Result<FileInfo> {
        let meta = fs::metadata(Self::path(uri)?)?;
        let kind = if meta.is_dir() {
            FileKind::Directory
        } else {
            FileKind::File
        };

        Ok(FileInfo {
            path: uri.clone(),
            size: meta.len(),
            kind,
        })
    }

    fn open_for_read(&self, uri: &Uri) -> Result<Box<dyn SeekStream>> {
        let file = File::open(Self::path(uri)?)?;
        Ok(Box::new(BufReader::new(file)))
    }
}
