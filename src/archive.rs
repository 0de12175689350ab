//! Download and unpack of the compressed world content archives.

use std::io::{self, Cursor, Write};

use zip::ZipArchive;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("download failed: {0}")]
    Transfer(#[from] reqwest::Error),

    #[error("download failed: HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("payload is not a valid zip archive: {0}")]
    Format(#[from] zip::result::ZipError),

    #[error("archive has no entry named {0:?}")]
    MissingEntry(String),

    #[error("failed to extract entry: {0}")]
    Io(#[from] io::Error),
}

/// A downloaded archive whose entries can be listed and extracted one at a
/// time without unpacking the rest.
pub struct ContentArchive {
    zip: ZipArchive<Cursor<Vec<u8>>>,
}

impl ContentArchive {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ArchiveError> {
        Ok(Self {
            zip: ZipArchive::new(Cursor::new(bytes))?,
        })
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.zip.file_names()
    }

    /// Stream a single entry into `out`, returning the number of bytes
    /// written.
    pub fn extract_entry<W: Write>(&mut self, name: &str, out: &mut W) -> Result<u64, ArchiveError> {
        let mut entry = match self.zip.by_name(name) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(ArchiveError::MissingEntry(name.to_owned()))
            }
            Err(e) => return Err(ArchiveError::Format(e)),
        };
        Ok(io::copy(&mut entry, out)?)
    }
}

/// Fetch a compressed archive over HTTPS.
///
/// Zip central directories require `Seek`, so the body is buffered in full
/// before parsing. World content archives are tens of megabytes, which is an
/// accepted cost for this daemon.
pub async fn fetch(http: &reqwest::Client, url: &str) -> Result<ContentArchive, ArchiveError> {
    let response = http.get(url).send().await?;

    if !response.status().is_success() {
        return Err(ArchiveError::Status(response.status()));
    }

    let bytes = response.bytes().await?;
    ContentArchive::from_bytes(bytes.to_vec())
}
