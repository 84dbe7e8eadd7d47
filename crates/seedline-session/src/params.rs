//! Session construction parameters and their resolution against the folder
//! layout and an optional on-disk `.torrent`.

use std::fs;
use std::path::{Path, PathBuf};

use seedline_torrent_core::{DecodeHints, FolderLayout, InfoHash, TorrentMetaInfo, decode_with_hints};
use tracing::debug;

use crate::error::{SessionError, SessionResult};

const TORRENT_SUFFIX: &str = ".torrent";
const FAST_RESUME_SUFFIX: &str = ".fastresume";

/// Caller-supplied values for a new session. Anything left `None` is filled
/// from the `.torrent` file or derived from the download folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionParams {
    /// Hex info hash.
    pub info_hash: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Tracker announce URL.
    pub tracker_url: Option<String>,
    /// Private flag; unknown is treated as private.
    pub private: Option<bool>,
    /// Location of the `.torrent` file.
    pub torrent_file: Option<PathBuf>,
    /// Location of the fast-resume file.
    pub fast_resume_file: Option<PathBuf>,
    /// Download target.
    pub data_path: Option<PathBuf>,
    /// Overrides the engine's download folder.
    pub download_dir: Option<PathBuf>,
}

impl SessionParams {
    /// Parameters seeded from a `.torrent` file on disk.
    #[must_use]
    pub fn from_torrent_file(path: impl Into<PathBuf>) -> Self {
        Self {
            torrent_file: Some(path.into()),
            ..Self::default()
        }
    }

    /// Set the hex info hash.
    #[must_use]
    pub fn with_info_hash(mut self, info_hash: impl Into<String>) -> Self {
        self.info_hash = Some(info_hash.into());
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the tracker URL.
    #[must_use]
    pub fn with_tracker_url(mut self, url: impl Into<String>) -> Self {
        self.tracker_url = Some(url.into());
        self
    }

    /// Set the private flag.
    #[must_use]
    pub const fn with_private(mut self, private: bool) -> Self {
        self.private = Some(private);
        self
    }

    /// Set the `.torrent` location.
    #[must_use]
    pub fn with_torrent_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.torrent_file = Some(path.into());
        self
    }

    /// Set the fast-resume location.
    #[must_use]
    pub fn with_fast_resume_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.fast_resume_file = Some(path.into());
        self
    }

    /// Set the download target.
    #[must_use]
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    /// Override the download folder.
    #[must_use]
    pub fn with_download_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(path.into());
        self
    }

    pub(crate) fn resolve(self, folders: &FolderLayout) -> SessionResult<Resolved> {
        let decoded = match self.torrent_file.as_deref() {
            Some(path) if path.exists() => Some(read_metainfo(path, &self)?),
            _ => None,
        };

        let name = self
            .name
            .or_else(|| decoded.as_ref().map(|meta| meta.name.clone()))
            .filter(|name| !name.is_empty())
            .ok_or(SessionError::Initialization { field: "name" })?;
        let tracker_url = self
            .tracker_url
            .or_else(|| decoded.as_ref().map(|meta| meta.tracker_url.clone()));
        let info_hash = match self.info_hash {
            Some(hex) => InfoHash::from_hex(&hex)
                .map_err(|_| SessionError::Initialization { field: "info_hash" })?,
            None => decoded
                .as_ref()
                .map(|meta| meta.info_hash)
                .ok_or(SessionError::Initialization { field: "info_hash" })?,
        };
        let private = self
            .private
            .or_else(|| decoded.as_ref().map(|meta| meta.private))
            .unwrap_or(true);

        let download_dir = self
            .download_dir
            .unwrap_or_else(|| folders.download_dir.clone());
        if download_dir.as_os_str().is_empty() {
            return Err(SessionError::Initialization {
                field: "download_dir",
            });
        }

        let paths = SessionPaths {
            fast_resume_file: self
                .fast_resume_file
                .unwrap_or_else(|| download_dir.join(format!("{name}{FAST_RESUME_SUFFIX}"))),
            data_path: self.data_path.unwrap_or_else(|| download_dir.join(&name)),
            torrent_file: self
                .torrent_file
                .unwrap_or_else(|| download_dir.join(format!("{name}{TORRENT_SUFFIX}"))),
        };
        debug!(
            info_hash = %info_hash,
            name = %name,
            from_metainfo = decoded.is_some(),
            "session parameters resolved"
        );

        Ok(Resolved {
            identity: SessionIdentity {
                info_hash,
                name,
                tracker_url,
                private,
            },
            paths,
            meta_info: decoded,
        })
    }
}

fn read_metainfo(path: &Path, params: &SessionParams) -> SessionResult<TorrentMetaInfo> {
    let bytes = fs::read(path).map_err(|source| SessionError::Io {
        operation: "params.read_torrent",
        path: path.to_path_buf(),
        source,
    })?;
    let hints = DecodeHints {
        name: params.name.clone(),
        tracker_url: params.tracker_url.clone(),
    };
    decode_with_hints(&bytes, &hints).map_err(|source| SessionError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Identity fixed at init and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// Content identifier.
    pub info_hash: InfoHash,
    /// Display name.
    pub name: String,
    /// Tracker announce URL, when known.
    pub tracker_url: Option<String>,
    /// Whether the torrent is private.
    pub private: bool,
}

/// Relocatable filesystem bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionPaths {
    pub(crate) torrent_file: PathBuf,
    pub(crate) fast_resume_file: PathBuf,
    pub(crate) data_path: PathBuf,
}

#[derive(Debug)]
pub(crate) struct Resolved {
    pub(crate) identity: SessionIdentity,
    pub(crate) paths: SessionPaths,
    pub(crate) meta_info: Option<TorrentMetaInfo>,
}
