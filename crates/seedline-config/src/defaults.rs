//! Default values applied when a field is absent from the configuration file.

pub(crate) const DOWNLOAD_DIR: &str = "downloads/incomplete";
pub(crate) const UPLOADS_DIR: &str = "downloads/torrents";
pub(crate) const LOG_LEVEL: &str = "info";
pub(crate) const LOG_FORMAT: &str = "auto";
