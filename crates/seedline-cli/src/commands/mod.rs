//! Subcommand handlers.

mod files;
mod inspect;
mod layout;

use std::fs;
use std::io;
use std::path::Path;

use seedline_torrent_core::{TorrentMetaInfo, decode};

use crate::error::{CliError, CliResult};

pub(crate) use files::handle_init_files;
pub(crate) use inspect::handle_inspect;
pub(crate) use layout::handle_layout;

pub(crate) fn read_metainfo(path: &Path) -> CliResult<TorrentMetaInfo> {
    let bytes = fs::read(path).map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            CliError::validation(format!("{} does not exist", path.display()))
        } else {
            CliError::failure(anyhow::Error::new(err).context(format!("failed to read {}", path.display())))
        }
    })?;
    decode(&bytes).map_err(|err| {
        CliError::validation(format!("{} is not a valid torrent file: {err:?}", path.display()))
    })
}
