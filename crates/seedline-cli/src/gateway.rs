//! Engine gateway with no engine behind it.

use anyhow::bail;
use async_trait::async_trait;
use seedline_torrent_core::{EngineGateway, FolderLayout, InfoHash, TorrentRegistration};

/// Reports itself invalid and refuses registration; only the folder layout is
/// real. Lets the CLI resolve sessions without a running engine.
pub(crate) struct DetachedGateway {
    folders: FolderLayout,
}

impl DetachedGateway {
    pub(crate) const fn new(folders: FolderLayout) -> Self {
        Self { folders }
    }
}

#[async_trait]
impl EngineGateway for DetachedGateway {
    fn is_valid(&self) -> bool {
        false
    }

    fn folders(&self) -> FolderLayout {
        self.folders.clone()
    }

    async fn register_torrent(&self, _registration: TorrentRegistration) -> anyhow::Result<()> {
        bail!("no engine attached")
    }

    async fn remove_torrent(&self, _info_hash: &InfoHash) -> anyhow::Result<()> {
        bail!("no engine attached")
    }
}
