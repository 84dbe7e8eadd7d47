use std::sync::Arc;

use seedline_config::SeedlineConfig;
use seedline_events::EventMulticaster;
use seedline_session::{SessionError, SessionParams, TorrentSession};
use seedline_torrent_core::EngineGateway;

use crate::cli::TorrentArgs;
use crate::error::{CliError, CliResult};
use crate::gateway::DetachedGateway;
use crate::output::render_layout;

pub(crate) fn handle_layout(args: &TorrentArgs, config: &SeedlineConfig) -> CliResult<()> {
    if !args.file.is_file() {
        return Err(CliError::validation(format!(
            "{} does not exist",
            args.file.display()
        )));
    }
    let session = resolve_session(args, config)?;
    println!("{}", render_layout(&session, &config.folder_layout()));
    Ok(())
}

pub(crate) fn resolve_session(
    args: &TorrentArgs,
    config: &SeedlineConfig,
) -> CliResult<Arc<TorrentSession>> {
    let engine: Arc<dyn EngineGateway> = Arc::new(DetachedGateway::new(config.folder_layout()));
    let events = EventMulticaster::from_current().map_err(CliError::failure)?;
    TorrentSession::init(SessionParams::from_torrent_file(&args.file), engine, events).map_err(
        |err| match err {
            SessionError::Decode { path, source } => CliError::validation(format!(
                "{} is not a valid torrent file: {source:?}",
                path.display()
            )),
            other => CliError::failure(other),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedline_config::FolderSettings;
    use seedline_test_support::fixtures::{MetainfoFixture, TempLayout};

    #[tokio::test]
    async fn resolves_companions_under_download_folder() -> anyhow::Result<()> {
        let layout = TempLayout::new()?;
        let folders = layout.folders();
        let fixture = MetainfoFixture::single_file("disc.iso", 10);
        let file = fixture.write_to(&layout.root().join("inbox"))?;
        let config = SeedlineConfig {
            folders: FolderSettings {
                download_dir: folders.download_dir.clone(),
                uploads_dir: folders.uploads_dir.clone(),
            },
            ..SeedlineConfig::default()
        };

        let session = resolve_session(&TorrentArgs { file: file.clone() }, &config)
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        assert_eq!(session.info_hash(), fixture.info_hash());
        assert_eq!(session.torrent_file(), file);
        assert_eq!(session.data_path(), folders.download_dir.join("disc.iso"));
        assert_eq!(
            session.fast_resume_file(),
            folders.download_dir.join("disc.iso.fastresume")
        );
        Ok(())
    }
}
