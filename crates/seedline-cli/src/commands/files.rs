use seedline_config::SeedlineConfig;
use seedline_fsops::FileEntryManager;
use tracing::info;

use crate::cli::TorrentArgs;
use crate::commands::read_metainfo;
use crate::error::CliResult;
use crate::output::render_report;

pub(crate) fn handle_init_files(args: &TorrentArgs, config: &SeedlineConfig) -> CliResult<()> {
    let meta = read_metainfo(&args.file)?;
    let manager = FileEntryManager::new(config.folders.download_dir.clone());
    let report = manager.ensure_placeholders(&meta.files);
    info!(
        info_hash = %meta.info_hash,
        created = report.created,
        "placeholders prepared"
    );
    println!("{}", render_report(&report, manager.root()));
    Ok(())
}
