//! Output renderers and formatting helpers for CLI commands.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::anyhow;
use seedline_fsops::PlaceholderReport;
use seedline_session::TorrentSession;
use seedline_torrent_core::{FolderLayout, TorrentMetaInfo};

use crate::cli::OutputFormat;
use crate::error::{CliError, CliResult};

pub(crate) fn render_metainfo(meta: &TorrentMetaInfo, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(meta)
            .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}"))),
        OutputFormat::Table => {
            let mut out = String::new();
            let _ = writeln!(out, "name: {}", meta.name);
            let _ = writeln!(out, "info hash: {}", meta.info_hash);
            let _ = writeln!(out, "tracker: {}", meta.tracker_url);
            let _ = writeln!(out, "private: {}", meta.private);
            if let Some(piece_length) = meta.piece_length {
                let _ = writeln!(out, "piece length: {}", format_bytes(piece_length));
            }
            let _ = writeln!(
                out,
                "layout: {}",
                if meta.is_multi_file() { "multi-file" } else { "single-file" }
            );
            let _ = writeln!(out, "total: {}", format_bytes(meta.total_size()));
            let _ = writeln!(out, "{:>5} {:>12} PATH", "INDEX", "SIZE");
            for entry in &meta.files {
                let _ = writeln!(
                    out,
                    "{:>5} {:>12} {}",
                    entry.index,
                    format_bytes(entry.size_bytes),
                    entry.path
                );
            }
            Ok(out.trim_end().to_string())
        }
    }
}

pub(crate) fn render_layout(session: &TorrentSession, folders: &FolderLayout) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "name: {}", session.name());
    let _ = writeln!(out, "info hash: {}", session.info_hash());
    let _ = writeln!(out, "torrent file: {}", session.torrent_file().display());
    if !folders.is_managed(&session.torrent_file()) {
        let _ = writeln!(
            out,
            "registered copy: {}",
            folders.download_path(session.name(), ".torrent").display()
        );
    }
    let _ = writeln!(out, "fast resume: {}", session.fast_resume_file().display());
    let _ = write!(out, "data: {}", session.data_path().display());
    out
}

pub(crate) fn render_report(report: &PlaceholderReport, root: &Path) -> String {
    format!(
        "{}: {} created, {} existing, {} failed",
        root.display(),
        report.created,
        report.existing,
        report.failed
    )
}

pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let value = bytes_to_f64(bytes);
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.2} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}
