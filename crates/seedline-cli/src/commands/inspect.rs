use crate::cli::InspectArgs;
use crate::commands::read_metainfo;
use crate::error::CliResult;
use crate::output::render_metainfo;

pub(crate) fn handle_inspect(args: &InspectArgs) -> CliResult<()> {
    let meta = read_metainfo(&args.file)?;
    println!("{}", render_metainfo(&meta, args.format)?);
    Ok(())
}
