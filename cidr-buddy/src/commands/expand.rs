use anyhow::Result;
use cidr_crab::aggregate::sort_networks;
use cidr_crab::enumerate::{addresses, SkipEdges};
use cidr_crab::filter;
use clap::Args;
use log::info;

use crate::{input, output, pipe};

#[derive(Args, Clone, Debug, Default)]
pub struct Params {
    #[clap(flatten)]
    input: input::Params,

    #[clap(flatten)]
    output: output::Params,

    #[clap(flatten)]
    pipe: pipe::Params,

    #[clap(flatten)]
    filter: filter::Params,

    /// Leave out the first address of each block with at least two addresses
    #[arg(long)]
    skip_base: bool,

    /// Leave out the last address of each block with at least two addresses
    #[arg(long)]
    skip_broadcast: bool,
}

pub fn handle(params: Params) -> Result<()> {
    let networks = sort_networks(input::read(&params.input)?, false);
    let filter = filter::read(&params.filter)?;
    let skip = SkipEdges {
        base: params.skip_base,
        broadcast: params.skip_broadcast,
    };
    let items = addresses(networks, skip).filter(move |addr| filter.allows(addr));

    let output = output::OutputWriter::open(&params.output)?;
    let count = pipe::to_output(items, &params.pipe, output)?;
    info!("Expanded to {} addresses", count);
    Ok(())
}
