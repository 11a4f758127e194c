use anyhow::Result;
use cidr_crab::count::count_addresses;
use clap::Args;

use crate::{input, output};

#[derive(Args, Clone, Debug, Default)]
pub struct Params {
    #[clap(flatten)]
    input: input::Params,

    #[clap(flatten)]
    output: output::Params,

    /// Do not count the first address of each block with at least two addresses
    #[arg(long)]
    skip_base: bool,

    /// Do not count the last address of each block with at least two addresses
    #[arg(long)]
    skip_broadcast: bool,
}

pub fn handle(params: Params) -> Result<()> {
    let networks = input::read(&params.input)?;
    let total = count_addresses(!params.skip_base, !params.skip_broadcast, &networks);

    let mut output = output::OutputWriter::open(&params.output)?;
    output.push(total)?;
    output.finish()?;
    Ok(())
}
