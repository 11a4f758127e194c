use anyhow::Result;
use cidr_crab::aggregate::sort_networks;
use clap::Args;

use crate::{input, output};

#[derive(Args, Clone, Debug, Default)]
pub struct Params {
    #[clap(flatten)]
    input: input::Params,

    #[clap(flatten)]
    output: output::Params,

    /// Sort in descending order
    #[arg(short, long)]
    reverse: bool,
}

pub fn handle(params: Params) -> Result<()> {
    let networks = sort_networks(input::read(&params.input)?, params.reverse);

    let mut output = output::OutputWriter::open(&params.output)?;
    output.push_all(&networks)?;
    output.finish()?;
    Ok(())
}
