use anyhow::{Context, Result};
use cidr_crab::enumerate::SkipEdges;
use cidr_crab::filter;
use cidr_crab::shuffle::{shuffle, shuffle_with_ports};
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

    /// Leave out the first address of each coalesced block with at least two addresses
    #[arg(long)]
    skip_base: bool,

    /// Leave out the last address of each coalesced block with at least two addresses
    #[arg(long)]
    skip_broadcast: bool,

    /// Seed of the permutation, the same seed always yields the same order (default: random)
    #[arg(long, env = "CIDR_BUDDY_SEED")]
    seed: Option<u64>,

    /// Output every address once per port, as `host:port` (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    ports: Vec<u16>,
}

pub fn handle(params: Params) -> Result<()> {
    let networks = input::read(&params.input)?;
    let filter = filter::read(&params.filter)?;
    let seed = match params.seed {
        Some(seed) => seed,
        None => {
            let seed = rand::random();
            info!("Shuffling with random seed {}, pass --seed {} to repeat this order", seed, seed);
            seed
        }
    };
    let items = if params.ports.is_empty() {
        shuffle(&networks, seed)
    } else {
        shuffle_with_ports(&networks, &params.ports, seed)
    }
    .context("Input cannot be shuffled")?;
    info!("Shuffling over {} positions", items.domain());
    let items = items
        .skipping(SkipEdges {
            base: params.skip_base,
            broadcast: params.skip_broadcast,
        })
        .filter(move |it| filter.allows(&it.addr));

    let output = output::OutputWriter::open(&params.output)?;
    let count = pipe::to_output(items, &params.pipe, output)?;
    info!("Shuffled {} results", count);
    Ok(())
}
