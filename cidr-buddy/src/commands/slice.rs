use anyhow::{Context, Result};
use cidr_crab::prefix_split::{split_subnets, split_subnets_by_host_count, SplitSubnets};
use clap::Args;
use ipnet::IpNet;
use log::debug;

use crate::{input, output};

#[derive(Args, Clone, Debug)]
pub struct Params {
    #[clap(flatten)]
    input: input::Params,

    #[clap(flatten)]
    output: output::Params,

    #[clap(flatten)]
    by: SliceBy,
}

#[derive(Args, Clone, Debug)]
#[group(required = true, multiple = false)]
pub struct SliceBy {
    /// Split each target into exactly this many subnets
    #[arg(short = 'c', long)]
    count: Option<usize>,

    /// Split each target into subnets of about this many addresses
    #[arg(long)]
    hosts: Option<u128>,
}

pub fn handle(params: Params) -> Result<()> {
    let networks = input::read(&params.input)?;
    let mut output = output::OutputWriter::open(&params.output)?;
    for net in networks {
        let subnets = slice(net, &params.by).with_context(|| format!("while slicing {}", net))?;
        debug!("Slicing {} into {} subnets", net, subnets.len());
        output.push_all(subnets)?;
    }
    output.finish()?;
    Ok(())
}

fn slice(net: IpNet, by: &SliceBy) -> Result<SplitSubnets> {
    let subnets = match (by.count, by.hosts) {
        (Some(count), _) => split_subnets(net, count)?,
        (None, Some(hosts)) => split_subnets_by_host_count(net, hosts)?,
        // clap requires one of both
        (None, None) => split_subnets(net, 1)?,
    };
    Ok(subnets)
}
