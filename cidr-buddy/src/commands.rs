use anyhow::Result;
use clap::Subcommand;
use log::debug;

mod aggregate;
mod approx;
mod count;
mod expand;
mod shuffle;
mod slice;
mod sort;

pub fn handle(cmd: Commands) -> Result<()> {
    let command_result = match cmd {
        Commands::Expand(data) => expand::handle(data),
        Commands::Slice(data) => slice::handle(data),
        Commands::Aggregate(data) => aggregate::handle(data),
        Commands::Approx(data) => approx::handle(data),
        Commands::Count(data) => count::handle(data),
        Commands::Sort(data) => sort::handle(data),
        Commands::Shuffle(data) => shuffle::handle(data),
    };
    debug!("Finished command execution. Result: {:?}", command_result);
    command_result
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print every address of the targets, in ascending order.
    Expand(expand::Params),

    /// Split each target into a number of subnets, or into subnets of a given size.
    Slice(slice::Params),

    /// Merge the targets into the minimal set of CIDRs covering exactly the same addresses.
    Aggregate(aggregate::Params),

    /// Merge sparse targets into few CIDRs that cover them, possibly with extra addresses.
    Approx(approx::Params),

    /// Count the addresses of the targets (duplicates count twice).
    Count(count::Params),

    /// Sort the targets by address.
    Sort(sort::Params),

    /// Print every address of the targets exactly once, in a seeded random order.
    Shuffle(shuffle::Params),
}
