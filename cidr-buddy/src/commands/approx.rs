use anyhow::Result;
use cidr_crab::aggregate::{aggregate_approx, ApproxBuckets};
use clap::Args;
use log::info;

use crate::{input, output};

#[derive(Args, Clone, Debug)]
pub struct Params {
    #[clap(flatten)]
    input: input::Params,

    #[clap(flatten)]
    output: output::Params,

    /// IPv4 targets inside the same network of this prefix length are merged
    #[arg(long, default_value_t = 24)]
    v4_bucket: u8,

    /// IPv6 targets inside the same network of this prefix length are merged
    #[arg(long, default_value_t = 64)]
    v6_bucket: u8,
}

pub fn handle(params: Params) -> Result<()> {
    let networks = input::read(&params.input)?;
    let buckets = ApproxBuckets {
        v4_prefix: params.v4_bucket,
        v6_prefix: params.v6_bucket,
    };
    let approximated = aggregate_approx(&networks, buckets)?;
    info!("Approximated {} inputs with {} networks", networks.len(), approximated.len());

    let mut output = output::OutputWriter::open(&params.output)?;
    output.push_all(&approximated)?;
    output.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assertor::*;
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[clap(flatten)]
        params: Params,
    }

    #[test]
    fn scattered_hosts_become_one_block() -> anyhow::Result<()> {
        // given
        let file = tempfile::NamedTempFile::new()?;
        let path = file.path().to_string_lossy().to_string();
        let cli = TestCli::parse_from(["test", "1.1.1.1", "1.1.1.31", "1.1.9.9", "--v4-bucket", "16", "-o", path.as_str()]);

        // when
        handle(cli.params)?;

        // then
        assert_that!(fs::read_to_string(file.path())?).is_equal_to("1.1.0.0/20\n".to_string());
        Ok(())
    }

    #[test]
    fn invalid_bucket_fails() {
        let cli = TestCli::parse_from(["test", "1.1.1.1", "--v4-bucket", "40"]);
        assert_that!(handle(cli.params)).is_err();
    }
}
