use anyhow::Result;
use cidr_crab::aggregate::coalesce;
use clap::Args;
use log::info;

use crate::{input, output};

#[derive(Args, Clone, Debug, Default)]
pub struct Params {
    #[clap(flatten)]
    input: input::Params,

    #[clap(flatten)]
    output: output::Params,
}

pub fn handle(params: Params) -> Result<()> {
    let networks = input::read(&params.input)?;
    let (v4, v6) = coalesce(&networks);
    info!(
        "Aggregated {} inputs into {} IPv4 and {} IPv6 networks",
        networks.len(),
        v4.len(),
        v6.len()
    );

    let mut output = output::OutputWriter::open(&params.output)?;
    output.push_all(v4.iter().chain(v6.iter()))?;
    output.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assertor::*;

    use super::*;
    use crate::test_utils::tokens;

    #[test]
    fn merges_ranges_and_cidrs() -> anyhow::Result<()> {
        // given
        let file = tempfile::NamedTempFile::new()?;
        let params = Params {
            input: input::Params {
                targets: tokens(&["10.40.0.4/30", "2001:db8::/33", "10.40.0.0-10.40.0.3", "10.40.0.8/29", "2001:db8:8000::/33"]),
                ..Default::default()
            },
            output: output::Params {
                output: Some(file.path().to_path_buf()),
            },
        };

        // when
        handle(params)?;

        // then
        assert_that!(fs::read_to_string(file.path())?).is_equal_to("10.40.0.0/28\n2001:db8::/32\n".to_string());
        Ok(())
    }
}
