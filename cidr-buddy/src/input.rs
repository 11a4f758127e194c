use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal};
use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use cidr_crab::asn::{self, AsnProvider};
use cidr_crab::family::{self, Family};
use cidr_crab::range::cidrs_from_range;
use cidr_crab::AlgebraError;
use clap::Args;
use ipnet::IpNet;
use itertools::Itertools;
use log::{debug, info, warn};
use thiserror::Error;

#[derive(Args, Clone, Debug, Default)]
#[group(id = "input")]
pub struct Params {
    /// IPs, CIDRs, ranges (`first-last`) or AS numbers (`AS13335`).
    /// If none are given (and no --input-file), they are read from stdin, one per line.
    pub targets: Vec<String>,

    /// Flatfile with one target per line, # at start of line to comment it out
    #[arg(short = 'l', long)]
    pub input_file: Option<PathBuf>,

    /// Only keep IPv4 inputs
    #[arg(short = '4', long = "v4-only", conflicts_with = "v6_only")]
    pub v4_only: bool,

    /// Only keep IPv6 inputs
    #[arg(short = '6', long = "v6-only")]
    pub v6_only: bool,

    #[clap(flatten)]
    pub asn: asn::Params,
}

impl Params {
    fn family(&self) -> Option<Family> {
        match (self.v4_only, self.v6_only) {
            (true, _) => Some(Family::V4),
            (_, true) => Some(Family::V6),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("not an IP, CIDR, range or AS number: `{token}`")]
    Malformed { token: String },

    #[error("invalid range `{token}`")]
    Range { token: String, source: AlgebraError },

    #[error("`{token}` is an AS number, but no AS table was given (--asn-table)")]
    NoAsnTable { token: String },
}

/// Collects all configured inputs as networks, in input order.
pub fn read(params: &Params) -> Result<Vec<IpNet>> {
    let mut tokens = params.targets.clone();
    if let Some(path) = &params.input_file {
        tokens.extend(read_lines(
            BufReader::new(File::open(path).with_context(|| format!("Failed to open input file {:?}", path))?),
        )?);
    }
    if tokens.is_empty() {
        let stdin = io::stdin();
        if stdin.is_terminal() {
            warn!("No targets given, reading them from the terminal (end with Ctrl-D)");
        }
        tokens.extend(read_lines(stdin.lock())?);
    }

    let asn_table = asn::read(&params.asn).context("Failed to load AS table")?;
    let provider = asn_table.as_ref().map(|it| it as &dyn AsnProvider);
    let networks = parse_tokens(&tokens, provider)?;
    Ok(keep_family(networks, params.family()))
}

fn read_lines(reader: impl BufRead) -> Result<Vec<String>> {
    let lines: Vec<String> = reader
        .lines()
        .map_ok(|line| line.trim().to_string())
        .filter_ok(|line| !line.starts_with('#') && !line.is_empty())
        .collect::<Result<_, _>>()
        .context("Failed to read input line")?;
    debug!("Read {} input lines", lines.len());
    Ok(lines)
}

pub fn parse_tokens(tokens: &[String], provider: Option<&dyn AsnProvider>) -> Result<Vec<IpNet>, InputError> {
    let mut networks = vec![];
    for token in tokens {
        networks.extend(parse_token(token, provider)?);
    }
    Ok(networks)
}

/// Normalizes a single input token: an IP becomes a host route, a CIDR has its host bits
/// truncated, a range is decomposed and an AS number is resolved through `provider`.
pub fn parse_token(token: &str, provider: Option<&dyn AsnProvider>) -> Result<Vec<IpNet>, InputError> {
    let token = token.trim();
    if let Some(net) = family::parse_network(token) {
        return Ok(vec![net]);
    }
    if let Some(asn) = asn::parse_asn(token) {
        let provider = provider.ok_or_else(|| InputError::NoAsnTable {
            token: token.to_string(),
        })?;
        let networks = provider.networks_for(asn);
        if networks.is_empty() {
            warn!("AS{} has no known networks", asn);
        } else {
            info!("AS{} resolved to {} networks", asn, networks.len());
        }
        return Ok(networks);
    }
    if let Some((first, last)) = token.split_once('-') {
        return parse_range(token, first, last);
    }
    Err(InputError::Malformed {
        token: token.to_string(),
    })
}

fn parse_range(token: &str, first: &str, last: &str) -> Result<Vec<IpNet>, InputError> {
    let malformed = || InputError::Malformed {
        token: token.to_string(),
    };
    let first: IpAddr = first.trim().parse().map_err(|_| malformed())?;
    let last: IpAddr = last.trim().parse().map_err(|_| malformed())?;
    cidrs_from_range(first, last).map_err(|source| InputError::Range {
        token: token.to_string(),
        source,
    })
}

fn keep_family(networks: Vec<IpNet>, family: Option<Family>) -> Vec<IpNet> {
    match family {
        None => networks,
        Some(family) => {
            let before = networks.len();
            let kept: Vec<IpNet> = networks
                .into_iter()
                .filter(|it| Family::of_net(it) == family)
                .collect();
            debug!("Kept {} of {} inputs for {}", kept.len(), before, family);
            kept
        }
    }
}
