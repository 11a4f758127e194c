use std::{
    fs::File,
    io::{BufRead, BufReader},
    net::IpAddr,
    path::PathBuf,
};

use clap::Args;
use ipnet::IpNet;
use itertools::Itertools;
use log::debug;
use thiserror::Error;

use crate::aggregate::coalesce_all;
use crate::family::{self, Family};
use crate::range::int_span;

#[derive(Args, Clone, Debug, Default)]
#[group(id = "filter")]
pub struct Params {
    /// Only output addresses inside these IPs/CIDRs (comma-separated)
    #[arg(long = "match", value_delimiter = ',', conflicts_with_all = ["excluding", "exclude_file"])]
    pub matching: Vec<String>,

    /// Flatfile with IPs/CIDRs to match, one per line, # at start of line to comment it out
    #[arg(long, conflicts_with_all = ["excluding", "exclude_file"])]
    pub match_file: Option<PathBuf>,

    /// Never output addresses inside these IPs/CIDRs (comma-separated)
    #[arg(long = "exclude", value_delimiter = ',')]
    pub excluding: Vec<String>,

    /// Flatfile with IPs/CIDRs to exclude, same format as --match-file
    #[arg(long)]
    pub exclude_file: Option<PathBuf>,
}

/// Set of networks, coalesced so that membership is a binary search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSet {
    spans: Vec<(Family, u128, u128)>,
}

impl NetworkSet {
    pub fn new(entries: &[IpNet]) -> Self {
        let spans = coalesce_all(entries)
            .iter()
            .map(|net| {
                let (first, last) = int_span(net);
                (Family::of_net(net), first, last)
            })
            .collect();
        Self { spans }
    }

    pub fn contains(&self, query: &IpAddr) -> bool {
        let key = (Family::of(query), family::to_integer(query).0);
        let position = self
            .spans
            .partition_point(|(family, first, _)| (*family, *first) <= key);
        match position.checked_sub(1).map(|it| self.spans[it]) {
            Some((family, _, last)) => family == key.0 && key.1 <= last,
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressFilter {
    All,
    Match(NetworkSet),
    Exclude(NetworkSet),
}

impl AddressFilter {
    pub fn allows(&self, query: &IpAddr) -> bool {
        match self {
            AddressFilter::All => true,
            AddressFilter::Match(set) => set.contains(query),
            AddressFilter::Exclude(set) => !set.contains(query),
        }
    }
}

#[derive(Error, Debug)]
pub enum FilterReadError {
    #[error("filter file does not exist: `{0}`")]
    NoSuchFile(PathBuf),

    #[error("failed to open filter file `{path}`")]
    FailedOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read a line from filter file")]
    FailedRead { source: std::io::Error },

    #[error("invalid IP address or CIDR in filter: `{line}`")]
    EntrySyntax { line: String },
}

pub type FilterReadResult<T> = Result<T, FilterReadError>;

pub fn read(params: &Params) -> FilterReadResult<AddressFilter> {
    let mut matching = parse_entries(&params.matching)?;
    if let Some(path) = &params.match_file {
        matching.extend(read_from(path)?);
    }
    let mut excluding = parse_entries(&params.excluding)?;
    if let Some(path) = &params.exclude_file {
        excluding.extend(read_from(path)?);
    }

    debug!(
        "Filter: {} match entries, {} exclude entries",
        matching.len(),
        excluding.len()
    );
    let matching = NetworkSet::new(&matching);
    let excluding = NetworkSet::new(&excluding);
    let filter = if !matching.is_empty() {
        AddressFilter::Match(matching)
    } else if !excluding.is_empty() {
        AddressFilter::Exclude(excluding)
    } else {
        AddressFilter::All
    };
    Ok(filter)
}

fn parse_entries(entries: &[String]) -> FilterReadResult<Vec<IpNet>> {
    entries.iter().map(|it| parse_entry(it)).collect()
}

fn parse_entry(line: &str) -> FilterReadResult<IpNet> {
    family::parse_network(line).ok_or_else(|| FilterReadError::EntrySyntax {
        line: line.to_string(),
    })
}

fn read_from(path: &PathBuf) -> FilterReadResult<Vec<IpNet>> {
    use FilterReadError as E;

    if !path.is_file() {
        return Err(E::NoSuchFile(path.clone()));
    }

    let file = File::open(path).map_err(|source| E::FailedOpen {
        path: path.clone(),
        source,
    })?;
    let lines = BufReader::new(file)
        .lines()
        .map_ok(|line| line.trim().to_string())
        .filter_ok(|line| !line.starts_with('#') && !line.is_empty());

    let mut entries = vec![];
    for line_res in lines {
        match line_res {
            Err(source) => return Err(E::FailedRead { source }),
            Ok(line) => entries.push(parse_entry(&line)?),
        }
    }
    Ok(entries)
}
