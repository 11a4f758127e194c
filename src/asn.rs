use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use clap::Args;
use ipnet::IpNet;
use log::{debug, info};
use thiserror::Error;

use crate::family;

/// Source of the networks announced by an autonomous system. Results are treated exactly like
/// user-supplied networks.
pub trait AsnProvider {
    fn networks_for(&self, asn: u32) -> Vec<IpNet>;
}

/// AS number of tokens like `AS13335` or `as13335`.
pub fn parse_asn(value: &str) -> Option<u32> {
    let prefix = value.get(..2)?;
    if !prefix.eq_ignore_ascii_case("AS") {
        return None;
    }
    let number = &value[2..];
    if number.is_empty() || !number.bytes().all(|it| it.is_ascii_digit()) {
        return None;
    }
    number.parse().ok()
}

#[derive(Args, Clone, Debug, Default)]
#[group(id = "asn")]
pub struct Params {
    /// Prefix-to-AS table used to resolve `AS<number>` inputs.
    /// One mapping per line, either `<address> <prefix length> <AS>` (the routeviews pfx2as
    /// format) or `<CIDR> <AS>`, whitespace-separated, # at start of line to comment it out.
    /// Multi-origin entries (`13335_209`, `13335,209`) map the prefix to every listed AS.
    #[arg(long, env = "CIDR_BUDDY_ASN_TABLE")]
    pub asn_table: Option<PathBuf>,
}

/// In-memory prefix-to-AS table.
#[derive(Debug, Default, Clone)]
pub struct AsnTable {
    by_asn: HashMap<u32, Vec<IpNet>>,
}

impl AsnTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asn: u32, net: IpNet) {
        self.by_asn.entry(asn).or_default().push(net);
    }

    pub fn asn_count(&self) -> usize {
        self.by_asn.len()
    }
}

impl AsnProvider for AsnTable {
    fn networks_for(&self, asn: u32) -> Vec<IpNet> {
        self.by_asn.get(&asn).cloned().unwrap_or_default()
    }
}

#[derive(Error, Debug)]
pub enum AsnTableReadError {
    #[error("AS table file does not exist: `{0}`")]
    NoSuchFile(PathBuf),

    #[error("failed to open AS table file `{path}`")]
    FailedOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read a line from AS table file")]
    FailedRead { source: std::io::Error },

    #[error("invalid AS table entry on line {line_number}: `{line}`")]
    EntrySyntax { line_number: usize, line: String },
}

pub type AsnTableReadResult = Result<AsnTable, AsnTableReadError>;

/// Loads the table if one is configured.
pub fn read(params: &Params) -> Result<Option<AsnTable>, AsnTableReadError> {
    match &params.asn_table {
        None => Ok(None),
        Some(path) => {
            let table = read_from(path)?;
            info!("Loaded {} ASes from {:?}", table.asn_count(), path);
            Ok(Some(table))
        }
    }
}

pub fn read_from(path: &Path) -> AsnTableReadResult {
    use AsnTableReadError as E;

    if !path.is_file() {
        return Err(E::NoSuchFile(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|source| E::FailedOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let mut table = AsnTable::new();
    for (index, line_res) in BufReader::new(file).lines().enumerate() {
        let line = line_res.map_err(|source| E::FailedRead { source })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let syntax = || E::EntrySyntax {
            line_number: index + 1,
            line: line.clone(),
        };
        let (net, origins) = parse_line(trimmed).ok_or_else(syntax)?;
        for asn in origins {
            table.insert(asn, net);
        }
    }
    debug!("AS table {:?} maps {} ASes", path, table.asn_count());
    Ok(table)
}

fn parse_line(line: &str) -> Option<(IpNet, Vec<u32>)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let (net, origins) = match fields.as_slice() {
        [cidr, origins] => (family::parse_network(cidr)?, *origins),
        [addr, prefix, origins] => (family::parse_network(&format!("{}/{}", addr, prefix))?, *origins),
        _ => return None,
    };
    let origins = origins
        .split(|it| it == '_' || it == ',')
        .map(|it| it.trim_start_matches("AS").parse().ok())
        .collect::<Option<Vec<u32>>>()?;
    Some((net, origins))
}
