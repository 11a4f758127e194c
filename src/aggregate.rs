use std::collections::BTreeMap;
use std::net::IpAddr;

use ipnet::IpNet;
use log::debug;

use crate::error::{AlgebraError, AlgebraResult};
use crate::family::{self, Family};
use crate::range::{decompose, int_span};

/// Merges an arbitrary collection of networks into the minimal set of non-overlapping networks
/// covering exactly the same addresses. Returns the IPv4 and IPv6 results separately, each in
/// ascending address order.
///
/// Every input is treated as an integer interval; overlapping and adjacent intervals are merged
/// in one sweep over the sorted list, and each merged interval is decomposed into CIDRs again.
pub fn coalesce(networks: &[IpNet]) -> (Vec<IpNet>, Vec<IpNet>) {
    let (v4, v6): (Vec<IpNet>, Vec<IpNet>) = networks
        .iter()
        .copied()
        .partition(|it| Family::of_net(it) == Family::V4);
    (coalesce_family(&v4, Family::V4), coalesce_family(&v6, Family::V6))
}

/// [coalesce] with both families concatenated, IPv4 first.
pub fn coalesce_all(networks: &[IpNet]) -> Vec<IpNet> {
    let (mut v4, v6) = coalesce(networks);
    v4.extend(v6);
    v4
}

fn coalesce_family(networks: &[IpNet], family: Family) -> Vec<IpNet> {
    let spans = networks.iter().map(int_span).collect();
    merge_spans(spans)
        .into_iter()
        .flat_map(|(first, last)| decompose(first, last, family))
        .collect()
}

fn merge_spans(mut spans: Vec<(u128, u128)>) -> Vec<(u128, u128)> {
    spans.sort_unstable();
    let mut merged: Vec<(u128, u128)> = Vec::with_capacity(spans.len());
    for (first, last) in spans {
        match merged.last_mut() {
            // no successor means the previous span already reaches the top of the space
            Some((_, prev_last)) if prev_last.checked_add(1).map_or(true, |next| first <= next) => {
                *prev_last = (*prev_last).max(last);
            }
            _ => merged.push((first, last)),
        }
    }
    merged
}

/// Granularity of [aggregate_approx]: networks inside the same bucket are replaced by their
/// smallest common supernet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApproxBuckets {
    pub v4_prefix: u8,
    pub v6_prefix: u8,
}

impl Default for ApproxBuckets {
    fn default() -> Self {
        Self {
            v4_prefix: 24,
            v6_prefix: 64,
        }
    }
}

impl ApproxBuckets {
    fn prefix_for(&self, family: Family) -> AlgebraResult<u8> {
        let prefix = match family {
            Family::V4 => self.v4_prefix,
            Family::V6 => self.v6_prefix,
        };
        if prefix > family.bits() {
            return Err(AlgebraError::InvalidPrefix { prefix, family });
        }
        Ok(prefix)
    }
}

/// Approximate covering for sparse inputs such as scattered host addresses. All networks that
/// fall into the same bucket are rounded up to the smallest network containing the whole
/// observed spread of that bucket. Networks broader than a bucket are kept as-is.
///
/// The result always covers the input, may cover additional addresses, and is coalesced and
/// sorted (IPv4 first).
pub fn aggregate_approx(networks: &[IpNet], buckets: ApproxBuckets) -> AlgebraResult<Vec<IpNet>> {
    let (v4, v6) = coalesce(networks);
    let mut result = approx_family(&v4, buckets.prefix_for(Family::V4)?)?;
    result.extend(approx_family(&v6, buckets.prefix_for(Family::V6)?)?);
    let approximated = coalesce_all(&result);
    debug!(
        "Approximated {} networks with {} networks",
        networks.len(),
        approximated.len()
    );
    Ok(approximated)
}

fn approx_family(networks: &[IpNet], bucket_prefix: u8) -> AlgebraResult<Vec<IpNet>> {
    let mut result = vec![];
    let mut spreads: BTreeMap<IpNet, (IpAddr, IpAddr)> = BTreeMap::new();
    for net in networks {
        if net.prefix_len() < bucket_prefix {
            result.push(*net);
            continue;
        }
        let bucket = family::network(net.network(), bucket_prefix)?;
        let spread = spreads
            .entry(bucket)
            .or_insert((net.network(), net.broadcast()));
        // inputs are coalesced and therefore sorted, so only the upper end moves
        spread.1 = net.broadcast();
    }
    for (first, last) in spreads.into_values() {
        result.push(family::common_supernet(&first, &last)?);
    }
    Ok(result)
}

/// Sorts networks by family, then base address, then prefix length. With `reverse`, the
/// order is descending instead.
pub fn sort_networks(mut networks: Vec<IpNet>, reverse: bool) -> Vec<IpNet> {
    networks.sort_by_key(|it| (Family::of_net(it), int_span(it).0, it.prefix_len()));
    if reverse {
        networks.reverse();
    }
    networks
}
