use std::net::{IpAddr, Ipv4Addr};

use ipnet::{IpAddrRange, IpNet, Ipv4AddrRange, Ipv6AddrRange};

use crate::family;
use crate::range::{host_bits, int_span};

/// Which edge addresses to leave out of each network with at least two addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkipEdges {
    pub base: bool,
    pub broadcast: bool,
}

impl SkipEdges {
    /// Whether `addr` is an edge of `net` that should be left out.
    pub fn skips(&self, net: &IpNet, addr: &IpAddr) -> bool {
        if host_bits(net) == 0 {
            return false;
        }
        let (first, last) = int_span(net);
        let (value, _) = family::to_integer(addr);
        (self.base && value == first) || (self.broadcast && value == last)
    }
}

/// All addresses of a single network in ascending order, optionally without its edges.
pub fn network_addresses(net: &IpNet, skip: SkipEdges) -> IpAddrRange {
    let (mut first, mut last) = int_span(net);
    if host_bits(net) > 0 {
        if skip.base {
            first += 1;
        }
        if skip.broadcast {
            last -= 1;
        }
    }
    match (family::from_integer(first, net.max_prefix_len()), family::from_integer(last, net.max_prefix_len())) {
        (Ok(IpAddr::V4(first)), Ok(IpAddr::V4(last))) => IpAddrRange::from(Ipv4AddrRange::new(first, last)),
        (Ok(IpAddr::V6(first)), Ok(IpAddr::V6(last))) => IpAddrRange::from(Ipv6AddrRange::new(first, last)),
        // both ends stay inside the network, so this is never hit
        _ => IpAddrRange::from(Ipv4AddrRange::new(Ipv4Addr::BROADCAST, Ipv4Addr::UNSPECIFIED)),
    }
}

/// Lazily enumerates every address of every network in the given order. Networks are not
/// coalesced first, so overlapping inputs produce repeated addresses.
pub fn addresses(networks: Vec<IpNet>, skip: SkipEdges) -> impl Iterator<Item = IpAddr> + Send + 'static {
    networks
        .into_iter()
        .flat_map(move |net| network_addresses(&net, skip))
}
