use ipnet::IpNet;
use num_bigint::BigUint;

use crate::range::{address_count_big, host_bits};

/// Sums the address counts of all networks with arbitrary precision. Without `include_base`
/// or `include_broadcast`, the first or last address is excluded for every network that
/// has at least two addresses. Host routes always count as one.
///
/// Networks are not deduplicated, so overlapping inputs are counted once per occurrence.
pub fn count_addresses(include_base: bool, include_broadcast: bool, networks: &[IpNet]) -> BigUint {
    networks
        .iter()
        .map(|net| count_one(include_base, include_broadcast, net))
        .sum()
}

fn count_one(include_base: bool, include_broadcast: bool, net: &IpNet) -> BigUint {
    let mut count = address_count_big(net);
    if host_bits(net) == 0 {
        return count;
    }
    let excluded = u8::from(!include_base) + u8::from(!include_broadcast);
    count -= excluded;
    count
}
