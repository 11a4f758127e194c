use std::fmt::{Display, Formatter};
use std::net::IpAddr;

use ipnet::IpNet;
use num_bigint::BigUint;

use crate::error::{AlgebraError, AlgebraResult};
use crate::family::{self, Family};

/// Number of host bits of a network, i.e. bit width minus prefix length.
pub fn host_bits(net: &IpNet) -> u8 {
    net.max_prefix_len() - net.prefix_len()
}

/// All-ones mask covering the lowest `bits` bits.
pub(crate) fn low_mask(bits: u8) -> u128 {
    match bits {
        0 => 0,
        128..=u8::MAX => u128::MAX,
        _ => (1u128 << bits) - 1,
    }
}

/// First and last address of a network as integers. The base is re-masked, so this is
/// also correct for networks that were constructed with host bits set.
pub(crate) fn int_span(net: &IpNet) -> (u128, u128) {
    let (base, _) = family::to_integer(&net.addr());
    let mask = low_mask(host_bits(net));
    let first = base & !mask;
    (first, first | mask)
}

/// First and last address of the given network. For host routes both are the base address.
pub fn address_range(net: &IpNet) -> (IpAddr, IpAddr) {
    let (first, last) = int_span(net);
    let bits = net.max_prefix_len();
    // both values are within the family width by construction
    match (family::from_integer(first, bits), family::from_integer(last, bits)) {
        (Ok(first), Ok(last)) => (first, last),
        _ => (net.network(), net.broadcast()),
    }
}

/// Fast-path address count. Exact for every network with fewer than 64 host bits, which
/// covers all of IPv4; wider IPv6 networks need [address_count_big].
pub fn address_count(net: &IpNet) -> AlgebraResult<u64> {
    let bits = host_bits(net);
    if bits >= 64 {
        return Err(AlgebraError::Overflow {
            what: "64-bit address count",
        });
    }
    Ok(1u64 << bits)
}

/// Exact address count for any network.
pub fn address_count_big(net: &IpNet) -> BigUint {
    BigUint::from(1u8) << host_bits(net) as usize
}

/// Address count as `u128`, or [None] for `::/0` whose count is exactly `2^128`.
pub fn address_count_u128(net: &IpNet) -> Option<u128> {
    1u128.checked_shl(host_bits(net) as u32)
}

/// A contiguous, inclusive span of addresses of one family with `first <= last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    first: IpAddr,
    last: IpAddr,
}

impl AddressRange {
    pub fn new(first: IpAddr, last: IpAddr) -> AlgebraResult<Self> {
        family::ensure_same_family(&first, &last)?;
        if family::to_integer(&last).0 < family::to_integer(&first).0 {
            return Err(AlgebraError::InvalidRange { first, last });
        }
        Ok(Self { first, last })
    }

    pub fn first(&self) -> IpAddr {
        self.first
    }

    pub fn last(&self) -> IpAddr {
        self.last
    }

    pub fn family(&self) -> Family {
        Family::of(&self.first)
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        if Family::of(addr) != self.family() {
            return false;
        }
        let value = family::to_integer(addr).0;
        family::to_integer(&self.first).0 <= value && value <= family::to_integer(&self.last).0
    }

    pub fn len(&self) -> BigUint {
        let (first, _) = family::to_integer(&self.first);
        let (last, _) = family::to_integer(&self.last);
        BigUint::from(last - first) + 1u8
    }

    /// Minimal list of networks exactly covering this range, in ascending order.
    pub fn to_cidrs(&self) -> Vec<IpNet> {
        let (first, _) = family::to_integer(&self.first);
        let (last, _) = family::to_integer(&self.last);
        decompose(first, last, self.family())
    }
}

impl From<IpNet> for AddressRange {
    fn from(net: IpNet) -> Self {
        let (first, last) = address_range(&net);
        Self { first, last }
    }
}

impl Display for AddressRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.first, self.last)
    }
}

/// Decomposes the range between two addresses into the minimal list of covering networks.
pub fn cidrs_from_range(first: IpAddr, last: IpAddr) -> AlgebraResult<Vec<IpNet>> {
    Ok(AddressRange::new(first, last)?.to_cidrs())
}

pub(crate) fn decompose(first: u128, last: u128, family: Family) -> Vec<IpNet> {
    let mut cidrs = vec![];
    let mut current = first;
    loop {
        let block_bits = largest_block_bits(current, last, family);
        let prefix = family.bits() - block_bits;
        // current has at least block_bits trailing zeros, so nothing is masked away
        if let Ok(net) = family::network_from_integer(current, prefix, family) {
            cidrs.push(net);
        }
        let block_last = current | low_mask(block_bits);
        if block_last >= last {
            return cidrs;
        }
        current = block_last + 1;
    }
}

/// Host bits of the largest block that starts at `current` and does not extend past `last`.
fn largest_block_bits(current: u128, last: u128, family: Family) -> u8 {
    debug_assert!(current <= last, "current must be <= last");
    let alignment = current.trailing_zeros().min(family.bits() as u32);
    let remaining = last - current;
    let fitting = match remaining.checked_add(1) {
        Some(size) => size.ilog2(),
        None => 128,
    };
    alignment.min(fitting) as u8
}

#[cfg(test)]
mod tests {
    use assertor::*;

    use super::*;
    use crate::test_utils::{addr, net, strings};

    #[test]
    fn range_of_network() {
        assert_that!(address_range(&net("10.0.0.0/24")))
            .is_equal_to((addr("10.0.0.0"), addr("10.0.0.255")));
        assert_that!(address_range(&net("2001:db8::/32")))
            .is_equal_to((addr("2001:db8::"), addr("2001:db8:ffff:ffff:ffff:ffff:ffff:ffff")));
    }

    #[test]
    fn range_of_host_route_is_single_address() {
        assert_that!(address_range(&net("10.0.0.7/32")))
            .is_equal_to((addr("10.0.0.7"), addr("10.0.0.7")));
        assert_that!(address_range(&net("::1/128"))).is_equal_to((addr("::1"), addr("::1")));
    }

    #[test]
    fn range_of_whole_space() {
        assert_that!(address_range(&net("0.0.0.0/0")))
            .is_equal_to((addr("0.0.0.0"), addr("255.255.255.255")));
        assert_that!(address_range(&net("::/0")).1)
            .is_equal_to(addr("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff"));
    }

    #[test]
    fn fast_count_in_range() {
        assert_that!(address_count(&net("15.181.232.0/21"))).is_equal_to(Ok(2048));
        assert_that!(address_count(&net("0.0.0.0/0"))).is_equal_to(Ok(1 << 32));
        assert_that!(address_count(&net("2001:db8::/65"))).is_equal_to(Ok(1 << 63));
    }

    #[test]
    fn fast_count_refuses_wide_v6() {
        assert_that!(address_count(&net("2001:db8::/64"))).is_err();
        assert_that!(address_count(&net("2001:db8::/48"))).is_err();
    }

    #[test]
    fn big_count_is_exact() {
        assert_that!(address_count_big(&net("2001:db8::/48")))
            .is_equal_to(BigUint::from(1u8) << 80usize);
        assert_that!(address_count_big(&net("::/0"))).is_equal_to(BigUint::from(1u8) << 128usize);
        assert_that!(address_count_u128(&net("::/0"))).is_none();
        assert_that!(address_count_u128(&net("::/1"))).is_equal_to(Some(1u128 << 127));
    }

    #[test]
    fn decompose_unaligned_v4_range() -> anyhow::Result<()> {
        // given
        let first = addr("10.40.0.1");
        let last = addr("10.40.0.255");

        // when
        let result = cidrs_from_range(first, last)?;

        // then
        assert_that!(strings(&result)).contains_exactly(vec![
            "10.40.0.1/32",
            "10.40.0.2/31",
            "10.40.0.4/30",
            "10.40.0.8/29",
            "10.40.0.16/28",
            "10.40.0.32/27",
            "10.40.0.64/26",
            "10.40.0.128/25",
        ].into_iter().map(String::from).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn decompose_unaligned_v6_range() -> anyhow::Result<()> {
        // given
        let first = addr("2c0f:fec9::");
        let last = addr("2c0f:fed7:ffff:ffff:ffff:ffff:ffff:ffff");

        // when
        let result = cidrs_from_range(first, last)?;

        // then
        assert_that!(strings(&result)).is_equal_to(vec![
            "2c0f:fec9::/32".to_string(),
            "2c0f:feca::/31".to_string(),
            "2c0f:fecc::/30".to_string(),
            "2c0f:fed0::/29".to_string(),
        ]);
        Ok(())
    }

    #[test]
    fn decompose_whole_space() -> anyhow::Result<()> {
        assert_that!(cidrs_from_range(addr("0.0.0.0"), addr("255.255.255.255"))?)
            .is_equal_to(vec![net("0.0.0.0/0")]);
        assert_that!(cidrs_from_range(addr("::"), addr("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff"))?)
            .is_equal_to(vec![net("::/0")]);
        Ok(())
    }

    #[test]
    fn decompose_single_address() -> anyhow::Result<()> {
        assert_that!(cidrs_from_range(addr("255.255.255.255"), addr("255.255.255.255"))?)
            .is_equal_to(vec![net("255.255.255.255/32")]);
        Ok(())
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        assert_that!(cidrs_from_range(addr("10.0.0.2"), addr("10.0.0.1"))).is_equal_to(Err(
            AlgebraError::InvalidRange {
                first: addr("10.0.0.2"),
                last: addr("10.0.0.1"),
            },
        ));
        assert_that!(cidrs_from_range(addr("10.0.0.1"), addr("::2"))).is_err();
    }

    #[test]
    fn network_round_trips_through_range() {
        for input in ["10.0.0.0/8", "192.168.1.128/25", "1.2.3.4/32", "2001:db8::/33", "::/0"] {
            // given
            let network = net(input);

            // when
            let result = AddressRange::from(network).to_cidrs();

            // then
            assert_that!(result).is_equal_to(vec![network]);
        }
    }

    #[test]
    fn range_len_and_contains() -> anyhow::Result<()> {
        // given
        let range = AddressRange::new(addr("10.0.0.10"), addr("10.0.0.19"))?;

        // then
        assert_that!(range.len()).is_equal_to(BigUint::from(10u8));
        assert_that!(range.contains(&addr("10.0.0.19"))).is_true();
        assert_that!(range.contains(&addr("10.0.0.20"))).is_false();
        assert_that!(range.contains(&addr("::a"))).is_false();
        assert_that!(range.to_string()).is_equal_to("10.0.0.10-10.0.0.19".to_string());
        Ok(())
    }
}
