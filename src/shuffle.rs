use std::fmt::{Display, Formatter};
use std::net::IpAddr;

use ipnet::IpNet;
use log::debug;

use crate::aggregate::coalesce_all;
use crate::enumerate::SkipEdges;
use crate::error::{AlgebraError, AlgebraResult};
use crate::family;
use crate::range::{address_count_u128, int_span};

pub use permutation::Permutation;

/// Unit of shuffled output: an address, and a port if the run is over addresses × ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShuffleItem {
    pub addr: IpAddr,
    pub port: Option<u16>,
}

impl Display for ShuffleItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.addr, self.port) {
            (addr, None) => write!(f, "{}", addr),
            (IpAddr::V4(addr), Some(port)) => write!(f, "{}:{}", addr, port),
            (IpAddr::V6(addr), Some(port)) => write!(f, "[{}]:{}", addr, port),
        }
    }
}

/// Maps a flat index in `[0, total)` to the address at that position of an ordered network
/// list, by walking the list and subtracting each network's size.
pub fn pick_address(networks: &[IpNet], mut index: u128) -> Option<IpAddr> {
    for net in networks {
        match address_count_u128(net) {
            Some(count) if index >= count => index -= count,
            _ => return address_at(net, index),
        }
    }
    None
}

fn address_at(net: &IpNet, offset: u128) -> Option<IpAddr> {
    let (first, _) = int_span(net);
    family::from_integer(first.checked_add(offset)?, net.max_prefix_len()).ok()
}

/// Precomputed form of [pick_address] for repeated lookups: cumulative offsets of each
/// network, searched with a binary search.
#[derive(Debug, Clone)]
pub struct AddressIndex {
    networks: Vec<IpNet>,
    offsets: Vec<u128>,
    total: u128,
}

impl AddressIndex {
    pub fn new(networks: Vec<IpNet>) -> AlgebraResult<Self> {
        let overflow = || AlgebraError::Overflow {
            what: "total address count of shuffle input",
        };
        let mut offsets = Vec::with_capacity(networks.len());
        let mut total = 0u128;
        for net in &networks {
            offsets.push(total);
            let count = address_count_u128(net).ok_or_else(overflow)?;
            total = total.checked_add(count).ok_or_else(overflow)?;
        }
        Ok(Self {
            networks,
            offsets,
            total,
        })
    }

    pub fn total(&self) -> u128 {
        self.total
    }

    pub fn networks(&self) -> &[IpNet] {
        &self.networks
    }

    pub fn pick(&self, index: u128) -> Option<IpAddr> {
        self.pick_with_owner(index).map(|(addr, _)| addr)
    }

    /// Like [AddressIndex::pick], but also returns the network the address belongs to.
    pub fn pick_with_owner(&self, index: u128) -> Option<(IpAddr, &IpNet)> {
        if index >= self.total {
            return None;
        }
        let position = self.offsets.partition_point(|offset| *offset <= index);
        let owner = position.checked_sub(1)?;
        let net = &self.networks[owner];
        Some((address_at(net, index - self.offsets[owner])?, net))
    }
}

/// Lazy, non-repeating, seeded walk over every address (or address × port pair) of a network
/// set. Nothing beyond the coalesced network list is stored.
#[derive(Debug)]
pub struct ShuffledAddresses {
    index: AddressIndex,
    permutation: Permutation,
    ports: Option<Vec<u16>>,
    skip: SkipEdges,
    position: u128,
}

impl ShuffledAddresses {
    fn new(networks: &[IpNet], ports: Option<Vec<u16>>, seed: u64) -> AlgebraResult<Self> {
        let index = AddressIndex::new(coalesce_all(networks))?;
        let domain = match &ports {
            None => index.total(),
            Some(ports) => index
                .total()
                .checked_mul(ports.len() as u128)
                .ok_or(AlgebraError::Overflow {
                    what: "address × port domain",
                })?,
        };
        debug!(
            "Shuffling {} items over {} networks with seed {}",
            domain,
            index.networks().len(),
            seed
        );
        Ok(Self {
            index,
            permutation: Permutation::new(domain, seed)?,
            ports,
            skip: SkipEdges::default(),
            position: 0,
        })
    }

    /// Leaves out the edge addresses of each coalesced block, see [SkipEdges]. The permuted
    /// order of the remaining items does not change.
    pub fn skipping(mut self, skip: SkipEdges) -> Self {
        self.skip = skip;
        self
    }

    /// Size of the permuted domain, i.e. the number of items produced unless edges are
    /// skipped.
    pub fn domain(&self) -> u128 {
        self.permutation.range()
    }

    /// Number of positions not visited yet. Items dropped by [ShuffledAddresses::skipping]
    /// still count here.
    pub fn remaining(&self) -> u128 {
        self.domain() - self.position
    }
}

impl Iterator for ShuffledAddresses {
    type Item = ShuffleItem;

    fn next(&mut self) -> Option<Self::Item> {
        while self.position < self.domain() {
            let shuffled = self.permutation.shuffle(self.position);
            self.position += 1;
            let (address_index, port) = match &self.ports {
                None => (shuffled, None),
                Some(ports) => {
                    let port_count = ports.len() as u128;
                    (shuffled / port_count, Some(ports[(shuffled % port_count) as usize]))
                }
            };
            let (addr, owner) = self.index.pick_with_owner(address_index)?;
            if !self.skip.skips(owner, &addr) {
                return Some(ShuffleItem { addr, port });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let upper = usize::try_from(self.remaining()).ok();
        if self.skip != SkipEdges::default() {
            return (0, upper);
        }
        (upper.unwrap_or(usize::MAX), upper)
    }
}

/// Every address of the (coalesced) input exactly once, in an order determined by `seed`.
/// IPv4 networks are visited as part of the same index space as IPv6 networks.
pub fn shuffle(networks: &[IpNet], seed: u64) -> AlgebraResult<ShuffledAddresses> {
    ShuffledAddresses::new(networks, None, seed)
}

/// Like [shuffle], but over the product of addresses and `ports`.
pub fn shuffle_with_ports(networks: &[IpNet], ports: &[u16], seed: u64) -> AlgebraResult<ShuffledAddresses> {
    ShuffledAddresses::new(networks, Some(ports.to_vec()), seed)
}

mod permutation {
    use perfect_rand::PerfectRng;

    use crate::error::{AlgebraError, AlgebraResult};

    /// Rounds of the blackrock cipher, the default of [PerfectRng::from_range].
    const BLACKROCK_ROUNDS: usize = 3;
    const WIDE_ROUNDS: u32 = 6;

    /// Seeded bijection on `[0, range)`. Ranges that fit into a `u64` (any IPv4 input, and
    /// address × port products up to 2^64) use the blackrock cipher of [PerfectRng]. Wider
    /// IPv6 ranges fall back to the same construction on `u128`.
    #[derive(Debug)]
    pub struct Permutation {
        range: u128,
        cipher: Cipher,
    }

    #[derive(Debug)]
    enum Cipher {
        Blackrock(PerfectRng),
        Wide(WideFeistel),
    }

    impl Permutation {
        pub fn new(range: u128, seed: u64) -> AlgebraResult<Self> {
            let cipher = match u64::try_from(range) {
                Ok(range) => Cipher::Blackrock(PerfectRng::new(range, seed, BLACKROCK_ROUNDS)),
                Err(_) => Cipher::Wide(WideFeistel::new(range, seed)?),
            };
            Ok(Self { range, cipher })
        }

        pub fn range(&self) -> u128 {
            self.range
        }

        /// Position of `index` in the permuted order. `index` must be below the range.
        pub fn shuffle(&self, index: u128) -> u128 {
            debug_assert!(index < self.range, "index must be below range");
            match &self.cipher {
                // index < range <= u64::MAX
                Cipher::Blackrock(rng) => u128::from(rng.shuffle(index as u64)),
                Cipher::Wide(feistel) => feistel.shuffle(index),
            }
        }
    }

    /// Unbalanced Feistel network over `[0, a * b)` with `a * b >= range`, plus cycle walking
    /// for the values in between. Same construction as blackrock, on `u128`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct WideFeistel {
        range: u128,
        a: u128,
        b: u128,
        seed: u64,
    }

    impl WideFeistel {
        fn new(range: u128, seed: u64) -> AlgebraResult<Self> {
            let split = isqrt(range);
            let a = split.saturating_sub(1).max(1);
            let mut b = split + 1;
            loop {
                let product = a.checked_mul(b).ok_or(AlgebraError::Overflow {
                    what: "permutation domain",
                })?;
                if product >= range {
                    break;
                }
                b += 1;
            }
            Ok(Self { range, a, b, seed })
        }

        fn shuffle(&self, index: u128) -> u128 {
            let mut value = self.encrypt(index);
            while value >= self.range {
                value = self.encrypt(value);
            }
            value
        }

        fn encrypt(&self, value: u128) -> u128 {
            let mut left = value % self.a;
            let mut right = value / self.a;
            for round in 1..=WIDE_ROUNDS {
                let modulus = if round % 2 == 1 { self.a } else { self.b };
                let mixed = (left + self.round_function(round, right) % modulus) % modulus;
                left = right;
                right = mixed;
            }
            if WIDE_ROUNDS % 2 == 0 {
                self.a * right + left
            } else {
                self.a * left + right
            }
        }

        fn round_function(&self, round: u32, value: u128) -> u128 {
            let folded = (value as u64) ^ ((value >> 64) as u64);
            let keyed = folded ^ self.seed.rotate_left(round * 7) ^ u64::from(round);
            splitmix64(keyed) as u128
        }
    }

    fn splitmix64(value: u64) -> u64 {
        let mut z = value.wrapping_add(0x9e37_79b9_7f4a_7c15);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    fn isqrt(value: u128) -> u128 {
        if value < 2 {
            return value;
        }
        let bits = 128 - value.leading_zeros();
        let mut current = 1u128 << (bits / 2 + 1);
        loop {
            let next = (current + value / current) / 2;
            if next >= current {
                return current;
            }
            current = next;
        }
    }

}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use assertor::*;

    use super::*;
    use crate::test_utils::{addr, nets};

    fn input() -> Vec<IpNet> {
        nets(&["10.0.1.0/30", "10.0.0.0/28", "2001:db8::/126", "10.0.0.16/32", "10.0.0.4/30"])
    }

    #[test]
    fn produces_every_address_once() -> anyhow::Result<()> {
        // given
        let networks = input();

        // when
        let result: Vec<ShuffleItem> = shuffle(&networks, 7)?.collect();

        // then
        assert_that!(result).has_length(16 + 1 + 4 + 4);
        let distinct: HashSet<IpAddr> = result.iter().map(|it| it.addr).collect();
        assert_that!(distinct.len()).is_equal_to(result.len());
        for item in &result {
            assert_that!(networks.iter().any(|net| net.contains(&item.addr))).is_true();
            assert_that!(item.port).is_none();
        }
        Ok(())
    }

    #[test]
    fn same_seed_same_order() -> anyhow::Result<()> {
        // given
        let networks = nets(&["192.168.0.0/22", "2001:db8::/118"]);

        // when
        let first: Vec<ShuffleItem> = shuffle(&networks, 1234)?.collect();
        let second: Vec<ShuffleItem> = shuffle(&networks, 1234)?.collect();
        let other: Vec<ShuffleItem> = shuffle(&networks, 4321)?.collect();

        // then
        assert_that!(first.clone()).is_equal_to(second);
        assert_that!(first == other).is_false();
        Ok(())
    }

    #[test]
    fn ports_extend_the_domain() -> anyhow::Result<()> {
        // given
        let networks = nets(&["10.0.0.0/29"]);
        let ports = [22, 80, 443];

        // when
        let result: Vec<ShuffleItem> = shuffle_with_ports(&networks, &ports, 99)?.collect();

        // then
        let distinct: HashSet<ShuffleItem> = result.iter().copied().collect();
        assert_that!(result).has_length(24);
        assert_that!(distinct.len()).is_equal_to(24);
        assert_that!(result.iter().all(|it| it.port.is_some())).is_true();
        Ok(())
    }

    #[test]
    fn empty_port_list_yields_nothing() -> anyhow::Result<()> {
        assert_that!(shuffle_with_ports(&nets(&["10.0.0.0/29"]), &[], 1)?.count()).is_equal_to(0);
        Ok(())
    }

    #[test]
    fn empty_input_yields_nothing() -> anyhow::Result<()> {
        assert_that!(shuffle(&[], 1)?.count()).is_equal_to(0);
        Ok(())
    }

    #[test]
    fn whole_v6_space_overflows() {
        assert_that!(shuffle(&nets(&["::/1", "8000::/1"]), 1)).is_err();
    }

    #[test]
    fn wide_v6_is_lazy() -> anyhow::Result<()> {
        // given
        let networks = nets(&["2001:db8::/32", "10.0.0.0/8"]);

        // when
        let mut shuffled = shuffle(&networks, 5)?;
        let head: Vec<ShuffleItem> = shuffled.by_ref().take(5).collect();

        // then
        assert_that!(head).has_length(5);
        assert_that!(shuffled.remaining()).is_equal_to((1u128 << 96) + (1 << 24) - 5);
        Ok(())
    }

    #[test]
    fn skipped_edges_are_left_out_of_the_order() -> anyhow::Result<()> {
        // given
        let networks = nets(&["10.0.0.0/30", "10.0.0.4/30", "10.0.1.7/32", "2001:db8::/127"]);
        let skip = SkipEdges {
            base: true,
            broadcast: true,
        };

        // when
        let full: Vec<ShuffleItem> = shuffle(&networks, 21)?.collect();
        let skipped: Vec<ShuffleItem> = shuffle(&networks, 21)?.skipping(skip).collect();

        // then
        let addrs: Vec<IpAddr> = skipped.iter().map(|it| it.addr).collect();
        assert_that!(addrs.clone()).contains_exactly(vec![
            addr("10.0.0.1"),
            addr("10.0.0.2"),
            addr("10.0.0.3"),
            addr("10.0.0.4"),
            addr("10.0.0.5"),
            addr("10.0.0.6"),
            addr("10.0.1.7"),
        ]);
        let expected_order: Vec<ShuffleItem> = full.into_iter().filter(|it| addrs.contains(&it.addr)).collect();
        assert_that!(skipped).is_equal_to(expected_order);
        Ok(())
    }

    #[test]
    fn skipped_edges_with_ports() -> anyhow::Result<()> {
        // given
        let skip = SkipEdges {
            base: true,
            broadcast: false,
        };

        // when
        let result: Vec<ShuffleItem> = shuffle_with_ports(&nets(&["10.0.0.0/31"]), &[80, 443], 3)?
            .skipping(skip)
            .collect();

        // then
        assert_that!(result).contains_exactly(vec![
            ShuffleItem {
                addr: addr("10.0.0.1"),
                port: Some(80),
            },
            ShuffleItem {
                addr: addr("10.0.0.1"),
                port: Some(443),
            },
        ]);
        Ok(())
    }

    #[test]
    fn pick_walks_networks_in_order() {
        // given
        let networks = nets(&["10.0.0.0/30", "10.0.1.0/31", "::/127"]);

        // when, then
        assert_that!(pick_address(&networks, 0)).is_equal_to(Some(addr("10.0.0.0")));
        assert_that!(pick_address(&networks, 3)).is_equal_to(Some(addr("10.0.0.3")));
        assert_that!(pick_address(&networks, 4)).is_equal_to(Some(addr("10.0.1.0")));
        assert_that!(pick_address(&networks, 7)).is_equal_to(Some(addr("::1")));
        assert_that!(pick_address(&networks, 8)).is_none();
    }

    #[test]
    fn index_agrees_with_walk() -> anyhow::Result<()> {
        // given
        let networks = nets(&["10.0.0.0/30", "10.0.1.0/31", "10.0.2.9/32", "::/126"]);
        let index = AddressIndex::new(networks.clone())?;

        // then
        assert_that!(index.total()).is_equal_to(11);
        for i in 0..12 {
            assert_that!(index.pick(i)).is_equal_to(pick_address(&networks, i));
        }
        Ok(())
    }

    #[test]
    fn item_rendering() {
        let v4 = ShuffleItem {
            addr: addr("10.0.0.1"),
            port: Some(80),
        };
        let v6 = ShuffleItem {
            addr: addr("2001:db8::1"),
            port: Some(443),
        };
        let bare = ShuffleItem {
            addr: addr("2001:db8::1"),
            port: None,
        };
        assert_that!(v4.to_string()).is_equal_to("10.0.0.1:80".to_string());
        assert_that!(v6.to_string()).is_equal_to("[2001:db8::1]:443".to_string());
        assert_that!(bare.to_string()).is_equal_to("2001:db8::1".to_string());
    }
}
