use std::net::IpAddr;

use ipnet::IpNet;

pub fn net(input: &str) -> IpNet {
    input.parse().expect(input)
}

pub fn addr(input: &str) -> IpAddr {
    input.parse().expect(input)
}

pub fn nets(inputs: &[&str]) -> Vec<IpNet> {
    inputs.iter().map(|it| net(it)).collect()
}

pub fn strings(nets: &[IpNet]) -> Vec<String> {
    nets.iter().map(|it| it.to_string()).collect()
}
