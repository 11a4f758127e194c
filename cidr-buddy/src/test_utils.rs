use ipnet::IpNet;

pub fn nets(inputs: &[&str]) -> Vec<IpNet> {
    inputs.iter().map(|it| it.parse().expect(it)).collect()
}

pub fn tokens(inputs: &[&str]) -> Vec<String> {
    inputs.iter().map(|it| it.to_string()).collect()
}
