/// Probe strategy selected for an address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// IPv4 dotted quad, probed with ICMP echo
    IpLiteral,
    /// Anything else, probed with an HTTP HEAD request
    Url,
}

/// Classify an address by its textual form.
///
/// Only a strict dotted quad counts as a literal: exactly four decimal octets
/// in 0-255, digits only, no leading zeros. Everything else, including IPv6 literals, goes down
/// the URL path.
pub fn classify(address: &str) -> TargetKind {
    if is_ipv4_literal(address) { TargetKind::IpLiteral } else { TargetKind::Url }
}

fn is_ipv4_literal(address: &str) -> bool {
    let mut octets = 0;
    for part in address.split('.') {
        octets += 1;
        if octets > 4 || !is_octet(part) {
            return false;
        }
    }
    octets == 4
}

fn is_octet(part: &str) -> bool {
    if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    // `Ipv4Addr` rejects zero-padded octets, so they are not literals here either
    if part.len() > 1 && part.starts_with('0') {
        return false;
    }
    part.parse::<u16>().map(|value| value <= 255).unwrap_or(false)
}
