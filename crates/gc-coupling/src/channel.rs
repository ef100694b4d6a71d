//! Channel name templates.
//!
//! Offset 0 is the current step; offset `k >= 1` appends `.k`.

pub fn offset_suffix(offset: usize) -> String {
    if offset == 0 {
        String::new()
    } else {
        format!(".{offset}")
    }
}

/// `<domain>/node.<n>.avail[.k]`, published by this federate.
pub fn available_channel(domain: &str, node: u32, offset: usize) -> String {
    format!("{domain}/node.{node}.avail{}", offset_suffix(offset))
}

/// `<peer>/node.<n>.requested[.k]`, published by the peer.
pub fn requested_channel(peer_domain: &str, node: u32, offset: usize) -> String {
    format!("{peer_domain}/node.{node}.requested{}", offset_suffix(offset))
}
