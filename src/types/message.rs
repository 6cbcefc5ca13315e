//! Application-framework message types.

use crate::types::address::{BindTarget, IeeeAddress, ShortAddress};

/// An incoming AF data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMsg {
    /// Group id the frame was addressed to, or 0.
    pub group_id: u16,
    /// Cluster id.
    pub cluster_id: u16,
    /// Short address of the sender.
    pub src_addr: ShortAddress,
    /// Source endpoint.
    pub src_endpoint: u8,
    /// Destination endpoint.
    pub dst_endpoint: u8,
    /// Whether the frame was a broadcast.
    pub was_broadcast: bool,
    /// Link quality of the last hop.
    pub link_quality: u8,
    /// Whether APS security was used.
    pub security_use: bool,
    /// Device timestamp of reception.
    pub timestamp: u32,
    /// APS transaction sequence number.
    pub trans_seq_number: u8,
    /// Application payload.
    pub data: Vec<u8>,
}

/// One entry of a remote device's binding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindTableEntry {
    /// Source IEEE address of the binding.
    pub src_addr: IeeeAddress,
    /// Source endpoint of the binding.
    pub src_endpoint: u8,
    /// Bound cluster id.
    pub cluster_id: u16,
    /// Destination of the binding.
    pub target: BindTarget,
}
