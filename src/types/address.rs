//! Zigbee addressing types.

/// 16-bit network address of a node.
pub type ShortAddress = u16;

/// 64-bit MAC address of a node.
pub type IeeeAddress = u64;

/// Addressing mode used by AF and ZDO requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AddrMode {
    /// Address not present.
    NotPresent = 0,
    /// 16-bit group address.
    Group = 1,
    /// 16-bit network address.
    ShortAddress = 2,
    /// 64-bit IEEE address.
    IeeeAddress = 3,
    /// Broadcast.
    Broadcast = 0xFF,
}

impl AddrMode {
    /// Attempts to parse an addressing mode from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::NotPresent),
            1 => Some(Self::Group),
            2 => Some(Self::ShortAddress),
            3 => Some(Self::IeeeAddress),
            0xFF => Some(Self::Broadcast),
            _ => None,
        }
    }
}

/// Destination of a bind or unbind request.
///
/// The wire form is the addressing mode byte followed by the address bytes
/// that mode calls for; an IEEE destination additionally carries the
/// destination endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindTarget {
    /// No destination.
    NotPresent,
    /// A group address.
    Group(u16),
    /// A network address.
    Short(ShortAddress),
    /// An IEEE address plus destination endpoint.
    Ieee {
        /// Destination IEEE address.
        address: IeeeAddress,
        /// Destination endpoint.
        endpoint: u8,
    },
    /// Broadcast.
    Broadcast,
}

impl BindTarget {
    /// Returns the addressing mode of this target.
    #[must_use]
    pub const fn mode(&self) -> AddrMode {
        match self {
            Self::NotPresent => AddrMode::NotPresent,
            Self::Group(_) => AddrMode::Group,
            Self::Short(_) => AddrMode::ShortAddress,
            Self::Ieee { .. } => AddrMode::IeeeAddress,
            Self::Broadcast => AddrMode::Broadcast,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_mode_from_byte() {
        assert_eq!(AddrMode::from_byte(2), Some(AddrMode::ShortAddress));
        assert_eq!(AddrMode::from_byte(0xFF), Some(AddrMode::Broadcast));
        assert_eq!(AddrMode::from_byte(4), None);
    }

    #[test]
    fn test_bind_target_mode() {
        assert_eq!(BindTarget::Group(1).mode(), AddrMode::Group);
        let target = BindTarget::Ieee {
            address: 0x0011_2233_4455_6677,
            endpoint: 1,
        };
        assert_eq!(target.mode(), AddrMode::IeeeAddress);
    }
}
