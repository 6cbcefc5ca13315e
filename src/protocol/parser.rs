//! Payload parsing for ZNP responses and indications.
//!
//! All multi-byte integers are little-endian. Variable-length sequences
//! carry a one-byte count. Parsers reject trailing bytes unless the frame
//! is documented to carry them (see `parse_incoming_msg`).

use bytes::Buf;
use std::io::Cursor;

use crate::error::{Error, Result};
use crate::protocol::command::{Command, CommandType, Subsystem};
use crate::types::{
    BindTableEntry, BindTarget, Capability, DeviceState, IeeeAddress, IncomingMsg, ResetInfo,
    ResetReason, ShortAddress, StartupFromAppResult, Status, VersionInfo,
};

/// Strips and checks the leading status byte of a synchronous response.
///
/// Returns the remainder of the payload.
///
/// # Errors
///
/// Fails with a protocol error on an empty payload and with
/// [`Error::Status`] on a non-success status byte.
pub fn check_status(payload: &[u8]) -> Result<&[u8]> {
    let Some((&code, tail)) = payload.split_first() else {
        return Err(Error::protocol("empty response"));
    };
    if code != Status::Success as u8 {
        return Err(Error::Status { code });
    }
    Ok(tail)
}

/// As [`check_status`], but additionally requires the response to carry
/// nothing beyond the status byte.
///
/// # Errors
///
/// Fails as [`check_status`], or with a protocol error on trailing bytes.
pub fn check_only_status(payload: &[u8]) -> Result<()> {
    let tail = check_status(payload)?;
    if !tail.is_empty() {
        return Err(Error::protocol("expected status-only response"));
    }
    Ok(())
}

fn expect_len(data: &[u8], expected: usize, what: &str) -> Result<()> {
    if data.len() != expected {
        return Err(Error::decode(format!(
            "{what}: expected {expected} bytes, got {}",
            data.len()
        )));
    }
    Ok(())
}

/// Parses an `RPC_Error` payload into the error code and the refused
/// command.
///
/// The original `(type, subsystem)` pair is packed into one byte: type in
/// the high nibble, subsystem in the low nibble; the command id follows.
pub fn parse_rpc_error(data: &[u8]) -> Result<(u8, CommandType, Command)> {
    expect_len(data, 3, "RPC_Error")?;
    let code = data[0];
    let kind = CommandType::from_nibble(data[1] >> 4)
        .ok_or_else(|| Error::decode("RPC_Error: bad command type nibble"))?;
    let subsystem = Subsystem::from_nibble(data[1] & 0x0F)
        .ok_or_else(|| Error::decode("RPC_Error: bad subsystem nibble"))?;
    Ok((code, kind, Command::new(subsystem, data[2])))
}

/// Parses a `SYS_RESET_IND` payload.
pub fn parse_reset_info(data: &[u8]) -> Result<ResetInfo> {
    expect_len(data, 6, "ResetInfo")?;
    let reason = ResetReason::from_byte(data[0])
        .ok_or_else(|| Error::decode(format!("ResetInfo: unknown reason {}", data[0])))?;
    Ok(ResetInfo {
        reason,
        transport_rev: data[1],
        product_id: data[2],
        major_rel: data[3],
        minor_rel: data[4],
        hw_rev: data[5],
    })
}

/// Parses a `SYS_VERSION` response.
///
/// Newer stacks append revision words after the five documented fields;
/// those are tolerated and ignored.
pub fn parse_version_info(data: &[u8]) -> Result<VersionInfo> {
    if data.len() < 5 {
        return Err(Error::decode(format!(
            "VersionInfo: expected at least 5 bytes, got {}",
            data.len()
        )));
    }
    Ok(VersionInfo {
        transport_rev: data[0],
        product_id: data[1],
        major_rel: data[2],
        minor_rel: data[3],
        maint_rel: data[4],
    })
}

/// Parses a single device state byte.
pub fn parse_device_state(data: &[u8]) -> Result<DeviceState> {
    expect_len(data, 1, "DeviceState")?;
    DeviceState::from_byte(data[0])
        .ok_or_else(|| Error::decode(format!("DeviceState: unknown state {}", data[0])))
}

/// Parses a `SYS_PING` capability response.
pub fn parse_capability(data: &[u8]) -> Result<Capability> {
    expect_len(data, 2, "Capability")?;
    Ok(Capability(u16::from_le_bytes([data[0], data[1]])))
}

/// Parses a `ZDO_END_DEVICE_ANNCE_IND` payload.
pub fn parse_end_device_announce(
    data: &[u8],
) -> Result<(ShortAddress, ShortAddress, IeeeAddress, u8)> {
    expect_len(data, 13, "EndDeviceAnnounce")?;
    let mut cursor = Cursor::new(data);
    let src = cursor.get_u16_le();
    let nwk = cursor.get_u16_le();
    let ieee = cursor.get_u64_le();
    let capabilities = cursor.get_u8();
    Ok((src, nwk, ieee, capabilities))
}

/// Parses a `ZDO_TC_DEV_IND` payload.
pub fn parse_trust_center_device(
    data: &[u8],
) -> Result<(ShortAddress, IeeeAddress, ShortAddress)> {
    expect_len(data, 12, "TrustCenterDevice")?;
    let mut cursor = Cursor::new(data);
    let nwk = cursor.get_u16_le();
    let ieee = cursor.get_u64_le();
    let parent = cursor.get_u16_le();
    Ok((nwk, ieee, parent))
}

/// Parses a `ZDO_LEAVE_IND` payload.
pub fn parse_leave_indication(data: &[u8]) -> Result<(ShortAddress, IeeeAddress, u8, u8, u8)> {
    expect_len(data, 13, "LeaveIndication")?;
    let mut cursor = Cursor::new(data);
    let src = cursor.get_u16_le();
    let ieee = cursor.get_u64_le();
    let request = cursor.get_u8();
    let remove_children = cursor.get_u8();
    let rejoin = cursor.get_u8();
    Ok((src, ieee, request, remove_children, rejoin))
}

/// Parses an `AF_INCOMING_MSG` payload.
///
/// Some firmware revisions append a few undocumented trailing bytes;
/// `allow_partial` tolerates them.
pub fn parse_incoming_msg(data: &[u8], allow_partial: bool) -> Result<IncomingMsg> {
    if data.len() < 17 {
        return Err(Error::decode(format!(
            "IncomingMsg: expected at least 17 bytes, got {}",
            data.len()
        )));
    }
    let mut cursor = Cursor::new(data);
    let group_id = cursor.get_u16_le();
    let cluster_id = cursor.get_u16_le();
    let src_addr = cursor.get_u16_le();
    let src_endpoint = cursor.get_u8();
    let dst_endpoint = cursor.get_u8();
    let was_broadcast = cursor.get_u8() != 0;
    let link_quality = cursor.get_u8();
    let security_use = cursor.get_u8() != 0;
    let timestamp = cursor.get_u32_le();
    let trans_seq_number = cursor.get_u8();

    let len = cursor.get_u8() as usize;
    if cursor.remaining() < len {
        return Err(Error::decode(format!(
            "IncomingMsg: data length {len} exceeds remaining {} bytes",
            cursor.remaining()
        )));
    }
    let mut payload = vec![0u8; len];
    cursor.copy_to_slice(&mut payload);

    if !allow_partial && cursor.has_remaining() {
        return Err(Error::decode(format!(
            "IncomingMsg: {} trailing bytes",
            cursor.remaining()
        )));
    }

    Ok(IncomingMsg {
        group_id,
        cluster_id,
        src_addr,
        src_endpoint,
        dst_endpoint,
        was_broadcast,
        link_quality,
        security_use,
        timestamp,
        trans_seq_number,
        data: payload,
    })
}

/// Response to a `ZDO_IEEE_ADDR_REQ`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IeeeAddrResponse {
    /// IEEE address of the queried device.
    pub ieee_addr: IeeeAddress,
    /// Short address of the queried device.
    pub nwk_addr: ShortAddress,
    /// Index of the first returned child.
    pub start_index: u8,
    /// Short addresses of associated children.
    pub assoc_dev_list: Vec<ShortAddress>,
}

/// Parses a `ZDO_IEEE_ADDR_RSP` payload (status byte already stripped).
pub fn parse_ieee_addr_response(data: &[u8]) -> Result<IeeeAddrResponse> {
    if data.len() < 12 {
        return Err(Error::decode(format!(
            "IeeeAddrResponse: expected at least 12 bytes, got {}",
            data.len()
        )));
    }
    let mut cursor = Cursor::new(data);
    let ieee_addr = cursor.get_u64_le();
    let nwk_addr = cursor.get_u16_le();
    let start_index = cursor.get_u8();
    let count = cursor.get_u8() as usize;
    if cursor.remaining() != count * 2 {
        return Err(Error::decode(format!(
            "IeeeAddrResponse: {count} children but {} bytes remain",
            cursor.remaining()
        )));
    }
    let mut assoc_dev_list = Vec::with_capacity(count);
    for _ in 0..count {
        assoc_dev_list.push(cursor.get_u16_le());
    }
    Ok(IeeeAddrResponse {
        ieee_addr,
        nwk_addr,
        start_index,
        assoc_dev_list,
    })
}

/// Parses the `(src_addr, status)` shape shared by the ZDO management
/// responses.
pub fn parse_addr_status(data: &[u8]) -> Result<(ShortAddress, u8)> {
    expect_len(data, 3, "management response")?;
    Ok((u16::from_le_bytes([data[0], data[1]]), data[2]))
}

/// Parses the `(endpoint, trans_id)` tail of an `AF_DATA_CONFIRM` (status
/// byte already stripped).
pub fn parse_data_confirm(data: &[u8]) -> Result<(u8, u8)> {
    expect_len(data, 2, "DataConfirm")?;
    Ok((data[0], data[1]))
}

/// Parses a one-byte-count-prefixed byte sequence.
pub fn parse_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let Some((&len, tail)) = data.split_first() else {
        return Err(Error::decode("byte sequence: empty payload"));
    };
    expect_len(tail, len as usize, "byte sequence")?;
    Ok(tail.to_vec())
}

/// Parses a one-byte-count-prefixed list of 16-bit words.
pub fn parse_word_list(data: &[u8]) -> Result<Vec<u16>> {
    let Some((&count, tail)) = data.split_first() else {
        return Err(Error::decode("word list: empty payload"));
    };
    expect_len(tail, count as usize * 2, "word list")?;
    Ok(tail
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect())
}

/// Parses a single byte.
pub fn parse_u8(data: &[u8]) -> Result<u8> {
    expect_len(data, 1, "u8")?;
    Ok(data[0])
}

/// Parses a little-endian 16-bit integer.
pub fn parse_u16(data: &[u8]) -> Result<u16> {
    expect_len(data, 2, "u16")?;
    Ok(u16::from_le_bytes([data[0], data[1]]))
}

/// Parses a little-endian 64-bit integer.
pub fn parse_u64(data: &[u8]) -> Result<u64> {
    expect_len(data, 8, "u64")?;
    let mut cursor = Cursor::new(data);
    Ok(cursor.get_u64_le())
}

/// Parses a `ZDO_GET_LINK_KEY` response (status byte already stripped).
pub fn parse_link_key(data: &[u8]) -> Result<(IeeeAddress, [u8; 16])> {
    expect_len(data, 24, "link key")?;
    let mut cursor = Cursor::new(data);
    let ieee = cursor.get_u64_le();
    let mut key = [0u8; 16];
    cursor.copy_to_slice(&mut key);
    Ok((ieee, key))
}

/// Parses a `ZB_READ_CONFIGURATION` response (status byte already
/// stripped): the echoed configuration id and the value bytes.
pub fn parse_config_value(data: &[u8]) -> Result<(u8, Vec<u8>)> {
    let Some((&config_id, tail)) = data.split_first() else {
        return Err(Error::decode("configuration value: empty payload"));
    };
    Ok((config_id, parse_bytes(tail)?))
}

/// Parses a `ZDO_EXT_FIND_GROUP` response (status byte already stripped):
/// the echoed group id and the group name. Trailing bytes are tolerated.
pub fn parse_group_name(data: &[u8]) -> Result<(u16, Vec<u8>)> {
    if data.len() < 3 {
        return Err(Error::decode(format!(
            "group name: expected at least 3 bytes, got {}",
            data.len()
        )));
    }
    let group_id = u16::from_le_bytes([data[0], data[1]]);
    let len = data[2] as usize;
    if data.len() < 3 + len {
        return Err(Error::decode(format!(
            "group name: name length {len} exceeds remaining {} bytes",
            data.len() - 3
        )));
    }
    Ok((group_id, data[3..3 + len].to_vec()))
}

/// Parses a `ZDO_STARTUP_FROM_APP` response.
pub fn parse_startup_from_app(data: &[u8]) -> Result<StartupFromAppResult> {
    expect_len(data, 1, "StartupFromApp")?;
    StartupFromAppResult::from_byte(data[0])
        .ok_or_else(|| Error::decode(format!("StartupFromApp: unknown result {}", data[0])))
}

fn parse_bind_target(cursor: &mut Cursor<&[u8]>) -> Result<BindTarget> {
    if !cursor.has_remaining() {
        return Err(Error::decode("bind target: missing mode byte"));
    }
    let mode = cursor.get_u8();
    let target = match mode {
        0 => BindTarget::NotPresent,
        1 => {
            if cursor.remaining() < 2 {
                return Err(Error::decode("bind target: truncated group address"));
            }
            BindTarget::Group(cursor.get_u16_le())
        }
        2 => {
            if cursor.remaining() < 2 {
                return Err(Error::decode("bind target: truncated short address"));
            }
            BindTarget::Short(cursor.get_u16_le())
        }
        3 => {
            if cursor.remaining() < 9 {
                return Err(Error::decode("bind target: truncated IEEE address"));
            }
            BindTarget::Ieee {
                address: cursor.get_u64_le(),
                endpoint: cursor.get_u8(),
            }
        }
        0xFF => BindTarget::Broadcast,
        other => {
            return Err(Error::decode(format!(
                "bind target: unknown addressing mode {other}"
            )))
        }
    };
    Ok(target)
}

/// Parses a `ZDO_MGMT_BIND_RSP` payload (status byte already stripped):
/// the table size, the start index, and the returned entries.
pub fn parse_bind_table(data: &[u8]) -> Result<(u8, u8, Vec<BindTableEntry>)> {
    if data.len() < 3 {
        return Err(Error::decode(format!(
            "bind table: expected at least 3 bytes, got {}",
            data.len()
        )));
    }
    let mut cursor = Cursor::new(data);
    let total = cursor.get_u8();
    let start_index = cursor.get_u8();
    let count = cursor.get_u8() as usize;

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        if cursor.remaining() < 11 {
            return Err(Error::decode("bind table: truncated entry"));
        }
        let src_addr = cursor.get_u64_le();
        let src_endpoint = cursor.get_u8();
        let cluster_id = cursor.get_u16_le();
        let target = parse_bind_target(&mut cursor)?;
        entries.push(BindTableEntry {
            src_addr,
            src_endpoint,
            cluster_id,
            target,
        });
    }
    if cursor.has_remaining() {
        return Err(Error::decode(format!(
            "bind table: {} trailing bytes",
            cursor.remaining()
        )));
    }
    Ok((total, start_index, entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status_success() {
        assert_eq!(check_status(&[0x00, 0xAA, 0xBB]).unwrap(), &[0xAA, 0xBB]);
        check_only_status(&[0x00]).unwrap();
    }

    #[test]
    fn test_check_status_failures() {
        assert!(matches!(
            check_status(&[]),
            Err(Error::Protocol { .. })
        ));
        assert!(matches!(
            check_status(&[0x0A]),
            Err(Error::Status { code: 0x0A })
        ));
        assert!(matches!(
            check_only_status(&[0x00, 0x01]),
            Err(Error::Protocol { .. })
        ));
    }

    #[test]
    fn test_parse_rpc_error() {
        // SREQ to ZDO 0x34, refused with code 2.
        let (code, kind, command) = parse_rpc_error(&[0x02, 0x25, 0x34]).unwrap();
        assert_eq!(code, 2);
        assert_eq!(kind, CommandType::Sreq);
        assert_eq!(command, Command::new(Subsystem::Zdo, 0x34));

        assert!(parse_rpc_error(&[0x02, 0x25]).is_err());
        // Bad subsystem nibble.
        assert!(parse_rpc_error(&[0x02, 0x2C, 0x34]).is_err());
    }

    #[test]
    fn test_parse_reset_info() {
        let info = parse_reset_info(&[0x01, 0x02, 0x00, 0x02, 0x06, 0x03]).unwrap();
        assert_eq!(info.reason, ResetReason::External);
        assert_eq!(info.major_rel, 2);
        assert_eq!(info.hw_rev, 3);

        assert!(parse_reset_info(&[0x01, 0x02]).is_err());
    }

    #[test]
    fn test_parse_version_tolerates_trailing() {
        let data = [0x02, 0x00, 0x02, 0x06, 0x03, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let info = parse_version_info(&data).unwrap();
        assert_eq!(info.maint_rel, 3);
    }

    #[test]
    fn test_parse_incoming_msg_partial() {
        let mut data = vec![
            0x00, 0x00, // group
            0x06, 0x00, // cluster
            0x34, 0x12, // src addr
            0x01, // src ep
            0x01, // dst ep
            0x00, // broadcast
            0x7A, // lqi
            0x00, // security
            0x10, 0x20, 0x30, 0x40, // timestamp
            0x05, // seq
            0x02, 0xDE, 0xAD, // data
        ];
        let msg = parse_incoming_msg(&data, false).unwrap();
        assert_eq!(msg.cluster_id, 6);
        assert_eq!(msg.src_addr, 0x1234);
        assert_eq!(msg.data, vec![0xDE, 0xAD]);

        // Trailing bytes only pass when partial decoding is allowed.
        data.extend_from_slice(&[0x00, 0x00, 0x00]);
        assert!(parse_incoming_msg(&data, false).is_err());
        let msg = parse_incoming_msg(&data, true).unwrap();
        assert_eq!(msg.data, vec![0xDE, 0xAD]);
    }

    #[test]
    fn test_parse_ieee_addr_response() {
        let data = [
            0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11, 0x00, // ieee
            0x34, 0x12, // nwk
            0x00, // start index
            0x02, // count
            0x01, 0x00, 0x02, 0x00, // children
        ];
        let rsp = parse_ieee_addr_response(&data).unwrap();
        assert_eq!(rsp.ieee_addr, 0x0011_2233_4455_6677);
        assert_eq!(rsp.nwk_addr, 0x1234);
        assert_eq!(rsp.assoc_dev_list, vec![1, 2]);

        assert!(parse_ieee_addr_response(&data[..13]).is_err());
    }

    #[test]
    fn test_parse_bind_table() {
        let data = [
            0x02, // total entries
            0x00, // start index
            0x01, // count
            0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11, 0x00, // src ieee
            0x01, // src ep
            0x06, 0x00, // cluster
            0x03, // mode: ieee
            0xEF, 0xCD, 0xAB, 0x89, 0x67, 0x45, 0x23, 0x01, // dst ieee
            0x02, // dst ep
        ];
        let (total, start, entries) = parse_bind_table(&data).unwrap();
        assert_eq!((total, start), (2, 0));
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].target,
            BindTarget::Ieee {
                address: 0x0123_4567_89AB_CDEF,
                endpoint: 2,
            }
        );
    }

    #[test]
    fn test_parse_bytes_and_words() {
        assert_eq!(parse_bytes(&[0x02, 0xAA, 0xBB]).unwrap(), vec![0xAA, 0xBB]);
        assert!(parse_bytes(&[0x02, 0xAA]).is_err());
        assert!(parse_bytes(&[0x01, 0xAA, 0xBB]).is_err());

        assert_eq!(
            parse_word_list(&[0x02, 0x01, 0x00, 0x02, 0x00]).unwrap(),
            vec![1, 2]
        );
        assert!(parse_word_list(&[0x02, 0x01, 0x00]).is_err());
    }

    #[test]
    fn test_parse_group_name_tolerates_trailing() {
        let (group, name) = parse_group_name(&[0x2A, 0x00, 0x03, b'o', b'n', b'e', 0xFF]).unwrap();
        assert_eq!(group, 0x2A);
        assert_eq!(name, b"one".to_vec());
    }
}
