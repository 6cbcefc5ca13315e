//! Per-command wrappers for ZNP operations.
//!
//! Each wrapper encodes its payload, drives the request through the
//! mediator core ([`send_sreq`], [`wait_for`], [`wait_after`]) and decodes
//! the typed result.
//!
//! [`send_sreq`]: ZnpApi::send_sreq
//! [`wait_for`]: ZnpApi::wait_for
//! [`wait_after`]: ZnpApi::wait_after

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::client::ZnpApi;
use crate::error::{Error, Result};
use crate::event::{Event, EventFilter, EventKind};
use crate::protocol::command::{
    AfCommand, AppCnfCommand, CommandType, SapiCommand, SysCommand, UtilCommand, ZdoCommand,
};
use crate::protocol::parser::{self, IeeeAddrResponse, check_only_status, check_status};
use crate::transport::Transport;
use crate::types::{
    AddrMode, BindTableEntry, BindTarget, Capability, ConfigId, DeviceInfoParam, DeviceState,
    IeeeAddress, Latency, NvItemId, ResetInfo, ShortAddress, StartupFromAppResult, Status,
    VersionInfo,
};

/// How long to wait for the reset indication after a reset request.
pub const RESET_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for an AREQ follow-up that carries a correlating
/// address prefix (bind, unbind, binding table).
pub const ZDO_RESPONSE_TIMEOUT: Duration = Duration::from_secs(15);

/// How long to wait for the transmission confirm of a data request.
pub const DATA_CONFIRM_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum length of a group name on the device.
const MAX_GROUP_NAME: usize = 16;

fn put_bytes_u8len(buf: &mut BytesMut, value: &[u8]) -> Result<()> {
    let len = u8::try_from(value.len())
        .map_err(|_| Error::protocol(format!("byte sequence too long: {}", value.len())))?;
    buf.put_u8(len);
    buf.put_slice(value);
    Ok(())
}

fn put_words_u8len(buf: &mut BytesMut, values: &[u16]) -> Result<()> {
    let len = u8::try_from(values.len())
        .map_err(|_| Error::protocol(format!("word list too long: {}", values.len())))?;
    buf.put_u8(len);
    for value in values {
        buf.put_u16_le(*value);
    }
    Ok(())
}

fn put_bind_target(buf: &mut BytesMut, target: &BindTarget) {
    buf.put_u8(target.mode() as u8);
    match target {
        BindTarget::NotPresent | BindTarget::Broadcast => {}
        BindTarget::Group(group) => buf.put_u16_le(*group),
        BindTarget::Short(address) => buf.put_u16_le(*address),
        BindTarget::Ieee { address, endpoint } => {
            buf.put_u64_le(*address);
            buf.put_u8(*endpoint);
        }
    }
}

impl<T: Transport + 'static> ZnpApi<T> {
    // ==================== SYS Commands ====================

    /// Resets the device and waits for the reset indication.
    ///
    /// The reset command is an AREQ; the device answers with a
    /// `RESET_IND` event rather than an SRSP, so this captures the next
    /// reset event.
    ///
    /// # Errors
    ///
    /// Times out if no reset indication arrives within [`RESET_TIMEOUT`].
    pub async fn sys_reset(&self, soft_reset: bool) -> Result<ResetInfo> {
        let mut events = self.subscribe_filtered(EventFilter::kinds(vec![EventKind::Reset]));

        self.send_frame(
            CommandType::Areq,
            SysCommand::Reset.into(),
            Bytes::copy_from_slice(&[u8::from(soft_reset)]),
        )
        .await?;

        match tokio::time::timeout(RESET_TIMEOUT, events.recv()).await {
            Ok(Some(Event::Reset(info))) => Ok(info),
            Ok(_) => Err(Error::ChannelClosed),
            Err(_) => Err(Error::Timeout {
                timeout_ms: u64::try_from(RESET_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    /// Pings the device and returns its capability set.
    pub async fn sys_ping(&self) -> Result<Capability> {
        let rsp = self.send_sreq(SysCommand::Ping, Bytes::new()).await?;
        parser::parse_capability(&rsp)
    }

    /// Queries the firmware version.
    pub async fn sys_version(&self) -> Result<VersionInfo> {
        let rsp = self.send_sreq(SysCommand::Version, Bytes::new()).await?;
        parser::parse_version_info(&rsp)
    }

    /// Initializes an NV item with a length and initial contents.
    pub async fn sys_osal_nv_item_init(
        &self,
        id: NvItemId,
        item_len: u16,
        init_data: &[u8],
    ) -> Result<()> {
        let mut buf = BytesMut::with_capacity(5 + init_data.len());
        buf.put_u16_le(id as u16);
        buf.put_u16_le(item_len);
        put_bytes_u8len(&mut buf, init_data)?;
        let rsp = self.send_sreq(SysCommand::OsalNvItemInit, buf.freeze()).await?;
        check_only_status(&rsp)
    }

    /// Reads an NV item starting at `offset`.
    pub async fn sys_osal_nv_read(&self, id: NvItemId, offset: u8) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(3);
        buf.put_u16_le(id as u16);
        buf.put_u8(offset);
        let rsp = self.send_sreq(SysCommand::OsalNvRead, buf.freeze()).await?;
        parser::parse_bytes(check_status(&rsp)?)
    }

    /// Writes an NV item starting at `offset`.
    pub async fn sys_osal_nv_write(&self, id: NvItemId, offset: u8, value: &[u8]) -> Result<()> {
        let mut buf = BytesMut::with_capacity(4 + value.len());
        buf.put_u16_le(id as u16);
        buf.put_u8(offset);
        put_bytes_u8len(&mut buf, value)?;
        let rsp = self.send_sreq(SysCommand::OsalNvWrite, buf.freeze()).await?;
        check_only_status(&rsp)
    }

    /// Deletes an NV item. `item_len` must match the item's actual length.
    pub async fn sys_osal_nv_delete(&self, id: NvItemId, item_len: u16) -> Result<()> {
        let mut buf = BytesMut::with_capacity(4);
        buf.put_u16_le(id as u16);
        buf.put_u16_le(item_len);
        let rsp = self.send_sreq(SysCommand::OsalNvDelete, buf.freeze()).await?;
        check_only_status(&rsp)
    }

    /// Queries an NV item's length. Returns 0 for a missing item.
    pub async fn sys_osal_nv_length(&self, id: NvItemId) -> Result<u16> {
        let mut buf = BytesMut::with_capacity(2);
        buf.put_u16_le(id as u16);
        let rsp = self.send_sreq(SysCommand::OsalNvLength, buf.freeze()).await?;
        parser::parse_u16(&rsp)
    }

    // ==================== AF Commands ====================

    /// Registers an application endpoint.
    #[allow(clippy::too_many_arguments)]
    pub async fn af_register(
        &self,
        endpoint: u8,
        profile_id: u16,
        device_id: u16,
        version: u8,
        latency: Latency,
        input_clusters: &[u16],
        output_clusters: &[u16],
    ) -> Result<()> {
        let mut buf = BytesMut::with_capacity(
            9 + 2 * (input_clusters.len() + output_clusters.len()),
        );
        buf.put_u8(endpoint);
        buf.put_u16_le(profile_id);
        buf.put_u16_le(device_id);
        buf.put_u8(version);
        buf.put_u8(latency as u8);
        put_words_u8len(&mut buf, input_clusters)?;
        put_words_u8len(&mut buf, output_clusters)?;
        let rsp = self.send_sreq(AfCommand::Register, buf.freeze()).await?;
        check_only_status(&rsp)
    }

    /// Sends an AF data frame and waits for the transmission confirm.
    ///
    /// The confirm does not lead with a correlator the waiter could
    /// prefix-match on, so concurrent data requests can cross-match their
    /// confirms; the endpoint/transaction check below rejects a foreign
    /// confirm after the fact.
    // TODO: match confirms on (endpoint, trans_id) once wait_for grows a
    // decoder-driven predicate.
    #[allow(clippy::too_many_arguments)]
    pub async fn af_data_request(
        &self,
        dst_addr: ShortAddress,
        dst_endpoint: u8,
        src_endpoint: u8,
        cluster_id: u16,
        trans_id: u8,
        options: u8,
        radius: u8,
        data: &[u8],
    ) -> Result<()> {
        let mut buf = BytesMut::with_capacity(11 + data.len());
        buf.put_u16_le(dst_addr);
        buf.put_u8(dst_endpoint);
        buf.put_u8(src_endpoint);
        buf.put_u16_le(cluster_id);
        buf.put_u8(trans_id);
        buf.put_u8(options);
        buf.put_u8(radius);
        put_bytes_u8len(&mut buf, data)?;
        let payload = buf.freeze();

        let confirm = self
            .wait_after(
                async {
                    let rsp = self.send_sreq(AfCommand::DataRequest, payload).await?;
                    check_only_status(&rsp)
                },
                CommandType::Areq,
                AfCommand::DataConfirm,
                Some(DATA_CONFIRM_TIMEOUT),
                Vec::new(),
            )
            .await?;

        let (endpoint, received_trans_id) = parser::parse_data_confirm(check_status(&confirm)?)?;
        if (endpoint, received_trans_id) != (dst_endpoint, trans_id) {
            tracing::warn!(
                "data confirm for endpoint {endpoint} transaction {received_trans_id} \
                 does not match request"
            );
            return Err(Error::protocol(
                "data request and data confirm out of sync",
            ));
        }
        Ok(())
    }

    // ==================== ZDO Commands ====================

    /// Starts the stack from application state.
    pub async fn zdo_startup_from_app(
        &self,
        start_delay_ms: u16,
    ) -> Result<StartupFromAppResult> {
        let mut buf = BytesMut::with_capacity(2);
        buf.put_u16_le(start_delay_ms);
        let rsp = self.send_sreq(ZdoCommand::StartupFromApp, buf.freeze()).await?;
        parser::parse_startup_from_app(&rsp)
    }

    /// Queries a device's IEEE address and, optionally, its children.
    pub async fn zdo_ieee_address(
        &self,
        address: ShortAddress,
        children_index: Option<u8>,
    ) -> Result<IeeeAddrResponse> {
        let mut buf = BytesMut::with_capacity(4);
        buf.put_u16_le(address);
        buf.put_u8(u8::from(children_index.is_some()));
        buf.put_u8(children_index.unwrap_or(0));
        let payload = buf.freeze();

        let rsp = self
            .wait_after(
                async {
                    let rsp = self.send_sreq(ZdoCommand::IeeeAddrReq, payload).await?;
                    check_only_status(&rsp)
                },
                CommandType::Areq,
                ZdoCommand::IeeeAddrRsp,
                None,
                Vec::new(),
            )
            .await?;
        parser::parse_ieee_addr_response(check_status(&rsp)?)
    }

    /// Removes the link key of a device.
    pub async fn zdo_remove_link_key(&self, ieee_addr: IeeeAddress) -> Result<()> {
        let mut buf = BytesMut::with_capacity(8);
        buf.put_u64_le(ieee_addr);
        let rsp = self.send_sreq(ZdoCommand::RemoveLinkKey, buf.freeze()).await?;
        check_only_status(&rsp)
    }

    /// Reads the link key of a device.
    pub async fn zdo_get_link_key(
        &self,
        ieee_addr: IeeeAddress,
    ) -> Result<(IeeeAddress, [u8; 16])> {
        let mut buf = BytesMut::with_capacity(8);
        buf.put_u64_le(ieee_addr);
        let rsp = self.send_sreq(ZdoCommand::GetLinkKey, buf.freeze()).await?;
        parser::parse_link_key(check_status(&rsp)?)
    }

    /// Asks a device to leave the network.
    ///
    /// Returns the short address echoed by the management response.
    pub async fn zdo_mgmt_leave(
        &self,
        dst_addr: ShortAddress,
        device_addr: IeeeAddress,
        remove_rejoin: u8,
    ) -> Result<ShortAddress> {
        let mut buf = BytesMut::with_capacity(11);
        buf.put_u16_le(dst_addr);
        buf.put_u64_le(device_addr);
        buf.put_u8(remove_rejoin);
        let payload = buf.freeze();

        let rsp = self
            .wait_after(
                async {
                    let rsp = self.send_sreq(ZdoCommand::MgmtLeaveReq, payload).await?;
                    check_only_status(&rsp)
                },
                CommandType::Areq,
                ZdoCommand::MgmtLeaveRsp,
                None,
                Vec::new(),
            )
            .await?;
        Self::check_mgmt_response(&rsp)
    }

    /// Asks a router to direct-join a device.
    pub async fn zdo_mgmt_direct_join(
        &self,
        dst_addr: ShortAddress,
        device_addr: IeeeAddress,
    ) -> Result<ShortAddress> {
        let mut buf = BytesMut::with_capacity(10);
        buf.put_u16_le(dst_addr);
        buf.put_u64_le(device_addr);
        let payload = buf.freeze();

        let rsp = self
            .wait_after(
                async {
                    let rsp = self.send_sreq(ZdoCommand::MgmtDirectJoinReq, payload).await?;
                    check_only_status(&rsp)
                },
                CommandType::Areq,
                ZdoCommand::MgmtDirectJoinRsp,
                None,
                Vec::new(),
            )
            .await?;
        Self::check_mgmt_response(&rsp)
    }

    /// Opens or closes the permit-join window.
    pub async fn zdo_mgmt_permit_join(
        &self,
        addr_mode: AddrMode,
        dst_addr: ShortAddress,
        duration: u8,
        tc_significance: u8,
    ) -> Result<ShortAddress> {
        let mut buf = BytesMut::with_capacity(5);
        buf.put_u8(addr_mode as u8);
        buf.put_u16_le(dst_addr);
        buf.put_u8(duration);
        buf.put_u8(tc_significance);
        let payload = buf.freeze();

        let rsp = self
            .wait_after(
                async {
                    let rsp = self
                        .send_sreq(ZdoCommand::MgmtPermitJoinReq, payload)
                        .await?;
                    check_only_status(&rsp)
                },
                CommandType::Areq,
                ZdoCommand::MgmtPermitJoinRsp,
                None,
                Vec::new(),
            )
            .await?;
        Self::check_mgmt_response(&rsp)
    }

    fn check_mgmt_response(rsp: &[u8]) -> Result<ShortAddress> {
        let (addr, status) = parser::parse_addr_status(rsp)?;
        if status != Status::Success as u8 {
            return Err(Error::Status { code: status });
        }
        Ok(addr)
    }

    /// Requests a node descriptor; the answer arrives as a ZDO AREQ.
    pub async fn zdo_node_desc_req(&self, address: ShortAddress) -> Result<()> {
        let mut buf = BytesMut::with_capacity(4);
        buf.put_u16_le(address);
        buf.put_u16_le(address);
        let rsp = self.send_sreq(ZdoCommand::NodeDescReq, buf.freeze()).await?;
        check_only_status(&rsp)
    }

    /// Requests the active endpoints; the answer arrives as a ZDO AREQ.
    pub async fn zdo_active_ep_req(&self, address: ShortAddress) -> Result<()> {
        let mut buf = BytesMut::with_capacity(4);
        buf.put_u16_le(address);
        buf.put_u16_le(address);
        let rsp = self.send_sreq(ZdoCommand::ActiveEpReq, buf.freeze()).await?;
        check_only_status(&rsp)
    }

    /// Requests a simple descriptor; the answer arrives as a ZDO AREQ.
    pub async fn zdo_simple_desc_req(&self, address: ShortAddress, endpoint: u8) -> Result<()> {
        let mut buf = BytesMut::with_capacity(5);
        buf.put_u16_le(address);
        buf.put_u16_le(address);
        buf.put_u8(endpoint);
        let rsp = self.send_sreq(ZdoCommand::SimpleDescReq, buf.freeze()).await?;
        check_only_status(&rsp)
    }

    /// Creates a binding on a remote device.
    pub async fn zdo_bind(
        &self,
        dst_addr: ShortAddress,
        src_address: IeeeAddress,
        src_endpoint: u8,
        cluster_id: u16,
        target: BindTarget,
    ) -> Result<()> {
        self.bind_or_unbind(ZdoCommand::BindReq, ZdoCommand::BindRsp, dst_addr, src_address, src_endpoint, cluster_id, target)
            .await
    }

    /// Removes a binding from a remote device.
    pub async fn zdo_unbind(
        &self,
        dst_addr: ShortAddress,
        src_address: IeeeAddress,
        src_endpoint: u8,
        cluster_id: u16,
        target: BindTarget,
    ) -> Result<()> {
        self.bind_or_unbind(ZdoCommand::UnbindReq, ZdoCommand::UnbindRsp, dst_addr, src_address, src_endpoint, cluster_id, target)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn bind_or_unbind(
        &self,
        request: ZdoCommand,
        response: ZdoCommand,
        dst_addr: ShortAddress,
        src_address: IeeeAddress,
        src_endpoint: u8,
        cluster_id: u16,
        target: BindTarget,
    ) -> Result<()> {
        let mut buf = BytesMut::with_capacity(23);
        buf.put_u16_le(dst_addr);
        buf.put_u64_le(src_address);
        buf.put_u8(src_endpoint);
        buf.put_u16_le(cluster_id);
        put_bind_target(&mut buf, &target);
        let payload = buf.freeze();

        // The response leads with the responder's address, which makes a
        // usable correlation prefix.
        let rsp = self
            .wait_after(
                async {
                    let rsp = self.send_sreq(request, payload).await?;
                    check_only_status(&rsp)
                },
                CommandType::Areq,
                response,
                Some(ZDO_RESPONSE_TIMEOUT),
                dst_addr.to_le_bytes().to_vec(),
            )
            .await?;
        check_only_status(&rsp)
    }

    /// Reads a slice of a remote device's binding table.
    ///
    /// Returns the table size, the start index of the returned slice and
    /// the entries.
    pub async fn zdo_mgmt_bind_req(
        &self,
        dst_addr: ShortAddress,
        start_index: u8,
    ) -> Result<(u8, u8, Vec<BindTableEntry>)> {
        let mut buf = BytesMut::with_capacity(3);
        buf.put_u16_le(dst_addr);
        buf.put_u8(start_index);
        let payload = buf.freeze();

        let rsp = self
            .wait_after(
                async {
                    let rsp = self.send_sreq(ZdoCommand::MgmtBindReq, payload).await?;
                    check_only_status(&rsp)
                },
                CommandType::Areq,
                ZdoCommand::MgmtBindRsp,
                Some(ZDO_RESPONSE_TIMEOUT),
                dst_addr.to_le_bytes().to_vec(),
            )
            .await?;
        parser::parse_bind_table(check_status(&rsp)?)
    }

    /// Adds an endpoint to a group.
    pub async fn zdo_ext_add_group(
        &self,
        endpoint: u8,
        group_id: u16,
        group_name: &str,
    ) -> Result<()> {
        if group_name.len() > MAX_GROUP_NAME {
            return Err(Error::protocol("group name is too long"));
        }
        let mut buf = BytesMut::with_capacity(4 + group_name.len());
        buf.put_u8(endpoint);
        buf.put_u16_le(group_id);
        put_bytes_u8len(&mut buf, group_name.as_bytes())?;
        let rsp = self.send_sreq(ZdoCommand::ExtAddGroup, buf.freeze()).await?;
        check_only_status(&rsp)
    }

    /// Removes an endpoint from a group.
    pub async fn zdo_ext_remove_group(&self, endpoint: u8, group_id: u16) -> Result<()> {
        let mut buf = BytesMut::with_capacity(3);
        buf.put_u8(endpoint);
        buf.put_u16_le(group_id);
        let rsp = self.send_sreq(ZdoCommand::ExtRemoveGroup, buf.freeze()).await?;
        check_only_status(&rsp)
    }

    /// Removes an endpoint from all groups.
    pub async fn zdo_ext_remove_all_group(&self, endpoint: u8) -> Result<()> {
        let mut buf = BytesMut::with_capacity(1);
        buf.put_u8(endpoint);
        // Some firmwares echo EXT_REMOVE_GROUP instead of the request's
        // own command code.
        let rsp = self
            .send_sreq_accepting(
                ZdoCommand::ExtRemoveAllGroup,
                vec![
                    ZdoCommand::ExtRemoveAllGroup.into(),
                    ZdoCommand::ExtRemoveGroup.into(),
                ],
                buf.freeze(),
            )
            .await?;
        check_only_status(&rsp)
    }

    /// Lists the groups an endpoint belongs to.
    pub async fn zdo_ext_find_all_groups_endpoint(&self, endpoint: u8) -> Result<Vec<u16>> {
        let mut buf = BytesMut::with_capacity(2);
        buf.put_u8(endpoint);
        buf.put_u8(0);
        let rsp = self
            .send_sreq(ZdoCommand::ExtFindAllGroupsEndpoint, buf.freeze())
            .await?;
        parser::parse_word_list(&rsp)
    }

    /// Looks up a group's name on an endpoint.
    pub async fn zdo_ext_find_group(&self, endpoint: u8, group_id: u16) -> Result<String> {
        let mut buf = BytesMut::with_capacity(3);
        buf.put_u8(endpoint);
        buf.put_u16_le(group_id);
        let rsp = self.send_sreq(ZdoCommand::ExtFindGroup, buf.freeze()).await?;
        let (received_group_id, name) = parser::parse_group_name(check_status(&rsp)?)?;
        if received_group_id != group_id {
            return Err(Error::protocol(
                "received group id did not match requested group id",
            ));
        }
        Ok(String::from_utf8_lossy(&name).into_owned())
    }

    /// Counts the groups across all endpoints.
    pub async fn zdo_ext_count_all_groups(&self) -> Result<u8> {
        let rsp = self
            .send_sreq(ZdoCommand::ExtCountAllGroups, Bytes::new())
            .await?;
        parser::parse_u8(&rsp)
    }

    // ==================== SAPI Commands ====================

    /// Reads a configuration property.
    pub async fn sapi_read_configuration(&self, config: ConfigId) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(1);
        buf.put_u8(config as u8);
        let rsp = self
            .send_sreq(SapiCommand::ReadConfiguration, buf.freeze())
            .await?;
        let (received_config, value) = parser::parse_config_value(check_status(&rsp)?)?;
        if received_config != config as u8 {
            return Err(Error::protocol("read configuration returned wrong property"));
        }
        Ok(value)
    }

    /// Writes a configuration property.
    pub async fn sapi_write_configuration(&self, config: ConfigId, value: &[u8]) -> Result<()> {
        let mut buf = BytesMut::with_capacity(2 + value.len());
        buf.put_u8(config as u8);
        put_bytes_u8len(&mut buf, value)?;
        let rsp = self
            .send_sreq(SapiCommand::WriteConfiguration, buf.freeze())
            .await?;
        check_only_status(&rsp)
    }

    /// Reads a device info property.
    ///
    /// The device answers with the echoed property id and eight value
    /// bytes regardless of the property's width; the caller takes the
    /// prefix it needs.
    pub async fn sapi_get_device_info(&self, param: DeviceInfoParam) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(1);
        buf.put_u8(param as u8);
        let rsp = self.send_sreq(SapiCommand::GetDeviceInfo, buf.freeze()).await?;
        let Some((&echoed, value)) = rsp.split_first() else {
            return Err(Error::protocol("expected more data from device info response"));
        };
        if echoed != param as u8 {
            return Err(Error::protocol("wrong device info property returned"));
        }
        Ok(value.to_vec())
    }

    /// Reads the current device state.
    pub async fn device_state(&self) -> Result<DeviceState> {
        let value = self.sapi_get_device_info(DeviceInfoParam::DeviceState).await?;
        let Some(&state) = value.first() else {
            return Err(Error::decode("empty device state value"));
        };
        DeviceState::from_byte(state)
            .ok_or_else(|| Error::decode(format!("unknown device state {state}")))
    }

    /// Reads the device's IEEE address.
    pub async fn device_ieee_address(&self) -> Result<IeeeAddress> {
        let value = self
            .sapi_get_device_info(DeviceInfoParam::DeviceIeeeAddress)
            .await?;
        parser::parse_u64(&value)
    }

    /// Reads the device's short address.
    pub async fn device_short_address(&self) -> Result<ShortAddress> {
        let value = self
            .sapi_get_device_info(DeviceInfoParam::DeviceShortAddress)
            .await?;
        if value.len() < 2 {
            return Err(Error::decode("short device info value"));
        }
        Ok(u16::from_le_bytes([value[0], value[1]]))
    }

    /// Reads the PAN id of the current network.
    pub async fn device_pan_id(&self) -> Result<u16> {
        let value = self.sapi_get_device_info(DeviceInfoParam::PanId).await?;
        if value.len() < 2 {
            return Err(Error::decode("short device info value"));
        }
        Ok(u16::from_le_bytes([value[0], value[1]]))
    }

    // ==================== UTIL Commands ====================

    /// Looks up the IEEE address for a short address.
    pub async fn util_addrmgr_nwk_addr_lookup(
        &self,
        address: ShortAddress,
    ) -> Result<IeeeAddress> {
        let mut buf = BytesMut::with_capacity(2);
        buf.put_u16_le(address);
        let rsp = self
            .send_sreq(UtilCommand::AddrmgrNwkAddrLookup, buf.freeze())
            .await?;
        parser::parse_u64(&rsp)
    }

    /// Looks up the short address for an IEEE address.
    pub async fn util_addrmgr_ext_addr_lookup(
        &self,
        address: IeeeAddress,
    ) -> Result<ShortAddress> {
        let mut buf = BytesMut::with_capacity(8);
        buf.put_u64_le(address);
        let rsp = self
            .send_sreq(UtilCommand::AddrmgrExtAddrLookup, buf.freeze())
            .await?;
        parser::parse_u16(&rsp)
    }

    // ==================== APP_CNF Commands ====================

    /// Sets the BDB primary or secondary channel mask.
    pub async fn app_cnf_bdb_set_channel(
        &self,
        is_primary: bool,
        channel_mask: u32,
    ) -> Result<()> {
        let mut buf = BytesMut::with_capacity(5);
        buf.put_u8(u8::from(is_primary));
        buf.put_u32_le(channel_mask);
        let rsp = self
            .send_sreq(AppCnfCommand::BdbSetChannel, buf.freeze())
            .await?;
        check_only_status(&rsp)
    }

    /// Starts BDB commissioning in the given mode.
    pub async fn app_cnf_bdb_start_commissioning(&self, mode: u8) -> Result<()> {
        let mut buf = BytesMut::with_capacity(1);
        buf.put_u8(mode);
        let rsp = self
            .send_sreq(AppCnfCommand::BdbStartCommissioning, buf.freeze())
            .await?;
        check_only_status(&rsp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_target_encoding() {
        let mut buf = BytesMut::new();
        put_bind_target(
            &mut buf,
            &BindTarget::Ieee {
                address: 0x0123_4567_89AB_CDEF,
                endpoint: 2,
            },
        );
        assert_eq!(
            &buf[..],
            &[0x03, 0xEF, 0xCD, 0xAB, 0x89, 0x67, 0x45, 0x23, 0x01, 0x02]
        );

        let mut buf = BytesMut::new();
        put_bind_target(&mut buf, &BindTarget::Group(0x1234));
        assert_eq!(&buf[..], &[0x01, 0x34, 0x12]);

        let mut buf = BytesMut::new();
        put_bind_target(&mut buf, &BindTarget::Broadcast);
        assert_eq!(&buf[..], &[0xFF]);
    }

    #[test]
    fn test_length_prefixed_encoding() {
        let mut buf = BytesMut::new();
        put_bytes_u8len(&mut buf, &[0xAA, 0xBB]).unwrap();
        assert_eq!(&buf[..], &[0x02, 0xAA, 0xBB]);

        let mut buf = BytesMut::new();
        put_words_u8len(&mut buf, &[0x0006, 0x0008]).unwrap();
        assert_eq!(&buf[..], &[0x02, 0x06, 0x00, 0x08, 0x00]);

        let mut buf = BytesMut::new();
        assert!(put_bytes_u8len(&mut buf, &[0u8; 300]).is_err());
    }
}
