//! Executes bridge [`Action`]s against the Bluedroid API.
//!
//! API-call failures are logged; where the bridge needs to know (the
//! characteristic enumeration), a failure event is synthesized so its
//! fail paths stay uniform.

use super::{dispatch_gattc, gattc_if, mark_failed, service_range};
use crate::ble::event::{Action, CharacteristicInfo, GattStatus, GattcEvent, ServiceKind};
use crate::config;
use esp_idf_svc::sys;
use heapless::Vec;
use log::{debug, warn};

pub fn run(actions: &[Action]) {
    for action in actions {
        execute(action);
    }
}

fn execute(action: &Action) {
    let Some(gattc_if) = gattc_if() else {
        warn!("action {:?} before GATT client registration", action);
        return;
    };

    let err = unsafe {
        match *action {
            Action::ConfigureSecurity => configure_security(),
            Action::SetScanParams => {
                let mut params = sys::esp_ble_scan_params_t {
                    scan_type: sys::esp_ble_scan_type_t_BLE_SCAN_TYPE_ACTIVE,
                    own_addr_type: sys::esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                    scan_filter_policy: sys::esp_ble_scan_filter_t_BLE_SCAN_FILTER_ALLOW_ALL,
                    scan_interval: config::SCAN_INTERVAL,
                    scan_window: config::SCAN_WINDOW,
                    scan_duplicate: sys::esp_ble_scan_duplicate_t_BLE_SCAN_DUPLICATE_DISABLE,
                };
                sys::esp_ble_gap_set_scan_params(&mut params)
            }
            // 0 = scan until explicitly stopped
            Action::StartScan => sys::esp_ble_gap_start_scanning(0),
            Action::StopScan => sys::esp_ble_gap_stop_scanning(),
            Action::OpenConnection { addr } => {
                let mut bda = addr.0;
                sys::esp_ble_gattc_open(
                    gattc_if,
                    bda.as_mut_ptr(),
                    sys::esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                    true,
                )
            }
            Action::CloseConnection { conn_id } => sys::esp_ble_gattc_close(gattc_if, conn_id),
            Action::RequestMtu { conn_id } => sys::esp_ble_gattc_send_mtu_req(gattc_if, conn_id),
            Action::StartEncryption { addr } => {
                let mut bda = addr.0;
                sys::esp_ble_set_encryption(
                    bda.as_mut_ptr(),
                    sys::esp_ble_sec_act_t_ESP_BLE_SEC_ENCRYPT,
                )
            }
            Action::RespondToSecurityRequest { addr, accept } => {
                let mut bda = addr.0;
                sys::esp_ble_gap_security_rsp(bda.as_mut_ptr(), accept)
            }
            Action::ConfirmNumericComparison { addr, accept } => {
                let mut bda = addr.0;
                sys::esp_ble_confirm_reply(bda.as_mut_ptr(), accept)
            }
            Action::SearchService { conn_id, uuid16 } => {
                let mut uuid = sys::esp_bt_uuid_t {
                    len: sys::ESP_UUID_LEN_16 as u16,
                    uuid: sys::esp_bt_uuid_t__bindgen_ty_1 { uuid16 },
                };
                sys::esp_ble_gattc_search_service(gattc_if, conn_id, &mut uuid)
            }
            Action::ListCharacteristics { conn_id, service } => {
                list_characteristics(gattc_if, conn_id, service);
                sys::ESP_OK
            }
            Action::ReadCharacteristic { conn_id, handle } => sys::esp_ble_gattc_read_char(
                gattc_if,
                conn_id,
                handle,
                sys::esp_gatt_auth_req_t_ESP_GATT_AUTH_REQ_NONE,
            ),
            Action::WriteCharacteristic {
                conn_id,
                handle,
                value,
            } => {
                let mut buf = [value];
                // With-response write: the completion event must carry
                // the peer's ack, not local queueing.
                sys::esp_ble_gattc_write_char(
                    gattc_if,
                    conn_id,
                    handle,
                    buf.len() as u16,
                    buf.as_mut_ptr(),
                    sys::esp_gatt_write_type_t_ESP_GATT_WRITE_TYPE_RSP,
                    sys::esp_gatt_auth_req_t_ESP_GATT_AUTH_REQ_NONE,
                )
            }
            Action::WriteDescriptor {
                conn_id,
                handle,
                value,
            } => {
                let mut buf = value.to_le_bytes();
                sys::esp_ble_gattc_write_char_descr(
                    gattc_if,
                    conn_id,
                    handle,
                    buf.len() as u16,
                    buf.as_mut_ptr(),
                    sys::esp_gatt_write_type_t_ESP_GATT_WRITE_TYPE_RSP,
                    sys::esp_gatt_auth_req_t_ESP_GATT_AUTH_REQ_NONE,
                )
            }
            Action::RegisterForNotify { addr, handle } => {
                let mut bda = addr.0;
                sys::esp_ble_gattc_register_for_notify(gattc_if, bda.as_mut_ptr(), handle)
            }
            Action::MarkFailed => {
                mark_failed();
                sys::ESP_OK
            }
        }
    };

    if err != sys::ESP_OK {
        warn!("action {:?} failed: esp_err {}", action, err);
    }
}

/// The fixed pairing policy: Just-Works bonding, no IO capabilities,
/// 16-byte key, encryption + identity key distribution both ways.
unsafe fn configure_security() -> sys::esp_err_t {
    // Bonding without requiring Secure Connections: legacy-pairing
    // controllers must still be able to pair.
    let mut auth_req = sys::esp_ble_auth_req_t_ESP_LE_AUTH_BOND as u8;
    let mut iocap = sys::esp_ble_io_cap_t_ESP_IO_CAP_NONE as u8;
    let mut key_size: u8 = 16;
    let mut key_dist =
        (sys::ESP_BLE_ENC_KEY_MASK | sys::ESP_BLE_ID_KEY_MASK) as u8;

    let params: [(sys::esp_ble_sm_param_t, *mut u8); 5] = [
        (
            sys::esp_ble_sm_param_t_ESP_BLE_SM_AUTHEN_REQ_MODE,
            &mut auth_req,
        ),
        (sys::esp_ble_sm_param_t_ESP_BLE_SM_IOCAP_MODE, &mut iocap),
        (
            sys::esp_ble_sm_param_t_ESP_BLE_SM_MAX_KEY_SIZE,
            &mut key_size,
        ),
        (
            sys::esp_ble_sm_param_t_ESP_BLE_SM_SET_INIT_KEY,
            &mut key_dist,
        ),
        (
            sys::esp_ble_sm_param_t_ESP_BLE_SM_SET_RSP_KEY,
            &mut key_dist,
        ),
    ];

    for (param, value) in params {
        let err = sys::esp_ble_gap_set_security_param(param, value.cast(), 1);
        if err != sys::ESP_OK {
            return err;
        }
    }
    sys::ESP_OK
}

/// Enumerate a service's characteristics and their CCC descriptors from
/// the local GATT cache, then feed the result back as an event.
unsafe fn list_characteristics(gattc_if: u8, conn_id: u16, service: ServiceKind) {
    let (start, end) = service_range(service);
    let mut chars: Vec<CharacteristicInfo, { config::MAX_SERVICE_CHARS }> = Vec::new();
    let mut listing_status = GattStatus::Ok;

    let mut elems: [sys::esp_gattc_char_elem_t; config::MAX_SERVICE_CHARS] =
        core::mem::zeroed();
    let mut count = config::MAX_SERVICE_CHARS as u16;
    let status = sys::esp_ble_gattc_get_all_char(
        gattc_if,
        conn_id,
        start,
        end,
        elems.as_mut_ptr(),
        &mut count,
        0,
    );

    if status != sys::esp_gatt_status_t_ESP_GATT_OK {
        listing_status = GattStatus::Failed(status as u8);
    } else {
        for elem in &elems[..count as usize] {
            if elem.uuid.len != sys::ESP_UUID_LEN_16 as u16 {
                continue;
            }
            let info = CharacteristicInfo {
                uuid16: elem.uuid.uuid.uuid16,
                handle: elem.char_handle,
                ccc_handle: find_ccc_descriptor(gattc_if, conn_id, elem.char_handle),
            };
            if chars.push(info).is_err() {
                debug!("characteristic list full for service {:?}", service);
                break;
            }
        }
    }

    dispatch_gattc(&GattcEvent::CharacteristicsListed {
        service,
        status: listing_status,
        chars: &chars,
    });
}

unsafe fn find_ccc_descriptor(gattc_if: u8, conn_id: u16, char_handle: u16) -> u16 {
    let mut descrs: [sys::esp_gattc_descr_elem_t; 4] = core::mem::zeroed();
    let mut count = descrs.len() as u16;
    let status = sys::esp_ble_gattc_get_all_descr(
        gattc_if,
        conn_id,
        char_handle,
        descrs.as_mut_ptr(),
        &mut count,
        0,
    );
    if status != sys::esp_gatt_status_t_ESP_GATT_OK {
        return 0;
    }
    descrs[..count as usize]
        .iter()
        .find(|d| {
            d.uuid.len == sys::ESP_UUID_LEN_16 as u16
                && d.uuid.uuid.uuid16 == config::CCC_DESCRIPTOR_UUID
        })
        .map(|d| d.handle)
        .unwrap_or(0)
}
