//! `extern "C"` Bluedroid callbacks.
//!
//! These translate the raw GAP / GATT-client parameter unions into the
//! crate's event enums and hand them to the shared bridge. Nothing is
//! decided here; every branch is a straight field copy.

use super::{dispatch_gap, dispatch_gattc, dispatch_scan_result, set_gattc_if};
use crate::ble::event::{BdAddr, GapEvent, GattStatus, GattcEvent, ScanResult};
use esp_idf_svc::sys;
use log::{debug, warn};

fn status(raw: sys::esp_gatt_status_t) -> GattStatus {
    if raw == sys::esp_gatt_status_t_ESP_GATT_OK {
        GattStatus::Ok
    } else {
        GattStatus::Failed(raw as u8)
    }
}

fn bt_ok(raw: sys::esp_bt_status_t) -> bool {
    raw == sys::esp_bt_status_t_ESP_BT_STATUS_SUCCESS
}

/// GAP callback. Runs on the Bluedroid task.
pub unsafe extern "C" fn gap_cb(
    event: sys::esp_gap_ble_cb_event_t,
    param: *mut sys::esp_ble_gap_cb_param_t,
) {
    let param = &*param;

    match event {
        sys::esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_PARAM_SET_COMPLETE_EVT => {
            dispatch_gap(&GapEvent::ScanParamsSet);
        }
        sys::esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_START_COMPLETE_EVT => {
            dispatch_gap(&GapEvent::ScanStarted {
                success: bt_ok(param.scan_start_cmpl.status),
            });
        }
        sys::esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_STOP_COMPLETE_EVT => {
            dispatch_gap(&GapEvent::ScanStopped);
        }
        sys::esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RESULT_EVT => {
            let rst = &param.scan_rst;
            if rst.search_evt == sys::esp_gap_search_evt_t_ESP_GAP_SEARCH_INQ_RES_EVT {
                let len = (rst.adv_data_len as usize + rst.scan_rsp_len as usize)
                    .min(rst.ble_adv.len());
                dispatch_scan_result(&ScanResult {
                    addr: BdAddr(rst.bda),
                    adv_data: &rst.ble_adv[..len],
                });
            }
        }
        sys::esp_gap_ble_cb_event_t_ESP_GAP_BLE_SEC_REQ_EVT => {
            dispatch_gap(&GapEvent::SecurityRequest {
                addr: BdAddr(param.ble_security.ble_req.bd_addr),
            });
        }
        sys::esp_gap_ble_cb_event_t_ESP_GAP_BLE_NC_REQ_EVT => {
            let key = &param.ble_security.key_notif;
            dispatch_gap(&GapEvent::NumericComparisonRequest {
                addr: BdAddr(key.bd_addr),
                passkey: key.passkey,
            });
        }
        sys::esp_gap_ble_cb_event_t_ESP_GAP_BLE_PASSKEY_NOTIF_EVT => {
            dispatch_gap(&GapEvent::PasskeyNotification {
                passkey: param.ble_security.key_notif.passkey,
            });
        }
        sys::esp_gap_ble_cb_event_t_ESP_GAP_BLE_KEY_EVT => {
            dispatch_gap(&GapEvent::KeyExchange {
                key_type: param.ble_security.ble_key.key_type as u8,
            });
        }
        sys::esp_gap_ble_cb_event_t_ESP_GAP_BLE_AUTH_CMPL_EVT => {
            let auth = &param.ble_security.auth_cmpl;
            dispatch_gap(&GapEvent::AuthenticationComplete {
                addr: BdAddr(auth.bd_addr),
                success: auth.success,
                bonded: auth.auth_mode & sys::esp_ble_auth_req_t_ESP_LE_AUTH_BOND as u8 != 0,
                fail_reason: auth.fail_reason,
            });
        }
        sys::esp_gap_ble_cb_event_t_ESP_GAP_BLE_REMOVE_BOND_DEV_COMPLETE_EVT => {
            dispatch_gap(&GapEvent::BondRemoved {
                success: bt_ok(param.remove_bond_dev_cmpl.status),
            });
        }
        _ => {
            debug!("unhandled GAP event {}", event);
        }
    }
}

/// GATT client callback. Runs on the Bluedroid task.
pub unsafe extern "C" fn gattc_cb(
    event: sys::esp_gattc_cb_event_t,
    gattc_if: sys::esp_gatt_if_t,
    param: *mut sys::esp_ble_gattc_cb_param_t,
) {
    let param = &*param;

    match event {
        sys::esp_gattc_cb_event_t_ESP_GATTC_REG_EVT => {
            set_gattc_if(gattc_if);
            dispatch_gattc(&GattcEvent::Registered {
                status: status(param.reg.status),
                app_id: param.reg.app_id,
            });
        }
        sys::esp_gattc_cb_event_t_ESP_GATTC_OPEN_EVT => {
            dispatch_gattc(&GattcEvent::Opened {
                status: status(param.open.status),
                conn_id: param.open.conn_id,
                addr: BdAddr(param.open.remote_bda),
            });
        }
        sys::esp_gattc_cb_event_t_ESP_GATTC_DISCONNECT_EVT => {
            dispatch_gattc(&GattcEvent::Closed {
                conn_id: param.disconnect.conn_id,
            });
        }
        sys::esp_gattc_cb_event_t_ESP_GATTC_CFG_MTU_EVT => {
            debug!("MTU configured: {}", param.cfg_mtu.mtu);
        }
        sys::esp_gattc_cb_event_t_ESP_GATTC_SEARCH_RES_EVT => {
            let res = &param.search_res;
            // Only 16-bit service UUIDs are of interest (DIS, HID).
            if res.srvc_id.uuid.len == sys::ESP_UUID_LEN_16 as u16 {
                dispatch_gattc(&GattcEvent::ServiceFound {
                    uuid16: res.srvc_id.uuid.uuid.uuid16,
                    start_handle: res.start_handle,
                    end_handle: res.end_handle,
                });
            }
        }
        sys::esp_gattc_cb_event_t_ESP_GATTC_SEARCH_CMPL_EVT => {
            dispatch_gattc(&GattcEvent::SearchComplete {
                status: status(param.search_cmpl.status),
            });
        }
        sys::esp_gattc_cb_event_t_ESP_GATTC_READ_CHAR_EVT => {
            let read = &param.read;
            let value = if read.value.is_null() {
                &[][..]
            } else {
                core::slice::from_raw_parts(read.value, read.value_len as usize)
            };
            dispatch_gattc(&GattcEvent::ReadComplete {
                status: status(read.status),
                handle: read.handle,
                value,
            });
        }
        sys::esp_gattc_cb_event_t_ESP_GATTC_WRITE_CHAR_EVT => {
            dispatch_gattc(&GattcEvent::WriteComplete {
                status: status(param.write.status),
                handle: param.write.handle,
            });
        }
        sys::esp_gattc_cb_event_t_ESP_GATTC_WRITE_DESCR_EVT => {
            dispatch_gattc(&GattcEvent::DescriptorWritten {
                status: status(param.write.status),
                handle: param.write.handle,
            });
        }
        sys::esp_gattc_cb_event_t_ESP_GATTC_REG_FOR_NOTIFY_EVT => {
            dispatch_gattc(&GattcEvent::NotifyRegistered {
                status: status(param.reg_for_notify.status),
                handle: param.reg_for_notify.handle,
            });
        }
        sys::esp_gattc_cb_event_t_ESP_GATTC_NOTIFY_EVT => {
            let notify = &param.notify;
            if notify.value.is_null() {
                warn!("notification with null payload");
                return;
            }
            let value = core::slice::from_raw_parts(notify.value, notify.value_len as usize);
            dispatch_gattc(&GattcEvent::Notification {
                conn_id: notify.conn_id,
                handle: notify.handle,
                value,
            });
        }
        _ => {
            debug!("unhandled GATTC event {}", event);
        }
    }
}
