//! Connection context and HID-over-GATT initialization sequencer.
//!
//! [`GamepadBridge`] is the heart of the crate: a callback-driven state
//! machine that takes language-neutral GAP/GATT events and returns the
//! side effects ([`Action`]s) the vendor adapter must execute. It never
//! calls into the stack itself, which keeps every transition testable
//! on the host.
//!
//! Lifecycle:
//! 1. GATT client registers; security policy and scan parameters apply.
//! 2. Scan results are filtered; the first gamepad match stops the scan
//!    and opens a connection.
//! 3. Encryption (Just-Works bonding) is started on open.
//! 4. After authentication: Device Information Service enumeration
//!    (PnP ID, optional), then HID service enumeration.
//! 5. The init sequencer walks HID Information -> Report Map ->
//!    Protocol Mode -> per-report-characteristic notify registration
//!    and CCC writes -> one priming read -> Complete.
//! 6. Notifications feed the controller parser; `poll()` diffs frames.
//!
//! There are no per-step timeouts: a peer that accepts a request and
//! never completes it stalls the sequence until the link supervision
//! timeout closes the connection.

use crate::ble::adv::AdvertisementInfo;
use crate::ble::event::{
    Action, Actions, BdAddr, CharacteristicInfo, GapEvent, GattcEvent, ScanResult, ServiceKind,
};
use crate::config;
use crate::controller::{AnyController, Button, ControllerState, InputEvent};
use heapless::Vec;
use log::{debug, info, warn};

/// HOGP initialization sequencer states, in wire order. Steps whose
/// characteristic is absent are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Idle,
    ReadingDisPnpId,
    ReadingHidInfo,
    ReadingReportMap,
    SettingProtocolMode,
    RegisteringNotifications,
    EnablingNotifications,
    ReadingInitialReport,
    Complete,
}

/// One HID Report characteristic and its CCC descriptor (0 = none).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportCharacteristic {
    pub char_handle: u16,
    pub ccc_handle: u16,
}

/// Attribute handles discovered on the peer. Handle 0 means absent.
#[derive(Debug, Default)]
pub struct HandleTable {
    pub dis_start: u16,
    pub dis_end: u16,
    pub dis_pnp_id: u16,
    pub hid_start: u16,
    pub hid_end: u16,
    pub hid_info: u16,
    pub report_map: u16,
    pub protocol_mode: u16,
    pub report_chars: Vec<ReportCharacteristic, { config::MAX_REPORT_CHARS }>,
}

impl HandleTable {
    fn reset(&mut self) {
        *self = HandleTable::default();
    }

    fn is_report_handle(&self, handle: u16) -> bool {
        handle != 0 && self.report_chars.iter().any(|r| r.char_handle == handle)
    }
}

/// Maximum input events one frame diff can produce (18 buttons + stick).
pub const MAX_FRAME_EVENTS: usize = 20;

/// The bridge: exactly one connection context.
pub struct GamepadBridge {
    conn_id: u16,
    remote_addr: BdAddr,
    connected: bool,
    scanning: bool,
    failed: bool,
    /// Set on every HID service search so a fruitless search is never
    /// answered with another round of DIS enumeration.
    hid_search_started: bool,
    handles: HandleTable,
    init_state: InitState,
    discovery_retries: u8,
    current_notify_index: usize,
    report_map: Vec<u8, { config::REPORT_MAP_MAX_LEN }>,
    vendor_id: u16,
    product_id: u16,
    active: Option<AnyController>,
    prev_state: ControllerState,
}

impl Default for GamepadBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl GamepadBridge {
    pub fn new() -> Self {
        Self {
            conn_id: 0,
            remote_addr: BdAddr::default(),
            connected: false,
            scanning: false,
            failed: false,
            hid_search_started: false,
            handles: HandleTable::default(),
            init_state: InitState::Idle,
            discovery_retries: 0,
            current_notify_index: 0,
            report_map: Vec::new(),
            vendor_id: 0,
            product_id: 0,
            active: None,
            prev_state: ControllerState::default(),
        }
    }

    // Queries

    pub fn is_connected(&self) -> bool {
        self.connected && self.active.is_some()
    }

    /// True after a non-recoverable failure (GATT client registration
    /// rejected). The shell should stop driving the bridge.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    pub fn init_state(&self) -> InitState {
        self.init_state
    }

    pub fn state(&self) -> Option<&ControllerState> {
        self.active.as_ref().map(|c| c.state())
    }

    pub fn report_map(&self) -> &[u8] {
        &self.report_map
    }

    /// Discovered handle range for a service, for the adapter's
    /// characteristic enumeration. (0, 0) when not found.
    pub fn service_range(&self, service: ServiceKind) -> (u16, u16) {
        match service {
            ServiceKind::DeviceInformation => (self.handles.dis_start, self.handles.dis_end),
            ServiceKind::Hid => (self.handles.hid_start, self.handles.hid_end),
        }
    }

    // GAP

    pub fn handle_gap_event(&mut self, event: &GapEvent) -> Actions {
        let mut actions = Actions::new();
        match *event {
            GapEvent::ScanParamsSet => {
                let _ = actions.push(Action::StartScan);
            }
            GapEvent::ScanStarted { success } => {
                if success {
                    info!("scan started");
                    self.scanning = true;
                } else {
                    warn!("scan failed to start");
                }
            }
            GapEvent::ScanStopped => {
                self.scanning = false;
            }
            GapEvent::SecurityRequest { addr } => {
                info!("security request, accepting");
                let _ = actions.push(Action::RespondToSecurityRequest { addr, accept: true });
            }
            GapEvent::NumericComparisonRequest { addr, passkey } => {
                // No display, no keyboard: accept unconditionally.
                info!("numeric comparison {}, accepting", passkey);
                let _ = actions.push(Action::ConfirmNumericComparison { addr, accept: true });
            }
            GapEvent::PasskeyNotification { passkey } => {
                info!("peer passkey: {:06}", passkey);
            }
            GapEvent::KeyExchange { key_type } => {
                debug!("pairing key exchanged, type {}", key_type);
            }
            GapEvent::AuthenticationComplete {
                success,
                bonded,
                fail_reason,
                ..
            } => {
                if success {
                    // A late auth result after the link closed must not
                    // search on the reset connection id.
                    if !self.connected {
                        debug!("ignoring auth result with no open connection");
                        return actions;
                    }
                    info!("authentication complete, bonded={}", bonded);
                    self.hid_search_started = false;
                    let _ = actions.push(Action::SearchService {
                        conn_id: self.conn_id,
                        uuid16: config::DIS_SERVICE_UUID,
                    });
                } else {
                    warn!("authentication failed, reason 0x{:02X}", fail_reason);
                    if self.connected {
                        let _ = actions.push(Action::CloseConnection {
                            conn_id: self.conn_id,
                        });
                    } else {
                        let _ = actions.push(Action::StartScan);
                    }
                }
            }
            GapEvent::BondRemoved { success } => {
                debug!("bond removal: success={}", success);
            }
        }
        actions
    }

    /// Scan filter gate. Clears `scanning` before emitting the connect
    /// actions so later results from the same scan burst are dropped
    /// and only one connection attempt runs at a time.
    pub fn handle_scan_result(&mut self, result: &ScanResult) -> Actions {
        let mut actions = Actions::new();
        if !self.scanning || self.connected {
            return actions;
        }

        let info = AdvertisementInfo::parse(result.adv_data);
        if !info.is_gamepad() {
            return actions;
        }

        info!(
            "gamepad candidate '{}' (appearance {:?})",
            info.name.as_str(),
            info.appearance
        );
        self.scanning = false;
        self.remote_addr = result.addr;
        let _ = actions.push(Action::StopScan);
        let _ = actions.push(Action::OpenConnection { addr: result.addr });
        actions
    }

    // GATT client

    pub fn handle_gattc_event(&mut self, event: &GattcEvent) -> Actions {
        let mut actions = Actions::new();
        match *event {
            GattcEvent::Registered { status, app_id } => {
                if status.is_ok() {
                    info!("GATT client registered (app {})", app_id);
                    let _ = actions.push(Action::ConfigureSecurity);
                    let _ = actions.push(Action::SetScanParams);
                } else {
                    warn!("GATT client registration rejected");
                    self.failed = true;
                    let _ = actions.push(Action::MarkFailed);
                }
            }
            GattcEvent::Opened {
                status,
                conn_id,
                addr,
            } => {
                if status.is_ok() {
                    info!("connection open (conn {})", conn_id);
                    self.connected = true;
                    self.conn_id = conn_id;
                    self.remote_addr = addr;
                    let _ = actions.push(Action::RequestMtu { conn_id });
                    let _ = actions.push(Action::StartEncryption { addr });
                } else {
                    warn!("connection attempt failed");
                    let _ = actions.push(Action::StartScan);
                }
            }
            GattcEvent::Closed { conn_id } => {
                if self.connected && conn_id == self.conn_id {
                    info!("connection closed");
                }
                self.reset_connection();
                let _ = actions.push(Action::StartScan);
            }
            GattcEvent::ServiceFound {
                uuid16,
                start_handle,
                end_handle,
            } => match uuid16 {
                config::DIS_SERVICE_UUID => {
                    self.handles.dis_start = start_handle;
                    self.handles.dis_end = end_handle;
                }
                config::HID_SERVICE_UUID => {
                    self.handles.hid_start = start_handle;
                    self.handles.hid_end = end_handle;
                }
                _ => {}
            },
            GattcEvent::SearchComplete { status } => {
                return self.on_search_complete(status.is_ok());
            }
            GattcEvent::CharacteristicsListed {
                service,
                status,
                chars,
            } => {
                return self.on_characteristics_listed(service, status.is_ok(), chars);
            }
            GattcEvent::ReadComplete {
                status,
                handle,
                value,
            } => {
                return self.on_read_complete(status.is_ok(), handle, value);
            }
            GattcEvent::WriteComplete { status, handle } => {
                if self.init_state == InitState::SettingProtocolMode
                    && handle == self.handles.protocol_mode
                {
                    if status.is_ok() {
                        return self.start_notification_registration();
                    }
                    // A peer that rejects Report Protocol cannot be
                    // parsed; drop the link rather than limp along.
                    warn!("protocol mode write rejected, disconnecting");
                    let _ = actions.push(Action::CloseConnection {
                        conn_id: self.conn_id,
                    });
                } else {
                    debug!("ignoring write completion for handle {}", handle);
                }
            }
            GattcEvent::DescriptorWritten { status, handle } => {
                return self.on_descriptor_written(status.is_ok(), handle);
            }
            GattcEvent::NotifyRegistered { status, handle } => {
                return self.on_notify_registered(status.is_ok(), handle);
            }
            GattcEvent::Notification {
                conn_id,
                handle,
                value,
            } => {
                self.on_notification(conn_id, handle, value);
            }
        }
        actions
    }

    fn on_search_complete(&mut self, ok: bool) -> Actions {
        let mut actions = Actions::new();

        // A rejected search primitive is fatal; only an empty result
        // gets the bounded re-search below.
        if !ok {
            warn!("service search failed, disconnecting");
            let _ = actions.push(Action::CloseConnection {
                conn_id: self.conn_id,
            });
            return actions;
        }

        if self.handles.hid_start != 0 {
            self.discovery_retries = 0;
            let _ = actions.push(Action::ListCharacteristics {
                conn_id: self.conn_id,
                service: ServiceKind::Hid,
            });
            return actions;
        }

        // HID not captured. Enumerate DIS only if it was found and the
        // HID search has not run yet; re-entering DIS enumeration after
        // an empty HID search would loop forever on a peer with a
        // stale GATT cache.
        if self.handles.dis_start != 0 && !self.hid_search_started {
            let _ = actions.push(Action::ListCharacteristics {
                conn_id: self.conn_id,
                service: ServiceKind::DeviceInformation,
            });
            return actions;
        }

        // Nothing usable found: re-issue a HID-specific search against
        // the retry budget.
        self.discovery_retries += 1;
        if self.discovery_retries <= config::MAX_DISCOVERY_RETRIES {
            warn!(
                "HID service not found, search {}/{}",
                self.discovery_retries,
                config::MAX_DISCOVERY_RETRIES
            );
            return self.search_hid_service();
        }
        warn!("HID service not found after retries, disconnecting");
        let _ = actions.push(Action::CloseConnection {
            conn_id: self.conn_id,
        });
        actions
    }

    fn search_hid_service(&mut self) -> Actions {
        let mut actions = Actions::new();
        self.hid_search_started = true;
        let _ = actions.push(Action::SearchService {
            conn_id: self.conn_id,
            uuid16: config::HID_SERVICE_UUID,
        });
        actions
    }

    fn on_characteristics_listed(
        &mut self,
        service: ServiceKind,
        ok: bool,
        chars: &[CharacteristicInfo],
    ) -> Actions {
        match service {
            ServiceKind::DeviceInformation => {
                // DIS is informational; any failure just skips ahead.
                if ok {
                    if let Some(pnp) = chars.iter().find(|c| c.uuid16 == config::DIS_PNP_ID_UUID) {
                        self.handles.dis_pnp_id = pnp.handle;
                        self.init_state = InitState::ReadingDisPnpId;
                        let mut actions = Actions::new();
                        let _ = actions.push(Action::ReadCharacteristic {
                            conn_id: self.conn_id,
                            handle: pnp.handle,
                        });
                        return actions;
                    }
                }
                self.search_hid_service()
            }
            ServiceKind::Hid => {
                if !ok {
                    warn!("HID characteristic enumeration failed, disconnecting");
                    let mut actions = Actions::new();
                    let _ = actions.push(Action::CloseConnection {
                        conn_id: self.conn_id,
                    });
                    return actions;
                }
                for c in chars {
                    match c.uuid16 {
                        config::HID_INFO_UUID => self.handles.hid_info = c.handle,
                        config::HID_REPORT_MAP_UUID => self.handles.report_map = c.handle,
                        config::PROTOCOL_MODE_UUID => self.handles.protocol_mode = c.handle,
                        config::HID_REPORT_UUID => {
                            let entry = ReportCharacteristic {
                                char_handle: c.handle,
                                ccc_handle: c.ccc_handle,
                            };
                            if self.handles.report_chars.push(entry).is_err() {
                                warn!("report characteristic table full, dropping {}", c.handle);
                            }
                        }
                        _ => {}
                    }
                }
                info!(
                    "HID service: {} report characteristic(s)",
                    self.handles.report_chars.len()
                );
                if !self.handles.report_chars.is_empty()
                    && self.handles.report_chars.iter().all(|r| r.ccc_handle == 0)
                {
                    warn!("no CCC descriptors found; notifications may not work");
                }
                self.start_hid_info_read()
            }
        }
    }

    // Sequencer steps. Each returns the action for the first step whose
    // characteristic exists, skipping absent ones.

    fn start_hid_info_read(&mut self) -> Actions {
        if self.handles.hid_info != 0 {
            self.init_state = InitState::ReadingHidInfo;
            let mut actions = Actions::new();
            let _ = actions.push(Action::ReadCharacteristic {
                conn_id: self.conn_id,
                handle: self.handles.hid_info,
            });
            return actions;
        }
        self.start_report_map_read()
    }

    fn start_report_map_read(&mut self) -> Actions {
        if self.handles.report_map != 0 {
            self.init_state = InitState::ReadingReportMap;
            let mut actions = Actions::new();
            let _ = actions.push(Action::ReadCharacteristic {
                conn_id: self.conn_id,
                handle: self.handles.report_map,
            });
            return actions;
        }
        self.start_protocol_mode_write()
    }

    fn start_protocol_mode_write(&mut self) -> Actions {
        if self.handles.protocol_mode != 0 {
            self.init_state = InitState::SettingProtocolMode;
            let mut actions = Actions::new();
            let _ = actions.push(Action::WriteCharacteristic {
                conn_id: self.conn_id,
                handle: self.handles.protocol_mode,
                value: config::PROTOCOL_MODE_REPORT,
            });
            return actions;
        }
        self.start_notification_registration()
    }

    /// First notification-capable report characteristic at or after
    /// `from`, by discovery order.
    fn next_ccc_index(&self, from: usize) -> Option<usize> {
        self.handles
            .report_chars
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, r)| r.ccc_handle != 0)
            .map(|(i, _)| i)
    }

    fn start_notification_registration(&mut self) -> Actions {
        let mut actions = Actions::new();
        if self.handles.report_chars.is_empty() {
            warn!("no report characteristics, disconnecting");
            let _ = actions.push(Action::CloseConnection {
                conn_id: self.conn_id,
            });
            return actions;
        }
        let Some(index) = self.next_ccc_index(0) else {
            // Nothing to subscribe to; still finish initialization so
            // the priming read can run.
            return self.start_priming_read();
        };
        self.init_state = InitState::RegisteringNotifications;
        self.current_notify_index = index;
        let _ = actions.push(Action::RegisterForNotify {
            addr: self.remote_addr,
            handle: self.handles.report_chars[index].char_handle,
        });
        actions
    }

    fn on_notify_registered(&mut self, ok: bool, handle: u16) -> Actions {
        let mut actions = Actions::new();
        if self.init_state != InitState::RegisteringNotifications {
            debug!("ignoring notify registration in {:?}", self.init_state);
            return actions;
        }
        let Some(current) = self.handles.report_chars.get(self.current_notify_index) else {
            return actions;
        };
        if handle != current.char_handle {
            debug!("notify registration for unexpected handle {}", handle);
            return actions;
        }
        if !ok {
            warn!("notify registration failed for handle {}", handle);
            let _ = actions.push(Action::CloseConnection {
                conn_id: self.conn_id,
            });
            return actions;
        }
        self.init_state = InitState::EnablingNotifications;
        let _ = actions.push(Action::WriteDescriptor {
            conn_id: self.conn_id,
            handle: current.ccc_handle,
            value: config::CCC_NOTIFY_ENABLE,
        });
        actions
    }

    fn on_descriptor_written(&mut self, ok: bool, handle: u16) -> Actions {
        let mut actions = Actions::new();
        if self.init_state != InitState::EnablingNotifications {
            debug!("ignoring descriptor write in {:?}", self.init_state);
            return actions;
        }
        let Some(current) = self.handles.report_chars.get(self.current_notify_index) else {
            return actions;
        };
        if handle != current.ccc_handle {
            debug!("descriptor write for unexpected handle {}", handle);
            return actions;
        }
        if !ok {
            warn!("CCC write failed for handle {}", handle);
            let _ = actions.push(Action::CloseConnection {
                conn_id: self.conn_id,
            });
            return actions;
        }
        self.advance_notify_index()
    }

    fn advance_notify_index(&mut self) -> Actions {
        let mut actions = Actions::new();
        if let Some(next) = self.next_ccc_index(self.current_notify_index + 1) {
            self.current_notify_index = next;
            self.init_state = InitState::RegisteringNotifications;
            let _ = actions.push(Action::RegisterForNotify {
                addr: self.remote_addr,
                handle: self.handles.report_chars[next].char_handle,
            });
            return actions;
        }
        self.start_priming_read()
    }

    /// All notifications armed: read the first notification-capable
    /// report characteristic once to wake the controller into
    /// streaming.
    fn start_priming_read(&mut self) -> Actions {
        let mut actions = Actions::new();
        let index = self.next_ccc_index(0).unwrap_or(0);
        self.init_state = InitState::ReadingInitialReport;
        let _ = actions.push(Action::ReadCharacteristic {
            conn_id: self.conn_id,
            handle: self.handles.report_chars[index].char_handle,
        });
        actions
    }

    /// A required sequencer read came back non-OK. Only the PnP ID read
    /// is optional; everything else drops the link.
    fn disconnect_after_failed_read(&mut self, handle: u16) -> Actions {
        warn!("read failed for handle {}, disconnecting", handle);
        let mut actions = Actions::new();
        let _ = actions.push(Action::CloseConnection {
            conn_id: self.conn_id,
        });
        actions
    }

    fn on_read_complete(&mut self, ok: bool, handle: u16, value: &[u8]) -> Actions {
        match self.init_state {
            InitState::ReadingDisPnpId if handle == self.handles.dis_pnp_id => {
                if ok && value.len() >= 7 {
                    self.vendor_id = u16::from_le_bytes([value[1], value[2]]);
                    self.product_id = u16::from_le_bytes([value[3], value[4]]);
                    info!(
                        "PnP ID: vendor 0x{:04X} product 0x{:04X} ({})",
                        self.vendor_id,
                        self.product_id,
                        model_name(self.vendor_id, self.product_id)
                    );
                } else {
                    debug!("PnP ID read failed or short, continuing");
                }
                self.search_hid_service()
            }
            InitState::ReadingHidInfo if handle == self.handles.hid_info => {
                if !ok {
                    return self.disconnect_after_failed_read(handle);
                }
                if value.len() >= 4 {
                    let bcd_hid = u16::from_le_bytes([value[0], value[1]]);
                    info!(
                        "HID info: bcdHID 0x{:04X} country {} flags 0x{:02X}",
                        bcd_hid, value[2], value[3]
                    );
                }
                self.start_report_map_read()
            }
            InitState::ReadingReportMap if handle == self.handles.report_map => {
                if !ok {
                    return self.disconnect_after_failed_read(handle);
                }
                self.report_map.clear();
                let take = value.len().min(self.report_map.capacity());
                let _ = self.report_map.extend_from_slice(&value[..take]);
                info!("report map: {} bytes", self.report_map.len());
                self.start_protocol_mode_write()
            }
            InitState::ReadingInitialReport if self.handles.is_report_handle(handle) => {
                if !ok {
                    return self.disconnect_after_failed_read(handle);
                }
                let mut pad = AnyController::for_device(self.vendor_id, self.product_id);
                pad.as_dyn().on_connect();
                if !pad.as_dyn().parse_input_report(value) {
                    debug!("initial report not parseable ({} bytes)", value.len());
                }
                self.prev_state = *pad.state();
                self.active = Some(pad);
                self.init_state = InitState::Complete;
                info!("HID initialization complete");
                Actions::new()
            }
            _ => {
                debug!(
                    "ignoring read completion for handle {} in {:?}",
                    handle, self.init_state
                );
                Actions::new()
            }
        }
    }

    fn on_notification(&mut self, conn_id: u16, handle: u16, value: &[u8]) {
        if !self.connected || conn_id != self.conn_id {
            debug!("dropping stale notification (conn {})", conn_id);
            return;
        }
        if !self.handles.is_report_handle(handle) {
            debug!("notification from unknown handle {}", handle);
            return;
        }
        let Some(pad) = self.active.as_mut() else {
            return;
        };
        if !pad.as_dyn().parse_input_report(value) {
            warn!("malformed input report ({} bytes)", value.len());
        }
    }

    fn reset_connection(&mut self) {
        if let Some(pad) = self.active.as_mut() {
            pad.as_dyn().on_disconnect();
        }
        self.active = None;
        self.connected = false;
        self.conn_id = 0;
        self.remote_addr = BdAddr::default();
        self.hid_search_started = false;
        self.handles.reset();
        self.init_state = InitState::Idle;
        self.discovery_retries = 0;
        self.current_notify_index = 0;
        self.report_map.clear();
        self.vendor_id = 0;
        self.product_id = 0;
        self.prev_state = ControllerState::default();
    }

    // Outbound surface

    /// Per-frame diff against the last polled state. Button changes
    /// produce one event each, in `Button::ALL` order; stick movement
    /// beyond the deadzone produces a single `StickMoved`. Analog
    /// trigger changes are log-only.
    pub fn poll(&mut self) -> Vec<InputEvent, MAX_FRAME_EVENTS> {
        let mut events = Vec::new();
        let Some(pad) = self.active.as_ref() else {
            return events;
        };
        let current = *pad.state();
        let prev = self.prev_state;

        for button in Button::ALL {
            let now = current.buttons.get(button);
            if now != prev.buttons.get(button) {
                let _ = events.push(InputEvent::Button {
                    button,
                    pressed: now,
                });
            }
        }

        let moved = axis_moved(prev.left_stick_x, current.left_stick_x)
            || axis_moved(prev.left_stick_y, current.left_stick_y)
            || axis_moved(prev.right_stick_x, current.right_stick_x)
            || axis_moved(prev.right_stick_y, current.right_stick_y);
        if moved {
            let _ = events.push(InputEvent::StickMoved);
        }

        if trigger_moved(prev.left_trigger, current.left_trigger) {
            debug!("left trigger: {}", current.left_trigger);
        }
        if trigger_moved(prev.right_trigger, current.right_trigger) {
            debug!("right trigger: {}", current.right_trigger);
        }

        self.prev_state = current;
        events
    }
}

fn axis_moved(prev: i8, current: i8) -> bool {
    (current as i16 - prev as i16).abs() > config::STICK_DEADZONE
}

fn trigger_moved(prev: u8, current: u8) -> bool {
    (current as i16 - prev as i16).abs() > config::TRIGGER_LOG_THRESHOLD
}

fn model_name(vendor_id: u16, product_id: u16) -> &'static str {
    match (vendor_id, product_id) {
        (config::VENDOR_MICROSOFT, config::PRODUCT_XBOX_ONE_S) => "Xbox One S Controller",
        (config::VENDOR_MICROSOFT, config::PRODUCT_XBOX_SERIES) => "Xbox Series X|S Controller",
        (config::VENDOR_MICROSOFT, _) => "Microsoft Controller",
        _ => "Unknown Controller",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::event::GattStatus;

    const PEER: BdAddr = BdAddr([0xA0, 0x01, 0x02, 0x03, 0x04, 0x05]);

    const XBOX_ADV: [u8; 14] = [
        0x05, 0x09, b'X', b'b', b'o', b'x', // name
        0x03, 0x03, 0x12, 0x18, // HID UUID
        0x03, 0x19, 0xC4, 0x03, // gamepad appearance
    ];

    fn ok() -> GattStatus {
        GattStatus::Ok
    }

    fn failed() -> GattStatus {
        GattStatus::Failed(0x85)
    }

    /// Drive a fresh bridge to the point where the connection is open
    /// and authenticated, returning the DIS search action's output.
    fn open_and_authenticate(bridge: &mut GamepadBridge) -> Actions {
        let a = bridge.handle_gattc_event(&GattcEvent::Registered {
            status: ok(),
            app_id: 0,
        });
        assert_eq!(a.as_slice()[0], Action::ConfigureSecurity);

        bridge.handle_gap_event(&GapEvent::ScanStarted { success: true });
        let a = bridge.handle_scan_result(&ScanResult {
            addr: PEER,
            adv_data: &XBOX_ADV,
        });
        assert_eq!(
            a.as_slice(),
            [Action::StopScan, Action::OpenConnection { addr: PEER }]
        );

        let a = bridge.handle_gattc_event(&GattcEvent::Opened {
            status: ok(),
            conn_id: 3,
            addr: PEER,
        });
        assert_eq!(a.as_slice()[0], Action::RequestMtu { conn_id: 3 });

        bridge.handle_gap_event(&GapEvent::AuthenticationComplete {
            addr: PEER,
            success: true,
            bonded: true,
            fail_reason: 0,
        })
    }

    /// Full HID service fixture: info, report map, protocol mode, two
    /// report characteristics (second without CCC).
    fn hid_chars() -> [CharacteristicInfo; 5] {
        [
            CharacteristicInfo {
                uuid16: config::HID_INFO_UUID,
                handle: 20,
                ccc_handle: 0,
            },
            CharacteristicInfo {
                uuid16: config::HID_REPORT_MAP_UUID,
                handle: 22,
                ccc_handle: 0,
            },
            CharacteristicInfo {
                uuid16: config::PROTOCOL_MODE_UUID,
                handle: 24,
                ccc_handle: 0,
            },
            CharacteristicInfo {
                uuid16: config::HID_REPORT_UUID,
                handle: 26,
                ccc_handle: 27,
            },
            CharacteristicInfo {
                uuid16: config::HID_REPORT_UUID,
                handle: 29,
                ccc_handle: 0,
            },
        ]
    }

    /// Drive an open, authenticated bridge through HID service discovery
    /// and characteristic enumeration (the `hid_chars` fixture).
    fn enumerate_hid(bridge: &mut GamepadBridge) {
        bridge.handle_gattc_event(&GattcEvent::ServiceFound {
            uuid16: config::HID_SERVICE_UUID,
            start_handle: 19,
            end_handle: 40,
        });
        bridge.handle_gattc_event(&GattcEvent::SearchComplete { status: ok() });
        let chars = hid_chars();
        bridge.handle_gattc_event(&GattcEvent::CharacteristicsListed {
            service: ServiceKind::Hid,
            status: ok(),
            chars: &chars,
        });
    }

    /// Run the whole init sequence to Complete. DIS present unless
    /// `with_dis` is false.
    fn initialize(bridge: &mut GamepadBridge, with_dis: bool) {
        let a = open_and_authenticate(bridge);
        assert_eq!(
            a.as_slice(),
            [Action::SearchService {
                conn_id: 3,
                uuid16: config::DIS_SERVICE_UUID
            }]
        );

        if with_dis {
            bridge.handle_gattc_event(&GattcEvent::ServiceFound {
                uuid16: config::DIS_SERVICE_UUID,
                start_handle: 1,
                end_handle: 9,
            });
        }
        let a = bridge.handle_gattc_event(&GattcEvent::SearchComplete { status: ok() });

        if with_dis {
            assert_eq!(
                a.as_slice(),
                [Action::ListCharacteristics {
                    conn_id: 3,
                    service: ServiceKind::DeviceInformation
                }]
            );
            let pnp = [CharacteristicInfo {
                uuid16: config::DIS_PNP_ID_UUID,
                handle: 5,
                ccc_handle: 0,
            }];
            let a = bridge.handle_gattc_event(&GattcEvent::CharacteristicsListed {
                service: ServiceKind::DeviceInformation,
                status: ok(),
                chars: &pnp,
            });
            assert_eq!(
                a.as_slice(),
                [Action::ReadCharacteristic {
                    conn_id: 3,
                    handle: 5
                }]
            );
            // PnP ID: source 2, vendor 0x045E, product 0x0B20, version 1
            let pnp_value = [0x02, 0x5E, 0x04, 0x20, 0x0B, 0x01, 0x00];
            let a = bridge.handle_gattc_event(&GattcEvent::ReadComplete {
                status: ok(),
                handle: 5,
                value: &pnp_value,
            });
            assert_eq!(
                a.as_slice(),
                [Action::SearchService {
                    conn_id: 3,
                    uuid16: config::HID_SERVICE_UUID
                }]
            );
        } else {
            assert_eq!(
                a.as_slice(),
                [Action::SearchService {
                    conn_id: 3,
                    uuid16: config::HID_SERVICE_UUID
                }]
            );
        }

        bridge.handle_gattc_event(&GattcEvent::ServiceFound {
            uuid16: config::HID_SERVICE_UUID,
            start_handle: 19,
            end_handle: 40,
        });
        let a = bridge.handle_gattc_event(&GattcEvent::SearchComplete { status: ok() });
        assert_eq!(
            a.as_slice(),
            [Action::ListCharacteristics {
                conn_id: 3,
                service: ServiceKind::Hid
            }]
        );

        let chars = hid_chars();
        let a = bridge.handle_gattc_event(&GattcEvent::CharacteristicsListed {
            service: ServiceKind::Hid,
            status: ok(),
            chars: &chars,
        });
        assert_eq!(bridge.init_state(), InitState::ReadingHidInfo);
        assert_eq!(
            a.as_slice(),
            [Action::ReadCharacteristic {
                conn_id: 3,
                handle: 20
            }]
        );

        let a = bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: ok(),
            handle: 20,
            value: &[0x11, 0x01, 0x00, 0x02],
        });
        assert_eq!(bridge.init_state(), InitState::ReadingReportMap);
        assert_eq!(
            a.as_slice(),
            [Action::ReadCharacteristic {
                conn_id: 3,
                handle: 22
            }]
        );

        let a = bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: ok(),
            handle: 22,
            value: &[0x05, 0x01, 0x09, 0x05],
        });
        assert_eq!(bridge.init_state(), InitState::SettingProtocolMode);
        assert_eq!(
            a.as_slice(),
            [Action::WriteCharacteristic {
                conn_id: 3,
                handle: 24,
                value: config::PROTOCOL_MODE_REPORT
            }]
        );

        let a = bridge.handle_gattc_event(&GattcEvent::WriteComplete {
            status: ok(),
            handle: 24,
        });
        assert_eq!(bridge.init_state(), InitState::RegisteringNotifications);
        assert_eq!(
            a.as_slice(),
            [Action::RegisterForNotify {
                addr: PEER,
                handle: 26
            }]
        );

        let a = bridge.handle_gattc_event(&GattcEvent::NotifyRegistered {
            status: ok(),
            handle: 26,
        });
        assert_eq!(bridge.init_state(), InitState::EnablingNotifications);
        assert_eq!(
            a.as_slice(),
            [Action::WriteDescriptor {
                conn_id: 3,
                handle: 27,
                value: config::CCC_NOTIFY_ENABLE
            }]
        );

        // Second report char has no CCC, so it is not subscribed; the
        // sequencer goes straight to the priming read.
        let a = bridge.handle_gattc_event(&GattcEvent::DescriptorWritten {
            status: ok(),
            handle: 27,
        });
        assert_eq!(bridge.init_state(), InitState::ReadingInitialReport);
        assert_eq!(
            a.as_slice(),
            [Action::ReadCharacteristic {
                conn_id: 3,
                handle: 26
            }]
        );

        let neutral = [
            0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ];
        let a = bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: ok(),
            handle: 26,
            value: &neutral,
        });
        assert!(a.is_empty());
        assert_eq!(bridge.init_state(), InitState::Complete);
        assert!(bridge.is_connected());
    }

    #[test]
    fn registration_failure_is_fatal() {
        let mut bridge = GamepadBridge::new();
        let a = bridge.handle_gattc_event(&GattcEvent::Registered {
            status: failed(),
            app_id: 0,
        });
        assert_eq!(a.as_slice(), [Action::MarkFailed]);
    }

    #[test]
    fn scan_results_ignored_while_not_scanning() {
        let mut bridge = GamepadBridge::new();
        let a = bridge.handle_scan_result(&ScanResult {
            addr: PEER,
            adv_data: &XBOX_ADV,
        });
        assert!(a.is_empty());
    }

    #[test]
    fn only_first_match_connects() {
        let mut bridge = GamepadBridge::new();
        bridge.handle_gap_event(&GapEvent::ScanStarted { success: true });

        let a = bridge.handle_scan_result(&ScanResult {
            addr: PEER,
            adv_data: &XBOX_ADV,
        });
        assert_eq!(a.len(), 2);

        // scanning cleared: a second result must not start a second
        // connection attempt
        let other = BdAddr([9, 9, 9, 9, 9, 9]);
        let a = bridge.handle_scan_result(&ScanResult {
            addr: other,
            adv_data: &XBOX_ADV,
        });
        assert!(a.is_empty());
    }

    #[test]
    fn non_gamepad_advertisements_are_filtered() {
        let mut bridge = GamepadBridge::new();
        bridge.handle_gap_event(&GapEvent::ScanStarted { success: true });
        let thermometer = [0x03, 0x19, 0x40, 0x03];
        let a = bridge.handle_scan_result(&ScanResult {
            addr: PEER,
            adv_data: &thermometer,
        });
        assert!(a.is_empty());
    }

    #[test]
    fn full_initialization_with_dis() {
        let mut bridge = GamepadBridge::new();
        initialize(&mut bridge, true);
        assert_eq!(bridge.vendor_id, config::VENDOR_MICROSOFT);
        assert_eq!(bridge.product_id, config::PRODUCT_XBOX_SERIES);
    }

    #[test]
    fn initialization_completes_without_dis() {
        let mut bridge = GamepadBridge::new();
        initialize(&mut bridge, false);
        assert_eq!(bridge.vendor_id, 0);
    }

    #[test]
    fn empty_discovery_retries_then_disconnects() {
        let mut bridge = GamepadBridge::new();
        open_and_authenticate(&mut bridge);

        // every search completes OK but finds nothing
        for attempt in 1..=config::MAX_DISCOVERY_RETRIES {
            let a = bridge.handle_gattc_event(&GattcEvent::SearchComplete { status: ok() });
            assert_eq!(
                a.as_slice(),
                [Action::SearchService {
                    conn_id: 3,
                    uuid16: config::HID_SERVICE_UUID
                }],
                "attempt {}",
                attempt
            );
        }

        // retry budget exhausted: exactly one disconnect
        let a = bridge.handle_gattc_event(&GattcEvent::SearchComplete { status: ok() });
        assert_eq!(a.as_slice(), [Action::CloseConnection { conn_id: 3 }]);
    }

    #[test]
    fn failed_search_status_disconnects_immediately() {
        let mut bridge = GamepadBridge::new();
        open_and_authenticate(&mut bridge);
        let a = bridge.handle_gattc_event(&GattcEvent::SearchComplete { status: failed() });
        assert_eq!(a.as_slice(), [Action::CloseConnection { conn_id: 3 }]);
    }

    #[test]
    fn failed_pnp_read_continues_to_hid_search() {
        let mut bridge = GamepadBridge::new();
        open_and_authenticate(&mut bridge);
        bridge.handle_gattc_event(&GattcEvent::ServiceFound {
            uuid16: config::DIS_SERVICE_UUID,
            start_handle: 1,
            end_handle: 9,
        });
        bridge.handle_gattc_event(&GattcEvent::SearchComplete { status: ok() });
        let pnp = [CharacteristicInfo {
            uuid16: config::DIS_PNP_ID_UUID,
            handle: 5,
            ccc_handle: 0,
        }];
        bridge.handle_gattc_event(&GattcEvent::CharacteristicsListed {
            service: ServiceKind::DeviceInformation,
            status: ok(),
            chars: &pnp,
        });

        // PnP ID is informational; a failed read moves on, not out
        let a = bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: failed(),
            handle: 5,
            value: &[],
        });
        assert_eq!(
            a.as_slice(),
            [Action::SearchService {
                conn_id: 3,
                uuid16: config::HID_SERVICE_UUID
            }]
        );
    }

    #[test]
    fn failed_hid_info_read_disconnects() {
        let mut bridge = GamepadBridge::new();
        open_and_authenticate(&mut bridge);
        enumerate_hid(&mut bridge);
        assert_eq!(bridge.init_state(), InitState::ReadingHidInfo);

        let a = bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: failed(),
            handle: 20,
            value: &[],
        });
        assert_eq!(a.as_slice(), [Action::CloseConnection { conn_id: 3 }]);
    }

    #[test]
    fn failed_report_map_read_disconnects() {
        let mut bridge = GamepadBridge::new();
        open_and_authenticate(&mut bridge);
        enumerate_hid(&mut bridge);
        bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: ok(),
            handle: 20,
            value: &[0x11, 0x01, 0x00, 0x02],
        });
        assert_eq!(bridge.init_state(), InitState::ReadingReportMap);

        let a = bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: failed(),
            handle: 22,
            value: &[],
        });
        assert_eq!(a.as_slice(), [Action::CloseConnection { conn_id: 3 }]);
        assert_eq!(bridge.init_state(), InitState::ReadingReportMap);
    }

    #[test]
    fn failed_priming_read_disconnects_without_completing() {
        let mut bridge = GamepadBridge::new();
        open_and_authenticate(&mut bridge);
        enumerate_hid(&mut bridge);
        bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: ok(),
            handle: 20,
            value: &[0x11, 0x01, 0x00, 0x02],
        });
        bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: ok(),
            handle: 22,
            value: &[0x05, 0x01],
        });
        bridge.handle_gattc_event(&GattcEvent::WriteComplete {
            status: ok(),
            handle: 24,
        });
        bridge.handle_gattc_event(&GattcEvent::NotifyRegistered {
            status: ok(),
            handle: 26,
        });
        bridge.handle_gattc_event(&GattcEvent::DescriptorWritten {
            status: ok(),
            handle: 27,
        });
        assert_eq!(bridge.init_state(), InitState::ReadingInitialReport);

        let a = bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: failed(),
            handle: 26,
            value: &[],
        });
        assert_eq!(a.as_slice(), [Action::CloseConnection { conn_id: 3 }]);
        assert_ne!(bridge.init_state(), InitState::Complete);
        assert!(bridge.state().is_none());
    }

    #[test]
    fn failed_notify_registration_disconnects() {
        let mut bridge = GamepadBridge::new();
        open_and_authenticate(&mut bridge);
        enumerate_hid(&mut bridge);
        bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: ok(),
            handle: 20,
            value: &[0x11, 0x01, 0x00, 0x02],
        });
        bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: ok(),
            handle: 22,
            value: &[0x05, 0x01],
        });
        bridge.handle_gattc_event(&GattcEvent::WriteComplete {
            status: ok(),
            handle: 24,
        });
        assert_eq!(bridge.init_state(), InitState::RegisteringNotifications);

        let a = bridge.handle_gattc_event(&GattcEvent::NotifyRegistered {
            status: failed(),
            handle: 26,
        });
        assert_eq!(a.as_slice(), [Action::CloseConnection { conn_id: 3 }]);
    }

    #[test]
    fn failed_ccc_write_disconnects() {
        let mut bridge = GamepadBridge::new();
        open_and_authenticate(&mut bridge);
        enumerate_hid(&mut bridge);
        bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: ok(),
            handle: 20,
            value: &[0x11, 0x01, 0x00, 0x02],
        });
        bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: ok(),
            handle: 22,
            value: &[0x05, 0x01],
        });
        bridge.handle_gattc_event(&GattcEvent::WriteComplete {
            status: ok(),
            handle: 24,
        });
        bridge.handle_gattc_event(&GattcEvent::NotifyRegistered {
            status: ok(),
            handle: 26,
        });
        assert_eq!(bridge.init_state(), InitState::EnablingNotifications);

        let a = bridge.handle_gattc_event(&GattcEvent::DescriptorWritten {
            status: failed(),
            handle: 27,
        });
        assert_eq!(a.as_slice(), [Action::CloseConnection { conn_id: 3 }]);
    }

    #[test]
    fn late_auth_result_after_close_is_ignored() {
        let mut bridge = GamepadBridge::new();
        open_and_authenticate(&mut bridge);
        bridge.handle_gattc_event(&GattcEvent::Closed { conn_id: 3 });

        let a = bridge.handle_gap_event(&GapEvent::AuthenticationComplete {
            addr: PEER,
            success: true,
            bonded: true,
            fail_reason: 0,
        });
        assert!(a.is_empty());
        assert_eq!(bridge.init_state(), InitState::Idle);
    }

    #[test]
    fn empty_hid_search_does_not_reenumerate_dis() {
        let mut bridge = GamepadBridge::new();
        open_and_authenticate(&mut bridge);

        // DIS found, enumerated, PnP absent -> HID search
        bridge.handle_gattc_event(&GattcEvent::ServiceFound {
            uuid16: config::DIS_SERVICE_UUID,
            start_handle: 1,
            end_handle: 9,
        });
        bridge.handle_gattc_event(&GattcEvent::SearchComplete { status: ok() });
        let a = bridge.handle_gattc_event(&GattcEvent::CharacteristicsListed {
            service: ServiceKind::DeviceInformation,
            status: ok(),
            chars: &[],
        });
        assert_eq!(
            a.as_slice(),
            [Action::SearchService {
                conn_id: 3,
                uuid16: config::HID_SERVICE_UUID
            }]
        );

        // HID search finds nothing: must re-search HID, not loop on
        // DIS enumeration
        let a = bridge.handle_gattc_event(&GattcEvent::SearchComplete { status: ok() });
        assert_eq!(
            a.as_slice(),
            [Action::SearchService {
                conn_id: 3,
                uuid16: config::HID_SERVICE_UUID
            }]
        );
    }

    #[test]
    fn protocol_mode_write_failure_disconnects() {
        let mut bridge = GamepadBridge::new();
        open_and_authenticate(&mut bridge);
        bridge.handle_gattc_event(&GattcEvent::ServiceFound {
            uuid16: config::HID_SERVICE_UUID,
            start_handle: 19,
            end_handle: 40,
        });
        bridge.handle_gattc_event(&GattcEvent::SearchComplete { status: ok() });
        let chars = hid_chars();
        bridge.handle_gattc_event(&GattcEvent::CharacteristicsListed {
            service: ServiceKind::Hid,
            status: ok(),
            chars: &chars,
        });
        bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: ok(),
            handle: 20,
            value: &[0x11, 0x01, 0x00, 0x02],
        });
        bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: ok(),
            handle: 22,
            value: &[0x05, 0x01],
        });
        assert_eq!(bridge.init_state(), InitState::SettingProtocolMode);

        let a = bridge.handle_gattc_event(&GattcEvent::WriteComplete {
            status: failed(),
            handle: 24,
        });
        assert_eq!(a.as_slice(), [Action::CloseConnection { conn_id: 3 }]);
    }

    #[test]
    fn mismatched_read_handle_does_not_advance_state() {
        let mut bridge = GamepadBridge::new();
        open_and_authenticate(&mut bridge);
        bridge.handle_gattc_event(&GattcEvent::ServiceFound {
            uuid16: config::HID_SERVICE_UUID,
            start_handle: 19,
            end_handle: 40,
        });
        bridge.handle_gattc_event(&GattcEvent::SearchComplete { status: ok() });
        let chars = hid_chars();
        bridge.handle_gattc_event(&GattcEvent::CharacteristicsListed {
            service: ServiceKind::Hid,
            status: ok(),
            chars: &chars,
        });
        assert_eq!(bridge.init_state(), InitState::ReadingHidInfo);

        // completion for a handle we never asked about
        let a = bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: ok(),
            handle: 99,
            value: &[0xAA],
        });
        assert!(a.is_empty());
        assert_eq!(bridge.init_state(), InitState::ReadingHidInfo);
    }

    #[test]
    fn mismatched_notify_registration_is_ignored() {
        let mut bridge = GamepadBridge::new();
        open_and_authenticate(&mut bridge);
        bridge.handle_gattc_event(&GattcEvent::ServiceFound {
            uuid16: config::HID_SERVICE_UUID,
            start_handle: 19,
            end_handle: 40,
        });
        bridge.handle_gattc_event(&GattcEvent::SearchComplete { status: ok() });
        let chars = hid_chars();
        bridge.handle_gattc_event(&GattcEvent::CharacteristicsListed {
            service: ServiceKind::Hid,
            status: ok(),
            chars: &chars,
        });
        bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: ok(),
            handle: 20,
            value: &[0x11, 0x01, 0x00, 0x02],
        });
        bridge.handle_gattc_event(&GattcEvent::ReadComplete {
            status: ok(),
            handle: 22,
            value: &[0x05, 0x01],
        });
        bridge.handle_gattc_event(&GattcEvent::WriteComplete {
            status: ok(),
            handle: 24,
        });
        assert_eq!(bridge.init_state(), InitState::RegisteringNotifications);

        let a = bridge.handle_gattc_event(&GattcEvent::NotifyRegistered {
            status: ok(),
            handle: 99,
        });
        assert!(a.is_empty());
        assert_eq!(bridge.init_state(), InitState::RegisteringNotifications);
    }

    #[test]
    fn disconnect_mid_sequence_resets_everything() {
        let mut bridge = GamepadBridge::new();
        open_and_authenticate(&mut bridge);
        bridge.handle_gattc_event(&GattcEvent::ServiceFound {
            uuid16: config::HID_SERVICE_UUID,
            start_handle: 19,
            end_handle: 40,
        });
        bridge.handle_gattc_event(&GattcEvent::SearchComplete { status: ok() });
        let chars = hid_chars();
        bridge.handle_gattc_event(&GattcEvent::CharacteristicsListed {
            service: ServiceKind::Hid,
            status: ok(),
            chars: &chars,
        });
        assert_ne!(bridge.init_state(), InitState::Idle);

        let a = bridge.handle_gattc_event(&GattcEvent::Closed { conn_id: 3 });
        assert_eq!(a.as_slice(), [Action::StartScan]);
        assert_eq!(bridge.init_state(), InitState::Idle);
        assert!(!bridge.is_connected());
        assert!(bridge.state().is_none());
        assert_eq!(bridge.handles.hid_start, 0);
        assert!(bridge.handles.report_chars.is_empty());
        assert_eq!(bridge.current_notify_index, 0);
        assert_eq!(bridge.discovery_retries, 0);
    }

    #[test]
    fn notifications_drive_poll_events() {
        let mut bridge = GamepadBridge::new();
        initialize(&mut bridge, false);
        assert!(bridge.poll().is_empty());

        // A pressed, hat up, left stick pushed right
        let report = [
            0xFF, 0xFF, 0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01,
            0x00, 0x00,
        ];
        bridge.handle_gattc_event(&GattcEvent::Notification {
            conn_id: 3,
            handle: 26,
            value: &report,
        });
        let events = bridge.poll();
        assert!(events.contains(&InputEvent::Button {
            button: Button::DpadUp,
            pressed: true
        }));
        assert!(events.contains(&InputEvent::Button {
            button: Button::South,
            pressed: true
        }));
        assert!(events.contains(&InputEvent::StickMoved));

        // nothing changed since the last poll
        assert!(bridge.poll().is_empty());

        // release everything
        let neutral = [
            0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ];
        bridge.handle_gattc_event(&GattcEvent::Notification {
            conn_id: 3,
            handle: 26,
            value: &neutral,
        });
        let events = bridge.poll();
        assert!(events.contains(&InputEvent::Button {
            button: Button::South,
            pressed: false
        }));
    }

    #[test]
    fn stale_and_unknown_notifications_are_dropped() {
        let mut bridge = GamepadBridge::new();
        initialize(&mut bridge, false);

        let report = [
            0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
            0x00, 0x00,
        ];
        // wrong connection id
        bridge.handle_gattc_event(&GattcEvent::Notification {
            conn_id: 7,
            handle: 26,
            value: &report,
        });
        assert!(bridge.poll().is_empty());

        // unknown handle
        bridge.handle_gattc_event(&GattcEvent::Notification {
            conn_id: 3,
            handle: 99,
            value: &report,
        });
        assert!(bridge.poll().is_empty());
    }

    #[test]
    fn malformed_notification_keeps_connection() {
        let mut bridge = GamepadBridge::new();
        initialize(&mut bridge, false);
        bridge.handle_gattc_event(&GattcEvent::Notification {
            conn_id: 3,
            handle: 26,
            value: &[0x01, 0x02],
        });
        assert!(bridge.is_connected());
        assert!(bridge.poll().is_empty());
    }

    #[test]
    fn small_stick_jitter_stays_inside_deadzone() {
        let mut bridge = GamepadBridge::new();
        initialize(&mut bridge, false);

        // centre + tiny wobble: raw 33280 normalizes to ~1
        let report = [
            0x00, 0x82, 0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ];
        bridge.handle_gattc_event(&GattcEvent::Notification {
            conn_id: 3,
            handle: 26,
            value: &report,
        });
        assert!(bridge.poll().is_empty());
    }

    #[test]
    fn auth_failure_closes_connection() {
        let mut bridge = GamepadBridge::new();
        bridge.handle_gattc_event(&GattcEvent::Registered {
            status: ok(),
            app_id: 0,
        });
        bridge.handle_gap_event(&GapEvent::ScanStarted { success: true });
        bridge.handle_scan_result(&ScanResult {
            addr: PEER,
            adv_data: &XBOX_ADV,
        });
        bridge.handle_gattc_event(&GattcEvent::Opened {
            status: ok(),
            conn_id: 3,
            addr: PEER,
        });
        let a = bridge.handle_gap_event(&GapEvent::AuthenticationComplete {
            addr: PEER,
            success: false,
            bonded: false,
            fail_reason: 0x55,
        });
        assert_eq!(a.as_slice(), [Action::CloseConnection { conn_id: 3 }]);
    }

    #[test]
    fn security_requests_are_accepted() {
        let mut bridge = GamepadBridge::new();
        let a = bridge.handle_gap_event(&GapEvent::SecurityRequest { addr: PEER });
        assert_eq!(
            a.as_slice(),
            [Action::RespondToSecurityRequest {
                addr: PEER,
                accept: true
            }]
        );
        let a = bridge.handle_gap_event(&GapEvent::NumericComparisonRequest {
            addr: PEER,
            passkey: 123456,
        });
        assert_eq!(
            a.as_slice(),
            [Action::ConfirmNumericComparison {
                addr: PEER,
                accept: true
            }]
        );
    }

    #[test]
    fn report_map_is_stored() {
        let mut bridge = GamepadBridge::new();
        initialize(&mut bridge, false);
        assert_eq!(bridge.report_map(), &[0x05, 0x01, 0x09, 0x05]);
    }
}
