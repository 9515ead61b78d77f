//! Language-neutral GAP / GATT-client event and action vocabulary.
//!
//! The vendor adapter translates raw stack callback payloads into these
//! enums, and executes the `Action`s the state machine returns. Keeping
//! both sides as plain data lets the whole connection logic run in host
//! tests with no BLE stack present.

use heapless::Vec;

/// 6-byte Bluetooth device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BdAddr(pub [u8; 6]);

/// Outcome of a GATT operation as reported by the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattStatus {
    Ok,
    /// Raw non-zero status code from the stack.
    Failed(u8),
}

impl GattStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, GattStatus::Ok)
    }
}

/// The two primary services the bridge enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    DeviceInformation,
    Hid,
}

/// One characteristic as enumerated from the GATT cache, with its CCC
/// descriptor handle if it has one (0 = none).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicInfo {
    pub uuid16: u16,
    pub handle: u16,
    pub ccc_handle: u16,
}

/// A single advertisement as seen during scanning.
#[derive(Debug, Clone, Copy)]
pub struct ScanResult<'a> {
    pub addr: BdAddr,
    pub adv_data: &'a [u8],
}

/// GAP-level events: scan lifecycle and pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapEvent {
    /// Scan parameters were accepted; scanning may start.
    ScanParamsSet,
    ScanStarted {
        success: bool,
    },
    ScanStopped,
    /// Peer requests pairing; must be answered.
    SecurityRequest {
        addr: BdAddr,
    },
    /// Numeric-comparison pairing; with no display we always accept.
    NumericComparisonRequest {
        addr: BdAddr,
        passkey: u32,
    },
    /// Peer shows a passkey we cannot display. Log-only.
    PasskeyNotification {
        passkey: u32,
    },
    AuthenticationComplete {
        addr: BdAddr,
        success: bool,
        bonded: bool,
        fail_reason: u8,
    },
    /// A pairing key was exchanged. Log-only.
    KeyExchange {
        key_type: u8,
    },
    BondRemoved {
        success: bool,
    },
}

/// GATT-client events. Read and notification payloads are borrowed from
/// the adapter's callback frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattcEvent<'a> {
    Registered {
        status: GattStatus,
        app_id: u16,
    },
    Opened {
        status: GattStatus,
        conn_id: u16,
        addr: BdAddr,
    },
    Closed {
        conn_id: u16,
    },
    /// One service matched the active search.
    ServiceFound {
        uuid16: u16,
        start_handle: u16,
        end_handle: u16,
    },
    SearchComplete {
        status: GattStatus,
    },
    /// The adapter enumerated a service's characteristics from the GATT
    /// cache (a synchronous operation on the stack side, surfaced as an
    /// event so the state machine stays pure).
    CharacteristicsListed {
        service: ServiceKind,
        status: GattStatus,
        chars: &'a [CharacteristicInfo],
    },
    ReadComplete {
        status: GattStatus,
        handle: u16,
        value: &'a [u8],
    },
    WriteComplete {
        status: GattStatus,
        handle: u16,
    },
    DescriptorWritten {
        status: GattStatus,
        handle: u16,
    },
    NotifyRegistered {
        status: GattStatus,
        handle: u16,
    },
    Notification {
        conn_id: u16,
        handle: u16,
        value: &'a [u8],
    },
}

/// Side effects requested by the state machine, executed by the vendor
/// adapter against the real stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Apply the fixed security policy (Just-Works bonding, no IO,
    /// 16-byte key, enc+id key distribution both ways).
    ConfigureSecurity,
    SetScanParams,
    StartScan,
    StopScan,
    OpenConnection { addr: BdAddr },
    CloseConnection { conn_id: u16 },
    RequestMtu { conn_id: u16 },
    StartEncryption { addr: BdAddr },
    RespondToSecurityRequest { addr: BdAddr, accept: bool },
    ConfirmNumericComparison { addr: BdAddr, accept: bool },
    SearchService { conn_id: u16, uuid16: u16 },
    /// Enumerate a found service's characteristics (and CCC descriptors)
    /// from the GATT cache; completion arrives as `CharacteristicsListed`.
    ListCharacteristics { conn_id: u16, service: ServiceKind },
    ReadCharacteristic { conn_id: u16, handle: u16 },
    WriteCharacteristic { conn_id: u16, handle: u16, value: u8 },
    WriteDescriptor { conn_id: u16, handle: u16, value: u16 },
    RegisterForNotify { addr: BdAddr, handle: u16 },
    /// GATT client registration failed; the bridge cannot run.
    MarkFailed,
}

/// Bounded action list returned by every dispatch entry point. No single
/// transition emits more than four side effects.
pub type Actions = Vec<Action, 4>;
