//! Unified error type for ble-gamepad.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // BLE
    /// The controller stack returned a BLE-level error.
    Ble(BleError),

    /// The Bluedroid stack could not be initialised.
    StackInit,

    /// GATT client application registration was rejected. Without a
    /// registered client nothing else can proceed; non-recoverable.
    GattcRegistration(u8),

    // Generic
    /// Buffer too small for the requested operation.
    BufferOverflow,
}

/// Subset of BLE errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleError {
    /// Raw GAP/GATT error code from the stack.
    Raw(u8),
    /// Scan could not start.
    ScanFailed,
    /// Connection attempt failed.
    ConnectFailed,
    /// Service/characteristic discovery failed after retries.
    DiscoveryFailed,
    /// CCC write / notify registration failed.
    NotifyFailed,
}

// Convenience conversions

impl From<BleError> for Error {
    fn from(e: BleError) -> Self {
        Error::Ble(e)
    }
}
