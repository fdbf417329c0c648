//! BLE link adapter — 18-byte frames over GATT write/notify.
//!
//! Implements [`LinkPort`] — the hexagonal boundary for the wireless
//! command link.  The peer writes command frames to the RX characteristic
//! and receives replies/notifications on the TX characteristic.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid BLE GATT server via
//!   `esp_idf_svc::sys`.
//! - **all other targets**: simulation backend for host-side tests.
//!
//! ## GATT Service Layout (UART-style service)
//!
//! | Characteristic | UUID                                   | Perms  |
//! |----------------|----------------------------------------|--------|
//! | Frame RX       | `6E400002-B5A3-F393-E0A9-E50E24DCCA9E` | Write  |
//! | Frame TX       | `6E400003-B5A3-F393-E0A9-E50E24DCCA9E` | Notify |
//!
//! ## Threading
//!
//! Bluedroid callbacks run on the BT task.  They publish into process-wide
//! state: connection flags are atomics, inbound frames go through a small
//! mutex-guarded queue drained by the main loop (which sees
//! [`Event::FrameReceived`](crate::events::Event)).  The send path enforces
//! the configured minimum spacing after every notify — the stack congests
//! when packets are sent back-to-back.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use log::warn;

use crate::app::ports::{LinkError, LinkPort};
use crate::error::CommsError;
use crate::events::{push_event, Event};
use crate::proto::frame::FRAME_LEN;

// ── Constants ────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E;
pub const CHAR_FRAME_RX: u128 = 0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E;
pub const CHAR_FRAME_TX: u128 = 0x6E400003_B5A3_F393_E0A9_E50E24DCCA9E;

/// Inbound frames buffered between main-loop iterations.
const PENDING_CAP: usize = 4;

// ── Process-wide bridge state ────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures; this state bridges the BT task to the adapter.

static CONNECTED: AtomicBool = AtomicBool::new(false);

/// Frames written by the peer, awaiting the main loop.
static PENDING_FRAMES: Mutex<heapless::Deque<[u8; FRAME_LEN], PENDING_CAP>> =
    Mutex::new(heapless::Deque::new());

/// Record one inbound write from the peer.  Oversized or truncated writes
/// are passed through as-is; framing validation happens in the dispatcher
/// (which silently drops anything that is not exactly one frame).
fn enqueue_inbound(value: &[u8]) {
    let mut frame = [0u8; FRAME_LEN];
    if value.len() != FRAME_LEN {
        // Still signal the main loop: it drains the queue, finds nothing,
        // and the malformed write is dropped where it belongs.
        push_event(Event::FrameReceived);
        return;
    }
    frame.copy_from_slice(value);

    let mut pending = match PENDING_FRAMES.lock() {
        Ok(p) => p,
        Err(poisoned) => poisoned.into_inner(),
    };
    if pending.push_back(frame).is_err() {
        warn!("ble: inbound queue full, dropping frame");
    }
    drop(pending);
    push_event(Event::FrameReceived);
}

// ── Adapter ──────────────────────────────────────────────────

pub struct BleLinkAdapter {
    device_name: heapless::String<32>,
    send_spacing_ms: u32,
    #[cfg(not(target_os = "espidf"))]
    sent: Vec<[u8; FRAME_LEN]>,
}

impl BleLinkAdapter {
    pub fn new(device_name: &str, send_spacing_ms: u32) -> Self {
        // Config validation caps the name at 29 printable-ASCII bytes.
        let mut name = heapless::String::new();
        let _ = name.push_str(&device_name[..device_name.len().min(29)]);
        Self {
            device_name: name,
            send_spacing_ms,
            #[cfg(not(target_os = "espidf"))]
            sent: Vec::new(),
        }
    }

    /// Take one buffered inbound frame, FIFO order.
    pub fn take_pending_frame(&mut self) -> Option<[u8; FRAME_LEN]> {
        let mut pending = match PENDING_FRAMES.lock() {
            Ok(p) => p,
            Err(poisoned) => poisoned.into_inner(),
        };
        pending.pop_front()
    }

    /// Bring up the stack and start advertising.
    #[cfg(target_os = "espidf")]
    pub fn start(&mut self) -> Result<(), CommsError> {
        espidf::start(self.device_name.as_str())
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn start(&mut self) -> Result<(), CommsError> {
        log::info!("ble(sim): '{}' advertising", self.device_name);
        Ok(())
    }

    /// Restart advertising after a disconnect.
    #[cfg(target_os = "espidf")]
    pub fn restart_advertising(&self) {
        espidf::restart_advertising();
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn restart_advertising(&self) {
        log::info!("ble(sim): advertising restarted");
    }

    // ── Simulation helpers (host tests) ───────────────────────

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_connected(&self, connected: bool) {
        CONNECTED.store(connected, Ordering::Release);
        push_event(if connected {
            Event::ConnectionUp
        } else {
            Event::ConnectionDown
        });
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_inject_write(&self, value: &[u8]) {
        enqueue_inbound(value);
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sent_frames(&self) -> &[[u8; FRAME_LEN]] {
        &self.sent
    }
}

impl LinkPort for BleLinkAdapter {
    fn is_connected(&self) -> bool {
        CONNECTED.load(Ordering::Acquire)
    }

    fn send(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), LinkError> {
        if !self.is_connected() {
            return Err(LinkError::Disconnected);
        }

        #[cfg(target_os = "espidf")]
        espidf::notify(frame)?;

        #[cfg(not(target_os = "espidf"))]
        self.sent.push(*frame);

        // Congestion guard: pace notifies out.
        std::thread::sleep(std::time::Duration::from_millis(
            self.send_spacing_ms as u64,
        ));
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF backend (Bluedroid)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod espidf {
    use super::{enqueue_inbound, CHAR_FRAME_RX, CHAR_FRAME_TX, CONNECTED, SERVICE_UUID};
    use crate::app::ports::LinkError;
    use crate::error::CommsError;
    use crate::events::{push_event, Event};
    use crate::proto::frame::FRAME_LEN;

    use core::sync::atomic::{AtomicU16, AtomicU8, Ordering};
    use esp_idf_svc::sys::*;
    use log::{info, warn};

    const APP_ID: u16 = 0x5742; // "WB"
    /// Service + 2 characteristics, 2 handles each.
    const NUM_HANDLES: u16 = 8;

    static GATTS_IF: AtomicU8 = AtomicU8::new(ESP_GATT_IF_NONE as u8);
    static CONN_ID: AtomicU16 = AtomicU16::new(0);
    static SERVICE_HANDLE: AtomicU16 = AtomicU16::new(0);
    static RX_HANDLE: AtomicU16 = AtomicU16::new(0);
    static TX_HANDLE: AtomicU16 = AtomicU16::new(0);

    fn uuid128(value: u128) -> esp_bt_uuid_t {
        esp_bt_uuid_t {
            len: ESP_UUID_LEN_128 as u16,
            uuid: esp_bt_uuid_t__bindgen_ty_1 {
                uuid128: value.to_le_bytes(),
            },
        }
    }

    // SAFETY: mutated only from the single main task during start(), read
    // by the BT task afterwards.
    static mut ADV_PARAMS: esp_ble_adv_params_t = esp_ble_adv_params_t {
        adv_int_min: 0x20,
        adv_int_max: 0x40,
        adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
        own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
        peer_addr: [0; 6],
        peer_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
        channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
        adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
    };

    pub fn start(device_name: &str) -> Result<(), CommsError> {
        // SAFETY: single-threaded bring-up from main before the event loop.
        unsafe {
            let mut bt_cfg: esp_bt_controller_config_t = core::mem::zeroed();
            bt_cfg.controller_task_stack_size = ESP_TASK_BT_CONTROLLER_STACK as u16;
            bt_cfg.controller_task_prio = ESP_TASK_BT_CONTROLLER_PRIO as u8;
            bt_cfg.hci_uart_no = BT_HCI_UART_NO_DEFAULT as u8;
            bt_cfg.hci_uart_baudrate = BT_HCI_UART_BAUDRATE_DEFAULT;

            if esp_bt_controller_init(&mut bt_cfg) != ESP_OK
                || esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE) != ESP_OK
            {
                return Err(CommsError::BleInitFailed);
            }
            if esp_bluedroid_init() != ESP_OK || esp_bluedroid_enable() != ESP_OK {
                return Err(CommsError::BleInitFailed);
            }

            if esp_ble_gatts_register_callback(Some(gatts_event_handler)) != ESP_OK
                || esp_ble_gap_register_callback(Some(gap_event_handler)) != ESP_OK
            {
                return Err(CommsError::GattRegisterFailed);
            }

            let mut name_buf = [0u8; 32];
            let n = device_name.len().min(31);
            name_buf[..n].copy_from_slice(&device_name.as_bytes()[..n]);
            esp_ble_gap_set_device_name(name_buf.as_ptr() as *const _);

            if esp_ble_gatts_app_register(APP_ID) != ESP_OK {
                return Err(CommsError::GattRegisterFailed);
            }
        }
        info!("ble: stack up, registering '{device_name}'");
        Ok(())
    }

    pub fn restart_advertising() {
        // SAFETY: ADV_PARAMS is not mutated after start().
        let ret = unsafe { esp_ble_gap_start_advertising(&raw mut ADV_PARAMS) };
        if ret != ESP_OK {
            warn!("ble: advertising restart failed (rc={ret})");
        }
    }

    pub fn notify(frame: &[u8; FRAME_LEN]) -> Result<(), LinkError> {
        let gatts_if = GATTS_IF.load(Ordering::Acquire);
        let tx_handle = TX_HANDLE.load(Ordering::Acquire);
        if gatts_if == ESP_GATT_IF_NONE as u8 || tx_handle == 0 {
            return Err(LinkError::Io);
        }

        // SAFETY: plain C call; the value buffer is copied by the stack.
        let ret = unsafe {
            esp_ble_gatts_send_indicate(
                gatts_if,
                CONN_ID.load(Ordering::Acquire),
                tx_handle,
                FRAME_LEN as u16,
                frame.as_ptr() as *mut _,
                false, // notify, no confirmation
            )
        };
        match ret {
            x if x == ESP_OK => Ok(()),
            x if x == ESP_ERR_NO_MEM => Err(LinkError::Congested),
            _ => Err(LinkError::Io),
        }
    }

    unsafe extern "C" fn gap_event_handler(
        event: esp_gap_ble_cb_event_t,
        _param: *mut esp_ble_gap_cb_param_t,
    ) {
        if event == esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT {
            restart_advertising();
        }
    }

    unsafe extern "C" fn gatts_event_handler(
        event: esp_gatts_cb_event_t,
        gatts_if: esp_gatt_if_t,
        param: *mut esp_ble_gatts_cb_param_t,
    ) {
        // SAFETY: param is valid for the duration of the callback per the
        // Bluedroid contract; only the union member for `event` is read.
        unsafe {
            match event {
                e if e == esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                    GATTS_IF.store(gatts_if, Ordering::Release);

                    let mut adv_data: esp_ble_adv_data_t = core::mem::zeroed();
                    adv_data.set_scan_rsp = false;
                    adv_data.include_name = true;
                    adv_data.min_interval = 0x0006;
                    adv_data.max_interval = 0x0010;
                    adv_data.flag = (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT)
                        as u8;
                    esp_ble_gap_config_adv_data(&mut adv_data);

                    let mut service_id: esp_gatt_srvc_id_t = core::mem::zeroed();
                    service_id.is_primary = true;
                    service_id.id.inst_id = 0;
                    service_id.id.uuid = uuid128(SERVICE_UUID);
                    esp_ble_gatts_create_service(gatts_if, &mut service_id, NUM_HANDLES);
                }

                e if e == esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
                    let create = &(*param).create;
                    SERVICE_HANDLE.store(create.service_handle, Ordering::Release);
                    esp_ble_gatts_start_service(create.service_handle);

                    let mut rx_uuid = uuid128(CHAR_FRAME_RX);
                    esp_ble_gatts_add_char(
                        create.service_handle,
                        &mut rx_uuid,
                        (ESP_GATT_PERM_WRITE) as u16,
                        ESP_GATT_CHAR_PROP_BIT_WRITE as u8,
                        core::ptr::null_mut(),
                        core::ptr::null_mut(),
                    );
                    let mut tx_uuid = uuid128(CHAR_FRAME_TX);
                    esp_ble_gatts_add_char(
                        create.service_handle,
                        &mut tx_uuid,
                        (ESP_GATT_PERM_READ) as u16,
                        ESP_GATT_CHAR_PROP_BIT_NOTIFY as u8,
                        core::ptr::null_mut(),
                        core::ptr::null_mut(),
                    );
                }

                e if e == esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
                    let add = &(*param).add_char;
                    let uuid = add.char_uuid.uuid.uuid128;
                    if uuid == CHAR_FRAME_RX.to_le_bytes() {
                        RX_HANDLE.store(add.attr_handle, Ordering::Release);
                    } else if uuid == CHAR_FRAME_TX.to_le_bytes() {
                        TX_HANDLE.store(add.attr_handle, Ordering::Release);
                    }
                }

                e if e == esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                    let connect = &(*param).connect;
                    CONN_ID.store(connect.conn_id, Ordering::Release);
                    CONNECTED.store(true, Ordering::Release);
                    push_event(Event::ConnectionUp);
                }

                e if e == esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                    CONNECTED.store(false, Ordering::Release);
                    push_event(Event::ConnectionDown);
                }

                e if e == esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
                    let write = &(*param).write;
                    if write.handle == RX_HANDLE.load(Ordering::Acquire) && !write.is_prep {
                        let value =
                            core::slice::from_raw_parts(write.value, write.len as usize);
                        enqueue_inbound(value);
                    }
                }

                _ => {}
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests (simulation backend)
// ═══════════════════════════════════════════════════════════════
