//! Flash adapter — persistent storage for the snapshot block and config.
//!
//! Implements both [`EepromPort`] and [`ConfigPort`].
//!
//! The EEPROM block is a fixed 256-byte region emulated on top of NVS: a
//! RAM shadow serves reads, and every write updates the shadow and commits
//! the whole block as one NVS blob.  NVS commits are atomic per blob, but
//! the *two snapshot slots* inside the block are written by two separate
//! `write` calls — exactly the torn-write window the dual-slot checksum
//! layout in [`store`](crate::store) is designed to detect.
//!
//! Config is a separate postcard-encoded blob, range-validated before
//! every save.

use core::cell::RefCell;

use log::info;

use crate::app::ports::{ConfigError, ConfigPort, EepromError, EepromPort};
use crate::config::SystemConfig;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const NVS_NAMESPACE: &str = "switchbank";
#[cfg(target_os = "espidf")]
const BLOCK_KEY: &str = "eeprom";
#[cfg(target_os = "espidf")]
const CONFIG_KEY: &str = "syscfg";

/// Size of the emulated EEPROM block.
pub const EEPROM_SIZE: usize = 256;

pub struct FlashAdapter {
    /// RAM shadow of the EEPROM block; reads never touch flash.
    shadow: RefCell<[u8; EEPROM_SIZE]>,
    #[cfg(not(target_os = "espidf"))]
    config_blob: RefCell<Option<Vec<u8>>>,
}

impl FlashAdapter {
    /// Create the adapter, initialise NVS flash and load the block shadow.
    ///
    /// Returns `Err(ConfigError::IoError)` if flash initialisation fails
    /// unrecoverably.  On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                log::warn!("flash: erasing and re-initialising NVS partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
        }

        let adapter = Self {
            shadow: RefCell::new([0u8; EEPROM_SIZE]),
            #[cfg(not(target_os = "espidf"))]
            config_blob: RefCell::new(None),
        };

        #[cfg(target_os = "espidf")]
        {
            let mut shadow = adapter.shadow.borrow_mut();
            match Self::nvs_read_blob(BLOCK_KEY, &mut shadow[..]) {
                Ok(len) => info!("flash: block shadow loaded ({len} bytes)"),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("flash: no stored block, starting blank");
                }
                Err(e) => log::warn!("flash: block read error {e}, starting blank"),
            }
        }

        #[cfg(not(target_os = "espidf"))]
        info!("flash: simulation backend");

        Ok(adapter)
    }

    /// Commit the whole shadow block to NVS.
    fn commit_block(&self) -> Result<(), EepromError> {
        #[cfg(target_os = "espidf")]
        {
            let shadow = self.shadow.borrow();
            Self::nvs_write_blob(BLOCK_KEY, &shadow[..]).map_err(|e| {
                log::warn!("flash: block commit error {e}");
                EepromError::Io
            })
        }

        #[cfg(not(target_os = "espidf"))]
        Ok(())
    }

    // ── Raw NVS helpers (espidf only) ─────────────────────────

    /// Open the namespace, run `f` with the handle, close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = NVS_NAMESPACE.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn key_buf(key: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let kb = key.as_bytes();
        let kl = kb.len().min(15);
        buf[..kl].copy_from_slice(&kb[..kl]);
        buf
    }

    /// Read a blob into `buf`, returning the stored length.
    #[cfg(target_os = "espidf")]
    fn nvs_read_blob(key: &str, buf: &mut [u8]) -> Result<usize, i32> {
        Self::with_nvs_handle(false, |handle| {
            let key_buf = Self::key_buf(key);
            let mut size = buf.len();
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(size)
        })
    }

    #[cfg(target_os = "espidf")]
    fn nvs_write_blob(key: &str, data: &[u8]) -> Result<(), i32> {
        Self::with_nvs_handle(true, |handle| {
            let key_buf = Self::key_buf(key);
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    data.as_ptr() as *const _,
                    data.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
    }
}

// ───────────────────────────────────────────────────────────────
// EepromPort
// ───────────────────────────────────────────────────────────────

impl EepromPort for FlashAdapter {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), EepromError> {
        let end = offset.checked_add(buf.len()).ok_or(EepromError::OutOfBounds)?;
        if end > EEPROM_SIZE {
            return Err(EepromError::OutOfBounds);
        }
        buf.copy_from_slice(&self.shadow.borrow()[offset..end]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), EepromError> {
        let end = offset.checked_add(data.len()).ok_or(EepromError::OutOfBounds)?;
        if end > EEPROM_SIZE {
            return Err(EepromError::OutOfBounds);
        }
        self.shadow.borrow_mut()[offset..end].copy_from_slice(data);
        self.commit_block()
    }
}

// ───────────────────────────────────────────────────────────────
// ConfigPort
// ───────────────────────────────────────────────────────────────

fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if cfg.device_name.is_empty() || cfg.device_name.len() > 29 {
        return Err(ConfigError::ValidationFailed(
            "device_name must be 1-29 bytes",
        ));
    }
    if !cfg
        .device_name
        .chars()
        .all(|c| c.is_ascii_graphic() || c == ' ')
    {
        return Err(ConfigError::ValidationFailed(
            "device_name must be printable ASCII",
        ));
    }
    if !(100..=5000).contains(&cfg.tick_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "tick_interval_ms must be 100-5000",
        ));
    }
    if !(10..=1000).contains(&cfg.send_spacing_ms) {
        return Err(ConfigError::ValidationFailed(
            "send_spacing_ms must be 10-1000",
        ));
    }
    if cfg.readvertise_delay_ms > 5000 {
        return Err(ConfigError::ValidationFailed(
            "readvertise_delay_ms must be 0-5000",
        ));
    }
    Ok(())
}

impl ConfigPort for FlashAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            if let Some(bytes) = self.config_blob.borrow().as_deref() {
                let cfg: SystemConfig =
                    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("flash: loaded config from store");
                Ok(cfg)
            } else {
                info!("flash: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let mut buf = [0u8; 256];
            match Self::nvs_read_blob(CONFIG_KEY, &mut buf) {
                Ok(len) => {
                    let cfg: SystemConfig =
                        postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
                    info!("flash: loaded config from NVS ({len} bytes)");
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("flash: no stored config, using defaults");
                    Ok(SystemConfig::default())
                }
                Err(e) => {
                    log::warn!("flash: config read error {e}, using defaults");
                    Ok(SystemConfig::default())
                }
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            *self.config_blob.borrow_mut() = Some(bytes);
            info!("flash: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            match Self::nvs_write_blob(CONFIG_KEY, &bytes) {
                Ok(()) => {
                    info!("flash: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    log::warn!("flash: config write error {e}");
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
