// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

use core::fmt::Write as _;

use hal::{NvMedium, SystemControl};
use heapless::String;
#[allow(unused_imports)]
use log::{debug, error, info, warn};
use pretty_hex::PrettyHex;
use storage::record::{self, INIT_MARKER, MODE_ACCESS_POINT, MODE_STATION, Record};
use storage::{Store, StoreResult};

use crate::errors::ValidationError;
use crate::settings::{
    AP_SSID_PLACEHOLDER, AP_SSID_PREFIX, DEFAULT_AP_PASSWORD, DEFAULT_STA_PASSWORD,
    DEFAULT_STA_SSID, MIN_PASSWORD_LEN,
};

/// Capacity of each text setting, one byte short of its record field.
pub const SSID_MAX: usize = record::AP_SSID.max_text();
pub const AP_PASSWORD_MAX: usize = record::AP_PASSWORD.max_text();
pub const STA_PASSWORD_MAX: usize = record::STA_PASSWORD.max_text();

pub type Ssid = String<SSID_MAX>;
pub type ApPassword = String<AP_PASSWORD_MAX>;
pub type StaPassword = String<STA_PASSWORD_MAX>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiMode {
    AccessPoint,
    Station,
}

impl WifiMode {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            MODE_ACCESS_POINT => Some(Self::AccessPoint),
            MODE_STATION => Some(Self::Station),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::AccessPoint => MODE_ACCESS_POINT,
            Self::Station => MODE_STATION,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AccessPoint => "AP",
            Self::Station => "Station",
        }
    }
}

/// Source for the generated AP SSID suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceIdentity {
    Mac([u8; 6]),
    /// No hardware identifier available
    Random(u32),
}

impl DeviceIdentity {
    pub fn from_system<S: SystemControl>(system: &mut S) -> Self {
        match system.mac_address() {
            Some(mac) => Self::Mac(mac),
            None => {
                warn!("no MAC address available, AP SSID falls back to a random suffix");
                Self::Random(system.random_u32())
            }
        }
    }

    /// `ESP32-` plus the last two MAC bytes in hex, or four random digits.
    pub fn ap_ssid(&self) -> Ssid {
        let mut ssid = Ssid::new();
        // OK unwrap: prefix and 4 characters always fit
        match self {
            Self::Mac(mac) => write!(ssid, "{}{:02X}{:02X}", AP_SSID_PREFIX, mac[4], mac[5]),
            Self::Random(n) => write!(ssid, "{}{:04}", AP_SSID_PREFIX, n % 10_000),
        }
        .unwrap();
        ssid
    }
}

pub fn parse_mode(input: &str) -> Result<WifiMode, ValidationError> {
    match input.trim() {
        "1" => Ok(WifiMode::AccessPoint),
        "0" => Ok(WifiMode::Station),
        "" => Err(ValidationError::Empty),
        _ => Err(ValidationError::InvalidMode),
    }
}

/// Stored text ends at the first NUL, so no control characters get in.
fn reject_control(input: &str) -> Result<(), ValidationError> {
    if input.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacter);
    }
    Ok(())
}

pub fn validate_ssid(input: &str) -> Result<Ssid, ValidationError> {
    if input.is_empty() {
        return Err(ValidationError::Empty);
    }
    reject_control(input)?;
    Ssid::try_from(input).map_err(|_| ValidationError::TooLong { max: SSID_MAX })
}

/// Like [`validate_ssid`], but the placeholder is taken as "not generated".
pub fn validate_ap_ssid(input: &str) -> Result<Ssid, ValidationError> {
    let ssid = validate_ssid(input)?;
    if ssid == AP_SSID_PLACEHOLDER {
        return Err(ValidationError::ReservedSsid);
    }
    Ok(ssid)
}

pub fn validate_password<const N: usize>(input: &str) -> Result<String<N>, ValidationError> {
    if input.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    reject_control(input)?;
    String::try_from(input).map_err(|_| ValidationError::TooLong { max: N })
}

#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub mode: WifiMode,
    pub ap_ssid: Ssid,
    pub ap_password: ApPassword,
    pub sta_ssid: Ssid,
    pub sta_password: StaPassword,
}

impl Settings {
    /// Compiled-in defaults. The AP SSID is left empty until an identity
    /// fills it in.
    pub fn defaults() -> Self {
        // OK unwrap: lengths are checked at compile time in settings.rs
        Self {
            mode: WifiMode::AccessPoint,
            ap_ssid: Ssid::new(),
            ap_password: ApPassword::try_from(DEFAULT_AP_PASSWORD).unwrap(),
            sta_ssid: Ssid::try_from(DEFAULT_STA_SSID).unwrap(),
            sta_password: StaPassword::try_from(DEFAULT_STA_PASSWORD).unwrap(),
        }
    }

    /// Encode with the init marker set.
    pub fn to_record(&self) -> Record {
        let mut record = Record::zeroed();
        record.set_mode(self.mode.as_byte());
        record.set_marker(INIT_MARKER);
        // OK unwrap: every string is one byte shorter than its field
        record.set_text(record::AP_SSID, &self.ap_ssid).unwrap();
        record.set_text(record::AP_PASSWORD, &self.ap_password).unwrap();
        record.set_text(record::STA_SSID, &self.sta_ssid).unwrap();
        record.set_text(record::STA_PASSWORD, &self.sta_password).unwrap();
        record
    }

    /// Decode `record`, replacing every invalid field with its default.
    /// Returns the settings and whether anything was repaired.
    pub fn from_record(record: &Record, identity: &DeviceIdentity) -> (Self, bool) {
        let defaults = Self::defaults();
        let mut repaired = false;

        let mode = WifiMode::from_byte(record.mode()).unwrap_or_else(|| {
            warn!("stored mode {} invalid, using AP", record.mode());
            repaired = true;
            WifiMode::AccessPoint
        });

        let stored = record.text(record::AP_SSID);
        let ap_ssid = match validate_ap_ssid(stored) {
            Ok(ssid) => ssid,
            Err(_) => {
                repaired = true;
                let ssid = identity.ap_ssid();
                warn!("stored AP SSID missing, generated {}", ssid);
                ssid
            }
        };

        let ap_password = repair(
            validate_password(record.text(record::AP_PASSWORD)),
            defaults.ap_password,
            "AP password",
            &mut repaired,
        );
        let sta_ssid = repair(
            validate_ssid(record.text(record::STA_SSID)),
            defaults.sta_ssid,
            "station SSID",
            &mut repaired,
        );
        let sta_password = repair(
            validate_password(record.text(record::STA_PASSWORD)),
            defaults.sta_password,
            "station password",
            &mut repaired,
        );

        (
            Self {
                mode,
                ap_ssid,
                ap_password,
                sta_ssid,
                sta_password,
            },
            repaired,
        )
    }
}

fn repair<T>(
    value: Result<T, ValidationError>,
    default: T,
    name: &str,
    repaired: &mut bool,
) -> T {
    value.unwrap_or_else(|e| {
        warn!("stored {} invalid ({}), using default", name, e);
        *repaired = true;
        default
    })
}

impl core::fmt::Debug for Settings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Settings")
            .field("mode", &self.mode)
            .field("ap_ssid", &self.ap_ssid)
            .field("sta_ssid", &self.sta_ssid)
            .finish_non_exhaustive()
    }
}

/// Work requested by command handlers, drained by the main loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    pub needs_persist: bool,
    pub pending_restart: bool,
}

/// Live settings plus the flags that tie them to the store.
#[derive(Debug)]
pub struct Configuration {
    settings: Settings,
    pending: Pending,
}

impl Configuration {
    pub fn new() -> Self {
        Self {
            settings: Settings::defaults(),
            pending: Pending::default(),
        }
    }

    /// Settings for this boot: defaults on a blank store, otherwise the
    /// stored record after validation.
    pub fn load_or_create<M: NvMedium>(store: &mut Store<M>, identity: &DeviceIdentity) -> Self {
        let mut config = Self::new();
        if store.is_initialized() {
            info!("stored settings found");
            config.load_from_store(store, identity);
        } else {
            info!("no stored settings, first boot");
            config.apply_defaults(store, identity);
        }
        config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pending(&self) -> Pending {
        self.pending
    }

    pub fn take_needs_persist(&mut self) -> bool {
        core::mem::take(&mut self.pending.needs_persist)
    }

    pub fn take_pending_restart(&mut self) -> bool {
        core::mem::take(&mut self.pending.pending_restart)
    }

    /// Validate the stored record and persist any repair straight away.
    /// Returns whether something was repaired.
    pub fn load_from_store<M: NvMedium>(
        &mut self,
        store: &mut Store<M>,
        identity: &DeviceIdentity,
    ) -> bool {
        let record = store.read_record();
        // mode, marker and AP SSID only, passwords stay out of logs
        let header = &record.as_bytes()[..record::AP_SSID.end()];
        debug!("stored record {:?}", header.hex_dump());
        let (settings, repaired) = Settings::from_record(&record, identity);
        self.settings = settings;
        if repaired {
            info!("repaired stored settings, saving");
            let _ = self.persist(store);
        }
        repaired
    }

    /// First boot: compiled defaults, generated AP SSID, one persist and no
    /// restart.
    pub fn apply_defaults<M: NvMedium>(&mut self, store: &mut Store<M>, identity: &DeviceIdentity) {
        self.settings = Settings::defaults();
        self.settings.ap_ssid = identity.ap_ssid();
        info!("default settings applied, AP SSID {}", self.settings.ap_ssid);
        let _ = self.persist(store);
    }

    /// Write and commit the current settings. Always schedules a restart so
    /// the new settings take effect, even when the commit failed.
    pub fn save<M: NvMedium>(&mut self, store: &mut Store<M>) -> StoreResult<()> {
        self.pending.pending_restart = true;
        self.persist(store)
    }

    fn persist<M: NvMedium>(&self, store: &mut Store<M>) -> StoreResult<()> {
        store.write_record(&self.settings.to_record());
        store.commit().inspect_err(|e| error!("saving settings failed: {e}"))
    }

    pub fn set_mode(&mut self, mode: WifiMode) {
        self.settings.mode = mode;
        self.pending.needs_persist = true;
    }

    pub fn set_ap_ssid(&mut self, ssid: &str) -> Result<(), ValidationError> {
        self.settings.ap_ssid = validate_ap_ssid(ssid)?;
        self.pending.needs_persist = true;
        Ok(())
    }

    pub fn set_ap_password(&mut self, password: &str) -> Result<(), ValidationError> {
        self.settings.ap_password = validate_password(password)?;
        self.pending.needs_persist = true;
        Ok(())
    }

    pub fn set_sta_ssid(&mut self, ssid: &str) -> Result<(), ValidationError> {
        self.settings.sta_ssid = validate_ssid(ssid)?;
        self.pending.needs_persist = true;
        Ok(())
    }

    pub fn set_sta_password(&mut self, password: &str) -> Result<(), ValidationError> {
        self.settings.sta_password = validate_password(password)?;
        self.pending.needs_persist = true;
        Ok(())
    }

    /// Both station credentials or neither.
    pub fn set_station(&mut self, ssid: &str, password: &str) -> Result<(), ValidationError> {
        let ssid = validate_ssid(ssid)?;
        let password = validate_password(password)?;
        self.settings.sta_ssid = ssid;
        self.settings.sta_password = password;
        self.pending.needs_persist = true;
        Ok(())
    }

    /// Compiled defaults with a freshly generated AP SSID, saved by the main
    /// loop.
    pub fn reset_to_defaults(&mut self, identity: &DeviceIdentity) {
        self.settings = Settings::defaults();
        self.settings.ap_ssid = identity.ap_ssid();
        self.pending.needs_persist = true;
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::MemMedium;

    const MAC: DeviceIdentity = DeviceIdentity::Mac([0x24, 0x6F, 0x28, 0x01, 0xA1, 0xB2]);

    fn fresh_store() -> Store<MemMedium> {
        Store::initialize(MemMedium::erased()).unwrap()
    }

    fn reopen(store: Store<MemMedium>) -> Store<MemMedium> {
        Store::initialize(store.into_medium().unwrap()).unwrap()
    }

    fn commits(store: &Store<MemMedium>) -> usize {
        store.medium().unwrap().commits()
    }

    #[test]
    fn mac_identity_uses_last_two_bytes() {
        assert_eq!(MAC.ap_ssid().as_str(), "ESP32-A1B2");
    }

    #[test]
    fn random_identity_is_four_digits() {
        assert_eq!(DeviceIdentity::Random(7).ap_ssid().as_str(), "ESP32-0007");
        assert_eq!(DeviceIdentity::Random(123_456).ap_ssid().as_str(), "ESP32-3456");
    }

    #[test]
    fn first_boot_seeds_defaults_without_restart() {
        let mut store = fresh_store();
        let mut config = Configuration::load_or_create(&mut store, &MAC);

        let s = config.settings();
        assert_eq!(s.mode, WifiMode::AccessPoint);
        assert_eq!(s.ap_ssid.as_str(), "ESP32-A1B2");
        assert_eq!(s.ap_password.as_str(), DEFAULT_AP_PASSWORD);
        assert_eq!(commits(&store), 1);
        assert!(store.is_initialized());
        assert!(!config.take_pending_restart());
        assert!(!config.take_needs_persist());
    }

    #[test]
    fn unmarked_record_is_first_boot_whatever_it_holds() {
        let mut record = Settings::defaults().to_record();
        record.set_text(record::STA_SSID, "Neighbour").unwrap();
        record.set_marker(0x00);
        let mut store = Store::initialize(MemMedium::with_contents(record.as_bytes())).unwrap();

        let config = Configuration::load_or_create(&mut store, &MAC);
        assert_eq!(config.settings().sta_ssid.as_str(), DEFAULT_STA_SSID);
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut store = fresh_store();
        let mut config = Configuration::load_or_create(&mut store, &MAC);
        config.set_mode(WifiMode::Station);
        config.set_station("MyHome", "longenoughpwd").unwrap();
        config.set_ap_password("Sup3rSecret").unwrap();
        config.save(&mut store).unwrap();
        let saved = config.settings().clone();

        let mut store = reopen(store);
        let before = commits(&store);
        let loaded = Configuration::load_or_create(&mut store, &MAC);
        assert_eq!(loaded.settings(), &saved);
        // nothing to repair, nothing written
        assert_eq!(commits(&store), before);
    }

    #[test]
    fn invalid_fields_are_repaired_and_resaved() {
        let mut record = Record::zeroed();
        record.set_marker(INIT_MARKER);
        record.set_mode(7);
        record.set_text(record::AP_SSID, AP_SSID_PLACEHOLDER).unwrap();
        record.set_text(record::AP_PASSWORD, "short").unwrap();
        record.set_text(record::STA_SSID, "").unwrap();
        record.set_text(record::STA_PASSWORD, "alsogoodpassword").unwrap();
        let mut store = Store::initialize(MemMedium::with_contents(record.as_bytes())).unwrap();

        let mut config = Configuration::new();
        assert!(config.load_from_store(&mut store, &MAC));

        let s = config.settings();
        assert_eq!(s.mode, WifiMode::AccessPoint);
        assert_eq!(s.ap_ssid.as_str(), "ESP32-A1B2");
        assert_eq!(s.ap_password.as_str(), DEFAULT_AP_PASSWORD);
        assert_eq!(s.sta_ssid.as_str(), DEFAULT_STA_SSID);
        assert_eq!(s.sta_password.as_str(), "alsogoodpassword");
        assert_eq!(commits(&store), 1);
        assert!(!config.take_pending_restart());

        // repaired record is what the next boot sees
        let store = reopen(store);
        let (again, repaired) = Settings::from_record(&store.read_record(), &MAC);
        assert!(!repaired);
        assert_eq!(&again, config.settings());
    }

    #[test]
    fn unterminated_ssid_is_repaired() {
        let mut bytes = Settings::defaults().to_record().as_bytes().to_vec();
        let f = record::STA_SSID;
        bytes[f.offset..f.end()].fill(b'x');
        let record = Record::from_bytes(&bytes);
        let (settings, repaired) = Settings::from_record(&record, &MAC);
        assert!(repaired);
        assert_eq!(settings.sta_ssid.as_str(), DEFAULT_STA_SSID);
    }

    #[test]
    fn short_password_is_rejected_and_kept() {
        let mut config = Configuration::new();
        let before = config.settings().ap_password.clone();
        assert_eq!(
            config.set_ap_password("short"),
            Err(ValidationError::PasswordTooShort)
        );
        assert_eq!(
            config.set_sta_password("1234567"),
            Err(ValidationError::PasswordTooShort)
        );
        assert_eq!(config.settings().ap_password, before);
        assert!(!config.pending().needs_persist);
    }

    #[test]
    fn eight_characters_is_enough() {
        let mut config = Configuration::new();
        config.set_ap_password("12345678").unwrap();
        assert!(config.take_needs_persist());
        assert!(!config.take_needs_persist());
    }

    #[test]
    fn overlong_values_are_rejected() {
        let mut config = Configuration::new();
        let long_ssid = "s".repeat(SSID_MAX + 1);
        assert_eq!(
            config.set_sta_ssid(&long_ssid),
            Err(ValidationError::TooLong { max: SSID_MAX })
        );
        let long_pw = "p".repeat(AP_PASSWORD_MAX + 1);
        assert_eq!(
            config.set_ap_password(&long_pw),
            Err(ValidationError::TooLong {
                max: AP_PASSWORD_MAX
            })
        );
        // the station password field is wider
        config.set_sta_password(&long_pw).unwrap();
    }

    #[test]
    fn station_credentials_change_together() {
        let mut config = Configuration::new();
        assert_eq!(
            config.set_station("Cafe", "tiny"),
            Err(ValidationError::PasswordTooShort)
        );
        assert_eq!(config.settings().sta_ssid.as_str(), DEFAULT_STA_SSID);
    }

    #[test]
    fn save_always_schedules_restart() {
        let mut store: Store<MemMedium> = Store::detached();
        let mut config = Configuration::new();
        assert!(config.save(&mut store).is_err());
        assert!(config.take_pending_restart());
    }

    #[test]
    fn reset_twice_gives_the_same_record() {
        let mut store = fresh_store();
        let mut config = Configuration::load_or_create(&mut store, &MAC);
        config.set_mode(WifiMode::Station);
        config.set_ap_ssid("Custom").unwrap();

        config.reset_to_defaults(&MAC);
        config.save(&mut store).unwrap();
        let first = store.read_record();
        config.reset_to_defaults(&MAC);
        config.save(&mut store).unwrap();
        assert_eq!(store.read_record(), first);
        assert_eq!(first.text(record::AP_SSID), "ESP32-A1B2");
    }

    #[test]
    fn placeholder_ap_ssid_is_rejected() {
        let mut store = fresh_store();
        let mut config = Configuration::load_or_create(&mut store, &MAC);
        assert_eq!(
            config.set_ap_ssid(AP_SSID_PLACEHOLDER),
            Err(ValidationError::ReservedSsid)
        );
        assert_eq!(config.settings().ap_ssid.as_str(), "ESP32-A1B2");
        assert!(!config.pending().needs_persist);
        // any other ESP32- name is fine
        config.set_ap_ssid("ESP32-CAFE").unwrap();
    }

    #[test]
    fn accepted_values_survive_a_reload() {
        let mut store = fresh_store();
        let mut config = Configuration::load_or_create(&mut store, &MAC);
        config.set_ap_ssid("ESP32-0000").unwrap();
        config.set_ap_password("pässwört").unwrap();
        config.set_station("Café Wi-Fi", " spaced pass ").unwrap();
        config.save(&mut store).unwrap();
        let saved = config.settings().clone();

        let mut store = reopen(store);
        let mut loaded = Configuration::new();
        assert!(!loaded.load_from_store(&mut store, &MAC));
        assert_eq!(loaded.settings(), &saved);
    }

    #[test]
    fn control_characters_are_rejected() {
        let mut config = Configuration::new();
        assert_eq!(
            config.set_ap_password("abc\0defghij"),
            Err(ValidationError::ControlCharacter)
        );
        assert_eq!(
            config.set_sta_password("tab\tinside1"),
            Err(ValidationError::ControlCharacter)
        );
        assert_eq!(
            config.set_sta_ssid("Home\u{1b}[2J"),
            Err(ValidationError::ControlCharacter)
        );
        assert_eq!(
            config.set_station("Home", "pass\u{7f}word"),
            Err(ValidationError::ControlCharacter)
        );
        assert_eq!(config.settings().ap_password.as_str(), DEFAULT_AP_PASSWORD);
        assert_eq!(config.settings().sta_ssid.as_str(), DEFAULT_STA_SSID);
        assert!(!config.pending().needs_persist);
    }

    #[test]
    fn parse_mode_accepts_only_digits() {
        assert_eq!(parse_mode("1"), Ok(WifiMode::AccessPoint));
        assert_eq!(parse_mode(" 0 "), Ok(WifiMode::Station));
        assert_eq!(parse_mode("ap"), Err(ValidationError::InvalidMode));
        assert_eq!(parse_mode(""), Err(ValidationError::Empty));
    }
}
