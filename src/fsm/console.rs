// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Serial configuration console.
//!
//! [`State::next`] decides what a line means and never touches settings.
//! [`Console`] applies the resulting [`Effect`] to the [`Configuration`] and
//! writes the operator facing text. Persisting and restarting are left to the
//! main loop through the configuration's pending flags.

use core::fmt::{self, Write};
use core::net::Ipv4Addr;

#[allow(unused_imports)]
use log::{debug, error, info, warn};

use crate::config::{
    self, ApPassword, Configuration, DeviceIdentity, Settings, Ssid, StaPassword, WifiMode,
};
use crate::errors::ValidationError;
use crate::serial::LineError;

pub const PROMPT_MODE: &str = "Enter mode (1 = AP, 0 = Station):";
pub const PROMPT_AP_SSID: &str = "Enter new AP SSID:";
pub const PROMPT_AP_PASSWORD: &str = "Enter new AP password (min 8 characters):";
pub const PROMPT_STA_SSID: &str = "Enter Wi-Fi SSID:";
pub const PROMPT_STA_PASSWORD: &str = "Enter Wi-Fi password (min 8 characters):";

const HELP: &str = "Available commands:\r\n\
    \x20 SET_MODE        switch between AP (1) and Station (0) mode\r\n\
    \x20 SET_AP_SSID     set the access point SSID\r\n\
    \x20 SET_AP_PWD      set the access point password\r\n\
    \x20 SET_WIFI_SSID   set the Wi-Fi network to join, then its password\r\n\
    \x20 SET_SSID        same as SET_WIFI_SSID\r\n\
    \x20 SET_WIFI_PWD    set the Wi-Fi password\r\n\
    \x20 SHOW_CONFIG     print the current settings\r\n\
    \x20 RESET_DEFAULT   restore factory settings and restart\r\n\
    \x20 HELP            this text\r\n\
    A value may follow the command on the same line, e.g. SET_AP_SSID MyCam\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    SetMode,
    SetApSsid,
    SetApPassword,
    SetStaSsid,
    SetStaPassword,
    ShowConfig,
    ResetDefault,
    Help,
}

impl Command {
    fn parse(keyword: &str) -> Option<Self> {
        const TABLE: [(&str, Command); 9] = [
            ("SET_MODE", Command::SetMode),
            ("SET_AP_SSID", Command::SetApSsid),
            ("SET_AP_PWD", Command::SetApPassword),
            ("SET_WIFI_SSID", Command::SetStaSsid),
            ("SET_SSID", Command::SetStaSsid),
            ("SET_WIFI_PWD", Command::SetStaPassword),
            ("SHOW_CONFIG", Command::ShowConfig),
            ("RESET_DEFAULT", Command::ResetDefault),
            ("HELP", Command::Help),
        ];
        TABLE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(keyword))
            .map(|&(_, cmd)| cmd)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum State {
    #[default]
    Idle,
    AwaitingMode,
    AwaitingApSsid,
    AwaitingApPassword,
    AwaitingStaSsid,
    /// `pending_ssid` is applied together with the password.
    AwaitingStaPassword { pending_ssid: Option<Ssid> },
}

/// Validated settings change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Mode(WifiMode),
    ApSsid(Ssid),
    ApPassword(ApPassword),
    StaPassword(StaPassword),
    Station { ssid: Ssid, password: StaPassword },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Prompt(&'static str),
    Unknown,
    Help,
    ShowConfig,
    Apply(Change),
    Reject(ValidationError),
    ResetDefaults,
}

impl State {
    /// Passwords are taken verbatim, every other value is trimmed.
    pub fn next(self, line: &str) -> (State, Effect) {
        let value = line.trim();
        match self {
            State::Idle => Self::command(value),
            State::AwaitingMode => finish(config::parse_mode(value).map(Change::Mode)),
            State::AwaitingApSsid => finish(config::validate_ap_ssid(value).map(Change::ApSsid)),
            State::AwaitingApPassword => {
                finish(config::validate_password(line).map(Change::ApPassword))
            }
            State::AwaitingStaSsid => match config::validate_ssid(value) {
                Ok(ssid) => (
                    State::AwaitingStaPassword {
                        pending_ssid: Some(ssid),
                    },
                    Effect::Prompt(PROMPT_STA_PASSWORD),
                ),
                Err(e) => (State::Idle, Effect::Reject(e)),
            },
            State::AwaitingStaPassword { pending_ssid } => {
                finish(config::validate_password(line).map(|password| match pending_ssid {
                    Some(ssid) => Change::Station { ssid, password },
                    None => Change::StaPassword(password),
                }))
            }
        }
    }

    fn command(line: &str) -> (State, Effect) {
        if line.is_empty() {
            return (State::Idle, Effect::None);
        }
        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (line, ""),
        };
        let Some(command) = Command::parse(keyword) else {
            return (State::Idle, Effect::Unknown);
        };

        let (state, prompt) = match command {
            Command::SetMode => (State::AwaitingMode, PROMPT_MODE),
            Command::SetApSsid => (State::AwaitingApSsid, PROMPT_AP_SSID),
            Command::SetApPassword => (State::AwaitingApPassword, PROMPT_AP_PASSWORD),
            Command::SetStaSsid => (State::AwaitingStaSsid, PROMPT_STA_SSID),
            Command::SetStaPassword => (
                State::AwaitingStaPassword { pending_ssid: None },
                PROMPT_STA_PASSWORD,
            ),
            Command::ShowConfig => return (State::Idle, Effect::ShowConfig),
            Command::ResetDefault => return (State::Idle, Effect::ResetDefaults),
            Command::Help => return (State::Idle, Effect::Help),
        };

        if rest.is_empty() {
            (state, Effect::Prompt(prompt))
        } else {
            state.next(rest)
        }
    }
}

fn finish(change: Result<Change, ValidationError>) -> (State, Effect) {
    match change {
        Ok(change) => (State::Idle, Effect::Apply(change)),
        Err(e) => (State::Idle, Effect::Reject(e)),
    }
}

/// What `SHOW_CONFIG` and `RESET_DEFAULT` need beyond the settings.
#[derive(Debug, Clone, Copy)]
pub struct SessionInfo<'a> {
    pub ip: Option<Ipv4Addr>,
    pub identity: &'a DeviceIdentity,
}

#[derive(Debug, Default)]
pub struct Console {
    state: State,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn handle_line<W: Write>(
        &mut self,
        line: &str,
        config: &mut Configuration,
        session: &SessionInfo<'_>,
        out: &mut W,
    ) -> fmt::Result {
        let (state, effect) = core::mem::take(&mut self.state).next(line);
        self.state = state;

        match effect {
            Effect::None => Ok(()),
            Effect::Prompt(prompt) => write!(out, "{prompt}\r\n"),
            Effect::Unknown => {
                debug!("unknown command");
                out.write_str("ERROR: unknown command, type HELP for a list\r\n")
            }
            Effect::Help => out.write_str(HELP),
            Effect::ShowConfig => show_config(config.settings(), session.ip, out),
            Effect::Apply(change) => apply(change, config, out),
            Effect::Reject(e) => write!(out, "ERROR: {e}\r\n"),
            Effect::ResetDefaults => {
                info!("resetting settings to defaults");
                config.reset_to_defaults(session.identity);
                out.write_str("Settings reset to defaults, restarting...\r\n")
            }
        }
    }

    /// Report a line that could not be framed. Any multi-step command in
    /// progress is abandoned.
    pub fn reject_line<W: Write>(&mut self, err: LineError, out: &mut W) -> fmt::Result {
        self.state = State::Idle;
        write!(out, "ERROR: {err}\r\n")
    }
}

fn apply<W: Write>(change: Change, config: &mut Configuration, out: &mut W) -> fmt::Result {
    let (what, result) = match &change {
        Change::Mode(mode) => {
            config.set_mode(*mode);
            ("Mode", Ok(()))
        }
        Change::ApSsid(ssid) => ("AP SSID", config.set_ap_ssid(ssid)),
        Change::ApPassword(password) => ("AP password", config.set_ap_password(password)),
        Change::StaPassword(password) => ("Wi-Fi password", config.set_sta_password(password)),
        Change::Station { ssid, password } => {
            ("Wi-Fi SSID and password", config.set_station(ssid, password))
        }
    };
    match result {
        Ok(()) => {
            info!("{} updated", what);
            write!(out, "{what} updated, restarting...\r\n")
        }
        Err(e) => write!(out, "ERROR: {e}\r\n"),
    }
}

fn show_config<W: Write>(settings: &Settings, ip: Option<Ipv4Addr>, out: &mut W) -> fmt::Result {
    write!(out, "Mode: {}\r\n", settings.mode.label())?;
    match settings.mode {
        WifiMode::AccessPoint => {
            write!(out, "AP SSID: {}\r\n", settings.ap_ssid)?;
            write!(out, "AP password: {}\r\n", settings.ap_password)?;
        }
        WifiMode::Station => {
            write!(out, "Wi-Fi SSID: {}\r\n", settings.sta_ssid)?;
            write!(out, "Wi-Fi password: {}\r\n", settings.sta_password)?;
        }
    }
    match ip {
        Some(ip) => write!(out, "IP: {ip}\r\n"),
        None => out.write_str("IP: not connected\r\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DEFAULT_AP_PASSWORD, DEFAULT_STA_SSID};

    const ID: DeviceIdentity = DeviceIdentity::Mac([0, 0, 0, 0, 0xBE, 0xEF]);

    struct Session {
        console: Console,
        config: Configuration,
        out: String,
    }

    impl Session {
        fn new() -> Self {
            Self {
                console: Console::new(),
                config: Configuration::new(),
                out: String::new(),
            }
        }

        fn send(&mut self, line: &str) -> &str {
            self.out.clear();
            let info = SessionInfo {
                ip: Some(Ipv4Addr::new(192, 168, 4, 1)),
                identity: &ID,
            };
            self.console
                .handle_line(line, &mut self.config, &info, &mut self.out)
                .unwrap();
            &self.out
        }
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            State::Idle.next("set_ap_pwd"),
            (State::AwaitingApPassword, Effect::Prompt(PROMPT_AP_PASSWORD))
        );
        assert_eq!(
            State::Idle.next("  Set_Mode \r"),
            (State::AwaitingMode, Effect::Prompt(PROMPT_MODE))
        );
    }

    #[test]
    fn unknown_command_stays_idle() {
        let mut s = Session::new();
        let out = s.send("FOO");
        assert!(out.starts_with("ERROR: unknown command"));
        assert_eq!(s.console.state(), &State::Idle);
        assert!(!s.config.take_needs_persist());
        assert!(!s.config.take_pending_restart());
    }

    #[test]
    fn blank_line_is_ignored() {
        let mut s = Session::new();
        assert_eq!(s.send("   "), "");
        assert_eq!(s.console.state(), &State::Idle);
    }

    #[test]
    fn short_ap_password_is_rejected() {
        let mut s = Session::new();
        assert_eq!(s.send("SET_AP_PWD"), "Enter new AP password (min 8 characters):\r\n");
        let out = s.send("short");
        assert!(out.contains("minimum 8 characters"), "{out}");
        assert_eq!(s.console.state(), &State::Idle);
        assert_eq!(s.config.settings().ap_password.as_str(), DEFAULT_AP_PASSWORD);
        assert!(!s.config.take_needs_persist());
    }

    #[test]
    fn station_credentials_are_chained() {
        let mut s = Session::new();
        s.send("SET_WIFI_SSID");
        assert_eq!(s.console.state(), &State::AwaitingStaSsid);
        assert_eq!(s.send("MyHome"), "Enter Wi-Fi password (min 8 characters):\r\n");
        assert!(matches!(
            s.console.state(),
            State::AwaitingStaPassword { pending_ssid: Some(ssid) } if ssid == "MyHome"
        ));
        // nothing applied until the password arrives
        assert_eq!(s.config.settings().sta_ssid.as_str(), DEFAULT_STA_SSID);

        s.send("longenoughpwd");
        assert_eq!(s.console.state(), &State::Idle);
        assert_eq!(s.config.settings().sta_ssid.as_str(), "MyHome");
        assert_eq!(s.config.settings().sta_password.as_str(), "longenoughpwd");
        assert!(s.config.take_needs_persist());
        assert!(!s.config.take_needs_persist());
    }

    #[test]
    fn bad_station_password_discards_pending_ssid() {
        let mut s = Session::new();
        s.send("SET_SSID");
        s.send("Cafe");
        let out = s.send("1234");
        assert!(out.starts_with("ERROR:"));
        assert_eq!(s.console.state(), &State::Idle);
        assert_eq!(s.config.settings().sta_ssid.as_str(), DEFAULT_STA_SSID);
        assert!(!s.config.take_needs_persist());
    }

    #[test]
    fn values_keep_their_case() {
        let mut s = Session::new();
        s.send("set_ap_ssid");
        s.send("  Garden Cam  ");
        assert_eq!(s.config.settings().ap_ssid.as_str(), "Garden Cam");
    }

    #[test]
    fn passphrase_keeps_its_spaces() {
        let mut s = Session::new();
        s.send("SET_AP_PWD");
        s.send("  open sesame ");
        assert_eq!(s.config.settings().ap_password.as_str(), "  open sesame ");
        s.send("SET_SSID");
        s.send("  Attic  ");
        s.send(" correct horse");
        assert_eq!(s.config.settings().sta_ssid.as_str(), "Attic");
        assert_eq!(s.config.settings().sta_password.as_str(), " correct horse");
    }

    #[test]
    fn placeholder_ap_ssid_is_refused() {
        let mut s = Session::new();
        let out = s.send("SET_AP_SSID ESP32-XXXX").to_owned();
        assert_eq!(out, "ERROR: ESP32-XXXX is reserved\r\n");
        assert_eq!(s.console.state(), &State::Idle);
        assert!(!s.config.take_needs_persist());
        assert!(!s.config.take_pending_restart());
    }

    #[test]
    fn control_characters_in_values_are_refused() {
        let mut s = Session::new();
        s.send("SET_AP_PWD");
        let out = s.send("abc\0defghij").to_owned();
        assert!(out.starts_with("ERROR: value must not contain control"), "{out}");
        assert_eq!(s.config.settings().ap_password.as_str(), DEFAULT_AP_PASSWORD);
        assert!(!s.config.take_needs_persist());
    }

    #[test]
    fn value_on_the_command_line() {
        let mut s = Session::new();
        s.send("SET_AP_SSID Porch");
        assert_eq!(s.config.settings().ap_ssid.as_str(), "Porch");
        assert_eq!(
            State::Idle.next("SET_WIFI_SSID Office"),
            (
                State::AwaitingStaPassword {
                    pending_ssid: Some(Ssid::try_from("Office").unwrap())
                },
                Effect::Prompt(PROMPT_STA_PASSWORD)
            )
        );
    }

    #[test]
    fn value_line_is_not_a_command() {
        let (state, effect) = State::AwaitingApSsid.next("HELP");
        assert_eq!(state, State::Idle);
        assert!(matches!(effect, Effect::Apply(Change::ApSsid(ssid)) if ssid == "HELP"));
    }

    #[test]
    fn mode_accepts_one_or_zero() {
        let mut s = Session::new();
        s.send("SET_MODE");
        assert!(s.send("2").starts_with("ERROR: mode must be"));
        assert_eq!(s.config.settings().mode, WifiMode::AccessPoint);
        s.send("SET_MODE");
        s.send("0");
        assert_eq!(s.config.settings().mode, WifiMode::Station);
        assert!(s.config.take_needs_persist());
    }

    #[test]
    fn wifi_pwd_alone_keeps_ssid() {
        let mut s = Session::new();
        s.send("SET_WIFI_PWD");
        s.send("anotherpassword");
        assert_eq!(s.config.settings().sta_ssid.as_str(), DEFAULT_STA_SSID);
        assert_eq!(s.config.settings().sta_password.as_str(), "anotherpassword");
    }

    #[test]
    fn show_config_follows_mode() {
        let mut s = Session::new();
        s.send("SET_AP_SSID Porch");
        let out = s.send("show_config").to_owned();
        assert!(out.contains("Mode: AP\r\n"));
        assert!(out.contains("AP SSID: Porch\r\n"));
        assert!(out.contains("IP: 192.168.4.1\r\n"));

        s.send("SET_MODE 0");
        let out = s.send("SHOW_CONFIG");
        assert!(out.contains("Mode: Station\r\n"));
        assert!(out.contains(&format!("Wi-Fi SSID: {DEFAULT_STA_SSID}")));
    }

    #[test]
    fn reset_default_regenerates_ap_ssid() {
        let mut s = Session::new();
        s.send("SET_AP_SSID Porch");
        s.config.take_needs_persist();
        s.send("RESET_DEFAULT");
        assert_eq!(s.config.settings().ap_ssid.as_str(), "ESP32-BEEF");
        assert!(s.config.take_needs_persist());
    }

    #[test]
    fn help_lists_every_command() {
        let mut s = Session::new();
        let out = s.send("help").to_owned();
        for cmd in [
            "SET_MODE",
            "SET_AP_SSID",
            "SET_AP_PWD",
            "SET_WIFI_SSID",
            "SET_SSID",
            "SET_WIFI_PWD",
            "SHOW_CONFIG",
            "RESET_DEFAULT",
        ] {
            assert!(out.contains(cmd), "{cmd} missing");
        }
    }

    #[test]
    fn framing_error_abandons_prompt() {
        let mut s = Session::new();
        s.send("SET_AP_PWD");
        let mut out = String::new();
        s.console.reject_line(LineError::Overflow, &mut out).unwrap();
        assert!(out.starts_with("ERROR: line too long"));
        assert_eq!(s.console.state(), &State::Idle);
    }
}
