//! Mapping from camera setting keys to keys of the local store.
//!
//! The table is fixed; only the local key names are resolved at runtime,
//! once per process, through a [`KeyResolver`].

use std::sync::OnceLock;

/// One synchronized setting: camera key, default local key, boolean flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingDef {
    pub camera_key: &'static str,
    pub default_local_key: &'static str,
    /// Boolean settings travel as `"0"` / `"1"`.
    pub is_bool: bool,
}

const fn def(camera_key: &'static str, default_local_key: &'static str, is_bool: bool) -> SettingDef {
    SettingDef {
        camera_key,
        default_local_key,
        is_bool,
    }
}

/// Every camera setting kept in sync with the local store.
pub const SYNCED_SETTINGS: &[SettingDef] = &[
    def("video_option", "video_mode", false),
    def("video_resolution", "video_resolution", false),
    def("video_quality", "video_quality", false),
    def("auto_rec", "video_autorec", false),
    def("photo_option", "photo_mode", false),
    def("photo_size", "photo_resolution", false),
    def("photo_quality", "photo_quality", false),
    def("time_stamp", "effects_timestamp", true),
    def("aqua_mode", "effects_aqua_mode", true),
    def("fov", "effects_fov", false),
    def("ae_metering", "effects_ae_metering", false),
    def("vout", "system_tv_mode", false),
    def("mic", "system_mic_volume", false),
    def("buzzer", "system_buzzer", true),
    def("led", "system_led", true),
    def("auto_lcd_off", "system_auto_lcd_off", true),
    def("auto_power_off", "system_auto_power_off", true),
];

/// Resolves the local store key of a setting.
pub trait KeyResolver: Send + Sync {
    fn local_key(&self, setting: &SettingDef) -> String;
}

/// Uses the built-in local key names.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultKeys;

impl KeyResolver for DefaultKeys {
    fn local_key(&self, setting: &SettingDef) -> String {
        setting.default_local_key.to_string()
    }
}

/// A resolved mapping entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingEntry {
    pub camera_key: &'static str,
    pub local_key: String,
    pub is_bool: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingMap {
    entries: Vec<SettingEntry>,
}

static SETTING_MAP: OnceLock<SettingMap> = OnceLock::new();

impl SettingMap {
    pub fn build(resolver: &dyn KeyResolver) -> Self {
        let entries = SYNCED_SETTINGS
            .iter()
            .map(|setting| SettingEntry {
                camera_key: setting.camera_key,
                local_key: resolver.local_key(setting),
                is_bool: setting.is_bool,
            })
            .collect();
        Self { entries }
    }

    /// The process-wide map, built with `resolver` on first use.
    ///
    /// Later calls return the first map regardless of their resolver.
    pub fn global(resolver: &dyn KeyResolver) -> &'static SettingMap {
        SETTING_MAP.get_or_init(|| Self::build(resolver))
    }

    pub fn entries(&self) -> &[SettingEntry] {
        &self.entries
    }

    pub fn get(&self, camera_key: &str) -> Option<&SettingEntry> {
        self.entries.iter().find(|e| e.camera_key == camera_key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Wire form of a boolean setting.
pub fn encode_bool(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Anything but `"1"` reads as `false`.
pub fn decode_bool(raw: &str) -> bool {
    raw == "1"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Prefixed;

    impl KeyResolver for Prefixed {
        fn local_key(&self, setting: &SettingDef) -> String {
            format!("pref_{}_key", setting.default_local_key)
        }
    }

    #[test]
    fn keys_are_unique() {
        let map = SettingMap::build(&DefaultKeys);
        assert_eq!(map.len(), 17);
        let camera: HashSet<_> = map.entries().iter().map(|e| e.camera_key).collect();
        let local: HashSet<_> = map.entries().iter().map(|e| e.local_key.as_str()).collect();
        assert_eq!(camera.len(), map.len());
        assert_eq!(local.len(), map.len());
    }

    #[test]
    fn resolver_names_local_keys() {
        let map = SettingMap::build(&Prefixed);
        let led = map.get("led").unwrap();
        assert_eq!(led.local_key, "pref_system_led_key");
        assert!(led.is_bool);
        assert!(!map.get("video_resolution").unwrap().is_bool);
    }

    #[test]
    fn global_map_is_built_once() {
        let first = SettingMap::global(&DefaultKeys);
        let second = SettingMap::global(&Prefixed);
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn bool_wire_form() {
        assert_eq!(encode_bool(true), "1");
        assert_eq!(encode_bool(false), "0");
        assert!(decode_bool("1"));
        assert!(!decode_bool("0"));
        assert!(!decode_bool("on"));
    }
}
