//! Reconciles the local store with the camera's settings.
//!
//! Both directions are best-effort: every key is attempted and failures
//! only flip the aggregate result.

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::X7Error;
use crate::settings::map::{SettingEntry, SettingMap, decode_bool, encode_bool};
use crate::settings::store::SettingsStore;

/// Access to the camera's key/value settings.
#[async_trait]
pub trait SettingsRemote: Send + Sync {
    async fn get_setting(&self, key: &str) -> Result<String, X7Error>;

    /// Set one value inside a setting bracket. Fails if the camera
    /// rejects it or does not echo the new value.
    async fn set_setting(&self, key: &str, value: &str) -> Result<(), X7Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Camera → local store.
    Pull,
    /// Local store → camera.
    Push,
}

/// Run the sync the store asks for: push if an update is pending, pull otherwise.
///
/// The pending flag is cleared after a push whatever its outcome.
pub async fn synchronize(
    map: &SettingMap,
    remote: &dyn SettingsRemote,
    store: &dyn SettingsStore,
) -> Result<SyncDirection, X7Error> {
    if store.pending_update() {
        let ok = push(map, remote, store).await;
        store.set_pending_update(false);
        if !ok {
            return Err(X7Error::Connection("failed to synchronize settings".into()));
        }
        Ok(SyncDirection::Push)
    } else if pull(map, remote, store).await {
        Ok(SyncDirection::Pull)
    } else {
        Err(X7Error::Connection("failed to initialize settings".into()))
    }
}

/// Copy every camera value into the store.
pub async fn pull(map: &SettingMap, remote: &dyn SettingsRemote, store: &dyn SettingsStore) -> bool {
    info!("initializing local settings from camera");
    let mut ok = true;
    for entry in map.entries() {
        match remote.get_setting(entry.camera_key).await {
            Ok(value) => write_local(store, entry, &value),
            Err(e) => {
                error!("failed to get setting '{}' from camera: {e}", entry.camera_key);
                ok = false;
            }
        }
    }
    ok
}

/// Send every local value that differs from the camera's.
///
/// A rejected value is replaced in the store by the camera's current one.
pub async fn push(map: &SettingMap, remote: &dyn SettingsRemote, store: &dyn SettingsStore) -> bool {
    info!("syncing local settings to camera");
    let mut ok = true;
    for entry in map.entries() {
        let camera_value = match remote.get_setting(entry.camera_key).await {
            Ok(value) => value,
            Err(e) => {
                error!("failed to get setting '{}' from camera: {e}", entry.camera_key);
                ok = false;
                continue;
            }
        };

        if matches_local(store, entry, &camera_value) {
            continue;
        }

        let local_value = read_local(store, entry);
        info!("update setting: {}={local_value}", entry.camera_key);
        if let Err(e) = remote.set_setting(entry.camera_key, &local_value).await {
            error!("failed to set setting '{}' on camera: {e}", entry.camera_key);
            ok = false;
            write_local(store, entry, &camera_value);
        }
    }
    ok
}

/// Booleans compare decoded, so any camera text other than `"1"` equals a
/// local `false`.
fn matches_local(store: &dyn SettingsStore, entry: &SettingEntry, camera_value: &str) -> bool {
    if entry.is_bool {
        store.get_bool(&entry.local_key).unwrap_or(false) == decode_bool(camera_value)
    } else {
        store.get_string(&entry.local_key).unwrap_or_default() == camera_value
    }
}

/// Local value in wire form. Missing keys read as `""` / `"0"`.
fn read_local(store: &dyn SettingsStore, entry: &SettingEntry) -> String {
    if entry.is_bool {
        encode_bool(store.get_bool(&entry.local_key).unwrap_or(false)).to_string()
    } else {
        store.get_string(&entry.local_key).unwrap_or_default()
    }
}

fn write_local(store: &dyn SettingsStore, entry: &SettingEntry, wire_value: &str) {
    if entry.is_bool {
        store.set_bool(&entry.local_key, decode_bool(wire_value));
    } else {
        store.set_string(&entry.local_key, wire_value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::map::DefaultKeys;
    use crate::settings::store::MemoryStore;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// Camera double: a value table, keys that fail to read, keys that reject writes.
    #[derive(Default)]
    struct FakeCamera {
        values: Mutex<HashMap<String, String>>,
        unreadable: HashSet<&'static str>,
        read_only: HashSet<&'static str>,
        writes: Mutex<Vec<(String, String)>>,
    }

    impl FakeCamera {
        fn with_defaults() -> Self {
            let values = SettingMap::build(&DefaultKeys)
                .entries()
                .iter()
                .map(|e| {
                    let v = if e.is_bool { "0" } else { "1" };
                    (e.camera_key.to_string(), v.to_string())
                })
                .collect();
            Self {
                values: Mutex::new(values),
                ..Default::default()
            }
        }

        fn value(&self, key: &str) -> String {
            self.values.lock().unwrap()[key].clone()
        }
    }

    #[async_trait]
    impl SettingsRemote for FakeCamera {
        async fn get_setting(&self, key: &str) -> Result<String, X7Error> {
            if self.unreadable.contains(key) {
                return Err(X7Error::Command(format!("get {key}: expected return value 0, got -1")));
            }
            Ok(self.value(key))
        }

        async fn set_setting(&self, key: &str, value: &str) -> Result<(), X7Error> {
            self.writes.lock().unwrap().push((key.into(), value.into()));
            if self.read_only.contains(key) {
                return Err(X7Error::Assertion("setting value was not applied"));
            }
            self.values.lock().unwrap().insert(key.into(), value.into());
            Ok(())
        }
    }

    fn map() -> SettingMap {
        SettingMap::build(&DefaultKeys)
    }

    #[tokio::test]
    async fn pull_writes_every_key() {
        let camera = FakeCamera::with_defaults();
        camera.values.lock().unwrap().insert("led".into(), "1".into());
        let store = MemoryStore::new();

        assert!(pull(&map(), &camera, &store).await);
        assert_eq!(store.snapshot().len(), 17);
        assert_eq!(store.get_bool("system_led"), Some(true));
        assert_eq!(store.get_bool("system_buzzer"), Some(false));
        assert_eq!(store.get_string("video_resolution").as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn pull_attempts_all_keys_after_failure() {
        let camera = FakeCamera {
            unreadable: HashSet::from(["video_option"]),
            ..FakeCamera::with_defaults()
        };
        let store = MemoryStore::new();

        assert!(!pull(&map(), &camera, &store).await);
        assert_eq!(store.snapshot().len(), 16);
        assert!(store.get_string("video_mode").is_none());
    }

    #[tokio::test]
    async fn push_only_sends_differences() {
        let camera = FakeCamera::with_defaults();
        let store = MemoryStore::new();
        assert!(pull(&map(), &camera, &store).await);

        store.set_string("video_quality", "3");
        store.set_bool("system_led", true);
        assert!(push(&map(), &camera, &store).await);

        let writes = camera.writes.lock().unwrap().clone();
        assert_eq!(
            writes,
            vec![
                ("video_quality".to_string(), "3".to_string()),
                ("led".to_string(), "1".to_string()),
            ]
        );
        assert_eq!(camera.value("led"), "1");
    }

    #[tokio::test]
    async fn push_compares_booleans_by_meaning() {
        let camera = FakeCamera::with_defaults();
        camera.values.lock().unwrap().insert("led".into(), "off".into());
        camera.values.lock().unwrap().insert("buzzer".into(), "on".into());
        let store = MemoryStore::new();
        assert!(pull(&map(), &camera, &store).await);
        store.set_bool("system_buzzer", true);

        assert!(push(&map(), &camera, &store).await);

        let writes = camera.writes.lock().unwrap().clone();
        assert_eq!(writes, vec![("buzzer".to_string(), "1".to_string())]);
        assert_eq!(camera.value("led"), "off");
    }

    #[tokio::test]
    async fn rejected_set_reverts_local_value() {
        let camera = FakeCamera {
            read_only: HashSet::from(["fov", "aqua_mode"]),
            ..FakeCamera::with_defaults()
        };
        let store = MemoryStore::new();
        assert!(pull(&map(), &camera, &store).await);

        store.set_string("effects_fov", "2");
        store.set_bool("effects_aqua_mode", true);
        store.set_string("mic", "ignored");
        store.set_string("system_mic_volume", "4");

        assert!(!push(&map(), &camera, &store).await);
        assert_eq!(store.get_string("effects_fov").as_deref(), Some("1"));
        assert_eq!(store.get_bool("effects_aqua_mode"), Some(false));
        assert_eq!(store.get_string("system_mic_volume").as_deref(), Some("4"));
        assert_eq!(camera.value("mic"), "4");
    }

    #[tokio::test]
    async fn push_skips_unreadable_key() {
        let camera = FakeCamera {
            unreadable: HashSet::from(["led"]),
            ..FakeCamera::with_defaults()
        };
        let store = MemoryStore::new();
        store.set_bool("system_led", true);

        assert!(!push(&map(), &camera, &store).await);
        assert!(camera.writes.lock().unwrap().iter().all(|(k, _)| k != "led"));
        assert_eq!(store.get_bool("system_led"), Some(true));
    }

    #[tokio::test]
    async fn synchronize_honours_and_clears_pending_flag() {
        let camera = FakeCamera::with_defaults();
        let store = MemoryStore::new();
        assert_eq!(
            synchronize(&map(), &camera, &store).await.unwrap(),
            SyncDirection::Pull
        );

        store.set_pending_update(true);
        assert_eq!(
            synchronize(&map(), &camera, &store).await.unwrap(),
            SyncDirection::Push
        );
        assert!(!store.pending_update());
    }

    #[tokio::test]
    async fn failed_push_still_clears_flag() {
        let camera = FakeCamera {
            read_only: HashSet::from(["vout"]),
            ..FakeCamera::with_defaults()
        };
        let store = MemoryStore::new();
        store.set_string("system_tv_mode", "0");
        store.set_pending_update(true);

        let err = synchronize(&map(), &camera, &store).await.unwrap_err();
        assert!(matches!(err, X7Error::Connection(_)));
        assert!(!store.pending_update());
    }
}
