pub mod map;
pub mod store;
pub mod sync;

pub use map::{DefaultKeys, KeyResolver, SYNCED_SETTINGS, SettingDef, SettingEntry, SettingMap};
pub use store::{MemoryStore, SettingsStore, StoredValue};
pub use sync::{SettingsRemote, SyncDirection, pull, push, synchronize};
