// Store de réglages : persistance fichier, fusion, repli en mémoire

use std::path::PathBuf;

use benchwatch::settings::{
    deep_merge, defaults_for, FileStorage, SettingsKey, SettingsStore, Storage, StorageError,
    TableSettings, ViewMode,
};
use benchwatch::theme::Theme;
use serde_json::json;

fn temp_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("benchwatch-it-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir.join("nested").join("settings.json")
}

#[test]
fn settings_survive_a_restart() {
    let path = temp_path("restart");

    {
        let mut store = SettingsStore::open(&path);
        let mut table: TableSettings = store.load();
        table.price_decimals = 4;
        table.compact = true;
        store.store(&table);
        store.store(&Theme::Bloomberg);
        store.store(&ViewMode::Grid);
    }

    let mut store = SettingsStore::open(&path);
    let table: TableSettings = store.load();
    assert_eq!(table.price_decimals, 4);
    assert!(table.compact);
    // Les champs jamais modifiés gardent leur défaut
    assert_eq!(table.date_format, TableSettings::default().date_format);
    assert_eq!(store.load::<Theme>(), Theme::Bloomberg);
    assert_eq!(store.load::<ViewMode>(), ViewMode::Grid);
    assert!(!store.is_degraded());
}

#[test]
fn partial_stored_object_is_merged_with_defaults() {
    let path = temp_path("partial");
    let mut store = SettingsStore::open(&path);
    store.save(SettingsKey::TableSettings, &json!({"compact": true}));

    let merged = store.get(SettingsKey::TableSettings);
    let defaults = defaults_for(SettingsKey::TableSettings);
    for key in defaults.as_object().unwrap().keys() {
        assert!(merged.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(merged["compact"], json!(true));
}

#[test]
fn corrupted_file_falls_back_to_defaults() {
    let path = temp_path("corrupted");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{not json").unwrap();

    let mut store = SettingsStore::open(&path);
    let table: TableSettings = store.load();
    assert_eq!(table, TableSettings::default());

    // Le store reste utilisable, en mémoire
    store.store(&ViewMode::Grid);
    assert_eq!(store.load::<ViewMode>(), ViewMode::Grid);
    assert!(store.is_degraded());
}

#[test]
fn quota_is_enforced() {
    let path = temp_path("quota");
    let mut storage = FileStorage::new(&path).with_quota(16);
    let result = storage.set_item("table-settings", &"x".repeat(64));
    assert!(matches!(result, Err(StorageError::QuotaExceeded { .. })));
    assert_eq!(storage.get_item("table-settings").unwrap(), None);
}

#[test]
fn deep_merge_keeps_every_default_key() {
    let defaults = json!({
        "columns": {"name": true, "price": true, "unit": false},
        "sort": {"column": "name", "descending": false},
        "price_decimals": 2
    });
    let overrides = [
        json!({}),
        json!({"columns": {"unit": true}}),
        json!({"sort": {"descending": true}, "extra": 1}),
        json!({"price_decimals": 5, "columns": {}}),
    ];

    for over in overrides {
        let merged = deep_merge(&defaults, &over);
        for (key, value) in defaults.as_object().unwrap() {
            let got = &merged[key];
            if let Some(inner) = value.as_object() {
                for inner_key in inner.keys() {
                    assert!(got.get(inner_key).is_some(), "{}.{} lost", key, inner_key);
                }
            }
        }
        // Fusion idempotente
        assert_eq!(deep_merge(&merged, &over), merged);
    }
}
