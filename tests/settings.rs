use std::fs;
use tempfile::tempdir;
use titlebar_tabs::render::{SkinKind, SkinProfile};
use titlebar_tabs::window::ThemeMode;
use titlebar_tabs::TabStripSettings;

#[test]
fn missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let settings = TabStripSettings::load(dir.path().join("absent.json")).unwrap();
    assert_eq!(settings, TabStripSettings::default());
    assert_eq!(settings.tear_distance, 10);
    assert!(settings.show_add_button);
}

#[test]
fn saved_settings_load_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tabs.json");
    let settings = TabStripSettings {
        tear_distance: 24,
        show_add_button: false,
        skin: SkinKind::Classic,
        theme_override: Some(ThemeMode::Basic),
        double_click_interval_ms: Some(350),
        ..TabStripSettings::default()
    };
    settings.save(&path).unwrap();
    assert_eq!(TabStripSettings::load(&path).unwrap(), settings);
}

#[test]
fn partial_file_fills_in_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tabs.json");
    fs::write(&path, r#"{ "tear_distance": 3 }"#).unwrap();
    let settings = TabStripSettings::load(&path).unwrap();
    assert_eq!(settings.tear_distance, 3);
    assert_eq!(settings.skin, SkinKind::Chrome);
    assert!((settings.thumbnail_opacity - 0.7).abs() < f32::EPSILON);
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tabs.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(TabStripSettings::load(&path).is_err());
}

#[test]
fn skin_dir_replaces_images() {
    let dir = tempdir().unwrap();
    image::RgbaImage::from_pixel(30, 20, image::Rgba([10, 20, 30, 255]))
        .save(dir.path().join("add_button.png"))
        .unwrap();
    let settings = TabStripSettings {
        skin_dir: Some(dir.path().to_path_buf()),
        ..TabStripSettings::default()
    };
    let skin = settings.build_skin().unwrap();
    let add = skin.images().add_button.clone().unwrap();
    assert_eq!((add.width(), add.height()), (30, 20));
    assert_eq!(skin.images().add_button_hover.clone().unwrap().width(), 28);
}
