use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::pet::PetState;

/// Directory holding `config.json` and the animation assets, relative to the
/// working directory.
pub const ASSETS_DIR: &str = "images";
/// Config file name inside [`ASSETS_DIR`].
pub const CONFIG_FILE: &str = "config.json";

/// Fatal configuration problems. Everything else degrades to defaults with a
/// warning.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no characters defined in {} - at least one is required", .0.display())]
    NoCharacters(PathBuf),
}

/// Tunable behavior parameters from the `settings` block.
///
/// Every key is optional; a missing one takes the default named next to its
/// field. Unknown keys are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Milliseconds each animation frame stays on screen.
    #[serde(default = "default_animation_speed")]
    pub animation_speed: u64,
    /// Wander speed in px per tick.
    #[serde(default = "default_movement_speed")]
    pub movement_speed: f32,
    /// Shortest delay before the next autonomous action, ms.
    #[serde(default = "default_action_interval_min")]
    pub action_interval_min: u64,
    /// Longest delay before the next autonomous action, ms.
    #[serde(default = "default_action_interval_max")]
    pub action_interval_max: u64,
    /// Cumulative pointer displacement that turns a click into a drag, px.
    #[serde(default = "default_drag_threshold")]
    pub drag_threshold: f32,
    /// Fall acceleration in px per tick per tick.
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    /// Remaining distance below which a fall snaps onto the edge, px.
    #[serde(default = "default_edge_snap_margin")]
    pub edge_snap_margin: f32,
    /// Reserved tunable; loaded for config compatibility, referenced by no
    /// current logic.
    #[serde(default = "default_snap_speed_threshold")]
    pub snap_speed_threshold: f32,
    /// Pointer stillness before the pet starts following it, ms.
    #[serde(default = "default_mouse_idle_time_before_action")]
    pub mouse_idle_time_before_action: u64,
    /// Pointer-follow speed in px per tick.
    #[serde(default = "default_mouse_follow_speed")]
    pub mouse_follow_speed: f32,
    /// Fall speed at the moment of release, px per tick (capped during
    /// integration).
    #[serde(default = "default_begin_fall_velocity")]
    pub begin_fall_velocity: f32,
    /// Distance from a screen edge within which a released pet falls, px.
    #[serde(default = "default_fall_zoom_size")]
    pub fall_zoom_size: f32,
}

fn default_animation_speed() -> u64 {
    120
}

fn default_movement_speed() -> f32 {
    3.0
}

fn default_action_interval_min() -> u64 {
    3000
}

fn default_action_interval_max() -> u64 {
    8000
}

fn default_drag_threshold() -> f32 {
    5.0
}

fn default_gravity() -> f32 {
    2.0
}

fn default_edge_snap_margin() -> f32 {
    5.0
}

fn default_snap_speed_threshold() -> f32 {
    8.0
}

fn default_mouse_idle_time_before_action() -> u64 {
    30_000
}

fn default_mouse_follow_speed() -> f32 {
    5.0
}

fn default_begin_fall_velocity() -> f32 {
    200.0
}

fn default_fall_zoom_size() -> f32 {
    150.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            animation_speed: default_animation_speed(),
            movement_speed: default_movement_speed(),
            action_interval_min: default_action_interval_min(),
            action_interval_max: default_action_interval_max(),
            drag_threshold: default_drag_threshold(),
            gravity: default_gravity(),
            edge_snap_margin: default_edge_snap_margin(),
            snap_speed_threshold: default_snap_speed_threshold(),
            mouse_idle_time_before_action: default_mouse_idle_time_before_action(),
            mouse_follow_speed: default_mouse_follow_speed(),
            begin_fall_velocity: default_begin_fall_velocity(),
            fall_zoom_size: default_fall_zoom_size(),
        }
    }
}

/// One selectable character: a name plus its per-state animation table.
#[derive(Debug, Clone)]
pub struct Character {
    pub name: String,
    assets: [Option<PathBuf>; PetState::ALL.len()],
}

impl Character {
    /// The animation mapped to `state`, if the config provides one.
    pub fn asset_for(&self, state: PetState) -> Option<&Path> {
        self.assets[state as usize].as_deref()
    }
}

/// Every character from the config, in file order. Built once at startup and
/// never mutated; switching characters only changes which entry is active.
#[derive(Debug, Clone)]
pub struct CharacterCatalog {
    characters: Vec<Character>,
}

impl CharacterCatalog {
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Character> {
        self.characters.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.characters.iter().position(|c| c.name == name)
    }

    /// Character names in file order, for the context menu.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.characters.iter().map(|c| c.name.as_str())
    }

    /// Build the catalog from the `characters` value. State keys are
    /// lower-cased; unknown states and malformed entries are warned about and
    /// skipped. Asset paths are resolved under `assets_dir`.
    fn parse(block: Option<&serde_json::Value>, assets_dir: &Path) -> Self {
        let mut characters = Vec::new();
        let Some(map) = block.and_then(|v| v.as_object()) else {
            return Self { characters };
        };
        for (name, states) in map {
            let Some(states) = states.as_object() else {
                log::warn!("character {name:?} is not a state table, skipping it");
                continue;
            };
            let mut assets: [Option<PathBuf>; PetState::ALL.len()] = Default::default();
            for (key, value) in states {
                let Some(state) = PetState::from_key(&key.to_lowercase()) else {
                    log::warn!("character {name:?} maps unknown state {key:?}, skipping it");
                    continue;
                };
                let Some(rel) = value.as_str() else {
                    log::warn!("character {name:?} state {key:?} is not a path, skipping it");
                    continue;
                };
                assets[state as usize] = Some(assets_dir.join(rel));
            }
            characters.push(Character {
                name: name.clone(),
                assets,
            });
        }
        Self { characters }
    }
}

/// Everything loaded at startup: settings plus the character catalog.
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub catalog: CharacterCatalog,
}

impl Config {
    /// Load `assets_dir/config.json`. A missing or unreadable file leaves
    /// the settings at their defaults; an empty character catalog is fatal.
    pub fn load(assets_dir: &Path) -> Result<Self, ConfigError> {
        let path = assets_dir.join(CONFIG_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("could not read {}: {e}", path.display());
                None
            }
        };
        let config = Self::parse(text.as_deref(), assets_dir, &path)?;
        log::info!(
            "loaded {} character(s) from {}",
            config.catalog.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse config text (`path` is only used in messages). The `settings`
    /// and `characters` sections are isolated: a malformed one never takes
    /// the other down.
    pub(crate) fn parse(
        text: Option<&str>,
        assets_dir: &Path,
        path: &Path,
    ) -> Result<Self, ConfigError> {
        let root: serde_json::Value = match text.map(serde_json::from_str) {
            Some(Ok(value)) => value,
            Some(Err(e)) => {
                log::warn!("malformed {}: {e}", path.display());
                serde_json::Value::Null
            }
            None => serde_json::Value::Null,
        };

        let settings = match root.get("settings") {
            Some(block) => match serde_json::from_value(block.clone()) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("bad settings block in {}: {e}", path.display());
                    Settings::default()
                }
            },
            None => Settings::default(),
        };

        let catalog = CharacterCatalog::parse(root.get("characters"), assets_dir);
        if catalog.is_empty() {
            return Err(ConfigError::NoCharacters(path.to_path_buf()));
        }

        Ok(Self { settings, catalog })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Config, ConfigError> {
        Config::parse(
            Some(text),
            Path::new("images"),
            Path::new("images/config.json"),
        )
    }

    const ONE_CHARACTER: &str = r#"{"characters": {"mimi": {"idle": "mimi/idle.gif"}}}"#;

    #[test]
    fn missing_file_is_fatal() {
        let result = Config::parse(None, Path::new("images"), Path::new("images/config.json"));
        assert!(matches!(result, Err(ConfigError::NoCharacters(_))));
    }

    #[test]
    fn empty_catalog_is_fatal() {
        assert!(parse(r#"{"characters": {}}"#).is_err());
        assert!(parse(r#"{"settings": {"gravity": 4}}"#).is_err());
    }

    #[test]
    fn settings_fall_back_per_key() {
        let config = parse(
            r#"{
                "settings": {"movement_speed": 7, "action_interval_min": 100},
                "characters": {"mimi": {"idle": "mimi/idle.gif"}}
            }"#,
        )
        .unwrap();
        assert_eq!(config.settings.movement_speed, 7.0);
        assert_eq!(config.settings.action_interval_min, 100);
        // untouched keys keep their defaults
        assert_eq!(config.settings.animation_speed, 120);
        assert_eq!(config.settings.fall_zoom_size, 150.0);
    }

    #[test]
    fn unknown_settings_keys_are_ignored() {
        let config = parse(
            r#"{
                "settings": {"warp_factor": 9, "gravity": 3},
                "characters": {"mimi": {"idle": "mimi/idle.gif"}}
            }"#,
        )
        .unwrap();
        assert_eq!(config.settings.gravity, 3.0);
    }

    #[test]
    fn malformed_settings_block_keeps_the_catalog() {
        let config = parse(r#"{"settings": "fast", "characters": {"mimi": {"idle": "a.gif"}}}"#)
            .unwrap();
        assert_eq!(config.settings.movement_speed, 3.0);
        assert_eq!(config.catalog.len(), 1);
    }

    #[test]
    fn malformed_file_reports_the_missing_catalog() {
        assert!(parse("not json {").is_err());
    }

    #[test]
    fn state_keys_are_lower_cased() {
        let config = parse(
            r#"{"characters": {"mimi": {"Idle": "a.gif", "BYEBYE": "b.gif"}}}"#,
        )
        .unwrap();
        let mimi = config.catalog.get(0).unwrap();
        assert_eq!(
            mimi.asset_for(PetState::Idle),
            Some(Path::new("images/a.gif"))
        );
        assert_eq!(
            mimi.asset_for(PetState::ByeBye),
            Some(Path::new("images/b.gif"))
        );
    }

    #[test]
    fn unknown_state_names_are_skipped() {
        let config = parse(
            r#"{"characters": {"mimi": {"idle": "a.gif", "dancing": "x.gif"}}}"#,
        )
        .unwrap();
        let mimi = config.catalog.get(0).unwrap();
        let mapped: Vec<_> = PetState::ALL
            .into_iter()
            .filter(|s| mimi.asset_for(*s).is_some())
            .collect();
        assert_eq!(mapped, vec![PetState::Idle]);
    }

    #[test]
    fn character_order_matches_the_file() {
        let config = parse(
            r#"{"characters": {
                "zeta": {"idle": "z.gif"},
                "alpha": {"idle": "a.gif"}
            }}"#,
        )
        .unwrap();
        let names: Vec<_> = config.catalog.names().collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(config.catalog.index_of("alpha"), Some(1));
        assert_eq!(config.catalog.index_of("ghost"), None);
    }

    #[test]
    fn asset_paths_resolve_under_the_assets_dir() {
        let config = parse(ONE_CHARACTER).unwrap();
        let mimi = config.catalog.get(0).unwrap();
        assert_eq!(
            mimi.asset_for(PetState::Idle),
            Some(Path::new("images/mimi/idle.gif"))
        );
        assert_eq!(mimi.asset_for(PetState::Sleeping), None);
    }
}
