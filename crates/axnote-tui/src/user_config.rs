//! User configuration.
//!
//! Persisted settings load from `~/.config/axnote/config.toml` with
//! `AXNOTE_*` environment variables layered on top; everything has a serde
//! default so a missing or partial file is fine. Keybinding overrides are
//! descriptor strings (`"control shift x"`) resolved against the standard
//! keymap at startup, so a bad descriptor fails configuration rather than a
//! live key press.

use std::collections::BTreeMap;

use axnote_core::{CellAction, DocumentAction, Keymap, KeymapError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub kernel: KernelConfig,
    #[serde(default)]
    pub keys: KeyOverrides,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KernelConfig {
    /// Prefix of the execution service, e.g. `http://127.0.0.1:8090/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Start the kernel as soon as the app launches.
    #[serde(default = "default_autostart")]
    pub autostart: bool,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8090/api".to_string()
}

fn default_autostart() -> bool {
    true
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            base_url: default_base_url(),
            autostart: default_autostart(),
        }
    }
}

/// Action-name → chord-descriptor overrides, one table per scope.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct KeyOverrides {
    #[serde(default)]
    pub cell: BTreeMap<String, String>,
    #[serde(default)]
    pub document: BTreeMap<String, String>,
}

impl KeyOverrides {
    pub fn apply(&self, keymap: &mut Keymap) -> Result<(), KeymapError> {
        for (name, descriptor) in &self.cell {
            let action = CellAction::from_name(name)
                .ok_or_else(|| KeymapError::UnknownAction(name.clone()))?;
            keymap.rebind_cell(action, descriptor.parse()?);
        }
        for (name, descriptor) in &self.document {
            let action = DocumentAction::from_name(name)
                .ok_or_else(|| KeymapError::UnknownAction(name.clone()))?;
            keymap.rebind_document(action, descriptor.parse()?);
        }
        Ok(())
    }
}

impl UserConfig {
    /// Layer the config file and environment over the defaults. A file that
    /// fails to deserialize falls back to defaults rather than blocking
    /// startup; the malformed value is logged.
    pub fn load() -> UserConfig {
        let file = dirs::config_dir()
            .map(|dir| dir.join("axnote/config.toml"))
            .unwrap_or_default();
        let built = config::Config::builder()
            .add_source(config::File::with_name(&file.to_string_lossy()).required(false))
            .add_source(config::Environment::with_prefix("AXNOTE").separator("_"))
            .build();
        match built.and_then(|settings| settings.try_deserialize::<UserConfig>()) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("falling back to default config: {err}");
                UserConfig::default()
            }
        }
    }

    /// The standard keymap with this config's overrides applied.
    pub fn keymap(&self) -> Result<Keymap, KeymapError> {
        let mut keymap = Keymap::standard();
        self.keys.apply(&mut keymap)?;
        Ok(keymap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axnote_core::{Key, KeyChord};

    #[test]
    fn overrides_rebind_actions() {
        let mut config = UserConfig::default();
        config
            .keys
            .cell
            .insert("execute".to_string(), "control r".to_string());
        let keymap = config.keymap().unwrap();
        assert_eq!(
            keymap.cell_action(&KeyChord::bare(Key::Char('r')).ctrl()),
            Some(CellAction::Execute)
        );
    }

    #[test]
    fn malformed_descriptors_fail_at_config_time() {
        let mut config = UserConfig::default();
        config
            .keys
            .cell
            .insert("execute".to_string(), "control ".to_string());
        assert!(matches!(
            config.keymap(),
            Err(KeymapError::InvalidKeyDescriptor(_))
        ));
    }

    #[test]
    fn unknown_action_names_are_rejected() {
        let mut config = UserConfig::default();
        config
            .keys
            .document
            .insert("frobnicate".to_string(), "alt f".to_string());
        assert!(matches!(
            config.keymap(),
            Err(KeymapError::UnknownAction(_))
        ));
    }
}
