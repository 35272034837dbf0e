use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};

use crate::lines::LinePolicy;
use crate::stepper::RevealMode;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pdfpacer";

pub const MIN_LINES_PER_TICK: usize = 1;
pub const MAX_LINES_PER_TICK: usize = 10;
pub const MIN_DELAY_MS: u64 = 1000;
pub const MAX_DELAY_MS: u64 = 5000;
pub const DELAY_STEP_MS: u64 = 250;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_lines_per_tick")]
    pub lines_per_tick: usize,

    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    #[serde(default)]
    pub mode: RevealMode,

    #[serde(default)]
    pub line_policy: LinePolicy,

    /// Scale used when rendering pages to PNG
    #[serde(default = "default_export_scale")]
    pub export_scale: f32,

    #[serde(default = "default_autoscroll_interval_ms")]
    pub autoscroll_interval_ms: u64,

    #[serde(default = "default_xdotool")]
    pub xdotool_binary: String,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_lines_per_tick() -> usize {
    1
}

fn default_delay_ms() -> u64 {
    2000
}

fn default_export_scale() -> f32 {
    2.0
}

fn default_autoscroll_interval_ms() -> u64 {
    200
}

fn default_xdotool() -> String {
    "xdotool".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            lines_per_tick: default_lines_per_tick(),
            delay_ms: default_delay_ms(),
            mode: RevealMode::default(),
            line_policy: LinePolicy::default(),
            export_scale: default_export_scale(),
            autoscroll_interval_ms: default_autoscroll_interval_ms(),
            xdotool_binary: default_xdotool(),
        }
    }
}

impl Settings {
    /// Bring out-of-range values back into the ranges the UI offers
    pub fn sanitize(&mut self) {
        self.lines_per_tick = self
            .lines_per_tick
            .clamp(MIN_LINES_PER_TICK, MAX_LINES_PER_TICK);
        self.delay_ms = self.delay_ms.clamp(MIN_DELAY_MS, MAX_DELAY_MS);
        if !self.export_scale.is_finite() || self.export_scale <= 0.0 {
            self.export_scale = default_export_scale();
        }
        if self.autoscroll_interval_ms == 0 {
            self.autoscroll_interval_ms = default_autoscroll_interval_ms();
        }
    }
}

/// Human description of a tick delay; shorter delays read faster
pub fn speed_label(delay_ms: u64) -> &'static str {
    match delay_ms {
        0..=1500 => "Very Fast",
        1501..=2500 => "Fast",
        2501..=3500 => "Medium",
        3501..=4500 => "Slow",
        _ => "Very Slow",
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));
static CONFIG_PATH: RwLock<Option<PathBuf>> = RwLock::new(None);

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

pub fn load_settings() {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };
    if path.exists() {
        load_settings_from_path(&path);
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        if let Ok(settings) = SETTINGS.read() {
            save_settings_to_file(&settings, &path);
        }
    }
    remember_path(path);
}

pub fn load_settings_from_path(path: &Path) {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }
                settings.sanitize();

                if let Ok(mut global) = SETTINGS.write() {
                    *global = settings;
                }
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
        }
    }
    remember_path(path.to_path_buf());
}

fn remember_path(path: PathBuf) {
    if let Ok(mut slot) = CONFIG_PATH.write() {
        *slot = Some(path);
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

/// Persist the current settings to the file they were loaded from
pub fn save_settings() {
    let path = CONFIG_PATH.read().ok().and_then(|slot| slot.clone());
    let Some(path) = path else {
        debug!("No settings file loaded, not saving");
        return;
    };

    if let Ok(settings) = SETTINGS.read() {
        save_settings_to_file(&settings, &path);
    }
}

fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = generate_settings_yaml(settings);

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let policy = match settings.line_policy {
        LinePolicy::SkipBlank => "skip_blank",
        LinePolicy::KeepAll => "keep_all",
    };

    let mut content = String::new();
    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str("\n# Lines revealed per tick (1-10)\n");
    content.push_str(&format!("lines_per_tick: {}\n", settings.lines_per_tick));
    content.push_str("# Milliseconds between ticks (1000-5000)\n");
    content.push_str(&format!("delay_ms: {}\n", settings.delay_ms));
    content.push_str("# highlight | block | autoscroll\n");
    content.push_str(&format!("mode: {}\n", settings.mode.as_str()));
    content.push_str("# skip_blank drops empty lines, keep_all keeps them\n");
    content.push_str(&format!("line_policy: {policy}\n"));
    content.push_str(&format!("export_scale: {}\n", settings.export_scale));
    content.push_str(&format!(
        "autoscroll_interval_ms: {}\n",
        settings.autoscroll_interval_ms
    ));
    content.push_str(&format!("xdotool_binary: {}\n", yaml_scalar(&settings.xdotool_binary)));
    content
}

/// Quote `value` the way serde_yaml would, so backslashes and quotes survive
fn yaml_scalar(value: &str) -> String {
    match serde_yaml::to_string(value) {
        Ok(yaml) => yaml.trim_end().to_string(),
        Err(e) => {
            warn!("Failed to serialize {value:?}: {e}");
            format!("'{}'", value.replace('\'', "''"))
        }
    }
}

// Public API for accessing/modifying settings

pub fn current() -> Settings {
    SETTINGS.read().map(|s| s.clone()).unwrap_or_default()
}

pub fn set_lines_per_tick(lines: usize) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.lines_per_tick = lines.clamp(MIN_LINES_PER_TICK, MAX_LINES_PER_TICK);
    }
    save_settings();
}

pub fn set_delay_ms(delay_ms: u64) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.delay_ms = delay_ms.clamp(MIN_DELAY_MS, MAX_DELAY_MS);
    }
    save_settings();
}

pub fn set_mode(mode: RevealMode) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.mode = mode;
    }
    save_settings();
}
