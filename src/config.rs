use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use reqwest::Url;
use serde::de::Deserializer;
use serde::Deserialize;

use crate::birthdays::DEFAULT_LOOKAHEAD_DAYS;
use crate::helper::HelperAction;
use crate::loader::DEFAULT_CANDIDATES;
use crate::logging;
use crate::view::NOTE_PREVIEW_CHARS;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "abview";

#[derive(Debug, Clone)]
pub struct Config {
    /// Where the configuration was read from, if a file existed.
    pub config_path: Option<PathBuf>,
    pub base_dir: PathBuf,
    pub remote_base: Option<Url>,
    pub candidates: Vec<String>,
    pub birthday_lookahead_days: u32,
    pub note_preview_chars: usize,
    pub log: LogConfig,
    pub keys: Keys,
    pub top_bar: TopBarConfig,
    pub ui: UiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: None,
            base_dir: PathBuf::from("."),
            remote_base: None,
            candidates: default_candidates(),
            birthday_lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            note_preview_chars: NOTE_PREVIEW_CHARS,
            log: LogConfig::default(),
            keys: Keys::default(),
            top_bar: TopBarConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    /// `None` means the platform data directory.
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: logging::default_log_level().to_string(),
            dir: None,
        }
    }
}

/// Expand ~ to home directory in paths
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

fn default_candidates() -> Vec<String> {
    DEFAULT_CANDIDATES.iter().map(|c| c.to_string()).collect()
}

// =============================================================================
// Top Bar Configuration
// =============================================================================

/// Actions available for top bar buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopBarAction {
    Add,
    Edit,
    Delete,
    Birthdays,
    Help,
}

impl TopBarAction {
    /// Display title for the button
    pub fn title(&self) -> &'static str {
        match self {
            TopBarAction::Add => "ADD",
            TopBarAction::Edit => "EDIT",
            TopBarAction::Delete => "DELETE",
            TopBarAction::Birthdays => "BIRTHDAYS",
            TopBarAction::Help => "HELP",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Some(TopBarAction::Add),
            "edit" => Some(TopBarAction::Edit),
            "delete" => Some(TopBarAction::Delete),
            "birthdays" => Some(TopBarAction::Birthdays),
            "help" => Some(TopBarAction::Help),
            _ => None,
        }
    }

    /// The helper-modal action this button opens, if any.
    pub fn helper_action(&self) -> Option<HelperAction> {
        match self {
            TopBarAction::Add => Some(HelperAction::Add),
            TopBarAction::Edit => Some(HelperAction::Edit),
            TopBarAction::Delete => Some(HelperAction::Delete),
            TopBarAction::Birthdays | TopBarAction::Help => None,
        }
    }
}

/// A single top bar button
#[derive(Debug, Clone)]
pub struct TopBarButton {
    pub key: String,
    pub action: TopBarAction,
}

impl TopBarButton {
    /// Get the function key number (1-12) or None if invalid
    pub fn function_key_number(&self) -> Option<u8> {
        parse_function_key(&self.key)
    }
}

fn parse_function_key(key: &str) -> Option<u8> {
    let upper = key.trim().to_ascii_uppercase();
    upper
        .strip_prefix('F')
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| (1..=12).contains(n))
}

#[derive(Debug, Clone)]
pub struct TopBarConfig {
    pub buttons: Vec<TopBarButton>,
}

impl Default for TopBarConfig {
    fn default() -> Self {
        Self {
            buttons: vec![
                TopBarButton { key: "F1".into(), action: TopBarAction::Help },
                TopBarButton { key: "F2".into(), action: TopBarAction::Add },
                TopBarButton { key: "F3".into(), action: TopBarAction::Edit },
                TopBarButton { key: "F4".into(), action: TopBarAction::Delete },
                TopBarButton { key: "F5".into(), action: TopBarAction::Birthdays },
            ],
        }
    }
}

// =============================================================================
// UI Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub colors: UiColors,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiFile::default().into()
    }
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub separator: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
    pub badge_fg: RgbColor,
    pub badge_bg: RgbColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl<'de> serde::Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Array([u8; 3]),
            Map { r: u8, g: u8, b: u8 },
        }

        let helper = Helper::deserialize(deserializer)?;
        let (r, g, b) = match helper {
            Helper::Array(values) => (values[0], values[1], values[2]),
            Helper::Map { r, g, b } => (r, g, b),
        };
        Ok(RgbColor { r, g, b })
    }
}

// =============================================================================
// Key Bindings - Context-aware with multiple bindings per action
// =============================================================================

/// All key bindings organized by context
#[derive(Debug, Clone, Default)]
pub struct Keys {
    /// Global keys (work outside the search line and modals)
    pub global: GlobalKeys,
    /// Keys while typing in the search line
    pub search: SearchKeys,
    /// Keys for moving through the contact table
    pub table: TableKeys,
    /// Keys for modal dialogs
    pub modal: ModalKeys,
}

#[derive(Debug, Clone)]
pub struct GlobalKeys {
    pub quit: Vec<String>,
    pub search: Vec<String>,
    pub help: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SearchKeys {
    pub cancel: Vec<String>,
    pub confirm: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TableKeys {
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub page_down: Vec<String>,
    pub page_up: Vec<String>,
    pub edit: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ModalKeys {
    pub cancel: Vec<String>,
    pub next: Vec<String>,
    pub prev: Vec<String>,
}

impl Default for GlobalKeys {
    fn default() -> Self {
        Self {
            quit: vec!["q".into()],
            search: vec!["/".into()],
            help: vec!["?".into()],
        }
    }
}

impl Default for SearchKeys {
    fn default() -> Self {
        Self {
            cancel: vec!["Escape".into()],
            confirm: vec!["Enter".into(), "Down".into()],
        }
    }
}

impl Default for TableKeys {
    fn default() -> Self {
        Self {
            next: vec!["j".into(), "Down".into()],
            prev: vec!["k".into(), "Up".into()],
            page_down: vec!["PageDown".into()],
            page_up: vec!["PageUp".into()],
            edit: vec!["e".into(), "Enter".into()],
        }
    }
}

impl Default for ModalKeys {
    fn default() -> Self {
        Self {
            cancel: vec!["Escape".into(), "q".into()],
            next: vec!["j".into(), "Down".into()],
            prev: vec!["k".into(), "Up".into()],
        }
    }
}

// =============================================================================
// Serde deserialization types (support both single string and array)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyBinding {
    Single(String),
    Multiple(Vec<String>),
}

impl KeyBinding {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeyBinding::Single(s) => vec![s],
            KeyBinding::Multiple(v) => v,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct KeysFile {
    global: GlobalKeysFile,
    search: SearchKeysFile,
    table: TableKeysFile,
    modal: ModalKeysFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GlobalKeysFile {
    quit: KeyBinding,
    search: KeyBinding,
    help: KeyBinding,
}

impl Default for GlobalKeysFile {
    fn default() -> Self {
        let defaults = GlobalKeys::default();
        Self {
            quit: KeyBinding::Multiple(defaults.quit),
            search: KeyBinding::Multiple(defaults.search),
            help: KeyBinding::Multiple(defaults.help),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SearchKeysFile {
    cancel: KeyBinding,
    confirm: KeyBinding,
}

impl Default for SearchKeysFile {
    fn default() -> Self {
        let defaults = SearchKeys::default();
        Self {
            cancel: KeyBinding::Multiple(defaults.cancel),
            confirm: KeyBinding::Multiple(defaults.confirm),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TableKeysFile {
    next: KeyBinding,
    prev: KeyBinding,
    page_down: KeyBinding,
    page_up: KeyBinding,
    edit: KeyBinding,
}

impl Default for TableKeysFile {
    fn default() -> Self {
        let defaults = TableKeys::default();
        Self {
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            page_down: KeyBinding::Multiple(defaults.page_down),
            page_up: KeyBinding::Multiple(defaults.page_up),
            edit: KeyBinding::Multiple(defaults.edit),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ModalKeysFile {
    cancel: KeyBinding,
    next: KeyBinding,
    prev: KeyBinding,
}

impl Default for ModalKeysFile {
    fn default() -> Self {
        let defaults = ModalKeys::default();
        Self {
            cancel: KeyBinding::Multiple(defaults.cancel),
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
        }
    }
}

impl From<KeysFile> for Keys {
    fn from(file: KeysFile) -> Self {
        Self {
            global: GlobalKeys {
                quit: file.global.quit.into_vec(),
                search: file.global.search.into_vec(),
                help: file.global.help.into_vec(),
            },
            search: SearchKeys {
                cancel: file.search.cancel.into_vec(),
                confirm: file.search.confirm.into_vec(),
            },
            table: TableKeys {
                next: file.table.next.into_vec(),
                prev: file.table.prev.into_vec(),
                page_down: file.table.page_down.into_vec(),
                page_up: file.table.page_up.into_vec(),
                edit: file.table.edit.into_vec(),
            },
            modal: ModalKeys {
                cancel: file.modal.cancel.into_vec(),
                next: file.modal.next.into_vec(),
                prev: file.modal.prev.into_vec(),
            },
        }
    }
}

// =============================================================================
// Key binding validation
// =============================================================================

/// Normalize a key binding string to a canonical form for collision detection.
/// Single characters preserve case (since 'M' means Shift+m, different from 'm').
/// Multi-character key names are case-insensitive (Enter, ENTER, enter are the same).
fn normalize_binding(binding: &str) -> String {
    let trimmed = binding.trim();
    if trimmed.chars().count() == 1 {
        trimmed.to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Check for collisions within a single context
fn check_context_collisions(bindings: &[(&str, &[String])], context_name: &str) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();

    for (action_name, keys) in bindings {
        for key in *keys {
            let normalized = normalize_binding(key);
            if normalized.is_empty() {
                continue;
            }
            if let Some(existing_action) = seen.get(&normalized) {
                bail!(
                    "key binding collision in [keys.{}]: '{}' is bound to both '{}' and '{}'",
                    context_name,
                    key,
                    existing_action,
                    action_name
                );
            }
            seen.insert(normalized, action_name);
        }
    }

    Ok(())
}

/// Validate all key bindings for collisions within each context.
/// Global and table keys are live at the same time, so they share one context.
fn validate_key_bindings(keys: &Keys) -> Result<()> {
    check_context_collisions(
        &[
            ("quit", &keys.global.quit),
            ("search", &keys.global.search),
            ("help", &keys.global.help),
            ("next", &keys.table.next),
            ("prev", &keys.table.prev),
            ("page_down", &keys.table.page_down),
            ("page_up", &keys.table.page_up),
            ("edit", &keys.table.edit),
        ],
        "table",
    )?;

    check_context_collisions(
        &[
            ("cancel", &keys.search.cancel),
            ("confirm", &keys.search.confirm),
        ],
        "search",
    )?;

    check_context_collisions(
        &[
            ("cancel", &keys.modal.cancel),
            ("next", &keys.modal.next),
            ("prev", &keys.modal.prev),
        ],
        "modal",
    )?;

    Ok(())
}

// =============================================================================
// Config file structure
// =============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    base_dir: Option<PathBuf>,
    remote_base: Option<String>,
    candidates: Option<Vec<String>>,
    birthday_lookahead_days: Option<u32>,
    note_preview_chars: Option<usize>,
    log: LogFile,
    keys: KeysFile,
    top_bar: TopBarFile,
    ui: UiFile,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct LogFile {
    level: Option<String>,
    dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TopBarFile {
    #[serde(flatten)]
    buttons: HashMap<String, String>,
}

impl From<TopBarFile> for TopBarConfig {
    fn from(file: TopBarFile) -> Self {
        if file.buttons.is_empty() {
            return TopBarConfig::default();
        }

        let mut buttons: Vec<TopBarButton> = Vec::new();

        for (key, action_str) in file.buttons {
            if parse_function_key(&key).is_none() {
                eprintln!("warning: invalid top_bar key '{}', expected F1-F12", key);
                continue;
            }

            let Some(action) = TopBarAction::from_str(&action_str) else {
                eprintln!(
                    "warning: invalid top_bar action '{}' for key '{}', expected one of: add, edit, delete, birthdays, help",
                    action_str, key
                );
                continue;
            };

            buttons.push(TopBarButton {
                key: key.trim().to_ascii_uppercase(),
                action,
            });
        }

        buttons.sort_by_key(|b| b.function_key_number().unwrap_or(0));

        if buttons.is_empty() {
            TopBarConfig::default()
        } else {
            TopBarConfig { buttons }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct UiFile {
    colors: UiColorsFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiColorsFile {
    border: RgbColor,
    selection_bg: RgbColor,
    selection_fg: RgbColor,
    separator: RgbColor,
    status_fg: RgbColor,
    status_bg: RgbColor,
    badge_fg: RgbColor,
    badge_bg: RgbColor,
}

impl Default for UiColorsFile {
    fn default() -> Self {
        Self {
            border: RgbColor::new(255, 165, 0),
            selection_bg: RgbColor::new(255, 165, 0),
            selection_fg: RgbColor::new(0, 0, 0),
            separator: RgbColor::new(255, 165, 0),
            status_fg: RgbColor::new(255, 165, 0),
            status_bg: RgbColor::new(0, 0, 0),
            badge_fg: RgbColor::new(0, 0, 0),
            badge_bg: RgbColor::new(135, 175, 255),
        }
    }
}

impl From<UiFile> for UiConfig {
    fn from(file: UiFile) -> Self {
        Self {
            colors: UiColors {
                border: file.colors.border,
                selection_bg: file.colors.selection_bg,
                selection_fg: file.colors.selection_fg,
                separator: file.colors.separator,
                status_fg: file.colors.status_fg,
                status_bg: file.colors.status_bg,
                badge_fg: file.colors.badge_fg,
                badge_bg: file.colors.badge_bg,
            },
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.config_dir().join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Default directory for rotating log files.
pub fn default_log_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.data_local_dir().join(APP_NAME).join("logs"))
}

/// Load configuration. An explicit path must exist; the default location is
/// optional and falls back to built-in defaults.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file not found at {}", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let path = config_path()?;
            if !path.exists() {
                return Ok(Config::default());
            }
            path
        }
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;
    let mut config = parse(&raw).with_context(|| format!("invalid configuration in {}", path.display()))?;
    config.config_path = Some(path);
    Ok(config)
}

/// Parse configuration text. Unknown keys are reported, not rejected.
pub fn parse(raw: &str) -> Result<Config> {
    let value: toml::Value = toml::from_str(raw).context("failed to parse configuration as TOML")?;

    for unknown in unknown_keys(&value) {
        eprintln!("warning: unknown configuration key `{}`", unknown);
    }

    let cfg_file: ConfigFile = value
        .try_into()
        .context("failed to deserialize configuration")?;

    let remote_base = cfg_file
        .remote_base
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(parse_remote_base)
        .transpose()?;

    let candidates = match cfg_file.candidates {
        Some(list) if !list.is_empty() => list,
        Some(_) => bail!("`candidates` must list at least one location"),
        None => default_candidates(),
    };

    let keys: Keys = cfg_file.keys.into();
    validate_key_bindings(&keys)?;

    let level = match cfg_file.log.level {
        Some(level) => logging::normalize_level(&level)?.to_string(),
        None => logging::default_log_level().to_string(),
    };

    Ok(Config {
        config_path: None,
        base_dir: cfg_file
            .base_dir
            .map(|p| expand_tilde(&p))
            .unwrap_or_else(|| PathBuf::from(".")),
        remote_base,
        candidates,
        birthday_lookahead_days: cfg_file
            .birthday_lookahead_days
            .unwrap_or(DEFAULT_LOOKAHEAD_DAYS),
        note_preview_chars: cfg_file
            .note_preview_chars
            .filter(|n| *n > 0)
            .unwrap_or(NOTE_PREVIEW_CHARS),
        log: LogConfig {
            level,
            dir: cfg_file.log.dir.map(|p| expand_tilde(&p)),
        },
        keys,
        top_bar: cfg_file.top_bar.into(),
        ui: cfg_file.ui.into(),
    })
}

/// Relative candidates are joined onto the base, so it must end in a slash to
/// act as a directory.
fn parse_remote_base(raw: &str) -> Result<Url> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    let url = Url::parse(&with_slash).with_context(|| format!("invalid remote_base `{}`", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("remote_base must be an http(s) URL, got `{}`", raw);
    }
    Ok(url)
}

// =============================================================================
// Unknown key warnings
// =============================================================================

const KNOWN_TOP_LEVEL: &[&str] = &[
    "base_dir",
    "remote_base",
    "candidates",
    "birthday_lookahead_days",
    "note_preview_chars",
    "log",
    "keys",
    "top_bar",
    "ui",
];

/// Dotted paths of entries the configuration does not understand.
fn unknown_keys(value: &toml::Value) -> Vec<String> {
    let mut unknown = Vec::new();
    let Some(table) = value.as_table() else {
        return unknown;
    };

    for (key, entry) in table {
        if !KNOWN_TOP_LEVEL.contains(&key.as_str()) {
            unknown.push(key.clone());
            continue;
        }
        match key.as_str() {
            "log" => collect_unknown(entry, "log", &["level", "dir"], &mut unknown),
            "keys" => {
                collect_unknown(entry, "keys", &["global", "search", "table", "modal"], &mut unknown);
                let contexts: [(&str, &[&str]); 4] = [
                    ("global", &["quit", "search", "help"]),
                    ("search", &["cancel", "confirm"]),
                    ("table", &["next", "prev", "page_down", "page_up", "edit"]),
                    ("modal", &["cancel", "next", "prev"]),
                ];
                for (context, known) in contexts {
                    if let Some(section) = entry.get(context) {
                        collect_unknown(section, &format!("keys.{}", context), known, &mut unknown);
                    }
                }
            }
            "ui" => {
                collect_unknown(entry, "ui", &["colors"], &mut unknown);
                if let Some(colors) = entry.get("colors") {
                    collect_unknown(
                        colors,
                        "ui.colors",
                        &[
                            "border",
                            "selection_bg",
                            "selection_fg",
                            "separator",
                            "status_fg",
                            "status_bg",
                            "badge_fg",
                            "badge_bg",
                        ],
                        &mut unknown,
                    );
                }
            }
            _ => {}
        }
    }

    unknown
}

fn collect_unknown(value: &toml::Value, context: &str, known: &[&str], out: &mut Vec<String>) {
    let Some(table) = value.as_table() else {
        return;
    };
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            out.push(format!("{}.{}", context, key));
        }
    }
}
