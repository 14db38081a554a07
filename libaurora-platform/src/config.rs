use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Eq, PartialEq, smart_default::SmartDefault)]
pub enum WindowMode {
    #[default]
    Windowed,
    Fullscreen,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::EnumString, smart_default::SmartDefault)]
#[strum(serialize_all = "lowercase")]
pub enum AudioFormat {
    S8,
    U8,
    #[default]
    S16,
    U16,
    S32,
    F32,
}

/// The merged result of CLI flags, `ons.cfg`/`<script>.cfg` `key=value`
/// lines and `--env[KEY] VALUE` overrides (spec.md §6).
#[derive(Clone, Debug, smart_default::SmartDefault)]
pub struct Config {
    #[default(PathBuf::from("."))]
    pub root: PathBuf,
    pub save_dir: Option<PathBuf>,
    pub window_mode: WindowMode,
    pub window_width: Option<u32>,
    pub game_id: Option<String>,
    pub game_script: Option<PathBuf>,
    pub audio_driver: Option<String>,
    pub audio_buffer_kb: Option<u32>,
    pub audio_format: AudioFormat,
    pub ram_limit_mb: Option<u32>,
    pub show_fps: bool,
    pub force_fps: Option<u32>,
    pub debug_level: u8,
    pub check_file_case: bool,
    pub strict: bool,
    pub registry_file: Option<PathBuf>,
    pub dll_file: Option<PathBuf>,
    pub use_logfile: bool,
    #[default(100)]
    pub automode_time_ms: u32,
    #[default(0)]
    pub voicedelay_time_ms: u32,
    #[default(0)]
    pub voicewait_time_ms: u32,
    pub nsa_offset: Option<u32>,
    pub env: BTreeMap<String, String>,
}

impl Config {
    #[must_use]
    pub fn save_dir(&self) -> PathBuf {
        self.save_dir.clone().unwrap_or_else(|| self.root.clone())
    }

    /// Applies `key=value`/bare-flag lines from an `ons.cfg`-style config
    /// file on top of `self`, without touching anything the CLI already set
    /// (CLI wins; see `aurora`'s wiring order).
    pub fn apply_cfg_file(&mut self, text: &str) {
        for (key, value) in parse_cfg_lines(text) {
            if let Some(env_key) = key.strip_prefix("env[").and_then(|s| s.strip_suffix(']')) {
                self.env.insert(env_key.to_string(), value.unwrap_or_default());
                continue;
            }
            match key.as_str() {
                "strict" => self.strict = true,
                "check-file-case" => self.check_file_case = true,
                "use-logfile" => self.use_logfile = true,
                "show-fps" => self.show_fps = true,
                "fullscreen" => self.window_mode = WindowMode::Fullscreen,
                "window-width" => self.window_width = value.and_then(|v| v.parse().ok()),
                "gameid" => self.game_id = value,
                "ramlimit" => self.ram_limit_mb = value.and_then(|v| v.parse().ok()),
                "audiodriver" => self.audio_driver = value,
                "audiobuffer" => self.audio_buffer_kb = value.and_then(|v| v.parse().ok()),
                "automode-time" => if let Some(v) = value.and_then(|v| v.parse().ok()) { self.automode_time_ms = v },
                "voicedelay-time" => if let Some(v) = value.and_then(|v| v.parse().ok()) { self.voicedelay_time_ms = v },
                "voicewait-time" => if let Some(v) = value.and_then(|v| v.parse().ok()) { self.voicewait_time_ms = v },
                "nsa-offset" => self.nsa_offset = value.and_then(|v| v.parse().ok()),
                _ => {}
            }
        }
    }
}

/// Parses `key=value` and bare-flag lines, skipping blank lines and `;`/`#`
/// comments, matching spec.md §6's `ons.cfg`/`<script>.cfg` format.
fn parse_cfg_lines(text: &str) -> Vec<(String, Option<String>)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';') && !line.starts_with('#'))
        .map(|line| match line.split_once('=') {
            Some((key, value)) => (key.trim().to_string(), Some(value.trim().to_string())),
            None => (line.to_string(), None),
        })
        .collect()
}

/// A classic `[section]` / `key="value"` INI document, as consumed by
/// `loadreg`/`exec_dll` (spec.md §6).
#[derive(Clone, Debug, Default)]
pub struct Ini {
    pub sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Ini {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut current = String::new();
        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                current = name.to_string();
                sections.entry(current.clone()).or_default();
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().trim_matches('"');
                sections.entry(current.clone()).or_default().insert(key.trim().to_string(), value.to_string());
            }
        }
        Self { sections }
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cfg_lines_parse_flags_and_values() {
        let text = "; a comment\nstrict\nramlimit=512\nenv[FOO]=bar\n# another\n";
        let mut cfg = Config::default();
        cfg.apply_cfg_file(text);
        assert!(cfg.strict);
        assert_eq!(cfg.ram_limit_mb, Some(512));
        assert_eq!(cfg.env.get("FOO"), Some(&"bar".to_string()));
    }

    #[test]
    fn ini_parses_sections() {
        let ini = Ini::parse("[General]\nname=\"value\"\n[Other]\nx=1\n");
        assert_eq!(ini.get("General", "name"), Some("value"));
        assert_eq!(ini.get("Other", "x"), Some("1"));
    }
}
