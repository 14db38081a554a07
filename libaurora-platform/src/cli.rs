use crate::config::{AudioFormat, Config, WindowMode};
use anyhow::{Context, Result as AResult};
use std::path::PathBuf;
use std::str::FromStr;

/// Parses the `aurora` binary's command line (spec.md §6) into a [`Config`].
/// CLI flags always win over anything loaded afterwards from a `.cfg` file.
pub fn parse_cli(raw: Vec<std::ffi::OsString>) -> AResult<Config> {
    let mut args = pico_args::Arguments::from_vec(raw);
    let mut config = Config::default();

    if let Some(root) = args.opt_value_from_str::<_, PathBuf>("--root")? {
        config.root = root;
    }
    config.save_dir = args.opt_value_from_str("--save")?;
    if args.contains("--fullscreen") {
        config.window_mode = WindowMode::Fullscreen;
    }
    if args.contains("--window") {
        config.window_mode = WindowMode::Windowed;
    }
    config.window_width = args.opt_value_from_str("--window-width")?;
    config.game_id = args.opt_value_from_str("--gameid")?;
    config.game_script = args.opt_value_from_str("--game-script")?;
    config.audio_driver = args.opt_value_from_str("--audiodriver")?;
    config.audio_buffer_kb = args.opt_value_from_str("--audiobuffer")?;
    if let Some(format) = args.opt_value_from_str::<_, String>("--audioformat")? {
        config.audio_format = AudioFormat::from_str(&format).with_context(|| format!("Unknown audio format '{format}'"))?;
    }
    config.ram_limit_mb = args.opt_value_from_str("--ramlimit")?;
    config.show_fps = args.contains("--show-fps");
    config.force_fps = args.opt_value_from_str("--force-fps")?;
    while args.contains("--debug") {
        config.debug_level += 1;
    }
    config.check_file_case = args.contains("--check-file-case");
    config.strict = args.contains("--strict");
    config.registry_file = args.opt_value_from_str("--registry")?;
    config.dll_file = args.opt_value_from_str("--dll")?;
    config.use_logfile = args.contains("--use-logfile");
    let _ = args.contains("--use-console");
    if let Some(v) = args.opt_value_from_str("--automode-time")? {
        config.automode_time_ms = v;
    }
    if let Some(v) = args.opt_value_from_str("--voicedelay-time")? {
        config.voicedelay_time_ms = v;
    }
    if let Some(v) = args.opt_value_from_str("--voicewait-time")? {
        config.voicewait_time_ms = v;
    }
    config.nsa_offset = args.opt_value_from_str("--nsa-offset")?;

    while let Some(key) = args.opt_value_from_str::<_, String>("--env")? {
        let value: String = args.free_from_str()?;
        config.env.insert(key, value);
    }

    Ok(config)
}

#[cfg(test)]
mod test {
    use super::*;

    fn args(values: &[&str]) -> Vec<std::ffi::OsString> {
        values.iter().map(std::ffi::OsString::from).collect()
    }

    #[test]
    fn parses_window_and_root_flags() {
        let config = parse_cli(args(&["--root", "/game", "--fullscreen", "--window-width", "1280"])).unwrap();
        assert_eq!(config.root, PathBuf::from("/game"));
        assert_eq!(config.window_mode, WindowMode::Fullscreen);
        assert_eq!(config.window_width, Some(1280));
    }

    #[test]
    fn stacks_debug_flags() {
        let config = parse_cli(args(&["--debug", "--debug", "--debug"])).unwrap();
        assert_eq!(config.debug_level, 3);
    }
}
