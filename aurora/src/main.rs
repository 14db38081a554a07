#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
)]
#![warn(rust_2018_idioms)]

//! Headless reference front end (spec.md §6): wires a `libaurora::Engine` to
//! the `Null*` collaborators `libaurora-platform` provides. Real GPU/audio
//! backends are external collaborators spec.md §1 keeps out of core scope,
//! so this binary's presentation layer is intentionally the same in-memory
//! doubles the engine's own tests use — a window-backed `Compositor`/
//! `AudioMixer` would plug in at the same two construction sites.

use anyhow::{bail, Context, Result as AResult};
use libaurora::Engine;
use libaurora_platform::audio::NullAudioMixer;
use libaurora_platform::compositor::NullCompositor;
use libaurora_platform::{cli, Config, HostFileSystem};
use libcommon::vfs::VirtualFileSystem;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

fn load_config() -> AResult<Config> {
    let raw: Vec<_> = std::env::args_os().skip(1).collect();
    let mut config = cli::parse_cli(raw)?;
    if let Ok(text) = std::fs::read_to_string(config.root.join("ons.cfg")) {
        config.apply_cfg_file(&text);
    }
    if let Some(script) = &config.game_script {
        if let Ok(text) = std::fs::read_to_string(config.root.join(script).with_extension("cfg")) {
            config.apply_cfg_file(&text);
        }
    }
    Ok(config)
}

fn init_logging(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if config.debug_level > 0 { "debug" } else { "info" }));
    if config.use_logfile {
        let appender = tracing_appender::rolling::daily(config.save_dir(), "aurora.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
        Some(guard)
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        None
    }
}

fn read_script(config: &Config) -> AResult<String> {
    let fs = HostFileSystem::new(config.root.clone());
    let script_name = config.game_script.clone().unwrap_or_else(|| PathBuf::from("0.txt"));
    let mut file = fs.open(&script_name).with_context(|| format!("Opening scenario script {}", script_name.display()))?;
    let mut bytes = Vec::new();
    file.reader().read_to_end(&mut bytes)?;
    String::from_utf8(bytes).context("Scenario script is not valid UTF-8")
}

/// One frame's worth of milliseconds, derived from `--force-fps` (spec.md
/// §6) or a 60fps default.
fn frame_duration(config: &Config) -> Duration {
    let fps = config.force_fps.unwrap_or(60).max(1);
    Duration::from_millis(1000 / u64::from(fps))
}

fn main() -> AResult<()> {
    let config = load_config()?;
    let _log_guard = init_logging(&config);

    let span = tracing::info_span!("aurora_run", root = %config.root.display());
    let _enter = span.enter();

    let script_text = read_script(&config)?;
    let mut engine = Engine::from_script(script_text, config.save_dir(), Box::<NullCompositor>::default(), Box::<NullAudioMixer>::default())?;
    engine.strict_warnings = config.strict;

    let dt = frame_duration(&config);
    let dt_ms = dt.as_millis() as u32;
    loop {
        if engine.quit_requested {
            break;
        }
        let tick_span = tracing::debug_span!("tick", ms = dt_ms);
        let _tick_enter = tick_span.enter();
        if let Err(err) = engine.tick(dt_ms) {
            tracing::error!(error = %err, "fatal error during script execution");
            return Err(err);
        }
        drop(_tick_enter);
        std::thread::sleep(dt);
    }

    let fatal_count = engine.errors.reports.iter().filter(|r| r.fatal).count();
    tracing::info!(warnings = engine.errors.reports.len() - fatal_count, "script run finished");
    if fatal_count > 0 {
        bail!("Script run ended with {} fatal error report(s)", fatal_count);
    }
    Ok(())
}
