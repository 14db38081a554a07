#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
)]
#![warn(rust_2018_idioms)]

//! Dumps save files, label tables and kidoku coverage for debugging, in the
//! teacher's subcommand-plus-`--id`-style CLI shape.

use anyhow::{bail, Context, Result as AResult};
use libaurora::save;
use libaurora::script::buffer::KidokuBitmap;
use libaurora::script::label::{scan_labels, LabelTable};
use pico_args::Arguments;
use std::env;
use std::path::PathBuf;
use std::process::exit;
use std::rc::Rc;

enum Command {
    Labels { script: PathBuf },
    Save { file: PathBuf },
    Kidoku { script: PathBuf, kidoku: PathBuf },
}

fn exit_usage() -> ! {
    eprintln!(
        "usage: {} <labels --script FILE | save FILE | kidoku --script FILE KIDOKU_FILE>",
        env::args().next().unwrap_or_else(|| "inspect".to_string())
    );
    exit(1);
}

fn parse_command(args: &mut Arguments) -> AResult<Command> {
    let subcommand = args.subcommand()?.ok_or_else(|| anyhow::anyhow!("Missing command"))?;
    Ok(match subcommand.as_str() {
        "labels" => Command::Labels { script: args.value_from_str("--script")? },
        "save" => Command::Save { file: args.free_from_str()? },
        "kidoku" => Command::Kidoku { script: args.value_from_str("--script")?, kidoku: args.free_from_str()? },
        other => bail!("Invalid command '{}'", other),
    })
}

fn print_labels(script: &PathBuf) -> AResult<()> {
    let text = std::fs::read_to_string(script).with_context(|| format!("Reading {}", script.display()))?;
    let labels = scan_labels(Rc::from(text.as_str()))?;
    let count = labels.len();
    let table = LabelTable::build(labels)?;
    println!("{count} labels");
    for index in 0..table.len() {
        let Some(label) = table.get(index) else { continue };
        println!("  *{:<24} address={:<8} line={:<6} line_count={}", label.name, label.address.get(), label.line.get(), label.line_count);
    }
    Ok(())
}

fn print_save(file: &PathBuf) -> AResult<()> {
    let (header, state) = save::read_save(file).with_context(|| format!("Reading {}", file.display()))?;
    println!("header: v{}.{} {:04}-{:02}-{:02} {:02}:{:02}", header.major, header.minor, header.year, header.month, header.day, header.hour, header.minute);
    println!("description: {:?}", state.description);
    println!("global_border: {}", state.global_border);
    println!("ints set (nonzero): {}", state.ints.iter().filter(|&&v| v != 0).count());
    println!("strings set (nonempty): {}", state.strings.iter().filter(|s| !s.is_empty()).count());
    println!("arrays: {}", state.arrays.len());
    for array in &state.arrays {
        println!("  ?{} dims={:?}", array.no, array.dims);
    }
    println!("current_label: {:?} line={} command_index={}", state.current_label, state.current_line, state.command_index);
    println!("bg_image_name: {:?}", state.bg_image_name);
    println!("sprites: {} sprites2: {}", state.sprites.len(), state.sprites2.len());
    println!("callstack depth: {}", state.callstack.len());
    println!("skip_mode: {} choice_vector: {:?} accept_choice_next_index: {}", state.skip_mode, state.choice_vector, state.accept_choice_next_index);
    println!("bgm: {:?} looping={}", state.bgm_name, state.bgm_looping);
    Ok(())
}

fn print_kidoku(script: &PathBuf, kidoku_file: &PathBuf) -> AResult<()> {
    let text = std::fs::read_to_string(script).with_context(|| format!("Reading {}", script.display()))?;
    let raw = std::fs::read(kidoku_file).with_context(|| format!("Reading {}", kidoku_file.display()))?;
    let mut bitmap = KidokuBitmap::new(text.len());
    bitmap.load_bytes(&raw);

    let labels = scan_labels(Rc::from(text.as_str()))?;
    let table = LabelTable::build(labels)?;
    println!("{} bytes covered, {} labels", text.len(), table.len());
    for index in 0..table.len() {
        let Some(label) = table.get(index) else { continue };
        let next_address = table.get(index + 1).map_or(text.len() as u32, |next| next.address.get());
        let start = label.address.get();
        let total = next_address.saturating_sub(start).max(1);
        let marked = (start..next_address).filter(|&addr| bitmap.is_marked(libcommon::ScriptAddress::from(addr))).count() as u32;
        println!("  *{:<24} {marked}/{total} bytes seen", label.name);
    }
    Ok(())
}

fn main() -> AResult<()> {
    let mut args = Arguments::from_env();
    let command = match parse_command(&mut args) {
        Ok(command) => command,
        Err(error) => {
            eprintln!("{error}");
            exit_usage();
        }
    };

    match &command {
        Command::Labels { script } => print_labels(script),
        Command::Save { file } => print_save(file),
        Command::Kidoku { script, kidoku } => print_kidoku(script, kidoku),
    }
}
