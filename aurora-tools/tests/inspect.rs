//! Integration tests for the `inspect` binary (spec.md §2 ambient test
//! tooling note: CLI binaries get `tests/`, libraries get co-located
//! `#[cfg(test)]` modules).

use std::process::Command;

fn inspect() -> Command {
    Command::new(env!("CARGO_BIN_EXE_inspect"))
}

#[test]
fn labels_lists_every_label_in_a_script() {
    let dir = tempfile::tempdir().unwrap();
    let script_path = dir.path().join("scenario.txt");
    std::fs::write(&script_path, "*start\nmov %0, 1\n*done\nend\n").unwrap();

    let output = inspect().arg("labels").arg("--script").arg(&script_path).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("2 labels"));
    assert!(stdout.contains("*start"));
    assert!(stdout.contains("*done"));
}

#[test]
fn save_prints_the_header_and_variable_counts() {
    let dir = tempfile::tempdir().unwrap();
    let save_path = dir.path().join("save0.dat");
    let header = libaurora::save::SaveHeader::current(1, 1, 2026, 9, 30);
    let mut state = libaurora::save::SaveState::default();
    state.description = "chapter 1".into();
    state.global_border = 2;
    state.ints = vec![7, 0];
    state.strings = vec!["abc".into(), String::new()];
    libaurora::save::write_save(&save_path, &header, &state).unwrap();

    let output = inspect().arg("save").arg(&save_path).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("chapter 1"));
    assert!(stdout.contains("ints set (nonzero): 1"));
    assert!(stdout.contains("strings set (nonempty): 1"));
}

#[test]
fn save_rejects_a_corrupted_file() {
    let dir = tempfile::tempdir().unwrap();
    let save_path = dir.path().join("save1.dat");
    let header = libaurora::save::SaveHeader::current(1, 1, 2026, 0, 0);
    let state = libaurora::save::SaveState::default();
    libaurora::save::write_save(&save_path, &header, &state).unwrap();
    let mut bytes = std::fs::read(&save_path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;
    std::fs::write(&save_path, &bytes).unwrap();

    let output = inspect().arg("save").arg(&save_path).output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn kidoku_reports_full_coverage_for_an_exhaustively_read_script() {
    let dir = tempfile::tempdir().unwrap();
    let script_path = dir.path().join("scenario.txt");
    let text = "*start\nmov %0, 1\nend\n";
    std::fs::write(&script_path, text).unwrap();

    let mut bitmap = libaurora::script::buffer::KidokuBitmap::new(text.len());
    for addr in 0..text.len() as u32 {
        bitmap.mark(libcommon::ScriptAddress::from(addr));
    }
    let kidoku_path = dir.path().join("kidoku.dat");
    std::fs::write(&kidoku_path, bitmap.as_bytes()).unwrap();

    let output = inspect().arg("kidoku").arg("--script").arg(&script_path).arg(&kidoku_path).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("*start"));
    assert!(!stdout.contains("0/"));
}
