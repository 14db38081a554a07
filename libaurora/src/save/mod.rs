//! Fixed-layout binary save records (spec.md §4.6): a dated header, the
//! runtime state body in its exact field order, and an Adler-32 trailer.
//! Writes go through a `.tmp`-then-rename so a crash mid-write can never
//! leave a half-written `saveN.dat` behind.

use anyhow::{ensure, Context, Result as AResult};
use binrw::{BinRead, BinWrite};
use libcommon::{ReadNulStringExt, WriteNulStringExt};
use std::fs::{self, File};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

const MAGIC: u32 = 0x534E_4F52; // 'RONS'
const SUPPORTED_MAJOR: u8 = 1;
const SUPPORTED_MINOR: u8 = 0;

#[derive(Clone, Debug, BinRead, BinWrite, PartialEq, Eq)]
#[brw(little)]
pub struct SaveHeader {
    pub magic: u32,
    pub major: u8,
    pub minor: u8,
    pub day: i8,
    pub month: i8,
    pub year: i16,
    pub hour: i8,
    pub minute: i8,
}

impl SaveHeader {
    #[must_use]
    pub fn current(day: i8, month: i8, year: i16, hour: i8, minute: i8) -> Self {
        Self { magic: MAGIC, major: SUPPORTED_MAJOR, minor: SUPPORTED_MINOR, day, month, year, hour, minute }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpriteSnapshot {
    pub x: i32,
    pub y: i32,
    pub alpha: u8,
    pub visible: bool,
    pub image_name: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArraySnapshot {
    pub no: i32,
    pub dims: Vec<u32>,
    pub data: Vec<i32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallFrameSnapshot {
    /// `0` = label frame, `1` = for frame, matching the tagged-union
    /// encoding the rest of the fields below depend on.
    pub is_for: bool,
    pub address: u32,
    pub label_or_induction_name: String,
    pub line_or_bound: i32,
    pub step: i32,
}

/// The entire runtime snapshot described by spec.md §4.6's numbered body,
/// minus fields the spec explicitly excludes (e.g. current audio position
/// within a stream).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SaveState {
    pub description: String,
    pub global_border: u32,
    pub ints: Vec<i32>,
    pub strings: Vec<String>,
    pub arrays: Vec<ArraySnapshot>,
    pub current_label: String,
    pub current_line: u32,
    pub command_index: u32,
    pub bg_image_name: String,
    pub sprites: Vec<SpriteSnapshot>,
    pub sprites2: Vec<SpriteSnapshot>,
    pub no_transition: Vec<u32>,
    pub callstack: Vec<CallFrameSnapshot>,
    pub skip_mode: u8,
    pub choice_vector: Vec<i32>,
    pub accept_choice_next_index: u32,
    pub bgm_name: String,
    pub bgm_looping: bool,
    pub prnum: Vec<i32>,
    pub bar: Vec<i32>,
}

fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn write_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn write_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

fn write_str(out: &mut Vec<u8>, s: &str) -> AResult<()> {
    out.write_nul_string(s)?;
    Ok(())
}

fn encode_body(state: &SaveState) -> AResult<Vec<u8>> {
    let mut body = Vec::new();
    // 1. variables [0, global_border) then arrays in declaration order.
    write_u32(&mut body, state.global_border);
    for &v in &state.ints {
        write_i32(&mut body, v);
    }
    for s in &state.strings {
        write_str(&mut body, s)?;
    }
    write_u32(&mut body, state.arrays.len() as u32);
    for array in &state.arrays {
        write_i32(&mut body, array.no);
        write_u32(&mut body, array.dims.len() as u32);
        for &d in &array.dims {
            write_u32(&mut body, d);
        }
        for &d in &array.data {
            write_i32(&mut body, d);
        }
    }
    // 6. current label, line, command index.
    write_str(&mut body, &state.current_label)?;
    write_u32(&mut body, state.current_line);
    write_u32(&mut body, state.command_index);
    // 7. bg image name.
    write_str(&mut body, &state.bg_image_name)?;
    // 9. sprite[0..999] then sprite2[0..999].
    write_u32(&mut body, state.sprites.len() as u32);
    for sprite in &state.sprites {
        write_sprite(&mut body, sprite)?;
    }
    write_u32(&mut body, state.sprites2.len() as u32);
    for sprite in &state.sprites2 {
        write_sprite(&mut body, sprite)?;
    }
    // 11. sprites with transitions disabled.
    write_u32(&mut body, state.no_transition.len() as u32);
    for &id in &state.no_transition {
        write_u32(&mut body, id);
    }
    // 13. callstack.
    write_u32(&mut body, state.callstack.len() as u32);
    for frame in &state.callstack {
        write_u8(&mut body, u8::from(frame.is_for));
        write_u32(&mut body, frame.address);
        write_str(&mut body, &frame.label_or_induction_name)?;
        write_i32(&mut body, frame.line_or_bound);
        write_i32(&mut body, frame.step);
    }
    // 14. skip mode / choice vector.
    write_u8(&mut body, state.skip_mode);
    write_u32(&mut body, state.choice_vector.len() as u32);
    for &c in &state.choice_vector {
        write_i32(&mut body, c);
    }
    write_u32(&mut body, state.accept_choice_next_index);
    // 15. sound state.
    write_str(&mut body, &state.bgm_name)?;
    write_u8(&mut body, u8::from(state.bgm_looping));
    // 16. prnum / bar.
    write_u32(&mut body, state.prnum.len() as u32);
    for &v in &state.prnum {
        write_i32(&mut body, v);
    }
    write_u32(&mut body, state.bar.len() as u32);
    for &v in &state.bar {
        write_i32(&mut body, v);
    }
    Ok(body)
}

fn write_sprite(out: &mut Vec<u8>, sprite: &SpriteSnapshot) -> AResult<()> {
    write_i32(out, sprite.x);
    write_i32(out, sprite.y);
    write_u8(out, sprite.alpha);
    write_u8(out, u8::from(sprite.visible));
    write_str(out, &sprite.image_name)
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> AResult<u32> {
    let mut buf = [0u8; 4];
    cursor.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32(cursor: &mut Cursor<&[u8]>) -> AResult<i32> {
    let mut buf = [0u8; 4];
    cursor.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> AResult<u8> {
    let mut buf = [0u8; 1];
    cursor.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_str(cursor: &mut Cursor<&[u8]>) -> AResult<String> {
    Ok(cursor.read_nul_string()?)
}

fn read_sprite(cursor: &mut Cursor<&[u8]>) -> AResult<SpriteSnapshot> {
    Ok(SpriteSnapshot { x: read_i32(cursor)?, y: read_i32(cursor)?, alpha: read_u8(cursor)?, visible: read_u8(cursor)? != 0, image_name: read_str(cursor)? })
}

fn decode_body(bytes: &[u8], description: String) -> AResult<SaveState> {
    let mut cursor = Cursor::new(bytes);
    let global_border = read_u32(&mut cursor)?;
    let mut ints = Vec::with_capacity(global_border as usize);
    for _ in 0..global_border {
        ints.push(read_i32(&mut cursor)?);
    }
    let mut strings = Vec::with_capacity(global_border as usize);
    for _ in 0..global_border {
        strings.push(read_str(&mut cursor)?);
    }
    let array_count = read_u32(&mut cursor)?;
    let mut arrays = Vec::with_capacity(array_count as usize);
    for _ in 0..array_count {
        let no = read_i32(&mut cursor)?;
        let dim_count = read_u32(&mut cursor)?;
        let mut dims = Vec::with_capacity(dim_count as usize);
        for _ in 0..dim_count {
            dims.push(read_u32(&mut cursor)?);
        }
        let size: usize = dims.iter().map(|&d| d as usize).product();
        let mut data = Vec::with_capacity(size);
        for _ in 0..size {
            data.push(read_i32(&mut cursor)?);
        }
        arrays.push(ArraySnapshot { no, dims, data });
    }
    let current_label = read_str(&mut cursor)?;
    let current_line = read_u32(&mut cursor)?;
    let command_index = read_u32(&mut cursor)?;
    let bg_image_name = read_str(&mut cursor)?;
    let sprite_count = read_u32(&mut cursor)?;
    let mut sprites = Vec::with_capacity(sprite_count as usize);
    for _ in 0..sprite_count {
        sprites.push(read_sprite(&mut cursor)?);
    }
    let sprite2_count = read_u32(&mut cursor)?;
    let mut sprites2 = Vec::with_capacity(sprite2_count as usize);
    for _ in 0..sprite2_count {
        sprites2.push(read_sprite(&mut cursor)?);
    }
    let no_transition_count = read_u32(&mut cursor)?;
    let mut no_transition = Vec::with_capacity(no_transition_count as usize);
    for _ in 0..no_transition_count {
        no_transition.push(read_u32(&mut cursor)?);
    }
    let frame_count = read_u32(&mut cursor)?;
    let mut callstack = Vec::with_capacity(frame_count as usize);
    for _ in 0..frame_count {
        callstack.push(CallFrameSnapshot {
            is_for: read_u8(&mut cursor)? != 0,
            address: read_u32(&mut cursor)?,
            label_or_induction_name: read_str(&mut cursor)?,
            line_or_bound: read_i32(&mut cursor)?,
            step: read_i32(&mut cursor)?,
        });
    }
    let skip_mode = read_u8(&mut cursor)?;
    let choice_count = read_u32(&mut cursor)?;
    let mut choice_vector = Vec::with_capacity(choice_count as usize);
    for _ in 0..choice_count {
        choice_vector.push(read_i32(&mut cursor)?);
    }
    let accept_choice_next_index = read_u32(&mut cursor)?;
    let bgm_name = read_str(&mut cursor)?;
    let bgm_looping = read_u8(&mut cursor)? != 0;
    let prnum_count = read_u32(&mut cursor)?;
    let mut prnum = Vec::with_capacity(prnum_count as usize);
    for _ in 0..prnum_count {
        prnum.push(read_i32(&mut cursor)?);
    }
    let bar_count = read_u32(&mut cursor)?;
    let mut bar = Vec::with_capacity(bar_count as usize);
    for _ in 0..bar_count {
        bar.push(read_i32(&mut cursor)?);
    }
    let position = cursor.position() as usize;
    ensure!(position == bytes.len(), "Save file has {} unexpected trailing bytes", bytes.len() - position);
    Ok(SaveState {
        description,
        global_border,
        ints,
        strings,
        arrays,
        current_label,
        current_line,
        command_index,
        bg_image_name,
        sprites,
        sprites2,
        no_transition,
        callstack,
        skip_mode,
        choice_vector,
        accept_choice_next_index,
        bgm_name,
        bgm_looping,
        prnum,
        bar,
    })
}

/// Serializes `state` to `path`, writing a `.tmp` sibling first and
/// renaming it into place so a crash mid-write never corrupts an existing
/// slot.
pub fn write_save(path: &Path, header: &SaveHeader, state: &SaveState) -> AResult<()> {
    let body = encode_body(state)?;
    let mut buffer = Vec::new();
    let mut header_writer = Cursor::new(Vec::new());
    header.write_le(&mut header_writer).context("Encoding save header")?;
    buffer.extend(header_writer.into_inner());
    write_str(&mut buffer, &state.description)?;
    buffer.extend_from_slice(&body);
    let checksum = adler::adler32_slice(&buffer);
    buffer.extend_from_slice(&checksum.to_le_bytes());

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp_path).with_context(|| format!("Creating {}", tmp_path.display()))?;
        file.write_all(&buffer)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path).with_context(|| format!("Renaming {} into place", path.display()))?;
    Ok(())
}

/// Loads and validates a save file: magic, exact major version match,
/// minor version no newer than supported, Adler-32 trailer, then the body
/// in its fixed order. Any of these failing is reported as an error, never
/// a panic — a corrupt save is user data, not a bug.
pub fn read_save(path: &Path) -> AResult<(SaveHeader, SaveState)> {
    let mut file = File::open(path).with_context(|| format!("Opening {}", path.display()))?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    ensure!(buffer.len() >= 4, "Save file is too short to contain a checksum");
    let (body_and_header, checksum_bytes) = buffer.split_at(buffer.len() - 4);
    let on_disk_checksum = u32::from_le_bytes(checksum_bytes.try_into().unwrap());
    let computed_checksum = adler::adler32_slice(body_and_header);
    ensure!(on_disk_checksum == computed_checksum, "Save file checksum mismatch (corrupt save)");

    let mut header_cursor = Cursor::new(body_and_header);
    let header = SaveHeader::read_le(&mut header_cursor).context("Reading save header")?;
    ensure!(header.magic == MAGIC, "Not an Aurora save file");
    ensure!(header.major == SUPPORTED_MAJOR, "Save file major version {} is incompatible with {}", header.major, SUPPORTED_MAJOR);
    ensure!(header.minor <= SUPPORTED_MINOR, "Save file minor version {} is newer than this build supports ({})", header.minor, SUPPORTED_MINOR);

    let header_len = header_cursor.position() as usize;
    let mut rest_cursor = Cursor::new(body_and_header);
    rest_cursor.seek(SeekFrom::Start(header_len as u64))?;
    let description = read_str(&mut rest_cursor)?;
    let body_start = rest_cursor.position() as usize;
    let state = decode_body(&body_and_header[body_start..], description)?;
    Ok((header, state))
}

/// The save path for slot `n` in `save_dir` (spec.md §6).
#[must_use]
pub fn slot_path(save_dir: &Path, n: u32) -> std::path::PathBuf {
    save_dir.join(format!("save{n}.dat"))
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = slot_path(dir.path(), 3);
        let header = SaveHeader::current(1, 1, 2026, 12, 0);
        let mut state = SaveState::default();
        state.description = "autosave".into();
        state.global_border = 2;
        state.ints = vec![7, 0];
        state.strings = vec!["abc".into(), String::new()];
        write_save(&path, &header, &state).unwrap();
        let (read_header, read_state) = read_save(&path).unwrap();
        assert_eq!(read_header.major, header.major);
        assert_eq!(read_state.ints, vec![7, 0]);
        assert_eq!(read_state.strings[0], "abc");
        assert_eq!(read_state.description, "autosave");
    }

    #[test]
    fn corrupting_any_byte_of_the_body_rejects_the_load() {
        let dir = tempdir().unwrap();
        let path = slot_path(dir.path(), 1);
        let header = SaveHeader::current(1, 1, 2026, 0, 0);
        let mut state = SaveState::default();
        state.ints = vec![42];
        state.global_border = 1;
        write_save(&path, &header, &state).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();
        assert!(read_save(&path).is_err());
    }

    #[test]
    fn rejects_a_newer_major_version() {
        let dir = tempdir().unwrap();
        let path = slot_path(dir.path(), 2);
        let header = SaveHeader { magic: MAGIC, major: SUPPORTED_MAJOR + 1, minor: 0, day: 1, month: 1, year: 2026, hour: 0, minute: 0 };
        let state = SaveState::default();
        write_save(&path, &header, &state).unwrap();
        assert!(read_save(&path).is_err());
    }
}
