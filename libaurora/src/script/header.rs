//! Leading `;`/`,` header pragmas (spec.md §4.6 item 10's "gameid",
//! and the screen-size/global-variable-border declarations a scenario can
//! make before its first label), grounded on
//! `original_source/Engine/Handlers/Script.cpp`'s header loop
//! (`while (buf[0]==';'||buf[0]==',')`). Run once, before label scanning —
//! the lines stay in the script text as ordinary `;` comments afterwards,
//! so this never needs to rewrite the buffer the [`crate::script::lexer::Lexer`]
//! reads.

/// Named resolution presets a `;mode` pragma selects between, before an
/// optional `@width,height` override.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenSize {
    Sz320x240,
    Sz400x300,
    Sz480x272,
    Sz640x480,
    Sz800x600,
    Sz1280x720,
    Sz1920x1080,
}

const SCREEN_PRESETS: &[(&str, ScreenSize)] =
    &[("1920", ScreenSize::Sz1920x1080), ("1280", ScreenSize::Sz1280x720), ("800", ScreenSize::Sz800x600), ("640", ScreenSize::Sz640x480), ("480", ScreenSize::Sz480x272), ("400", ScreenSize::Sz400x300), ("320", ScreenSize::Sz320x240)];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptHeader {
    pub screen_size: Option<ScreenSize>,
    pub canvas_size: Option<(i32, i32)>,
    pub global_variable_border: Option<u32>,
    pub game_identifier: Option<String>,
}

/// Parses every consecutive header line at the start of `text`, stopping at
/// the first line that isn't one of `mode`/`value`/`gameid` — matching the
/// original's `break` out of the header loop on an unrecognized directive.
#[must_use]
pub fn parse_header_pragmas(text: &str) -> ScriptHeader {
    let mut header = ScriptHeader::default();
    let mut rest = text;
    loop {
        let Some(body) = rest.strip_prefix(';').or_else(|| rest.strip_prefix(',')) else {
            break;
        };
        if let Some(after) = body.strip_prefix("mode") {
            parse_mode(after, &mut header);
        } else if let Some(after) = body.strip_prefix("value") {
            parse_value(after, &mut header);
        } else if let Some(after) = body.strip_prefix("gameid ") {
            header.game_identifier = line(after).map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        } else {
            break;
        }
        match rest.find('\n') {
            Some(index) => rest = &rest[index + 1..],
            None => break,
        }
    }
    header
}

fn line(text: &str) -> Option<&str> {
    Some(text.split('\n').next().unwrap_or(text))
}

fn parse_mode(after: &str, header: &mut ScriptHeader) {
    let mut after = line(after).unwrap_or(after);
    header.screen_size = Some(ScreenSize::Sz1920x1080);
    for (prefix, size) in SCREEN_PRESETS {
        if let Some(stripped) = after.strip_prefix(prefix) {
            header.screen_size = Some(*size);
            after = stripped;
            break;
        }
    }
    if let Some(dims) = after.strip_prefix('@') {
        let mut parts = dims.splitn(2, ',');
        let w = parts.next().and_then(|s| s.trim().parse().ok());
        let h = parts.next().and_then(|s| s.trim().parse().ok());
        if let (Some(w), Some(h)) = (w, h) {
            header.canvas_size = Some((w, h));
        }
    }
}

fn parse_value(after: &str, header: &mut ScriptHeader) {
    if let Some(n) = line(after).and_then(|s| s.trim().parse::<i32>().ok()) {
        header.global_variable_border = Some(n.max(0) as u32);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mode_selects_a_named_preset() {
        let header = parse_header_pragmas(";mode800\n*start\nend\n");
        assert_eq!(header.screen_size, Some(ScreenSize::Sz800x600));
        assert_eq!(header.canvas_size, None);
    }

    #[test]
    fn mode_with_an_explicit_canvas_override() {
        let header = parse_header_pragmas(";mode1280@1024,768\n*start\nend\n");
        assert_eq!(header.screen_size, Some(ScreenSize::Sz1280x720));
        assert_eq!(header.canvas_size, Some((1024, 768)));
    }

    #[test]
    fn value_sets_the_global_variable_border() {
        let header = parse_header_pragmas(";value 200\n*start\nend\n");
        assert_eq!(header.global_variable_border, Some(200));
    }

    #[test]
    fn a_negative_value_clamps_to_zero() {
        let header = parse_header_pragmas(";value -5\n*start\nend\n");
        assert_eq!(header.global_variable_border, Some(0));
    }

    #[test]
    fn gameid_reads_the_rest_of_the_line() {
        let header = parse_header_pragmas(";gameid My Game\n*start\nend\n");
        assert_eq!(header.game_identifier, Some("My Game".to_string()));
    }

    #[test]
    fn pragmas_chain_until_an_unrecognized_line() {
        let header = parse_header_pragmas(";mode640\n;value 32\n*start\nend\n");
        assert_eq!(header.screen_size, Some(ScreenSize::Sz640x480));
        assert_eq!(header.global_variable_border, Some(32));
    }

    #[test]
    fn a_script_with_no_header_pragmas_parses_to_all_none() {
        let header = parse_header_pragmas("*start\nend\n");
        assert_eq!(header, ScriptHeader::default());
    }
}
