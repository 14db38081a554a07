//! Splits a dialogue line's source text into timed segments (spec.md §4.3).

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Printable text, one entry per codepoint so the controller can time
    /// each one independently.
    Text(Vec<char>),
    /// `@`: wait for a click, then continue on the same page.
    ClickStop,
    /// `\`: wait for a click, then clear the page before continuing.
    ClickClear,
    /// `|`: a barrier; carries its own index within the line.
    Pipe(u32),
    /// `!wN`: pause N milliseconds.
    WaitMillis(u32),
    /// `!sN`: set the per-character speed to N milliseconds/char.
    SetSpeed(u32),
    /// `!dN`: a dot-pause of N milliseconds.
    DotPause(u32),
    /// `{cmd:arg:arg}`: an inline text command.
    Inline { name: String, args: Vec<String> },
}

/// Parses a dialogue line's source text into [`Segment`]s. Unrecognized `!x`
/// escapes are treated as plain text starting at the `!` (matches a
/// permissive scripting language where stray `!` is just punctuation).
pub fn parse_segments(source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut chars = source.chars().peekable();
    let mut pipe_index = 0;
    let mut pending_text = Vec::new();

    macro_rules! flush_text {
        () => {
            if !pending_text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut pending_text)));
            }
        };
    }

    while let Some(&c) = chars.peek() {
        match c {
            '@' => {
                flush_text!();
                chars.next();
                segments.push(Segment::ClickStop);
            }
            '\\' => {
                flush_text!();
                chars.next();
                segments.push(Segment::ClickClear);
            }
            '|' => {
                flush_text!();
                chars.next();
                segments.push(Segment::Pipe(pipe_index));
                pipe_index += 1;
            }
            '{' => {
                flush_text!();
                chars.next();
                let mut body = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    body.push(c);
                }
                let mut parts = body.split(':');
                let name = parts.next().unwrap_or_default().to_string();
                let args = parts.map(str::to_string).collect();
                segments.push(Segment::Inline { name, args });
            }
            '!' => {
                flush_text!();
                chars.next();
                match chars.peek().copied() {
                    Some(kind @ ('w' | 's' | 'd')) => {
                        chars.next();
                        let mut digits = String::new();
                        while let Some(&d) = chars.peek() {
                            if d.is_ascii_digit() {
                                digits.push(d);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                        let n = digits.parse().unwrap_or(0);
                        segments.push(match kind {
                            'w' => Segment::WaitMillis(n),
                            's' => Segment::SetSpeed(n),
                            _ => Segment::DotPause(n),
                        });
                    }
                    _ => pending_text.push('!'),
                }
            }
            other => {
                pending_text.push(other);
                chars.next();
            }
        }
    }
    flush_text!();
    segments
}

/// Number of `|` barriers a rendered dialogue line contains, used by
/// `I-DIALOGUE-BARRIER` style round-trip checks against `waitOnDialogue`.
#[must_use]
pub fn pipe_count(segments: &[Segment]) -> u32 {
    segments.iter().filter(|s| matches!(s, Segment::Pipe(_))).count() as u32
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn splits_plain_text_and_barriers() {
        let segments = parse_segments("Hello|World");
        assert_eq!(segments, vec![Segment::Text("Hello".chars().collect()), Segment::Pipe(0), Segment::Text("World".chars().collect())]);
        assert_eq!(pipe_count(&segments), 1);
    }

    #[test]
    fn parses_inline_commands_with_args() {
        let segments = parse_segments("a{color:ff0000}b");
        assert!(segments.contains(&Segment::Inline { name: "color".into(), args: vec!["ff0000".into()] }));
    }

    #[test]
    fn parses_wait_speed_and_dot_pause_escapes() {
        let segments = parse_segments("!w100!s20!d5");
        assert_eq!(segments, vec![Segment::WaitMillis(100), Segment::SetSpeed(20), Segment::DotPause(5)]);
    }

    #[test]
    fn unrecognized_bang_escape_is_plain_text() {
        let segments = parse_segments("a!zb");
        assert_eq!(segments, vec![Segment::Text("a!zb".chars().collect())]);
    }
}
