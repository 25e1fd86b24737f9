use super::Segment;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Empty lines, cue numbers and timing lines delimit cue text
fn is_boundary(line: &str) -> bool {
    let trimmed = line.trim_start_matches(BYTE_ORDER_MARK).trim();
    trimmed.is_empty()
        || trimmed.chars().all(|c| c.is_ascii_digit())
        || trimmed.contains("-->")
}

/// Split SRT lines into segments.
///
/// Consecutive non-boundary lines become one text segment whose text is the
/// trimmed lines joined by a single space. Boundary lines are structural.
pub fn parse(lines: &[String]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();
    let mut start = 0;

    for (idx, line) in lines.iter().enumerate() {
        if is_boundary(line) {
            flush(&mut segments, &mut buffer, start, idx);
            segments.push(Segment::Structural { line: idx });
        } else {
            if buffer.is_empty() {
                start = idx;
            }
            buffer.push(line.trim());
        }
    }
    flush(&mut segments, &mut buffer, start, lines.len());

    segments
}

fn flush(segments: &mut Vec<Segment>, buffer: &mut Vec<&str>, start: usize, end: usize) {
    if buffer.is_empty() {
        return;
    }
    segments.push(Segment::Text {
        lines: start..end,
        text: buffer.join(" "),
    });
    buffer.clear();
}

/// A translated cue always occupies a single line
pub fn emit_text(translation: &str) -> String {
    format!("{}\n", translation)
}
