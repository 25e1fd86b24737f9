use tracing::warn;

use super::Segment;
use crate::error::{Result, SubwatchError};

pub const DIALOGUE_PREFIX: &str = "Dialogue:";

/// Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
const FIELD_COUNT: usize = 10;
const TEXT_FIELD: usize = FIELD_COUNT - 1;

/// Split a `Dialogue:` record into its fields.
///
/// Commas after the ninth belong to the text field and are not split.
pub fn split_dialogue(line: &str) -> Result<Vec<&str>> {
    let fields: Vec<&str> = line.trim().splitn(FIELD_COUNT, ',').collect();
    if fields.len() != FIELD_COUNT {
        return Err(SubwatchError::MalformedRecord { fields: fields.len() });
    }
    Ok(fields)
}

/// Split ASS lines into segments. Only well-formed dialogue text is translatable.
pub fn parse(lines: &[String]) -> Vec<Segment> {
    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            if !line.starts_with(DIALOGUE_PREFIX) {
                return Segment::Structural { line: idx };
            }
            match split_dialogue(line) {
                Ok(fields) => Segment::Text {
                    lines: idx..idx + 1,
                    text: fields[TEXT_FIELD].to_string(),
                },
                Err(e) => {
                    warn!("Keeping line {} untranslated: {}", idx + 1, e);
                    Segment::Structural { line: idx }
                }
            }
        })
        .collect()
}

/// Rebuild a dialogue record with `translation` as its text field
pub fn emit_text(original: &str, translation: &str) -> Result<String> {
    let fields = split_dialogue(original)?;
    Ok(format!("{},{}\n", fields[..TEXT_FIELD].join(","), translation))
}
