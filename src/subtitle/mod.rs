// Subtitle document model
//
// A document is split into segments that are either copied verbatim or sent
// out for translation. Each format implements its own parse rule and its own
// way of writing a translated segment back:
// - SRT: dialogue lines between boundary lines form one cue text
// - ASS: the text field of each `Dialogue:` record

pub mod ass;
pub mod srt;

use std::ops::Range;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{Result, SubwatchError};

/// File extensions picked up by discovery, compared case-insensitively
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["srt", "ass"];

/// Token embedded in every generated file name
pub const GENERATED_TOKEN: &str = ".GENERATED.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    /// SubRip (`.srt`)
    Srt,
    /// Advanced SubStation Alpha (`.ass`)
    Ass,
}

impl SubtitleFormat {
    /// Select the format from the file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "srt" => Ok(Self::Srt),
            "ass" => Ok(Self::Ass),
            _ => Err(SubwatchError::UnsupportedFormat(format!(
                "'.{}' ({})",
                extension,
                path.display()
            ))),
        }
    }

    /// Split the document into ordered segments covering every line once
    pub fn parse(&self, document: &SubtitleDocument) -> Vec<Segment> {
        match self {
            Self::Srt => srt::parse(document.lines()),
            Self::Ass => ass::parse(document.lines()),
        }
    }

    /// Rebuild the file, substituting `translations[i]` for the i-th text segment
    pub fn reassemble(
        &self,
        document: &SubtitleDocument,
        segments: &[Segment],
        translations: &[String],
    ) -> Result<String> {
        let text_count = segments.iter().filter(|s| s.text().is_some()).count();
        if text_count != translations.len() {
            return Err(SubwatchError::Reassembly(format!(
                "{} text segments but {} translations",
                text_count,
                translations.len()
            )));
        }

        let lines = document.lines();
        let mut translations = translations.iter();
        let mut output = String::new();

        for segment in segments {
            match segment {
                Segment::Structural { line } => output.push_str(&lines[*line]),
                Segment::Text { lines: span, .. } => {
                    // Counts were checked above
                    let Some(translation) = translations.next() else {
                        break;
                    };
                    match self {
                        Self::Srt => output.push_str(&srt::emit_text(translation)),
                        Self::Ass => output.push_str(&ass::emit_text(&lines[span.start], translation)?),
                    }
                }
            }
        }

        Ok(output)
    }
}

/// Raw lines of one subtitle file, each keeping its original terminator
#[derive(Debug, Clone)]
pub struct SubtitleDocument {
    format: SubtitleFormat,
    lines: Vec<String>,
}

impl SubtitleDocument {
    pub fn from_text(format: SubtitleFormat, content: &str) -> Self {
        Self {
            format,
            lines: content.split_inclusive('\n').map(str::to_string).collect(),
        }
    }

    /// Read a subtitle file. The format is resolved before the file is touched.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = SubtitleFormat::from_path(path)?;
        let bytes = fs::read(path).await?;
        Ok(Self::from_text(format, &String::from_utf8_lossy(&bytes)))
    }

    pub fn format(&self) -> SubtitleFormat {
        self.format
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn segments(&self) -> Vec<Segment> {
        self.format.parse(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A line emitted unchanged
    Structural { line: usize },
    /// Translatable text spanning one or more lines
    Text { lines: Range<usize>, text: String },
}

impl Segment {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Structural { .. } => None,
            Self::Text { text, .. } => Some(text),
        }
    }
}

/// Texts of all text segments in document order
pub fn batch_texts(segments: &[Segment]) -> Vec<String> {
    segments
        .iter()
        .filter_map(Segment::text)
        .map(str::to_string)
        .collect()
}

/// Marker inserted before the extension of a translated file, e.g. `.GENERATED.th`
pub fn output_marker(target_language: &str) -> String {
    format!("{}{}", GENERATED_TOKEN, target_language.trim().to_lowercase())
}

/// `<dir>/<stem><marker>.<ext>` for the given input file
pub fn output_path<P: AsRef<Path>>(input: P, target_language: &str) -> Result<PathBuf> {
    let input = input.as_ref();
    let stem = input
        .file_stem()
        .ok_or_else(|| SubwatchError::Config(format!("Invalid subtitle filename: {}", input.display())))?
        .to_string_lossy();

    let mut name = format!("{}{}", stem, output_marker(target_language));
    if let Some(ext) = input.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }

    Ok(input.with_file_name(name))
}

/// True for files produced by this tool
pub fn is_generated(file_name: &str) -> bool {
    file_name.contains(GENERATED_TOKEN)
}
