//! Typed note content
//!
//! A note's `content` string is encoded according to its kind: plain text,
//! a JSON stroke list for drawings, or JSON audio metadata. `NoteContent`
//! is the decoded form; it is only ever produced by dispatching on the kind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::NoteKind;

/// Errors decoding note content
#[derive(Error, Debug)]
pub enum ContentError {
    /// Content is not valid JSON for the given kind
    #[error("{kind} note content is malformed: {source}")]
    Malformed {
        kind: NoteKind,
        #[source]
        source: serde_json::Error,
    },
}

/// Decoded note content
#[derive(Debug, Clone, PartialEq)]
pub enum NoteContent {
    Text(String),
    Drawing(DrawingContent),
    Audio(AudioContent),
    /// Mixed notes are passed through untouched
    Mixed(String),
}

impl NoteContent {
    /// Decode raw content according to `kind`
    pub fn decode(kind: NoteKind, raw: &str) -> Result<Self, ContentError> {
        let malformed = |source| ContentError::Malformed { kind, source };
        match kind {
            NoteKind::Text => Ok(NoteContent::Text(raw.to_string())),
            NoteKind::Mixed => Ok(NoteContent::Mixed(raw.to_string())),
            NoteKind::Drawing => serde_json::from_str(raw)
                .map(NoteContent::Drawing)
                .map_err(malformed),
            NoteKind::Audio => serde_json::from_str(raw)
                .map(NoteContent::Audio)
                .map_err(malformed),
        }
    }

    /// The kind this content belongs to
    pub fn kind(&self) -> NoteKind {
        match self {
            NoteContent::Text(_) => NoteKind::Text,
            NoteContent::Drawing(_) => NoteKind::Drawing,
            NoteContent::Audio(_) => NoteKind::Audio,
            NoteContent::Mixed(_) => NoteKind::Mixed,
        }
    }

    /// Encode back into the raw content string
    pub fn encode(&self) -> String {
        match self {
            NoteContent::Text(text) | NoteContent::Mixed(text) => text.clone(),
            // Serializing plain structs with string keys cannot fail
            NoteContent::Drawing(drawing) => serde_json::to_string(drawing).unwrap_or_default(),
            NoteContent::Audio(audio) => serde_json::to_string(audio).unwrap_or_default(),
        }
    }

    /// Short human-readable summary
    pub fn summary(&self) -> String {
        match self {
            NoteContent::Text(text) | NoteContent::Mixed(text) => {
                text.lines().next().unwrap_or("").to_string()
            }
            NoteContent::Drawing(drawing) => format!("drawing, {} stroke(s)", drawing.strokes.len()),
            NoteContent::Audio(audio) => format!("audio, {} ({:.0}s)", audio.file_name, audio.duration),
        }
    }
}

/// One freehand stroke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// SVG path data
    pub path: String,
    pub color: String,
    pub width: f64,
}

/// Drawing note payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingContent {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub strokes: Vec<Stroke>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_color: Option<String>,
}

impl DrawingContent {
    pub fn new(strokes: Vec<Stroke>) -> Self {
        Self {
            tag: Some("drawing".to_string()),
            strokes,
            paper_type: None,
            paper_color: None,
        }
    }

    /// Render the strokes as a standalone SVG document
    pub fn to_svg(&self, width: u32, height: u32) -> String {
        let mut svg = format!(
            r#"<svg width="{}" height="{}" xmlns="http://www.w3.org/2000/svg">"#,
            width, height
        );
        if let Some(ref color) = self.paper_color {
            svg.push_str(&format!(
                r#"<rect width="100%" height="100%" fill="{}"/>"#,
                escape_attr(color)
            ));
        }
        for stroke in &self.strokes {
            svg.push_str(&format!(
                r#"<path d="{}" stroke="{}" stroke-width="{}" fill="none" stroke-linecap="round" stroke-linejoin="round"/>"#,
                escape_attr(&stroke.path),
                escape_attr(&stroke.color),
                stroke.width
            ));
        }
        svg.push_str("</svg>");
        svg
    }
}

/// Audio note payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioContent {
    #[serde(default)]
    pub file_id: Option<i64>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_size: u64,
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_passed_through() {
        let content = NoteContent::decode(NoteKind::Text, "{not json").unwrap();
        assert_eq!(content, NoteContent::Text("{not json".to_string()));
    }

    #[test]
    fn test_decode_drawing() {
        let raw = r##"{"type":"drawing","strokes":[{"path":"M0 0 L10 10","color":"#000","width":2}],"paperType":"grid","paperColor":"#fff"}"##;
        let content = NoteContent::decode(NoteKind::Drawing, raw).unwrap();
        let NoteContent::Drawing(drawing) = content else {
            panic!("Expected drawing content");
        };
        assert_eq!(drawing.strokes.len(), 1);
        assert_eq!(drawing.strokes[0].width, 2.0);
        assert_eq!(drawing.paper_type.as_deref(), Some("grid"));
    }

    #[test]
    fn test_decode_drawing_without_tag() {
        // Editors that mix text and drawing omit the type tag
        let raw = r#"{"strokes":[],"paperType":"plain"}"#;
        let content = NoteContent::decode(NoteKind::Drawing, raw).unwrap();
        assert_eq!(content.kind(), NoteKind::Drawing);
    }

    #[test]
    fn test_decode_audio() {
        let raw = r#"{"fileId":42,"duration":12.5,"fileName":"lecture.m4a","fileSize":2048}"#;
        let NoteContent::Audio(audio) = NoteContent::decode(NoteKind::Audio, raw).unwrap() else {
            panic!("Expected audio content");
        };
        assert_eq!(audio.file_id, Some(42));
        assert_eq!(audio.file_name, "lecture.m4a");
        assert_eq!(audio.file_size, 2048);
    }

    #[test]
    fn test_malformed_drawing_names_kind() {
        let err = NoteContent::decode(NoteKind::Drawing, "just words").unwrap_err();
        assert!(err.to_string().starts_with("drawing note content is malformed"));
    }

    #[test]
    fn test_svg_export() {
        let drawing = DrawingContent::new(vec![
            Stroke {
                path: "M0 0 L5 5".to_string(),
                color: "red".to_string(),
                width: 3.0,
            },
            Stroke {
                path: "M1 1".to_string(),
                color: "blue".to_string(),
                width: 1.5,
            },
        ]);

        let svg = drawing.to_svg(200, 100);
        assert!(svg.starts_with(r#"<svg width="200" height="100""#));
        assert_eq!(svg.matches("<path ").count(), 2);
        assert!(svg.contains(r#"stroke-width="1.5""#));
        assert!(svg.contains(r#"stroke-linecap="round""#));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn test_svg_escapes_attributes() {
        let drawing = DrawingContent::new(vec![Stroke {
            path: r#"M0 0" onload="x"#.to_string(),
            color: "#000".to_string(),
            width: 1.0,
        }]);
        let svg = drawing.to_svg(10, 10);
        assert!(!svg.contains(r#"" onload="#));
        assert!(svg.contains("&quot;"));
    }

    #[test]
    fn test_summary() {
        let drawing = NoteContent::Drawing(DrawingContent::new(Vec::new()));
        assert_eq!(drawing.summary(), "drawing, 0 stroke(s)");
        let text = NoteContent::Text("first\nsecond".to_string());
        assert_eq!(text.summary(), "first");
    }
}
