//! Vector graphics import
//!
//! Legacy paths are stored as SVG markup and legacy text as loose style
//! attributes. The converter hands both to a [`VectorGraphics`]
//! implementation, which returns the structured geometry stored in
//! [`crate::model::Path::json`].

use super::legacy::TextData;
use crate::error::{Error, Result};
use kurbo::BezPath;
use serde_json::{json, Map, Value};

/// Imports legacy geometry into the current structured form.
pub trait VectorGraphics: Send + Sync {
    /// Import SVG markup (or bare path data) as a vector path
    fn import_path(&self, markup: &str) -> Result<Value>;

    /// Lay out legacy text as a text item
    fn layout_text(&self, text: &TextData) -> Result<Value>;
}

/// Produces paper.js-style `[className, attributes]` items.
///
/// Path data is parsed and normalized with `kurbo`, so geometry that cannot
/// be parsed is rejected instead of stored.
#[derive(Debug, Default, Clone, Copy)]
pub struct PaperJson;

impl VectorGraphics for PaperJson {
    fn import_path(&self, markup: &str) -> Result<Value> {
        let markup = markup.trim();
        let (d, fill, stroke, stroke_width) = if markup.starts_with('<') {
            let element = path_element(markup)
                .ok_or_else(|| Error::Vector("SVG markup has no <path> element".to_string()))?;
            let d = attribute(element, "d")
                .ok_or_else(|| Error::Vector("<path> element has no d attribute".to_string()))?;
            (
                d,
                attribute(element, "fill"),
                attribute(element, "stroke"),
                attribute(element, "stroke-width"),
            )
        } else {
            (markup, None, None, None)
        };

        let path = parse_path(d)?;

        let mut attrs = Map::new();
        attrs.insert("pathData".to_string(), Value::String(path.to_svg()));
        if let Some(fill) = fill.filter(|f| *f != "none") {
            attrs.insert("fillColor".to_string(), Value::String(fill.to_string()));
        }
        if let Some(stroke) = stroke.filter(|s| *s != "none") {
            attrs.insert("strokeColor".to_string(), Value::String(stroke.to_string()));
        }
        if let Some(width) = stroke_width.and_then(|w| w.parse::<f64>().ok()) {
            attrs.insert("strokeWidth".to_string(), json!(width));
        }

        Ok(Value::Array(vec![
            Value::String("Path".to_string()),
            Value::Object(attrs),
        ]))
    }

    fn layout_text(&self, text: &TextData) -> Result<Value> {
        if !text.font_size.is_finite() || text.font_size <= 0.0 {
            return Err(Error::Vector(format!("invalid font size {}", text.font_size)));
        }

        Ok(json!([
            "PointText",
            {
                "content": text.text,
                "fillColor": text.fill,
                "fontFamily": text.font_family,
                "fontWeight": text.font_weight,
                "fontSize": text.font_size,
                "justification": text.text_align,
            }
        ]))
    }
}

fn parse_path(d: &str) -> Result<BezPath> {
    let path = BezPath::from_svg(d.trim())
        .map_err(|e| Error::Vector(format!("invalid path data: {}", e)))?;
    if path.elements().is_empty() {
        return Err(Error::Vector("path data is empty".to_string()));
    }
    Ok(path)
}

/// The text of the first `<path ...>` start tag
fn path_element(markup: &str) -> Option<&str> {
    let start = markup.find("<path")?;
    let rest = &markup[start..];
    let end = rest.find('>')?;
    Some(&rest[..end])
}

/// Value of a quoted attribute within a start tag
fn attribute<'a>(element: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!("{}=", name);
    let mut search = 0;
    while let Some(pos) = element[search..].find(&pattern) {
        let at = search + pos;
        let after = at + pattern.len();
        let preceded_by_space = element[..at]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
        if preceded_by_space {
            let quote = element[after..].chars().next()?;
            if quote == '"' || quote == '\'' {
                let value = &element[after + 1..];
                return value.find(quote).map(|end| &value[..end]);
            }
        }
        search = after;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_svg_markup() {
        let markup = r##"<svg xmlns="http://www.w3.org/2000/svg"><path fill="#ff0000" stroke="none" d="M0,0 L10,0 L10,10 Z"/></svg>"##;
        let value = PaperJson.import_path(markup).unwrap();

        assert_eq!(value[0], "Path");
        assert_eq!(value[1]["fillColor"], "#ff0000");
        assert!(value[1].get("strokeColor").is_none());
        let data = value[1]["pathData"].as_str().unwrap();
        assert!(data.starts_with('M'));
        assert!(data.contains('Z'));
    }

    #[test]
    fn test_import_bare_path_data() {
        let value = PaperJson.import_path("M0 0 C 1 1 2 2 3 3").unwrap();
        assert_eq!(value[0], "Path");
        assert!(value[1]["pathData"].as_str().unwrap().contains('C'));
    }

    #[test]
    fn test_stroke_width_does_not_match_as_stroke() {
        let value = PaperJson
            .import_path(r#"<path stroke-width="2" stroke="blue" d="M0 0 L1 1"/>"#)
            .unwrap();
        assert_eq!(value[1]["strokeColor"], "blue");
        assert_eq!(value[1]["strokeWidth"], 2.0);
    }

    #[test]
    fn test_invalid_geometry_is_rejected() {
        assert!(matches!(PaperJson.import_path("M0 0 Q"), Err(Error::Vector(_))));
        assert!(matches!(PaperJson.import_path(""), Err(Error::Vector(_))));
        assert!(matches!(PaperJson.import_path("<svg></svg>"), Err(Error::Vector(_))));
    }

    #[test]
    fn test_layout_text() {
        let text = TextData {
            text: "Hello".to_string(),
            text_align: "center".to_string(),
            ..Default::default()
        };
        let value = PaperJson.layout_text(&text).unwrap();

        assert_eq!(value[0], "PointText");
        assert_eq!(value[1]["content"], "Hello");
        assert_eq!(value[1]["justification"], "center");
        assert_eq!(value[1]["fontFamily"], "Arial");
    }

    #[test]
    fn test_layout_text_rejects_bad_size() {
        let text = TextData {
            font_size: 0.0,
            ..Default::default()
        };
        assert!(matches!(PaperJson.layout_text(&text), Err(Error::Vector(_))));
    }
}
