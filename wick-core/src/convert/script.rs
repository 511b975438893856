//! Legacy script mapping
//!
//! Legacy objects and frames carry one script blob each. Under
//! [`ScriptPolicy::LoadEvent`] the blob becomes the `load` event verbatim.
//! Under [`ScriptPolicy::SplitEvents`] each top-level handler such as
//! `function mouseClick() { ... }` becomes its own event and any remaining
//! code is kept as `load`.

use crate::config::ScriptPolicy;
use crate::model::Script;

/// Event names recognised when splitting legacy handlers (lowercased)
pub const EVENT_NAMES: &[&str] = &[
    "load",
    "update",
    "unload",
    "mouseenter",
    "mouseleave",
    "mousepressed",
    "mousedown",
    "mousereleased",
    "mouseup",
    "mousehover",
    "mousedrag",
    "mouseclick",
    "keypressed",
    "keyreleased",
    "keydown",
];

/// Convert one legacy script blob into current scripts.
///
/// An absent script yields no scripts under either policy.
pub fn convert_script(source: Option<&str>, policy: ScriptPolicy) -> Vec<Script> {
    let Some(source) = source else {
        return Vec::new();
    };

    match policy {
        ScriptPolicy::LoadEvent => vec![Script {
            name: "load".to_string(),
            src: source.to_string(),
        }],
        ScriptPolicy::SplitEvents => split_events(source),
    }
}

/// Split top-level event handlers out of a legacy script
pub fn split_events(source: &str) -> Vec<Script> {
    let handlers = find_handlers(source);
    if handlers.is_empty() {
        return vec![Script {
            name: "load".to_string(),
            src: source.to_string(),
        }];
    }

    let mut remainder = String::new();
    let mut cursor = 0;
    for handler in &handlers {
        remainder.push_str(&source[cursor..handler.start]);
        cursor = handler.end;
    }
    remainder.push_str(&source[cursor..]);

    let mut scripts: Vec<Script> = Vec::new();
    let remainder = unindent(&remainder);
    if !remainder.is_empty() {
        scripts.push(Script {
            name: "load".to_string(),
            src: remainder,
        });
    }

    for handler in handlers {
        let body = unindent(&source[handler.body.0..handler.body.1]);
        match scripts.iter_mut().find(|s| s.name == handler.event) {
            Some(existing) => {
                if !body.is_empty() {
                    existing.src.push('\n');
                    existing.src.push_str(&body);
                }
            }
            None => scripts.push(Script {
                name: handler.event,
                src: body,
            }),
        }
    }

    scripts
}

/// A top-level `function <event>(...) { ... }` declaration.
#[derive(Debug)]
struct Handler {
    event: String,
    /// Byte range of the whole declaration
    start: usize,
    end: usize,
    /// Byte range of the body between the braces
    body: (usize, usize),
}

// ============================================
// Scanning
// ============================================

/// Find top-level handler declarations, skipping strings and comments.
///
/// Works on bytes: every delimiter is ASCII and never occurs inside a
/// multi-byte UTF-8 sequence.
fn find_handlers(source: &str) -> Vec<Handler> {
    let bytes = source.as_bytes();
    let mut handlers = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        if let Some(next) = skip_literal(bytes, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => {
                if let Some(handler) = parse_handler(source, i) {
                    i = handler.end;
                    handlers.push(handler);
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }

    handlers
}

/// If `i` starts a string or comment, return the index just past it.
fn skip_literal(bytes: &[u8], i: usize) -> Option<usize> {
    match bytes[i] {
        quote @ (b'"' | b'\'' | b'`') => {
            let mut j = i + 1;
            while j < bytes.len() {
                match bytes[j] {
                    b'\\' => j += 2,
                    b if b == quote => return Some(j + 1),
                    _ => j += 1,
                }
            }
            Some(bytes.len())
        }
        b'/' if bytes.get(i + 1) == Some(&b'/') => Some(
            bytes[i..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(bytes.len(), |p| i + p),
        ),
        b'/' if bytes.get(i + 1) == Some(&b'*') => Some(
            bytes[i + 2..]
                .windows(2)
                .position(|w| w == b"*/")
                .map_or(bytes.len(), |p| i + 2 + p + 2),
        ),
        _ => None,
    }
}

/// Parse `function <name>(<params>) {` at `start` and find its closing brace.
fn parse_handler(source: &str, start: usize) -> Option<Handler> {
    let bytes = source.as_bytes();
    if !bytes[start..].starts_with(b"function") {
        return None;
    }
    if start > 0 && is_ident_byte(bytes[start - 1]) {
        return None;
    }

    let mut i = start + "function".len();
    if !bytes.get(i).is_some_and(|b| b.is_ascii_whitespace()) {
        return None;
    }
    i = skip_whitespace(bytes, i);

    let name_start = i;
    while i < bytes.len() && is_ident_byte(bytes[i]) {
        i += 1;
    }
    let event = source[name_start..i].to_ascii_lowercase();
    if !EVENT_NAMES.contains(&event.as_str()) {
        return None;
    }

    i = skip_whitespace(bytes, i);
    if bytes.get(i) != Some(&b'(') {
        return None;
    }
    i += bytes[i..].iter().position(|&b| b == b')')? + 1;
    i = skip_whitespace(bytes, i);
    if bytes.get(i) != Some(&b'{') {
        return None;
    }

    let open = i;
    let close = matching_brace(bytes, open)?;
    Some(Handler {
        event,
        start,
        end: close + 1,
        body: (open + 1, close),
    })
}

fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        if let Some(next) = skip_literal(bytes, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Trim surrounding blank lines and remove the common leading indentation
fn unindent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return String::new();
    };
    let lines = &lines[first..=last];

    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| l.get(indent..).unwrap_or_else(|| l.trim_start()))
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(scripts: &[Script]) -> Vec<&str> {
        scripts.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_absent_script_yields_nothing() {
        assert!(convert_script(None, ScriptPolicy::LoadEvent).is_empty());
        assert!(convert_script(None, ScriptPolicy::SplitEvents).is_empty());
    }

    #[test]
    fn test_load_event_keeps_source_verbatim() {
        let src = "function mouseClick() {\n  stop();\n}\n";
        let scripts = convert_script(Some(src), ScriptPolicy::LoadEvent);
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].name, "load");
        assert_eq!(scripts[0].src, src);
    }

    #[test]
    fn test_empty_script_is_kept_under_load_event() {
        let scripts = convert_script(Some(""), ScriptPolicy::LoadEvent);
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].src, "");
    }

    #[test]
    fn test_split_events() {
        let src = r#"
var speed = 4;

function update() {
    this.x += speed;
}

function mouseClick() {
    if (speed > 0) {
        speed = -speed;
    }
}
"#;
        let scripts = split_events(src);
        assert_eq!(names(&scripts), vec!["load", "update", "mouseclick"]);
        assert_eq!(scripts[0].src, "var speed = 4;");
        assert_eq!(scripts[1].src, "this.x += speed;");
        assert_eq!(
            scripts[2].src,
            "if (speed > 0) {\n    speed = -speed;\n}"
        );
    }

    #[test]
    fn test_split_ignores_unknown_and_nested_functions() {
        let src = "function helper() {\n  function update() { x(); }\n}\n";
        let scripts = split_events(src);
        assert_eq!(names(&scripts), vec!["load"]);
        assert_eq!(scripts[0].src, src);
    }

    #[test]
    fn test_split_skips_braces_in_strings_and_comments() {
        let src = "// function load() {\nvar s = \"}{\";\nfunction load() {\n  /* } */ go(s);\n}";
        let scripts = split_events(src);
        assert_eq!(names(&scripts), vec!["load"]);
        assert_eq!(
            scripts[0].src,
            "// function load() {\nvar s = \"}{\";\n/* } */ go(s);"
        );
    }

    #[test]
    fn test_split_does_not_match_identifier_suffix() {
        let src = "myfunction update() {}";
        let scripts = split_events(src);
        assert_eq!(names(&scripts), vec!["load"]);
        assert_eq!(scripts[0].src, src);
    }

    #[test]
    fn test_split_with_non_ascii_top_level_code() {
        let src = "var π = 3.14;\nvar greeting = \"héllo ✓\";\nfunction update() {\n  x(π);\n}\n// fin ✓\n";
        let scripts = split_events(src);
        assert_eq!(names(&scripts), vec!["load", "update"]);
        assert_eq!(
            scripts[0].src,
            "var π = 3.14;\nvar greeting = \"héllo ✓\";\n\n// fin ✓"
        );
        assert_eq!(scripts[1].src, "x(π);");

        let scripts = convert_script(Some("ünïcode();"), ScriptPolicy::SplitEvents);
        assert_eq!(scripts[0].src, "ünïcode();");
    }

    #[test]
    fn test_unindent() {
        assert_eq!(unindent("\n    a\n      b\n\n"), "a\n  b");
        assert_eq!(unindent("   \n  "), "");
    }
}
