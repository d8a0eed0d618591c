use serde_yaml::{Mapping, Value};
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum CodecError {
    Parse(serde_yaml::Error),
    NotAMapping { found: &'static str },
    UnsupportedKey { found: &'static str },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Parse(source) => write!(f, "invalid yaml: {}", source),
            CodecError::NotAMapping { found } => {
                write!(f, "expected a mapping at the top level, found a {}", found)
            }
            CodecError::UnsupportedKey { found } => {
                write!(f, "mapping keys must be scalars, found a {}", found)
            }
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CodecError::Parse(source) => Some(source),
            _ => None,
        }
    }
}

/// Output formatting for [`to_yaml_string`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YamlStyle {
    pub indent: usize,
    pub flow: bool,
}

impl Default for YamlStyle {
    fn default() -> Self {
        Self {
            indent: 4,
            flow: false,
        }
    }
}

impl YamlStyle {
    pub fn flow() -> Self {
        Self {
            flow: true,
            ..Self::default()
        }
    }
}

pub fn parse_document(text: &str) -> Result<Value, CodecError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(text).map_err(CodecError::Parse)
}

/// Parses `text` and requires the document to be a mapping. An empty
/// document is an empty mapping.
pub fn parse_mapping(text: &str) -> Result<Mapping, CodecError> {
    match parse_document(text)? {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        other => Err(CodecError::NotAMapping {
            found: kind_name(&other),
        }),
    }
}

pub fn to_yaml_string(map: &Mapping, style: &YamlStyle) -> Result<String, CodecError> {
    if style.flow {
        let mut out = render_flow_mapping(map)?;
        out.push('\n');
        return Ok(out);
    }
    if map.is_empty() {
        return Ok("{}\n".to_string());
    }
    let indent = style.indent.max(1);
    let mut out = String::new();
    for line in block_mapping_lines(map, indent)? {
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Renders a single value the way it would appear in a block-style file:
/// scalars inline, collections as indented block lines.
pub fn render_value(value: &Value, style: &YamlStyle) -> Result<String, CodecError> {
    if style.flow {
        return render_flow(value);
    }
    let (tag, inner) = split_tag(value);
    match block_lines(inner, style.indent.max(1))? {
        Some(lines) => {
            let body = lines.join("\n");
            Ok(match tag {
                Some(tag) => format!("{}\n{}", tag, body),
                None => body,
            })
        }
        None => render_inline(value),
    }
}

pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn block_mapping_lines(map: &Mapping, indent: usize) -> Result<Vec<String>, CodecError> {
    let pad = " ".repeat(indent);
    let mut lines = Vec::new();
    for (key, value) in map {
        let key = render_key(key, false)?;
        let (tag, inner) = split_tag(value);
        match block_lines(inner, indent)? {
            Some(children) => {
                match tag {
                    Some(tag) => lines.push(format!("{}: {}", key, tag)),
                    None => lines.push(format!("{}:", key)),
                }
                lines.extend(children.into_iter().map(|line| format!("{}{}", pad, line)));
            }
            None => lines.push(format!("{}: {}", key, render_inline(value)?)),
        }
    }
    Ok(lines)
}

fn block_sequence_lines(items: &[Value], indent: usize) -> Result<Vec<String>, CodecError> {
    let mut lines = Vec::new();
    for item in items {
        let (tag, inner) = split_tag(item);
        match block_lines(inner, indent)? {
            Some(children) => {
                let mut children = children.into_iter();
                match tag {
                    Some(tag) => lines.push(format!("- {}", tag)),
                    None => {
                        if let Some(first) = children.next() {
                            lines.push(format!("- {}", first));
                        }
                    }
                }
                lines.extend(children.map(|line| format!("  {}", line)));
            }
            None => lines.push(format!("- {}", render_inline(item)?)),
        }
    }
    Ok(lines)
}

/// Block lines for non-empty collections; `None` means the value renders
/// inline on its parent's line.
fn block_lines(value: &Value, indent: usize) -> Result<Option<Vec<String>>, CodecError> {
    match value {
        Value::Mapping(map) if !map.is_empty() => block_mapping_lines(map, indent).map(Some),
        Value::Sequence(items) if !items.is_empty() => {
            block_sequence_lines(items, indent).map(Some)
        }
        _ => Ok(None),
    }
}

fn split_tag(value: &Value) -> (Option<String>, &Value) {
    match value {
        Value::Tagged(tagged) => (Some(tagged.tag.to_string()), &tagged.value),
        other => (None, other),
    }
}

fn render_inline(value: &Value) -> Result<String, CodecError> {
    match value {
        Value::Mapping(map) if map.is_empty() => Ok("{}".to_string()),
        Value::Sequence(items) if items.is_empty() => Ok("[]".to_string()),
        Value::Mapping(map) => render_flow_mapping(map),
        Value::Sequence(items) => render_flow_sequence(items),
        Value::Tagged(tagged) => Ok(format!("{} {}", tagged.tag, render_inline(&tagged.value)?)),
        scalar => Ok(render_scalar(scalar, false)),
    }
}

fn render_flow(value: &Value) -> Result<String, CodecError> {
    match value {
        Value::Mapping(map) => render_flow_mapping(map),
        Value::Sequence(items) => render_flow_sequence(items),
        Value::Tagged(tagged) => Ok(format!("{} {}", tagged.tag, render_flow(&tagged.value)?)),
        scalar => Ok(render_scalar(scalar, true)),
    }
}

fn render_flow_mapping(map: &Mapping) -> Result<String, CodecError> {
    let mut entries = Vec::with_capacity(map.len());
    for (key, value) in map {
        entries.push(format!("{}: {}", render_key(key, true)?, render_flow(value)?));
    }
    Ok(format!("{{{}}}", entries.join(", ")))
}

fn render_flow_sequence(items: &[Value]) -> Result<String, CodecError> {
    let rendered = items
        .iter()
        .map(render_flow)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("[{}]", rendered.join(", ")))
}

fn render_key(key: &Value, flow: bool) -> Result<String, CodecError> {
    match key {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            Ok(render_scalar(key, flow))
        }
        other => Err(CodecError::UnsupportedKey {
            found: kind_name(other),
        }),
    }
}

fn render_scalar(value: &Value, flow: bool) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) if flow => quote_double(text),
        Value::String(text) => render_block_string(text),
        _ => String::new(),
    }
}

// Let the yaml emitter decide whether a plain scalar is safe; anything it
// spreads over several lines is double-quoted instead.
fn render_block_string(text: &str) -> String {
    let Ok(rendered) = serde_yaml::to_string(&Value::String(text.to_string())) else {
        return quote_double(text);
    };
    let rendered = rendered.strip_prefix("--- ").unwrap_or(&rendered);
    let rendered = rendered.strip_suffix('\n').unwrap_or(rendered);
    if rendered.is_empty() || rendered.contains('\n') {
        return quote_double(text);
    }
    rendered.to_string()
}

// JSON escapes C0 controls already. DEL and C1 controls are not printable in
// YAML, and NEL, LS and PS would be read back as line breaks.
fn quote_double(text: &str) -> String {
    let quoted = serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text));
    let mut escaped = String::with_capacity(quoted.len());
    for ch in quoted.chars() {
        match ch {
            '\u{7f}'..='\u{9f}' => escaped.push_str(&format!("\\x{:02X}", u32::from(ch))),
            '\u{2028}' | '\u{2029}' | '\u{fffe}' | '\u{ffff}' => {
                escaped.push_str(&format!("\\u{:04X}", u32::from(ch)))
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}
