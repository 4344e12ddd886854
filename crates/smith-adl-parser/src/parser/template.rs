//! String template sub-parser.
//!
//! Splits raw string content into literal and `${...}` reference segments,
//! and recognizes conditional strings (`cond ? then : else`). The escape
//! `$${` produces a literal `${`.
//!
//! A string is only treated as a conditional when the condition part
//! actually parses as one (a reference or scalar literal, optionally
//! compared with `== != < <= > >=`); otherwise `?` and `:` are ordinary
//! characters. Conditions never nest.

use super::ParseError;
use smith_adl_ast::{CmpOp, Condition, Conditional, Operand, Path, Span, Template, TemplatePart, Value};

/// Parse raw string content into a value: a plain string, a template, or
/// a conditional.
pub(super) fn parse_string_value(raw: &str, span: Span) -> Result<Value, ParseError> {
    if let Some(value) = try_conditional(raw, span)? {
        return Ok(value);
    }

    let parts = scan_parts(raw, span)?;
    if parts.iter().all(|p| matches!(p, TemplatePart::Literal(_))) {
        let mut text = String::new();
        for part in &parts {
            if let TemplatePart::Literal(lit) = part {
                text.push_str(lit);
            }
        }
        return Ok(Value::String(text));
    }
    Ok(Value::Template(Template::new(parts, span)))
}

/// Split string content into literal and reference segments.
fn scan_parts(raw: &str, span: Span) -> Result<Vec<TemplatePart>, ParseError> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = raw;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("$${") {
            literal.push_str("${");
            rest = after;
            continue;
        }
        if let Some(after) = rest.strip_prefix("${") {
            let close = after.find('}').ok_or_else(|| {
                ParseError::invalid_template("unterminated '${' interpolation", span)
            })?;
            let inner = after[..close].trim();
            let path = parse_ref_path(inner).ok_or_else(|| {
                ParseError::invalid_template(format!("invalid reference '${{{}}}'", inner), span)
            })?;
            if !literal.is_empty() {
                parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
            }
            parts.push(TemplatePart::Ref(path));
            rest = &after[close + 1..];
            continue;
        }
        let ch = rest.chars().next().expect("rest is non-empty");
        literal.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    if !literal.is_empty() || parts.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }
    Ok(parts)
}

/// Parse the text inside `${...}` as a dotted reference path.
fn parse_ref_path(inner: &str) -> Option<Path> {
    if inner.is_empty() {
        return None;
    }
    let segments: Vec<String> = inner.split('.').map(str::to_string).collect();
    for segment in &segments {
        let mut chars = segment.chars();
        let first = chars.next()?;
        if !(first.is_ascii_alphabetic() || first == '_') {
            return None;
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return None;
        }
    }
    Some(Path::new(segments))
}

/// Recognize `cond ? then : else`.
///
/// Returns Ok(None) when the string is not conditional-shaped, mirroring
/// how a string that merely contains `?`/`:` stays a plain string.
fn try_conditional(raw: &str, span: Span) -> Result<Option<Value>, ParseError> {
    // A string that starts with an interpolation is never a conditional;
    // `"${var.cond}"` must resolve to the condition's value, not branch.
    if raw.trim_start().starts_with("${") {
        return Ok(None);
    }

    let Some(q) = find_outside_refs(raw, '?') else {
        return Ok(None);
    };
    let Some(c_rel) = find_outside_refs(&raw[q + 1..], ':') else {
        return Ok(None);
    };
    let c = q + 1 + c_rel;

    let Some(cond) = parse_condition(raw[..q].trim()) else {
        return Ok(None);
    };
    let when_true = Template::new(scan_parts(raw[q + 1..c].trim(), span)?, span);
    let when_false = Template::new(scan_parts(raw[c + 1..].trim(), span)?, span);

    Ok(Some(Value::Conditional(Box::new(Conditional {
        cond,
        when_true,
        when_false,
        span,
    }))))
}

/// Find the first occurrence of a character outside `${...}` spans.
fn find_outside_refs(raw: &str, needle: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut iter = raw.char_indices().peekable();
    while let Some((idx, ch)) = iter.next() {
        if depth == 0 && ch == '$' {
            if raw[idx..].starts_with("$${") {
                iter.next();
                iter.next();
                continue;
            }
            if raw[idx..].starts_with("${") {
                depth = 1;
                iter.next();
                continue;
            }
        }
        if depth > 0 {
            if ch == '}' {
                depth = 0;
            }
            continue;
        }
        if ch == needle {
            return Some(idx);
        }
    }
    None
}

/// Parse a condition: one operand, optionally compared against another.
fn parse_condition(text: &str) -> Option<Condition> {
    const OPS: [(&str, CmpOp); 6] = [
        ("==", CmpOp::Eq),
        ("!=", CmpOp::Ne),
        ("<=", CmpOp::Le),
        (">=", CmpOp::Ge),
        ("<", CmpOp::Lt),
        (">", CmpOp::Gt),
    ];

    let mut split = None;
    'outer: for (idx, _) in text.char_indices() {
        if inside_ref(text, idx) {
            continue;
        }
        for (symbol, op) in OPS {
            if text[idx..].starts_with(symbol) {
                split = Some((idx, symbol.len(), op));
                break 'outer;
            }
        }
    }

    match split {
        Some((idx, len, op)) => {
            let lhs = parse_operand(text[..idx].trim())?;
            let rhs = parse_operand(text[idx + len..].trim())?;
            Some(Condition {
                lhs,
                cmp: Some((op, rhs)),
            })
        }
        None => {
            let lhs = parse_operand(text.trim())?;
            Some(Condition { lhs, cmp: None })
        }
    }
}

/// Whether a byte offset falls inside a `${...}` span.
fn inside_ref(text: &str, offset: usize) -> bool {
    let mut depth = 0usize;
    let mut idx = 0;
    while idx < text.len() {
        if idx == offset {
            return depth > 0;
        }
        if depth == 0 && text[idx..].starts_with("${") {
            depth = 1;
            idx += 2;
            continue;
        }
        if depth > 0 && text[idx..].starts_with('}') {
            depth = 0;
        }
        idx += text[idx..].chars().next().map(char::len_utf8).unwrap_or(1);
    }
    false
}

/// Parse a condition operand: `${ref}`, a bare dotted reference, a quoted
/// string, a number, or a boolean.
fn parse_operand(text: &str) -> Option<Operand> {
    if text.is_empty() {
        return None;
    }

    if let Some(inner) = text.strip_prefix("${").and_then(|t| t.strip_suffix('}')) {
        return parse_ref_path(inner.trim()).map(Operand::Ref);
    }
    if text == "true" {
        return Some(Operand::Bool(true));
    }
    if text == "false" {
        return Some(Operand::Bool(false));
    }
    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            let inner = &text[1..text.len() - 1];
            // A quoted operand that wraps exactly one interpolation is a
            // reference: `'${var.env}' == 'prod'`.
            if let Some(path) = inner
                .strip_prefix("${")
                .and_then(|t| t.strip_suffix('}'))
                .and_then(|t| parse_ref_path(t.trim()))
            {
                return Some(Operand::Ref(path));
            }
            return Some(Operand::Str(inner.to_string()));
        }
    }
    if let Ok(n) = text.parse::<f64>() {
        return Some(Operand::Num(n));
    }
    // Bare dotted reference: at least two segments, so prose like
    // "Ready" never reads as a reference.
    let path = parse_ref_path(text)?;
    if path.len() >= 2 {
        return Some(Operand::Ref(path));
    }
    None
}
