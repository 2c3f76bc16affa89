//! Quote- and parenthesis-aware scanning over source expressions.

/// Walks `expr` and calls `visit(byte_index, depth)` for every byte that lies
/// outside a quoted span. Returning `false` from `visit` stops the scan.
fn scan(expr: &str, mut visit: impl FnMut(usize, i32) -> bool) {
    let bytes = expr.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 2;
                    continue;
                }
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'(' | b'[' => {
                    if !visit(i, depth) {
                        return;
                    }
                    depth += 1;
                }
                b')' | b']' => {
                    depth -= 1;
                    if !visit(i, depth) {
                        return;
                    }
                }
                _ => {
                    if !visit(i, depth) {
                        return;
                    }
                }
            },
        }
        i += 1;
    }
}

/// True when every bracket closes in order and no quote is left open.
pub fn is_balanced(expr: &str) -> bool {
    let bytes = expr.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'(' | b'[' => depth += 1,
                b')' | b']' => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    depth == 0 && quote.is_none()
}

/// Removes wrapping parentheses while the interior stays balanced.
///
/// `(a) && (b)` is left alone because its first parenthesis closes early.
pub fn strip_outer_parens(expr: &str) -> &str {
    let mut current = expr.trim();
    while current.starts_with('(') && current.ends_with(')') {
        let inner = &current[1..current.len() - 1];
        if !is_balanced(inner) || closes_early(current) {
            break;
        }
        current = inner.trim();
    }
    current
}

/// Whether the opening parenthesis at index 0 closes before the last byte.
fn closes_early(expr: &str) -> bool {
    let mut early = false;
    let last = expr.len() - 1;
    scan(expr, |i, depth| {
        if depth == 0 && i > 0 && i < last {
            early = true;
            return false;
        }
        true
    });
    early
}

/// Byte positions of `op` at nesting depth zero and outside quotes.
pub fn find_top_level(expr: &str, op: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut skip_until = 0;
    scan(expr, |i, depth| {
        if i >= skip_until && depth == 0 && expr.as_bytes()[i..].starts_with(op.as_bytes()) {
            positions.push(i);
            skip_until = i + op.len();
        }
        true
    });
    positions
}

/// Splits on a top-level operator. Returns a single element when `op` does
/// not occur at depth zero.
pub fn split_top_level<'a>(expr: &'a str, op: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for pos in find_top_level(expr, op) {
        parts.push(expr[start..pos].trim());
        start = pos + op.len();
    }
    parts.push(expr[start..].trim());
    parts
}

/// Relational operators, longest first so prefixes never shadow them.
pub const RELATIONAL_OPERATORS: [&str; 6] = ["==", "!=", ">=", "<=", ">", "<"];

/// Finds the first top-level relational operator, checked in the fixed
/// operator order. Returns its byte position and spelling.
pub fn find_relational(expr: &str) -> Option<(usize, &'static str)> {
    let bytes = expr.as_bytes();
    for op in RELATIONAL_OPERATORS {
        let hit = find_top_level(expr, op).into_iter().find(|&pos| {
            let prev = pos.checked_sub(1).map(|p| bytes[p]);
            let next = bytes.get(pos + op.len()).copied();
            match op {
                "==" => !matches!(prev, Some(b'=' | b'!' | b'<' | b'>')) && next != Some(b'='),
                "!=" => next != Some(b'='),
                ">=" | "<=" => !matches!(prev, Some(b'<' | b'>' | b'=')),
                ">" => {
                    !matches!(next, Some(b'=' | b'>')) && !matches!(prev, Some(b'=' | b'-' | b'>'))
                }
                _ => next != Some(b'=') && !matches!(prev, Some(b'<')) && next != Some(b'<'),
            }
        });
        if let Some(pos) = hit {
            return Some((pos, op));
        }
    }
    None
}

/// Position of a bare `=` that is not part of a relational operator.
pub fn find_assignment(expr: &str) -> Option<usize> {
    let bytes = expr.as_bytes();
    find_top_level(expr, "=").into_iter().find(|&pos| {
        let prev = pos.checked_sub(1).map(|p| bytes[p]);
        let next = bytes.get(pos + 1).copied();
        !matches!(prev, Some(b'=' | b'!' | b'<' | b'>'))
            && next != Some(b'=')
            && next != Some(b'>')
    })
}

/// Number of `;` terminators outside quotes, at any depth.
pub fn count_terminators(expr: &str) -> usize {
    let mut count = 0;
    scan(expr, |i, _| {
        if expr.as_bytes()[i] == b';' {
            count += 1;
        }
        true
    });
    count
}

/// Whether `{` or `}` appear outside quotes.
pub fn has_block_syntax(expr: &str) -> bool {
    let mut found = false;
    scan(expr, |i, _| {
        if matches!(expr.as_bytes()[i], b'{' | b'}') {
            found = true;
            return false;
        }
        true
    });
    found
}

/// Removes quoted spans, keeping the quote characters.
pub fn without_quoted(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in expr.chars() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                    out.push(c);
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }
    out
}
