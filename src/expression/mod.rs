//! Expression translator.
//!
//! Converts one imperative source expression into the target workflow
//! expression language. Recognizers run in a fixed priority order and every
//! sub-expression re-enters the same chain. Translation never fails: anything
//! that cannot be expressed degrades to a single-quoted literal of the
//! original text.

use ahash::AHashSet;
use regex::Regex;
use std::sync::LazyLock;

pub mod naming;
pub mod scan;

use naming::{is_exception_identifier, is_qualified_constant};

/// Nesting guard for pathological inputs.
const MAX_DEPTH: usize = 48;

static CONTROL_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(if|while|for|foreach|switch|catch|lock|using)\s*\(").expect("valid regex")
});
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));
static DOTTED_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)+$").expect("valid regex")
});
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?([mMdDfFlL])?$").expect("valid regex"));
static PROMOTED_PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*\(\s*([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)+)\s*\)$")
        .expect("valid regex")
});
static NOW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(System\.)?DateTime\.(Now|UtcNow)(\(\))?$").expect("valid regex")
});
static NEW_GUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(System\.)?Guid\.NewGuid\(\)(\.ToString\(\))?$").expect("valid regex")
});
static XPATH_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^xpath\s*\((.*)\)$").expect("valid regex"));
static UNARY_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)\.(ToString|Trim|ToUpper|ToUpperInvariant|ToLower|ToLowerInvariant)\(\s*\)$")
        .expect("valid regex")
});
static LIST_ADD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)\.Add\((.*)\)$").expect("valid regex"));
static TYPE_CAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\(\s*[A-Za-z_][A-Za-z0-9_.]*(\[\])?\s*\)\s*([A-Za-z0-9_(\x22'!].*)$")
        .expect("valid regex")
});
/// A parenthesized type name with nothing after it to cast.
static CAST_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\(\s*(System\.[A-Za-z0-9_.]+|int|uint|long|short|byte|bool|string|double|float|decimal|char|object)(\[\])?\s*\)$",
    )
    .expect("valid regex")
});
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("valid regex"));

/// Words that are never variable references.
const KEYWORDS: &[&str] = &[
    "true", "false", "null", "new", "typeof", "this", "not", "and", "or", "var", "return", "else",
    "is", "as", "default",
];

/// Names known to be flow variables, compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSet {
    names: AHashSet<String>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the name was not present yet.
    pub fn insert(&mut self, name: &str) -> bool {
        self.names.insert(name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for VariableSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = VariableSet::new();
        for name in iter {
            set.insert(name.as_ref());
        }
        set
    }
}

/// Result of translating one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub expression: String,
    /// The whole input was kept as a literal for manual review.
    pub degraded: bool,
}

/// Translates source expressions against a fixed set of known variables.
pub struct ExpressionTranslator<'v> {
    variables: &'v VariableSet,
    messages: Option<&'v VariableSet>,
}

impl<'v> ExpressionTranslator<'v> {
    pub fn new(variables: &'v VariableSet) -> Self {
        Self {
            variables,
            messages: None,
        }
    }

    /// Declared message names; path queries over them read the message body.
    pub fn with_messages(mut self, messages: &'v VariableSet) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Translates `expression`, returning a literal of the trimmed input when
    /// no recognizer applies.
    pub fn translate(&self, expression: &str) -> String {
        self.translate_checked(expression).expression
    }

    /// Like [`ExpressionTranslator::translate`], also reporting whether the
    /// result is a literal fallback.
    pub fn translate_checked(&self, expression: &str) -> Translation {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Translation {
                expression: literal(""),
                degraded: false,
            };
        }
        match self.convert_statement(trimmed) {
            Some(expression) => Translation {
                expression,
                degraded: false,
            },
            None => {
                tracing::debug!(expression = trimmed, "Expression kept as literal");
                Translation {
                    expression: literal(trimmed),
                    degraded: true,
                }
            }
        }
    }

    fn convert_statement(&self, trimmed: &str) -> Option<String> {
        if trimmed.contains(['\n', '\r']) {
            return None;
        }
        let body = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
        if is_prose(body) || CAST_ONLY.is_match(body) {
            return None;
        }
        self.convert(body, 0)
    }

    /// Runs the recognizer chain. `None` means the caller should fall back to
    /// a literal.
    fn convert(&self, expr: &str, depth: usize) -> Option<String> {
        if depth > MAX_DEPTH {
            return None;
        }
        let expr = scan::strip_outer_parens(expr);
        if expr.is_empty() || !scan::is_balanced(expr) {
            return None;
        }

        if let Some(logical) = self.logical(expr, depth) {
            return Some(logical);
        }
        if let Some(relational) = self.relational(expr, depth) {
            return Some(relational);
        }
        if scan::find_assignment(expr).is_some() {
            return None;
        }
        if let Some(arithmetic) = self.concatenation(expr, depth) {
            return Some(arithmetic);
        }
        if let Some(rest) = expr.strip_prefix('!') {
            if !rest.trim().is_empty() {
                return Some(format!("not({})", self.operand(rest, depth)));
            }
        }
        if let Some(call) = self.method_call(expr, depth) {
            return Some(call);
        }
        if let Some(caps) = PROMOTED_PROPERTY.captures(expr) {
            let message = &caps[1];
            let property = caps[2].rsplit('.').next().unwrap_or(&caps[2]);
            return Some(format!("variables('{}')?['{}']", message, property));
        }
        if DOTTED_PATH.is_match(expr) {
            return Some(self.dotted_path(expr));
        }
        if let Some(value) = literal_value(expr) {
            return Some(value);
        }
        if IDENTIFIER.is_match(expr) {
            if is_exception_identifier(expr) {
                return Some(literal(expr));
            }
            return Some(format!("variables('{}')", expr));
        }
        None
    }

    /// `||` binds looser than `&&`; both fold to the right.
    fn logical(&self, expr: &str, depth: usize) -> Option<String> {
        for (op, function) in [("||", "or"), ("&&", "and")] {
            let parts = scan::split_top_level(expr, op);
            if parts.len() >= 2 {
                if parts.iter().any(|p| clean_operand(p).is_empty()) {
                    return None;
                }
                let operands: Vec<String> =
                    parts.iter().map(|p| self.operand(p, depth)).collect();
                return Some(fold_right(function, &operands));
            }
        }
        None
    }

    fn relational(&self, expr: &str, depth: usize) -> Option<String> {
        let (pos, op) = scan::find_relational(expr)?;
        let (left, right) = (&expr[..pos], &expr[pos + op.len()..]);
        if clean_operand(left).is_empty() || clean_operand(right).is_empty() {
            return None;
        }
        let left = self.operand(left, depth);
        let right = self.operand(right, depth);
        let translated = match op {
            "==" => format!("equals({}, {})", left, right),
            "!=" => format!("not(equals({}, {}))", left, right),
            ">=" => format!("greaterOrEquals({}, {})", left, right),
            "<=" => format!("lessOrEquals({}, {})", left, right),
            ">" => format!("greater({}, {})", left, right),
            _ => format!("less({}, {})", left, right),
        };
        Some(translated)
    }

    /// `+` with a quoted operand is string concatenation, otherwise addition.
    fn concatenation(&self, expr: &str, depth: usize) -> Option<String> {
        let parts = concatenation_operands(expr);
        if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        let operands: Vec<String> = parts.iter().map(|p| self.operand(p, depth)).collect();
        let textual = parts
            .iter()
            .any(|p| matches!(clean_operand(p).chars().next(), Some('"' | '\'')));
        if textual {
            return Some(format!("concat({})", operands.join(", ")));
        }
        let mut folded = operands[0].clone();
        for operand in &operands[1..] {
            folded = format!("add({}, {})", folded, operand);
        }
        Some(folded)
    }

    fn method_call(&self, expr: &str, depth: usize) -> Option<String> {
        if NOW.is_match(expr) {
            return Some("utcNow()".to_string());
        }
        if NEW_GUID.is_match(expr) {
            return Some("guid()".to_string());
        }
        if let Some(caps) = XPATH_CALL.captures(expr) {
            let args = scan::split_top_level(&caps[1], ",");
            if let [message, query] = args.as_slice() {
                let message = clean_operand(message);
                let source = if self.is_message(message) {
                    format!("body('{}')", message)
                } else {
                    self.operand(message, depth)
                };
                return Some(format!(
                    "xpath(xml({}), {})",
                    source,
                    self.operand(query, depth)
                ));
            }
            return None;
        }
        if let Some(caps) = UNARY_METHOD.captures(expr) {
            let receiver = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            if !scan::is_balanced(receiver) {
                return None;
            }
            let function = match &caps[2] {
                "ToString" => "string",
                "Trim" => "trim",
                "ToUpper" | "ToUpperInvariant" => "toUpper",
                _ => "toLower",
            };
            return Some(format!("{}({})", function, self.operand(receiver, depth)));
        }
        if let Some(caps) = LIST_ADD.captures(expr) {
            let (list, item) = (&caps[1], &caps[2]);
            if !scan::is_balanced(list) || !scan::is_balanced(item) || item.trim().is_empty() {
                return None;
            }
            return Some(format!(
                "union({}, createArray({}))",
                self.operand(list, depth),
                self.operand(item, depth)
            ));
        }
        None
    }

    fn is_message(&self, name: &str) -> bool {
        IDENTIFIER.is_match(name)
            && !self.variables.contains(name)
            && self.messages.is_some_and(|m| m.contains(name))
    }

    fn dotted_path(&self, expr: &str) -> String {
        let segments: Vec<&str> = expr.split('.').collect();
        if is_exception_identifier(segments[0]) {
            return literal(expr);
        }
        if is_qualified_constant(&segments) {
            return literal(segments[segments.len() - 1]);
        }
        let lookup = if self.variables.contains(segments[0]) {
            format!("variables('{}')", segments[0])
        } else {
            format!("body('{}')", segments[0])
        };
        segments[1..]
            .iter()
            .fold(lookup, |acc, segment| format!("{}?['{}']", acc, segment))
    }

    /// Cleans an operand left over from splitting and re-enters the chain.
    fn operand(&self, raw: &str, depth: usize) -> String {
        let cleaned = clean_operand(raw);
        self.convert(cleaned, depth + 1)
            .unwrap_or_else(|| literal(cleaned))
    }
}

/// Translates one expression with a throwaway translator.
pub fn translate(expression: &str, variables: &VariableSet) -> String {
    ExpressionTranslator::new(variables).translate(expression)
}

/// Wraps text as a target string literal.
pub fn literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Operands of a top-level `+`, ignoring any `+` inside quotes or brackets.
pub fn concatenation_operands(expr: &str) -> Vec<&str> {
    let positions: Vec<usize> = scan::find_top_level(expr, "+")
        .into_iter()
        .filter(|&pos| {
            let bytes = expr.as_bytes();
            bytes.get(pos + 1) != Some(&b'+')
                && bytes.get(pos + 1) != Some(&b'=')
                && pos.checked_sub(1).map(|p| bytes[p]) != Some(b'+')
        })
        .collect();
    let mut parts = Vec::with_capacity(positions.len() + 1);
    let mut start = 0;
    for pos in positions {
        parts.push(expr[start..pos].trim());
        start = pos + 1;
    }
    parts.push(expr[start..].trim());
    parts
}

/// Target name of an assignment statement such as `count = count + 1`.
pub fn assignment_target(expr: &str) -> Option<&str> {
    let pos = scan::find_assignment(expr)?;
    let target = expr[..pos]
        .trim_end()
        .trim_end_matches(['+', '-', '*', '/'])
        .trim();
    IDENTIFIER.is_match(target).then_some(target)
}

/// Bare identifiers used as standalone operands, outside quotes and not part
/// of a dotted path or call.
pub fn standalone_identifiers(expr: &str) -> Vec<String> {
    let stripped = scan::without_quoted(expr);
    let bytes = stripped.as_bytes();
    let mut names: Vec<String> = Vec::new();
    for m in WORD.find_iter(&stripped) {
        let before = m.start().checked_sub(1).map(|p| bytes[p]);
        let after = stripped[m.end()..].trim_start().bytes().next();
        let attached = matches!(before, Some(b'.' | b'\'' | b'"'))
            || matches!(after, Some(b'.' | b'(' | b'[' | b'\'' | b'"'));
        let word = m.as_str();
        let numeric_suffix = before.is_some_and(|b| b.is_ascii_digit());
        if attached
            || numeric_suffix
            || KEYWORDS.contains(&word.to_ascii_lowercase().as_str())
            || names.iter().any(|n| n.eq_ignore_ascii_case(word))
        {
            continue;
        }
        names.push(word.to_string());
    }
    names
}

fn is_prose(body: &str) -> bool {
    if scan::has_block_syntax(body) || scan::count_terminators(body) > 0 {
        return true;
    }
    CONTROL_KEYWORD.is_match(&scan::without_quoted(body))
}

fn fold_right(function: &str, operands: &[String]) -> String {
    match operands {
        [] => String::new(),
        [single] => single.clone(),
        [first, rest @ ..] => format!("{}({}, {})", function, first, fold_right(function, rest)),
    }
}

/// Strips stray punctuation, unbalanced edge parentheses and a leading type
/// cast from a split operand.
fn clean_operand(raw: &str) -> &str {
    let mut current = raw.trim().trim_matches([',', ';']).trim();
    while current.starts_with('(') && !scan::is_balanced(current) {
        current = current[1..].trim_start();
    }
    while current.ends_with(')') && !scan::is_balanced(current) {
        current = current[..current.len() - 1].trim_end();
    }
    if let Some(caps) = TYPE_CAST.captures(current) {
        if let Some(rest) = caps.get(2) {
            if scan::is_balanced(rest.as_str()) {
                return rest.as_str().trim();
            }
        }
    }
    current
}

/// String, number, boolean and null literals in target syntax.
fn literal_value(expr: &str) -> Option<String> {
    if let Some(text) = quoted_content(expr) {
        return Some(literal(&text));
    }
    if NUMBER.is_match(expr) {
        return Some(
            expr.trim_end_matches(['m', 'M', 'd', 'D', 'f', 'F', 'l', 'L'])
                .to_string(),
        );
    }
    match expr.to_ascii_lowercase().as_str() {
        "true" => Some("true".to_string()),
        "false" => Some("false".to_string()),
        "null" => Some("null".to_string()),
        _ => None,
    }
}

/// Content of a single quoted span covering the whole input, unescaped.
fn quoted_content(expr: &str) -> Option<String> {
    let quote = expr.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = expr.strip_prefix(quote)?.strip_suffix(quote)?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => return None,
            },
            c if c == quote => return None,
            c => out.push(c),
        }
    }
    Some(out)
}
