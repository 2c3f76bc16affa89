//! Naming heuristics shared by the expression translator and variable hoisting.

use crate::workflow::VariableType;

/// Suffixes that mark an identifier as an exception object.
const EXCEPTION_SUFFIXES: &[&str] = &["Exception", "Exc", "Ex", "Fault", "Err"];

/// Names that are exception objects on their own.
const EXCEPTION_NAMES: &[&str] = &["e", "ex", "exc", "exception", "err", "fault"];

/// Leading segments that never denote a message or variable.
pub const NON_MESSAGE_ROOTS: &[&str] = &[
    "System",
    "Microsoft",
    "BTS",
    "FILE",
    "FTP",
    "SFTP",
    "HTTP",
    "SOAP",
    "WCF",
    "MSMQ",
    "SMTP",
    "POP3",
    "EDI",
    "EdiOverride",
    "XMLNORM",
    "ErrorReport",
    "Math",
    "String",
    "DateTime",
    "TimeSpan",
    "Convert",
    "Guid",
    "Environment",
];

/// Whether an identifier (or the first segment of a dotted path) names an exception.
///
/// Matches `e` followed by an uppercase letter (`eSoap`), a recognized
/// exception suffix (`soapFault`, `timeoutEx`), or a conventional bare name.
pub fn is_exception_identifier(name: &str) -> bool {
    let first = name.split('.').next().unwrap_or(name).trim();
    if first.is_empty() {
        return false;
    }
    if EXCEPTION_NAMES.contains(&first.to_ascii_lowercase().as_str()) {
        return true;
    }
    let mut chars = first.chars();
    if chars.next() == Some('e') && chars.next().is_some_and(|c| c.is_ascii_uppercase()) {
        return true;
    }
    EXCEPTION_SUFFIXES
        .iter()
        .any(|suffix| first.len() > suffix.len() && first.ends_with(suffix))
}

/// Whether dotted segments spell a fully-qualified type or constant.
///
/// Three or more segments where all but the last start uppercase, or any path
/// rooted in a known non-message namespace.
pub fn is_qualified_constant(segments: &[&str]) -> bool {
    if segments.len() < 2 {
        return false;
    }
    if NON_MESSAGE_ROOTS.contains(&segments[0]) {
        return true;
    }
    segments.len() >= 3
        && segments[..segments.len() - 1]
            .iter()
            .all(|s| s.chars().next().is_some_and(|c| c.is_ascii_uppercase()))
}

/// Infers a target type from a variable name, checked boolean, integer,
/// array, object, then string.
pub fn infer_variable_type(name: &str) -> VariableType {
    let lower = name.to_ascii_lowercase();

    let camel_prefix = |prefix: &str| {
        name.strip_prefix(prefix)
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_ascii_uppercase() || c == '_')
    };
    if ["is", "has", "can", "should", "was", "b"]
        .iter()
        .any(|p| camel_prefix(p))
        || ["flag", "enabled", "success", "found", "done"]
            .iter()
            .any(|k| lower.contains(k))
    {
        return VariableType::Boolean;
    }

    if ["i", "j", "k", "n"].contains(&lower.as_str())
        || ["count", "index", "idx", "counter", "retry", "retries", "attempt", "total", "num"]
            .iter()
            .any(|k| lower.contains(k))
    {
        return VariableType::Integer;
    }

    if ["list", "array", "items", "collection"]
        .iter()
        .any(|k| lower.ends_with(k))
    {
        return VariableType::Array;
    }

    if ["obj", "dict", "map", "doc", "xml", "json", "record", "config"]
        .iter()
        .any(|k| lower.contains(k))
    {
        return VariableType::Object;
    }

    VariableType::String
}

/// Maps a declared source type onto a target variable type.
pub fn declared_variable_type(var_type: &str) -> Option<VariableType> {
    let full = var_type.trim().to_ascii_lowercase();
    if full.contains("arraylist") || full.contains("list`") || full.ends_with("[]") {
        return Some(VariableType::Array);
    }
    let short = var_type
        .trim()
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    let mapped = match short.as_str() {
        "boolean" | "bool" => VariableType::Boolean,
        "int16" | "int32" | "int64" | "int" | "long" | "short" | "byte" | "uint32" => {
            VariableType::Integer
        }
        "double" | "single" | "decimal" | "float" => VariableType::Float,
        "string" | "char" | "datetime" | "guid" | "timespan" => VariableType::String,
        "arraylist" | "list" | "array" | "stringcollection" => VariableType::Array,
        "" => return None,
        _ => VariableType::Object,
    };
    Some(mapped)
}

/// Turns a display name into a target action name.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let collapsed = cleaned
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if collapsed.is_empty() {
        "Action".to_string()
    } else {
        collapsed
    }
}
