use crate::workflow::ConnectorKind;

/// Ordered substring/prefix tests, most specific first.
///
/// Each rule is `(kind, transport needles, address prefixes)`. The first rule
/// where any needle occurs in the lowercased transport, or any prefix starts
/// the lowercased address, wins.
const CONNECTOR_RULES: &[(ConnectorKind, &[&str], &[&str])] = &[
    (ConnectorKind::Sql, &["wcf-sql", "sql"], &["mssql://"]),
    (ConnectorKind::Oracle, &["wcf-oracle", "oracle"], &["oracledb://", "oracle://"]),
    (ConnectorKind::Db2, &["db2"], &["db2://"]),
    (ConnectorKind::Sap, &["wcf-sap", "sap"], &["sap://"]),
    (ConnectorKind::IbmMq, &["mqseries", "mqsc", "websphere mq", "ibm mq"], &["mq://"]),
    (ConnectorKind::Sftp, &["sftp"], &["sftp://"]),
    (ConnectorKind::Ftp, &["ftp"], &["ftp://", "ftps://"]),
    (ConnectorKind::FileSystem, &["file"], &["file://", "\\\\"]),
    (ConnectorKind::Smtp, &["smtp"], &["mailto:"]),
    (ConnectorKind::Pop3, &["pop3"], &["pop3://"]),
    (ConnectorKind::As2, &["as2"], &[]),
    (ConnectorKind::EventHub, &["eventhub", "event hub"], &[]),
    (
        ConnectorKind::ServiceBus,
        &["sb-messaging", "servicebus", "service bus", "msmq", "netmsmq"],
        &["sb://", "net.msmq://"],
    ),
    (ConnectorKind::Soap, &["soap", "wcf-basichttp", "wcf-wshttp"], &[]),
    (ConnectorKind::Http, &["http", "webhttp"], &["http://", "https://"]),
    (ConnectorKind::Soap, &["wcf"], &["net.tcp://", "net.pipe://"]),
];

/// Infers the connector kind from transport type and address.
///
/// A mainframe subsystem hint from binding metadata short-circuits the rules.
pub fn infer_connector(
    transport: Option<&str>,
    address: Option<&str>,
    subsystem_hint: Option<&str>,
) -> ConnectorKind {
    if let Some(kind) = subsystem_hint.and_then(subsystem_connector) {
        return kind;
    }

    let transport = transport.unwrap_or("").to_ascii_lowercase();
    let address = address.unwrap_or("").to_ascii_lowercase();
    CONNECTOR_RULES
        .iter()
        .find(|(_, needles, prefixes)| {
            (!transport.is_empty() && needles.iter().any(|n| transport.contains(n)))
                || (!address.is_empty() && prefixes.iter().any(|p| address.starts_with(p)))
        })
        .map(|(kind, _, _)| *kind)
        .unwrap_or(ConnectorKind::Generic)
}

fn subsystem_connector(hint: &str) -> Option<ConnectorKind> {
    match hint.trim().to_ascii_lowercase().as_str() {
        "cics" => Some(ConnectorKind::Cics),
        "ims" => Some(ConnectorKind::Ims),
        "hostfile" | "host file" | "vsam" => Some(ConnectorKind::HostFile),
        _ => None,
    }
}

/// Whether an adapter address or pipeline carries a store-and-forward EDI envelope.
///
/// Markers must be whole words of the address or pipeline name, so `credit`
/// or `Media` never count.
pub fn is_edi_envelope(address: Option<&str>, pipeline: Option<&str>) -> bool {
    [address, pipeline]
        .into_iter()
        .flatten()
        .flat_map(words)
        .any(|word| matches!(word.as_str(), "edi" | "x12" | "edifact"))
}

/// Lowercased words split on punctuation and camel-case boundaries. Digits
/// stay with the word before them and an acronym ends before a capitalized
/// word (`EDIReceive` gives `edi`, `receive`).
fn words(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_ascii_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_lower);
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c.to_ascii_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
