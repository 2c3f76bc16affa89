//! Orchestration parser.
//!
//! Reads a raw orchestration file, extracts the designer metadata block that
//! sits between [`START_MARKER`] and [`END_SENTINEL`], and builds a
//! [`ProcessFlow`] by recursive descent over its XML elements. Correlation
//! statement references are resolved only after the whole tree exists.

use crate::error::MalformedSource;
use crate::model::{
    BindingKind, MessageDecl, MessageDirection, NodeKind, OperationDecl, OperationKind, PortDecl,
    PortDirection, PortTypeDecl, ProcessFlow, ProcessNode,
};
use ahash::AHashMap;

mod correlation;
mod element;
mod shapes;

use element::Element;
use shapes::ShapeBuilder;

pub const START_MARKER: &str = "#if __DESIGNER_DATA";
pub const END_SENTINEL: &str = "#endif // __DESIGNER_DATA";

/// Parses a complete orchestration file into a process-flow model.
pub fn parse_orchestration(content: &str) -> Result<ProcessFlow, MalformedSource> {
    let metadata = extract_designer_data(content)?;
    let document = roxmltree::Document::parse(&metadata)
        .map_err(|e| MalformedSource::InvalidMetadata(e.to_string()))?;

    let root = document.root_element();
    if root.tag_name().name() != "MetaModel" {
        return Err(MalformedSource::InvalidMetadata(format!(
            "expected a MetaModel root element, found '{}'",
            root.tag_name().name()
        )));
    }

    let model = Element::new(root);
    let module = model.find_descendant("Module");
    let service = model
        .find_descendant("ServiceDeclaration")
        .ok_or(MalformedSource::MissingFlowName)?;
    let name = service.text("Name");
    if name.is_empty() {
        return Err(MalformedSource::MissingFlowName);
    }
    let namespace = module.map(|m| m.text("Name")).unwrap_or_default();
    let qualified_name = if namespace.is_empty() {
        name.clone()
    } else {
        format!("{}.{}", namespace, name)
    };

    let port_types: Vec<PortTypeDecl> = module
        .map(|m| m.elements_of_type("PortType").map(parse_port_type).collect())
        .unwrap_or_default();
    let port_type_lookup: AHashMap<&str, &PortTypeDecl> =
        port_types.iter().map(|p| (p.name.as_str(), p)).collect();

    let messages = service
        .elements_of_type("MessageDeclaration")
        .map(parse_message)
        .collect();
    let ports = service
        .elements_of_type("PortDeclaration")
        .map(|p| parse_port(p, &port_type_lookup))
        .collect();

    let mut builder = ShapeBuilder::new();
    let declarations = service.elements().filter(|e| {
        matches!(
            e.type_name(),
            "VariableDeclaration" | "CorrelationDeclaration"
        )
    });
    let mut nodes = builder.build_statements(declarations, None);
    if let Some(body) = service.elements_of_type("ServiceBody").next() {
        let offset = nodes.len() as u32;
        let mut statements = builder.build_statements(body.elements(), None);
        for node in &mut statements {
            node.sequence += offset;
        }
        nodes.extend(statements);
    }
    nodes.sort_by_key(|n| n.sequence);

    let mut flow = ProcessFlow {
        name,
        qualified_name,
        namespace,
        messages,
        port_types,
        ports,
        nodes,
    };
    correlation::resolve_correlations(&mut flow, &builder.id_table);

    tracing::debug!(
        flow = %flow.qualified_name,
        messages = flow.messages.len(),
        roots = flow.nodes.len(),
        nodes = flow.node_count(),
        "Parsed orchestration"
    );
    Ok(flow)
}

/// Returns the XML text enclosed by the designer data anchors.
///
/// Preprocessor lines inside the block (`#error ...`) are dropped.
pub fn extract_designer_data(content: &str) -> Result<String, MalformedSource> {
    let start = content
        .find(START_MARKER)
        .ok_or(MalformedSource::MissingStartMarker(START_MARKER))?;
    let body_start = start + START_MARKER.len();
    let end = content[body_start..]
        .find(END_SENTINEL)
        .map(|offset| body_start + offset)
        .ok_or(MalformedSource::MissingEndSentinel(END_SENTINEL))?;

    let block: String = content[body_start..end]
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");
    let trimmed = block.trim();
    if trimmed.is_empty() {
        return Err(MalformedSource::InvalidMetadata(
            "designer data block is empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn parse_message(element: Element) -> MessageDecl {
    let direction = match element.text("ParamDirection").as_str() {
        "In" => MessageDirection::In,
        "Out" => MessageDirection::Out,
        _ => MessageDirection::None,
    };
    MessageDecl {
        name: element.text("Name"),
        message_type: element.text("Type"),
        direction,
    }
}

fn parse_port_type(element: Element) -> PortTypeDecl {
    let operations = element
        .elements_of_type("OperationDeclaration")
        .map(|op| {
            let kind = match op.text("OperationType").as_str() {
                "RequestResponse" => OperationKind::RequestResponse,
                "SolicitResponse" => OperationKind::SolicitResponse,
                _ => OperationKind::OneWay,
            };
            OperationDecl {
                name: op.text("Name"),
                kind,
                message_types: op
                    .elements_of_type("MessageRef")
                    .map(|m| m.text("Ref"))
                    .filter(|r| !r.is_empty())
                    .collect(),
            }
        })
        .collect();
    PortTypeDecl {
        name: element.text("Name"),
        operations,
    }
}

fn parse_port(element: Element, port_types: &AHashMap<&str, &PortTypeDecl>) -> PortDecl {
    let port_type = element.text("Type");
    let short_type = port_type.rsplit('.').next().unwrap_or(&port_type);
    let request_response = port_types
        .get(port_type.as_str())
        .or_else(|| port_types.get(short_type))
        .is_some_and(|pt| pt.is_request_response());

    let direction = match (element.text("PortModifier").as_str(), request_response) {
        ("Implements", false) => PortDirection::Receive,
        ("Uses", false) => PortDirection::Send,
        ("Implements", true) => PortDirection::ReceiveSend,
        ("Uses", true) => PortDirection::SendReceive,
        _ => PortDirection::None,
    };

    let binding = element
        .elements()
        .find(|e| e.type_name().ends_with("BindingAttribute"));
    let binding_kind = match binding.map(|b| b.type_name()) {
        Some("LogicalBindingAttribute") => BindingKind::Logical,
        Some("PhysicalBindingAttribute") => BindingKind::Physical,
        Some("DirectBindingAttribute") => BindingKind::Direct,
        Some("DynamicBindingAttribute") => BindingKind::Dynamic,
        _ => BindingKind::Unspecified,
    };

    let non_empty = |value: String| if value.is_empty() { None } else { Some(value) };
    let transport = binding.and_then(|b| non_empty(b.text("TransportType")));
    let address = binding.and_then(|b| non_empty(b.text("URI")));
    let pipeline = binding.and_then(|b| {
        non_empty(b.text("InPipeline")).or_else(|| non_empty(b.text("OutPipeline")))
    });

    let (file_folder, file_mask) = match (&transport, &address) {
        (Some(t), Some(a)) if t.to_ascii_lowercase().contains("file") => split_file_pattern(a),
        _ => (None, None),
    };

    PortDecl {
        name: element.text("Name"),
        port_type,
        direction,
        binding_kind,
        transport,
        address,
        pipeline,
        file_folder,
        file_mask,
    }
}

/// Splits a file adapter address such as `C:\In\*.xml` into folder and mask.
pub fn split_file_pattern(address: &str) -> (Option<String>, Option<String>) {
    let path = address.strip_prefix("file://").unwrap_or(address);
    match path.rfind(['\\', '/']) {
        Some(pos) => {
            let (folder, mask) = (&path[..pos], &path[pos + 1..]);
            let mask = (!mask.is_empty()).then(|| mask.to_string());
            (Some(folder.to_string()), mask)
        }
        None if path.contains('*') => (None, Some(path.to_string())),
        None => (Some(path.to_string()), None),
    }
}

/// Counts nodes of a given kind name anywhere in the flow.
pub fn count_kind(flow: &ProcessFlow, kind: &str) -> usize {
    let mut count = 0;
    flow.walk(&mut |node: &ProcessNode| {
        if node.kind.name() == kind
            || matches!(&node.kind, NodeKind::Fallback { raw_kind } if raw_kind == kind)
        {
            count += 1;
        }
    });
    count
}
