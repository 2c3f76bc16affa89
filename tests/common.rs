//! Common test utilities for building orchestration sources and bindings.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use tenkan::prelude::*;

pub const NAMESPACE: &str = "Contoso.Orders";
pub const FLOW_NAME: &str = "ProcessOrder";

static NEXT_OID: AtomicUsize = AtomicUsize::new(1);

/// A fresh designer object id.
pub fn oid() -> String {
    format!("oid-{:04}", NEXT_OID.fetch_add(1, Ordering::Relaxed))
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn prop(name: &str, value: &str) -> String {
    format!(
        "<om:Property Name=\"{}\" Value=\"{}\" />",
        name,
        escape(value)
    )
}

/// One `om:Element` with its properties and nested elements.
pub fn element(
    type_name: &str,
    oid: &str,
    parent_link: &str,
    props: &[(&str, &str)],
    children: &[String],
) -> String {
    let mut xml = format!(
        "<om:Element Type=\"{}\" OID=\"{}\" ParentLink=\"{}\">",
        type_name, oid, parent_link
    );
    for (name, value) in props {
        xml.push_str(&prop(name, value));
    }
    for child in children {
        xml.push_str(child);
    }
    xml.push_str("</om:Element>");
    xml
}

/// Wraps declarations and body statements into a complete source file.
pub fn odx(
    namespace: &str,
    name: &str,
    port_types: &[String],
    declarations: &[String],
    body: &[String],
) -> String {
    let service_body = element(
        "ServiceBody",
        &oid(),
        "ServiceDeclaration_ServiceBody",
        &[("Signal", "False")],
        body,
    );
    let mut service_children = declarations.to_vec();
    service_children.push(service_body);
    let service = element(
        "ServiceDeclaration",
        &oid(),
        "Module_ServiceDeclaration",
        &[("Name", name), ("IsInvokable", "True")],
        &service_children,
    );
    let mut module_children = port_types.to_vec();
    module_children.push(service);
    let module = element("Module", &oid(), "", &[("Name", namespace)], &module_children);

    format!(
        "namespace {ns}\n{{\n#if __DESIGNER_DATA\n#error Do not define __DESIGNER_DATA.\n\
         <om:MetaModel MajorVersion=\"1\" MinorVersion=\"3\" \
         xmlns:om=\"http://schemas.microsoft.com/BizTalk/2003/DesignerData\">\n{module}\n\
         </om:MetaModel>\n#endif // __DESIGNER_DATA\n    service {name} {{ }}\n}}\n",
        ns = namespace,
        module = module,
        name = name,
    )
}

/// Source for the default namespace and flow name.
pub fn orchestration(declarations: &[String], body: &[String]) -> String {
    odx(NAMESPACE, FLOW_NAME, &[], declarations, body)
}

pub fn parse(source: &str) -> ProcessFlow {
    parse_orchestration(source).expect("fixture should parse")
}

// --- Declarations ---

pub fn message_decl(name: &str, message_type: &str) -> String {
    element(
        "MessageDeclaration",
        &oid(),
        "ServiceDeclaration_MessageDeclaration",
        &[("Name", name), ("Type", message_type), ("ParamDirection", "In")],
        &[],
    )
}

pub fn variable_decl(name: &str, var_type: &str) -> String {
    element(
        "VariableDeclaration",
        &oid(),
        "ServiceDeclaration_VariableDeclaration",
        &[("Name", name), ("Type", var_type)],
        &[],
    )
}

pub fn port_type(name: &str, operation_type: &str) -> String {
    let operation = element(
        "OperationDeclaration",
        &oid(),
        "PortType_OperationDeclaration",
        &[("Name", "Operation_1"), ("OperationType", operation_type)],
        &[],
    );
    element(
        "PortType",
        &oid(),
        "Module_PortType",
        &[("Name", name)],
        &[operation],
    )
}

/// A port declaration; `physical` adds a physical binding with transport and URI.
pub fn port_decl(
    name: &str,
    port_type: &str,
    modifier: &str,
    physical: Option<(&str, &str)>,
) -> String {
    let binding = match physical {
        Some((transport, uri)) => element(
            "PhysicalBindingAttribute",
            &oid(),
            "PortDeclaration_WithBindingAttribute",
            &[("TransportType", transport), ("URI", uri)],
            &[],
        ),
        None => element(
            "LogicalBindingAttribute",
            &oid(),
            "PortDeclaration_WithBindingAttribute",
            &[],
            &[],
        ),
    };
    element(
        "PortDeclaration",
        &oid(),
        "ServiceDeclaration_PortDeclaration",
        &[("Name", name), ("Type", port_type), ("PortModifier", modifier)],
        &[binding],
    )
}

/// A correlation declaration; each ref is `(statement oid, initializes)`.
pub fn correlation_decl(name: &str, refs: &[(&str, bool)]) -> String {
    let statement_refs: Vec<String> = refs
        .iter()
        .map(|(target, initializes)| {
            element(
                "StatementRef",
                &oid(),
                "CorrelationDeclaration_StatementRef",
                &[
                    ("Ref", *target),
                    ("Initializes", if *initializes { "True" } else { "False" }),
                ],
                &[],
            )
        })
        .collect();
    element(
        "CorrelationDeclaration",
        &oid(),
        "ServiceDeclaration_CorrelationDeclaration",
        &[("Name", name), ("Type", "Contoso.Orders.OrderCorrelationType")],
        &statement_refs,
    )
}

// --- Statements ---

pub fn receive(oid: &str, name: &str, port: &str, message: &str, activate: bool) -> String {
    element(
        "Receive",
        oid,
        "ServiceBody_Statement",
        &[
            ("Name", name),
            ("PortName", port),
            ("MessageName", message),
            ("OperationName", "Operation_1"),
            ("Activate", if activate { "True" } else { "False" }),
        ],
        &[],
    )
}

pub fn send(name: &str, port: &str, message: &str) -> String {
    element(
        "Send",
        &oid(),
        "ServiceBody_Statement",
        &[
            ("Name", name),
            ("PortName", port),
            ("MessageName", message),
            ("OperationName", "Operation_1"),
        ],
        &[],
    )
}

pub fn transform(name: &str, class_name: &str, input: &str, output: &str) -> String {
    let input_ref = element(
        "MessagePartRef",
        &oid(),
        "Transform_InputMessagePartRef",
        &[("MessageRef", input)],
        &[],
    );
    let output_ref = element(
        "MessagePartRef",
        &oid(),
        "Transform_OutputMessagePartRef",
        &[("MessageRef", output)],
        &[],
    );
    element(
        "Transform",
        &oid(),
        "ServiceBody_Statement",
        &[("Name", name), ("ClassName", class_name)],
        &[input_ref, output_ref],
    )
}

pub fn message_assign(name: &str, expression: &str) -> String {
    element(
        "MessageAssignment",
        &oid(),
        "ComplexStatement_Statement",
        &[("Name", name), ("Expression", expression)],
        &[],
    )
}

pub fn construct(name: &str, constructed: &str, inner: &[String]) -> String {
    let mut children = vec![element(
        "MessageRef",
        &oid(),
        "Construct_MessageRef",
        &[("Ref", constructed)],
        &[],
    )];
    children.extend_from_slice(inner);
    element(
        "Construct",
        &oid(),
        "ServiceBody_Statement",
        &[("Name", name)],
        &children,
    )
}

pub fn variable_assign(name: &str, expression: &str) -> String {
    element(
        "VariableAssignment",
        &oid(),
        "ServiceBody_Statement",
        &[("Name", name), ("Expression", expression)],
        &[],
    )
}

/// A decision; each branch is `(expression, statements)`, an empty expression
/// marks the else branch.
pub fn decision(name: &str, branches: &[(&str, Vec<String>)]) -> String {
    let branch_elements: Vec<String> = branches
        .iter()
        .enumerate()
        .map(|(i, (expression, statements))| {
            let branch_name = format!("Branch_{}", i + 1);
            let mut props = vec![("Name", branch_name.as_str())];
            if !expression.is_empty() {
                props.push(("Expression", *expression));
            }
            element(
                "DecisionBranch",
                &oid(),
                "ReallyComplexStatement_Branch",
                &props,
                statements,
            )
        })
        .collect();
    element(
        "Decision",
        &oid(),
        "ServiceBody_Statement",
        &[("Name", name)],
        &branch_elements,
    )
}

pub fn while_loop(name: &str, expression: &str, body: &[String]) -> String {
    element(
        "While",
        &oid(),
        "ServiceBody_Statement",
        &[("Name", name), ("Expression", expression)],
        body,
    )
}

pub fn listen(name: &str, branches: &[Vec<String>]) -> String {
    let branch_elements: Vec<String> = branches
        .iter()
        .enumerate()
        .map(|(i, statements)| {
            let branch_name = format!("ListenBranch_{}", i + 1);
            element(
                "ListenBranch",
                &oid(),
                "ReallyComplexStatement_Branch",
                &[("Name", branch_name.as_str())],
                statements,
            )
        })
        .collect();
    element(
        "Listen",
        &oid(),
        "ServiceBody_Statement",
        &[("Name", name)],
        &branch_elements,
    )
}

pub fn parallel(name: &str, branches: &[Vec<String>]) -> String {
    let branch_elements: Vec<String> = branches
        .iter()
        .enumerate()
        .map(|(i, statements)| {
            let branch_name = format!("ParallelBranch_{}", i + 1);
            element(
                "ParallelBranch",
                &oid(),
                "ReallyComplexStatement_Branch",
                &[("Name", branch_name.as_str())],
                statements,
            )
        })
        .collect();
    element(
        "Parallel",
        &oid(),
        "ServiceBody_Statement",
        &[("Name", name)],
        &branch_elements,
    )
}

pub fn call(name: &str, invokee: &str) -> String {
    element(
        "Call",
        &oid(),
        "ServiceBody_Statement",
        &[("Name", name), ("Invokee", invokee)],
        &[],
    )
}

pub fn shape(type_name: &str, name: &str, props: &[(&str, &str)]) -> String {
    let mut all = vec![("Name", name)];
    all.extend_from_slice(props);
    element(type_name, &oid(), "ServiceBody_Statement", &all, &[])
}

// --- Canonical fixtures ---

/// One activating receive, a transform of its message, and a send of the result.
pub fn receive_transform_send() -> String {
    orchestration(
        &[
            message_decl("OrderIn", "Contoso.Orders.Schemas.Order"),
            message_decl("InvoiceOut", "Contoso.Orders.Schemas.Invoice"),
            port_decl("ReceiveOrders", "OrderPortType", "Implements", None),
            port_decl("SendInvoices", "InvoicePortType", "Uses", None),
        ],
        &[
            receive(&oid(), "Receive_Order", "ReceiveOrders", "OrderIn", true),
            transform(
                "Map_Order_To_Invoice",
                "Contoso.Orders.Maps.OrderToInvoice",
                "OrderIn",
                "InvoiceOut",
            ),
            send("Send_Invoice", "SendInvoices", "InvoiceOut"),
        ],
    )
}

pub fn transform_default(source: &str) -> Workflow {
    transform_source(source, &BindingSet::default(), &TransformOptions::default())
        .expect("fixture should transform")
}

/// Names of all actions in pre-order.
pub fn action_names(workflow: &Workflow) -> Vec<String> {
    workflow
        .flatten()
        .into_iter()
        .map(|a| a.name.clone())
        .collect()
}

pub fn sample_bindings_json() -> &'static str {
    r#"{
        "receiveLocations": [
            {
                "name": "Orders_File_In",
                "receivePort": "OrdersIn",
                "transportType": "FILE",
                "address": "C:\\Drop\\Orders\\*.xml",
                "pollingInterval": "PT1M"
            },
            {
                "name": "Orders_Http_In",
                "receivePort": "OrdersIn",
                "transportType": "WCF-WebHttp",
                "address": "https://contoso.example/orders",
                "enabled": false
            },
            {
                "name": "Partners_As2_In",
                "receivePort": "PartnersIn",
                "transportType": "HTTP",
                "address": "https://contoso.example/as2/edi",
                "pipeline": "EdiReceivePipeline"
            }
        ],
        "sendPorts": [
            {
                "name": "Archive",
                "transportType": "FILE",
                "address": "C:\\Archive\\%MessageID%.xml",
                "filters": [
                    { "property": "BTS.ReceivePortName", "operator": "==", "value": "OrdersIn" }
                ]
            },
            {
                "name": "Erp",
                "transportType": "WCF-SQL",
                "address": "mssql://erp/orders",
                "transforms": ["Contoso.Maps.OrderToErp"],
                "filters": [
                    { "property": "BTS.ReceivePortName", "operator": "==", "value": "PartnersIn" }
                ]
            },
            {
                "name": "Orphan",
                "transportType": "SFTP",
                "address": "sftp://partner/outbox",
                "filters": [
                    { "property": "BTS.ReceivePortName", "operator": "==", "value": "Nowhere" }
                ]
            }
        ]
    }"#
}

/// Scratch directory for tests that write files.
pub fn setup_test_dir() -> std::path::PathBuf {
    std::env::temp_dir().join("tenkan_tests")
}
