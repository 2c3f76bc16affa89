//! Tests for lowering process flows into workflows.
mod common;
use common::*;
use tenkan::model::NodeKind;
use tenkan::prelude::*;
use tenkan::transformer::{UnitContext, VariableOrigin, hoist_variables};
use tenkan::workflow::{ConnectorKind, TRIGGER_SOURCE, TriggerKind, VariableType};

fn hoisting_fixture() -> String {
    orchestration(
        &[
            variable_decl("Total", "System.Decimal"),
            variable_decl("total", "System.Int32"),
            variable_decl("eSoap", "System.Web.Services.Protocols.SoapException"),
        ],
        &[
            variable_assign("Bump", "counter = counter + 1;\nflag = true;"),
            while_loop(
                "Poll",
                "retries < 3 && !isDone",
                &[variable_assign("Retry", "retries += 1")],
            ),
        ],
    )
}

#[test]
fn test_hoisting_dedupes_and_synthesizes() {
    let flow = parse(&hoisting_fixture());
    let hoisted = hoist_variables(&flow);

    let names: Vec<&str> = hoisted.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["Total", "counter", "flag", "retries", "isDone"]);

    assert_eq!(hoisted[0].origin, VariableOrigin::Declared);
    assert_eq!(hoisted[0].var_type, VariableType::Float);
    assert!(hoisted[1..].iter().all(|v| v.origin == VariableOrigin::Synthesized));
    assert_eq!(hoisted[1].var_type, VariableType::Integer);
    assert_eq!(hoisted[2].var_type, VariableType::Boolean);
    assert_eq!(hoisted[4].var_type, VariableType::Boolean);
}

#[test]
fn test_hoisting_is_idempotent() {
    let flow = parse(&hoisting_fixture());
    assert_eq!(hoist_variables(&flow), hoist_variables(&flow));
}

#[test]
fn test_hoisting_reads_every_expression_bearing_shape() {
    let flow = parse(&orchestration(
        &[
            message_decl("OrderIn", "Contoso.Orders.Schemas.Order"),
            message_decl("OrderOut", "Contoso.Orders.Schemas.Order"),
        ],
        &[
            receive(&oid(), "Receive_Order", "ReceiveOrders", "OrderIn", true),
            decision(
                "Check_Approval",
                &[
                    (
                        "approved == true",
                        vec![shape(
                            "Delay",
                            "Hold",
                            &[("Timeout", "TimeSpan.FromMinutes(waitMinutes)")],
                        )],
                    ),
                    ("", vec![]),
                ],
            ),
            construct(
                "Build_Out",
                "OrderOut",
                &[message_assign(
                    "Copy",
                    "OrderOut = OrderIn; // copy the body\nOrderOut(Contoso.Priority) = priorityLevel;",
                )],
            ),
        ],
    ));

    let hoisted = hoist_variables(&flow);
    let names: Vec<&str> = hoisted.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["approved", "waitMinutes", "priorityLevel"]);
    assert!(hoisted.iter().all(|v| v.origin == VariableOrigin::Synthesized));

    let workflow = Transformer::builder(flow).build().transform();
    assert!(workflow.variables.contains("approved"));
    assert!(workflow.find_action("Initialize_approved").is_some());
    let condition = workflow.find_action("Check_Approval").expect("condition");
    assert_eq!(condition.details, "equals(variables('approved'), true)");
}

#[test]
fn test_initializers_come_first() {
    let workflow = transform_default(&hoisting_fixture());

    let initializers: Vec<&Action> = workflow
        .actions
        .iter()
        .take_while(|a| a.kind == ActionKind::InitializeVariable)
        .collect();
    assert_eq!(initializers.len(), 5);
    assert_eq!(initializers[0].name, "Initialize_Total");
    assert_eq!(initializers[0].details, "0.0");
    assert_eq!(initializers[2].variable_name.as_deref(), Some("flag"));
    assert_eq!(initializers[2].details, "false");

    for (expected, action) in initializers.iter().enumerate() {
        assert_eq!(action.sequence, expected as u32);
    }
    assert!(
        workflow
            .flatten()
            .iter()
            .filter(|a| a.kind != ActionKind::InitializeVariable)
            .all(|a| a.sequence >= 5)
    );
    assert_eq!(workflow.variables.len(), 5);
}

#[test]
fn test_variable_assignments_become_set_actions() {
    let workflow = transform_default(&hoisting_fixture());

    let bump = workflow.find_action("Bump").expect("first statement");
    assert_eq!(bump.kind, ActionKind::SetVariable);
    assert_eq!(bump.variable_name.as_deref(), Some("counter"));
    assert_eq!(bump.details, "add(variables('counter'), 1)");

    let second = workflow.find_action("Bump_2").expect("second statement");
    assert_eq!(second.variable_name.as_deref(), Some("flag"));
    assert_eq!(second.details, "true");

    let retry = workflow.find_action("Retry").expect("compound assignment");
    assert_eq!(retry.details, "add(variables('retries'), 1)");
}

#[test]
fn test_while_becomes_until_with_inverted_guard() {
    let workflow = transform_default(&hoisting_fixture());

    let poll = workflow.find_action("Poll").expect("loop action");
    assert_eq!(poll.kind, ActionKind::Until);
    assert_eq!(poll.loop_threshold, Some(3));
    assert!(
        poll.details
            .starts_with("or(greaterOrEquals(variables('retries'), 3)"),
        "unexpected guard {}",
        poll.details
    );
    assert_eq!(poll.children.len(), 1);
    assert_eq!(poll.children[0].name, "Retry");
}

#[test]
fn test_until_guard_is_inverted() {
    let workflow = transform_default(&orchestration(
        &[variable_decl("done", "System.Boolean")],
        &[element(
            "Until",
            &oid(),
            "ServiceBody_Statement",
            &[("Name", "Retry_Until_Done"), ("Expression", "done == true")],
            &[variable_assign("Finish", "done = true")],
        )],
    ));

    let retry = workflow.find_action("Retry_Until_Done").expect("until loop");
    assert_eq!(retry.kind, ActionKind::Until);
    assert_eq!(retry.details, "not(equals(variables('done'), true))");
    assert_eq!(retry.loop_threshold, Some(60));
    assert_eq!(retry.children[0].name, "Finish");
}

#[test]
fn test_unbounded_loop_uses_default_limit() {
    let workflow = transform_default(&orchestration(
        &[],
        &[while_loop("Drain", "queue.HasItems()", &[])],
    ));
    assert_eq!(
        workflow.find_action("Drain").and_then(|a| a.loop_threshold),
        Some(TransformOptions::default().default_loop_limit)
    );
}

#[test]
fn test_self_recursion_becomes_bounded_loop() {
    let workflow = transform_default(&orchestration(
        &[],
        &[
            call("Call_Self", "Contoso.Orders.ProcessOrder"),
            call("Call_Other", "Contoso.Billing.Invoice"),
        ],
    ));

    let recursion = workflow.find_action("Call_Self").expect("recursion loop");
    assert_eq!(recursion.kind, ActionKind::Until);
    assert_eq!(recursion.loop_threshold, Some(10));
    assert_eq!(recursion.children.len(), 1);
    assert_eq!(recursion.children[0].kind, ActionKind::Marker);
    assert_eq!(recursion.children[0].name, "Call_Self_rerun");

    let other = workflow.find_action("Call_Other").expect("plain call");
    assert_eq!(other.kind, ActionKind::CallWorkflow);
    assert!(
        workflow
            .flatten()
            .iter()
            .filter(|a| a.kind == ActionKind::CallWorkflow)
            .all(|a| a.details != "Contoso.Orders.ProcessOrder")
    );

    assert!(
        workflow
            .findings
            .iter()
            .any(|f| f.severity == Severity::Info && f.subject == "Call_Self")
    );
}

#[test]
fn test_recursion_limit_follows_options() {
    let flow = parse(&orchestration(&[], &[call("Again", "ProcessOrder")]));
    let options = TransformOptions {
        recursion_retry_limit: 4,
        ..TransformOptions::default()
    };
    let workflow = Transformer::builder(flow).with_options(options).build().transform();
    assert_eq!(
        workflow.find_action("Again").and_then(|a| a.loop_threshold),
        Some(4)
    );
}

#[test]
fn test_unit_context_self_reference() {
    let unit = UnitContext::new("ProcessOrder", "Contoso.Orders.ProcessOrder");
    assert!(unit.is_self_reference("ProcessOrder"));
    assert!(unit.is_self_reference("Contoso.Orders.ProcessOrder"));
    assert!(unit.is_self_reference("Orders.ProcessOrder"));
    assert!(!unit.is_self_reference("ProcessOrders"));
    assert!(!unit.is_self_reference("Contoso.Billing.Invoice"));
    assert!(!unit.is_self_reference("  "));
}

#[test]
fn test_names_inside_decision_branches_carry_node_id() {
    let flow = parse(&orchestration(
        &[message_decl("OrderIn", "Contoso.Orders.Schemas.Order")],
        &[
            receive(&oid(), "Receive_Order", "ReceiveOrders", "OrderIn", true),
            decision(
                "Check_Total",
                &[
                    ("total > 100", vec![send("Send_Order", "BigPort", "OrderIn")]),
                    ("", vec![send("Send_Order", "SmallPort", "OrderIn")]),
                ],
            ),
        ],
    ));
    let NodeKind::Decide {
        true_branch,
        false_branch,
        ..
    } = &flow.nodes[1].kind
    else {
        panic!("Expected a decide node");
    };
    let expected_true = format!("Send_Order_{}", true_branch[0].id);
    let expected_false = format!("Send_Order_{}", false_branch[0].id);

    let workflow = Transformer::builder(flow.clone()).build().transform();
    let condition = workflow.find_action("Check_Total").expect("condition");
    assert_eq!(condition.kind, ActionKind::Condition);

    let when_true = condition.true_branch.as_ref().expect("true branch");
    let when_false = condition.false_branch.as_ref().expect("false branch");
    assert_eq!(when_true[0].name, expected_true);
    assert_eq!(when_false[0].name, expected_false);
    assert_ne!(when_true[0].name, when_false[0].name);
}

#[test]
fn test_action_names_are_unique() {
    let workflow = transform_default(&orchestration(
        &[],
        &[
            shape("Delay", "Wait", &[("Timeout", "TimeSpan.FromMinutes(1)")]),
            shape("Delay", "Wait", &[("Timeout", "TimeSpan.FromMinutes(2)")]),
        ],
    ));
    assert_eq!(action_names(&workflow), vec!["Wait", "Wait_2"]);
    assert_eq!(workflow.actions[1].details, "PT2M");
}

#[test]
fn test_data_flow_wires_every_consumer() {
    let workflow = transform_default(&receive_transform_send());

    for action in workflow.flatten() {
        if action.kind.is_consumer() {
            assert!(
                action.input_source_action.is_some(),
                "{} has no input source",
                action.name
            );
        }
    }
    assert_eq!(
        workflow
            .find_action("Map_Order_To_Invoice")
            .and_then(|a| a.input_source_action.as_deref()),
        Some(TRIGGER_SOURCE)
    );
    assert_eq!(
        workflow
            .find_action("Send_Invoice")
            .and_then(|a| a.input_source_action.as_deref()),
        Some("Map_Order_To_Invoice")
    );
}

#[test]
fn test_construct_with_single_transform_collapses() {
    let workflow = transform_default(&orchestration(
        &[
            message_decl("OrderIn", "Contoso.Orders.Schemas.Order"),
            message_decl("InvoiceOut", "Contoso.Orders.Schemas.Invoice"),
        ],
        &[
            receive(&oid(), "Receive_Order", "ReceiveOrders", "OrderIn", true),
            construct(
                "Build_Invoice",
                "InvoiceOut",
                &[transform("Map_It", "Contoso.Maps.OrderToInvoice", "OrderIn", "InvoiceOut")],
            ),
        ],
    ));

    assert_eq!(action_names(&workflow), vec!["Build_Invoice"]);
    let built = &workflow.actions[0];
    assert_eq!(built.kind, ActionKind::Transform);
    assert_eq!(built.output_message_name.as_deref(), Some("InvoiceOut"));
}

#[test]
fn test_construct_merges_assignments_into_transform() {
    let workflow = transform_default(&orchestration(
        &[
            message_decl("OrderIn", "Contoso.Orders.Schemas.Order"),
            message_decl("RequestOut", "Contoso.Orders.Schemas.Request"),
            variable_decl("priority", "System.Int32"),
        ],
        &[
            receive(&oid(), "Receive_Order", "ReceiveOrders", "OrderIn", true),
            construct(
                "Build_Request",
                "RequestOut",
                &[
                    transform(
                        "Map_Request",
                        "Contoso.Maps.OrderToRequest",
                        "OrderIn",
                        "RequestOut",
                    ),
                    message_assign(
                        "Set_Props",
                        "RequestOut(BTS.Operation) = \"Submit\";\nRequestOut.Priority = priority;",
                    ),
                ],
            ),
        ],
    ));

    let built = workflow.find_action("Build_Request").expect("merged transform");
    assert_eq!(built.kind, ActionKind::Transform);
    assert_eq!(
        built
            .property_assignments
            .get("RequestOut(BTS.Operation)")
            .map(String::as_str),
        Some("'Submit'")
    );
    assert_eq!(
        built
            .property_assignments
            .get("RequestOut.Priority")
            .map(String::as_str),
        Some("variables('priority')")
    );
    assert!(workflow.find_action("Set_Props").is_none());
    assert!(
        workflow
            .flatten()
            .iter()
            .all(|a| a.kind != ActionKind::ConstructMessage)
    );
}

#[test]
fn test_listen_on_activating_receives_dispatches_on_message_type() {
    let workflow = transform_default(&orchestration(
        &[
            message_decl("Order", "Contoso.Schemas.Order"),
            message_decl("Cancel", "Contoso.Schemas.Cancel"),
        ],
        &[listen(
            "First_Wins",
            &[
                vec![
                    receive(&oid(), "Receive_Order", "OrdersPort", "Order", true),
                    shape("Delay", "Settle", &[("Timeout", "TimeSpan.FromSeconds(5)")]),
                ],
                vec![receive(&oid(), "Receive_Cancel", "CancelPort", "Cancel", true)],
            ],
        )],
    ));

    assert_eq!(
        workflow.trigger.properties.get("messageTypes").map(String::as_str),
        Some("Contoso.Schemas.Order,Contoso.Schemas.Cancel")
    );

    let dispatch = workflow.find_action("First_Wins").expect("dispatch switch");
    assert_eq!(dispatch.kind, ActionKind::Switch);
    assert_eq!(dispatch.children.len(), 3);
    assert_eq!(
        dispatch.children[0].case_value.as_deref(),
        Some("Contoso.Schemas.Order")
    );
    assert_eq!(dispatch.children[0].children[0].name, "Settle");
    assert_eq!(
        dispatch.children[1].case_value.as_deref(),
        Some("Contoso.Schemas.Cancel")
    );
    assert!(dispatch.children[1].children.is_empty());
    assert_eq!(dispatch.children[2].name, "First_Wins_default");
    assert!(
        workflow
            .flatten()
            .iter()
            .all(|a| a.kind != ActionKind::ReceiveMessage)
    );
}

#[test]
fn test_invalid_pattern_is_blocked_but_still_lowered() {
    let workflow = transform_default(&orchestration(
        &[],
        &[
            receive(&oid(), "Receive_A", "PortA", "MessageA", true),
            receive(&oid(), "Receive_B", "PortB", "MessageB", true),
            send("Send_A", "PortC", "MessageA"),
        ],
    ));

    assert!(workflow.is_blocked());
    assert_eq!(workflow.findings[0].severity, Severity::Blocking);
    assert_eq!(workflow.findings[0].subject, "Contoso.Orders.ProcessOrder");
    assert!(workflow.find_action("Send_A").is_some());
}

#[test]
fn test_unknown_shape_becomes_marker_with_warning() {
    let workflow = transform_default(&orchestration(
        &[],
        &[shape("Teleport", "Beam_Me_Up", &[])],
    ));

    let marker = workflow.find_action("Beam_Me_Up").expect("marker");
    assert_eq!(marker.kind, ActionKind::Marker);
    assert!(marker.details.contains("Teleport"));
    assert!(
        workflow
            .findings
            .iter()
            .any(|f| f.severity == Severity::Warning && f.subject == "Beam_Me_Up")
    );
    assert!(!workflow.is_blocked());
}

#[test]
fn test_catch_handlers_run_after_their_scope() {
    let workflow = transform_default(&orchestration(
        &[],
        &[element(
            "Scope",
            &oid(),
            "ServiceBody_Statement",
            &[("Name", "Try_Submit")],
            &[
                send("Submit", "SubmitPort", "Request"),
                element(
                    "Catch",
                    &oid(),
                    "Scope_Catch",
                    &[
                        ("Name", "Handle_Fault"),
                        ("ExceptionType", "System.Exception"),
                        ("ExceptionName", "ex"),
                    ],
                    &[shape("Terminate", "Stop", &[("ErrorMessage", "\"failed\"")])],
                ),
            ],
        )],
    ));

    let names: Vec<&str> = workflow.actions.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Try_Submit", "Handle_Fault"]);

    let scope = &workflow.actions[0];
    assert_eq!(scope.kind, ActionKind::Scope);
    assert_eq!(scope.children.len(), 1);

    let handler = &workflow.actions[1];
    assert_eq!(handler.kind, ActionKind::CatchScope);
    assert_eq!(handler.details, "System.Exception");
    assert_eq!(
        handler.property_assignments.get("runAfter").map(String::as_str),
        Some("Try_Submit:Failed,TimedOut")
    );

    let stop = &handler.children[0];
    assert_eq!(stop.kind, ActionKind::Terminate);
    assert_eq!(stop.details, "'failed'");
    assert_eq!(
        stop.property_assignments.get("runStatus").map(String::as_str),
        Some("Cancelled")
    );
}

#[test]
fn test_throw_and_suspend_run_statuses() {
    let workflow = transform_default(&orchestration(
        &[],
        &[
            shape("Throw", "Raise", &[("Exception", "new System.Exception(\"bad\")")]),
            shape("Suspend", "Hold", &[("ErrorMessage", "Needs review")]),
        ],
    ));

    let status = |name: &str| {
        workflow
            .find_action(name)
            .and_then(|a| a.property_assignments.get("runStatus").cloned())
    };
    assert_eq!(status("Raise").as_deref(), Some("Failed"));
    assert_eq!(status("Hold").as_deref(), Some("Suspended"));
    assert_eq!(
        workflow.find_action("Hold").map(|a| a.details.as_str()),
        Some("'Needs review'")
    );
}

#[test]
fn test_request_response_port_sends_response() {
    let workflow = transform_default(&odx(
        NAMESPACE,
        FLOW_NAME,
        &[port_type("QuotePortType", "RequestResponse")],
        &[port_decl("QuoteService", "QuotePortType", "Implements", None)],
        &[
            receive(&oid(), "Receive_Quote", "QuoteService", "QuoteRequest", true),
            send("Send_Quote", "QuoteService", "QuoteReply"),
        ],
    ));

    assert_eq!(workflow.trigger.kind, TriggerKind::Request);
    assert_eq!(
        workflow.trigger.properties.get("responseRequired").map(String::as_str),
        Some("true")
    );
    let reply = workflow.find_action("Send_Quote").expect("response");
    assert_eq!(reply.kind, ActionKind::Response);
    assert_eq!(reply.input_source_action.as_deref(), Some(TRIGGER_SOURCE));
}

#[test]
fn test_physical_file_port_selects_connector_trigger() {
    let workflow = transform_default(&odx(
        NAMESPACE,
        FLOW_NAME,
        &[port_type("OrderPortType", "OneWay")],
        &[port_decl(
            "ReceiveOrders",
            "OrderPortType",
            "Implements",
            Some(("FILE", "C:\\Drop\\Orders\\*.xml")),
        )],
        &[receive(&oid(), "Receive_Order", "ReceiveOrders", "OrderIn", true)],
    ));

    let trigger = &workflow.trigger;
    assert_eq!(trigger.name, "When_ReceiveOrders_receives");
    assert_eq!(trigger.kind, TriggerKind::Connector);
    assert_eq!(trigger.connector_kind, Some(ConnectorKind::FileSystem));
    assert_eq!(trigger.message_name.as_deref(), Some("OrderIn"));
    assert_eq!(
        trigger.properties.get("fileMask").map(String::as_str),
        Some("*.xml")
    );
    assert!(workflow.actions.is_empty());
}

#[test]
fn test_callable_option_forces_request_trigger() {
    let flow = parse(&receive_transform_send());
    let workflow = Transformer::builder(flow).callable(true).build().transform();

    assert_eq!(workflow.trigger.kind, TriggerKind::Request);
    assert_eq!(workflow.trigger.name, "manual");
    assert_eq!(workflow.trigger.message_name.as_deref(), Some("OrderIn"));
}
