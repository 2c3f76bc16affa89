//! Tests for trigger pattern classification.
mod common;
use common::*;
use tenkan::prelude::*;

fn classify(body: &[String]) -> PatternAnalysis {
    analyze(&parse(&orchestration(&[], body)))
}

#[test]
fn test_no_activating_receive_is_callable() {
    let analysis = classify(&[
        receive(&oid(), "Receive_Reply", "ReplyPort", "Reply", false),
        send("Send_Request", "RequestPort", "Request"),
    ]);

    assert_eq!(analysis.pattern, TriggerPattern::Callable);
    assert!(analysis.is_valid);
    assert_eq!(analysis.primary_receive, None);
}

#[test]
fn test_single_activating_receive() {
    let analysis = classify(&[
        receive(&oid(), "Receive_Order", "ReceiveOrders", "OrderIn", true),
        receive(&oid(), "Receive_Reply", "ReplyPort", "Reply", false),
    ]);

    assert_eq!(analysis.pattern, TriggerPattern::SingleTrigger);
    assert!(analysis.is_valid);
    assert!(analysis.primary_receive.is_some());
    assert!(!analysis.requires_session);
    assert!(analysis.blocking_reason.is_none());
}

#[test]
fn test_correlated_follower_makes_convoy() {
    let first = oid();
    let second = oid();
    let flow = parse(&orchestration(
        &[correlation_decl(
            "BatchCorrelation",
            &[(first.as_str(), true), (second.as_str(), false)],
        )],
        &[
            receive(&first, "Receive_First", "BatchPort", "Item", true),
            while_loop(
                "Collect",
                "received < 10",
                &[receive(&second, "Receive_Next", "BatchPort", "Item", false)],
            ),
        ],
    ));
    let analysis = analyze(&flow);

    assert_eq!(analysis.pattern, TriggerPattern::Convoy);
    assert!(analysis.is_valid);
    assert!(analysis.requires_session);
    assert_eq!(analysis.secondary_receives.len(), 1);
}

#[test]
fn test_follower_of_other_correlation_is_not_convoy() {
    let first = oid();
    let second = oid();
    let flow = parse(&orchestration(
        &[
            correlation_decl("Started", &[(first.as_str(), true)]),
            correlation_decl("Unrelated", &[(second.as_str(), false)]),
        ],
        &[
            receive(&first, "Receive_First", "BatchPort", "Item", true),
            receive(&second, "Receive_Next", "BatchPort", "Item", false),
        ],
    ));

    assert_eq!(analyze(&flow).pattern, TriggerPattern::SingleTrigger);
}

#[test]
fn test_activating_receives_under_one_listen() {
    let analysis = classify(&[listen(
        "First_Wins",
        &[
            vec![receive(&oid(), "Receive_Order", "OrdersPort", "Order", true)],
            vec![receive(&oid(), "Receive_Cancel", "CancelPort", "Cancel", true)],
        ],
    )]);

    assert_eq!(analysis.pattern, TriggerPattern::ListenFirstToComplete);
    assert!(analysis.is_valid);
    assert!(analysis.requires_timeout_handling);
    assert_eq!(analysis.secondary_receives.len(), 1);
}

#[test]
fn test_activating_receives_in_parallel_are_blocked() {
    let analysis = classify(&[parallel(
        "All_Required",
        &[
            vec![receive(&oid(), "Receive_Header", "HeaderPort", "Header", true)],
            vec![receive(&oid(), "Receive_Lines", "LinesPort", "Lines", true)],
        ],
    )]);

    assert_eq!(analysis.pattern, TriggerPattern::ParallelAllMustComplete);
    assert!(!analysis.is_valid);
    assert!(analysis.blocking_reason.is_some());
}

#[test]
fn test_unordered_activating_receives_are_invalid() {
    let analysis = classify(&[
        receive(&oid(), "Receive_A", "PortA", "MessageA", true),
        receive(&oid(), "Receive_B", "PortB", "MessageB", true),
    ]);

    assert_eq!(analysis.pattern, TriggerPattern::Invalid);
    assert!(!analysis.is_valid);
    assert!(
        analysis
            .blocking_reason
            .as_deref()
            .is_some_and(|r| r.contains("2 activating receives"))
    );
}

#[test]
fn test_receives_under_different_listens_are_invalid() {
    let analysis = classify(&[
        listen(
            "Listen_A",
            &[vec![receive(&oid(), "Receive_A", "PortA", "MessageA", true)]],
        ),
        listen(
            "Listen_B",
            &[vec![receive(&oid(), "Receive_B", "PortB", "MessageB", true)]],
        ),
    ]);

    assert_eq!(analysis.pattern, TriggerPattern::Invalid);
    assert!(!analysis.is_valid);
}
