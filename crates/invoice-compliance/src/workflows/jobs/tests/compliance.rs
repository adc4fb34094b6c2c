use super::common::*;
use crate::workflows::jobs::compliance::{ALL_DOCUMENTS_PRESENT, MISSING_DOCUMENTS_PREFIX};
use crate::workflows::jobs::domain::{Checklist, DocumentKind};
use crate::workflows::jobs::review::{ReviewOutcome, ReviewRecord};
use crate::workflows::jobs::{ComplianceEvaluator, JobStatus};

fn missing(checklist: &Checklist) -> Vec<String> {
    ComplianceEvaluator::new()
        .evaluate_checklist(checklist)
        .missing_items
}

#[test]
fn empty_checklist_reports_six_items_in_order() {
    let evaluation = ComplianceEvaluator::new().evaluate_checklist(&Checklist::default());

    assert!(!evaluation.is_complete);
    assert_eq!(
        evaluation.missing_items,
        vec![
            "1. 20% agency invoice has not been attached",
            "2. 30% agency invoice has not been attached",
            "3. 50% agency invoice has not been attached",
            "4. approved quotation documents have not been attached",
            "6. job order has not been attached",
            "8. proof of ads (performance proof) has not been attached",
        ]
    );
}

#[test]
fn complete_checklist_has_no_missing_items() {
    let evaluation = ComplianceEvaluator::new().evaluate_checklist(&complete_checklist());
    assert!(evaluation.is_complete);
    assert!(evaluation.missing_items.is_empty());
}

#[test]
fn invoice_tranches_are_reported_from_the_first_unattached() {
    let expectations: [(usize, &[&str]); 5] = [
        (
            0,
            &[
                "1. 20% agency invoice has not been attached",
                "2. 30% agency invoice has not been attached",
                "3. 50% agency invoice has not been attached",
            ],
        ),
        (
            1,
            &[
                "2. 30% agency invoice has not been attached",
                "3. 50% agency invoice has not been attached",
            ],
        ),
        (2, &["3. 50% agency invoice has not been attached"]),
        (3, &[]),
        (5, &[]),
    ];

    for (invoices, expected) in expectations {
        let items = missing(&checklist(invoices, 2, 1, 1));
        assert_eq!(items, expected, "{invoices} invoices");
    }
}

#[test]
fn quotation_requirements_need_two_documents() {
    assert_eq!(
        missing(&checklist(3, 0, 1, 1)),
        vec!["4. approved quotation documents have not been attached"]
    );
    assert_eq!(
        missing(&checklist(3, 1, 1, 1)),
        vec!["5. one approved quotation document is missing"]
    );
    assert!(missing(&checklist(3, 4, 1, 1)).is_empty());
}

#[test]
fn exactly_one_job_order_is_required() {
    assert_eq!(
        missing(&checklist(3, 2, 0, 1)),
        vec!["6. job order has not been attached"]
    );
    assert_eq!(
        missing(&checklist(3, 2, 2, 1)),
        vec!["7. multiple job orders found, only one is required"]
    );
}

#[test]
fn missing_performance_proof_is_reported_last() {
    let items = missing(&checklist(1, 1, 2, 0));
    assert_eq!(
        items.last().map(String::as_str),
        Some("8. proof of ads (performance proof) has not been attached")
    );
    assert_eq!(items.len(), 5);
}

#[test]
fn timesheet_and_third_party_do_not_affect_the_verdict() {
    let mut with_extras = complete_checklist();
    with_extras.attach(DocumentKind::Timesheet, document("hours.xlsx"));
    with_extras.attach(DocumentKind::ThirdParty, document("printer.pdf"));
    assert!(missing(&with_extras).is_empty());

    let mut only_extras = Checklist::default();
    only_extras.attach(DocumentKind::Timesheet, document("hours.xlsx"));
    only_extras.attach(DocumentKind::ThirdParty, document("printer.pdf"));
    assert_eq!(missing(&only_extras), missing(&Checklist::default()));
}

#[test]
fn evaluation_is_deterministic() {
    let evaluator = ComplianceEvaluator::new();
    let checklist = checklist(2, 1, 3, 0);
    assert_eq!(
        evaluator.evaluate_checklist(&checklist),
        evaluator.evaluate_checklist(&checklist)
    );
}

#[test]
fn derive_status_for_complete_checklist() {
    let verdict = ComplianceEvaluator::new().derive_status(&[]);
    assert_eq!(verdict.status, JobStatus::Compliant);
    assert_eq!(verdict.final_review_outcome, ReviewOutcome::Approved);
    assert_eq!(verdict.initial_review_outcome, ALL_DOCUMENTS_PRESENT);
}

#[test]
fn derive_status_joins_missing_items() {
    let items = vec![
        "6. job order has not been attached".to_string(),
        "8. proof of ads (performance proof) has not been attached".to_string(),
    ];
    let verdict = ComplianceEvaluator::new().derive_status(&items);

    assert_eq!(verdict.status, JobStatus::NotCompliant);
    assert_eq!(verdict.final_review_outcome, ReviewOutcome::NotApproved);
    assert_eq!(
        verdict.initial_review_outcome,
        format!(
            "{MISSING_DOCUMENTS_PREFIX}6. job order has not been attached; 8. proof of ads (performance proof) has not been attached"
        )
    );
    assert_eq!(verdict.missing_items, items);
}

#[test]
fn apply_creates_review_and_writes_outcomes() {
    let mut job = reviewed_job("job-a", "A/E", JobStatus::Compliant, 10.0, now());
    job.review = None;

    let verdict = ComplianceEvaluator::new().apply(&mut job);

    assert_eq!(job.status, JobStatus::NotCompliant);
    let review = job.review.as_ref().expect("review created");
    assert_eq!(
        review.final_review_outcome,
        Some(ReviewOutcome::NotApproved)
    );
    assert_eq!(
        review.initial_review_outcome.as_deref(),
        Some(verdict.initial_review_outcome.as_str())
    );
    assert_eq!(verdict.missing_items.len(), 6);
}

#[test]
fn apply_keeps_existing_review_fields() {
    let mut job = reviewed_job("job-b", "MEA", JobStatus::NotCompliant, 4_500.0, now());
    job.checklist = complete_checklist();

    ComplianceEvaluator::new().apply(&mut job);

    assert_eq!(job.status, JobStatus::Compliant);
    let review = job.review.as_ref().expect("review kept");
    assert_eq!(review.market_bu.as_deref(), Some("MEA"));
    assert_eq!(review.agency_invoice_total_amount, 4_500.0);
    assert_eq!(review.final_review_outcome, Some(ReviewOutcome::Approved));
    assert_ne!(review, &ReviewRecord::default());
}
