// ABOUTME: Query intent classification
// ABOUTME: Keyword heuristics plus component-name matching against live inventory

use serde::Serialize;

use crate::context::ChatContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Location,
    WhoHas,
    Availability,
    Overdue,
    ListAll,
    BorrowHelp,
    ReturnHelp,
    General,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryIntent {
    pub kind: IntentKind,
    /// Component names from current inventory mentioned in the question.
    pub components: Vec<String>,
}

/// Classify a question. Order matters: the more specific phrasings win over
/// generic keywords ("who has the esp32" mentions "has", not availability).
pub fn extract_intent(question: &str, context: &ChatContext) -> QueryIntent {
    let q = question.to_lowercase();

    let kind = if contains_any(&q, &["where", "location", "shelf", "which rack"]) {
        IntentKind::Location
    } else if contains_any(&q, &["who has", "who borrowed", "who took", "borrowed by"]) {
        IntentKind::WhoHas
    } else if contains_any(&q, &["overdue", "late", "past due"]) {
        IntentKind::Overdue
    } else if contains_any(&q, &["available", "in stock", "how many", "stock", "left"]) {
        IntentKind::Availability
    } else if contains_any(&q, &["list all", "show all", "everything", "all components"]) {
        IntentKind::ListAll
    } else if contains_any(&q, &["how do i borrow", "how to borrow", "borrow", "request"]) {
        IntentKind::BorrowHelp
    } else if contains_any(&q, &["how do i return", "how to return", "return"]) {
        IntentKind::ReturnHelp
    } else {
        IntentKind::General
    };

    let components = context
        .matching_components(question)
        .into_iter()
        .map(|c| c.name.clone())
        .collect();

    QueryIntent { kind, components }
}

fn contains_any(question: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| question.contains(n))
}
