// ABOUTME: Answer generation over classified questions
// ABOUTME: Template responder plus the trait seam for an external text generator

use async_trait::async_trait;
use serde::Serialize;

use crate::context::ChatContext;
use crate::intent::{IntentKind, QueryIntent};
use crate::ChatResult;

#[derive(Debug, Clone, Serialize)]
pub struct ChatAnswer {
    pub reply: String,
    pub suggestions: Vec<String>,
}

/// Seam for plugging in an external text-generation collaborator. Given the
/// question, its classified intent, and a read-only context snapshot, produce
/// free text. Implementations must not mutate inventory state.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(
        &self,
        question: &str,
        intent: &QueryIntent,
        context: &ChatContext,
    ) -> ChatResult<ChatAnswer>;
}

/// Built-in generator: templated answers assembled from the snapshot.
pub struct TemplateResponder;

#[async_trait]
impl AnswerGenerator for TemplateResponder {
    async fn generate(
        &self,
        question: &str,
        intent: &QueryIntent,
        context: &ChatContext,
    ) -> ChatResult<ChatAnswer> {
        let reply = match intent.kind {
            IntentKind::Location => location_reply(intent, context),
            IntentKind::WhoHas => who_has_reply(intent, context),
            IntentKind::Availability => availability_reply(intent, context),
            IntentKind::Overdue => overdue_reply(context),
            IntentKind::ListAll => list_all_reply(context),
            IntentKind::BorrowHelp => {
                "To borrow a component, submit a request from the dashboard and wait for \
                 admin approval, or use the kiosk with your roll number for immediate pickup."
                    .to_string()
            }
            IntentKind::ReturnHelp => {
                "To return a component, bring it to the lab and have an admin record the \
                 return, or use the kiosk: look up your roll number and select the item."
                    .to_string()
            }
            IntentKind::General => general_reply(question, intent, context),
        };

        Ok(ChatAnswer {
            reply,
            suggestions: suggestions_for(intent.kind, context),
        })
    }
}

fn location_reply(intent: &QueryIntent, context: &ChatContext) -> String {
    let named: Vec<_> = context
        .components
        .iter()
        .filter(|c| intent.components.contains(&c.name))
        .collect();

    if named.is_empty() {
        return "I couldn't match that to a component in the inventory. Try asking with \
                the exact component name."
            .to_string();
    }

    named
        .iter()
        .map(|c| match &c.location {
            Some(location) => format!("{} is stored at {}.", c.name, location),
            None => format!("{} has no recorded location.", c.name),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn who_has_reply(intent: &QueryIntent, context: &ChatContext) -> String {
    let loans: Vec<_> = context
        .open_loans
        .iter()
        .filter(|l| intent.components.is_empty() || intent.components.contains(&l.component_name))
        .collect();

    if loans.is_empty() {
        return "Nothing matching is currently borrowed.".to_string();
    }

    let lines: Vec<String> = loans
        .iter()
        .map(|l| {
            let who = match &l.roll_number {
                Some(roll) => format!("{} ({})", l.user_name, roll),
                None => l.user_name.clone(),
            };
            format!("{} has {}x {}", who, l.quantity, l.component_name)
        })
        .collect();

    format!("Currently borrowed: {}.", lines.join("; "))
}

fn availability_reply(intent: &QueryIntent, context: &ChatContext) -> String {
    let named: Vec<_> = context
        .components
        .iter()
        .filter(|c| intent.components.contains(&c.name))
        .collect();

    if named.is_empty() {
        return format!(
            "{} of {} components are currently in stock. Ask about a specific one by name.",
            context.stats.in_stock, context.stats.total_components
        );
    }

    named
        .iter()
        .map(|c| {
            if c.available_quantity > 0 {
                format!(
                    "{}: {} of {} available.",
                    c.name, c.available_quantity, c.total_quantity
                )
            } else {
                format!("{} is out of stock right now.", c.name)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn overdue_reply(context: &ChatContext) -> String {
    let overdue: Vec<_> = context.open_loans.iter().filter(|l| l.overdue).collect();
    if overdue.is_empty() {
        return "No loans are overdue. Everything out is still within its due date.".to_string();
    }

    let lines: Vec<String> = overdue
        .iter()
        .map(|l| format!("{}x {} ({})", l.quantity, l.component_name, l.user_name))
        .collect();
    format!("{} overdue loan(s): {}.", overdue.len(), lines.join("; "))
}

fn list_all_reply(context: &ChatContext) -> String {
    if context.components.is_empty() {
        return "The inventory is empty.".to_string();
    }

    let lines: Vec<String> = context
        .components
        .iter()
        .map(|c| format!("{} ({} available)", c.name, c.available_quantity))
        .collect();
    format!(
        "{} components tracked: {}.",
        context.stats.total_components,
        lines.join(", ")
    )
}

fn general_reply(question: &str, intent: &QueryIntent, context: &ChatContext) -> String {
    // A named component with no other signal reads as an availability question.
    if !intent.components.is_empty() {
        return availability_reply(intent, context);
    }
    if question.trim().is_empty() {
        return "Ask me about component availability, locations, current borrows, or \
                overdue loans."
            .to_string();
    }
    format!(
        "I track {} components ({} in stock, {} currently borrowed). Ask about \
         availability, locations, who has something, or overdue loans.",
        context.stats.total_components, context.stats.in_stock, context.stats.active_borrows
    )
}

fn suggestions_for(kind: IntentKind, context: &ChatContext) -> Vec<String> {
    let mut suggestions = match kind {
        IntentKind::Location => vec![
            "Is it available right now?".to_string(),
            "Who has it borrowed?".to_string(),
        ],
        IntentKind::WhoHas => vec![
            "Which loans are overdue?".to_string(),
            "How many are still in stock?".to_string(),
        ],
        IntentKind::Availability => vec![
            "Where is it stored?".to_string(),
            "How do I borrow it?".to_string(),
        ],
        IntentKind::Overdue => vec!["Who has them borrowed?".to_string()],
        _ => vec![
            "What's in stock?".to_string(),
            "Are any loans overdue?".to_string(),
        ],
    };

    if let Some(first) = context.components.first() {
        suggestions.push(format!("Is the {} available?", first.name));
    }
    suggestions
}
