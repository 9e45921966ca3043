//! Built-in component catalog.

pub mod formatter;
pub mod slack;
pub mod webhook;

use crate::registry::ComponentRegistry;

/// The registry every deployment starts from: all built-in types registered.
pub fn builtin_registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();

    registry.register(formatter::TextFormat::spec(), || {
        Box::new(formatter::TextFormat)
    });
    registry.register(formatter::NumberFormat::spec(), || {
        Box::new(formatter::NumberFormat)
    });
    registry.register(webhook::WebhookGet::spec(), || {
        Box::new(webhook::WebhookGet::new())
    });
    registry.register(webhook::WebhookPost::spec(), || {
        Box::new(webhook::WebhookPost::new())
    });
    registry.register(slack::SendMessage::spec(), || Box::new(slack::SendMessage));
    registry.register(slack::ReceiveMessage::spec(), || {
        Box::new(slack::ReceiveMessage)
    });

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let registry = builtin_registry();
        assert_eq!(
            registry.type_ids(),
            vec![
                "formatter.number",
                "formatter.text",
                "slack.receive_message",
                "slack.send_message",
                "webhook.get",
                "webhook.post",
            ]
        );
    }
}
