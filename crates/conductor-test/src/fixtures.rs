//! Test fixtures for common domain types.

use conductor_core::Role;
use conductor_storage::types::{Branch, Message, MessagePart, Session};

/// A session rooted at `/workspace`.
#[must_use]
pub fn test_session() -> Session {
    Session::new("/workspace")
}

/// The first branch of `session`.
#[must_use]
pub fn test_branch(session: &Session) -> Branch {
    Branch::new(session.id)
}

/// A user message with a single text part.
#[must_use]
pub fn test_user_message(session: &Session, branch: &Branch, text: impl Into<String>) -> Message {
    Message::new(session.id, branch.id, Role::User, vec![MessagePart::Text { text: text.into() }])
}

/// An assistant message with a single text part.
#[must_use]
pub fn test_assistant_message(session: &Session, branch: &Branch, text: impl Into<String>) -> Message {
    Message::new(session.id, branch.id, Role::Assistant, vec![MessagePart::Text { text: text.into() }])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_fixture_belongs_to_session() {
        let session = test_session();
        let branch = test_branch(&session);
        assert_eq!(branch.session_id, session.id);
    }

    #[test]
    fn message_fixtures_carry_expected_roles() {
        let session = test_session();
        let branch = test_branch(&session);
        let user = test_user_message(&session, &branch, "hi");
        let assistant = test_assistant_message(&session, &branch, "hello");
        assert_eq!(user.role, Role::User);
        assert_eq!(assistant.role, Role::Assistant);
    }
}
