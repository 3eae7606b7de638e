//! Scenario 5: forking a branch at a message copies history up to (and
//! including) the cutoff onto a new branch with fresh message ids, and
//! further writes on either branch don't leak across.

use conductor_core::Role;
use conductor_storage::memory::MemoryStorage;
use conductor_storage::traits::Storage;
use conductor_storage::types::{Branch, Message, MessagePart, Session};

#[tokio::test]
async fn fork_copies_prefix_with_fresh_ids_and_stays_isolated() {
    let storage = MemoryStorage::new();

    let session = Session::new("/workspace");
    storage.create_session(session.clone()).await.unwrap();
    let branch = Branch::new(session.id);
    storage.create_branch(branch.clone()).await.unwrap();

    let mut originals = Vec::new();
    for text in ["first", "second", "third"] {
        let message = Message::new(session.id, branch.id, Role::User, vec![MessagePart::Text { text: text.into() }]);
        storage.create_message(message.clone()).await.unwrap();
        originals.push(message);
    }

    let cutoff_id = originals[1].id;
    let forked = Branch::forked_from(&branch, cutoff_id, Some("fork at second".into()));
    storage.create_branch(forked.clone()).await.unwrap();

    let source_messages = storage.list_messages(branch.id).await.unwrap();
    let cutoff = source_messages.iter().position(|m| m.id == cutoff_id).unwrap();
    for message in &source_messages[..=cutoff] {
        let copy = Message {
            id: conductor_core::MessageId::new(),
            session_id: message.session_id,
            branch_id: forked.id,
            role: message.role,
            parts: message.parts.clone(),
            created_at: message.created_at,
            turn_duration_ms: message.turn_duration_ms,
            kind: message.kind,
        };
        storage.create_message(copy).await.unwrap();
    }

    let forked_messages = storage.list_messages(forked.id).await.unwrap();
    assert_eq!(forked_messages.len(), 2);
    assert_eq!(forked_messages[0].created_at, originals[0].created_at);
    assert_ne!(forked_messages[0].id, originals[0].id);
    assert_eq!(forked_messages[1].created_at, originals[1].created_at);
    assert_ne!(forked_messages[1].id, originals[1].id);

    // A message added to the fork doesn't appear on the original branch.
    let fork_only = Message::new(forked.session_id, forked.id, Role::User, vec![MessagePart::Text { text: "fork-only".into() }]);
    storage.create_message(fork_only).await.unwrap();

    let original_after = storage.list_messages(branch.id).await.unwrap();
    assert_eq!(original_after.len(), 3);
    assert!(!original_after.iter().any(|m| matches!(&m.parts[..], [MessagePart::Text { text }] if text == "fork-only")));

    let fork_after = storage.list_messages(forked.id).await.unwrap();
    assert_eq!(fork_after.len(), 3);
}
