//! crates/convaudit_core/src/wire.rs
//!
//! Decoding of upstream JSON payloads into domain types.
//!
//! The upstream payload shape is not contractually stable: the parts
//! collection arrives flat or nested one or two levels deep, IDs arrive as
//! strings or numbers, and the pagination cursor arrives in three different
//! shapes. All of that variance is absorbed here, in one place, so the
//! evaluator and orchestrator only ever see canonical types.

use serde_json::Value;

use crate::domain::{CandidatePage, Conversation, Part, PartAuthor};
use crate::evaluate::normalize_epoch_seconds;
use crate::ports::PortError;

/// Canonicalizes an upstream identifier to a decimal string.
///
/// Upstream emits admin/conversation IDs sometimes as JSON strings and
/// sometimes as JSON numbers; this is the single place that decides the
/// canonical representation (strings), so the evaluator can compare with
/// plain equality instead of a per-part dual string/numeric check.
pub fn normalize_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let canonical = canonical_id_str(s);
            if canonical.is_empty() {
                None
            } else {
                Some(canonical)
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Canonicalizes a caller-supplied admin ID the same way `normalize_id`
/// canonicalizes upstream ones.
pub fn normalize_admin_id(raw: &str) -> String {
    canonical_id_str(raw)
}

/// Trims whitespace and, for all-digit strings, strips leading zeros so a
/// string-typed `"0123"` and a numeric `123` land on the same canonical
/// form. Non-numeric IDs pass through untouched.
fn canonical_id_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let stripped = trimmed.trim_start_matches('0');
        if stripped.is_empty() {
            return "0".to_string();
        }
        return stripped.to_string();
    }
    trimmed.to_string()
}

/// Extracts the continuation cursor from an upstream `pages` object.
///
/// Observed shapes for `pages.next`:
/// - a bare string cursor,
/// - a query-string fragment embedding `starting_after=<cursor>`,
/// - an object carrying `starting_after` or `cursor`.
///
/// Anything unrecognized is treated as "no more pages" so pagination fails
/// closed instead of looping.
pub fn extract_cursor(pages: &Value) -> Option<String> {
    let next = pages.get("next")?;
    match next {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Some(idx) = s.find("starting_after=") {
                let tail = &s[idx + "starting_after=".len()..];
                let cursor = tail.split('&').next().unwrap_or("");
                if cursor.is_empty() {
                    return None;
                }
                return Some(cursor.to_string());
            }
            Some(s.to_string())
        }
        Value::Object(map) => map
            .get("starting_after")
            .or_else(|| map.get("cursor"))
            .and_then(normalize_cursor_leaf),
        _ => None,
    }
}

fn normalize_cursor_leaf(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Decodes a `POST /conversations/search` response body.
pub fn decode_search_response(body: &Value) -> Result<CandidatePage, PortError> {
    let conversations = body
        .get("conversations")
        .and_then(Value::as_array)
        .ok_or_else(|| PortError::Decode("search response missing conversations array".into()))?;

    let mut ids = Vec::with_capacity(conversations.len());
    for item in conversations {
        if let Some(id) = item.get("id").and_then(normalize_id) {
            ids.push(id);
        }
    }

    let total_count = body.get("total_count").and_then(Value::as_u64).unwrap_or(0);
    let next_cursor = body.get("pages").and_then(|pages| extract_cursor(pages));

    Ok(CandidatePage {
        ids,
        total_count,
        next_cursor,
    })
}

/// Decodes a `GET /conversations/{id}` response body.
pub fn decode_conversation(body: &Value) -> Result<Conversation, PortError> {
    let id = body
        .get("id")
        .and_then(normalize_id)
        .ok_or_else(|| PortError::Decode("conversation missing id".into()))?;

    let created_at = body
        .get("created_at")
        .and_then(Value::as_i64)
        .map(normalize_epoch_seconds)
        .unwrap_or(0);
    let updated_at = body
        .get("updated_at")
        .and_then(Value::as_i64)
        .map(normalize_epoch_seconds)
        .unwrap_or(created_at);

    let source = body.get("source");
    let subject = source
        .and_then(|s| s.get("subject"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let source_author_name = source
        .and_then(|s| s.get("author"))
        .and_then(|a| a.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let rating = body
        .get("conversation_rating")
        .and_then(|r| r.get("rating"))
        .and_then(Value::as_i64);

    let contact_ids = body
        .get("contacts")
        .map(unwrap_contact_ids)
        .unwrap_or_default();

    Ok(Conversation {
        id,
        created_at,
        updated_at,
        state: body
            .get("state")
            .and_then(Value::as_str)
            .map(str::to_string),
        subject,
        source_author_name,
        parts: unwrap_parts(body),
        rating,
        contact_ids,
    })
}

/// The single adapter that normalizes every observed `parts` shape into a
/// canonical `Vec<Part>`.
///
/// Observed shapes on the conversation object:
/// - `conversation_parts: {conversation_parts: [...]}` (current upstream),
/// - `conversation_parts: [...]`,
/// - `parts: [...]` or `parts: {parts: [...]}` (older payloads).
pub fn unwrap_parts(conversation: &Value) -> Vec<Part> {
    let candidates = ["conversation_parts", "parts"];
    for key in candidates {
        let Some(node) = conversation.get(key) else {
            continue;
        };
        if let Some(list) = as_part_array(node, &candidates) {
            return list.iter().filter_map(decode_part).collect();
        }
    }
    Vec::new()
}

/// Unwraps a node that is either a part array or a wrapper object holding
/// one under a known key, at most one extra level deep.
fn as_part_array<'a>(node: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    if let Some(list) = node.as_array() {
        return Some(list);
    }
    for key in keys {
        if let Some(list) = node.get(key).and_then(Value::as_array) {
            return Some(list);
        }
    }
    None
}

fn decode_part(value: &Value) -> Option<Part> {
    // Tolerate parts with no id; synthesize nothing, just keep the slot.
    let id = value
        .get("id")
        .and_then(normalize_id)
        .unwrap_or_default();

    let author = value.get("author").and_then(decode_author);

    Some(Part {
        id,
        part_type: value
            .get("part_type")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        author,
        body: value
            .get("body")
            .and_then(Value::as_str)
            .map(str::to_string),
        created_at: value.get("created_at").and_then(Value::as_i64),
    })
}

fn decode_author(value: &Value) -> Option<PartAuthor> {
    let kind = value.get("type").and_then(Value::as_str)?;
    Some(PartAuthor {
        kind: kind.to_string(),
        id: value.get("id").and_then(normalize_id),
        name: value
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn unwrap_contact_ids(node: &Value) -> Vec<String> {
    // `contacts` is either an array or `{contacts: [...]}`.
    let list = node
        .as_array()
        .or_else(|| node.get("contacts").and_then(Value::as_array));
    let Some(list) = list else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|c| c.get("id").and_then(normalize_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_string_and_numeric_ids_identically() {
        assert_eq!(normalize_id(&json!("8742044")), Some("8742044".to_string()));
        assert_eq!(normalize_id(&json!(8742044)), Some("8742044".to_string()));
        assert_eq!(normalize_id(&json!(" 42 ")), Some("42".to_string()));
        assert_eq!(normalize_id(&json!("")), None);
        assert_eq!(normalize_id(&json!(null)), None);
    }

    #[test]
    fn zero_padded_digit_strings_match_their_numeric_form() {
        // "0123" and 123 compared equal under numeric comparison; the
        // canonical form has to preserve that.
        assert_eq!(normalize_id(&json!("0123")), Some("123".to_string()));
        assert_eq!(normalize_id(&json!(123)), Some("123".to_string()));
        assert_eq!(normalize_admin_id("0123"), "123");
        assert_eq!(normalize_admin_id("000"), "0");
        // Non-numeric IDs keep their zeros.
        assert_eq!(normalize_admin_id("0x23"), "0x23");
        assert_eq!(normalize_admin_id("abc007"), "abc007");
    }

    #[test]
    fn extracts_cursor_from_bare_string() {
        let pages = json!({"next": "WzE3MDBd"});
        assert_eq!(extract_cursor(&pages), Some("WzE3MDBd".to_string()));
    }

    #[test]
    fn extracts_cursor_embedded_in_query_string() {
        let pages = json!({"next": "/conversations/search?per_page=150&starting_after=WzE3MDBd&foo=1"});
        assert_eq!(extract_cursor(&pages), Some("WzE3MDBd".to_string()));
    }

    #[test]
    fn extracts_cursor_from_structured_object() {
        let pages = json!({"next": {"starting_after": "abc123"}});
        assert_eq!(extract_cursor(&pages), Some("abc123".to_string()));
        let pages = json!({"next": {"cursor": "def456"}});
        assert_eq!(extract_cursor(&pages), Some("def456".to_string()));
    }

    #[test]
    fn unparseable_cursor_fails_closed() {
        assert_eq!(extract_cursor(&json!({"next": 17})), None);
        assert_eq!(extract_cursor(&json!({"next": {"page": 2}})), None);
        assert_eq!(extract_cursor(&json!({"next": ""})), None);
        assert_eq!(extract_cursor(&json!({})), None);
    }

    #[test]
    fn decodes_search_response_with_mixed_id_types() {
        let body = json!({
            "conversations": [{"id": "101"}, {"id": 102}, {"no_id": true}],
            "total_count": 240,
            "pages": {"next": {"starting_after": "tok"}}
        });
        let page = decode_search_response(&body).unwrap();
        assert_eq!(page.ids, vec!["101", "102"]);
        assert_eq!(page.total_count, 240);
        assert_eq!(page.next_cursor, Some("tok".to_string()));
    }

    #[test]
    fn search_response_without_conversations_is_a_decode_error() {
        assert!(decode_search_response(&json!({"total_count": 0})).is_err());
    }

    #[test]
    fn unwraps_flat_parts_array() {
        let conversation = json!({
            "parts": [{"id": 1, "part_type": "comment"}]
        });
        let parts = unwrap_parts(&conversation);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].id, "1");
    }

    #[test]
    fn unwraps_singly_nested_parts() {
        let conversation = json!({
            "conversation_parts": [{"id": "a", "part_type": "comment"}]
        });
        assert_eq!(unwrap_parts(&conversation).len(), 1);
    }

    #[test]
    fn unwraps_doubly_nested_parts() {
        let conversation = json!({
            "conversation_parts": {
                "total_count": 2,
                "conversation_parts": [
                    {"id": "a", "part_type": "comment"},
                    {"id": "b", "part_type": "note"}
                ]
            }
        });
        assert_eq!(unwrap_parts(&conversation).len(), 2);
    }

    #[test]
    fn missing_parts_decode_to_empty() {
        assert!(unwrap_parts(&json!({"id": "1"})).is_empty());
        assert!(unwrap_parts(&json!({"conversation_parts": {"total_count": 0}})).is_empty());
    }

    #[test]
    fn decodes_full_conversation() {
        let body = json!({
            "id": 9000,
            "created_at": 1700000000i64,
            "updated_at": 1700000000000i64,
            "state": "open",
            "source": {"subject": "Refund", "author": {"name": "Ada"}},
            "conversation_rating": {"rating": 4},
            "contacts": {"contacts": [{"id": "c1"}]},
            "conversation_parts": {
                "conversation_parts": [
                    {"id": 1, "part_type": "comment",
                     "author": {"type": "admin", "id": 77, "name": "Sam"},
                     "body": "hello", "created_at": 1700000100i64}
                ]
            }
        });
        let conversation = decode_conversation(&body).unwrap();
        assert_eq!(conversation.id, "9000");
        // Millisecond updated_at collapses to the same second.
        assert_eq!(conversation.created_at, conversation.updated_at);
        assert_eq!(conversation.subject.as_deref(), Some("Refund"));
        assert_eq!(conversation.rating, Some(4));
        assert_eq!(conversation.contact_ids, vec!["c1"]);
        let author = conversation.parts[0].author.as_ref().unwrap();
        assert_eq!(author.kind, "admin");
        assert_eq!(author.id.as_deref(), Some("77"));
    }

    #[test]
    fn conversation_without_id_is_a_decode_error() {
        assert!(decode_conversation(&json!({"created_at": 1})).is_err());
    }
}
