//! Parsers for the platform's GraphQL timeline payloads.
//!
//! Both feeds answer with a list of timeline instructions; only the
//! `TimelineAddEntries` instruction carries entries we care about.

use serde_json::Value;

use super::types::{MentionEvent, MentionsPage, PostResult, Tweet};
use crate::error::{BotError, Result};

const ADD_ENTRIES: &str = "TimelineAddEntries";
const CURSOR_TOP_PREFIX: &str = "cursor-top-";
const NOTIFICATION_PREFIX: &str = "notification-";
const TWEET_PREFIX: &str = "tweet-";

const MENTIONS_INSTRUCTIONS: &str =
    "/data/viewer_v2/user_results/result/notification_timeline/timeline/instructions";
const DETAIL_INSTRUCTIONS: &str = "/data/threaded_conversation_with_injections_v2/instructions";

/// Parse one page of the notifications timeline.
///
/// The top cursor entry is mandatory: without it the next page cannot be
/// requested, so its absence is an error rather than an empty page.
pub fn parse_mentions_page(body: &Value) -> Result<MentionsPage> {
    let entries = add_entries(body, MENTIONS_INSTRUCTIONS)
        .ok_or_else(|| BotError::malformed("mentions timeline has no TimelineAddEntries"))?;

    let cursor = entries
        .iter()
        .find(|e| entry_id(e).is_some_and(|id| id.starts_with(CURSOR_TOP_PREFIX)))
        .and_then(|e| str_at(e, "/content/value"))
        .ok_or_else(|| BotError::malformed("mentions timeline has no top cursor"))?
        .to_string();

    let events = entries
        .iter()
        .filter(|e| entry_id(e).is_some_and(|id| id.starts_with(NOTIFICATION_PREFIX)))
        .map(|e| {
            let legacy = tweet_result(e).and_then(|r| r.get("legacy"));
            MentionEvent {
                root_tweet_id: legacy
                    .and_then(|l| str_at(l, "/in_reply_to_status_id_str"))
                    .map(str::to_string),
                mention_tweet_id: legacy.and_then(|l| str_at(l, "/id_str")).map(str::to_string),
            }
        })
        .collect();

    Ok(MentionsPage { cursor, events })
}

/// Extract the focal tweet from a `TweetDetail` conversation view.
///
/// The conversation comes back oldest-first with the requested tweet as the
/// last `tweet-` entry, so the last such entry is taken. This is positional:
/// quoted tweets or self-threads that append further `tweet-` entries after the
/// focal one would break it.
pub fn parse_tweet_detail(tweet_id: &str, body: &Value) -> Result<Tweet> {
    let fail = |reason: &str| BotError::Resolution {
        tweet_id: tweet_id.to_string(),
        reason: reason.to_string(),
    };

    let entries = add_entries(body, DETAIL_INSTRUCTIONS)
        .ok_or_else(|| fail("conversation has no TimelineAddEntries"))?;

    let focal = entries
        .iter()
        .rev()
        .find(|e| entry_id(e).is_some_and(|id| id.starts_with(TWEET_PREFIX)))
        .ok_or_else(|| fail("conversation has no tweet entries"))?;

    let result = tweet_result(focal).ok_or_else(|| fail("tweet entry has no result"))?;

    let field = |pointer: &str, name: &str| {
        str_at(result, pointer)
            .map(str::to_string)
            .ok_or_else(|| fail(&format!("missing {name}")))
    };

    let user_name = str_at(result, "/core/user_results/result/core/screen_name")
        .or_else(|| str_at(result, "/core/user_results/result/legacy/screen_name"))
        .map(str::to_string)
        .ok_or_else(|| fail("missing screen_name"))?;

    Ok(Tweet {
        tweet_id: field("/legacy/id_str", "id_str")?,
        user_id: field("/legacy/user_id_str", "user_id_str")?,
        user_name,
        text: field("/legacy/full_text", "full_text")?,
    })
}

/// Read the id of a freshly created tweet from a `CreateTweet` response.
///
/// A response carrying `errors` is a failed post even when the status was 200.
pub fn parse_create_reply(in_reply_to: &str, body: &Value) -> Result<PostResult> {
    if let Some(message) = body
        .pointer("/errors/0/message")
        .and_then(Value::as_str)
    {
        return Err(BotError::Post {
            tweet_id: in_reply_to.to_string(),
            reason: message.to_string(),
        });
    }

    let reply_id = str_at(body, "/data/create_tweet/tweet_results/result/rest_id")
        .map(str::to_string);
    Ok(PostResult { reply_id })
}

fn add_entries<'a>(body: &'a Value, instructions: &str) -> Option<&'a Vec<Value>> {
    body.pointer(instructions)?
        .as_array()?
        .iter()
        .find(|i| str_at(i, "/type") == Some(ADD_ENTRIES))?
        .get("entries")?
        .as_array()
}

/// The tweet carried by a timeline entry. Tweets with reply restrictions are
/// wrapped one level deeper.
fn tweet_result(entry: &Value) -> Option<&Value> {
    let result = entry.pointer("/content/itemContent/tweet_results/result")?;
    if str_at(result, "/__typename") == Some("TweetWithVisibilityResults") {
        return result.get("tweet");
    }
    Some(result)
}

fn entry_id(entry: &Value) -> Option<&str> {
    str_at(entry, "/entryId")
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    pub fn notification(root: Option<&str>, id: &str) -> Value {
        let mut legacy = json!({ "id_str": id });
        if let Some(root) = root {
            legacy["in_reply_to_status_id_str"] = json!(root);
        }
        json!({
            "entryId": format!("notification-{id}"),
            "content": { "itemContent": { "tweet_results": { "result": { "legacy": legacy } } } }
        })
    }

    pub fn mentions_body(cursor: Option<&str>, notifications: Vec<Value>) -> Value {
        let mut entries = Vec::new();
        if let Some(cursor) = cursor {
            entries.push(json!({
                "entryId": "cursor-top-1",
                "content": { "value": cursor }
            }));
        }
        entries.extend(notifications);
        entries.push(json!({
            "entryId": "cursor-bottom-1",
            "content": { "value": "bottom" }
        }));
        json!({
            "data": { "viewer_v2": { "user_results": { "result": { "notification_timeline": {
                "timeline": { "instructions": [
                    { "type": "TimelineClearCache" },
                    { "type": "TimelineAddEntries", "entries": entries }
                ] }
            } } } } }
        })
    }

    pub fn tweet_entry(id: &str, user_id: &str, user_name: &str, text: &str) -> Value {
        json!({
            "entryId": format!("tweet-{id}"),
            "content": { "itemContent": { "tweet_results": { "result": {
                "__typename": "Tweet",
                "core": { "user_results": { "result": { "core": { "screen_name": user_name } } } },
                "legacy": { "id_str": id, "user_id_str": user_id, "full_text": text }
            } } } }
        })
    }

    pub fn detail_body(entries: Vec<Value>) -> Value {
        json!({
            "data": { "threaded_conversation_with_injections_v2": { "instructions": [
                { "type": "TimelineAddEntries", "entries": entries },
                { "type": "TimelineTerminateTimeline", "direction": "Top" }
            ] } }
        })
    }
}
