// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps the model's structured showtime choice onto the candidate list
//! offered in an earlier turn.
//!
//! The model answers with exactly one of `{"choice_index": n}` (1-based,
//! `-1` to decline) or `{"choice_time": "HH:mm"}`. Anything else, or a
//! choice that does not single out one candidate, is unresolved.

use serde_json::Value;
use tracing::{debug, warn};

use cinebot_core::{ChatMessage, ChatRole};
use cinebot_tools::DateResolver;

/// Reply when the user declines every offered showtime.
pub const DECLINED_REPLY: &str = "Đã hiểu. Bạn cần tôi giúp gì khác không?";

/// Reply when the choice cannot be matched to exactly one showtime.
pub const UNRESOLVED_REPLY: &str = "Rất tiếc, tôi không hiểu lựa chọn của bạn. Vui lòng thử lại bằng cách nói rõ giờ chiếu (ví dụ: 'chọn suất 13:45').";

/// The structured answer parsed from the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Index(i64),
    Time(String),
}

/// Result of confirmation extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
    Declined,
    /// The chosen showtime row, exactly as the showtime tool returned it.
    Selected(Value),
    Unresolved,
}

impl Confirmation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Declined => "declined",
            Self::Selected(_) => "selected",
            Self::Unresolved => "unresolved",
        }
    }

    pub fn reply_text(&self) -> String {
        match self {
            Self::Declined => DECLINED_REPLY.to_string(),
            Self::Selected(showtime) => Value::Array(vec![showtime.clone()]).to_string(),
            Self::Unresolved => UNRESOLVED_REPLY.to_string(),
        }
    }

    /// The booking candidate payload, `[showtime]`.
    pub fn booking_data(&self) -> Option<Value> {
        match self {
            Self::Selected(showtime) => Some(Value::Array(vec![showtime.clone()])),
            Self::Declined | Self::Unresolved => None,
        }
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Parse the model's JSON answer.
pub fn parse_choice(raw: &str) -> Option<Choice> {
    let value: Value = serde_json::from_str(strip_code_fence(raw)).ok()?;
    if let Some(index) = value.get("choice_index") {
        let index = match index {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        return index.map(Choice::Index);
    }
    value
        .get("choice_time")
        .and_then(Value::as_str)
        .and_then(normalize_clock)
        .map(Choice::Time)
}

/// `9:05` → `09:05`. `None` unless it is a valid 24-hour time.
fn normalize_clock(raw: &str) -> Option<String> {
    let (h, m) = raw.trim().split_once(':')?;
    let (h, m): (u32, u32) = (h.trim().parse().ok()?, m.trim().parse().ok()?);
    (h < 24 && m < 60).then(|| format!("{h:02}:{m:02}"))
}

fn showtime_list(text: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Array(rows) if !rows.is_empty() && rows.iter().all(|r| r.get("start_time").is_some()) => {
            Some(rows)
        }
        _ => None,
    }
}

/// The most recent showtime list among tool results, newest first.
pub fn latest_candidates<'a>(tool_texts: impl DoubleEndedIterator<Item = &'a str>) -> Option<Vec<Value>> {
    tool_texts.rev().find_map(showtime_list)
}

/// Candidates from a replayed conversation.
pub fn candidates_in(history: &[ChatMessage]) -> Option<Vec<Value>> {
    latest_candidates(
        history
            .iter()
            .filter(|m| m.role == ChatRole::Tool)
            .map(ChatMessage::text),
    )
}

/// Resolve `raw` against `candidates`.
///
/// Several showtimes at the same clock time are told apart by a cinema name
/// the user mentioned in `utterance`.
pub fn extract(
    raw: &str,
    candidates: Option<&[Value]>,
    utterance: &str,
    dates: &DateResolver,
) -> Confirmation {
    let Some(choice) = parse_choice(raw) else {
        warn!(response = %raw, "model returned no usable choice");
        return Confirmation::Unresolved;
    };
    if choice == Choice::Index(-1) {
        return Confirmation::Declined;
    }
    let Some(candidates) = candidates.filter(|c| !c.is_empty()) else {
        warn!("no showtime list to confirm against");
        return Confirmation::Unresolved;
    };

    match choice {
        Choice::Index(n) => usize::try_from(n)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| candidates.get(i))
            .map_or(Confirmation::Unresolved, |c| Confirmation::Selected(c.clone())),
        Choice::Time(time) => {
            let matches: Vec<&Value> = candidates
                .iter()
                .filter(|c| {
                    c.get("start_time")
                        .and_then(Value::as_str)
                        .and_then(|s| dates.clock_time(s))
                        .is_some_and(|t| t == time)
                })
                .collect();
            debug!(time = %time, matches = matches.len(), "matching showtime by clock time");
            match matches.as_slice() {
                [one] => Confirmation::Selected((*one).clone()),
                [] => Confirmation::Unresolved,
                several => by_cinema(several, utterance),
            }
        }
    }
}

fn by_cinema(matches: &[&Value], utterance: &str) -> Confirmation {
    let said = utterance.to_lowercase();
    let named: Vec<&&Value> = matches
        .iter()
        .filter(|c| {
            c.get("cinema_name")
                .and_then(Value::as_str)
                .is_some_and(|name| said.contains(&name.to_lowercase()))
        })
        .collect();
    match named.as_slice() {
        [one] => Confirmation::Selected((**one).clone()),
        _ => Confirmation::Unresolved,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn candidates() -> Vec<Value> {
        vec![
            json!({"showtime_id": 1, "cinema_name": "CGV Aeon Long Biên", "start_time": "2026-10-20T05:30:00Z"}),
            json!({"showtime_id": 2, "cinema_name": "CGV Vincom Center", "start_time": "2026-10-20T06:45:00Z"}),
            json!({"showtime_id": 3, "cinema_name": "CGV Giga Mall", "start_time": "2026-10-20T06:45:00+00:00"}),
        ]
    }

    fn run(raw: &str, utterance: &str) -> Confirmation {
        extract(raw, Some(&candidates()[..]), utterance, &DateResolver::default())
    }

    fn selected_id(c: &Confirmation) -> Option<i64> {
        match c {
            Confirmation::Selected(v) => v["showtime_id"].as_i64(),
            _ => None,
        }
    }

    #[test]
    fn index_is_one_based() {
        assert_eq!(selected_id(&run(r#"{"choice_index": 2}"#, "suất thứ hai")), Some(2));
        assert_eq!(selected_id(&run(r#"{"choice_index": "1"}"#, "suất đầu")), Some(1));
    }

    #[test]
    fn out_of_range_and_zero_are_unresolved() {
        assert_eq!(run(r#"{"choice_index": 99}"#, "x"), Confirmation::Unresolved);
        assert_eq!(run(r#"{"choice_index": 0}"#, "x"), Confirmation::Unresolved);
        assert_eq!(run(r#"{"choice_index": -2}"#, "x"), Confirmation::Unresolved);
    }

    #[test]
    fn decline_needs_no_candidates() {
        let c = extract(r#"{"choice_index": -1}"#, None, "thôi", &DateResolver::default());
        assert_eq!(c, Confirmation::Declined);
        assert_eq!(c.reply_text(), DECLINED_REPLY);
        assert_eq!(c.booking_data(), None);
    }

    #[test]
    fn clock_time_matches_in_reference_timezone() {
        assert_eq!(selected_id(&run(r#"{"choice_time": "12:30"}"#, "12h30")), Some(1));
    }

    #[test]
    fn shared_clock_time_needs_a_cinema_name() {
        assert_eq!(run(r#"{"choice_time": "13:45"}"#, "suất 13:45"), Confirmation::Unresolved);
        let c = run(r#"{"choice_time": "13:45"}"#, "suất 13:45 ở cgv giga mall");
        assert_eq!(selected_id(&c), Some(3));
        assert_eq!(c.booking_data().unwrap()[0]["showtime_id"], 3);
    }

    #[test]
    fn malformed_answers_are_unresolved() {
        assert_eq!(run("tôi chọn suất 2", "x"), Confirmation::Unresolved);
        assert_eq!(run(r#"{"choice_time": "25:00"}"#, "x"), Confirmation::Unresolved);
        assert_eq!(run(r#"{"choice_time": "08:00"}"#, "x"), Confirmation::Unresolved);
        let none = extract(r#"{"choice_index": 1}"#, None, "x", &DateResolver::default());
        assert_eq!(none.reply_text(), UNRESOLVED_REPLY);
    }

    #[test]
    fn parsing_tolerates_fences_and_short_hours() {
        assert_eq!(
            parse_choice("```json\n{\"choice_time\": \"9:05\"}\n```"),
            Some(Choice::Time("09:05".into()))
        );
        assert_eq!(parse_choice(r#"{"choice_index": 3}"#), Some(Choice::Index(3)));
        assert_eq!(parse_choice("{}"), None);
    }

    #[test]
    fn latest_showtime_list_wins() {
        let history = vec![
            ChatMessage::tool_result("a", "get_showtimes_for_movie", r#"[{"showtime_id": 1, "start_time": "x"}]"#),
            ChatMessage::tool_result("b", "get_showtimes_for_movie", r#"[{"showtime_id": 7, "start_time": "y"}]"#),
            ChatMessage::tool_result("c", "get_movie_details", r#"{"title": "Mai"}"#),
            ChatMessage::assistant(r#"[{"showtime_id": 9, "start_time": "z"}]"#),
        ];
        let found = candidates_in(&history).unwrap();
        assert_eq!(found[0]["showtime_id"], 7);
        assert!(candidates_in(&[]).is_none());
    }

    #[test]
    fn selection_reply_is_the_showtime_list_json() {
        let c = run(r#"{"choice_index": 1}"#, "x");
        let parsed: Value = serde_json::from_str(&c.reply_text()).unwrap();
        assert_eq!(parsed[0]["cinema_name"], "CGV Aeon Long Biên");
    }
}
