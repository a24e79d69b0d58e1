use std::ops::Range;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dates::{self, default_due_time, ResolvedDate};
use crate::model::{ParseSource, ParsedTask, Priority};

const UNTITLED: &str = "Untitled task";
const NAME: &str = r"([A-Z][a-z'\-]+(?:\s+[A-Z][a-z'\-]+)?)";

static ASSIGN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(?i:assign(?:ed)?(?:\s+it)?\s+to|delegate(?:d)?(?:\s+it)?\s+to)\s+{NAME}\b"
    ))
    .expect("valid regex")
});
static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[\s(])(@([A-Za-z][A-Za-z0-9_\-]*))").expect("valid regex"));
static FOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b(?i:for)\s+{NAME}\b")).expect("valid regex"));

static EXPLICIT_PRIORITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bmake\s+it\s+)?(?:\bpriority\s+)?\bp([1-4])\b(?:\s+priority\b)?")
        .expect("valid regex")
});
static URGENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(urgent(?:ly)?|asap|critical|immediately|emergency)\b").expect("valid regex")
});
static HIGH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(high[\s-]+priority|important)\b").expect("valid regex")
});
static LOW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(low[\s-]+priority|no\s+rush|whenever|someday)\b").expect("valid regex")
});
static NORMAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:normal|medium)[\s-]+priority\b").expect("valid regex"));

static SPACE_BEFORE_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([,;:.!?])").expect("valid regex"));
static REPEATED_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([,;:])(?:\s*[,;:])+").expect("valid regex"));

/// Words that can follow "for"/"assign to" without being a person. Weekday
/// and month names are rejected through the date vocabulary.
const NOT_NAMES: &[&str] = &[
    "today", "tonight", "tomorrow", "tmrw", "tmr", "next", "this", "last", "coming", "me",
    "noon", "midday",
];

/// Words left dangling at the end of a title once phrases are cut out.
const TRAILING_CONNECTORS: &[&str] = &["and", "due", "by", "on", "at", "for", "with", "priority"];

/// Knobs for the rule-based extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub default_time: NaiveTime,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            default_time: default_due_time(),
        }
    }
}

/// Deterministic, offline extractor. Always produces a [`ParsedTask`].
#[derive(Debug, Clone, Default)]
pub struct LocalExtractor {
    options: ParseOptions,
}

impl LocalExtractor {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn parse(&self, text: &str, now: NaiveDateTime) -> ParsedTask {
        parse_natural_language(text, now, &self.options)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Found<T> {
    value: T,
    span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PriorityDecision {
    priority: Priority,
    reason: Option<String>,
    spans: Vec<Range<usize>>,
}

pub fn parse_natural_language(text: &str, now: NaiveDateTime, options: &ParseOptions) -> ParsedTask {
    let resolved = dates::resolve(text, now, options.default_time);
    let assignee = find_assignee(text);
    let decision = detect_priority(text, &resolved, now);

    let mut spans = resolved.spans.clone();
    if let Some(found) = &assignee {
        spans.push(found.span.clone());
    }
    spans.extend(decision.spans);

    let title = build_title(text, &spans);

    ParsedTask {
        title,
        assignee: assignee.map(|found| found.value),
        due_date: resolved.due,
        time_specified: resolved.time_specified,
        priority: decision.priority,
        priority_reason: decision.reason,
        source: ParseSource::Local,
    }
}

fn find_assignee(text: &str) -> Option<Found<String>> {
    if let Some(found) = find_named(&ASSIGN_RE, text) {
        return Some(found);
    }

    if let Some(caps) = MENTION_RE.captures(text) {
        let whole = caps.get(1)?;
        let handle = caps.get(2)?.as_str();
        return Some(Found {
            value: capitalize(handle),
            span: whole.range(),
        });
    }

    find_named(&FOR_RE, text)
}

/// First match of `pattern` whose captured name is a person, trimmed to the
/// words that are not date vocabulary.
fn find_named(pattern: &Regex, text: &str) -> Option<Found<String>> {
    for caps in pattern.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        let mut kept_end = name.start();
        let mut words = Vec::new();
        let mut offset = name.start();
        for word in name.as_str().split_whitespace() {
            let start = text[offset..].find(word).map(|i| offset + i).unwrap_or(offset);
            if !is_person_word(word) {
                break;
            }
            words.push(word);
            kept_end = start + word.len();
            offset = kept_end;
        }

        if words.is_empty() {
            continue;
        }

        return Some(Found {
            value: words.join(" "),
            span: whole.start()..kept_end,
        });
    }
    None
}

fn is_person_word(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    !NOT_NAMES.contains(&lower.as_str())
        && dates::parse_weekday(&lower).is_none()
        && dates::parse_month(&lower).is_none()
}

/// Pick the priority signal. An explicit P1 or an urgency keyword beats any
/// other marker; otherwise the most urgent explicit marker wins before the
/// keyword phrases and the deadline rule.
fn detect_priority(text: &str, resolved: &ResolvedDate, now: NaiveDateTime) -> PriorityDecision {
    let mut explicit: Option<Priority> = None;
    let mut explicit_spans = Vec::new();
    for caps in EXPLICIT_PRIORITY_RE.captures_iter(text) {
        let Some(priority) = caps[1].parse::<u8>().ok().and_then(Priority::from_level) else {
            continue;
        };
        if explicit.map_or(true, |current| priority < current) {
            explicit = Some(priority);
        }
        explicit_spans.extend(caps.get(0).map(|m| m.range()));
    }

    if explicit == Some(Priority::P1) {
        return PriorityDecision {
            priority: Priority::P1,
            reason: Some("explicit P1 marker".to_string()),
            spans: explicit_spans,
        };
    }

    if let Some(caps) = URGENT_RE.captures(text) {
        let keyword = caps[1].to_ascii_lowercase();
        let mut spans = explicit_spans;
        if keyword == "asap" {
            spans.extend(caps.get(0).map(|m| m.range()));
        }
        return PriorityDecision {
            priority: Priority::P1,
            reason: Some(format!("detected urgency keyword '{keyword}'")),
            spans,
        };
    }

    if let Some(priority) = explicit {
        return PriorityDecision {
            priority,
            reason: Some(format!("explicit {priority} marker")),
            spans: explicit_spans,
        };
    }

    if let Some(caps) = HIGH_RE.captures(text) {
        let phrase = normalize_phrase(&caps[1]);
        let span = phrase
            .ends_with("priority")
            .then(|| caps.get(0).map(|m| m.range()))
            .flatten();
        return PriorityDecision {
            priority: Priority::P2,
            reason: Some(format!("detected importance keyword '{phrase}'")),
            spans: span.into_iter().collect(),
        };
    }

    if let Some(caps) = LOW_RE.captures(text) {
        let phrase = normalize_phrase(&caps[1]);
        let strip = phrase.ends_with("priority") || phrase == "no rush";
        let span = strip.then(|| caps.get(0).map(|m| m.range())).flatten();
        return PriorityDecision {
            priority: Priority::P4,
            reason: Some(format!("detected low-priority phrase '{phrase}'")),
            spans: span.into_iter().collect(),
        };
    }

    if let Some(found) = NORMAL_RE.find(text) {
        return PriorityDecision {
            priority: Priority::P3,
            reason: Some("explicit normal priority".to_string()),
            spans: vec![found.range()],
        };
    }

    let stated = resolved.date_specified || resolved.time_specified;
    if stated && resolved.due >= now && resolved.due - now <= Duration::hours(24) {
        return PriorityDecision {
            priority: Priority::P2,
            reason: Some("due within 24 hours".to_string()),
            spans: Vec::new(),
        };
    }

    PriorityDecision {
        priority: Priority::P3,
        reason: None,
        spans: Vec::new(),
    }
}

fn normalize_phrase(value: &str) -> String {
    value
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cut `spans` out of `text` and tidy what is left into a title.
fn build_title(text: &str, spans: &[Range<usize>]) -> String {
    let mut spans = spans.to_vec();
    spans.sort_by_key(|span| span.start);

    let mut remainder = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        if span.start < cursor {
            cursor = cursor.max(span.end);
            continue;
        }
        remainder.push_str(&text[cursor..span.start]);
        remainder.push(' ');
        cursor = span.end;
    }
    remainder.push_str(&text[cursor..]);

    let title = clean_title(&remainder);
    if !title.is_empty() {
        return capitalize(&title);
    }

    let raw = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if raw.is_empty() {
        UNTITLED.to_string()
    } else {
        capitalize(&raw)
    }
}

fn clean_title(value: &str) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    let collapsed = SPACE_BEFORE_PUNCT_RE.replace_all(&collapsed, "$1");
    let collapsed = REPEATED_SEPARATOR_RE.replace_all(&collapsed, "$1");

    let mut title = collapsed.trim_start_matches(is_separator).trim().to_string();
    loop {
        let trimmed = title.trim_end_matches(is_separator).trim_end().to_string();
        let dangling = trimmed
            .rsplit_once(' ')
            .filter(|(_, last)| TRAILING_CONNECTORS.contains(&last.to_ascii_lowercase().as_str()));
        match dangling {
            Some((head, _)) => title = head.to_string(),
            None => {
                title = trimmed;
                break;
            }
        }
    }
    title
}

fn is_separator(c: char) -> bool {
    matches!(c, ',' | ';' | ':' | '-') || c.is_whitespace()
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate, Timelike, Weekday};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// Wednesday, 2024-03-06 09:00.
    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 6)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn parse(text: &str) -> ParsedTask {
        LocalExtractor::default().parse(text, now())
    }

    #[test]
    fn parses_full_sentence() {
        let task = parse("Write proposal, assign to Sarah, P1, due next Friday 2pm");

        assert_eq!(task.title, "Write proposal");
        assert_eq!(task.assignee.as_deref(), Some("Sarah"));
        assert_eq!(task.priority, Priority::P1);
        assert_eq!(task.priority_reason.as_deref(), Some("explicit P1 marker"));
        assert!(task.time_specified);
        assert_eq!(task.due_date.weekday(), Weekday::Fri);
        assert_eq!(task.due_date.date(), NaiveDate::from_ymd_opt(2024, 3, 8).unwrap());
        assert_eq!((task.due_date.hour(), task.due_date.minute()), (14, 0));
        assert_eq!(task.source, ParseSource::Local);
    }

    #[test]
    fn parses_long_form_request() {
        let task = parse(
            "Write a comprehensive project proposal for the new mobile app, assign to Sarah, make it P1 priority due next Friday 2pm",
        );
        assert_eq!(
            task.title,
            "Write a comprehensive project proposal for the new mobile app"
        );
        assert_eq!(task.assignee.as_deref(), Some("Sarah"));
        assert_eq!(task.priority, Priority::P1);
    }

    #[rstest]
    #[case("Fix login bug P1")]
    #[case("urgent: fix login bug")]
    #[case("fix login bug asap")]
    #[case("Fix the URGENT login bug")]
    #[case("fix login bug, p1, for Dana")]
    #[case("Fix login bug P3 p1")]
    fn urgency_markers_yield_p1_with_reason(#[case] text: &str) {
        let task = parse(text);
        assert_eq!(task.priority, Priority::P1);
        assert!(task.priority_reason.as_deref().is_some_and(|r| !r.is_empty()));
    }

    #[rstest]
    #[case("Buy groceries")]
    #[case("write the quarterly report for the board")]
    #[case("Plan offsite next week")]
    #[case("")]
    fn no_signal_defaults_to_p3_without_reason(#[case] text: &str) {
        let task = parse(text);
        assert_eq!(task.priority, Priority::P3);
        assert_eq!(task.priority_reason, None);
    }

    #[rstest]
    #[case("Prepare slides, high priority", Priority::P2, "Prepare slides")]
    #[case("Important: renew passport", Priority::P2, "Important: renew passport")]
    #[case("Clean garage, low priority", Priority::P4, "Clean garage")]
    #[case("Read that book, no rush", Priority::P4, "Read that book")]
    #[case("File expenses, medium priority", Priority::P3, "File expenses")]
    #[case("Ship release P2", Priority::P2, "Ship release")]
    fn keyword_priorities(#[case] text: &str, #[case] priority: Priority, #[case] title: &str) {
        let task = parse(text);
        assert_eq!(task.priority, priority);
        assert!(task.priority_reason.is_some());
        assert_eq!(task.title, title);
    }

    #[rstest]
    #[case("Fix login bug asap, P3", "detected urgency keyword 'asap'", "Fix login bug")]
    #[case("urgent: ship hotfix P2", "detected urgency keyword 'urgent'", "Urgent: ship hotfix")]
    #[case("Ship hotfix P4, P1", "explicit P1 marker", "Ship hotfix")]
    fn urgency_outranks_lower_explicit_marker(
        #[case] text: &str,
        #[case] reason: &str,
        #[case] title: &str,
    ) {
        let task = parse(text);
        assert_eq!(task.priority, Priority::P1);
        assert_eq!(task.priority_reason.as_deref(), Some(reason));
        assert_eq!(task.title, title);
    }

    #[test]
    fn most_urgent_explicit_marker_wins() {
        let task = parse("Tidy backlog P4 then P2, high priority");
        assert_eq!(task.priority, Priority::P2);
        assert_eq!(task.priority_reason.as_deref(), Some("explicit P2 marker"));
    }

    #[test]
    fn deadline_within_a_day_raises_priority() {
        let task = parse("send invoice today");
        assert_eq!(task.priority, Priority::P2);
        assert_eq!(task.priority_reason.as_deref(), Some("due within 24 hours"));
        assert_eq!(task.title, "Send invoice");
    }

    #[rstest]
    #[case("Review PR for Alex", Some("Alex"), "Review PR")]
    #[case("Review PR @jordan", Some("Jordan"), "Review PR")]
    #[case("Draft memo, assigned to Mary Jane", Some("Mary Jane"), "Draft memo")]
    #[case("Draft memo, delegate to Omar tomorrow", Some("Omar"), "Draft memo")]
    #[case("Book flights for Friday", None, "Book flights")]
    #[case("Book flights for Fri", None, "Book flights")]
    #[case("Book flights for Dec 5", None, "Book flights")]
    #[case("Pack for Sat", None, "Pack")]
    #[case("Review PR for Marcus", Some("Marcus"), "Review PR")]
    #[case("Buy a gift for the team", None, "Buy a gift for the team")]
    fn assignee_detection(
        #[case] text: &str,
        #[case] assignee: Option<&str>,
        #[case] title: &str,
    ) {
        let task = parse(text);
        assert_eq!(task.assignee.as_deref(), assignee);
        assert_eq!(task.title, title);
    }

    #[test]
    fn name_stops_before_weekday() {
        let task = parse("Prep deck, assign to Sarah Friday");
        assert_eq!(task.assignee.as_deref(), Some("Sarah"));
        assert_eq!(task.title, "Prep deck");
        assert_eq!(task.due_date.weekday(), Weekday::Fri);
    }

    #[test]
    fn title_falls_back_to_raw_text_when_everything_is_consumed() {
        let task = parse("tomorrow 3pm");
        assert_eq!(task.title, "Tomorrow 3pm");
        assert!(task.time_specified);
    }

    #[test]
    fn empty_input_still_yields_a_task() {
        let task = parse("   ");
        assert_eq!(task.title, UNTITLED);
        assert_eq!(task.assignee, None);
        assert!(!task.time_specified);
        assert_eq!(task.due_date.date(), now().date());
    }

    #[test]
    fn title_is_capitalized_and_tidied() {
        assert_eq!(clean_title("  call bank ,  , and "), "call bank");
        assert_eq!(capitalize("ünïcode"), "Ünïcode");
        assert_eq!(build_title("email bob", &[]), "Email bob");
    }
}
