use std::sync::OnceLock;

use regex::Regex;

use super::similarity::{normalize, text_similarity};

const FAREWELL_PHRASES: &[&str] = &[
    // everyday closings
    "goodbye",
    "bye",
    "thank you for your help",
    "that's all",
    "have a good day",
    "thanks for your assistance",
    "thanks for your help",
    "thank you for the information",
    "i appreciate your help",
    "that answers my question",
    "that's what i needed to know",
    "i have no more questions",
    "that's it for now",
    "until next time",
    "have a nice day",
    "take care",
    "farewell",
    "see you later",
    "thanks again",
    "this has been helpful",
    "this was helpful",
    // the bots noticing the exchange is over
    "conversation has reached its conclusion",
    "reached its logical conclusion",
    "conversation has ended",
    "end of this conversation",
    "ready for your next instruction",
    "ready for the next query",
    "standing by",
    "standing by to assist",
    "wait for genuine human input",
    "wait for your next question",
    "ready to move on",
    "this exchange is complete",
    "this interaction has concluded",
    "unusual situation",
    "unusual exchange",
    "unusual interaction",
    "unusual circumstance",
    "reached an impasse",
    "conversation loop",
    "break this pattern",
    "break this loop",
    // bare gratitude
    "thank you",
    "thanks",
    "appreciate",
    "grateful",
];

const RESOLUTION_PHRASES: &[&str] = &[
    "hope that helps",
    "hope this helps",
    "hope that answered",
    "hope this answered",
    "that should address",
    "that covers",
    "as requested",
    "as you asked",
    "as mentioned",
];

const META_KEYWORDS: &[&str] = &[
    "conversation",
    "exchange",
    "interaction",
    "discussion",
    "conclude",
    "conclusion",
    "end",
    "finished",
    "complete",
    "impasse",
    "loop",
    "pattern",
    "test",
    "scenario",
];

/// Messages shorter than this many words read as winding down.
const SHORT_MESSAGE_WORDS: usize = 20;
/// Mean pairwise similarity above which the tail counts as repetitive.
const REPETITION_FLOOR: f64 = 0.7;
const REPETITION_SCALE: f64 = 3.33;
const REPETITION_WINDOW: usize = 4;

struct Patterns {
    gratitude: Regex,
    closure: Regex,
    awaiting: Regex,
    odd_state: Regex,
    summary: Regex,
    self_reference: Regex,
    both_bots: Regex,
    standing_by: Regex,
    needs_input: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |src: &str| Regex::new(src).expect("detector pattern is a valid literal");
        Patterns {
            gratitude: re(r"thank(s| you)|appreciate|grateful"),
            closure: re(r"that's (all|it)|no (more|other) questions|conclude|conclusion|end|finish"),
            awaiting: re(r"(wait|ready) for (your|the next|human|genuine)"),
            odd_state: re(r"(unusual|strange|peculiar) (situation|exchange|interaction|circumstance)"),
            summary: re(r"in summary|to summarize|in conclusion|to recap"),
            self_reference: re(r"(this|the) conversation (has|is|seems|appears)"),
            both_bots: re(r"(both|two|we are) (ai|assistant|claude)"),
            standing_by: re(r"(wait|ready|standing by) for (your|the next|human|genuine|new)"),
            needs_input: re(
                r"(need|require|wait for) (human|user|new|next) (input|query|question|instruction)",
            ),
        }
    })
}

fn bump(hit: bool, amount: f64) -> f64 {
    if hit {
        amount
    } else {
        0.0
    }
}

/// Goodbyes, thanks and closure statements across `messages`.
pub(crate) fn farewell(messages: &[&str]) -> f64 {
    let p = patterns();
    let score: f64 = messages
        .iter()
        .map(|message| {
            let lower = message.to_lowercase();
            let phrases = FAREWELL_PHRASES
                .iter()
                .filter(|phrase| lower.contains(*phrase))
                .count() as f64
                * 0.5;
            phrases
                + bump(p.gratitude.is_match(&lower), 0.3)
                + bump(p.closure.is_match(&lower), 0.4)
                + bump(p.awaiting.is_match(&lower), 0.5)
                + bump(p.odd_state.is_match(&lower), 0.3)
        })
        .sum();
    score.min(1.0)
}

/// Repetition over the final four messages; zero for shorter histories.
pub(crate) fn repetition(messages: &[&str]) -> f64 {
    if messages.len() < REPETITION_WINDOW {
        return 0.0;
    }
    let tail: Vec<String> = messages[messages.len() - REPETITION_WINDOW..]
        .iter()
        .map(|m| normalize(m))
        .collect();

    for (i, a) in tail.iter().enumerate() {
        if tail[i + 1..].contains(a) {
            return 1.0;
        }
    }

    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..tail.len() {
        for j in i + 1..tail.len() {
            total += text_similarity(&tail[i], &tail[j]);
            pairs += 1;
        }
    }
    let mean = total / pairs as f64;
    if mean > REPETITION_FLOOR {
        ((mean - REPETITION_FLOOR) * REPETITION_SCALE).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Whether the last message wraps the topic up. Any question mark vetoes.
pub(crate) fn resolution(last: &str) -> f64 {
    if last.contains('?') || last.trim().is_empty() {
        return 0.0;
    }
    let lower = last.to_lowercase();
    let phrases = RESOLUTION_PHRASES
        .iter()
        .filter(|phrase| lower.contains(*phrase))
        .count() as f64
        * 0.3;
    let score = phrases
        + bump(patterns().summary.is_match(&lower), 0.4)
        + bump(last.split_whitespace().count() < SHORT_MESSAGE_WORDS, 0.2);
    score.min(1.0)
}

/// Talk about the conversation itself rather than its topic.
pub(crate) fn meta_conversation(messages: &[&str]) -> f64 {
    let p = patterns();
    let score: f64 = messages
        .iter()
        .map(|message| {
            let lower = message.to_lowercase();
            let keywords = META_KEYWORDS
                .iter()
                .filter(|kw| lower.contains(*kw))
                .count();
            bump(keywords >= 2, 0.4)
                + bump(p.self_reference.is_match(&lower), 0.5)
                + bump(p.both_bots.is_match(&lower), 0.6)
        })
        .sum();
    score.min(1.0)
}

/// Both sides announcing they are waiting on someone else.
pub(crate) fn waiting_pattern(messages: &[&str]) -> f64 {
    let p = patterns();
    let indicators: usize = messages
        .iter()
        .map(|message| {
            let lower = message.to_lowercase();
            usize::from(p.standing_by.is_match(&lower)) + usize::from(p.needs_input.is_match(&lower))
        })
        .sum();
    match indicators {
        0 => 0.0,
        1 => 0.4,
        _ => 0.8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[rstest]
    #[case::plain_goodbye("Goodbye", 1.0)]
    #[case::gratitude_only("I am grateful", 0.8)]
    #[case::closure_only("We should finish", 0.4)]
    #[case::nothing("The weather is mild", 0.0)]
    #[case::strange_state("What a strange situation", 0.3)]
    fn farewell_rules(#[case] message: &str, #[case] expected: f64) {
        assert!(approx(farewell(&[message]), expected), "{message}");
    }

    #[test]
    fn farewell_sums_both_messages_before_clamping() {
        // "strange exchange" hits only the state pattern on each side
        let score = farewell(&["a strange exchange", "a strange exchange"]);
        assert!(approx(score, 0.6));
    }

    #[rstest]
    #[case::question_vetoes("I hope that helps. Anything else?", 0.0)]
    #[case::blank("   ", 0.0)]
    #[case::short_plain("Sure thing.", 0.2)]
    #[case::helps_and_short("I hope this helps.", 0.5)]
    #[case::summary_and_short("In summary, use a map.", 0.6)]
    #[case::everything("Hope that helps, as requested. In summary: done.", 1.0)]
    fn resolution_rules(#[case] message: &str, #[case] expected: f64) {
        assert!(approx(resolution(message), expected), "{message}");
    }

    #[test]
    fn long_messages_lose_the_brevity_bonus() {
        let long = "word ".repeat(25);
        assert_eq!(resolution(&long), 0.0);
    }

    #[test]
    fn repetition_needs_four_messages() {
        assert_eq!(repetition(&["a", "a", "a"]), 0.0);
    }

    #[test]
    fn exact_duplicate_after_normalizing() {
        let msgs = ["Hello there!", "something else", "HELLO THERE", "more words here"];
        assert_eq!(repetition(&msgs), 1.0);
    }

    #[test]
    fn only_the_last_four_count() {
        let msgs = ["same", "alpha beta", "gamma delta", "epsilon zeta", "same"];
        assert_eq!(repetition(&msgs), 0.0);
    }

    #[test]
    fn distinct_messages_are_not_repetitive() {
        let msgs = [
            "let us talk about rust ownership today",
            "borrowing rules keep references valid",
            "lifetimes describe how long data lives",
            "traits give shared behaviour to types",
        ];
        assert_eq!(repetition(&msgs), 0.0);
    }

    #[test]
    fn near_duplicates_score_between_zero_and_one() {
        let base = "we keep going around in circles about the same exact thing again";
        let msgs = [
            format!("{base} one"),
            format!("{base} two"),
            format!("{base} three"),
            format!("{base} four"),
        ];
        let refs: Vec<&str> = msgs.iter().map(String::as_str).collect();
        let score = repetition(&refs);
        assert!(score > 0.0 && score < 1.0, "{score}");
    }

    #[rstest]
    #[case::keywords("This discussion is complete", 0.4)]
    #[case::self_reference("I think the conversation has run its course", 0.5)]
    #[case::both_bots("It seems we are both ai here", 0.6)]
    #[case::nothing("Pasta needs salted water", 0.0)]
    fn meta_rules(#[case] message: &str, #[case] expected: f64) {
        assert!(approx(meta_conversation(&[message]), expected), "{message}");
    }

    #[test]
    fn end_inside_other_words_still_counts() {
        // "end" is a substring of "recommend"; together with "test" that is two keywords
        assert!(approx(meta_conversation(&["I recommend a test"]), 0.4));
    }

    #[rstest]
    #[case::none(&["hello"], 0.0)]
    #[case::one(&["I'm ready for your question"], 0.4)]
    #[case::both_patterns_in_one(&["standing by for new input; I need human input"], 0.8)]
    #[case::across_messages(&["ready for the next topic", "wait for your reply"], 0.8)]
    fn waiting_rules(#[case] messages: &[&str], #[case] expected: f64) {
        assert!(approx(waiting_pattern(messages), expected));
    }
}
