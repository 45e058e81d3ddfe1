use selfplay::export::ConversationRecord;
use selfplay::{ConversationAnalyzer, EndSignal, SignalScores, Turn};

use crate::args::AnalyzeArgs;
use crate::config::AppConfig;

struct PrefixReport {
    turn: usize,
    scores: SignalScores,
    signal: EndSignal,
}

/// Scores every prefix of `turns`, as the interaction loop would have after
/// each turn.
fn analyze_prefixes(analyzer: &ConversationAnalyzer, turns: &[Turn]) -> Vec<PrefixReport> {
    (1..=turns.len())
        .map(|turn| {
            let prefix = &turns[..turn];
            PrefixReport {
                turn,
                scores: analyzer.score(prefix),
                signal: analyzer.detect_end_signals(prefix, turn),
            }
        })
        .collect()
}

pub fn run(config: &AppConfig, args: &AnalyzeArgs) -> anyhow::Result<()> {
    let record = ConversationRecord::load_json(&args.transcript)?;
    let turns = record.to_turns();
    let analyzer = ConversationAnalyzer::new(
        args.end_threshold
            .unwrap_or(config.interaction.end_threshold),
    )?;
    let reports = analyze_prefixes(&analyzer, &turns);

    println!(
        "{:>4}  {:>8}  {:>10}  {:>10}  {:>6}  {:>7}  {:>10}  end",
        "turn", "farewell", "repetition", "resolution", "meta", "waiting", "confidence"
    );
    for report in &reports {
        let s = &report.scores;
        println!(
            "{:>4}  {:>8.2}  {:>10.2}  {:>10.2}  {:>6.2}  {:>7.2}  {:>10.2}  {}",
            report.turn,
            s.farewell,
            s.repetition,
            s.resolution,
            s.meta_conversation,
            s.waiting_pattern,
            report.signal.confidence,
            if report.signal.should_end { "yes" } else { "no" }
        );
    }

    match reports.iter().find(|r| r.signal.should_end) {
        Some(report) => println!(
            "\nAuto-end would have stopped after turn {}: {}",
            report.turn, report.signal
        ),
        None => println!("\nNo natural ending detected in {} turns", turns.len()),
    }
    Ok(())
}
