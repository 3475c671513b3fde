use std::fmt::Write as _;

use kodebate_models::{MarketDataSnapshot, OpinionShape, Persona, Signal};

use crate::context::DebateContext;
use crate::inference::Prompt;
use crate::language::LanguageProfile;

/// JSON example of the answer shape `persona` owes.
fn response_schema(shape: OpinionShape) -> String {
    let example = match shape {
        OpinionShape::Debater => serde_json::json!({
            "argument": "<your case, specific and evidence-based>",
            "lean": "LONG | SHORT | HOLD",
            "confidence": 0.65
        }),
        OpinionShape::InvestmentVerdict => serde_json::json!({
            "argument": "<which side was stronger and the 2-3 decisive factors>",
            "signal": "LONG | SHORT | HOLD",
            "confidence": 0.7
        }),
        OpinionShape::RiskVerdict => serde_json::json!({
            "signal": "LONG | SHORT | HOLD | IGNORE",
            "confidence": 0.72,
            "unable_to_assess": false,
            "unable_to_assess_reason": null,
            "timeframes": {
                "short_term": "LONG | SHORT | HOLD",
                "medium_term": "LONG | SHORT | HOLD",
                "long_term": "LONG | SHORT | HOLD"
            },
            "support_zones": [{"level_usd": 245.0, "description": "<reason>"}],
            "resistance_zones": [{"level_usd": 270.0, "description": "<reason>"}],
            "detailed_analysis": "<structured analysis: bull points, bear points, decision, \
                strategy, current factors>",
            "hold_alternative": null
        }),
    };
    serde_json::to_string_pretty(&example).unwrap_or_default()
}

fn persona_brief(persona: Persona) -> &'static str {
    match persona {
        Persona::Bull => {
            "You are the BULL analyst. Build the strongest case that the asset will RISE: \
             bullish technical signals, positive catalysts, strong fundamentals or tailwinds. \
             Directly counter every point the bear has made so far. Be specific with price targets."
        }
        Persona::Bear => {
            "You are the BEAR analyst. Build the strongest case that the asset will FALL: \
             bearish technical signals, negative catalysts, weak fundamentals or headwinds. \
             Directly counter the latest bull argument point by point. \
             Be specific with downside targets."
        }
        Persona::InvestmentJudge => {
            "You are the INVESTMENT JUDGE. Weigh the full bull/bear debate against the raw data, \
             identify the 2-3 most important factors, acknowledge the main risks and decide \
             LONG, SHORT or HOLD."
        }
        Persona::Risky => {
            "You are the AGGRESSIVE risk analyst. Given the investment decision, advocate \
             high-reward positioning: tight stops 5-8% from price, close knockout levels, \
             and why waiting is wrong."
        }
        Persona::Neutral => {
            "You are the NEUTRAL risk analyst. Given the investment decision, find the practical \
             middle ground between aggressive and defensive positioning and propose moderate \
             knockout distances."
        }
        Persona::Safe => {
            "You are the CONSERVATIVE risk analyst. Given the investment decision, advocate \
             capital preservation: wide stops 15-25% from price, strong support zones, \
             and the news risks that could move against the position."
        }
        Persona::RiskJudge => {
            "You are the FINAL RISK JUDGE. Combine the investment decision and the three risk \
             opinions into the final trading decision. For LONG, support zones matter most; for \
             SHORT, resistance zones. Confidence guide: 0.90+ exceptional, 0.75-0.89 high, \
             0.60-0.74 moderate, 0.45-0.59 low, below 0.30 set unable_to_assess to true with \
             signal IGNORE and confidence 0.0. For a HOLD signal, fill hold_alternative with the \
             direction to take if the caller insists on trading."
        }
    }
}

/// System prompt for `persona`, ending with the JSON shape it must return.
pub fn system_prompt(persona: Persona) -> String {
    format!(
        "{}\n\n\
         You are one voice in a structured multi-persona debate about a single tradable asset. \
         Base every claim on the supplied market data.\n\n\
         You MUST respond with ONLY a JSON object matching this schema:\n\
         {}\n\n\
         Confidence is a number between 0.0 and 1.0.",
        persona_brief(persona),
        response_schema(OpinionShape::for_persona(persona))
    )
}

fn write_snapshot(out: &mut String, snapshot: &MarketDataSnapshot) {
    let _ = writeln!(out, "## Asset");
    let _ = writeln!(
        out,
        "- {} ({}, {})",
        snapshot.display_name(),
        snapshot.symbol,
        snapshot.effective_asset_type()
    );
    let _ = writeln!(out, "- Price: {}", snapshot.price);
    if let Some(as_of) = snapshot.as_of {
        let _ = writeln!(out, "- As of: {as_of}");
    }

    match &snapshot.chart {
        Some(chart) => {
            let _ = writeln!(
                out,
                "\n## Chart\nA price chart is attached ({}). Use it to confirm trend, \
                 moving averages and support/resistance.",
                chart.description.as_deref().unwrap_or(&chart.location)
            );
        }
        None => {
            let _ = writeln!(out, "\n## Chart\nNo chart available; work from the text data.");
        }
    }

    for (title, body) in [
        ("Technical Analysis", &snapshot.technical),
        ("News & Events", &snapshot.news),
        ("Fundamentals / Context", &snapshot.fundamental),
    ] {
        let body = if body.trim().is_empty() {
            "(none supplied)"
        } else {
            body.as_str()
        };
        let _ = writeln!(out, "\n## {title}\n{body}");
    }
}

fn write_turns(out: &mut String, context: &DebateContext) {
    if context.turns().is_empty() {
        return;
    }
    let _ = writeln!(out, "\n## Debate So Far");
    for turn in context.turns() {
        let round = if turn.round > 0 {
            format!(" (round {})", turn.round)
        } else {
            String::new()
        };
        let lean = turn
            .lean
            .map(|signal| format!(" [{signal}]"))
            .unwrap_or_default();
        let _ = writeln!(out, "\n### {}{round}{lean}\n{}", turn.persona, turn.argument);
    }
}

/// User prompt: snapshot, visible debate, language directive and, for the
/// two judges only, the forced-direction constraint.
pub fn user_prompt(
    persona: Persona,
    context: &DebateContext,
    language: &LanguageProfile,
) -> String {
    let mut out = String::new();
    write_snapshot(&mut out, context.snapshot());
    write_turns(&mut out, context);

    let _ = writeln!(out, "\n## Instructions");
    if persona.is_judge() {
        if let Some(forced) = Signal::from_forced(context.request().forced_direction) {
            let _ = writeln!(out, "{}", language.forced_constraint(forced));
        }
    }
    let directive = if persona == Persona::RiskJudge {
        language.write_directive
    } else {
        language.respond_directive
    };
    let _ = write!(out, "{directive}");
    out
}

/// Assemble the full prompt for one persona turn.
pub fn build(persona: Persona, context: &DebateContext) -> Prompt {
    let language = LanguageProfile::for_language(context.request().language);
    Prompt {
        persona,
        system: system_prompt(persona),
        user: user_prompt(persona, context, language),
        chart: context.snapshot().chart.clone(),
    }
}
