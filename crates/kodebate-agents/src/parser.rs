//! Schema validation of raw persona answers.
//!
//! Models wrap their JSON in code fences or lead with prose. The payload is
//! located first, then parsed into the shape the persona owes.

use kodebate_models::{
    DebaterOpinion, InvestmentVerdict, Opinion, OpinionShape, Persona, RiskVerdict, Signal,
};
use serde::de::DeserializeOwned;

/// Locate the first JSON object in a model answer.
///
/// Handles:
/// - Clean JSON: `{"key": "value"}`
/// - Fenced: ```json\n{"key": "value"}\n```
/// - Prefix or suffix prose around a single object
pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') && is_json_object(trimmed) {
        return Some(trimmed.to_string());
    }

    if let Some(inner) = strip_fence(trimmed) {
        if is_json_object(&inner) {
            return Some(inner);
        }
    }

    extract_first_object(trimmed).filter(|candidate| is_json_object(candidate))
}

fn is_json_object(text: &str) -> bool {
    matches!(
        serde_json::from_str::<serde_json::Value>(text),
        Ok(serde_json::Value::Object(_))
    )
}

/// Content of the first ``` fence, without its language tag.
fn strip_fence(text: &str) -> Option<String> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim().to_string())
}

/// First balanced `{ ... }`, ignoring braces inside strings.
fn extract_first_object(text: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' if start.is_some() => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| text[s..=i].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

fn parse_shape<T: DeserializeOwned>(json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| e.to_string())
}

/// Validate `raw` against the shape `persona` owes.
///
/// A rejection carries the reason and means retry, never a fatal error.
pub fn validate(persona: Persona, raw: &str) -> Result<Opinion, String> {
    let json = extract_json(raw)
        .ok_or_else(|| format!("no JSON object found (length={})", raw.len()))?;

    let opinion = match OpinionShape::for_persona(persona) {
        OpinionShape::Debater => {
            let opinion: DebaterOpinion = parse_shape(&json)?;
            if opinion.argument.trim().is_empty() {
                return Err("argument is empty".to_string());
            }
            Opinion::Debater(opinion)
        }
        OpinionShape::InvestmentVerdict => {
            let verdict: InvestmentVerdict = parse_shape(&json)?;
            if verdict.signal == Signal::Ignore {
                return Err("investment signal must be LONG, SHORT or HOLD".to_string());
            }
            if verdict.argument.trim().is_empty() {
                return Err("argument is empty".to_string());
            }
            Opinion::Investment(verdict)
        }
        OpinionShape::RiskVerdict => {
            let verdict: RiskVerdict = parse_shape(&json)?;
            if verdict.detailed_analysis.trim().is_empty() {
                return Err("detailed_analysis is empty".to_string());
            }
            Opinion::Risk(verdict)
        }
    };

    Ok(opinion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn extract_clean_json() {
        let input = r#"{"argument": "test", "lean": "LONG"}"#;
        assert_eq!(extract_json(input).unwrap(), input);
    }

    #[test]
    fn extract_from_fence() {
        let input = "Here is my case:\n```json\n{\"argument\": \"up\"}\n```\nDone.";
        assert_eq!(extract_json(input).unwrap(), r#"{"argument": "up"}"#);
    }

    #[test]
    fn extract_from_fence_without_language() {
        let input = "```\n{\"argument\": \"up\"}\n```";
        assert_eq!(extract_json(input).unwrap(), r#"{"argument": "up"}"#);
    }

    #[test]
    fn extract_with_prefix_text() {
        let input = "After weighing both sides:\n{\"argument\": \"bullish\", \"lean\": \"LONG\"}";
        assert!(extract_json(input).unwrap().contains("bullish"));
    }

    #[test]
    fn extract_ignores_braces_inside_strings() {
        let input = r#"Note } first. {"argument": "range {low} to {high}", "confidence": 0.5}"#;
        let json = extract_json(input).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["confidence"], 0.5);
    }

    #[test]
    fn extract_rejects_arrays_and_plain_text() {
        assert!(extract_json("[1, 2, 3]").is_none());
        assert!(extract_json("Plain prose, no payload.").is_none());
    }

    #[test]
    fn validate_debater() {
        let opinion = validate(
            Persona::Bear,
            r#"{"argument": "Margins are shrinking", "lean": "SHORT", "confidence": 0.6}"#,
        )
        .unwrap();
        assert_eq!(opinion.argument(), "Margins are shrinking");
        assert_eq!(opinion.lean(), Some(Signal::Short));
        assert_eq!(opinion.confidence(), Some(dec!(0.6)));
    }

    #[test]
    fn validate_rejects_empty_argument() {
        assert!(validate(Persona::Bull, r#"{"argument": "  "}"#).is_err());
    }

    #[test]
    fn investment_judge_must_commit() {
        assert!(validate(
            Persona::InvestmentJudge,
            r#"{"argument": "Bulls stronger", "signal": "LONG"}"#
        )
        .is_ok());
        assert!(validate(
            Persona::InvestmentJudge,
            r#"{"argument": "Unclear", "signal": "IGNORE"}"#
        )
        .is_err());
        assert!(validate(Persona::InvestmentJudge, r#"{"argument": "No signal"}"#).is_err());
    }

    #[test]
    fn validate_fenced_risk_verdict() {
        let raw = r#"```json
{
    "signal": "LONG",
    "confidence": 0.72,
    "support_zones": [{"level_usd": 250.0, "description": "SMA-50"}, 245.0],
    "resistance_zones": [270.0],
    "detailed_analysis": "Bulls carried the debate",
    "timeframes": {"short_term": "HOLD", "medium_term": "LONG", "long_term": "LONG"}
}
```"#;
        match validate(Persona::RiskJudge, raw).unwrap() {
            Opinion::Risk(verdict) => {
                assert_eq!(verdict.signal, Signal::Long);
                assert_eq!(verdict.support_zones.len(), 2);
                assert_eq!(verdict.timeframes.short_term, Signal::Hold);
            }
            other => panic!("unexpected opinion: {other:?}"),
        }
    }

    #[test]
    fn risk_verdict_shape_is_enforced() {
        // A debater-shaped answer is not a risk verdict.
        assert!(validate(Persona::RiskJudge, r#"{"argument": "go long"}"#).is_err());
    }

    #[test]
    fn rejections_are_explained() {
        let err = validate(Persona::Bull, "no payload here").unwrap_err();
        assert!(err.contains("no JSON object"));

        let err = validate(Persona::Bull, r#"{"lean": "LONG"}"#).unwrap_err();
        assert!(err.contains("argument"));
    }

    #[test]
    fn malformed_input_never_panics() {
        for raw in ["", "{", "}{", "```", "```json\n{\"argument\": ", "{\"argument\": 5}"] {
            assert!(validate(Persona::Neutral, raw).is_err(), "accepted {raw:?}");
        }
    }
}
