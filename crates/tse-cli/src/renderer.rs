//! Renders the final workflow state into terminal-friendly markdown.
//! Mirrors the field-extraction-then-format idiom used to build chat
//! embeds elsewhere in this stack, just targeting plain text instead
//! of a chat client's rich-embed API.

use serde_json::Value;

fn field<'a>(data: &'a Value, pointer: &str) -> Option<&'a str> {
    data.pointer(pointer).and_then(Value::as_str)
}

pub fn render_report(symbol: &str, state: &Value) -> String {
    let mut out = String::new();
    out.push_str(&format!("# TSE Analysis: {symbol}\n\n"));

    if let Some(price) = state.get("current_price").and_then(Value::as_f64) {
        out.push_str(&format!("**Current price:** {price:.0} IRR\n\n"));
    }

    if let Some(final_report) = state.get("final_report").and_then(Value::as_str) {
        out.push_str(final_report);
        out.push('\n');
        return out;
    }

    out.push_str("_Report synthesis did not complete; showing raw branch consensuses._\n\n");
    for (title, key) in [
        ("Technical", "technical_consensus_report"),
        ("Fundamental", "fundamental_consensus_report"),
        ("Social & News", "social_news_consensus_report"),
    ] {
        out.push_str(&format!("## {title}\n\n"));
        match state.get(key) {
            Some(report) => {
                if let Some(summary) = field(report, "/executive_summary") {
                    out.push_str(summary);
                    out.push('\n');
                } else {
                    out.push_str(&serde_json::to_string_pretty(report).unwrap_or_default());
                    out.push('\n');
                }
            }
            None => out.push_str("_not available_\n"),
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_the_final_report_when_present() {
        let state = json!({"current_price": 1059.0, "final_report": "# Memo\nbullish"});
        let rendered = render_report("فملی", &state);
        assert!(rendered.contains("Memo"));
        assert!(rendered.contains("1059"));
    }

    #[test]
    fn falls_back_to_branch_consensuses_when_reporter_never_ran() {
        let state = json!({
            "technical_consensus_report": {"executive_summary": "bullish trend"},
        });
        let rendered = render_report("فملی", &state);
        assert!(rendered.contains("bullish trend"));
        assert!(rendered.contains("_not available_"));
    }
}
