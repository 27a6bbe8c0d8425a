use crate::core::model::Evaluation;
use crate::core::session::SessionSnapshot;
use std::fmt::Write;

pub fn render_variants(snapshot: &SessionSnapshot) -> String {
    if snapshot.variants.is_empty() {
        return "No variants yet. Provide a task context and generate.".to_string();
    }

    let mut out = String::new();
    for (i, variant) in snapshot.variants.iter().enumerate() {
        let marker = if snapshot.selected_variant_id.as_deref() == Some(variant.id.as_str()) { "▶" } else { " " };
        let _ = writeln!(
            out,
            "{marker} [{}] {} | {}% confidence | {} chars",
            i + 1,
            variant.name,
            variant.confidence_percent(),
            variant.content_len()
        );
    }
    if let Some(selected) = snapshot.selected_variant() {
        let _ = write!(out, "\n{}\n", selected.content);
    }
    out
}

pub fn render_evaluation(evaluation: &Evaluation) -> String {
    let status = if evaluation.is_success() { "SUCCESS" } else { "FAILURE" };
    format!(
        "Score:   {}/100\nLatency: {}ms\nStatus:  {status}\n{}",
        evaluation.score,
        evaluation.latency_ms,
        evaluation.verdict()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{EvaluationStatus, Variant};
    use crate::core::session::Phase;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            role: "QA".into(),
            task_context: "ship it".into(),
            variants: vec![
                Variant::new("a", "Direct & Efficient", "You are a QA.", 0.92),
                Variant::new("b", "Analytical & Safe", "Act as a QA.", 0.88),
            ],
            selected_variant_id: Some("b".into()),
            evaluation: None,
            phase: Phase::Ready,
        }
    }

    #[test]
    fn marks_selected_variant_and_shows_its_content() {
        let text = render_variants(&snapshot());
        assert!(text.contains("  [1] Direct & Efficient | 92% confidence | 13 chars"));
        assert!(text.contains("▶ [2] Analytical & Safe | 88% confidence"));
        assert!(text.ends_with("Act as a QA.\n"));
    }

    #[test]
    fn empty_session_has_a_hint() {
        let mut snap = snapshot();
        snap.variants.clear();
        snap.selected_variant_id = None;
        assert!(render_variants(&snap).starts_with("No variants yet"));
    }

    #[test]
    fn evaluation_shows_metrics_and_verdict() {
        let text = render_evaluation(&Evaluation::new(95, EvaluationStatus::Success, 120));
        assert!(text.contains("Score:   95/100"));
        assert!(text.contains("Latency: 120ms"));
        assert!(text.contains("SUCCESS"));
        assert!(text.ends_with("System is ready to deploy."));
    }
}
