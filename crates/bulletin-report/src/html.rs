//! HTML bulletin generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined: a class
//! summary, a sortable ranking table and one bulletin per student.

use anyhow::{Context, Result};
use std::path::Path;

use bulletin_core::mention::Mention;
use bulletin_core::model::ReportCard;
use bulletin_core::report::ReportCardBatch;
use bulletin_core::statistics::MentionCount;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn mention_class(mention: Option<Mention>) -> &'static str {
    match mention {
        Some(Mention::TresBien) | Some(Mention::Bien) => "pass",
        Some(Mention::AssezBien) | Some(Mention::Passable) => "fair",
        Some(Mention::Insuffisant) => "fail",
        None => "none",
    }
}

fn optional_average(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.1}"))
        .unwrap_or_else(|| "-".to_string())
}

fn rank_text(card: &ReportCard) -> String {
    match card.general_rank {
        Some(rank) => format!("{rank} / {}", card.ranked_students),
        None => "-".to_string(),
    }
}

/// Generate an HTML document from a report card batch.
pub fn generate_html(batch: &ReportCardBatch) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>Bulletins {} - Trimestre {} - {}</title>\n",
        html_escape(&batch.class_id),
        batch.trimester,
        html_escape(&batch.school_year)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str(&format!(
        "<h1>Classe {} - Trimestre {}</h1>\n",
        html_escape(&batch.class_id),
        batch.trimester
    ));
    html.push_str(&format!(
        "<p class=\"meta\">Année scolaire <strong>{}</strong> | {} élèves | généré le {}</p>\n",
        html_escape(&batch.school_year),
        batch.report_cards.len(),
        batch.generated_on.format("%d/%m/%Y")
    ));
    html.push_str("</header>\n");

    // Class summary
    let stats = &batch.statistics;
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Résumé de la classe</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Évalués</th><th>Non évalués</th><th>Moyenne de classe</th><th>Taux de réussite</th><th>Plus haute</th><th>Plus basse</th></tr></thead>\n");
    html.push_str(&format!(
        "<tbody><tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr></tbody>\n",
        stats.evaluated,
        stats.not_evaluated,
        optional_average(stats.class_average),
        stats
            .pass_rate
            .map(|r| format!("{r}%"))
            .unwrap_or_else(|| "-".to_string()),
        optional_average(stats.highest_average),
        optional_average(stats.lowest_average),
    ));
    html.push_str("</table>\n");

    if !stats.subjects.is_empty() {
        html.push_str("<table class=\"subjects\">\n");
        html.push_str("<thead><tr><th>Matière</th><th>Coef.</th><th>Moyenne</th><th>Élèves</th><th>Réussite</th></tr></thead>\n<tbody>\n");
        for s in &stats.subjects {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{:.1}</td><td>{}</td><td>{}%</td></tr>\n",
                html_escape(&s.subject),
                s.coefficient,
                s.average,
                s.students,
                s.success_rate
            ));
        }
        html.push_str("</tbody></table>\n");
    }

    if !stats.exams.is_empty() {
        html.push_str("<table class=\"exams\">\n");
        html.push_str("<thead><tr><th>Épreuve</th><th>Matière</th><th>Date</th><th>Notés</th><th>Moyenne</th><th>Réussite</th></tr></thead>\n<tbody>\n");
        for e in &stats.exams {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                html_escape(&e.name),
                html_escape(&e.subject),
                html_escape(&e.date),
                e.graded,
                optional_average(e.average),
                e.success_rate
                    .map(|r| format!("{r}%"))
                    .unwrap_or_else(|| "-".to_string()),
            ));
        }
        html.push_str("</tbody></table>\n");
    }

    if stats.evaluated > 0 {
        html.push_str(&generate_mention_chart(&stats.mentions));
    }
    html.push_str("</section>\n");

    // Ranking
    html.push_str("<section class=\"ranking\">\n");
    html.push_str("<h2>Classement</h2>\n");
    html.push_str("<table class=\"results-table\" id=\"ranking\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">Rang</th><th onclick=\"sortTable(1)\">Élève</th><th onclick=\"sortTable(2)\">Moyenne</th><th onclick=\"sortTable(3)\">Mention</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for card in &batch.report_cards {
        let average = if card.is_evaluated() {
            format!("{:.1}", card.general_average)
        } else {
            "Non évalué".to_string()
        };
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            mention_class(card.mention),
            rank_text(card),
            html_escape(&card.student_name),
            average,
            card.mention.map(|m| m.label()).unwrap_or("-"),
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // One bulletin per student
    html.push_str("<section class=\"bulletins\">\n");
    html.push_str("<h2>Bulletins</h2>\n");
    for card in &batch.report_cards {
        html.push_str(&generate_bulletin(card));
    }
    html.push_str("</section>\n");

    // Rejected records and warnings
    if !batch.validation_errors.is_empty() || !batch.warnings.is_empty() {
        html.push_str("<section class=\"issues\">\n");
        html.push_str("<h2>Anomalies</h2>\n<ul>\n");
        for e in &batch.validation_errors {
            html.push_str(&format!(
                "<li class=\"fail\">{}</li>\n",
                html_escape(&e.to_string())
            ));
        }
        for w in &batch.warnings {
            html.push_str(&format!("<li>{}</li>\n", html_escape(&w.to_string())));
        }
        html.push_str("</ul>\n</section>\n");
    }

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Données JSON</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(
        &serde_json::to_string_pretty(batch)
            .unwrap_or_default()
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    );
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    // JavaScript for sorting
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

fn generate_bulletin(card: &ReportCard) -> String {
    let mut html = format!(
        "<article class=\"bulletin\" id=\"bulletin-{}\">\n<h3>{}</h3>\n",
        html_escape(&card.student_id),
        html_escape(&card.student_name)
    );

    if !card.is_evaluated() {
        html.push_str("<p class=\"none\">Non évalué sur la période : aucune note retenue.</p>\n");
    } else {
        html.push_str("<table>\n");
        html.push_str("<thead><tr><th>Matière</th><th>Coef.</th><th>Moyenne</th><th>Rang</th><th>Appréciation</th></tr></thead>\n<tbody>\n");
        for s in &card.subjects {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{:.1}</td><td>{}</td><td>{}</td></tr>\n",
                html_escape(&s.subject),
                s.coefficient,
                s.average,
                s.rank.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()),
                html_escape(s.remark.as_deref().unwrap_or("")),
            ));
        }
        html.push_str("</tbody></table>\n");
        html.push_str(&format!(
            "<p class=\"totals {}\">Moyenne générale : <strong>{:.1}</strong> | Rang : <strong>{}</strong> | Mention : <strong>{}</strong></p>\n",
            mention_class(card.mention),
            card.general_average,
            rank_text(card),
            card.mention.map(|m| m.label()).unwrap_or("-"),
        ));
    }

    html.push_str(&format!(
        "<p class=\"remark\">{}</p>\n</article>\n",
        html_escape(&card.general_remark)
    ));
    html
}

fn generate_mention_chart(mentions: &[MentionCount]) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 8;
    let label_width = 120;

    let max_count = mentions.iter().map(|m| m.count).max().unwrap_or(0).max(1);
    let total_height = mentions.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, m) in mentions.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let width = m.count * max_width / max_count;

        let color = match mention_class(Some(m.mention)) {
            "pass" => "#22c55e",
            "fair" => "#eab308",
            _ => "#ef4444",
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(m.mention.label())
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            m.count
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

/// Write an HTML bulletin file.
pub fn write_html_report(batch: &ReportCardBatch, path: &Path) -> Result<()> {
    let html = generate_html(batch);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML to {}", path.display()))?;
    Ok(())
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fair: #fef9c3; --fail: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fair: #713f12; --fail: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.fair { background: var(--fair); }
.fail { background: var(--fail); }
.none { color: #6b7280; font-style: italic; }
.bulletin { border: 1px solid var(--border); border-radius: 8px; padding: 1rem 1.5rem; margin: 1.5rem 0; page-break-inside: avoid; }
.remark { font-style: italic; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
@media print { .raw-data, .ranking { display: none; } .bulletin { page-break-after: always; } }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('ranking');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    return asc ? va.localeCompare(vb, undefined, {numeric: true}) : vb.localeCompare(va, undefined, {numeric: true});
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use bulletin_core::assembler::report_card_id;
    use bulletin_core::config::Rounding;
    use bulletin_core::error::ValidationError;
    use bulletin_core::model::{EvaluationStatus, SubjectAverage};
    use bulletin_core::statistics::{compute_class_statistics, ExamStatistics};
    use chrono::NaiveDate;

    fn card(id: &str, name: &str, average: Option<f64>, rank: Option<u32>) -> ReportCard {
        let subjects = match average {
            Some(avg) => vec![SubjectAverage {
                subject: "Mathématiques".into(),
                coefficient: 3,
                average: avg,
                rank,
                remark: Some("Peut <mieux> faire".into()),
                grade_count: 2,
            }],
            None => vec![],
        };
        ReportCard {
            id: report_card_id("2024-2025", "CM2", 1, id),
            student_id: id.into(),
            student_name: name.into(),
            class_id: "CM2".into(),
            trimester: 1,
            school_year: "2024-2025".into(),
            general_average: average.unwrap_or(0.0),
            general_rank: rank,
            ranked_students: 1,
            mention: average.map(|a| bulletin_core::mention::MentionScale::standard().classify(a)),
            general_remark: "Bon trimestre".into(),
            status: if subjects.is_empty() {
                EvaluationStatus::NotEvaluated
            } else {
                EvaluationStatus::Evaluated
            },
            subjects,
            generated_on: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
        }
    }

    fn make_test_batch() -> ReportCardBatch {
        let cards = vec![
            card("s1", "Mariama Sy", Some(14.0), Some(1)),
            card("s2", "Paul Mendy", None, None),
        ];
        let statistics = compute_class_statistics(&cards, 10.0, &Rounding::default());
        ReportCardBatch {
            id: uuid::Uuid::nil(),
            class_id: "CM2".into(),
            trimester: 1,
            school_year: "2024-2025".into(),
            generated_on: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            report_cards: cards,
            statistics,
            validation_errors: vec![ValidationError::ScoreOutOfRange {
                student_id: "s1".into(),
                exam_id: "e9".into(),
                value: 21.0,
            }],
            warnings: vec![],
        }
    }

    #[test]
    fn html_contains_required_elements() {
        let html = generate_html(&make_test_batch());

        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("Mariama Sy"));
        assert!(html.contains("Bien"));
        assert!(html.contains("1 / 1"));
        assert!(html.contains("10/01/2025"));
        assert!(html.contains("outside [0, 20]"));
    }

    #[test]
    fn exam_table_rendered_when_present() {
        let mut batch = make_test_batch();
        assert!(!generate_html(&batch).contains("class=\"exams\""));

        batch.statistics.exams = vec![ExamStatistics {
            exam_id: "e1".into(),
            name: "Dictée & rédaction".into(),
            subject: "Français".into(),
            date: "2024-10-22".into(),
            graded: 2,
            average: Some(12.5),
            highest: Some(15.0),
            lowest: Some(10.0),
            success_rate: Some(100),
        }];
        let html = generate_html(&batch);
        assert!(html.contains("class=\"exams\""));
        assert!(html.contains("Dictée &amp; rédaction"));
        assert!(html.contains("<td>12.5</td><td>100%</td>"));
    }

    #[test]
    fn not_evaluated_is_distinguished_from_zero() {
        let html = generate_html(&make_test_batch());
        assert!(html.contains("Non évalué"));
        assert!(html.contains("bulletin-s2"));
    }

    #[test]
    fn remarks_are_escaped() {
        let html = generate_html(&make_test_batch());
        assert!(html.contains("Peut &lt;mieux&gt; faire"));
        assert!(!html.contains("<mieux>"));
    }

    #[test]
    fn html_write_to_file() {
        let batch = make_test_batch();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("CM2-T1.html");

        write_html_report(&batch, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<html"));
    }
}
