//! Class-level statistics over a set of report cards.

use serde::{Deserialize, Serialize};

use crate::config::Rounding;
use crate::mention::Mention;
use crate::model::{Exam, Grade, ReportCard};
use crate::period::parse_exam_date;

/// Summary of one class for one trimester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassStatistics {
    /// Students with at least one subject average.
    pub evaluated: usize,
    /// Students without any qualifying grade.
    pub not_evaluated: usize,
    /// Mean of the general averages of evaluated students.
    pub class_average: Option<f64>,
    /// Percentage of evaluated students at or above the pass mark.
    pub pass_rate: Option<u32>,
    pub highest_average: Option<f64>,
    pub lowest_average: Option<f64>,
    /// Students per mention, highest mention first.
    pub mentions: Vec<MentionCount>,
    /// Per-subject figures, in first-seen subject order.
    pub subjects: Vec<SubjectStatistics>,
    /// Per-exam figures for the trimester, oldest exam first.
    #[serde(default)]
    pub exams: Vec<ExamStatistics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionCount {
    pub mention: Mention,
    pub count: usize,
}

/// Figures for one subject across the class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectStatistics {
    pub subject: String,
    pub coefficient: u32,
    /// Mean of the students' subject averages.
    pub average: f64,
    /// Students with an average in this subject.
    pub students: usize,
    /// Percentage of those students at or above the pass mark.
    pub success_rate: u32,
}

/// Class results on one exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamStatistics {
    pub exam_id: String,
    pub name: String,
    pub subject: String,
    pub date: String,
    /// Students with a grade on this exam.
    pub graded: usize,
    /// Mean grade, `None` when nobody was graded.
    pub average: Option<f64>,
    pub highest: Option<f64>,
    pub lowest: Option<f64>,
    /// Percentage of graded students at or above the pass mark.
    pub success_rate: Option<u32>,
}

fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 * 100.0 / whole as f64) + 0.5).floor() as u32
}

/// Compute class statistics from assembled report cards.
pub fn compute_class_statistics(
    cards: &[ReportCard],
    pass_mark: f64,
    rounding: &Rounding,
) -> ClassStatistics {
    let evaluated: Vec<&ReportCard> = cards.iter().filter(|c| c.is_evaluated()).collect();
    let averages: Vec<f64> = evaluated.iter().map(|c| c.general_average).collect();

    let class_average = (!averages.is_empty())
        .then(|| rounding.apply(averages.iter().sum::<f64>() / averages.len() as f64));
    let pass_rate = (!averages.is_empty()).then(|| {
        let passed = averages.iter().filter(|&&a| a >= pass_mark).count();
        percentage(passed, averages.len())
    });
    let highest_average = averages.iter().copied().reduce(f64::max);
    let lowest_average = averages.iter().copied().reduce(f64::min);

    let mentions = Mention::ALL
        .iter()
        .rev()
        .map(|&mention| MentionCount {
            mention,
            count: evaluated
                .iter()
                .filter(|c| c.mention == Some(mention))
                .count(),
        })
        .collect();

    let mut subjects: Vec<(String, u32, Vec<f64>)> = Vec::new();
    for card in &evaluated {
        for subject in &card.subjects {
            match subjects.iter_mut().find(|(name, _, _)| *name == subject.subject) {
                Some((_, _, values)) => values.push(subject.average),
                None => subjects.push((
                    subject.subject.clone(),
                    subject.coefficient,
                    vec![subject.average],
                )),
            }
        }
    }

    let subjects = subjects
        .into_iter()
        .map(|(subject, coefficient, values)| {
            let passed = values.iter().filter(|&&v| v >= pass_mark).count();
            SubjectStatistics {
                subject,
                coefficient,
                average: rounding.apply(values.iter().sum::<f64>() / values.len() as f64),
                students: values.len(),
                success_rate: percentage(passed, values.len()),
            }
        })
        .collect();

    ClassStatistics {
        evaluated: evaluated.len(),
        not_evaluated: cards.len() - evaluated.len(),
        class_average,
        pass_rate,
        highest_average,
        lowest_average,
        mentions,
        subjects,
        exams: Vec::new(),
    }
}

/// Compute per-exam figures from the exams and accepted grades of a trimester.
pub fn compute_exam_statistics(
    exams: &[&Exam],
    grades: &[&Grade],
    pass_mark: f64,
    rounding: &Rounding,
) -> Vec<ExamStatistics> {
    let mut ordered: Vec<&Exam> = exams.to_vec();
    ordered.sort_by(|a, b| {
        parse_exam_date(&a.date)
            .cmp(&parse_exam_date(&b.date))
            .then_with(|| a.id.cmp(&b.id))
    });

    ordered
        .into_iter()
        .map(|exam| {
            let values: Vec<f64> = grades
                .iter()
                .filter(|g| g.exam_id == exam.id)
                .map(|g| g.value)
                .collect();
            let graded = values.len();
            let passed = values.iter().filter(|&&v| v >= pass_mark).count();
            ExamStatistics {
                exam_id: exam.id.clone(),
                name: exam.name.clone(),
                subject: exam.subject.clone(),
                date: exam.date.clone(),
                graded,
                average: (graded > 0)
                    .then(|| rounding.apply(values.iter().sum::<f64>() / graded as f64)),
                highest: values.iter().copied().reduce(f64::max),
                lowest: values.iter().copied().reduce(f64::min),
                success_rate: (graded > 0).then(|| percentage(passed, graded)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::report_card_id;
    use crate::model::{EvaluationStatus, ExamType, SubjectAverage};
    use chrono::NaiveDate;

    fn card(
        id: &str,
        subjects: &[(&str, f64)],
        general: f64,
        mention: Option<Mention>,
    ) -> ReportCard {
        let status = if subjects.is_empty() {
            EvaluationStatus::NotEvaluated
        } else {
            EvaluationStatus::Evaluated
        };
        ReportCard {
            id: report_card_id("2024-2025", "CM2", 1, id),
            student_id: id.into(),
            student_name: id.into(),
            class_id: "CM2".into(),
            trimester: 1,
            school_year: "2024-2025".into(),
            subjects: subjects
                .iter()
                .map(|&(name, average)| SubjectAverage {
                    subject: name.into(),
                    coefficient: 2,
                    average,
                    rank: None,
                    remark: None,
                    grade_count: 1,
                })
                .collect(),
            general_average: general,
            general_rank: None,
            ranked_students: 0,
            mention,
            general_remark: String::new(),
            status,
            generated_on: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
        }
    }

    #[test]
    fn class_figures() {
        let cards = vec![
            card(
                "a",
                &[("Maths", 18.0), ("Français", 14.0)],
                16.0,
                Some(Mention::TresBien),
            ),
            card("b", &[("Maths", 8.0)], 8.0, Some(Mention::Insuffisant)),
            card("c", &[("Français", 11.0)], 11.0, Some(Mention::Passable)),
            card("d", &[], 0.0, None),
        ];
        let stats = compute_class_statistics(&cards, 10.0, &Rounding::default());

        assert_eq!(stats.evaluated, 3);
        assert_eq!(stats.not_evaluated, 1);
        assert_eq!(stats.class_average, Some(11.7));
        assert_eq!(stats.pass_rate, Some(67));
        assert_eq!(stats.highest_average, Some(16.0));
        assert_eq!(stats.lowest_average, Some(8.0));

        assert_eq!(stats.mentions[0].mention, Mention::TresBien);
        assert_eq!(stats.mentions[0].count, 1);
        assert_eq!(stats.mentions.iter().map(|m| m.count).sum::<usize>(), 3);

        assert_eq!(stats.subjects.len(), 2);
        let maths = &stats.subjects[0];
        assert_eq!(maths.subject, "Maths");
        assert_eq!(maths.average, 13.0);
        assert_eq!(maths.students, 2);
        assert_eq!(maths.success_rate, 50);
    }

    #[test]
    fn not_evaluated_students_do_not_drag_the_average() {
        let cards = vec![
            card("a", &[("Maths", 12.0)], 12.0, Some(Mention::AssezBien)),
            card("z", &[], 0.0, None),
        ];
        let stats = compute_class_statistics(&cards, 10.0, &Rounding::default());
        assert_eq!(stats.class_average, Some(12.0));
        assert_eq!(stats.lowest_average, Some(12.0));
    }

    #[test]
    fn empty_class() {
        let stats = compute_class_statistics(&[], 10.0, &Rounding::default());
        assert_eq!(stats.evaluated, 0);
        assert_eq!(stats.class_average, None);
        assert_eq!(stats.pass_rate, None);
        assert!(stats.subjects.is_empty());
        assert_eq!(stats.mentions.len(), 5);
    }

    fn exam(id: &str, date: &str) -> Exam {
        Exam {
            id: id.into(),
            name: format!("Composition {id}"),
            exam_type: ExamType::Composition,
            subject: "Maths".into(),
            class_id: "CM2".into(),
            date: date.into(),
            coefficient: 1.0,
            period: None,
        }
    }

    fn grade(student: &str, exam: &str, value: f64) -> Grade {
        Grade {
            student_id: student.into(),
            exam_id: exam.into(),
            value,
            remark: None,
        }
    }

    #[test]
    fn exam_figures_oldest_first() {
        let exams = [
            exam("e2", "2024-11-20"),
            exam("e1", "2024-10-15"),
            exam("e3", "2024-12-01"),
        ];
        let grades = [
            grade("a", "e1", 14.0),
            grade("b", "e1", 9.0),
            grade("c", "e1", 11.5),
            grade("a", "e2", 7.0),
        ];
        let exam_refs: Vec<&Exam> = exams.iter().collect();
        let grade_refs: Vec<&Grade> = grades.iter().collect();

        let stats =
            compute_exam_statistics(&exam_refs, &grade_refs, 10.0, &Rounding::default());
        let ids: Vec<&str> = stats.iter().map(|e| e.exam_id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e2", "e3"]);

        let first = &stats[0];
        assert_eq!(first.graded, 3);
        assert_eq!(first.average, Some(11.5));
        assert_eq!(first.highest, Some(14.0));
        assert_eq!(first.lowest, Some(9.0));
        assert_eq!(first.success_rate, Some(67));

        assert_eq!(stats[1].success_rate, Some(0));

        let ungraded = &stats[2];
        assert_eq!(ungraded.graded, 0);
        assert_eq!(ungraded.average, None);
        assert_eq!(ungraded.success_rate, None);
    }
}
