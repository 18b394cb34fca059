//! Subject and general averages.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::config::{Rounding, SubjectWeighting};
use crate::model::{Exam, Grade, Subject, SubjectAverage};
use crate::period::parse_exam_date;

/// Reduces one student's grades in one subject to a [`SubjectAverage`].
#[derive(Debug, Clone)]
pub struct SubjectAggregator<'a> {
    rounding: Rounding,
    weighting: SubjectWeighting,
    exams: HashMap<&'a str, &'a Exam>,
}

impl<'a> SubjectAggregator<'a> {
    /// `exams` are the exams retained for the period; grades on any other
    /// exam are ignored.
    pub fn new<E>(rounding: Rounding, weighting: SubjectWeighting, exams: E) -> Self
    where
        E: IntoIterator<Item = &'a Exam>,
    {
        Self {
            rounding,
            weighting,
            exams: exams.into_iter().map(|e| (e.id.as_str(), e)).collect(),
        }
    }

    /// Average of `student_id`'s grades in `subject`.
    ///
    /// Returns `None` when the student has no grade in the subject: the
    /// subject is then omitted from the report card, never defaulted to 0.
    /// `grades` must be in insertion order; it breaks remark ties between
    /// exams on the same date.
    pub fn aggregate(
        &self,
        student_id: &str,
        subject: &Subject,
        grades: &[&Grade],
    ) -> Option<SubjectAverage> {
        let coefficient = u32::try_from(subject.coefficient).ok().filter(|&c| c > 0)?;

        let graded: Vec<(usize, &Grade, &Exam)> = grades
            .iter()
            .enumerate()
            .filter(|(_, g)| g.student_id == student_id)
            .filter_map(|(i, g)| {
                let exam = self.exams.get(g.exam_id.as_str())?;
                (exam.subject == subject.name).then_some((i, *g, *exam))
            })
            .collect();

        if graded.is_empty() {
            return None;
        }

        let raw = match self.weighting {
            SubjectWeighting::Equal => {
                graded.iter().map(|(_, g, _)| g.value).sum::<f64>() / graded.len() as f64
            }
            SubjectWeighting::ExamCoefficient => {
                let weight: f64 = graded.iter().map(|(_, _, e)| e.coefficient).sum();
                if weight <= 0.0 {
                    return None;
                }
                graded
                    .iter()
                    .map(|(_, g, e)| g.value * e.coefficient)
                    .sum::<f64>()
                    / weight
            }
        };

        Some(SubjectAverage {
            subject: subject.name.clone(),
            coefficient,
            average: self.rounding.apply(raw),
            rank: None,
            remark: latest_remark(&graded),
            grade_count: graded.len(),
        })
    }

    /// Subject averages of one student, in subject declaration order.
    pub fn aggregate_student(
        &self,
        student_id: &str,
        subjects: &[&Subject],
        grades: &[&Grade],
    ) -> Vec<SubjectAverage> {
        subjects
            .iter()
            .filter_map(|subject| self.aggregate(student_id, subject, grades))
            .collect()
    }
}

/// Remark of the chronologically last grade carrying one.
///
/// Chronology is the exam date, then insertion order.
fn latest_remark(graded: &[(usize, &Grade, &Exam)]) -> Option<String> {
    graded
        .iter()
        .filter_map(|(i, g, e)| {
            let remark = g.remark.as_deref().map(str::trim).filter(|r| !r.is_empty())?;
            let date = parse_exam_date(&e.date).unwrap_or(NaiveDate::MIN);
            Some(((date, *i), remark))
        })
        .max_by_key(|(order, _)| *order)
        .map(|(_, remark)| remark.to_string())
}

/// Coefficient-weighted mean of subject averages.
///
/// Defined as 0 when there are no subject averages.
pub fn general_average(subjects: &[SubjectAverage], rounding: &Rounding) -> f64 {
    let total_coefficient: u64 = subjects.iter().map(|s| u64::from(s.coefficient)).sum();
    if total_coefficient == 0 {
        return 0.0;
    }
    let weighted: f64 = subjects
        .iter()
        .map(|s| s.average * f64::from(s.coefficient))
        .sum();
    rounding.apply(weighted / total_coefficient as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExamType;

    fn exam(id: &str, subject: &str, date: &str, coefficient: f64) -> Exam {
        Exam {
            id: id.into(),
            name: id.into(),
            exam_type: ExamType::Composition,
            subject: subject.into(),
            class_id: "CM2".into(),
            date: date.into(),
            coefficient,
            period: None,
        }
    }

    fn grade(student: &str, exam: &str, value: f64, remark: Option<&str>) -> Grade {
        Grade {
            student_id: student.into(),
            exam_id: exam.into(),
            value,
            remark: remark.map(String::from),
        }
    }

    fn subject(name: &str, coefficient: i64) -> Subject {
        Subject {
            name: name.into(),
            coefficient,
        }
    }

    fn averages(pairs: &[(f64, u32)]) -> Vec<SubjectAverage> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, &(average, coefficient))| SubjectAverage {
                subject: format!("subject-{i}"),
                coefficient,
                average,
                rank: None,
                remark: None,
                grade_count: 1,
            })
            .collect()
    }

    #[test]
    fn arithmetic_mean_rounded_half_up() {
        let exams = vec![
            exam("e1", "Maths", "2024-10-01", 1.0),
            exam("e2", "Maths", "2024-11-01", 1.0),
        ];
        let grades = vec![grade("s1", "e1", 12.5, None), grade("s1", "e2", 14.4, None)];
        let refs: Vec<&Grade> = grades.iter().collect();

        let agg = SubjectAggregator::new(Rounding::default(), SubjectWeighting::Equal, &exams);
        let avg = agg.aggregate("s1", &subject("Maths", 4), &refs).unwrap();
        // (12.5 + 14.4) / 2 = 13.45
        assert_eq!(avg.average, 13.5);
        assert_eq!(avg.coefficient, 4);
        assert_eq!(avg.grade_count, 2);
        assert_eq!(avg.rank, None);
    }

    #[test]
    fn subject_without_grades_is_omitted() {
        let exams = vec![exam("e1", "Maths", "2024-10-01", 1.0)];
        let grades = vec![grade("s1", "e1", 12.0, None)];
        let refs: Vec<&Grade> = grades.iter().collect();
        let agg = SubjectAggregator::new(Rounding::default(), SubjectWeighting::Equal, &exams);

        assert!(agg.aggregate("s1", &subject("Français", 2), &refs).is_none());
        assert!(agg.aggregate("s2", &subject("Maths", 2), &refs).is_none());

        let maths = subject("Maths", 3);
        let francais = subject("Français", 2);
        let all = agg.aggregate_student("s1", &[&francais, &maths], &refs);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].subject, "Maths");
    }

    #[test]
    fn grades_on_exams_outside_the_period_are_ignored() {
        let exams = vec![exam("e1", "Maths", "2024-10-01", 1.0)];
        let grades = vec![grade("s1", "e1", 10.0, None), grade("s1", "other", 20.0, None)];
        let refs: Vec<&Grade> = grades.iter().collect();
        let agg = SubjectAggregator::new(Rounding::default(), SubjectWeighting::Equal, &exams);
        assert_eq!(agg.aggregate("s1", &subject("Maths", 1), &refs).unwrap().average, 10.0);
    }

    #[test]
    fn remark_from_chronologically_last_grade() {
        let exams = vec![
            exam("late", "Maths", "2024-12-10", 1.0),
            exam("early", "Maths", "2024-10-01", 1.0),
            exam("same-day", "Maths", "2024-12-10", 1.0),
        ];
        let grades = vec![
            grade("s1", "late", 12.0, Some("Bon trimestre")),
            grade("s1", "early", 15.0, Some("Début prometteur")),
        ];
        let refs: Vec<&Grade> = grades.iter().collect();
        let agg = SubjectAggregator::new(Rounding::default(), SubjectWeighting::Equal, &exams);
        let avg = agg.aggregate("s1", &subject("Maths", 1), &refs).unwrap();
        assert_eq!(avg.remark.as_deref(), Some("Bon trimestre"));

        // Same date: the later entry wins.
        let grades = vec![
            grade("s1", "late", 12.0, Some("Premier")),
            grade("s1", "same-day", 13.0, Some("Second")),
        ];
        let refs: Vec<&Grade> = grades.iter().collect();
        let avg = agg.aggregate("s1", &subject("Maths", 1), &refs).unwrap();
        assert_eq!(avg.remark.as_deref(), Some("Second"));
    }

    #[test]
    fn blank_remarks_are_skipped() {
        let exams = vec![
            exam("e1", "Maths", "2024-10-01", 1.0),
            exam("e2", "Maths", "2024-11-01", 1.0),
        ];
        let grades = vec![
            grade("s1", "e1", 12.0, Some("Attentif")),
            grade("s1", "e2", 13.0, Some("   ")),
        ];
        let refs: Vec<&Grade> = grades.iter().collect();
        let agg = SubjectAggregator::new(Rounding::default(), SubjectWeighting::Equal, &exams);
        let avg = agg.aggregate("s1", &subject("Maths", 1), &refs).unwrap();
        assert_eq!(avg.remark.as_deref(), Some("Attentif"));
    }

    #[test]
    fn exam_coefficient_weighting() {
        let exams = vec![
            exam("e1", "Maths", "2024-10-01", 1.0),
            exam("e2", "Maths", "2024-11-01", 3.0),
        ];
        let grades = vec![grade("s1", "e1", 8.0, None), grade("s1", "e2", 16.0, None)];
        let refs: Vec<&Grade> = grades.iter().collect();

        let equal = SubjectAggregator::new(Rounding::default(), SubjectWeighting::Equal, &exams);
        assert_eq!(equal.aggregate("s1", &subject("Maths", 1), &refs).unwrap().average, 12.0);

        let weighted =
            SubjectAggregator::new(Rounding::default(), SubjectWeighting::ExamCoefficient, &exams);
        assert_eq!(weighted.aggregate("s1", &subject("Maths", 1), &refs).unwrap().average, 14.0);
    }

    #[test]
    fn general_average_weighted_by_subject_coefficient() {
        let rounding = Rounding::default();
        // (15 * 3 + 12 * 2) / 5 = 13.8
        assert_eq!(general_average(&averages(&[(15.0, 3), (12.0, 2)]), &rounding), 13.8);
        // (14.3 * 1 + 11.6 * 2) / 3 = 12.5
        assert_eq!(general_average(&averages(&[(14.3, 1), (11.6, 2)]), &rounding), 12.5);
    }

    #[test]
    fn general_average_of_nothing_is_zero() {
        assert_eq!(general_average(&[], &Rounding::default()), 0.0);
    }

    #[test]
    fn averages_stay_in_range() {
        let exams = vec![exam("e1", "Maths", "2024-10-01", 1.0)];
        let agg = SubjectAggregator::new(Rounding::default(), SubjectWeighting::Equal, &exams);
        for tenth in 0..=200 {
            let value = tenth as f64 / 10.0;
            let grades = vec![grade("s1", "e1", value, None)];
            let refs: Vec<&Grade> = grades.iter().collect();
            let avg = agg.aggregate("s1", &subject("Maths", 1), &refs).unwrap();
            assert!((0.0..=20.0).contains(&avg.average));
        }
    }
}
