use crate::models::question::{Difficulty, Question};
use crate::models::test::{DifficultyPerformance, TopicPerformance};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResults {
    pub score: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub incorrect_answers: i32,
    pub unanswered_questions: i32,
    pub percentage: f64,
    pub topic_wise_performance: Vec<TopicPerformance>,
    pub difficulty_wise_performance: Vec<DifficultyPerformance>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Share of correct answers as a percentage, two decimal places.
pub fn percentage(correct: i32, total: i32) -> f64 {
    if total > 0 {
        round2(f64::from(correct) / f64::from(total) * 100.0)
    } else {
        0.0
    }
}

/// Score a finished attempt. `answers[i]` is matched against
/// `questions[i].correct_answer`; `None` counts as unanswered. Topic buckets
/// come out in first-seen order, difficulty buckets in easy/medium/hard
/// order.
pub fn calculate_results(answers: &[Option<i32>], questions: &[Question]) -> TestResults {
    let mut correct_answers = 0;
    let mut incorrect_answers = 0;
    let mut unanswered_questions = 0;

    let mut topic_buckets: Vec<(String, i32, i32)> = Vec::new();
    let mut difficulty_buckets: [(Difficulty, i32, i32); 3] = [
        (Difficulty::Easy, 0, 0),
        (Difficulty::Medium, 0, 0),
        (Difficulty::Hard, 0, 0),
    ];

    for (index, question) in questions.iter().enumerate() {
        let answer = answers.get(index).copied().flatten();
        let is_correct = answer == Some(question.correct_answer);

        match answer {
            None => unanswered_questions += 1,
            Some(_) if is_correct => correct_answers += 1,
            Some(_) => incorrect_answers += 1,
        }

        let topic_slot = match topic_buckets
            .iter()
            .position(|(topic, _, _)| *topic == question.topic)
        {
            Some(slot) => slot,
            None => {
                topic_buckets.push((question.topic.clone(), 0, 0));
                topic_buckets.len() - 1
            }
        };
        topic_buckets[topic_slot].2 += 1;
        if is_correct {
            topic_buckets[topic_slot].1 += 1;
        }

        let difficulty_slot = match question.difficulty {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        };
        difficulty_buckets[difficulty_slot].2 += 1;
        if is_correct {
            difficulty_buckets[difficulty_slot].1 += 1;
        }
    }

    let total_questions = questions.len() as i32;
    let overall_percentage = percentage(correct_answers, total_questions);

    let topic_wise_performance = topic_buckets
        .into_iter()
        .map(|(topic, correct, total)| TopicPerformance {
            topic,
            correct,
            total,
            accuracy: round2(f64::from(correct) / f64::from(total) * 100.0),
        })
        .collect();

    let difficulty_wise_performance = difficulty_buckets
        .into_iter()
        .filter(|(_, _, total)| *total > 0)
        .map(|(difficulty, correct, total)| DifficultyPerformance {
            difficulty,
            correct,
            total,
            accuracy: round2(f64::from(correct) / f64::from(total) * 100.0),
        })
        .collect();

    TestResults {
        score: correct_answers,
        total_questions,
        correct_answers,
        incorrect_answers,
        unanswered_questions,
        percentage: overall_percentage,
        topic_wise_performance,
        difficulty_wise_performance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn question(topic: &str, difficulty: Difficulty, correct_answer: i32) -> Question {
        Question {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            subtopic: "General".to_string(),
            question: "Which of the following statements is correct?".to_string(),
            options: Json(vec![
                "Option A".to_string(),
                "Option B".to_string(),
                "Option C".to_string(),
                "Option D".to_string(),
            ]),
            correct_answer,
            difficulty,
            explanation: "Explained in the answer key.".to_string(),
            tags: vec![],
            pyq_year: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn counts_correct_incorrect_and_unanswered() {
        let questions = vec![
            question("History", Difficulty::Easy, 0),
            question("History", Difficulty::Easy, 1),
            question("Polity", Difficulty::Medium, 2),
            question("Polity", Difficulty::Medium, 3),
            question("Geography", Difficulty::Hard, 0),
        ];
        let answers = vec![Some(0), Some(2), Some(2), None, Some(1)];

        let results = calculate_results(&answers, &questions);

        assert_eq!(results.correct_answers, 2);
        assert_eq!(results.incorrect_answers, 2);
        assert_eq!(results.unanswered_questions, 1);
        assert_eq!(results.score, 2);
        assert_eq!(results.total_questions, 5);
        assert_eq!(results.percentage, 40.00);
    }

    #[test]
    fn counters_always_partition_the_total() {
        let questions = vec![
            question("History", Difficulty::Easy, 1),
            question("History", Difficulty::Medium, 1),
            question("Economy", Difficulty::Hard, 1),
        ];
        let answers = vec![Some(1), None, Some(0)];

        let results = calculate_results(&answers, &questions);

        assert_eq!(
            results.correct_answers + results.incorrect_answers + results.unanswered_questions,
            results.total_questions
        );
        assert_eq!(results.total_questions, questions.len() as i32);
    }

    #[test]
    fn aggregates_per_topic() {
        let questions = vec![
            question("History", Difficulty::Easy, 0),
            question("History", Difficulty::Easy, 0),
            question("Geography", Difficulty::Easy, 1),
            question("Geography", Difficulty::Easy, 2),
        ];
        // History: one correct, one incorrect. Geography: both correct.
        let answers = vec![Some(0), Some(3), Some(1), Some(2)];

        let results = calculate_results(&answers, &questions);

        let history = results
            .topic_wise_performance
            .iter()
            .find(|p| p.topic == "History")
            .unwrap();
        assert_eq!(history.correct, 1);
        assert_eq!(history.total, 2);
        assert_eq!(history.accuracy, 50.00);

        let geography = results
            .topic_wise_performance
            .iter()
            .find(|p| p.topic == "Geography")
            .unwrap();
        assert_eq!(geography.correct, 2);
        assert_eq!(geography.total, 2);
        assert_eq!(geography.accuracy, 100.00);
    }

    #[test]
    fn aggregates_per_difficulty_in_fixed_order() {
        let questions = vec![
            question("History", Difficulty::Hard, 0),
            question("History", Difficulty::Easy, 0),
            question("History", Difficulty::Medium, 0),
            question("History", Difficulty::Easy, 0),
        ];
        let answers = vec![Some(0), Some(0), Some(1), None];

        let results = calculate_results(&answers, &questions);

        let order: Vec<Difficulty> = results
            .difficulty_wise_performance
            .iter()
            .map(|p| p.difficulty)
            .collect();
        assert_eq!(
            order,
            vec![Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
        );

        let easy = &results.difficulty_wise_performance[0];
        assert_eq!((easy.correct, easy.total), (1, 2));
        assert_eq!(easy.accuracy, 50.00);
    }

    #[test]
    fn unanswered_question_counts_against_its_buckets() {
        let questions = vec![question("History", Difficulty::Easy, 2)];
        let results = calculate_results(&[None], &questions);

        assert_eq!(results.unanswered_questions, 1);
        assert_eq!(results.percentage, 0.00);
        let history = &results.topic_wise_performance[0];
        assert_eq!((history.correct, history.total), (0, 1));
        assert_eq!(history.accuracy, 0.00);
    }

    #[test]
    fn accuracy_rounds_to_two_decimals() {
        let questions = vec![
            question("Polity", Difficulty::Easy, 0),
            question("Polity", Difficulty::Easy, 0),
            question("Polity", Difficulty::Easy, 0),
        ];
        let answers = vec![Some(0), Some(1), Some(1)];

        let results = calculate_results(&answers, &questions);
        assert_eq!(results.percentage, 33.33);
        assert_eq!(results.topic_wise_performance[0].accuracy, 33.33);
    }

    #[test]
    fn empty_attempt_yields_zeroes() {
        let results = calculate_results(&[], &[]);
        assert_eq!(results.total_questions, 0);
        assert_eq!(results.percentage, 0.0);
        assert!(results.topic_wise_performance.is_empty());
        assert!(results.difficulty_wise_performance.is_empty());
    }
}
