use crate::models::question::{Difficulty, Question, TestDifficulty};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use uuid::Uuid;

/// How a mixed-difficulty request of `question_count` splits across
/// easy/medium/hard: the first bucket absorbs the first remainder unit, the
/// second the next, the third never does.
pub fn mixed_bucket_counts(question_count: usize) -> [usize; 3] {
    let base = question_count / 3;
    let remainder = question_count % 3;
    [
        base + usize::from(remainder >= 1),
        base + usize::from(remainder >= 2),
        base,
    ]
}

/// Shuffle `pool` with questions the user has not seen before placed ahead
/// of repeats, then truncate to `count`. Both partitions get an independent
/// uniform permutation so repeats are only served once fresh material runs
/// out.
fn take_with_novelty<R: Rng>(
    pool: Vec<Question>,
    attempted: &HashSet<Uuid>,
    count: usize,
    rng: &mut R,
) -> Vec<Question> {
    let (mut fresh, mut seen): (Vec<Question>, Vec<Question>) = pool
        .into_iter()
        .partition(|q| !attempted.contains(&q.id));

    fresh.shuffle(rng);
    seen.shuffle(rng);

    fresh.extend(seen);
    fresh.truncate(count);
    fresh
}

/// Pick `question_count` questions out of `available` (already filtered by
/// topic/subtopic/difficulty). Callers must have verified that `available`
/// holds at least `question_count` entries.
///
/// Mixed difficulty balances across the three levels and backfills from the
/// unused pool when a level is under-stocked; the final shuffle hides both
/// the difficulty grouping and the novelty ordering from the sequence.
pub fn select_questions(
    available: Vec<Question>,
    attempted: &HashSet<Uuid>,
    difficulty: TestDifficulty,
    question_count: usize,
) -> Vec<Question> {
    let mut rng = rand::thread_rng();

    let mut selected = match difficulty {
        TestDifficulty::Mixed => {
            let counts = mixed_bucket_counts(question_count);
            let mut picked: Vec<Question> = Vec::with_capacity(question_count);

            for (level, want) in Difficulty::ALL.into_iter().zip(counts) {
                let pool: Vec<Question> = available
                    .iter()
                    .filter(|q| q.difficulty == level)
                    .cloned()
                    .collect();
                picked.extend(take_with_novelty(pool, attempted, want, &mut rng));
            }

            // An under-stocked level leaves the result short; top up from
            // whatever is left, difficulty no longer considered.
            if picked.len() < question_count {
                let picked_ids: HashSet<Uuid> = picked.iter().map(|q| q.id).collect();
                let mut remaining: Vec<Question> = available
                    .into_iter()
                    .filter(|q| !picked_ids.contains(&q.id))
                    .collect();
                remaining.shuffle(&mut rng);
                let needed = question_count - picked.len();
                picked.extend(remaining.into_iter().take(needed));
            }

            picked
        }
        _ => take_with_novelty(available, attempted, question_count, &mut rng),
    };

    selected.shuffle(&mut rng);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;

    fn question(difficulty: Difficulty) -> Question {
        Question {
            id: Uuid::new_v4(),
            topic: "History".to_string(),
            subtopic: "Medieval".to_string(),
            question: "Which of the following statements is correct?".to_string(),
            options: Json(vec![
                "Option A".to_string(),
                "Option B".to_string(),
                "Option C".to_string(),
                "Option D".to_string(),
            ]),
            correct_answer: 0,
            difficulty,
            explanation: "Explained in the answer key.".to_string(),
            tags: vec![],
            pyq_year: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn pool(easy: usize, medium: usize, hard: usize) -> Vec<Question> {
        let mut questions = Vec::new();
        questions.extend((0..easy).map(|_| question(Difficulty::Easy)));
        questions.extend((0..medium).map(|_| question(Difficulty::Medium)));
        questions.extend((0..hard).map(|_| question(Difficulty::Hard)));
        questions
    }

    #[test]
    fn bucket_counts_spread_the_remainder_front_first() {
        assert_eq!(mixed_bucket_counts(9), [3, 3, 3]);
        assert_eq!(mixed_bucket_counts(10), [4, 3, 3]);
        assert_eq!(mixed_bucket_counts(11), [4, 4, 3]);
        assert_eq!(mixed_bucket_counts(1), [1, 0, 0]);
        assert_eq!(mixed_bucket_counts(2), [1, 1, 0]);
    }

    #[test]
    fn returns_exactly_the_requested_count() {
        let available = pool(20, 20, 20);
        let ids: HashSet<Uuid> = available.iter().map(|q| q.id).collect();

        let selected = select_questions(available, &HashSet::new(), TestDifficulty::Mixed, 25);

        assert_eq!(selected.len(), 25);
        // No duplicates, and everything came out of the offered pool.
        let selected_ids: HashSet<Uuid> = selected.iter().map(|q| q.id).collect();
        assert_eq!(selected_ids.len(), 25);
        assert!(selected_ids.is_subset(&ids));
    }

    #[test]
    fn prefers_unattempted_questions_when_enough_exist() {
        let available = pool(30, 0, 0);
        let attempted: HashSet<Uuid> = available.iter().take(15).map(|q| q.id).collect();

        let selected =
            select_questions(available, &attempted, TestDifficulty::Easy, 15);

        assert_eq!(selected.len(), 15);
        assert!(selected.iter().all(|q| !attempted.contains(&q.id)));
    }

    #[test]
    fn falls_back_to_repeats_once_fresh_material_runs_out() {
        let available = pool(10, 0, 0);
        let attempted: HashSet<Uuid> = available.iter().take(6).map(|q| q.id).collect();

        let selected = select_questions(available, &attempted, TestDifficulty::Easy, 8);

        assert_eq!(selected.len(), 8);
        let fresh = selected.iter().filter(|q| !attempted.contains(&q.id)).count();
        assert_eq!(fresh, 4);
    }

    #[test]
    fn mixed_selection_balances_difficulties() {
        let available = pool(20, 20, 20);

        let selected = select_questions(available, &HashSet::new(), TestDifficulty::Mixed, 10);

        let count_of = |level: Difficulty| {
            selected.iter().filter(|q| q.difficulty == level).count()
        };
        assert_eq!(count_of(Difficulty::Easy), 4);
        assert_eq!(count_of(Difficulty::Medium), 3);
        assert_eq!(count_of(Difficulty::Hard), 3);
    }

    #[test]
    fn mixed_selection_backfills_an_understocked_level() {
        // Only 1 hard question exists; the shortfall must come from the
        // other levels so the caller still gets the full set.
        let available = pool(20, 20, 1);

        let selected = select_questions(available, &HashSet::new(), TestDifficulty::Mixed, 12);

        assert_eq!(selected.len(), 12);
        let hard = selected
            .iter()
            .filter(|q| q.difficulty == Difficulty::Hard)
            .count();
        assert_eq!(hard, 1);
    }

    #[test]
    fn single_difficulty_ignores_other_levels() {
        let available = pool(10, 0, 0);

        let selected = select_questions(available, &HashSet::new(), TestDifficulty::Easy, 10);

        assert_eq!(selected.len(), 10);
        assert!(selected.iter().all(|q| q.difficulty == Difficulty::Easy));
    }
}
