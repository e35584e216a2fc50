use crate::models::question::Difficulty;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionPayload {
    #[validate(length(min = 1, max = 100))]
    pub topic: String,
    #[validate(length(min = 1, max = 100))]
    pub subtopic: String,
    #[validate(length(min = 10, max = 1000))]
    pub question: String,
    #[validate(custom(function = "validate_options"))]
    pub options: Vec<String>,
    #[validate(range(min = 0, max = 3))]
    pub correct_answer: i32,
    pub difficulty: Difficulty,
    #[validate(custom(function = "validate_explanation"))]
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(custom(function = "validate_pyq_year"))]
    pub pyq_year: Option<i32>,
}

fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options.len() != 4 {
        return Err(ValidationError::new("exactly_4_options_required"));
    }
    if options.iter().any(|o| o.is_empty() || o.len() > 500) {
        return Err(ValidationError::new("option_length_out_of_range"));
    }
    Ok(())
}

// The explanation may be omitted, but once present it must carry substance.
fn validate_explanation(explanation: &str) -> Result<(), ValidationError> {
    if explanation.is_empty() {
        return Ok(());
    }
    if explanation.len() < 10 || explanation.len() > 2000 {
        return Err(ValidationError::new("explanation_length_out_of_range"));
    }
    Ok(())
}

fn validate_pyq_year(year: i32) -> Result<(), ValidationError> {
    let max_year = chrono::Utc::now().year() + 1;
    if year < 1950 || year > max_year {
        return Err(ValidationError::new("pyq_year_out_of_range"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkImportRequest {
    #[validate(length(min = 1))]
    pub questions: Vec<QuestionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkImportResult {
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<BulkImportError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkImportError {
    pub line: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct QuestionFilter {
    pub topic: Option<String>,
    pub subtopic: Option<String>,
    pub difficulty: Option<Difficulty>,
    /// Comma-separated tag list; a question matches if it carries any of them.
    pub tags: Option<String>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
    #[validate(range(min = 0))]
    pub skip: Option<i64>,
}

impl QuestionFilter {
    pub fn tag_list(&self) -> Option<Vec<String>> {
        self.tags.as_deref().map(|tags| {
            tags.split(',')
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> QuestionPayload {
        QuestionPayload {
            topic: "History".to_string(),
            subtopic: "Medieval".to_string(),
            question: "Which ruler founded the city of Fatehpur Sikri?".to_string(),
            options: vec![
                "Akbar".to_string(),
                "Babur".to_string(),
                "Humayun".to_string(),
                "Jahangir".to_string(),
            ],
            correct_answer: 0,
            difficulty: Difficulty::Easy,
            explanation: "Akbar founded Fatehpur Sikri in 1571.".to_string(),
            tags: vec!["mughal".to_string()],
            pyq_year: Some(2019),
        }
    }

    #[test]
    fn accepts_a_well_formed_question() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn rejects_wrong_option_count() {
        let mut p = payload();
        p.options.pop();
        assert!(p.validate().is_err());

        let mut p = payload();
        p.options.push("A fifth option".to_string());
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_correct_answer() {
        let mut p = payload();
        p.correct_answer = 4;
        assert!(p.validate().is_err());
    }

    #[test]
    fn allows_empty_explanation_but_not_a_short_one() {
        let mut p = payload();
        p.explanation = String::new();
        assert!(p.validate().is_ok());

        p.explanation = "too short".to_string();
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_implausible_pyq_year() {
        let mut p = payload();
        p.pyq_year = Some(1900);
        assert!(p.validate().is_err());
    }
}
