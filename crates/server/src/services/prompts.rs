//! Prompt templates for the AI features and parsers that dig structured
//! data back out of free-form answers.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A prompt and the token budget it is sent with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub max_tokens: u32,
}

impl Prompt {
    fn new(text: String, max_tokens: u32) -> Self {
        Self { text, max_tokens }
    }
}

pub fn summarize(title: &str, content: &str) -> Prompt {
    Prompt::new(
        format!(
            "You are a helpful study assistant. Summarize this study note in 3-5 bullet points focusing on key concepts.\n\n\
             Note Title: {title}\nNote Content: {content}\n\nBullet-point summary:"
        ),
        1024,
    )
}

pub fn quiz(title: &str, content: &str) -> Prompt {
    Prompt::new(
        format!(
            "You are a study assistant. Generate 5 quiz questions with answers based on this note. \
             Mix multiple choice, short answer, and true/false.\n\n\
             Note Title: {title}\nNote Content: {content}\n\n\
             Format:\nQ1: [Question]\nAnswer: [Answer]"
        ),
        1500,
    )
}

pub fn explain(title: &str, content: &str) -> Prompt {
    Prompt::new(
        format!(
            "You are a friendly tutor. Explain this study note simply for a new student. \
             Use analogies where helpful.\n\n\
             Note Title: {title}\nNote Content: {content}\n\nSimple explanation:"
        ),
        1024,
    )
}

pub fn improve(title: &str, content: &str) -> Prompt {
    Prompt::new(
        format!(
            "You are an expert study coach. Review this note and suggest:\n\
             1. Missing important points\n2. Better organization\n3. Key terms to define\n\
             4. Related topics to explore\n\n\
             Note Title: {title}\nNote Content: {content}\n\nSuggestions:"
        ),
        1024,
    )
}

pub fn chat(title: &str, content: &str, question: &str) -> Prompt {
    Prompt::new(
        format!(
            "You are a study assistant. Answer the student's question based on their note.\n\n\
             Note Title: {title}\nNote Content: {content}\n\nQuestion: {question}\nAnswer:"
        ),
        1024,
    )
}

/// `(subject name, note count)` pairs
pub fn study_plan(subjects: &[(String, i64)]) -> Prompt {
    let summary = subjects
        .iter()
        .map(|(name, count)| format!("- {name}: {count} notes"))
        .collect::<Vec<_>>()
        .join("\n");

    Prompt::new(
        format!(
            "You are a study coach. Create a practical 7-day study plan for a student with these subjects:\n\n\
             {summary}\n\nInclude daily time slots, subject tips, and encouragement:"
        ),
        1500,
    )
}

pub fn flashcards(title: &str, content: &str) -> Prompt {
    Prompt::new(
        format!(
            "Generate 8 flashcards from this study note. Return ONLY a JSON array like this:\n\
             [\n  {{\"front\": \"Question or term\", \"back\": \"Answer or definition\"}},\n  ...\n]\n\
             No extra text, just the JSON array.\n\n\
             Note Title: {title}\nNote Content: {content}"
        ),
        1500,
    )
}

pub fn mind_map(title: &str, content: &str) -> Prompt {
    Prompt::new(
        format!(
            "Analyze this study note and create a mind map structure. Return ONLY a JSON object like this (no extra text):\n\
             {{\n  \"center\": \"Main Topic\",\n  \"branches\": [\n    {{\n      \"name\": \"Branch 1\",\n      \
             \"color\": \"#FF6B6B\",\n      \"children\": [\"subtopic 1\", \"subtopic 2\", \"subtopic 3\"]\n    }}\n  ]\n}}\n\n\
             Use 4-6 branches. Colors should be bright hex colors.\n\n\
             Note Title: {title}\nNote Content: {content}"
        ),
        1500,
    )
}

/// One subject with the titles of its notes
pub struct SubjectOutline {
    pub name: String,
    pub note_titles: Vec<String>,
}

pub fn exam_suggestions(today: &str, subjects: &[SubjectOutline]) -> Prompt {
    let summary = subjects
        .iter()
        .map(|s| {
            let shown = s
                .note_titles
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            let more = if s.note_titles.len() > 3 { "..." } else { "" };
            format!("- {}: {} notes ({shown}{more})", s.name, s.note_titles.len())
        })
        .collect::<Vec<_>>()
        .join("\n");

    Prompt::new(
        format!(
            "You are a study planner. Based on the student's subjects and notes below, suggest realistic exam dates \
             starting from today ({today}).\n\nSubjects and Notes:\n{summary}\n\n\
             Return ONLY a JSON array like this (no extra text):\n\
             [\n  {{\n    \"subject_name\": \"Mathematics\",\n    \"exam_date\": \"2026-03-15T09:00\",\n    \
             \"notes\": \"Focus on linear equations and measurements\"\n  }}\n]\n\n\
             Generate one exam per subject, spread them out at least 1 week apart, starting 2-4 weeks from today:"
        ),
        1000,
    )
}

pub fn generate_note(topic: &str, level: &str) -> Prompt {
    Prompt::new(
        format!(
            "You are an expert teacher. Write a comprehensive and well-structured study note about:\n\n\
             Topic: {topic}\nLevel: {level}\n\n\
             Structure the note with:\n1. A clear introduction\n2. Key concepts with explanations\n\
             3. Important definitions\n4. Examples where relevant\n5. Key points to remember\n\n\
             Write it as a proper study note a student can learn from:"
        ),
        2000,
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MindMap {
    pub center: String,
    #[serde(default)]
    pub branches: Vec<MindMapBranch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MindMapBranch {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSuggestion {
    pub subject_name: String,
    pub exam_date: String,
    #[serde(default)]
    pub notes: Option<String>,
}

fn array_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("valid regex"))
}

fn object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"))
}

/// Parses the outermost `[...]` span of an answer
pub fn extract_array<T: for<'de> Deserialize<'de>>(answer: &str) -> Option<Vec<T>> {
    let found = array_pattern().find(answer)?;
    serde_json::from_str(found.as_str()).ok()
}

/// Parses the outermost `{...}` span of an answer
pub fn extract_object<T: for<'de> Deserialize<'de>>(answer: &str) -> Option<T> {
    let found = object_pattern().find(answer)?;
    serde_json::from_str(found.as_str()).ok()
}

pub fn parse_flashcards(answer: &str) -> Option<Vec<Flashcard>> {
    extract_array(answer)
}

pub fn parse_mind_map(answer: &str) -> Option<MindMap> {
    extract_object(answer)
}

pub fn parse_exam_suggestions(answer: &str) -> Option<Vec<ExamSuggestion>> {
    extract_array(answer)
}

/// Removes markdown emphasis and headers, and normalises bullets to `• `
pub fn strip_markdown(text: &str) -> String {
    static RULES: OnceLock<[(Regex, &'static str); 4]> = OnceLock::new();
    let rules = RULES.get_or_init(|| {
        [
            (Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"), "$1"),
            (Regex::new(r"\*(.+?)\*").expect("valid regex"), "$1"),
            (Regex::new(r"(?m)^#{1,6}\s+").expect("valid regex"), ""),
            (Regex::new(r"(?m)^\s*[-*]\s+").expect("valid regex"), "• "),
        ]
    });

    rules
        .iter()
        .fold(text.to_string(), |acc, (pattern, replacement)| {
            pattern.replace_all(&acc, *replacement).into_owned()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flashcards_are_found_inside_chatter() {
        let answer = r#"Sure! Here are your cards:
[
  {"front": "Derivative of x^2", "back": "2x"},
  {"front": "Integral of 1/x", "back": "ln|x| + C"}
]
Good luck!"#;

        let cards = parse_flashcards(answer).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].back, "ln|x| + C");
    }

    #[test]
    fn garbage_yields_nothing() {
        assert_eq!(parse_flashcards("I cannot help with that."), None);
        assert_eq!(parse_flashcards("[not, json]"), None);
        assert_eq!(parse_mind_map("no braces here"), None);
    }

    #[test]
    fn mind_map_tolerates_missing_fields() {
        let answer = r#"```json
{"center": "Cells", "branches": [{"name": "Organelles", "children": ["Nucleus"]}]}
```"#;

        let map = parse_mind_map(answer).unwrap();
        assert_eq!(map.center, "Cells");
        assert_eq!(map.branches[0].color, None);
        assert_eq!(map.branches[0].children, vec!["Nucleus".to_string()]);
    }

    #[test]
    fn exam_suggestions_parse() {
        let answer = r#"[{"subject_name": "Math", "exam_date": "2026-03-15T09:00", "notes": "Algebra"}]"#;
        let suggestions = parse_exam_suggestions(answer).unwrap();
        assert_eq!(suggestions[0].subject_name, "Math");
        assert_eq!(suggestions[0].exam_date, "2026-03-15T09:00");
    }

    #[test]
    fn markdown_is_flattened() {
        let text = "# Photosynthesis\n**Light** reactions use *chlorophyll*.\n- first\n* second";
        assert_eq!(
            strip_markdown(text),
            "Photosynthesis\nLight reactions use chlorophyll.\n• first\n• second"
        );
    }

    #[test]
    fn study_plan_lists_subjects() {
        let prompt = study_plan(&[("Math".to_string(), 3), ("History".to_string(), 2)]);
        assert!(prompt.text.contains("- Math: 3 notes\n- History: 2 notes"));
        assert_eq!(prompt.max_tokens, 1500);
    }

    #[test]
    fn exam_outline_truncates_note_titles() {
        let outline = SubjectOutline {
            name: "Math".to_string(),
            note_titles: ["A", "B", "C", "D"].map(String::from).to_vec(),
        };
        let prompt = exam_suggestions("2026-03-01", &[outline]);
        assert!(prompt.text.contains("- Math: 4 notes (A, B, C...)"));
        assert!(prompt.text.contains("starting from today (2026-03-01)"));
    }
}
