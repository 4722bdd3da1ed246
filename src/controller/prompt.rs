use std::fmt;
use std::str::FromStr;

/// Instruction sent right after a document is dropped, before any length is chosen.
pub const INITIAL_SUMMARY_INSTRUCTION: &str =
    "Briefly summarize the following text, no more than two paragraphs (list key points only): ";

/// Target size of a generated summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    pub const ALL: [SummaryLength; 3] = [Self::Short, Self::Medium, Self::Long];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }

    /// Paragraph cap spelled out as a word.
    pub fn paragraphs(self) -> &'static str {
        match self {
            Self::Short => "one",
            Self::Medium => "two",
            Self::Long => "three",
        }
    }
}

impl fmt::Display for SummaryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "long" => Ok(Self::Long),
            other => Err(format!(
                "unknown summary length '{}' (expected short, medium or long)",
                other
            )),
        }
    }
}

pub fn summary_instruction(length: SummaryLength) -> String {
    format!(
        "Summarize the following text with a {} length response, no more than {} paragraphs (list key points only): ",
        length,
        length.paragraphs()
    )
}

pub fn summary_prompt(length: SummaryLength, document: &str) -> String {
    let mut prompt = summary_instruction(length);
    prompt.push_str(document);
    prompt
}

pub fn initial_summary_prompt(document: &str) -> String {
    format!("{}{}", INITIAL_SUMMARY_INSTRUCTION, document)
}

pub fn question_prompt(question: &str, document: &str) -> String {
    format!("Question: {} \n\n Context: {}", question, document)
}
