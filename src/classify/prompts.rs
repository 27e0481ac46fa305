use crate::taxonomy::Category;

pub const SYSTEM_PROMPT: &str = "You are an expert FDA regulatory and compliance analyst. Your task is to \
perform a comprehensive, multi-label classification of FDA Form 483 \
observations from a single inspection.";

/// One observation's worth of work for the classification service.
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub inspection_id: i64,
    pub observation_text: String,
}

impl ClassificationRequest {
    pub fn new(inspection_id: i64, observation_text: impl Into<String>) -> Self {
        Self {
            inspection_id,
            observation_text: observation_text.into(),
        }
    }

    /// Builds the full classification prompt: the fixed taxonomy with its
    /// analyst descriptions, the required JSON shape, and the observation
    /// text. The model must answer with JSON only.
    pub fn to_prompt(&self) -> String {
        let mut prompt = String::with_capacity(2048 + self.observation_text.len());

        prompt.push_str(
            "Read the observation text carefully. Based on the full text, identify all \
             applicable deficiency categories from the list provided.\n\n\
             **Classification Categories:**\n",
        );

        for category in Category::ALL {
            prompt.push_str(&format!("- **{}:** {}\n", category.label(), category.description()));
        }

        prompt.push_str(
            "\n**Instructions:**\n\
             1. Analyze the complete observation text provided below.\n\
             2. For each category, determine if it is a reason for the observation.\n\
             3. You MUST respond with a valid JSON object only, with no additional text \
             or explanations before or after the JSON.\n\n\
             **JSON Output Format:**\n{\n  \"analysis_summary\": {\n",
        );

        for (i, category) in Category::ALL.iter().enumerate() {
            let comma = if i + 1 < Category::ALL.len() { "," } else { "" };
            prompt.push_str(&format!("    \"{}\": true/false{}\n", category.label(), comma));
        }

        prompt.push_str("  }\n}\n\n**Observation Text to Analyze:**\n---\n");
        prompt.push_str(&self.observation_text);
        prompt.push_str("\n---\n\nRespond with only the JSON object.\n");

        prompt
    }
}
