//! Prompt template for the generation collaborator.
//!
//! The template is data with two named slots — `context` and `question` —
//! rendered into the fixed GymPro persona preamble. The section headers are
//! exported so the offline extractive generator can locate the context block
//! without re-parsing prose.

pub const CONTEXT_HEADER: &str = "Context Information:";
pub const QUESTION_HEADER: &str = "Human Question:";
pub const ANSWER_HEADER: &str = "GymPro AI Response:";

const PREAMBLE: &str = "You are GymPro AI, an expert fitness and gym assistant with comprehensive knowledge about:\n\
- Exercise techniques and proper form\n\
- Workout routines and training programs\n\
- Gym equipment usage and safety\n\
- Nutrition and supplements for fitness goals\n\
- Injury prevention and recovery\n\
- Bodybuilding, powerlifting, and general fitness\n\n\
IMPORTANT GUIDELINES:\n\
1. ONLY answer questions related to gym, fitness, exercise, nutrition, and health topics\n\
2. If asked about non-fitness topics, politely redirect to gym-related questions\n\
3. Always prioritize safety and proper form in your advice\n\
4. Provide practical, actionable guidance when possible\n\
5. Recommend consulting healthcare professionals for medical concerns\n\
6. Base your answers on the provided context while drawing from your fitness expertise\n\
7. Be encouraging and supportive in your responses\n\
8. If you're uncertain about something, say so rather than guessing";

/// The fixed RAG prompt with explicit context and question slots.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    preamble: &'static str,
}

impl PromptTemplate {
    pub fn gympro() -> Self {
        Self { preamble: PREAMBLE }
    }

    /// Render the prompt from retrieved context blocks and the question.
    /// Context blocks are joined with blank lines in retrieval order.
    pub fn render(&self, context_blocks: &[String], question: &str) -> String {
        format!(
            "{}\n\n{}\n{}\n\n{} {}\n\n{}",
            self.preamble,
            CONTEXT_HEADER,
            context_blocks.join("\n\n"),
            QUESTION_HEADER,
            question,
            ANSWER_HEADER,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_places_slots_in_order() {
        let template = PromptTemplate::gympro();
        let prompt = template.render(
            &["Squat to parallel depth.".to_string()],
            "How deep should I squat?",
        );

        let context_pos = prompt.find(CONTEXT_HEADER).unwrap();
        let question_pos = prompt.find(QUESTION_HEADER).unwrap();
        let answer_pos = prompt.find(ANSWER_HEADER).unwrap();
        assert!(context_pos < question_pos);
        assert!(question_pos < answer_pos);
        assert!(prompt.contains("Squat to parallel depth."));
        assert!(prompt.contains("How deep should I squat?"));
    }

    #[test]
    fn test_context_blocks_joined_in_retrieval_order() {
        let template = PromptTemplate::gympro();
        let prompt = template.render(
            &["first block".to_string(), "second block".to_string()],
            "q",
        );
        assert!(prompt.find("first block").unwrap() < prompt.find("second block").unwrap());
    }
}
