//! Deterministic canned guidance for when retrieval is unavailable.
//!
//! Two fixed responses: an off-topic redirect that never echoes the
//! question, and a gym-related tips template that embeds the trimmed
//! question verbatim. The templates are data (header, tips list, question
//! slot) so tests can assert on structure instead of exact prose.

/// Fixed redirect for off-topic messages. Does not reference the question.
const REDIRECT: &str = "I'm GymPro AI, your dedicated fitness assistant!\n\n\
I specialize in helping with:\n\
- Exercise techniques and workout routines\n\
- Gym equipment usage and safety\n\
- Nutrition and fitness goals\n\
- Training programs and progression\n\
- Injury prevention and recovery\n\n\
Please ask me something related to fitness, gym, or health topics, and I'll be happy to help!";

/// A fallback answer template with an explicit question slot.
pub struct FallbackTemplate {
    header: &'static str,
    tips: &'static [&'static str],
    footer: &'static str,
}

/// General-guidance template used when the RAG pipeline cannot answer a
/// gym-related question.
pub const GENERAL_TIPS: FallbackTemplate = FallbackTemplate {
    header: "I'm GymPro AI, and I'd love to help with your fitness question!\n\n\
        However, my retrieval system is currently unavailable. Here's some general guidance:\n\n\
        Essential Fitness Tips:",
    tips: &[
        "Always warm up before exercising (5-10 minutes)",
        "Focus on compound movements: squats, deadlifts, bench press, rows",
        "Prioritize proper form over heavy weights",
        "Stay hydrated throughout your workout",
        "Allow adequate rest between training sessions (48-72 hours for muscle groups)",
        "Get 7-9 hours of quality sleep for recovery",
    ],
    footer: "Feel free to ask about specific exercises, workout plans, or nutrition guidance!",
};

impl FallbackTemplate {
    /// Render the template with the question embedded verbatim.
    pub fn render(&self, question: &str) -> String {
        let mut out = String::with_capacity(512 + question.len());
        out.push_str(self.header);
        out.push('\n');
        for tip in self.tips {
            out.push_str("- ");
            out.push_str(tip);
            out.push('\n');
        }
        out.push_str(&format!("\nFor your specific question: \"{}\"\n", question));
        out.push_str(self.footer);
        out
    }

    pub fn tips(&self) -> &[&'static str] {
        self.tips
    }
}

/// The fixed off-topic redirect message.
pub fn redirect() -> &'static str {
    REDIRECT
}

/// Produce the fallback answer for a validated message.
///
/// Pure and deterministic; always succeeds.
pub fn respond(question: &str, gym_related: bool) -> String {
    if gym_related {
        GENERAL_TIPS.render(question)
    } else {
        REDIRECT.to_string()
    }
}
