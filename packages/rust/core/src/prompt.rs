//! Research prompt templates.

use researchkit_shared::{ChatMessage, Topic};

/// Instruction given to the model for every research request.
pub const SYSTEM_PROMPT: &str = "\
You are an expert researcher with deep knowledge across many fields.

Your task is to provide a clear, accurate, and well-structured summary of the given topic.

Follow this EXACT output format:

# [Topic Name]

## Summary
[A 2-3 sentence overview of the topic]

## Key Points
- [Bullet point 1: A key fact or concept]
- [Bullet point 2: Another important aspect]
- [Bullet point 3: A third significant point]
[Add more bullets if requested]

## Why It Matters
[1-2 sentences on the significance or applications of this topic]

## Learn More
[Suggest 1-2 areas for further exploration]

Guidelines:
- Be concise but informative
- Use simple language accessible to beginners
- Include specific facts, numbers, or examples where relevant
- Avoid jargon unless you explain it
";

/// The two messages sent for one research request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchPrompt {
    pub system: String,
    pub user: String,
}

impl ResearchPrompt {
    /// Messages in API order: system, then user.
    pub fn into_messages(self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(self.system), ChatMessage::user(self.user)]
    }
}

/// Interpolate the topic and bullet count into the fixed template.
pub fn build_research_prompt(topic: &Topic, bullets: u8) -> ResearchPrompt {
    let user = format!(
        "Research and summarize the following topic: {topic}\n\
         \n\
         Please provide exactly {bullets} key bullet points in the \"Key Points\" section.\n\
         \n\
         Make the summary informative yet accessible to someone new to this topic."
    );

    ResearchPrompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}
