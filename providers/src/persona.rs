//! The assistant's voice.

/// System instruction shaping how the assistant answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    prompt: String,
}

impl Persona {
    /// Persona addressing the user by `user_name`.
    pub fn new(user_name: &str) -> Self {
        let prompt = format!(
            "You are CyberSentinel AI, a vigilant yet friendly cybersecurity companion. \
             Communicate clearly with practical steps, avoid fearmongering, and keep a professional, upbeat tone. \
             Address the user as {user_name} where appropriate. \
             Prefer concise, actionable guidance with numbered steps and short explanations. \
             Never claim to have device-wide privileged access. If a request needs admin rights, explain limitations."
        );
        Self { prompt }
    }

    /// Use an arbitrary instruction.
    pub fn custom(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }

    /// The instruction text.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Prompt for completion-style models.
    pub fn compose(&self, question: &str) -> String {
        format!("{}\n\nUser: {question}\nAssistant:", self.prompt)
    }

    /// Prefix an answer with the persona, as offline answers optionally are.
    pub fn style(&self, answer: &str) -> String {
        format!("{}\n\n{answer}", self.prompt)
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::new("Analyst")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_mentions_user() {
        assert!(Persona::new("Dana").prompt().contains("Address the user as Dana"));
    }

    #[test]
    fn test_compose() {
        let persona = Persona::custom("Be brief.");
        assert_eq!(persona.compose("what is a vpn"), "Be brief.\n\nUser: what is a vpn\nAssistant:");
        assert_eq!(persona.style("Use one."), "Be brief.\n\nUse one.");
    }
}
