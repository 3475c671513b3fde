use kodebate_models::{Language, Signal};

/// Language-dependent prompt fragments. One table per language, picked once per request.
#[derive(Debug)]
pub struct LanguageProfile {
    pub language: Language,
    /// Directive for conversational personas.
    pub respond_directive: &'static str,
    /// Directive for the written final analysis.
    pub write_directive: &'static str,
    /// Appended to the prompt after an answer failed validation.
    pub corrective_instruction: &'static str,
    /// Judge-only constraint, followed by the forced direction.
    pub forced_direction_constraint: &'static str,
    pub conflict_prefix: &'static str,
    pub conflict_overrides: &'static str,
}

static ENGLISH: LanguageProfile = LanguageProfile {
    language: Language::En,
    respond_directive: "Respond entirely in English.",
    write_directive: "Write entirely in English.",
    corrective_instruction: "Your previous answer could not be parsed. Return only a \
        structurally valid JSON answer matching the required shape, with no other text.",
    forced_direction_constraint: "The caller requires the final signal to be",
    conflict_prefix: "Forced direction",
    conflict_overrides: "overrides the judged signal",
};

static GERMAN: LanguageProfile = LanguageProfile {
    language: Language::De,
    respond_directive: "Respond entirely in German.",
    write_directive: "Write entirely in German.",
    corrective_instruction: "Deine vorherige Antwort war nicht auswertbar. Gib ausschließlich \
        eine strukturell gültige JSON-Antwort im geforderten Format zurück, ohne weiteren Text.",
    forced_direction_constraint: "Der Auftraggeber verlangt als finales Signal",
    conflict_prefix: "Vorgegebene Richtung",
    conflict_overrides: "überschreibt das ermittelte Signal",
};

impl LanguageProfile {
    pub fn for_language(language: Language) -> &'static LanguageProfile {
        match language {
            Language::En => &ENGLISH,
            Language::De => &GERMAN,
        }
    }

    pub fn forced_constraint(&self, forced: Signal) -> String {
        format!(
            "{} {forced}. Argue within that constraint; do not choose a different signal.",
            self.forced_direction_constraint
        )
    }

    pub fn conflict_note(&self, forced: Signal, judged: Signal) -> String {
        format!(
            "{} {forced} {} {judged}.",
            self.conflict_prefix, self.conflict_overrides
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_keyed_by_language() {
        assert_eq!(LanguageProfile::for_language(Language::En).language, Language::En);
        assert_eq!(LanguageProfile::for_language(Language::De).language, Language::De);
    }

    #[test]
    fn directives_name_the_language() {
        assert!(LanguageProfile::for_language(Language::En)
            .respond_directive
            .contains("English"));
        assert!(LanguageProfile::for_language(Language::De)
            .write_directive
            .contains("German"));
    }

    #[test]
    fn conflict_note_mentions_both_signals() {
        let note =
            LanguageProfile::for_language(Language::En).conflict_note(Signal::Long, Signal::Short);
        assert_eq!(note, "Forced direction LONG overrides the judged signal SHORT.");

        let note =
            LanguageProfile::for_language(Language::De).conflict_note(Signal::Short, Signal::Hold);
        assert!(note.contains("SHORT"));
        assert!(note.contains("HOLD"));
    }

    #[test]
    fn corrective_instruction_demands_valid_shape() {
        let en = LanguageProfile::for_language(Language::En);
        assert!(en.corrective_instruction.contains("structurally valid"));
    }
}
