//! Prompt templates sent to the model.
//!
//! Prompts are in French because the generated material is French; the
//! speech prompt keeps the short `Read:` prefix, which is what reliably
//! produces an audio-only reply from the speech model.

use orthographe_core::types::CollectionKind;

use crate::service::TextRequest;

/// Catalog request for `count` works suited to `kind`.
pub fn catalog_prompt(kind: CollectionKind, count: usize) -> String {
    let context = match kind {
        CollectionKind::Training(level) => format!("niveau de difficulté {level} sur 4"),
        CollectionKind::Exam => "type Brevet des collèges (officiel)".to_string(),
    };
    format!(
        "Génère une liste de {count} textes célèbres adaptés pour une dictée de 3ème, {context}.\n\
         Varie les auteurs classiques et contemporains. Renvoie UNIQUEMENT un JSON contenant \
         un tableau d'objets avec les champs : author, source, date."
    )
}

pub fn text_prompt(request: &TextRequest) -> String {
    format!(
        "Génère un extrait de texte pour une dictée de troisième.\n\
         Auteur : {}. Oeuvre : {}.\n\
         Le texte doit faire entre {} mots. Renvoie UNIQUEMENT un JSON avec content et wordCount.",
        request.author, request.source, request.word_range
    )
}

pub fn evaluation_prompt(original: &str, submitted: &str) -> String {
    format!(
        "Évalue cette dictée. Texte original: \"{original}\". Texte élève: \"{submitted}\".\n\
         Renvoie un JSON avec: score (0-10), comment, correctText, et errors \
         (text, type, hint, startIndex, endIndex)."
    )
}

/// Speech prompt for `content`, cleaned with [`clean_speech_text`].
pub fn speech_prompt(content: &str, slow: bool) -> String {
    let text = clean_speech_text(content);
    if slow {
        format!("Read slowly and clearly, as a school dictation, pausing at punctuation: {text}")
    } else {
        format!("Read: {text}")
    }
}

/// Collapse line breaks to single spaces, swap double quotes for single
/// quotes, and trim.
pub fn clean_speech_text(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_break = false;
    for c in content.chars() {
        match c {
            '\r' | '\n' => {
                if !in_break {
                    out.push(' ');
                    in_break = true;
                }
            }
            '"' => {
                out.push('\'');
                in_break = false;
            }
            other => {
                out.push(other);
                in_break = false;
            }
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use orthographe_core::types::DifficultyLevel;

    #[test]
    fn test_catalog_prompt_context() {
        let level = CollectionKind::Training(DifficultyLevel::new(3).unwrap());
        let prompt = catalog_prompt(level, 50);
        assert!(prompt.starts_with("Génère une liste de 50 textes"));
        assert!(prompt.contains("niveau de difficulté 3 sur 4"));

        let prompt = catalog_prompt(CollectionKind::Exam, 30);
        assert!(prompt.contains("30 textes"));
        assert!(prompt.contains("Brevet des collèges (officiel)"));
    }

    #[test]
    fn test_text_prompt_includes_work_and_range() {
        let request = TextRequest {
            author: "Albert CAMUS".into(),
            source: "L'Étranger".into(),
            date: "1942".into(),
            kind: CollectionKind::Exam,
            word_range: "120 à 140".into(),
        };
        let prompt = text_prompt(&request);
        assert!(prompt.contains("Auteur : Albert CAMUS. Oeuvre : L'Étranger."));
        assert!(prompt.contains("entre 120 à 140 mots"));
    }

    #[test]
    fn test_evaluation_prompt_quotes_both_texts() {
        let prompt = evaluation_prompt("Il pleut.", "Il pleu.");
        assert!(prompt.contains("Texte original: \"Il pleut.\""));
        assert!(prompt.contains("Texte élève: \"Il pleu.\""));
    }

    #[test]
    fn test_clean_speech_text() {
        assert_eq!(
            clean_speech_text("  Il dit : \"Viens.\"\r\n\nPuis\nil part. "),
            "Il dit : 'Viens.' Puis il part."
        );
        assert_eq!(clean_speech_text("\n\n"), "");
    }

    #[test]
    fn test_speech_prompt_modes() {
        assert_eq!(speech_prompt("Bonjour\nà tous", false), "Read: Bonjour à tous");
        let slow = speech_prompt("Bonjour", true);
        assert!(slow.starts_with("Read slowly"));
        assert!(slow.ends_with("Bonjour"));
    }
}
