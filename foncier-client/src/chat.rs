//! Assistant conversationnel : mise en forme des réponses

use std::sync::OnceLock;

use regex::Regex;

/// Réponse affichée quand le backend ne renvoie aucun texte
pub const FALLBACK_REPLY: &str = "Je n'ai pas pu traiter votre demande. Veuillez réessayer.";

/// Réponse affichée quand l'appel au backend échoue
pub const ERROR_REPLY: &str =
    "Désolé, je rencontre des difficultés techniques. Veuillez réessayer plus tard.";

const SOURCES_MARKER: &str = "\n\nSources:";

fn markdown_link() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("static pattern"))
}

/// Nettoie une réponse : coupe la section des sources et remplace les liens
/// markdown par leur texte
pub fn clean_reply(reply: &str) -> String {
    let body = match reply.find(SOURCES_MARKER) {
        Some(idx) => reply[..idx].trim(),
        None => reply,
    };
    markdown_link().replace_all(body, "$1").into_owned()
}

/// Message utilisateur prêt à envoyer, `None` s'il est vide
pub fn prepare_message(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
