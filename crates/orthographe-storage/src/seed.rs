//! Built-in catalogs available before any catalog has been generated.

use std::collections::BTreeMap;

use orthographe_core::types::{CollectionKind, DictationMetadata, DifficultyLevel};

const LEVEL_1: &[(&str, &str, &str)] = &[
    ("Marcel PAGNOL", "La Gloire de mon père", "1957"),
    ("Alphonse DAUDET", "Lettres de mon moulin", "1869"),
    ("Jean GIONO", "L'Homme qui plantait des arbres", "1953"),
    ("Victor HUGO", "Les Misérables", "1862"),
    ("Colette", "Sido", "1930"),
    ("Antoine de SAINT-EXUPÉRY", "Le Petit Prince", "1943"),
    ("Jules RENARD", "Poil de Carotte", "1894"),
    ("Guy de MAUPASSANT", "Le Horla", "1887"),
    ("Honoré de BALZAC", "Le Père Goriot", "1835"),
    ("Émile ZOLA", "Au Bonheur des Dames", "1883"),
];

const LEVEL_2: &[(&str, &str, &str)] = &[
    ("Gustave FLAUBERT", "Madame Bovary", "1857"),
    ("Stendhal", "Le Rouge et le Noir", "1830"),
    ("Albert CAMUS", "L'Étranger", "1942"),
    ("Marguerite DURAS", "L'Amant", "1984"),
    ("Jean-Paul SARTRE", "Les Mots", "1964"),
];

const BREVET: &[(&str, &str, &str)] = &[
    ("Albert CAMUS", "Le Premier Homme", "1994"),
    ("Romain GARY", "La Promesse de l'aube", "1960"),
    ("Simone de BEAUVOIR", "Mémoires d'une jeune fille rangée", "1958"),
    ("Annie ERNAUX", "La Place", "1983"),
    ("Laurent GAUDÉ", "Le Soleil des Scorta", "2004"),
    ("Wajdi MOUAWAD", "Incendies", "2003"),
    ("Delphine de VIGAN", "No et moi", "2007"),
    ("Gaël FAYE", "Petit Pays", "2016"),
];

fn build(kind: CollectionKind, works: &[(&str, &str, &str)]) -> Vec<DictationMetadata> {
    works
        .iter()
        .zip(1u32..)
        .map(|(&(author, source, date), index)| DictationMetadata {
            id: kind.item_id(index),
            author: author.to_string(),
            source: source.to_string(),
            date: date.to_string(),
            index,
        })
        .collect()
}

/// Seed catalogs keyed by collection key. Levels 3 and 4 start empty.
pub fn seed_catalogs() -> BTreeMap<String, Vec<DictationMetadata>> {
    let mut catalogs = BTreeMap::new();
    for level in DifficultyLevel::all() {
        let kind = CollectionKind::Training(level);
        let works = match level.get() {
            1 => LEVEL_1,
            2 => LEVEL_2,
            _ => &[],
        };
        catalogs.insert(kind.key(), build(kind, works));
    }
    catalogs.insert(CollectionKind::Exam.key(), build(CollectionKind::Exam, BREVET));
    catalogs
}
