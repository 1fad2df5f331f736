//! Built-in input sets.
//!
//! Language-level sets (`de`, `fr`, ...) cover every region of that
//! language; region-specific sets exist only where the keys differ
//! (`en-GB` puts `£` on the numeric page).

use crate::domain::input_set::{rows, InputItem, InputSet};
use crate::domain::locale::LocaleId;

use super::CatalogError;

const NUMERIC_DOLLAR: [&str; 3] = [
    "1 2 3 4 5 6 7 8 9 0",
    "- / : ; ( ) $ & @ \"",
    ". , ? ! '",
];
const NUMERIC_POUND: [&str; 3] = [
    "1 2 3 4 5 6 7 8 9 0",
    "- / : ; ( ) £ & @ \"",
    ". , ? ! '",
];
const NUMERIC_EURO: [&str; 3] = [
    "1 2 3 4 5 6 7 8 9 0",
    "- / : ; ( ) € & @ \"",
    ". , ? ! '",
];
const SYMBOLIC_DOLLAR: [&str; 3] = [
    "[ ] { } # % ^ * + =",
    "_ \\ | ~ < > € £ ¥ •",
    ". , ? ! '",
];
const SYMBOLIC_NON_DOLLAR: [&str; 3] = [
    "[ ] { } # % ^ * + =",
    "_ \\ | ~ < > $ € ¥ •",
    ". , ? ! '",
];

const QWERTY: [&str; 3] = [
    "q w e r t y u i o p",
    "a s d f g h j k l",
    "z x c v b n m",
];

/// Long-press alternates shared by the Latin layouts.
const LATIN_ALTERNATES: [(&str, &[&str]); 7] = [
    ("a", &["à", "á", "â", "ä", "æ", "ã", "å", "ā"]),
    ("e", &["è", "é", "ê", "ë", "ē", "ė", "ę"]),
    ("i", &["î", "ï", "í", "ī", "į", "ì"]),
    ("o", &["ô", "ö", "ò", "ó", "œ", "ø", "ō", "õ"]),
    ("u", &["û", "ü", "ù", "ú", "ū"]),
    ("c", &["ç", "ć", "č"]),
    ("n", &["ñ", "ń"]),
];

/// Builds rows from `lines` and attaches alternates to matching keys.
fn alphabetic(lines: &[&str], alternates: &[(&str, &[&str])]) -> Vec<Vec<InputItem>> {
    let mut built = rows(lines);
    for item in built.iter_mut().flatten() {
        if let Some((_, alts)) = alternates.iter().find(|(key, _)| *key == item.output) {
            item.alternates = alts.iter().map(|s| s.to_string()).collect();
        }
    }
    built
}

fn set(
    locale: &str,
    alpha: Vec<Vec<InputItem>>,
    numeric: &[&str],
    symbolic: &[&str],
) -> Result<InputSet, CatalogError> {
    Ok(InputSet::new(
        LocaleId::parse(locale)?,
        alpha,
        rows(numeric),
        rows(symbolic),
    )?)
}

/// Every built-in input set.
///
/// # Errors
///
/// Returns [`CatalogError`] only if the tables themselves are malformed.
pub fn all() -> Result<Vec<InputSet>, CatalogError> {
    let german_alternates: [(&str, &[&str]); 2] =
        [("s", &["ß", "ś", "š"]), ("e", &["é", "è", "ê"])];

    Ok(vec![
        set("en", alphabetic(&QWERTY, &LATIN_ALTERNATES), &NUMERIC_DOLLAR, &SYMBOLIC_DOLLAR)?,
        set("en-GB", alphabetic(&QWERTY, &LATIN_ALTERNATES), &NUMERIC_POUND, &SYMBOLIC_NON_DOLLAR)?,
        set(
            "de",
            alphabetic(
                &["q w e r t z u i o p ü", "a s d f g h j k l ö ä", "y x c v b n m"],
                &german_alternates,
            ),
            &NUMERIC_EURO,
            &SYMBOLIC_NON_DOLLAR,
        )?,
        set(
            "fr",
            alphabetic(
                &["a z e r t y u i o p", "q s d f g h j k l m", "w x c v b n '"],
                &LATIN_ALTERNATES,
            ),
            &NUMERIC_EURO,
            &SYMBOLIC_NON_DOLLAR,
        )?,
        set(
            "es",
            alphabetic(
                &["q w e r t y u i o p", "a s d f g h j k l ñ", "z x c v b n m"],
                &LATIN_ALTERNATES,
            ),
            &NUMERIC_EURO,
            &SYMBOLIC_NON_DOLLAR,
        )?,
        set("it", alphabetic(&QWERTY, &LATIN_ALTERNATES), &NUMERIC_EURO, &SYMBOLIC_NON_DOLLAR)?,
        set("nl", alphabetic(&QWERTY, &LATIN_ALTERNATES), &NUMERIC_EURO, &SYMBOLIC_NON_DOLLAR)?,
        set("pt", alphabetic(&QWERTY, &LATIN_ALTERNATES), &NUMERIC_EURO, &SYMBOLIC_NON_DOLLAR)?,
        set(
            "sv",
            alphabetic(
                &["q w e r t y u i o p å", "a s d f g h j k l ö ä", "z x c v b n m"],
                &LATIN_ALTERNATES,
            ),
            &NUMERIC_EURO,
            &SYMBOLIC_NON_DOLLAR,
        )?,
    ])
}
