//! Validates free-text submissions against policy rules before they
//! are persisted. The checks run as an ordered pipeline and stop at
//! the first violation. Only discussion comments pass through here;
//! length limits are the caller's job.

use lazy_static::lazy_static;
use regex::Regex;

/// Common spam phrases, matched as case-insensitive substrings
const SPAM_PHRASES: &[&str] = &[
    "viagra",
    "cialis",
    "casino",
    "poker",
    "lottery",
    "winner",
    "click here",
    "buy now",
    "limited time",
    "act now",
    "free money",
    "make money",
    "work from home",
    "earn cash",
    "weight loss",
    "lose weight",
    "diet pills",
    "crypto",
    "bitcoin",
    "investment opportunity",
    "congratulations",
    "you won",
    "claim prize",
    "nigerian prince",
    "inheritance",
    "million dollars",
    "enlargement",
    "pharmacy",
    "prescription",
    "dating",
    "singles",
    "meet women",
    "meet men",
    "replica",
    "rolex",
    "luxury watches",
    "seo services",
    "increase traffic",
    "backlinks",
];

/// Profanity, slurs, and their common spellings, matched on word
/// boundaries to avoid false positives inside longer words
const PROFANE_WORDS: &[&str] = &[
    // Profanity
    "fuck", "shit", "bitch", "asshole", "bastard", "damn", "hell",
    "crap", "piss", "dick", "cock", "pussy", "cunt", "whore", "slut",
    "fag", "faggot", "nigger", "nigga", "retard", "retarded",
    // Variations and common misspellings
    "f*ck", "f**k", "sh*t", "sh!t", "b*tch", "a**hole", "a$$hole",
    "fuk", "fck", "fuq", "phuck", "shyt", "biatch", "beotch",
    // Slurs and hate speech
    "chink", "spic", "kike", "wetback", "towelhead", "raghead",
    // Sexual content
    "porn", "xxx", "sex", "nude", "naked", "boobs", "tits", "ass",
    "anal", "blowjob", "handjob", "masturbate", "orgasm",
    // Drugs
    "cocaine", "heroin", "meth", "weed", "marijuana", "cannabis",
    "ecstasy", "molly", "lsd", "crack",
];

lazy_static! {
    // Matches http://, https://, www., and bare domains with common TLDs
    static ref URL_PATTERN: Regex = Regex::new(
        r"(?i)(https?://|www\.|[a-zA-Z0-9-]+\.(com|net|org|io|co|ru|cn|info|biz|xyz|top|online|site|club|shop|store|link))"
    )
    .expect("url pattern compiles");

    // Cyrillic unicode range U+0400..U+04FF
    static ref CYRILLIC: Regex =
        Regex::new("[\u{0400}-\u{04FF}]").expect("cyrillic pattern compiles");

    // CJK unified ideographs U+4E00..U+9FFF
    static ref CJK: Regex = Regex::new("[\u{4E00}-\u{9FFF}]").expect("cjk pattern compiles");

    static ref PROFANITY: Regex = {
        let alternation: Vec<_> = PROFANE_WORDS.iter().map(|w| regex::escape(w)).collect();

        Regex::new(&format!(r"(?i)\b({})\b", alternation.join("|")))
            .expect("profanity pattern compiles")
    };
}

/// Why a submission was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Url,
    Cyrillic,
    Cjk,
    SpamPhrase,
    Profanity,
}

impl Rejection {
    /// The human readable reason returned to the client
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Url => "URLs are not allowed in comments",
            Self::Cyrillic => "Russian characters are not allowed",
            Self::Cjk => "Chinese characters are not allowed",
            Self::SpamPhrase => "Content contains prohibited words",
            Self::Profanity => "Content contains inappropriate language",
        }
    }
}

/// Runs the full pipeline over the given text, stopping at the first
/// violation
pub fn validate(content: &str) -> Result<(), Rejection> {
    if URL_PATTERN.is_match(content) {
        return Err(Rejection::Url);
    }

    if CYRILLIC.is_match(content) {
        return Err(Rejection::Cyrillic);
    }

    if CJK.is_match(content) {
        return Err(Rejection::Cjk);
    }

    let lowered = content.to_lowercase();

    if SPAM_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
        return Err(Rejection::SpamPhrase);
    }

    if PROFANITY.is_match(&lowered) {
        return Err(Rejection::Profanity);
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::{validate, Rejection};

    #[test]
    fn urls_are_rejected() {
        assert_eq!(validate("check out http://spam.biz"), Err(Rejection::Url));
        assert_eq!(validate("go to www.example.com"), Err(Rejection::Url));
        assert_eq!(validate("just example.shop for you"), Err(Rejection::Url));
    }

    #[test]
    fn cyrillic_is_rejected() {
        assert_eq!(validate("Привет"), Err(Rejection::Cyrillic));
    }

    #[test]
    fn cjk_is_rejected() {
        assert_eq!(validate("你好"), Err(Rejection::Cjk));
    }

    #[test]
    fn spam_phrases_are_rejected() {
        assert_eq!(validate("buy now!!"), Err(Rejection::SpamPhrase));
        assert_eq!(validate("BUY NOW while stocks last"), Err(Rejection::SpamPhrase));
    }

    #[test]
    fn profanity_is_rejected_on_word_boundaries() {
        assert_eq!(validate("what the hell"), Err(Rejection::Profanity));
        // "bass" and "class" contain listed words but not as whole words
        assert_eq!(validate("love the bass line in class"), Ok(()));
    }

    #[test]
    fn ordinary_feedback_is_accepted() {
        assert_eq!(validate("Great bridge section!"), Ok(()));
        assert_eq!(validate(""), Ok(()));
        assert_eq!(validate("   "), Ok(()));
    }

    #[test]
    fn checks_run_in_order() {
        // Contains both a URL and a spam phrase; the URL check wins
        assert_eq!(
            validate("buy now at http://spam.biz"),
            Err(Rejection::Url)
        );
    }
}
