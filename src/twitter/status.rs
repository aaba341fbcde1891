//! Composition of status text and status parameters.
//!
//! Twitter counts every URL as a fixed-length t.co link and weighs characters
//! outside the Latin ranges (CJK, most emoji) double, so the length budget is
//! measured the same way: URLs at [`LINK_LENGTH`], other characters by
//! [`char_weight`].

/// Maximum weighted length of a status.
pub const STATUS_LENGTH_LIMIT: usize = 280;

/// Weighted length of any URL after t.co wrapping.
pub const LINK_LENGTH: usize = 23;

const ELLIPSIS: char = '…';

/// Code point ranges Twitter counts as a single character; everything else
/// counts as two.
const SINGLE_WEIGHT_RANGES: [(u32, u32); 4] = [
    (0, 4351),
    (8192, 8205),
    (8208, 8223),
    (8242, 8247),
];

fn is_link(token: &str) -> bool {
    token.starts_with("http://") || token.starts_with("https://")
}

/// Weight of one character outside a URL: 1 for Latin and common punctuation
/// ranges, 2 otherwise.
pub fn char_weight(c: char) -> usize {
    let code = c as u32;
    if SINGLE_WEIGHT_RANGES
        .iter()
        .any(|(start, end)| (*start..=*end).contains(&code))
    {
        1
    } else {
        2
    }
}

fn plain_length(text: &str) -> usize {
    text.chars().map(char_weight).sum()
}

/// Length of `text` as Twitter counts it: URLs weigh [`LINK_LENGTH`], other
/// characters their [`char_weight`].
pub fn weighted_length(text: &str) -> usize {
    let mut length = 0;
    let mut rest = text;
    while !rest.is_empty() {
        let word_start = rest
            .char_indices()
            .find(|(_, c)| !c.is_whitespace())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        length += plain_length(&rest[..word_start]);
        rest = &rest[word_start..];

        let word_end = rest
            .char_indices()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let word = &rest[..word_end];
        length += if is_link(word) {
            LINK_LENGTH
        } else {
            plain_length(word)
        };
        rest = &rest[word_end..];
    }
    length
}

/// Longest prefix of `word` whose character weight fits in `budget`.
fn take_weighted(word: &str, budget: usize) -> String {
    let mut used = 0;
    word.chars()
        .take_while(|c| {
            used += char_weight(*c);
            used <= budget
        })
        .collect()
}

/// Splits text into words, each carrying the whitespace that follows it.
fn words_with_trailing_space(text: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start = 0;
    let mut in_space = false;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            in_space = true;
        } else if in_space {
            words.push(&text[start..i]);
            start = i;
            in_space = false;
        }
    }
    if start < text.len() {
        words.push(&text[start..]);
    }
    words
}

/// Fits `content` into a single status, keeping the permalink when shortening.
///
/// Text that already fits is returned unchanged apart from surrounding
/// whitespace; the permalink is not appended to it. Longer text is cut at a word
/// boundary, ended with an ellipsis, and followed by the permalink. A permalink
/// too long to fit at all is dropped.
///
/// The result depends only on the two arguments, and shortening a result again
/// with the same permalink returns it unchanged.
///
/// # Example
///
/// ```rust
/// use silobridge::twitter::shorten;
///
/// assert_eq!(shorten("You shall not pass!", Some("https://foo.example/bar")), "You shall not pass!");
/// ```
pub fn shorten(content: &str, permalink: Option<&str>) -> String {
    let text = content.trim();
    if weighted_length(text) <= STATUS_LENGTH_LIMIT {
        return text.to_string();
    }

    let ellipsis_length = char_weight(ELLIPSIS);
    let permalink = permalink.map(str::trim).filter(|link| {
        !link.is_empty() && weighted_length(link) + 1 + ellipsis_length <= STATUS_LENGTH_LIMIT
    });
    let suffix_length = permalink.map_or(0, |link| 1 + weighted_length(link));
    let budget = STATUS_LENGTH_LIMIT - suffix_length - ellipsis_length;

    let mut kept = String::new();
    for word in words_with_trailing_space(text) {
        let candidate = format!("{}{}", kept, word);
        if weighted_length(candidate.trim_end()) > budget {
            if kept.is_empty() {
                kept = take_weighted(word.trim_end(), budget);
            }
            break;
        }
        kept = candidate;
    }

    let mut shortened = kept
        .trim_end()
        .trim_end_matches([',', ';', ':'])
        .trim_end()
        .to_string();
    shortened.push(ELLIPSIS);
    if let Some(link) = permalink {
        shortened.push(' ');
        shortened.push_str(link);
    }
    shortened
}

/// Whether `text` already contains an `@author` mention (case-insensitive,
/// whole handle only).
pub fn mentions(text: &str, author: &str) -> bool {
    let pattern = format!(r"(?i)(?:^|[^\w@])@{}\b", regex::escape(author));
    regex::Regex::new(&pattern)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

/// Prefixes `@author` to reply text unless the author is already mentioned.
pub fn address_to(author: &str, content: Option<&str>) -> String {
    match content.map(str::trim).filter(|c| !c.is_empty()) {
        Some(text) if mentions(text, author) => text.to_string(),
        Some(text) => format!("@{} {}", author, text),
        None => format!("@{}", author),
    }
}

/// Latitude/longitude pair taken from a `geo:` URI.
///
/// The original strings are kept so no precision is lost on the way to Twitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub lat: String,
    pub long: String,
}

impl Coordinates {
    /// Parses `geo:<lat>,<lon>[,<alt>][;params]`.
    ///
    /// Returns `None` for anything malformed, partial or out of range.
    pub fn from_geo_uri(location: &str) -> Option<Coordinates> {
        let body = location.trim().strip_prefix("geo:")?;
        let coords = body.split(';').next()?;
        let mut parts = coords.split(',').map(str::trim);
        let lat = parts.next()?;
        let long = parts.next()?;
        if let Some(altitude) = parts.next() {
            altitude.parse::<f64>().ok()?;
        }
        if parts.next().is_some() {
            return None;
        }

        let lat_value: f64 = lat.parse().ok()?;
        let long_value: f64 = long.parse().ok()?;
        if !lat_value.is_finite()
            || !long_value.is_finite()
            || !(-90.0..=90.0).contains(&lat_value)
            || !(-180.0..=180.0).contains(&long_value)
        {
            return None;
        }

        Some(Coordinates {
            lat: lat.to_string(),
            long: long.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERMALINK: &str = "https://foo.example/2015/11/a-rather-long-post-slug";

    fn long_content() -> String {
        "They have taken the bridge and the second hall. We have barred the gates but cannot hold them for long. "
            .repeat(5)
    }

    #[test]
    fn test_short_content_is_unchanged() {
        assert_eq!(
            shorten("You shall not pass by reference!", Some("https://foo.com/bar")),
            "You shall not pass by reference!"
        );
        assert_eq!(shorten("  padded \n", None), "padded");
    }

    #[test]
    fn test_weighted_length_counts_links_as_fixed_width() {
        assert_eq!(weighted_length("hi"), 2);
        assert_eq!(weighted_length("see https://example.com/a/very/long/path/indeed"), 4 + LINK_LENGTH);
        assert_eq!(weighted_length("a  b"), 4);
        assert_eq!(weighted_length("naïve ☃"), 8);
    }

    #[test]
    fn test_long_content_is_elided_and_keeps_permalink() {
        let content = long_content();
        let shortened = shorten(&content, Some(PERMALINK));

        assert!(weighted_length(&shortened) <= STATUS_LENGTH_LIMIT);
        assert!(shortened.ends_with(&format!("… {}", PERMALINK)));
        assert!(content.starts_with(shortened.trim_end_matches(&format!("… {}", PERMALINK))));
    }

    #[test]
    fn test_wide_characters_count_double() {
        assert_eq!(char_weight('a'), 1);
        assert_eq!(char_weight('é'), 1);
        assert_eq!(char_weight('…'), 2);
        assert_eq!(char_weight('—'), 1);
        assert_eq!(char_weight('日'), 2);
        assert_eq!(char_weight('😀'), 2);
        assert_eq!(weighted_length("日本語"), 6);
    }

    #[test]
    fn test_long_cjk_content_is_shortened_to_fit() {
        let content = "日本語のテキスト".repeat(25);
        assert_eq!(weighted_length(&content), 400);

        let shortened = shorten(&content, Some(PERMALINK));
        assert_ne!(shortened, content);
        assert!(weighted_length(&shortened) <= STATUS_LENGTH_LIMIT);
        assert!(shortened.ends_with(&format!("… {}", PERMALINK)));
        assert!(content.starts_with(shortened.trim_end_matches(&format!("… {}", PERMALINK))));
    }

    #[test]
    fn test_cjk_content_within_weighted_limit_is_unchanged() {
        let content = "日本語のテキスト".repeat(17);
        assert_eq!(weighted_length(&content), 272);
        assert_eq!(shorten(&content, Some(PERMALINK)), content);
    }

    #[test]
    fn test_long_emoji_content_is_shortened_to_fit() {
        let content = "great day 😀🎉 ".repeat(30);
        let shortened = shorten(&content, None);
        assert!(weighted_length(&shortened) <= STATUS_LENGTH_LIMIT);
        assert!(shortened.ends_with('…'));
        assert_eq!(shorten(&shortened, None), shortened);
    }

    #[test]
    fn test_long_content_without_permalink() {
        let shortened = shorten(&long_content(), None);
        assert!(weighted_length(&shortened) <= STATUS_LENGTH_LIMIT);
        assert!(shortened.ends_with('…'));
    }

    #[test]
    fn test_shortening_is_deterministic_and_stable() {
        let content = long_content();
        let first = shorten(&content, Some(PERMALINK));
        let second = shorten(&content, Some(PERMALINK));
        assert_eq!(first, second);
        assert_eq!(shorten(&first, Some(PERMALINK)), first);
    }

    #[test]
    fn test_single_giant_word_is_cut() {
        let content = "a".repeat(400);
        let shortened = shorten(&content, Some(PERMALINK));
        assert!(weighted_length(&shortened) <= STATUS_LENGTH_LIMIT);
        assert!(shortened.ends_with(PERMALINK));
    }

    #[test]
    fn test_oversized_permalink_is_dropped() {
        let giant_link = format!("not-a-url-{}", "x".repeat(300));
        let shortened = shorten(&long_content(), Some(&giant_link));
        assert!(weighted_length(&shortened) <= STATUS_LENGTH_LIMIT);
        assert!(!shortened.contains("not-a-url"));
    }

    #[test]
    fn test_address_to_prefixes_mention() {
        assert_eq!(
            address_to("mashable", Some("Speak, friend, and enter")),
            "@mashable Speak, friend, and enter"
        );
        assert_eq!(
            address_to("mashable", Some("thanks @Mashable!")),
            "thanks @Mashable!"
        );
        assert_eq!(
            address_to("jack", Some("cc @jackson")),
            "@jack cc @jackson"
        );
        assert_eq!(address_to("jack", None), "@jack");
    }

    #[test]
    fn test_geo_uri_parsing() {
        assert_eq!(
            Coordinates::from_geo_uri("geo:37.786971,-122.399677;u=35"),
            Some(Coordinates {
                lat: "37.786971".to_string(),
                long: "-122.399677".to_string(),
            })
        );
        assert_eq!(
            Coordinates::from_geo_uri("geo:45.5,-122.6,30"),
            Some(Coordinates {
                lat: "45.5".to_string(),
                long: "-122.6".to_string(),
            })
        );
    }

    #[test]
    fn test_malformed_geo_uris_are_dropped() {
        assert_eq!(Coordinates::from_geo_uri("37.7,-122.3"), None);
        assert_eq!(Coordinates::from_geo_uri("geo:37.7"), None);
        assert_eq!(Coordinates::from_geo_uri("geo:north,west"), None);
        assert_eq!(Coordinates::from_geo_uri("geo:91,0"), None);
        assert_eq!(Coordinates::from_geo_uri("geo:0,181"), None);
        assert_eq!(Coordinates::from_geo_uri("geo:1,2,3,4"), None);
        assert_eq!(Coordinates::from_geo_uri("geo:NaN,0"), None);
    }
}
