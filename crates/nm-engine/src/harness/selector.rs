//! CSS selector matching for declarables.
//!
//! Only what directive selectors use in practice: element names, attribute
//! presence (`[name]`), attribute values (`[name=value]`, ignored for matching),
//! combinations (`button[appTooltip]`) and comma-separated alternatives.

/// One compound selector.
///
/// # Examples
///
/// ```
/// use nm_engine::harness::Selector;
///
/// let selectors = Selector::parse_list("app-button, [appButton]");
/// assert_eq!(selectors.len(), 2);
/// assert!(Selector::matches_any(&selectors, "app-button", &[]));
/// assert!(Selector::matches_any(&selectors, "div", &["appButton"]));
/// assert!(!Selector::matches_any(&selectors, "div", &["other"]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    attributes: Vec<String>,
}

impl Selector {
    /// Parses a compound selector such as `a-b[c][d]`.
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let source = source.trim();
        let (tag, mut rest) = match source.find('[') {
            Some(index) => (&source[..index], &source[index..]),
            None => (source, ""),
        };

        let mut attributes = Vec::new();
        while let Some(open) = rest.find('[') {
            let Some(close) = rest[open..].find(']') else {
                break;
            };
            let inner = &rest[open + 1..open + close];
            let name = inner.split('=').next().unwrap_or(inner).trim();
            if !name.is_empty() {
                attributes.push(name.to_owned());
            }
            rest = &rest[open + close + 1..];
        }

        let tag = tag.trim();
        Self {
            tag: (!tag.is_empty() && tag != "*").then(|| tag.to_owned()),
            attributes,
        }
    }

    /// Parses comma-separated alternatives.
    #[must_use]
    pub fn parse_list(source: &str) -> Vec<Self> {
        source
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Checks an element against this selector.
    #[must_use]
    pub fn matches(&self, tag: &str, attributes: &[&str]) -> bool {
        if self.tag.is_none() && self.attributes.is_empty() {
            return false;
        }
        self.tag.as_deref().is_none_or(|expected| expected == tag)
            && self
                .attributes
                .iter()
                .all(|name| attributes.contains(&name.as_str()))
    }

    /// Checks an element against any of the alternatives.
    #[must_use]
    pub fn matches_any(selectors: &[Self], tag: &str, attributes: &[&str]) -> bool {
        selectors
            .iter()
            .any(|selector| selector.matches(tag, attributes))
    }

    /// Returns the element name of a tag selector.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }
}
