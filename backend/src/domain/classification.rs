//! Ordered, data-driven classification of places into buckets.
//!
//! A [`Classifier`] walks its [`ClassificationRule`] list in order and places
//! an element in the bucket of the first rule whose predicate matches. When no
//! rule matches the element lands in the fallback bucket, so classification is
//! total.

use std::collections::BTreeMap;

use regex::Regex;

/// Bucket for hot springs and bathhouses.
pub const HOT_SPRINGS: &str = "hot_springs";
/// Bucket for restaurants.
pub const RESTAURANTS: &str = "restaurants";
/// Bucket for hotels and other lodging.
pub const HOTELS: &str = "hotels";
/// Bucket for ski areas.
pub const SKI_AREAS: &str = "ski_areas";
/// Bucket for sights and historic places.
pub const ATTRACTIONS: &str = "attractions";
/// Bucket for rivers, streams and waterfalls.
pub const STREAMS: &str = "streams";
/// Bucket for anything no rule claims.
pub const OTHER: &str = "other";

/// Predicate over an element's tags.
#[derive(Debug, Clone)]
pub enum TagPredicate {
    /// Tag is present and equals one of the listed values.
    OneOf {
        /// Tag key.
        key: String,
        /// Accepted values.
        values: Vec<String>,
    },
    /// Tag is present with any value.
    Present {
        /// Tag key.
        key: String,
    },
    /// Tag is present and its value matches the pattern.
    Matches {
        /// Tag key.
        key: String,
        /// Pattern applied to the value.
        pattern: Regex,
    },
    /// At least one nested predicate holds.
    Any(Vec<TagPredicate>),
}

impl TagPredicate {
    /// `key` equals one of `values`.
    pub fn one_of(key: impl Into<String>, values: &[&str]) -> Self {
        Self::OneOf {
            key: key.into(),
            values: values.iter().map(|value| (*value).to_owned()).collect(),
        }
    }

    /// `key` is present.
    pub fn present(key: impl Into<String>) -> Self {
        Self::Present { key: key.into() }
    }

    /// `key` matches `pattern`.
    ///
    /// # Errors
    /// Returns the regex compilation error for an invalid pattern.
    pub fn matches(key: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Matches {
            key: key.into(),
            pattern: Regex::new(pattern)?,
        })
    }

    /// Evaluate the predicate against a tag map.
    #[must_use]
    pub fn evaluate(&self, tags: &BTreeMap<String, String>) -> bool {
        match self {
            Self::OneOf { key, values } => tags
                .get(key)
                .is_some_and(|value| values.iter().any(|accepted| accepted == value)),
            Self::Present { key } => tags.contains_key(key),
            Self::Matches { key, pattern } => {
                tags.get(key).is_some_and(|value| pattern.is_match(value))
            }
            Self::Any(predicates) => predicates.iter().any(|predicate| predicate.evaluate(tags)),
        }
    }
}

/// Maps a predicate to a bucket.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    /// Destination bucket.
    pub bucket: String,
    /// Condition for the rule to claim an element.
    pub predicate: TagPredicate,
}

impl ClassificationRule {
    /// Build a rule.
    pub fn new(bucket: impl Into<String>, predicate: TagPredicate) -> Self {
        Self {
            bucket: bucket.into(),
            predicate,
        }
    }
}

/// First-match-wins rule chain with a fallback bucket.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<ClassificationRule>,
    fallback: String,
}

impl Classifier {
    /// Build a classifier from ordered rules.
    pub fn new(rules: Vec<ClassificationRule>, fallback: impl Into<String>) -> Self {
        Self {
            rules,
            fallback: fallback.into(),
        }
    }

    /// The standard rule chain: hot springs, restaurants, hotels, ski areas,
    /// attractions, streams, then `other`.
    ///
    /// # Errors
    /// Returns an error if one of the built-in patterns fails to compile.
    pub fn standard() -> Result<Self, regex::Error> {
        let rules = vec![
            ClassificationRule::new(
                HOT_SPRINGS,
                TagPredicate::Any(vec![
                    TagPredicate::one_of("natural", &["hot_spring"]),
                    TagPredicate::one_of("leisure", &["spa"]),
                    TagPredicate::one_of("amenity", &["public_bath"]),
                    TagPredicate::one_of("bath:type", &["onsen", "hot_spring"]),
                    TagPredicate::matches("name", r"(?i)温泉|onsen|hot spring")?,
                ]),
            ),
            ClassificationRule::new(
                RESTAURANTS,
                TagPredicate::Any(vec![
                    TagPredicate::matches("cuisine", r"(?i)ramen|noodle|soba|udon")?,
                    TagPredicate::matches("name", r"(?i)ラーメン|らーめん|拉麺|ramen")?,
                    TagPredicate::one_of("amenity", &["restaurant", "fast_food", "cafe"]),
                ]),
            ),
            ClassificationRule::new(
                HOTELS,
                TagPredicate::one_of(
                    "tourism",
                    &["hotel", "guest_house", "hostel", "motel", "chalet"],
                ),
            ),
            ClassificationRule::new(
                SKI_AREAS,
                TagPredicate::Any(vec![
                    TagPredicate::one_of("landuse", &["winter_sports"]),
                    TagPredicate::one_of("sport", &["skiing", "snowboard"]),
                    TagPredicate::present("piste:type"),
                ]),
            ),
            ClassificationRule::new(
                ATTRACTIONS,
                TagPredicate::Any(vec![
                    TagPredicate::one_of(
                        "tourism",
                        &["attraction", "viewpoint", "museum", "gallery", "zoo"],
                    ),
                    TagPredicate::present("historic"),
                ]),
            ),
            ClassificationRule::new(
                STREAMS,
                TagPredicate::one_of("waterway", &["stream", "river", "waterfall", "brook"]),
            ),
        ];
        Ok(Self::new(rules, OTHER))
    }

    /// Bucket for the given tags.
    #[must_use]
    pub fn classify(&self, tags: &BTreeMap<String, String>) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.predicate.evaluate(tags))
            .map_or(self.fallback.as_str(), |rule| rule.bucket.as_str())
    }

    /// Every bucket this classifier can produce, in rule order, with the
    /// fallback last.
    #[must_use]
    pub fn bucket_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.rules.len() + 1);
        for bucket in self
            .rules
            .iter()
            .map(|rule| rule.bucket.as_str())
            .chain(std::iter::once(self.fallback.as_str()))
        {
            if !names.contains(&bucket) {
                names.push(bucket);
            }
        }
        names
    }
}
