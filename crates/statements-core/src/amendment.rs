//! Amendment resolution.
//!
//! An amendment disclosure supersedes the original disclosure for the same reporting
//! period. The [`AmendmentResolver`] groups candidates by period type and the date in
//! their title, keeps a single amendment where one exists, and orders the survivors by
//! period date, newest first.

use tracing::warn;

use crate::{
    classifier::TitleClassifier,
    config::StatementsConfig,
    error::Result,
    period::{PeriodDate, PeriodType, fold_digits},
    record::PeriodRecord,
};

/// Anything that belongs to one disclosure and can be superseded by an amendment.
pub trait AmendmentCandidate {
    /// Title of the disclosure.
    fn title(&self) -> &str;

    /// Period length of the disclosure.
    fn period_type(&self) -> PeriodType;

    /// Period date used for ordering.
    fn period_date(&self) -> Option<PeriodDate>;

    /// Publish timestamp of the disclosure.
    fn published_at(&self) -> Option<&str>;
}

impl AmendmentCandidate for PeriodRecord {
    fn title(&self) -> &str {
        &self.source_title
    }

    fn period_type(&self) -> PeriodType {
        self.period_type
    }

    fn period_date(&self) -> Option<PeriodDate> {
        self.period_date
    }

    fn published_at(&self) -> Option<&str> {
        self.published_at.as_deref()
    }
}

/// Filters superseded disclosures out of a candidate list.
#[derive(Clone, Debug)]
pub struct AmendmentResolver {
    classifier: TitleClassifier,
}

impl AmendmentResolver {
    /// Creates a resolver using the configured amendment marker and date patterns.
    pub fn new(config: &StatementsConfig) -> Result<Self> {
        Ok(Self {
            classifier: TitleClassifier::new(config)?,
        })
    }

    /// Creates a resolver from an existing title classifier.
    #[must_use]
    pub const fn with_classifier(classifier: TitleClassifier) -> Self {
        Self { classifier }
    }

    /// Keeps one amendment per `(period type, title date)` group where amendments exist,
    /// sorts by period date descending (undated last) and applies the limit.
    ///
    /// Among several amendments the one published last wins. Publish times are parsed
    /// into a date and an optional `H:M[:S]` time and compared chronologically, so
    /// unpadded fields such as `1403/5/9` order correctly. Equal times, or a time on
    /// either side that does not parse, fall back to the last one encountered.
    #[must_use]
    pub fn filter<T: AmendmentCandidate>(&self, candidates: Vec<T>, limit: Option<usize>) -> Vec<T> {
        let mut groups: Vec<((PeriodType, Option<PeriodDate>), Vec<T>)> = Vec::new();
        for candidate in candidates {
            let key = (
                candidate.period_type(),
                self.classifier.period_date(candidate.title()),
            );
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(candidate),
                None => groups.push((key, vec![candidate])),
            }
        }

        let mut survivors: Vec<T> = Vec::new();
        for ((period_type, date), members) in groups {
            let amendments = members
                .iter()
                .filter(|m| self.classifier.is_amendment(m.title()))
                .count();

            if amendments == 0 {
                survivors.extend(members);
                continue;
            }

            if amendments > 1 {
                warn!(
                    period_type = %period_type,
                    period_date = ?date,
                    amendments,
                    "Multiple amendments for one period, keeping the latest"
                );
            }

            let mut latest: Option<(Option<PublishTime>, T)> = None;
            for member in members {
                if !self.classifier.is_amendment(member.title()) {
                    continue;
                }
                let published = member.published_at().and_then(PublishTime::parse);
                let replace = match (&latest, &published) {
                    (Some((Some(best), _)), Some(current)) => current >= best,
                    _ => true,
                };
                if replace {
                    latest = Some((published, member));
                }
            }
            survivors.extend(latest.map(|(_, member)| member));
        }

        survivors.sort_by(|a, b| match (a.period_date(), b.period_date()) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        if let Some(limit) = limit {
            survivors.truncate(limit);
        }
        survivors
    }
}

/// Chronological key of a disclosure publish timestamp.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct PublishTime {
    date: PeriodDate,
    time: Vec<u32>,
}

impl PublishTime {
    /// Parses text such as `1403/05/10 09:00` or `۱۴۰۳/۵/۹`. Date and time may appear
    /// in either order.
    fn parse(s: &str) -> Option<Self> {
        let folded = fold_digits(s);
        let mut date = None;
        let mut time = Vec::new();
        for token in folded.split_whitespace() {
            if token.contains(':') {
                time = token
                    .split(':')
                    .map(|part| part.parse().ok())
                    .collect::<Option<Vec<u32>>>()?;
            } else if date.is_none() {
                date = PeriodDate::parse(token);
            }
        }
        Some(Self { date: date?, time })
    }
}
