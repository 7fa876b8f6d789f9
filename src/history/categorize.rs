use crate::models::chat::ChatSession;
use chrono::{ DateTime, Datelike, Duration, TimeZone };

/// Sessions grouped by recency for the sidebar. Each bucket lists the most
/// recently inserted session first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionBuckets<'a> {
    pub today: Vec<&'a ChatSession>,
    pub this_week: Vec<&'a ChatSession>,
    pub earlier: Vec<&'a ChatSession>,
}

impl<'a> SessionBuckets<'a> {
    pub fn len(&self) -> usize {
        self.today.len() + self.this_week.len() + self.earlier.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Non-empty buckets with their sidebar headings, in display order.
    pub fn iter_labeled(&self) -> impl Iterator<Item = (&'static str, &[&'a ChatSession])> {
        [
            ("Today", self.today.as_slice()),
            ("This week", self.this_week.as_slice()),
            ("Earlier", self.earlier.as_slice()),
        ]
            .into_iter()
            .filter(|(_, sessions)| !sessions.is_empty())
    }
}

/// Splits `sessions` into today / this week / earlier relative to `now`,
/// using the calendar of `now`'s time zone. Weeks start on Sunday at midnight.
pub fn categorize<'a, Tz: TimeZone>(
    sessions: &'a [ChatSession],
    now: &DateTime<Tz>
) -> SessionBuckets<'a> {
    let tz = now.timezone();
    let today = now.date_naive();
    let days_since_sunday = i64::from(today.weekday().num_days_from_sunday());
    let week_start = today - Duration::days(days_since_sunday);

    let mut buckets = SessionBuckets::default();
    for session in sessions {
        let created = session.created_at.with_timezone(&tz).date_naive();
        let bucket = if created == today {
            &mut buckets.today
        } else if created >= week_start {
            &mut buckets.this_week
        } else {
            &mut buckets.earlier
        };
        bucket.insert(0, session);
    }
    buckets
}

/// Case-insensitive substring match on titles. A blank query changes nothing.
pub fn filter<'a>(buckets: &SessionBuckets<'a>, query: &str) -> SessionBuckets<'a> {
    if query.trim().is_empty() {
        return buckets.clone();
    }
    let needle = query.to_lowercase();
    let keep = |sessions: &[&'a ChatSession]| -> Vec<&'a ChatSession> {
        sessions
            .iter()
            .copied()
            .filter(|session| session.title.to_lowercase().contains(&needle))
            .collect()
    };
    SessionBuckets {
        today: keep(&buckets.today),
        this_week: keep(&buckets.this_week),
        earlier: keep(&buckets.earlier),
    }
}
