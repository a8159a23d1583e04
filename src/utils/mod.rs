use crate::models::{Action, Movie};
use chrono::{DateTime, Duration, Utc};

pub mod metrics;
pub mod validation;

/// Session boundary: a gap longer than this starts a new session.
pub const SESSION_TIMEOUT_MINUTES: i64 = 30;

/// Signal decay half-life in hours.
pub const RECENCY_HALF_LIFE_HOURS: f64 = 24.0;

/// Maps a raw 1-10 strength signal onto [0, 1], clamping outside the range.
pub fn normalize(x: f64) -> f64 {
    if x < 1.0 {
        0.0
    } else if x > 10.0 {
        1.0
    } else {
        (x - 1.0) / 9.0
    }
}

/// Maps a 0-10 rating onto a signed signal in [-1, 1], centered at 5.5.
pub fn rating_signal(value: f64) -> f64 {
    ((value - 5.5) / 4.5).clamp(-1.0, 1.0)
}

/// User-independent strength of an item, from intrinsic statistics only.
pub fn popularity_score(movie: &Movie) -> f64 {
    let rating_volume = ((movie.rating_count as f64) + 1.0).ln() / 10_000f64.ln();
    0.4 * (movie.popularity / 100.0) + 0.4 * (movie.average_rating / 10.0) + 0.2 * rating_volume
}

/// Population variance; zero for fewer than two samples.
pub fn rating_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

/// Exponential half-life decay for a signal aged `hours` hours.
pub fn half_life_decay(hours: f64) -> f64 {
    (-std::f64::consts::LN_2 * hours.max(0.0) / RECENCY_HALF_LIFE_HOURS).exp()
}

/// Hours elapsed between `timestamp` and `now`, floored at zero.
pub fn hours_since(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now.signed_duration_since(timestamp).num_seconds().max(0) as f64) / 3600.0
}

/// Decay of the most recent action, clamped to [0, 1]; zero when empty.
pub fn recency_score(actions: &[Action], now: DateTime<Utc>) -> f64 {
    let Some(most_recent) = actions.iter().map(|a| a.timestamp).max() else {
        return 0.0;
    };
    half_life_decay(hours_since(most_recent, now)).clamp(0.0, 1.0)
}

/// Splits an action history into sessions: maximal chronological runs with
/// no intra-gap longer than `timeout`. Sessions are emitted oldest-first.
pub fn group_by_sessions(actions: &[Action], timeout: Duration) -> Vec<Vec<Action>> {
    if actions.is_empty() {
        return Vec::new();
    }

    let mut ordered: Vec<Action> = actions.to_vec();
    ordered.sort_by_key(|a| a.timestamp);

    let mut sessions: Vec<Vec<Action>> = Vec::new();
    let mut current: Vec<Action> = Vec::new();

    for action in ordered {
        match current.last() {
            Some(previous) if action.timestamp - previous.timestamp > timeout => {
                sessions.push(std::mem::take(&mut current));
                current.push(action);
            }
            _ => current.push(action),
        }
    }
    sessions.push(current);

    sessions
}

pub fn session_timeout() -> Duration {
    Duration::minutes(SESSION_TIMEOUT_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionType;
    use chrono::TimeZone;

    fn action_at(hour: u32, minute: u32) -> Action {
        Action::new("u", 1, ActionType::View, 0.0)
            .with_timestamp(Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).unwrap())
    }

    #[test]
    fn test_normalize_bounds() {
        assert_eq!(normalize(1.0), 0.0);
        assert_eq!(normalize(10.0), 1.0);
        assert!((normalize(5.5) - 0.5).abs() < 1e-9);
        assert_eq!(normalize(0.0), 0.0);
        assert_eq!(normalize(11.0), 1.0);
    }

    #[test]
    fn test_rating_signal() {
        assert!((rating_signal(10.0) - 1.0).abs() < 1e-9);
        assert!((rating_signal(1.0) - (-1.0)).abs() < 1e-9);
        assert!((rating_signal(5.5)).abs() < 1e-9);
        assert_eq!(rating_signal(0.0), -1.0);
    }

    #[test]
    fn test_rating_variance() {
        let variance = rating_variance(&[5.0, 7.0, 3.0]);
        assert!((variance - 8.0 / 3.0).abs() < 1e-9);

        assert_eq!(rating_variance(&[5.0]), 0.0);
        assert_eq!(rating_variance(&[]), 0.0);
    }

    #[test]
    fn test_group_by_sessions_splits_on_gap() {
        let actions = vec![action_at(10, 0), action_at(10, 15), action_at(11, 0)];
        let sessions = group_by_sessions(&actions, session_timeout());

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].len(), 2);
        assert_eq!(sessions[1].len(), 1);
    }

    #[test]
    fn test_group_by_sessions_keeps_boundary_gap() {
        // A 29-minute gap stays inside one session.
        let actions = vec![action_at(10, 0), action_at(10, 29)];
        let sessions = group_by_sessions(&actions, session_timeout());

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].len(), 2);
    }

    #[test]
    fn test_group_by_sessions_sorts_input() {
        let actions = vec![action_at(11, 0), action_at(10, 0), action_at(10, 15)];
        let sessions = group_by_sessions(&actions, session_timeout());

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0][0].timestamp, action_at(10, 0).timestamp);
    }

    #[test]
    fn test_recency_score() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(recency_score(&[], now), 0.0);

        // An action exactly one half-life old scores 0.5.
        let day_old = vec![Action::new("u", 1, ActionType::View, 0.0)
            .with_timestamp(now - Duration::hours(24))];
        assert!((recency_score(&day_old, now) - 0.5).abs() < 1e-9);

        let fresh = vec![Action::new("u", 1, ActionType::View, 0.0).with_timestamp(now)];
        assert!((recency_score(&fresh, now) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_popularity_score_bounds() {
        let blockbuster = Movie::new(1, "m")
            .with_rating_stats(10.0, 9_999)
            .with_popularity(100.0);
        let score = popularity_score(&blockbuster);
        assert!(score > 0.99 && score <= 1.0 + 1e-9);

        let unknown = Movie::new(2, "n");
        let score = popularity_score(&unknown);
        assert!(score >= 0.0 && score < 0.1);
    }
}
