use crate::models::SearchIntent;
use serde::{Deserialize, Serialize};

/// Denormalized snapshot of a search intent, accumulated per user.
///
/// Structural equality is the dedup key: the store appends a preference
/// only if an identical one is not already in the user's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    pub artist: String,
    pub location: String,
    pub timeframe: String,
}

impl Preference {
    pub fn from_intent(intent: &SearchIntent) -> Self {
        Self {
            artist: intent.keyword.clone(),
            location: intent.city.clone(),
            timeframe: format!("{} to {}", intent.start_date_time, intent.end_date_time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_intent_builds_timeframe() {
        let intent = SearchIntent {
            keyword: "Kenny G".to_string(),
            city: "Los Angeles".to_string(),
            start_date_time: "2027-01-01T00:00:00Z".to_string(),
            end_date_time: "2027-01-31T23:59:59Z".to_string(),
        };
        let pref = Preference::from_intent(&intent);
        assert_eq!(pref.artist, "Kenny G");
        assert_eq!(pref.location, "Los Angeles");
        assert_eq!(pref.timeframe, "2027-01-01T00:00:00Z to 2027-01-31T23:59:59Z");
    }

    #[test]
    fn test_from_intent_empty_dates_still_join() {
        let intent = SearchIntent {
            keyword: "jazz".to_string(),
            city: String::new(),
            start_date_time: String::new(),
            end_date_time: String::new(),
        };
        let pref = Preference::from_intent(&intent);
        assert_eq!(pref.timeframe, " to ");
    }
}
