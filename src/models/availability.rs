//! Availability badge shown next to every book

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A book with copies left is "limited" below 1/LIMITED_DIVISOR (20%) of its total
const LIMITED_DIVISOR: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Availability {
    Unavailable,
    Limited,
    Available,
}

impl Availability {
    pub fn derive(copies: i32, total: Option<i32>) -> Self {
        if copies <= 0 {
            return Availability::Unavailable;
        }
        match total {
            Some(total) if i64::from(copies) * LIMITED_DIVISOR < i64::from(total) => {
                Availability::Limited
            }
            _ => Availability::Available,
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Availability::Unavailable => "badge-unavailable",
            Availability::Limited => "badge-limited",
            Availability::Available => "badge-available",
        }
    }
}

/// Display state of the badge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityBadge {
    pub state: Availability,
    pub css_class: String,
    pub label: String,
}

impl AvailabilityBadge {
    pub fn new(copies: i32, total: Option<i32>) -> Self {
        let state = Availability::derive(copies, total);
        let count = match total {
            Some(total) => format!("{}/{}", copies, total),
            None => copies.to_string(),
        };
        let label = match state {
            Availability::Unavailable => "Not Available".to_string(),
            Availability::Limited => format!("Limited Availability ({})", count),
            Availability::Available => format!("Available ({})", count),
        };

        Self {
            state,
            css_class: state.css_class().to_string(),
            label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_labels() {
        assert_eq!(AvailabilityBadge::new(0, Some(100)).label, "Not Available");
        assert_eq!(AvailabilityBadge::new(5, Some(100)).label, "Limited Availability (5/100)");
        assert_eq!(AvailabilityBadge::new(50, Some(100)).label, "Available (50/100)");
        assert_eq!(AvailabilityBadge::new(5, None).label, "Available (5)");
    }

    #[test]
    fn test_states_and_classes() {
        let badge = AvailabilityBadge::new(-1, None);
        assert_eq!(badge.state, Availability::Unavailable);
        assert_eq!(badge.css_class, "badge-unavailable");

        assert_eq!(Availability::derive(19, Some(100)), Availability::Limited);
        assert_eq!(Availability::derive(20, Some(100)), Availability::Available);
        assert_eq!(AvailabilityBadge::new(2, Some(10)).css_class, "badge-available");
        assert_eq!(AvailabilityBadge::new(1, Some(6)).css_class, "badge-limited");
    }
}
