//! Typed, lenient view of a finished itinerary
//!
//! The backend owns the plan schema; the session passes the plan through
//! untouched. This view picks out the parts the terminal can show and
//! ignores everything else.

use std::fmt;

use serde::Deserialize;

use crate::conversation::Itinerary;

/// Display summary of an itinerary
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ItinerarySummary {
    pub destination: Option<String>,
    pub days: Option<u32>,
    pub overview: Option<String>,
    pub daily_plan: Vec<DayPlan>,
    pub tips: Vec<String>,
}

/// One day of the itinerary
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DayPlan {
    pub day: Option<u32>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub places: Vec<Place>,
}

/// A place visited on a given day
///
/// Accepts either a bare name or an object with a `name` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Place {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl Place {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Detailed { name, .. } => name,
        }
    }
}

impl ItinerarySummary {
    /// Build a summary, falling back to an empty one for shapes it can't read
    #[must_use]
    pub fn from_itinerary(plan: &Itinerary) -> Self {
        Self::deserialize(plan.as_value()).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "itinerary not in summary shape");
            Self::default()
        })
    }

    /// Number of days, from the explicit count or the daily plan
    #[must_use]
    pub fn day_count(&self) -> usize {
        self.days
            .map_or(self.daily_plan.len(), |d| d as usize)
    }
}

impl fmt::Display for ItinerarySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.destination {
            Some(destination) => writeln!(f, "Trip to {destination} ({} days)", self.day_count())?,
            None => writeln!(f, "Trip itinerary ({} days)", self.day_count())?,
        }

        if let Some(overview) = &self.overview {
            writeln!(f, "{overview}")?;
        }

        for (index, day) in self.daily_plan.iter().enumerate() {
            let number = day.day.map_or(index + 1, |d| d as usize);
            match &day.title {
                Some(title) => writeln!(f, "\nDay {number}: {title}")?,
                None => writeln!(f, "\nDay {number}")?,
            }
            if let Some(summary) = &day.summary {
                writeln!(f, "  {summary}")?;
            }
            for place in &day.places {
                writeln!(f, "  - {}", place.name())?;
            }
        }

        if !self.tips.is_empty() {
            writeln!(f, "\nTips:")?;
            for tip in &self.tips {
                writeln!(f, "  * {tip}")?;
            }
        }

        Ok(())
    }
}
