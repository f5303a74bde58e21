//! The live calendar: a month grid page and the SSE stream that keeps calendar
//! grids current.

mod grid;
mod page;
mod stream;

use serde::Deserialize;
use time::Date;

use crate::period::{Period, PeriodKind, clamp_anchor, deserialize_anchor};

pub use grid::{CALENDAR_EVENT, calendar_grid, live_calendar, live_calendar_head_elements};
pub use page::get_calendar_page;
pub use stream::get_calendar_stream;

/// The query string accepted by the calendar page and stream.
#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    /// Any date inside the period to display. Defaults to today.
    #[serde(default, deserialize_with = "deserialize_anchor")]
    pub anchor: Option<Date>,
    #[serde(default)]
    pub view: PeriodKind,
}

impl CalendarQuery {
    /// The period to display, with the anchor clamped to the viewable range.
    pub fn period(&self, today: Date) -> Period {
        Period::containing(self.view, clamp_anchor(self.anchor, today))
    }
}
