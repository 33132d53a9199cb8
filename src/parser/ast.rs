// Abstract syntax of the event script

/// One control event, as a user would produce it on a chart page
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Number of series pickers to show
    Count(usize),
    /// Set a series picker (1-based slot) to a country
    Pick { slot: usize, country: String },
    /// Single-country picker
    Country(String),
    /// Year dropdown
    Year(i32),
    /// Manual year slider; pauses playback
    Slide(i32),
    /// Timer firings
    Tick(u32),
    /// Reveal the tooltip of a rendered element
    Hover(String),
}

/// A parsed event with the script line it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    pub line: usize,
    pub event: Event,
}
