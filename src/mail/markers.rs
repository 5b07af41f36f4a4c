/// Fixed literals that delimit regions of the newsletter body.
///
/// Markers are matched anywhere inside a line (not anchored), so leading or
/// trailing decoration around a heading does not hide it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Start of the announcement table.
    WhatsNew,
    /// End of the announcement table.
    UpcomingLaunches,
    /// Start of the main update bullets.
    MainUpdates,
    /// Table header that ends the main update bullets.
    TableHeader,
}

impl Marker {
    pub const ALL: [Marker; 4] = [
        Marker::WhatsNew,
        Marker::UpcomingLaunches,
        Marker::MainUpdates,
        Marker::TableHeader,
    ];

    pub const fn literal(self) -> &'static str {
        match self {
            Marker::WhatsNew => "What's New",
            Marker::UpcomingLaunches => "Upcoming Launches",
            Marker::MainUpdates => "주요 업데이트",
            Marker::TableHeader => "제목",
        }
    }

    /// Returns true if `line` contains this marker anywhere.
    pub fn contains(self, line: &str) -> bool {
        line.contains(self.literal())
    }

    /// Index of the first line containing this marker.
    pub(crate) fn find_in(self, lines: &[&str]) -> Option<usize> {
        lines.iter().position(|line| self.contains(line))
    }
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.literal())
    }
}
