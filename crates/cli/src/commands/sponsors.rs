//! Sponsor carousel preview.
//!
//! Prints the pages the carousel shows at a given viewport width, using the
//! same column breakpoints and page sizes as the site.

use std::io::{self, Write};

use celesta_core::carousel::{Carousel, Direction};
use celesta_core::sponsors::SPONSORS;
use chrono::Utc;

/// Print every carousel page for `width`.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn preview(width: u32) -> io::Result<()> {
    let mut carousel = Carousel::new(width);
    let pages = carousel.page_count(SPONSORS.len());
    let mut out = io::stdout().lock();

    writeln!(
        out,
        "{width}px: {} columns, {} per page, {pages} pages",
        carousel.columns(),
        carousel.page_size(),
    )?;

    let now = Utc::now();
    for page in 1..=pages {
        let names: Vec<&str> = carousel
            .visible(&SPONSORS)
            .iter()
            .map(|s| s.name)
            .collect();
        writeln!(out, "  page {page}: {}", names.join(", "))?;
        carousel.paginate(Direction::Forward, now);
    }

    tracing::debug!(width, pages, "Sponsor preview printed");
    Ok(())
}
